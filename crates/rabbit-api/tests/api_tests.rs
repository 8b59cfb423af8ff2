//! API integration tests.
//!
//! Firestore and the payment provider are both served by wiremock; ID tokens
//! are signed with a fixture RSA key the app is configured to trust.

use std::collections::HashMap;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rabbit_api::auth::{FirebaseClaims, JwksCache};
use rabbit_api::{create_router, ApiConfig, AppState};
use rabbit_firestore::retry::RetryConfig;
use rabbit_firestore::{FirestoreClient, FirestoreConfig};
use rabbit_payments::{sign_payload, StripeClient, StripeConfig};

const PROJECT: &str = "test-project";
const KID: &str = "test-kid";
const COMMIT: &str = "/v1/projects/test-project/databases/(default)/documents:commit";
const RUN_QUERY: &str = "/v1/projects/test-project/databases/(default)/documents:runQuery";
const DOC_ROOT: &str = "projects/test-project/databases/(default)/documents";
const WEBHOOK_SECRET: &str = "whsec_test";

const PRIVATE_KEY: &[u8] = include_bytes!("fixtures/test_rsa_private.pem");
const PUBLIC_KEY: &[u8] = include_bytes!("fixtures/test_rsa_public.pem");

fn test_config() -> ApiConfig {
    ApiConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        rate_limit_rps: 1000,
        request_timeout: Duration::from_secs(5),
        max_body_size: 1024 * 1024,
        environment: "test".to_string(),
    }
}

async fn app_for(server: &MockServer, stripe: Option<StripeClient>) -> Router {
    let firestore = FirestoreClient::new(FirestoreConfig {
        project_id: PROJECT.to_string(),
        database_id: "(default)".to_string(),
        emulator_host: Some(server.uri()),
        timeout: Duration::from_secs(5),
        connect_timeout: Duration::from_secs(2),
        retry: RetryConfig {
            max_retries: 0,
            base_delay_ms: 1,
            max_delay_ms: 1,
        },
    })
    .await
    .unwrap();

    let mut keys = HashMap::new();
    keys.insert(KID.to_string(), DecodingKey::from_rsa_pem(PUBLIC_KEY).unwrap());
    let jwks = JwksCache::from_keys(PROJECT, keys);

    let state = AppState::from_parts(test_config(), firestore, jwks, stripe);
    create_router(state, None)
}

fn stripe_for(server: &MockServer) -> StripeClient {
    StripeClient::new(StripeConfig {
        secret_key: "sk_test_123".to_string(),
        webhook_secret: Some(WEBHOOK_SECRET.to_string()),
        api_base: server.uri(),
        currency: "usd".to_string(),
        timeout: Duration::from_secs(5),
        max_retries: 0,
    })
    .unwrap()
}

fn token_for(email: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = FirebaseClaims {
        sub: format!("uid-{}", email),
        email: Some(email.to_string()),
        email_verified: Some(true),
        name: Some("Test User".to_string()),
        picture: None,
        iss: format!("https://securetoken.google.com/{}", PROJECT),
        aud: PROJECT.to_string(),
        iat: now,
        exp: now + 3600,
    };
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(KID.to_string());
    encode(&header, &claims, &EncodingKey::from_rsa_pem(PRIVATE_KEY).unwrap()).unwrap()
}

async fn mount_user(server: &MockServer, local: &str, role: &str, coins: i64) {
    let email = format!("{}@example.com", local);
    Mock::given(method("GET"))
        .and(path_regex(format!(r"/users/{}(%40|@)example\.com$", local)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": format!("projects/test-project/databases/(default)/documents/users/{}", email),
            "fields": {
                "email": {"stringValue": email},
                "name": {"stringValue": local},
                "role": {"stringValue": role},
                "coins": {"integerValue": coins.to_string()}
            },
            "updateTime": "2026-01-01T00:00:00.000000Z"
        })))
        .mount(server)
        .await;
}

async fn mount_commit(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(COMMIT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "writeResults": [],
            "commitTime": "2026-01-01T00:00:01.000000Z"
        })))
        .mount(server)
        .await;
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

fn json_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

fn get(uri: &str, email: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(email) = email {
        builder = builder.header("Authorization", format!("Bearer {}", token_for(email)));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, email: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token_for(email)))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_root_banner() {
    let server = MockServer::start().await;
    let (status, body) = send(app_for(&server, None).await, get("/", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"task rabbit server started");
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = MockServer::start().await;
    let (status, body) = send(app_for(&server, None).await, get("/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["status"], "healthy");
}

#[tokio::test]
async fn test_ready_reports_payments_disabled() {
    let server = MockServer::start().await;
    let (status, body) = send(app_for(&server, None).await, get("/ready", None)).await;

    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["checks"]["firestore"]["status"], "ok");
    assert_eq!(body["checks"]["payments"]["status"], "disabled");
}

#[tokio::test]
async fn test_security_headers_present() {
    let server = MockServer::start().await;
    let response = app_for(&server, None)
        .await
        .oneshot(get("/health", None))
        .await
        .unwrap();

    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let server = MockServer::start().await;
    let (status, body) = send(app_for(&server, None).await, get("/api/me/coins", None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json_body(&body)["detail"]
        .as_str()
        .unwrap()
        .contains("Missing Authorization header"));
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let server = MockServer::start().await;
    let request = Request::builder()
        .uri("/api/me/coins")
        .header("Authorization", "Bearer not.a.jwt")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app_for(&server, None).await, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_my_coins_returns_balance() {
    let server = MockServer::start().await;
    mount_user(&server, "ann", "Worker", 42).await;

    let (status, body) = send(
        app_for(&server, None).await,
        get("/api/me/coins", Some("ann@example.com")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["email"], "ann@example.com");
    assert_eq!(body["coins"], 42);
}

#[tokio::test]
async fn test_unregistered_caller_is_forbidden() {
    let server = MockServer::start().await;

    let (status, body) = send(
        app_for(&server, None).await,
        get("/api/me/coins", Some("ghost@example.com")),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(json_body(&body)["detail"]
        .as_str()
        .unwrap()
        .contains("Account is not registered"));
}

#[tokio::test]
async fn test_register_new_worker() {
    let server = MockServer::start().await;
    mount_commit(&server).await;

    let (status, body) = send(
        app_for(&server, None).await,
        post_json(
            "/api/register",
            "new@example.com",
            json!({"name": "New Person", "role": "Worker"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let body = json_body(&body);
    assert_eq!(body["message"], "User registered successfully");
    assert_eq!(body["user"]["email"], "new@example.com");
    assert_eq!(body["user"]["role"], "Worker");
    assert_eq!(body["user"]["coins"], 10);
}

#[tokio::test]
async fn test_register_existing_email_is_rejected() {
    let server = MockServer::start().await;
    mount_user(&server, "ann", "Worker", 10).await;

    let (status, body) = send(
        app_for(&server, None).await,
        post_json(
            "/api/register",
            "ann@example.com",
            json!({"name": "Ann", "role": "TaskCreator"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&body)["detail"], "Email already in use");
}

#[tokio::test]
async fn test_register_cannot_self_assign_admin() {
    let server = MockServer::start().await;

    let (status, _) = send(
        app_for(&server, None).await,
        post_json(
            "/api/register",
            "sneaky@example.com",
            json!({"name": "Sneaky", "role": "Admin"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_google_login_existing_user() {
    let server = MockServer::start().await;
    mount_user(&server, "ann", "TaskCreator", 50).await;

    let (status, body) = send(
        app_for(&server, None).await,
        post_json("/api/google-login", "ann@example.com", json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["message"], "User already exists, logged in successfully");
    assert_eq!(body["user"]["role"], "TaskCreator");
}

#[tokio::test]
async fn test_create_task_with_insufficient_coins() {
    let server = MockServer::start().await;
    mount_user(&server, "boss", "TaskCreator", 5).await;

    let (status, body) = send(
        app_for(&server, None).await,
        post_json(
            "/api/tasks",
            "boss@example.com",
            json!({
                "task_title": "Watch a video",
                "task_detail": "Watch and comment",
                "task_quantity": 10,
                "payable_amount": 2,
                "completion_date": "2026-12-01",
                "submission_info": "Screenshot",
                "total_cost": 1
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body = json_body(&body);
    assert_eq!(body["detail"], "Insufficient coins");
    assert_eq!(body["code"], "insufficient_coins");
}

#[tokio::test]
async fn test_create_task_debits_creator() {
    let server = MockServer::start().await;
    mount_user(&server, "boss", "TaskCreator", 100).await;
    mount_commit(&server).await;

    let (status, body) = send(
        app_for(&server, None).await,
        post_json(
            "/api/tasks",
            "boss@example.com",
            json!({
                "task_title": "Watch a video",
                "task_detail": "Watch and comment",
                "task_quantity": 10,
                "payable_amount": 2,
                "completion_date": "2026-12-01",
                "submission_info": "Screenshot"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let body = json_body(&body);
    assert_eq!(body["total_cost"], 20);
    assert_eq!(body["coins"], 80);
    assert_eq!(body["task"]["creator_email"], "boss@example.com");
}

#[tokio::test]
async fn test_worker_cannot_create_task() {
    let server = MockServer::start().await;
    mount_user(&server, "ann", "Worker", 500).await;

    let (status, _) = send(
        app_for(&server, None).await,
        post_json(
            "/api/tasks",
            "ann@example.com",
            json!({
                "task_title": "Nope",
                "task_detail": "Nope",
                "task_quantity": 1,
                "payable_amount": 1,
                "completion_date": "2026-12-01",
                "submission_info": "Nope"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_invalid_task_id_is_rejected() {
    let server = MockServer::start().await;

    let (status, _) = send(
        app_for(&server, None).await,
        get("/api/tasks/bad.id", Some("ann@example.com")),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_withdrawal_below_minimum() {
    let server = MockServer::start().await;
    mount_user(&server, "ann", "Worker", 1000).await;

    let (status, body) = send(
        app_for(&server, None).await,
        post_json(
            "/api/withdrawals",
            "ann@example.com",
            json!({
                "withdrawal_coin": 150,
                "payment_system": "bkash",
                "account_number": "0123456789"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&body)["detail"], "Minimum withdrawal is 200 coins");
}

#[tokio::test]
async fn test_withdrawal_above_balance() {
    let server = MockServer::start().await;
    mount_user(&server, "ann", "Worker", 250).await;

    let (status, body) = send(
        app_for(&server, None).await,
        post_json(
            "/api/withdrawals",
            "ann@example.com",
            json!({
                "withdrawal_coin": 300,
                "payment_system": "bkash",
                "account_number": "0123456789"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&body)["code"], "insufficient_coins");
}

#[tokio::test]
async fn test_admin_routes_require_admin() {
    let server = MockServer::start().await;
    mount_user(&server, "ann", "Worker", 10).await;

    let (status, _) = send(
        app_for(&server, None).await,
        get("/api/admin/users", Some("ann@example.com")),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_list_packages() {
    let server = MockServer::start().await;

    let (status, body) = send(
        app_for(&server, None).await,
        get("/api/payments/packages", Some("ann@example.com")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    let packages = body.as_array().unwrap();
    assert_eq!(packages.len(), 4);
    assert_eq!(packages[0]["id"], "starter");
    assert_eq!(packages[0]["coins"], 10);
    assert_eq!(packages[0]["price_cents"], 100);
}

#[tokio::test]
async fn test_list_packages_requires_token() {
    let server = MockServer::start().await;

    let (status, _) = send(
        app_for(&server, None).await,
        get("/api/payments/packages", None),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_payment_intent_unavailable_without_provider() {
    let server = MockServer::start().await;
    mount_user(&server, "ann", "Worker", 10).await;

    let (status, _) = send(
        app_for(&server, None).await,
        post_json(
            "/api/payments/intent",
            "ann@example.com",
            json!({"package_id": "starter"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_create_payment_intent() {
    let server = MockServer::start().await;
    mount_user(&server, "ann", "Worker", 10).await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pi_123",
            "amount": 1000,
            "currency": "usd",
            "status": "requires_payment_method",
            "client_secret": "pi_123_secret_abc",
            "metadata": {"email": "ann@example.com", "package_id": "standard"}
        })))
        .mount(&server)
        .await;

    let (status, body) = send(
        app_for(&server, Some(stripe_for(&server))).await,
        post_json(
            "/api/payments/intent",
            "ann@example.com",
            json!({"package_id": "standard"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["payment_intent_id"], "pi_123");
    assert_eq!(body["client_secret"], "pi_123_secret_abc");
    assert_eq!(body["amount_cents"], 1000);
    assert_eq!(body["coins"], 150);
}

fn succeeded_event(amount: i64) -> Vec<u8> {
    json!({
        "id": "evt_1",
        "type": "payment_intent.succeeded",
        "data": {"object": {
            "id": "pi_123",
            "amount": amount,
            "currency": "usd",
            "status": "succeeded",
            "metadata": {"email": "ann@example.com", "package_id": "standard"}
        }}
    })
    .to_string()
    .into_bytes()
}

fn webhook_request(payload: Vec<u8>, signature: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/payments/webhook")
        .header("Content-Type", "application/json")
        .header("Stripe-Signature", signature)
        .body(Body::from(payload))
        .unwrap()
}

#[tokio::test]
async fn test_webhook_rejects_bad_signature() {
    let server = MockServer::start().await;
    let payload = succeeded_event(1000);
    let signature = sign_payload(&payload, "whsec_wrong", chrono::Utc::now().timestamp()).unwrap();

    let (status, _) = send(
        app_for(&server, Some(stripe_for(&server))).await,
        webhook_request(payload, &signature),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_requires_signature_header() {
    let server = MockServer::start().await;
    let request = Request::builder()
        .method("POST")
        .uri("/payments/webhook")
        .body(Body::from(succeeded_event(1000)))
        .unwrap();

    let (status, _) = send(app_for(&server, Some(stripe_for(&server))).await, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_credits_coins() {
    let server = MockServer::start().await;
    mount_user(&server, "ann", "Worker", 10).await;
    mount_commit(&server).await;

    let payload = succeeded_event(1000);
    let signature = sign_payload(&payload, WEBHOOK_SECRET, chrono::Utc::now().timestamp()).unwrap();

    let (status, body) = send(
        app_for(&server, Some(stripe_for(&server))).await,
        webhook_request(payload, &signature),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["received"], true);

    let commits: Vec<_> = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == COMMIT)
        .collect();
    assert_eq!(commits.len(), 1);
    let commit: Value = serde_json::from_slice(&commits[0].body).unwrap();
    let writes = commit["writes"].as_array().unwrap();
    // Balance update, ledger entry and payment record.
    assert_eq!(writes.len(), 3);
    assert_eq!(writes[0]["update"]["fields"]["coins"]["integerValue"], "160");
}

#[tokio::test]
async fn test_webhook_duplicate_delivery_is_not_credited_twice() {
    let server = MockServer::start().await;
    mount_user(&server, "ann", "Worker", 160).await;
    Mock::given(method("GET"))
        .and(path_regex(r"/payments/pi_123$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "projects/test-project/databases/(default)/documents/payments/pi_123",
            "fields": {
                "email": {"stringValue": "ann@example.com"},
                "package_id": {"stringValue": "standard"},
                "coins": {"integerValue": "150"},
                "amount_cents": {"integerValue": "1000"}
            },
            "updateTime": "2026-01-01T00:00:00.000000Z"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(COMMIT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let payload = succeeded_event(1000);
    let signature = sign_payload(&payload, WEBHOOK_SECRET, chrono::Utc::now().timestamp()).unwrap();

    let (status, _) = send(
        app_for(&server, Some(stripe_for(&server))).await,
        webhook_request(payload, &signature),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_webhook_rejects_mismatched_amount() {
    let server = MockServer::start().await;
    mount_user(&server, "ann", "Worker", 10).await;

    let payload = succeeded_event(1);
    let signature = sign_payload(&payload, WEBHOOK_SECRET, chrono::Utc::now().timestamp()).unwrap();

    let (status, _) = send(
        app_for(&server, Some(stripe_for(&server))).await,
        webhook_request(payload, &signature),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

async fn mount_pending_submission(server: &MockServer, creator_local: &str) {
    Mock::given(method("GET"))
        .and(path_regex(r"/submissions/sub-1$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "projects/test-project/databases/(default)/documents/submissions/sub-1",
            "fields": {
                "task_id": {"stringValue": "task-1"},
                "task_title": {"stringValue": "Watch a video"},
                "payable_amount": {"integerValue": "5"},
                "worker_email": {"stringValue": "ann@example.com"},
                "worker_name": {"stringValue": "Ann"},
                "creator_email": {"stringValue": format!("{}@example.com", creator_local)},
                "creator_name": {"stringValue": "Boss"},
                "submission_details": {"stringValue": "https://proof.example.com/1"},
                "status": {"stringValue": "pending"}
            },
            "updateTime": "2026-01-02T00:00:00.000000Z"
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_approve_submission_pays_worker() {
    let server = MockServer::start().await;
    mount_user(&server, "boss", "TaskCreator", 100).await;
    mount_user(&server, "ann", "Worker", 10).await;
    mount_pending_submission(&server, "boss").await;
    mount_commit(&server).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/submissions/sub-1/approve")
        .header("Authorization", format!("Bearer {}", token_for("boss@example.com")))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app_for(&server, None).await, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["coins_paid"], 5);

    let commits: Vec<_> = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == COMMIT)
        .collect();
    assert_eq!(commits.len(), 1);
    let commit: Value = serde_json::from_slice(&commits[0].body).unwrap();
    let writes = commit["writes"].as_array().unwrap();
    // Worker balance, ledger entry, submission status and notification.
    assert_eq!(writes.len(), 4);
    assert_eq!(writes[0]["update"]["fields"]["coins"]["integerValue"], "15");
}

#[tokio::test]
async fn test_cannot_review_another_creators_submission() {
    let server = MockServer::start().await;
    mount_user(&server, "rival", "TaskCreator", 100).await;
    mount_pending_submission(&server, "boss").await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/submissions/sub-1/reject")
        .header("Authorization", format!("Bearer {}", token_for("rival@example.com")))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app_for(&server, None).await, request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

fn request(verb: &str, uri: &str, email: &str) -> Request<Body> {
    Request::builder()
        .method(verb)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token_for(email)))
        .body(Body::empty())
        .unwrap()
}

fn query_rows(docs: Vec<Value>) -> Value {
    if docs.is_empty() {
        return json!([{"readTime": "2026-01-01T00:00:00.000000Z"}]);
    }
    Value::Array(
        docs.into_iter()
            .map(|d| json!({"document": d, "readTime": "2026-01-01T00:00:00.000000Z"}))
            .collect(),
    )
}

/// Answer top-level queries whose body contains `marker`.
async fn mount_query(server: &MockServer, marker: &str, docs: Vec<Value>) {
    Mock::given(method("POST"))
        .and(path(RUN_QUERY))
        .and(body_string_contains(marker))
        .respond_with(ResponseTemplate::new(200).set_body_json(query_rows(docs)))
        .mount(server)
        .await;
}

/// Answer queries on one of `{local}@example.com`'s subcollections.
async fn mount_user_query(server: &MockServer, local: &str, collection: &str, docs: Vec<Value>) {
    Mock::given(method("POST"))
        .and(path_regex(format!(r"/users/{}(%40|@)example\.com:runQuery$", local)))
        .and(body_string_contains(format!("\"collectionId\":\"{}\"", collection)))
        .respond_with(ResponseTemplate::new(200).set_body_json(query_rows(docs)))
        .mount(server)
        .await;
}

fn task_doc(id: &str, creator_local: &str, quantity: u32, payable: u32) -> Value {
    json!({
        "name": format!("{}/tasks/{}", DOC_ROOT, id),
        "fields": {
            "task_title": {"stringValue": "Watch a video"},
            "task_quantity": {"integerValue": quantity.to_string()},
            "payable_amount": {"integerValue": payable.to_string()},
            "creator_email": {"stringValue": format!("{}@example.com", creator_local)},
            "creator_name": {"stringValue": "Boss"}
        },
        "updateTime": "2026-01-03T00:00:00.000000Z"
    })
}

async fn mount_task(server: &MockServer, id: &str, creator_local: &str, quantity: u32, payable: u32) {
    Mock::given(method("GET"))
        .and(path_regex(format!(r"/tasks/{}$", id)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(task_doc(id, creator_local, quantity, payable)),
        )
        .mount(server)
        .await;
}

fn withdrawal_doc(id: &str, worker_local: &str, coins: i64, status: &str) -> Value {
    json!({
        "name": format!("{}/withdrawals/{}", DOC_ROOT, id),
        "fields": {
            "worker_email": {"stringValue": format!("{}@example.com", worker_local)},
            "worker_name": {"stringValue": "Ann"},
            "withdrawal_coin": {"integerValue": coins.to_string()},
            "withdrawal_amount_cents": {"integerValue": (coins * 5).to_string()},
            "payment_system": {"stringValue": "Bkash"},
            "account_number": {"stringValue": "01700000000"},
            "status": {"stringValue": status}
        },
        "updateTime": "2026-01-04T00:00:00.000000Z"
    })
}

async fn mount_withdrawal(server: &MockServer, worker_local: &str, coins: i64) {
    Mock::given(method("GET"))
        .and(path_regex(r"/withdrawals/wd-1$"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(withdrawal_doc("wd-1", worker_local, coins, "pending")),
        )
        .mount(server)
        .await;
}

async fn refuse_commits(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(COMMIT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(server)
        .await;
}

/// The writes of every commit the server received, in order.
async fn committed_writes(server: &MockServer) -> Vec<Vec<Value>> {
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == COMMIT)
        .map(|r| {
            let body: Value = serde_json::from_slice(&r.body).unwrap();
            body["writes"].as_array().unwrap().clone()
        })
        .collect()
}

#[tokio::test]
async fn test_delete_task_refunds_open_units() {
    let server = MockServer::start().await;
    mount_user(&server, "boss", "TaskCreator", 100).await;
    mount_task(&server, "task-1", "boss", 3, 5).await;
    mount_commit(&server).await;

    let (status, body) = send(
        app_for(&server, None).await,
        request("DELETE", "/api/tasks/task-1", "boss@example.com"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["refunded"], 15);
    assert_eq!(body["coins"], 115);

    let commits = committed_writes(&server).await;
    assert_eq!(commits.len(), 1);
    let writes = &commits[0];
    // Creator balance, ledger entry and the task removal.
    assert_eq!(writes.len(), 3);
    assert_eq!(writes[0]["update"]["fields"]["coins"]["integerValue"], "115");
    assert_eq!(writes[1]["update"]["fields"]["operation_type"]["stringValue"], "task_refund");
    assert_eq!(writes[2]["delete"], format!("{}/tasks/task-1", DOC_ROOT));
    assert_eq!(writes[2]["currentDocument"]["updateTime"], "2026-01-03T00:00:00.000000Z");
}

#[tokio::test]
async fn test_cannot_delete_another_creators_task() {
    let server = MockServer::start().await;
    mount_user(&server, "rival", "TaskCreator", 100).await;
    mount_task(&server, "task-1", "boss", 3, 5).await;
    refuse_commits(&server).await;

    let (status, _) = send(
        app_for(&server, None).await,
        request("DELETE", "/api/tasks/task-1", "rival@example.com"),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_delete_task_refunds_creator() {
    let server = MockServer::start().await;
    mount_user(&server, "root", "Admin", 0).await;
    mount_user(&server, "boss", "TaskCreator", 100).await;
    mount_task(&server, "task-1", "boss", 3, 5).await;
    mount_commit(&server).await;

    let (status, body) = send(
        app_for(&server, None).await,
        request("DELETE", "/api/admin/tasks/task-1", "root@example.com"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["refunded"], 15);

    let commits = committed_writes(&server).await;
    assert_eq!(commits.len(), 1);
    let balance = &commits[0][0]["update"];
    assert_eq!(balance["name"], format!("{}/users/boss@example.com", DOC_ROOT));
    assert_eq!(balance["fields"]["coins"]["integerValue"], "115");
}

#[tokio::test]
async fn test_submit_takes_one_open_unit() {
    let server = MockServer::start().await;
    mount_user(&server, "ann", "Worker", 10).await;
    mount_task(&server, "task-1", "boss", 2, 5).await;
    mount_query(&server, "\"collectionId\":\"submissions\"", vec![]).await;
    mount_commit(&server).await;

    let (status, body) = send(
        app_for(&server, None).await,
        post_json(
            "/api/submissions",
            "ann@example.com",
            json!({"task_id": "task-1", "submission_details": "https://proof.example.com/1"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let body = json_body(&body);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["task_id"], "task-1");
    assert_eq!(body["payable_amount"], 5);

    let commits = committed_writes(&server).await;
    assert_eq!(commits.len(), 1);
    let writes = &commits[0];
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0]["currentDocument"]["exists"], false);
    assert_eq!(writes[1]["update"]["fields"]["task_quantity"]["integerValue"], "1");
    assert_eq!(writes[1]["currentDocument"]["updateTime"], "2026-01-03T00:00:00.000000Z");
}

#[tokio::test]
async fn test_submit_twice_is_rejected() {
    let server = MockServer::start().await;
    mount_user(&server, "ann", "Worker", 10).await;
    mount_task(&server, "task-1", "boss", 2, 5).await;
    mount_query(
        &server,
        "\"collectionId\":\"submissions\"",
        vec![json!({
            "name": format!("{}/submissions/sub-0", DOC_ROOT),
            "fields": {"task_id": {"stringValue": "task-1"}}
        })],
    )
    .await;
    refuse_commits(&server).await;

    let (status, body) = send(
        app_for(&server, None).await,
        post_json(
            "/api/submissions",
            "ann@example.com",
            json!({"task_id": "task-1", "submission_details": "again"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&body)["detail"], "You have already submitted this task");
}

#[tokio::test]
async fn test_submit_to_filled_task_is_rejected() {
    let server = MockServer::start().await;
    mount_user(&server, "ann", "Worker", 10).await;
    mount_task(&server, "task-1", "boss", 0, 5).await;
    refuse_commits(&server).await;

    let (status, body) = send(
        app_for(&server, None).await,
        post_json(
            "/api/submissions",
            "ann@example.com",
            json!({"task_id": "task-1", "submission_details": "done"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&body)["detail"], "This task has no open units left");
}

#[tokio::test]
async fn test_reject_submission_reopens_unit() {
    let server = MockServer::start().await;
    mount_user(&server, "boss", "TaskCreator", 100).await;
    mount_pending_submission(&server, "boss").await;
    mount_task(&server, "task-1", "boss", 2, 5).await;
    mount_commit(&server).await;

    let (status, body) = send(
        app_for(&server, None).await,
        request("POST", "/api/submissions/sub-1/reject", "boss@example.com"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["submission_id"], "sub-1");

    let commits = committed_writes(&server).await;
    assert_eq!(commits.len(), 1);
    let writes = &commits[0];
    // Submission status, re-opened unit and the worker's notification.
    assert_eq!(writes.len(), 3);
    assert_eq!(writes[0]["update"]["fields"]["status"]["stringValue"], "rejected");
    assert_eq!(writes[1]["update"]["fields"]["task_quantity"]["integerValue"], "3");
    assert!(writes[2]["update"]["name"]
        .as_str()
        .unwrap()
        .contains("/users/ann@example.com/notifications/"));
}

#[tokio::test]
async fn test_reject_submission_on_deleted_task() {
    let server = MockServer::start().await;
    mount_user(&server, "boss", "TaskCreator", 100).await;
    mount_pending_submission(&server, "boss").await;
    mount_commit(&server).await;

    let (status, _) = send(
        app_for(&server, None).await,
        request("POST", "/api/submissions/sub-1/reject", "boss@example.com"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let commits = committed_writes(&server).await;
    assert_eq!(commits.len(), 1);
    // No unit to re-open; the deleted task already refunded it.
    assert_eq!(commits[0].len(), 2);
    assert!(commits[0]
        .iter()
        .all(|w| !w["update"]["name"].as_str().unwrap_or_default().contains("/tasks/")));
}

#[tokio::test]
async fn test_approve_withdrawal_debits_worker() {
    let server = MockServer::start().await;
    mount_user(&server, "root", "Admin", 0).await;
    mount_user(&server, "ann", "Worker", 300).await;
    mount_withdrawal(&server, "ann", 200).await;
    mount_commit(&server).await;

    let (status, body) = send(
        app_for(&server, None).await,
        request("POST", "/api/admin/withdrawals/wd-1/approve", "root@example.com"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["withdrawal_id"], "wd-1");

    let commits = committed_writes(&server).await;
    assert_eq!(commits.len(), 1);
    let writes = &commits[0];
    // Worker balance, ledger entry, request status and notification.
    assert_eq!(writes.len(), 4);
    assert_eq!(writes[0]["update"]["fields"]["coins"]["integerValue"], "100");
    assert_eq!(writes[1]["update"]["fields"]["delta"]["integerValue"], "-200");
    assert_eq!(writes[2]["update"]["fields"]["status"]["stringValue"], "approved");
    assert_eq!(writes[2]["currentDocument"]["updateTime"], "2026-01-04T00:00:00.000000Z");
}

#[tokio::test]
async fn test_approve_withdrawal_beyond_balance() {
    let server = MockServer::start().await;
    mount_user(&server, "root", "Admin", 0).await;
    mount_user(&server, "ann", "Worker", 100).await;
    mount_withdrawal(&server, "ann", 200).await;
    refuse_commits(&server).await;

    let (status, body) = send(
        app_for(&server, None).await,
        request("POST", "/api/admin/withdrawals/wd-1/approve", "root@example.com"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&body)["code"], "insufficient_coins");
}

#[tokio::test]
async fn test_reject_withdrawal_moves_no_coins() {
    let server = MockServer::start().await;
    mount_user(&server, "root", "Admin", 0).await;
    mount_withdrawal(&server, "ann", 200).await;
    mount_commit(&server).await;

    let (status, body) = send(
        app_for(&server, None).await,
        request("POST", "/api/admin/withdrawals/wd-1/reject", "root@example.com"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["message"], "Withdrawal rejected");

    let commits = committed_writes(&server).await;
    assert_eq!(commits.len(), 1);
    let writes = &commits[0];
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0]["update"]["fields"]["status"]["stringValue"], "rejected");
    assert!(writes
        .iter()
        .all(|w| w["update"]["fields"].get("coins").is_none()));
}

async fn mount_intent(server: &MockServer, owner_local: &str, status: &str) {
    Mock::given(method("GET"))
        .and(path("/v1/payment_intents/pi_123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pi_123",
            "amount": 1000,
            "currency": "usd",
            "status": status,
            "metadata": {
                "email": format!("{}@example.com", owner_local),
                "package_id": "standard"
            }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_confirm_payment_credits_package() {
    let server = MockServer::start().await;
    mount_user(&server, "ann", "Worker", 10).await;
    mount_intent(&server, "ann", "succeeded").await;
    mount_commit(&server).await;

    let (status, body) = send(
        app_for(&server, Some(stripe_for(&server))).await,
        post_json(
            "/api/payments/confirm",
            "ann@example.com",
            json!({"payment_intent_id": "pi_123"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["credited"], true);
    assert_eq!(body["coins_added"], 150);
    assert_eq!(body["coins"], 160);
}

#[tokio::test]
async fn test_confirm_payment_of_another_account_is_forbidden() {
    let server = MockServer::start().await;
    mount_user(&server, "ann", "Worker", 10).await;
    mount_intent(&server, "bob", "succeeded").await;
    refuse_commits(&server).await;

    let (status, _) = send(
        app_for(&server, Some(stripe_for(&server))).await,
        post_json(
            "/api/payments/confirm",
            "ann@example.com",
            json!({"payment_intent_id": "pi_123"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_confirm_unfinished_payment_is_rejected() {
    let server = MockServer::start().await;
    mount_user(&server, "ann", "Worker", 10).await;
    mount_intent(&server, "ann", "processing").await;
    refuse_commits(&server).await;

    let (status, _) = send(
        app_for(&server, Some(stripe_for(&server))).await,
        post_json(
            "/api/payments/confirm",
            "ann@example.com",
            json!({"payment_intent_id": "pi_123"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_debit_below_zero_is_rejected() {
    let server = MockServer::start().await;
    mount_user(&server, "root", "Admin", 0).await;
    mount_user(&server, "ann", "Worker", 10).await;
    refuse_commits(&server).await;

    let (status, body) = send(
        app_for(&server, None).await,
        post_json(
            "/api/admin/users/ann@example.com/coins",
            "root@example.com",
            json!({"delta": -50, "reason": "Chargeback"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body = json_body(&body);
    assert_eq!(body["detail"], "Insufficient coins");
    assert_eq!(body["code"], "insufficient_coins");
}

#[tokio::test]
async fn test_google_login_creates_worker() {
    let server = MockServer::start().await;
    mount_commit(&server).await;

    let (status, body) = send(
        app_for(&server, None).await,
        post_json("/api/google-login", "new@example.com", json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["message"], "User created successfully");
    assert_eq!(body["user"]["role"], "Worker");
    assert_eq!(body["user"]["coins"], 10);

    let commits = committed_writes(&server).await;
    assert_eq!(commits.len(), 1);
    let writes = &commits[0];
    // The account and its signup bonus land together.
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0]["currentDocument"]["exists"], false);
    assert_eq!(writes[1]["update"]["fields"]["operation_type"]["stringValue"], "signup_bonus");
    assert_eq!(writes[1]["update"]["fields"]["delta"]["integerValue"], "10");
}

fn transaction_doc(id: &str, delta: i64, balance_after: i64) -> Value {
    json!({
        "name": format!("{}/users/ann@example.com/coin_transactions/{}", DOC_ROOT, id),
        "fields": {
            "email": {"stringValue": "ann@example.com"},
            "operation_type": {"stringValue": "purchase"},
            "delta": {"integerValue": delta.to_string()},
            "balance_after": {"integerValue": balance_after.to_string()},
            "timestamp": {"timestampValue": "2026-01-05T00:00:00Z"}
        }
    })
}

#[tokio::test]
async fn test_transactions_resume_after_cursor() {
    let server = MockServer::start().await;
    mount_user(&server, "ann", "Worker", 30).await;
    // Two entries written in the same instant.
    mount_user_query(
        &server,
        "ann",
        "coin_transactions",
        vec![transaction_doc("tx-2", 10, 30), transaction_doc("tx-1", 10, 20)],
    )
    .await;

    let (status, body) = send(
        app_for(&server, None).await,
        get("/api/me/transactions?limit=2", Some("ann@example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["transactions"].as_array().unwrap().len(), 2);
    let cursor = body["next_cursor"].as_str().unwrap().to_string();
    assert_eq!(cursor, "2026-01-05T00:00:00+00:00|tx-1");

    let uri = format!(
        "/api/me/transactions?limit=2&cursor={}",
        cursor.replace('+', "%2B").replace('|', "%7C")
    );
    let (status, _) = send(app_for(&server, None).await, get(&uri, Some("ann@example.com"))).await;
    assert_eq!(status, StatusCode::OK);

    let queries: Vec<Value> = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path().ends_with(":runQuery"))
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect();
    assert_eq!(queries.len(), 2);
    let order = &queries[0]["structuredQuery"]["orderBy"];
    assert_eq!(order[0]["field"]["fieldPath"], "timestamp");
    assert_eq!(order[1]["field"]["fieldPath"], "__name__");

    let start = &queries[1]["structuredQuery"]["startAt"];
    assert_eq!(start["before"], false);
    assert_eq!(start["values"][0]["timestampValue"], "2026-01-05T00:00:00+00:00");
    assert_eq!(
        start["values"][1]["referenceValue"],
        format!("{}/users/ann@example.com/coin_transactions/tx-1", DOC_ROOT)
    );
}

#[tokio::test]
async fn test_transactions_reject_malformed_cursor() {
    let server = MockServer::start().await;

    for cursor in ["yesterday", "2026-01-05T00:00:00Z%7C..%2Fx"] {
        let uri = format!("/api/me/transactions?cursor={}", cursor);
        let (status, _) = send(app_for(&server, None).await, get(&uri, Some("ann@example.com"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "cursor {}", cursor);
    }
}

#[tokio::test]
async fn test_my_tasks_newest_first() {
    let server = MockServer::start().await;
    mount_user(&server, "boss", "TaskCreator", 100).await;
    mount_query(
        &server,
        "creator_email",
        vec![task_doc("task-2", "boss", 1, 5), task_doc("task-1", "boss", 4, 2)],
    )
    .await;

    let (status, body) = send(
        app_for(&server, None).await,
        get("/api/tasks/mine", Some("boss@example.com")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["task-2", "task-1"]);

    let requests = server.received_requests().await.unwrap();
    let query = requests
        .iter()
        .find(|r| r.url.path() == RUN_QUERY)
        .map(|r| serde_json::from_slice::<Value>(&r.body).unwrap())
        .unwrap();
    let order = &query["structuredQuery"]["orderBy"][0];
    assert_eq!(order["field"]["fieldPath"], "created_at");
    assert_eq!(order["direction"], "DESCENDING");
}

#[tokio::test]
async fn test_admin_delete_user_removes_history() {
    let server = MockServer::start().await;
    mount_user(&server, "root", "Admin", 0).await;
    mount_user(&server, "ann", "Worker", 15).await;
    mount_query(&server, "\"collectionId\":\"tasks\"", vec![]).await;
    mount_query(
        &server,
        "\"collectionId\":\"withdrawals\"",
        vec![withdrawal_doc("wd-0", "ann", 200, "approved")],
    )
    .await;
    mount_user_query(&server, "ann", "coin_transactions", vec![transaction_doc("tx-1", 15, 15)]).await;
    mount_user_query(
        &server,
        "ann",
        "notifications",
        vec![json!({
            "name": format!("{}/users/ann@example.com/notifications/n-1", DOC_ROOT),
            "fields": {"message": {"stringValue": "hi"}}
        })],
    )
    .await;
    mount_commit(&server).await;

    let (status, body) = send(
        app_for(&server, None).await,
        request("DELETE", "/api/admin/users/ann@example.com", "root@example.com"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["message"], "User deleted");

    let commits = committed_writes(&server).await;
    assert_eq!(commits.len(), 1);
    let writes = &commits[0];
    assert_eq!(writes.len(), 3);
    assert_eq!(
        writes[0]["delete"],
        format!("{}/users/ann@example.com/coin_transactions/tx-1", DOC_ROOT)
    );
    assert_eq!(
        writes[1]["delete"],
        format!("{}/users/ann@example.com/notifications/n-1", DOC_ROOT)
    );
    // The account goes last, guarded on the version that was read.
    assert_eq!(writes[2]["delete"], format!("{}/users/ann@example.com", DOC_ROOT));
    assert_eq!(writes[2]["currentDocument"]["updateTime"], "2026-01-01T00:00:00.000000Z");
}

#[tokio::test]
async fn test_admin_delete_user_with_tasks_conflicts() {
    let server = MockServer::start().await;
    mount_user(&server, "root", "Admin", 0).await;
    mount_user(&server, "boss", "TaskCreator", 40).await;
    mount_query(&server, "\"collectionId\":\"tasks\"", vec![task_doc("task-1", "boss", 2, 5)]).await;
    mount_query(&server, "\"collectionId\":\"withdrawals\"", vec![]).await;
    refuse_commits(&server).await;

    let (status, body) = send(
        app_for(&server, None).await,
        request("DELETE", "/api/admin/users/boss@example.com", "root@example.com"),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json_body(&body)["code"], "conflict");
}

#[tokio::test]
async fn test_admin_delete_user_with_pending_withdrawal_conflicts() {
    let server = MockServer::start().await;
    mount_user(&server, "root", "Admin", 0).await;
    mount_user(&server, "ann", "Worker", 300).await;
    mount_query(&server, "\"collectionId\":\"tasks\"", vec![]).await;
    mount_query(
        &server,
        "\"collectionId\":\"withdrawals\"",
        vec![withdrawal_doc("wd-1", "ann", 200, "pending")],
    )
    .await;
    refuse_commits(&server).await;

    let (status, _) = send(
        app_for(&server, None).await,
        request("DELETE", "/api/admin/users/ann@example.com", "root@example.com"),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
}
