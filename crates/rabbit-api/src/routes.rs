//! API routes.

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, patch, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::admin::{
    adjust_coins, admin_delete_task, approve_withdrawal, delete_user, list_pending_withdrawals,
    list_tasks, list_users, reject_withdrawal, stats, update_user_role,
};
use crate::handlers::{
    approve_submission, available_tasks, confirm_payment, create_intent, create_submission,
    create_task, create_withdrawal, delete_task, get_task, get_user, google_login, health,
    list_notifications, list_packages, my_coins, my_payments, my_submissions, my_tasks,
    my_transactions, my_withdrawals, ready, register, reject_submission, review_queue, root,
    stripe_webhook, top_workers, update_task,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    RateLimiterCache,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let account_routes = Router::new()
        .route("/register", post(register))
        .route("/google-login", post(google_login))
        .route("/users/:email", get(get_user))
        .route("/me/coins", get(my_coins))
        .route("/me/transactions", get(my_transactions))
        .route("/workers/top", get(top_workers))
        .route("/notifications", get(list_notifications));

    // Static segments win over `:id`, so /tasks/mine never reaches get_task.
    let task_routes = Router::new()
        .route("/tasks", post(create_task))
        .route("/tasks/mine", get(my_tasks))
        .route("/tasks/available", get(available_tasks))
        .route(
            "/tasks/:id",
            get(get_task).patch(update_task).delete(delete_task),
        );

    let submission_routes = Router::new()
        .route("/submissions", post(create_submission))
        .route("/submissions/mine", get(my_submissions))
        .route("/submissions/review", get(review_queue))
        .route("/submissions/:id/approve", post(approve_submission))
        .route("/submissions/:id/reject", post(reject_submission));

    let payment_routes = Router::new()
        .route("/payments/packages", get(list_packages))
        .route("/payments/intent", post(create_intent))
        .route("/payments/confirm", post(confirm_payment))
        .route("/payments/mine", get(my_payments));

    let withdrawal_routes = Router::new()
        .route("/withdrawals", post(create_withdrawal))
        .route("/withdrawals/mine", get(my_withdrawals));

    let admin_routes = Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/:email", axum::routing::delete(delete_user))
        .route("/admin/users/:email/role", patch(update_user_role))
        .route("/admin/users/:email/coins", post(adjust_coins))
        .route("/admin/tasks", get(list_tasks))
        .route("/admin/tasks/:id", axum::routing::delete(admin_delete_task))
        .route("/admin/withdrawals", get(list_pending_withdrawals))
        .route("/admin/withdrawals/:id/approve", post(approve_withdrawal))
        .route("/admin/withdrawals/:id/reject", post(reject_withdrawal))
        .route("/admin/stats", get(stats));

    let rate_limiter = Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    let api_routes = Router::new()
        .merge(account_routes)
        .merge(task_routes)
        .merge(submission_routes)
        .merge(payment_routes)
        .merge(withdrawal_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    // Signed by the provider; no bearer token and no per-IP limit.
    let webhook_routes = Router::new().route("/payments/webhook", post(stripe_webhook));

    let health_routes = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(webhook_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
