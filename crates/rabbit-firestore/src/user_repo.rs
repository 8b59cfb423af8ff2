//! User repository. Users are keyed by their normalized email.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{info, warn};

use rabbit_models::{CoinContext, CoinOperationType, CoinTransaction, User, UserRole};

use crate::client::{FirestoreClient, MAX_COMMIT_WRITES};
use crate::coin_transaction_repo::{transaction_write, COIN_TRANSACTIONS};
use crate::error::{FirestoreError, FirestoreResult};
use crate::notification_repo::NOTIFICATIONS;
use crate::types::{
    Document, FieldFilter, StructuredQuery, ToFirestoreValue, Value, Versioned, Write,
};

pub const USERS: &str = "users";

#[derive(Clone)]
pub struct UserRepository {
    client: FirestoreClient,
}

impl UserRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, email: &str) -> FirestoreResult<Option<User>> {
        Ok(self.get_versioned(email).await?.map(|v| v.value))
    }

    /// Fetch a user with the `updateTime` needed for guarded writes.
    pub async fn get_versioned(&self, email: &str) -> FirestoreResult<Option<Versioned<User>>> {
        match self.client.get_document(USERS, email).await? {
            Some(doc) => Ok(Some(Versioned {
                value: document_to_user(&doc)?,
                update_time: doc.update_time.clone(),
            })),
            None => Ok(None),
        }
    }

    /// Create the user and its signup-bonus ledger entry in one commit.
    ///
    /// Fails with a write conflict if the email is already registered.
    pub async fn create_with_signup_bonus(&self, user: &User) -> FirestoreResult<CoinTransaction> {
        let tx = CoinContext::new(CoinOperationType::SignupBonus, "Signup bonus")
            .to_transaction(&user.email, user.coins, user.coins);

        let writes = vec![
            Write::create(
                self.client.document_name(USERS, &user.email),
                user_to_fields(user),
            ),
            transaction_write(&self.client, &tx),
        ];
        self.client.commit(writes).await?;

        info!(email = %user.email, role = %user.role, coins = user.coins, "Registered user");
        Ok(tx)
    }

    /// All users, newest first.
    pub async fn list_all(&self) -> FirestoreResult<Vec<User>> {
        let query = StructuredQuery::collection(USERS).order_by("created_at", true);
        let docs = self.client.run_query("", query).await?;
        Ok(parse_users(&docs))
    }

    /// Workers with the highest balances.
    pub async fn top_workers(&self, limit: i32) -> FirestoreResult<Vec<User>> {
        let query = StructuredQuery::collection(USERS)
            .filter(vec![FieldFilter::eq(
                "role",
                UserRole::Worker.as_str().to_firestore_value(),
            )])
            .order_by("coins", true)
            .limit(limit);
        let docs = self.client.run_query("", query).await?;
        Ok(parse_users(&docs))
    }

    pub async fn update_role(&self, email: &str, role: UserRole) -> FirestoreResult<User> {
        let mut fields = HashMap::new();
        fields.insert("role".to_string(), role.as_str().to_firestore_value());
        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());
        let doc = self
            .client
            .update_document(
                USERS,
                email,
                fields,
                Some(vec!["role".to_string(), "updated_at".to_string()]),
            )
            .await?;
        document_to_user(&doc)
    }

    /// Delete the user together with its ledger history and notifications.
    ///
    /// The user document goes in the last commit, guarded on the version read
    /// before the history was listed, so a balance change racing the delete
    /// fails it with a write conflict and a failed delete can be retried.
    /// Returns the number of history documents removed.
    pub async fn delete_with_history(&self, email: &str) -> FirestoreResult<usize> {
        let user = self
            .get_versioned(email)
            .await?
            .ok_or_else(|| FirestoreError::NotFound(format!("{}/{}", USERS, email)))?;

        let parent = format!("{}/{}", USERS, urlencoding::encode(email));
        let mut names = Vec::new();
        for collection in [COIN_TRANSACTIONS, NOTIFICATIONS] {
            let docs = self
                .client
                .run_query(&parent, StructuredQuery::collection(collection))
                .await?;
            names.extend(docs.into_iter().filter_map(|d| d.name));
        }
        let removed = names.len();

        let mut pending: Vec<Write> = names.into_iter().map(Write::delete).collect();
        pending.push(
            Write::delete(self.client.document_name(USERS, email))
                .if_unchanged_since(user.update_time.as_deref()),
        );
        while !pending.is_empty() {
            let rest = pending.split_off(pending.len().min(MAX_COMMIT_WRITES));
            self.client.commit(pending).await?;
            pending = rest;
        }

        info!(email = %email, history = removed, "Deleted user");
        Ok(removed)
    }
}

/// Balance update guarded on the version the balance was read at.
pub fn balance_write(
    client: &FirestoreClient,
    email: &str,
    coins: i64,
    update_time: Option<&str>,
) -> Write {
    let mut fields = HashMap::new();
    fields.insert("coins".to_string(), coins.to_firestore_value());
    fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());
    Write::patch(client.document_name(USERS, email), fields).if_unchanged_since(update_time)
}

fn parse_users(docs: &[Document]) -> Vec<User> {
    docs.iter()
        .filter_map(|d| match document_to_user(d) {
            Ok(u) => Some(u),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable user document");
                None
            }
        })
        .collect()
}

pub fn user_to_fields(user: &User) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("email".to_string(), user.email.to_firestore_value());
    fields.insert("name".to_string(), user.name.to_firestore_value());
    fields.insert("role".to_string(), user.role.as_str().to_firestore_value());
    fields.insert("image_url".to_string(), user.image_url.to_firestore_value());
    fields.insert("coins".to_string(), user.coins.to_firestore_value());
    fields.insert("created_at".to_string(), user.created_at.to_firestore_value());
    fields.insert("updated_at".to_string(), user.updated_at.to_firestore_value());
    fields
}

pub fn document_to_user(doc: &Document) -> FirestoreResult<User> {
    let role = doc
        .get::<String>("role")
        .map(|r| r.parse::<UserRole>())
        .transpose()
        .map_err(|e| FirestoreError::SerializationError(e.to_string()))?
        .unwrap_or_default();
    let email = doc
        .get::<String>("email")
        .or_else(|| doc.id().map(str::to_string))
        .ok_or_else(|| FirestoreError::invalid_response("user document without email"))?;

    Ok(User {
        email,
        name: doc.get("name").unwrap_or_default(),
        role,
        image_url: doc.get("image_url"),
        coins: doc.get("coins").unwrap_or(0),
        created_at: doc.get("created_at").unwrap_or_else(Utc::now),
        updated_at: doc.get("updated_at").unwrap_or_else(Utc::now),
    })
}
