//! Account registration and role checks.

use tracing::info;

use rabbit_firestore::{FirestoreError, UserRepository};
use rabbit_models::{User, UserRole};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};

const EMAIL_IN_USE: &str = "Email already in use";

/// Result of a Google sign-in.
#[derive(Debug, Clone)]
pub enum GoogleLogin {
    Existing(User),
    Created(User),
}

#[derive(Clone)]
pub struct UserService {
    users: UserRepository,
}

impl UserService {
    pub fn new(users: UserRepository) -> Self {
        Self { users }
    }

    /// Register the caller with a self-chosen role.
    pub async fn register(
        &self,
        caller: &AuthUser,
        name: &str,
        role: UserRole,
        image_url: Option<String>,
    ) -> ApiResult<User> {
        if role == UserRole::Admin {
            return Err(ApiError::forbidden("Admin role cannot be self-assigned"));
        }
        if self.users.get(&caller.email).await?.is_some() {
            return Err(ApiError::bad_request(EMAIL_IN_USE));
        }

        let user = User::new(&caller.email, name, role, image_url);
        self.create(&user).await?;
        Ok(user)
    }

    /// Sign in with Google, creating a Worker account on first use.
    pub async fn google_login(
        &self,
        caller: &AuthUser,
        name: &str,
        image_url: Option<String>,
    ) -> ApiResult<GoogleLogin> {
        if let Some(existing) = self.users.get(&caller.email).await? {
            return Ok(GoogleLogin::Existing(existing));
        }

        let user = User::new(&caller.email, name, UserRole::Worker, image_url);
        match self.create(&user).await {
            Ok(()) => Ok(GoogleLogin::Created(user)),
            // Lost a race with a concurrent sign-in for the same account.
            Err(ApiError::BadRequest(_)) => self
                .users
                .get(&caller.email)
                .await?
                .map(GoogleLogin::Existing)
                .ok_or_else(|| ApiError::internal("account vanished during sign-in")),
            Err(e) => Err(e),
        }
    }

    async fn create(&self, user: &User) -> ApiResult<()> {
        match self.users.create_with_signup_bonus(user).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_write_conflict() => Err(ApiError::bad_request(EMAIL_IN_USE)),
            Err(e) => Err(e.into()),
        }
    }

    /// Load the caller's account; unregistered callers are forbidden.
    pub async fn require_user(&self, email: &str) -> ApiResult<User> {
        self.users
            .get(email)
            .await?
            .ok_or_else(|| ApiError::forbidden("Account is not registered"))
    }

    /// Load the caller's account and check it holds one of `roles`.
    pub async fn require_role(&self, email: &str, roles: &[UserRole]) -> ApiResult<User> {
        let user = self.require_user(email).await?;
        if roles.contains(&user.role) {
            Ok(user)
        } else {
            info!(email = %email, role = %user.role, "Role check failed");
            Err(ApiError::forbidden(format!(
                "{} access required",
                roles
                    .iter()
                    .map(UserRole::as_str)
                    .collect::<Vec<_>>()
                    .join(" or ")
            )))
        }
    }

    pub async fn require_admin(&self, email: &str) -> ApiResult<User> {
        self.require_role(email, &[UserRole::Admin]).await
    }

    /// Look up any user, or 404.
    pub async fn get(&self, email: &str) -> ApiResult<User> {
        self.users
            .get(email)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))
    }

    pub async fn top_workers(&self, limit: i32) -> ApiResult<Vec<User>> {
        Ok(self.users.top_workers(limit).await?)
    }

    pub async fn list_all(&self) -> ApiResult<Vec<User>> {
        Ok(self.users.list_all().await?)
    }

    pub async fn update_role(&self, email: &str, role: UserRole) -> ApiResult<User> {
        match self.users.update_role(email, role).await {
            Ok(user) => Ok(user),
            Err(FirestoreError::NotFound(_)) => Err(ApiError::not_found("User not found")),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete an account and its ledger history, so a later registration
    /// with the same email starts from a clean ledger.
    pub async fn delete(&self, email: &str) -> ApiResult<usize> {
        match self.users.delete_with_history(email).await {
            Ok(removed) => Ok(removed),
            Err(FirestoreError::NotFound(_)) => Err(ApiError::not_found("User not found")),
            Err(e) if e.is_write_conflict() => Err(ApiError::Conflict(
                "The account changed while it was being deleted, please retry".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }
}
