//! Application state.

use std::sync::Arc;

use tracing::{info, warn};

use rabbit_firestore::{CoinLedger, FirestoreClient, NotificationRepository, UserRepository};
use rabbit_payments::{PaymentError, StripeClient};

use crate::auth::JwksCache;
use crate::config::ApiConfig;
use crate::services::{PurchaseService, TaskService, UserService, WithdrawalService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub firestore: Arc<FirestoreClient>,
    pub jwks: Arc<JwksCache>,
    pub ledger: CoinLedger,
    pub user_service: UserService,
    pub task_service: TaskService,
    pub withdrawal_service: WithdrawalService,
    pub purchase_service: PurchaseService,
    pub notifications: NotificationRepository,
}

impl AppState {
    /// Create new application state from the environment.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let firestore = FirestoreClient::from_env().await?;
        let jwks = JwksCache::new(firestore.project_id()).await?;

        let stripe = match StripeClient::from_env() {
            Ok(client) => Some(client),
            Err(PaymentError::NotConfigured(reason)) => {
                warn!(reason = %reason, "Card payments disabled");
                None
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self::from_parts(config, firestore, jwks, stripe))
    }

    /// Assemble state from already-built clients.
    pub fn from_parts(
        config: ApiConfig,
        firestore: FirestoreClient,
        jwks: JwksCache,
        stripe: Option<StripeClient>,
    ) -> Self {
        let ledger = CoinLedger::new(firestore.clone());

        info!(
            project_id = %firestore.project_id(),
            payments_enabled = stripe.is_some(),
            "Application state ready"
        );

        Self {
            config,
            user_service: UserService::new(UserRepository::new(firestore.clone())),
            task_service: TaskService::new(firestore.clone(), ledger.clone()),
            withdrawal_service: WithdrawalService::new(firestore.clone(), ledger.clone()),
            purchase_service: PurchaseService::new(firestore.clone(), ledger.clone(), stripe),
            notifications: NotificationRepository::new(firestore.clone()),
            ledger,
            firestore: Arc::new(firestore),
            jwks: Arc::new(jwks),
        }
    }
}
