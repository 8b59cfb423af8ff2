//! Coin purchases through card payment intents.
//!
//! Confirmation from the client and the provider's webhook both land in
//! [`PurchaseService::credit`]. The payment record shares the intent's id
//! and is created with an `exists=false` precondition in the same commit as
//! the balance change, so an intent is credited at most once.

use tracing::{info, warn};

use rabbit_firestore::{CoinLedger, FirestoreClient, LedgerError, LedgerPlan, PaymentRepository};
use rabbit_models::{CoinContext, CoinOperationType, CoinPackage, Payment, User};
use rabbit_payments::{construct_event, CreatePaymentIntent, PaymentIntent, StripeClient, WebhookEvent};

use crate::error::{ApiError, ApiResult};
use crate::metrics;

pub const METADATA_EMAIL: &str = "email";
pub const METADATA_PACKAGE: &str = "package_id";

/// What crediting an intent did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreditOutcome {
    Credited { coins: i64, balance: i64 },
    AlreadyCredited,
}

#[derive(Clone)]
pub struct PurchaseService {
    ledger: CoinLedger,
    payments: PaymentRepository,
    stripe: Option<StripeClient>,
}

impl PurchaseService {
    pub fn new(client: FirestoreClient, ledger: CoinLedger, stripe: Option<StripeClient>) -> Self {
        Self {
            payments: PaymentRepository::new(client),
            ledger,
            stripe,
        }
    }

    pub fn payments(&self) -> &PaymentRepository {
        &self.payments
    }

    pub fn is_enabled(&self) -> bool {
        self.stripe.is_some()
    }

    fn stripe(&self) -> ApiResult<&StripeClient> {
        self.stripe
            .as_ref()
            .ok_or_else(|| ApiError::Unavailable("Card payments are not configured".to_string()))
    }

    /// Open a payment intent for `package_id` on behalf of `buyer`.
    pub async fn create_intent(
        &self,
        buyer: &User,
        package_id: &str,
    ) -> ApiResult<(PaymentIntent, &'static CoinPackage)> {
        let package = CoinPackage::find(package_id)
            .ok_or_else(|| ApiError::bad_request(format!("Unknown coin package: {}", package_id)))?;
        let stripe = self.stripe()?;

        let request = CreatePaymentIntent {
            amount_cents: package.price_cents,
            currency: stripe.config().currency.clone(),
            metadata: vec![
                (METADATA_EMAIL.to_string(), buyer.email.clone()),
                (METADATA_PACKAGE.to_string(), package.id.to_string()),
            ],
        };
        let intent = stripe.create_payment_intent(&request).await?;
        metrics::record_payment_event("intent_created");
        Ok((intent, package))
    }

    /// Credit a succeeded intent the caller paid for.
    pub async fn confirm(&self, buyer: &User, intent_id: &str) -> ApiResult<CreditOutcome> {
        let intent = self.stripe()?.retrieve_payment_intent(intent_id).await?;

        if intent.metadata_value(METADATA_EMAIL) != Some(buyer.email.as_str()) {
            warn!(intent_id = %intent_id, caller = %buyer.email, "Payment intent belongs to another account");
            return Err(ApiError::forbidden("Payment belongs to another account"));
        }
        if !intent.succeeded() {
            return Err(ApiError::bad_request(format!(
                "Payment has not succeeded (status: {:?})",
                intent.status
            )));
        }

        self.credit(&intent).await
    }

    /// Verify and apply a webhook delivery.
    ///
    /// Returns `None` for event types that carry no coin movement.
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> ApiResult<(WebhookEvent, Option<CreditOutcome>)> {
        let secret = self
            .stripe()?
            .config()
            .webhook_secret
            .clone()
            .ok_or_else(|| ApiError::Unavailable("Webhook secret is not configured".to_string()))?;

        let event = construct_event(payload, signature, &secret)?;
        if event.event_type != WebhookEvent::PAYMENT_INTENT_SUCCEEDED {
            return Ok((event, None));
        }

        let intent = event
            .payment_intent()
            .ok_or_else(|| ApiError::bad_request("Event does not carry a payment intent"))?;
        let outcome = self.credit(&intent).await?;
        Ok((event, Some(outcome)))
    }

    /// Credit the package bought by `intent`, at most once per intent.
    pub async fn credit(&self, intent: &PaymentIntent) -> ApiResult<CreditOutcome> {
        let email = intent
            .metadata_value(METADATA_EMAIL)
            .ok_or_else(|| ApiError::bad_request("Payment intent has no buyer email"))?;
        let package = intent
            .metadata_value(METADATA_PACKAGE)
            .and_then(CoinPackage::find)
            .ok_or_else(|| ApiError::bad_request("Payment intent has no valid coin package"))?;
        if intent.amount != package.price_cents {
            warn!(
                intent_id = %intent.id,
                amount = intent.amount,
                expected = package.price_cents,
                "Payment amount does not match package price"
            );
            return Err(ApiError::bad_request("Payment amount does not match package price"));
        }

        let payments = &self.payments;
        let result = self
            .ledger
            .transact(email, move |_| async move {
                if payments.get(&intent.id).await?.is_some() {
                    return Err(LedgerError::AlreadyApplied(intent.id.clone()));
                }
                let payment = Payment::new(&intent.id, email, package, &intent.currency);
                let context = CoinContext::new(
                    CoinOperationType::Purchase,
                    format!("Purchased {} coins ({})", package.coins, package.id),
                )
                .with_reference(&intent.id);

                Ok(LedgerPlan::new(package.coins, context).with_write(payments.create_write(&payment)))
            })
            .await;

        match result {
            Ok(receipt) => {
                metrics::record_payment_event("credited");
                info!(
                    intent_id = %intent.id,
                    email = %email,
                    coins = package.coins,
                    balance = receipt.balance,
                    "Coins purchased"
                );
                Ok(CreditOutcome::Credited {
                    coins: package.coins,
                    balance: receipt.balance,
                })
            }
            Err(LedgerError::AlreadyApplied(_)) => {
                metrics::record_payment_event("duplicate");
                info!(intent_id = %intent.id, "Payment intent already credited");
                Ok(CreditOutcome::AlreadyCredited)
            }
            Err(e) => Err(e.into()),
        }
    }
}
