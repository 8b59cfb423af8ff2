//! Card payments for coin purchases.
//!
//! A thin REST client for payment intents plus verification of signed
//! webhook deliveries.

pub mod client;
pub mod config;
pub mod error;
pub mod types;
pub mod webhook;

pub use client::StripeClient;
pub use config::StripeConfig;
pub use error::{PaymentError, PaymentResult};
pub use types::{CreatePaymentIntent, PaymentIntent, PaymentIntentStatus, WebhookEvent};
pub use webhook::{construct_event, sign_payload, verify_signature};
