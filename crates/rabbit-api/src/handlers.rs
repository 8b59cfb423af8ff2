//! Request handlers.

pub mod admin;
pub mod health;
pub mod notifications;
pub mod payments;
pub mod submissions;
pub mod tasks;
pub mod users;
pub mod withdrawals;

pub use health::*;
pub use notifications::*;
pub use payments::*;
pub use submissions::*;
pub use tasks::*;
pub use users::*;
pub use withdrawals::*;
