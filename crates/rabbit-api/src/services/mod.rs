//! Business logic services.

pub mod purchase;
pub mod task;
pub mod user;
pub mod withdrawal;

pub use purchase::{CreditOutcome, PurchaseService};
pub use task::{NewTask, TaskService};
pub use user::{GoogleLogin, UserService};
pub use withdrawal::WithdrawalService;
