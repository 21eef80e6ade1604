//! Bank statement reconciliation allocator
//!
//! Data flows leaf to root: [`EntryCatalog`] → [`project`] → [`SelectionSet`]
//! → [`RunningBalanceCalculator`] → [`VarianceEvaluator`] →
//! [`ReconciliationPoster`]. [`ReconciliationSession`] keeps them together for
//! one bank account and [`ReconciliationDesk`] drives a session against a
//! [`LedgerService`](crate::traits::LedgerService).

pub mod catalog;
pub mod desk;
pub mod poster;
pub mod projection;
pub mod running_balance;
pub mod selection;
pub mod session;
pub mod variance;

pub use catalog::*;
pub use desk::*;
pub use poster::*;
pub use projection::*;
pub use running_balance::*;
pub use selection::*;
pub use session::*;
pub use variance::*;
