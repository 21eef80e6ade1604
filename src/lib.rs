//! # Bank Reconciliation Core
//!
//! The allocation and validation engine behind a bank statement
//! reconciliation screen. An operator picks outstanding ledger entries of one
//! bank account, watches the running balance and the variance against the
//! statement, and commits the selection as one atomic batch.
//!
//! ## Features
//!
//! - **Projection**: filter and stable sort of the entry catalog, without touching the selection
//! - **Selection**: insertion-ordered set with O(1) membership and order lookups
//! - **Running balance**: cumulative balance and `10, 20, 30…` line numbers in selection order
//! - **Variance**: signed statement variance with a half-penny tolerance
//! - **Posting**: `Idle → Validating → Posting → Posted | Failed` with correlation tokens
//! - **Service abstraction**: ledger-agnostic design with the [`LedgerService`] trait
//!
//! ## Quick Start
//!
//! ```rust
//! use bank_reconciliation_core::{
//!     BankAccount, LedgerEntry, ReconciliationConfig, ReconciliationSession,
//!     ReconciliationStatus,
//! };
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//!
//! let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
//! let mut session = ReconciliationSession::new(
//!     BankAccount::new("1200", "Current account"),
//!     ReconciliationStatus::default(),
//!     vec![LedgerEntry::new("1", date, BigDecimal::from(25))],
//!     &ReconciliationConfig::default(),
//! )
//! .unwrap();
//!
//! session.toggle("1").unwrap();
//! session.set_statement_balance(BigDecimal::from(25));
//! assert!(session.variance().is_balanced);
//! ```

pub mod config;
pub mod reconciliation;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::*;
pub use reconciliation::*;
pub use traits::*;
pub use types::*;

use std::sync::Once;

static INIT: Once = Once::new();

/// Initializes tracing and emits a startup log
pub fn init() {
    INIT.call_once(|| {
        utils::init_tracing();
        tracing::info!("bank reconciliation core initialized");
    });
}
