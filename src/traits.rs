//! Traits for the ledger service seam

use async_trait::async_trait;

use crate::types::*;

/// Remote ledger service the reconciliation engine reads from and posts to
///
/// The wire format is owned by the service; implementations translate it
/// into these shapes. A transport failure (timeout, lost connection) is an
/// `Err(ReconcileError::Network)`, while a batch the service looked at and
/// refused is `Ok(PostReply::Rejected)`.
#[async_trait]
pub trait LedgerService: Send + Sync {
    /// List the bank accounts that can be reconciled
    async fn list_bank_accounts(&self) -> ReconcileResult<Vec<BankAccount>>;

    /// Get the last statement number and reconciled balance of an account
    async fn get_reconciliation_status(
        &self,
        account_code: &str,
    ) -> ReconcileResult<ReconciliationStatus>;

    /// Get the entries of an account not yet marked reconciled
    async fn get_unreconciled_entries(&self, account_code: &str)
        -> ReconcileResult<Vec<LedgerEntry>>;

    /// Commit a batch atomically: either every line is marked reconciled or none is
    async fn post_reconciliation(
        &self,
        account_code: &str,
        batch: &ReconciliationBatch,
    ) -> ReconcileResult<PostReply>;
}
