//! Validation utilities

use chrono::NaiveDate;

use crate::types::*;

/// Validate that an account code is valid
pub fn validate_account_code(code: &str) -> ReconcileResult<()> {
    if code.trim().is_empty() {
        return Err(ReconcileError::Validation(
            "Account code cannot be empty".to_string(),
        ));
    }

    if code.len() > 50 {
        return Err(ReconcileError::Validation(
            "Account code cannot exceed 50 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate an entry received from the ledger service
pub fn validate_entry(entry: &LedgerEntry) -> ReconcileResult<()> {
    if entry.id.trim().is_empty() {
        return Err(ReconcileError::Validation(
            "Entry identifier cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validated header fields ready to go into a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedHeader {
    pub statement_number: u32,
    pub statement_date: NaiveDate,
    pub reconciliation_date: NaiveDate,
}

/// Validate a statement header against the account being reconciled
///
/// The statement number falls back to the account's last statement + 1 and
/// the reconciliation date falls back to the statement date.
pub fn validate_statement_header(
    header: &StatementHeader,
    account: &BankAccount,
) -> ReconcileResult<ResolvedHeader> {
    let statement_date = header.statement_date.ok_or_else(|| {
        ReconcileError::Validation("Statement date is required".to_string())
    })?;

    let statement_number = header.resolve_statement_number(account)?;
    if statement_number <= account.last_statement_number {
        return Err(ReconcileError::Validation(format!(
            "Statement number {} must be greater than the last posted statement {}",
            statement_number, account.last_statement_number
        )));
    }

    Ok(ResolvedHeader {
        statement_number,
        statement_date,
        reconciliation_date: header.reconciliation_date.unwrap_or(statement_date),
    })
}
