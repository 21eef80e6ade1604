//! In-memory ledger service implementation for testing

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::traits::*;
use crate::types::*;

/// Failure the next post should run into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectedFailure {
    /// Transport error; nothing reaches the ledger
    Network(String),
    /// Service looks at the batch and refuses it
    Rejection(String),
}

#[derive(Debug, Default)]
struct MemoryLedger {
    accounts: Vec<BankAccount>,
    statuses: HashMap<String, ReconciliationStatus>,
    entries: HashMap<String, Vec<LedgerEntry>>,
    posted: Vec<(String, ReconciliationBatch)>,
    next_failure: Option<InjectedFailure>,
    enforce_balance: bool,
}

/// In-memory ledger service for tests and development
///
/// Posting is all-or-nothing: the whole batch is checked before any entry is
/// marked reconciled.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerService {
    ledger: Arc<RwLock<MemoryLedger>>,
}

impl MemoryLedgerService {
    /// Create a new, empty service
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject batches whose statement balance differs from the resulting reconciled balance
    pub fn with_balance_enforcement(self) -> Self {
        if let Ok(mut ledger) = self.ledger.write() {
            ledger.enforce_balance = true;
        }
        self
    }

    fn read(&self) -> ReconcileResult<RwLockReadGuard<'_, MemoryLedger>> {
        self.ledger
            .read()
            .map_err(|_| ReconcileError::Service("ledger lock poisoned".to_string()))
    }

    fn write(&self) -> ReconcileResult<RwLockWriteGuard<'_, MemoryLedger>> {
        self.ledger
            .write()
            .map_err(|_| ReconcileError::Service("ledger lock poisoned".to_string()))
    }

    /// Register a bank account with its reconciled balance
    pub fn add_account(
        &self,
        account: BankAccount,
        reconciled_balance: BigDecimal,
    ) -> ReconcileResult<()> {
        let mut ledger = self.write()?;
        if ledger.statuses.contains_key(&account.code) {
            return Err(ReconcileError::Validation(format!(
                "Account '{}' already exists",
                account.code
            )));
        }
        ledger.statuses.insert(
            account.code.clone(),
            ReconciliationStatus {
                last_statement_number: account.last_statement_number,
                reconciled_balance,
            },
        );
        ledger.entries.insert(account.code.clone(), Vec::new());
        ledger.accounts.push(account);
        Ok(())
    }

    /// Add an unreconciled entry to an account
    pub fn add_entry(&self, account_code: &str, entry: LedgerEntry) -> ReconcileResult<()> {
        let mut ledger = self.write()?;
        let entries = ledger
            .entries
            .get_mut(account_code)
            .ok_or_else(|| ReconcileError::AccountNotFound(account_code.to_string()))?;
        if entries.iter().any(|existing| existing.id == entry.id) {
            return Err(ReconcileError::Validation(format!(
                "Entry '{}' already exists",
                entry.id
            )));
        }
        entries.push(entry);
        Ok(())
    }

    /// Remove an entry behind the client's back, as another user would
    pub fn remove_entry(&self, account_code: &str, entry_id: &str) -> ReconcileResult<()> {
        let mut ledger = self.write()?;
        let entries = ledger
            .entries
            .get_mut(account_code)
            .ok_or_else(|| ReconcileError::AccountNotFound(account_code.to_string()))?;
        let before = entries.len();
        entries.retain(|entry| entry.id != entry_id);
        if entries.len() == before {
            return Err(ReconcileError::EntryNotFound(entry_id.to_string()));
        }
        Ok(())
    }

    /// Make the next post fail
    pub fn fail_next_post(&self, failure: InjectedFailure) -> ReconcileResult<()> {
        self.write()?.next_failure = Some(failure);
        Ok(())
    }

    /// Batches committed so far, with their account codes
    pub fn posted_batches(&self) -> ReconcileResult<Vec<(String, ReconciliationBatch)>> {
        Ok(self.read()?.posted.clone())
    }
}

#[async_trait]
impl LedgerService for MemoryLedgerService {
    async fn list_bank_accounts(&self) -> ReconcileResult<Vec<BankAccount>> {
        let ledger = self.read()?;
        Ok(ledger
            .accounts
            .iter()
            .map(|account| {
                let mut account = account.clone();
                if let Some(status) = ledger.statuses.get(&account.code) {
                    account.last_statement_number = status.last_statement_number;
                }
                account
            })
            .collect())
    }

    async fn get_reconciliation_status(
        &self,
        account_code: &str,
    ) -> ReconcileResult<ReconciliationStatus> {
        self.read()?
            .statuses
            .get(account_code)
            .cloned()
            .ok_or_else(|| ReconcileError::AccountNotFound(account_code.to_string()))
    }

    async fn get_unreconciled_entries(
        &self,
        account_code: &str,
    ) -> ReconcileResult<Vec<LedgerEntry>> {
        self.read()?
            .entries
            .get(account_code)
            .cloned()
            .ok_or_else(|| ReconcileError::AccountNotFound(account_code.to_string()))
    }

    async fn post_reconciliation(
        &self,
        account_code: &str,
        batch: &ReconciliationBatch,
    ) -> ReconcileResult<PostReply> {
        let mut ledger = self.write()?;

        match ledger.next_failure.take() {
            Some(InjectedFailure::Network(message)) => return Err(ReconcileError::Network(message)),
            Some(InjectedFailure::Rejection(error)) => return Ok(PostReply::Rejected { error }),
            None => {}
        }

        let status = ledger
            .statuses
            .get(account_code)
            .cloned()
            .ok_or_else(|| ReconcileError::AccountNotFound(account_code.to_string()))?;
        let entries = ledger.entries.get(account_code).cloned().unwrap_or_default();

        if let Err(error) = check_batch(&status, &entries, batch, ledger.enforce_balance) {
            return Ok(PostReply::Rejected { error });
        }

        let ids: HashSet<&str> = batch.entry_ids().collect();
        let reconciled_total: BigDecimal = entries
            .iter()
            .filter(|entry| ids.contains(entry.id.as_str()))
            .map(|entry| &entry.value)
            .sum();

        if let Some(entries) = ledger.entries.get_mut(account_code) {
            entries.retain(|entry| !ids.contains(entry.id.as_str()));
        }
        ledger.statuses.insert(
            account_code.to_string(),
            ReconciliationStatus {
                last_statement_number: batch.statement_number,
                reconciled_balance: status.reconciled_balance + reconciled_total,
            },
        );
        ledger
            .posted
            .push((account_code.to_string(), batch.clone()));

        Ok(PostReply::Accepted {
            message: Some(format!(
                "Statement {} reconciled: {} entries marked",
                batch.statement_number,
                batch.len()
            )),
        })
    }
}

fn check_batch(
    status: &ReconciliationStatus,
    entries: &[LedgerEntry],
    batch: &ReconciliationBatch,
    enforce_balance: bool,
) -> Result<(), String> {
    if batch.is_empty() {
        return Err("Reconciliation batch has no entries".to_string());
    }
    if batch.statement_number <= status.last_statement_number {
        return Err(format!(
            "Statement {} has already been reconciled",
            batch.statement_number
        ));
    }

    let known: HashMap<&str, &LedgerEntry> = entries
        .iter()
        .map(|entry| (entry.id.as_str(), entry))
        .collect();
    let mut seen = HashSet::new();
    let mut last_line = 0;
    let mut total = status.reconciled_balance.clone();
    for line in &batch.lines {
        let Some(entry) = known.get(line.entry_id.as_str()) else {
            return Err(format!(
                "Entry {} is no longer unreconciled",
                line.entry_id
            ));
        };
        if !seen.insert(line.entry_id.as_str()) {
            return Err(format!("Entry {} appears twice in the batch", line.entry_id));
        }
        if line.line_number <= last_line {
            return Err(format!(
                "Line numbers must increase: {} follows {}",
                line.line_number, last_line
            ));
        }
        last_line = line.line_number;
        total += &entry.value;
    }

    if enforce_balance && total != batch.statement_balance {
        return Err(format!(
            "Statement balance {} does not match reconciled balance {}",
            batch.statement_balance, total
        ));
    }
    Ok(())
}
