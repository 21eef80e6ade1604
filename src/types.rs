//! Core types and data structures for bank statement reconciliation

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Bank account as reported by the ledger service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccount {
    /// Account code, unique within the ledger
    pub code: String,
    /// Human-readable description
    pub description: String,
    /// Number of the last statement posted against this account (0 if none)
    #[serde(default)]
    pub last_statement_number: u32,
}

impl BankAccount {
    /// Create a new bank account with no posted statements
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            last_statement_number: 0,
        }
    }

    /// The statement number a new reconciliation defaults to
    pub fn next_statement_number(&self) -> ReconcileResult<u32> {
        self.last_statement_number.checked_add(1).ok_or_else(|| {
            ReconcileError::Validation(format!(
                "Statement number {} cannot be followed by another statement",
                self.last_statement_number
            ))
        })
    }
}

/// Reconciliation status of a bank account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationStatus {
    pub last_statement_number: u32,
    /// Balance of everything reconciled so far; the opening balance of the next statement
    pub reconciled_balance: BigDecimal,
}

impl Default for ReconciliationStatus {
    fn default() -> Self {
        Self {
            last_statement_number: 0,
            reconciled_balance: BigDecimal::from(0),
        }
    }
}

/// Unreconciled ledger entry of a bank account
///
/// Entries are created by the ledger service and never mutated here; they
/// are only referenced by identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    /// Identifier, unique within the account
    pub id: String,
    /// Transaction date
    pub date: NaiveDate,
    /// Signed value: negative for payments, positive for receipts
    pub value: BigDecimal,
    /// Free-text reference (cheque number, payee, ...)
    #[serde(default)]
    pub reference: String,
    /// Free-text comment
    #[serde(default)]
    pub comment: String,
    /// Cashbook type code
    #[serde(default)]
    pub cashbook_type: String,
}

impl LedgerEntry {
    /// Create a new entry with empty reference, comment and cashbook type
    pub fn new(id: impl Into<String>, date: NaiveDate, value: BigDecimal) -> Self {
        Self {
            id: id.into(),
            date,
            value,
            reference: String::new(),
            comment: String::new(),
            cashbook_type: String::new(),
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = reference.into();
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn with_cashbook_type(mut self, cashbook_type: impl Into<String>) -> Self {
        self.cashbook_type = cashbook_type.into();
        self
    }

    /// Whether this entry is a payment (money out)
    pub fn is_payment(&self) -> bool {
        self.value < BigDecimal::from(0)
    }
}

/// Operator-supplied description of the bank statement being reconciled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementHeader {
    /// Explicit statement number; `None` means "previous + 1"
    pub statement_number: Option<u32>,
    pub statement_date: Option<NaiveDate>,
    /// Closing balance printed on the bank statement
    pub statement_balance: BigDecimal,
    /// Date the reconciliation is recorded; defaults to the statement date
    pub reconciliation_date: Option<NaiveDate>,
}

impl Default for StatementHeader {
    fn default() -> Self {
        Self {
            statement_number: None,
            statement_date: None,
            statement_balance: BigDecimal::from(0),
            reconciliation_date: None,
        }
    }
}

impl StatementHeader {
    /// Resolve the statement number against the account's last posted statement
    pub fn resolve_statement_number(&self, account: &BankAccount) -> ReconcileResult<u32> {
        match self.statement_number {
            Some(number) => Ok(number),
            None => account.next_statement_number(),
        }
    }
}

/// One line of a reconciliation batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchLine {
    pub entry_id: String,
    pub line_number: u32,
}

/// The atomic "mark reconciled" payload sent to the ledger service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationBatch {
    /// Lines in selection order with strictly increasing line numbers
    #[serde(rename = "entries")]
    pub lines: Vec<BatchLine>,
    pub statement_number: u32,
    pub statement_date: NaiveDate,
    pub reconciliation_date: NaiveDate,
    pub statement_balance: BigDecimal,
}

impl ReconciliationBatch {
    pub fn entry_ids(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|line| line.entry_id.as_str())
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Reply of the ledger service to a posted batch
///
/// On the wire this is `{ success: true, message }` or
/// `{ success: false, error }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PostReplyWire", into = "PostReplyWire")]
pub enum PostReply {
    /// Batch committed; optional confirmation for the operator
    Accepted { message: Option<String> },
    /// Batch refused by the service; nothing was committed
    Rejected { error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PostReplyWire {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<PostReplyWire> for PostReply {
    fn from(wire: PostReplyWire) -> Self {
        if wire.success {
            PostReply::Accepted {
                message: wire.message,
            }
        } else {
            PostReply::Rejected {
                error: wire
                    .error
                    .or(wire.message)
                    .unwrap_or_else(|| "Reconciliation rejected by the ledger service".to_string()),
            }
        }
    }
}

impl From<PostReply> for PostReplyWire {
    fn from(reply: PostReply) -> Self {
        match reply {
            PostReply::Accepted { message } => PostReplyWire {
                success: true,
                message,
                error: None,
            },
            PostReply::Rejected { error } => PostReplyWire {
                success: false,
                message: None,
                error: Some(error),
            },
        }
    }
}

/// Errors that can occur while reconciling
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("No bank account selected")]
    NoAccountSelected,
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Entry not found: {0}")]
    EntryNotFound(String),
    #[error("A reconciliation post is already in progress")]
    PostInProgress,
    #[error("Network error: {0}")]
    Network(String),
    #[error("{0}")]
    Rejected(String),
    #[error("Service error: {0}")]
    Service(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ReconcileError {
    /// Whether the error was raised locally before anything was sent
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ReconcileError::Validation(_)
                | ReconcileError::NoAccountSelected
                | ReconcileError::EntryNotFound(_)
                | ReconcileError::PostInProgress
        )
    }
}

impl From<serde_json::Error> for ReconcileError {
    fn from(err: serde_json::Error) -> Self {
        ReconcileError::Config(err.to_string())
    }
}

impl From<std::io::Error> for ReconcileError {
    fn from(err: std::io::Error) -> Self {
        ReconcileError::Config(err.to_string())
    }
}

/// Result type for reconciliation operations
pub type ReconcileResult<T> = Result<T, ReconcileError>;
