//! Cumulative balance and line numbering over the selection

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::catalog::EntryCatalog;
use super::selection::SelectionSet;
use crate::config::DEFAULT_LINE_NUMBER_STEP;
use crate::types::{BatchLine, ReconcileError, ReconcileResult};

/// Running balance of one selected entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningBalanceEntry {
    pub entry_id: String,
    pub line_number: u32,
    pub value: BigDecimal,
    /// Opening balance plus every selected value up to and including this one
    pub balance: BigDecimal,
}

/// Result of one recompute, in selection order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunningBalances {
    opening_balance: BigDecimal,
    lines: Vec<RunningBalanceEntry>,
    by_id: HashMap<String, usize>,
}

impl RunningBalances {
    pub fn opening_balance(&self) -> &BigDecimal {
        &self.opening_balance
    }

    pub fn lines(&self) -> &[RunningBalanceEntry] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Balance after `id`, or `None` when the entry is not selected
    pub fn balance_for(&self, id: &str) -> Option<&BigDecimal> {
        self.get(id).map(|line| &line.balance)
    }

    pub fn line_number_for(&self, id: &str) -> Option<u32> {
        self.get(id).map(|line| line.line_number)
    }

    pub fn get(&self, id: &str) -> Option<&RunningBalanceEntry> {
        self.by_id.get(id).map(|&index| &self.lines[index])
    }

    /// Balance after the last selected entry; the opening balance when nothing is selected
    pub fn closing_balance(&self) -> BigDecimal {
        self.lines
            .last()
            .map(|line| line.balance.clone())
            .unwrap_or_else(|| self.opening_balance.clone())
    }

    /// Sum of selected values, excluding the opening balance
    pub fn selected_total(&self) -> BigDecimal {
        self.lines.iter().map(|line| &line.value).sum()
    }

    /// Batch lines in selection order
    pub fn batch_lines(&self) -> Vec<BatchLine> {
        self.lines
            .iter()
            .map(|line| BatchLine {
                entry_id: line.entry_id.clone(),
                line_number: line.line_number,
            })
            .collect()
    }
}

/// Walks the selection once and numbers it in steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunningBalanceCalculator {
    line_number_step: u32,
}

impl Default for RunningBalanceCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_LINE_NUMBER_STEP)
    }
}

impl RunningBalanceCalculator {
    pub fn new(line_number_step: u32) -> Self {
        Self {
            line_number_step: line_number_step.max(1),
        }
    }

    pub fn compute(
        &self,
        opening_balance: &BigDecimal,
        selection: &SelectionSet,
        catalog: &EntryCatalog,
    ) -> ReconcileResult<RunningBalances> {
        let mut lines = Vec::with_capacity(selection.len());
        let mut by_id = HashMap::with_capacity(selection.len());
        let mut balance = opening_balance.clone();

        for id in selection.ordered_ids() {
            let Some(entry) = catalog.get(id) else {
                tracing::warn!(entry_id = id, "selected entry missing from catalog, skipped");
                continue;
            };
            let line_number = u32::try_from(lines.len() + 1)
                .ok()
                .and_then(|ordinal| ordinal.checked_mul(self.line_number_step))
                .ok_or_else(|| {
                    ReconcileError::Validation(format!(
                        "Selection of {} entries exceeds the line numbers available at step {}",
                        lines.len() + 1,
                        self.line_number_step
                    ))
                })?;
            balance += &entry.value;
            by_id.insert(entry.id.clone(), lines.len());
            lines.push(RunningBalanceEntry {
                entry_id: entry.id.clone(),
                line_number,
                value: entry.value.clone(),
                balance: balance.clone(),
            });
        }

        tracing::debug!(
            lines = lines.len(),
            closing = %balance,
            "running balance recomputed"
        );

        Ok(RunningBalances {
            opening_balance: opening_balance.clone(),
            lines,
            by_id,
        })
    }
}
