//! Statement balance versus reconciled total

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::config::ReconciliationConfig;

/// Outcome of comparing the statement against the selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceReport {
    pub statement_balance: BigDecimal,
    pub reconciled_total: BigDecimal,
    /// `statement_balance - reconciled_total`
    pub variance: BigDecimal,
    pub is_balanced: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarianceEvaluator {
    tolerance: BigDecimal,
}

impl Default for VarianceEvaluator {
    fn default() -> Self {
        Self::new(ReconciliationConfig::default_balance_tolerance())
    }
}

impl VarianceEvaluator {
    pub fn new(tolerance: BigDecimal) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> &BigDecimal {
        &self.tolerance
    }

    /// Balanced iff `|statement_balance - reconciled_total| < tolerance`
    pub fn evaluate(
        &self,
        statement_balance: &BigDecimal,
        reconciled_total: &BigDecimal,
    ) -> VarianceReport {
        let variance = statement_balance - reconciled_total;
        let is_balanced = variance.abs() < self.tolerance;
        VarianceReport {
            statement_balance: statement_balance.clone(),
            reconciled_total: reconciled_total.clone(),
            variance,
            is_balanced,
        }
    }
}
