//! Engine configuration

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::reconciliation::{SortDirection, SortField};
use crate::types::*;

/// Default line number increment within a batch
pub const DEFAULT_LINE_NUMBER_STEP: u32 = 10;

/// Tunables for a reconciliation session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    /// Largest absolute variance still considered balanced (exclusive)
    #[serde(default = "ReconciliationConfig::default_balance_tolerance")]
    pub balance_tolerance: BigDecimal,
    #[serde(default = "ReconciliationConfig::default_line_number_step")]
    pub line_number_step: u32,
    #[serde(default)]
    pub default_sort: SortField,
    #[serde(default)]
    pub default_direction: SortDirection,
    /// Refuse to post while the variance is non-zero
    #[serde(default)]
    pub require_balanced_post: bool,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            balance_tolerance: Self::default_balance_tolerance(),
            line_number_step: Self::default_line_number_step(),
            default_sort: SortField::default(),
            default_direction: SortDirection::default(),
            require_balanced_post: false,
        }
    }
}

impl ReconciliationConfig {
    /// Half a minor currency unit
    pub fn default_balance_tolerance() -> BigDecimal {
        BigDecimal::from(5) / BigDecimal::from(1000)
    }

    fn default_line_number_step() -> u32 {
        DEFAULT_LINE_NUMBER_STEP
    }

    /// Parse a configuration from JSON, filling missing fields with defaults
    pub fn from_json_str(data: &str) -> ReconcileResult<Self> {
        let config: Self = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file; a missing file yields the defaults
    pub fn load(path: &Path) -> ReconcileResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no reconciliation config, using defaults");
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn validate(&self) -> ReconcileResult<()> {
        if self.balance_tolerance <= BigDecimal::from(0) {
            return Err(ReconcileError::Config(
                "Balance tolerance must be positive".to_string(),
            ));
        }
        if self.line_number_step == 0 {
            return Err(ReconcileError::Config(
                "Line number step must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
