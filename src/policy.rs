//! Loan ceiling policy.
//!
//! The standard maximum is an organizational policy, injected rather than
//! baked in. The engine only ever compares a requested amount against
//! whatever the configured policy returns for the employee's gross salary.

use crate::config::Config;

/// Policy ceiling on loan principal relative to gross monthly salary
pub trait LoanCeilingPolicy: Send + Sync {
    /// The standard maximum loan amount for an employee with the given gross
    /// monthly salary. Requests above this require a ceiling override.
    fn standard_max(&self, gross_monthly: i64) -> i64;
}

/// Ceiling at a fixed multiple of gross monthly salary
#[derive(Debug, Clone)]
pub struct GrossMultiplePolicy {
    multiple: i64,
}

impl GrossMultiplePolicy {
    pub fn new(multiple: u32) -> Self {
        GrossMultiplePolicy {
            multiple: multiple as i64,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.standard_max_multiple)
    }
}

impl LoanCeilingPolicy for GrossMultiplePolicy {
    fn standard_max(&self, gross_monthly: i64) -> i64 {
        gross_monthly.saturating_mul(self.multiple).max(0)
    }
}
