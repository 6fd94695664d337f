//! Engine wiring shared across callers.

use std::sync::Arc;

use crate::config::Config;
use crate::loan_service::LoanService;
use crate::payroll::PayrollPort;
use crate::policy::{GrossMultiplePolicy, LoanCeilingPolicy};
use crate::reconciler::BalanceReconciler;
use crate::store::DocumentStore;

/// Assembled ledger engine: the loan service, the reconciler and the payroll
/// port, all over one document store
#[derive(Clone)]
pub struct LedgerEngine {
    pub loan_service: Arc<LoanService>,
    pub reconciler: Arc<BalanceReconciler>,
    pub payroll: Arc<PayrollPort>,
}

impl LedgerEngine {
    pub fn new(store: Arc<dyn DocumentStore>, policy: Arc<dyn LoanCeilingPolicy>) -> Self {
        let loan_service = Arc::new(LoanService::new(store.clone(), policy));
        let reconciler = Arc::new(BalanceReconciler::new(store));
        let payroll = Arc::new(PayrollPort::new(loan_service.clone(), reconciler.clone()));
        Self {
            loan_service,
            reconciler,
            payroll,
        }
    }

    /// Build an engine with the configured gross-multiple ceiling policy
    pub fn with_config(store: Arc<dyn DocumentStore>, config: &Config) -> Self {
        Self::new(store, Arc::new(GrossMultiplePolicy::from_config(config)))
    }
}
