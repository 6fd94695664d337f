//! Payroll integration port.
//!
//! The external payroll run drives the engine through exactly two calls per
//! pay period: [`PayrollPort::due_amount`] to learn what to deduct for an
//! employee, and [`PayrollPort::credit`] to report each deduction it made.
//! Nothing else in the engine accepts inbound calls from payroll.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::loan::{Loan, LoanFilter, LoanStatus};
use crate::loan_service::LoanService;
use crate::month::MonthKey;
use crate::reconciler::BalanceReconciler;
use crate::schedule;

/// Inbound surface for the external payroll run
#[derive(Clone)]
pub struct PayrollPort {
    loans: Arc<LoanService>,
    reconciler: Arc<BalanceReconciler>,
}

impl PayrollPort {
    pub fn new(loans: Arc<LoanService>, reconciler: Arc<BalanceReconciler>) -> Self {
        Self { loans, reconciler }
    }

    /// Total EMI due for an employee in the given month, summed across all
    /// Approved loans. Loans whose schedule does not cover the month
    /// contribute zero rather than failing the whole sum.
    pub async fn due_amount(&self, employee_id: &str, month: MonthKey) -> LedgerResult<i64> {
        let filter = LoanFilter {
            employee_id: Some(employee_id.to_string()),
            status: Some(LoanStatus::Approved),
        };
        let loans = self.loans.list_loans(&filter).await?;

        let mut total = 0;
        for loan in &loans {
            match schedule::due_for_month(loan, month) {
                Ok(due) => total += due,
                Err(LedgerError::NotScheduled(_)) => {}
                Err(err) => return Err(err),
            }
        }

        tracing::debug!(
            "Due amount for employee {} month {}: {} across {} approved loans",
            employee_id,
            month,
            total,
            loans.len()
        );
        Ok(total)
    }

    /// Report a confirmed payroll deduction for one loan
    pub async fn credit(
        &self,
        loan_id: Uuid,
        month: MonthKey,
        amount: i64,
        deducted_from: &str,
    ) -> LedgerResult<Loan> {
        self.reconciler
            .record_payroll_credit(loan_id, month, amount, deducted_from)
            .await
    }
}
