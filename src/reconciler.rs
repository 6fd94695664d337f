//! Balance reconciliation against payroll credits.
//!
//! The payroll run reports each deduction it actually made; this module
//! records the credit, recomputes the remaining balance from the credited
//! facts and flips the loan to Repaid when the balance reaches zero. All of
//! that is one transaction, so a crash can never leave a zero balance on a
//! still-Approved loan.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::loan::{EmiPayment, Loan, LoanStatus};
use crate::month::MonthKey;
use crate::store::DocumentStore;

/// Reconciler applying payroll credits to loan balances
#[derive(Clone)]
pub struct BalanceReconciler {
    store: Arc<dyn DocumentStore>,
}

impl BalanceReconciler {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Record a confirmed payroll deduction for one month of a loan.
    ///
    /// Fails with `Conflict` if the month already has a payment recorded
    /// (payroll retries must not double-credit) or the loan is already
    /// Repaid, and with `NotScheduled` if the loan was never approved.
    pub async fn record_payroll_credit(
        &self,
        loan_id: Uuid,
        month: MonthKey,
        amount: i64,
        deducted_from: &str,
    ) -> LedgerResult<Loan> {
        if amount <= 0 {
            return Err(LedgerError::Validation(format!(
                "credited amount must be positive, got {}",
                amount
            )));
        }

        let deducted_from = deducted_from.to_string();
        let now = Utc::now();

        let doc = self
            .store
            .transaction(
                &Loan::path(loan_id)?,
                Box::new(move |doc| {
                    let doc = doc.ok_or_else(|| {
                        LedgerError::NotFound(format!("no loan with id {}", loan_id))
                    })?;
                    let mut loan: Loan = serde_json::from_value(doc)?;

                    if loan.emi_payments.contains_key(&month) {
                        return Err(LedgerError::Conflict(format!(
                            "loan {} already has a payment recorded for month {}",
                            loan_id, month
                        )));
                    }
                    match loan.status {
                        LoanStatus::Approved => {}
                        LoanStatus::Repaid => {
                            return Err(LedgerError::Conflict(format!(
                                "loan {} is already repaid",
                                loan_id
                            )));
                        }
                        LoanStatus::Pending | LoanStatus::Rejected => {
                            return Err(LedgerError::NotScheduled(format!(
                                "loan {} is {:?}, payroll cannot credit it",
                                loan_id, loan.status
                            )));
                        }
                    }

                    let approved = loan.approved_amount.ok_or_else(|| {
                        LedgerError::Store(format!(
                            "approved loan {} is missing approvedAmount",
                            loan_id
                        ))
                    })?;

                    let new_balance = (approved - (loan.credited_total() + amount)).max(0);
                    loan.emi_payments.insert(
                        month,
                        EmiPayment {
                            month,
                            amount,
                            paid_at: now,
                            payroll_credited: true,
                            remaining_balance: new_balance,
                            deducted_from,
                        },
                    );
                    loan.remaining_balance = new_balance;
                    if new_balance == 0 {
                        loan.status = LoanStatus::Repaid;
                    }

                    Ok(serde_json::to_value(&loan)?)
                }),
            )
            .await?;

        let loan: Loan = serde_json::from_value(doc)?;
        if loan.status == LoanStatus::Repaid {
            tracing::info!("Loan {} fully repaid with the {} credit", loan_id, month);
        } else {
            tracing::info!(
                "Payroll credit of {} recorded for loan {} month {}, balance {}",
                amount,
                loan_id,
                month,
                loan.remaining_balance
            );
        }
        Ok(loan)
    }
}
