//! Loan ledger service layer - business logic for the loan lifecycle.
//!
//! Every status transition runs inside a [`DocumentStore::transaction`]
//! closure: the precondition checks and the replacement write land as one
//! compare-and-swap on the loan document, so racing callers get exactly one
//! success and a `Conflict` for everyone else.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::approval::{
    resolve_approvable, Actor, Approvable, ApprovalDecision, ApprovalStatus, Resolution,
};
use crate::employee::Employee;
use crate::error::{LedgerError, LedgerResult};
use crate::loan::{
    CreateLoanRequest, Loan, LoanFilter, MaxLoanOverride, SkipEmiRequest,
};
use crate::month::MonthKey;
use crate::policy::LoanCeilingPolicy;
use crate::schedule;
use crate::store::{DocPath, DocumentStore};

/// Loan service for managing the loan lifecycle
#[derive(Clone)]
pub struct LoanService {
    store: Arc<dyn DocumentStore>,
    policy: Arc<dyn LoanCeilingPolicy>,
}

/// Deserialize a stored loan document, mapping an absent path to `NotFound`
fn parse_loan(doc: Option<Value>, loan_id: Uuid) -> LedgerResult<Loan> {
    let doc = doc.ok_or_else(|| LedgerError::NotFound(format!("no loan with id {}", loan_id)))?;
    Ok(serde_json::from_value(doc)?)
}

impl LoanService {
    /// Create a new loan service instance
    pub fn new(store: Arc<dyn DocumentStore>, policy: Arc<dyn LoanCeilingPolicy>) -> Self {
        Self { store, policy }
    }

    /// Read an employee master record (owned by the surrounding HR system)
    pub async fn get_employee(&self, employee_id: &str) -> LedgerResult<Employee> {
        let doc = self
            .store
            .read(&Employee::path(employee_id)?)
            .await?
            .ok_or_else(|| {
                LedgerError::NotFound(format!("no employee with id {}", employee_id))
            })?;
        Ok(serde_json::from_value(doc)?)
    }

    /// Get loan by ID
    pub async fn get_loan(&self, loan_id: Uuid) -> LedgerResult<Loan> {
        let doc = self.store.read(&Loan::path(loan_id)?).await?;
        parse_loan(doc, loan_id)
    }

    /// List loans, optionally filtered by employee and/or status
    pub async fn list_loans(&self, filter: &LoanFilter) -> LedgerResult<Vec<Loan>> {
        let docs = self.store.list(&DocPath::root("loans")?).await?;
        let mut loans = Vec::with_capacity(docs.len());
        for (_, doc) in docs {
            let loan: Loan = serde_json::from_value(doc)?;
            if let Some(employee_id) = &filter.employee_id {
                if &loan.employee_id != employee_id {
                    continue;
                }
            }
            if let Some(status) = filter.status {
                if loan.status != status {
                    continue;
                }
            }
            loans.push(loan);
        }
        Ok(loans)
    }

    /// Register a new loan request.
    ///
    /// The employee must exist and be active. A request above the standard
    /// ceiling gets a Pending [`MaxLoanOverride`] attached, with the gross
    /// salary and ceiling snapshotted at request time; the loan cannot be
    /// approved until that override resolves.
    pub async fn request_loan(
        &self,
        request: CreateLoanRequest,
        requested_by: &Actor,
    ) -> LedgerResult<Loan> {
        request.validate()?;

        let employee = self.get_employee(&request.employee_id).await?;
        if !employee.is_active() {
            return Err(LedgerError::Validation(format!(
                "employee {} is not active (status '{}')",
                employee.employee_id, employee.status
            )));
        }

        let now = Utc::now();
        let mut loan = Loan::new(
            request.employee_id,
            employee.name.clone(),
            request.amount,
            request.reason,
            request.emi_months,
            requested_by.id().to_string(),
            now,
        );

        let ceiling = self.policy.standard_max(employee.salary.gross_monthly);
        if request.amount > ceiling {
            let ceiling_override = MaxLoanOverride::new(
                request.amount,
                requested_by.id().to_string(),
                loan.reason.clone(),
                employee.salary.gross_monthly,
                ceiling,
                now,
            );
            tracing::info!(
                "Loan {} exceeds ceiling {} for employee {}, override {} attached",
                loan.id,
                ceiling,
                loan.employee_id,
                ceiling_override.id
            );
            loan.max_loan_override = Some(ceiling_override);
        }

        self.store
            .create(&Loan::path(loan.id)?, serde_json::to_value(&loan)?)
            .await?;

        tracing::info!(
            "Loan {} requested by {} for employee {} (amount {})",
            loan.id,
            requested_by.id(),
            loan.employee_id,
            loan.requested_amount
        );
        Ok(loan)
    }

    /// Approve a pending loan and start its EMI schedule.
    ///
    /// Fails with `PrecheckFailed` while an attached ceiling override is
    /// unresolved. On success the approved amount, disbursement date, EMI
    /// amount and opening balance are all written in the same transaction as
    /// the status flip.
    pub async fn approve_loan(
        &self,
        loan_id: Uuid,
        approved_amount: i64,
        actor: &Actor,
    ) -> LedgerResult<Loan> {
        if approved_amount <= 0 {
            return Err(LedgerError::Validation(format!(
                "approved amount must be positive, got {}",
                approved_amount
            )));
        }

        // Ceiling snapshot for the re-check below; employees are read-only
        // here so a pre-transaction read cannot go stale in a harmful way.
        let current = self.get_loan(loan_id).await?;
        let employee = self.get_employee(&current.employee_id).await?;
        let ceiling = self.policy.standard_max(employee.salary.gross_monthly);

        let actor = actor.clone();
        let actor_id = actor.id().to_string();
        let now = Utc::now();

        let doc = self
            .store
            .transaction(
                &Loan::path(loan_id)?,
                Box::new(move |doc| {
                    let mut loan = parse_loan(doc, loan_id)?;

                    if let Some(ceiling_override) = &loan.max_loan_override {
                        if ceiling_override.status != ApprovalStatus::Approved {
                            return Err(LedgerError::PrecheckFailed {
                                override_id: ceiling_override.id,
                            });
                        }
                    } else if approved_amount > ceiling {
                        return Err(LedgerError::Validation(format!(
                            "approved amount {} exceeds the standard ceiling {} and no approved override is attached",
                            approved_amount, ceiling
                        )));
                    }

                    resolve_approvable(&mut loan, ApprovalDecision::Approve, &actor, None, now)?;

                    loan.approved_amount = Some(approved_amount);
                    loan.disbursed_date = Some(now);
                    loan.emi_amount = Some(schedule::emi_amount(approved_amount, loan.emi_months));
                    loan.remaining_balance = approved_amount;

                    Ok(serde_json::to_value(&loan)?)
                }),
            )
            .await?;

        let loan: Loan = serde_json::from_value(doc)?;
        tracing::info!(
            "Loan {} approved by {} at amount {} over {} months",
            loan_id,
            actor_id,
            approved_amount,
            loan.emi_months
        );
        Ok(loan)
    }

    /// Reject a pending loan. Terminal.
    pub async fn reject_loan(
        &self,
        loan_id: Uuid,
        actor: &Actor,
        reason: String,
    ) -> LedgerResult<Loan> {
        let actor = actor.clone();
        let actor_id = actor.id().to_string();
        let now = Utc::now();

        let doc = self
            .store
            .transaction(
                &Loan::path(loan_id)?,
                Box::new(move |doc| {
                    let mut loan = parse_loan(doc, loan_id)?;
                    resolve_approvable(
                        &mut loan,
                        ApprovalDecision::Reject,
                        &actor,
                        Some(reason),
                        now,
                    )?;
                    Ok(serde_json::to_value(&loan)?)
                }),
            )
            .await?;

        tracing::info!("Loan {} rejected by {}", loan_id, actor_id);
        Ok(serde_json::from_value(doc)?)
    }

    /// File a skip-EMI request for one month of the loan.
    ///
    /// One request per month; months already payroll-credited are refused.
    pub async fn request_skip_emi(
        &self,
        loan_id: Uuid,
        month: MonthKey,
        requested_by: &Actor,
        reason: String,
    ) -> LedgerResult<Loan> {
        let requester_id = requested_by.id().to_string();
        let now = Utc::now();

        let doc = self
            .store
            .transaction(
                &Loan::path(loan_id)?,
                Box::new(move |doc| {
                    let mut loan = parse_loan(doc, loan_id)?;

                    if let Some(payment) = loan.emi_payments.get(&month) {
                        if payment.payroll_credited {
                            return Err(LedgerError::Validation(format!(
                                "month {} already has a payroll-credited payment",
                                month
                            )));
                        }
                    }
                    if loan.skip_emi_requests.contains_key(&month) {
                        return Err(LedgerError::Validation(format!(
                            "a skip request already exists for month {}",
                            month
                        )));
                    }

                    loan.skip_emi_requests
                        .insert(month, SkipEmiRequest::new(requester_id, reason, now));
                    Ok(serde_json::to_value(&loan)?)
                }),
            )
            .await?;

        tracing::info!(
            "Skip-EMI requested for loan {} month {} by {}",
            loan_id,
            month,
            requested_by.id()
        );
        Ok(serde_json::from_value(doc)?)
    }

    /// Resolve a pending skip-EMI request for the given month.
    pub async fn resolve_skip_emi(
        &self,
        loan_id: Uuid,
        month: MonthKey,
        decision: ApprovalDecision,
        actor: &Actor,
    ) -> LedgerResult<Loan> {
        let actor = actor.clone();
        let actor_id = actor.id().to_string();
        let now = Utc::now();

        let doc = self
            .store
            .transaction(
                &Loan::path(loan_id)?,
                Box::new(move |doc| {
                    let mut loan = parse_loan(doc, loan_id)?;
                    let skip = loan.skip_emi_requests.get_mut(&month).ok_or_else(|| {
                        LedgerError::NotFound(format!(
                            "no skip request for month {} on loan {}",
                            month, loan_id
                        ))
                    })?;
                    resolve_approvable(skip, decision, &actor, None, now)?;
                    Ok(serde_json::to_value(&loan)?)
                }),
            )
            .await?;

        tracing::info!(
            "Skip-EMI for loan {} month {} resolved {:?} by {}",
            loan_id,
            month,
            decision,
            actor_id
        );
        Ok(serde_json::from_value(doc)?)
    }

    /// Resolve the loan's ceiling override.
    ///
    /// Approving unblocks [`LoanService::approve_loan`]. Rejecting also moves
    /// the loan itself to Rejected in the same transaction; a smaller request
    /// means a new loan.
    pub async fn resolve_max_loan_override(
        &self,
        loan_id: Uuid,
        decision: ApprovalDecision,
        actor: &Actor,
    ) -> LedgerResult<Loan> {
        let actor = actor.clone();
        let actor_id = actor.id().to_string();
        let now = Utc::now();

        let doc = self
            .store
            .transaction(
                &Loan::path(loan_id)?,
                Box::new(move |doc| {
                    let mut loan = parse_loan(doc, loan_id)?;
                    let ceiling_override = loan.max_loan_override.as_mut().ok_or_else(|| {
                        LedgerError::NotFound(format!("loan {} has no ceiling override", loan_id))
                    })?;
                    resolve_approvable(ceiling_override, decision, &actor, None, now)?;

                    if decision == ApprovalDecision::Reject && !loan.status.is_terminal() {
                        loan.apply_resolution(Resolution {
                            decision: ApprovalDecision::Reject,
                            actor: actor.id().to_string(),
                            at: now,
                            comments: Some("loan ceiling override rejected".to_string()),
                        });
                    }

                    Ok(serde_json::to_value(&loan)?)
                }),
            )
            .await?;

        tracing::info!(
            "Ceiling override on loan {} resolved {:?} by {}",
            loan_id,
            decision,
            actor_id
        );
        Ok(serde_json::from_value(doc)?)
    }
}
