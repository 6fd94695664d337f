//! Loan models for the EMI ledger.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::approval::{Approvable, ApprovalDecision, ApprovalStatus, RequestKind, Resolution};
use crate::error::LedgerResult;
use crate::month::MonthKey;
use crate::store::DocPath;

/// Loan status enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Pending,  // Requested, awaiting approval
    Approved, // Disbursed, EMI schedule running
    Rejected, // Refused, terminal
    Repaid,   // Fully recovered through payroll, terminal
}

impl LoanStatus {
    /// Everything but Pending is terminal
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LoanStatus::Pending)
    }
}

/// Loan aggregate. Skip requests, the ceiling override and payments nest
/// inside the loan document, so every multi-field transition is a
/// single-document write.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: Uuid,
    pub employee_id: String,
    pub employee_name: String,
    pub requested_amount: i64,
    pub approved_amount: Option<i64>, // Set exactly once, at approval
    pub reason: String,
    pub request_date: DateTime<Utc>,
    pub emi_months: u32,
    pub emi_amount: Option<i64>, // Derived at approval
    pub status: LoanStatus,
    pub disbursed_date: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub skip_emi_requests: BTreeMap<MonthKey, SkipEmiRequest>,
    pub max_loan_override: Option<MaxLoanOverride>,
    pub remaining_balance: i64,
    #[serde(default)]
    pub emi_payments: BTreeMap<MonthKey, EmiPayment>,
}

impl Loan {
    pub fn new(
        employee_id: String,
        employee_name: String,
        requested_amount: i64,
        reason: String,
        emi_months: u32,
        created_by: String,
        now: DateTime<Utc>,
    ) -> Self {
        Loan {
            id: Uuid::new_v4(),
            employee_id,
            employee_name,
            requested_amount,
            approved_amount: None,
            reason,
            request_date: now,
            emi_months,
            emi_amount: None,
            status: LoanStatus::Pending,
            disbursed_date: None,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            created_by,
            created_at: now,
            skip_emi_requests: BTreeMap::new(),
            max_loan_override: None,
            remaining_balance: 0,
            emi_payments: BTreeMap::new(),
        }
    }

    /// Store path of a loan document
    pub fn path(id: Uuid) -> LedgerResult<DocPath> {
        DocPath::root("loans")?.child(&id.to_string())
    }

    /// Sum of payroll-credited payment amounts
    pub fn credited_total(&self) -> i64 {
        self.emi_payments
            .values()
            .filter(|payment| payment.payroll_credited)
            .map(|payment| payment.amount)
            .sum()
    }
}

impl Approvable for Loan {
    fn kind(&self) -> RequestKind {
        RequestKind::Loan
    }

    fn approval_status(&self) -> ApprovalStatus {
        match self.status {
            LoanStatus::Pending => ApprovalStatus::Pending,
            LoanStatus::Rejected => ApprovalStatus::Rejected,
            LoanStatus::Approved | LoanStatus::Repaid => ApprovalStatus::Approved,
        }
    }

    fn apply_resolution(&mut self, resolution: Resolution) {
        self.status = match resolution.decision {
            ApprovalDecision::Approve => LoanStatus::Approved,
            ApprovalDecision::Reject => LoanStatus::Rejected,
        };
        self.approved_by = Some(resolution.actor);
        self.approved_at = Some(resolution.at);
        if resolution.decision == ApprovalDecision::Reject {
            self.rejection_reason = resolution.comments;
        }
    }
}

/// One-month EMI suspension request, keyed by month inside the loan document
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SkipEmiRequest {
    pub status: ApprovalStatus,
    pub requested_by: String,
    pub requested_at: DateTime<Utc>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub reason: String,
}

impl SkipEmiRequest {
    pub fn new(requested_by: String, reason: String, now: DateTime<Utc>) -> Self {
        SkipEmiRequest {
            status: ApprovalStatus::Pending,
            requested_by,
            requested_at: now,
            approved_by: None,
            approved_at: None,
            reason,
        }
    }
}

impl Approvable for SkipEmiRequest {
    fn kind(&self) -> RequestKind {
        RequestKind::SkipEmi
    }

    fn approval_status(&self) -> ApprovalStatus {
        self.status
    }

    fn apply_resolution(&mut self, resolution: Resolution) {
        self.status = match resolution.decision {
            ApprovalDecision::Approve => ApprovalStatus::Approved,
            ApprovalDecision::Reject => ApprovalStatus::Rejected,
        };
        self.approved_by = Some(resolution.actor);
        self.approved_at = Some(resolution.at);
    }
}

/// Ceiling override attached to a loan whose requested amount exceeds the
/// standard maximum. Snapshots the gross salary and the ceiling at request
/// time so later policy changes don't rewrite history.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MaxLoanOverride {
    pub id: Uuid,
    pub requested_amount: i64,
    pub requested_by: String,
    pub requested_at: DateTime<Utc>,
    pub status: ApprovalStatus,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub reason: String,
    pub employee_gross: i64,
    pub standard_max: i64,
}

impl MaxLoanOverride {
    pub fn new(
        requested_amount: i64,
        requested_by: String,
        reason: String,
        employee_gross: i64,
        standard_max: i64,
        now: DateTime<Utc>,
    ) -> Self {
        MaxLoanOverride {
            id: Uuid::new_v4(),
            requested_amount,
            requested_by,
            requested_at: now,
            status: ApprovalStatus::Pending,
            approved_by: None,
            approved_at: None,
            reason,
            employee_gross,
            standard_max,
        }
    }
}

impl Approvable for MaxLoanOverride {
    fn kind(&self) -> RequestKind {
        RequestKind::MaxLoanOverride
    }

    fn approval_status(&self) -> ApprovalStatus {
        self.status
    }

    fn apply_resolution(&mut self, resolution: Resolution) {
        self.status = match resolution.decision {
            ApprovalDecision::Approve => ApprovalStatus::Approved,
            ApprovalDecision::Reject => ApprovalStatus::Rejected,
        };
        self.approved_by = Some(resolution.actor);
        self.approved_at = Some(resolution.at);
    }
}

/// Payroll-credited installment record, keyed by month inside the loan
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EmiPayment {
    pub month: MonthKey,
    pub amount: i64,
    pub paid_at: DateTime<Utc>,
    pub payroll_credited: bool,
    pub remaining_balance: i64, // Post-payment snapshot
    pub deducted_from: String,  // Payroll batch identifier
}

/// Request to create a new loan
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLoanRequest {
    #[validate(length(min = 1))]
    pub employee_id: String,
    #[validate(range(min = 1))]
    pub amount: i64,
    #[validate(length(min = 1))]
    pub reason: String,
    #[validate(range(min = 1))]
    pub emi_months: u32,
}

/// Query for listing loans
#[derive(Debug, Default, Clone, Deserialize)]
pub struct LoanFilter {
    pub employee_id: Option<String>,
    pub status: Option<LoanStatus>,
}
