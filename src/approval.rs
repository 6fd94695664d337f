//! Shared two-outcome approval workflow.
//!
//! Loans, skip-EMI exceptions and ceiling overrides all move through the
//! same Pending → Approved/Rejected machine. Submission is the creation of
//! the pending record itself (see the loan service); resolution is handled
//! here once, generically, instead of three times.
//!
//! [`resolve_approvable`] is pure state manipulation. Services call it from
//! inside a store transaction closure, which turns the status check plus
//! write into a compare-and-swap on the stored document: of two racing
//! resolutions, exactly one succeeds and the other observes a non-Pending
//! status and gets a conflict.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// Approval status shared by every request kind
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    /// Approved and Rejected are terminal once set
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }
}

/// Outcome requested by the resolving actor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    Approve,
    Reject,
}

/// The three request kinds sharing this workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Loan,
    SkipEmi,
    MaxLoanOverride,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Loan => "loan",
            RequestKind::SkipEmi => "skip-emi",
            RequestKind::MaxLoanOverride => "max-loan-override",
        }
    }
}

/// Per-kind approval capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ApproveLoans,
    ApproveSkipEmi,
    ApproveOverrides,
}

impl Capability {
    fn for_kind(kind: RequestKind) -> Capability {
        match kind {
            RequestKind::Loan => Capability::ApproveLoans,
            RequestKind::SkipEmi => Capability::ApproveSkipEmi,
            RequestKind::MaxLoanOverride => Capability::ApproveOverrides,
        }
    }
}

/// An authenticated caller, threaded explicitly into every mutating call
#[derive(Debug, Clone)]
pub struct Actor {
    id: String,
    capabilities: HashSet<Capability>,
}

impl Actor {
    pub fn new(id: impl Into<String>, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        Actor {
            id: id.into(),
            capabilities: capabilities.into_iter().collect(),
        }
    }

    /// An actor holding every approval capability
    pub fn admin(id: impl Into<String>) -> Self {
        Actor::new(
            id,
            [
                Capability::ApproveLoans,
                Capability::ApproveSkipEmi,
                Capability::ApproveOverrides,
            ],
        )
    }

    /// An actor with no approval capabilities (requesters, payroll)
    pub fn requester(id: impl Into<String>) -> Self {
        Actor::new(id, [])
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn can_approve(&self, kind: RequestKind) -> bool {
        self.capabilities.contains(&Capability::for_kind(kind))
    }
}

/// Resolution stamp applied to an approvable record
#[derive(Debug, Clone)]
pub struct Resolution {
    pub decision: ApprovalDecision,
    pub actor: String,
    pub at: DateTime<Utc>,
    pub comments: Option<String>,
}

/// A record that moves through the shared approval machine
pub trait Approvable {
    fn kind(&self) -> RequestKind;
    fn approval_status(&self) -> ApprovalStatus;

    /// Write the resolved status and actor/timestamp stamp in one step.
    /// Only called after the capability and Pending checks pass.
    fn apply_resolution(&mut self, resolution: Resolution);
}

/// Resolve a pending request.
///
/// Fails with `Authorization` if the actor lacks the capability for the
/// record's kind, and with `Conflict` if the record is no longer Pending.
/// Both checks happen before any state is touched.
pub fn resolve_approvable<T: Approvable + ?Sized>(
    target: &mut T,
    decision: ApprovalDecision,
    actor: &Actor,
    comments: Option<String>,
    now: DateTime<Utc>,
) -> LedgerResult<()> {
    let kind = target.kind();
    if !actor.can_approve(kind) {
        return Err(LedgerError::Authorization(format!(
            "actor '{}' may not resolve {} requests",
            actor.id(),
            kind.as_str()
        )));
    }

    let status = target.approval_status();
    if status.is_terminal() {
        return Err(LedgerError::Conflict(format!(
            "{} request is already resolved ({:?})",
            kind.as_str(),
            status
        )));
    }

    target.apply_resolution(Resolution {
        decision,
        actor: actor.id().to_string(),
        at: now,
        comments,
    });
    Ok(())
}
