//! EMI schedule computation.
//!
//! The installment split is deterministic: every month of the term owes the
//! rounded per-month amount, and the final month absorbs the rounding
//! remainder so the schedule sums to the approved principal exactly. Skip
//! approvals zero out their month and defer the liability into the final
//! installment; months past the schedule end bill the outstanding balance so
//! deferred or missed amounts are still collectable.

use crate::approval::ApprovalStatus;
use crate::error::{LedgerError, LedgerResult};
use crate::loan::{Loan, LoanStatus};
use crate::month::MonthKey;

/// Nearest-integer monthly installment for the given principal and term
pub fn emi_amount(approved_amount: i64, emi_months: u32) -> i64 {
    let months = emi_months as i64;
    (approved_amount + months / 2) / months
}

/// Final-month installment carrying the rounding remainder
pub fn final_installment(approved_amount: i64, emi_months: u32) -> i64 {
    let months = emi_months as i64;
    approved_amount - emi_amount(approved_amount, emi_months) * (months - 1)
}

/// Amount due from the employee for `month` on this loan.
///
/// Fails with `NotScheduled` if the loan is not Approved or `month` precedes
/// the disbursement month. An approved skip for `month` yields 0.
pub fn due_for_month(loan: &Loan, month: MonthKey) -> LedgerResult<i64> {
    if loan.status != LoanStatus::Approved {
        return Err(LedgerError::NotScheduled(format!(
            "loan {} is {:?}, no installment is due",
            loan.id, loan.status
        )));
    }

    let approved = loan.approved_amount.ok_or_else(|| {
        LedgerError::Store(format!("approved loan {} is missing approvedAmount", loan.id))
    })?;
    let disbursed = loan.disbursed_date.ok_or_else(|| {
        LedgerError::Store(format!("approved loan {} is missing disbursedDate", loan.id))
    })?;

    let start = MonthKey::from_datetime(disbursed);
    let offset = month.months_since(start);
    if offset < 0 {
        return Err(LedgerError::NotScheduled(format!(
            "month {} precedes the disbursement month {} of loan {}",
            month, start, loan.id
        )));
    }

    if let Some(skip) = loan.skip_emi_requests.get(&month) {
        if skip.status == ApprovalStatus::Approved {
            return Ok(0);
        }
    }

    let months = loan.emi_months as i64;
    let emi = emi_amount(approved, loan.emi_months);

    if offset < months - 1 {
        return Ok(emi);
    }

    if offset == months - 1 {
        // Skipped earlier months defer their installment into the final one.
        let deferred = loan
            .skip_emi_requests
            .iter()
            .filter(|(_, skip)| skip.status == ApprovalStatus::Approved)
            .filter(|(key, _)| {
                let skipped_offset = key.months_since(start);
                (0..months - 1).contains(&skipped_offset)
            })
            .count() as i64
            * emi;
        return Ok(final_installment(approved, loan.emi_months) + deferred);
    }

    // Past the schedule end: true up whatever is still outstanding.
    Ok(loan.remaining_balance)
}
