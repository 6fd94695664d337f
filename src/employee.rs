//! Employee master records.
//!
//! Employees belong to the surrounding HR system; the engine reads them from
//! the document store and never writes them. Any loan action requires the
//! employee's status to be `active` (case-insensitive).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerResult;
use crate::store::DocPath;

/// Employee model (read-only to the engine)
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: Uuid,
    pub employee_id: String,
    pub name: String,
    pub department: String,
    pub salary: Salary,
    pub joining_date: NaiveDate,
    pub status: String,
}

/// Salary block nested inside the employee document
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Salary {
    pub gross_monthly: i64,
}

impl Employee {
    /// Store path of an employee document
    pub fn path(employee_id: &str) -> LedgerResult<DocPath> {
        DocPath::root("employees")?.child(employee_id)
    }

    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case("active")
    }
}
