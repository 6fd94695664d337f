//! Employee loan & EMI reconciliation engine.
//!
//! This library exports the core modules of the HR loan ledger: a generic
//! two-outcome approval workflow shared by loans, skip-EMI exceptions and
//! ceiling overrides, a deterministic EMI scheduler, the loan ledger service,
//! and the balance reconciler driven by the external payroll run.

pub mod approval;
pub mod config;
pub mod employee;
pub mod engine;
pub mod error;
pub mod loan;
pub mod loan_service;
pub mod month;
pub mod payroll;
pub mod policy;
pub mod reconciler;
pub mod schedule;
pub mod store;
pub mod telemetry;
