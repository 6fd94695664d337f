//! Payroll due-amount and balance reconciliation tests

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use uuid::Uuid;

    use emi_ledger::approval::{Actor, ApprovalDecision};
    use emi_ledger::employee::{Employee, Salary};
    use emi_ledger::engine::LedgerEngine;
    use emi_ledger::loan::{CreateLoanRequest, Loan, LoanStatus};
    use emi_ledger::month::MonthKey;
    use emi_ledger::policy::GrossMultiplePolicy;
    use emi_ledger::store::{DocumentStore, MemoryStore};

    fn setup_engine() -> (LedgerEngine, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let engine = LedgerEngine::new(store.clone(), Arc::new(GrossMultiplePolicy::new(3)));
        (engine, store)
    }

    async fn seed_employee(store: &MemoryStore, employee_id: &str, gross: i64) {
        let employee = Employee {
            id: Uuid::new_v4(),
            employee_id: employee_id.to_string(),
            name: "Asha Rao".to_string(),
            department: "Engineering".to_string(),
            salary: Salary {
                gross_monthly: gross,
            },
            joining_date: NaiveDate::from_ymd_opt(2021, 6, 1).unwrap(),
            status: "active".to_string(),
        };
        store
            .create(
                &Employee::path(employee_id).unwrap(),
                serde_json::to_value(&employee).unwrap(),
            )
            .await
            .unwrap();
    }

    async fn approved_loan(engine: &LedgerEngine, employee_id: &str, amount: i64, months: u32) -> Loan {
        let request = CreateLoanRequest {
            employee_id: employee_id.to_string(),
            amount,
            reason: "personal".to_string(),
            emi_months: months,
        };
        let loan = engine
            .loan_service
            .request_loan(request, &Actor::requester("hr-user"))
            .await
            .unwrap();
        engine
            .loan_service
            .approve_loan(loan.id, amount, &Actor::admin("admin"))
            .await
            .unwrap()
    }

    fn schedule_start(loan: &Loan) -> MonthKey {
        MonthKey::from_datetime(loan.disbursed_date.unwrap())
    }

    #[tokio::test]
    async fn test_due_amount_sums_across_approved_loans() {
        let (engine, store) = setup_engine();
        seed_employee(&store, "EMP-001", 200_000).await;

        let first = approved_loan(&engine, "EMP-001", 60_000, 6).await;
        approved_loan(&engine, "EMP-001", 30_000, 6).await;
        // a pending loan must not contribute
        engine
            .loan_service
            .request_loan(
                CreateLoanRequest {
                    employee_id: "EMP-001".to_string(),
                    amount: 12_000,
                    reason: "personal".to_string(),
                    emi_months: 12,
                },
                &Actor::requester("hr-user"),
            )
            .await
            .unwrap();

        let month = schedule_start(&first);
        let due = engine.payroll.due_amount("EMP-001", month).await.unwrap();
        assert_eq!(due, 10_000 + 5_000);
    }

    #[tokio::test]
    async fn test_due_amount_zero_without_approved_loans() {
        let (engine, store) = setup_engine();
        seed_employee(&store, "EMP-001", 200_000).await;

        let month: MonthKey = "2025-06".parse().unwrap();
        assert_eq!(engine.payroll.due_amount("EMP-001", month).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_due_amount_honors_approved_skip() {
        let (engine, store) = setup_engine();
        seed_employee(&store, "EMP-001", 200_000).await;

        let first = approved_loan(&engine, "EMP-001", 60_000, 6).await;
        approved_loan(&engine, "EMP-001", 30_000, 6).await;

        let month = schedule_start(&first).plus_months(1);
        engine
            .loan_service
            .request_skip_emi(first.id, month, &Actor::requester("emp"), "travel".to_string())
            .await
            .unwrap();
        engine
            .loan_service
            .resolve_skip_emi(first.id, month, ApprovalDecision::Approve, &Actor::admin("mgr"))
            .await
            .unwrap();

        let due = engine.payroll.due_amount("EMP-001", month).await.unwrap();
        assert_eq!(due, 5_000);
    }

    #[tokio::test]
    async fn test_full_repayment_flips_status_to_repaid() {
        let (engine, store) = setup_engine();
        seed_employee(&store, "EMP-001", 200_000).await;

        let loan = approved_loan(&engine, "EMP-001", 60_000, 6).await;
        let start = schedule_start(&loan);

        for offset in 0..6 {
            let month = start.plus_months(offset);
            let due = engine.payroll.due_amount("EMP-001", month).await.unwrap();
            assert_eq!(due, 10_000);
            engine
                .payroll
                .credit(loan.id, month, due, "PAYRUN-2025")
                .await
                .unwrap();
        }

        let repaid = engine.loan_service.get_loan(loan.id).await.unwrap();
        assert_eq!(repaid.status, LoanStatus::Repaid);
        assert_eq!(repaid.remaining_balance, 0);
        assert_eq!(repaid.emi_payments.len(), 6);
        assert!(repaid.emi_payments.values().all(|p| p.payroll_credited));

        // post-payment balance snapshots descend to zero
        let snapshots: Vec<i64> = repaid
            .emi_payments
            .values()
            .map(|p| p.remaining_balance)
            .collect();
        assert_eq!(snapshots, vec![50_000, 40_000, 30_000, 20_000, 10_000, 0]);
    }

    #[tokio::test]
    async fn test_duplicate_credit_conflicts_and_leaves_state_unchanged() {
        let (engine, store) = setup_engine();
        seed_employee(&store, "EMP-001", 200_000).await;

        let loan = approved_loan(&engine, "EMP-001", 60_000, 6).await;
        let month = schedule_start(&loan);

        engine
            .payroll
            .credit(loan.id, month, 10_000, "PAYRUN-A")
            .await
            .unwrap();
        let err = engine
            .payroll
            .credit(loan.id, month, 10_000, "PAYRUN-B")
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "CONFLICT_ERROR");

        let stored = engine.loan_service.get_loan(loan.id).await.unwrap();
        assert_eq!(stored.remaining_balance, 50_000);
        assert_eq!(stored.emi_payments.len(), 1);
        assert_eq!(
            stored.emi_payments.get(&month).unwrap().deducted_from,
            "PAYRUN-A"
        );
    }

    #[tokio::test]
    async fn test_credit_requires_an_approved_loan() {
        let (engine, store) = setup_engine();
        seed_employee(&store, "EMP-001", 200_000).await;

        let pending = engine
            .loan_service
            .request_loan(
                CreateLoanRequest {
                    employee_id: "EMP-001".to_string(),
                    amount: 60_000,
                    reason: "personal".to_string(),
                    emi_months: 6,
                },
                &Actor::requester("hr-user"),
            )
            .await
            .unwrap();

        let month: MonthKey = "2025-06".parse().unwrap();
        let err = engine
            .payroll
            .credit(pending.id, month, 10_000, "PAYRUN")
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "NOT_SCHEDULED");
    }

    #[tokio::test]
    async fn test_repaid_loan_rejects_further_credits() {
        let (engine, store) = setup_engine();
        seed_employee(&store, "EMP-001", 200_000).await;

        let loan = approved_loan(&engine, "EMP-001", 20_000, 2).await;
        let start = schedule_start(&loan);
        engine
            .payroll
            .credit(loan.id, start, 10_000, "PAYRUN-1")
            .await
            .unwrap();
        engine
            .payroll
            .credit(loan.id, start.plus_months(1), 10_000, "PAYRUN-2")
            .await
            .unwrap();

        let err = engine
            .payroll
            .credit(loan.id, start.plus_months(2), 10_000, "PAYRUN-3")
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "CONFLICT_ERROR");
    }

    #[tokio::test]
    async fn test_skipped_month_defers_into_final_installment() {
        let (engine, store) = setup_engine();
        seed_employee(&store, "EMP-001", 200_000).await;

        let loan = approved_loan(&engine, "EMP-001", 60_000, 6).await;
        let start = schedule_start(&loan);
        let skipped = start.plus_months(2);

        engine
            .loan_service
            .request_skip_emi(loan.id, skipped, &Actor::requester("emp"), "travel".to_string())
            .await
            .unwrap();
        engine
            .loan_service
            .resolve_skip_emi(loan.id, skipped, ApprovalDecision::Approve, &Actor::admin("mgr"))
            .await
            .unwrap();

        let mut credited = 0;
        for offset in 0..6 {
            let month = start.plus_months(offset);
            let due = engine.payroll.due_amount("EMP-001", month).await.unwrap();
            if offset == 2 {
                assert_eq!(due, 0);
                continue;
            }
            if offset == 5 {
                // final installment carries the deferred month
                assert_eq!(due, 20_000);
            }
            engine
                .payroll
                .credit(loan.id, month, due, "PAYRUN")
                .await
                .unwrap();
            credited += due;
        }

        assert_eq!(credited, 60_000);
        let repaid = engine.loan_service.get_loan(loan.id).await.unwrap();
        assert_eq!(repaid.status, LoanStatus::Repaid);
        assert_eq!(repaid.remaining_balance, 0);
    }

    #[tokio::test]
    async fn test_skipping_the_final_month_trues_up_after_the_schedule() {
        let (engine, store) = setup_engine();
        seed_employee(&store, "EMP-001", 200_000).await;

        let loan = approved_loan(&engine, "EMP-001", 60_000, 6).await;
        let start = schedule_start(&loan);
        let last = start.plus_months(5);

        engine
            .loan_service
            .request_skip_emi(loan.id, last, &Actor::requester("emp"), "travel".to_string())
            .await
            .unwrap();
        engine
            .loan_service
            .resolve_skip_emi(loan.id, last, ApprovalDecision::Approve, &Actor::admin("mgr"))
            .await
            .unwrap();

        for offset in 0..5 {
            let month = start.plus_months(offset);
            engine
                .payroll
                .credit(loan.id, month, 10_000, "PAYRUN")
                .await
                .unwrap();
        }

        assert_eq!(engine.payroll.due_amount("EMP-001", last).await.unwrap(), 0);

        // the deferred liability is billed the month after the schedule ends
        let true_up = start.plus_months(6);
        assert_eq!(
            engine.payroll.due_amount("EMP-001", true_up).await.unwrap(),
            10_000
        );

        engine
            .payroll
            .credit(loan.id, true_up, 10_000, "PAYRUN")
            .await
            .unwrap();
        let repaid = engine.loan_service.get_loan(loan.id).await.unwrap();
        assert_eq!(repaid.status, LoanStatus::Repaid);
    }

    #[tokio::test]
    async fn test_payroll_actor_cannot_resolve_requests() {
        let (engine, store) = setup_engine();
        seed_employee(&store, "EMP-001", 200_000).await;

        let loan = approved_loan(&engine, "EMP-001", 60_000, 6).await;
        let month = schedule_start(&loan).plus_months(1);
        engine
            .loan_service
            .request_skip_emi(loan.id, month, &Actor::requester("emp"), "travel".to_string())
            .await
            .unwrap();

        let err = engine
            .loan_service
            .resolve_skip_emi(
                loan.id,
                month,
                ApprovalDecision::Approve,
                &Actor::requester("payroll-run"),
            )
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "AUTHORIZATION_ERROR");
    }
}
