//! Budget spend reconciliation.
//!
//! A budget's `spent_minor` is a cache of the owner's expense transactions
//! that reference it. After every transaction mutation the affected budgets
//! are recomputed from scratch and the total is pushed to the budgets
//! service. Recomputing (instead of adding deltas) makes the procedure
//! idempotent and lets concurrent runs converge on a valid snapshot.

use std::future::Future;

use api_types::budget::BudgetView;
use engine::{Engine, EngineError, Transaction};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    auth::Credential,
    budget_client::{BudgetClient, ClientError},
};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to read transactions: {0}")]
    Store(#[from] EngineError),
    #[error("failed to update budget: {0}")]
    Push(#[from] ClientError),
}

/// Where recomputed totals are written.
pub trait BudgetGateway {
    fn push_spent(
        &self,
        budget_id: Uuid,
        spent_minor: i64,
        credential: &Credential,
    ) -> impl Future<Output = Result<BudgetView, ClientError>> + Send;
}

impl BudgetGateway for BudgetClient {
    fn push_spent(
        &self,
        budget_id: Uuid,
        spent_minor: i64,
        credential: &Credential,
    ) -> impl Future<Output = Result<BudgetView, ClientError>> + Send {
        BudgetClient::push_spent(self, budget_id, spent_minor, credential)
    }
}

/// Recomputes the spend total of `budget_id` from the caller's expenses and
/// pushes it with the caller's credential.
pub async fn reconcile<G: BudgetGateway>(
    engine: &Engine,
    gateway: &G,
    user_id: &str,
    credential: &Credential,
    budget_id: Uuid,
) -> Result<BudgetView, ReconcileError> {
    let spent_minor = engine.budget_expense_total(user_id, budget_id).await?;
    let budget = gateway.push_spent(budget_id, spent_minor, credential).await?;
    tracing::debug!(%budget_id, spent_minor, "budget reconciled");
    Ok(budget)
}

/// Budgets whose cached total may have changed when a transaction went from
/// `before` to `after`. `None` stands for "did not exist".
///
/// Each id appears once, old budget first.
pub fn affected_budgets(before: Option<&Transaction>, after: Option<&Transaction>) -> Vec<Uuid> {
    let mut ids = Vec::with_capacity(2);
    for id in [before, after]
        .into_iter()
        .flatten()
        .filter_map(Transaction::counted_budget)
    {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// Reconciles every budget in `budget_ids`, turning failures into warnings.
///
/// Never fails: the mutation that triggered this has already been committed.
pub async fn reconcile_all<G: BudgetGateway>(
    engine: &Engine,
    gateway: &G,
    user_id: &str,
    credential: &Credential,
    budget_ids: &[Uuid],
) -> Vec<String> {
    let mut warnings = Vec::new();
    for &budget_id in budget_ids {
        if let Err(err) = reconcile(engine, gateway, user_id, credential, budget_id).await {
            tracing::warn!(%budget_id, "budget reconciliation failed: {err}");
            warnings.push(format!("budget {budget_id} was not updated: {err}"));
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use api_types::budget::{Alerts, BudgetPeriod};
    use chrono::Utc;
    use engine::{NewTransactionCmd, TransactionKind};
    use migration::MigratorTrait;
    use sea_orm::Database;

    use super::*;

    #[derive(Default)]
    struct FakeGateway {
        pushed: Mutex<Vec<(Uuid, i64)>>,
        fail_with_not_found: bool,
    }

    impl FakeGateway {
        fn pushed(&self) -> Vec<(Uuid, i64)> {
            self.pushed.lock().unwrap().clone()
        }
    }

    impl BudgetGateway for FakeGateway {
        async fn push_spent(
            &self,
            budget_id: Uuid,
            spent_minor: i64,
            _credential: &Credential,
        ) -> Result<BudgetView, ClientError> {
            if self.fail_with_not_found {
                return Err(ClientError::NotFound);
            }
            self.pushed.lock().unwrap().push((budget_id, spent_minor));
            let now = Utc::now().fixed_offset();
            Ok(BudgetView {
                id: budget_id,
                name: "fake".to_string(),
                category: "fake".to_string(),
                limit_minor: 0,
                spent_minor,
                remaining_minor: 0,
                percentage_spent: 0.0,
                period: BudgetPeriod::Monthly,
                start_date: now,
                end_date: now,
                is_active: true,
                alerts: Alerts {
                    enabled: true,
                    threshold: 80,
                },
                goals: vec![],
            })
        }
    }

    async fn engine() -> Engine {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        Engine::builder().database(db).build().await.unwrap()
    }

    fn tx(kind: TransactionKind, budget_id: Option<Uuid>) -> Transaction {
        let now = Utc::now();
        Transaction {
            id: Uuid::new_v4(),
            user_id: "alice".to_string(),
            amount_minor: 100,
            kind,
            category: "food".to_string(),
            description: "x".to_string(),
            occurred_at: now,
            budget_id,
            recurrence: Default::default(),
            tags: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn affected_budgets_for_create_and_delete() {
        let a = Uuid::new_v4();
        let expense = tx(TransactionKind::Expense, Some(a));
        assert_eq!(affected_budgets(None, Some(&expense)), vec![a]);
        assert_eq!(affected_budgets(Some(&expense), None), vec![a]);

        let income = tx(TransactionKind::Income, Some(a));
        assert!(affected_budgets(None, Some(&income)).is_empty());
    }

    #[test]
    fn affected_budgets_for_updates() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        // Unchanged reference: reconciled once.
        let before = tx(TransactionKind::Expense, Some(a));
        let mut after = before.clone();
        after.amount_minor = 500;
        assert_eq!(affected_budgets(Some(&before), Some(&after)), vec![a]);

        // Moved from A to B: both.
        after.budget_id = Some(b);
        assert_eq!(affected_budgets(Some(&before), Some(&after)), vec![a, b]);

        // Expense to income: the old budget loses it.
        let mut income = before.clone();
        income.kind = TransactionKind::Income;
        assert_eq!(affected_budgets(Some(&before), Some(&income)), vec![a]);

        // Income to expense: the budget gains it.
        assert_eq!(affected_budgets(Some(&income), Some(&before)), vec![a]);

        // Reference cleared.
        let mut cleared = before.clone();
        cleared.budget_id = None;
        assert_eq!(affected_budgets(Some(&before), Some(&cleared)), vec![a]);
    }

    #[tokio::test]
    async fn reconcile_pushes_the_full_sum() {
        let engine = engine().await;
        let gateway = FakeGateway::default();
        let credential = Credential::new("token");
        let budget_id = Uuid::new_v4();

        for amount in [40_000, 25_000, 5_000] {
            engine
                .create_transaction(
                    NewTransactionCmd::new(
                        "alice",
                        TransactionKind::Expense,
                        amount,
                        "food",
                        "groceries",
                        Utc::now(),
                    )
                    .budget_id(budget_id),
                )
                .await
                .unwrap();
        }

        let budget = reconcile(&engine, &gateway, "alice", &credential, budget_id)
            .await
            .unwrap();
        assert_eq!(budget.spent_minor, 70_000);

        // Running again with no changes pushes the same value.
        reconcile(&engine, &gateway, "alice", &credential, budget_id)
            .await
            .unwrap();
        assert_eq!(
            gateway.pushed(),
            vec![(budget_id, 70_000), (budget_id, 70_000)]
        );
    }

    #[tokio::test]
    async fn empty_budget_reconciles_to_zero() {
        let engine = engine().await;
        let gateway = FakeGateway::default();
        let budget_id = Uuid::new_v4();

        reconcile(&engine, &gateway, "alice", &Credential::new("t"), budget_id)
            .await
            .unwrap();
        assert_eq!(gateway.pushed(), vec![(budget_id, 0)]);
    }

    #[tokio::test]
    async fn failures_become_warnings() {
        let engine = engine().await;
        let gateway = FakeGateway {
            fail_with_not_found: true,
            ..Default::default()
        };
        let ids = [Uuid::new_v4(), Uuid::new_v4()];

        let warnings =
            reconcile_all(&engine, &gateway, "alice", &Credential::new("t"), &ids).await;
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains(&ids[0].to_string()));
        assert!(warnings[0].contains("budget not found"));
    }
}
