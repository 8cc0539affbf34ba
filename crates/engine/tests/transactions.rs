use chrono::{Duration, TimeZone, Utc};
use sea_orm::{Database, DatabaseConnection};

use engine::{
    Engine, EngineError, Frequency, NewTransactionCmd, Recurrence, TransactionKind,
    TransactionListFilter, UpdateTransactionCmd,
};
use migration::MigratorTrait;
use uuid::Uuid;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

fn expense(user: &str, amount_minor: i64, budget_id: Option<Uuid>) -> NewTransactionCmd {
    NewTransactionCmd::new(
        user,
        TransactionKind::Expense,
        amount_minor,
        "food",
        "groceries",
        Utc::now(),
    )
    .budget_id(budget_id)
}

#[tokio::test]
async fn create_and_fetch_transaction() {
    let (engine, _db) = engine_with_db().await;
    let budget_id = Uuid::new_v4();

    let created = engine
        .create_transaction(
            expense("alice", 2_500, Some(budget_id))
                .tags(vec![" weekly ".to_string(), "".to_string()]),
        )
        .await
        .unwrap();
    assert_eq!(created.budget_id, Some(budget_id));
    assert_eq!(created.tags, vec!["weekly".to_string()]);

    let fetched = engine.transaction("alice", created.id).await.unwrap();
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.amount_minor, 2_500);
    assert_eq!(fetched.kind, TransactionKind::Expense);
    assert_eq!(fetched.tags, created.tags);
}

#[tokio::test]
async fn invalid_payloads_are_rejected() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .create_transaction(expense("alice", 0, None))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let blank_category = NewTransactionCmd::new(
        "alice",
        TransactionKind::Income,
        100,
        "  ",
        "salary",
        Utc::now(),
    );
    let err = engine.create_transaction(blank_category).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidField(_)));
}

#[tokio::test]
async fn other_users_transactions_are_not_found() {
    let (engine, _db) = engine_with_db().await;
    let created = engine
        .create_transaction(expense("alice", 1_000, None))
        .await
        .unwrap();

    let err = engine.transaction("bob", created.id).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::KeyNotFound("transaction not exists".to_string())
    );
    let err = engine
        .delete_transaction("bob", created.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
    let err = engine
        .update_transaction(UpdateTransactionCmd::new("bob", created.id).amount_minor(5))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    assert!(engine.transaction("alice", created.id).await.is_ok());
}

#[tokio::test]
async fn update_returns_before_and_after() {
    let (engine, _db) = engine_with_db().await;
    let budget_a = Uuid::new_v4();
    let budget_b = Uuid::new_v4();
    let created = engine
        .create_transaction(expense("alice", 1_000, Some(budget_a)))
        .await
        .unwrap();

    let updated = engine
        .update_transaction(
            UpdateTransactionCmd::new("alice", created.id)
                .amount_minor(1_500)
                .budget_id(Some(budget_b)),
        )
        .await
        .unwrap();
    assert_eq!(updated.before.budget_id, Some(budget_a));
    assert_eq!(updated.after.budget_id, Some(budget_b));
    assert_eq!(updated.after.amount_minor, 1_500);
    assert_eq!(updated.after.category, "food");

    let cleared = engine
        .update_transaction(UpdateTransactionCmd::new("alice", created.id).budget_id(None))
        .await
        .unwrap();
    assert_eq!(cleared.after.budget_id, None);

    let stored = engine.transaction("alice", created.id).await.unwrap();
    assert_eq!(stored.budget_id, None);
    assert_eq!(stored.amount_minor, 1_500);
}

#[tokio::test]
async fn failed_update_leaves_record_untouched() {
    let (engine, _db) = engine_with_db().await;
    let created = engine
        .create_transaction(expense("alice", 1_000, None))
        .await
        .unwrap();

    let mut cmd = UpdateTransactionCmd::new("alice", created.id).amount_minor(2_000);
    cmd.category = Some(" ".to_string());
    assert!(engine.update_transaction(cmd).await.is_err());

    let stored = engine.transaction("alice", created.id).await.unwrap();
    assert_eq!(stored.amount_minor, 1_000);
}

#[tokio::test]
async fn recurrence_is_persisted() {
    let (engine, _db) = engine_with_db().await;
    let next_date = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
    let created = engine
        .create_transaction(expense("alice", 9_900, None).recurrence(Recurrence::Recurring {
            frequency: Frequency::Monthly,
            next_date,
        }))
        .await
        .unwrap();

    let stored = engine.transaction("alice", created.id).await.unwrap();
    assert_eq!(
        stored.recurrence,
        Recurrence::Recurring {
            frequency: Frequency::Monthly,
            next_date,
        }
    );
}

#[tokio::test]
async fn delete_returns_deleted_record() {
    let (engine, _db) = engine_with_db().await;
    let created = engine
        .create_transaction(expense("alice", 1_000, None))
        .await
        .unwrap();

    let deleted = engine.delete_transaction("alice", created.id).await.unwrap();
    assert_eq!(deleted.id, created.id);
    assert!(matches!(
        engine.transaction("alice", created.id).await,
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn budget_expense_total_counts_only_owner_expenses() {
    let (engine, _db) = engine_with_db().await;
    let budget_id = Uuid::new_v4();

    assert_eq!(
        engine.budget_expense_total("alice", budget_id).await.unwrap(),
        0
    );

    for amount in [40_000, 25_000, 5_000] {
        engine
            .create_transaction(expense("alice", amount, Some(budget_id)))
            .await
            .unwrap();
    }
    engine
        .create_transaction(
            NewTransactionCmd::new(
                "alice",
                TransactionKind::Income,
                99_999,
                "refund",
                "shop refund",
                Utc::now(),
            )
            .budget_id(budget_id),
        )
        .await
        .unwrap();
    engine
        .create_transaction(expense("bob", 77_700, Some(budget_id)))
        .await
        .unwrap();
    engine
        .create_transaction(expense("alice", 1_234, Some(Uuid::new_v4())))
        .await
        .unwrap();

    assert_eq!(
        engine.budget_expense_total("alice", budget_id).await.unwrap(),
        70_000
    );
    assert_eq!(
        engine.budget_expense_total("bob", budget_id).await.unwrap(),
        77_700
    );
}

#[tokio::test]
async fn list_paginates_newest_first_with_filters() {
    let (engine, _db) = engine_with_db().await;
    let base = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
    for day in 0..5 {
        let mut cmd = expense("alice", 100 + day, None);
        cmd.occurred_at = base + Duration::days(day);
        if day == 4 {
            cmd.category = "Food & Drinks".to_string();
        }
        engine.create_transaction(cmd).await.unwrap();
    }
    let mut income = NewTransactionCmd::new(
        "alice",
        TransactionKind::Income,
        5_000,
        "salary",
        "january",
        base,
    );
    income.occurred_at = base + Duration::days(10);
    engine.create_transaction(income).await.unwrap();
    engine
        .create_transaction(expense("bob", 1, None))
        .await
        .unwrap();

    let page = engine
        .list_transactions("alice", &TransactionListFilter::default(), 1, 4)
        .await
        .unwrap();
    assert_eq!(page.total, 6);
    assert_eq!(page.pages, 2);
    assert_eq!(page.transactions.len(), 4);
    assert_eq!(page.transactions[0].kind, TransactionKind::Income);

    let second = engine
        .list_transactions("alice", &TransactionListFilter::default(), 2, 4)
        .await
        .unwrap();
    assert_eq!(second.transactions.len(), 2);
    assert_eq!(second.transactions[1].amount_minor, 100);

    let filter = TransactionListFilter {
        kind: Some(TransactionKind::Expense),
        category: Some("FOOD".to_string()),
        from: Some(base + Duration::days(1)),
        to: Some(base + Duration::days(4)),
    };
    let filtered = engine
        .list_transactions("alice", &filter, 1, 10)
        .await
        .unwrap();
    let amounts: Vec<i64> = filtered
        .transactions
        .iter()
        .map(|tx| tx.amount_minor)
        .collect();
    assert_eq!(amounts, vec![103, 102, 101]);

    let drinks = TransactionListFilter {
        category: Some("& drinks".to_string()),
        ..Default::default()
    };
    let found = engine
        .list_transactions("alice", &drinks, 1, 10)
        .await
        .unwrap();
    assert_eq!(found.total, 1);

    assert!(matches!(
        engine
            .list_transactions("alice", &TransactionListFilter::default(), 0, 10)
            .await,
        Err(EngineError::InvalidField(_))
    ));
    assert!(matches!(
        engine
            .list_transactions("alice", &TransactionListFilter::default(), 1, 101)
            .await,
        Err(EngineError::InvalidField(_))
    ));
}

#[tokio::test]
async fn summary_groups_by_kind_and_category() {
    let (engine, _db) = engine_with_db().await;
    let now = Utc::now();
    let entries = [
        (TransactionKind::Expense, 3_000, "food"),
        (TransactionKind::Expense, 2_000, "food"),
        (TransactionKind::Expense, 9_000, "rent"),
        (TransactionKind::Income, 50_000, "salary"),
    ];
    for (kind, amount, category) in entries {
        engine
            .create_transaction(NewTransactionCmd::new(
                "alice", kind, amount, category, "entry", now,
            ))
            .await
            .unwrap();
    }

    let summary = engine.transaction_summary("alice", None, None).await.unwrap();
    assert_eq!(summary.by_kind.len(), 2);
    let expenses = summary
        .by_kind
        .iter()
        .find(|total| total.kind == TransactionKind::Expense)
        .unwrap();
    assert_eq!(expenses.total_minor, 14_000);
    assert_eq!(expenses.count, 3);

    let categories: Vec<(&str, i64)> = summary
        .expense_by_category
        .iter()
        .map(|c| (c.category.as_str(), c.total_minor))
        .collect();
    assert_eq!(categories, vec![("rent", 9_000), ("food", 5_000)]);

    let empty = engine
        .transaction_summary("alice", Some(now + Duration::days(1)), None)
        .await
        .unwrap();
    assert!(empty.by_kind.is_empty());
}

#[tokio::test]
async fn summary_overflow_is_an_error() {
    let (engine, _db) = engine_with_db().await;
    let half = i64::MAX / 2 + 1;
    for _ in 0..2 {
        engine
            .create_transaction(expense("alice", half, None))
            .await
            .unwrap();
    }

    let err = engine
        .transaction_summary("alice", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    // Other users are unaffected.
    engine
        .create_transaction(expense("bob", half, None))
        .await
        .unwrap();
    let summary = engine.transaction_summary("bob", None, None).await.unwrap();
    assert_eq!(summary.by_kind[0].total_minor, half);
}
