use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use sea_orm::{
    ActiveModelTrait, DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Statement, TransactionTrait,
    prelude::*,
    sea_query::{Expr, Func, LikeExpr},
};

use crate::{
    EngineError, NewTransactionCmd, ResultEngine, Transaction, TransactionKind,
    UpdateTransactionCmd, transactions,
    util::{
        add_to_total, contains_pattern, normalize_required_text, normalize_tags,
        validate_positive_amount, validate_range,
    },
};

use super::{Engine, with_tx};

pub const MAX_PAGE_LIMIT: u64 = 100;

/// Filters for listing transactions.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    pub kind: Option<TransactionKind>,
    /// Case-insensitive substring of the category.
    pub category: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// One page of transactions, newest first.
#[derive(Clone, Debug)]
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    pub page: u64,
    pub pages: u64,
    pub total: u64,
}

/// The stored record before and after an update.
///
/// Callers need both to work out which budgets the change touched.
#[derive(Clone, Debug)]
pub struct TransactionUpdated {
    pub before: Transaction,
    pub after: Transaction,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KindTotal {
    pub kind: TransactionKind,
    pub total_minor: i64,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryTotal {
    pub category: String,
    pub total_minor: i64,
    pub count: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionSummary {
    pub by_kind: Vec<KindTotal>,
    /// Expenses only, largest total first.
    pub expense_by_category: Vec<CategoryTotal>,
}

trait ApplyTxFilters: QueryFilter + Sized {
    fn apply_tx_filters(self, filter: &TransactionListFilter) -> Self;
}

impl<T> ApplyTxFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_tx_filters(mut self, filter: &TransactionListFilter) -> Self {
        if let Some(kind) = filter.kind {
            self = self.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        if let Some(category) = filter.category.as_deref().filter(|c| !c.trim().is_empty()) {
            self = self.filter(
                Expr::expr(Func::lower(Expr::col(transactions::Column::Category)))
                    .like(LikeExpr::new(contains_pattern(category)).escape('\\')),
            );
        }
        if let Some(from) = filter.from {
            self = self.filter(transactions::Column::OccurredAt.gte(from));
        }
        if let Some(to) = filter.to {
            self = self.filter(transactions::Column::OccurredAt.lt(to));
        }
        self
    }
}

fn validate_page(page: u64, limit: u64) -> ResultEngine<()> {
    if page == 0 {
        return Err(EngineError::InvalidField("page must be >= 1".to_string()));
    }
    if limit == 0 || limit > MAX_PAGE_LIMIT {
        return Err(EngineError::InvalidField(format!(
            "limit must be between 1 and {MAX_PAGE_LIMIT}"
        )));
    }
    Ok(())
}

impl Engine {
    async fn require_transaction(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        transaction_id: Uuid,
    ) -> ResultEngine<transactions::Model> {
        transactions::Entity::find_by_id(transaction_id.to_string())
            .filter(transactions::Column::UserId.eq(user_id))
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))
    }

    /// Persists a new transaction.
    ///
    /// The budget reference is stored as given: whether it points at an
    /// existing budget is not checked here.
    pub async fn create_transaction(&self, cmd: NewTransactionCmd) -> ResultEngine<Transaction> {
        validate_positive_amount(cmd.amount_minor, "amount_minor")?;
        let now = Utc::now();
        let tx = Transaction {
            id: Uuid::new_v4(),
            user_id: cmd.user_id,
            amount_minor: cmd.amount_minor,
            kind: cmd.kind,
            category: normalize_required_text(&cmd.category, "category")?,
            description: normalize_required_text(&cmd.description, "description")?,
            occurred_at: cmd.occurred_at,
            budget_id: cmd.budget_id,
            recurrence: cmd.recurrence,
            tags: normalize_tags(cmd.tags),
            created_at: now,
            updated_at: now,
        };

        transactions::ActiveModel::try_from(&tx)?
            .insert(&self.database)
            .await?;
        Ok(tx)
    }

    /// Return a transaction owned by `user_id`.
    pub async fn transaction(&self, user_id: &str, transaction_id: Uuid) -> ResultEngine<Transaction> {
        let model = transactions::Entity::find_by_id(transaction_id.to_string())
            .filter(transactions::Column::UserId.eq(user_id))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))?;
        Transaction::try_from(model)
    }

    /// Applies a partial update and returns the record before and after it.
    pub async fn update_transaction(
        &self,
        cmd: UpdateTransactionCmd,
    ) -> ResultEngine<TransactionUpdated> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_transaction(&db_tx, &cmd.user_id, cmd.transaction_id)
                .await?;
            let before = Transaction::try_from(model)?;
            let mut after = before.clone();

            if let Some(amount_minor) = cmd.amount_minor {
                validate_positive_amount(amount_minor, "amount_minor")?;
                after.amount_minor = amount_minor;
            }
            if let Some(kind) = cmd.kind {
                after.kind = kind;
            }
            if let Some(category) = cmd.category.as_deref() {
                after.category = normalize_required_text(category, "category")?;
            }
            if let Some(description) = cmd.description.as_deref() {
                after.description = normalize_required_text(description, "description")?;
            }
            if let Some(occurred_at) = cmd.occurred_at {
                after.occurred_at = occurred_at;
            }
            if let Some(budget_id) = cmd.budget_id {
                after.budget_id = budget_id;
            }
            if let Some(recurrence) = cmd.recurrence {
                after.recurrence = recurrence;
            }
            if let Some(tags) = cmd.tags {
                after.tags = normalize_tags(tags);
            }
            after.updated_at = Utc::now();

            transactions::ActiveModel::try_from(&after)?
                .update(&db_tx)
                .await?;
            Ok(TransactionUpdated { before, after })
        })
    }

    /// Deletes a transaction and returns what was stored.
    pub async fn delete_transaction(
        &self,
        user_id: &str,
        transaction_id: Uuid,
    ) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_transaction(&db_tx, user_id, transaction_id)
                .await?;
            let deleted = Transaction::try_from(model)?;
            transactions::Entity::delete_by_id(transaction_id.to_string())
                .exec(&db_tx)
                .await?;
            Ok(deleted)
        })
    }

    /// Lists the user's transactions, newest first, one page at a time.
    ///
    /// `page` starts at 1 and `limit` must be in `1..=100`.
    pub async fn list_transactions(
        &self,
        user_id: &str,
        filter: &TransactionListFilter,
        page: u64,
        limit: u64,
    ) -> ResultEngine<TransactionPage> {
        validate_page(page, limit)?;
        validate_range(filter.from, filter.to)?;

        let query = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .apply_tx_filters(filter);
        let total = query.clone().count(&self.database).await?;
        let models = query
            .order_by_desc(transactions::Column::OccurredAt)
            .order_by_desc(transactions::Column::Id)
            .offset((page - 1) * limit)
            .limit(limit)
            .all(&self.database)
            .await?;

        let transactions = models
            .into_iter()
            .map(Transaction::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;
        Ok(TransactionPage {
            transactions,
            page,
            pages: total.div_ceil(limit),
            total,
        })
    }

    /// Totals per kind plus the expense breakdown by category.
    ///
    /// Fails with `InvalidAmount` when a total does not fit in an `i64`.
    pub async fn transaction_summary(
        &self,
        user_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> ResultEngine<TransactionSummary> {
        validate_range(from, to)?;
        let filter = TransactionListFilter {
            from,
            to,
            ..Default::default()
        };
        let rows: Vec<(String, String, i64)> = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .apply_tx_filters(&filter)
            .select_only()
            .column(transactions::Column::Kind)
            .column(transactions::Column::Category)
            .column(transactions::Column::AmountMinor)
            .into_tuple()
            .all(&self.database)
            .await?;

        let mut by_kind: Vec<KindTotal> = Vec::new();
        let mut by_category: HashMap<String, CategoryTotal> = HashMap::new();
        for (kind, category, amount_minor) in rows {
            let kind = TransactionKind::try_from(kind.as_str())?;
            match by_kind.iter_mut().find(|total| total.kind == kind) {
                Some(total) => {
                    total.total_minor =
                        add_to_total(total.total_minor, amount_minor, "kind total")?;
                    total.count += 1;
                }
                None => by_kind.push(KindTotal {
                    kind,
                    total_minor: amount_minor,
                    count: 1,
                }),
            }
            if kind == TransactionKind::Expense {
                let entry = by_category
                    .entry(category.clone())
                    .or_insert_with(|| CategoryTotal {
                        category,
                        total_minor: 0,
                        count: 0,
                    });
                entry.total_minor =
                    add_to_total(entry.total_minor, amount_minor, "category total")?;
                entry.count += 1;
            }
        }

        by_kind.sort_by_key(|total| total.kind.as_str());
        let mut expense_by_category: Vec<CategoryTotal> = by_category.into_values().collect();
        expense_by_category.sort_by(|a, b| {
            b.total_minor
                .cmp(&a.total_minor)
                .then_with(|| a.category.cmp(&b.category))
        });
        Ok(TransactionSummary {
            by_kind,
            expense_by_category,
        })
    }

    /// Sum of the user's expense amounts that reference `budget_id`.
    ///
    /// An empty set sums to 0. Incomes carrying the same reference are not
    /// counted.
    pub async fn budget_expense_total(&self, user_id: &str, budget_id: Uuid) -> ResultEngine<i64> {
        let backend = self.database.get_database_backend();
        let stmt = Statement::from_sql_and_values(
            backend,
            "SELECT COALESCE(SUM(amount_minor), 0) AS sum \
             FROM transactions \
             WHERE user_id = ? AND budget_id = ? AND kind = ?",
            vec![
                user_id.into(),
                budget_id.to_string().into(),
                TransactionKind::Expense.as_str().into(),
            ],
        );
        let row = self.database.query_one(stmt).await?;
        match row {
            Some(row) => Ok(row.try_get("", "sum")?),
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bounds() {
        assert!(validate_page(0, 10).is_err());
        assert!(validate_page(1, 0).is_err());
        assert!(validate_page(1, MAX_PAGE_LIMIT + 1).is_err());
        assert!(validate_page(3, MAX_PAGE_LIMIT).is_ok());
    }
}
