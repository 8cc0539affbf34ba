//! Command structs for engine operations.
//!
//! These types group parameters for write operations (create/update of
//! transactions, budgets, goals and users), keeping call sites readable and
//! avoiding long argument lists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Alerts, BudgetPeriod, Recurrence, Theme, TransactionKind};

/// Create a transaction.
#[derive(Clone, Debug)]
pub struct NewTransactionCmd {
    pub user_id: String,
    pub amount_minor: i64,
    pub kind: TransactionKind,
    pub category: String,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
    pub budget_id: Option<Uuid>,
    pub recurrence: Recurrence,
    pub tags: Vec<String>,
}

impl NewTransactionCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        kind: TransactionKind,
        amount_minor: i64,
        category: impl Into<String>,
        description: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            amount_minor,
            kind,
            category: category.into(),
            description: description.into(),
            occurred_at,
            budget_id: None,
            recurrence: Recurrence::NotRecurring,
            tags: Vec::new(),
        }
    }

    /// Accepts a `Uuid` or an `Option<Uuid>`; `None` leaves the
    /// transaction unlinked.
    #[must_use]
    pub fn budget_id(mut self, budget_id: impl Into<Option<Uuid>>) -> Self {
        self.budget_id = budget_id.into();
        self
    }

    #[must_use]
    pub fn recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = recurrence;
        self
    }

    #[must_use]
    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// Patch an existing transaction. `None` keeps the stored value.
///
/// `budget_id` is doubly optional: `Some(None)` clears the reference.
#[derive(Clone, Debug)]
pub struct UpdateTransactionCmd {
    pub user_id: String,
    pub transaction_id: Uuid,
    pub amount_minor: Option<i64>,
    pub kind: Option<TransactionKind>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub budget_id: Option<Option<Uuid>>,
    pub recurrence: Option<Recurrence>,
    pub tags: Option<Vec<String>>,
}

impl UpdateTransactionCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, transaction_id: Uuid) -> Self {
        Self {
            user_id: user_id.into(),
            transaction_id,
            amount_minor: None,
            kind: None,
            category: None,
            description: None,
            occurred_at: None,
            budget_id: None,
            recurrence: None,
            tags: None,
        }
    }

    #[must_use]
    pub fn amount_minor(mut self, amount_minor: i64) -> Self {
        self.amount_minor = Some(amount_minor);
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn budget_id(mut self, budget_id: Option<Uuid>) -> Self {
        self.budget_id = Some(budget_id);
        self
    }
}

/// Create a budget.
#[derive(Clone, Debug)]
pub struct NewBudgetCmd {
    pub user_id: String,
    pub name: String,
    pub category: String,
    pub limit_minor: i64,
    pub period: BudgetPeriod,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub alerts: Option<Alerts>,
}

/// Patch a budget. `None` keeps the stored value.
#[derive(Clone, Debug, Default)]
pub struct BudgetPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub limit_minor: Option<i64>,
    pub spent_minor: Option<i64>,
    pub period: Option<BudgetPeriod>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
    pub alerts: Option<Alerts>,
}

impl BudgetPatch {
    /// A patch that only overwrites the cached spend total.
    #[must_use]
    pub fn spent(spent_minor: i64) -> Self {
        Self {
            spent_minor: Some(spent_minor),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug)]
pub struct NewGoalCmd {
    pub description: String,
    pub target_amount_minor: i64,
    pub target_date: DateTime<Utc>,
}

#[derive(Clone, Debug, Default)]
pub struct GoalPatch {
    pub description: Option<String>,
    pub target_amount_minor: Option<i64>,
    pub current_amount_minor: Option<i64>,
    pub target_date: Option<DateTime<Utc>>,
    pub is_completed: Option<bool>,
}

#[derive(Clone, Debug)]
pub struct RegisterUserCmd {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Clone, Debug, Default)]
pub struct ProfilePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub currency: Option<String>,
    pub theme: Option<Theme>,
}
