//! Transaction primitives.
//!
//! A `Transaction` is a single income or expense owned by one user. Expenses
//! may reference a budget; that reference is what drives reconciliation of
//! the budget's cached `spent` total.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    util::{decode_tags, encode_tags, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(EngineError::InvalidField(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl TryFrom<&str> for Frequency {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(EngineError::InvalidField(format!(
                "invalid recurrence frequency: {other}"
            ))),
        }
    }
}

/// How a transaction repeats.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recurrence {
    #[default]
    NotRecurring,
    Recurring {
        frequency: Frequency,
        next_date: DateTime<Utc>,
    },
}

impl Recurrence {
    /// Storage columns `(recurrence_frequency, recurrence_next_date)`.
    fn to_columns(self) -> (Option<String>, Option<DateTime<Utc>>) {
        match self {
            Self::NotRecurring => (None, None),
            Self::Recurring {
                frequency,
                next_date,
            } => (Some(frequency.as_str().to_string()), Some(next_date)),
        }
    }

    fn from_columns(
        frequency: Option<&str>,
        next_date: Option<DateTime<Utc>>,
    ) -> ResultEngine<Self> {
        match (frequency, next_date) {
            (None, None) => Ok(Self::NotRecurring),
            (Some(frequency), Some(next_date)) => Ok(Self::Recurring {
                frequency: Frequency::try_from(frequency)?,
                next_date,
            }),
            _ => Err(EngineError::InvalidField(
                "recurrence requires both frequency and next_date".to_string(),
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: String,
    pub amount_minor: i64,
    pub kind: TransactionKind,
    pub category: String,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
    pub budget_id: Option<Uuid>,
    pub recurrence: Recurrence,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// The budget whose `spent` total counts this transaction, if any.
    ///
    /// Only expenses count: a budget reference on an income is tolerated but
    /// never contributes.
    pub fn counted_budget(&self) -> Option<Uuid> {
        match self.kind {
            TransactionKind::Expense => self.budget_id,
            TransactionKind::Income => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub amount_minor: i64,
    pub kind: String,
    pub category: String,
    pub description: String,
    pub occurred_at: DateTimeUtc,
    pub budget_id: Option<String>,
    pub recurrence_frequency: Option<String>,
    pub recurrence_next_date: Option<DateTimeUtc>,
    pub tags: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<&Transaction> for ActiveModel {
    type Error = EngineError;

    fn try_from(tx: &Transaction) -> Result<Self, Self::Error> {
        let (recurrence_frequency, recurrence_next_date) = tx.recurrence.to_columns();
        Ok(Self {
            id: ActiveValue::Set(tx.id.to_string()),
            user_id: ActiveValue::Set(tx.user_id.clone()),
            amount_minor: ActiveValue::Set(tx.amount_minor),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            category: ActiveValue::Set(tx.category.clone()),
            description: ActiveValue::Set(tx.description.clone()),
            occurred_at: ActiveValue::Set(tx.occurred_at),
            budget_id: ActiveValue::Set(tx.budget_id.map(|id| id.to_string())),
            recurrence_frequency: ActiveValue::Set(recurrence_frequency),
            recurrence_next_date: ActiveValue::Set(recurrence_next_date),
            tags: ActiveValue::Set(encode_tags(&tx.tags)?),
            created_at: ActiveValue::Set(tx.created_at),
            updated_at: ActiveValue::Set(tx.updated_at),
        })
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            user_id: model.user_id,
            amount_minor: model.amount_minor,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            category: model.category,
            description: model.description,
            occurred_at: model.occurred_at,
            budget_id: model
                .budget_id
                .as_deref()
                .map(|id| parse_uuid(id, "budget"))
                .transpose()?,
            recurrence: Recurrence::from_columns(
                model.recurrence_frequency.as_deref(),
                model.recurrence_next_date,
            )?,
            tags: decode_tags(&model.tags)?,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
