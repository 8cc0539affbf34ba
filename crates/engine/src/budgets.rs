//! Budgets and their cached spend total.
//!
//! `spent_minor` is a derived cache: the authoritative value is the sum of
//! the owner's expense transactions that reference the budget, recomputed by
//! reconciliation. Users may still write it directly; the next
//! reconciliation overwrites it.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, budget_goals, util::parse_uuid};

pub const DEFAULT_ALERT_THRESHOLD: u8 = 80;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetPeriod {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl BudgetPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl TryFrom<&str> for BudgetPeriod {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(EngineError::InvalidField(format!(
                "invalid budget period: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alerts {
    pub enabled: bool,
    /// Percentage in `0..=100`.
    pub threshold: u8,
}

impl Default for Alerts {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: DEFAULT_ALERT_THRESHOLD,
        }
    }
}

impl Alerts {
    pub(crate) fn validate(self) -> ResultEngine<Self> {
        if self.threshold > 100 {
            return Err(EngineError::InvalidField(
                "alert threshold must be between 0 and 100".to_string(),
            ));
        }
        Ok(self)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub description: String,
    pub target_amount_minor: i64,
    pub current_amount_minor: i64,
    pub target_date: DateTime<Utc>,
    pub is_completed: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub category: String,
    pub limit_minor: i64,
    pub spent_minor: i64,
    pub period: BudgetPeriod,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    pub alerts: Alerts,
    pub goals: Vec<Goal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Budget {
    /// `spent / limit * 100`, or 0 when the limit is 0.
    pub fn percentage_spent(&self) -> f64 {
        if self.limit_minor > 0 {
            self.spent_minor as f64 / self.limit_minor as f64 * 100.0
        } else {
            0.0
        }
    }

    /// `max(0, limit - spent)`.
    pub fn remaining_minor(&self) -> i64 {
        self.limit_minor.saturating_sub(self.spent_minor).max(0)
    }

    pub fn is_over_limit(&self) -> bool {
        self.spent_minor > self.limit_minor
    }

    /// Spending reached the alert threshold without exceeding the limit.
    pub fn is_near_limit(&self) -> bool {
        !self.is_over_limit() && self.percentage_spent() >= f64::from(self.alerts.threshold)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub category: String,
    pub limit_minor: i64,
    pub spent_minor: i64,
    pub period: String,
    pub start_date: DateTimeUtc,
    pub end_date: DateTimeUtc,
    pub is_active: bool,
    pub alerts_enabled: bool,
    pub alert_threshold: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::budget_goals::Entity")]
    Goals,
}

impl Related<super::budget_goals::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Goals.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Budget> for ActiveModel {
    fn from(budget: &Budget) -> Self {
        Self {
            id: ActiveValue::Set(budget.id.to_string()),
            user_id: ActiveValue::Set(budget.user_id.clone()),
            name: ActiveValue::Set(budget.name.clone()),
            category: ActiveValue::Set(budget.category.clone()),
            limit_minor: ActiveValue::Set(budget.limit_minor),
            spent_minor: ActiveValue::Set(budget.spent_minor),
            period: ActiveValue::Set(budget.period.as_str().to_string()),
            start_date: ActiveValue::Set(budget.start_date),
            end_date: ActiveValue::Set(budget.end_date),
            is_active: ActiveValue::Set(budget.is_active),
            alerts_enabled: ActiveValue::Set(budget.alerts.enabled),
            alert_threshold: ActiveValue::Set(i32::from(budget.alerts.threshold)),
            created_at: ActiveValue::Set(budget.created_at),
            updated_at: ActiveValue::Set(budget.updated_at),
        }
    }
}

impl Budget {
    /// Builds a budget from its row and its goal rows (any order).
    pub(crate) fn from_models(
        model: Model,
        mut goals: Vec<budget_goals::Model>,
    ) -> ResultEngine<Self> {
        goals.sort_by_key(|goal| goal.position);
        let goals = goals
            .into_iter()
            .map(Goal::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;
        let threshold = u8::try_from(model.alert_threshold).map_err(|_| {
            EngineError::InvalidField(format!(
                "invalid stored alert threshold: {}",
                model.alert_threshold
            ))
        })?;

        Ok(Self {
            id: parse_uuid(&model.id, "budget")?,
            user_id: model.user_id,
            name: model.name,
            category: model.category,
            limit_minor: model.limit_minor,
            spent_minor: model.spent_minor,
            period: BudgetPeriod::try_from(model.period.as_str())?,
            start_date: model.start_date,
            end_date: model.end_date,
            is_active: model.is_active,
            alerts: Alerts {
                enabled: model.alerts_enabled,
                threshold,
            },
            goals,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

impl TryFrom<budget_goals::Model> for Goal {
    type Error = EngineError;

    fn try_from(model: budget_goals::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "goal")?,
            description: model.description,
            target_amount_minor: model.target_amount_minor,
            current_amount_minor: model.current_amount_minor,
            target_date: model.target_date,
            is_completed: model.is_completed,
        })
    }
}
