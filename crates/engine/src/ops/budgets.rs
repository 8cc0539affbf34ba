use chrono::Utc;
use uuid::Uuid;

use sea_orm::{
    ActiveModelTrait, ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*,
    sea_query::{Expr, Func, LikeExpr},
};

use crate::{
    Budget, BudgetPatch, BudgetPeriod, EngineError, Goal, GoalPatch, NewBudgetCmd,
    NewGoalCmd, ResultEngine, budget_goals, budgets,
    util::{
        add_to_total, contains_pattern, normalize_required_text, validate_non_negative_amount,
        validate_range,
    },
};

use super::{Engine, with_tx};

/// Filters for listing budgets.
#[derive(Clone, Debug, Default)]
pub struct BudgetListFilter {
    pub active: Option<bool>,
    /// Case-insensitive substring of the category.
    pub category: Option<String>,
    pub period: Option<BudgetPeriod>,
}

/// Usage of one active budget.
#[derive(Clone, Debug, PartialEq)]
pub struct CategoryUsage {
    pub budget_id: Uuid,
    pub category: String,
    pub limit_minor: i64,
    pub spent_minor: i64,
    pub percentage: f64,
    pub remaining_minor: i64,
}

/// Overview across the user's active budgets.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BudgetAnalytics {
    pub total_budgets: u64,
    pub total_limit_minor: i64,
    pub total_spent_minor: i64,
    pub budgets_over_limit: u64,
    pub budgets_near_limit: u64,
    pub category_breakdown: Vec<CategoryUsage>,
}

impl BudgetAnalytics {
    fn from_budgets(budgets: &[Budget]) -> ResultEngine<Self> {
        let mut analytics = Self::default();
        for budget in budgets.iter().filter(|b| b.is_active) {
            analytics.total_budgets += 1;
            analytics.total_limit_minor =
                add_to_total(analytics.total_limit_minor, budget.limit_minor, "total limit")?;
            analytics.total_spent_minor =
                add_to_total(analytics.total_spent_minor, budget.spent_minor, "total spent")?;
            if budget.is_over_limit() {
                analytics.budgets_over_limit += 1;
            }
            if budget.is_near_limit() {
                analytics.budgets_near_limit += 1;
            }
            analytics.category_breakdown.push(CategoryUsage {
                budget_id: budget.id,
                category: budget.category.clone(),
                limit_minor: budget.limit_minor,
                spent_minor: budget.spent_minor,
                percentage: budget.percentage_spent(),
                remaining_minor: budget.remaining_minor(),
            });
        }
        Ok(analytics)
    }
}

fn validate_goal(goal: &Goal) -> ResultEngine<()> {
    validate_non_negative_amount(goal.target_amount_minor, "target_amount_minor")?;
    validate_non_negative_amount(goal.current_amount_minor, "current_amount_minor")
}

impl Engine {
    async fn require_budget_model(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        budget_id: Uuid,
    ) -> ResultEngine<budgets::Model> {
        budgets::Entity::find_by_id(budget_id.to_string())
            .filter(budgets::Column::UserId.eq(user_id))
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("budget not exists".to_string()))
    }

    async fn load_budget(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        budget_id: Uuid,
    ) -> ResultEngine<Budget> {
        let model = self.require_budget_model(db_tx, user_id, budget_id).await?;
        let goals = model.find_related(budget_goals::Entity).all(db_tx).await?;
        Budget::from_models(model, goals)
    }

    /// Fails with `ExistingKey` when another active budget of the user shares
    /// category and period.
    async fn ensure_no_active_duplicate(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        category: &str,
        period: BudgetPeriod,
        except: Option<Uuid>,
    ) -> ResultEngine<()> {
        let mut query = budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(user_id))
            .filter(budgets::Column::Category.eq(category))
            .filter(budgets::Column::Period.eq(period.as_str()))
            .filter(budgets::Column::IsActive.eq(true));
        if let Some(except) = except {
            query = query.filter(budgets::Column::Id.ne(except.to_string()));
        }
        if query.one(db_tx).await?.is_some() {
            return Err(EngineError::ExistingKey(format!(
                "active {} budget for category {category}",
                period.as_str()
            )));
        }
        Ok(())
    }

    /// Creates a budget with `spent_minor = 0`.
    pub async fn create_budget(&self, cmd: NewBudgetCmd) -> ResultEngine<Budget> {
        let name = normalize_required_text(&cmd.name, "name")?;
        let category = normalize_required_text(&cmd.category, "category")?;
        validate_non_negative_amount(cmd.limit_minor, "limit_minor")?;
        validate_range(Some(cmd.start_date), Some(cmd.end_date))?;
        let alerts = cmd.alerts.unwrap_or_default().validate()?;

        with_tx!(self, |db_tx| {
            self.ensure_no_active_duplicate(&db_tx, &cmd.user_id, &category, cmd.period, None)
                .await?;

            let now = Utc::now();
            let budget = Budget {
                id: Uuid::new_v4(),
                user_id: cmd.user_id.clone(),
                name,
                category,
                limit_minor: cmd.limit_minor,
                spent_minor: 0,
                period: cmd.period,
                start_date: cmd.start_date,
                end_date: cmd.end_date,
                is_active: true,
                alerts,
                goals: Vec::new(),
                created_at: now,
                updated_at: now,
            };
            budgets::ActiveModel::from(&budget).insert(&db_tx).await?;
            Ok(budget)
        })
    }

    /// Return a budget owned by `user_id`, goals included.
    pub async fn budget(&self, user_id: &str, budget_id: Uuid) -> ResultEngine<Budget> {
        with_tx!(self, |db_tx| self.load_budget(&db_tx, user_id, budget_id).await)
    }

    /// Lists the user's budgets, newest first.
    pub async fn list_budgets(
        &self,
        user_id: &str,
        filter: &BudgetListFilter,
    ) -> ResultEngine<Vec<Budget>> {
        let mut query = budgets::Entity::find().filter(budgets::Column::UserId.eq(user_id));
        if let Some(active) = filter.active {
            query = query.filter(budgets::Column::IsActive.eq(active));
        }
        if let Some(category) = filter.category.as_deref().filter(|c| !c.trim().is_empty()) {
            query = query.filter(
                Expr::expr(Func::lower(Expr::col(budgets::Column::Category)))
                    .like(LikeExpr::new(contains_pattern(category)).escape('\\')),
            );
        }
        if let Some(period) = filter.period {
            query = query.filter(budgets::Column::Period.eq(period.as_str()));
        }

        let rows = query
            .order_by_desc(budgets::Column::CreatedAt)
            .find_with_related(budget_goals::Entity)
            .all(&self.database)
            .await?;
        rows.into_iter()
            .map(|(model, goals)| Budget::from_models(model, goals))
            .collect()
    }

    /// Applies a partial update.
    ///
    /// This is also the write path of reconciliation, which only sets
    /// `spent_minor`.
    pub async fn update_budget(
        &self,
        user_id: &str,
        budget_id: Uuid,
        patch: BudgetPatch,
    ) -> ResultEngine<Budget> {
        with_tx!(self, |db_tx| {
            let mut budget = self.load_budget(&db_tx, user_id, budget_id).await?;
            let was = (budget.category.clone(), budget.period, budget.is_active);

            if let Some(name) = patch.name.as_deref() {
                budget.name = normalize_required_text(name, "name")?;
            }
            if let Some(category) = patch.category.as_deref() {
                budget.category = normalize_required_text(category, "category")?;
            }
            if let Some(limit_minor) = patch.limit_minor {
                validate_non_negative_amount(limit_minor, "limit_minor")?;
                budget.limit_minor = limit_minor;
            }
            if let Some(spent_minor) = patch.spent_minor {
                validate_non_negative_amount(spent_minor, "spent_minor")?;
                budget.spent_minor = spent_minor;
            }
            if let Some(period) = patch.period {
                budget.period = period;
            }
            if let Some(start_date) = patch.start_date {
                budget.start_date = start_date;
            }
            if let Some(end_date) = patch.end_date {
                budget.end_date = end_date;
            }
            validate_range(Some(budget.start_date), Some(budget.end_date))?;
            if let Some(is_active) = patch.is_active {
                budget.is_active = is_active;
            }
            if let Some(alerts) = patch.alerts {
                budget.alerts = alerts.validate()?;
            }

            let after = (budget.category.clone(), budget.period, budget.is_active);
            if budget.is_active && after != was {
                self.ensure_no_active_duplicate(
                    &db_tx,
                    user_id,
                    &budget.category,
                    budget.period,
                    Some(budget_id),
                )
                .await?;
            }

            budget.updated_at = Utc::now();
            budgets::ActiveModel::from(&budget).update(&db_tx).await?;
            Ok(budget)
        })
    }

    /// Deletes a budget and its goals, returning what was stored.
    ///
    /// Transactions referencing the budget keep their dangling reference.
    pub async fn delete_budget(&self, user_id: &str, budget_id: Uuid) -> ResultEngine<Budget> {
        with_tx!(self, |db_tx| {
            let budget = self.load_budget(&db_tx, user_id, budget_id).await?;
            budget_goals::Entity::delete_many()
                .filter(budget_goals::Column::BudgetId.eq(budget_id.to_string()))
                .exec(&db_tx)
                .await?;
            budgets::Entity::delete_by_id(budget_id.to_string())
                .exec(&db_tx)
                .await?;
            Ok(budget)
        })
    }

    /// Appends a goal to the budget.
    pub async fn add_goal(
        &self,
        user_id: &str,
        budget_id: Uuid,
        cmd: NewGoalCmd,
    ) -> ResultEngine<Budget> {
        let goal = Goal {
            id: Uuid::new_v4(),
            description: normalize_required_text(&cmd.description, "description")?,
            target_amount_minor: cmd.target_amount_minor,
            current_amount_minor: 0,
            target_date: cmd.target_date,
            is_completed: false,
        };
        validate_goal(&goal)?;

        with_tx!(self, |db_tx| {
            let mut budget = self.load_budget(&db_tx, user_id, budget_id).await?;
            let position = i32::try_from(budget.goals.len())
                .map_err(|_| EngineError::InvalidField("too many goals".to_string()))?;
            budget_goals::ActiveModel::from_goal(&goal, &budget_id.to_string(), position)
                .insert(&db_tx)
                .await?;
            budget.goals.push(goal);
            touch_budget(&db_tx, &mut budget).await?;
            Ok(budget)
        })
    }

    /// Patches one goal of the budget.
    pub async fn update_goal(
        &self,
        user_id: &str,
        budget_id: Uuid,
        goal_id: Uuid,
        patch: GoalPatch,
    ) -> ResultEngine<Budget> {
        with_tx!(self, |db_tx| {
            let mut budget = self.load_budget(&db_tx, user_id, budget_id).await?;
            let goal = budget
                .goals
                .iter_mut()
                .find(|goal| goal.id == goal_id)
                .ok_or_else(|| EngineError::KeyNotFound("goal not exists".to_string()))?;

            if let Some(description) = patch.description.as_deref() {
                goal.description = normalize_required_text(description, "description")?;
            }
            if let Some(target) = patch.target_amount_minor {
                goal.target_amount_minor = target;
            }
            if let Some(current) = patch.current_amount_minor {
                goal.current_amount_minor = current;
            }
            if let Some(target_date) = patch.target_date {
                goal.target_date = target_date;
            }
            if let Some(is_completed) = patch.is_completed {
                goal.is_completed = is_completed;
            }
            validate_goal(goal)?;

            let model = budget_goals::ActiveModel {
                id: ActiveValue::Unchanged(goal.id.to_string()),
                description: ActiveValue::Set(goal.description.clone()),
                target_amount_minor: ActiveValue::Set(goal.target_amount_minor),
                current_amount_minor: ActiveValue::Set(goal.current_amount_minor),
                target_date: ActiveValue::Set(goal.target_date),
                is_completed: ActiveValue::Set(goal.is_completed),
                ..Default::default()
            };
            model.update(&db_tx).await?;
            touch_budget(&db_tx, &mut budget).await?;
            Ok(budget)
        })
    }

    /// Totals across the user's active budgets.
    pub async fn budget_analytics(&self, user_id: &str) -> ResultEngine<BudgetAnalytics> {
        let filter = BudgetListFilter {
            active: Some(true),
            ..Default::default()
        };
        let budgets = self.list_budgets(user_id, &filter).await?;
        BudgetAnalytics::from_budgets(&budgets)
    }
}

async fn touch_budget(db_tx: &DatabaseTransaction, budget: &mut Budget) -> ResultEngine<()> {
    budget.updated_at = Utc::now();
    budgets::ActiveModel {
        id: ActiveValue::Unchanged(budget.id.to_string()),
        updated_at: ActiveValue::Set(budget.updated_at),
        ..Default::default()
    }
    .update(db_tx)
    .await?;
    Ok(())
}
