//! Mapping between engine types and wire types.

use api_types::{
    budget::{self as api_budget, BudgetView, GoalView},
    transaction::{self as api_tx, TransactionView},
    user::{self as api_user, UserView},
};
use chrono::{DateTime, FixedOffset, Utc};

pub(crate) fn to_utc(dt: DateTime<FixedOffset>) -> DateTime<Utc> {
    dt.with_timezone(&Utc)
}

fn to_fixed(dt: DateTime<Utc>) -> DateTime<FixedOffset> {
    dt.fixed_offset()
}

pub(crate) fn kind_from_api(kind: api_tx::TransactionKind) -> engine::TransactionKind {
    match kind {
        api_tx::TransactionKind::Income => engine::TransactionKind::Income,
        api_tx::TransactionKind::Expense => engine::TransactionKind::Expense,
    }
}

fn kind_to_api(kind: engine::TransactionKind) -> api_tx::TransactionKind {
    match kind {
        engine::TransactionKind::Income => api_tx::TransactionKind::Income,
        engine::TransactionKind::Expense => api_tx::TransactionKind::Expense,
    }
}

fn frequency_from_api(frequency: api_tx::Frequency) -> engine::Frequency {
    match frequency {
        api_tx::Frequency::Daily => engine::Frequency::Daily,
        api_tx::Frequency::Weekly => engine::Frequency::Weekly,
        api_tx::Frequency::Monthly => engine::Frequency::Monthly,
        api_tx::Frequency::Yearly => engine::Frequency::Yearly,
    }
}

fn frequency_to_api(frequency: engine::Frequency) -> api_tx::Frequency {
    match frequency {
        engine::Frequency::Daily => api_tx::Frequency::Daily,
        engine::Frequency::Weekly => api_tx::Frequency::Weekly,
        engine::Frequency::Monthly => api_tx::Frequency::Monthly,
        engine::Frequency::Yearly => api_tx::Frequency::Yearly,
    }
}

pub(crate) fn recurrence_from_api(recurrence: api_tx::Recurrence) -> engine::Recurrence {
    match recurrence {
        api_tx::Recurrence::NotRecurring => engine::Recurrence::NotRecurring,
        api_tx::Recurrence::Recurring {
            frequency,
            next_date,
        } => engine::Recurrence::Recurring {
            frequency: frequency_from_api(frequency),
            next_date: to_utc(next_date),
        },
    }
}

fn recurrence_to_api(recurrence: engine::Recurrence) -> api_tx::Recurrence {
    match recurrence {
        engine::Recurrence::NotRecurring => api_tx::Recurrence::NotRecurring,
        engine::Recurrence::Recurring {
            frequency,
            next_date,
        } => api_tx::Recurrence::Recurring {
            frequency: frequency_to_api(frequency),
            next_date: to_fixed(next_date),
        },
    }
}

pub(crate) fn transaction_view(tx: engine::Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        amount_minor: tx.amount_minor,
        kind: kind_to_api(tx.kind),
        category: tx.category,
        description: tx.description,
        occurred_at: to_fixed(tx.occurred_at),
        budget_id: tx.budget_id,
        recurrence: recurrence_to_api(tx.recurrence),
        tags: tx.tags,
    }
}

pub(crate) fn period_from_api(period: api_budget::BudgetPeriod) -> engine::BudgetPeriod {
    match period {
        api_budget::BudgetPeriod::Daily => engine::BudgetPeriod::Daily,
        api_budget::BudgetPeriod::Weekly => engine::BudgetPeriod::Weekly,
        api_budget::BudgetPeriod::Monthly => engine::BudgetPeriod::Monthly,
        api_budget::BudgetPeriod::Yearly => engine::BudgetPeriod::Yearly,
    }
}

fn period_to_api(period: engine::BudgetPeriod) -> api_budget::BudgetPeriod {
    match period {
        engine::BudgetPeriod::Daily => api_budget::BudgetPeriod::Daily,
        engine::BudgetPeriod::Weekly => api_budget::BudgetPeriod::Weekly,
        engine::BudgetPeriod::Monthly => api_budget::BudgetPeriod::Monthly,
        engine::BudgetPeriod::Yearly => api_budget::BudgetPeriod::Yearly,
    }
}

pub(crate) fn alerts_from_api(alerts: api_budget::Alerts) -> engine::Alerts {
    engine::Alerts {
        enabled: alerts.enabled,
        threshold: alerts.threshold,
    }
}

fn goal_view(goal: engine::Goal) -> GoalView {
    GoalView {
        id: goal.id,
        description: goal.description,
        target_amount_minor: goal.target_amount_minor,
        current_amount_minor: goal.current_amount_minor,
        target_date: to_fixed(goal.target_date),
        is_completed: goal.is_completed,
    }
}

pub(crate) fn budget_view(budget: engine::Budget) -> BudgetView {
    let remaining_minor = budget.remaining_minor();
    let percentage_spent = budget.percentage_spent();
    BudgetView {
        id: budget.id,
        name: budget.name,
        category: budget.category,
        limit_minor: budget.limit_minor,
        spent_minor: budget.spent_minor,
        remaining_minor,
        percentage_spent,
        period: period_to_api(budget.period),
        start_date: to_fixed(budget.start_date),
        end_date: to_fixed(budget.end_date),
        is_active: budget.is_active,
        alerts: api_budget::Alerts {
            enabled: budget.alerts.enabled,
            threshold: budget.alerts.threshold,
        },
        goals: budget.goals.into_iter().map(goal_view).collect(),
    }
}

pub(crate) fn theme_from_api(theme: api_user::Theme) -> engine::Theme {
    match theme {
        api_user::Theme::Light => engine::Theme::Light,
        api_user::Theme::Dark => engine::Theme::Dark,
    }
}

fn theme_to_api(theme: engine::Theme) -> api_user::Theme {
    match theme {
        engine::Theme::Light => api_user::Theme::Light,
        engine::Theme::Dark => api_user::Theme::Dark,
    }
}

pub(crate) fn user_view(user: engine::User) -> UserView {
    UserView {
        id: user.id,
        username: user.username,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        preferences: api_user::Preferences {
            currency: user.preferences.currency,
            theme: theme_to_api(user.preferences.theme),
        },
    }
}

pub(crate) fn kind_totals_to_api(totals: Vec<engine::KindTotal>) -> Vec<api_tx::KindTotal> {
    totals
        .into_iter()
        .map(|total| api_tx::KindTotal {
            kind: kind_to_api(total.kind),
            total_minor: total.total_minor,
            count: total.count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_view_carries_derived_fields() {
        let now = Utc::now();
        let budget = engine::Budget {
            id: uuid::Uuid::new_v4(),
            user_id: "alice".to_string(),
            name: "Groceries".to_string(),
            category: "food".to_string(),
            limit_minor: 40_000,
            spent_minor: 30_000,
            period: engine::BudgetPeriod::Monthly,
            start_date: now,
            end_date: now,
            is_active: true,
            alerts: engine::Alerts::default(),
            goals: vec![],
            created_at: now,
            updated_at: now,
        };
        let view = budget_view(budget);
        assert_eq!(view.remaining_minor, 10_000);
        assert_eq!(view.percentage_spent, 75.0);
        assert_eq!(view.alerts.threshold, 80);
    }

    #[test]
    fn recurrence_converts_to_utc() {
        let next_date = DateTime::parse_from_rfc3339("2026-02-01T02:00:00+02:00").unwrap();
        let converted = recurrence_from_api(api_tx::Recurrence::Recurring {
            frequency: api_tx::Frequency::Weekly,
            next_date,
        });
        match converted {
            engine::Recurrence::Recurring {
                frequency,
                next_date,
            } => {
                assert_eq!(frequency, engine::Frequency::Weekly);
                assert_eq!(next_date.to_rfc3339(), "2026-02-01T00:00:00+00:00");
            }
            engine::Recurrence::NotRecurring => panic!("expected recurring"),
        }
    }
}
