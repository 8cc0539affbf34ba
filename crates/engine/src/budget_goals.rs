//! Goals attached to a budget, ordered by `position`.

use sea_orm::{ActiveValue, entity::prelude::*};

use crate::Goal;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budget_goals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub budget_id: String,
    pub position: i32,
    pub description: String,
    pub target_amount_minor: i64,
    pub current_amount_minor: i64,
    pub target_date: DateTimeUtc,
    pub is_completed: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::budgets::Entity",
        from = "Column::BudgetId",
        to = "super::budgets::Column::Id"
    )]
    Budget,
}

impl Related<super::budgets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Budget.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub(crate) fn from_goal(goal: &Goal, budget_id: &str, position: i32) -> Self {
        Self {
            id: ActiveValue::Set(goal.id.to_string()),
            budget_id: ActiveValue::Set(budget_id.to_string()),
            position: ActiveValue::Set(position),
            description: ActiveValue::Set(goal.description.clone()),
            target_amount_minor: ActiveValue::Set(goal.target_amount_minor),
            current_amount_minor: ActiveValue::Set(goal.current_amount_minor),
            target_date: ActiveValue::Set(goal.target_date),
            is_completed: ActiveValue::Set(goal.is_completed),
        }
    }
}
