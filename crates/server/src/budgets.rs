//! Budgets API endpoints

use api_types::budget::{
    AnalyticsResponse, BudgetListResponse, BudgetNew, BudgetQuery, BudgetUpdate, BudgetView,
    CategoryUsage, GoalNew, GoalUpdate,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use engine::{BudgetListFilter, BudgetPatch, GoalPatch, NewBudgetCmd, NewGoalCmd};
use uuid::Uuid;

use crate::{
    ApiJson, ApiPath, ApiQuery, ServerError,
    auth::AuthUser,
    convert::{alerts_from_api, budget_view, period_from_api, to_utc},
    server::ServerState,
};

pub async fn create(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    WithRejection(Json(payload), _): ApiJson<BudgetNew>,
) -> Result<(StatusCode, Json<BudgetView>), ServerError> {
    let budget = state
        .engine
        .create_budget(NewBudgetCmd {
            user_id: user.id,
            name: payload.name,
            category: payload.category,
            limit_minor: payload.limit_minor,
            period: period_from_api(payload.period),
            start_date: to_utc(payload.start_date),
            end_date: to_utc(payload.end_date),
            alerts: payload.alerts.map(alerts_from_api),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(budget_view(budget))))
}

pub async fn list(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    WithRejection(Query(query), _): ApiQuery<BudgetQuery>,
) -> Result<Json<BudgetListResponse>, ServerError> {
    let filter = BudgetListFilter {
        active: query.active,
        category: query.category,
        period: query.period.map(period_from_api),
    };
    let budgets = state.engine.list_budgets(&user.id, &filter).await?;

    Ok(Json(BudgetListResponse {
        budgets: budgets.into_iter().map(budget_view).collect(),
    }))
}

pub async fn get(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    WithRejection(Path(id), _): ApiPath<Uuid>,
) -> Result<Json<BudgetView>, ServerError> {
    let budget = state.engine.budget(&user.id, id).await?;
    Ok(Json(budget_view(budget)))
}

/// Partial update. Also the endpoint reconciliation writes `spent_minor`
/// through.
pub async fn update(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    WithRejection(Path(id), _): ApiPath<Uuid>,
    WithRejection(Json(payload), _): ApiJson<BudgetUpdate>,
) -> Result<Json<BudgetView>, ServerError> {
    let patch = BudgetPatch {
        name: payload.name,
        category: payload.category,
        limit_minor: payload.limit_minor,
        spent_minor: payload.spent_minor,
        period: payload.period.map(period_from_api),
        start_date: payload.start_date.map(to_utc),
        end_date: payload.end_date.map(to_utc),
        is_active: payload.is_active,
        alerts: payload.alerts.map(alerts_from_api),
    };
    let budget = state.engine.update_budget(&user.id, id, patch).await?;
    Ok(Json(budget_view(budget)))
}

pub async fn delete(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    WithRejection(Path(id), _): ApiPath<Uuid>,
) -> Result<Json<BudgetView>, ServerError> {
    let budget = state.engine.delete_budget(&user.id, id).await?;
    tracing::info!(budget_id = %id, "budget deleted");
    Ok(Json(budget_view(budget)))
}

pub async fn add_goal(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    WithRejection(Path(id), _): ApiPath<Uuid>,
    WithRejection(Json(payload), _): ApiJson<GoalNew>,
) -> Result<(StatusCode, Json<BudgetView>), ServerError> {
    let budget = state
        .engine
        .add_goal(
            &user.id,
            id,
            NewGoalCmd {
                description: payload.description,
                target_amount_minor: payload.target_amount_minor,
                target_date: to_utc(payload.target_date),
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(budget_view(budget))))
}

pub async fn update_goal(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    WithRejection(Path((id, goal_id)), _): ApiPath<(Uuid, Uuid)>,
    WithRejection(Json(payload), _): ApiJson<GoalUpdate>,
) -> Result<Json<BudgetView>, ServerError> {
    let patch = GoalPatch {
        description: payload.description,
        target_amount_minor: payload.target_amount_minor,
        current_amount_minor: payload.current_amount_minor,
        target_date: payload.target_date.map(to_utc),
        is_completed: payload.is_completed,
    };
    let budget = state
        .engine
        .update_goal(&user.id, id, goal_id, patch)
        .await?;
    Ok(Json(budget_view(budget)))
}

pub async fn analytics(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
) -> Result<Json<AnalyticsResponse>, ServerError> {
    let analytics = state.engine.budget_analytics(&user.id).await?;

    Ok(Json(AnalyticsResponse {
        total_budgets: analytics.total_budgets,
        total_limit_minor: analytics.total_limit_minor,
        total_spent_minor: analytics.total_spent_minor,
        budgets_over_limit: analytics.budgets_over_limit,
        budgets_near_limit: analytics.budgets_near_limit,
        category_breakdown: analytics
            .category_breakdown
            .into_iter()
            .map(|usage| CategoryUsage {
                budget_id: usage.budget_id,
                category: usage.category,
                limit_minor: usage.limit_minor,
                spent_minor: usage.spent_minor,
                percentage: usage.percentage,
                remaining_minor: usage.remaining_minor,
            })
            .collect(),
    }))
}
