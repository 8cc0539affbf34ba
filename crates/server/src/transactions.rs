//! Transactions API endpoints
//!
//! Every mutation commits first and then reconciles the budgets it touched.
//! Reconciliation problems end up in `warnings`; they never fail the
//! request.

use api_types::{
    budget::BudgetView,
    transaction::{
        CategoryTotal, Pagination, SummaryQuery, SummaryResponse, TransactionListResponse,
        TransactionMutation, TransactionNew, TransactionQuery, TransactionUpdate, TransactionView,
    },
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use engine::{NewTransactionCmd, TransactionListFilter, UpdateTransactionCmd};
use uuid::Uuid;

use crate::{
    ApiJson, ApiPath, ApiQuery, ServerError,
    auth::AuthUser,
    convert::{
        kind_from_api, kind_totals_to_api, recurrence_from_api, to_utc, transaction_view,
    },
    reconcile::{affected_budgets, reconcile, reconcile_all},
    server::TransactionsState,
};

const DEFAULT_PAGE_LIMIT: u64 = 10;

async fn reconcile_affected(
    state: &TransactionsState,
    user: &AuthUser,
    before: Option<&engine::Transaction>,
    after: Option<&engine::Transaction>,
) -> Vec<String> {
    let ids = affected_budgets(before, after);
    reconcile_all(
        &state.base.engine,
        &state.budgets,
        &user.id,
        &user.credential,
        &ids,
    )
    .await
}

pub async fn create(
    Extension(user): Extension<AuthUser>,
    State(state): State<TransactionsState>,
    WithRejection(Json(payload), _): ApiJson<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionMutation>), ServerError> {
    let occurred_at = payload.occurred_at.map(to_utc).unwrap_or_else(Utc::now);
    let cmd = NewTransactionCmd::new(
        user.id.as_str(),
        kind_from_api(payload.kind),
        payload.amount_minor,
        payload.category,
        payload.description,
        occurred_at,
    )
    .budget_id(payload.budget_id)
    .recurrence(recurrence_from_api(payload.recurrence))
    .tags(payload.tags);

    let created = state.base.engine.create_transaction(cmd).await?;
    let warnings = reconcile_affected(&state, &user, None, Some(&created)).await;

    Ok((
        StatusCode::CREATED,
        Json(TransactionMutation {
            transaction: transaction_view(created),
            warnings,
        }),
    ))
}

pub async fn list(
    Extension(user): Extension<AuthUser>,
    State(state): State<TransactionsState>,
    WithRejection(Query(query), _): ApiQuery<TransactionQuery>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    let filter = TransactionListFilter {
        kind: query.kind.map(kind_from_api),
        category: query.category,
        from: query.start.map(to_utc),
        to: query.end.map(to_utc),
    };

    let result = state
        .base
        .engine
        .list_transactions(&user.id, &filter, page, limit)
        .await?;

    Ok(Json(TransactionListResponse {
        transactions: result
            .transactions
            .into_iter()
            .map(transaction_view)
            .collect(),
        pagination: Pagination {
            current: result.page,
            pages: result.pages,
            total: result.total,
        },
    }))
}

pub async fn get(
    Extension(user): Extension<AuthUser>,
    State(state): State<TransactionsState>,
    WithRejection(Path(id), _): ApiPath<Uuid>,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = state.base.engine.transaction(&user.id, id).await?;
    Ok(Json(transaction_view(tx)))
}

pub async fn update(
    Extension(user): Extension<AuthUser>,
    State(state): State<TransactionsState>,
    WithRejection(Path(id), _): ApiPath<Uuid>,
    WithRejection(Json(payload), _): ApiJson<TransactionUpdate>,
) -> Result<Json<TransactionMutation>, ServerError> {
    let cmd = UpdateTransactionCmd {
        user_id: user.id.clone(),
        transaction_id: id,
        amount_minor: payload.amount_minor,
        kind: payload.kind.map(kind_from_api),
        category: payload.category,
        description: payload.description,
        occurred_at: payload.occurred_at.map(to_utc),
        budget_id: payload.budget_id,
        recurrence: payload.recurrence.map(recurrence_from_api),
        tags: payload.tags,
    };

    let updated = state.base.engine.update_transaction(cmd).await?;
    let warnings =
        reconcile_affected(&state, &user, Some(&updated.before), Some(&updated.after)).await;

    Ok(Json(TransactionMutation {
        transaction: transaction_view(updated.after),
        warnings,
    }))
}

pub async fn delete(
    Extension(user): Extension<AuthUser>,
    State(state): State<TransactionsState>,
    WithRejection(Path(id), _): ApiPath<Uuid>,
) -> Result<Json<TransactionMutation>, ServerError> {
    let deleted = state.base.engine.delete_transaction(&user.id, id).await?;
    let warnings = reconcile_affected(&state, &user, Some(&deleted), None).await;

    Ok(Json(TransactionMutation {
        transaction: transaction_view(deleted),
        warnings,
    }))
}

pub async fn summary(
    Extension(user): Extension<AuthUser>,
    State(state): State<TransactionsState>,
    WithRejection(Query(query), _): ApiQuery<SummaryQuery>,
) -> Result<Json<SummaryResponse>, ServerError> {
    let summary = state
        .base
        .engine
        .transaction_summary(&user.id, query.start.map(to_utc), query.end.map(to_utc))
        .await?;

    Ok(Json(SummaryResponse {
        summary: kind_totals_to_api(summary.by_kind),
        category_breakdown: summary
            .expense_by_category
            .into_iter()
            .map(|total| CategoryTotal {
                category: total.category,
                total_minor: total.total_minor,
                count: total.count,
            })
            .collect(),
    }))
}

/// Reconciles one budget on demand. Unlike the mutation handlers, failures
/// are reported as errors.
pub async fn reconcile_budget(
    Extension(user): Extension<AuthUser>,
    State(state): State<TransactionsState>,
    WithRejection(Path(budget_id), _): ApiPath<Uuid>,
) -> Result<Json<BudgetView>, ServerError> {
    let budget = reconcile(
        &state.base.engine,
        &state.budgets,
        &user.id,
        &user.credential,
        budget_id,
    )
    .await?;
    Ok(Json(budget))
}
