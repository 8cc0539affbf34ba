use axum::{
    Json, Router, middleware,
    routing::{get, post, put},
};
use serde_json::{Value, json};

use std::sync::Arc;

use crate::{
    auth::{JwtKeys, require_auth},
    budget_client::BudgetClient,
    budgets, transactions, user,
};
use engine::Engine;

/// State shared by the users and budgets services.
#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub keys: Arc<JwtKeys>,
}

impl ServerState {
    pub fn new(engine: Engine, keys: JwtKeys) -> Self {
        Self {
            engine: Arc::new(engine),
            keys: Arc::new(keys),
        }
    }
}

/// The transactions service additionally talks to the budgets service.
#[derive(Clone)]
pub struct TransactionsState {
    pub base: ServerState,
    pub budgets: BudgetClient,
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn users_router(state: ServerState) -> Router {
    Router::new()
        .route(
            "/users/profile",
            get(user::profile).put(user::update_profile),
        )
        .route_layer(middleware::from_fn_with_state(
            state.keys.clone(),
            require_auth,
        ))
        .route("/users/register", post(user::register))
        .route("/users/login", post(user::login))
        .route("/health", get(health))
        .with_state(state)
}

pub fn budgets_router(state: ServerState) -> Router {
    Router::new()
        .route("/budgets", post(budgets::create).get(budgets::list))
        .route("/budgets/analytics/overview", get(budgets::analytics))
        .route(
            "/budgets/{id}",
            get(budgets::get).put(budgets::update).delete(budgets::delete),
        )
        .route("/budgets/{id}/goals", post(budgets::add_goal))
        .route("/budgets/{id}/goals/{goal_id}", put(budgets::update_goal))
        .route_layer(middleware::from_fn_with_state(
            state.keys.clone(),
            require_auth,
        ))
        .route("/health", get(health))
        .with_state(state)
}

pub fn transactions_router(state: TransactionsState) -> Router {
    Router::new()
        .route(
            "/transactions",
            post(transactions::create).get(transactions::list),
        )
        .route("/transactions/stats/summary", get(transactions::summary))
        .route(
            "/transactions/reconcile/{budget_id}",
            post(transactions::reconcile_budget),
        )
        .route(
            "/transactions/{id}",
            get(transactions::get)
                .put(transactions::update)
                .delete(transactions::delete),
        )
        .route_layer(middleware::from_fn_with_state(
            state.base.keys.clone(),
            require_auth,
        ))
        .route("/health", get(health))
        .with_state(state)
}

/// Serve `router` on an already bound listener until the server fails.
pub async fn run_with_listener(
    name: &'static str,
    router: Router,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("{name} service listening on {addr}");

    axum::serve(listener, router).await
}

pub fn spawn_with_listener(
    name: &'static str,
    router: Router,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(name, router, listener).await {
            tracing::error!("{name} service failed: {err}");
        }
    });

    Ok(addr)
}
