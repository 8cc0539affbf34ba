use std::time::Duration;

use axum::Router;
use engine::{Engine, EngineBuilder};
use migration::{Migrator, MigratorTrait};
use server::{BudgetClient, JwtKeys, ServerState, TransactionsState};

mod settings;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "spendwise={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let keys = JwtKeys::new(
        settings.auth.jwt_secret.as_bytes(),
        chrono::Duration::hours(settings.auth.token_ttl_hours),
    );

    if let Some(users) = settings.users {
        let keys = keys.clone();
        let mut builder = Engine::builder();
        if let Some(cost) = users.password_cost {
            builder = builder.password_cost(cost);
        }
        tasks.spawn(run_service("users", users.service, builder, move |engine| {
            Ok(server::users_router(ServerState::new(engine, keys)))
        }));
    }

    if let Some(budgets) = settings.budgets {
        let keys = keys.clone();
        tasks.spawn(run_service("budgets", budgets, Engine::builder(), move |engine| {
            Ok(server::budgets_router(ServerState::new(engine, keys)))
        }));
    }

    if let Some(transactions) = settings.transactions {
        let keys = keys.clone();
        let budget_service_url = transactions.budget_service_url;
        let timeout = Duration::from_secs(transactions.reconcile_timeout_secs);
        tasks.spawn(run_service(
            "transactions",
            transactions.service,
            Engine::builder(),
            move |engine| {
                let budgets = BudgetClient::new(&budget_service_url, timeout)?;
                Ok(server::transactions_router(TransactionsState {
                    base: ServerState::new(engine, keys),
                    budgets,
                }))
            },
        ));
    }

    if tasks.is_empty() {
        tracing::warn!("no service configured, nothing to do");
    }

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

async fn run_service<F>(
    name: &'static str,
    service: settings::Service,
    builder: EngineBuilder,
    make_router: F,
) where
    F: FnOnce(Engine) -> Result<Router, BoxError>,
{
    tracing::info!("Found {name} settings...");
    let engine = match open_engine(&service.database, builder).await {
        Ok(engine) => engine,
        Err(err) => {
            tracing::error!("failed to initialize {name} database: {err}");
            return;
        }
    };

    let router = match make_router(engine) {
        Ok(router) => router,
        Err(err) => {
            tracing::error!("failed to build {name} service: {err}");
            return;
        }
    };

    let listener = match tokio::net::TcpListener::bind(service.addr()).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind {name} listener: {err}");
            return;
        }
    };

    if let Err(err) = server::run_with_listener(name, router, listener).await {
        tracing::error!("{name} service failed: {err}");
    }
}

async fn open_engine(
    config: &settings::Database,
    builder: EngineBuilder,
) -> Result<Engine, BoxError> {
    let database = sea_orm::Database::connect(config.url()).await?;
    Migrator::up(&database, None).await?;

    Ok(builder.database(database).build().await?)
}
