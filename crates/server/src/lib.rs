use api_types::ErrorBody;
use axum::{
    Json,
    extract::{
        Path, Query,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use engine::EngineError;

pub use auth::{AuthError, AuthUser, Claims, Credential, DEFAULT_TOKEN_TTL_HOURS, JwtKeys};
pub use budget_client::{BudgetClient, ClientError, DEFAULT_TIMEOUT_SECS};
pub use reconcile::{BudgetGateway, ReconcileError, affected_budgets, reconcile};
pub use server::{
    ServerState, TransactionsState, budgets_router, run_with_listener, spawn_with_listener,
    transactions_router, users_router,
};

mod auth;
mod budget_client;
mod budgets;
mod convert;
mod reconcile;
mod server;
mod transactions;
mod user;

/// Extractors whose rejections are reported as `{ "error": ... }` bodies.
pub(crate) type ApiJson<T> = WithRejection<Json<T>, ServerError>;
pub(crate) type ApiPath<T> = WithRejection<Path<T>, ServerError>;
pub(crate) type ApiQuery<T> = WithRejection<Query<T>, ServerError>;

pub enum ServerError {
    Engine(EngineError),
    Auth(AuthError),
    Reconcile(ReconcileError),
    /// Malformed body, path or query string.
    Rejection { status: StatusCode, message: String },
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_) => StatusCode::CONFLICT,
        EngineError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        EngineError::Database(_) | EngineError::PasswordHash(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        EngineError::InvalidAmount(_) | EngineError::InvalidField(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::PasswordHash(hash_err) => {
            tracing::error!("password hashing error: {hash_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

fn status_for_auth_error(err: &AuthError) -> StatusCode {
    match err {
        AuthError::MissingToken | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
        AuthError::TokenCreation(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Status of the budgets service's answer, as seen by our caller. Only
/// failures to get an answer at all are gateway errors.
fn status_for_client_error(err: &ClientError) -> StatusCode {
    match err {
        ClientError::NotFound => StatusCode::NOT_FOUND,
        ClientError::Unauthorized => StatusCode::UNAUTHORIZED,
        ClientError::Forbidden => StatusCode::FORBIDDEN,
        ClientError::Timeout
        | ClientError::Transport(_)
        | ClientError::Server { .. }
        | ClientError::InvalidUrl(_) => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => {
                (status_for_engine_error(&err), message_for_engine_error(err))
            }
            ServerError::Auth(err) => {
                let status = status_for_auth_error(&err);
                if status.is_server_error() {
                    tracing::error!("auth error: {err}");
                    (status, "internal server error".to_string())
                } else {
                    (status, err.to_string())
                }
            }
            ServerError::Reconcile(ReconcileError::Store(err)) => {
                (status_for_engine_error(&err), message_for_engine_error(err))
            }
            ServerError::Reconcile(ReconcileError::Push(err)) => {
                (status_for_client_error(&err), err.to_string())
            }
            ServerError::Rejection { status, message } => (status, message),
        };

        (status, Json(ErrorBody { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<AuthError> for ServerError {
    fn from(value: AuthError) -> Self {
        Self::Auth(value)
    }
}

impl From<JsonRejection> for ServerError {
    fn from(value: JsonRejection) -> Self {
        Self::Rejection {
            status: value.status(),
            message: value.body_text(),
        }
    }
}

impl From<PathRejection> for ServerError {
    fn from(value: PathRejection) -> Self {
        Self::Rejection {
            status: value.status(),
            message: value.body_text(),
        }
    }
}

impl From<QueryRejection> for ServerError {
    fn from(value: QueryRejection) -> Self {
        Self::Rejection {
            status: value.status(),
            message: value.body_text(),
        }
    }
}

impl From<ReconcileError> for ServerError {
    fn from(value: ReconcileError) -> Self {
        Self::Reconcile(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_not_found_maps_to_404() {
        let res = ServerError::from(EngineError::KeyNotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn engine_conflict_maps_to_409() {
        let res = ServerError::from(EngineError::ExistingKey("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn engine_validation_maps_to_422() {
        let res = ServerError::from(EngineError::InvalidAmount("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let res = ServerError::from(EngineError::InvalidField("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn wrong_credentials_map_to_401() {
        let res = ServerError::from(EngineError::InvalidCredentials).into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let res = ServerError::from(AuthError::MissingToken).into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    fn reconcile_status(err: ClientError) -> StatusCode {
        ServerError::from(ReconcileError::Push(err))
            .into_response()
            .status()
    }

    #[test]
    fn budget_service_answers_keep_their_status() {
        assert_eq!(reconcile_status(ClientError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            reconcile_status(ClientError::Unauthorized),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(reconcile_status(ClientError::Forbidden), StatusCode::FORBIDDEN);
    }

    #[test]
    fn unreachable_budget_service_maps_to_502() {
        assert_eq!(reconcile_status(ClientError::Timeout), StatusCode::BAD_GATEWAY);
        assert_eq!(
            reconcile_status(ClientError::Server {
                status: 500,
                message: "boom".to_string(),
            }),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn reconcile_store_failure_maps_like_engine_errors() {
        let err = ReconcileError::Store(EngineError::InvalidAmount("x".to_string()));
        let res = ServerError::from(err).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
