//! Users API endpoints

use api_types::user::{AuthResponse, Login, ProfileUpdate, Register, UserView};
use axum::{Extension, Json, extract::State, http::StatusCode};
use axum_extra::extract::WithRejection;
use engine::{ProfilePatch, RegisterUserCmd};

use crate::{
    ApiJson, ServerError,
    auth::AuthUser,
    convert::{theme_from_api, user_view},
    server::ServerState,
};

fn auth_response(state: &ServerState, user: engine::User) -> Result<AuthResponse, ServerError> {
    let token = state.keys.issue(&user.id, &user.username)?;
    Ok(AuthResponse {
        token,
        user: user_view(user),
    })
}

pub async fn register(
    State(state): State<ServerState>,
    WithRejection(Json(payload), _): ApiJson<Register>,
) -> Result<(StatusCode, Json<AuthResponse>), ServerError> {
    let user = state
        .engine
        .register_user(RegisterUserCmd {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            first_name: payload.first_name,
            last_name: payload.last_name,
        })
        .await?;
    tracing::info!(user_id = %user.id, "user registered");

    Ok((StatusCode::CREATED, Json(auth_response(&state, user)?)))
}

pub async fn login(
    State(state): State<ServerState>,
    WithRejection(Json(payload), _): ApiJson<Login>,
) -> Result<Json<AuthResponse>, ServerError> {
    let user = state
        .engine
        .authenticate(&payload.email, &payload.password)
        .await?;

    Ok(Json(auth_response(&state, user)?))
}

pub async fn profile(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
) -> Result<Json<UserView>, ServerError> {
    let user = state.engine.user(&user.id).await?;
    Ok(Json(user_view(user)))
}

pub async fn update_profile(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    WithRejection(Json(payload), _): ApiJson<ProfileUpdate>,
) -> Result<Json<UserView>, ServerError> {
    let patch = ProfilePatch {
        first_name: payload.first_name,
        last_name: payload.last_name,
        currency: payload.currency,
        theme: payload.theme.map(theme_from_api),
    };
    let user = state.engine.update_profile(&user.id, patch).await?;
    Ok(Json(user_view(user)))
}
