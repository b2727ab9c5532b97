use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    middleware,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::round::{CreateRoundResponse, RoundDetailsResponse, RoundsResponse, TapResponse},
    error::AppError,
    routes::session,
    services::{
        auth_service::SessionUser,
        round_service,
        tap_service::{self, TapOutcome, TapRejection},
    },
    state::SharedState,
};

/// Round endpoints; every route requires an authenticated session.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/api/rounds", get(list_rounds).post(create_round))
        .route("/api/rounds/{id}", get(round_details))
        .route("/api/rounds/{id}/tap", post(tap))
        .route_layer(middleware::from_fn_with_state(state, session::authenticate))
}

/// List all rounds, newest first.
#[utoipa::path(
    get,
    path = "/api/rounds",
    tag = "rounds",
    responses(
        (status = 200, description = "All rounds, newest first", body = RoundsResponse),
        (status = 401, description = "Missing or invalid session token"),
    )
)]
pub async fn list_rounds(State(state): State<SharedState>) -> Result<Json<RoundsResponse>, AppError> {
    Ok(Json(round_service::list_rounds(&state).await?))
}

/// Open a new round (administrators only).
#[utoipa::path(
    post,
    path = "/api/rounds",
    tag = "rounds",
    responses(
        (status = 200, description = "Round created", body = CreateRoundResponse),
        (status = 401, description = "Missing or invalid session token"),
        (status = 403, description = "Caller is not an administrator"),
    )
)]
pub async fn create_round(
    State(state): State<SharedState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<CreateRoundResponse>, AppError> {
    session::require_admin(&user)?;
    Ok(Json(round_service::create_round(&state).await?))
}

/// Detail view of one round, personalised for the caller.
#[utoipa::path(
    get,
    path = "/api/rounds/{id}",
    tag = "rounds",
    params(("id" = Uuid, Path, description = "Identifier of the round")),
    responses(
        (status = 200, description = "Round details", body = RoundDetailsResponse),
        (status = 401, description = "Missing or invalid session token"),
        (status = 404, description = "No round with this identifier"),
    )
)]
pub async fn round_details(
    State(state): State<SharedState>,
    Extension(user): Extension<SessionUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<RoundDetailsResponse>, AppError> {
    Ok(Json(
        round_service::round_details(&state, id, Some(user.id)).await?,
    ))
}

/// Tap the goose.
#[utoipa::path(
    post,
    path = "/api/rounds/{id}/tap",
    tag = "rounds",
    params(("id" = Uuid, Path, description = "Identifier of the round")),
    responses(
        (status = 200, description = "Tap counted", body = TapResponse),
        (status = 401, description = "Missing or invalid session token"),
        (status = 404, description = "No round with this identifier"),
        (status = 409, description = "Round is not accepting taps"),
    )
)]
pub async fn tap(
    State(state): State<SharedState>,
    Extension(user): Extension<SessionUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<TapResponse>, AppError> {
    match tap_service::process_tap(&state, id, &user).await? {
        TapOutcome::Accepted(record) => Ok(Json(TapResponse {
            score: record.score,
            taps: record.taps,
        })),
        TapOutcome::Rejected(rejection @ TapRejection::RoundNotFound) => {
            Err(AppError::NotFound(rejection.to_string()))
        }
        TapOutcome::Rejected(rejection) => Err(AppError::Conflict(rejection.to_string())),
    }
}
