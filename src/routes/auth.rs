use axum::{
    Extension, Json, Router,
    extract::State,
    http::header,
    middleware,
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
};
use validator::Validate;

use crate::{
    dto::auth::{LoginRequest, LoginResponse, LogoutResponse, MeResponse, UserResponse},
    error::AppError,
    routes::session,
    services::auth_service::{self, SessionUser},
    state::SharedState,
};

/// Authentication endpoints: login-or-register, logout and introspection.
pub fn router(state: SharedState) -> Router<SharedState> {
    let session_routes = Router::new()
        .route("/api/auth/me", get(me))
        .route_layer(middleware::from_fn_with_state(state, session::authenticate));

    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .merge(session_routes)
}

/// Log in with a username and password, registering the account on first use.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated; session cookie installed", body = LoginResponse),
        (status = 400, description = "Malformed credentials"),
        (status = 401, description = "Wrong password for an existing account"),
    )
)]
pub async fn login(
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let response = auth_service::login_or_register(&state, payload).await?;
    let cookie = session::session_cookie(&response.token);
    Ok((AppendHeaders([(header::SET_COOKIE, cookie)]), Json(response)))
}

/// Drop the session by clearing the token cookie.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses((status = 200, description = "Session cookie cleared", body = LogoutResponse))
)]
pub async fn logout() -> impl IntoResponse {
    (
        AppendHeaders([(header::SET_COOKIE, session::clear_session_cookie())]),
        Json(LogoutResponse::ok()),
    )
}

/// Identify the authenticated caller from its session token.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Authenticated account", body = MeResponse),
        (status = 401, description = "Missing or invalid session token"),
    )
)]
pub async fn me(Extension(user): Extension<SessionUser>) -> Json<MeResponse> {
    Json(MeResponse {
        user: UserResponse {
            id: user.id,
            username: user.username,
            role: user.role.into(),
        },
    })
}
