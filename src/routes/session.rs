//! Session plumbing shared by the authenticated route trees.

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};

use crate::{
    error::AppError,
    services::auth_service::{self, SessionUser},
    state::SharedState,
};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "token";

/// Require a valid session token (cookie or bearer header) and stash the
/// decoded identity in the request extensions for handlers to pick up.
pub async fn authenticate(
    State(state): State<SharedState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user = {
        let token = session_token(&req)
            .ok_or_else(|| AppError::Unauthorized("authentication required".into()))?;
        auth_service::decode_token(state.config(), token)
            .ok_or_else(|| AppError::Unauthorized("invalid or expired token".into()))?
    };

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Gate an operation on the administrator role.
pub fn require_admin(user: &SessionUser) -> Result<(), AppError> {
    if user.role.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("administrator role required".into()))
    }
}

/// `Set-Cookie` value installing the session token.
pub fn session_cookie(token: &str) -> String {
    format!(
        "{SESSION_COOKIE}={token}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax",
        auth_service::TOKEN_TTL.as_secs()
    )
}

/// `Set-Cookie` value clearing the session token.
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Max-Age=0; Path=/; HttpOnly; SameSite=Lax")
}

fn session_token(req: &Request<Body>) -> Option<&str> {
    let headers = req.headers();

    if let Some(cookie_header) = headers.get(header::COOKIE).and_then(|v| v.to_str().ok()) {
        if let Some(token) = cookie_token(cookie_header) {
            return Some(token);
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
}

fn cookie_token(header_value: &str) -> Option<&str> {
    header_value.split(';').map(str::trim).find_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        (name == SESSION_COOKIE && !value.is_empty()).then_some(value)
    })
}

fn bearer_token(header_value: &str) -> Option<&str> {
    header_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_header_yields_the_session_token() {
        assert_eq!(cookie_token("token=abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(cookie_token("theme=dark; token=t1; lang=en"), Some("t1"));
        assert_eq!(cookie_token("tokenish=nope"), None);
        assert_eq!(cookie_token("token="), None);
        assert_eq!(cookie_token("theme=dark"), None);
    }

    #[test]
    fn bearer_header_yields_the_token() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Bearer   abc "), Some("abc"));
        assert_eq!(bearer_token("bearer abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Basic abc"), None);
    }

    #[test]
    fn cookie_values_round_trip_the_name() {
        let set = session_cookie("tok");
        assert!(set.starts_with("token=tok;"));
        assert!(set.contains("HttpOnly"));
        assert!(clear_session_cookie().starts_with("token=;"));
    }
}
