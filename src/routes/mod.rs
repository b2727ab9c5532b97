use axum::Router;

use crate::state::SharedState;

pub mod auth;
pub mod docs;
pub mod health;
pub mod rounds;
pub mod session;

/// Assemble every route subtree into the application router.
pub fn router(state: SharedState) -> Router<()> {
    let api = health::router()
        .merge(auth::router(state.clone()))
        .merge(rounds::router(state.clone()));

    api.merge(docs::router(state.clone())).with_state(state)
}
