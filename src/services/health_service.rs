use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report whether taps can currently be persisted.
///
/// The storage supervisor owns the degraded flag; this only snapshots it,
/// logging a failed ping so operators see trouble before the flag flips.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_game_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage ping failed");
            }
            HealthResponse::ok()
        }
        Err(_) => {
            warn!("storage unavailable, reporting degraded");
            HealthResponse::degraded()
        }
    }
}
