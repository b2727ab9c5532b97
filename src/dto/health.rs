use serde::Serialize;
use utoipa::ToSchema;

/// Body of the `/health` endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `"ok"` while taps can be persisted, `"degraded"` while the store is gone.
    pub status: String,
}

impl HealthResponse {
    fn with_status(status: &str) -> Self {
        Self {
            status: status.to_owned(),
        }
    }

    /// Payload advertising a working storage pipeline.
    pub fn ok() -> Self {
        Self::with_status("ok")
    }

    /// Payload advertising that writes are currently refused.
    pub fn degraded() -> Self {
        Self::with_status("degraded")
    }
}
