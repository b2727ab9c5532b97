/// Login-or-register flow and session tokens.
pub mod auth_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Round creation, listing and detail aggregation.
pub mod round_service;
/// Storage connection supervisor with reconnect backoff.
pub mod storage_supervisor;
/// Atomic tap processing.
pub mod tap_service;
