/// Round and player-stats persistence behind the `GameStore` trait.
pub mod game_store;
/// Entities shared by every storage backend.
pub mod models;
/// Error and result types of the storage layer.
pub mod storage;
