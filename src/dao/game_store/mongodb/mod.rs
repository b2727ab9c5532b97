pub mod config;
mod connection;
mod error;
mod models;
pub mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoGameStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        if err.is_duplicate_key() {
            StorageError::conflict(err.to_string())
        } else if matches!(
            err,
            MongoDaoError::RoundVanished { .. } | MongoDaoError::StatsVanished { .. }
        ) {
            StorageError::inconsistent(err.to_string())
        } else {
            StorageError::unavailable(err.to_string(), err)
        }
    }
}
