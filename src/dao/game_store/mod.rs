pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{PlayerStatsEntity, Role, RoundEntity, TapRecord, UserEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer for accounts, rounds and per-player
/// tap counters.
pub trait GameStore: Send + Sync {
    /// Insert a new account. Fails with a conflict when the username is taken.
    fn create_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<UserEntity>>;
    fn find_user_by_username(
        &self,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    fn insert_round(&self, round: RoundEntity) -> BoxFuture<'static, StorageResult<RoundEntity>>;
    fn find_round(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>>;
    /// All rounds, newest first.
    fn list_rounds(&self) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>>;
    /// Apply one tap as a single indivisible unit: create the player's
    /// stats row for the round if missing, add one tap, award the points the
    /// new tap count earns for `role`, and fold the same points into the
    /// round's total. Two concurrent calls must never observe the same tap
    /// count. Returns the post-increment counters.
    fn record_tap(
        &self,
        round_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> BoxFuture<'static, StorageResult<TapRecord>>;
    fn find_player_stats(
        &self,
        round_id: Uuid,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerStatsEntity>>>;
    /// Best stats row of a round: highest score first, older rows winning
    /// ties, then ascending user id so the answer is stable.
    fn top_player_stats(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerStatsEntity>>>;
    /// Every stats row of a round, in the same order as
    /// [`GameStore::top_player_stats`].
    fn list_player_stats(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerStatsEntity>>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
