use std::{sync::Arc, time::Duration};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, ClientSession, Collection, Database, IndexModel,
    bson::{Bson, Document, bson, doc},
    options::{IndexOptions, ReturnDocument},
};
use tokio::{sync::RwLock, time::sleep};
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{MongoRoundDocument, MongoStatsDocument, MongoUserDocument, doc_id, uuid_as_binary},
};
use crate::dao::{
    game_store::GameStore,
    models::{PlayerStatsEntity, Role, RoundEntity, TapRecord, UserEntity},
    storage::StorageResult,
};
use crate::scoring::{BASE_TAP_POINTS, BONUS_TAP_INTERVAL, BONUS_TAP_POINTS, points_for_tap};

const USER_COLLECTION_NAME: &str = "users";
const ROUND_COLLECTION_NAME: &str = "rounds";
const STATS_COLLECTION_NAME: &str = "player_stats";

/// Upper bound on transparent retries of the tap transaction when the
/// server reports a transient conflict between concurrent taps.
const TAP_RETRY_LIMIT: u32 = 8;
/// Base pause between those retries; attempt `n` waits `n` times this long.
const TAP_RETRY_PAUSE: Duration = Duration::from_millis(10);

#[derive(Clone)]
pub struct MongoGameStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoGameStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        // The unique stats index is what turns two racing first taps of a
        // player into one insert and one retried update.
        ensure_index(
            &database,
            USER_COLLECTION_NAME,
            "username",
            doc! { "username": 1 },
            true,
        )
        .await?;
        ensure_index(
            &database,
            STATS_COLLECTION_NAME,
            "round_id,user_id",
            doc! { "round_id": 1, "user_id": 1 },
            true,
        )
        .await?;
        ensure_index(
            &database,
            STATS_COLLECTION_NAME,
            "round_id,score",
            doc! { "round_id": 1, "score": -1, "created_at": 1, "user_id": 1 },
            false,
        )
        .await?;
        ensure_index(
            &database,
            ROUND_COLLECTION_NAME,
            "created_at",
            doc! { "created_at": -1 },
            false,
        )
        .await?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn users_collection(&self) -> Collection<MongoUserDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoUserDocument>(USER_COLLECTION_NAME)
    }

    async fn rounds_collection(&self) -> Collection<MongoRoundDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoRoundDocument>(ROUND_COLLECTION_NAME)
    }

    async fn stats_collection(&self) -> Collection<MongoStatsDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoStatsDocument>(STATS_COLLECTION_NAME)
    }

    async fn create_user(&self, user: UserEntity) -> MongoResult<UserEntity> {
        let collection = self.users_collection().await;
        let document: MongoUserDocument = user.clone().into();
        collection
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::CreateUser {
                username: user.username.clone(),
                source,
            })?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> MongoResult<Option<UserEntity>> {
        let collection = self.users_collection().await;
        let document = collection
            .find_one(doc! { "username": username })
            .await
            .map_err(|source| MongoDaoError::LoadUser { source })?;
        Ok(document.map(Into::into))
    }

    async fn find_user(&self, id: Uuid) -> MongoResult<Option<UserEntity>> {
        let collection = self.users_collection().await;
        let document = collection
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadUser { source })?;
        Ok(document.map(Into::into))
    }

    async fn insert_round(&self, round: RoundEntity) -> MongoResult<RoundEntity> {
        let collection = self.rounds_collection().await;
        let document: MongoRoundDocument = round.clone().into();
        collection
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::InsertRound {
                id: round.id,
                source,
            })?;
        Ok(round)
    }

    async fn find_round(&self, id: Uuid) -> MongoResult<Option<RoundEntity>> {
        let collection = self.rounds_collection().await;
        let document = collection
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadRound { id, source })?;
        Ok(document.map(Into::into))
    }

    async fn list_rounds(&self) -> MongoResult<Vec<RoundEntity>> {
        let collection = self.rounds_collection().await;
        let documents: Vec<MongoRoundDocument> = collection
            .find(doc! {})
            .sort(doc! { "created_at": -1 })
            .await
            .map_err(|source| MongoDaoError::ListRounds { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListRounds { source })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    /// Apply one tap inside a multi-document transaction, so the stats row
    /// and the round total move together or not at all. The deployment must
    /// therefore be a replica set. Transient conflicts between concurrent
    /// taps are retried up to [`TAP_RETRY_LIMIT`] times, backing off a
    /// little further before each attempt.
    async fn record_tap(
        &self,
        round_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> MongoResult<TapRecord> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.record_tap_once(round_id, user_id, role).await {
                Ok(record) => return Ok(record),
                Err(err)
                    if attempt < TAP_RETRY_LIMIT
                        && (err.is_transient() || err.is_duplicate_key()) =>
                {
                    sleep(tap_retry_pause(attempt)).await;
                    continue;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn record_tap_once(
        &self,
        round_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> MongoResult<TapRecord> {
        let (client, stats, rounds) = {
            let guard = self.inner.state.read().await;
            (
                guard.client.clone(),
                guard
                    .database
                    .collection::<MongoStatsDocument>(STATS_COLLECTION_NAME),
                guard
                    .database
                    .collection::<MongoRoundDocument>(ROUND_COLLECTION_NAME),
            )
        };

        let mut session = client
            .start_session()
            .await
            .map_err(|source| MongoDaoError::Session { source })?;
        session
            .start_transaction()
            .await
            .map_err(|source| MongoDaoError::Session { source })?;

        match apply_tap(&stats, &rounds, &mut session, round_id, user_id, role).await {
            Ok(record) => {
                session
                    .commit_transaction()
                    .await
                    .map_err(|source| MongoDaoError::Session { source })?;
                Ok(record)
            }
            Err(err) => {
                let _ = session.abort_transaction().await;
                Err(err)
            }
        }
    }

    async fn find_player_stats(
        &self,
        round_id: Uuid,
        user_id: Uuid,
    ) -> MongoResult<Option<PlayerStatsEntity>> {
        let collection = self.stats_collection().await;
        let document = collection
            .find_one(stats_key(round_id, user_id))
            .await
            .map_err(|source| MongoDaoError::LoadStats {
                round: round_id,
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn top_player_stats(&self, round_id: Uuid) -> MongoResult<Option<PlayerStatsEntity>> {
        let collection = self.stats_collection().await;
        let document = collection
            .find_one(doc! { "round_id": uuid_as_binary(round_id) })
            .sort(leaderboard_order())
            .await
            .map_err(|source| MongoDaoError::LoadStats {
                round: round_id,
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn list_player_stats(&self, round_id: Uuid) -> MongoResult<Vec<PlayerStatsEntity>> {
        let collection = self.stats_collection().await;
        let documents: Vec<MongoStatsDocument> = collection
            .find(doc! { "round_id": uuid_as_binary(round_id) })
            .sort(leaderboard_order())
            .await
            .map_err(|source| MongoDaoError::LoadStats {
                round: round_id,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadStats {
                round: round_id,
                source,
            })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }
}

/// Upsert-and-increment the stats row, then fold the awarded points into the
/// round total, all in the caller's session.
///
/// The whole counter update is one server-side pipeline: the second stage
/// sees the already incremented tap count, so the bonus rule judges the same
/// value the row ends up storing and no two taps can read the same counter.
async fn apply_tap(
    stats: &Collection<MongoStatsDocument>,
    rounds: &Collection<MongoRoundDocument>,
    session: &mut ClientSession,
    round_id: Uuid,
    user_id: Uuid,
    role: Role,
) -> MongoResult<TapRecord> {
    let points: Bson = if role.scores() {
        bson!({
            "$cond": [
                { "$eq": [{ "$mod": ["$taps", BONUS_TAP_INTERVAL] }, 0] },
                BONUS_TAP_POINTS,
                BASE_TAP_POINTS,
            ]
        })
    } else {
        bson!(0_i64)
    };

    let update = vec![
        doc! { "$set": {
            "id": { "$ifNull": ["$id", uuid_as_binary(Uuid::new_v4())] },
            "round_id": uuid_as_binary(round_id),
            "user_id": uuid_as_binary(user_id),
            "created_at": { "$ifNull": ["$created_at", "$$NOW"] },
            "taps": { "$add": [{ "$ifNull": ["$taps", 0_i64] }, 1_i64] },
        }},
        doc! { "$set": {
            "score": { "$add": [{ "$ifNull": ["$score", 0_i64] }, points] },
        }},
    ];

    let updated = stats
        .find_one_and_update(stats_key(round_id, user_id), update)
        .upsert(true)
        .return_document(ReturnDocument::After)
        .session(&mut *session)
        .await
        .map_err(|source| MongoDaoError::RecordTap {
            round: round_id,
            user: user_id,
            source,
        })?
        .ok_or(MongoDaoError::StatsVanished {
            round: round_id,
            user: user_id,
        })?;

    // Recompute the awarded points from the returned counter; the pipeline
    // above encodes the same rule with the same constants.
    let delta = points_for_tap(updated.taps, role);
    let result = rounds
        .update_one(doc_id(round_id), doc! { "$inc": { "total_score": delta } })
        .session(&mut *session)
        .await
        .map_err(|source| MongoDaoError::RecordTap {
            round: round_id,
            user: user_id,
            source,
        })?;
    if result.matched_count == 0 {
        return Err(MongoDaoError::RoundVanished { id: round_id });
    }

    Ok(TapRecord {
        taps: updated.taps,
        score: updated.score,
    })
}

fn stats_key(round_id: Uuid, user_id: Uuid) -> Document {
    doc! { "round_id": uuid_as_binary(round_id), "user_id": uuid_as_binary(user_id) }
}

fn leaderboard_order() -> Document {
    doc! { "score": -1, "created_at": 1, "user_id": 1 }
}

fn tap_retry_pause(attempt: u32) -> Duration {
    TAP_RETRY_PAUSE * attempt
}

async fn ensure_index(
    database: &Database,
    collection: &'static str,
    index: &'static str,
    keys: Document,
    unique: bool,
) -> MongoResult<()> {
    let name = format!("{}_{}_idx", collection, index.replace(',', "_"));
    let model = IndexModel::builder()
        .keys(keys)
        .options(
            IndexOptions::builder()
                .name(Some(name))
                .unique(unique.then_some(true))
                .build(),
        )
        .build();

    database
        .collection::<Document>(collection)
        .create_index(model)
        .await
        .map_err(|source| MongoDaoError::EnsureIndex {
            collection,
            index,
            source,
        })?;

    Ok(())
}

impl GameStore for MongoGameStore {
    fn create_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<UserEntity>> {
        let store = self.clone();
        Box::pin(async move { store.create_user(user).await.map_err(Into::into) })
    }

    fn find_user_by_username(
        &self,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_user_by_username(&username)
                .await
                .map_err(Into::into)
        })
    }

    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_user(id).await.map_err(Into::into) })
    }

    fn insert_round(&self, round: RoundEntity) -> BoxFuture<'static, StorageResult<RoundEntity>> {
        let store = self.clone();
        Box::pin(async move { store.insert_round(round).await.map_err(Into::into) })
    }

    fn find_round(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_round(id).await.map_err(Into::into) })
    }

    fn list_rounds(&self) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_rounds().await.map_err(Into::into) })
    }

    fn record_tap(
        &self,
        round_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> BoxFuture<'static, StorageResult<TapRecord>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .record_tap(round_id, user_id, role)
                .await
                .map_err(Into::into)
        })
    }

    fn find_player_stats(
        &self,
        round_id: Uuid,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerStatsEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_player_stats(round_id, user_id)
                .await
                .map_err(Into::into)
        })
    }

    fn top_player_stats(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerStatsEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.top_player_stats(round_id).await.map_err(Into::into) })
    }

    fn list_player_stats(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerStatsEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_player_stats(round_id).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_pauses_grow_with_the_attempt() {
        assert_eq!(tap_retry_pause(1), Duration::from_millis(10));
        assert_eq!(tap_retry_pause(4), Duration::from_millis(40));
        assert!(tap_retry_pause(TAP_RETRY_LIMIT - 1) < Duration::from_millis(100));
    }
}
