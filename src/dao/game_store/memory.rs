//! In-process storage backend used for development and tests.
//!
//! Per-key map guards make the tap update indivisible without a database:
//! a stats entry is locked for the whole read-increment-write, so two
//! concurrent taps by the same player can never observe the same counter.

use std::sync::Arc;
use std::time::SystemTime;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    game_store::GameStore,
    models::{PlayerStatsEntity, Role, RoundEntity, TapRecord, UserEntity},
    storage::{StorageError, StorageResult},
};
use crate::scoring::points_for_tap;

#[derive(Clone, Default)]
pub struct MemoryGameStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    users: DashMap<Uuid, UserEntity>,
    usernames: DashMap<String, Uuid>,
    rounds: DashMap<Uuid, RoundEntity>,
    stats: DashMap<(Uuid, Uuid), PlayerStatsEntity>,
}

impl MemoryGameStore {
    /// Build an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn create_user(&self, user: UserEntity) -> StorageResult<UserEntity> {
        // The usernames entry guard is the uniqueness check and the
        // reservation in one step.
        match self.inner.usernames.entry(user.username.clone()) {
            Entry::Occupied(_) => Err(StorageError::conflict(format!(
                "username '{}' already registered",
                user.username
            ))),
            Entry::Vacant(slot) => {
                slot.insert(user.id);
                self.inner.users.insert(user.id, user.clone());
                Ok(user)
            }
        }
    }

    fn find_user_by_username(&self, username: &str) -> Option<UserEntity> {
        let id = *self.inner.usernames.get(username)?;
        self.inner.users.get(&id).map(|user| user.clone())
    }

    fn record_tap(&self, round_id: Uuid, user_id: Uuid, role: Role) -> StorageResult<TapRecord> {
        if !self.inner.rounds.contains_key(&round_id) {
            return Err(StorageError::inconsistent(format!(
                "tap for unknown round {round_id}"
            )));
        }

        // Hold the stats guard only for the counter update, then release it
        // before touching the rounds map.
        let (record, delta) = {
            let mut stats = self
                .inner
                .stats
                .entry((round_id, user_id))
                .or_insert_with(|| PlayerStatsEntity {
                    id: Uuid::new_v4(),
                    round_id,
                    user_id,
                    taps: 0,
                    score: 0,
                    created_at: SystemTime::now(),
                });
            stats.taps += 1;
            let delta = points_for_tap(stats.taps, role);
            stats.score += delta;
            (
                TapRecord {
                    taps: stats.taps,
                    score: stats.score,
                },
                delta,
            )
        };

        match self.inner.rounds.get_mut(&round_id) {
            Some(mut round) => {
                round.total_score += delta;
                Ok(record)
            }
            None => Err(StorageError::inconsistent(format!(
                "round {round_id} vanished while recording a tap"
            ))),
        }
    }

    fn list_rounds(&self) -> Vec<RoundEntity> {
        let mut rounds: Vec<RoundEntity> = self
            .inner
            .rounds
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        rounds.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        rounds
    }

    fn round_stats(&self, round_id: Uuid) -> Vec<PlayerStatsEntity> {
        self.inner
            .stats
            .iter()
            .filter(|entry| entry.value().round_id == round_id)
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn top_player_stats(&self, round_id: Uuid) -> Option<PlayerStatsEntity> {
        self.leaderboard(round_id).into_iter().next()
    }

    fn leaderboard(&self, round_id: Uuid) -> Vec<PlayerStatsEntity> {
        let mut rows = self.round_stats(round_id);
        rows.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        rows
    }
}

impl GameStore for MemoryGameStore {
    fn create_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<UserEntity>> {
        let store = self.clone();
        Box::pin(async move { store.create_user(user) })
    }

    fn find_user_by_username(
        &self,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.find_user_by_username(&username)) })
    }

    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.users.get(&id).map(|user| user.clone())) })
    }

    fn insert_round(&self, round: RoundEntity) -> BoxFuture<'static, StorageResult<RoundEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store.inner.rounds.insert(round.id, round.clone());
            Ok(round)
        })
    }

    fn find_round(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.rounds.get(&id).map(|round| round.clone())) })
    }

    fn list_rounds(&self) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.list_rounds()) })
    }

    fn record_tap(
        &self,
        round_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> BoxFuture<'static, StorageResult<TapRecord>> {
        let store = self.clone();
        Box::pin(async move { store.record_tap(round_id, user_id, role) })
    }

    fn find_player_stats(
        &self,
        round_id: Uuid,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerStatsEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .stats
                .get(&(round_id, user_id))
                .map(|stats| stats.clone()))
        })
    }

    fn top_player_stats(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerStatsEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.top_player_stats(round_id)) })
    }

    fn list_player_stats(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerStatsEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.leaderboard(round_id)) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
