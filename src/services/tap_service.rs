//! The tap processor: validates the round, then hands the counter update to
//! the storage layer as one indivisible unit.

use std::fmt;
use std::time::SystemTime;

use tracing::debug;
use uuid::Uuid;

use crate::{
    dao::models::TapRecord,
    error::ServiceError,
    lifecycle::{RoundPhase, classify},
    services::auth_service::SessionUser,
    state::SharedState,
};

/// Outcome of a tap attempt. Rejections are ordinary results, not errors;
/// only infrastructure failures surface as [`ServiceError`].
#[derive(Debug)]
pub enum TapOutcome {
    /// The tap was counted; the record holds the post-increment counters.
    Accepted(TapRecord),
    /// The tap was turned away without touching any counter.
    Rejected(TapRejection),
}

/// Reasons a tap is turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapRejection {
    RoundNotFound,
    RoundNotActive(RoundPhase),
}

impl fmt::Display for TapRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TapRejection::RoundNotFound => write!(f, "round not found"),
            TapRejection::RoundNotActive(_) => write!(f, "round not active"),
        }
    }
}

/// Count one tap by `player` on `round_id`.
///
/// The round's window never changes after creation, so classifying it here
/// and incrementing in the store afterwards cannot accept a tap for a round
/// that was never active.
pub async fn process_tap(
    state: &SharedState,
    round_id: Uuid,
    player: &SessionUser,
) -> Result<TapOutcome, ServiceError> {
    let store = state.require_game_store().await?;

    let Some(round) = store.find_round(round_id).await? else {
        return Ok(TapOutcome::Rejected(TapRejection::RoundNotFound));
    };

    let phase = classify(&round, SystemTime::now());
    if phase != RoundPhase::Active {
        return Ok(TapOutcome::Rejected(TapRejection::RoundNotActive(phase)));
    }

    let record = store.record_tap(round_id, player.id, player.role).await?;
    debug!(
        round = %round_id,
        player = %player.username,
        taps = record.taps,
        score = record.score,
        "tap accepted"
    );

    Ok(TapOutcome::Accepted(record))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            game_store::{GameStore, memory::MemoryGameStore},
            models::{Role, RoundEntity},
        },
        state::AppState,
    };

    const TAPS_PER_PLAYER: i64 = 23;
    /// Twenty-three taps: twenty-one ordinary plus bonuses on the 11th and
    /// 22nd.
    const SCORE_PER_PLAYER: i64 = 41;

    async fn fresh_state() -> (SharedState, Arc<dyn GameStore>) {
        let state = AppState::new(AppConfig::default());
        let store: Arc<dyn GameStore> = Arc::new(MemoryGameStore::new());
        state.install_game_store(store.clone()).await;
        (state, store)
    }

    async fn seed_round(store: &Arc<dyn GameStore>, start: SystemTime, end: SystemTime) -> Uuid {
        let round = store
            .insert_round(RoundEntity::new(start, end))
            .await
            .unwrap();
        round.id
    }

    fn player(name: &str, role: Role) -> SessionUser {
        SessionUser {
            id: Uuid::new_v4(),
            username: name.to_owned(),
            role,
        }
    }

    fn accepted(outcome: TapOutcome) -> TapRecord {
        match outcome {
            TapOutcome::Accepted(record) => record,
            TapOutcome::Rejected(rejection) => panic!("expected an accepted tap, got {rejection}"),
        }
    }

    fn rejected(outcome: TapOutcome) -> TapRejection {
        match outcome {
            TapOutcome::Rejected(rejection) => rejection,
            TapOutcome::Accepted(record) => panic!("expected a rejection, got {record:?}"),
        }
    }

    #[tokio::test]
    async fn first_tap_scores_one_point() {
        let (state, store) = fresh_state().await;
        let now = SystemTime::now();
        let round_id = seed_round(
            &store,
            now - Duration::from_secs(1),
            now + Duration::from_secs(60),
        )
        .await;
        let goose = player("goose", Role::Survivor);

        let record = accepted(process_tap(&state, round_id, &goose).await.unwrap());
        assert_eq!(record.taps, 1);
        assert_eq!(record.score, 1);
    }

    #[tokio::test]
    async fn eleventh_tap_pays_the_bonus() {
        let (state, store) = fresh_state().await;
        let now = SystemTime::now();
        let round_id = seed_round(
            &store,
            now - Duration::from_secs(1),
            now + Duration::from_secs(60),
        )
        .await;
        let goose = player("goose", Role::Survivor);

        let mut record = TapRecord { taps: 0, score: 0 };
        for _ in 0..11 {
            record = accepted(process_tap(&state, round_id, &goose).await.unwrap());
        }

        assert_eq!(record.taps, 11);
        assert_eq!(record.score, 20);
        let round = store.find_round(round_id).await.unwrap().unwrap();
        assert_eq!(round.total_score, 20);
    }

    #[tokio::test]
    async fn nikita_taps_count_but_never_score() {
        let (state, store) = fresh_state().await;
        let now = SystemTime::now();
        let round_id = seed_round(
            &store,
            now - Duration::from_secs(1),
            now + Duration::from_secs(60),
        )
        .await;
        let nikita = player("Никита", Role::Nikita);

        let mut record = TapRecord { taps: 0, score: 0 };
        for _ in 0..5 {
            record = accepted(process_tap(&state, round_id, &nikita).await.unwrap());
        }

        assert_eq!(record.taps, 5);
        assert_eq!(record.score, 0);
        let round = store.find_round(round_id).await.unwrap().unwrap();
        assert_eq!(round.total_score, 0);
    }

    #[tokio::test]
    async fn taps_during_the_cooldown_are_rejected() {
        let (state, store) = fresh_state().await;
        let now = SystemTime::now();
        let round_id = seed_round(
            &store,
            now + Duration::from_secs(30),
            now + Duration::from_secs(90),
        )
        .await;
        let goose = player("goose", Role::Survivor);

        let rejection = rejected(process_tap(&state, round_id, &goose).await.unwrap());
        assert_eq!(rejection, TapRejection::RoundNotActive(RoundPhase::Cooldown));

        // The rejection must leave no trace in either counter.
        assert!(
            store
                .find_player_stats(round_id, goose.id)
                .await
                .unwrap()
                .is_none()
        );
        let round = store.find_round(round_id).await.unwrap().unwrap();
        assert_eq!(round.total_score, 0);
    }

    #[tokio::test]
    async fn taps_after_the_finish_are_rejected() {
        let (state, store) = fresh_state().await;
        let now = SystemTime::now();
        let round_id = seed_round(
            &store,
            now - Duration::from_secs(120),
            now - Duration::from_secs(60),
        )
        .await;
        let goose = player("goose", Role::Survivor);

        let rejection = rejected(process_tap(&state, round_id, &goose).await.unwrap());
        assert_eq!(rejection, TapRejection::RoundNotActive(RoundPhase::Finished));

        assert!(
            store
                .find_player_stats(round_id, goose.id)
                .await
                .unwrap()
                .is_none()
        );
        let round = store.find_round(round_id).await.unwrap().unwrap();
        assert_eq!(round.total_score, 0);
    }

    #[tokio::test]
    async fn taps_on_unknown_rounds_are_rejected() {
        let (state, _store) = fresh_state().await;
        let goose = player("goose", Role::Survivor);

        let rejection = rejected(process_tap(&state, Uuid::new_v4(), &goose).await.unwrap());
        assert_eq!(rejection, TapRejection::RoundNotFound);
    }

    #[tokio::test]
    async fn degraded_state_refuses_taps() {
        let state = AppState::new(AppConfig::default());
        let goose = player("goose", Role::Survivor);

        let err = process_tap(&state, Uuid::new_v4(), &goose)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Degraded));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_tap_bursts_hit_the_reference_scores() {
        let (state, store) = fresh_state().await;
        let now = SystemTime::now();
        let round_id = seed_round(
            &store,
            now - Duration::from_secs(1),
            now + Duration::from_secs(600),
        )
        .await;
        let goose = player("goose", Role::Survivor);

        // 20 taps earn 29 points, 50 earn 86, however the taps interleave.
        for (burst, expected_taps, expected_score) in [(20_i64, 20_i64, 29_i64), (30, 50, 86)] {
            let mut handles = Vec::new();
            for _ in 0..burst {
                let state = state.clone();
                let goose = goose.clone();
                handles.push(tokio::spawn(async move {
                    accepted(process_tap(&state, round_id, &goose).await.unwrap());
                }));
            }
            for handle in handles {
                handle.await.unwrap();
            }

            let stats = store
                .find_player_stats(round_id, goose.id)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(stats.taps, expected_taps);
            assert_eq!(stats.score, expected_score);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_taps_keep_the_round_total_consistent() {
        let (state, store) = fresh_state().await;
        let now = SystemTime::now();
        let round_id = seed_round(
            &store,
            now - Duration::from_secs(1),
            now + Duration::from_secs(600),
        )
        .await;

        let mut players = Vec::new();
        for index in 0..6 {
            players.push(player(&format!("goose-{index}"), Role::Survivor));
        }
        players.push(player("Никита", Role::Nikita));
        players.push(player("Никита-2", Role::Nikita));

        let mut handles = Vec::new();
        for tapper in &players {
            let state = state.clone();
            let tapper = tapper.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..TAPS_PER_PLAYER {
                    accepted(process_tap(&state, round_id, &tapper).await.unwrap());
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let rows = store.list_player_stats(round_id).await.unwrap();
        assert_eq!(rows.len(), players.len());
        for row in &rows {
            assert_eq!(row.taps, TAPS_PER_PLAYER);
        }
        for tapper in &players {
            let stats = store
                .find_player_stats(round_id, tapper.id)
                .await
                .unwrap()
                .unwrap();
            let expected = if tapper.role.scores() {
                SCORE_PER_PLAYER
            } else {
                0
            };
            assert_eq!(stats.score, expected, "player {}", tapper.username);
        }

        // The round total and the per-player scores must agree exactly, no
        // matter how the taps interleaved.
        let round = store.find_round(round_id).await.unwrap().unwrap();
        let summed: i64 = rows.iter().map(|row| row.score).sum();
        assert_eq!(round.total_score, summed);
        assert_eq!(round.total_score, 6 * SCORE_PER_PLAYER);
    }
}
