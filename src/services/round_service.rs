//! Round creation, listing and detail aggregation.

use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::{game_store::GameStore, models::RoundEntity},
    dto::round::{CreateRoundResponse, RoundDetailsResponse, RoundsResponse, WinnerDto},
    error::ServiceError,
    lifecycle::{RoundPhase, classify, plan_window},
    state::SharedState,
};

/// Open a new round: the window starts after the configured cooldown and
/// stays open for the configured duration.
pub async fn create_round(state: &SharedState) -> Result<CreateRoundResponse, ServiceError> {
    let store = state.require_game_store().await?;
    let config = state.config();

    let (start_time, end_time) = plan_window(
        SystemTime::now(),
        config.cooldown_duration(),
        config.round_duration(),
    );
    let round = store
        .insert_round(RoundEntity::new(start_time, end_time))
        .await?;
    info!(round_id = %round.id, "created round");

    Ok(CreateRoundResponse {
        round: round.into(),
    })
}

/// All rounds, newest first.
pub async fn list_rounds(state: &SharedState) -> Result<RoundsResponse, ServiceError> {
    let store = state.require_game_store().await?;
    let rounds = store.list_rounds().await?;
    Ok(RoundsResponse {
        rounds: rounds.into_iter().map(Into::into).collect(),
    })
}

/// Detail view of one round, personalised with the viewer's own counters.
/// The winner is resolved only once the round has finished.
pub async fn round_details(
    state: &SharedState,
    round_id: Uuid,
    viewer: Option<Uuid>,
) -> Result<RoundDetailsResponse, ServiceError> {
    let store = state.require_game_store().await?;
    let round = store
        .find_round(round_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("round {round_id} not found")))?;

    let phase = classify(&round, SystemTime::now());

    let winner = if phase == RoundPhase::Finished {
        resolve_winner(store.as_ref(), round_id).await?
    } else {
        None
    };

    let (player_taps, player_score) = match viewer {
        Some(user_id) => store
            .find_player_stats(round_id, user_id)
            .await?
            .map(|stats| (stats.taps, stats.score))
            .unwrap_or((0, 0)),
        None => (0, 0),
    };

    Ok(RoundDetailsResponse {
        round: round.into(),
        state: phase.into(),
        winner,
        player_score,
        player_taps,
    })
}

/// Best stats row joined with its account. A round nobody tapped in has no
/// winner.
async fn resolve_winner(
    store: &dyn GameStore,
    round_id: Uuid,
) -> Result<Option<WinnerDto>, ServiceError> {
    let Some(top) = store.top_player_stats(round_id).await? else {
        return Ok(None);
    };
    let user = store.find_user(top.user_id).await?.ok_or_else(|| {
        ServiceError::Internal(format!(
            "winner account {} of round {round_id} no longer exists",
            top.user_id
        ))
    })?;
    Ok(Some(WinnerDto {
        username: user.username,
        score: top.score,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            game_store::memory::MemoryGameStore,
            models::{Role, UserEntity},
        },
        dto::round::RoundStateDto,
        state::AppState,
    };

    async fn fresh_state(config: AppConfig) -> (SharedState, Arc<dyn GameStore>) {
        let state = AppState::new(config);
        let store: Arc<dyn GameStore> = Arc::new(MemoryGameStore::new());
        state.install_game_store(store.clone()).await;
        (state, store)
    }

    async fn seed_user(store: &Arc<dyn GameStore>, username: &str) -> UserEntity {
        store
            .create_user(UserEntity::new(
                username.to_owned(),
                "hash".into(),
                Role::Survivor,
            ))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn created_rounds_open_after_the_cooldown() {
        let config = AppConfig::new(Duration::from_secs(60), Duration::from_secs(30), "secret");
        let (state, store) = fresh_state(config).await;

        let before = SystemTime::now();
        let response = create_round(&state).await.unwrap();
        let after = SystemTime::now();

        let round = store
            .find_round(response.round.id)
            .await
            .unwrap()
            .unwrap();
        let window = round.end_time.duration_since(round.start_time).unwrap();
        assert_eq!(window, Duration::from_secs(60));

        let planned_at = round.start_time - Duration::from_secs(30);
        assert!(planned_at >= before && planned_at <= after);
    }

    #[tokio::test]
    async fn fresh_rounds_report_the_cooldown_state() {
        let (state, _store) = fresh_state(AppConfig::default()).await;

        let created = create_round(&state).await.unwrap();
        let details = round_details(&state, created.round.id, None).await.unwrap();

        assert!(matches!(details.state, RoundStateDto::Cooldown));
        assert!(details.winner.is_none());
        assert_eq!(details.player_taps, 0);
        assert_eq!(details.player_score, 0);
    }

    #[tokio::test]
    async fn unknown_rounds_are_not_found() {
        let (state, _store) = fresh_state(AppConfig::default()).await;

        let err = round_details(&state, Uuid::new_v4(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn finished_rounds_expose_the_winner_and_the_viewer_standing() {
        let (state, store) = fresh_state(AppConfig::default()).await;
        let now = SystemTime::now();
        // The store does not gate on the phase, so a finished round can be
        // seeded with taps directly.
        let round = store
            .insert_round(RoundEntity::new(
                now - Duration::from_secs(120),
                now - Duration::from_secs(60),
            ))
            .await
            .unwrap();
        let champion = seed_user(&store, "champion").await;
        let runner_up = seed_user(&store, "runner-up").await;

        for _ in 0..12 {
            store
                .record_tap(round.id, champion.id, Role::Survivor)
                .await
                .unwrap();
        }
        for _ in 0..5 {
            store
                .record_tap(round.id, runner_up.id, Role::Survivor)
                .await
                .unwrap();
        }

        let details = round_details(&state, round.id, Some(runner_up.id))
            .await
            .unwrap();

        assert!(matches!(details.state, RoundStateDto::Finished));
        let winner = details.winner.unwrap();
        assert_eq!(winner.username, "champion");
        assert_eq!(winner.score, 21);
        assert_eq!(details.player_taps, 5);
        assert_eq!(details.player_score, 5);
        assert_eq!(details.round.total_score, 26);
    }

    #[tokio::test]
    async fn active_rounds_hide_the_winner() {
        let (state, store) = fresh_state(AppConfig::default()).await;
        let now = SystemTime::now();
        let round = store
            .insert_round(RoundEntity::new(
                now - Duration::from_secs(1),
                now + Duration::from_secs(60),
            ))
            .await
            .unwrap();
        let goose = seed_user(&store, "goose").await;
        for _ in 0..3 {
            store
                .record_tap(round.id, goose.id, Role::Survivor)
                .await
                .unwrap();
        }

        let details = round_details(&state, round.id, Some(goose.id))
            .await
            .unwrap();

        assert!(matches!(details.state, RoundStateDto::Active));
        assert!(details.winner.is_none());
        assert_eq!(details.player_taps, 3);
        assert_eq!(details.player_score, 3);
    }

    #[tokio::test]
    async fn untapped_rounds_finish_without_a_winner() {
        let (state, store) = fresh_state(AppConfig::default()).await;
        let now = SystemTime::now();
        let round = store
            .insert_round(RoundEntity::new(
                now - Duration::from_secs(120),
                now - Duration::from_secs(60),
            ))
            .await
            .unwrap();

        let details = round_details(&state, round.id, None).await.unwrap();

        assert!(matches!(details.state, RoundStateDto::Finished));
        assert!(details.winner.is_none());
    }

    #[tokio::test]
    async fn rounds_list_newest_first() {
        let (state, store) = fresh_state(AppConfig::default()).await;
        let now = SystemTime::now();

        let mut ids = Vec::new();
        for age in [30u64, 20, 10] {
            let mut round =
                RoundEntity::new(now + Duration::from_secs(30), now + Duration::from_secs(90));
            round.created_at = now - Duration::from_secs(age);
            ids.push(round.id);
            store.insert_round(round).await.unwrap();
        }

        let listed = list_rounds(&state).await.unwrap();
        let listed_ids: Vec<Uuid> = listed.rounds.iter().map(|round| round.id).collect();

        ids.reverse();
        assert_eq!(listed_ids, ids);
    }
}
