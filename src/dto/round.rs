use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::RoundEntity,
    dto::format_system_time,
    lifecycle::RoundPhase,
};

/// Lifecycle phase names exposed to clients.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RoundStateDto {
    Cooldown,
    Active,
    Finished,
}

impl From<RoundPhase> for RoundStateDto {
    fn from(value: RoundPhase) -> Self {
        match value {
            RoundPhase::Cooldown => RoundStateDto::Cooldown,
            RoundPhase::Active => RoundStateDto::Active,
            RoundPhase::Finished => RoundStateDto::Finished,
        }
    }
}

/// Round projection shared by the listing, creation and detail endpoints.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoundDto {
    pub id: Uuid,
    pub start_time: String,
    pub end_time: String,
    pub total_score: i64,
    pub winner_id: Option<Uuid>,
    pub created_at: String,
}

impl From<RoundEntity> for RoundDto {
    fn from(value: RoundEntity) -> Self {
        Self {
            id: value.id,
            start_time: format_system_time(value.start_time),
            end_time: format_system_time(value.end_time),
            total_score: value.total_score,
            winner_id: value.winner_id,
            created_at: format_system_time(value.created_at),
        }
    }
}

/// Payload wrapping the newest-first round listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoundsResponse {
    pub rounds: Vec<RoundDto>,
}

/// Payload wrapping a freshly created round.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateRoundResponse {
    pub round: RoundDto,
}

/// Winner summary shown once a round has finished.
#[derive(Debug, Serialize, ToSchema)]
pub struct WinnerDto {
    pub username: String,
    pub score: i64,
}

/// Full detail payload for one round, personalised for the requesting player.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoundDetailsResponse {
    pub round: RoundDto,
    pub state: RoundStateDto,
    /// Present only when the round has finished and at least one stats row
    /// exists.
    pub winner: Option<WinnerDto>,
    pub player_score: i64,
    pub player_taps: i64,
}

/// Counters returned after an accepted tap.
#[derive(Debug, Serialize, ToSchema)]
pub struct TapResponse {
    pub score: i64,
    pub taps: i64,
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;

    #[test]
    fn round_json_uses_camel_case_keys_and_rfc3339_times() {
        let entity = RoundEntity::new(
            SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000),
            SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_060),
        );
        let value = serde_json::to_value(RoundDto::from(entity)).unwrap();

        assert_eq!(value["startTime"], "2023-11-14T22:13:20Z");
        assert_eq!(value["endTime"], "2023-11-14T22:14:20Z");
        assert_eq!(value["totalScore"], 0);
        assert!(value["winnerId"].is_null());
        assert!(value.get("createdAt").is_some());
    }

    #[test]
    fn details_json_exposes_state_and_player_counters_in_camel_case() {
        let entity = RoundEntity::new(SystemTime::now(), SystemTime::now());
        let details = RoundDetailsResponse {
            round: entity.into(),
            state: RoundStateDto::Active,
            winner: None,
            player_score: 29,
            player_taps: 20,
        };
        let value = serde_json::to_value(details).unwrap();

        assert_eq!(value["state"], "active");
        assert_eq!(value["playerScore"], 29);
        assert_eq!(value["playerTaps"], 20);
        assert!(value["winner"].is_null());
    }
}
