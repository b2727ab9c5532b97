use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Role attached to an account, fixed at registration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular player.
    Survivor,
    /// Joke participant: taps are counted but never score.
    Nikita,
    /// Administrator, allowed to open new rounds.
    Admin,
}

impl Role {
    /// Whether taps by this role earn points.
    pub fn scores(self) -> bool {
        !matches!(self, Role::Nikita)
    }

    /// Whether this role may open new rounds.
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// Registered account stored in persistence and shared across layers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserEntity {
    /// Stable identifier for the account.
    pub id: Uuid,
    /// Unique login name chosen at registration.
    pub username: String,
    /// PHC-formatted argon2 hash of the password.
    pub password_hash: String,
    /// Role derived from the username at registration.
    pub role: Role,
    /// Registration timestamp.
    pub created_at: SystemTime,
}

impl UserEntity {
    /// Build a fresh account with a generated identifier.
    pub fn new(username: String, password_hash: String, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            password_hash,
            role,
            created_at: SystemTime::now(),
        }
    }
}

/// One timed game round. The tap window is fixed at creation and never edited.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundEntity {
    /// Stable identifier for the round.
    pub id: Uuid,
    /// Instant the round opens for taps (end of the cooldown).
    pub start_time: SystemTime,
    /// Last instant taps are accepted.
    pub end_time: SystemTime,
    /// Running sum of every scored tap across all players.
    pub total_score: i64,
    /// Never written by the tap path; the winner is derived from player
    /// statistics once the round has finished.
    pub winner_id: Option<Uuid>,
    /// Creation timestamp, drives the newest-first listing order.
    pub created_at: SystemTime,
}

impl RoundEntity {
    /// Build a round over the given window with an empty score sheet.
    pub fn new(start_time: SystemTime, end_time: SystemTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            start_time,
            end_time,
            total_score: 0,
            winner_id: None,
            created_at: SystemTime::now(),
        }
    }
}

/// Per-player counters for one round; at most one row per (round, user) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerStatsEntity {
    /// Stable identifier for the row.
    pub id: Uuid,
    /// Round this row belongs to.
    pub round_id: Uuid,
    /// Player this row belongs to.
    pub user_id: Uuid,
    /// Count of accepted taps, incremented by exactly one per tap.
    pub taps: i64,
    /// Sum of the per-tap point values awarded so far.
    pub score: i64,
    /// First-tap timestamp; breaks winner ties in favour of the earlier row.
    pub created_at: SystemTime,
}

/// Post-increment counters returned by the atomic tap operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapRecord {
    /// Tap count after this tap was applied.
    pub taps: i64,
    /// Player score after this tap was applied.
    pub score: i64,
}
