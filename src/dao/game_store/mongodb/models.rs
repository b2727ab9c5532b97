use mongodb::bson::{Binary, DateTime, Document, doc, spec::BinarySubtype};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{PlayerStatsEntity, Role, RoundEntity, UserEntity};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoUserDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    username: String,
    password_hash: String,
    role: Role,
    created_at: DateTime,
}

impl From<UserEntity> for MongoUserDocument {
    fn from(value: UserEntity) -> Self {
        Self {
            id: value.id,
            username: value.username,
            password_hash: value.password_hash,
            role: value.role,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<MongoUserDocument> for UserEntity {
    fn from(value: MongoUserDocument) -> Self {
        Self {
            id: value.id,
            username: value.username,
            password_hash: value.password_hash,
            role: value.role,
            created_at: value.created_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoRoundDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    start_time: DateTime,
    end_time: DateTime,
    total_score: i64,
    winner_id: Option<Uuid>,
    created_at: DateTime,
}

impl From<RoundEntity> for MongoRoundDocument {
    fn from(value: RoundEntity) -> Self {
        Self {
            id: value.id,
            start_time: DateTime::from_system_time(value.start_time),
            end_time: DateTime::from_system_time(value.end_time),
            total_score: value.total_score,
            winner_id: value.winner_id,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<MongoRoundDocument> for RoundEntity {
    fn from(value: MongoRoundDocument) -> Self {
        Self {
            id: value.id,
            start_time: value.start_time.to_system_time(),
            end_time: value.end_time.to_system_time(),
            total_score: value.total_score,
            winner_id: value.winner_id,
            created_at: value.created_at.to_system_time(),
        }
    }
}

/// Stats rows keep an auto-generated `_id`; the row identity clients see is
/// the `id` field filled in by the tap pipeline on first upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoStatsDocument {
    pub id: Uuid,
    pub round_id: Uuid,
    pub user_id: Uuid,
    pub taps: i64,
    pub score: i64,
    pub created_at: DateTime,
}

impl From<MongoStatsDocument> for PlayerStatsEntity {
    fn from(value: MongoStatsDocument) -> Self {
        Self {
            id: value.id,
            round_id: value.round_id,
            user_id: value.user_id,
            taps: value.taps,
            score: value.score,
            created_at: value.created_at.to_system_time(),
        }
    }
}

pub fn uuid_as_binary(id: Uuid) -> Binary {
    Binary {
        subtype: BinarySubtype::Uuid,
        bytes: id.into_bytes().to_vec(),
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": uuid_as_binary(id)}
}
