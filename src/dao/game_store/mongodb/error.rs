use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use thiserror::Error;
use uuid::Uuid;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("environment variable `{var}` is not set")]
    MissingEnvVar { var: &'static str },
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection")]
    InitialPing {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to create user `{username}`")]
    CreateUser {
        username: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to load user")]
    LoadUser {
        #[source]
        source: MongoError,
    },
    #[error("failed to insert round `{id}`")]
    InsertRound {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load round `{id}`")]
    LoadRound {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to list rounds")]
    ListRounds {
        #[source]
        source: MongoError,
    },
    #[error("failed to run a storage transaction")]
    Session {
        #[source]
        source: MongoError,
    },
    #[error("failed to record tap for round `{round}` player `{user}`")]
    RecordTap {
        round: Uuid,
        user: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("tap update for round `{round}` player `{user}` returned no row")]
    StatsVanished { round: Uuid, user: Uuid },
    #[error("round `{id}` missing while folding a tap into its total")]
    RoundVanished { id: Uuid },
    #[error("failed to load player stats for round `{round}`")]
    LoadStats {
        round: Uuid,
        #[source]
        source: MongoError,
    },
}

impl MongoDaoError {
    fn source_error(&self) -> Option<&MongoError> {
        match self {
            MongoDaoError::InvalidUri { source, .. }
            | MongoDaoError::ClientConstruction { source }
            | MongoDaoError::InitialPing { source }
            | MongoDaoError::HealthPing { source }
            | MongoDaoError::EnsureIndex { source, .. }
            | MongoDaoError::CreateUser { source, .. }
            | MongoDaoError::LoadUser { source }
            | MongoDaoError::InsertRound { source, .. }
            | MongoDaoError::LoadRound { source, .. }
            | MongoDaoError::ListRounds { source }
            | MongoDaoError::Session { source }
            | MongoDaoError::RecordTap { source, .. }
            | MongoDaoError::LoadStats { source, .. } => Some(source),
            MongoDaoError::MissingEnvVar { .. }
            | MongoDaoError::StatsVanished { .. }
            | MongoDaoError::RoundVanished { .. } => None,
        }
    }

    /// Whether a unique index rejected the write.
    pub fn is_duplicate_key(&self) -> bool {
        self.source_error()
            .is_some_and(|err| write_error_code(err) == Some(DUPLICATE_KEY_CODE))
    }

    /// Whether the server asked for the whole transaction to be retried.
    pub fn is_transient(&self) -> bool {
        self.source_error().is_some_and(|err| {
            err.contains_label(mongodb::error::TRANSIENT_TRANSACTION_ERROR)
                || err.contains_label(mongodb::error::UNKNOWN_TRANSACTION_COMMIT_RESULT)
        })
    }
}

fn write_error_code(err: &MongoError) -> Option<i32> {
    match err.kind.as_ref() {
        ErrorKind::Command(command) => Some(command.code),
        ErrorKind::Write(WriteFailure::WriteError(write)) => Some(write.code),
        ErrorKind::Write(WriteFailure::WriteConcernError(concern)) => Some(concern.code),
        _ => None,
    }
}
