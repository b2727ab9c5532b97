//! Login-or-register flow and session token handling.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::{
        models::{Role, UserEntity},
        storage::StorageError,
    },
    dto::auth::{LoginRequest, LoginResponse},
    error::ServiceError,
    state::SharedState,
};

/// How long an issued session token stays valid.
pub const TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Username that is granted the administrator role at registration.
const ADMIN_USERNAME: &str = "admin";
/// Username that is assigned the non-scoring role at registration.
const NIKITA_USERNAME: &str = "Никита";

/// Authenticated caller identity decoded from the session token.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    username: String,
    role: Role,
    iat: u64,
    exp: u64,
}

/// Role a username receives when it registers.
pub fn determine_role(username: &str) -> Role {
    if username == ADMIN_USERNAME {
        Role::Admin
    } else if username == NIKITA_USERNAME {
        Role::Nikita
    } else {
        Role::Survivor
    }
}

/// Authenticate the credentials, registering the account when the username
/// is unknown. A wrong password on an existing account is the only rejection.
pub async fn login_or_register(
    state: &SharedState,
    request: LoginRequest,
) -> Result<LoginResponse, ServiceError> {
    let store = state.require_game_store().await?;
    let LoginRequest { username, password } = request;

    if let Some(user) = store.find_user_by_username(username.clone()).await? {
        return authenticate(state.config(), user, &password);
    }

    let role = determine_role(&username);
    let candidate = UserEntity::new(username.clone(), hash_password(&password)?, role);
    match store.create_user(candidate).await {
        Ok(user) => {
            info!(username = %user.username, role = ?user.role, "registered new player");
            let token = issue_token(state.config(), &user)?;
            Ok(LoginResponse {
                user: user.into(),
                token,
            })
        }
        // Lost a registration race; authenticate against the winner's row.
        Err(StorageError::Conflict { .. }) => {
            let user = store
                .find_user_by_username(username.clone())
                .await?
                .ok_or_else(|| {
                    ServiceError::Internal(format!(
                        "user '{username}' vanished after a registration conflict"
                    ))
                })?;
            authenticate(state.config(), user, &password)
        }
        Err(err) => Err(err.into()),
    }
}

fn authenticate(
    config: &AppConfig,
    user: UserEntity,
    password: &str,
) -> Result<LoginResponse, ServiceError> {
    if !verify_password(password, &user.password_hash)? {
        return Err(ServiceError::Unauthorized("wrong password".into()));
    }
    let token = issue_token(config, &user)?;
    Ok(LoginResponse {
        user: user.into(),
        token,
    })
}

fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| ServiceError::Internal(format!("failed to hash password: {err}")))
}

fn verify_password(password: &str, hash: &str) -> Result<bool, ServiceError> {
    let parsed = PasswordHash::new(hash).map_err(|err| {
        ServiceError::Internal(format!("stored password hash is unreadable: {err}"))
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Sign a session token for `user`.
pub fn issue_token(config: &AppConfig, user: &UserEntity) -> Result<String, ServiceError> {
    let issued_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|err| ServiceError::Internal(format!("system clock is before the epoch: {err}")))?
        .as_secs();
    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        role: user.role,
        iat: issued_at,
        exp: issued_at + TOKEN_TTL.as_secs(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.token_secret()),
    )
    .map_err(|err| ServiceError::Internal(format!("failed to sign session token: {err}")))
}

/// Decode and verify a session token. Expired, tampered or foreign tokens
/// all come back as `None`.
pub fn decode_token(config: &AppConfig, token: &str) -> Option<SessionUser> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.token_secret()),
        &Validation::default(),
    )
    .ok()?;
    Some(SessionUser {
        id: data.claims.sub,
        username: data.claims.username,
        role: data.claims.role,
    })
}
