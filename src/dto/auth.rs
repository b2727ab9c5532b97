use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::dao::models::{Role, UserEntity};

/// Credentials supplied to log in; unknown usernames are registered on the
/// spot.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 255, message = "username must be 1-255 characters"))]
    pub username: String,
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub password: String,
}

/// Role names exposed to clients.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RoleDto {
    Survivor,
    Nikita,
    Admin,
}

impl From<Role> for RoleDto {
    fn from(value: Role) -> Self {
        match value {
            Role::Survivor => RoleDto::Survivor,
            Role::Nikita => RoleDto::Nikita,
            Role::Admin => RoleDto::Admin,
        }
    }
}

/// Account projection returned to clients.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub role: RoleDto,
}

impl From<UserEntity> for UserResponse {
    fn from(value: UserEntity) -> Self {
        Self {
            id: value.id,
            username: value.username,
            role: value.role.into(),
        }
    }
}

/// Successful login payload. The token also travels in the session cookie;
/// it is echoed here for clients that prefer a bearer header.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub token: String,
}

/// Payload wrapping the authenticated account for `/api/auth/me`.
#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub user: UserResponse,
}

/// Acknowledgement returned once the session cookie has been cleared.
#[derive(Debug, Serialize, ToSchema)]
pub struct LogoutResponse {
    pub success: bool,
}

impl LogoutResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}
