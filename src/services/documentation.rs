use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI document for the Last of Guss backend.
#[openapi(
    paths(
        crate::routes::auth::login,
        crate::routes::auth::logout,
        crate::routes::auth::me,
        crate::routes::rounds::list_rounds,
        crate::routes::rounds::create_round,
        crate::routes::rounds::round_details,
        crate::routes::rounds::tap,
        crate::routes::health::health,
    ),
    components(
        schemas(
            crate::dto::auth::LoginRequest,
            crate::dto::auth::LoginResponse,
            crate::dto::auth::LogoutResponse,
            crate::dto::auth::MeResponse,
            crate::dto::auth::UserResponse,
            crate::dto::auth::RoleDto,
            crate::dto::round::RoundDto,
            crate::dto::round::RoundStateDto,
            crate::dto::round::RoundsResponse,
            crate::dto::round::CreateRoundResponse,
            crate::dto::round::RoundDetailsResponse,
            crate::dto::round::WinnerDto,
            crate::dto::round::TapResponse,
            crate::dto::health::HealthResponse,
        )
    ),
    tags(
        (name = "auth", description = "Login, logout and session introspection"),
        (name = "rounds", description = "Round lifecycle and tap endpoints"),
        (name = "health", description = "Health check endpoints"),
    )
)]
pub struct ApiDoc;
