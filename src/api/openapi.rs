use super::handlers::{health, login, logout, session, types};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        session::session,
        login::login,
        logout::logout,
    ),
    components(schemas(
        health::Health,
        types::LoginRequest,
        types::SessionResponse,
        types::SuccessResponse,
        types::ErrorResponse,
    )),
    tags(
        (name = "health", description = "Service health"),
        (name = "session", description = "Session projection for the admin dashboard"),
        (name = "auth", description = "Token exchange and logout"),
    )
)]
pub struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    // Use Cargo.toml metadata instead of the derive defaults.
    doc.info.title = env!("CARGO_PKG_NAME").to_string();
    doc.info.version = env!("CARGO_PKG_VERSION").to_string();
    doc.info.description = Some(env!("CARGO_PKG_DESCRIPTION").to_string());
    doc
}
