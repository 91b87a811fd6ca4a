// crates/vmp-http/src/session.rs
// ============================================================================
// Module: Identity & Session
// Description: Login/logout handlers and the actor-resolving extractor
//              (spec.md §4.1 Identity & Session).
// Dependencies: axum, argon2, vmp-core, vmp-config
// ============================================================================

//! ## Overview
//! A session is an opaque, server-side row ([`vmp_core::model::actor::Session`]);
//! the cookie only carries its id, HMAC-signed by [`crate::cookie`] so a
//! forged or truncated cookie never reaches the store. [`ActorExtractor`]
//! resolves the cookie into a [`vmp_core::model::actor::Actor`] for every
//! route that requires one; `/login` and `/logout` are the only handlers
//! that do not go through it.

use argon2::Argon2;
use argon2::PasswordHash;
use argon2::PasswordHasher;
use argon2::PasswordVerifier;
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use axum::Json;
use axum::extract::FromRequestParts;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::COOKIE;
use axum::http::header::SET_COOKIE;
use axum::http::request::Parts;
use axum::response::IntoResponse;
use axum::response::Response;
use serde::Deserialize;
use serde::Serialize;
use time::Duration as TimeDuration;
use vmp_core::CoreError;
use vmp_core::ids::SessionId;
use vmp_core::model::actor::Actor;
use vmp_core::model::actor::Session;
use vmp_core::time::Timestamp;

use crate::cookie;
use crate::deadline::with_deadline;
use crate::error::ApiError;
use crate::state::AppState;

/// Name of the session cookie.
pub const SESSION_COOKIE_NAME: &str = "vmp_session";

// ============================================================================
// SECTION: Actor Extractor
// ============================================================================

/// The actor resolved from a request's session cookie.
pub struct ActorExtractor(pub Actor);

impl FromRequestParts<AppState> for ActorExtractor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session_id = cookie_session_id(&parts.headers, state.config.session.cookie_secret.as_bytes())
            .ok_or_else(|| ApiError(CoreError::authorization("missing or invalid session cookie")))?;
        let session = resolve_session(state, &session_id).await?;
        let user = with_deadline(db_deadline(state), state.store.get_user(session.user_id)).await?;
        Ok(Self(Actor::from_user(&user)))
    }
}

fn db_deadline(state: &AppState) -> std::time::Duration {
    std::time::Duration::from_secs(state.config.server.db_deadline_secs)
}

fn cookie_session_id(headers: &HeaderMap, cookie_secret: &[u8]) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    for pair in raw.split(';') {
        let pair = pair.trim();
        if let Some(value) = pair.strip_prefix(&format!("{SESSION_COOKIE_NAME}=")) {
            return cookie::decode(cookie_secret, value).map(str::to_string);
        }
    }
    None
}

async fn resolve_session(state: &AppState, session_id: &str) -> Result<Session, CoreError> {
    let id: SessionId = session_id
        .parse()
        .map_err(|_| CoreError::authorization("malformed session cookie"))?;
    let session = with_deadline(db_deadline(state), state.store.get_session(id)).await?;
    if !session.is_live_at(Timestamp::now()) {
        return Err(CoreError::authorization("session has expired"));
    }
    Ok(session)
}

// ============================================================================
// SECTION: Login
// ============================================================================

/// `POST /login` request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Tenant the user belongs to.
    pub tenant_id: String,
    /// Account email address.
    pub email: String,
    /// Plaintext password, verified against the stored Argon2 digest.
    pub password: String,
}

/// `POST /login` response body.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Resolved user id.
    pub user_id: String,
    /// Whether the account is internal operations staff.
    pub internal: bool,
}

/// Authenticates a user and establishes a session (spec.md §4.1).
pub async fn login(State(state): State<AppState>, Json(body): Json<LoginRequest>) -> Result<Response, ApiError> {
    let tenant = body.tenant_id.parse().map_err(|_| ApiError(CoreError::validation("malformed tenant_id")))?;
    let user = with_deadline(db_deadline(&state), state.store.get_user_by_email(tenant, &body.email))
        .await
        .map_err(|_| ApiError(CoreError::authorization("invalid email or password")))?;
    if !user.active {
        return Err(ApiError(CoreError::authorization("account is not active")));
    }
    verify_password(&body.password, &user.password_digest)
        .map_err(|_| ApiError(CoreError::authorization("invalid email or password")))?;

    let session = Session {
        id: SessionId::generate(),
        user_id: user.id,
        expires_at: Timestamp::now().plus(TimeDuration::seconds(
            i64::try_from(state.config.session.lifetime_secs).unwrap_or(i64::MAX),
        )),
        data: std::collections::BTreeMap::new(),
    };
    with_deadline(db_deadline(&state), state.store.create_session(session.clone())).await?;

    let cookie_value = cookie::encode(state.config.session.cookie_secret.as_bytes(), &session.id.to_string());
    let set_cookie = format!("{SESSION_COOKIE_NAME}={cookie_value}; HttpOnly; SameSite=Strict; Path=/");

    let body = LoginResponse { user_id: user.id.to_string(), internal: user.internal };
    let mut response = (StatusCode::OK, Json(body)).into_response();
    response.headers_mut().insert(
        SET_COOKIE,
        set_cookie.parse().map_err(|_| ApiError(CoreError::Internal("invalid cookie header".to_string())))?,
    );
    Ok(response)
}

fn verify_password(plaintext: &str, digest: &str) -> Result<(), argon2::password_hash::Error> {
    let parsed = PasswordHash::new(digest)?;
    Argon2::default().verify_password(plaintext.as_bytes(), &parsed)
}

/// Hashes a plaintext password into an Argon2 PHC string, used by seed
/// tooling and account provisioning.
///
/// # Errors
///
/// Returns an error if Argon2 hashing fails.
pub fn hash_password(plaintext: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default().hash_password(plaintext.as_bytes(), &salt)?.to_string())
}

// ============================================================================
// SECTION: Logout
// ============================================================================

/// Ends the caller's session (spec.md §4.1).
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    if let Some(session_id) = cookie_session_id(&headers, state.config.session.cookie_secret.as_bytes())
        && let Ok(id) = session_id.parse::<SessionId>()
    {
        let _ = with_deadline(db_deadline(&state), state.store.delete_session(id)).await;
    }
    let expired = format!("{SESSION_COOKIE_NAME}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0");
    let mut response = StatusCode::NO_CONTENT.into_response();
    response.headers_mut().insert(
        SET_COOKIE,
        expired.parse().map_err(|_| ApiError(CoreError::Internal("invalid cookie header".to_string())))?,
    );
    Ok(response)
}
