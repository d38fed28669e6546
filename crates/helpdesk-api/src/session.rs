//! Session tokens and the request-scoped caller identity.
//!
//! A session is a signed JWT carried either in the `helpdesk_session` cookie
//! or an `Authorization: Bearer` header. Handlers receive the decoded caller
//! as a [`RequestContext`] and pass it explicitly to the stores.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use helpdesk_types::models::Role;

use crate::error::ApiError;
use crate::state::{AppState, SessionSettings, run_db};

pub const SESSION_COOKIE: &str = "helpdesk_session";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub role: Role,
    pub exp: usize,
}

/// Who is making the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub user_id: i64,
    pub role: Role,
}

impl RequestContext {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Admins may act on anything; everyone else only on what they own.
    pub fn may_act_on(&self, owner_id: Option<i64>) -> bool {
        self.is_admin() || owner_id == Some(self.user_id)
    }

    /// Confirms the session's account still exists; a signed token can
    /// outlive the user it names. Writes that record the caller go through
    /// this first.
    pub(crate) async fn ensure_account(self, state: &AppState) -> Result<Self, ApiError> {
        let user_id = self.user_id;
        let exists = run_db(state, move |db| Ok(db.get_user_by_id(user_id)?.is_some())).await?;
        if exists {
            Ok(self)
        } else {
            Err(ApiError::Unauthenticated("Not authenticated"))
        }
    }
}

/// The caller if a valid session was presented, otherwise `None`.
#[derive(Debug, Clone, Copy)]
pub struct MaybeContext(pub Option<RequestContext>);

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        context_from_headers(&parts.headers, &state.session).ok_or(ApiError::Unauthenticated("Not authenticated"))
    }
}

impl FromRequestParts<AppState> for MaybeContext {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Self(context_from_headers(&parts.headers, &state.session)))
    }
}

fn context_from_headers(headers: &HeaderMap, settings: &SessionSettings) -> Option<RequestContext> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::to_string);

    let token = bearer.or_else(|| {
        CookieJar::from_headers(headers)
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
    })?;

    let claims = decode_token(&settings.jwt_secret, &token).ok()?;
    Some(RequestContext {
        user_id: claims.sub,
        role: claims.role,
    })
}

pub fn create_token(settings: &SessionSettings, user_id: i64, username: &str, role: Role) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        role,
        exp: (chrono::Utc::now() + settings.ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn decode_token(secret: &str, token: &str) -> anyhow::Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

pub fn session_cookie(settings: &SessionSettings, token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(settings.cookie_secure)
        .build()
}

/// Cookie value used to clear the session on logout.
pub fn expired_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}
