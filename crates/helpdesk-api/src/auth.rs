use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::cookie::CookieJar;
use tracing::info;

use helpdesk_db::users::{UserConflict, user_conflict};
use helpdesk_types::api::{AuthResponse, LoginRequest, RegisterRequest};
use helpdesk_types::models::{Role, User};

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::session::{MaybeContext, create_token, expired_cookie, session_cookie};
use crate::state::{AppState, run_blocking, run_db};

const BAD_CREDENTIALS: &str = "Invalid username/email or password";

/// Hash a password with Argon2id.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

/// POST /users/register: creates a `user` account and logs it in.
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let req = req.validated()?;

    let (username, email) = (req.username.clone(), req.email.clone());
    let (username_taken, email_taken) = run_db(&state, move |db| {
        Ok((
            db.get_user_by_username(&username)?.is_some(),
            db.get_user_by_email(&email)?.is_some(),
        ))
    })
    .await?;
    if username_taken {
        return Err(UserConflict::Username.into());
    }
    if email_taken {
        return Err(UserConflict::Email.into());
    }

    let password = req.password.clone();
    let password_hash = run_blocking(move || hash_password(&password).map_err(ApiError::Internal)).await?;

    let user = run_db(&state, move |db| {
        let id = match db.create_user(&req.username, &req.email, &password_hash, Role::User) {
            Ok(id) => id,
            Err(e) => return user_conflict(&e).map(Err).ok_or(e),
        };
        let user = db
            .get_user_by_id(id)?
            .ok_or_else(|| anyhow::anyhow!("User {} missing after insert", id))?
            .into_model()?;
        Ok(Ok(user))
    })
    .await??;

    info!(user_id = user.id, "Registered {}", user.username);
    let token = create_token(&state.session, user.id, &user.username, user.role)?;
    let jar = jar.add(session_cookie(&state.session, token.clone()));

    Ok((StatusCode::CREATED, jar, Json(AuthResponse { user, token })))
}

/// POST /users/login: `identifier` may be the username or the email.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let identifier = req.identifier.trim().to_string();
    let row = run_db(&state, move |db| db.get_user_by_login(&identifier))
        .await?
        .ok_or(ApiError::Unauthenticated(BAD_CREDENTIALS))?;

    let password = req.password;
    let hash = row.password_hash.clone();
    let verified = run_blocking(move || Ok(verify_password(&password, &hash))).await?;
    if !verified {
        return Err(ApiError::Unauthenticated(BAD_CREDENTIALS));
    }

    let user = row.into_model()?;
    let token = create_token(&state.session, user.id, &user.username, user.role)?;
    let jar = jar.add(session_cookie(&state.session, token.clone()));

    Ok((jar, Json(AuthResponse { user, token })))
}

/// GET /users/me: the session's user, or `null`.
pub async fn me(State(state): State<AppState>, MaybeContext(ctx): MaybeContext) -> Result<Json<Option<User>>, ApiError> {
    let Some(ctx) = ctx else {
        return Ok(Json(None));
    };

    let user = run_db(&state, move |db| db.get_user_by_id(ctx.user_id)?.map(|row| row.into_model()).transpose()).await?;
    Ok(Json(user))
}

/// GET /users/logout: clears the session cookie and returns `null`.
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (jar.remove(expired_cookie()), Json(None::<User>))
}
