use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            LoginRequest, LoginResponse, PublicUser, RefreshRequest, RefreshResponse,
            RegisterRequest, RegisterResponse,
        },
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo::{CreateUserError, User},
    },
    error::{ApiError, ApiResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/token/refresh", post(refresh))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Field-level validation for registration. Email is expected to be
/// normalized already.
fn validate_registration(payload: &RegisterRequest) -> Result<(), ApiError> {
    if !is_valid_email(&payload.email) {
        return Err(ApiError::validation("email", "Invalid email"));
    }
    if payload.first_name.trim().is_empty() {
        return Err(ApiError::validation("first_name", "First name is required"));
    }
    if payload.last_name.trim().is_empty() {
        return Err(ApiError::validation("last_name", "Last name is required"));
    }
    if payload.password != payload.password_confirmation {
        return Err(ApiError::validation(
            "password_confirmation",
            "Passwords do not match",
        ));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::validation(
            "password",
            "Password must be at least 8 characters long",
        ));
    }
    Ok(())
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    payload.email = payload.email.trim().to_lowercase();
    validate_registration(&payload)?;

    let hash = hash_password(&payload.password)?;

    // The UNIQUE constraint on email decides collisions, including two
    // concurrent registrations racing on the same address.
    let user = match User::create(
        &state.db,
        &payload.email,
        payload.first_name.trim(),
        payload.last_name.trim(),
        &hash,
    )
    .await
    {
        Ok(u) => u,
        Err(CreateUserError::EmailTaken) => {
            warn!(email = %payload.email, "email already registered");
            return Err(ApiError::validation("email", "Email already registered"));
        }
        Err(CreateUserError::Db(e)) => return Err(e.into()),
    };

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User successfully registered!".into(),
            user: PublicUser {
                email: user.email,
                first_name: user.first_name,
                last_name: user.last_name,
            },
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    payload.email = payload.email.trim().to_lowercase();

    // Unknown email, inactive account and wrong password all take the same
    // exit so responses don't reveal which accounts exist.
    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %payload.email, "login unknown email");
            return Err(ApiError::AuthenticationFailed);
        }
    };

    if !user.is_active {
        warn!(user_id = %user.id, "login on inactive account");
        return Err(ApiError::AuthenticationFailed);
    }

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::AuthenticationFailed);
    }

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign_access(user.id)?;
    let refresh_token = keys.sign_refresh(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(LoginResponse {
        message: "Login successful!".into(),
        access_token,
        refresh_token,
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_refresh(&payload.refresh_token).map_err(|_| {
        warn!("refresh with invalid token");
        ApiError::validation("refresh_token", "Token is invalid or expired")
    })?;

    // The identity must still exist and be active to mint a new access token.
    let user = User::find_by_id(&state.db, claims.sub).await?;
    match user {
        Some(u) if u.is_active => {
            let access_token = keys.sign_access(u.id)?;
            info!(user_id = %u.id, "access token refreshed");
            Ok(Json(RefreshResponse { access_token }))
        }
        _ => Err(ApiError::validation(
            "refresh_token",
            "Token is invalid or expired",
        )),
    }
}
