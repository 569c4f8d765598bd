//! Authentication API endpoints
//!
//! - POST /api/auth/signup - register and open a session
//! - POST /api/auth/login - authenticate (rate limited)
//! - POST /api/auth/logout - close the current session
//! - GET  /api/auth/me - current user with live stats
//! - POST /api/auth/forgotpassword - start the password-reset flow
//! - PUT  /api/auth/resetpassword/{token} - finish the password-reset flow

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use std::net::IpAddr;

use crate::api::middleware::{extract_session_token, ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{AuthResponse, SuccessResponse, UserResponse};
use crate::services::{ServiceError, SignupInput};

/// The answer to every password-reset request, so the endpoint doesn't
/// reveal which addresses exist
const RESET_GENERIC_MESSAGE: &str = "If a user with that email exists, a reset link has been sent.";

/// Request body for registration
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Request body for login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for requesting a password-reset link
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Request body for completing a password reset
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/forgotpassword", post(forgot_password))
        .route("/resetpassword/{token}", put(reset_password))
}

/// Build protected auth routes (require auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(get_current_user))
}

/// POST /api/auth/signup
async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, session) = state
        .user_service
        .signup(SignupInput {
            name: body.name,
            email: body.email,
            password: body.password,
        })
        .await?;

    let stats = state.stats_service.author_stats(&user.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: UserResponse::from_user_with_stats(user, stats),
            token: session.id,
        }),
    ))
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    // IP window first, account window second
    if let Some(ip) = extract_ip_address(&headers) {
        if state.rate_limiter.is_ip_limited(ip).await {
            return Err(ApiError::with_details(
                "RATE_LIMIT",
                "Too many requests, please try again later",
                serde_json::json!({ "retry_after": 60 }),
            ));
        }
        state.rate_limiter.record_ip_request(ip).await;
    }

    if state.rate_limiter.is_account_limited(&body.email).await {
        return Err(ApiError::with_details(
            "RATE_LIMIT",
            "Too many login attempts, please try again later",
            serde_json::json!({ "retry_after": 900 }),
        ));
    }

    match state.user_service.login(&body.email, &body.password).await {
        Ok((user, session)) => {
            state.rate_limiter.clear_account_attempts(&body.email).await;

            let stats = state.stats_service.author_stats(&user.id).await?;
            Ok(Json(AuthResponse {
                user: UserResponse::from_user_with_stats(user, stats),
                token: session.id,
            }))
        }
        Err(err) => {
            if matches!(err, ServiceError::Unauthorized(_)) {
                state.rate_limiter.record_failed_attempt(&body.email).await;
            }
            Err(err.into())
        }
    }
}

/// POST /api/auth/logout
async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    _user: AuthenticatedUser,
) -> Result<Json<SuccessResponse>, ApiError> {
    if let Some(token) = extract_session_token(&headers) {
        state.user_service.logout(&token).await?;
    }
    Ok(Json(SuccessResponse::new()))
}

/// GET /api/auth/me
async fn get_current_user(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<UserResponse>, ApiError> {
    let stats = state.stats_service.author_stats(&user.id).await?;
    Ok(Json(UserResponse::from_user_with_stats(user, stats)))
}

/// POST /api/auth/forgotpassword
///
/// Always answers with the same message whether or not the address exists.
/// When the mail cannot be sent the stored token is discarded, so the user
/// can try again once mail is back.
async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Some((user, raw_token)) = state.user_service.begin_password_reset(&body.email).await?
    else {
        return Ok(Json(SuccessResponse::with_message(RESET_GENERIC_MESSAGE)));
    };

    let reset_url = format!("{}/#/reset-password/{}", state.frontend_url, raw_token);

    if let Err(err) = state
        .email_service
        .send_password_reset(&user.email, &reset_url)
        .await
    {
        state.user_service.clear_reset_token(&user.id).await?;
        return Err(err.into());
    }

    Ok(Json(SuccessResponse::with_message(RESET_GENERIC_MESSAGE)))
}

/// PUT /api/auth/resetpassword/{token}
async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state
        .user_service
        .reset_password(&token, &body.password)
        .await?;

    Ok(Json(SuccessResponse::with_message(
        "Password has been reset successfully.",
    )))
}

/// Best-effort client address from proxy headers
fn extract_ip_address(headers: &HeaderMap) -> Option<IpAddr> {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(first) = value.split(',').next() {
                if let Ok(ip) = first.trim().parse() {
                    return Some(ip);
                }
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(value) = real_ip.to_str() {
            if let Ok(ip) = value.trim().parse() {
                return Some(ip);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_ip_address_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );

        assert_eq!(
            extract_ip_address(&headers),
            Some("203.0.113.7".parse().unwrap())
        );
    }

    #[test]
    fn test_extract_ip_address_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));

        assert_eq!(
            extract_ip_address(&headers),
            Some("198.51.100.4".parse().unwrap())
        );
    }

    #[test]
    fn test_extract_ip_address_missing_or_garbage() {
        let headers = HeaderMap::new();
        assert_eq!(extract_ip_address(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("not-an-ip"));
        assert_eq!(extract_ip_address(&headers), None);
    }
}
