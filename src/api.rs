use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse},
    routing::{delete, get, post},
    Json, Router,
};

use crate::error::{ApiError, ApiResult};
use crate::session::{SessionClaims, Tier};
use crate::state::AppState;
use crate::types::*;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health & stats
        .route("/health", get(health))
        .route("/stats", get(stats))
        // Challenge-response login
        .route("/challenge", post(issue_challenge))
        .route("/verify", post(verify))
        // Session lifecycle
        .route("/session", get(get_session))
        .route("/logout", post(logout))
        // Bearer tokens
        .route("/validate", post(validate_token))
        .route("/tokens", post(create_token))
        .route("/tokens/:id", delete(revoke_token))
        .with_state(state)
}

// ============ Auth Helpers ============

fn authenticate_session(state: &AppState, headers: &HeaderMap) -> ApiResult<(SessionClaims, Identity)> {
    let credential = state
        .sessions
        .extract(headers)
        .ok_or_else(|| ApiError::unauthorized("Missing session"))?;

    let claims = state
        .sessions
        .validate(&credential)
        .map_err(|_| ApiError::unauthorized("Invalid or expired session"))?;

    // The subject may have been deleted after the credential was minted;
    // nothing in the claims is trusted without this re-resolution.
    let identity = state
        .get_identity(&claims.sub)
        .map_err(|_| ApiError::unauthorized("Session subject no longer exists"))?;

    Ok((claims, identity))
}

// ============ Health Endpoints ============

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.health())
}

async fn stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.stats())
}

// ============ Challenge-Response Login ============

async fn issue_challenge(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChallengeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.id.trim().is_empty() {
        return Err(ApiError::bad_request("Missing id"));
    }

    let challenge = state.issue_challenge(req.id.trim())?;
    Ok(Json(ChallengeResponse {
        challenge_id: challenge.id,
        challenge: challenge.challenge,
        expires_at: challenge.expires_at,
    }))
}

async fn verify(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyRequest>,
) -> Result<axum::response::Response, ApiError> {
    match req {
        VerifyRequest::Challenge(req) => {
            let identity = state.verify_challenge(&req.challenge_id, &req.signature)?;

            let credential = state
                .sessions
                .issue(&identity, Tier::Hard)
                .map_err(|e| ApiError::internal(e.to_string()))?;
            let cookie = state.sessions.cookie(&credential);

            Ok((
                AppendHeaders([(header::SET_COOKIE, cookie)]),
                Json(IdentityPublic::from(&identity)),
            )
                .into_response())
        }
        // Stateless path: "not valid" is an expected outcome, always 200
        VerifyRequest::Message(req) => {
            let body = match state.verify_message(&req.message) {
                Ok(identity) => ValidationResponse::valid(IdentityPublic::from(&identity)),
                Err(reason) => ValidationResponse::invalid(reason),
            };
            Ok(Json(body).into_response())
        }
    }
}

// ============ Session Endpoints ============

async fn get_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let (_claims, identity) = authenticate_session(&state, &headers)?;

    let role = identity
        .metadata
        .get("role")
        .cloned()
        .unwrap_or(serde_json::Value::Null);

    Ok(Json(SessionResponse {
        did: identity.id,
        handle: identity.handle,
        identity_type: identity.identity_type,
        name: identity.name,
        role,
    }))
}

async fn logout(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cookie = state.sessions.clear_cookie();
    (
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(serde_json::json!({ "success": true })),
    )
}

// ============ Token Endpoints ============

async fn validate_token(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ValidateTokenRequest>,
) -> impl IntoResponse {
    if req.token.trim().is_empty() {
        return Json(ValidationResponse::invalid("Missing token"));
    }

    let body = match state.validate_token(req.token.trim()) {
        Ok(identity) => ValidationResponse::valid(IdentityPublic::from(&identity)),
        Err(reason) => ValidationResponse::invalid(reason),
    };
    Json(body)
}

async fn create_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateTokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (claims, _identity) = authenticate_session(&state, &headers)?;

    let token = state.create_token(&claims.sub, req.expires_in_secs)?;
    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            token: token.id,
            expires_at: token.expires_at,
        }),
    ))
}

async fn revoke_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(token_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (claims, _identity) = authenticate_session(&state, &headers)?;

    state.revoke_token(&token_id, &claims.sub)?;
    Ok(Json(serde_json::json!({ "success": true })))
}
