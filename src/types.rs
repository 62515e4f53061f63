//! Core types for the Imajin auth core
//!
//! Identity records are read-only here (the registration service owns them);
//! challenges and tokens are owned and mutated exclusively by this core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A decentralized identifier, `did:imajin:<base58 public key>`
pub type Did = String;

// ============ Identity Types ============

/// Kind of principal behind an identity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IdentityType {
    Human,
    Agent,
}

/// Identity record from the directory.
///
/// `id` is derivable from `public_key`; `public_key` is unique across all
/// identities. Written only by the registration process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    /// DID, derived from the public key
    pub id: Did,
    /// Principal kind
    #[serde(rename = "type")]
    pub identity_type: IdentityType,
    /// Ed25519 public key (32 bytes, hex)
    pub public_key: String,
    /// Optional unique handle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    /// Display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Opaque key-value metadata; unknown keys pass through untouched
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============ Challenge & Token Types ============

/// A single-use, time-bounded login challenge.
///
/// Consumed at most once by setting `used_at`; never deleted, the rows form
/// an audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    /// Opaque id, `ch_` prefixed
    pub id: String,
    /// Identity the challenge is bound to
    pub identity_id: Did,
    /// 32 random bytes, hex encoded; the client signs the UTF-8 bytes of this string
    pub challenge: String,
    pub expires_at: DateTime<Utc>,
    /// Set exactly once, on successful verification
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Challenge {
    /// Usable iff never consumed and not yet expired.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.used_at.is_none() && self.expires_at > now
    }
}

/// Long-lived revocable bearer token for machine-to-machine calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    /// Opaque bearer string, `tok_` prefixed
    pub id: String,
    pub identity_id: Did,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Advisory telemetry; concurrent updates may race, last writer wins
    pub last_used_at: Option<DateTime<Utc>>,
}

// ============ API Request Types ============

/// `POST /challenge` body; `id` is a DID or a handle
#[derive(Debug, Deserialize)]
pub struct ChallengeRequest {
    #[serde(default)]
    pub id: String,
}

/// `POST /verify` accepts either a signed challenge or a standalone
/// signed message; the two are distinguished by body shape.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum VerifyRequest {
    Challenge(ChallengeVerifyRequest),
    Message(MessageVerifyRequest),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeVerifyRequest {
    pub challenge_id: String,
    /// 64 bytes, hex encoded
    pub signature: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageVerifyRequest {
    pub message: SignedMessage,
}

/// An application message signed by its sender, verified without any stored
/// challenge or session. Field order matters to signers: the signature covers
/// the canonical JSON of `from`, `type`, `timestamp`, `payload` in that order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedMessage {
    pub from: Did,
    /// Must match the sender identity's recorded type
    #[serde(rename = "type")]
    pub message_type: IdentityType,
    pub timestamp: DateTime<Utc>,
    pub payload: serde_json::Value,
    /// 64 bytes, hex encoded
    pub signature: String,
}

#[derive(Debug, Deserialize)]
pub struct ValidateTokenRequest {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateTokenRequest {
    /// Override of the configured default token lifetime
    pub expires_in_secs: Option<u64>,
}

// ============ API Response Types ============

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    pub challenge_id: String,
    pub challenge: String,
    pub expires_at: DateTime<Utc>,
}

/// Identity fields safe to return to callers
#[derive(Debug, Clone, Serialize)]
pub struct IdentityPublic {
    pub did: Did,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(rename = "type")]
    pub identity_type: IdentityType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl From<&Identity> for IdentityPublic {
    fn from(i: &Identity) -> Self {
        Self {
            did: i.id.clone(),
            handle: i.handle.clone(),
            identity_type: i.identity_type,
            name: i.name.clone(),
        }
    }
}

/// `GET /session` response: the claims attached to the request context
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub did: Did,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(rename = "type")]
    pub identity_type: IdentityType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Passed through from identity metadata, absent when unset
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub role: serde_json::Value,
}

/// Result of a validation endpoint. "Not valid" is an expected outcome, so
/// these are always returned with HTTP 200.
#[derive(Debug, Serialize)]
pub struct ValidationResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentityPublic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationResponse {
    pub fn valid(identity: IdentityPublic) -> Self {
        Self {
            valid: true,
            identity: Some(identity),
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            identity: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub identities_count: usize,
}

/// Public stats response
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_identities: usize,
    pub total_challenges: usize,
    pub pending_challenges: usize,
    pub total_tokens: usize,
    pub active_tokens: usize,
}
