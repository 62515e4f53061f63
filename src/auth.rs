//! Verification logic for the three authentication paths
//!
//! Challenge-response proofs, stateless signed messages, and bearer token
//! validity. All pure over their inputs; the store-side bookkeeping (marking
//! a challenge used, recording token use) lives in [`crate::state`].

use chrono::{DateTime, Duration, Utc};

use crate::crypto;
use crate::error::{ApiError, ApiResult};
use crate::types::{Challenge, Identity, IdentityType, SignedMessage, Token};

/// Verify the Ed25519 signature a client produced over a challenge.
///
/// The signed bytes are the UTF-8 representation of the hex challenge string,
/// not the decoded random bytes.
pub fn verify_challenge_signature(
    challenge: &Challenge,
    identity: &Identity,
    signature_hex: &str,
) -> ApiResult<()> {
    crypto::verify_signature(
        &identity.public_key,
        challenge.challenge.as_bytes(),
        signature_hex,
    )
    .map_err(|e| ApiError::unauthorized(format!("Invalid signature: {}", e)))
}

/// Failure reasons for stateless message verification.
///
/// These surface as `valid: false` strings, never as HTTP errors.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("timestamp outside the accepted window")]
    TimestampOutOfRange,
    #[error("message type does not match the sender's recorded type")]
    TypeMismatch {
        claimed: IdentityType,
        recorded: IdentityType,
    },
    #[error("invalid signature")]
    InvalidSignature,
}

/// Canonical byte encoding a signed message's signature covers:
/// JSON of `{from, type, timestamp, payload}` in exactly that field order.
pub fn canonical_message_bytes(message: &SignedMessage) -> Vec<u8> {
    #[derive(serde::Serialize)]
    struct MessageContent<'a> {
        from: &'a str,
        #[serde(rename = "type")]
        message_type: IdentityType,
        timestamp: &'a DateTime<Utc>,
        payload: &'a serde_json::Value,
    }

    let content = MessageContent {
        from: &message.from,
        message_type: message.message_type,
        timestamp: &message.timestamp,
        payload: &message.payload,
    };

    // Serialization of a plain struct over JSON-compatible values cannot fail
    serde_json::to_vec(&content).unwrap_or_default()
}

/// Verify a stateless signed message against the sender's identity.
///
/// No single-use semantics here: the timestamp window (±`max_clock_skew`
/// seconds) is the only replay bound, and callers needing stronger guarantees
/// must layer their own.
pub fn verify_signed_message(
    message: &SignedMessage,
    identity: &Identity,
    max_clock_skew: u64,
) -> Result<(), MessageError> {
    let now = Utc::now();
    let skew = Duration::seconds(max_clock_skew as i64);

    if message.timestamp < now - skew || message.timestamp > now + skew {
        return Err(MessageError::TimestampOutOfRange);
    }

    if message.message_type != identity.identity_type {
        return Err(MessageError::TypeMismatch {
            claimed: message.message_type,
            recorded: identity.identity_type,
        });
    }

    crypto::verify_signature(
        &identity.public_key,
        &canonical_message_bytes(message),
        &message.signature,
    )
    .map_err(|_| MessageError::InvalidSignature)
}

/// A token is valid iff it was never revoked and has not expired.
pub fn token_is_valid(token: &Token, now: DateTime<Utc>) -> bool {
    token.revoked_at.is_none() && token.expires_at > now
}
