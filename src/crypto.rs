//! Cryptographic primitives for the auth core
//!
//! Ed25519 signature verification over hex-encoded keys and signatures,
//! plus random material for challenges and opaque identifiers.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};

/// Prefix for challenge identifiers
pub const CHALLENGE_ID_PREFIX: &str = "ch_";
/// Prefix for bearer token identifiers
pub const TOKEN_ID_PREFIX: &str = "tok_";

/// Result type for crypto operations
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Crypto operation errors
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("Invalid signature format: {0}")]
    InvalidSignature(String),
    #[error("Signature verification failed")]
    VerificationFailed,
    #[error("Hex decode error: {0}")]
    HexError(String),
}

/// Parse a hex-encoded 32-byte Ed25519 public key
pub fn parse_public_key(public_key_hex: &str) -> CryptoResult<VerifyingKey> {
    let key_bytes = hex::decode(public_key_hex.trim())
        .map_err(|e| CryptoError::HexError(e.to_string()))?;

    let key_array: [u8; 32] = key_bytes.try_into().map_err(|v: Vec<u8>| {
        CryptoError::InvalidPublicKey(format!("key must be 32 bytes, got {}", v.len()))
    })?;

    VerifyingKey::from_bytes(&key_array)
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
}

/// Verify a hex-encoded Ed25519 signature over a message
pub fn verify_signature(
    public_key_hex: &str,
    message: &[u8],
    signature_hex: &str,
) -> CryptoResult<()> {
    let key = parse_public_key(public_key_hex)?;

    let sig_bytes = hex::decode(signature_hex.trim())
        .map_err(|e| CryptoError::HexError(e.to_string()))?;

    let sig_array: [u8; 64] = sig_bytes.try_into().map_err(|v: Vec<u8>| {
        CryptoError::InvalidSignature(format!("signature must be 64 bytes, got {}", v.len()))
    })?;
    let signature = Signature::from_bytes(&sig_array);

    key.verify(message, &signature)
        .map_err(|_| CryptoError::VerificationFailed)
}

/// Generate a random 32-byte challenge value (hex encoded)
pub fn generate_challenge() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    hex::encode(bytes)
}

/// Generate an opaque identifier with a human-readable prefix.
///
/// The prefix carries no meaning beyond readability; uniqueness comes from
/// the 16 random bytes.
pub fn generate_id(prefix: &str) -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let bytes: [u8; 16] = rng.gen();
    format!("{}{}", prefix, hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;

    #[test]
    fn test_sign_verify_hex() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let public_key_hex = hex::encode(signing_key.verifying_key().to_bytes());

        let message = b"challenge bytes";
        let signature_hex = hex::encode(signing_key.sign(message).to_bytes());

        assert!(verify_signature(&public_key_hex, message, &signature_hex).is_ok());

        // Wrong message should fail
        assert!(matches!(
            verify_signature(&public_key_hex, b"other bytes", &signature_hex),
            Err(CryptoError::VerificationFailed)
        ));
    }

    #[test]
    fn test_parse_public_key_rejects_bad_input() {
        assert!(parse_public_key("not hex").is_err());
        assert!(parse_public_key("deadbeef").is_err()); // wrong length
    }

    #[test]
    fn test_verify_rejects_short_signature() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let public_key_hex = hex::encode(signing_key.verifying_key().to_bytes());
        assert!(matches!(
            verify_signature(&public_key_hex, b"msg", "deadbeef"),
            Err(CryptoError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_generate_challenge() {
        let c1 = generate_challenge();
        let c2 = generate_challenge();
        assert_eq!(c1.len(), 64);
        assert_ne!(c1, c2);
    }

    #[test]
    fn test_generate_id() {
        let id = generate_id(CHALLENGE_ID_PREFIX);
        assert!(id.starts_with("ch_"));
        assert_eq!(id.len(), 3 + 32);
        assert_ne!(id, generate_id(CHALLENGE_ID_PREFIX));
    }
}
