//! DID derivation and parsing
//!
//! A DID is derived deterministically from an Ed25519 public key:
//! `did:imajin:<base58(public key bytes)>`. Derivation is pure and total for
//! any 32-byte key; parsing rejects anything else with a typed error.

/// Textual prefix of every imajin DID
pub const DID_PREFIX: &str = "did:imajin:";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DidError {
    #[error("not an imajin DID (missing `did:imajin:` prefix)")]
    MissingPrefix,
    #[error("invalid base58 in DID body")]
    InvalidBase58,
    #[error("DID decodes to {0} bytes, expected 32")]
    InvalidLength(usize),
}

/// Derive the DID for an Ed25519 public key.
pub fn did_from_public_key(public_key: &[u8; 32]) -> String {
    format!("{}{}", DID_PREFIX, bs58::encode(public_key).into_string())
}

/// Recover the public key a DID was derived from.
pub fn public_key_from_did(did: &str) -> Result<[u8; 32], DidError> {
    let body = did.strip_prefix(DID_PREFIX).ok_or(DidError::MissingPrefix)?;

    let bytes = bs58::decode(body)
        .into_vec()
        .map_err(|_| DidError::InvalidBase58)?;

    bytes
        .try_into()
        .map_err(|v: Vec<u8>| DidError::InvalidLength(v.len()))
}

/// Whether a string is shaped like an imajin DID (prefix only, no decode).
pub fn is_did(s: &str) -> bool {
    s.starts_with(DID_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_round_trip() {
        let mut rng = rand::thread_rng();
        for _ in 0..32 {
            let key: [u8; 32] = rng.gen();
            let did = did_from_public_key(&key);
            assert!(is_did(&did));
            assert_eq!(public_key_from_did(&did), Ok(key));
        }
    }

    #[test]
    fn test_rejects_missing_prefix() {
        assert_eq!(
            public_key_from_did("did:key:z6MkhaXgBZD"),
            Err(DidError::MissingPrefix)
        );
        assert_eq!(public_key_from_did(""), Err(DidError::MissingPrefix));
    }

    #[test]
    fn test_rejects_malformed_base58() {
        // 0, O, I, l are not in the base58 alphabet
        assert_eq!(
            public_key_from_did("did:imajin:0OIl"),
            Err(DidError::InvalidBase58)
        );
    }

    #[test]
    fn test_rejects_wrong_length() {
        let short = format!("{}{}", DID_PREFIX, bs58::encode(b"short").into_string());
        assert_eq!(public_key_from_did(&short), Err(DidError::InvalidLength(5)));
    }
}
