//! Session credentials
//!
//! A session is a stateless signed claim set carried by the client in a
//! cookie. Integrity and expiry come entirely from the signature; there is no
//! server-side revocation list, so the lifetime stays short. The signing
//! secret is fixed at process start and never changes while running —
//! rotating it (by restarting) invalidates every outstanding session.

use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::types::{Identity, IdentityType};

/// Strength of the authentication behind a session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Weakly verified, granted by flows that did not prove key control
    Soft,
    /// Cryptographically verified via challenge-response
    Hard,
}

/// Claim set inside a session credential
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject DID
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub identity_type: IdentityType,
    pub tier: Tier,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to sign session: {0}")]
    Encode(jsonwebtoken::errors::Error),
    #[error("invalid or expired session")]
    Invalid,
}

/// Signs and validates session credentials with a process-wide secret.
///
/// Built once at startup from [`Config`] and immutable afterwards.
pub struct SessionSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
    cookie_name: String,
    cookie_domain: Option<String>,
    secure: bool,
}

impl SessionSigner {
    pub fn new(config: &Config) -> Self {
        let mut validation = Validation::default();
        // An expired credential must fail at exactly `exp`, not 60s later.
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(config.session_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.session_secret.as_bytes()),
            validation,
            ttl: Duration::seconds(config.session_ttl.as_secs() as i64),
            cookie_name: config.cookie_name.clone(),
            cookie_domain: config.cookie_domain.clone(),
            secure: config.secure_cookies,
        }
    }

    /// Mint a signed credential for an identity at the given tier.
    pub fn issue(&self, identity: &Identity, tier: Tier) -> Result<String, SessionError> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: identity.id.clone(),
            handle: identity.handle.clone(),
            name: identity.name.clone(),
            identity_type: identity.identity_type,
            tier,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding).map_err(SessionError::Encode)
    }

    /// Check signature and expiry; the caller must still re-resolve the
    /// subject against the identity directory before trusting the claims.
    pub fn validate(&self, credential: &str) -> Result<SessionClaims, SessionError> {
        decode::<SessionClaims>(credential, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| SessionError::Invalid)
    }

    /// Extract the session credential from a request's Cookie header.
    pub fn extract(&self, headers: &HeaderMap) -> Option<String> {
        let cookie_header = headers.get("cookie")?.to_str().ok()?;
        let prefix = format!("{}=", self.cookie_name);

        cookie_header
            .split(';')
            .map(str::trim)
            .find_map(|c| c.strip_prefix(prefix.as_str()))
            .map(str::to_string)
    }

    /// Set-Cookie value carrying a credential.
    pub fn cookie(&self, credential: &str) -> String {
        self.cookie_attrs(credential, self.ttl.num_seconds())
    }

    /// Set-Cookie value that clears the session.
    pub fn clear_cookie(&self) -> String {
        self.cookie_attrs("", 0)
    }

    fn cookie_attrs(&self, value: &str, max_age: i64) -> String {
        let mut cookie = format!(
            "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
            self.cookie_name, value, max_age
        );
        if let Some(ref domain) = self.cookie_domain {
            cookie.push_str("; Domain=");
            cookie.push_str(domain);
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            session_secret: "test-secret".into(),
            cookie_name: "imajin_session".into(),
            cookie_domain: None,
            secure_cookies: false,
            ..Config::default()
        }
    }

    fn test_identity() -> Identity {
        let now = Utc::now();
        Identity {
            id: "did:imajin:test".into(),
            identity_type: IdentityType::Agent,
            public_key: "00".repeat(32),
            handle: Some("tester".into()),
            name: Some("Tester".into()),
            metadata: serde_json::Value::Null,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_issue_and_validate() {
        let signer = SessionSigner::new(&test_config());
        let credential = signer.issue(&test_identity(), Tier::Hard).unwrap();

        let claims = signer.validate(&credential).unwrap();
        assert_eq!(claims.sub, "did:imajin:test");
        assert_eq!(claims.handle.as_deref(), Some("tester"));
        assert_eq!(claims.tier, Tier::Hard);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_expired_credential_rejected() {
        let signer = SessionSigner::new(&test_config());

        // Hand-craft a credential whose expiry is already behind us
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: "did:imajin:test".into(),
            handle: None,
            name: None,
            identity_type: IdentityType::Human,
            tier: Tier::Hard,
            iat: now - 120,
            exp: now - 10,
        };
        let credential = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(signer.validate(&credential).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let signer = SessionSigner::new(&test_config());
        let credential = signer.issue(&test_identity(), Tier::Soft).unwrap();

        let other = SessionSigner::new(&Config {
            session_secret: "a-different-secret".into(),
            ..test_config()
        });
        assert!(other.validate(&credential).is_err());
    }

    #[test]
    fn test_cookie_round_trip() {
        let signer = SessionSigner::new(&test_config());
        let cookie = signer.cookie("abc123");
        assert!(cookie.starts_with("imajin_session=abc123;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));

        let mut headers = HeaderMap::new();
        headers.insert("cookie", format!("other=1; {}", cookie).parse().unwrap());
        // Set-Cookie attrs after the value are separate cookie-pairs as far
        // as extraction is concerned; the value itself comes back intact.
        assert_eq!(signer.extract(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_clear_cookie_zeroes_max_age() {
        let signer = SessionSigner::new(&test_config());
        assert!(signer.clear_cookie().contains("Max-Age=0"));
    }
}
