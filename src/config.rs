use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub persist_interval: Duration,
    /// Lifetime of an issued challenge
    pub challenge_ttl: Duration,
    /// Lifetime of a session credential
    pub session_ttl: Duration,
    /// Default lifetime of a minted bearer token
    pub token_ttl: Duration,
    /// Process-wide session signing secret; rotating it invalidates all sessions
    pub session_secret: String,
    pub cookie_name: String,
    /// Parent domain the session cookie is scoped to (shared across subdomains)
    pub cookie_domain: Option<String>,
    pub secure_cookies: bool,
    /// Accepted clock skew for stateless message timestamps, in seconds
    pub max_clock_skew: u64,
    pub version: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            persist_interval: Duration::from_secs(
                env::var("PERSIST_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            challenge_ttl: Duration::from_secs(
                env::var("CHALLENGE_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            session_ttl: Duration::from_secs(
                env::var("SESSION_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(86400),
            ),
            token_ttl: Duration::from_secs(
                env::var("TOKEN_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30 * 86400),
            ),
            session_secret: env::var("SESSION_SECRET").unwrap_or_else(|_| {
                tracing::warn!("SESSION_SECRET not set, using insecure default");
                "insecure-dev-secret-change-in-production".into()
            }),
            cookie_name: env::var("COOKIE_NAME").unwrap_or_else(|_| "imajin_session".into()),
            cookie_domain: env::var("COOKIE_DOMAIN").ok(),
            secure_cookies: env::var("SECURE_COOKIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(false),
            max_clock_skew: env::var("MAX_CLOCK_SKEW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }

    pub fn state_file_path(&self) -> PathBuf {
        self.data_dir.join("auth.json")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
