//! Application state for the Imajin auth core

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::time::interval;

use crate::auth;
use crate::config::Config;
use crate::crypto::{generate_challenge, generate_id, CHALLENGE_ID_PREFIX, TOKEN_ID_PREFIX};
use crate::did;
use crate::error::{ApiError, ApiResult};
use crate::session::SessionSigner;
use crate::types::*;

/// Global application state.
///
/// The identity directory is read-only from this core's perspective; the
/// challenge and token stores are owned and mutated exclusively here.
pub struct AppState {
    /// Identity directory, DID -> identity
    pub identities: DashMap<Did, Identity>,
    /// Lowercased handle -> DID lookup
    pub handle_index: DashMap<String, Did>,
    /// All issued challenges; never deleted, they form an audit trail
    pub challenges: DashMap<String, Challenge>,
    /// Bearer tokens
    pub tokens: DashMap<String, Token>,
    /// Session credential signer, built once at startup
    pub sessions: SessionSigner,
    /// Configuration
    pub config: Config,
    /// Start time for uptime calculation
    pub start_time: Instant,
    /// Persistence dirty flag
    dirty: AtomicBool,
    /// Notify for immediate save
    persist_notify: Notify,
    /// Shutdown flag
    shutdown: AtomicBool,
}

impl AppState {
    pub fn new(config: Config) -> Arc<Self> {
        Arc::new(Self {
            identities: DashMap::new(),
            handle_index: DashMap::new(),
            challenges: DashMap::new(),
            tokens: DashMap::new(),
            sessions: SessionSigner::new(&config),
            config,
            start_time: Instant::now(),
            dirty: AtomicBool::new(false),
            persist_notify: Notify::new(),
            shutdown: AtomicBool::new(false),
        })
    }

    /// Load state from disk
    pub async fn load_from_disk(self: &Arc<Self>) -> anyhow::Result<()> {
        let path = self.config.state_file_path();

        if path.exists() {
            let json = tokio::fs::read_to_string(&path).await?;
            let snapshot: StateSnapshot = serde_json::from_str(&json)?;

            for identity in snapshot.identities {
                if let Some(ref handle) = identity.handle {
                    self.handle_index
                        .insert(handle.to_lowercase(), identity.id.clone());
                }
                self.identities.insert(identity.id.clone(), identity);
            }
            for challenge in snapshot.challenges {
                self.challenges.insert(challenge.id.clone(), challenge);
            }
            for token in snapshot.tokens {
                self.tokens.insert(token.id.clone(), token);
            }

            tracing::info!(
                "Loaded state: {} identities, {} challenges, {} tokens",
                self.identities.len(),
                self.challenges.len(),
                self.tokens.len()
            );
        } else {
            tracing::info!("No existing state file, starting fresh");
        }

        Ok(())
    }

    /// Start background persistence worker
    pub fn spawn_persister(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let state = Arc::clone(self);
        let persist_interval = state.config.persist_interval;

        tokio::spawn(async move {
            let mut ticker = interval(persist_interval);

            loop {
                if state.shutdown.load(Ordering::SeqCst) {
                    tracing::info!("Persister shutting down, final save...");
                    if let Err(e) = state.save_to_disk().await {
                        tracing::error!("Failed final persist: {}", e);
                    }
                    break;
                }

                tokio::select! {
                    _ = ticker.tick() => {
                        if state.dirty.swap(false, Ordering::SeqCst) {
                            if let Err(e) = state.save_to_disk().await {
                                tracing::error!("Failed to persist state: {}", e);
                            }
                        }
                    }
                    _ = state.persist_notify.notified() => {
                        state.dirty.store(false, Ordering::SeqCst);
                        if let Err(e) = state.save_to_disk().await {
                            tracing::error!("Failed to persist state: {}", e);
                        }
                    }
                }
            }
        })
    }

    /// Signal shutdown
    pub fn signal_shutdown(&self) {
        tracing::info!("Shutdown signaled");
        self.shutdown.store(true, Ordering::SeqCst);
        self.persist_notify.notify_one();
    }

    /// Check if shutdown was requested
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Save state to disk
    async fn save_to_disk(&self) -> anyhow::Result<()> {
        let snapshot = StateSnapshot {
            identities: self.identities.iter().map(|r| r.value().clone()).collect(),
            challenges: self.challenges.iter().map(|r| r.value().clone()).collect(),
            tokens: self.tokens.iter().map(|r| r.value().clone()).collect(),
            saved_at: Utc::now(),
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        tokio::fs::create_dir_all(&self.config.data_dir).await?;

        let path = self.config.state_file_path();
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, &json).await?;
        tokio::fs::rename(&temp_path, &path).await?;

        tracing::debug!("State persisted: {} challenges", snapshot.challenges.len());
        Ok(())
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
    }

    // ============ Identity Directory ============

    /// Ingest an identity from the registration process.
    ///
    /// This is the directory's write path; the auth core itself never calls
    /// it on behalf of a request.
    pub fn put_identity(&self, identity: Identity) {
        if let Some(ref handle) = identity.handle {
            self.handle_index
                .insert(handle.to_lowercase(), identity.id.clone());
        }
        self.identities.insert(identity.id.clone(), identity);
        self.mark_dirty();
    }

    /// Get identity by DID
    pub fn get_identity(&self, id: &str) -> ApiResult<Identity> {
        self.identities
            .get(id)
            .map(|r| r.value().clone())
            .ok_or_else(|| ApiError::not_found("Identity not found"))
    }

    /// Resolve an identity from a DID or a handle
    pub fn resolve_identity(&self, id_or_handle: &str) -> ApiResult<Identity> {
        if did::is_did(id_or_handle) {
            return self.get_identity(id_or_handle);
        }
        let handle_lower = id_or_handle.to_lowercase();
        let id = self
            .handle_index
            .get(&handle_lower)
            .map(|r| r.value().clone())
            .ok_or_else(|| ApiError::not_found("Identity not found"))?;
        self.get_identity(&id)
    }

    // ============ Challenge Lifecycle ============

    /// Issue a fresh single-use challenge bound to an identity.
    pub fn issue_challenge(&self, id_or_handle: &str) -> ApiResult<Challenge> {
        if self.is_shutdown() {
            return Err(ApiError::Unavailable("Service is shutting down".into()));
        }

        let identity = self.resolve_identity(id_or_handle)?;

        let now = Utc::now();
        let challenge = Challenge {
            id: generate_id(CHALLENGE_ID_PREFIX),
            identity_id: identity.id.clone(),
            challenge: generate_challenge(),
            expires_at: now + Duration::seconds(self.config.challenge_ttl.as_secs() as i64),
            used_at: None,
            created_at: now,
        };

        self.challenges
            .insert(challenge.id.clone(), challenge.clone());
        self.mark_dirty();

        tracing::info!("Issued challenge {} for {}", challenge.id, identity.id);
        Ok(challenge)
    }

    /// Verify a signed challenge and consume it, exactly once.
    ///
    /// Signature verification runs against a cloned row, outside any lock, so
    /// a bad signature never consumes the challenge and the caller may retry
    /// before expiry. The consuming write re-checks `used_at` under the map
    /// shard's write lock, guaranteeing at most one winner when the same
    /// challenge is verified concurrently.
    pub fn verify_challenge(&self, challenge_id: &str, signature: &str) -> ApiResult<Identity> {
        let now = Utc::now();

        let challenge = self
            .challenges
            .get(challenge_id)
            .map(|r| r.value().clone())
            .filter(|c| c.is_usable(now))
            .ok_or_else(ApiError::challenge_invalid)?;

        let identity = self.get_identity(&challenge.identity_id)?;

        auth::verify_challenge_signature(&challenge, &identity, signature)?;

        let consumed = match self.challenges.get_mut(challenge_id) {
            Some(mut entry) if entry.is_usable(Utc::now()) => {
                entry.used_at = Some(Utc::now());
                true
            }
            _ => false,
        };
        if !consumed {
            // A concurrent verification won the race
            return Err(ApiError::challenge_invalid());
        }

        self.mark_dirty();
        tracing::info!("Challenge {} verified for {}", challenge_id, identity.id);
        Ok(identity)
    }

    // ============ Token Store ============

    /// Mint a bearer token for an identity.
    pub fn create_token(&self, identity_id: &str, ttl_secs: Option<u64>) -> ApiResult<Token> {
        let identity = self.get_identity(identity_id)?;

        let now = Utc::now();
        let ttl = ttl_secs.unwrap_or(self.config.token_ttl.as_secs());
        let token = Token {
            id: generate_id(TOKEN_ID_PREFIX),
            identity_id: identity.id,
            expires_at: now + Duration::seconds(ttl as i64),
            revoked_at: None,
            created_at: now,
            last_used_at: None,
        };

        self.tokens.insert(token.id.clone(), token.clone());
        self.mark_dirty();

        tracing::info!("Minted token {} for {}", token.id, token.identity_id);
        Ok(token)
    }

    /// Revoke a token owned by `owner`.
    ///
    /// A token that does not exist and a token owned by someone else are
    /// reported identically, so callers cannot enumerate other owners' ids.
    pub fn revoke_token(&self, token_id: &str, owner: &str) -> ApiResult<()> {
        let mut entry = self
            .tokens
            .get_mut(token_id)
            .ok_or_else(|| ApiError::not_found("Token not found"))?;
        if entry.identity_id != owner {
            return Err(ApiError::not_found("Token not found"));
        }

        if entry.revoked_at.is_none() {
            entry.revoked_at = Some(Utc::now());
        }
        drop(entry);

        self.mark_dirty();
        tracing::info!("Revoked token {}", token_id);
        Ok(())
    }

    /// Validate a bearer token and resolve its owner.
    ///
    /// `Err` carries the reason string reported as `valid: false`; it is
    /// deliberately not an HTTP error.
    pub fn validate_token(&self, token_id: &str) -> Result<Identity, String> {
        let now = Utc::now();

        let token = self
            .tokens
            .get(token_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| "Token not found".to_string())?;

        if !auth::token_is_valid(&token, now) {
            return Err("Token revoked or expired".into());
        }

        // Advisory telemetry; last writer wins under concurrency
        if let Some(mut entry) = self.tokens.get_mut(token_id) {
            entry.last_used_at = Some(now);
        }
        self.mark_dirty();

        self.get_identity(&token.identity_id)
            .map_err(|_| "Identity no longer exists".to_string())
    }

    // ============ Stateless Message Verification ============

    /// Verify a signed message against the sender's directory entry.
    pub fn verify_message(&self, message: &SignedMessage) -> Result<Identity, String> {
        let identity = self
            .resolve_identity(&message.from)
            .map_err(|_| "Sender identity not found".to_string())?;

        auth::verify_signed_message(message, &identity, self.config.max_clock_skew)
            .map_err(|e| e.to_string())?;

        Ok(identity)
    }

    // ============ Ops ============

    /// Get health info
    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            status: "healthy".into(),
            version: self.config.version.clone(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            identities_count: self.identities.len(),
        }
    }

    /// Get public stats
    pub fn stats(&self) -> StatsResponse {
        let now = Utc::now();
        let pending = self
            .challenges
            .iter()
            .filter(|r| r.value().is_usable(now))
            .count();
        let active_tokens = self
            .tokens
            .iter()
            .filter(|r| auth::token_is_valid(r.value(), now))
            .count();

        StatsResponse {
            total_identities: self.identities.len(),
            total_challenges: self.challenges.len(),
            pending_challenges: pending,
            total_tokens: self.tokens.len(),
            active_tokens,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct StateSnapshot {
    identities: Vec<Identity>,
    challenges: Vec<Challenge>,
    tokens: Vec<Token>,
    saved_at: DateTime<Utc>,
}
