//! Imajin Authentication Core
//!
//! Proves that a caller controls the private key behind a DID and turns that
//! proof into credentials other services can check cheaply.
//!
//! ## Architecture
//!
//! - **DID**: `did:imajin:<base58(Ed25519 public key)>`, derived, never assigned
//! - **Challenge**: single-use random value the client signs to prove key control
//! - **Session**: short-lived signed claim set carried in a cookie
//! - **Token**: long-lived revocable bearer credential for service-to-service calls
//! - **Stateless verify**: direct signed-message authentication between agents

pub mod api;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod did;
pub mod error;
pub mod session;
pub mod state;
pub mod types;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
