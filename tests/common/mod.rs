use std::sync::Arc;

use chrono::Utc;
use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use tempfile::TempDir;

use imajin_auth::did::did_from_public_key;
use imajin_auth::types::{Identity, IdentityType};
use imajin_auth::{api, AppState, Config};

/// A running test server plus direct access to its state
pub struct TestServer {
    pub base_url: String,
    pub state: Arc<AppState>,
    _data_dir: TempDir,
}

/// Start a server on a random port backed by a temp data dir
pub async fn spawn_test_server() -> TestServer {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = Config {
        data_dir: dir.path().to_path_buf(),
        host: "127.0.0.1".into(),
        port: 0,
        session_secret: "integration-test-secret".into(),
        cookie_name: "imajin_session".into(),
        cookie_domain: None,
        secure_cookies: false,
        ..Config::default()
    };

    let state = AppState::new(config);
    let app = api::create_router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give server time to start
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    TestServer {
        base_url: format!("http://{}", addr),
        state,
        _data_dir: dir,
    }
}

/// Put a fresh keypair-backed identity into the directory
pub fn seed_identity(
    state: &AppState,
    handle: Option<&str>,
    identity_type: IdentityType,
) -> (SigningKey, Identity) {
    let signing_key = SigningKey::generate(&mut OsRng);
    let public_key = signing_key.verifying_key().to_bytes();
    let now = Utc::now();

    let identity = Identity {
        id: did_from_public_key(&public_key),
        identity_type,
        public_key: hex::encode(public_key),
        handle: handle.map(str::to_string),
        name: handle.map(|h| format!("Test {}", h)),
        metadata: serde_json::Value::Null,
        created_at: now,
        updated_at: now,
    };
    state.put_identity(identity.clone());

    (signing_key, identity)
}

/// Hex-encoded Ed25519 signature over a message
pub fn sign_hex(signing_key: &SigningKey, message: &[u8]) -> String {
    hex::encode(signing_key.sign(message).to_bytes())
}

/// Pull the session cookie pair (`name=value`) out of a response
pub fn session_cookie(resp: &reqwest::Response) -> Option<String> {
    let set_cookie = resp.headers().get("set-cookie")?.to_str().ok()?;
    set_cookie.split(';').next().map(str::to_string)
}
