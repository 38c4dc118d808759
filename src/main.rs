//! siwe-gate application entry point.
//!
//! Bootstraps the server:
//! 1. Load configuration from environment
//! 2. Select the nonce store (Redis when `REDIS_URL` is set, memory otherwise)
//! 3. Start the memory sweep task if needed
//! 4. Build router with API routes, CORS, logging and security headers
//! 5. Start Axum server
//!
//! Also supports a `sign` subcommand that produces a signed sign-in message
//! from a local private key, for exercising the API without a browser wallet.

use siwe_gate::{
    auth::{
        middleware::AppState,
        wallet::{sign_in, LocalWallet, SignInRequest},
    },
    cleanup,
    config::Config,
    routes,
    storage::{MemoryNonceStore, NonceStore, RedisNonceStore},
};
use std::sync::Arc;

/// Build and sign a sign-in message. Returns the JSON body for POST /auth/siwe
/// plus the signing address.
fn sign(args: &[String]) -> Result<String, String> {
    let chain_id: u64 = args[3]
        .parse()
        .map_err(|e| format!("Invalid chain id '{}': {}", args[3], e))?;

    let wallet = LocalWallet::from_hex(&args[0], vec![chain_id]).map_err(|e| e.to_string())?;
    let signed = sign_in(
        &wallet,
        SignInRequest {
            domain: args[1].clone(),
            uri: args[2].clone(),
            chain_id,
            nonce: args[4].clone(),
            statement: args.get(5).cloned(),
        },
    )
    .map_err(|e| e.to_string())?;

    let body = serde_json::json!({
        "message": signed.message.encode(),
        "signature": signed.signature,
        "address": wallet.address().to_checksum(None),
    });
    serde_json::to_string_pretty(&body).map_err(|e| e.to_string())
}

fn print_sign_usage() {
    eprintln!("Usage: siwe-gate sign <private-key-hex> <domain> <uri> <chain-id> <nonce> [statement]");
    eprintln!();
    eprintln!("Sign a Sign-In with Ethereum message with a local key.");
    eprintln!();
    eprintln!("Example:");
    eprintln!("  curl -c jar http://localhost:3001/auth/nonce");
    eprintln!("  siwe-gate sign 0x4c08...2318 localhost:5173 http://localhost:5173 80002 <nonce>");
    eprintln!();
    eprintln!("Then POST the message and signature fields to /auth/siwe with the cookie jar.");
}

#[tokio::main]
async fn main() {
    // Check for sign subcommand
    let args: Vec<String> = std::env::args().collect();
    if args.len() >= 2 && args[1] == "sign" {
        if args.len() != 7 && args.len() != 8 {
            print_sign_usage();
            std::process::exit(1);
        }

        match sign(&args[2..]) {
            Ok(body) => {
                println!("{}", body);
            }
            Err(e) => {
                eprintln!("Error signing message: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }
    // Initialize tracing with env filter support (RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config from environment
    let config = Config::from_env().expect("Failed to load config");
    tracing::info!("Starting siwe-gate on {}", config.bind_addr);
    tracing::debug!(config = ?config, "Loaded configuration");

    if config.siwe_domain.is_none() {
        tracing::warn!("SIWE_DOMAIN not set; expected domain is taken from Origin/Host headers");
    }

    // Select nonce store
    let store = match &config.redis_url {
        Some(url) => {
            let store = RedisNonceStore::connect(url)
                .await
                .expect("Failed to connect to Redis");
            tracing::info!("Using Redis nonce store");
            NonceStore::Redis(store)
        }
        None => {
            let store = MemoryNonceStore::new();
            tokio::spawn(cleanup::run_sweep_loop(
                store.clone(),
                std::time::Duration::from_secs(config.sweep_interval_secs),
            ));
            tracing::info!("Using in-memory nonce store");
            NonceStore::Memory(store)
        }
    };

    // Build shared state
    let state = AppState {
        store,
        config: Arc::new(config.clone()),
    };

    let app = routes::build_app(state);

    // Bind to configured address
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind");
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
