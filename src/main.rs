//! User management API server
//! Mission: Register, authenticate and authorize users with signed session tokens

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use usermgmt_backend::{
    auth::{AuthState, JwtHandler, UserStore},
    build_router, Config,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Environment first so clap sees values from .env files
    load_env();
    init_tracing();

    let config = Config::parse();
    config.validate().context("Invalid configuration")?;

    info!("🚀 User management API starting");

    let user_store = Arc::new(
        UserStore::new(&config.db_path, config.bcrypt_cost)
            .with_context(|| format!("Failed to open user database at {}", config.db_path))?,
    );
    user_store
        .ensure_default_admin(&config.admin_password())
        .context("Failed to seed default admin")?;

    let jwt_handler = Arc::new(
        JwtHandler::new(config.jwt_secret()).with_expiration_hours(config.token_ttl_hours),
    );
    let auth_state = AuthState::new(user_store, jwt_handler, config.page_limits());

    info!(
        "🔐 Authentication initialized at: {} (tokens valid {}h)",
        config.db_path, config.token_ttl_hours
    );

    let app = build_router(auth_state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("🎯 API server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Initialize tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "usermgmt_backend=debug,usermgmt=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // Standard dotenv search (cwd + parents)
    let _ = dotenv();

    // Also the crate directory, for runs started elsewhere with --manifest-path
    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}
