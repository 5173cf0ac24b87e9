use std::sync::Arc;

use axum::Router;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keylease::config::Config;
use keylease::handlers;
use keylease::mail::MailClient;
use keylease::models::{Credential, RedemptionCode, Slot, SlotDuration};
use keylease::store::{create_pool, init_db, records, AppState};

#[derive(Parser, Debug)]
#[command(name = "keylease")]
#[command(about = "Redemption-code service leasing time-bounded access to pooled credentials")]
struct Cli {
    /// Seed the store with dev data (slot, credential, redemption code)
    #[arg(long)]
    seed: bool,

    /// Delete the database on exit (dev mode only, useful for fresh starts)
    #[arg(long)]
    ephemeral: bool,
}

/// Seeds the store with dev data for testing.
/// Creates: one slot, one pool credential and one single-use code.
/// Only runs in dev mode and when the store is empty.
fn seed_dev_data(state: &AppState) {
    let conn = state.db.get().expect("Failed to get connection for seeding");

    let existing = records::list_slots(&conn).expect("Failed to list slots");
    if !existing.is_empty() {
        tracing::info!("Store already has data, skipping seed");
        return;
    }

    tracing::info!("============================================");
    tracing::info!("SEEDING DEV DATA");
    tracing::info!("============================================");

    let slot = Slot {
        id: "premium".into(),
        name: "Premium".into(),
        platform: "acmeflix".into(),
        required_amount: 2,
        enabled: true,
        duration: SlotDuration::Hours(6),
        label_mode: None,
    };
    records::put_slot(&conn, &slot).expect("Failed to seed slot");
    tracing::info!("Slot: {} ({}h lease)", slot.id, slot.duration.hours());

    let cred: Credential = serde_json::from_value(serde_json::json!({
        "id": "dev-001",
        "slots": ["premium"],
        "platforms": ["acmeflix"],
        "payload": {
            "username": "dev@keylease.local",
            "password": "changeme",
            "otp_secret": "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ",
            "email": "dev@keylease.local",
        },
    }))
    .expect("Failed to build seed credential");
    records::put_credential(&conn, &cred).expect("Failed to seed credential");
    tracing::info!("Credential: {}", cred.id);

    let code = RedemptionCode {
        code: "KLDEVSEED".into(),
        slot_id: slot.id.clone(),
        created_by: "seed".into(),
        created_at: chrono::Utc::now().timestamp(),
        expires_at: None,
        max_uses: 1,
        used: 0,
        revoked: false,
        last_used_by: None,
        last_used_at: None,
        uses: Vec::new(),
    };
    records::put_code(&conn, &code).expect("Failed to seed code");
    tracing::info!("Redemption code: {}", code.code);
    tracing::info!("============================================");
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keylease=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }
    if config.mail_api_url.is_none() {
        tracing::warn!("MAIL_API_URL not set; external-code fetches will fail");
    }

    let db_pool = create_pool(&config.database_path).expect("Failed to create store pool");
    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize store");
    }

    let state = AppState {
        db: db_pool,
        admin_key: config.admin_key.clone(),
        mail: Arc::new(MailClient::new(
            config.mail_api_url.clone(),
            config.mail_api_key.clone(),
        )),
    };

    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set KEYLEASE_ENV=dev)");
        } else {
            seed_dev_data(&state);
        }
    }

    let app = Router::new()
        // Public endpoints (rate-limited, no auth)
        .merge(handlers::public::router(config.rate_limit))
        // Administrative endpoints (shared-secret header auth)
        .merge(handlers::admin::router(state.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    let cleanup_on_exit = cli.ephemeral && config.dev_mode;
    let db_path = config.database_path.clone();
    if cleanup_on_exit {
        tracing::info!("EPHEMERAL MODE: database will be deleted on exit");
    }

    tracing::info!("keylease server listening on {}", addr);

    // Use into_make_service_with_connect_info to enable IP-based rate limiting
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Failed to start server");

    if cleanup_on_exit {
        tracing::info!("Cleaning up ephemeral database...");
        if let Err(e) = std::fs::remove_file(&db_path) {
            tracing::warn!("Failed to remove {}: {}", db_path, e);
        }
        let _ = std::fs::remove_file(format!("{}-wal", db_path));
        let _ = std::fs::remove_file(format!("{}-shm", db_path));
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
