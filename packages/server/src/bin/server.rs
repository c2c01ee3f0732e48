//! Real-time room relay server.
//!
//! Relays room chat (persisted before broadcast) and WebRTC signaling between
//! the members of each room.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin tsudoi-server -- --in-memory --fixtures fixtures.json
//! cargo run --bin tsudoi-server -- --host 0.0.0.0 --port 3000 --database-url sqlite://tsudoi.db?mode=rwc
//! ```

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use tsudoi_server::{
    config::{DEFAULT_DATABASE_URL, DEFAULT_HOST, DEFAULT_PORT, ServerConfig, StorageConfig},
    infrastructure::{StorageBackend, fixtures::Fixtures},
    ui::{AppState, Server},
};
use tsudoi_shared::{
    logger::setup_logger,
    time::{JST_OFFSET_MINUTES, SystemClock},
};

#[derive(Parser, Debug)]
#[command(name = "tsudoi-server")]
#[command(about = "Real-time room relay: chat and WebRTC signaling over WebSocket", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "TSUDOI_HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "TSUDOI_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// SQLite database URL
    #[arg(long, env = "TSUDOI_DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    database_url: String,

    /// Keep everything in process memory instead of SQLite
    #[arg(long)]
    in_memory: bool,

    /// JSON file seeding users, tokens and room memberships
    #[arg(long, env = "TSUDOI_FIXTURES")]
    fixtures: Option<PathBuf>,

    /// UTC offset in minutes used to render message times
    #[arg(
        long,
        env = "TSUDOI_DISPLAY_UTC_OFFSET_MINUTES",
        default_value_t = JST_OFFSET_MINUTES,
        allow_negative_numbers = true
    )]
    display_utc_offset_minutes: i32,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        let storage = if args.in_memory {
            StorageConfig::InMemory
        } else {
            StorageConfig::Sqlite {
                database_url: args.database_url,
            }
        };
        Self {
            host: args.host,
            port: args.port,
            storage,
            fixtures: args.fixtures,
            display_offset_minutes: args.display_utc_offset_minutes,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let config = ServerConfig::from(Args::parse());

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize dependencies in order:
    // 1. Storage (Message Log / Membership Authority / Identity Provider)
    // 2. Fixtures
    // 3. UseCases (AppState)
    // 4. Server

    // 1. Open storage
    let storage = StorageBackend::open(&config.storage).await?;

    // 2. Seed the directory
    if let Some(path) = &config.fixtures {
        let summary = Fixtures::load(path)?.apply(storage.seed.as_ref()).await?;
        tracing::info!(
            "Loaded fixtures from {}: {} user(s), {} room(s)",
            path.display(),
            summary.users,
            summary.rooms
        );
    }

    // 3. Create UseCases
    let state = AppState::new(
        &storage,
        Arc::new(SystemClock),
        config.display_offset_minutes,
    );

    // 4. Run the server
    let result = Server::new(state).run(config.host, config.port).await;
    storage.close().await;
    result
}
