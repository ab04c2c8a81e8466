//! RPS Hub Service
//!
//! HTTP front over the hub core. The UI and demo callers submit
//! operations here; the service holds no game logic of its own.

mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rps_hub_core::{
    Clock, GameHub, HubConfig, ManualClock, MockSettlement, PlayerId, SystemClock,
};

use handlers::*;

/// Default owner for local development: 0x0909..09
fn default_owner() -> PlayerId {
    PlayerId::from_bytes([9u8; 20])
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .init();

    let owner: PlayerId = match std::env::var("HUB_OWNER") {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            tracing::error!("invalid HUB_OWNER: {e}");
            std::process::exit(1);
        }),
        Err(_) => {
            let owner = default_owner();
            tracing::info!("HUB_OWNER not set, using dev owner {}", owner);
            owner
        }
    };

    let fee: u64 = std::env::var("HUB_FEE")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(100);
    let timeout_secs: i64 = std::env::var("GAME_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(24 * 3600);
    let start_paused = std::env::var("START_PAUSED").as_deref() == Ok("1");

    // SIMULATED_CLOCK=1 freezes time and enables POST /api/system/tick
    let manual_clock = if std::env::var("SIMULATED_CLOCK").as_deref() == Ok("1") {
        tracing::info!("running on a simulated clock");
        Some(Arc::new(ManualClock::starting_now()))
    } else {
        None
    };
    let clock: Arc<dyn Clock> = match &manual_clock {
        Some(manual) => manual.clone(),
        None => Arc::new(SystemClock),
    };

    let settlement = Arc::new(MockSettlement::new());
    let hub = GameHub::new(
        owner,
        HubConfig {
            fee,
            timeout: chrono::Duration::seconds(timeout_secs),
            start_paused,
        },
        clock,
        settlement.clone(),
    )
    .unwrap_or_else(|e| {
        tracing::error!("failed to create hub: {e}");
        std::process::exit(1);
    });
    tracing::info!(owner = %owner, fee, timeout_secs, "hub created");

    let state = AppState {
        hub,
        settlement,
        manual_clock,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        // Games
        .route("/api/games", post(create_game))
        .route("/api/games", get(list_games))
        .route("/api/games/:id", get(get_game))
        .route("/api/games/:id/play", post(play))
        .route("/api/games/:id/reveal", post(reveal))
        .route("/api/games/:id/claim-winner", post(claim_winner))
        .route("/api/games/:id/claim-draw", post(claim_draw))
        .route("/api/games/:id/claim-timeout", post(claim_timeout))
        .route("/api/games/:id/events", get(game_events))
        // Off-ledger helper
        .route("/api/commitment", post(make_commitment))
        // Events
        .route("/api/events", get(list_events))
        // Owner
        .route("/api/admin/games/:id/kill", post(kill_game))
        .route("/api/admin/pause", post(pause))
        .route("/api/admin/unpause", post(unpause))
        .route("/api/admin/reclaim-fees", post(reclaim_fees))
        .route("/api/admin/owner", post(set_owner))
        // System
        .route("/api/balances/:player", get(balance))
        .route("/api/system/tick", post(tick))
        .route("/api/health", get(health))
        .layer(cors)
        .with_state(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("RPS hub service starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

async fn health() -> &'static str {
    "ok"
}
