//! Documentation of a daily semantic word guessing game.
//!
//! Players guess a hidden word. Every guess gets a similarity score (0-100) and, when close
//! enough, a rank (1 = closest, up to 999). Finding the word scores 100 with rank 1000. One
//! word per UTC day, never repeated.
//!
//!
//!
//! # General Infrastructure
//! - A daily job (`process` crate) picks the word, scores the vocabulary against it and
//!   publishes the finished table to the distribution store
//! - Any number of server instances read that table, cache it in memory and answer guesses
//! - The store is the only shared state, instances never talk to each other
//!
//!
//!
//! # Endpoints
//! - `POST /guess` with `{ "guess": "chien" }` → `{ similarity, rank, isCorrect, attempts }`
//! - `GET /top?limit=K&proof=word` → best ranked words, the answer only with a correct `proof`
//! - `GET /health` → `{ status, date }`
//! - `GET /stats` → `{ date, players, solvers, guesses }`
//!
//! Attempt counts follow the `x-session-id` header, or the peer IP without one. Rate limits
//! and player counts always follow the peer IP, since the header is whatever the client says.
//!
//!
//!
//! # Notes
//!
//! ## Keeping the Word Secret
//! The table the server holds contains the answer, so nothing except a correct guess ever
//! brings it back. Error messages, logs and `/health` only ever mention the date.
//!
//! ## Rate Limiting
//! Counts are per process and per peer address. Behind a load balancer a player gets
//! `RATE_MAX` per instance, which is fine for a game. A shared limit would need the store in
//! the request path.
//!
//!
//!
//! # Setup
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
//!
//! Run the server, reading from `./data` unless a store is configured.
//! ```sh
//! RUST_LOG=info cargo run --bin semantix
//! ```
//!
//! Publish today's word.
//! ```sh
//! RUST_LOG=info cargo run --bin process -- generate \
//!     --vocabulary words.txt --vectors vectors.txt --history history.bin
//! ```
use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    Router,
    http::{
        HeaderName, Method,
        header::{CONTENT_TYPE, RETRY_AFTER},
    },
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

pub mod cache;
pub mod config;
pub mod error;
pub mod limiter;
pub mod routes;
pub mod state;
pub mod stats;
pub mod utils;
pub mod verify;

use routes::{guess_handler, health_handler, stats_handler, top_handler};
use state::State;
use utils::SESSION_HEADER;

pub fn app(state: Arc<State>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(SESSION_HEADER)])
        .expose_headers([RETRY_AFTER])
        .max_age(state.config.cors_max_age);

    Router::new()
        .route("/guess", post(guess_handler))
        .route("/top", get(top_handler))
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .with_state(state)
}

pub async fn start_server() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = State::new().await?;

    let cache = state.verifier.cache().clone();
    tokio::spawn(async move {
        if let Err(e) = cache.get().await {
            warn!("Daily table not available at startup: {e}");
        }
    });

    info!("Starting server...");

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Server running on {address}");

    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
