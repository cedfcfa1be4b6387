// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Book of Trust Server
//!
//! A small backend for the Book of Trust site: serves the static site,
//! accepts inclusion-request form submissions on a JSON API, and relays
//! each accepted submission as a mail over SMTP.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! - `PORT`: HTTP listen port (default: 3000)
//! - `STATIC_DIR`: static asset root with the fallback `index.html`
//!   (default: public)
//! - `RATE_LIMIT_MAX`: max requests per window per client (default: 10)
//! - `RATE_LIMIT_WINDOW_MS`: rolling window in milliseconds (default: 60000)
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_SECURE`, `SMTP_USER`, `SMTP_PASS`:
//!   SMTP transport settings
//! - `FROM_EMAIL`: sender address (falls back to `SMTP_USER`)
//! - `RECEIVER_EMAIL`: recipient for relayed submissions (required for the
//!   endpoint to accept submissions)

use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use book_of_trust_server::{
    config::Config,
    handlers::{router, AppState},
    limiter::RateLimiter,
    mailer::SmtpRelay,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        static_dir = %config.static_dir,
        smtp_host = %config.smtp.host,
        smtp_port = config.smtp.port,
        max_requests = config.rate_limit.max_requests,
        window_ms = config.rate_limit.window_ms,
        receiver_configured = config.mail.receiver.is_some(),
        "Starting Book of Trust server"
    );

    // Create application state
    let relay = SmtpRelay::new(&config.smtp)?;
    let limiter = RateLimiter::new(config.rate_limit.clone());
    let port = config.port;

    let state = Arc::new(AppState {
        limiter,
        relay: Arc::new(relay),
        config,
    });

    // Spawn sweep task for idle clients
    let sweep_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            sweep_state
                .limiter
                .sweep(Utc::now().timestamp_millis())
                .await;
        }
    });

    // Build router
    let app = router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
