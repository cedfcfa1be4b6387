// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP surface of the Book of Trust server.
//!
//! Every inbound request passes through the rate-limit middleware first;
//! admitted requests reach the API routes, and anything unmatched falls
//! through to the static site with an SPA fallback document.

use crate::config::Config;
use crate::limiter::{client_id, Admission, RateLimiter};
use crate::mailer::{compose, MailRelay, RelayError, RequestMeta};
use crate::metrics;
use crate::validator::{self, SubmissionRequest, ValidationError};
use axum::{
    extract::{ConnectInfo, DefaultBodyLimit, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Maximum accepted request body size.
const MAX_BODY_BYTES: usize = 200 * 1024;

/// Shared application state.
pub struct AppState {
    pub limiter: RateLimiter,
    pub relay: Arc<dyn MailRelay>,
    pub config: Config,
}

/// Wire envelope for every API response.
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

impl ApiResponse {
    fn success() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    fn failure(message: &'static str) -> Self {
        Self {
            ok: false,
            error: Some(message),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Failures surfaced by the inclusion-request endpoint.
///
/// Relay failures are logged with full detail at the failure site; callers
/// only ever see the generic message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Receiver not configured")]
    ReceiverNotConfigured,

    #[error(transparent)]
    Relay(#[from] RelayError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "Missing fields"),
            ApiError::ReceiverNotConfigured => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Receiver not configured")
            }
            ApiError::Relay(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error"),
        };

        (status, Json(ApiResponse::failure(message))).into_response()
    }
}

/// Build the application router shared by the binary and the tests.
pub fn router(state: Arc<AppState>) -> Router {
    let static_root = Path::new(&state.config.static_dir).to_path_buf();
    let site = ServeDir::new(&static_root)
        .not_found_service(ServeFile::new(static_root.join("index.html")));

    Router::new()
        .route("/api/request-profile", post(request_profile))
        .route("/health", get(health))
        .route("/metrics", get(metrics::serve))
        .fallback_service(site)
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Per-client rate limiting, applied ahead of routing.
///
/// Rejection is normal control flow, not an error: the client gets a 429
/// with a `Retry-After` hint and the arrival still counts toward its
/// window.
pub async fn rate_limit(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    metrics::HTTP_REQUESTS_TOTAL.inc();

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok());
    let client = client_id(forwarded, peer);

    match state
        .limiter
        .admit(&client, Utc::now().timestamp_millis())
        .await
    {
        Admission::Allowed { .. } => next.run(request).await,
        Admission::Limited { retry_after } => {
            metrics::RATE_LIMITED_TOTAL.inc();
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_after.as_secs().to_string())],
                Json(ApiResponse::failure("Too many requests")),
            )
                .into_response()
        }
    }
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Accept an inclusion-request submission and relay it as mail.
pub async fn request_profile(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(submission): Json<SubmissionRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    if let Err(err) = validator::validate(&submission) {
        info!(error = %err, "Submission rejected");
        return Err(err.into());
    }

    let Some(receiver) = state.config.mail.receiver.clone() else {
        error!("RECEIVER_EMAIL is not configured; cannot relay submissions");
        return Err(ApiError::ReceiverNotConfigured);
    };

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok());
    let meta = RequestMeta {
        ip: client_id(forwarded, peer.map(|ConnectInfo(addr)| addr.ip())),
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("unknown")
            .to_string(),
        timestamp: Utc::now(),
    };

    let email = compose(&submission, &meta, &state.config.mail.from, &receiver);
    match state.relay.deliver(email).await {
        Ok(()) => {
            metrics::MAIL_RELAYED_TOTAL.inc();
            info!(handle = %submission.handle, ip = %meta.ip, "Inclusion request relayed");
            Ok(Json(ApiResponse::success()))
        }
        Err(err) => {
            metrics::MAIL_FAILED_TOTAL.inc();
            error!(error = %err, "Mail delivery failed");
            Err(err.into())
        }
    }
}
