// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus counters for the request pipeline.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use lazy_static::lazy_static;
use prometheus::{register_counter, Counter, Encoder, TextEncoder};
use tracing::error;

lazy_static! {
    pub static ref HTTP_REQUESTS_TOTAL: Counter = register_counter!(
        "book_of_trust_http_requests_total",
        "Total inbound HTTP requests"
    )
    .unwrap();
    pub static ref RATE_LIMITED_TOTAL: Counter = register_counter!(
        "book_of_trust_rate_limited_total",
        "Requests rejected by the rate limiter"
    )
    .unwrap();
    pub static ref MAIL_RELAYED_TOTAL: Counter = register_counter!(
        "book_of_trust_mail_relayed_total",
        "Submissions relayed as mail"
    )
    .unwrap();
    pub static ref MAIL_FAILED_TOTAL: Counter = register_counter!(
        "book_of_trust_mail_failed_total",
        "Mail deliveries that failed"
    )
    .unwrap();
}

/// Prometheus text exposition endpoint.
pub async fn serve() -> Response {
    let mut buffer = Vec::new();
    if let Err(err) = TextEncoder::new().encode(&prometheus::gather(), &mut buffer) {
        error!(error = %err, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        buffer,
    )
        .into_response()
}
