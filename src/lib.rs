// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Book of Trust inclusion-request backend.
//!
//! This crate serves the Book of Trust static site and accepts
//! contact-form submissions over a small JSON API:
//!
//! - Per-client sliding-window rate limiting (10 requests / 60 s default)
//! - Presence validation of the submitted fields
//! - Relay of each accepted submission as a plaintext mail over SMTP
//! - Static assets with an SPA fallback document for unmatched routes

pub mod config;
pub mod handlers;
pub mod limiter;
pub mod mailer;
pub mod metrics;
pub mod validator;

pub use config::Config;
pub use handlers::{router, ApiResponse, AppState};
pub use limiter::{Admission, RateLimiter};
pub use mailer::{MailRelay, OutboundEmail, RelayError, SmtpRelay};
pub use validator::{SubmissionRequest, ValidationError};
