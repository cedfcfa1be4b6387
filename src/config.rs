// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the Book of Trust server.
//!
//! Loaded once at startup from environment variables and passed explicitly
//! into the components that need it.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the inclusion-request server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP listen port (default: 3000)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Root directory for static assets and the SPA fallback document
    /// (default: public)
    #[serde(default = "default_static_dir")]
    pub static_dir: String,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// SMTP transport configuration
    #[serde(default)]
    pub smtp: SmtpConfig,

    /// Mail addressing configuration
    #[serde(default)]
    pub mail: MailConfig,
}

/// Per-client rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests per window per client (default: 10)
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Rolling window length in milliseconds (default: 60000)
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
}

/// SMTP transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// SMTP relay host (default: localhost)
    #[serde(default = "default_smtp_host")]
    pub host: String,

    /// SMTP relay port (default: 587)
    #[serde(default = "default_smtp_port")]
    pub port: u16,

    /// Use implicit TLS instead of opportunistic STARTTLS (default: false)
    #[serde(default)]
    pub secure: bool,

    /// Username for SMTP authentication; auth is skipped when unset
    #[serde(default)]
    pub username: Option<String>,

    /// Password for SMTP authentication
    #[serde(default)]
    pub password: Option<String>,
}

/// Mail addressing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Sender address (default: no-reply@localhost)
    #[serde(default = "default_from")]
    pub from: String,

    /// Recipient address for relayed submissions. Leaving this unset is a
    /// deployment defect; the endpoint answers 500 until it is configured.
    #[serde(default)]
    pub receiver: Option<String>,
}

// Default value functions
fn default_port() -> u16 {
    3000
}

fn default_static_dir() -> String {
    "public".to_string()
}

fn default_max_requests() -> u32 {
    10
}

fn default_window_ms() -> u64 {
    60_000
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from() -> String {
    "no-reply@localhost".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            static_dir: default_static_dir(),
            rate_limit: RateLimitConfig::default(),
            smtp: SmtpConfig::default(),
            mail: MailConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_ms: default_window_ms(),
        }
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: default_smtp_port(),
            secure: false,
            username: None,
            password: None,
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from: default_from(),
            receiver: None,
        }
    }
}

impl RateLimitConfig {
    /// Get the rolling window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// `SMTP_SECURE` follows the original deployment convention: any set,
    /// non-empty value other than the literal `false` enables implicit TLS.
    /// The sender falls back from `FROM_EMAIL` to `SMTP_USER`.
    pub fn from_env() -> Self {
        let username = std::env::var("SMTP_USER").ok().filter(|v| !v.is_empty());

        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_port),
            static_dir: std::env::var("STATIC_DIR").unwrap_or_else(|_| default_static_dir()),
            rate_limit: RateLimitConfig {
                max_requests: std::env::var("RATE_LIMIT_MAX")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_else(default_max_requests),
                window_ms: std::env::var("RATE_LIMIT_WINDOW_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_else(default_window_ms),
            },
            smtp: SmtpConfig {
                host: std::env::var("SMTP_HOST").unwrap_or_else(|_| default_smtp_host()),
                port: std::env::var("SMTP_PORT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_else(default_smtp_port),
                secure: std::env::var("SMTP_SECURE")
                    .map(|v| !v.is_empty() && v != "false")
                    .unwrap_or(false),
                username: username.clone(),
                password: std::env::var("SMTP_PASS").ok(),
            },
            mail: MailConfig {
                from: std::env::var("FROM_EMAIL")
                    .ok()
                    .filter(|v| !v.is_empty())
                    .or(username)
                    .unwrap_or_else(default_from),
                receiver: std::env::var("RECEIVER_EMAIL").ok().filter(|v| !v.is_empty()),
            },
        }
    }
}
