// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outbound mail relay.
//!
//! Wraps an async SMTP transport behind a narrow delivery trait so the
//! handlers can be exercised against a recording double instead of a live
//! server. Delivery is one-shot: no retry, no timeout, no partial success.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;

use crate::config::SmtpConfig;
use crate::validator::SubmissionRequest;

/// Mail relay error types.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Invalid mailbox address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// Request metadata embedded in the relayed mail.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    /// Client identifier derived for the request
    pub ip: String,
    /// User-Agent header, or "unknown"
    pub user_agent: String,
    /// When the submission was processed
    pub timestamp: DateTime<Utc>,
}

/// A composed plaintext mail, ready for delivery. Consumed once by the
/// relay and discarded.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub from: String,
    pub to: String,
    pub reply_to: String,
    pub subject: String,
    pub text: String,
}

/// Delivery contract for composed mail.
#[async_trait]
pub trait MailRelay: Send + Sync {
    /// Hand the mail to the transport, awaiting acceptance.
    async fn deliver(&self, email: OutboundEmail) -> Result<(), RelayError>;
}

/// SMTP-backed mail relay.
pub struct SmtpRelay {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpRelay {
    /// Build a relay from SMTP settings.
    ///
    /// `secure` selects implicit TLS; otherwise TLS is used opportunistically
    /// when the server offers STARTTLS. Credentials are attached only when a
    /// username is configured; the password then defaults to empty.
    pub fn new(config: &SmtpConfig) -> Result<Self, RelayError> {
        let tls_params = TlsParameters::new(config.host.clone())?;
        let tls = if config.secure {
            Tls::Wrapper(tls_params)
        } else {
            Tls::Opportunistic(tls_params)
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            .port(config.port)
            .tls(tls);

        if let Some(username) = &config.username {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                config.password.clone().unwrap_or_default(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl MailRelay for SmtpRelay {
    async fn deliver(&self, email: OutboundEmail) -> Result<(), RelayError> {
        let message = Message::builder()
            .from(email.from.parse::<Mailbox>()?)
            .reply_to(email.reply_to.parse::<Mailbox>()?)
            .to(email.to.parse::<Mailbox>()?)
            .subject(email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.text)?;

        self.transport.send(message).await?;
        Ok(())
    }
}

/// Compose the relayed inclusion-request mail.
///
/// Replies go to the submitter; the body lists every submitted field
/// followed by a Meta block with the request's IP, User-Agent, and
/// processing time.
pub fn compose(
    submission: &SubmissionRequest,
    meta: &RequestMeta,
    from: &str,
    to: &str,
) -> OutboundEmail {
    let subject = format!(
        "Book of Trust — inclusion request from {}",
        submission.handle
    );

    let text = format!(
        "Handle: {}\n\
         URL: {}\n\
         Name: {}\n\
         Contact email: {}\n\
         \n\
         Message:\n\
         {}\n\
         \n\
         Meta:\n\
         IP: {}\n\
         UA: {}\n\
         Time: {}\n",
        submission.handle,
        submission.url,
        submission.name,
        submission.email,
        submission.message,
        meta.ip,
        meta.user_agent,
        meta.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
    );

    OutboundEmail {
        from: from.to_string(),
        to: to.to_string(),
        reply_to: submission.email.clone(),
        subject,
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn submission() -> SubmissionRequest {
        SubmissionRequest {
            handle: "alice".to_string(),
            url: "https://alice.example.net".to_string(),
            name: "Alice".to_string(),
            email: "alice@example.net".to_string(),
            message: "Please include me.".to_string(),
        }
    }

    fn meta() -> RequestMeta {
        RequestMeta {
            ip: "1.2.3.4".to_string(),
            user_agent: "curl/8.0".to_string(),
            timestamp: Utc.with_ymd_and_hms(2026, 2, 14, 12, 30, 45).unwrap(),
        }
    }

    #[test]
    fn test_compose_subject_and_addressing() {
        let email = compose(&submission(), &meta(), "site@example.org", "owner@example.org");

        assert_eq!(
            email.subject,
            "Book of Trust — inclusion request from alice"
        );
        assert_eq!(email.from, "site@example.org");
        assert_eq!(email.to, "owner@example.org");
        assert_eq!(email.reply_to, "alice@example.net");
    }

    #[test]
    fn test_compose_body_contains_fields_and_meta() {
        let email = compose(&submission(), &meta(), "site@example.org", "owner@example.org");

        assert!(email.text.contains("Handle: alice\n"));
        assert!(email.text.contains("URL: https://alice.example.net\n"));
        assert!(email.text.contains("Name: Alice\n"));
        assert!(email.text.contains("Contact email: alice@example.net\n"));
        assert!(email.text.contains("Message:\nPlease include me.\n"));
        assert!(email.text.contains("IP: 1.2.3.4\n"));
        assert!(email.text.contains("UA: curl/8.0\n"));
        assert!(email.text.contains("Time: 2026-02-14T12:30:45.000Z\n"));
    }

    #[test]
    fn test_compose_keeps_optional_name_line() {
        let submission = SubmissionRequest {
            name: String::new(),
            ..submission()
        };
        let email = compose(&submission, &meta(), "site@example.org", "owner@example.org");

        assert!(email.text.contains("Name: \n"));
    }
}
