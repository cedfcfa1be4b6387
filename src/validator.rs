// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Inclusion-request submission validation.
//!
//! Presence checks only: a submission must carry a handle, URL, contact
//! email, and message. No shape validation is applied to the email or URL;
//! the relayed mail is read by a human who can judge them.

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// An inclusion-request form submission.
///
/// Every field defaults to the empty string so a body with missing keys is
/// validated here rather than rejected by the JSON extractor.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SubmissionRequest {
    pub handle: String,
    pub url: String,
    pub name: String,
    pub email: String,
    pub message: String,
}

/// Validation error types.
#[derive(Debug, Error, Clone)]
pub enum ValidationError {
    /// One or more required fields are absent or empty. The field names are
    /// kept for logging; callers see only the fixed message.
    #[error("Missing fields")]
    MissingFields { fields: Vec<&'static str> },
}

/// Validate a submission before any mail is composed.
///
/// Required fields are `handle`, `url`, `email`, and `message`; `name` is
/// optional. A field counts as missing when it is the empty string.
pub fn validate(submission: &SubmissionRequest) -> Result<(), ValidationError> {
    let mut missing = Vec::new();

    if submission.handle.is_empty() {
        missing.push("handle");
    }
    if submission.url.is_empty() {
        missing.push("url");
    }
    if submission.email.is_empty() {
        missing.push("email");
    }
    if submission.message.is_empty() {
        missing.push("message");
    }

    if missing.is_empty() {
        Ok(())
    } else {
        debug!(fields = ?missing, "Submission missing required fields");
        Err(ValidationError::MissingFields { fields: missing })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_submission() -> SubmissionRequest {
        SubmissionRequest {
            handle: "alice".to_string(),
            url: "https://alice.example.net".to_string(),
            name: "Alice".to_string(),
            email: "alice@example.net".to_string(),
            message: "Please include me.".to_string(),
        }
    }

    #[test]
    fn test_full_submission_valid() {
        assert!(validate(&full_submission()).is_ok());
    }

    #[test]
    fn test_name_is_optional() {
        let submission = SubmissionRequest {
            name: String::new(),
            ..full_submission()
        };
        assert!(validate(&submission).is_ok());
    }

    #[test]
    fn test_each_required_field_enforced() {
        for field in ["handle", "url", "email", "message"] {
            let mut submission = full_submission();
            match field {
                "handle" => submission.handle.clear(),
                "url" => submission.url.clear(),
                "email" => submission.email.clear(),
                _ => submission.message.clear(),
            }

            let err = validate(&submission).expect_err(field);
            assert_eq!(err.to_string(), "Missing fields");
            let ValidationError::MissingFields { fields } = err;
            assert_eq!(fields, vec![field]);
        }
    }

    #[test]
    fn test_whitespace_counts_as_present() {
        // Presence only; whitespace is not trimmed away.
        let submission = SubmissionRequest {
            handle: " ".to_string(),
            ..full_submission()
        };
        assert!(validate(&submission).is_ok());
    }

    #[test]
    fn test_empty_body_reports_all_required_fields() {
        let err = validate(&SubmissionRequest::default()).unwrap_err();
        let ValidationError::MissingFields { fields } = err;
        assert_eq!(fields, vec!["handle", "url", "email", "message"]);
    }
}
