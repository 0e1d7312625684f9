//! Error types for the E2E suite

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingEnv(Vec<String>),

    #[error("Invalid configuration value for {name}: {reason}")]
    InvalidConfig { name: String, reason: String },

    #[error("Navigation to {url} failed after {attempts} attempt(s): {reason}")]
    Navigation {
        url: String,
        attempts: usize,
        reason: String,
    },

    #[error("Timeout after {timeout_ms} ms waiting for '{locator}' to become {expected}")]
    VisibilityTimeout {
        locator: String,
        expected: String,
        timeout_ms: u64,
    },

    #[error("Refusing to fill '{locator}' with an empty value")]
    EmptyFill { locator: String },

    #[error("Field '{locator}' readback mismatch: expected {expected:?}, got {actual:?}")]
    FillReadback {
        locator: String,
        expected: String,
        actual: String,
    },

    #[error("Page did not settle within {timeout_ms} ms")]
    SettleTimeout { timeout_ms: u64 },

    /// Neither the authenticated menu nor the error banner appeared after
    /// submit. Reported distinctly from either terminal state because it
    /// signals a possible application regression.
    #[error("Ambiguous login outcome: neither '{success_locator}' nor '{error_locator}' became visible within {timeout_ms} ms")]
    AmbiguousOutcome {
        success_locator: String,
        error_locator: String,
        timeout_ms: u64,
    },

    #[error("Expected {expected} after submit, but the session resolved to {actual}")]
    UnexpectedOutcome { expected: String, actual: String },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Identity endpoint returned status {status}: {body}")]
    IdentityStatus { status: u16, body: String },

    #[error("Identity response malformed: {0}")]
    IdentityShape(String),

    #[error("Identity claim mismatch: {0}")]
    IdentityClaim(String),

    #[error("Session artifact error: {0}")]
    SessionArtifact(String),

    #[error("Scenario parse error: {0}")]
    ScenarioParse(String),

    #[error("WebDriver session could not be established: {0}")]
    Connect(#[from] fantoccini::error::NewSessionError),

    #[error("WebDriver command failed: {0}")]
    WebDriver(#[from] fantoccini::error::CmdError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_env_lists_every_name() {
        let err = E2eError::MissingEnv(vec![
            "ADMIN_USERNAME".into(),
            "ADMIN_PASSWORD".into(),
            "INVALID_EMAIL".into(),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("ADMIN_USERNAME"));
        assert!(msg.contains("ADMIN_PASSWORD"));
        assert!(msg.contains("INVALID_EMAIL"));
    }

    #[test]
    fn ambiguous_outcome_names_both_branches() {
        let err = E2eError::AmbiguousOutcome {
            success_locator: "admin menu".into(),
            error_locator: "error banner".into(),
            timeout_ms: 10_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("admin menu"));
        assert!(msg.contains("error banner"));
    }
}
