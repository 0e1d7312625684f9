//! Declarative YAML scenario specification.
//!
//! A scenario names the credential variant to log in with, the terminal
//! state it expects, and which optional verifications to run. The built-in
//! set covers the login matrix; extra scenarios can be dropped into the
//! scenarios directory as YAML files.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::{CredentialVariant, Role};
use crate::error::{E2eError, E2eResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name for this scenario.
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Tags for filtering.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Which credential record to submit.
    pub credentials: CredentialVariant,

    /// The terminal state the session must reach.
    pub expect: Expectation,

    /// Soft-check that both form fields echo the literal input after fill.
    #[serde(default)]
    pub verify_field_echo: bool,

    /// Identity-endpoint verification to run once authenticated.
    #[serde(default)]
    pub verify_identity: Option<IdentityCheck>,

    /// Instead of filling the form, open a fresh session from the persisted
    /// session artifact and expect to land directly in the authenticated
    /// state.
    #[serde(default)]
    pub reuse_session: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Expectation {
    Authenticated { role: Role },
    ErrorShown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityCheck {
    /// Role string the profile's role set must contain.
    pub role: String,
    /// Expected value of the `docsa` feature flag, when pinned.
    #[serde(default)]
    pub docsa: Option<bool>,
}

impl Scenario {
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        serde_yaml::from_str(yaml).map_err(E2eError::from)
    }

    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|e| {
            E2eError::ScenarioParse(format!("{}: {e}", path.display()))
        })
    }

    /// Load every scenario file under a directory.
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut scenarios = Vec::new();
        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            scenarios.push(Self::from_file(entry.path())?);
        }
        Ok(scenarios)
    }

    pub fn filter_by_tag(scenarios: Vec<Self>, tag: &str) -> Vec<Self> {
        scenarios
            .into_iter()
            .filter(|s| s.tags.iter().any(|t| t == tag))
            .collect()
    }

    /// The built-in login matrix: the four credential variants plus
    /// persisted-session reuse.
    pub fn builtin() -> Vec<Self> {
        vec![
            Self {
                name: "admin-login".into(),
                description: "valid admin credentials reach the authenticated state".into(),
                tags: vec!["auth".into(), "smoke".into()],
                credentials: CredentialVariant::Admin,
                expect: Expectation::Authenticated { role: Role::Admin },
                verify_field_echo: true,
                verify_identity: Some(IdentityCheck {
                    role: "admin".into(),
                    docsa: Some(true),
                }),
                reuse_session: false,
            },
            Self {
                name: "user-login".into(),
                description: "valid end-user credentials reach the authenticated state".into(),
                tags: vec!["auth".into()],
                credentials: CredentialVariant::User,
                expect: Expectation::Authenticated { role: Role::User },
                verify_field_echo: true,
                verify_identity: None,
                reuse_session: false,
            },
            Self {
                name: "invalid-password".into(),
                description: "valid email with a wrong password shows the error banner".into(),
                tags: vec!["auth".into(), "negative".into()],
                credentials: CredentialVariant::InvalidPassword,
                expect: Expectation::ErrorShown,
                verify_field_echo: true,
                verify_identity: None,
                reuse_session: false,
            },
            Self {
                name: "invalid-email-format".into(),
                description: "malformed email shows the error banner".into(),
                tags: vec!["auth".into(), "negative".into()],
                credentials: CredentialVariant::InvalidEmail,
                expect: Expectation::ErrorShown,
                verify_field_echo: true,
                verify_identity: None,
                reuse_session: false,
            },
            Self {
                name: "session-reuse".into(),
                description: "a fresh session opened from the persisted artifact lands \
                              authenticated without touching the form"
                    .into(),
                tags: vec!["auth".into(), "session".into()],
                credentials: CredentialVariant::Admin,
                expect: Expectation::Authenticated { role: Role::Admin },
                verify_field_echo: false,
                verify_identity: None,
                reuse_session: true,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positive_scenario() {
        let yaml = r#"
name: admin-login
description: valid admin login
tags:
  - auth
  - smoke
credentials: admin
expect:
  outcome: authenticated
  role: admin
verify_field_echo: true
verify_identity:
  role: admin
  docsa: true
"#;
        let scenario = Scenario::from_yaml(yaml).unwrap();
        assert_eq!(scenario.name, "admin-login");
        assert_eq!(scenario.credentials, CredentialVariant::Admin);
        assert_eq!(
            scenario.expect,
            Expectation::Authenticated { role: Role::Admin }
        );
        let identity = scenario.verify_identity.unwrap();
        assert_eq!(identity.role, "admin");
        assert_eq!(identity.docsa, Some(true));
    }

    #[test]
    fn parses_negative_scenario_with_defaults() {
        let yaml = r#"
name: invalid-password
credentials: invalid_password
expect:
  outcome: error_shown
"#;
        let scenario = Scenario::from_yaml(yaml).unwrap();
        assert_eq!(scenario.expect, Expectation::ErrorShown);
        assert!(!scenario.verify_field_echo);
        assert!(scenario.verify_identity.is_none());
        assert!(!scenario.reuse_session);
        assert!(scenario.tags.is_empty());
    }

    #[test]
    fn builtin_covers_the_login_matrix() {
        let scenarios = Scenario::builtin();
        let variants: Vec<_> = scenarios.iter().map(|s| s.credentials).collect();
        assert!(variants.contains(&CredentialVariant::Admin));
        assert!(variants.contains(&CredentialVariant::User));
        assert!(variants.contains(&CredentialVariant::InvalidPassword));
        assert!(variants.contains(&CredentialVariant::InvalidEmail));
        assert!(scenarios.iter().any(|s| s.reuse_session));
    }

    #[test]
    fn tag_filter_keeps_matches_only() {
        let negative = Scenario::filter_by_tag(Scenario::builtin(), "negative");
        assert_eq!(negative.len(), 2);
        assert!(negative.iter().all(|s| s.expect == Expectation::ErrorShown));
    }

    #[test]
    fn load_all_reads_yaml_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("10-a.yaml"),
            "name: a\ncredentials: admin\nexpect:\n  outcome: error_shown\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("20-b.yml"),
            "name: b\ncredentials: invalid_email\nexpect:\n  outcome: error_shown\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("ignored.txt"), "not yaml").unwrap();

        let scenarios = Scenario::load_all(dir.path()).unwrap();
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[0].name, "a");
        assert_eq!(scenarios[1].name, "b");
    }

    #[test]
    fn malformed_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "name: [unterminated").unwrap();
        match Scenario::load_all(dir.path()) {
            Err(E2eError::ScenarioParse(msg)) => assert!(msg.contains("bad.yaml")),
            other => panic!("expected ScenarioParse, got {other:?}"),
        }
    }
}
