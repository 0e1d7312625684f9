//! Process-wide test configuration, populated once from environment variables.
//!
//! Required variables are validated up front: if any are absent the whole run
//! aborts before a browser is launched, with every missing name listed in the
//! error rather than just the first.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::error::{E2eError, E2eResult};

/// Environment variables that must be present for the suite to run.
pub const REQUIRED_ENV: [&str; 5] = [
    "ADMIN_USERNAME",
    "ADMIN_PASSWORD",
    "INVALID_PASSWORD",
    "INVALID_EMAIL",
    "RANDOM_PASSWORD",
];

/// Opt-in switch that downgrades missing required variables from a fatal
/// configuration error to a skipped run. Off by default: a CI run that
/// loses a secret must fail, not pass silently.
pub const SKIP_UNCONFIGURED_ENV: &str = "E2E_SKIP_UNCONFIGURED";

const DEFAULT_BASE_URL: &str = "https://mail.stage.example.net/";
const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:4444";
const DEFAULT_IDENTITY_PATH: &str = "api/me";
const DEFAULT_ERROR_TEXT: &str = "Nieprawidłowy e-mail lub hasło";
const DEFAULT_ADMIN_MENU_LABEL: &str = "MS";
const DEFAULT_USER_MENU_LABEL: &str = "tm";

/// One username/password pair. `Debug` redacts the password so credentials
/// can appear in logs and error context without leaking secrets.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Which credential record a scenario logs in with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialVariant {
    Admin,
    User,
    /// Valid admin email, configured invalid password.
    InvalidPassword,
    /// Configured malformed email, configured random password.
    InvalidEmail,
}

/// Post-login role, which determines the expected menu control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    User,
}

#[derive(Debug, Clone)]
pub struct CredentialSet {
    pub admin: Credentials,
    /// End-user credentials are optional; scenarios needing them are skipped
    /// when absent.
    pub user: Option<Credentials>,
    pub invalid_password: Credentials,
    pub invalid_email: Credentials,
}

impl CredentialSet {
    pub fn for_variant(&self, variant: CredentialVariant) -> Option<&Credentials> {
        match variant {
            CredentialVariant::Admin => Some(&self.admin),
            CredentialVariant::User => self.user.as_ref(),
            CredentialVariant::InvalidPassword => Some(&self.invalid_password),
            CredentialVariant::InvalidEmail => Some(&self.invalid_email),
        }
    }
}

/// The four increasing timeout tiers used throughout the suite.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// Quick operations like clicks.
    pub short: Duration,
    /// Regular operations like page loads and outcome resolution.
    pub medium: Duration,
    /// Slow operations.
    pub long: Duration,
    /// Upper bound for any single wait.
    pub max: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            short: Duration::from_secs(5),
            medium: Duration::from_secs(10),
            long: Duration::from_secs(30),
            max: Duration::from_secs(60),
        }
    }
}

/// Immutable suite configuration. Constructed once per process; there are no
/// setters after load.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: Url,
    pub webdriver_url: String,
    pub credentials: CredentialSet,
    pub timeouts: Timeouts,
    /// Absolute URL of the identity endpoint.
    pub identity_url: Url,
    /// Expected error-banner text, compared case-insensitively as a
    /// substring. Environment-specific, hence overridable.
    pub error_banner_text: String,
    pub admin_menu_label: String,
    pub user_menu_label: String,
    /// Persisted cookie artifact reused across tests that opt in.
    pub session_file: PathBuf,
    pub screenshot_dir: PathBuf,
}

impl Config {
    /// Load configuration from process environment variables.
    pub fn from_env() -> E2eResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an injectable variable lookup. Every
    /// missing required variable is collected before failing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> E2eResult<Self> {
        let missing: Vec<String> = REQUIRED_ENV
            .iter()
            .filter(|name| lookup(name).map_or(true, |v| v.is_empty()))
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(E2eError::MissingEnv(missing));
        }

        let get = |name: &str| lookup(name).expect("required variable checked above");

        let base_raw = lookup("BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(&base_raw).map_err(|e| E2eError::InvalidConfig {
            name: "BASE_URL".into(),
            reason: e.to_string(),
        })?;

        let identity_url = match lookup("IDENTITY_URL") {
            Some(raw) => Url::parse(&raw).map_err(|e| E2eError::InvalidConfig {
                name: "IDENTITY_URL".into(),
                reason: e.to_string(),
            })?,
            None => base_url
                .join(DEFAULT_IDENTITY_PATH)
                .map_err(|e| E2eError::InvalidConfig {
                    name: "IDENTITY_URL".into(),
                    reason: e.to_string(),
                })?,
        };

        let admin = Credentials {
            username: get("ADMIN_USERNAME"),
            password: get("ADMIN_PASSWORD"),
        };
        let user = match (lookup("USER_USERNAME"), lookup("USER_PASSWORD")) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => {
                Some(Credentials { username: u, password: p })
            }
            _ => None,
        };
        let credentials = CredentialSet {
            invalid_password: Credentials {
                username: admin.username.clone(),
                password: get("INVALID_PASSWORD"),
            },
            invalid_email: Credentials {
                username: get("INVALID_EMAIL"),
                password: get("RANDOM_PASSWORD"),
            },
            admin,
            user,
        };

        Ok(Self {
            base_url,
            webdriver_url: lookup("WEBDRIVER_URL")
                .unwrap_or_else(|| DEFAULT_WEBDRIVER_URL.to_string()),
            credentials,
            timeouts: Timeouts::default(),
            identity_url,
            error_banner_text: lookup("LOGIN_ERROR_TEXT")
                .unwrap_or_else(|| DEFAULT_ERROR_TEXT.to_string()),
            admin_menu_label: lookup("ADMIN_MENU_LABEL")
                .unwrap_or_else(|| DEFAULT_ADMIN_MENU_LABEL.to_string()),
            user_menu_label: lookup("USER_MENU_LABEL")
                .unwrap_or_else(|| DEFAULT_USER_MENU_LABEL.to_string()),
            session_file: lookup("SESSION_STATE_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("target/e2e/session-state.json")),
            screenshot_dir: lookup("SCREENSHOT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("target/e2e/screenshots")),
        })
    }

    /// Menu control label for a role (the initials button shown after login).
    pub fn menu_label(&self, role: Role) -> &str {
        match role {
            Role::Admin => &self.admin_menu_label,
            Role::User => &self.user_menu_label,
        }
    }

    /// Whether the caller asked for unconfigured environments to skip the
    /// suite instead of aborting it.
    pub fn skip_unconfigured() -> bool {
        Self::skip_unconfigured_from(|name| std::env::var(name).ok())
    }

    pub fn skip_unconfigured_from(lookup: impl Fn(&str) -> Option<String>) -> bool {
        lookup(SKIP_UNCONFIGURED_ENV)
            .map_or(false, |v| matches!(v.as_str(), "1" | "true" | "yes"))
    }

    /// Log the non-sensitive parts of the configuration for diagnostics.
    pub fn log_summary(&self) {
        info!(
            base_url = %self.base_url,
            webdriver = %self.webdriver_url,
            admin_user = %self.credentials.admin.username,
            has_end_user = self.credentials.user.is_some(),
            identity_url = %self.identity_url,
            "loaded suite configuration"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("ADMIN_USERNAME", "admin@example.net"),
            ("ADMIN_PASSWORD", "hunter2hunter2"),
            ("INVALID_PASSWORD", "not-the-password"),
            ("INVALID_EMAIL", "invalid@"),
            ("RANDOM_PASSWORD", "zxcvbnm123"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> E2eResult<Config> {
        Config::from_lookup(|name| env.get(name).map(|v| v.to_string()))
    }

    #[test]
    fn loads_with_all_required_vars() {
        let config = load(&full_env()).unwrap();
        assert_eq!(config.credentials.admin.username, "admin@example.net");
        assert_eq!(config.credentials.invalid_password.username, "admin@example.net");
        assert_eq!(config.credentials.invalid_email.username, "invalid@");
        assert_eq!(config.credentials.invalid_email.password, "zxcvbnm123");
        assert!(config.credentials.user.is_none());
        assert_eq!(config.timeouts.medium, Duration::from_secs(10));
    }

    #[test]
    fn missing_vars_are_all_enumerated() {
        let mut env = full_env();
        env.remove("ADMIN_PASSWORD");
        env.remove("RANDOM_PASSWORD");
        match load(&env) {
            Err(E2eError::MissingEnv(names)) => {
                assert_eq!(names, vec!["ADMIN_PASSWORD", "RANDOM_PASSWORD"]);
            }
            other => panic!("expected MissingEnv, got {other:?}"),
        }
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let mut env = full_env();
        env.insert("ADMIN_USERNAME", "");
        match load(&env) {
            Err(E2eError::MissingEnv(names)) => assert_eq!(names, vec!["ADMIN_USERNAME"]),
            other => panic!("expected MissingEnv, got {other:?}"),
        }
    }

    #[test]
    fn end_user_credentials_require_both_halves() {
        let mut env = full_env();
        env.insert("USER_USERNAME", "user@example.net");
        assert!(load(&env).unwrap().credentials.user.is_none());

        env.insert("USER_PASSWORD", "s3cret-s3cret");
        let config = load(&env).unwrap();
        assert_eq!(
            config.credentials.user.unwrap().username,
            "user@example.net"
        );
    }

    #[test]
    fn identity_url_defaults_relative_to_base() {
        let mut env = full_env();
        env.insert("BASE_URL", "https://mail.test.local/");
        let config = load(&env).unwrap();
        assert_eq!(config.identity_url.as_str(), "https://mail.test.local/api/me");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let mut env = full_env();
        env.insert("BASE_URL", "not a url");
        assert!(matches!(
            load(&env),
            Err(E2eError::InvalidConfig { name, .. }) if name == "BASE_URL"
        ));
    }

    #[test]
    fn unconfigured_skip_is_opt_in_only() {
        assert!(!Config::skip_unconfigured_from(|_| None));
        assert!(!Config::skip_unconfigured_from(|_| Some("0".into())));
        assert!(Config::skip_unconfigured_from(|name| {
            (name == SKIP_UNCONFIGURED_ENV).then(|| "1".to_string())
        }));
        assert!(Config::skip_unconfigured_from(|_| Some("true".into())));
    }

    #[test]
    fn debug_never_prints_passwords() {
        let config = load(&full_env()).unwrap();
        let dump = format!("{config:?}");
        assert!(!dump.contains("hunter2hunter2"));
        assert!(dump.contains("<redacted>"));
    }
}
