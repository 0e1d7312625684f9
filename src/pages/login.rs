//! Login page abstraction.
//!
//! The page moves through a small state machine: the anonymous form is
//! submitted, and the session then resolves into exactly one of two terminal
//! states, authenticated (role menu visible) or error shown (banner visible).
//! Logging out cycles back to the anonymous form. `await_outcome` is the
//! resolution point; if neither indicator appears within the medium timeout
//! the state is ambiguous and reported as its own failure.

use std::fmt;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::Role;
use crate::error::{E2eError, E2eResult};
use crate::identity::{self, UserInfo};
use crate::session::{soft, Session, Target};

const EMAIL_INPUT: Target = Target::css("email field", "input[type='email']");
const PASSWORD_INPUT: Target = Target::css("password field", "input[type='password']");
const SUBMIT_BUTTON: Target = Target::css("submit button", "button[type='submit']");
const PAGE_HEADING: Target = Target::css("page heading", "h1");
const ERROR_BANNER: Target = Target::css("error banner", ".text-error-500");
const LOGOUT_BUTTON: Target = Target::xpath("logout button", "//*[normalize-space()='Wyloguj się']");

/// Poll interval while racing the two outcome indicators.
const OUTCOME_POLL: Duration = Duration::from_millis(100);

/// Terminal state reached after submitting the login form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated,
    ErrorShown,
}

impl fmt::Display for LoginOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginOutcome::Authenticated => write!(f, "authenticated"),
            LoginOutcome::ErrorShown => write!(f, "error shown"),
        }
    }
}

pub struct LoginPage {
    session: Session,
}

impl LoginPage {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    pub fn email_input(&self) -> Target {
        EMAIL_INPUT
    }

    pub fn password_input(&self) -> Target {
        PASSWORD_INPUT
    }

    /// The role-labeled menu control shown after login. The label is the
    /// user's initials, so it depends on which identity logged in.
    fn menu_button(&self, role: Role) -> Target {
        let label = self.session.config().menu_label(role);
        Target::dynamic_xpath(
            match role {
                Role::Admin => "admin menu button",
                Role::User => "user menu button",
            },
            format!("//button[normalize-space()='{label}']"),
        )
    }

    /// Navigate to the login page and soft-check the initial state. The soft
    /// checks record failures without aborting: a cosmetic mismatch on the
    /// landing page should not mask the login behavior under test.
    pub async fn open(&self) -> E2eResult<()> {
        self.session.navigate("/").await?;

        let timeouts = self.session.config().timeouts;
        soft("starts on login route", self.on_login_route().await);
        soft(
            "submit button visible on landing",
            self.session
                .wait_visible(&SUBMIT_BUTTON, timeouts.short)
                .await
                .map(|_| ()),
        );
        soft(
            "page heading visible on landing",
            self.session
                .wait_visible(&PAGE_HEADING, timeouts.short)
                .await
                .map(|_| ()),
        );
        Ok(())
    }

    /// Populate both form fields through the validated fill, which rejects
    /// empty input and reads each value back. Stays on the anonymous form.
    pub async fn fill_form(&self, email: &str, password: &str) -> E2eResult<()> {
        self.session.fill_checked(&EMAIL_INPUT, email).await?;
        self.session.fill_checked(&PASSWORD_INPUT, password).await?;
        Ok(())
    }

    /// Click the submit control and wait for settlement. Outcome resolution
    /// is a separate step.
    pub async fn submit(&self) -> E2eResult<()> {
        self.session
            .click_visible(&SUBMIT_BUTTON, self.session.config().timeouts.medium)
            .await?;
        self.session.wait_settled().await
    }

    /// Resolve the post-submit state by racing the role menu against the
    /// error banner under the medium timeout. Whichever becomes visible
    /// first determines the outcome; neither within the budget is an
    /// ambiguous-outcome failure.
    pub async fn await_outcome(&self, role: Role) -> E2eResult<LoginOutcome> {
        let menu = self.menu_button(role);
        let timeout = self.session.config().timeouts.medium;
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if self.session.is_visible(&menu).await? {
                debug!("login outcome: authenticated");
                return Ok(LoginOutcome::Authenticated);
            }
            if self.session.is_visible(&ERROR_BANNER).await? {
                debug!("login outcome: error shown");
                return Ok(LoginOutcome::ErrorShown);
            }
            if tokio::time::Instant::now() >= deadline {
                let _ = self.session.capture("ambiguous-outcome").await;
                return Err(E2eError::AmbiguousOutcome {
                    success_locator: menu.name.to_string(),
                    error_locator: ERROR_BANNER.name.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(OUTCOME_POLL).await;
        }
    }

    /// Full login flow: fill, submit, resolve. Fails if the resolved state
    /// is not `Authenticated`.
    pub async fn login(&self, email: &str, password: &str, role: Role) -> E2eResult<()> {
        info!(%email, "logging in");
        self.fill_form(email, password).await?;
        self.submit().await?;
        match self.await_outcome(role).await? {
            LoginOutcome::Authenticated => Ok(()),
            other => Err(E2eError::UnexpectedOutcome {
                expected: LoginOutcome::Authenticated.to_string(),
                actual: other.to_string(),
            }),
        }
    }

    /// Log out through the role menu and assert the cycle back to the
    /// anonymous form.
    pub async fn logout(&self, role: Role) -> E2eResult<()> {
        info!(?role, "logging out");
        let timeouts = self.session.config().timeouts;
        self.session
            .click_visible(&self.menu_button(role), timeouts.medium)
            .await?;
        self.session
            .click_visible(&LOGOUT_BUTTON, timeouts.medium)
            .await?;
        self.session.wait_settled().await?;
        self.session
            .wait_visible(&SUBMIT_BUTTON, timeouts.short)
            .await?;
        Ok(())
    }

    /// Soft-check that a form field still holds the literal expected value.
    /// Read-only, so repeated calls report the same result.
    pub async fn verify_field_echo(&self, target: &Target, expected: &str) -> bool {
        let check = async {
            let actual = self.session.field_value(target).await?;
            if actual == expected {
                Ok(())
            } else {
                Err(E2eError::AssertionFailed(format!(
                    "'{}' echoes {actual:?}, expected {expected:?}",
                    target.name
                )))
            }
        }
        .await;
        soft(&format!("field echo for '{}'", target.name), check)
    }

    /// Hard checks for the authenticated state: the role menu is visible and
    /// the form controls are gone. The three form-control observations are
    /// read-only and independent, so they run as one concurrent batch.
    pub async fn verify_logged_in(&self, role: Role) -> E2eResult<()> {
        let menu = self.menu_button(role);
        self.session
            .wait_visible(&menu, self.session.config().timeouts.medium)
            .await?;

        let (submit_t, email_t, password_t) = (SUBMIT_BUTTON, EMAIL_INPUT, PASSWORD_INPUT);
        let (submit, email, password) = tokio::join!(
            self.session.is_visible(&submit_t),
            self.session.is_visible(&email_t),
            self.session.is_visible(&password_t),
        );
        for (name, still_visible) in [
            (submit_t.name, submit?),
            (email_t.name, email?),
            (password_t.name, password?),
        ] {
            if still_visible {
                return Err(E2eError::AssertionFailed(format!(
                    "'{name}' still visible after login"
                )));
            }
        }
        Ok(())
    }

    /// Hard checks for the anonymous form after logout: all three form
    /// controls visible again and the session back on the login route.
    pub async fn verify_logged_out(&self) -> E2eResult<()> {
        let timeouts = self.session.config().timeouts;
        self.session
            .wait_visible(&SUBMIT_BUTTON, timeouts.short)
            .await?;
        self.session
            .wait_visible(&EMAIL_INPUT, timeouts.short)
            .await?;
        self.session
            .wait_visible(&PASSWORD_INPUT, timeouts.short)
            .await?;
        self.on_login_route().await
    }

    /// Hard checks for the error state: still on the login route, banner
    /// visible with the expected message, and the form controls remain
    /// usable so the user can retry without reloading.
    pub async fn verify_error_state(&self) -> E2eResult<()> {
        let config = self.session.config();
        self.on_login_route().await?;

        let banner_text = self
            .session
            .text_of(&ERROR_BANNER, config.timeouts.medium)
            .await?;
        let expected = config.error_banner_text.to_lowercase();
        if !banner_text.to_lowercase().contains(&expected) {
            return Err(E2eError::AssertionFailed(format!(
                "error banner reads {banner_text:?}, expected it to contain {:?}",
                config.error_banner_text
            )));
        }

        self.session
            .wait_visible(&SUBMIT_BUTTON, config.timeouts.short)
            .await?;
        for target in [&EMAIL_INPUT, &PASSWORD_INPUT] {
            if !self.session.is_enabled(target).await? {
                return Err(E2eError::AssertionFailed(format!(
                    "'{}' is not enabled in the error state",
                    target.name
                )));
            }
        }
        Ok(())
    }

    /// Required postcondition of a successful login: the identity endpoint
    /// answers with a well-formed profile whose claims match the login
    /// identity.
    pub async fn verify_identity(
        &self,
        expected_email: &str,
        expected_role: &str,
    ) -> E2eResult<UserInfo> {
        let info = identity::fetch(&self.session).await?;
        info.check_claims(expected_email, expected_role)?;
        Ok(info)
    }

    async fn on_login_route(&self) -> E2eResult<()> {
        let url = self.session.current_url().await?;
        let base = &self.session.config().base_url;
        if url.host_str() != base.host_str() || url.path() != base.path() {
            return Err(E2eError::AssertionFailed(format!(
                "expected login route {base}, got {url}"
            )));
        }
        Ok(())
    }
}
