//! Suite runner: one isolated browser session per scenario, scenarios
//! executed concurrently, results collected into a JSON report.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{E2eError, E2eResult};
use crate::fixture::AuthFixture;
use crate::pages::{LoginOutcome, LoginPage};
use crate::scenario::{Expectation, Scenario};
use crate::session::Session;

/// Result of running a single scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,
    pub skipped: bool,
    pub duration_ms: u64,
    /// Soft verifications that failed without aborting the scenario.
    pub soft_failures: Vec<String>,
    pub error: Option<String>,
}

impl ScenarioResult {
    fn skipped(name: &str, reason: &str) -> Self {
        Self {
            name: name.to_string(),
            success: true,
            skipped: true,
            duration_ms: 0,
            soft_failures: Vec::new(),
            error: Some(reason.to_string()),
        }
    }
}

/// Result of running the whole suite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

#[derive(Clone)]
pub struct SuiteRunner {
    config: Arc<Config>,
}

impl SuiteRunner {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Run all scenarios, each in its own browser session. Scenarios are
    /// fully parallel at the suite level; operations within one scenario
    /// stay strictly sequential.
    pub async fn run_all(&self, scenarios: Vec<Scenario>) -> SuiteResult {
        let start = Instant::now();
        info!("running {} scenario(s)...", scenarios.len());

        let mut handles = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            let runner = self.clone();
            handles.push(tokio::spawn(async move {
                runner.run_scenario(&scenario).await
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => results.push(ScenarioResult {
                    name: "<panicked>".into(),
                    success: false,
                    skipped: false,
                    duration_ms: 0,
                    soft_failures: Vec::new(),
                    error: Some(format!("scenario task panicked: {e}")),
                }),
            }
        }

        let passed = results.iter().filter(|r| r.success && !r.skipped).count();
        let failed = results.iter().filter(|r| !r.success).count();
        let skipped = results.iter().filter(|r| r.skipped).count();
        let duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "suite finished: {} passed, {} failed, {} skipped ({} ms)",
            passed, failed, skipped, duration_ms
        );

        SuiteResult {
            total: results.len(),
            passed,
            failed,
            skipped,
            duration_ms,
            results,
        }
    }

    /// Run one scenario in a fresh, exclusively owned session.
    pub async fn run_scenario(&self, scenario: &Scenario) -> ScenarioResult {
        let start = Instant::now();

        if scenario.credentials == crate::config::CredentialVariant::User
            && self.config.credentials.user.is_none()
        {
            warn!("- {} (skipped: end-user credentials not configured)", scenario.name);
            return ScenarioResult::skipped(
                &scenario.name,
                "end-user credentials not configured",
            );
        }

        let mut soft_failures = Vec::new();
        let outcome = if scenario.reuse_session {
            self.execute_session_reuse(scenario).await
        } else {
            self.execute_login_flow(scenario, &mut soft_failures).await
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(()) => {
                info!("✓ {} ({} ms)", scenario.name, duration_ms);
                ScenarioResult {
                    name: scenario.name.clone(),
                    success: true,
                    skipped: false,
                    duration_ms,
                    soft_failures,
                    error: None,
                }
            }
            Err(e) => {
                error!("✗ {} - {e}", scenario.name);
                ScenarioResult {
                    name: scenario.name.clone(),
                    success: false,
                    skipped: false,
                    duration_ms,
                    soft_failures,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn execute_login_flow(
        &self,
        scenario: &Scenario,
        soft_failures: &mut Vec<String>,
    ) -> E2eResult<()> {
        let session = Session::connect(Arc::clone(&self.config)).await?;
        let page = LoginPage::new(session.clone());

        let result = self.drive(&page, scenario, soft_failures).await;
        if result.is_err() {
            let _ = page.session().capture(&format!("{}-failure", scenario.name)).await;
        }

        let closed = session.close().await;
        result.and(closed)
    }

    async fn drive(
        &self,
        page: &LoginPage,
        scenario: &Scenario,
        soft_failures: &mut Vec<String>,
    ) -> E2eResult<()> {
        let credentials = self
            .config
            .credentials
            .for_variant(scenario.credentials)
            .ok_or_else(|| {
                E2eError::ScenarioParse(format!(
                    "scenario '{}' needs credentials that are not configured",
                    scenario.name
                ))
            })?
            .clone();

        page.open().await?;
        page.fill_form(&credentials.username, &credentials.password)
            .await?;

        if scenario.verify_field_echo {
            if !page
                .verify_field_echo(&page.email_input(), &credentials.username)
                .await
            {
                soft_failures.push("email field echo".into());
            }
            if !page
                .verify_field_echo(&page.password_input(), &credentials.password)
                .await
            {
                soft_failures.push("password field echo".into());
            }
        }

        page.submit().await?;

        // The menu label to race against is role-dependent; for negative
        // scenarios the admin label stands in for the success branch that
        // must not appear.
        let race_role = match scenario.expect {
            Expectation::Authenticated { role } => role,
            Expectation::ErrorShown => crate::config::Role::Admin,
        };
        let outcome = page.await_outcome(race_role).await?;

        match (scenario.expect, outcome) {
            (Expectation::Authenticated { role }, LoginOutcome::Authenticated) => {
                page.verify_logged_in(role).await?;
                if let Some(check) = &scenario.verify_identity {
                    let info = page
                        .verify_identity(&credentials.username, &check.role)
                        .await?;
                    if let Some(expected) = check.docsa {
                        if info.docsa != expected {
                            return Err(E2eError::IdentityClaim(format!(
                                "docsa is {}, expected {expected}",
                                info.docsa
                            )));
                        }
                    }
                }
                page.logout(role).await?;
                page.verify_logged_out().await
            }
            (Expectation::ErrorShown, LoginOutcome::ErrorShown) => {
                page.verify_error_state().await
            }
            (expected, actual) => Err(E2eError::UnexpectedOutcome {
                expected: match expected {
                    Expectation::Authenticated { .. } => "authenticated".to_string(),
                    Expectation::ErrorShown => "error shown".to_string(),
                },
                actual: actual.to_string(),
            }),
        }
    }

    /// Session-persistence check: with the artifact present (created here
    /// through the fixture if needed), a second session restored from it
    /// must land directly in the authenticated state: no form fill, no
    /// submit.
    async fn execute_session_reuse(&self, scenario: &Scenario) -> E2eResult<()> {
        // The fixture session stays logged in while the second session is
        // checked, so the persisted cookies remain valid.
        let fixture = AuthFixture::setup(Arc::clone(&self.config)).await?;

        let reuse = async {
            let session = Session::connect(Arc::clone(&self.config)).await?;
            let page = LoginPage::new(session.clone());
            let restored = AuthFixture::restore(&page, &self.config).await;
            if restored.is_err() {
                let _ = page.session().capture(&format!("{}-failure", scenario.name)).await;
            }
            let closed = session.close().await;
            restored.and(closed)
        }
        .await;

        let teardown = fixture.teardown().await;
        reuse.and(teardown)
    }

    /// Write the suite result to a JSON report file.
    pub fn write_results(&self, output_dir: &Path, results: &SuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(output_dir)?;
        let path = output_dir.join("suite-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;
        info!("results written to {}", path.display());
        Ok(path)
    }
}
