//! Authenticated-session fixture.
//!
//! Tests that need a logged-in context go through [`AuthFixture`]: it reuses
//! the persisted cookie artifact when one exists, performs a single admin
//! login otherwise, and guarantees logout or state cleanup afterwards so no
//! authenticated state leaks into the next test. Only the fixture writes the
//! artifact, and only when it is absent or stale.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{Config, Role};
use crate::error::{E2eError, E2eResult};
use crate::pages::LoginPage;
use crate::session::{Session, StoredCookie};

pub struct AuthFixture {
    page: LoginPage,
    /// Whether the session came from the persisted artifact rather than a
    /// fresh login.
    reused_artifact: bool,
}

impl AuthFixture {
    /// Open a session that is authenticated as the admin identity.
    pub async fn setup(config: Arc<Config>) -> E2eResult<Self> {
        let session = Session::connect(Arc::clone(&config)).await?;
        let page = LoginPage::new(session.clone());

        if config.session_file.exists() {
            match Self::restore(&page, &config).await {
                Ok(()) => {
                    info!("reusing persisted session state");
                    return Ok(Self { page, reused_artifact: true });
                }
                Err(e) => {
                    warn!("persisted session state is stale ({e}); logging in fresh");
                    session.delete_cookies().await?;
                }
            }
        }

        page.open().await?;
        let admin = config.credentials.admin.clone();
        page.login(&admin.username, &admin.password, Role::Admin)
            .await?;

        let cookies = session.export_cookies().await?;
        store_artifact(&config.session_file, &cookies)?;

        Ok(Self { page, reused_artifact: false })
    }

    /// Install the persisted cookies and confirm they still authenticate:
    /// after a reload the session must land directly in the authenticated
    /// state, without touching the login form.
    pub(crate) async fn restore(page: &LoginPage, config: &Config) -> E2eResult<()> {
        let cookies = load_artifact(&config.session_file)?;
        // Cookies can only be installed once the browser is on the origin.
        page.session().navigate("/").await?;
        page.session().import_cookies(&cookies).await?;
        page.session().refresh().await?;
        page.verify_logged_in(Role::Admin).await
    }

    pub fn page(&self) -> &LoginPage {
        &self.page
    }

    pub fn reused_artifact(&self) -> bool {
        self.reused_artifact
    }

    /// Release the session: explicit logout, falling back to discarding the
    /// cookie state when logout is not possible, then close the browser.
    pub async fn teardown(self) -> E2eResult<()> {
        if let Err(e) = self.page.logout(Role::Admin).await {
            warn!("logout during teardown failed ({e}); discarding session state");
            if let Err(e) = self.page.session().delete_cookies().await {
                warn!("could not discard session cookies: {e}");
            }
        }
        self.page.into_session().close().await
    }
}

/// Run a test body against an authenticated page, with teardown guaranteed
/// on both the success and the failure path.
pub async fn with_admin_session<T, F, Fut>(config: Arc<Config>, body: F) -> E2eResult<T>
where
    F: FnOnce(LoginPage) -> Fut,
    Fut: Future<Output = E2eResult<T>>,
{
    let fixture = AuthFixture::setup(config).await?;
    let page = LoginPage::new(fixture.page().session().clone());

    let result = body(page).await;
    let cleanup = fixture.teardown().await;

    match (result, cleanup) {
        (Ok(value), Ok(())) => Ok(value),
        (Err(e), _) => Err(e),
        (Ok(_), Err(e)) => Err(e),
    }
}

/// Read the persisted cookie artifact.
pub fn load_artifact(path: &Path) -> E2eResult<Vec<StoredCookie>> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        E2eError::SessionArtifact(format!("cannot read {}: {e}", path.display()))
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        E2eError::SessionArtifact(format!("malformed artifact {}: {e}", path.display()))
    })
}

/// Write the cookie artifact, creating parent directories as needed.
pub fn store_artifact(path: &Path, cookies: &[StoredCookie]) -> E2eResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(cookies)?;
    std::fs::write(path, json)?;
    info!(path = %path.display(), cookies = cookies.len(), "persisted session state");
    Ok(())
}
