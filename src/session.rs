//! Base page abstraction over a WebDriver session.
//!
//! One `Session` owns one browser tab for the duration of a test. It carries
//! the cross-cutting helpers every page type composes: navigation with
//! bounded retry, visibility waits, validated fills, settlement barriers,
//! best-effort screenshots, outbound API calls, and cookie persistence for
//! session reuse.

use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use fantoccini::cookies::Cookie;
use fantoccini::elements::Element;
use fantoccini::{Client, ClientBuilder, Locator};
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Instant};
use tracing::{debug, error, warn};
use url::Url;

use crate::config::Config;
use crate::error::{E2eError, E2eResult};

/// Navigation retry budget.
const NAV_RETRIES: usize = 3;
/// Poll interval for visibility waits.
const POLL: Duration = Duration::from_millis(100);
/// Poll interval for settlement checks.
const SETTLE_POLL: Duration = Duration::from_millis(250);

/// A named, deferred element query. The name is what shows up in timeout and
/// readback errors; the query is evaluated at interaction time.
#[derive(Debug, Clone)]
pub struct Target {
    pub name: Cow<'static, str>,
    pub query: Query,
}

#[derive(Debug, Clone)]
pub enum Query {
    Css(Cow<'static, str>),
    XPath(Cow<'static, str>),
}

impl Target {
    pub const fn css(name: &'static str, selector: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            query: Query::Css(Cow::Borrowed(selector)),
        }
    }

    pub const fn xpath(name: &'static str, expression: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            query: Query::XPath(Cow::Borrowed(expression)),
        }
    }

    /// Build a target whose query is computed at runtime (e.g. from a
    /// configured menu label).
    pub fn dynamic_xpath(name: impl Into<Cow<'static, str>>, expression: String) -> Self {
        Self {
            name: name.into(),
            query: Query::XPath(Cow::Owned(expression)),
        }
    }

    fn locator(&self) -> Locator<'_> {
        match &self.query {
            Query::Css(sel) => Locator::Css(sel),
            Query::XPath(expr) => Locator::XPath(expr),
        }
    }
}

/// Exponential backoff between navigation attempts: `1s × attempt`.
fn backoff_delay(attempt: usize) -> Duration {
    Duration::from_secs(attempt as u64)
}

/// Execute an assertion result softly: log a warning on failure and report a
/// boolean instead of propagating. Used where a single optional check must
/// not abort the remaining verification sequence.
pub fn soft(what: &str, result: E2eResult<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!("soft assertion failed: {what}: {e}");
            false
        }
    }
}

/// One isolated browser tab plus the suite configuration it operates under.
#[derive(Clone)]
pub struct Session {
    client: Client,
    http: reqwest::Client,
    config: Arc<Config>,
}

impl Session {
    /// Open a new WebDriver session against the configured endpoint.
    pub async fn connect(config: Arc<Config>) -> E2eResult<Self> {
        let mut caps = serde_json::Map::new();
        caps.insert(
            "goog:chromeOptions".to_string(),
            serde_json::json!({ "args": ["--headless=new", "--window-size=1280,720"] }),
        );

        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&config.webdriver_url)
            .await?;
        let http = reqwest::Client::builder()
            .timeout(config.timeouts.medium)
            .danger_accept_invalid_certs(true)
            .build()?;

        Ok(Self { client, http, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn current_url(&self) -> E2eResult<Url> {
        Ok(self.client.current_url().await?)
    }

    /// Navigate to `path` relative to the base URL, retrying with backoff.
    /// Success requires both navigation completion and settlement; after the
    /// retry budget is exhausted the final failure is propagated.
    pub async fn navigate(&self, path: &str) -> E2eResult<()> {
        let url = self
            .config
            .base_url
            .join(path)
            .map_err(|e| E2eError::Navigation {
                url: path.to_string(),
                attempts: 0,
                reason: e.to_string(),
            })?;

        let mut last_err = None;
        for attempt in 1..=NAV_RETRIES {
            match self.try_navigate(&url).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(url = %url, attempt, "navigation attempt failed: {e}");
                    last_err = Some(e);
                    if attempt < NAV_RETRIES {
                        sleep(backoff_delay(attempt)).await;
                    }
                }
            }
        }

        Err(E2eError::Navigation {
            url: url.to_string(),
            attempts: NAV_RETRIES,
            reason: last_err
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        })
    }

    async fn try_navigate(&self, url: &Url) -> E2eResult<()> {
        self.client.goto(url.as_str()).await?;
        self.wait_settled().await
    }

    /// Wait until pending network activity and DOM construction have
    /// completed. Readiness requires `document.readyState === 'complete'`
    /// and a stable resource-entry count across two consecutive polls.
    pub async fn wait_settled(&self) -> E2eResult<()> {
        let timeout = self.config.timeouts.medium;
        let deadline = Instant::now() + timeout;
        let mut last_count: Option<i64> = None;

        loop {
            let ready = self
                .client
                .execute("return document.readyState === 'complete';", vec![])
                .await?
                .as_bool()
                .unwrap_or(false);
            let count = self
                .client
                .execute(
                    "return performance.getEntriesByType('resource').length;",
                    vec![],
                )
                .await?
                .as_i64()
                .unwrap_or(0);

            if ready && last_count == Some(count) {
                return Ok(());
            }
            last_count = Some(count);

            if Instant::now() >= deadline {
                return Err(E2eError::SettleTimeout {
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            sleep(SETTLE_POLL).await;
        }
    }

    /// Block until the target is visible, bounded by `timeout`.
    pub async fn wait_visible(&self, target: &Target, timeout: Duration) -> E2eResult<Element> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.find_visible(target).await? {
                Some(element) => return Ok(element),
                None => {
                    if Instant::now() >= deadline {
                        return Err(E2eError::VisibilityTimeout {
                            locator: target.name.to_string(),
                            expected: "visible".to_string(),
                            timeout_ms: timeout.as_millis() as u64,
                        });
                    }
                    sleep(POLL).await;
                }
            }
        }
    }

    /// Single observation: the element, if present and displayed right now.
    pub async fn find_visible(&self, target: &Target) -> E2eResult<Option<Element>> {
        match self.client.find(target.locator()).await {
            Ok(element) => {
                if element.is_displayed().await? {
                    Ok(Some(element))
                } else {
                    Ok(None)
                }
            }
            Err(ref e) if e.is_no_such_element() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn is_visible(&self, target: &Target) -> E2eResult<bool> {
        Ok(self.find_visible(target).await?.is_some())
    }

    pub async fn is_enabled(&self, target: &Target) -> E2eResult<bool> {
        match self.client.find(target.locator()).await {
            Ok(element) => Ok(element.is_enabled().await?),
            Err(ref e) if e.is_no_such_element() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Wait for visibility, then click.
    pub async fn click_visible(&self, target: &Target, timeout: Duration) -> E2eResult<()> {
        let element = self.wait_visible(target, timeout).await?;
        element.click().await?;
        Ok(())
    }

    /// Fill a field and read the value back to guard against silent fill
    /// failures. Empty input is a precondition failure, not retried.
    pub async fn fill_checked(&self, target: &Target, value: &str) -> E2eResult<()> {
        if value.is_empty() {
            return Err(E2eError::EmptyFill {
                locator: target.name.to_string(),
            });
        }
        debug!(field = %target.name, "filling form field");

        let element = self
            .wait_visible(target, self.config.timeouts.medium)
            .await?;
        element.clear().await?;
        element.send_keys(value).await?;

        let actual = element.prop("value").await?.unwrap_or_default();
        if actual != value {
            return Err(E2eError::FillReadback {
                locator: target.name.to_string(),
                expected: value.to_string(),
                actual,
            });
        }
        Ok(())
    }

    /// Read a field's current value without mutating it.
    pub async fn field_value(&self, target: &Target) -> E2eResult<String> {
        let element = self
            .wait_visible(target, self.config.timeouts.medium)
            .await?;
        Ok(element.prop("value").await?.unwrap_or_default())
    }

    pub async fn text_of(&self, target: &Target, timeout: Duration) -> E2eResult<String> {
        let element = self.wait_visible(target, timeout).await?;
        Ok(element.text().await?)
    }

    /// Best-effort full-viewport screenshot to a timestamped path. Failures
    /// are logged and must not fail the calling test.
    pub async fn capture(&self, name: &str) -> Option<PathBuf> {
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        let path = self.config.screenshot_dir.join(format!("{name}-{stamp}.png"));

        let result: E2eResult<()> = async {
            std::fs::create_dir_all(&self.config.screenshot_dir)?;
            let png = self.client.screenshot().await?;
            std::fs::write(&path, png)?;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                debug!(path = %path.display(), "captured screenshot");
                Some(path)
            }
            Err(e) => {
                warn!("screenshot '{name}' failed: {e}");
                None
            }
        }
    }

    /// Issue an outbound GET carrying the browser session's cookies, bounded
    /// by the medium timeout. Failures propagate to the caller after being
    /// logged for diagnostics.
    pub async fn api_get(&self, url: &Url) -> E2eResult<reqwest::Response> {
        let cookies = self.client.get_all_cookies().await?;
        let header = cookies
            .iter()
            .map(|c| format!("{}={}", c.name(), c.value()))
            .collect::<Vec<_>>()
            .join("; ");

        let mut request = self.http.get(url.as_str());
        if !header.is_empty() {
            request = request.header(reqwest::header::COOKIE, header);
        }
        request.send().await.map_err(|e| {
            error!(url = %url, "API request failed: {e}");
            e.into()
        })
    }

    /// Snapshot the session's cookies for persistence.
    pub async fn export_cookies(&self) -> E2eResult<Vec<StoredCookie>> {
        let cookies = self.client.get_all_cookies().await?;
        Ok(cookies.iter().map(StoredCookie::from).collect())
    }

    /// Install previously persisted cookies into this session. The browser
    /// must already be on the target origin for the cookies to be accepted.
    pub async fn import_cookies(&self, cookies: &[StoredCookie]) -> E2eResult<()> {
        for stored in cookies {
            self.client.add_cookie(stored.to_cookie()).await?;
        }
        Ok(())
    }

    pub async fn delete_cookies(&self) -> E2eResult<()> {
        self.client.delete_all_cookies().await?;
        Ok(())
    }

    pub async fn refresh(&self) -> E2eResult<()> {
        self.client.refresh().await?;
        self.wait_settled().await
    }

    /// Close the underlying browser session.
    pub async fn close(self) -> E2eResult<()> {
        self.client.close().await?;
        Ok(())
    }
}

/// Serializable form of a browser cookie, for the persisted session artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
}

impl From<&Cookie<'static>> for StoredCookie {
    fn from(cookie: &Cookie<'static>) -> Self {
        Self {
            name: cookie.name().to_string(),
            value: cookie.value().to_string(),
            domain: cookie.domain().map(str::to_string),
            path: cookie.path().map(str::to_string),
            secure: cookie.secure().unwrap_or(false),
            http_only: cookie.http_only().unwrap_or(false),
        }
    }
}

impl StoredCookie {
    fn to_cookie(&self) -> Cookie<'static> {
        let mut cookie = Cookie::new(self.name.clone(), self.value.clone());
        if let Some(domain) = &self.domain {
            cookie.set_domain(domain.clone());
        }
        if let Some(path) = &self.path {
            cookie.set_path(path.clone());
        }
        cookie.set_secure(self.secure);
        cookie.set_http_only(self.http_only);
        cookie
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_scales_with_attempt_number() {
        assert_eq!(backoff_delay(1), Duration::from_secs(1));
        assert_eq!(backoff_delay(2), Duration::from_secs(2));
        assert_eq!(backoff_delay(3), Duration::from_secs(3));
    }

    #[test]
    fn soft_reports_without_propagating() {
        assert!(soft("always passes", Ok(())));
        assert!(!soft(
            "always fails",
            Err(E2eError::AssertionFailed("nope".into()))
        ));
        // Idempotent: same input, same answer.
        assert!(!soft(
            "always fails",
            Err(E2eError::AssertionFailed("nope".into()))
        ));
    }

    #[test]
    fn stored_cookie_round_trips_through_json() {
        let original = StoredCookie {
            name: "sid".into(),
            value: "abc123".into(),
            domain: Some("mail.test.local".into()),
            path: Some("/".into()),
            secure: true,
            http_only: true,
        };
        let json = serde_json::to_string(&original).unwrap();
        let restored: StoredCookie = serde_json::from_str(&json).unwrap();
        assert_eq!(original, restored);
    }

    #[test]
    fn stored_cookie_converts_to_wire_cookie() {
        let stored = StoredCookie {
            name: "sid".into(),
            value: "abc123".into(),
            domain: Some("mail.test.local".into()),
            path: Some("/".into()),
            secure: true,
            http_only: false,
        };
        let cookie = stored.to_cookie();
        assert_eq!(cookie.name(), "sid");
        assert_eq!(cookie.value(), "abc123");
        assert_eq!(cookie.domain(), Some("mail.test.local"));
        assert_eq!(cookie.secure(), Some(true));
    }

    #[test]
    fn dynamic_target_carries_runtime_query() {
        let target = Target::dynamic_xpath(
            "admin menu button",
            "//button[normalize-space()='MS']".to_string(),
        );
        match target.query {
            Query::XPath(expr) => assert!(expr.contains("'MS'")),
            other => panic!("expected xpath query, got {other:?}"),
        }
    }
}
