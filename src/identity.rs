//! Identity endpoint client and claim checks.
//!
//! After a successful login the suite calls the identity API once and treats
//! the response as a required postcondition: a non-success status or a
//! malformed body is a hard failure.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::session::Session;

/// Profile claims returned by the identity endpoint. Deserialization fails
/// if any field is absent or has the wrong type, which is exactly the shape
/// check the suite needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub sub: String,
    pub email: String,
    pub phone_number: String,
    pub tid: String,
    pub role: Vec<String>,
    pub docsa: bool,
    pub fullname: String,
}

impl UserInfo {
    pub fn has_role(&self, role: &str) -> bool {
        self.role.iter().any(|r| r == role)
    }

    /// Assert that the claims match the identity used to log in.
    pub fn check_claims(&self, expected_email: &str, expected_role: &str) -> E2eResult<()> {
        if self.email != expected_email {
            return Err(E2eError::IdentityClaim(format!(
                "email is {:?}, expected {:?}",
                self.email, expected_email
            )));
        }
        if !self.has_role(expected_role) {
            return Err(E2eError::IdentityClaim(format!(
                "role set {:?} does not contain {:?}",
                self.role, expected_role
            )));
        }
        Ok(())
    }
}

/// Fetch the authenticated user's profile through the browser session's
/// cookies.
pub async fn fetch(session: &Session) -> E2eResult<UserInfo> {
    let url = session.config().identity_url.clone();
    let response = session.api_get(&url).await?;

    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(E2eError::IdentityStatus {
            status: status.as_u16(),
            body,
        });
    }

    let info: UserInfo =
        serde_json::from_str(&body).map_err(|e| E2eError::IdentityShape(e.to_string()))?;
    debug!(sub = %info.sub, tid = %info.tid, "identity endpoint responded");
    Ok(info)
}
