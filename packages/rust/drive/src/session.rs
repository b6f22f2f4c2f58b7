//! OAuth session for the Drive API.
//!
//! The session owns the cached credential (an "authorized user" token file)
//! and hands out a valid access token, refreshing it when it has expired.
//! It is created once per run and passed to the Drive client explicitly.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use drivedocs_shared::{DriveDocsError, Result};

/// OAuth scope requested for the token file.
pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

/// Refresh this long before the recorded expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".into()
}

/// The on-disk token file.
///
/// Unknown fields (`scopes`, `account`, ...) are preserved when the file is rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    #[serde(rename = "token", alias = "access_token", default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default, alias = "token_expiry")]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StoredToken {
    fn can_refresh(&self) -> bool {
        self.refresh_token.is_some() && self.client_id.is_some() && self.client_secret.is_some()
    }

    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match (&self.access_token, self.expiry) {
            (Some(token), Some(expiry)) if !token.is_empty() => {
                expiry - Duration::seconds(EXPIRY_MARGIN_SECS) > now
            }
            // No recorded expiry: used until Drive rejects it, see `DriveSession::invalidate`.
            (Some(token), None) => !token.is_empty(),
            _ => false,
        }
    }
}

/// Token endpoint reply.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Credential state for one run.
pub struct DriveSession {
    client: Client,
    token_path: Option<PathBuf>,
    token: Mutex<StoredToken>,
}

impl DriveSession {
    /// Load a session from a token file.
    pub fn load(path: &Path, client: Client) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DriveDocsError::Authentication(format!(
                "cannot read token file {}: {e}. Create it with an OAuth consent flow for scope {DRIVE_READONLY_SCOPE}",
                path.display()
            ))
        })?;

        let token: StoredToken = serde_json::from_str(&content).map_err(|e| {
            DriveDocsError::Authentication(format!(
                "invalid token file {}: {e}",
                path.display()
            ))
        })?;

        debug!(path = %path.display(), has_refresh = token.refresh_token.is_some(), "loaded token file");

        Ok(Self {
            client,
            token_path: Some(path.to_path_buf()),
            token: Mutex::new(token),
        })
    }

    /// Build a session around a bare access token (no refresh, nothing persisted).
    pub fn from_access_token(access_token: impl Into<String>, client: Client) -> Self {
        Self {
            client,
            token_path: None,
            token: Mutex::new(StoredToken {
                access_token: Some(access_token.into()),
                refresh_token: None,
                client_id: None,
                client_secret: None,
                token_uri: default_token_uri(),
                expiry: None,
                extra: serde_json::Map::new(),
            }),
        }
    }

    /// Return a usable access token, refreshing and persisting it if needed.
    #[instrument(skip_all)]
    pub async fn access_token(&self) -> Result<String> {
        let mut token = self.token.lock().await;

        if token.is_fresh(Utc::now()) {
            if let Some(access) = &token.access_token {
                return Ok(access.clone());
            }
        }

        let refreshed = self.refresh(&token).await?;
        token.access_token = Some(refreshed.access_token.clone());
        token.expiry = refreshed
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));

        info!(expiry = ?token.expiry, "access token refreshed");

        if let Some(path) = &self.token_path {
            save_token(path, &token)?;
        }

        Ok(refreshed.access_token)
    }

    /// Drop the cached access token after the API rejected it.
    ///
    /// Returns `false` (and keeps the token) when the session has no refresh
    /// credentials, in which case retrying cannot help.
    pub async fn invalidate(&self) -> bool {
        let mut token = self.token.lock().await;
        if !token.can_refresh() {
            return false;
        }
        token.access_token = None;
        debug!("access token invalidated");
        true
    }

    async fn refresh(&self, token: &StoredToken) -> Result<RefreshResponse> {
        let (Some(refresh_token), Some(client_id), Some(client_secret)) = (
            token.refresh_token.as_deref(),
            token.client_id.as_deref(),
            token.client_secret.as_deref(),
        ) else {
            return Err(DriveDocsError::Authentication(
                "access token expired and no refresh credentials are available".into(),
            ));
        };

        let response = self
            .client
            .post(&token.token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await
            .map_err(|e| DriveDocsError::Authentication(format!("token refresh failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DriveDocsError::Authentication(format!(
                "token refresh rejected: HTTP {status}"
            )));
        }

        response.json::<RefreshResponse>().await.map_err(|e| {
            DriveDocsError::Authentication(format!("invalid token refresh response: {e}"))
        })
    }
}

/// Write the token file back (temp file, then rename).
fn save_token(path: &Path, token: &StoredToken) -> Result<()> {
    let content = serde_json::to_string_pretty(token)
        .map_err(|e| DriveDocsError::Authentication(format!("cannot serialize token: {e}")))?;

    let temp = path.with_extension("json.tmp");
    std::fs::write(&temp, content).map_err(|e| DriveDocsError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| DriveDocsError::io(path, e))?;

    debug!(path = %path.display(), "token file updated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_token_file(content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("dd-session-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join("token.json");
        std::fs::write(&path, content).expect("write token");
        path
    }

    #[test]
    fn fresh_token_checks() {
        let now = Utc::now();
        let mut token: StoredToken =
            serde_json::from_str(r#"{"token": "abc"}"#).expect("parse");
        assert!(token.is_fresh(now));

        token.expiry = Some(now + Duration::seconds(30));
        assert!(!token.is_fresh(now), "inside the refresh margin");

        token.expiry = Some(now + Duration::hours(1));
        assert!(token.is_fresh(now));

        token.access_token = None;
        assert!(!token.is_fresh(now));
    }

    #[tokio::test]
    async fn valid_token_is_returned_without_refresh() {
        let session = DriveSession::from_access_token("live-token", Client::new());
        assert_eq!(session.access_token().await.unwrap(), "live-token");
    }

    #[tokio::test]
    async fn missing_token_file_is_authentication_error() {
        let path = std::env::temp_dir().join("dd-definitely-missing-token.json");
        let result = DriveSession::load(&path, Client::new());
        assert!(matches!(result, Err(DriveDocsError::Authentication(_))));
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_saved() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/token"))
            .and(wiremock::matchers::body_string_contains("grant_type=refresh_token"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(
                serde_json::json!({
                    "access_token": "new-token",
                    "expires_in": 3599,
                    "token_type": "Bearer"
                }),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let content = serde_json::json!({
            "token": "old-token",
            "refresh_token": "refresh-me",
            "client_id": "client",
            "client_secret": "secret",
            "token_uri": format!("{}/token", server.uri()),
            "expiry": "2020-01-01T00:00:00Z",
            "scopes": [DRIVE_READONLY_SCOPE]
        });
        let path = temp_token_file(&content.to_string());

        let session = DriveSession::load(&path, Client::new()).expect("load");
        assert_eq!(session.access_token().await.unwrap(), "new-token");
        // Second call uses the cached token; the mock expects exactly one refresh.
        assert_eq!(session.access_token().await.unwrap(), "new-token");

        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["token"], "new-token");
        assert_eq!(saved["scopes"][0], DRIVE_READONLY_SCOPE);
    }

    #[test]
    fn token_expiry_key_is_accepted() {
        let token: StoredToken = serde_json::from_str(
            r#"{"access_token": "abc", "token_expiry": "2020-01-01T00:00:00Z"}"#,
        )
        .expect("parse");
        assert_eq!(token.access_token.as_deref(), Some("abc"));
        assert!(token.expiry.is_some());
        assert!(!token.is_fresh(Utc::now()));
    }

    #[tokio::test]
    async fn invalidate_forces_refresh() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/token"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"access_token": "fresh"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let content = serde_json::json!({
            "access_token": "stale",
            "refresh_token": "r",
            "client_id": "client",
            "client_secret": "secret",
            "token_uri": format!("{}/token", server.uri())
        });
        let path = temp_token_file(&content.to_string());
        let session = DriveSession::load(&path, Client::new()).expect("load");

        assert_eq!(session.access_token().await.unwrap(), "stale");
        assert!(session.invalidate().await);
        assert_eq!(session.access_token().await.unwrap(), "fresh");
    }

    #[tokio::test]
    async fn invalidate_keeps_bare_token() {
        let session = DriveSession::from_access_token("bare", Client::new());
        assert!(!session.invalidate().await);
        assert_eq!(session.access_token().await.unwrap(), "bare");
    }

    #[tokio::test]
    async fn expired_token_without_refresh_credentials_fails() {
        let path = temp_token_file(r#"{"token": "old", "expiry": "2020-01-01T00:00:00Z"}"#);
        let session = DriveSession::load(&path, Client::new()).expect("load");
        let err = session.access_token().await.unwrap_err();
        assert!(err.to_string().contains("no refresh credentials"));
    }
}
