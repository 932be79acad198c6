//! Local identity and the HTTP collaborator that supplies it.
//!
//! Two pieces of identity matter to the client: the participant id that
//! tags our cursor (and is excluded from rendering), and the username that
//! chat messages are sent under. Both come from the web API the page is
//! served by:
//!
//! - `GET /get-ip` → `{ "ip": "..." }`
//! - `GET /session-status` → `{ "loggedIn": bool, "username": "..." }`
//! - `POST /login`, `POST /register` with `{ username, password }`
//! - `POST /logout`
//!
//! Login state lives in a session cookie, so [`HttpCollaborator`] keeps a
//! cookie store across calls.

use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tandem_protocol::{ParticipantId, Username};

/// Who this client is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalIdentity {
    /// Tags outbound cursor updates; never rendered locally.
    pub participant: ParticipantId,
    /// Required to send chat. `None` until logged in.
    pub username: Option<Username>,
}

impl LocalIdentity {
    pub fn new(participant: impl Into<String>) -> Self {
        Self {
            participant: ParticipantId::new(participant),
            username: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(Username::new(username));
        self
    }
}

/// Errors from the HTTP collaborator.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The request never got a usable response.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("{message} (status {status})")]
    Rejected { status: u16, message: String },
}

/// Login state as reported by `GET /session-status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    #[serde(default)]
    logged_in: Option<bool>,
    #[serde(default)]
    pub username: Option<Username>,
}

impl SessionStatus {
    /// Servers that omit `loggedIn` are read from `username` instead.
    pub fn logged_in(&self) -> bool {
        self.logged_in.unwrap_or(self.username.is_some())
    }

    /// The username, only when logged in.
    pub fn into_username(self) -> Option<Username> {
        if self.logged_in() { self.username } else { None }
    }
}

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct IpResponse {
    ip: String,
}

#[derive(Deserialize)]
struct MessageBody {
    message: String,
}

/// Client for the black-box web API.
#[derive(Debug, Clone)]
pub struct HttpCollaborator {
    base: String,
    client: Client,
}

impl HttpCollaborator {
    /// Creates a collaborator rooted at `base_url` (e.g.
    /// `http://127.0.0.1:8080`).
    pub fn new(base_url: impl Into<String>) -> Result<Self, AuthError> {
        let client = Client::builder().cookie_store(true).build()?;
        Ok(Self::with_client(base_url, client))
    }

    /// Uses an existing `reqwest` client. It should have a cookie store,
    /// otherwise login does not stick.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base = base_url.into().trim_end_matches('/').to_string();
        Self { base, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<(), AuthError> {
        self.post_credentials("/login", username, password).await
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<(), AuthError> {
        self.post_credentials("/register", username, password).await
    }

    pub async fn logout(&self) -> Result<(), AuthError> {
        let resp = self.client.post(self.url("/logout")).send().await?;
        check(resp).await?;
        tracing::info!("logged out");
        Ok(())
    }

    /// Current login state. A 401 means "not logged in", not an error.
    pub async fn session_status(&self) -> Result<SessionStatus, AuthError> {
        let resp = self.client.get(self.url("/session-status")).send().await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            return Ok(SessionStatus::default());
        }
        let resp = check(resp).await?;
        Ok(resp.json().await?)
    }

    /// This client's network identity, as the server sees it.
    pub async fn network_identity(&self) -> Result<ParticipantId, AuthError> {
        let resp = self.client.get(self.url("/get-ip")).send().await?;
        let body: IpResponse = check(resp).await?.json().await?;
        Ok(ParticipantId::new(body.ip))
    }

    /// Network identity plus the logged-in username, if any.
    pub async fn resolve(&self) -> Result<LocalIdentity, AuthError> {
        let participant = self.network_identity().await?;
        let username = self.session_status().await?.into_username();
        tracing::debug!(%participant, logged_in = username.is_some(), "identity resolved");
        Ok(LocalIdentity {
            participant,
            username,
        })
    }

    async fn post_credentials(
        &self,
        path: &str,
        username: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        let resp = self
            .client
            .post(self.url(path))
            .json(&Credentials { username, password })
            .send()
            .await?;
        check(resp).await?;
        tracing::info!(%username, path, "credentials accepted");
        Ok(())
    }
}

/// Passes 2xx responses through; turns anything else into
/// [`AuthError::Rejected`] carrying the server's message.
async fn check(resp: Response) -> Result<Response, AuthError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(AuthError::Rejected {
        status: status.as_u16(),
        message: rejection_message(status, &body),
    })
}

fn rejection_message(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<MessageBody>(body) {
        return parsed.message;
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("request rejected")
        .to_string()
}
