//! HTTP API client for the session backend's REST surface.
//!
//! The live session itself runs over the WebSocket transport; this module
//! covers the handful of plain-HTTP endpoints around it: saving a session
//! transcript, creating and listing narrative story sessions, announcing the
//! mode before players connect, and locating the PDF export.
//!
//! # Feature gate
//!
//! Only available when the `api-http` feature is enabled (it is enabled by
//! default).

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::endpoint;
use crate::protocol::GameMode;

/// Errors from the HTTP API surface.
///
/// Kept separate from [`SeanceError`](crate::error::SeanceError) so the core
/// client never carries `reqwest` types when the feature is disabled.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be performed (connect, timeout, decode).
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The server answered with a non-success status.
    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Acknowledgement for a saved session transcript.
#[derive(Debug, Clone, Deserialize)]
pub struct SavedSession {
    pub status: String,
    /// The name the transcript was stored under.
    pub session: String,
    /// Server-side monotonic timestamp of the save.
    #[serde(default)]
    pub timestamp: Option<f64>,
}

/// One stored story session, keyed by room code in [`StoryList`].
///
/// The backing store mixes shapes from different saves, so every field is
/// optional on the way in.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorySummary {
    #[serde(default)]
    pub room_code: Option<String>,
    #[serde(default)]
    pub world: Option<String>,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub advanced: Option<String>,
    #[serde(default)]
    pub created_at: Option<f64>,
}

/// Response of the story listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct StoryList {
    pub total: u64,
    #[serde(default)]
    pub sessions: HashMap<String, StorySummary>,
}

/// Response of story creation: the shareable room code plus the stored record.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedStory {
    /// Six characters, uppercase letters and digits.
    pub room_code: String,
    pub session: StorySummary,
}

/// Acknowledgement of a mode announcement.
#[derive(Debug, Clone, Deserialize)]
pub struct ModeAck {
    pub mode: String,
    pub difficulty: String,
    #[serde(default)]
    pub ai_slots: u32,
}

/// Parameters for creating a story session.
///
/// The defaults mirror the server's own query defaults, so
/// `StoryParams::default()` creates the stock mystery.
#[derive(Debug, Clone)]
pub struct StoryParams {
    pub world: String,
    pub character: String,
    pub genre: String,
    /// Free-form advanced settings blob, empty when unused.
    pub advanced: String,
}

impl Default for StoryParams {
    fn default() -> Self {
        Self {
            world: "default".to_owned(),
            character: "Player".to_owned(),
            genre: "mystery".to_owned(),
            advanced: String::new(),
        }
    }
}

/// Client for the backend's HTTP endpoints.
///
/// # Example
///
/// ```rust,no_run
/// # async fn example() -> Result<(), seance_client::api::ApiError> {
/// use seance_client::api::{ApiClient, StoryParams};
///
/// let api = ApiClient::new("http://localhost:3000");
/// let created = api.create_story_session(&StoryParams::default()).await?;
/// println!("share this code: {}", created.room_code);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client from any origin the caller already has; the origin is
    /// rewritten onto the backend port via [`endpoint::api_base_url`].
    pub fn new(origin: &str) -> Self {
        Self::from_base_url(endpoint::api_base_url(origin))
    }

    /// Build a client from an exact base URL, no port rewriting. Useful when
    /// the backend sits behind a proxy on a non-standard port.
    pub fn from_base_url(base_url: impl Into<String>) -> Self {
        // Conservative timeouts so an absent localhost backend fails fast
        // instead of hanging the caller.
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(2))
            .timeout(Duration::from_secs(10))
            .no_proxy()
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// The base URL requests are issued against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Save the current session transcript under the given name.
    pub async fn save_session(&self, session_name: &str) -> Result<SavedSession, ApiError> {
        let response = self
            .http
            .post(format!("{}/game/save-session", self.base_url))
            .query(&[("session_name", session_name)])
            .send()
            .await?;
        decode(response).await
    }

    /// List stored story sessions, keyed by room code.
    pub async fn list_story_sessions(&self) -> Result<StoryList, ApiError> {
        let response = self
            .http
            .get(format!("{}/story/list", self.base_url))
            .send()
            .await?;
        decode(response).await
    }

    /// Create a new story session and get back its shareable room code.
    pub async fn create_story_session(
        &self,
        params: &StoryParams,
    ) -> Result<CreatedStory, ApiError> {
        let response = self
            .http
            .post(format!("{}/story/new", self.base_url))
            .query(&[
                ("world", params.world.as_str()),
                ("character", params.character.as_str()),
                ("genre", params.genre.as_str()),
                ("advanced", params.advanced.as_str()),
            ])
            .send()
            .await?;
        decode(response).await
    }

    /// Announce the mode and difficulty for the next session. Usually called
    /// once by whoever hosts, before players connect.
    pub async fn announce_mode(
        &self,
        mode: GameMode,
        difficulty: &str,
        ai_slots: u32,
    ) -> Result<ModeAck, ApiError> {
        let slots = ai_slots.to_string();
        let response = self
            .http
            .post(format!("{}/game/mode", self.base_url))
            .query(&[
                ("mode", mode.as_str()),
                ("difficulty", difficulty),
                ("ai_slots", slots.as_str()),
            ])
            .send()
            .await?;
        decode(response).await
    }

    /// URL of the PDF transcript export.
    ///
    /// The export is a browser-oriented download, so the client only locates
    /// it; callers hand the URL to whatever opens documents for them.
    pub fn export_pdf_url(&self) -> String {
        format!("{}/game/export-pdf", self.base_url)
    }
}

/// Check the status, then decode the JSON body.
async fn decode<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::UnexpectedStatus { status, body });
    }
    Ok(response.json().await?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn story_params_default_matches_the_server_defaults() {
        let params = StoryParams::default();
        assert_eq!(params.world, "default");
        assert_eq!(params.character, "Player");
        assert_eq!(params.genre, "mystery");
        assert!(params.advanced.is_empty());
    }

    #[test]
    fn saved_session_decodes_from_a_server_reply() {
        let saved: SavedSession = serde_json::from_str(
            r#"{"status": "saved", "session": "Friday night", "timestamp": 1021.75}"#,
        )
        .unwrap();
        assert_eq!(saved.status, "saved");
        assert_eq!(saved.session, "Friday night");
        assert_eq!(saved.timestamp, Some(1021.75));
    }

    #[test]
    fn story_list_decodes_mixed_records() {
        let list: StoryList = serde_json::from_str(
            r#"{
                "total": 2,
                "sessions": {
                    "QK4N7P": {"room_code": "QK4N7P", "world": "manor", "character": "Ann", "genre": "mystery", "advanced": "", "created_at": 99.5},
                    "OLDSAV": {"name": "autosave", "mode": "game"}
                }
            }"#,
        )
        .unwrap();
        assert_eq!(list.total, 2);
        let story = &list.sessions["QK4N7P"];
        assert_eq!(story.world.as_deref(), Some("manor"));
        // Records from other save shapes still decode, just emptier.
        assert!(list.sessions["OLDSAV"].world.is_none());
    }

    #[test]
    fn created_story_decodes_room_code() {
        let created: CreatedStory = serde_json::from_str(
            r#"{"room_code": "A1B2C3", "session": {"room_code": "A1B2C3", "world": "manor", "character": "Ann", "genre": "mystery", "advanced": "", "created_at": 1.0}}"#,
        )
        .unwrap();
        assert_eq!(created.room_code, "A1B2C3");
        assert_eq!(created.session.genre.as_deref(), Some("mystery"));
    }

    #[test]
    fn export_pdf_url_targets_the_backend() {
        let api = ApiClient::new("http://localhost:3000");
        assert_eq!(
            api.export_pdf_url(),
            "http://localhost:8001/game/export-pdf"
        );
    }

    #[test]
    fn from_base_url_is_verbatim() {
        let api = ApiClient::from_base_url("http://127.0.0.1:9999");
        assert_eq!(api.base_url(), "http://127.0.0.1:9999");
        assert_eq!(api.export_pdf_url(), "http://127.0.0.1:9999/game/export-pdf");
    }
}
