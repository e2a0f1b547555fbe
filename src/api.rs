//! Wire types and the REST client for the Code Battle backend.
//!
//! Every non-stream endpoint wraps its payload in the same envelope:
//! `{"error": bool, "data": ..., "message": "..."}`. Server messages are
//! surfaced on failure; a generic fallback covers responses without one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;

/// The default question every submission targets until the backend grows
/// per-room question selection.
pub const DEFAULT_QUESTION_ID: i64 = 1;

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

/// The backend's uniform JSON response wrapper.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub error: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: String,
}

// ---------------------------------------------------------------------------
// Domain records
// ---------------------------------------------------------------------------

/// A registered player. Only `id` and `name` ever cross the wire back to us;
/// the password is write-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: i64,
    pub name: String,
}

/// A room, as projected by the server. The client never mutates rooms other
/// than through `create_room`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// One ranked leaderboard row. Ordering is the server's; the client never
/// re-sorts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub place: i64,
    pub player_name: String,
    pub score: i64,
}

#[derive(Debug, Deserialize)]
struct LeaderboardData {
    #[serde(default)]
    entries: Vec<LeaderboardEntry>,
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct CredentialsRequest<'a> {
    pub name: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CreateRoomRequest<'a> {
    pub name: &'a str,
    pub description: &'a str,
}

/// One code submission. Built fresh per submit action and not retained after
/// the request is sent.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionRequest {
    pub question_id: i64,
    pub room_id: i64,
    pub language: String,
    pub code: String,
    pub player_id: i64,
    pub submitted_at: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Thin typed wrapper over the backend REST surface.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ClientError::Config(format!("http client: {e}")))?;
        Ok(ApiClient {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The URL of the persistent event stream for a room, with the player
    /// identified so the server can credit join/leave events.
    pub fn events_url(&self, room_id: i64, player_id: i64) -> String {
        format!(
            "{}/events?room_id={}&player_id={}",
            self.base_url, room_id, player_id
        )
    }

    // -- players ------------------------------------------------------------

    /// Register a new player. The returned record is what gets persisted.
    pub async fn register(&self, name: &str, password: &str) -> Result<Player, ClientError> {
        let url = format!("{}/players", self.base_url);
        let body = CredentialsRequest { name, password };
        self.post_json(&url, &body).await
    }

    /// Log an existing player in.
    pub async fn login(&self, name: &str, password: &str) -> Result<Player, ClientError> {
        let url = format!("{}/players/login", self.base_url);
        let body = CredentialsRequest { name, password };
        self.post_json(&url, &body).await
    }

    // -- rooms --------------------------------------------------------------

    /// Fetch the room list as a mapping of room id → room.
    pub async fn list_rooms(&self) -> Result<BTreeMap<String, Room>, ClientError> {
        let url = format!("{}/rooms", self.base_url);
        let resp = self.http.get(&url).send().await.map_err(|e| connect(&url, e))?;
        decode_envelope(&url, resp).await
    }

    pub async fn create_room(&self, name: &str, description: &str) -> Result<Room, ClientError> {
        let url = format!("{}/rooms", self.base_url);
        let body = CreateRoomRequest { name, description };
        self.post_json(&url, &body).await
    }

    pub async fn leave_room(&self, room_id: i64, player_id: i64) -> Result<(), ClientError> {
        let url = format!("{}/rooms/{}/players/{}", self.base_url, room_id, player_id);
        let resp = self
            .http
            .delete(&url)
            .send()
            .await
            .map_err(|e| connect(&url, e))?;
        if resp.status().is_success() {
            debug!(room_id, player_id, "left room");
            return Ok(());
        }
        Err(http_error(&url, resp).await)
    }

    // -- leaderboard --------------------------------------------------------

    /// Fetch the full ranked entry list for a room, in server order.
    pub async fn leaderboard(&self, room_id: i64) -> Result<Vec<LeaderboardEntry>, ClientError> {
        let url = format!("{}/rooms/{}/leaderboard", self.base_url, room_id);
        let resp = self.http.get(&url).send().await.map_err(|e| connect(&url, e))?;
        let data: LeaderboardData = decode_envelope(&url, resp).await?;
        Ok(data.entries)
    }

    // -- submissions --------------------------------------------------------

    /// Post one code submission. Acceptance only means the code was queued;
    /// pass/fail arrives later on the event stream.
    pub async fn submit(&self, submission: &SubmissionRequest) -> Result<(), ClientError> {
        let url = format!("{}/submission", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(submission)
            .send()
            .await
            .map_err(|e| connect(&url, e))?;
        if resp.status().is_success() {
            debug!(
                room_id = submission.room_id,
                language = %submission.language,
                "submission accepted"
            );
            return Ok(());
        }
        Err(http_error(&url, resp).await)
    }

    // -- shared plumbing ----------------------------------------------------

    async fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize,
        T: serde::de::DeserializeOwned,
    {
        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| connect(url, e))?;
        decode_envelope(url, resp).await
    }
}

fn connect(url: &str, err: reqwest::Error) -> ClientError {
    ClientError::Connect {
        url: url.to_string(),
        detail: err.to_string(),
    }
}

/// Turn a non-2xx response into an `Http` error, extracting the server's
/// envelope `message` when the body carries one.
async fn http_error(url: &str, resp: reqwest::Response) -> ClientError {
    let status = resp.status().as_u16();
    let message = match resp.bytes().await {
        Ok(bytes) => extract_server_message(&bytes),
        Err(e) => {
            warn!(url, error = %e, "failed to read error response body");
            None
        }
    };
    ClientError::Http {
        status,
        url: url.to_string(),
        message,
    }
}

/// Pull the `message` field out of an envelope-shaped error body. Falls back
/// to the raw body text when it is short and not JSON at all.
pub fn extract_server_message(body: &[u8]) -> Option<String> {
    if let Ok(envelope) = serde_json::from_slice::<Envelope<serde_json::Value>>(body) {
        if !envelope.message.is_empty() {
            return Some(envelope.message);
        }
        return None;
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() || text.len() > 300 {
        None
    } else {
        Some(text.to_string())
    }
}

async fn decode_envelope<T>(url: &str, resp: reqwest::Response) -> Result<T, ClientError>
where
    T: serde::de::DeserializeOwned,
{
    if !resp.status().is_success() {
        return Err(http_error(url, resp).await);
    }
    let bytes = resp.bytes().await.map_err(|e| ClientError::Decode {
        url: url.to_string(),
        detail: e.to_string(),
    })?;
    let envelope: Envelope<T> =
        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode {
            url: url.to_string(),
            detail: e.to_string(),
        })?;
    envelope.data.ok_or_else(|| ClientError::Decode {
        url: url.to_string(),
        detail: "envelope carried no data".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> ApiClient {
        ApiClient::new(&ClientConfig::default()).expect("client")
    }

    // -- URL construction ----------------------------------------------------

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = ClientConfig {
            base_url: "http://localhost:8080/".to_string(),
            ..ClientConfig::default()
        };
        let client = ApiClient::new(&config).expect("client");
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_events_url_carries_room_and_player() {
        let client = test_client();
        assert_eq!(
            client.events_url(3, 17),
            "http://localhost:8080/events?room_id=3&player_id=17"
        );
    }

    // -- envelope decoding ---------------------------------------------------

    #[test]
    fn test_envelope_deserializes_room_map() {
        let json = r#"{"error":false,"data":{"1":{"id":1,"name":"Alpha","description":"first"},"2":{"id":2,"name":"Beta","description":"second"}},"message":"ok"}"#;
        let envelope: Envelope<BTreeMap<String, Room>> =
            serde_json::from_str(json).expect("deser");
        let rooms = envelope.data.expect("data");
        assert_eq!(rooms.len(), 2);
        assert_eq!(rooms["1"].name, "Alpha");
        assert_eq!(rooms["2"].id, 2);
    }

    #[test]
    fn test_envelope_missing_description_defaults_empty() {
        let json = r#"{"data":{"5":{"id":5,"name":"NoDesc"}}}"#;
        let envelope: Envelope<BTreeMap<String, Room>> =
            serde_json::from_str(json).expect("deser");
        assert_eq!(envelope.data.expect("data")["5"].description, "");
    }

    #[test]
    fn test_envelope_error_shape() {
        let json = r#"{"error":true,"data":null,"message":"Player not found"}"#;
        let envelope: Envelope<Player> = serde_json::from_str(json).expect("deser");
        assert!(envelope.error);
        assert!(envelope.data.is_none());
        assert_eq!(envelope.message, "Player not found");
    }

    #[test]
    fn test_leaderboard_data_deserializes_in_order() {
        let json = r#"{"entries":[{"place":1,"player_name":"ada","score":150},{"place":2,"player_name":"bob","score":100}]}"#;
        let data: LeaderboardData = serde_json::from_str(json).expect("deser");
        assert_eq!(data.entries.len(), 2);
        assert_eq!(data.entries[0].player_name, "ada");
        assert_eq!(data.entries[1].place, 2);
    }

    #[test]
    fn test_leaderboard_data_missing_entries_is_empty() {
        let data: LeaderboardData = serde_json::from_str("{}").expect("deser");
        assert!(data.entries.is_empty());
    }

    // -- request serialization ----------------------------------------------

    #[test]
    fn test_credentials_request_serializes() {
        let req = CredentialsRequest {
            name: "ada",
            password: "hunter2",
        };
        let json = serde_json::to_string(&req).expect("serialize");
        assert!(json.contains("\"name\":\"ada\""));
        assert!(json.contains("\"password\":\"hunter2\""));
    }

    #[test]
    fn test_submission_request_serializes_all_fields() {
        let req = SubmissionRequest {
            question_id: 1,
            room_id: 4,
            language: "python".to_string(),
            code: "def solve():\n\treturn True".to_string(),
            player_id: 9,
            submitted_at: "2025-06-01T12:00:00Z".to_string(),
        };
        let json = serde_json::to_string(&req).expect("serialize");
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("parse");
        assert_eq!(parsed["question_id"], 1);
        assert_eq!(parsed["room_id"], 4);
        assert_eq!(parsed["language"], "python");
        assert_eq!(parsed["player_id"], 9);
        assert_eq!(parsed["submitted_at"], "2025-06-01T12:00:00Z");
    }

    #[test]
    fn test_player_roundtrips_without_password() {
        let player = Player {
            id: 7,
            name: "ada".to_string(),
        };
        let json = serde_json::to_string(&player).expect("serialize");
        assert!(!json.contains("password"));
        let back: Player = serde_json::from_str(&json).expect("deser");
        assert_eq!(back, player);
    }

    // -- server message extraction --------------------------------------------

    #[test]
    fn test_extract_server_message_from_envelope() {
        let body = br#"{"error":true,"data":null,"message":"Invalid password"}"#;
        assert_eq!(
            extract_server_message(body).as_deref(),
            Some("Invalid password")
        );
    }

    #[test]
    fn test_extract_server_message_empty_envelope_message() {
        let body = br#"{"error":true,"data":null,"message":""}"#;
        assert!(extract_server_message(body).is_none());
    }

    #[test]
    fn test_extract_server_message_plain_text_body() {
        assert_eq!(
            extract_server_message(b"room not found or not active").as_deref(),
            Some("room not found or not active")
        );
    }

    #[test]
    fn test_extract_server_message_huge_body_dropped() {
        let body = vec![b'x'; 4096];
        assert!(extract_server_message(&body).is_none());
    }
}
