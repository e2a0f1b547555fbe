//! The room event stream.
//!
//! One long-lived SSE connection per selected room. The reader task owns the
//! transport: it connects, parses the line protocol, decodes named events
//! into [`RoomEvent`]s, and reconnects on transport failure after a fixed
//! delay. The session controller never sees transport errors and carries no
//! retry policy of its own; it only closes the handle, which is idempotent.

use std::time::Duration;

use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

use crate::ClientEvent;

/// Fixed delay between reconnect attempts, matching the SSE default.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

// ---------------------------------------------------------------------------
// Event decoding
// ---------------------------------------------------------------------------

/// Room-scoped events pushed by the server. Unknown event names decode to
/// [`RoomEvent::Unknown`], which every handler treats as a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    CorrectSolutionSubmitted,
    /// `log` is the extracted diagnostic text; `None` means the payload was
    /// malformed and the UI must fall back to a generic message.
    WrongSolutionSubmitted { log: Option<String> },
    PlayerJoined,
    PlayerLeft,
    RoomDeleted,
    Unknown,
}

/// Payload shape of a wrong-submission event. The backend marshals its Go
/// event struct directly, hence the capitalized field.
#[derive(Debug, Deserialize)]
struct SsePayload {
    #[serde(rename = "Data", default)]
    data: Option<String>,
}

impl RoomEvent {
    /// Decode a named SSE message into a room event.
    pub fn decode(name: &str, data: &str) -> RoomEvent {
        match name {
            "CORRECT_SOLUTION_SUBMITTED" => RoomEvent::CorrectSolutionSubmitted,
            "WRONG_SOLUTION_SUBMITTED" => {
                let log = match serde_json::from_str::<SsePayload>(data) {
                    Ok(payload) => Some(
                        payload
                            .data
                            .unwrap_or_else(|| "An unknown error occurred.".to_string()),
                    ),
                    Err(e) => {
                        warn!(error = %e, "malformed wrong-submission payload");
                        None
                    }
                };
                RoomEvent::WrongSolutionSubmitted { log }
            }
            "PLAYER_JOINED" => RoomEvent::PlayerJoined,
            "PLAYER_LEFT" => RoomEvent::PlayerLeft,
            "ROOM_DELETED" => RoomEvent::RoomDeleted,
            _ => RoomEvent::Unknown,
        }
    }
}

// ---------------------------------------------------------------------------
// SSE line protocol
// ---------------------------------------------------------------------------

/// One complete server-sent message: an event name plus its data payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseMessage {
    pub event: String,
    pub data: String,
}

/// Incremental parser for the SSE line protocol. Chunks may split lines and
/// messages at arbitrary byte boundaries; completed messages are returned as
/// they materialize.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
    event_name: String,
    data: String,
}

impl SseParser {
    /// Feed a chunk of stream text, returning any messages it completed.
    pub fn push(&mut self, chunk: &str) -> Vec<SseMessage> {
        self.buffer.push_str(chunk);
        let mut messages = Vec::new();

        while let Some(line_end) = self.buffer.find('\n') {
            let line = self.buffer[..line_end].trim_end_matches('\r').to_string();
            self.buffer.drain(..=line_end);

            if line.is_empty() {
                // Blank line terminates a message.
                if !self.event_name.is_empty() || !self.data.is_empty() {
                    messages.push(SseMessage {
                        event: std::mem::take(&mut self.event_name),
                        data: std::mem::take(&mut self.data),
                    });
                }
            } else if let Some(rest) = line.strip_prefix("event:") {
                self.event_name = rest.trim_start().to_string();
            } else if let Some(rest) = line.strip_prefix("data:") {
                if !self.data.is_empty() {
                    self.data.push('\n');
                }
                self.data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
            }
            // Comment (":keep-alive") and id:/retry: lines are ignored.
        }

        messages
    }
}

// ---------------------------------------------------------------------------
// Stream handle
// ---------------------------------------------------------------------------

/// Handle to the live event-stream reader for one room.
///
/// Dropping or closing the handle tears the reader down; both are idempotent
/// and safe to repeat.
#[derive(Debug)]
pub struct EventStreamHandle {
    room_id: i64,
    task: tokio::task::JoinHandle<()>,
}

impl EventStreamHandle {
    /// Spawn the reader task for `url`, delivering decoded events to `tx`.
    ///
    /// A dedicated HTTP client is built without a request timeout — the
    /// stream is meant to stay open indefinitely.
    pub fn spawn(
        room_id: i64,
        url: String,
        connect_timeout: Duration,
        tx: mpsc::UnboundedSender<ClientEvent>,
    ) -> EventStreamHandle {
        let task = tokio::spawn(run_stream(url, connect_timeout, tx));
        EventStreamHandle { room_id, task }
    }

    /// Wrap an already-spawned reader task.
    pub fn from_task(room_id: i64, task: tokio::task::JoinHandle<()>) -> EventStreamHandle {
        EventStreamHandle { room_id, task }
    }

    pub fn room_id(&self) -> i64 {
        self.room_id
    }

    /// Stop the reader. Idempotent.
    pub fn close(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for EventStreamHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ---------------------------------------------------------------------------
// Reader task
// ---------------------------------------------------------------------------

async fn run_stream(
    url: String,
    connect_timeout: Duration,
    tx: mpsc::UnboundedSender<ClientEvent>,
) {
    let client = match reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "failed to build event stream client");
            return;
        }
    };

    loop {
        match read_once(&client, &url, &tx).await {
            Ok(()) => info!(url = %url, "event stream ended"),
            Err(e) => warn!(url = %url, error = %e, "event stream transport error"),
        }

        if tx.is_closed() {
            return;
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
        debug!(url = %url, "reconnecting event stream");
    }
}

async fn read_once(
    client: &reqwest::Client,
    url: &str,
    tx: &mpsc::UnboundedSender<ClientEvent>,
) -> Result<(), reqwest::Error> {
    let resp = client
        .get(url)
        .header("Accept", "text/event-stream")
        .send()
        .await?
        .error_for_status()?;

    info!(url = %url, "event stream connected");

    let mut stream = resp.bytes_stream();
    let mut parser = SseParser::default();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let chunk_str = String::from_utf8_lossy(&chunk);
        for message in parser.push(&chunk_str) {
            let event = RoomEvent::decode(&message.event, &message.data);
            if event == RoomEvent::Unknown {
                debug!(name = %message.event, "ignoring unknown event");
                continue;
            }
            if tx.send(ClientEvent::Stream(event)).is_err() {
                // Receiver gone — the session is shutting down.
                return Ok(());
            }
        }
    }

    Ok(())
}
