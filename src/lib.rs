pub mod api;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod editor;
pub mod error;
pub mod events;
pub mod session_store;
pub mod submit;
pub mod view;

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};

use api::{ApiClient, Player, SubmissionRequest, DEFAULT_QUESTION_ID};
use editor::Language;
use error::ClientError;
use events::{EventStreamHandle, RoomEvent};
use submit::{SubmissionTracker, SubmitState, POST_SUBMIT_REFRESH_DELAY};
use view::{StatusLevel, UiEvent};

// ---------------------------------------------------------------------------
// Client event dispatch
// ---------------------------------------------------------------------------

/// Everything that can wake the session controller: decoded stream events,
/// timer firings (carrying the submission ticket current when they were
/// scheduled), and editor change notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Stream(RoomEvent),
    WatchdogFired(u64),
    WatchdogGraceElapsed(u64),
    StatusExpired(u64),
    DeferredLeaderboardRefresh(i64),
    EditorChanged,
}

/// Network side effects produced by a state transition. Kept separate from
/// the transition itself so the state machine stays synchronous and directly
/// testable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    RefreshLeaderboard(i64),
    RefreshRooms,
}

// ---------------------------------------------------------------------------
// Input validation
// ---------------------------------------------------------------------------

/// Validate login/registration credentials before any request is issued.
pub fn validate_credentials(name: &str, password: &str) -> Result<(), ClientError> {
    if name.trim().is_empty() {
        return Err(ClientError::Validation("Please enter your name.".to_string()));
    }
    if password.trim().is_empty() {
        return Err(ClientError::Validation(
            "Please enter your password.".to_string(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// RoomSession — the client-state controller
// ---------------------------------------------------------------------------

/// The room/session/event controller.
///
/// Single owner of the client-side session state: the currently selected
/// room, the (at most one) live event stream, and the submission tracker.
/// UI updates are emitted as [`UiEvent`]s; timer and stream callbacks come
/// back in as [`ClientEvent`]s through the channel the controller hands out
/// at construction.
pub struct RoomSession {
    api: ApiClient,
    player: Player,
    current_room_id: Option<i64>,
    stream: Option<EventStreamHandle>,
    tracker: SubmissionTracker,
    connect_timeout: Duration,
    ui_tx: mpsc::UnboundedSender<UiEvent>,
    events_tx: mpsc::UnboundedSender<ClientEvent>,
}

impl RoomSession {
    pub fn new(
        api: ApiClient,
        player: Player,
        watchdog_timeout: Duration,
        connect_timeout: Duration,
        ui_tx: mpsc::UnboundedSender<UiEvent>,
        events_tx: mpsc::UnboundedSender<ClientEvent>,
    ) -> Self {
        RoomSession {
            api,
            player,
            current_room_id: None,
            stream: None,
            tracker: SubmissionTracker::new(watchdog_timeout, events_tx.clone()),
            connect_timeout,
            ui_tx,
            events_tx,
        }
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn current_room_id(&self) -> Option<i64> {
        self.current_room_id
    }

    /// The room whose event stream is currently live, if any.
    pub fn stream_room_id(&self) -> Option<i64> {
        self.stream.as_ref().map(|handle| handle.room_id())
    }

    pub fn submit_state(&self) -> SubmitState {
        self.tracker.state()
    }

    fn ui(&self, event: UiEvent) {
        let _ = self.ui_tx.send(event);
    }

    // -- room selection -----------------------------------------------------

    /// Select a room (or none). The previous event stream is always closed
    /// before the next one opens — at most one stream is live at any time.
    pub async fn select_room(&mut self, room_id: Option<i64>) {
        self.close_stream();
        self.tracker.reset();
        self.current_room_id = room_id;

        match room_id {
            Some(id) => {
                info!(room_id = id, "room selected");
                let handle = EventStreamHandle::spawn(
                    id,
                    self.api.events_url(id, self.player.id),
                    self.connect_timeout,
                    self.events_tx.clone(),
                );
                self.attach_stream(handle);
                self.refresh_leaderboard().await;
            }
            None => {
                // No room: clear the display without a network call.
                self.ui(UiEvent::Leaderboard(Vec::new()));
            }
        }
    }

    /// Install a stream handle, closing any previous one first.
    pub fn attach_stream(&mut self, handle: EventStreamHandle) {
        if let Some(previous) = self.stream.take() {
            previous.close();
        }
        self.stream = Some(handle);
    }

    fn close_stream(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.close();
        }
    }

    /// Leave the currently selected room on the server, then tear down all
    /// room-scoped state.
    pub async fn leave_room(&mut self) -> Result<(), ClientError> {
        let room_id = self.current_room_id.ok_or_else(|| {
            ClientError::Validation("No room selected to leave.".to_string())
        })?;

        self.api.leave_room(room_id, self.player.id).await?;
        self.clear_room_selection();
        self.ui(UiEvent::Info(
            "You have successfully left the room.".to_string(),
        ));
        Ok(())
    }

    fn clear_room_selection(&mut self) {
        self.close_stream();
        self.current_room_id = None;
        self.tracker.reset();
        self.ui(UiEvent::RoomCleared);
        self.ui(UiEvent::Leaderboard(Vec::new()));
    }

    // -- rooms --------------------------------------------------------------

    /// Refetch the room list and re-render the selector. On failure the
    /// selector is left with only its placeholder and a warning is raised.
    pub async fn refresh_rooms(&mut self) {
        match self.api.list_rooms().await {
            Ok(rooms) => {
                let rooms = view::sorted_rooms(rooms.into_values());
                self.ui(UiEvent::RoomOptions(rooms));
            }
            Err(e) => {
                warn!(error = %e, "failed to fetch rooms");
                self.ui(UiEvent::RoomOptions(Vec::new()));
                self.ui(UiEvent::Alert(
                    "Could not fetch rooms. Is the backend server running?".to_string(),
                ));
            }
        }
    }

    /// Create a room. Both fields must be non-empty; nothing is sent
    /// otherwise. On success the new room's name is confirmed and the list
    /// refreshed.
    pub async fn create_room(
        &mut self,
        name: &str,
        description: &str,
    ) -> Result<(), ClientError> {
        if name.trim().is_empty() || description.trim().is_empty() {
            return Err(ClientError::Validation(
                "Room name and description cannot be empty.".to_string(),
            ));
        }

        let room = self.api.create_room(name.trim(), description.trim()).await?;
        self.ui(UiEvent::Info(format!(
            "Room \"{}\" created successfully!",
            room.name
        )));
        self.refresh_rooms().await;
        Ok(())
    }

    // -- leaderboard ---------------------------------------------------------

    /// Refetch and fully replace the displayed leaderboard for the current
    /// room. Any failure clears the display rather than leaving stale rows.
    pub async fn refresh_leaderboard(&mut self) {
        let Some(room_id) = self.current_room_id else {
            self.ui(UiEvent::Leaderboard(Vec::new()));
            return;
        };
        match self.api.leaderboard(room_id).await {
            Ok(entries) => self.ui(UiEvent::Leaderboard(entries)),
            Err(e) => {
                warn!(room_id, error = %e, "failed to fetch leaderboard");
                self.ui(UiEvent::Leaderboard(Vec::new()));
            }
        }
    }

    // -- submissions ----------------------------------------------------------

    /// Submit the player's code for execution.
    ///
    /// Validation failures return before any network traffic. A submission
    /// already in flight makes this a silent no-op. Acceptance arms the
    /// watchdog; the verdict arrives on the event stream.
    pub async fn submit(&mut self, language: Language, code: &str) -> Result<(), ClientError> {
        let room_id = self.current_room_id.ok_or_else(|| {
            ClientError::Validation("Please select a room first.".to_string())
        })?;

        if !self.tracker.is_idle() {
            return Ok(());
        }

        // Hide any previous diagnostic before a new attempt.
        self.ui(UiEvent::ClearErrorPanel);

        let code = code.trim();
        if code.is_empty() {
            return Err(ClientError::Validation(
                "Please write some code before submitting.".to_string(),
            ));
        }

        if !self.tracker.begin() {
            return Ok(());
        }
        self.ui(UiEvent::ExecutionStatus {
            level: StatusLevel::Running,
            message: "Executing code in an isolated sandbox... This may take a few seconds."
                .to_string(),
        });

        let submission = SubmissionRequest {
            question_id: DEFAULT_QUESTION_ID,
            room_id,
            language: language.wire_name().to_string(),
            code: code.to_string(),
            player_id: self.player.id,
            submitted_at: chrono::Utc::now().to_rfc3339(),
        };
        info!(
            player = %self.player.name,
            room_id,
            language = %language,
            "submitting solution"
        );

        match self.api.submit(&submission).await {
            Ok(()) => {
                self.tracker.accepted();
                self.ui(UiEvent::ExecutionStatus {
                    level: StatusLevel::Queued,
                    message: "Code submitted to the execution queue. Waiting for results..."
                        .to_string(),
                });
                // Scores can move as soon as the run lands; nudge a refresh.
                let tx = self.events_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(POST_SUBMIT_REFRESH_DELAY).await;
                    let _ = tx.send(ClientEvent::DeferredLeaderboardRefresh(room_id));
                });
                Ok(())
            }
            Err(e) => {
                self.tracker.failed();
                self.ui(UiEvent::ClearExecutionStatus);
                Err(e)
            }
        }
    }

    // -- event handling --------------------------------------------------------

    /// Apply one decoded stream event to the session state, emitting UI
    /// updates and returning the network effects to run. Synchronous on
    /// purpose: this is the heart of the state machine.
    pub fn apply_room_event(&mut self, event: &RoomEvent) -> Vec<Reaction> {
        match event {
            RoomEvent::CorrectSolutionSubmitted => {
                if self.tracker.resolve_success() {
                    self.ui(UiEvent::ExecutionStatus {
                        level: StatusLevel::Success,
                        message: "Code executed successfully! Solution accepted.".to_string(),
                    });
                }
                self.current_room_id
                    .map(Reaction::RefreshLeaderboard)
                    .into_iter()
                    .collect()
            }
            RoomEvent::WrongSolutionSubmitted { log } => {
                self.tracker.resolve_failure();
                self.ui(UiEvent::ClearExecutionStatus);
                let message = match log {
                    Some(raw) => diagnostics::classify_execution_log(raw),
                    None => "Failed to display error log.".to_string(),
                };
                self.ui(UiEvent::ErrorPanel(message));
                Vec::new()
            }
            RoomEvent::PlayerJoined | RoomEvent::PlayerLeft => self
                .current_room_id
                .map(Reaction::RefreshLeaderboard)
                .into_iter()
                .collect(),
            RoomEvent::RoomDeleted => {
                info!("active room deleted by the server");
                self.ui(UiEvent::Alert(
                    "A room has been deleted. The interface will now refresh.".to_string(),
                ));
                self.clear_room_selection();
                vec![Reaction::RefreshRooms]
            }
            RoomEvent::Unknown => Vec::new(),
        }
    }

    async fn run_reactions(&mut self, reactions: Vec<Reaction>) {
        for reaction in reactions {
            match reaction {
                Reaction::RefreshLeaderboard(room_id) => {
                    // The selection may have changed while reactions queued.
                    if self.current_room_id == Some(room_id) {
                        self.refresh_leaderboard().await;
                    }
                }
                Reaction::RefreshRooms => self.refresh_rooms().await,
            }
        }
    }

    pub async fn handle_room_event(&mut self, event: RoomEvent) {
        let reactions = self.apply_room_event(&event);
        self.run_reactions(reactions).await;
    }

    /// Main dispatch point for everything arriving on the client channel.
    pub async fn handle_client_event(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::Stream(room_event) => self.handle_room_event(room_event).await,
            ClientEvent::WatchdogFired(ticket) => {
                if self.tracker.watchdog_fired(ticket) {
                    self.ui(UiEvent::ExecutionStatus {
                        level: StatusLevel::TimedOut,
                        message:
                            "Execution timeout. The runner may be busy or your code is taking too long."
                                .to_string(),
                    });
                }
            }
            ClientEvent::WatchdogGraceElapsed(ticket) => {
                if self.tracker.grace_elapsed(ticket) {
                    self.ui(UiEvent::ClearExecutionStatus);
                }
            }
            ClientEvent::StatusExpired(ticket) => {
                if self.tracker.is_current(ticket) && self.tracker.is_idle() {
                    self.ui(UiEvent::ClearExecutionStatus);
                }
            }
            ClientEvent::DeferredLeaderboardRefresh(room_id) => {
                if self.current_room_id == Some(room_id) {
                    self.refresh_leaderboard().await;
                }
            }
            ClientEvent::EditorChanged => {
                // Edits invalidate whatever verdict UI is still showing.
                self.ui(UiEvent::ClearErrorPanel);
                self.ui(UiEvent::ClearExecutionStatus);
            }
        }
    }
}
