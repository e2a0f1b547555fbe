//! Terminal view layer.
//!
//! The session controller never prints; it emits [`UiEvent`]s over a channel
//! and this module renders them. The leaderboard and room selector are always
//! rebuilt from scratch — there is no incremental patching, so a re-render of
//! the same data produces exactly the same output.

use colored::*;

use crate::api::{LeaderboardEntry, Room};

/// Placeholder shown as the first room option, mirroring an unselected state.
pub const ROOM_PLACEHOLDER: &str = "--Select a Room--";

/// Severity of an execution-status banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    /// The submission request is on the wire.
    Running,
    /// Queued for execution; waiting for a verdict.
    Queued,
    /// Solution accepted.
    Success,
    /// The watchdog gave up waiting.
    TimedOut,
}

/// Everything the controller can ask the view to do.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// Replace the room selector contents.
    RoomOptions(Vec<Room>),
    /// Replace the displayed leaderboard wholesale.
    Leaderboard(Vec<LeaderboardEntry>),
    /// Show a persistent inline diagnostic.
    ErrorPanel(String),
    ClearErrorPanel,
    /// Show or replace the execution-status banner.
    ExecutionStatus { level: StatusLevel, message: String },
    ClearExecutionStatus,
    /// Blocking-alert analogue: a prominent one-shot error line.
    Alert(String),
    /// Informational one-shot line.
    Info(String),
    /// The active room went away; hide room-scoped controls.
    RoomCleared,
}

// ---------------------------------------------------------------------------
// Pure render helpers
// ---------------------------------------------------------------------------

/// Rooms sorted by id, ready for selector rendering.
pub fn sorted_rooms(rooms: impl IntoIterator<Item = Room>) -> Vec<Room> {
    let mut rooms: Vec<Room> = rooms.into_iter().collect();
    rooms.sort_by_key(|room| room.id);
    rooms
}

/// Selector lines: the placeholder followed by one `id) name` line per room.
pub fn render_room_option_lines(rooms: &[Room]) -> Vec<String> {
    let mut lines = Vec::with_capacity(rooms.len() + 1);
    lines.push(ROOM_PLACEHOLDER.to_string());
    for room in rooms {
        lines.push(format!("{}) {}", room.id, room.name));
    }
    lines
}

/// Leaderboard lines, fully rebuilt per call. An empty entry list renders the
/// empty-state message.
pub fn render_leaderboard_lines(entries: &[LeaderboardEntry]) -> Vec<String> {
    if entries.is_empty() {
        return vec!["No leaderboard data available.".to_string()];
    }
    entries
        .iter()
        .map(|entry| format!("{}. {} {} points", entry.place, entry.player_name, entry.score))
        .collect()
}

// ---------------------------------------------------------------------------
// Terminal renderer
// ---------------------------------------------------------------------------

/// Renders [`UiEvent`]s to stdout with the same color conventions the rest of
/// the terminal output uses.
pub struct TerminalView;

impl TerminalView {
    pub fn new() -> Self {
        TerminalView
    }

    pub fn render(&mut self, event: &UiEvent) {
        match event {
            UiEvent::RoomOptions(rooms) => {
                println!("{}", "Rooms:".bright_yellow().bold());
                for line in render_room_option_lines(rooms) {
                    println!("  {}", line);
                }
            }
            UiEvent::Leaderboard(entries) => {
                println!("{}", "Leaderboard:".bright_yellow().bold());
                for line in render_leaderboard_lines(entries) {
                    println!("  {}", line);
                }
            }
            UiEvent::ErrorPanel(message) => {
                println!("{}", "Execution log".bright_red().bold());
                println!("{}", message.bright_red());
            }
            UiEvent::ClearErrorPanel => {}
            UiEvent::ExecutionStatus { level, message } => {
                let line = match level {
                    StatusLevel::Running => message.bright_blue(),
                    StatusLevel::Queued => message.bright_yellow(),
                    StatusLevel::Success => message.bright_green().bold(),
                    StatusLevel::TimedOut => message.bright_red(),
                };
                println!("{}", line);
            }
            UiEvent::ClearExecutionStatus => {}
            UiEvent::Alert(message) => {
                eprintln!("{} {}", "!".bright_red().bold(), message.bright_red());
            }
            UiEvent::Info(message) => {
                println!("{}", message.bright_green());
            }
            UiEvent::RoomCleared => {
                println!("{}", "Left room. Select another room to keep playing.".bright_white());
            }
        }
    }
}

impl Default for TerminalView {
    fn default() -> Self {
        TerminalView::new()
    }
}
