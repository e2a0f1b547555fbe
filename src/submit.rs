//! Submission lifecycle tracking.
//!
//! One submission at a time: `Idle → Submitting → AwaitingResult → Idle`.
//! Acceptance by the backend only queues the code; the pass/fail verdict
//! arrives later on the event stream, so a watchdog bounds the wait. Every
//! timer carries the ticket current when it was scheduled — state transitions
//! bump the ticket, which invalidates any timer still in flight.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::ClientEvent;

/// How long to wait for an execution verdict before declaring a timeout.
pub const DEFAULT_WATCHDOG_TIMEOUT: Duration = Duration::from_secs(30);
/// Delay between the timeout notice and the forced reset to Idle.
pub const WATCHDOG_GRACE: Duration = Duration::from_secs(5);
/// How long the success indicator stays up before self-dismissing.
pub const SUCCESS_DISMISS: Duration = Duration::from_secs(3);
/// Delay before the post-submit leaderboard refresh.
pub const POST_SUBMIT_REFRESH_DELAY: Duration = Duration::from_millis(100);

/// Submission lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitState {
    /// Nothing in flight; submitting is allowed.
    Idle,
    /// The POST request is on the wire.
    Submitting,
    /// The POST was accepted; waiting for an event-stream verdict.
    AwaitingResult,
}

/// Client-side state machine for one submission slot.
pub struct SubmissionTracker {
    state: SubmitState,
    ticket: u64,
    watchdog_timeout: Duration,
    watchdog: Option<JoinHandle<()>>,
    events_tx: mpsc::UnboundedSender<ClientEvent>,
}

impl SubmissionTracker {
    pub fn new(
        watchdog_timeout: Duration,
        events_tx: mpsc::UnboundedSender<ClientEvent>,
    ) -> Self {
        SubmissionTracker {
            state: SubmitState::Idle,
            ticket: 0,
            watchdog_timeout,
            watchdog: None,
            events_tx,
        }
    }

    pub fn state(&self) -> SubmitState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == SubmitState::Idle
    }

    /// The ticket a timer scheduled right now would carry.
    pub fn current_ticket(&self) -> u64 {
        self.ticket
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.ticket == ticket
    }

    /// Start a submission. Returns `false` (a no-op for the caller) when a
    /// submission is already in flight.
    pub fn begin(&mut self) -> bool {
        if self.state != SubmitState::Idle {
            warn!("submission rejected: one already in flight");
            return false;
        }
        self.invalidate_timers();
        self.state = SubmitState::Submitting;
        true
    }

    /// The POST was accepted; arm the watchdog and wait for a verdict.
    pub fn accepted(&mut self) {
        self.state = SubmitState::AwaitingResult;
        let ticket = self.ticket;
        let tx = self.events_tx.clone();
        let timeout = self.watchdog_timeout;
        self.watchdog = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = tx.send(ClientEvent::WatchdogFired(ticket));
        }));
    }

    /// The POST itself failed; back to Idle with no verdict expected.
    pub fn failed(&mut self) {
        self.invalidate_timers();
        self.state = SubmitState::Idle;
    }

    /// A correct-submission verdict arrived. Cancels the watchdog, returns to
    /// Idle, and schedules the success-indicator dismissal. Returns `true`
    /// when a submission was actually awaiting a result.
    pub fn resolve_success(&mut self) -> bool {
        let was_awaiting = self.state == SubmitState::AwaitingResult;
        self.invalidate_timers();
        self.state = SubmitState::Idle;
        if was_awaiting {
            let ticket = self.ticket;
            let tx = self.events_tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(SUCCESS_DISMISS).await;
                let _ = tx.send(ClientEvent::StatusExpired(ticket));
            });
        }
        was_awaiting
    }

    /// A wrong-submission verdict arrived. Cancels the watchdog and returns
    /// to Idle; the diagnostic itself travels the error-panel path.
    pub fn resolve_failure(&mut self) -> bool {
        let was_awaiting = self.state == SubmitState::AwaitingResult;
        self.invalidate_timers();
        self.state = SubmitState::Idle;
        was_awaiting
    }

    /// The watchdog fired. Valid only for the current ticket while still
    /// awaiting a result; schedules the grace-delay reset and returns `true`
    /// when the timeout notice should be shown.
    pub fn watchdog_fired(&mut self, ticket: u64) -> bool {
        if !self.is_current(ticket) || self.state != SubmitState::AwaitingResult {
            return false;
        }
        warn!("execution watchdog fired: no verdict within {:?}", self.watchdog_timeout);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(WATCHDOG_GRACE).await;
            let _ = tx.send(ClientEvent::WatchdogGraceElapsed(ticket));
        });
        true
    }

    /// The grace delay after a timeout elapsed: force-reset to Idle no matter
    /// what the backend eventually does. Returns `true` when the reset
    /// happened.
    pub fn grace_elapsed(&mut self, ticket: u64) -> bool {
        if !self.is_current(ticket) || self.state != SubmitState::AwaitingResult {
            return false;
        }
        self.invalidate_timers();
        self.state = SubmitState::Idle;
        true
    }

    /// Cancel everything outstanding (navigation, leave, room deleted).
    pub fn reset(&mut self) {
        self.invalidate_timers();
        self.state = SubmitState::Idle;
    }

    /// Abort the watchdog task and bump the ticket so that any timer message
    /// already in the channel is ignored on arrival.
    fn invalidate_timers(&mut self) {
        if let Some(watchdog) = self.watchdog.take() {
            watchdog.abort();
        }
        self.ticket += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker_with_rx() -> (
        SubmissionTracker,
        mpsc::UnboundedReceiver<ClientEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (SubmissionTracker::new(DEFAULT_WATCHDOG_TIMEOUT, tx), rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ClientEvent>) -> Vec<ClientEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_initial_state_is_idle() {
        let (tracker, _rx) = tracker_with_rx();
        assert_eq!(tracker.state(), SubmitState::Idle);
        assert!(tracker.is_idle());
    }

    #[tokio::test]
    async fn test_begin_then_accept_transitions() {
        let (mut tracker, _rx) = tracker_with_rx();
        assert!(tracker.begin());
        assert_eq!(tracker.state(), SubmitState::Submitting);
        tracker.accepted();
        assert_eq!(tracker.state(), SubmitState::AwaitingResult);
    }

    #[tokio::test]
    async fn test_reentrant_begin_is_rejected() {
        let (mut tracker, _rx) = tracker_with_rx();
        assert!(tracker.begin());
        assert!(!tracker.begin());
        tracker.accepted();
        assert!(!tracker.begin());
    }

    #[tokio::test]
    async fn test_post_failure_returns_to_idle() {
        let (mut tracker, _rx) = tracker_with_rx();
        tracker.begin();
        tracker.failed();
        assert!(tracker.is_idle());
        assert!(tracker.begin());
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_fires_after_timeout() {
        let (mut tracker, mut rx) = tracker_with_rx();
        tracker.begin();
        tracker.accepted();
        let ticket = tracker.current_ticket();

        tokio::time::sleep(DEFAULT_WATCHDOG_TIMEOUT + Duration::from_secs(1)).await;

        let events = drain(&mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, ClientEvent::WatchdogFired(t) if *t == ticket)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_cancels_watchdog() {
        let (mut tracker, mut rx) = tracker_with_rx();
        tracker.begin();
        tracker.accepted();
        let armed_ticket = tracker.current_ticket();

        assert!(tracker.resolve_success());
        assert!(tracker.is_idle());

        // Let the (now aborted) watchdog duration elapse fully.
        tokio::time::sleep(DEFAULT_WATCHDOG_TIMEOUT + Duration::from_secs(5)).await;

        // No timeout notice: the only expected message is the success
        // dismissal, and any late watchdog message must carry a stale ticket.
        for event in drain(&mut rx) {
            match event {
                ClientEvent::WatchdogFired(t) => assert!(!tracker.is_current(t)),
                ClientEvent::StatusExpired(_) => {}
                other => panic!("unexpected event: {:?}", other),
            }
        }
        let _ = armed_ticket;
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_schedules_status_dismissal() {
        let (mut tracker, mut rx) = tracker_with_rx();
        tracker.begin();
        tracker.accepted();
        tracker.resolve_success();
        let ticket = tracker.current_ticket();

        tokio::time::sleep(SUCCESS_DISMISS + Duration::from_millis(100)).await;

        let events = drain(&mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, ClientEvent::StatusExpired(t) if *t == ticket)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_verdict_cancels_watchdog_without_dismiss_timer() {
        let (mut tracker, mut rx) = tracker_with_rx();
        tracker.begin();
        tracker.accepted();

        assert!(tracker.resolve_failure());
        assert!(tracker.is_idle());

        tokio::time::sleep(DEFAULT_WATCHDOG_TIMEOUT * 2).await;
        for event in drain(&mut rx) {
            if let ClientEvent::WatchdogFired(t) = event {
                assert!(!tracker.is_current(t));
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_fired_schedules_grace_reset() {
        let (mut tracker, mut rx) = tracker_with_rx();
        tracker.begin();
        tracker.accepted();
        let ticket = tracker.current_ticket();

        assert!(tracker.watchdog_fired(ticket));
        // Still awaiting until the grace delay elapses.
        assert_eq!(tracker.state(), SubmitState::AwaitingResult);

        tokio::time::sleep(WATCHDOG_GRACE + Duration::from_millis(100)).await;
        let events = drain(&mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, ClientEvent::WatchdogGraceElapsed(t) if *t == ticket)));

        assert!(tracker.grace_elapsed(ticket));
        assert!(tracker.is_idle());
    }

    #[tokio::test]
    async fn test_stale_watchdog_ticket_ignored() {
        let (mut tracker, _rx) = tracker_with_rx();
        tracker.begin();
        tracker.accepted();
        let old_ticket = tracker.current_ticket();
        tracker.resolve_success(); // bumps the ticket

        assert!(!tracker.watchdog_fired(old_ticket));
        assert!(!tracker.grace_elapsed(old_ticket));
    }

    #[tokio::test]
    async fn test_grace_after_verdict_is_ignored() {
        let (mut tracker, _rx) = tracker_with_rx();
        tracker.begin();
        tracker.accepted();
        let ticket = tracker.current_ticket();
        tracker.watchdog_fired(ticket);
        // Verdict lands during the grace window.
        tracker.resolve_success();
        assert!(!tracker.grace_elapsed(ticket));
        assert!(tracker.is_idle());
    }

    #[tokio::test]
    async fn test_reset_from_any_state() {
        let (mut tracker, _rx) = tracker_with_rx();
        tracker.begin();
        tracker.accepted();
        tracker.reset();
        assert!(tracker.is_idle());
        assert!(tracker.begin());
    }
}
