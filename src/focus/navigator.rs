use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::NavigationSettings;
use crate::ecp::client::EcpClient;
use crate::error::{DriverError, Result};
use crate::focus::heuristic::{Direction, plan_move};
use crate::trace::event::NavigationEvent;
use crate::trace::logger::TraceLogger;
use crate::ui::node::{NodePath, UiNode};
use crate::ui::snapshot::{Snapshot, Snapshotter};

/// Shared flag checked before every navigation move. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the running navigation before its next key press. An in-flight
    /// protocol call is allowed to finish.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NavigationLimits {
    /// Upper bound on key presses per navigation
    pub max_moves: usize,
    /// Pause after each press before re-sampling the UI
    pub settle_delay: Duration,
}

impl Default for NavigationLimits {
    fn default() -> Self {
        Self {
            max_moves: 30,
            settle_delay: Duration::from_millis(400),
        }
    }
}

impl From<&NavigationSettings> for NavigationLimits {
    fn from(settings: &NavigationSettings) -> Self {
        Self {
            max_moves: settings.max_focus_moves,
            settle_delay: Duration::from_millis(settings.settle_delay_ms),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NavigationOutcome {
    pub moves: usize,
    /// The capture that showed the target focused
    pub snapshot: Arc<Snapshot>,
}

/// Greedy, snapshot-refreshing focus search.
///
/// Each round re-captures the UI, stops if the target holds focus, and
/// otherwise presses one directional key chosen from the latest capture only.
/// Navigation is not atomic: on failure focus stays wherever it ended up.
pub struct FocusNavigator<'a> {
    client: &'a EcpClient,
    snapshots: &'a mut Snapshotter,
    limits: NavigationLimits,
    cancel: Option<&'a CancellationToken>,
    tracer: Option<&'a TraceLogger>,
}

impl<'a> FocusNavigator<'a> {
    pub fn new(client: &'a EcpClient, snapshots: &'a mut Snapshotter, limits: NavigationLimits) -> Self {
        FocusNavigator {
            client,
            snapshots,
            limits,
            cancel: None,
            tracer: None,
        }
    }

    pub fn with_cancellation(mut self, token: &'a CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_tracer(mut self, tracer: &'a TraceLogger) -> Self {
        self.tracer = Some(tracer);
        self
    }

    fn trace(&self, event: NavigationEvent) {
        if let Some(tracer) = self.tracer {
            tracer.log(&event);
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel.map(CancellationToken::is_cancelled).unwrap_or(false)
    }

    /// Move device focus onto `target`, or onto its nearest focusable
    /// ancestor when the target itself cannot take focus. A target that
    /// already has focus costs zero key presses.
    pub fn move_focus_to(&mut self, target: &UiNode) -> Result<NavigationOutcome> {
        let target_path = target.path.clone();
        let mut moves = 0usize;
        let mut tried: HashSet<(NodePath, Direction)> = HashSet::new();

        loop {
            let snapshot = self.snapshots.capture(self.client)?;
            let event = NavigationEvent::now(moves, snapshot.generation, &target_path);

            let Some(target_node) = snapshot.find(&target_path) else {
                self.trace(event.with_outcome("target_gone"));
                warn!(target = %target_path, moves, "navigation target left the screen");
                return Err(self.failure(&target_path, moves, "the target is no longer on screen"));
            };

            let Some(focused) = snapshot.focused() else {
                self.trace(event.with_outcome("no_focus"));
                return Err(self.failure(&target_path, moves, "no element currently has focus"));
            };
            let event = event.with_focused(&focused.path);

            if focused.path == target_path || target_node.is_focused() {
                self.trace(event.with_outcome("focused"));
                info!(target = %target_path, moves, "focus reached target");
                return Ok(NavigationOutcome { moves, snapshot });
            }

            // Focus lands on the owning button, never on its label or poster
            let Some(owner) = snapshot.focus_owner(&target_path) else {
                self.trace(event.with_outcome("unfocusable"));
                return Err(self.failure(
                    &target_path,
                    moves,
                    "neither the target nor any of its ancestors is focusable",
                ));
            };

            if focused.path == owner.path || owner.is_focused() {
                self.trace(event.with_outcome("focused"));
                info!(target = %target_path, owner = %owner.path, moves, "focus reached the target's owner");
                return Ok(NavigationOutcome { moves, snapshot });
            }

            if moves >= self.limits.max_moves {
                self.trace(event.with_outcome("budget_exhausted"));
                return Err(self.failure(
                    &target_path,
                    moves,
                    &format!("move budget of {} exhausted", self.limits.max_moves),
                ));
            }

            if self.cancelled() {
                self.trace(event.with_outcome("cancelled"));
                return Err(DriverError::Cancelled { moves });
            }

            let (direction, basis) = plan_move(focused, owner, &snapshot);
            if !tried.insert((focused.path.clone(), direction)) {
                self.trace(event.with_move(direction, basis).with_outcome("cycle"));
                return Err(self.failure(
                    &target_path,
                    moves,
                    &format!(
                        "focus cycle: moving {} from {} was already tried",
                        direction, focused.path
                    ),
                ));
            }

            debug!(
                from = %focused.path,
                target = %target_path,
                %direction,
                ?basis,
                "focus move"
            );
            self.client.press_key(&direction.key())?;
            moves += 1;
            self.trace(event.with_move(direction, basis).with_outcome("moved"));

            if !self.limits.settle_delay.is_zero() {
                thread::sleep(self.limits.settle_delay);
            }
        }
    }

    fn failure(&self, target: &NodePath, moves: usize, reason: &str) -> DriverError {
        DriverError::FocusNavigation {
            target: target.to_string(),
            moves,
            reason: reason.to_string(),
        }
    }
}
