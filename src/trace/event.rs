use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::{
    focus::heuristic::{Direction, MoveBasis},
    ui::node::NodePath,
};

/// One round of the focus-navigation loop, written as a JSON line.
#[derive(Debug, Serialize)]
pub struct NavigationEvent {
    pub timestamp_ms: u128,
    pub step: usize,
    pub generation: u64,

    pub target: String,
    pub focused: Option<String>,

    pub direction: Option<Direction>,
    pub basis: Option<MoveBasis>,

    pub outcome: Option<String>,
}

impl NavigationEvent {
    pub fn now(step: usize, generation: u64, target: &NodePath) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default(),
            step,
            generation,
            target: target.to_string(),
            focused: None,
            direction: None,
            basis: None,
            outcome: None,
        }
    }

    pub fn with_focused(mut self, focused: &NodePath) -> Self {
        self.focused = Some(focused.to_string());
        self
    }

    pub fn with_move(mut self, direction: Direction, basis: MoveBasis) -> Self {
        self.direction = Some(direction);
        self.basis = Some(basis);
        self
    }

    pub fn with_outcome(mut self, outcome: impl ToString) -> Self {
        self.outcome = Some(outcome.to_string());
        self
    }
}
