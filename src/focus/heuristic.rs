use std::fmt;

use serde::Serialize;

use crate::ecp::keys::RokuKey;
use crate::ui::node::UiNode;
use crate::ui::snapshot::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn key(self) -> RokuKey {
        match self {
            Direction::Up => RokuKey::Up,
            Direction::Down => RokuKey::Down,
            Direction::Left => RokuKey::Left,
            Direction::Right => RokuKey::Right,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MoveBasis {
    Bounds,
    Structure,
}

/// One local step from `current` toward `target`.
pub fn next_move(current: &UiNode, target: &UiNode, snapshot: &Snapshot) -> Direction {
    plan_move(current, target, snapshot).0
}

/// Like `next_move`, also reporting which rule picked the direction.
pub fn plan_move(current: &UiNode, target: &UiNode, snapshot: &Snapshot) -> (Direction, MoveBasis) {
    match bounds_move(current, target) {
        Some(direction) => (direction, MoveBasis::Bounds),
        None => (structural_move(current, target, snapshot), MoveBasis::Structure),
    }
}

/// Axis of the larger center-to-center delta; ties go horizontal. None when
/// either node lacks bounds or the centers coincide.
pub fn bounds_move(current: &UiNode, target: &UiNode) -> Option<Direction> {
    let (cx, cy) = current.bounds?.center();
    let (tx, ty) = target.bounds?.center();
    let dx = tx - cx;
    let dy = ty - cy;

    if dx == 0.0 && dy == 0.0 {
        return None;
    }
    if dx.abs() >= dy.abs() {
        Some(if dx > 0.0 { Direction::Right } else { Direction::Left })
    } else {
        Some(if dy > 0.0 { Direction::Down } else { Direction::Up })
    }
}

/// Fallback when bounds are missing.
///
/// Sign comes from document order: a target later in the tree is ahead
/// (Right/Down), an earlier one behind (Left/Up). The axis comes from the
/// lowest common ancestor: its `layoutDirection` attribute when it has one
/// ("horiz" or "vert"), otherwise horizontal for siblings and vertical for
/// nodes in different containers.
pub fn structural_move(current: &UiNode, target: &UiNode, snapshot: &Snapshot) -> Direction {
    let forward = target.order > current.order;

    let shared = current.path.common_prefix_len(&target.path);
    let lca_layout = lowest_common_ancestor(current, target, snapshot)
        .and_then(|lca| lca.attribute("layoutDirection"))
        .map(|d| d.trim().to_ascii_lowercase());

    let siblings = shared + 1 == current.path.depth() && shared + 1 == target.path.depth();
    let horizontal = match lca_layout.as_deref() {
        Some("horiz") | Some("horizontal") => true,
        Some("vert") | Some("vertical") => false,
        _ => siblings,
    };

    match (horizontal, forward) {
        (true, true) => Direction::Right,
        (true, false) => Direction::Left,
        (false, true) => Direction::Down,
        (false, false) => Direction::Up,
    }
}

fn lowest_common_ancestor<'s>(a: &UiNode, b: &UiNode, snapshot: &'s Snapshot) -> Option<&'s UiNode> {
    let shared = a.path.common_prefix_len(&b.path);
    let mut ancestor = snapshot.root.path.clone();
    if shared == 0 {
        return None;
    }
    for step in &a.path.steps()[1..shared] {
        ancestor = ancestor.child(&step.tag, step.position);
    }
    snapshot.find(&ancestor)
}
