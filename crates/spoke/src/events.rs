use crate::item::{ExecutePayload, InvalidReason};
use crate::keybind::{JobId, Key, Modifiers};
use crate::menu::Point;
use std::collections::BTreeSet;
use std::time::Duration;

/// Everything the engine sees of the outside world for one tick.
#[derive(Debug, Clone, Default)]
pub struct InputSnapshot {
    pub keys_down: BTreeSet<Key>,
    pub modifiers: Modifiers,
    pub cursor: Point,
    pub viewport: Point,
    /// Primary button released this tick.
    pub clicked: bool,
    /// Host-side quick action trigger, independent of cursor position.
    pub quick_action: bool,
    pub job: Option<JobId>,
    /// Time elapsed since the previous tick.
    pub delta: Duration,
}

impl InputSnapshot {
    pub fn with_keys(keys: impl IntoIterator<Item = Key>) -> Self {
        Self {
            keys_down: keys.into_iter().collect(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommitRequest {
    pub ring: usize,
    pub index: usize,
    pub payload: ExecutePayload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CloseReason {
    Committed,
    Cancelled,
    InvalidItem(InvalidReason),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RingEvent {
    Activated { ring: usize, center: Point },
    WarpCursor(Point),
    NestedActivated { ring: usize, parent: usize, center: Point },
    NestedDismissed { ring: usize },
    Commit(CommitRequest),
    Closed { ring: usize, reason: CloseReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigEvent {
    Reload,
}
