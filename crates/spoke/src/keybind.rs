use crate::events::InputSnapshot;
use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use strum::{Display as StrumDisplay, EnumIter, EnumString};
use thiserror::Error;

/// Opaque job identifier supplied by the host, compared only for set membership.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    From,
    Into,
)]
#[serde(transparent)]
pub struct JobId(u32);

impl JobId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumString, EnumIter, StrumDisplay)]
#[strum(ascii_case_insensitive)]
pub enum Key {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
    #[strum(to_string = "0", serialize = "Digit0")]
    Digit0,
    #[strum(to_string = "1", serialize = "Digit1")]
    Digit1,
    #[strum(to_string = "2", serialize = "Digit2")]
    Digit2,
    #[strum(to_string = "3", serialize = "Digit3")]
    Digit3,
    #[strum(to_string = "4", serialize = "Digit4")]
    Digit4,
    #[strum(to_string = "5", serialize = "Digit5")]
    Digit5,
    #[strum(to_string = "6", serialize = "Digit6")]
    Digit6,
    #[strum(to_string = "7", serialize = "Digit7")]
    Digit7,
    #[strum(to_string = "8", serialize = "Digit8")]
    Digit8,
    #[strum(to_string = "9", serialize = "Digit9")]
    Digit9,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    #[strum(to_string = "Esc", serialize = "Escape")]
    Escape,
    Tab,
    Space,
    #[strum(to_string = "Enter", serialize = "Return")]
    Enter,
    Backspace,
    Insert,
    #[strum(to_string = "Delete", serialize = "Del")]
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
    #[strum(to_string = "`", serialize = "Backquote")]
    Backquote,
    #[strum(to_string = "-", serialize = "Minus")]
    Minus,
    #[strum(to_string = "=", serialize = "Equals")]
    Equals,
    Mouse3,
    Mouse4,
    Mouse5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        alt: false,
        shift: false,
    };

    /// True when every modifier required by `required` is also set here.
    pub fn contains(&self, required: Modifiers) -> bool {
        (!required.ctrl || self.ctrl) && (!required.alt || self.alt) && (!required.shift || self.shift)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyComboParseError {
    #[error("Key combination is empty")]
    Empty,
    #[error("Key combination '{0}' has no primary key")]
    MissingKey(String),
    #[error("Unknown modifier '{0}'")]
    UnknownModifier(String),
    #[error("Unknown key '{0}'")]
    UnknownKey(String),
}

/// Modifier state plus one primary key, written as `Ctrl+Shift+F1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub struct KeyCombo {
    pub modifiers: Modifiers,
    pub key: Key,
}

impl KeyCombo {
    pub const fn new(modifiers: Modifiers, key: Key) -> Self {
        Self { modifiers, key }
    }

    pub const fn key_only(key: Key) -> Self {
        Self::new(Modifiers::NONE, key)
    }

    /// Primary key down and modifier state exactly equal to the combo's.
    pub fn is_satisfied_by(&self, input: &InputSnapshot) -> bool {
        input.keys_down.contains(&self.key) && input.modifiers == self.modifiers
    }

    /// Primary key and every required modifier still down; extra modifiers are ignored.
    pub fn is_held_in(&self, input: &InputSnapshot) -> bool {
        input.keys_down.contains(&self.key) && input.modifiers.contains(self.modifiers)
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.ctrl {
            f.write_str("Ctrl+")?;
        }
        if self.modifiers.alt {
            f.write_str("Alt+")?;
        }
        if self.modifiers.shift {
            f.write_str("Shift+")?;
        }
        write!(f, "{}", self.key)
    }
}

impl FromStr for KeyCombo {
    type Err = KeyComboParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(KeyComboParseError::Empty);
        }

        let parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let Some((key, mods)) = parts.split_last() else {
            return Err(KeyComboParseError::Empty);
        };
        if key.is_empty() {
            return Err(KeyComboParseError::MissingKey(s.to_string()));
        }

        let mut modifiers = Modifiers::NONE;
        for m in mods {
            match m.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => modifiers.ctrl = true,
                "alt" => modifiers.alt = true,
                "shift" => modifiers.shift = true,
                _ => return Err(KeyComboParseError::UnknownModifier(m.to_string())),
            }
        }

        let key = Key::from_str(key).map_err(|_| KeyComboParseError::UnknownKey(key.to_string()))?;
        Ok(Self { modifiers, key })
    }
}

/// Activation condition of a ring.
///
/// An empty job set means the bind is global, so "global" and "job-scoped"
/// can never both hold.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyBind {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combo: Option<KeyCombo>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub jobs: BTreeSet<JobId>,
    #[serde(default)]
    pub toggle: bool,
}

impl KeyBind {
    pub fn new(combo: KeyCombo) -> Self {
        Self {
            combo: Some(combo),
            ..Self::default()
        }
    }

    pub fn unbound() -> Self {
        Self::default()
    }

    pub fn toggled(mut self) -> Self {
        self.toggle = true;
        self
    }

    pub fn with_jobs(mut self, jobs: impl IntoIterator<Item = JobId>) -> Self {
        self.jobs.extend(jobs);
        self
    }

    pub fn is_global(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Making a bind global drops its job set. Turning global off is a no-op
    /// until a job is added.
    pub fn set_global(&mut self, global: bool) {
        if global {
            self.jobs.clear();
        }
    }

    pub fn add_job(&mut self, job: JobId) {
        self.jobs.insert(job);
    }

    pub fn remove_job(&mut self, job: JobId) {
        self.jobs.remove(&job);
    }

    /// Adds or removes a whole group of jobs at once, e.g. every job of a role.
    pub fn set_jobs(&mut self, jobs: impl IntoIterator<Item = JobId>, enabled: bool) {
        for job in jobs {
            if enabled {
                self.jobs.insert(job);
            } else {
                self.jobs.remove(&job);
            }
        }
    }

    pub fn has_all_jobs(&self, jobs: impl IntoIterator<Item = JobId>) -> bool {
        jobs.into_iter().all(|job| self.jobs.contains(&job))
    }

    pub fn applies_to(&self, job: Option<JobId>) -> bool {
        self.is_global() || job.is_some_and(|j| self.jobs.contains(&j))
    }

    /// Same combo and overlapping job applicability. Unbound binds never conflict.
    pub fn conflicts_with(&self, other: &KeyBind) -> bool {
        match (self.combo, other.combo) {
            (Some(a), Some(b)) if a == b => {
                self.is_global() || other.is_global() || !self.jobs.is_disjoint(&other.jobs)
            }
            _ => false,
        }
    }

    pub fn description(&self) -> String {
        match self.combo {
            Some(combo) if self.toggle => format!("{} (toggle)", combo),
            Some(combo) => combo.to_string(),
            None => "None".to_string(),
        }
    }
}
