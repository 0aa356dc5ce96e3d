use crate::item::{ActionItem, ItemBorder};
use crate::keybind::KeyBind;
use derive_more::{AsRef, Deref, DerefMut, Display, From, Into};
use palette::Srgba;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_RADIUS: f32 = 150.0;
pub const MAX_RADIUS: f32 = 500.0;
pub const MAX_ROTATION: f32 = 359.0;
pub const MIN_ITEM_SIZE: f32 = 10.0;
pub const MAX_ITEM_SIZE: f32 = 500.0;
pub const DEFAULT_RADIUS: f32 = 150.0;
pub const DEFAULT_ITEM_SIZE: f32 = 40.0;

/// Display label of a ring. Not unique: lookups take the first match.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, Deref, From, Into, AsRef,
)]
#[serde(transparent)]
pub struct RingName(String);

crate::impl_string_newtype!(RingName);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemSize {
    pub width: f32,
    pub height: f32,
}

impl ItemSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.clamp(MIN_ITEM_SIZE, MAX_ITEM_SIZE),
            height: height.clamp(MIN_ITEM_SIZE, MAX_ITEM_SIZE),
        }
    }

    pub fn square(size: f32) -> Self {
        Self::new(size, size)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RingEditError {
    #[error("Item index {index} is out of range for a ring with {len} items")]
    OutOfRange { index: usize, len: usize },
    #[error("Nested ring items cannot be the quick action")]
    NestedRingQuickAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ring {
    pub name: RingName,
    pub color: Srgba<f32>,
    pub radius: f32,
    /// Degrees, clockwise on screen. Sector 0 starts here.
    #[serde(default)]
    pub rotation: f32,
    pub item_size: ItemSize,
    #[serde(default)]
    pub key_bind: KeyBind,
    #[serde(default)]
    pub items: Vec<ActionItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_action_index: Option<usize>,
    #[serde(default)]
    pub draw_line: bool,
    #[serde(default)]
    pub draw_selection_background: bool,
    #[serde(default)]
    pub show_tooltips: bool,
    #[serde(default)]
    pub prevent_action_on_close: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Up,
    Down,
}

/// Moves one element a step, wrapping from the first slot to the end and
/// from the last slot to the front. Returns the element's new index.
fn circular_move<T>(items: &mut Vec<T>, index: usize, step: Step) -> Option<usize> {
    let len = items.len();
    if index >= len {
        return None;
    }

    let to = match step {
        Step::Up if index == 0 => {
            let item = items.remove(0);
            items.push(item);
            return Some(len - 1);
        }
        Step::Down if index == len - 1 => {
            let item = items.remove(index);
            items.insert(0, item);
            return Some(0);
        }
        Step::Up => index - 1,
        Step::Down => index + 1,
    };
    items.swap(index, to);
    Some(to)
}

impl Ring {
    pub fn new(
        name: impl Into<RingName>,
        color: Srgba<f32>,
        key_bind: KeyBind,
        radius: f32,
        item_size: ItemSize,
    ) -> Self {
        Self {
            name: name.into(),
            color,
            radius: radius.clamp(MIN_RADIUS, MAX_RADIUS),
            rotation: 0.0,
            item_size,
            key_bind,
            items: Vec::new(),
            quick_action_index: None,
            draw_line: true,
            draw_selection_background: true,
            show_tooltips: false,
            prevent_action_on_close: false,
        }
    }

    pub fn with_items(mut self, items: impl IntoIterator<Item = ActionItem>) -> Self {
        self.items.extend(items);
        self
    }

    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius.clamp(MIN_RADIUS, MAX_RADIUS);
    }

    pub fn set_rotation(&mut self, degrees: f32) {
        self.rotation = degrees.clamp(-MAX_ROTATION, MAX_ROTATION);
    }

    pub fn set_item_size(&mut self, width: f32, height: f32) {
        self.item_size = ItemSize::new(width, height);
    }

    /// Re-applies every editor clamp, for values read from a file or share string.
    pub fn sanitize(&mut self) {
        self.set_radius(self.radius);
        self.set_rotation(self.rotation);
        self.set_item_size(self.item_size.width, self.item_size.height);
        for item in &mut self.items {
            item.sanitize();
        }
        if self.set_quick_action(self.quick_action_index).is_err() {
            self.quick_action_index = None;
        }
    }

    pub fn quick_action(&self) -> Option<(usize, &ActionItem)> {
        self.quick_action_index
            .and_then(|i| self.items.get(i).map(|item| (i, item)))
    }

    pub fn set_quick_action(&mut self, index: Option<usize>) -> Result<(), RingEditError> {
        if let Some(index) = index {
            let item = self.items.get(index).ok_or(RingEditError::OutOfRange {
                index,
                len: self.items.len(),
            })?;
            if item.is_nested_ring() {
                return Err(RingEditError::NestedRingQuickAction);
            }
        }
        self.quick_action_index = index;
        Ok(())
    }

    /// Inserts right after `after` when it names a non-last item, otherwise appends.
    pub fn insert_item(&mut self, after: Option<usize>, item: ActionItem) -> usize {
        let index = match after {
            Some(i) if i + 1 < self.items.len() => i + 1,
            _ => self.items.len(),
        };
        self.items.insert(index, item);
        if let Some(q) = self.quick_action_index
            && q >= index
        {
            self.quick_action_index = Some(q + 1);
        }
        index
    }

    pub fn remove_item(&mut self, index: usize) -> Option<ActionItem> {
        if index >= self.items.len() {
            return None;
        }
        let item = self.items.remove(index);
        self.quick_action_index = match self.quick_action_index {
            Some(q) if q == index => None,
            Some(q) if q > index => Some(q - 1),
            other => other,
        };
        Some(item)
    }

    pub fn move_item_up(&mut self, index: usize) -> Option<usize> {
        self.move_item(index, Step::Up)
    }

    pub fn move_item_down(&mut self, index: usize) -> Option<usize> {
        self.move_item(index, Step::Down)
    }

    fn move_item(&mut self, index: usize, step: Step) -> Option<usize> {
        // replay the move on positions so the quick action keeps pointing at its item
        let mut order: Vec<usize> = (0..self.items.len()).collect();
        circular_move(&mut order, index, step)?;
        let to = circular_move(&mut self.items, index, step)?;
        self.quick_action_index = self
            .quick_action_index
            .and_then(|q| order.iter().position(|&old| old == q));
        Some(to)
    }
}

/// Top-level rings in activation priority order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Deref, DerefMut, From, Into)]
#[serde(transparent)]
pub struct RingList(Vec<Ring>);

impl RingList {
    pub fn new(rings: Vec<Ring>) -> Self {
        Self(rings)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Ring> {
        self.0.iter().find(|r| r.name.as_str() == name)
    }

    pub fn position_by_name(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|r| r.name.as_str() == name)
    }

    /// Adds an empty, unbound ring named after its position and returns its index.
    pub fn add_new_ring(&mut self) -> usize {
        let ring = Ring::new(
            format!("Ring{}", self.0.len() + 1),
            Srgba::new(1.0, 1.0, 1.0, 1.0),
            KeyBind::unbound(),
            DEFAULT_RADIUS,
            ItemSize::square(DEFAULT_ITEM_SIZE),
        );
        self.0.push(ring);
        self.0.len() - 1
    }

    /// Nested references to the removed ring are left dangling on purpose;
    /// validity checks report them.
    pub fn remove(&mut self, index: usize) -> Option<Ring> {
        (index < self.0.len()).then(|| self.0.remove(index))
    }

    pub fn move_up(&mut self, index: usize) -> Option<usize> {
        circular_move(&mut self.0, index, Step::Up)
    }

    pub fn move_down(&mut self, index: usize) -> Option<usize> {
        circular_move(&mut self.0, index, Step::Down)
    }

    /// Imported rings are always appended, even when a name already exists.
    pub fn append_imported(&mut self, rings: impl IntoIterator<Item = Ring>) -> usize {
        let before = self.0.len();
        self.0.extend(rings);
        self.0.len() - before
    }

    /// Overwrites every item's border. Irreversible; callers confirm first.
    pub fn apply_border_to_all(&mut self, border: &ItemBorder) {
        for item in self.0.iter_mut().flat_map(|r| r.items.iter_mut()) {
            item.border = *border;
        }
    }
}
