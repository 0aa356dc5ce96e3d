//! Selectable entries of a ring.
//!
//! Every consumer (validity, descriptions, execute payloads, the share-string
//! codec) matches exhaustively on [`ItemKind`], so adding a variant is a
//! compile error everywhere it needs handling.

pub mod border;
pub mod catalog;

pub use border::ItemBorder;
pub use catalog::StaticCatalog;

use crate::ring::{RingList, RingName};
use serde::{Deserialize, Serialize};
use strum::{Display as StrumDisplay, EnumDiscriminants, EnumIter, EnumString};
use thiserror::Error;

pub const DEFAULT_NESTED_ICON: u32 = 66001;
pub const MIN_ACTIVATION_TIME: f32 = 0.2;
pub const MAX_ACTIVATION_TIME: f32 = 5.0;
pub const DEFAULT_ACTIVATION_TIME: f32 = 1.0;

/// Categories of game data an item may point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, StrumDisplay, EnumIter)]
pub enum RefKind {
    Action,
    Item,
    #[strum(to_string = "Gear set")]
    GearSet,
    Macro,
}

/// Read-only game data consulted by validity checks and descriptions.
pub trait GameData {
    fn exists(&self, kind: RefKind, id: u32) -> bool;

    fn display_name(&self, kind: RefKind, id: u32) -> Option<String>;

    fn is_unlocked(&self, kind: RefKind, id: u32) -> bool {
        let _ = (kind, id);
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidReason {
    #[error("{kind} {id} does not exist")]
    MissingReference { kind: RefKind, id: u32 },
    #[error("{kind} {id} is not unlocked")]
    Locked { kind: RefKind, id: u32 },
    #[error("Command text is empty")]
    EmptyCommand,
    #[error("Ring '{0}' does not exist")]
    DanglingRingReference(RingName),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacroSlot {
    #[serde(default)]
    pub shared: bool,
    pub number: u8,
}

impl MacroSlot {
    pub const PER_SET: u32 = 100;

    /// Flat id used for game data lookups: shared macros follow the individual set.
    pub fn id(&self) -> u32 {
        u32::from(self.number) + if self.shared { Self::PER_SET } else { 0 }
    }
}

/// By-name reference to another top-level ring.
///
/// The referenced ring is resolved lazily against a [`RingList`]; deleting it
/// leaves a dangling name that validity checks report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedRing {
    pub ring_name: RingName,
    pub activation_time: f32,
    #[serde(default)]
    pub keep_center: bool,
}

impl NestedRing {
    pub fn new(ring_name: impl Into<RingName>, activation_time: f32, keep_center: bool) -> Self {
        Self {
            ring_name: ring_name.into(),
            activation_time: activation_time.clamp(MIN_ACTIVATION_TIME, MAX_ACTIVATION_TIME),
            keep_center,
        }
    }

    pub fn set_activation_time(&mut self, seconds: f32) {
        self.activation_time = seconds.clamp(MIN_ACTIVATION_TIME, MAX_ACTIVATION_TIME);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, EnumDiscriminants)]
#[serde(tag = "type")]
#[strum_discriminants(name(ItemTag), derive(StrumDisplay, EnumString, EnumIter, Hash))]
pub enum ItemKind {
    Action { action_id: u32 },
    Item { item_id: u32, hq: bool },
    GearSet { gear_set_id: u32 },
    Command { command: String },
    Macro { slot: MacroSlot },
    Emote { command: String },
    NestedRing(NestedRing),
}

/// What the host executor should perform for a committed item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutePayload {
    UseAction { action_id: u32 },
    UseItem { item_id: u32, hq: bool },
    EquipGearSet { gear_set_id: u32 },
    RunCommand { command: String },
    RunMacro { slot: MacroSlot },
    PerformEmote { command: String },
}

/// Host side of a commit; the engine never performs side effects itself.
pub trait Executor {
    fn execute(&mut self, payload: &ExecutePayload);
}

impl ItemKind {
    pub fn tag(&self) -> ItemTag {
        ItemTag::from(self)
    }

    pub fn type_label(&self) -> &'static str {
        match self {
            Self::Action { .. } => "Action",
            Self::Item { .. } => "Item",
            Self::GearSet { .. } => "Gear Set",
            Self::Command { .. } => "Command",
            Self::Macro { .. } => "Macro",
            Self::Emote { .. } => "Emote",
            Self::NestedRing(_) => "Nested Ring",
        }
    }

    pub fn description(&self, data: &dyn GameData) -> String {
        let named = |kind: RefKind, id: u32| {
            data.display_name(kind, id)
                .unwrap_or_else(|| format!("{kind} #{id}"))
        };

        match self {
            Self::Action { action_id } => named(RefKind::Action, *action_id),
            Self::Item { item_id, hq } => {
                let name = named(RefKind::Item, *item_id);
                if *hq { format!("{name} (HQ)") } else { name }
            }
            Self::GearSet { gear_set_id } => named(RefKind::GearSet, *gear_set_id),
            Self::Macro { slot } => data.display_name(RefKind::Macro, slot.id()).unwrap_or_else(|| {
                let set = if slot.shared { "Shared" } else { "Individual" };
                format!("{set} macro #{}", slot.number)
            }),
            Self::Command { command } | Self::Emote { command } => command.clone(),
            Self::NestedRing(nested) => nested.ring_name.to_string(),
        }
    }

    pub fn check(&self, data: &dyn GameData, rings: &RingList) -> Result<(), InvalidReason> {
        let require = |kind: RefKind, id: u32| {
            data.exists(kind, id)
                .then_some(())
                .ok_or(InvalidReason::MissingReference { kind, id })
        };

        match self {
            Self::Action { action_id } => {
                require(RefKind::Action, *action_id)?;
                data.is_unlocked(RefKind::Action, *action_id)
                    .then_some(())
                    .ok_or(InvalidReason::Locked {
                        kind: RefKind::Action,
                        id: *action_id,
                    })
            }
            Self::Item { item_id, .. } => require(RefKind::Item, *item_id),
            Self::GearSet { gear_set_id } => require(RefKind::GearSet, *gear_set_id),
            Self::Macro { slot } => require(RefKind::Macro, slot.id()),
            Self::Command { command } | Self::Emote { command } => {
                if command.trim().is_empty() {
                    Err(InvalidReason::EmptyCommand)
                } else {
                    Ok(())
                }
            }
            Self::NestedRing(nested) => rings
                .find_by_name(nested.ring_name.as_str())
                .map(|_| ())
                .ok_or_else(|| InvalidReason::DanglingRingReference(nested.ring_name.clone())),
        }
    }

    /// `None` for nested rings, which open a sub-menu instead of executing.
    pub fn payload(&self) -> Option<ExecutePayload> {
        match self {
            Self::Action { action_id } => Some(ExecutePayload::UseAction {
                action_id: *action_id,
            }),
            Self::Item { item_id, hq } => Some(ExecutePayload::UseItem {
                item_id: *item_id,
                hq: *hq,
            }),
            Self::GearSet { gear_set_id } => Some(ExecutePayload::EquipGearSet {
                gear_set_id: *gear_set_id,
            }),
            Self::Command { command } => Some(ExecutePayload::RunCommand {
                command: command.trim().to_string(),
            }),
            Self::Macro { slot } => Some(ExecutePayload::RunMacro { slot: *slot }),
            Self::Emote { command } => Some(ExecutePayload::PerformEmote {
                command: command.trim().to_string(),
            }),
            Self::NestedRing(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    #[serde(flatten)]
    pub kind: ItemKind,
    #[serde(default)]
    pub icon_id: u32,
    #[serde(default)]
    pub border: ItemBorder,
    #[serde(default)]
    pub draw_text: bool,
    #[serde(default)]
    pub draw_text_only_when_selected: bool,
}

impl ActionItem {
    pub fn new(kind: ItemKind) -> Self {
        Self::with_border(kind, ItemBorder::default())
    }

    /// New items take the configured default border rather than the built-in one.
    pub fn with_border(kind: ItemKind, border: ItemBorder) -> Self {
        let icon_id = match kind {
            ItemKind::NestedRing(_) => DEFAULT_NESTED_ICON,
            _ => 0,
        };
        Self {
            kind,
            icon_id,
            border,
            draw_text: false,
            draw_text_only_when_selected: false,
        }
    }

    pub fn sanitize(&mut self) {
        self.border.set_thickness(self.border.thickness);
        self.border.set_radius(self.border.radius);
        if let ItemKind::NestedRing(nested) = &mut self.kind {
            nested.set_activation_time(nested.activation_time);
        }
    }

    pub fn icon(mut self, icon_id: u32) -> Self {
        self.icon_id = icon_id;
        self
    }

    pub fn is_hq(&self) -> bool {
        matches!(self.kind, ItemKind::Item { hq: true, .. })
    }

    pub fn is_nested_ring(&self) -> bool {
        matches!(self.kind, ItemKind::NestedRing(_))
    }

    pub fn nested_ring(&self) -> Option<&NestedRing> {
        match &self.kind {
            ItemKind::NestedRing(nested) => Some(nested),
            _ => None,
        }
    }

    pub fn type_label(&self) -> &'static str {
        self.kind.type_label()
    }

    pub fn description(&self, data: &dyn GameData) -> String {
        self.kind.description(data)
    }

    pub fn is_valid(&self, data: &dyn GameData, rings: &RingList) -> bool {
        self.kind.check(data, rings).is_ok()
    }

    pub fn invalid_reason(&self, data: &dyn GameData, rings: &RingList) -> Option<InvalidReason> {
        self.kind.check(data, rings).err()
    }

    pub fn payload(&self) -> Option<ExecutePayload> {
        self.kind.payload()
    }

    /// Text shown next to the icon, if this item wants any in its current state.
    pub fn label_text(&self, data: &dyn GameData, selected: bool) -> Option<String> {
        (self.draw_text && (selected || !self.draw_text_only_when_selected))
            .then(|| self.description(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keybind::KeyBind;
    use crate::ring::{ItemSize, Ring};
    use palette::Srgba;

    fn catalog() -> StaticCatalog {
        StaticCatalog::from_toml_str(
            r#"
            [[actions]]
            id = 7
            name = "Cure"

            [[actions]]
            id = 8
            name = "Raise"
            unlocked = false

            [[items]]
            id = 4551
            name = "Potion"

            [[gear_sets]]
            id = 1
            name = "White Mage"

            [[macros]]
            id = 103
            name = "Pull"
            "#,
        )
        .unwrap()
    }

    fn rings() -> RingList {
        let mut rings = RingList::default();
        rings.push(Ring::new(
            "Heals",
            Srgba::new(1.0, 1.0, 1.0, 1.0),
            KeyBind::unbound(),
            150.0,
            ItemSize::square(40.0),
        ));
        rings
    }

    #[test]
    fn test_validity() {
        let data = catalog();
        let rings = rings();
        let cases = vec![
            (ItemKind::Action { action_id: 7 }, None),
            (
                ItemKind::Action { action_id: 99 },
                Some(InvalidReason::MissingReference {
                    kind: RefKind::Action,
                    id: 99,
                }),
            ),
            (
                ItemKind::Action { action_id: 8 },
                Some(InvalidReason::Locked {
                    kind: RefKind::Action,
                    id: 8,
                }),
            ),
            (ItemKind::Item { item_id: 4551, hq: true }, None),
            (ItemKind::GearSet { gear_set_id: 1 }, None),
            (
                ItemKind::GearSet { gear_set_id: 2 },
                Some(InvalidReason::MissingReference {
                    kind: RefKind::GearSet,
                    id: 2,
                }),
            ),
            (
                ItemKind::Macro {
                    slot: MacroSlot {
                        shared: true,
                        number: 3,
                    },
                },
                None,
            ),
            (
                ItemKind::Command {
                    command: "   ".to_string(),
                },
                Some(InvalidReason::EmptyCommand),
            ),
            (
                ItemKind::Emote {
                    command: "/wave".to_string(),
                },
                None,
            ),
            (ItemKind::NestedRing(NestedRing::new("Heals", 1.0, false)), None),
            (
                ItemKind::NestedRing(NestedRing::new("Deleted", 1.0, false)),
                Some(InvalidReason::DanglingRingReference(RingName::from("Deleted"))),
            ),
        ];

        for (kind, expected) in cases {
            let item = ActionItem::new(kind);
            assert_eq!(item.invalid_reason(&data, &rings), expected, "{item:?}");
            assert_eq!(item.is_valid(&data, &rings), expected.is_none());
        }
    }

    #[test]
    fn test_descriptions() {
        let data = catalog();
        assert_eq!(ItemKind::Action { action_id: 7 }.description(&data), "Cure");
        assert_eq!(ItemKind::Action { action_id: 5 }.description(&data), "Action #5");
        assert_eq!(
            ItemKind::Item { item_id: 4551, hq: true }.description(&data),
            "Potion (HQ)"
        );
        assert_eq!(
            ItemKind::Macro {
                slot: MacroSlot {
                    shared: false,
                    number: 2
                }
            }
            .description(&data),
            "Individual macro #2"
        );
        assert_eq!(ItemKind::GearSet { gear_set_id: 9 }.type_label(), "Gear Set");
    }

    #[test]
    fn test_payloads() {
        assert_eq!(
            ItemKind::Command {
                command: " /echo hi ".to_string()
            }
            .payload(),
            Some(ExecutePayload::RunCommand {
                command: "/echo hi".to_string()
            })
        );
        assert_eq!(
            ItemKind::NestedRing(NestedRing::new("Heals", 1.0, false)).payload(),
            None
        );
    }

    #[test]
    fn test_nested_ring_defaults_and_clamps() {
        let item = ActionItem::new(ItemKind::NestedRing(NestedRing::new("Heals", 9.0, true)));
        assert_eq!(item.icon_id, DEFAULT_NESTED_ICON);
        let nested = item.nested_ring().unwrap();
        assert_eq!(nested.activation_time, MAX_ACTIVATION_TIME);

        let mut nested = nested.clone();
        nested.set_activation_time(0.0);
        assert_eq!(nested.activation_time, MIN_ACTIVATION_TIME);
    }

    #[test]
    fn test_item_serde_shape() {
        let item = ActionItem::new(ItemKind::Item {
            item_id: 4551,
            hq: true,
        })
        .icon(20601);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "Item");
        assert_eq!(json["item_id"], 4551);
        assert_eq!(json["icon_id"], 20601);

        let back: ActionItem = serde_json::from_value(json).unwrap();
        assert_eq!(back, item);
        assert!(back.is_hq());
    }

    #[test]
    fn test_label_text() {
        let data = catalog();
        let mut item = ActionItem::new(ItemKind::Action { action_id: 7 });
        assert_eq!(item.label_text(&data, true), None);

        item.draw_text = true;
        item.draw_text_only_when_selected = true;
        assert_eq!(item.label_text(&data, false), None);
        assert_eq!(item.label_text(&data, true).as_deref(), Some("Cure"));
    }
}
