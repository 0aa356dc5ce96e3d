//! Configuration checks surfaced to the editor. Nothing here repairs the
//! configuration: conflicts and broken references are reported, and the user
//! decides what to change.

use crate::item::{GameData, InvalidReason};
use crate::keybind::KeyCombo;
use crate::ring::{RingList, RingName};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("Ring '{ring_name}' uses {combo}, which is already bound by ring '{other_name}'")]
    KeyBindConflict {
        ring: usize,
        ring_name: RingName,
        other: usize,
        other_name: RingName,
        combo: KeyCombo,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Ring '{ring_name}' item {index}: {reason}")]
pub struct InvalidItemReference {
    pub ring: usize,
    pub ring_name: RingName,
    pub index: usize,
    pub reason: InvalidReason,
}

/// Checks one ring's bind against every other ring, as run after editing it.
pub fn validate_key_bind(rings: &RingList, index: usize) -> Result<(), ConfigValidationError> {
    let Some(ring) = rings.get(index) else {
        return Ok(());
    };
    let Some(combo) = ring.key_bind.combo else {
        return Ok(());
    };

    match rings
        .iter()
        .enumerate()
        .find(|(i, other)| *i != index && ring.key_bind.conflicts_with(&other.key_bind))
    {
        Some((other, other_ring)) => Err(ConfigValidationError::KeyBindConflict {
            ring: index,
            ring_name: ring.name.clone(),
            other,
            other_name: other_ring.name.clone(),
            combo,
        }),
        None => Ok(()),
    }
}

/// Flags every ring whose bind collides with an earlier ring's. The earlier
/// ring keeps priority during matching, so only the later one is reported.
pub fn validate_key_binds(rings: &RingList) -> Vec<ConfigValidationError> {
    rings
        .iter()
        .enumerate()
        .filter_map(|(index, ring)| {
            let combo = ring.key_bind.combo?;
            rings[..index]
                .iter()
                .enumerate()
                .find(|(_, earlier)| earlier.key_bind.conflicts_with(&ring.key_bind))
                .map(|(other, earlier)| ConfigValidationError::KeyBindConflict {
                    ring: index,
                    ring_name: ring.name.clone(),
                    other,
                    other_name: earlier.name.clone(),
                    combo,
                })
        })
        .collect()
}

pub fn validate_items(rings: &RingList, data: &dyn GameData) -> Vec<InvalidItemReference> {
    rings
        .iter()
        .enumerate()
        .flat_map(|(ring_index, ring)| {
            ring.items.iter().enumerate().filter_map(move |(index, item)| {
                item.kind
                    .check(data, rings)
                    .err()
                    .map(|reason| InvalidItemReference {
                        ring: ring_index,
                        ring_name: ring.name.clone(),
                        index,
                        reason,
                    })
            })
        })
        .collect()
}
