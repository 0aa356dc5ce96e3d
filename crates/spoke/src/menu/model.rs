use super::Point;
use crate::ring::Ring;
use std::f32::consts::TAU;
use std::time::Duration;

/// Sector containing `angle` when the circle is split into `count` equal
/// sectors with sector 0 starting at `rotation` (both in radians).
pub fn sector_index(angle: f32, rotation: f32, count: usize) -> Option<usize> {
    if count == 0 {
        return None;
    }
    let width = TAU / count as f32;
    let normalized = (angle - rotation).rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    Some(((normalized / width) as usize).min(count - 1))
}

pub fn sector_width(count: usize) -> f32 {
    if count == 0 { TAU } else { TAU / count as f32 }
}

/// Screen angle of an item's sector midpoint, in radians.
pub fn item_angle(ring: &Ring, index: usize) -> f32 {
    ring.rotation.to_radians() + (index as f32 + 0.5) * sector_width(ring.items.len())
}

pub fn item_position(ring: &Ring, center: Point, index: usize) -> Point {
    center.offset(item_angle(ring, index), ring.radius)
}

/// Runtime state of one open ring.
///
/// Sessions are stacked by the engine: the topmost one receives cursor input,
/// the ones below it are suspended parents of nested rings.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub ring: usize,
    pub center: Point,
    pub hovered: Option<usize>,
    hover_elapsed: Duration,
    /// Nested item that already opened its child; it stays inert until hover leaves it.
    spent: Option<usize>,
}

impl Session {
    pub fn new(ring: usize, center: Point) -> Self {
        Self {
            ring,
            center,
            hovered: None,
            hover_elapsed: Duration::ZERO,
            spent: None,
        }
    }

    /// Recomputes the hovered sector. Returns whether it changed.
    pub fn update_cursor(&mut self, ring: &Ring, cursor: Point, dead_zone: f32) -> bool {
        let new_idx = if self.center.distance_to(cursor) <= dead_zone {
            None
        } else {
            sector_index(
                self.center.angle_to(cursor),
                ring.rotation.to_radians(),
                ring.items.len(),
            )
        };

        let changed = self.hovered != new_idx;
        if changed {
            self.hovered = new_idx;
            self.hover_elapsed = Duration::ZERO;
            if self.spent != new_idx {
                self.spent = None;
            }
        }
        changed
    }

    /// Accumulates hover time on a nested item and reports when it reaches
    /// `activation`. Fires once per continuous hover.
    pub fn advance_nested_hover(&mut self, delta: Duration, activation: Duration) -> bool {
        let Some(hovered) = self.hovered else {
            return false;
        };
        if self.spent == Some(hovered) {
            return false;
        }

        self.hover_elapsed += delta;
        if self.hover_elapsed >= activation {
            self.spent = Some(hovered);
            self.hover_elapsed = Duration::ZERO;
            true
        } else {
            false
        }
    }

    /// Marks the hovered nested item as already opened, e.g. after a click.
    pub fn mark_spent(&mut self) {
        self.spent = self.hovered;
        self.hover_elapsed = Duration::ZERO;
    }

    pub fn is_spent(&self, index: usize) -> bool {
        self.spent == Some(index)
    }

    pub fn reset_hover_timer(&mut self) {
        self.hover_elapsed = Duration::ZERO;
    }

    /// Parent resumes after a child closes: no hover, timer at zero.
    pub fn clear_hover(&mut self) {
        self.hovered = None;
        self.hover_elapsed = Duration::ZERO;
    }

    pub fn hover_elapsed(&self) -> Duration {
        self.hover_elapsed
    }

    pub fn hover_progress(&self, activation: Duration) -> f32 {
        if activation.is_zero() {
            return 1.0;
        }
        (self.hover_elapsed.as_secs_f32() / activation.as_secs_f32()).clamp(0.0, 1.0)
    }
}
