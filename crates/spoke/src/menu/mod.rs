use serde::{Deserialize, Serialize};

pub mod model;
pub mod view;

pub use model::{Session, sector_index};
pub use view::{DrawRequest, ItemVisual, draw_requests};

pub const DEFAULT_DEAD_ZONE_RADIUS: f32 = 40.0; // no selection inside this distance
pub const MAX_NESTING_DEPTH: usize = 8; // root plus nested children
pub const ICON_INACTIVE_ALPHA: f32 = 0.6;
pub const HOVERED_ICON_SCALE: f32 = 1.25;
pub const GUIDE_LINE_THICKNESS: f32 = 4.0;
pub const PROGRESS_RING_WIDTH: f32 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Screen angle from `self` to `other`: 0 points right, growing clockwise
    /// because screen y grows downward.
    pub fn angle_to(&self, other: Point) -> f32 {
        (other.y - self.y).atan2(other.x - self.x)
    }

    pub fn offset(&self, angle: f32, distance: f32) -> Point {
        Point::new(
            self.x + distance * angle.cos(),
            self.y + distance * angle.sin(),
        )
    }
}
