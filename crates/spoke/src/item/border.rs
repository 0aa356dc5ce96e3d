use palette::Srgb;
use serde::{Deserialize, Serialize};

pub const MAX_THICKNESS: u32 = 10;
pub const MAX_RADIUS: u32 = 500;

/// Cosmetic frame drawn around an item's icon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemBorder {
    pub color: Srgb<f32>,
    pub thickness: u32,
    pub radius: u32,
}

impl ItemBorder {
    pub fn new(color: Srgb<f32>, thickness: u32, radius: u32) -> Self {
        Self {
            color,
            thickness: thickness.min(MAX_THICKNESS),
            radius: radius.min(MAX_RADIUS),
        }
    }

    pub fn set_thickness(&mut self, thickness: u32) {
        self.thickness = thickness.min(MAX_THICKNESS);
    }

    pub fn set_radius(&mut self, radius: u32) {
        self.radius = radius.min(MAX_RADIUS);
    }
}

impl Default for ItemBorder {
    fn default() -> Self {
        Self::new(Srgb::new(0.0, 0.0, 0.0), 3, 2)
    }
}
