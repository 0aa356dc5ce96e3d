use super::model::{item_angle, item_position, sector_width};
use super::{
    GUIDE_LINE_THICKNESS, HOVERED_ICON_SCALE, ICON_INACTIVE_ALPHA, PROGRESS_RING_WIDTH, Point,
};
use crate::engine::Engine;
use crate::item::{ActionItem, GameData, ItemBorder};
use crate::ring::{ItemSize, Ring};
use palette::Srgba;

/// One primitive for the host renderer. The engine never draws itself.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawRequest {
    CenterCircle {
        center: Point,
        radius: f32,
        color: Srgba<f32>,
    },
    SelectionWedge {
        center: Point,
        radius: f32,
        start_angle: f32,
        end_angle: f32,
        color: Srgba<f32>,
    },
    GuideLine {
        from: Point,
        to: Point,
        thickness: f32,
        color: Srgba<f32>,
    },
    Icon {
        index: usize,
        icon_id: u32,
        hq: bool,
        center: Point,
        size: ItemSize,
        alpha: f32,
        border: ItemBorder,
        visual: ItemVisual,
    },
    Label {
        text: String,
        position: Point,
    },
    Tooltip {
        text: String,
        position: Point,
    },
    NestedProgress {
        center: Point,
        radius: f32,
        ratio: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemVisual {
    Invalid,
    Hovered,
    Idle,
}

impl ItemVisual {
    /// Broken references win over hover so the user sees why nothing will happen.
    fn resolve(valid: bool, hovered: bool) -> Self {
        if !valid {
            Self::Invalid
        } else if hovered {
            Self::Hovered
        } else {
            Self::Idle
        }
    }

    fn alpha(&self) -> f32 {
        match self {
            Self::Invalid => ICON_INACTIVE_ALPHA,
            Self::Hovered | Self::Idle => 1.0,
        }
    }

    fn scale(&self) -> f32 {
        match self {
            Self::Hovered => HOVERED_ICON_SCALE,
            Self::Invalid | Self::Idle => 1.0,
        }
    }
}

struct ItemRenderer<'a> {
    ring: &'a Ring,
    item: &'a ActionItem,
    index: usize,
    center: Point,
    hovered: bool,
    valid: bool,
    animate: bool,
}

impl ItemRenderer<'_> {
    fn draw(&self, data: &dyn GameData, out: &mut Vec<DrawRequest>) {
        let visual = ItemVisual::resolve(self.valid, self.hovered);
        let position = item_position(self.ring, self.center, self.index);
        let scale = if self.animate { visual.scale() } else { 1.0 };

        out.push(DrawRequest::Icon {
            index: self.index,
            icon_id: self.item.icon_id,
            hq: self.item.is_hq(),
            center: position,
            size: ItemSize {
                width: self.ring.item_size.width * scale,
                height: self.ring.item_size.height * scale,
            },
            alpha: visual.alpha(),
            border: self.item.border,
            visual,
        });

        if let Some(text) = self.item.label_text(data, self.hovered) {
            out.push(DrawRequest::Label { text, position });
        }
    }
}

/// Draw list for the topmost open session, or nothing when closed.
pub fn draw_requests(engine: &Engine, data: &dyn GameData) -> Vec<DrawRequest> {
    let mut out = Vec::new();
    let (Some(session), Some(ring)) = (engine.top_session(), engine.active_ring()) else {
        return out;
    };
    let center = session.center;
    let settings = engine.settings();

    if settings.draw_ring_background {
        out.push(DrawRequest::CenterCircle {
            center,
            radius: settings.dead_zone_radius,
            color: ring.color,
        });
    }

    if let Some(hovered) = session.hovered {
        let angle = item_angle(ring, hovered);
        let half = sector_width(ring.items.len()) / 2.0;

        if ring.draw_selection_background {
            out.push(DrawRequest::SelectionWedge {
                center,
                radius: ring.radius,
                start_angle: angle - half,
                end_angle: angle + half,
                color: ring.color,
            });
        }
        if ring.draw_line {
            out.push(DrawRequest::GuideLine {
                from: center,
                to: item_position(ring, center, hovered),
                thickness: GUIDE_LINE_THICKNESS,
                color: ring.color,
            });
        }
    }

    for (index, item) in ring.items.iter().enumerate() {
        ItemRenderer {
            ring,
            item,
            index,
            center,
            hovered: session.hovered == Some(index),
            valid: item.is_valid(data, engine.rings()),
            animate: settings.animate_icon_sizes,
        }
        .draw(data, &mut out);
    }

    if let Some(ratio) = engine.nested_progress() {
        out.push(DrawRequest::NestedProgress {
            center,
            radius: settings.dead_zone_radius + PROGRESS_RING_WIDTH,
            ratio,
        });
    }

    if ring.show_tooltips
        && let Some(hovered) = session.hovered
        && let Some(item) = ring.items.get(hovered)
    {
        let position = item_position(ring, center, hovered);
        out.push(DrawRequest::Tooltip {
            text: item
                .invalid_reason(data, engine.rings())
                .map(|reason| reason.to_string())
                .unwrap_or_else(|| item.description(data)),
            position: Point::new(position.x, position.y + ring.item_size.height),
        });
    }

    out
}
