//! Text frame the demo tools draw into.

use glam::DVec3;
use serde::Serialize;
use std::fmt;

/// View options tools may adjust before a frame is drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenderOptions {
    pub show_grid: bool,
}

/// Something a tool asked to draw.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Primitive {
    Handle { position: DVec3, highlighted: bool },
    /// Line from the drag anchor to the current handle position.
    Guide { from: DVec3, to: DVec3 },
    Circle { center: DVec3, radius: f64 },
}

/// Primitives collected for one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Frame {
    pub options: RenderOptions,
    pub primitives: Vec<Primitive>,
}

impl Frame {
    pub fn push(&mut self, primitive: Primitive) {
        self.primitives.push(primitive);
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "frame (grid {})", if self.options.show_grid { "on" } else { "off" })?;
        for primitive in &self.primitives {
            match primitive {
                Primitive::Handle { position, highlighted } => {
                    let marker = if *highlighted { "*" } else { "o" };
                    writeln!(f, "  {marker} {:.1} {:.1} {:.1}", position.x, position.y, position.z)?;
                }
                Primitive::Guide { from, to } => {
                    writeln!(f, "  - {:.1} {:.1} -> {:.1} {:.1}", from.x, from.y, to.x, to.y)?;
                }
                Primitive::Circle { center, radius } => {
                    writeln!(f, "  ( {:.1} {:.1} r {:.1} )", center.x, center.y, radius)?;
                }
            }
        }
        Ok(())
    }
}
