//! Optional debug overlay.
//!
//! The overlay turns a snapshot into draw commands for a [`VisualSink`]. It
//! owns a small squad colour cache; nothing in the decision path reads it.

use std::collections::VecDeque;

use crate::components::{BehaviorState, SquadId};
use crate::math::{Fixed, TilePos};
use crate::snapshot::WorldSnapshot;

/// Number of squad colours remembered before the oldest is evicted.
pub const COLOR_CACHE_SIZE: usize = 16;

/// RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
}

impl Color {
    /// Build a colour from a `0xRRGGBB` value.
    #[must_use]
    pub const fn from_rgb(rgb: u32) -> Self {
        Self {
            r: ((rgb >> 16) & 0xff) as u8,
            g: ((rgb >> 8) & 0xff) as u8,
            b: (rgb & 0xff) as u8,
        }
    }
}

const OWN_BASE: Color = Color::from_rgb(0x00_ff_00);
const ENEMY_BASE: Color = Color::from_rgb(0xff_00_00);
const GATHERING: Color = Color::from_rgb(0x21_65_35);
const ATTACKING: Color = Color::from_rgb(0x65_21_21);
const GUARDING: Color = Color::from_rgb(0x21_35_65);

const PALETTE: [Color; 8] = [
    Color::from_rgb(0xe6_19_4b),
    Color::from_rgb(0x3c_b4_4b),
    Color::from_rgb(0xff_e1_19),
    Color::from_rgb(0x43_63_d8),
    Color::from_rgb(0xf5_82_31),
    Color::from_rgb(0x91_1e_b4),
    Color::from_rgb(0x42_d4_f4),
    Color::from_rgb(0xf0_32_e6),
];

/// A primitive for the rendering surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCommand {
    /// Filled circle centred on a tile.
    Circle {
        /// Centre.
        at: TilePos,
        /// Radius in tiles.
        radius: Fixed,
        /// Fill colour.
        fill: Color,
        /// Opacity in percent.
        opacity: u8,
    },
    /// Straight line between two tiles.
    Line {
        /// Start.
        from: TilePos,
        /// End.
        to: TilePos,
        /// Stroke colour.
        color: Color,
    },
}

/// Receiver of draw commands.
pub trait VisualSink {
    /// Draw one primitive.
    fn draw(&mut self, command: DrawCommand);
}

impl VisualSink for Vec<DrawCommand> {
    fn draw(&mut self, command: DrawCommand) {
        self.push(command);
    }
}

/// Renders snapshots.
#[derive(Debug, Clone, Default)]
pub struct Overlay {
    colors: VecDeque<(SquadId, Color)>,
}

impl Overlay {
    /// Create an overlay with an empty colour cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Colour of a squad, cached.
    pub fn squad_color(&mut self, squad: SquadId) -> Color {
        if let Some((_, color)) = self.colors.iter().find(|(id, _)| *id == squad) {
            return *color;
        }
        let index = usize::try_from(squad.0 % PALETTE.len() as u64).unwrap_or(0);
        let color = PALETTE[index];
        if self.colors.len() == COLOR_CACHE_SIZE {
            self.colors.pop_front();
        }
        self.colors.push_back((squad, color));
        color
    }

    /// Number of cached squad colours.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.colors.len()
    }

    /// Draw bases, units and leader target lines.
    pub fn render(&mut self, snapshot: &WorldSnapshot, sink: &mut dyn VisualSink) {
        let base_radius = Fixed::from_num(1);
        let unit_radius = Fixed::from_num(0.5);

        if let Some(base) = snapshot.own_base {
            sink.draw(DrawCommand::Circle {
                at: base.structure.position,
                radius: base_radius,
                fill: OWN_BASE,
                opacity: 50,
            });
        }
        if let Some(base) = snapshot.enemy_base {
            sink.draw(DrawCommand::Circle {
                at: base.position,
                radius: base_radius,
                fill: ENEMY_BASE,
                opacity: 50,
            });
        }

        for unit in &snapshot.own_units {
            let memory = &unit.memory;
            let fill = match memory.squad() {
                Some(squad) => self.squad_color(squad),
                None => match memory.state {
                    BehaviorState::Gathering => GATHERING,
                    BehaviorState::Attacking => ATTACKING,
                    BehaviorState::Guarding => GUARDING,
                },
            };
            let opacity = if memory.is_leader() { 80 } else { 50 };
            sink.draw(DrawCommand::Circle {
                at: unit.position,
                radius: unit_radius,
                fill,
                opacity,
            });

            if memory.is_leader() {
                if let Some(target) = memory.target.and_then(|id| snapshot.target(id)) {
                    sink.draw(DrawCommand::Line {
                        from: unit.position,
                        to: target.position,
                        color: fill,
                    });
                }
            }
        }
    }
}
