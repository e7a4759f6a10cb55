//! Draw primitives handed to the 2D surface

use glam::Vec2;
use serde::Serialize;

use crate::session::{ComboText, SessionPhase};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Color {
    /// CSS hex string from a palette
    Hex(&'static str),
    Hsla { h: f32, s: f32, l: f32, a: f32 },
    Rgba { r: u8, g: u8, b: u8, a: f32 },
    Transparent,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Fill {
    Solid(Color),
    /// Two-stop radial gradient from the shape center out to `radius`
    Radial { inner: Color, outer: Color, radius: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outline {
    Circle,
    Square,
    Triangle,
    /// 2:1 rectangle
    Rectangle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Primitive {
    /// Stroked arc, angles in radians
    Arc {
        center: Vec2,
        radius: f32,
        start: f32,
        end: f32,
        width: f32,
        color: Color,
    },
    /// Filled outline; `extent` is the full width of the shape
    Shape {
        outline: Outline,
        center: Vec2,
        extent: f32,
        rotation: f32,
        fill: Fill,
        alpha: f32,
        /// Shadow blur radius, 0 for none
        glow: f32,
    },
    /// Disc cleared back to the background
    Void { center: Vec2, radius: f32 },
}

/// Numbers shown around the play area
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hud {
    pub phase: SessionPhase,
    pub countdown: Option<&'static str>,
    pub score: u64,
    pub level: u32,
    pub progress_fraction: f32,
    pub remaining_secs: u32,
    pub ultimate_meter: u32,
    pub ultimate_ready: bool,
    pub show_level_up: bool,
    pub currency: u64,
}

/// Everything needed to draw one frame, back to front
#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    pub width: f32,
    pub height: f32,
    /// Translucent wash drawn over the previous frame (motion trails)
    pub wash: Color,
    pub primitives: Vec<Primitive>,
    pub combo_text: Option<ComboText>,
    pub hud: Hud,
}
