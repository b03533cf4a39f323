//! Tool modes and the per-session editing state they own.

mod machine;

pub use machine::{ModeTransition, ToolController, ToolError, ToolResult};

use serde::{Deserialize, Serialize};

use crate::geometry::{Color, Size};
use crate::scene::ObjectId;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ToolMode {
    #[default]
    Select,
    Draw,
    Crop,
    TextEdit(ObjectId),
}

impl ToolMode {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Draw => "draw",
            Self::Crop => "crop",
            Self::TextEdit(_) => "text",
        }
    }

    pub const fn suppresses_object_pointer(&self) -> bool {
        matches!(self, Self::Draw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolEvent {
    EnterSelect,
    EnterDraw,
    EnterCrop,
    ConfirmCrop,
    CancelCrop,
    BeginTextEdit(ObjectId),
    EndTextEdit,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomLimits {
    pub step: f64,
    pub min: f64,
    pub max: f64,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            step: 1.2,
            min: 0.1,
            max: 5.0,
        }
    }
}

/// Editing preferences that outlive any single mode: current colors, brush,
/// zoom and canvas size.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub text_color: Color,
    pub draw_color: Color,
    pub shadow_color: Color,
    pub border_color: Color,
    pub brush_width: f64,
    pub canvas: Size,
    zoom: f64,
    zoom_limits: ZoomLimits,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(Size::new(800.0, 600.0), 3.0, ZoomLimits::default())
    }
}

impl SessionState {
    pub fn new(canvas: Size, brush_width: f64, zoom_limits: ZoomLimits) -> Self {
        Self {
            text_color: Color::BLACK,
            draw_color: Color::BLACK,
            shadow_color: Color::BLACK,
            border_color: Color::BLACK,
            brush_width,
            canvas,
            zoom: 1.0,
            zoom_limits,
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn zoom_percent(&self) -> u32 {
        (self.zoom * 100.0).round() as u32
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.zoom = (self.zoom * self.zoom_limits.step).min(self.zoom_limits.max);
        self.zoom
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.zoom = (self.zoom / self.zoom_limits.step).max(self.zoom_limits.min);
        self.zoom
    }

    pub fn reset_zoom(&mut self) {
        self.zoom = 1.0;
    }
}
