use serde::Deserialize;

use super::{Editor, EditorError, EditorResult};
use crate::geometry::Color;
use crate::scene::{
    ObjectKind, RasterSource, SceneGraph, SceneObject, Shadow, StrokeDash, TextAlign, TextScript,
};
use crate::tools::SessionState;

const SHADOW_OFFSET: f64 = 3.0;
const DEFAULT_SHADOW_BLUR: u32 = 3;
const LINE_HEIGHT_STEPS: [f64; 3] = [1.2, 1.5, 2.0];
const CHAR_SPACING_STEPS: [i32; 3] = [0, 50, 100];

/// One formatting change applied to the selected object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "change", content = "value", rename_all = "snake_case")]
pub enum StyleChange {
    TextColor(Color),
    FontSize(f64),
    FontFamily(String),
    ToggleBold,
    ToggleItalic,
    ToggleUnderline,
    Align(TextAlign),
    CycleLineHeight,
    CycleCharSpacing,
    /// Characters `start..end` of the selected text.
    ToggleSuperscript { start: usize, end: usize },
    ToggleSubscript { start: usize, end: usize },
    ShadowColor(Color),
    /// Zero removes the shadow.
    ShadowBlur(u32),
    BorderColor(Color),
    /// Zero removes the border.
    BorderWidth(f64),
    StrokeDash(StrokeDash),
    /// Text background, shape fill, or the canvas when nothing is selected.
    BackgroundFill(Color),
    /// Brush color for the next strokes; needs no selection.
    DrawColor(Color),
}

impl StyleChange {
    fn is_text_only(&self) -> bool {
        matches!(
            self,
            Self::TextColor(_)
                | Self::FontSize(_)
                | Self::FontFamily(_)
                | Self::ToggleBold
                | Self::ToggleItalic
                | Self::ToggleUnderline
                | Self::Align(_)
                | Self::CycleLineHeight
                | Self::CycleCharSpacing
                | Self::ToggleSuperscript { .. }
                | Self::ToggleSubscript { .. }
        )
    }

    fn script_range(&self) -> Option<(usize, usize, TextScript)> {
        match *self {
            Self::ToggleSuperscript { start, end } => Some((start, end, TextScript::Superscript)),
            Self::ToggleSubscript { start, end } => Some((start, end, TextScript::Subscript)),
            _ => None,
        }
    }

    /// Colors picked in the palette become the session's current colors even
    /// when nothing is selected.
    fn remember_in(&self, session: &mut SessionState) {
        match self {
            Self::TextColor(color) => session.text_color = *color,
            Self::ShadowColor(color) => session.shadow_color = *color,
            Self::BorderColor(color) => session.border_color = *color,
            Self::DrawColor(color) => session.draw_color = *color,
            _ => {}
        }
    }
}

fn next_line_height(current: f64) -> f64 {
    let index = LINE_HEIGHT_STEPS
        .iter()
        .position(|step| (step - current).abs() < 1e-6);
    match index {
        Some(index) => LINE_HEIGHT_STEPS[(index + 1) % LINE_HEIGHT_STEPS.len()],
        None => LINE_HEIGHT_STEPS[0],
    }
}

fn next_char_spacing(current: i32) -> i32 {
    match CHAR_SPACING_STEPS.iter().position(|step| *step == current) {
        Some(index) => CHAR_SPACING_STEPS[(index + 1) % CHAR_SPACING_STEPS.len()],
        None => CHAR_SPACING_STEPS[0],
    }
}

fn apply_change(object: &mut SceneObject, change: &StyleChange, session: &SessionState) {
    let mut line_box = None;
    if let Some(text) = object.as_text_mut() {
        match change {
            StyleChange::FontSize(size) => text.font_size = *size,
            StyleChange::FontFamily(family) => text.font_family = family.clone(),
            StyleChange::ToggleBold => text.bold = !text.bold,
            StyleChange::ToggleItalic => text.italic = !text.italic,
            StyleChange::ToggleUnderline => text.underline = !text.underline,
            StyleChange::Align(align) => text.align = *align,
            StyleChange::CycleLineHeight => text.line_height = next_line_height(text.line_height),
            StyleChange::CycleCharSpacing => {
                text.char_spacing = next_char_spacing(text.char_spacing)
            }
            StyleChange::BackgroundFill(color) => {
                text.background = Some(*color);
                return;
            }
            _ => {
                if let Some((start, end, script)) = change.script_range() {
                    text.toggle_script(start, end, script);
                }
            }
        }
        line_box = Some(text.font_size * text.line_height);
    }
    if let Some(height) = line_box {
        object.height = height;
    }

    let style = &mut object.style;
    match change {
        StyleChange::TextColor(color) | StyleChange::BackgroundFill(color) => {
            style.fill = Some(*color)
        }
        StyleChange::ShadowColor(color) => {
            let blur = style.shadow.map_or(DEFAULT_SHADOW_BLUR, |shadow| shadow.blur);
            style.shadow = Some(Shadow {
                color: *color,
                blur,
                offset_x: SHADOW_OFFSET,
                offset_y: SHADOW_OFFSET,
            });
        }
        StyleChange::ShadowBlur(0) => style.shadow = None,
        StyleChange::ShadowBlur(blur) => {
            style.shadow = Some(Shadow {
                color: session.shadow_color,
                blur: *blur,
                offset_x: SHADOW_OFFSET,
                offset_y: SHADOW_OFFSET,
            });
        }
        StyleChange::BorderColor(color) => style.stroke = Some(*color),
        StyleChange::BorderWidth(width) => {
            let width = width.max(0.0);
            style.stroke_width = width;
            if width == 0.0 {
                style.stroke = None;
            } else if style.stroke.is_none() {
                style.stroke = Some(session.border_color);
            }
        }
        StyleChange::StrokeDash(dash) => style.stroke_dash = *dash,
        _ => {}
    }
}

impl<S: SceneGraph + RasterSource> Editor<S> {
    /// Applies `change` to the selection and records it. Returns `Ok(false)`
    /// when there is nothing it applies to.
    pub fn apply_style(&mut self, change: StyleChange) -> EditorResult<bool> {
        let result = self.try_apply_style(change);
        self.surface(result)
    }

    fn try_apply_style(&mut self, change: StyleChange) -> EditorResult<bool> {
        change.remember_in(self.tools.session_mut());
        if matches!(change, StyleChange::DrawColor(_)) {
            return Ok(true);
        }

        let target = self
            .scene
            .active_object()
            .filter(|object| {
                let is_overlay = self.crop.as_ref().is_some_and(|session| {
                    object.id.as_ref().is_some_and(|id| session.involves(id))
                });
                !is_overlay
            })
            .map(|object| (object.id.clone(), object.kind()));

        let Some((Some(id), kind)) = target else {
            if let StyleChange::BackgroundFill(color) = change {
                self.scene.set_background(color);
                self.scene.request_render();
                self.commit()?;
                return Ok(true);
            }
            tracing::debug!(?change, "style change without a selection");
            return Ok(false);
        };

        if change.is_text_only() && kind != ObjectKind::Text {
            tracing::debug!(?change, ?kind, "text style ignored for non-text selection");
            return Ok(false);
        }
        if let Some((start, end, _)) = change.script_range() {
            let covers_text = self
                .scene
                .find(&id)
                .and_then(SceneObject::as_text)
                .is_some_and(|text| start < end.min(text.text.chars().count()));
            if !covers_text {
                tracing::debug!(?change, "script toggle without selected characters");
                return Ok(false);
            }
        }
        if matches!(change, StyleChange::BackgroundFill(_)) && kind == ObjectKind::Image {
            return Err(EditorError::InvalidTarget(
                "background fill is not supported for images",
            ));
        }

        let session = self.tools.session().clone();
        self.scene
            .modify(&id, &mut |object| apply_change(object, &change, &session));
        self.scene.request_render();
        self.pump_events()?;
        Ok(true)
    }
}
