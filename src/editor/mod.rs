//! Editing session orchestration.
//!
//! [`Editor`] owns the scene collaborator together with the history, the
//! layer index and the tool controller, and keeps them consistent: every
//! operation mutates the scene, pumps the scene's events through one
//! subscription table, and records at most one snapshot for the batch.

mod events;
mod group;
mod insert;
mod style;

use thiserror::Error;

pub use insert::ShapePreset;
pub use style::StyleChange;

use events::{EventContext, EventTable};

use crate::config::EditorConfig;
use crate::crop::{self, CropError, CropSession};
use crate::generation::GenerationError;
use crate::geometry::{Point, Size};
use crate::history::{
    HistoryAvailability, HistoryError, HistoryManager, HistoryStep, Recording,
};
use crate::input::{resolve_shortcut, InputContext, ShortcutAction, ShortcutKey, ShortcutModifiers};
use crate::layers::{DropPlacement, Layer, LayerError, LayerIndex};
use crate::notification::Notifier;
use crate::scene::{
    Interactivity, ObjectId, ObjectKind, RasterSource, SceneError, SceneGraph, SceneObject,
};
use crate::tools::{SessionState, ToolController, ToolError, ToolEvent, ToolMode};

/// How a rejected operation is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Shown to the user; nothing was mutated.
    InvalidTarget,
    /// Logged only; nothing was mutated.
    DegenerateGeometry,
    /// Shown to the user; no retry and no partial mutation.
    CollaboratorFailure,
}

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("{0}")]
    InvalidTarget(&'static str),
    #[error(transparent)]
    Crop(#[from] CropError),
    #[error(transparent)]
    Layer(#[from] LayerError),
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl EditorError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Crop(CropError::DegenerateGeometry) => ErrorClass::DegenerateGeometry,
            Self::InvalidTarget(_)
            | Self::Crop(_)
            | Self::Layer(_)
            | Self::Tool(_)
            | Self::Generation(
                GenerationError::NoKeywords
                | GenerationError::TooManyImages { .. }
                | GenerationError::InvalidSize(_),
            ) => ErrorClass::InvalidTarget,
            Self::History(_) | Self::Scene(_) | Self::Generation(_) => {
                ErrorClass::CollaboratorFailure
            }
        }
    }

    pub fn is_user_visible(&self) -> bool {
        self.class() != ErrorClass::DegenerateGeometry
    }
}

pub type EditorResult<T> = std::result::Result<T, EditorError>;

const CROP_HINT: &str = "move or resize the crop area, then press Enter to crop or Esc to cancel";

pub struct Editor<S> {
    scene: S,
    history: HistoryManager,
    layers: LayerIndex,
    tools: ToolController,
    crop: Option<CropSession>,
    events: EventTable,
    notifier: Box<dyn Notifier>,
    config: EditorConfig,
    unsaved: bool,
}

impl<S: SceneGraph + RasterSource> Editor<S> {
    /// Wraps `scene` and records its current content as snapshot 0.
    pub fn new(scene: S, config: EditorConfig, notifier: Box<dyn Notifier>) -> EditorResult<Self> {
        let mut editor = Self {
            scene,
            history: HistoryManager::new(config.history_limit),
            layers: LayerIndex::new(),
            tools: ToolController::new(config.session_state()),
            crop: None,
            events: EventTable::install(),
            notifier,
            config,
            unsaved: false,
        };
        editor.init()?;
        Ok(editor)
    }

    fn init(&mut self) -> EditorResult<()> {
        let pending = self.scene.drain_events();
        if !pending.is_empty() {
            tracing::debug!(count = pending.len(), "discarding events raised before init");
        }
        self.layers.generate_layers(&mut self.scene);
        self.history.init(&self.scene)?;
        tracing::info!(
            objects = self.scene.objects().len(),
            history_limit = self.history.log().capacity(),
            "editor initialized"
        );
        Ok(())
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    /// Direct access for hosts that forward pointer gestures to the scene.
    /// Call [`Editor::pump_events`] afterwards so the changes are committed.
    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn layers(&self) -> &[Layer] {
        self.layers.layers()
    }

    pub fn mode(&self) -> &ToolMode {
        self.tools.mode()
    }

    pub fn session(&self) -> &SessionState {
        self.tools.session()
    }

    pub fn crop_session(&self) -> Option<&CropSession> {
        self.crop.as_ref()
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn history_availability(&self) -> HistoryAvailability {
        self.history.availability()
    }

    /// Whether anything was committed since the editor opened or was last
    /// marked saved; hosts use it to warn before navigating away.
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    pub fn mark_saved(&mut self) {
        self.unsaved = false;
    }

    pub fn input_context(&self) -> InputContext {
        InputContext {
            text_input_active: matches!(self.tools.mode(), ToolMode::TextEdit(_)),
            crop_active: self.crop.is_some(),
            draw_active: self.tools.is_drawing(),
        }
    }

    /// Routes pending scene events through the subscription table and
    /// records one snapshot if any of them was a committed mutation.
    pub fn pump_events(&mut self) -> EditorResult<bool> {
        let events = self.scene.drain_events();
        if events.is_empty() {
            return Ok(false);
        }
        let mut context = EventContext::new(self.tools.mode(), self.crop.as_ref());
        for event in &events {
            self.events.dispatch(&mut context, event);
        }
        let reactions = context.into_reactions();

        if let Some(id) = reactions.editing_entered {
            if let Err(err) = self.tools.transition(ToolEvent::BeginTextEdit(id.clone())) {
                tracing::warn!(%id, %err, "text editing started outside select mode");
            }
        }
        if let Some(id) = reactions.editing_exited {
            if self.tools.mode() == &ToolMode::TextEdit(id) {
                self.tools.transition(ToolEvent::EndTextEdit)?;
            }
        }
        if reactions.object_added && self.tools.mode().suppresses_object_pointer() {
            self.tools.apply_interactivity(&mut self.scene);
        }
        let recording = if reactions.commit {
            Some(Recording::Always)
        } else if reactions.commit_if_changed {
            Some(Recording::IfChanged)
        } else {
            None
        };
        if reactions.refresh_layers || recording.is_some() {
            self.layers.generate_layers(&mut self.scene);
        }
        match recording {
            Some(recording) => self.record(recording),
            None => Ok(false),
        }
    }

    fn commit(&mut self) -> EditorResult<()> {
        self.record(Recording::Always).map(|_| ())
    }

    /// Records the scene minus any open crop overlay, then releases assets
    /// that fell out of history.
    fn record(&mut self, recording: Recording) -> EditorResult<bool> {
        let overlay = self.crop.as_ref().map(|session| &session.overlay_rect_id);
        let recorded = self
            .history
            .record_state_with(&self.scene, overlay, recording)?;
        if recorded {
            self.unsaved = true;
        }
        if self.history.take_dropped() {
            self.release_unreferenced_assets();
        }
        Ok(recorded)
    }

    fn release_unreferenced_assets(&mut self) {
        let snapshots: Vec<_> = self.history.log().snapshots().collect();
        match self.scene.release_unreferenced(&snapshots) {
            Ok(0) => {}
            Ok(released) => tracing::debug!(released, "released assets no longer in history"),
            Err(err) => tracing::warn!(%err, "failed to scan history for referenced assets"),
        }
    }

    fn surface<T>(&self, result: EditorResult<T>) -> EditorResult<T> {
        if let Err(error) = &result {
            tracing::warn!(%error, class = ?error.class(), "editor operation rejected");
            if error.is_user_visible() {
                self.notifier.notify(&error.to_string());
            }
        }
        result
    }

    fn switch_mode(&mut self, event: ToolEvent) -> EditorResult<()> {
        self.tools.transition(event)?;
        self.tools.apply_interactivity(&mut self.scene);
        self.scene.request_render();
        Ok(())
    }

    /// Tears down the crop session or text editing before another mode or a
    /// history move takes over.
    fn leave_transient_mode(&mut self) -> EditorResult<()> {
        if self.crop.is_some() {
            self.cancel_crop_session()?;
        }
        if matches!(self.tools.mode(), ToolMode::TextEdit(_)) {
            self.end_text_edit()?;
        }
        Ok(())
    }

    // History

    pub fn undo(&mut self) -> EditorResult<bool> {
        let result = self.step_history(HistoryStep::Undo);
        self.surface(result)
    }

    pub fn redo(&mut self) -> EditorResult<bool> {
        let result = self.step_history(HistoryStep::Redo);
        self.surface(result)
    }

    fn step_history(&mut self, step: HistoryStep) -> EditorResult<bool> {
        self.leave_transient_mode()?;
        if !self.history.apply(step, &mut self.scene)? {
            tracing::debug!(message = step.boundary_message(), "history boundary");
            return Ok(false);
        }
        let discarded = self.scene.drain_events();
        if !discarded.is_empty() {
            tracing::trace!(count = discarded.len(), "dropped events raised by restore");
        }
        if self.tools.mode().suppresses_object_pointer() {
            self.tools.apply_interactivity(&mut self.scene);
        }
        self.layers.generate_layers(&mut self.scene);
        self.unsaved = true;
        self.notifier.notify(step.applied_message());
        Ok(true)
    }

    // Layers

    pub fn select(&mut self, id: Option<&ObjectId>) -> EditorResult<bool> {
        if self.tools.mode() != &ToolMode::Select {
            return Ok(false);
        }
        if let Some(id) = id {
            let selectable = self
                .scene
                .find(id)
                .is_some_and(|object| object.interactivity.selectable);
            if !selectable {
                return Ok(false);
            }
        }
        self.scene.set_active(id.cloned());
        self.scene.request_render();
        self.pump_events()?;
        Ok(true)
    }

    /// Moves `dragged` next to the layer at `target_index` (display order)
    /// and records once if the order changed.
    pub fn reorder_layer(
        &mut self,
        dragged: &ObjectId,
        target_index: usize,
        placement: DropPlacement,
    ) -> EditorResult<bool> {
        let result = self.try_reorder_layer(dragged, target_index, placement);
        self.surface(result)
    }

    fn try_reorder_layer(
        &mut self,
        dragged: &ObjectId,
        target_index: usize,
        placement: DropPlacement,
    ) -> EditorResult<bool> {
        if self.crop.is_some() {
            self.cancel_crop_session()?;
        }
        let moved = self
            .layers
            .reorder(&mut self.scene, dragged, target_index, placement)?;
        self.pump_events()?;
        if moved {
            self.commit()?;
        }
        Ok(moved)
    }

    /// Drop handler for the layer list: the pointer position within the
    /// hovered row decides between before and after.
    pub fn drop_layer(
        &mut self,
        dragged: &ObjectId,
        target_index: usize,
        pointer_y: f64,
        row_top: f64,
        row_height: f64,
    ) -> EditorResult<bool> {
        let placement = DropPlacement::from_pointer(pointer_y, row_top, row_height);
        self.reorder_layer(dragged, target_index, placement)
    }

    pub fn toggle_visibility(&mut self, id: &ObjectId) -> EditorResult<bool> {
        let toggled = self.scene.modify(id, &mut |object| object.visible = !object.visible);
        if !toggled {
            return self.surface(Err(LayerError::LayerNotFound(id.clone()).into()));
        }
        self.scene.request_render();
        let result = self.pump_events().map(|_| true);
        self.surface(result)
    }

    /// Locks or unlocks one object. Unlocking in draw mode keeps the pointer
    /// suppressed until select mode comes back.
    pub fn toggle_lock(&mut self, id: &ObjectId) -> EditorResult<bool> {
        let suppress = self.tools.mode().suppresses_object_pointer();
        let mut locked_now = false;
        let toggled = self.scene.modify(id, &mut |object| {
            if object.is_locked() {
                object.interactivity = Interactivity::INTERACTIVE;
                if suppress {
                    object.interactivity.suppress_pointer();
                }
                locked_now = false;
            } else {
                object.interactivity = Interactivity::LOCKED;
                locked_now = true;
            }
        });
        if !toggled {
            return self.surface(Err(LayerError::LayerNotFound(id.clone()).into()));
        }
        if locked_now && self.scene.active() == Some(id) {
            self.scene.set_active(None);
        }
        self.scene.request_render();
        let result = self.pump_events().map(|_| true);
        self.surface(result)
    }

    pub fn delete_selection(&mut self) -> EditorResult<bool> {
        if self.crop.is_some() || matches!(self.tools.mode(), ToolMode::TextEdit(_)) {
            return Ok(false);
        }
        let Some(id) = self.scene.active().cloned() else {
            return Ok(false);
        };
        self.delete_layer(&id)
    }

    pub fn delete_layer(&mut self, id: &ObjectId) -> EditorResult<bool> {
        let result = self.try_delete_layer(id);
        self.surface(result)
    }

    fn try_delete_layer(&mut self, id: &ObjectId) -> EditorResult<bool> {
        let crop_touches = self
            .crop
            .as_ref()
            .is_some_and(|session| &session.target_image_id == id || session.involves(id));
        if crop_touches {
            self.cancel_crop_session()?;
        }
        if self.scene.remove(id).is_none() {
            return Err(LayerError::LayerNotFound(id.clone()).into());
        }
        self.scene.request_render();
        self.pump_events()?;
        Ok(true)
    }

    pub fn rotate_selection(&mut self) -> EditorResult<bool> {
        let Some(id) = self.scene.active().cloned() else {
            return Ok(false);
        };
        if self.crop.as_ref().is_some_and(|session| session.involves(&id)) {
            return Ok(false);
        }
        self.scene
            .modify(&id, &mut |object| object.angle = (object.angle + 90.0) % 360.0);
        self.scene.request_render();
        let result = self.pump_events().map(|_| true);
        self.surface(result)
    }

    // Modes

    pub fn enter_select(&mut self) -> EditorResult<()> {
        let result = self.try_enter_select();
        self.surface(result)
    }

    fn try_enter_select(&mut self) -> EditorResult<()> {
        self.leave_transient_mode()?;
        self.switch_mode(ToolEvent::EnterSelect)?;
        self.pump_events()?;
        Ok(())
    }

    pub fn enter_draw(&mut self) -> EditorResult<()> {
        let result = self.try_enter_draw();
        self.surface(result)
    }

    fn try_enter_draw(&mut self) -> EditorResult<()> {
        self.leave_transient_mode()?;
        self.scene.set_active(None);
        self.switch_mode(ToolEvent::EnterDraw)?;
        self.pump_events()?;
        Ok(())
    }

    pub fn toggle_draw(&mut self) -> EditorResult<()> {
        if self.tools.is_drawing() {
            self.enter_select()
        } else {
            self.enter_draw()
        }
    }

    /// Adds one finished freehand stroke in the current brush settings.
    pub fn commit_stroke(&mut self, points: Vec<Point>) -> EditorResult<bool> {
        if !self.tools.is_drawing() || points.is_empty() {
            return Ok(false);
        }
        let session = self.tools.session();
        let mut stroke = SceneObject::path(points);
        stroke.style.stroke = Some(session.draw_color);
        stroke.style.stroke_width = session.brush_width;
        let id = self.layers.allocate_id(&self.scene);
        self.scene.add(stroke.with_id(id));
        let result = self.pump_events().map(|_| true);
        self.surface(result)
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.tools.session_mut().zoom_in()
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.tools.session_mut().zoom_out()
    }

    pub fn reset_zoom(&mut self) {
        self.tools.session_mut().reset_zoom();
    }

    /// Switches to a new canvas size. The scene is cleared and the change is
    /// recorded, so it can be undone.
    pub fn resize_frame(&mut self, size: Size) -> EditorResult<()> {
        let result = self.try_resize_frame(size);
        self.surface(result)
    }

    fn try_resize_frame(&mut self, size: Size) -> EditorResult<()> {
        if !(size.width > 0.0 && size.height > 0.0) {
            return Err(EditorError::InvalidTarget("frame size must be positive"));
        }
        self.leave_transient_mode()?;
        if self.tools.mode() != &ToolMode::Select {
            self.switch_mode(ToolEvent::EnterSelect)?;
        }
        self.scene.set_active(None);
        self.scene.replace_all(Vec::new());
        let session = self.tools.session_mut();
        session.canvas = size;
        session.reset_zoom();
        self.scene.request_render();
        self.pump_events()?;
        self.layers.generate_layers(&mut self.scene);
        self.commit()?;
        tracing::debug!(width = size.width, height = size.height, "frame resized");
        Ok(())
    }

    // Text editing

    /// Double-interaction on an object: starts in-place editing when it is
    /// an unlocked text object.
    pub fn double_click(&mut self, id: &ObjectId) -> EditorResult<bool> {
        let result = self.try_double_click(id);
        self.surface(result)
    }

    fn try_double_click(&mut self, id: &ObjectId) -> EditorResult<bool> {
        let editable = self
            .scene
            .find(id)
            .is_some_and(|object| object.kind() == ObjectKind::Text && !object.is_locked());
        if !editable || !self.tools.can_transition(&ToolEvent::BeginTextEdit(id.clone())) {
            return Ok(false);
        }
        if let ToolMode::TextEdit(current) = self.tools.mode() {
            if current == id {
                return Ok(false);
            }
            self.end_text_edit()?;
        }
        self.scene.set_active(Some(id.clone()));
        if !self.scene.begin_text_editing(id) {
            self.pump_events()?;
            return Ok(false);
        }
        self.pump_events()?;
        Ok(true)
    }

    /// Ends text editing; the collaborator's exit notification records.
    pub fn end_text_edit(&mut self) -> EditorResult<bool> {
        if !matches!(self.tools.mode(), ToolMode::TextEdit(_)) {
            return Ok(false);
        }
        let ended = self.scene.end_text_editing();
        self.pump_events()?;
        if matches!(self.tools.mode(), ToolMode::TextEdit(_)) {
            self.tools.transition(ToolEvent::EndTextEdit)?;
        }
        Ok(ended)
    }

    // Crop

    /// Opens a crop session over the selected image.
    pub fn begin_crop(&mut self) -> EditorResult<()> {
        let result = self.try_begin_crop();
        self.surface(result)
    }

    fn try_begin_crop(&mut self) -> EditorResult<()> {
        let target_id = match &self.crop {
            Some(session) => Some(session.target_image_id.clone()),
            None => self.scene.active().cloned(),
        };
        let image = target_id
            .and_then(|id| self.scene.find(&id))
            .filter(|object| object.kind() == ObjectKind::Image)
            .cloned()
            .ok_or(CropError::NotAnImage)?;
        let image_id = image.id.clone().ok_or(CropError::NotAnImage)?;

        let rect = crop::default_overlay(&image, &self.config.crop);
        if rect.is_degenerate() {
            return Err(CropError::DegenerateGeometry.into());
        }
        self.leave_transient_mode()?;

        let overlay_id = self.layers.allocate_id(&self.scene);
        self.switch_mode(ToolEvent::EnterCrop)?;
        self.crop = Some(CropSession {
            target_image_id: image_id.clone(),
            overlay_rect_id: overlay_id.clone(),
        });
        self.scene
            .add(crop::overlay_object(overlay_id.clone(), rect));
        self.scene.set_active(Some(overlay_id.clone()));
        self.pump_events()?;
        tracing::debug!(image = %image_id, overlay = %overlay_id, ?rect, "crop session opened");
        self.notifier.notify(CROP_HINT);
        Ok(())
    }

    /// Replaces the target image with the pixels under the overlay. On
    /// rejection the session stays open and nothing is mutated.
    pub fn confirm_crop(&mut self) -> EditorResult<bool> {
        let result = self.try_confirm_crop();
        self.surface(result)
    }

    fn try_confirm_crop(&mut self) -> EditorResult<bool> {
        let Some(session) = self.crop.clone() else {
            return Ok(false);
        };
        let Some(image) = self.scene.find(&session.target_image_id).cloned() else {
            self.cancel_crop_session()?;
            return Err(CropError::TargetMissing(session.target_image_id).into());
        };
        let Some(overlay) = self.scene.find(&session.overlay_rect_id).cloned() else {
            self.cancel_crop_session()?;
            return Err(CropError::TargetMissing(session.overlay_rect_id).into());
        };
        let asset = image.image_asset().cloned().ok_or(CropError::NotAnImage)?;

        let plan = crop::plan_crop(&image, &overlay, self.scene.asset_dimensions(&asset))?;
        let extracted = self.scene.extract_region(&asset, plan.pixels)?;

        let cropped_id = self.layers.allocate_id(&self.scene);
        let mut cropped = SceneObject::image(
            extracted.asset,
            plan.placement.x,
            plan.placement.y,
            extracted.width,
            extracted.height,
        )
        .with_id(cropped_id.clone());
        cropped.scale_x = plan.scale_x;
        cropped.scale_y = plan.scale_y;
        cropped.angle = image.angle;
        cropped.style = image.style.clone();

        self.scene.remove(&session.target_image_id);
        self.scene.remove(&session.overlay_rect_id);
        self.scene.add(cropped);
        self.scene.set_active(Some(cropped_id.clone()));
        let switched = self.switch_mode(ToolEvent::ConfirmCrop);
        let pumped = self.pump_events();
        self.crop = None;
        switched?;
        pumped?;

        tracing::debug!(
            source = %session.target_image_id,
            cropped = %cropped_id,
            region = ?plan.region,
            "crop applied"
        );
        Ok(true)
    }

    /// Drops the overlay and the session; never records.
    pub fn cancel_crop(&mut self) -> EditorResult<bool> {
        let result = self.cancel_crop_session();
        self.surface(result)
    }

    fn cancel_crop_session(&mut self) -> EditorResult<bool> {
        let Some(session) = self.crop.clone() else {
            return Ok(false);
        };
        self.scene.remove(&session.overlay_rect_id);
        if self.scene.find(&session.target_image_id).is_some() {
            self.scene.set_active(Some(session.target_image_id.clone()));
        }
        let switched = if self.tools.mode() == &ToolMode::Crop {
            self.switch_mode(ToolEvent::CancelCrop)
        } else {
            Ok(())
        };
        let pumped = self.pump_events();
        self.crop = None;
        switched?;
        pumped?;
        tracing::debug!(image = %session.target_image_id, "crop session cancelled");
        Ok(true)
    }

    // Keyboard

    /// Resolves a key press in the current context and runs its action.
    pub fn handle_shortcut(
        &mut self,
        key: ShortcutKey,
        modifiers: ShortcutModifiers,
    ) -> EditorResult<Option<ShortcutAction>> {
        let Some(action) = resolve_shortcut(key, modifiers, self.input_context()) else {
            return Ok(None);
        };
        tracing::debug!(?key, ?action, "shortcut");
        match action {
            ShortcutAction::Undo => {
                self.undo()?;
            }
            ShortcutAction::Redo => {
                self.redo()?;
            }
            ShortcutAction::CropApply => {
                self.confirm_crop()?;
            }
            ShortcutAction::CropCancel => {
                self.cancel_crop()?;
            }
            ShortcutAction::TextExitFocus => {
                self.end_text_edit()?;
            }
            ShortcutAction::DeleteSelection => {
                self.delete_selection()?;
            }
            ShortcutAction::EnterSelect => self.enter_select()?,
            ShortcutAction::ToggleDraw => self.toggle_draw()?,
            ShortcutAction::EnterCrop => self.begin_crop()?,
        }
        Ok(Some(action))
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{editor, editor_with, ids, png_bytes};
    use super::*;
    use crate::geometry::Rect;
    use crate::scene::{MemoryScene, ShapeKind};

    fn image_editor() -> (Editor<MemoryScene>, crate::notification::StatusLog, ObjectId) {
        let mut scene = MemoryScene::new();
        let decoded = scene.insert_asset(image::RgbaImage::new(200, 200));
        scene.add(
            SceneObject::image(decoded.asset, 100.0, 100.0, 200, 200)
                .with_id(ObjectId::new("photo")),
        );
        scene.add(
            SceneObject::shape(ShapeKind::Rect, 0.0, 0.0, 10.0, 10.0)
                .with_id(ObjectId::new("box")),
        );
        let (editor, status) = editor_with(scene);
        (editor, status, ObjectId::new("photo"))
    }

    fn move_overlay_to(editor: &mut Editor<MemoryScene>, rect: Rect) {
        let overlay = editor
            .crop_session()
            .expect("crop session open")
            .overlay_rect_id
            .clone();
        editor.scene_mut().modify(&overlay, &mut |object| {
            object.left = rect.left;
            object.top = rect.top;
            object.width = rect.width;
            object.height = rect.height;
        });
        editor.pump_events().expect("overlay edits pump");
    }

    #[test]
    fn new_editor_records_initial_snapshot_and_assigns_ids() {
        let mut scene = MemoryScene::new();
        scene.add(SceneObject::shape(ShapeKind::Circle, 0.0, 0.0, 5.0, 5.0));
        let (editor, _) = editor_with(scene);

        assert_eq!(editor.history().log().len(), 1);
        assert_eq!(editor.layers().len(), 1);
        assert!(editor.scene().objects()[0].id.is_some());
        assert!(!editor.has_unsaved_changes());
        assert_eq!(editor.history_availability(), HistoryAvailability::default());
    }

    #[test]
    fn host_gesture_records_once_per_pump() {
        let (mut editor, _, _) = image_editor();
        editor.scene_mut().drag_object(&ObjectId::new("box"), 5.0, 5.0);
        editor.scene_mut().scale_object(&ObjectId::new("box"), 2.0, 2.0);

        assert!(editor.pump_events().expect("pump"));
        assert_eq!(editor.history().log().len(), 2);
        assert!(editor.has_unsaved_changes());
        assert!(!editor.pump_events().expect("nothing pending"));
    }

    #[test]
    fn undo_and_redo_do_not_record_and_notify() {
        let (mut editor, status, _) = image_editor();
        editor.scene_mut().drag_object(&ObjectId::new("box"), 5.0, 0.0);
        editor.pump_events().expect("pump");

        assert!(editor.undo().expect("undo"));
        assert_eq!(editor.history().log().len(), 2);
        assert_eq!(editor.history().log().active_index(), Some(0));
        let restored = editor.scene().find(&ObjectId::new("box")).expect("box");
        assert_eq!(restored.left, 0.0);
        assert_eq!(status.last().as_deref(), Some("undo applied"));

        assert!(editor.redo().expect("redo"));
        assert!(!editor.redo().expect("redo at newest is a no-op"));
        let moved = editor.scene().find(&ObjectId::new("box")).expect("box");
        assert_eq!(moved.left, 5.0);
    }

    #[test]
    fn undo_at_oldest_snapshot_is_silent() {
        let (mut editor, status) = editor();
        assert!(!editor.undo().expect("boundary is not an error"));
        assert!(status.messages().is_empty());
    }

    #[test]
    fn crop_confirm_replaces_image_and_records_once() {
        let (mut editor, _, photo) = image_editor();
        editor.select(Some(&photo)).expect("select image");
        editor.begin_crop().expect("crop should open");
        assert_eq!(editor.mode(), &ToolMode::Crop);
        assert_eq!(editor.history().log().len(), 1);

        move_overlay_to(&mut editor, Rect::new(120.0, 120.0, 50.0, 50.0));
        assert_eq!(editor.history().log().len(), 1);

        assert!(editor.confirm_crop().expect("crop should apply"));
        assert_eq!(editor.history().log().len(), 2);
        assert_eq!(editor.mode(), &ToolMode::Select);
        assert!(editor.crop_session().is_none());

        let objects = editor.scene().objects();
        assert_eq!(objects.len(), 2);
        let cropped = objects.last().expect("cropped image on top");
        assert_eq!(cropped.kind(), ObjectKind::Image);
        assert_eq!((cropped.left, cropped.top), (120.0, 120.0));
        assert_eq!((cropped.width, cropped.height), (50.0, 50.0));
        assert_eq!(editor.scene().active(), cropped.id.as_ref());
        assert!(editor.scene().find(&photo).is_none());
    }

    #[test]
    fn undo_after_crop_restores_the_original_image() {
        let (mut editor, _, photo) = image_editor();
        editor.select(Some(&photo)).expect("select image");
        editor.begin_crop().expect("crop should open");
        editor.confirm_crop().expect("crop should apply");

        editor.undo().expect("undo crop");
        assert_eq!(ids(&editor), vec!["photo", "box"]);
        let restored = editor.scene().find(&photo).expect("original image back");
        assert_eq!((restored.width, restored.height), (200.0, 200.0));
    }

    #[test]
    fn crop_cancel_leaves_count_and_order_unchanged() {
        let (mut editor, _, photo) = image_editor();
        let before = ids(&editor);
        editor.select(Some(&photo)).expect("select image");
        editor.begin_crop().expect("crop should open");
        assert_eq!(editor.scene().objects().len(), 3);

        assert!(editor.cancel_crop().expect("cancel"));
        assert_eq!(ids(&editor), before);
        assert_eq!(editor.history().log().len(), 1);
        assert_eq!(editor.scene().active(), Some(&photo));
        assert_eq!(editor.mode(), &ToolMode::Select);
    }

    #[test]
    fn edits_during_crop_never_bring_the_overlay_back() {
        let (mut editor, _, photo) = image_editor();
        let boxed = ObjectId::new("box");
        editor.select(Some(&photo)).expect("select image");
        editor.begin_crop().expect("crop should open");

        assert!(editor.toggle_visibility(&boxed).expect("hide box while cropping"));
        assert_eq!(editor.history().log().len(), 2);
        editor.cancel_crop().expect("cancel");
        editor.toggle_visibility(&boxed).expect("show box");

        editor.undo().expect("undo");
        assert_eq!(ids(&editor), vec!["photo", "box"]);
        assert!(editor.crop_session().is_none());
        let hidden = editor.scene().find(&boxed).expect("box restored");
        assert!(!hidden.visible);
        assert_eq!(editor.layers().len(), 2);
    }

    #[test]
    fn host_gesture_during_crop_records_without_overlay() {
        let (mut editor, _, photo) = image_editor();
        editor.select(Some(&photo)).expect("select image");
        editor.begin_crop().expect("crop should open");
        editor.scene_mut().drag_object(&ObjectId::new("box"), 3.0, 3.0);
        assert!(editor.pump_events().expect("host gesture during crop"));
        editor.confirm_crop().expect("crop");

        editor.undo().expect("undo crop");
        assert_eq!(ids(&editor), vec!["photo", "box"]);
        let moved = editor.scene().find(&ObjectId::new("box")).expect("box");
        assert_eq!(moved.left, 3.0);
    }

    #[test]
    fn escape_cancels_crop_and_enter_confirms() {
        let (mut editor, _, photo) = image_editor();
        editor.select(Some(&photo)).expect("select image");
        editor.begin_crop().expect("crop should open");
        let action = editor
            .handle_shortcut(ShortcutKey::Escape, ShortcutModifiers::default())
            .expect("escape");
        assert_eq!(action, Some(ShortcutAction::CropCancel));
        assert!(editor.crop_session().is_none());

        editor.begin_crop().expect("crop reopens on the still-selected image");
        let action = editor
            .handle_shortcut(ShortcutKey::Enter, ShortcutModifiers::default())
            .expect("enter");
        assert_eq!(action, Some(ShortcutAction::CropApply));
        assert_eq!(editor.history().log().len(), 2);
    }

    #[test]
    fn crop_requires_a_selected_image() {
        let (mut editor, status, _) = image_editor();
        editor.select(Some(&ObjectId::new("box"))).expect("select box");
        let err = editor.begin_crop().expect_err("box is not an image");
        assert_eq!(err.class(), ErrorClass::InvalidTarget);
        assert_eq!(status.last().as_deref(), Some("select an image to crop"));
        assert_eq!(editor.mode(), &ToolMode::Select);
        assert_eq!(editor.scene().objects().len(), 2);
    }

    #[test]
    fn crop_overlay_outside_image_is_rejected_without_mutation() {
        let (mut editor, status, photo) = image_editor();
        editor.select(Some(&photo)).expect("select image");
        editor.begin_crop().expect("crop should open");
        status.clear();
        move_overlay_to(&mut editor, Rect::new(700.0, 700.0, 40.0, 40.0));

        let err = editor.confirm_crop().expect_err("overlay misses the image");
        assert_eq!(err.class(), ErrorClass::DegenerateGeometry);
        assert!(status.messages().is_empty());
        assert_eq!(editor.mode(), &ToolMode::Crop);
        assert!(editor.scene().find(&photo).is_some());
        assert_eq!(editor.history().log().len(), 1);
    }

    #[test]
    fn entering_draw_while_cropping_cancels_the_crop() {
        let (mut editor, _, photo) = image_editor();
        editor.select(Some(&photo)).expect("select image");
        editor.begin_crop().expect("crop should open");

        editor.enter_draw().expect("draw");
        assert!(editor.crop_session().is_none());
        assert_eq!(editor.scene().objects().len(), 2);
        assert_eq!(editor.mode(), &ToolMode::Draw);
        assert_eq!(editor.history().log().len(), 1);
    }

    #[test]
    fn draw_round_trip_restores_interactivity_except_locked() {
        let (mut editor, _, photo) = image_editor();
        editor.toggle_lock(&ObjectId::new("box")).expect("lock box");

        editor.toggle_draw().expect("draw on");
        assert!(editor
            .scene()
            .objects()
            .iter()
            .all(|object| !object.interactivity.selectable && !object.interactivity.evented));

        editor.toggle_draw().expect("draw off");
        let image = editor.scene().find(&photo).expect("image");
        assert_eq!(image.interactivity, Interactivity::INTERACTIVE);
        assert!(editor
            .scene()
            .find(&ObjectId::new("box"))
            .expect("box")
            .is_locked());
    }

    #[test]
    fn strokes_record_and_stay_inert_while_drawing() {
        let (mut editor, _) = editor();
        assert!(!editor
            .commit_stroke(vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0)])
            .expect("ignored outside draw mode"));

        editor.enter_draw().expect("draw");
        assert!(editor
            .commit_stroke(vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0)])
            .expect("stroke"));
        editor
            .scene_mut()
            .draw_stroke(vec![Point::new(1.0, 1.0)], crate::geometry::Color::BLACK, 3.0);
        editor.pump_events().expect("pump host stroke");

        assert_eq!(editor.history().log().len(), 3);
        assert_eq!(editor.layers().len(), 2);
        assert!(editor.scene().objects().iter().all(|object| {
            object.id.is_some() && !object.interactivity.selectable && !object.is_locked()
        }));
        assert_eq!(editor.layers()[0].display_name, "Drawing");
    }

    #[test]
    fn undo_in_draw_mode_keeps_pointer_suppressed() {
        let (mut editor, _, _) = image_editor();
        editor.enter_draw().expect("draw");
        editor
            .commit_stroke(vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0)])
            .expect("stroke");
        editor.undo().expect("undo stroke");
        assert!(editor
            .scene()
            .objects()
            .iter()
            .all(|object| !object.interactivity.selectable));
    }

    #[test]
    fn text_edit_commits_once_when_editing_ends() {
        let (mut editor, _) = editor();
        let id = editor.add_text().expect("text added");
        assert_eq!(editor.history().log().len(), 2);

        assert!(editor.double_click(&id).expect("edit"));
        assert_eq!(editor.mode(), &ToolMode::TextEdit(id.clone()));
        editor.scene_mut().type_text("Hello");
        assert!(!editor.pump_events().expect("typing is silent"));

        let action = editor
            .handle_shortcut(ShortcutKey::Escape, ShortcutModifiers::default())
            .expect("escape");
        assert_eq!(action, Some(ShortcutAction::TextExitFocus));
        assert_eq!(editor.mode(), &ToolMode::Select);
        assert_eq!(editor.history().log().len(), 3);
        assert_eq!(editor.layers()[0].display_name, "Text: Hello");

        editor.undo().expect("undo edit");
        let text = editor.scene().find(&id).and_then(SceneObject::as_text);
        assert_eq!(text.map(|content| content.text.as_str()), Some("Edit me"));
    }

    #[test]
    fn unchanged_text_edit_keeps_the_redo_branch() {
        let (mut editor, _) = editor();
        let id = editor.add_text().expect("text added");
        editor
            .add_shape(ShapePreset::Rectangle)
            .expect("shape added");
        editor.undo().expect("undo shape");
        assert!(editor.history_availability().can_redo);

        assert!(editor.double_click(&id).expect("edit"));
        assert!(editor.redo().expect("redo ends the edit and still applies"));
        assert_eq!(editor.mode(), &ToolMode::Select);
        assert_eq!(editor.history().log().len(), 3);
        assert_eq!(editor.scene().objects().len(), 2);

        assert!(editor.double_click(&id).expect("edit again"));
        assert!(editor.end_text_edit().expect("leave edit"));
        assert_eq!(editor.history().log().len(), 3);
    }

    #[test]
    fn double_click_ignores_non_text_and_draw_mode() {
        let (mut editor, _, photo) = image_editor();
        assert!(!editor.double_click(&photo).expect("image is not editable"));
        let id = editor.add_text().expect("text");
        editor.enter_draw().expect("draw");
        assert!(!editor.double_click(&id).expect("no editing while drawing"));
        assert_eq!(editor.mode(), &ToolMode::Draw);
    }

    #[test]
    fn reorder_records_and_keeps_layers_mirrored() {
        let (mut editor, _, photo) = image_editor();
        assert!(editor
            .reorder_layer(&photo, 0, DropPlacement::Before)
            .expect("move photo to front"));
        assert_eq!(ids(&editor), vec!["box", "photo"]);
        assert_eq!(editor.history().log().len(), 2);

        assert!(!editor
            .reorder_layer(&photo, 0, DropPlacement::Before)
            .expect("no-op move"));
        assert_eq!(editor.history().log().len(), 2);

        let layer_ids: Vec<&str> = editor.layers().iter().rev().map(|l| l.id.as_str()).collect();
        assert_eq!(layer_ids, ids(&editor));
    }

    #[test]
    fn drop_layer_uses_row_midpoint() {
        let (mut editor, _, photo) = image_editor();
        assert!(!editor
            .drop_layer(&photo, 0, 24.0, 0.0, 40.0)
            .expect("below the midpoint lands after box, where photo already is"));
        assert!(editor
            .drop_layer(&photo, 0, 10.0, 0.0, 40.0)
            .expect("above the midpoint lands before box"));
        assert_eq!(ids(&editor), vec!["box", "photo"]);
    }

    #[test]
    fn reorder_unknown_layer_is_user_visible() {
        let (mut editor, status, _) = image_editor();
        let err = editor
            .reorder_layer(&ObjectId::new("ghost"), 0, DropPlacement::After)
            .expect_err("unknown layer");
        assert_eq!(err.class(), ErrorClass::InvalidTarget);
        assert_eq!(status.last().as_deref(), Some("layer ghost not found"));
    }

    #[test]
    fn visibility_and_lock_toggles_record() {
        let (mut editor, _, photo) = image_editor();
        editor.select(Some(&photo)).expect("select");
        editor.toggle_visibility(&photo).expect("hide");
        editor.toggle_lock(&photo).expect("lock");

        assert_eq!(editor.history().log().len(), 3);
        let layer = editor.layers().iter().find(|l| l.id == photo).expect("layer");
        assert!(!layer.visible);
        assert!(layer.locked);
        assert_eq!(editor.scene().active(), None);
        assert!(!editor.select(Some(&photo)).expect("locked objects cannot be selected"));
    }

    #[test]
    fn delete_and_rotate_act_on_selection() {
        let (mut editor, _, photo) = image_editor();
        assert!(!editor.delete_selection().expect("empty selection is silent"));
        editor.select(Some(&photo)).expect("select");
        editor.rotate_selection().expect("rotate");
        assert_eq!(editor.scene().find(&photo).expect("photo").angle, 90.0);

        let action = editor
            .handle_shortcut(ShortcutKey::Delete, ShortcutModifiers::default())
            .expect("delete");
        assert_eq!(action, Some(ShortcutAction::DeleteSelection));
        assert!(editor.scene().find(&photo).is_none());
        assert_eq!(editor.history().log().len(), 3);
    }

    #[test]
    fn resize_frame_clears_scene_and_is_undoable() {
        let (mut editor, _, _) = image_editor();
        editor.zoom_in();
        editor.resize_frame(Size::new(1080.0, 1080.0)).expect("resize");
        assert!(editor.scene().objects().is_empty());
        assert!(editor.layers().is_empty());
        assert_eq!(editor.session().canvas, Size::new(1080.0, 1080.0));
        assert_eq!(editor.session().zoom(), 1.0);

        editor.undo().expect("undo resize");
        assert_eq!(editor.scene().objects().len(), 2);
        assert!(editor.resize_frame(Size::new(0.0, 10.0)).is_err());
    }

    #[test]
    fn history_shortcuts_and_unsaved_flag() {
        let (mut editor, _) = editor();
        editor.add_text().expect("text");
        assert!(editor.has_unsaved_changes());
        editor.mark_saved();

        let ctrl = ShortcutModifiers::new(true, false);
        editor
            .handle_shortcut(ShortcutKey::Character('z'), ctrl)
            .expect("undo");
        assert!(editor.scene().objects().is_empty());
        assert!(editor.has_unsaved_changes());
        editor
            .handle_shortcut(ShortcutKey::Character('y'), ctrl)
            .expect("redo");
        assert_eq!(editor.scene().objects().len(), 1);
    }

    #[test]
    fn assets_leaving_history_are_released() {
        let config = EditorConfig {
            history_limit: 2,
            ..EditorConfig::default()
        };
        let status = crate::notification::StatusLog::new();
        let mut editor = Editor::new(MemoryScene::new(), config, Box::new(status))
            .expect("editor should initialize");

        let id = editor
            .upload_image(&png_bytes(100, 80))
            .expect("upload should decode");
        let original = editor
            .scene()
            .find(&id)
            .and_then(SceneObject::image_asset)
            .cloned()
            .expect("uploaded asset");
        editor.begin_crop().expect("uploaded image is selected");
        editor.confirm_crop().expect("crop");
        assert!(editor.scene().asset(&original).is_some());

        editor
            .add_shape(ShapePreset::Rectangle)
            .expect("shape added");
        assert!(editor.scene().asset(&original).is_none());
        assert_eq!(editor.scene().asset_count(), 1);
        let cropped = editor
            .scene()
            .objects()
            .iter()
            .find_map(SceneObject::image_asset)
            .expect("cropped image remains");
        assert!(editor.scene().asset(cropped).is_some());
    }

    #[test]
    fn upload_then_crop_uses_real_pixels() {
        let (mut editor, _) = editor();
        let id = editor
            .upload_image(&png_bytes(100, 80))
            .expect("upload should decode");
        editor.begin_crop().expect("uploaded image is selected");
        let image = editor.scene().find(&id).cloned().expect("image");
        move_overlay_to(
            &mut editor,
            Rect::new(image.left + 10.0, image.top + 10.0, 30.0, 20.0),
        );
        editor.confirm_crop().expect("crop");
        let cropped = editor.scene().active_object().expect("cropped selected");
        let asset = cropped.image_asset().expect("image asset");
        let pixels = editor.scene().asset(asset).expect("pixels stored");
        assert_eq!(pixels.dimensions(), (30, 20));
        assert_eq!(pixels.get_pixel(0, 0), &image::Rgba([10, 10, 0, 255]));
    }
}
