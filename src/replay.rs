//! Headless driver: replays a JSON script of host gestures against an
//! [`Editor`] backed by [`MemoryScene`].

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::editor::{Editor, EditorError, ShapePreset, StyleChange};
use crate::error::{AppError, AppResult};
use crate::geometry::{Point, Size};
use crate::input::{ShortcutKey, ShortcutModifiers};
use crate::layers::DropPlacement;
use crate::scene::{MemoryScene, ObjectId, SceneGraph};

/// One step of a script, named after the host gesture or toolbar action
/// it stands for.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptCommand {
    AddText,
    AddEmoji {
        emoji: String,
    },
    AddShape {
        shape: ShapePreset,
    },
    /// Path is resolved against the script's directory.
    UploadImage {
        path: PathBuf,
    },
    Select {
        id: Option<ObjectId>,
    },
    Drag {
        id: ObjectId,
        dx: f64,
        dy: f64,
    },
    Scale {
        id: ObjectId,
        scale_x: f64,
        scale_y: f64,
    },
    Undo,
    Redo,
    Reorder {
        id: ObjectId,
        target: usize,
        placement: DropPlacement,
    },
    DropLayer {
        id: ObjectId,
        target: usize,
        pointer_y: f64,
        row_top: f64,
        row_height: f64,
    },
    ToggleVisibility {
        id: ObjectId,
    },
    ToggleLock {
        id: ObjectId,
    },
    EnterSelect,
    EnterDraw,
    ToggleDraw,
    Stroke {
        points: Vec<Point>,
    },
    BeginCrop,
    MoveCrop {
        left: f64,
        top: f64,
        width: f64,
        height: f64,
    },
    ConfirmCrop,
    CancelCrop,
    EditText {
        id: ObjectId,
        text: String,
    },
    Delete,
    DeleteLayer {
        id: ObjectId,
    },
    Rotate,
    Group {
        ids: Vec<ObjectId>,
    },
    Ungroup {
        id: ObjectId,
    },
    Style {
        style: StyleChange,
    },
    ResizeFrame {
        width: f64,
        height: f64,
    },
    ZoomIn,
    ZoomOut,
    ResetZoom,
    Shortcut {
        key: ShortcutKey,
        #[serde(default)]
        modifiers: ShortcutModifiers,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub applied: usize,
    pub rejected: usize,
}

pub fn load_script(path: &Path) -> AppResult<Vec<ScriptCommand>> {
    let contents = std::fs::read_to_string(path).map_err(|source| AppError::ReadScript {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| AppError::ParseScript {
        path: path.to_path_buf(),
        source,
    })
}

/// Runs every command in order. A rejected command has already been
/// surfaced by the editor; replay logs it and moves on.
pub fn run_script(
    editor: &mut Editor<MemoryScene>,
    commands: Vec<ScriptCommand>,
    base_dir: &Path,
) -> ReplaySummary {
    let mut summary = ReplaySummary::default();
    for (index, command) in commands.into_iter().enumerate() {
        tracing::debug!(index, ?command, "replaying");
        match execute_command(editor, command, base_dir) {
            Ok(()) => summary.applied += 1,
            Err(err) => {
                tracing::warn!(index, %err, "script command rejected");
                summary.rejected += 1;
            }
        }
    }
    tracing::info!(
        applied = summary.applied,
        rejected = summary.rejected,
        history = editor.history().log().len(),
        "script finished"
    );
    summary
}

fn execute_command(
    editor: &mut Editor<MemoryScene>,
    command: ScriptCommand,
    base_dir: &Path,
) -> AppResult<()> {
    match command {
        ScriptCommand::AddText => {
            editor.add_text()?;
        }
        ScriptCommand::AddEmoji { emoji } => {
            editor.add_emoji(&emoji)?;
        }
        ScriptCommand::AddShape { shape } => {
            editor.add_shape(shape)?;
        }
        ScriptCommand::UploadImage { path } => {
            let path = base_dir.join(path);
            let bytes =
                std::fs::read(&path).map_err(|source| AppError::ReadImage { path, source })?;
            editor.upload_image(&bytes)?;
        }
        ScriptCommand::Select { id } => {
            editor.select(id.as_ref())?;
        }
        ScriptCommand::Drag { id, dx, dy } => {
            pointer_gesture(editor, &id, |scene| scene.drag_object(&id, dx, dy))?;
        }
        ScriptCommand::Scale {
            id,
            scale_x,
            scale_y,
        } => {
            pointer_gesture(editor, &id, |scene| {
                scene.scale_object(&id, scale_x, scale_y)
            })?;
        }
        ScriptCommand::Undo => {
            editor.undo()?;
        }
        ScriptCommand::Redo => {
            editor.redo()?;
        }
        ScriptCommand::Reorder {
            id,
            target,
            placement,
        } => {
            editor.reorder_layer(&id, target, placement)?;
        }
        ScriptCommand::DropLayer {
            id,
            target,
            pointer_y,
            row_top,
            row_height,
        } => {
            editor.drop_layer(&id, target, pointer_y, row_top, row_height)?;
        }
        ScriptCommand::ToggleVisibility { id } => {
            editor.toggle_visibility(&id)?;
        }
        ScriptCommand::ToggleLock { id } => {
            editor.toggle_lock(&id)?;
        }
        ScriptCommand::EnterSelect => editor.enter_select()?,
        ScriptCommand::EnterDraw => editor.enter_draw()?,
        ScriptCommand::ToggleDraw => editor.toggle_draw()?,
        ScriptCommand::Stroke { points } => {
            editor.commit_stroke(points)?;
        }
        ScriptCommand::BeginCrop => editor.begin_crop()?,
        ScriptCommand::MoveCrop {
            left,
            top,
            width,
            height,
        } => {
            let overlay = editor
                .crop_session()
                .map(|session| session.overlay_rect_id.clone())
                .ok_or(EditorError::InvalidTarget("no crop in progress"))?;
            editor.scene_mut().modify(&overlay, &mut |object| {
                object.left = left;
                object.top = top;
                object.width = width;
                object.height = height;
                object.scale_x = 1.0;
                object.scale_y = 1.0;
            });
            editor.pump_events()?;
        }
        ScriptCommand::ConfirmCrop => {
            editor.confirm_crop()?;
        }
        ScriptCommand::CancelCrop => {
            editor.cancel_crop()?;
        }
        ScriptCommand::EditText { id, text } => {
            if editor.double_click(&id)? {
                editor.scene_mut().type_text(&text);
                editor.end_text_edit()?;
            }
        }
        ScriptCommand::Delete => {
            editor.delete_selection()?;
        }
        ScriptCommand::DeleteLayer { id } => {
            editor.delete_layer(&id)?;
        }
        ScriptCommand::Rotate => {
            editor.rotate_selection()?;
        }
        ScriptCommand::Group { ids } => {
            editor.group(&ids)?;
        }
        ScriptCommand::Ungroup { id } => {
            editor.ungroup(&id)?;
        }
        ScriptCommand::Style { style } => {
            editor.apply_style(style)?;
        }
        ScriptCommand::ResizeFrame { width, height } => {
            editor.resize_frame(Size::new(width, height))?;
        }
        ScriptCommand::ZoomIn => {
            editor.zoom_in();
        }
        ScriptCommand::ZoomOut => {
            editor.zoom_out();
        }
        ScriptCommand::ResetZoom => editor.reset_zoom(),
        ScriptCommand::Shortcut { key, modifiers } => {
            editor.handle_shortcut(key, modifiers)?;
        }
    }
    Ok(())
}

/// Pointer gestures only reach objects that currently take pointer input.
fn pointer_gesture(
    editor: &mut Editor<MemoryScene>,
    id: &ObjectId,
    gesture: impl FnOnce(&mut MemoryScene) -> bool,
) -> AppResult<()> {
    let evented = editor
        .scene()
        .find(id)
        .is_some_and(|object| object.interactivity.evented);
    if !evented {
        return Err(EditorError::InvalidTarget("object does not accept pointer input").into());
    }
    if gesture(editor.scene_mut()) {
        editor.pump_events()?;
    }
    Ok(())
}
