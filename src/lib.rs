pub mod config;
pub mod crop;
pub mod editor;
pub mod error;
pub mod generation;
pub mod geometry;
pub mod history;
pub mod input;
pub mod layers;
pub mod logging;
pub mod notification;
pub mod replay;
pub mod scene;
pub mod tools;
pub use error::{AppError, AppResult};

use std::path::Path;

use editor::Editor;
use layers::Layer;
use notification::{DesktopNotifier, Notifier, StatusLog};
use scene::MemoryScene;

/// Entrypoint used by the CLI: replays `script` on an empty scene and
/// returns the resulting layer list.
pub fn run(script: &Path) -> AppResult<Vec<Layer>> {
    tracing::info!(script = %script.display(), "starting sketchboard");
    let config = config::load_editor_config();
    let notifier: Box<dyn Notifier> = if config.desktop_notifications {
        Box::new(DesktopNotifier)
    } else {
        Box::new(StatusLog::new())
    };

    let commands = replay::load_script(script)?;
    let base_dir = script.parent().unwrap_or_else(|| Path::new("."));
    let mut editor = Editor::new(MemoryScene::new(), config, notifier)?;
    let summary = replay::run_script(&mut editor, commands, base_dir);

    tracing::info!(
        applied = summary.applied,
        rejected = summary.rejected,
        layers = editor.layers().len(),
        unsaved = editor.has_unsaved_changes(),
        "replay complete"
    );
    Ok(editor.layers().to_vec())
}
