use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::crop::CropDefaults;
use crate::geometry::Size;
use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::tools::{SessionState, ZoomLimits};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigPathError {
    MissingHomeDirectory,
}

const APP_DIR: &str = "sketchboard";
const APP_CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TextDefaults {
    pub placeholder: String,
    pub font_size: f64,
    pub font_family: String,
    pub box_width: f64,
    pub emoji_size: f64,
}

impl Default for TextDefaults {
    fn default() -> Self {
        Self {
            placeholder: "Edit me".to_string(),
            font_size: 30.0,
            font_family: "Arial, sans-serif".to_string(),
            box_width: 200.0,
            emoji_size: 50.0,
        }
    }
}

/// Editor settings from `config.json`; every field falls back to its default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub history_limit: usize,
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub brush_width: f64,
    pub crop: CropDefaults,
    /// Uploaded images wider than this share of the canvas are scaled down.
    pub upload_fit_fraction: f64,
    /// Generated images are scaled to fit this share of the canvas.
    pub generated_fit_fraction: f64,
    pub max_generated_images: u8,
    pub zoom: ZoomLimits,
    pub text: TextDefaults,
    pub desktop_notifications: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            canvas_width: 800.0,
            canvas_height: 600.0,
            brush_width: 3.0,
            crop: CropDefaults::default(),
            upload_fit_fraction: 0.8,
            generated_fit_fraction: 0.9,
            max_generated_images: 2,
            zoom: ZoomLimits::default(),
            text: TextDefaults::default(),
            desktop_notifications: false,
        }
    }
}

impl EditorConfig {
    pub fn canvas(&self) -> Size {
        Size::new(self.canvas_width, self.canvas_height)
    }

    pub fn session_state(&self) -> SessionState {
        SessionState::new(self.canvas(), self.brush_width, self.zoom)
    }
}

pub fn load_editor_config() -> EditorConfig {
    let (xdg_config_home, home) = config_env_dirs();
    load_editor_config_with(xdg_config_home.as_deref(), home.as_deref())
}

fn load_editor_config_with(xdg_config_home: Option<&Path>, home: Option<&Path>) -> EditorConfig {
    let path = match app_config_path(APP_DIR, APP_CONFIG_FILE, xdg_config_home, home) {
        Ok(p) => p,
        Err(_) => return EditorConfig::default(),
    };
    if !path.exists() {
        return EditorConfig::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(contents) => parse_editor_config(&contents).unwrap_or_else(|err| {
            tracing::warn!(?err, ?path, "failed to parse config.json; using defaults");
            EditorConfig::default()
        }),
        Err(err) => {
            tracing::warn!(?err, ?path, "failed to read config.json; using defaults");
            EditorConfig::default()
        }
    }
}

pub fn parse_editor_config(contents: &str) -> Result<EditorConfig, serde_json::Error> {
    serde_json::from_str(contents)
}

pub(crate) fn config_env_dirs() -> (Option<PathBuf>, Option<PathBuf>) {
    (
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

pub(crate) fn app_config_path(
    app_dir: &str,
    file_name: &str,
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    let mut path = config_root(xdg_config_home, home)?;
    path.push(app_dir);
    path.push(file_name);
    Ok(path)
}

fn config_root(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    if let Some(xdg) = xdg_config_home.filter(|path| !path.as_os_str().is_empty()) {
        return Ok(xdg.to_path_buf());
    }

    let home = home.ok_or(ConfigPathError::MissingHomeDirectory)?;
    Ok(home.join(".config"))
}
