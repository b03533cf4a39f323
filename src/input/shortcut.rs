use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortcutKey {
    Character(char),
    Enter,
    Escape,
    Delete,
    Backspace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct ShortcutModifiers {
    pub ctrl: bool,
    pub shift: bool,
}

impl ShortcutModifiers {
    pub const fn new(ctrl: bool, shift: bool) -> Self {
        Self { ctrl, shift }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputContext {
    pub text_input_active: bool,
    pub crop_active: bool,
    pub draw_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    TextExitFocus,
    CropApply,
    CropCancel,
    Undo,
    Redo,
    DeleteSelection,
    EnterSelect,
    ToggleDraw,
    EnterCrop,
}

fn resolve_text_shortcut(key: ShortcutKey) -> Option<ShortcutAction> {
    match key {
        ShortcutKey::Escape => Some(ShortcutAction::TextExitFocus),
        _ => None,
    }
}

fn resolve_crop_shortcut(key: ShortcutKey) -> Option<ShortcutAction> {
    match key {
        ShortcutKey::Enter => Some(ShortcutAction::CropApply),
        ShortcutKey::Escape => Some(ShortcutAction::CropCancel),
        _ => None,
    }
}

fn resolve_tool_shortcut(key: ShortcutKey) -> Option<ShortcutAction> {
    match key {
        ShortcutKey::Character('v') => Some(ShortcutAction::EnterSelect),
        ShortcutKey::Character('d') => Some(ShortcutAction::ToggleDraw),
        ShortcutKey::Character('c') => Some(ShortcutAction::EnterCrop),
        _ => None,
    }
}

fn resolve_editor_shortcut(
    key: ShortcutKey,
    modifiers: ShortcutModifiers,
    context: InputContext,
) -> Option<ShortcutAction> {
    match (key, modifiers.ctrl, modifiers.shift) {
        (ShortcutKey::Character('z'), true, false) => Some(ShortcutAction::Undo),
        (ShortcutKey::Character('z'), true, true) | (ShortcutKey::Character('y'), true, _) => {
            Some(ShortcutAction::Redo)
        }
        (ShortcutKey::Delete, false, false) | (ShortcutKey::Backspace, false, false) => {
            Some(ShortcutAction::DeleteSelection)
        }
        (ShortcutKey::Escape, false, false) if context.draw_active => {
            Some(ShortcutAction::EnterSelect)
        }
        (_, false, false) => resolve_tool_shortcut(key),
        _ => None,
    }
}

/// Maps a key press to an editor action. Text editing swallows everything
/// but Escape, and an open crop only answers to Enter and Escape.
pub fn resolve_shortcut(
    key: ShortcutKey,
    modifiers: ShortcutModifiers,
    context: InputContext,
) -> Option<ShortcutAction> {
    if context.text_input_active {
        return resolve_text_shortcut(key);
    }

    if context.crop_active {
        return resolve_crop_shortcut(key);
    }

    resolve_editor_shortcut(key, modifiers, context)
}
