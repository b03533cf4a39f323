use thiserror::Error;

use super::{SessionState, ToolEvent, ToolMode};
use crate::scene::SceneGraph;

const TRANSITION_HISTORY_LIMIT: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("invalid tool transition: from {from:?} using event {event:?}")]
    InvalidTransition { from: ToolMode, event: ToolEvent },
}

pub type ToolResult<T> = std::result::Result<T, ToolError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeTransition {
    pub from: ToolMode,
    pub event: ToolEvent,
    pub to: ToolMode,
}

/// Finite-state machine over the interaction modes.
///
/// The controller only decides which mode is next and which pointer flags
/// that mode imposes; tearing down crop sessions and recording history is
/// done by the editor around each transition.
#[derive(Debug, Clone, Default)]
pub struct ToolController {
    mode: ToolMode,
    session: SessionState,
    transition_history: Vec<ModeTransition>,
}

impl ToolController {
    pub fn new(session: SessionState) -> Self {
        Self {
            mode: ToolMode::Select,
            session,
            transition_history: Vec::new(),
        }
    }

    pub fn mode(&self) -> &ToolMode {
        &self.mode
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionState {
        &mut self.session
    }

    pub fn is_drawing(&self) -> bool {
        self.mode == ToolMode::Draw
    }

    pub fn can_transition(&self, event: &ToolEvent) -> bool {
        self.next_mode(event).is_some()
    }

    pub fn next_mode(&self, event: &ToolEvent) -> Option<ToolMode> {
        use ToolEvent::*;
        match (&self.mode, event) {
            (_, EnterSelect) => Some(ToolMode::Select),
            (_, EnterDraw) => Some(ToolMode::Draw),
            (_, EnterCrop) => Some(ToolMode::Crop),
            (ToolMode::Crop, ConfirmCrop | CancelCrop) => Some(ToolMode::Select),
            (ToolMode::Select | ToolMode::TextEdit(_), BeginTextEdit(id)) => {
                Some(ToolMode::TextEdit(id.clone()))
            }
            (ToolMode::TextEdit(_), EndTextEdit) => Some(ToolMode::Select),
            _ => None,
        }
    }

    pub fn transition(&mut self, event: ToolEvent) -> ToolResult<ToolMode> {
        tracing::debug!(from = ?self.mode, event = ?event, "request tool transition");
        let Some(next) = self.next_mode(&event) else {
            let from = self.mode.clone();
            tracing::warn!(from = ?from, event = ?event, "invalid tool transition requested");
            return Err(ToolError::InvalidTransition { from, event });
        };

        let record = ModeTransition {
            from: std::mem::replace(&mut self.mode, next),
            event,
            to: self.mode.clone(),
        };
        if self.transition_history.len() == TRANSITION_HISTORY_LIMIT {
            self.transition_history.remove(0);
        }
        self.transition_history.push(record);

        Ok(self.mode.clone())
    }

    pub fn last_transition(&self) -> Option<&ModeTransition> {
        self.transition_history.last()
    }

    /// Brings every object's pointer flags in line with the current mode.
    /// Locked objects are never re-enabled.
    pub fn apply_interactivity<S: SceneGraph + ?Sized>(&self, scene: &mut S) {
        let suppress = self.mode.suppresses_object_pointer();
        scene.for_each_object_mut(&mut |object| {
            if suppress {
                object.interactivity.suppress_pointer();
            } else if !object.is_locked() {
                object.interactivity.restore_pointer();
            }
        });
    }
}

#[cfg(test)]
impl ToolController {
    fn history(&self) -> &[ModeTransition] {
        &self.transition_history
    }
}

impl std::fmt::Display for ToolController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ToolMode::{:?}", self.mode)
    }
}
