use std::collections::HashMap;

use crate::crop::CropSession;
use crate::scene::{ObjectId, SceneEvent, SceneEventKind};
use crate::tools::ToolMode;

/// What one batch of scene events asks the editor to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct Reactions {
    pub(super) commit: bool,
    /// Record only if the scene differs from the active snapshot.
    pub(super) commit_if_changed: bool,
    pub(super) refresh_layers: bool,
    pub(super) object_added: bool,
    pub(super) editing_entered: Option<ObjectId>,
    pub(super) editing_exited: Option<ObjectId>,
}

/// Read-only view of the editor state handlers may consult.
pub(super) struct EventContext<'a> {
    mode: &'a ToolMode,
    crop: Option<&'a CropSession>,
    reactions: Reactions,
}

impl<'a> EventContext<'a> {
    pub(super) fn new(mode: &'a ToolMode, crop: Option<&'a CropSession>) -> Self {
        Self {
            mode,
            crop,
            reactions: Reactions::default(),
        }
    }

    pub(super) fn into_reactions(self) -> Reactions {
        self.reactions
    }

    fn is_crop_overlay(&self, id: Option<&ObjectId>) -> bool {
        matches!((self.crop, id), (Some(session), Some(id)) if session.involves(id))
    }
}

type EventHandler = fn(&mut EventContext<'_>, &SceneEvent);

/// Subscription table installed once per editor. Modes change what the
/// handlers decide, never which handlers are registered.
pub(super) struct EventTable {
    handlers: HashMap<SceneEventKind, EventHandler>,
}

impl EventTable {
    pub(super) fn install() -> Self {
        let mut handlers: HashMap<SceneEventKind, EventHandler> = HashMap::new();
        for kind in SceneEventKind::ALL {
            let handler: EventHandler = match kind {
                SceneEventKind::ObjectAdded => on_object_added,
                SceneEventKind::ObjectRemoved | SceneEventKind::ObjectModified => on_object_changed,
                SceneEventKind::SelectionCreated
                | SceneEventKind::SelectionUpdated
                | SceneEventKind::SelectionCleared => on_selection_changed,
                SceneEventKind::EditingEntered => on_editing_entered,
                SceneEventKind::EditingExited => on_editing_exited,
            };
            handlers.insert(kind, handler);
        }
        Self { handlers }
    }

    pub(super) fn dispatch(&self, context: &mut EventContext<'_>, event: &SceneEvent) {
        match self.handlers.get(&event.kind()) {
            Some(handler) => handler(context, event),
            None => tracing::warn!(?event, "no handler registered for scene event"),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.handlers.len()
    }
}

fn on_object_added(context: &mut EventContext<'_>, event: &SceneEvent) {
    context.reactions.refresh_layers = true;
    if context.is_crop_overlay(event.target()) {
        return;
    }
    context.reactions.object_added = true;
    context.reactions.commit = true;
}

fn on_object_changed(context: &mut EventContext<'_>, event: &SceneEvent) {
    context.reactions.refresh_layers = true;
    if context.is_crop_overlay(event.target()) {
        tracing::trace!(?event, "crop overlay change is transient");
        return;
    }
    context.reactions.commit = true;
}

fn on_selection_changed(context: &mut EventContext<'_>, _event: &SceneEvent) {
    context.reactions.refresh_layers = true;
}

fn on_editing_entered(context: &mut EventContext<'_>, event: &SceneEvent) {
    if let Some(id) = event.target() {
        if context.mode != &ToolMode::TextEdit(id.clone()) {
            context.reactions.editing_entered = Some(id.clone());
        }
    }
}

fn on_editing_exited(context: &mut EventContext<'_>, event: &SceneEvent) {
    context.reactions.refresh_layers = true;
    context.reactions.commit_if_changed = true;
    if let Some(id) = event.target() {
        context.reactions.editing_exited = Some(id.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> CropSession {
        CropSession {
            target_image_id: ObjectId::new("image"),
            overlay_rect_id: ObjectId::new("overlay"),
        }
    }

    fn run(mode: &ToolMode, crop: Option<&CropSession>, events: &[SceneEvent]) -> Reactions {
        let table = EventTable::install();
        let mut context = EventContext::new(mode, crop);
        for event in events {
            table.dispatch(&mut context, event);
        }
        context.into_reactions()
    }

    #[test]
    fn every_event_kind_has_a_handler() {
        assert_eq!(EventTable::install().len(), SceneEventKind::ALL.len());
    }

    #[test]
    fn selection_events_refresh_without_committing() {
        let reactions = run(
            &ToolMode::Select,
            None,
            &[
                SceneEvent::SelectionCreated(ObjectId::new("a")),
                SceneEvent::SelectionCleared,
            ],
        );
        assert!(reactions.refresh_layers);
        assert!(!reactions.commit);
    }

    #[test]
    fn crop_overlay_events_are_transient() {
        let session = session();
        let overlay = Some(ObjectId::new("overlay"));
        let reactions = run(
            &ToolMode::Crop,
            Some(&session),
            &[
                SceneEvent::ObjectAdded(overlay.clone()),
                SceneEvent::ObjectModified(overlay.clone()),
                SceneEvent::ObjectRemoved(overlay),
            ],
        );
        assert!(!reactions.commit);
        assert!(!reactions.object_added);
    }

    #[test]
    fn several_mutations_coalesce_into_one_commit_request() {
        let session = session();
        let reactions = run(
            &ToolMode::Crop,
            Some(&session),
            &[
                SceneEvent::ObjectRemoved(Some(ObjectId::new("image"))),
                SceneEvent::ObjectRemoved(Some(ObjectId::new("overlay"))),
                SceneEvent::ObjectAdded(Some(ObjectId::new("cropped"))),
            ],
        );
        assert!(reactions.commit);
        assert!(reactions.object_added);
    }

    #[test]
    fn editing_events_report_their_target() {
        let id = ObjectId::new("text");
        let entered = run(
            &ToolMode::Select,
            None,
            &[SceneEvent::EditingEntered(id.clone())],
        );
        assert_eq!(entered.editing_entered, Some(id.clone()));
        assert!(!entered.commit);

        let already_editing = run(
            &ToolMode::TextEdit(id.clone()),
            None,
            &[SceneEvent::EditingEntered(id.clone())],
        );
        assert_eq!(already_editing.editing_entered, None);

        let exited = run(
            &ToolMode::TextEdit(id.clone()),
            None,
            &[SceneEvent::EditingExited(id.clone())],
        );
        assert_eq!(exited.editing_exited, Some(id));
        assert!(exited.commit_if_changed);
        assert!(!exited.commit);
    }
}
