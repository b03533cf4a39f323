use std::collections::HashSet;

use super::{Editor, EditorError, EditorResult};
use crate::layers::LayerError;
use crate::scene::{ObjectId, ObjectKind, RasterSource, SceneGraph, SceneObject};

impl<S: SceneGraph + RasterSource> Editor<S> {
    /// Merges `ids` into one group placed at the topmost member's slot in
    /// the paint order. The group becomes the selection; records once.
    pub fn group(&mut self, ids: &[ObjectId]) -> EditorResult<ObjectId> {
        let result = self.try_group(ids);
        self.surface(result)
    }

    fn try_group(&mut self, ids: &[ObjectId]) -> EditorResult<ObjectId> {
        let members: HashSet<&ObjectId> = ids.iter().collect();
        for id in &members {
            let Some(object) = self.scene.find(id) else {
                return Err(LayerError::LayerNotFound((*id).clone()).into());
            };
            if self.crop.as_ref().is_some_and(|session| session.involves(id)) {
                return Err(EditorError::InvalidTarget("the crop overlay cannot be grouped"));
            }
            if object.is_locked() {
                return Err(EditorError::InvalidTarget("locked objects cannot be grouped"));
            }
        }
        if members.len() < 2 {
            return Err(EditorError::InvalidTarget("grouping needs at least two objects"));
        }
        self.prepare_for_insert()?;

        let group_id = self.layers.allocate_id(&self.scene);
        let mut remaining = Vec::with_capacity(self.scene.objects().len());
        let mut grouped = Vec::with_capacity(members.len());
        let mut slot = 0;
        for object in self.scene.objects() {
            if object.id.as_ref().is_some_and(|id| members.contains(id)) {
                grouped.push(object.clone());
                slot = remaining.len();
            } else {
                remaining.push(object.clone());
            }
        }
        let count = grouped.len();
        remaining.insert(slot, SceneObject::group(grouped).with_id(group_id.clone()));

        self.scene.replace_all(remaining);
        self.scene.set_active(Some(group_id.clone()));
        self.scene.request_render();
        self.pump_events()?;
        self.layers.generate_layers(&mut self.scene);
        self.commit()?;
        tracing::debug!(group = %group_id, members = count, "objects grouped");
        Ok(group_id)
    }

    /// Splits group `id` back into its members at the group's slot and
    /// selects the topmost of them; records once.
    pub fn ungroup(&mut self, id: &ObjectId) -> EditorResult<Vec<ObjectId>> {
        let result = self.try_ungroup(id);
        self.surface(result)
    }

    fn try_ungroup(&mut self, id: &ObjectId) -> EditorResult<Vec<ObjectId>> {
        let Some(slot) = self
            .scene
            .objects()
            .iter()
            .position(|object| object.has_id(id))
        else {
            return Err(LayerError::LayerNotFound(id.clone()).into());
        };
        let group = &self.scene.objects()[slot];
        if group.kind() != ObjectKind::Group {
            return Err(EditorError::InvalidTarget("only groups can be ungrouped"));
        }
        if group.is_locked() {
            return Err(EditorError::InvalidTarget("locked groups cannot be ungrouped"));
        }
        self.prepare_for_insert()?;

        let mut objects = self.scene.objects().to_vec();
        let group = objects.remove(slot);
        let members = group.into_children().unwrap_or_default();
        let count = members.len();
        objects.splice(slot..slot, members);
        self.scene.replace_all(objects);
        // Members saved without ids get them before one can be selected.
        self.layers.generate_layers(&mut self.scene);

        let released: Vec<ObjectId> = self.scene.objects()[slot..slot + count]
            .iter()
            .filter_map(|object| object.id.clone())
            .collect();
        self.scene.set_active(released.last().cloned());
        self.scene.request_render();
        self.pump_events()?;
        self.layers.generate_layers(&mut self.scene);
        self.commit()?;
        tracing::debug!(group = %id, members = count, "group split");
        Ok(released)
    }
}
