use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use image::{imageops, RgbaImage};
use serde::{Deserialize, Serialize};

use super::{
    AssetId, DecodedImage, ObjectId, PixelRegion, RasterSource, SceneError, SceneEvent,
    SceneGraph, SceneObject, SceneResult, Snapshot,
};
use crate::geometry::{Color, Point};

#[derive(Serialize)]
struct SceneStateRef<'a> {
    background: Color,
    objects: Vec<&'a SceneObject>,
}

#[derive(Deserialize)]
struct SceneState {
    background: Color,
    objects: Vec<SceneObject>,
}

/// Scene graph kept entirely in memory, with decoded pixels in an asset
/// table so snapshots only carry asset handles. Assets stay until
/// [`RasterSource::release_unreferenced`] finds nothing pointing at them.
#[derive(Debug, Clone)]
pub struct MemoryScene {
    objects: Vec<SceneObject>,
    background: Color,
    active: Option<ObjectId>,
    editing: Option<ObjectId>,
    assets: HashMap<AssetId, Arc<RgbaImage>>,
    next_asset: u64,
    events: Vec<SceneEvent>,
    render_requests: usize,
}

impl Default for MemoryScene {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryScene {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            background: Color::WHITE,
            active: None,
            editing: None,
            assets: HashMap::new(),
            next_asset: 1,
            events: Vec::new(),
            render_requests: 0,
        }
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn render_requests(&self) -> usize {
        self.render_requests
    }

    pub fn editing(&self) -> Option<&ObjectId> {
        self.editing.as_ref()
    }

    pub fn asset(&self, asset: &AssetId) -> Option<&RgbaImage> {
        self.assets.get(asset).map(Arc::as_ref)
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    fn capture<'a>(
        &'a self,
        objects: impl Iterator<Item = &'a SceneObject>,
    ) -> SceneResult<Snapshot> {
        let state = SceneStateRef {
            background: self.background,
            objects: objects.collect(),
        };
        let json = serde_json::to_string(&state).map_err(SceneError::Serialize)?;
        Ok(Snapshot::new(json))
    }

    pub fn insert_asset(&mut self, pixels: RgbaImage) -> DecodedImage {
        let asset = AssetId::new(format!("asset_{}", self.next_asset));
        self.next_asset = self.next_asset.saturating_add(1);
        let (width, height) = pixels.dimensions();
        self.assets.insert(asset.clone(), Arc::new(pixels));
        DecodedImage {
            asset,
            width,
            height,
        }
    }

    /// A finished freehand stroke, reported the way a renderer reports it:
    /// a new object without an engine id.
    pub fn draw_stroke(&mut self, points: Vec<Point>, color: Color, width: f64) {
        let mut path = SceneObject::path(points);
        path.style.stroke = Some(color);
        path.style.stroke_width = width;
        self.add(path);
    }

    /// End of a pointer drag on `id`.
    pub fn drag_object(&mut self, id: &ObjectId, dx: f64, dy: f64) -> bool {
        self.modify(id, &mut |object| {
            object.left += dx;
            object.top += dy;
        })
    }

    /// End of a resize gesture on `id`.
    pub fn scale_object(&mut self, id: &ObjectId, scale_x: f64, scale_y: f64) -> bool {
        self.modify(id, &mut |object| {
            object.scale_x = scale_x;
            object.scale_y = scale_y;
        })
    }

    /// Keystrokes inside the text being edited; not reported until editing ends.
    pub fn type_text(&mut self, text: &str) -> bool {
        let Some(id) = self.editing.clone() else {
            return false;
        };
        let Some(object) = self.objects.iter_mut().find(|object| object.has_id(&id)) else {
            return false;
        };
        match object.as_text_mut() {
            Some(content) => {
                content.text = text.to_string();
                true
            }
            None => false,
        }
    }

    fn object_index(&self, id: &ObjectId) -> Option<usize> {
        self.objects.iter().position(|object| object.has_id(id))
    }
}

impl SceneGraph for MemoryScene {
    fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    fn add(&mut self, object: SceneObject) {
        let id = object.id.clone();
        self.objects.push(object);
        self.events.push(SceneEvent::ObjectAdded(id));
    }

    fn remove(&mut self, id: &ObjectId) -> Option<SceneObject> {
        let index = self.object_index(id)?;
        let removed = self.objects.remove(index);
        if self.editing.as_ref() == Some(id) {
            self.editing = None;
        }
        if self.active.as_ref() == Some(id) {
            self.active = None;
            self.events.push(SceneEvent::SelectionCleared);
        }
        self.events.push(SceneEvent::ObjectRemoved(Some(id.clone())));
        Some(removed)
    }

    fn replace_all(&mut self, objects: Vec<SceneObject>) {
        self.objects = objects;
        if let Some(active) = &self.active {
            if !self.objects.iter().any(|object| object.has_id(active)) {
                self.active = None;
            }
        }
    }

    fn modify(&mut self, id: &ObjectId, change: &mut dyn FnMut(&mut SceneObject)) -> bool {
        let Some(index) = self.object_index(id) else {
            return false;
        };
        change(&mut self.objects[index]);
        self.events.push(SceneEvent::ObjectModified(Some(id.clone())));
        true
    }

    fn for_each_object_mut(&mut self, visit: &mut dyn FnMut(&mut SceneObject)) {
        for object in &mut self.objects {
            visit(object);
        }
    }

    fn serialize(&self) -> SceneResult<Snapshot> {
        self.capture(self.objects.iter())
    }

    fn serialize_excluding(&self, transient: &ObjectId) -> SceneResult<Snapshot> {
        self.capture(self.objects.iter().filter(|object| !object.has_id(transient)))
    }

    fn restore(&mut self, snapshot: &Snapshot) -> SceneResult<()> {
        let state: SceneState =
            serde_json::from_str(snapshot.as_str()).map_err(SceneError::Restore)?;
        self.objects = state.objects;
        self.background = state.background;
        self.active = None;
        self.editing = None;
        Ok(())
    }

    fn active(&self) -> Option<&ObjectId> {
        self.active.as_ref()
    }

    fn set_active(&mut self, id: Option<ObjectId>) {
        let event = match (&self.active, &id) {
            (None, None) => None,
            (Some(_), None) => Some(SceneEvent::SelectionCleared),
            (None, Some(next)) => Some(SceneEvent::SelectionCreated(next.clone())),
            (Some(current), Some(next)) if current == next => None,
            (Some(_), Some(next)) => Some(SceneEvent::SelectionUpdated(next.clone())),
        };
        self.active = id;
        if let Some(event) = event {
            self.events.push(event);
        }
    }

    fn set_background(&mut self, color: Color) {
        self.background = color;
    }

    fn begin_text_editing(&mut self, id: &ObjectId) -> bool {
        let is_text = self
            .find(id)
            .is_some_and(|object| object.as_text().is_some());
        if !is_text {
            return false;
        }
        self.editing = Some(id.clone());
        self.events.push(SceneEvent::EditingEntered(id.clone()));
        true
    }

    fn end_text_editing(&mut self) -> bool {
        match self.editing.take() {
            Some(id) => {
                self.events.push(SceneEvent::EditingExited(id));
                true
            }
            None => false,
        }
    }

    fn request_render(&mut self) {
        self.render_requests = self.render_requests.saturating_add(1);
    }

    fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }
}

impl RasterSource for MemoryScene {
    fn decode_image(&mut self, bytes: &[u8]) -> SceneResult<DecodedImage> {
        let decoded = image::load_from_memory(bytes)?;
        Ok(self.insert_asset(decoded.to_rgba8()))
    }

    fn asset_dimensions(&self, asset: &AssetId) -> Option<(u32, u32)> {
        self.assets.get(asset).map(|pixels| pixels.dimensions())
    }

    fn extract_region(
        &mut self,
        asset: &AssetId,
        region: PixelRegion,
    ) -> SceneResult<DecodedImage> {
        let source = self
            .assets
            .get(asset)
            .cloned()
            .ok_or_else(|| SceneError::UnknownAsset(asset.as_str().to_string()))?;
        let (source_width, source_height) = source.dimensions();
        let fits = region.width > 0
            && region.height > 0
            && region
                .x
                .checked_add(region.width)
                .is_some_and(|right| right <= source_width)
            && region
                .y
                .checked_add(region.height)
                .is_some_and(|bottom| bottom <= source_height);
        if !fits {
            return Err(SceneError::RegionOutOfBounds {
                x: region.x,
                y: region.y,
                width: region.width,
                height: region.height,
            });
        }

        let cropped =
            imageops::crop_imm(source.as_ref(), region.x, region.y, region.width, region.height)
                .to_image();
        Ok(self.insert_asset(cropped))
    }

    fn release_unreferenced(&mut self, snapshots: &[&Snapshot]) -> SceneResult<usize> {
        let mut keep = HashSet::new();
        for object in &self.objects {
            object.collect_assets(&mut keep);
        }
        for snapshot in snapshots {
            let state: SceneState =
                serde_json::from_str(snapshot.as_str()).map_err(SceneError::Restore)?;
            for object in &state.objects {
                object.collect_assets(&mut keep);
            }
        }
        let before = self.assets.len();
        self.assets.retain(|asset, _| keep.contains(asset));
        Ok(before - self.assets.len())
    }
}
