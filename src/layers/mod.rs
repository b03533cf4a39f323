//! User-facing layer list derived from the scene's paint order.
//!
//! Layers are a front-to-back projection: index 0 is the topmost object.
//! They are rebuilt from the scene after every structural change and are
//! never stored on their own.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scene::{ObjectId, ObjectKind, SceneGraph, SceneObject, ShapeKind};

const TEXT_NAME_PREVIEW_CHARS: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayerError {
    #[error("layer {0} not found")]
    LayerNotFound(ObjectId),
    #[error("target index {index} is outside the layer list of {len}")]
    TargetOutOfRange { index: usize, len: usize },
}

pub type LayerResult<T> = std::result::Result<T, LayerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerIcon {
    Text,
    Image,
    Rectangle,
    Circle,
    Triangle,
    Line,
    Polygon,
    Drawing,
    Group,
    Generic,
}

impl LayerIcon {
    pub const fn for_kind(kind: ObjectKind) -> Self {
        match kind {
            ObjectKind::Text => Self::Text,
            ObjectKind::Image => Self::Image,
            ObjectKind::Shape(ShapeKind::Rect) => Self::Rectangle,
            ObjectKind::Shape(ShapeKind::Circle) => Self::Circle,
            ObjectKind::Shape(ShapeKind::Triangle) => Self::Triangle,
            ObjectKind::Shape(ShapeKind::Line) => Self::Line,
            ObjectKind::Shape(ShapeKind::Polygon) => Self::Polygon,
            ObjectKind::Path => Self::Drawing,
            ObjectKind::Group => Self::Group,
            ObjectKind::Other => Self::Generic,
        }
    }

    /// Short glyph for text-only layer lists.
    pub const fn glyph(self) -> &'static str {
        match self {
            Self::Text => "T",
            Self::Image => "▣",
            Self::Rectangle => "▭",
            Self::Circle => "○",
            Self::Triangle => "🔺",
            Self::Line => "📏",
            Self::Polygon => "⬟",
            Self::Drawing => "✎",
            Self::Group => "⧉",
            Self::Generic => "◯",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layer {
    pub id: ObjectId,
    pub display_name: String,
    pub icon: LayerIcon,
    pub visible: bool,
    pub locked: bool,
    /// Position in paint order, 0 = backmost.
    pub z_index: usize,
    pub active: bool,
}

/// Where a dragged layer lands relative to the hovered row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropPlacement {
    Before,
    After,
}

impl DropPlacement {
    /// Pointer above the row's vertical midpoint inserts before it; the
    /// midpoint itself and everything below inserts after.
    pub fn from_pointer(pointer_y: f64, row_top: f64, row_height: f64) -> Self {
        let midpoint = row_top + row_height / 2.0;
        if pointer_y < midpoint {
            Self::Before
        } else {
            Self::After
        }
    }

    pub const fn insert_before(self) -> bool {
        matches!(self, Self::Before)
    }
}

/// Ids in use, group members included so ungrouping never collides.
fn taken_ids(objects: &[SceneObject]) -> HashSet<&ObjectId> {
    let mut taken = HashSet::new();
    let mut pending: Vec<&SceneObject> = objects.iter().collect();
    while let Some(object) = pending.pop() {
        if let Some(id) = &object.id {
            taken.insert(id);
        }
        pending.extend(object.members());
    }
    taken
}

pub fn display_name(object: &SceneObject) -> String {
    match object.kind() {
        ObjectKind::Text => match object.as_text() {
            Some(content) if !content.text.is_empty() => {
                let preview: String = content.text.chars().take(TEXT_NAME_PREVIEW_CHARS).collect();
                if content.text.chars().count() > TEXT_NAME_PREVIEW_CHARS {
                    format!("Text: {preview}...")
                } else {
                    format!("Text: {preview}")
                }
            }
            _ => "Text Layer".to_string(),
        },
        ObjectKind::Image => "Image Layer".to_string(),
        ObjectKind::Shape(ShapeKind::Rect) => "Rectangle".to_string(),
        ObjectKind::Shape(ShapeKind::Circle) => "Circle".to_string(),
        ObjectKind::Shape(ShapeKind::Triangle) => "Triangle".to_string(),
        ObjectKind::Shape(ShapeKind::Line) => "Line".to_string(),
        ObjectKind::Shape(ShapeKind::Polygon) => "Polygon".to_string(),
        ObjectKind::Path => "Drawing".to_string(),
        ObjectKind::Group => "Group".to_string(),
        ObjectKind::Other => match &object.content {
            crate::scene::ObjectContent::Other { type_name } => format!("{type_name} Layer"),
            _ => "Layer".to_string(),
        },
    }
}

#[derive(Debug, Clone, Default)]
pub struct LayerIndex {
    layers: Vec<Layer>,
    next_id: u64,
}

impl LayerIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn position(&self, id: &ObjectId) -> Option<usize> {
        self.layers.iter().position(|layer| &layer.id == id)
    }

    pub fn get(&self, id: &ObjectId) -> Option<&Layer> {
        self.layers.iter().find(|layer| &layer.id == id)
    }

    /// Returns an id not used by any object in `scene`.
    pub fn allocate_id<S: SceneGraph + ?Sized>(&mut self, scene: &S) -> ObjectId {
        let taken = taken_ids(scene.objects());
        self.next_free_id(&taken)
    }

    fn next_free_id(&mut self, taken: &HashSet<&ObjectId>) -> ObjectId {
        loop {
            self.next_id = self.next_id.saturating_add(1);
            let candidate = ObjectId::new(format!("layer_{}", self.next_id));
            if !taken.contains(&candidate) {
                return candidate;
            }
        }
    }

    /// Rebuilds the list from the scene, assigning ids to objects that lack
    /// one. The assignment is silent: it is bookkeeping, not an edit.
    pub fn generate_layers<S: SceneGraph + ?Sized>(&mut self, scene: &mut S) -> &[Layer] {
        let missing_ids = scene.objects().iter().any(|object| object.id.is_none());
        if missing_ids {
            let mut fresh = Vec::new();
            {
                let taken = taken_ids(scene.objects());
                for _ in scene.objects().iter().filter(|object| object.id.is_none()) {
                    fresh.push(self.next_free_id(&taken));
                }
            }
            let mut fresh = fresh.into_iter();
            scene.for_each_object_mut(&mut |object| {
                if object.id.is_none() {
                    object.id = fresh.next();
                }
            });
        }

        let active = scene.active().cloned();
        let mut layers = Vec::with_capacity(scene.objects().len());
        for (z_index, object) in scene.objects().iter().enumerate() {
            let Some(id) = object.id.clone() else {
                continue;
            };
            layers.push(Layer {
                active: active.as_ref() == Some(&id),
                display_name: display_name(object),
                icon: LayerIcon::for_kind(object.kind()),
                visible: object.visible,
                locked: object.is_locked(),
                z_index,
                id,
            });
        }
        layers.reverse();
        self.layers = layers;
        &self.layers
    }

    /// Moves `dragged_id` next to the layer currently at `target_index` in
    /// display order and rewrites the scene's paint order to match.
    ///
    /// Returns `Ok(false)` when the move leaves the order unchanged.
    pub fn reorder<S: SceneGraph + ?Sized>(
        &mut self,
        scene: &mut S,
        dragged_id: &ObjectId,
        target_index: usize,
        placement: DropPlacement,
    ) -> LayerResult<bool> {
        self.generate_layers(scene);

        let len = self.layers.len();
        let current = self
            .position(dragged_id)
            .ok_or_else(|| LayerError::LayerNotFound(dragged_id.clone()))?;
        if target_index >= len {
            return Err(LayerError::TargetOutOfRange {
                index: target_index,
                len,
            });
        }

        let mut destination = if placement.insert_before() {
            target_index
        } else {
            target_index + 1
        };
        if current < destination {
            destination -= 1;
        }
        if destination == current {
            tracing::debug!(layer = %dragged_id, index = current, "reorder leaves order unchanged");
            return Ok(false);
        }

        let layer = self.layers.remove(current);
        self.layers.insert(destination, layer);

        let active = scene.active().cloned();
        let mut by_id: HashMap<ObjectId, SceneObject> = scene
            .objects()
            .iter()
            .filter_map(|object| object.id.clone().map(|id| (id, object.clone())))
            .collect();
        let paint_order: Vec<SceneObject> = self
            .layers
            .iter()
            .rev()
            .filter_map(|layer| by_id.remove(&layer.id))
            .collect();
        scene.replace_all(paint_order);
        if active.is_some() {
            scene.set_active(active);
        }
        scene.request_render();

        tracing::debug!(
            layer = %dragged_id,
            from = current,
            to = destination,
            "reordered layer"
        );
        self.generate_layers(scene);
        Ok(true)
    }
}
