//! Scene graph collaborator contract.
//!
//! The engine never draws; it talks to whatever owns the drawable objects
//! through [`SceneGraph`] and asks for pixel work through [`RasterSource`].
//! [`MemoryScene`] is the in-process implementation used by headless hosts
//! and tests.

mod memory;
mod object;

use std::sync::Arc;

use thiserror::Error;

pub use memory::MemoryScene;
pub use object::{
    AssetId, Interactivity, ObjectContent, ObjectId, ObjectKind, ObjectStyle, SceneObject, Shadow,
    ScriptSpan, ShapeKind, StrokeDash, TextAlign, TextContent, TextScript,
};

use crate::geometry::Color;

/// Immutable serialized capture of a whole scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot(Arc<str>);

impl Snapshot {
    pub fn new(data: impl Into<Arc<str>>) -> Self {
        Self(data.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    ObjectAdded(Option<ObjectId>),
    ObjectRemoved(Option<ObjectId>),
    ObjectModified(Option<ObjectId>),
    SelectionCreated(ObjectId),
    SelectionUpdated(ObjectId),
    SelectionCleared,
    EditingEntered(ObjectId),
    EditingExited(ObjectId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneEventKind {
    ObjectAdded,
    ObjectRemoved,
    ObjectModified,
    SelectionCreated,
    SelectionUpdated,
    SelectionCleared,
    EditingEntered,
    EditingExited,
}

impl SceneEventKind {
    pub const ALL: [SceneEventKind; 8] = [
        Self::ObjectAdded,
        Self::ObjectRemoved,
        Self::ObjectModified,
        Self::SelectionCreated,
        Self::SelectionUpdated,
        Self::SelectionCleared,
        Self::EditingEntered,
        Self::EditingExited,
    ];
}

impl SceneEvent {
    pub fn kind(&self) -> SceneEventKind {
        match self {
            Self::ObjectAdded(_) => SceneEventKind::ObjectAdded,
            Self::ObjectRemoved(_) => SceneEventKind::ObjectRemoved,
            Self::ObjectModified(_) => SceneEventKind::ObjectModified,
            Self::SelectionCreated(_) => SceneEventKind::SelectionCreated,
            Self::SelectionUpdated(_) => SceneEventKind::SelectionUpdated,
            Self::SelectionCleared => SceneEventKind::SelectionCleared,
            Self::EditingEntered(_) => SceneEventKind::EditingEntered,
            Self::EditingExited(_) => SceneEventKind::EditingExited,
        }
    }

    pub fn target(&self) -> Option<&ObjectId> {
        match self {
            Self::ObjectAdded(id) | Self::ObjectRemoved(id) | Self::ObjectModified(id) => {
                id.as_ref()
            }
            Self::SelectionCreated(id)
            | Self::SelectionUpdated(id)
            | Self::EditingEntered(id)
            | Self::EditingExited(id) => Some(id),
            Self::SelectionCleared => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("failed to serialize scene: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to restore scene snapshot: {0}")]
    Restore(#[source] serde_json::Error),
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("unknown image asset {0}")]
    UnknownAsset(String),
    #[error("object {0} not found")]
    ObjectNotFound(ObjectId),
    #[error("pixel region {width}x{height} at ({x}, {y}) is outside the source image")]
    RegionOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
}

pub type SceneResult<T> = std::result::Result<T, SceneError>;

/// Integer pixel rectangle inside an image asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub asset: AssetId,
    pub width: u32,
    pub height: u32,
}

/// Ordered object store with change notifications.
///
/// `add`, `remove`, `modify` and the selection calls queue a [`SceneEvent`];
/// `replace_all`, `restore` and `for_each_object_mut` are silent so callers
/// decide themselves whether the change is worth a history entry.
pub trait SceneGraph {
    /// Paint order, back to front.
    fn objects(&self) -> &[SceneObject];
    fn add(&mut self, object: SceneObject);
    fn remove(&mut self, id: &ObjectId) -> Option<SceneObject>;
    fn replace_all(&mut self, objects: Vec<SceneObject>);
    /// Applies `change` to one object and reports it as modified.
    fn modify(&mut self, id: &ObjectId, change: &mut dyn FnMut(&mut SceneObject)) -> bool;
    fn for_each_object_mut(&mut self, visit: &mut dyn FnMut(&mut SceneObject));
    fn serialize(&self) -> SceneResult<Snapshot>;
    /// Same as [`SceneGraph::serialize`] with `transient` left out.
    fn serialize_excluding(&self, transient: &ObjectId) -> SceneResult<Snapshot>;
    fn restore(&mut self, snapshot: &Snapshot) -> SceneResult<()>;
    fn active(&self) -> Option<&ObjectId>;
    fn set_active(&mut self, id: Option<ObjectId>);
    fn set_background(&mut self, color: Color);
    /// Asks the collaborator to start in-place text editing on `id`.
    fn begin_text_editing(&mut self, id: &ObjectId) -> bool;
    /// Ends in-place editing, reporting `EditingExited` if it was active.
    fn end_text_editing(&mut self) -> bool;
    fn request_render(&mut self);
    fn drain_events(&mut self) -> Vec<SceneEvent>;

    fn find(&self, id: &ObjectId) -> Option<&SceneObject> {
        self.objects().iter().find(|object| object.has_id(id))
    }

    fn active_object(&self) -> Option<&SceneObject> {
        let id = self.active()?;
        self.find(id)
    }
}

/// Pixel-level work delegated to the rendering collaborator.
pub trait RasterSource {
    fn decode_image(&mut self, bytes: &[u8]) -> SceneResult<DecodedImage>;
    fn asset_dimensions(&self, asset: &AssetId) -> Option<(u32, u32)>;
    fn extract_region(&mut self, asset: &AssetId, region: PixelRegion)
        -> SceneResult<DecodedImage>;
    /// Drops decoded assets used neither by the live scene nor by any of
    /// `snapshots`. Returns how many were released.
    fn release_unreferenced(&mut self, snapshots: &[&Snapshot]) -> SceneResult<usize>;
}
