//! Crop sub-session: an overlay rectangle over one image that, on confirm,
//! is turned into a pixel extraction and a replacement image.

mod preset;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use preset::CropPreset;

use crate::geometry::{Color, Point, Rect};
use crate::scene::{
    Interactivity, ObjectId, ObjectKind, ObjectStyle, PixelRegion, SceneObject, ShapeKind,
    StrokeDash,
};

const OVERLAY_STROKE: Color = Color::new(255, 0, 0);
const OVERLAY_FILL: Color = Color::rgba(0, 0, 0, 26);
const OVERLAY_STROKE_WIDTH: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CropError {
    #[error("select an image to crop")]
    NotAnImage,
    #[error("crop target {0} no longer exists")]
    TargetMissing(ObjectId),
    #[error("crop region has no area")]
    DegenerateGeometry,
}

/// Where the overlay starts relative to its image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropDefaults {
    /// Offset of the overlay from the image's top-left corner, canvas units.
    pub inset: f64,
    /// Overlay size as a fraction of the image's displayed size.
    pub fraction: f64,
    pub preset: CropPreset,
}

impl Default for CropDefaults {
    fn default() -> Self {
        Self {
            inset: 20.0,
            fraction: 0.6,
            preset: CropPreset::Free,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CropSession {
    pub target_image_id: ObjectId,
    pub overlay_rect_id: ObjectId,
}

impl CropSession {
    pub fn involves(&self, id: &ObjectId) -> bool {
        &self.overlay_rect_id == id
    }
}

/// Initial overlay rectangle in canvas coordinates, kept inside the image.
pub fn default_overlay(image: &SceneObject, defaults: &CropDefaults) -> Rect {
    let bounds = image.bounds();
    let inset = defaults
        .inset
        .max(0.0)
        .min(bounds.width / 2.0)
        .min(bounds.height / 2.0);
    let fraction = defaults.fraction.clamp(0.0, 1.0);
    let max_width = (bounds.width - inset).max(0.0);
    let max_height = (bounds.height - inset).max(0.0);
    let mut width = (bounds.width * fraction).min(max_width);
    let mut height = (bounds.height * fraction).min(max_height);

    if let Some((ratio_x, ratio_y)) = defaults.preset.resolve_ratio(bounds.width, bounds.height) {
        (width, height) = preset::adjust_ratio_to_fit(width, height, ratio_x, ratio_y);
    }

    Rect::new(bounds.left + inset, bounds.top + inset, width, height)
}

pub fn overlay_object(id: ObjectId, rect: Rect) -> SceneObject {
    let mut overlay =
        SceneObject::shape(ShapeKind::Rect, rect.left, rect.top, rect.width, rect.height)
            .with_id(id);
    overlay.interactivity = Interactivity::INTERACTIVE;
    overlay.style = ObjectStyle {
        fill: Some(OVERLAY_FILL),
        stroke: Some(OVERLAY_STROKE),
        stroke_width: OVERLAY_STROKE_WIDTH,
        stroke_dash: StrokeDash::Dashed,
        shadow: None,
    };
    overlay
}

/// Overlay expressed in the image's unscaled pixel space.
pub fn local_region(image: &SceneObject, overlay: &SceneObject) -> Rect {
    Rect::new(
        (overlay.left - image.left) / image.scale_x,
        (overlay.top - image.top) / image.scale_y,
        overlay.width * overlay.scale_x / image.scale_x,
        overlay.height * overlay.scale_y / image.scale_y,
    )
}

/// Cuts `region` down to the image's own bounds.
pub fn clamp_region(region: Rect, image_width: f64, image_height: f64) -> Option<Rect> {
    region.intersect(&Rect::new(0.0, 0.0, image_width, image_height))
}

fn pixel_region(region: Rect, image_width: u32, image_height: u32) -> Option<PixelRegion> {
    let left = region.left.round().clamp(0.0, f64::from(image_width));
    let top = region.top.round().clamp(0.0, f64::from(image_height));
    let right = region.right().round().clamp(0.0, f64::from(image_width));
    let bottom = region.bottom().round().clamp(0.0, f64::from(image_height));
    if right <= left || bottom <= top {
        return None;
    }
    // Values are clamped to the u32 image size above.
    Some(PixelRegion {
        x: left as u32,
        y: top as u32,
        width: (right - left) as u32,
        height: (bottom - top) as u32,
    })
}

/// Everything the confirm step needs, computed before any mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct CropPlan {
    pub region: Rect,
    pub pixels: PixelRegion,
    pub placement: Point,
    pub scale_x: f64,
    pub scale_y: f64,
}

/// Validates the overlay against the image and plans the extraction.
///
/// `pixel_size` is the source asset's real pixel size; the image object's
/// intrinsic size is used when the collaborator cannot report one.
pub fn plan_crop(
    image: &SceneObject,
    overlay: &SceneObject,
    pixel_size: Option<(u32, u32)>,
) -> Result<CropPlan, CropError> {
    if image.kind() != ObjectKind::Image {
        return Err(CropError::NotAnImage);
    }
    if image.scale_x == 0.0 || image.scale_y == 0.0 {
        return Err(CropError::DegenerateGeometry);
    }

    let requested = local_region(image, overlay);
    if requested.is_degenerate() {
        return Err(CropError::DegenerateGeometry);
    }

    let (pixel_width, pixel_height) = pixel_size.unwrap_or((
        image.width.max(0.0).round() as u32,
        image.height.max(0.0).round() as u32,
    ));
    let region = clamp_region(requested, f64::from(pixel_width), f64::from(pixel_height))
        .ok_or(CropError::DegenerateGeometry)?;
    if region != requested {
        tracing::debug!(?requested, clamped = ?region, "crop overlay clamped to image bounds");
    }
    let pixels =
        pixel_region(region, pixel_width, pixel_height).ok_or(CropError::DegenerateGeometry)?;

    Ok(CropPlan {
        placement: Point::new(
            image.left + f64::from(pixels.x) * image.scale_x,
            image.top + f64::from(pixels.y) * image.scale_y,
        ),
        scale_x: image.scale_x,
        scale_y: image.scale_y,
        region,
        pixels,
    })
}
