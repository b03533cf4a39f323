use std::sync::Arc;

use serde::Deserialize;

use super::{Editor, EditorResult};
use crate::generation::{
    spawn_generation, GenerationRequest, GenerationResult, ImageFetcher, ImageGenerator, ImageSize,
    PendingGeneration,
};
use crate::geometry::{Color, Point};
use crate::scene::{
    ObjectContent, ObjectId, RasterSource, SceneGraph, SceneObject, ShapeKind, TextContent,
};
use crate::tools::{ToolEvent, ToolMode};

const PRESET_ORIGIN: Point = Point::new(200.0, 200.0);
const TEXT_ORIGIN: Point = Point::new(100.0, 100.0);
const SHAPE_STROKE: Color = Color::new(0x22, 0x22, 0x22);
const HEART_FILL: Color = Color::new(0xdd, 0x22, 0x22);
const SHAPE_STROKE_WIDTH: f64 = 2.0;
const LINE_STROKE_WIDTH: f64 = 4.0;
const GLYPH_FONT_SIZE: f64 = 60.0;
const GLYPH_FONT_FAMILY: &str = "Arial";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShapePreset {
    #[serde(rename = "rect")]
    Rectangle,
    SmallSquare,
    BigSquare,
    Circle,
    Triangle,
    Line,
    Diamond,
    #[serde(rename = "polygon")]
    Pentagon,
    HollowStar,
    HollowHeart,
    HollowArrow,
    Arrow,
    HollowCircleSmall,
    HollowCross,
    HollowCheck,
}

impl ShapePreset {
    pub const ALL: [ShapePreset; 15] = [
        Self::Rectangle,
        Self::SmallSquare,
        Self::BigSquare,
        Self::Circle,
        Self::Triangle,
        Self::Line,
        Self::Diamond,
        Self::Pentagon,
        Self::HollowStar,
        Self::HollowHeart,
        Self::HollowArrow,
        Self::Arrow,
        Self::HollowCircleSmall,
        Self::HollowCross,
        Self::HollowCheck,
    ];

    const fn glyph(self) -> Option<(&'static str, Color)> {
        match self {
            Self::HollowStar => Some(("☆", SHAPE_STROKE)),
            Self::HollowHeart => Some(("♡", HEART_FILL)),
            Self::HollowArrow => Some(("⇨", SHAPE_STROKE)),
            Self::Arrow => Some(("→", SHAPE_STROKE)),
            Self::HollowCircleSmall => Some(("◌", SHAPE_STROKE)),
            Self::HollowCross => Some(("✝", SHAPE_STROKE)),
            Self::HollowCheck => Some(("☐", SHAPE_STROKE)),
            _ => None,
        }
    }

    /// Builds the preset at `origin` with its default outline.
    pub fn build(self, origin: Point) -> SceneObject {
        if let Some((glyph, color)) = self.glyph() {
            let content = TextContent::new(glyph, GLYPH_FONT_SIZE, GLYPH_FONT_FAMILY);
            let mut object = SceneObject::text(content, origin.x, origin.y, GLYPH_FONT_SIZE);
            object.style.fill = Some(color);
            return object;
        }

        let (shape, width, height, points) = match self {
            Self::Rectangle => (ShapeKind::Rect, 80.0, 60.0, Vec::new()),
            Self::SmallSquare => (ShapeKind::Rect, 40.0, 40.0, Vec::new()),
            Self::BigSquare => (ShapeKind::Rect, 100.0, 60.0, Vec::new()),
            Self::Circle => (ShapeKind::Circle, 70.0, 70.0, Vec::new()),
            Self::Triangle => (ShapeKind::Triangle, 70.0, 70.0, Vec::new()),
            Self::Line => (
                ShapeKind::Line,
                100.0,
                0.0,
                vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)],
            ),
            Self::Diamond => (
                ShapeKind::Polygon,
                80.0,
                80.0,
                vec![
                    Point::new(40.0, 0.0),
                    Point::new(80.0, 40.0),
                    Point::new(40.0, 80.0),
                    Point::new(0.0, 40.0),
                ],
            ),
            _ => (
                ShapeKind::Polygon,
                100.0,
                90.0,
                vec![
                    Point::new(50.0, 0.0),
                    Point::new(100.0, 30.0),
                    Point::new(82.0, 90.0),
                    Point::new(18.0, 90.0),
                    Point::new(0.0, 30.0),
                ],
            ),
        };
        let mut object = SceneObject::new(
            ObjectContent::Shape { shape, points },
            origin.x,
            origin.y,
            width,
            height,
        );
        object.style.stroke = Some(SHAPE_STROKE);
        if shape == ShapeKind::Line {
            object.style.stroke_width = LINE_STROKE_WIDTH;
        } else {
            object.style.fill = Some(Color::TRANSPARENT);
            object.style.stroke_width = SHAPE_STROKE_WIDTH;
        }
        object
    }
}

/// Scale that fits `width` x `height` inside `fraction` of the canvas.
fn fit_scale(width: f64, height: f64, canvas_width: f64, canvas_height: f64, fraction: f64) -> f64 {
    if width <= 0.0 || height <= 0.0 {
        return 1.0;
    }
    (canvas_width / width).min(canvas_height / height) * fraction
}

impl<S: SceneGraph + RasterSource> Editor<S> {
    /// Leaves crop, text and draw modes so the new object can be selected.
    pub(super) fn prepare_for_insert(&mut self) -> EditorResult<()> {
        self.leave_transient_mode()?;
        if self.tools.mode() != &ToolMode::Select {
            self.switch_mode(ToolEvent::EnterSelect)?;
        }
        Ok(())
    }

    /// Adds, selects and records one new object.
    fn place_new_object(&mut self, object: SceneObject) -> EditorResult<ObjectId> {
        self.prepare_for_insert()?;
        let id = match &object.id {
            Some(id) => id.clone(),
            None => self.layers.allocate_id(&self.scene),
        };
        self.scene.add(object.with_id(id.clone()));
        self.scene.set_active(Some(id.clone()));
        self.scene.request_render();
        self.pump_events()?;
        tracing::debug!(%id, "object placed");
        Ok(id)
    }

    pub fn add_text(&mut self) -> EditorResult<ObjectId> {
        let defaults = &self.config.text;
        let content = TextContent::new(
            defaults.placeholder.clone(),
            defaults.font_size,
            defaults.font_family.clone(),
        );
        let mut text = SceneObject::text(content, TEXT_ORIGIN.x, TEXT_ORIGIN.y, defaults.box_width);
        text.style.fill = Some(self.tools.session().text_color);
        let result = self.place_new_object(text);
        self.surface(result)
    }

    /// Centres `emoji` on the canvas.
    pub fn add_emoji(&mut self, emoji: &str) -> EditorResult<ObjectId> {
        let defaults = &self.config.text;
        let size = defaults.emoji_size;
        let content = TextContent::new(emoji, size, defaults.font_family.clone());
        let canvas = self.tools.session().canvas;
        let mut object = SceneObject::text(content, 0.0, 0.0, size);
        object.left = (canvas.width - object.width) / 2.0;
        object.top = (canvas.height - object.height) / 2.0;
        let result = self.place_new_object(object);
        self.surface(result)
    }

    pub fn add_shape(&mut self, preset: ShapePreset) -> EditorResult<ObjectId> {
        let result = self.place_new_object(preset.build(PRESET_ORIGIN));
        self.surface(result)
    }

    /// Decodes an uploaded file and centres it, scaled down when wider than
    /// the configured share of the canvas.
    pub fn upload_image(&mut self, bytes: &[u8]) -> EditorResult<ObjectId> {
        let result = self.try_upload_image(bytes);
        self.surface(result)
    }

    fn try_upload_image(&mut self, bytes: &[u8]) -> EditorResult<ObjectId> {
        let decoded = self.scene.decode_image(bytes)?;
        let canvas = self.tools.session().canvas;
        let max_width = canvas.width * self.config.upload_fit_fraction;
        let width = f64::from(decoded.width);
        let scale = if width > max_width && width > 0.0 {
            max_width / width
        } else {
            1.0
        };
        let mut image = SceneObject::image(decoded.asset, 0.0, 0.0, decoded.width, decoded.height);
        image.scale_x = scale;
        image.scale_y = scale;
        let bounds = image.bounds();
        image.left = (canvas.width - bounds.width) / 2.0;
        image.top = (canvas.height - bounds.height) / 2.0;
        self.place_new_object(image)
    }

    /// Validates the form input and starts generation on a worker thread.
    pub fn request_generation(
        &self,
        generator: Arc<dyn ImageGenerator>,
        keywords: &str,
        size: ImageSize,
        num_images: u8,
    ) -> EditorResult<PendingGeneration> {
        let request = GenerationRequest::from_input(
            keywords,
            size,
            num_images,
            self.config.max_generated_images,
        );
        let request = self.surface(request.map_err(Into::into))?;
        Ok(spawn_generation(generator, request))
    }

    /// Surfaces a failed generation once; successful URLs pass through.
    pub fn accept_generation(
        &self,
        result: GenerationResult<Vec<String>>,
    ) -> EditorResult<Vec<String>> {
        self.surface(result.map_err(Into::into))
    }

    /// Fetches one generated image and places it scaled to fit the canvas.
    pub fn place_generated(&mut self, fetcher: &dyn ImageFetcher, url: &str) -> EditorResult<ObjectId> {
        let result = self.try_place_generated(fetcher, url);
        self.surface(result)
    }

    fn try_place_generated(&mut self, fetcher: &dyn ImageFetcher, url: &str) -> EditorResult<ObjectId> {
        let bytes = fetcher.fetch(url)?;
        let decoded = self.scene.decode_image(&bytes)?;
        let canvas = self.tools.session().canvas;
        let scale = fit_scale(
            f64::from(decoded.width),
            f64::from(decoded.height),
            canvas.width,
            canvas.height,
            self.config.generated_fit_fraction,
        );
        let mut image = SceneObject::image(decoded.asset, 0.0, 0.0, decoded.width, decoded.height);
        image.scale_x = scale;
        image.scale_y = scale;
        let bounds = image.bounds();
        image.left = (canvas.width - bounds.width) / 2.0;
        image.top = (canvas.height - bounds.height) / 2.0;
        self.place_new_object(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::test_support::{editor, png_bytes};
    use crate::editor::ErrorClass;
    use crate::generation::GenerationError;
    use crate::scene::ObjectKind;

    struct BytesFetcher(Vec<u8>);

    impl ImageFetcher for BytesFetcher {
        fn fetch(&self, _url: &str) -> GenerationResult<Vec<u8>> {
            Ok(self.0.clone())
        }
    }

    struct OfflineFetcher;

    impl ImageFetcher for OfflineFetcher {
        fn fetch(&self, url: &str) -> GenerationResult<Vec<u8>> {
            Err(GenerationError::Fetch {
                url: url.to_string(),
                reason: "offline".to_string(),
            })
        }
    }

    struct FixedGenerator;

    impl ImageGenerator for FixedGenerator {
        fn generate(&self, _request: &GenerationRequest) -> GenerationResult<Vec<String>> {
            Ok(vec!["https://images.test/a.png".to_string()])
        }
    }

    #[test]
    fn add_text_uses_configured_defaults_and_selects_it() {
        let (mut editor, _) = editor();
        let id = editor.add_text().expect("text");
        let object = editor.scene().find(&id).expect("text object");
        let text = object.as_text().expect("text content");
        assert_eq!(text.text, "Edit me");
        assert_eq!(text.font_size, 30.0);
        assert_eq!((object.left, object.top, object.width), (100.0, 100.0, 200.0));
        assert_eq!(editor.scene().active(), Some(&id));
        assert_eq!(editor.history().log().len(), 2);
    }

    #[test]
    fn add_emoji_centres_on_canvas() {
        let (mut editor, _) = editor();
        let id = editor.add_emoji("😀").expect("emoji");
        let bounds = editor.scene().find(&id).expect("emoji object").bounds();
        assert_eq!(bounds.left + bounds.width / 2.0, 400.0);
        assert_eq!(bounds.top + bounds.height / 2.0, 300.0);
    }

    #[test]
    fn shape_presets_have_expected_geometry() {
        let rect = ShapePreset::Rectangle.build(PRESET_ORIGIN);
        assert_eq!((rect.left, rect.top, rect.width, rect.height), (200.0, 200.0, 80.0, 60.0));
        assert_eq!(rect.style.stroke, Some(SHAPE_STROKE));
        assert_eq!(rect.style.stroke_width, 2.0);

        let circle = ShapePreset::Circle.build(PRESET_ORIGIN);
        assert_eq!(circle.kind(), ObjectKind::Shape(ShapeKind::Circle));
        assert_eq!((circle.width, circle.height), (70.0, 70.0));

        let line = ShapePreset::Line.build(PRESET_ORIGIN);
        assert_eq!(line.style.stroke_width, 4.0);
        assert_eq!(line.style.fill, None);

        let heart = ShapePreset::HollowHeart.build(PRESET_ORIGIN);
        assert_eq!(heart.kind(), ObjectKind::Text);
        assert_eq!(heart.style.fill, Some(HEART_FILL));
        assert_eq!(heart.as_text().map(|text| text.font_size), Some(60.0));
    }

    #[test]
    fn every_shape_preset_records_once() {
        let (mut editor, _) = editor();
        for preset in ShapePreset::ALL {
            editor.add_shape(preset).expect("shape");
        }
        assert_eq!(editor.scene().objects().len(), ShapePreset::ALL.len());
        assert_eq!(editor.history().log().len(), ShapePreset::ALL.len() + 1);
    }

    #[test]
    fn shape_preset_names_match_toolbar_ids() {
        let preset: ShapePreset = serde_json::from_str(r#""small-square""#).expect("preset");
        assert_eq!(preset, ShapePreset::SmallSquare);
        let preset: ShapePreset = serde_json::from_str(r#""rect""#).expect("preset");
        assert_eq!(preset, ShapePreset::Rectangle);
    }

    #[test]
    fn inserting_while_drawing_returns_to_select() {
        let (mut editor, _) = editor();
        editor.enter_draw().expect("draw");
        let id = editor.add_shape(ShapePreset::Triangle).expect("shape");
        assert_eq!(editor.mode(), &ToolMode::Select);
        assert!(editor.scene().find(&id).expect("shape").interactivity.selectable);
    }

    #[test]
    fn wide_upload_is_scaled_to_eighty_percent_and_centred() {
        let (mut editor, _) = editor();
        let id = editor.upload_image(&png_bytes(1280, 200)).expect("upload");
        let image = editor.scene().find(&id).expect("image");
        assert_eq!(image.scale_x, 0.5);
        let bounds = image.bounds();
        assert_eq!((bounds.left, bounds.width), (80.0, 640.0));
        assert_eq!(bounds.top, 250.0);
    }

    #[test]
    fn broken_upload_is_a_visible_collaborator_failure() {
        let (mut editor, status) = editor();
        let err = editor.upload_image(b"definitely not a png").expect_err("decode fails");
        assert_eq!(err.class(), ErrorClass::CollaboratorFailure);
        assert!(status.last().is_some());
        assert!(editor.scene().objects().is_empty());
        assert_eq!(editor.history().log().len(), 1);
    }

    #[test]
    fn generated_image_is_fit_to_ninety_percent() {
        let (mut editor, _) = editor();
        let fetcher = BytesFetcher(png_bytes(1000, 1000));
        let id = editor
            .place_generated(&fetcher, "https://images.test/a.png")
            .expect("placed");
        let bounds = editor.scene().find(&id).expect("image").bounds();
        assert!((bounds.height - 540.0).abs() < 1e-9);
        assert!((bounds.left - 130.0).abs() < 1e-9);
        assert!((bounds.top - 30.0).abs() < 1e-9);
    }

    #[test]
    fn failed_fetch_mutates_nothing() {
        let (mut editor, status) = editor();
        let err = editor
            .place_generated(&OfflineFetcher, "https://images.test/a.png")
            .expect_err("offline");
        assert_eq!(err.class(), ErrorClass::CollaboratorFailure);
        assert_eq!(
            status.last().as_deref(),
            Some("failed to fetch generated image https://images.test/a.png: offline")
        );
        assert!(editor.scene().objects().is_empty());
    }

    #[test]
    fn generation_request_is_validated_before_dispatch() {
        let (editor, status) = editor();
        let err = editor
            .request_generation(Arc::new(FixedGenerator), "cat", ImageSize::SQUARE, 3)
            .expect_err("too many images");
        assert_eq!(err.class(), ErrorClass::InvalidTarget);
        assert!(status.last().is_some());

        let pending = editor
            .request_generation(Arc::new(FixedGenerator), "cat, hat", ImageSize::SQUARE, 1)
            .expect("valid request");
        let urls = editor
            .accept_generation(pending.wait())
            .expect("generation succeeds");
        assert_eq!(urls, vec!["https://images.test/a.png"]);
    }
}
