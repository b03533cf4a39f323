use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{Color, Point, Rect};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle of decoded pixel data held by the rendering collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Rect,
    Circle,
    Triangle,
    Line,
    Polygon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Text,
    Image,
    Shape(ShapeKind),
    Path,
    Group,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextScript {
    Superscript,
    Subscript,
}

impl TextScript {
    pub const fn font_scale(self) -> f64 {
        0.7
    }

    /// Vertical offset of the glyphs, negative is up.
    pub fn baseline_shift(self, font_size: f64) -> f64 {
        match self {
            Self::Superscript => -0.3 * font_size,
            Self::Subscript => 0.2 * font_size,
        }
    }
}

/// Characters `start..end` rendered as `script`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptSpan {
    pub start: usize,
    pub end: usize,
    pub script: TextScript,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    pub text: String,
    pub font_size: f64,
    pub font_family: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub align: TextAlign,
    pub line_height: f64,
    pub char_spacing: i32,
    pub background: Option<Color>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scripts: Vec<ScriptSpan>,
}

impl TextContent {
    pub fn new(text: impl Into<String>, font_size: f64, font_family: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font_size,
            font_family: font_family.into(),
            bold: false,
            italic: false,
            underline: false,
            align: TextAlign::Left,
            line_height: 1.2,
            char_spacing: 0,
            background: None,
            scripts: Vec::new(),
        }
    }

    pub fn script_at(&self, index: usize) -> Option<TextScript> {
        self.scripts
            .iter()
            .find(|span| (span.start..span.end).contains(&index))
            .map(|span| span.script)
    }

    /// Toggles `script` on characters `start..end`. When every character in
    /// the range already has it, it is removed; otherwise the whole range is
    /// set, replacing the other script. Returns `false` for an empty range.
    pub fn toggle_script(&mut self, start: usize, end: usize, script: TextScript) -> bool {
        let len = self.text.chars().count();
        let end = end.min(len);
        if start >= end {
            return false;
        }

        let mut per_char: Vec<Option<TextScript>> = (0..len).map(|i| self.script_at(i)).collect();
        let already = per_char[start..end].iter().all(|s| *s == Some(script));
        let next = if already { None } else { Some(script) };
        for slot in &mut per_char[start..end] {
            *slot = next;
        }

        self.scripts.clear();
        let mut index = 0;
        while index < len {
            let Some(current) = per_char[index] else {
                index += 1;
                continue;
            };
            let run_start = index;
            while index < len && per_char[index] == Some(current) {
                index += 1;
            }
            self.scripts.push(ScriptSpan {
                start: run_start,
                end: index,
                script: current,
            });
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectContent {
    Text(TextContent),
    Image { asset: AssetId },
    Shape { shape: ShapeKind, points: Vec<Point> },
    Path { points: Vec<Point> },
    Group { children: Vec<SceneObject> },
    Other { type_name: String },
}

impl ObjectContent {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Text(_) => ObjectKind::Text,
            Self::Image { .. } => ObjectKind::Image,
            Self::Shape { shape, .. } => ObjectKind::Shape(*shape),
            Self::Path { .. } => ObjectKind::Path,
            Self::Group { .. } => ObjectKind::Group,
            Self::Other { .. } => ObjectKind::Other,
        }
    }
}

/// The four per-object interaction flags. All four off means the user locked
/// the object; drawing mode only clears `selectable` and `evented`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interactivity {
    pub selectable: bool,
    pub evented: bool,
    pub has_controls: bool,
    pub has_borders: bool,
}

impl Interactivity {
    pub const INTERACTIVE: Interactivity = Interactivity {
        selectable: true,
        evented: true,
        has_controls: true,
        has_borders: true,
    };

    pub const LOCKED: Interactivity = Interactivity {
        selectable: false,
        evented: false,
        has_controls: false,
        has_borders: false,
    };

    pub const fn is_locked(&self) -> bool {
        !(self.selectable || self.evented || self.has_controls || self.has_borders)
    }

    pub fn suppress_pointer(&mut self) {
        self.selectable = false;
        self.evented = false;
    }

    pub fn restore_pointer(&mut self) {
        self.selectable = true;
        self.evented = true;
    }
}

impl Default for Interactivity {
    fn default() -> Self {
        Self::INTERACTIVE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrokeDash {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

impl StrokeDash {
    pub const fn pattern(self) -> Option<[f64; 2]> {
        match self {
            Self::Solid => None,
            Self::Dashed => Some([10.0, 5.0]),
            Self::Dotted => Some([2.0, 2.0]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shadow {
    pub color: Color,
    pub blur: u32,
    pub offset_x: f64,
    pub offset_y: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjectStyle {
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub stroke_width: f64,
    pub stroke_dash: StrokeDash,
    pub shadow: Option<Shadow>,
}

/// One drawable object as the engine sees it. `width`/`height` are the
/// intrinsic, unscaled size; for images they are the pixel dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub id: Option<ObjectId>,
    pub content: ObjectContent,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub angle: f64,
    pub visible: bool,
    pub interactivity: Interactivity,
    pub style: ObjectStyle,
}

impl SceneObject {
    pub fn new(content: ObjectContent, left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            id: None,
            content,
            left,
            top,
            width,
            height,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
            visible: true,
            interactivity: Interactivity::INTERACTIVE,
            style: ObjectStyle::default(),
        }
    }

    pub fn text(content: TextContent, left: f64, top: f64, width: f64) -> Self {
        let height = content.font_size * content.line_height;
        Self::new(ObjectContent::Text(content), left, top, width, height)
    }

    pub fn image(asset: AssetId, left: f64, top: f64, width: u32, height: u32) -> Self {
        Self::new(
            ObjectContent::Image { asset },
            left,
            top,
            f64::from(width),
            f64::from(height),
        )
    }

    pub fn shape(shape: ShapeKind, left: f64, top: f64, width: f64, height: f64) -> Self {
        Self::new(
            ObjectContent::Shape {
                shape,
                points: Vec::new(),
            },
            left,
            top,
            width,
            height,
        )
    }

    /// Freehand stroke; bounds are derived from the points.
    pub fn path(points: Vec<Point>) -> Self {
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for point in &points {
            min_x = min_x.min(point.x);
            min_y = min_y.min(point.y);
            max_x = max_x.max(point.x);
            max_y = max_y.max(point.y);
        }
        if points.is_empty() {
            (min_x, min_y, max_x, max_y) = (0.0, 0.0, 0.0, 0.0);
        }
        Self::new(
            ObjectContent::Path { points },
            min_x,
            min_y,
            max_x - min_x,
            max_y - min_y,
        )
    }

    pub fn with_id(mut self, id: ObjectId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn kind(&self) -> ObjectKind {
        self.content.kind()
    }

    pub fn is_locked(&self) -> bool {
        self.interactivity.is_locked()
    }

    pub fn has_id(&self, id: &ObjectId) -> bool {
        self.id.as_ref() == Some(id)
    }

    /// Bounding box in canvas coordinates, ignoring rotation.
    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.left,
            self.top,
            self.width * self.scale_x,
            self.height * self.scale_y,
        )
    }

    pub fn as_text(&self) -> Option<&TextContent> {
        match &self.content {
            ObjectContent::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut TextContent> {
        match &mut self.content {
            ObjectContent::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn image_asset(&self) -> Option<&AssetId> {
        match &self.content {
            ObjectContent::Image { asset } => Some(asset),
            _ => None,
        }
    }

    /// Direct members of a group; empty for everything else.
    pub fn members(&self) -> &[SceneObject] {
        match &self.content {
            ObjectContent::Group { children } => children,
            _ => &[],
        }
    }

    /// Adds every asset this object paints, including group members.
    pub fn collect_assets(&self, assets: &mut HashSet<AssetId>) {
        match &self.content {
            ObjectContent::Image { asset } => {
                assets.insert(asset.clone());
            }
            _ => {
                for member in self.members() {
                    member.collect_assets(assets);
                }
            }
        }
    }

    /// Wraps `members` in a group sized to their combined bounds. Members
    /// keep their paint order and are stored relative to the group origin.
    pub fn group(members: Vec<SceneObject>) -> Self {
        let bounds = members
            .iter()
            .map(SceneObject::bounds)
            .reduce(|acc, next| acc.union(&next))
            .unwrap_or(Rect::new(0.0, 0.0, 0.0, 0.0));
        let children = members
            .into_iter()
            .map(|mut child| {
                child.left -= bounds.left;
                child.top -= bounds.top;
                child
            })
            .collect();
        Self::new(
            ObjectContent::Group { children },
            bounds.left,
            bounds.top,
            bounds.width,
            bounds.height,
        )
    }

    /// Members of a group back in canvas coordinates, with the group's
    /// scale and rotation folded into each. `None` for non-groups.
    pub fn into_children(self) -> Option<Vec<SceneObject>> {
        let ObjectContent::Group { children } = self.content else {
            return None;
        };
        Some(
            children
                .into_iter()
                .map(|mut child| {
                    child.left = self.left + child.left * self.scale_x;
                    child.top = self.top + child.top * self.scale_y;
                    child.scale_x *= self.scale_x;
                    child.scale_y *= self.scale_y;
                    child.angle = (child.angle + self.angle).rem_euclid(360.0);
                    child
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_requires_all_four_flags_off() {
        let mut flags = Interactivity::INTERACTIVE;
        flags.suppress_pointer();
        assert!(!flags.is_locked());
        assert!(Interactivity::LOCKED.is_locked());
    }

    #[test]
    fn path_bounds_follow_points() {
        let path = SceneObject::path(vec![
            Point::new(10.0, 40.0),
            Point::new(30.0, 5.0),
            Point::new(25.0, 20.0),
        ]);
        assert_eq!(path.bounds(), Rect::new(10.0, 5.0, 20.0, 35.0));
        assert_eq!(path.kind(), ObjectKind::Path);
    }

    #[test]
    fn group_spans_members_and_ungroup_restores_positions() {
        let a = SceneObject::shape(ShapeKind::Rect, 10.0, 20.0, 30.0, 10.0)
            .with_id(ObjectId::new("a"));
        let b = SceneObject::shape(ShapeKind::Circle, 50.0, 5.0, 10.0, 10.0)
            .with_id(ObjectId::new("b"));

        let group = SceneObject::group(vec![a.clone(), b.clone()]);
        assert_eq!(group.kind(), ObjectKind::Group);
        assert_eq!(group.bounds(), Rect::new(10.0, 5.0, 50.0, 25.0));

        let children = group.into_children().expect("group has children");
        assert_eq!(children, vec![a, b]);
    }

    #[test]
    fn ungroup_folds_group_scale_into_members() {
        let a = SceneObject::shape(ShapeKind::Rect, 10.0, 10.0, 10.0, 10.0);
        let b = SceneObject::shape(ShapeKind::Rect, 30.0, 10.0, 10.0, 10.0);
        let mut group = SceneObject::group(vec![a, b]);
        group.scale_x = 2.0;
        group.left = 100.0;

        let children = group.into_children().expect("group has children");
        assert_eq!(children[1].left, 140.0);
        assert_eq!(children[1].scale_x, 2.0);
        assert_eq!(children[1].bounds().width, 20.0);
    }

    #[test]
    fn into_children_is_none_for_plain_objects() {
        let rect = SceneObject::shape(ShapeKind::Rect, 0.0, 0.0, 1.0, 1.0);
        assert!(rect.into_children().is_none());
    }

    #[test]
    fn collect_assets_reaches_into_groups() {
        let inner = SceneObject::image(AssetId::new("asset_2"), 0.0, 0.0, 4, 4);
        let outer = SceneObject::image(AssetId::new("asset_1"), 8.0, 0.0, 4, 4);
        let group = SceneObject::group(vec![inner, outer]);

        let mut assets = HashSet::new();
        group.collect_assets(&mut assets);
        assert!(assets.contains(&AssetId::new("asset_1")));
        assert!(assets.contains(&AssetId::new("asset_2")));
    }

    #[test]
    fn toggle_script_sets_then_clears_a_range() {
        let mut text = TextContent::new("H2O x2", 20.0, "Arial");
        assert!(text.toggle_script(1, 2, TextScript::Subscript));
        assert!(text.toggle_script(5, 6, TextScript::Superscript));
        assert_eq!(
            text.scripts,
            vec![
                ScriptSpan { start: 1, end: 2, script: TextScript::Subscript },
                ScriptSpan { start: 5, end: 6, script: TextScript::Superscript },
            ]
        );

        assert!(text.toggle_script(1, 2, TextScript::Subscript));
        assert_eq!(text.script_at(1), None);
        assert_eq!(text.scripts.len(), 1);
    }

    #[test]
    fn toggle_script_over_mixed_range_applies_everywhere() {
        let mut text = TextContent::new("abcdef", 20.0, "Arial");
        text.toggle_script(0, 2, TextScript::Subscript);
        text.toggle_script(1, 4, TextScript::Superscript);

        assert_eq!(text.script_at(0), Some(TextScript::Subscript));
        assert_eq!(text.script_at(1), Some(TextScript::Superscript));
        assert_eq!(text.script_at(3), Some(TextScript::Superscript));
        assert_eq!(text.script_at(4), None);
    }

    #[test]
    fn toggle_script_ignores_empty_or_out_of_range_selection() {
        let mut text = TextContent::new("abc", 20.0, "Arial");
        assert!(!text.toggle_script(2, 2, TextScript::Superscript));
        assert!(!text.toggle_script(5, 9, TextScript::Superscript));
        assert!(text.scripts.is_empty());
    }

    #[test]
    fn script_metrics_shrink_and_shift_glyphs() {
        assert_eq!(TextScript::Superscript.font_scale(), 0.7);
        assert_eq!(TextScript::Superscript.baseline_shift(20.0), -6.0);
        assert_eq!(TextScript::Subscript.baseline_shift(20.0), 4.0);
    }

    #[test]
    fn content_kind_is_tagged_by_variant() {
        let circle = SceneObject::shape(ShapeKind::Circle, 0.0, 0.0, 70.0, 70.0);
        assert_eq!(circle.kind(), ObjectKind::Shape(ShapeKind::Circle));
        let other = SceneObject::new(
            ObjectContent::Other {
                type_name: "activeSelection".to_string(),
            },
            0.0,
            0.0,
            1.0,
            1.0,
        );
        assert_eq!(other.kind(), ObjectKind::Other);
    }
}
