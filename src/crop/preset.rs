use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CropPreset {
    #[default]
    Free,
    #[serde(rename = "16:9")]
    Ratio16x9,
    #[serde(rename = "1:1")]
    Ratio1x1,
    #[serde(rename = "9:16")]
    Ratio9x16,
    Original,
}

impl CropPreset {
    pub const ALL: [CropPreset; 5] = [
        Self::Free,
        Self::Ratio16x9,
        Self::Ratio1x1,
        Self::Ratio9x16,
        Self::Original,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Ratio16x9 => "16:9",
            Self::Ratio1x1 => "1:1",
            Self::Ratio9x16 => "9:16",
            Self::Original => "Original",
        }
    }

    /// Aspect ratio the overlay should keep, if any.
    ///
    /// `Original` follows the image's displayed size; `Free` has no ratio.
    pub fn resolve_ratio(self, image_width: f64, image_height: f64) -> Option<(f64, f64)> {
        match self {
            Self::Free => None,
            Self::Ratio16x9 => Some((16.0, 9.0)),
            Self::Ratio1x1 => Some((1.0, 1.0)),
            Self::Ratio9x16 => Some((9.0, 16.0)),
            Self::Original => Some((image_width.max(1.0), image_height.max(1.0))),
        }
    }
}

/// Largest `ratio_x:ratio_y` box that fits inside `width` x `height`.
pub(crate) fn adjust_ratio_to_fit(width: f64, height: f64, ratio_x: f64, ratio_y: f64) -> (f64, f64) {
    if ratio_x <= 0.0 || ratio_y <= 0.0 {
        return (0.0, 0.0);
    }
    let target_width = height * ratio_x / ratio_y;
    if target_width <= width {
        (target_width, height)
    } else {
        (width, width * ratio_y / ratio_x)
    }
}
