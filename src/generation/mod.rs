//! Keyword-driven image generation, seen from the editor: request
//! validation, response parsing and the collaborator traits. The transport
//! lives in the host.

mod worker;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use worker::{spawn_generation, PendingGeneration};

pub const MAX_IMAGES_PER_REQUEST: u8 = 2;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("please enter at least one keyword")]
    NoKeywords,
    #[error("can only generate up to {max} images at a time (requested {requested})")]
    TooManyImages { requested: u8, max: u8 },
    #[error("invalid image size `{0}`; expected WIDTHxHEIGHT")]
    InvalidSize(String),
    #[error("image generation failed: {0}")]
    Service(String),
    #[error("malformed generation response: {0}")]
    MalformedResponse(#[from] serde_json::Error),
    #[error("generation returned no images")]
    NoImages,
    #[error("failed to fetch generated image {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("generation worker stopped before answering")]
    WorkerDisconnected,
}

pub type GenerationResult<T> = std::result::Result<T, GenerationError>;

/// Requested output size, written `WIDTHxHEIGHT` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub const SQUARE: ImageSize = ImageSize {
        width: 1024,
        height: 1024,
    };
}

impl Default for ImageSize {
    fn default() -> Self {
        Self::SQUARE
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for ImageSize {
    type Err = GenerationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || GenerationError::InvalidSize(value.to_string());
        let (width, height) = value.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width: u32 = width.trim().parse().map_err(|_| invalid())?;
        let height: u32 = height.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self { width, height })
    }
}

impl TryFrom<String> for ImageSize {
    type Error = GenerationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ImageSize> for String {
    fn from(size: ImageSize) -> Self {
        size.to_string()
    }
}

/// Splits a comma-separated keyword field, dropping blanks.
pub fn parse_keywords(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|keyword| !keyword.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub keywords: Vec<String>,
    pub size: ImageSize,
    pub num_images: u8,
}

impl GenerationRequest {
    /// Builds a request from the raw form fields, rejecting it before any
    /// network work when it cannot succeed.
    pub fn from_input(
        keywords: &str,
        size: ImageSize,
        num_images: u8,
        max_images: u8,
    ) -> GenerationResult<Self> {
        let max = max_images.clamp(1, MAX_IMAGES_PER_REQUEST);
        let num_images = num_images.max(1);
        if num_images > max {
            return Err(GenerationError::TooManyImages {
                requested: num_images,
                max,
            });
        }
        let keywords = parse_keywords(keywords);
        if keywords.is_empty() {
            return Err(GenerationError::NoKeywords);
        }
        Ok(Self {
            keywords,
            size,
            num_images,
        })
    }

    pub fn prompt(&self) -> String {
        self.keywords.join(" ")
    }

    pub fn to_json(&self) -> GenerationResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    images: Vec<String>,
    error: Option<String>,
}

/// Reads `{"images": [...]}` or `{"error": "..."}`.
pub fn parse_response(body: &str) -> GenerationResult<Vec<String>> {
    let response: GenerationResponse = serde_json::from_str(body)?;
    if let Some(error) = response.error {
        return Err(GenerationError::Service(error));
    }
    if response.images.is_empty() {
        return Err(GenerationError::NoImages);
    }
    Ok(response.images)
}

/// Turns a request into image URLs. Called off the UI thread.
pub trait ImageGenerator: Send + Sync {
    fn generate(&self, request: &GenerationRequest) -> GenerationResult<Vec<String>>;
}

/// Downloads one generated image.
pub trait ImageFetcher {
    fn fetch(&self, url: &str) -> GenerationResult<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keywords_trims_and_drops_blanks() {
        assert_eq!(
            parse_keywords(" red fox , , snow,forest "),
            vec!["red fox", "snow", "forest"]
        );
        assert!(parse_keywords(" , ").is_empty());
    }

    #[test]
    fn request_rejects_missing_keywords() {
        let err = GenerationRequest::from_input(" ,", ImageSize::SQUARE, 1, 2)
            .expect_err("blank keywords should be rejected");
        assert!(matches!(err, GenerationError::NoKeywords));
    }

    #[test]
    fn request_rejects_more_than_two_images() {
        let err = GenerationRequest::from_input("cat", ImageSize::SQUARE, 3, 10)
            .expect_err("three images should be rejected");
        assert!(matches!(
            err,
            GenerationError::TooManyImages {
                requested: 3,
                max: 2
            }
        ));
    }

    #[test]
    fn request_prompt_joins_keywords_with_spaces() {
        let request = GenerationRequest::from_input("cat, hat", ImageSize::SQUARE, 0, 2)
            .expect("valid request");
        assert_eq!(request.prompt(), "cat hat");
        assert_eq!(request.num_images, 1);
        assert_eq!(
            request.to_json().expect("request should serialize"),
            r#"{"keywords":["cat","hat"],"size":"1024x1024","num_images":1}"#
        );
    }

    #[test]
    fn image_size_parses_wire_format() {
        assert_eq!(
            "1792x1024".parse::<ImageSize>().expect("valid size"),
            ImageSize {
                width: 1792,
                height: 1024
            }
        );
        assert!("1024".parse::<ImageSize>().is_err());
        assert!("0x10".parse::<ImageSize>().is_err());
    }

    #[test]
    fn parse_response_reads_images_and_errors() {
        assert_eq!(
            parse_response(r#"{"images": ["https://img/1", "https://img/2"]}"#)
                .expect("images body"),
            vec!["https://img/1", "https://img/2"]
        );
        let err = parse_response(r#"{"error": "No keywords provided"}"#)
            .expect_err("error body should fail");
        assert_eq!(err.to_string(), "image generation failed: No keywords provided");
        assert!(matches!(
            parse_response(r#"{"images": []}"#),
            Err(GenerationError::NoImages)
        ));
        assert!(matches!(
            parse_response("not json"),
            Err(GenerationError::MalformedResponse(_))
        ));
    }
}
