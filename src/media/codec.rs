use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use serde::Deserialize;

pub const INVALID_IMAGE: &str = "Upload a valid image.";

/// Image as submitted by a client: a base64 string (optionally a data URI)
/// from a JSON body, or raw bytes from a multipart file part.
#[derive(Clone, Deserialize)]
#[serde(from = "String")]
pub enum ImageInput {
    Encoded(String),
    Raw(Vec<u8>),
}

impl From<String> for ImageInput {
    fn from(value: String) -> Self {
        Self::Encoded(value)
    }
}

impl std::fmt::Debug for ImageInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encoded(value) => write!(f, "Encoded({} chars)", value.len()),
            Self::Raw(value) => write!(f, "Raw({} bytes)", value.len()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub bytes: Vec<u8>,
    pub extension: &'static str,
}

impl DecodedImage {
    pub fn decode(input: ImageInput) -> Result<Self, &'static str> {
        match input {
            ImageInput::Encoded(value) => Self::from_encoded(&value),
            ImageInput::Raw(bytes) => Self::from_bytes(bytes),
        }
    }

    /// Accepts `data:image/png;base64,<payload>` or a bare base64 payload.
    pub fn from_encoded(value: &str) -> Result<Self, &'static str> {
        let payload = match value.split_once(";base64,") {
            Some((header, payload)) if header.starts_with("data:") => payload,
            _ => value,
        };

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|_| INVALID_IMAGE)?;

        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, &'static str> {
        if bytes.is_empty() {
            return Err(INVALID_IMAGE);
        }

        let format = image::guess_format(&bytes).map_err(|_| INVALID_IMAGE)?;
        let extension = match format {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Gif => "gif",
            ImageFormat::WebP => "webp",
            ImageFormat::Bmp => "bmp",
            _ => return Err(INVALID_IMAGE),
        };

        Ok(Self { bytes, extension })
    }
}
