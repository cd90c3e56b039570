//! Discovered image units and their raster formats.

use std::path::PathBuf;

/// Raster image formats accepted by the pipeline.
///
/// Anything else found during discovery is skipped before it reaches
/// the analysis stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    WebP,
    Tiff,
    Bmp,
    Gif,
}

impl ImageFormat {
    /// MIME type used when embedding the image in a model request.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Tiff => "image/tiff",
            Self::Bmp => "image/bmp",
            Self::Gif => "image/gif",
        }
    }

    /// Map a sniffed MIME type to a supported format.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/jpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::WebP),
            "image/tiff" => Some(Self::Tiff),
            "image/bmp" => Some(Self::Bmp),
            "image/gif" => Some(Self::Gif),
            _ => None,
        }
    }
}

/// One image queued for analysis.
///
/// Created by discovery, consumed by exactly one pipeline run, never
/// mutated afterwards.
#[derive(Debug, Clone)]
pub struct ImageUnit {
    /// Identifier derived from the filename stem.
    pub id: String,
    /// Path the image was read from.
    pub path: PathBuf,
    /// Raw file contents.
    pub bytes: Vec<u8>,
    /// Format detected from the file contents, not the extension.
    pub format: ImageFormat,
}
