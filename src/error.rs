//! Error types for the portfolio-watermark crate.

use std::path::PathBuf;

/// Errors that can occur while building stamps and watermarking images.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The signature glyph could not be read or decoded. Fatal for a run.
    #[error("failed to load watermark glyph {}: {source}", path.display())]
    GlyphLoad {
        /// Configured glyph path.
        path: PathBuf,
        /// Underlying decode or I/O failure.
        source: image::ImageError,
    },

    /// A configuration value is out of range.
    #[error("invalid watermark config: {0}")]
    InvalidConfig(String),

    /// A configuration file could not be parsed.
    #[error("failed to parse watermark config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image format could not be determined or cannot be written back.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An error occurred during image processing (load, save, encode).
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
