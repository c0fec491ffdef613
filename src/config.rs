//! Watermark run configuration.
//!
//! A [`WatermarkConfig`] is built once per run: stock defaults, then an
//! optional TOML file, then caller overrides, then [`WatermarkConfig::validate`].
//! After validation it is treated as frozen for the lifetime of the run.
//!
//! ## Config File
//!
//! ```toml
//! # All keys are optional - defaults shown below
//! watermarkPath = "src/assets/images/signature.png"
//! assetsDir = "_astro"
//! scale = 0.10          # stamp width as a fraction of image width, (0, 1]
//! opacity = 0.4         # [0, 1]
//! padding = 20          # pixels from the chosen corner
//! position = "bottom-right"
//! minWidth = 400        # narrower images are skipped
//! extensions = [".jpg", ".jpeg", ".png", ".webp"]
//! borderWidth = 3       # outline thickness in dilation passes
//! jpegQuality = 90
//!
//! [borderColor]
//! r = 0
//! g = 0
//! b = 0
//!
//! [fillColor]
//! r = 255
//! g = 255
//! b = 255
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Corner of the target image the stamp is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    /// Anchor to the bottom-right corner.
    #[default]
    BottomRight,
    /// Anchor to the bottom-left corner.
    BottomLeft,
    /// Anchor to the top-right corner.
    TopRight,
    /// Anchor to the top-left corner.
    TopLeft,
}

impl Position {
    /// The kebab-case name used in config files and on the command line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BottomRight => "bottom-right",
            Self::BottomLeft => "bottom-left",
            Self::TopRight => "top-right",
            Self::TopLeft => "top-left",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bottom-right" => Ok(Self::BottomRight),
            "bottom-left" => Ok(Self::BottomLeft),
            "top-right" => Ok(Self::TopRight),
            "top-left" => Ok(Self::TopLeft),
            other => Err(Error::InvalidConfig(format!(
                "unknown position '{other}' (expected bottom-right, bottom-left, top-right or top-left)"
            ))),
        }
    }
}

/// An 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Pure black.
    pub const BLACK: Self = Self { r: 0, g: 0, b: 0 };
    /// Pure white.
    pub const WHITE: Self = Self {
        r: 255,
        g: 255,
        b: 255,
    };

    /// Build a color from its three channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Parses `r,g,b` (decimal, 0-255 each) or `#rrggbb`.
impl FromStr for Rgb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid =
            || Error::InvalidConfig(format!("invalid color '{s}' (use r,g,b or #rrggbb)"));

        if let Some(hex) = s.strip_prefix('#') {
            if hex.len() != 6 || !hex.is_ascii() {
                return Err(invalid());
            }
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
            return Ok(Self::new(channel(0)?, channel(2)?, channel(4)?));
        }

        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(invalid());
        }
        let channel = |p: &str| p.parse::<u8>().map_err(|_| invalid());
        Ok(Self::new(
            channel(parts[0])?,
            channel(parts[1])?,
            channel(parts[2])?,
        ))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Resolved watermark parameters for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct WatermarkConfig {
    /// Signature glyph, relative to the working directory.
    pub watermark_path: PathBuf,
    /// Subdirectory of the build output holding the images to stamp.
    pub assets_dir: PathBuf,
    /// Stamp width as a fraction of target width, in `(0, 1]`.
    pub scale: f32,
    /// Stamp opacity, in `[0, 1]`.
    pub opacity: f32,
    /// Distance in pixels from the anchored corner.
    pub padding: u32,
    /// Corner the stamp is anchored to.
    pub position: Position,
    /// Images narrower than this are skipped.
    pub min_width: u32,
    /// File extensions to process, with or without the leading dot.
    pub extensions: Vec<String>,
    /// Outline thickness, in dilation passes.
    pub border_width: u32,
    /// Outline color.
    pub border_color: Rgb,
    /// Stroke color.
    pub fill_color: Rgb,
    /// Encoder quality used when writing JPEG files back, `1..=100`.
    pub jpeg_quality: u8,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            watermark_path: PathBuf::from("src/assets/images/signature.png"),
            assets_dir: PathBuf::from("_astro"),
            scale: 0.10,
            opacity: 0.4,
            padding: 20,
            position: Position::BottomRight,
            min_width: 400,
            extensions: [".jpg", ".jpeg", ".png", ".webp"]
                .into_iter()
                .map(String::from)
                .collect(),
            border_width: 3,
            border_color: Rgb::BLACK,
            fill_color: Rgb::WHITE,
            jpeg_quality: 90,
        }
    }
}

impl WatermarkConfig {
    /// Parse a TOML document; missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigParse`] on malformed TOML or unknown keys, and
    /// [`Error::InvalidConfig`] if a value is out of range.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, otherwise see
    /// [`WatermarkConfig::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check every numeric field is within its documented range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if !self.scale.is_finite() || self.scale <= 0.0 || self.scale > 1.0 {
            return Err(Error::InvalidConfig(format!(
                "scale must be in (0, 1], got {}",
                self.scale
            )));
        }
        if !self.opacity.is_finite() || !(0.0..=1.0).contains(&self.opacity) {
            return Err(Error::InvalidConfig(format!(
                "opacity must be in [0, 1], got {}",
                self.opacity
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(Error::InvalidConfig(format!(
                "jpegQuality must be 1-100, got {}",
                self.jpeg_quality
            )));
        }
        if self.normalized_extensions().is_empty() {
            return Err(Error::InvalidConfig(
                "extensions must name at least one file type".into(),
            ));
        }
        Ok(())
    }

    /// Extensions lowercased with any leading dot removed.
    #[must_use]
    pub fn normalized_extensions(&self) -> Vec<String> {
        let mut exts: Vec<String> = self
            .extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        exts.sort();
        exts.dedup();
        exts
    }

    /// Fingerprint of the fields a stamp depends on.
    ///
    /// Two configs with the same fingerprint produce identical stamps for the
    /// same glyph and target width.
    #[must_use]
    pub fn stamp_fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.scale.to_bits().hash(&mut hasher);
        self.opacity.to_bits().hash(&mut hasher);
        self.border_width.hash(&mut hasher);
        self.border_color.hash(&mut hasher);
        self.fill_color.hash(&mut hasher);
        hasher.finish()
    }
}

/// Check if a path's extension is in a normalized extension list.
#[must_use]
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => {
            let ext = ext.to_ascii_lowercase();
            extensions.iter().any(|e| *e == ext)
        }
        None => false,
    }
}
