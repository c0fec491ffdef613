//! Stamp an outlined signature watermark onto the images of a static site
//! build.
//!
//! After the site is rendered, every sufficiently large image under the
//! build's asset directory gets a semi-transparent copy of the signature glyph
//! in one corner. The glyph is resized to a fraction of each image's width and
//! given a contrasting outline so it stays legible on light and dark photos.
//! Source assets are never touched; only the rendered output is rewritten, in
//! its original format.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use portfolio_watermark::{watermark_build_output, WatermarkConfig};
//!
//! let config = WatermarkConfig {
//!     opacity: 0.15,
//!     scale: 0.08,
//!     ..WatermarkConfig::default()
//! };
//! let report = watermark_build_output(Path::new("dist"), &config);
//! println!("{}", report.summary());
//! ```
//!
//! # Stamping in memory
//!
//! ```no_run
//! use portfolio_watermark::{Watermarker, WatermarkConfig};
//!
//! let wm = Watermarker::new(WatermarkConfig::default()).expect("glyph missing");
//! let mut img = image::open("photo.png").unwrap().to_rgba8();
//! wm.stamp_image(&mut img);
//! img.save("photo-stamped.png").unwrap();
//! ```
//!
//! Running twice over the same output stamps twice: there is no marker to
//! detect an already-watermarked image, so invoke once per build.

#![deny(missing_docs)]

pub mod blending;
pub mod config;
mod engine;
pub mod error;
pub mod mark;
pub mod placement;
pub mod report;

pub use config::{Position, Rgb, WatermarkConfig};
pub use engine::{decode_image, find_images, save_image, watermark_build_output, Watermarker};
pub use error::{Error, Result};
pub use mark::{build_stamp, Stamp, StampCache};
pub use report::{FileOutcome, FileRecord, RunReport};
