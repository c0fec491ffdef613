//! Batch watermarking over a build output directory.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageReader, RgbaImage};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::blending;
use crate::config::{has_extension, WatermarkConfig};
use crate::error::{Error, Result};
use crate::mark::{Stamp, StampCache};
use crate::placement;
use crate::report::{FileOutcome, RunReport};

/// The watermarking pipeline for one run.
///
/// Holds the frozen config, the decoded glyph and the per-width stamp cache.
/// Create once per build with [`Watermarker::new()`]; it is `Sync`, so one
/// instance can serve every worker of a parallel run.
pub struct Watermarker {
    config: WatermarkConfig,
    extensions: Vec<String>,
    glyph: RgbaImage,
    stamps: StampCache,
}

impl Watermarker {
    /// Validate the config and load the glyph from `config.watermark_path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for out-of-range settings and
    /// [`Error::GlyphLoad`] if the glyph cannot be read or decoded. Either is
    /// fatal for the run.
    pub fn new(config: WatermarkConfig) -> Result<Self> {
        config.validate()?;
        let glyph = load_glyph(&config.watermark_path)?;
        Self::with_glyph(config, glyph)
    }

    /// Build a pipeline around an already-decoded glyph.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for out-of-range settings or an empty
    /// glyph.
    pub fn with_glyph(config: WatermarkConfig, glyph: RgbaImage) -> Result<Self> {
        config.validate()?;
        if glyph.width() == 0 || glyph.height() == 0 {
            return Err(Error::InvalidConfig("watermark glyph has no pixels".into()));
        }
        Ok(Self {
            extensions: config.normalized_extensions(),
            config,
            glyph,
            stamps: StampCache::new(),
        })
    }

    /// The frozen run configuration.
    #[must_use]
    pub fn config(&self) -> &WatermarkConfig {
        &self.config
    }

    /// Number of distinct stamps built so far.
    #[must_use]
    pub fn cached_stamps(&self) -> usize {
        self.stamps.len()
    }

    /// The stamp for a target `target_width` pixels wide, built at most once.
    #[must_use]
    pub fn stamp_for(&self, target_width: u32) -> Arc<Stamp> {
        self.stamps.get_or_build(&self.glyph, target_width, &self.config)
    }

    /// Stamp an in-memory image at the configured corner.
    pub fn stamp_image(&self, image: &mut RgbaImage) {
        let stamp = self.stamp_for(image.width());
        let (x, y) = placement::offset(
            self.config.position,
            image.dimensions(),
            stamp.dimensions(),
            self.config.padding,
        );
        blending::overlay(image, &stamp, x, y);
    }

    /// Run one file through decode, size check, stamp and write-back.
    ///
    /// Never fails: every problem becomes a [`FileOutcome`].
    #[must_use]
    pub fn process_file(&self, path: &Path) -> FileOutcome {
        let width = match read_width(path) {
            Ok(w) => w,
            Err(e) => return FileOutcome::DecodeError(e.to_string()),
        };

        if width < self.config.min_width {
            return FileOutcome::SkippedTooSmall { width };
        }

        let (image, format) = match decode_image(path) {
            Ok(decoded) => decoded,
            Err(e) => return FileOutcome::DecodeError(e.to_string()),
        };

        match self.stamp_and_save(image, format, path) {
            Ok(()) => FileOutcome::Stamped,
            Err(e) => FileOutcome::ProcessError(e.to_string()),
        }
    }

    fn stamp_and_save(&self, image: DynamicImage, format: ImageFormat, path: &Path) -> Result<()> {
        let keep_alpha = image.color().has_alpha();
        let mut canvas = image.into_rgba8();
        self.stamp_image(&mut canvas);

        let out = if keep_alpha {
            DynamicImage::ImageRgba8(canvas)
        } else {
            DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).into_rgb8())
        };
        save_image(&out, format, path, self.config.jpeg_quality)
    }

    /// Files under `output_dir/assetsDir` that match the configured extensions.
    #[must_use]
    pub fn discover(&self, output_dir: &Path) -> Vec<PathBuf> {
        find_images(&output_dir.join(&self.config.assets_dir), &self.extensions)
    }

    /// Watermark every eligible image, one file at a time.
    #[must_use]
    pub fn run(&self, output_dir: &Path) -> RunReport {
        self.run_with_cancel(output_dir, &AtomicBool::new(false))
    }

    /// Like [`Watermarker::run`], checking `cancel` before each file.
    ///
    /// Files already written stay written; the report is marked cancelled.
    #[must_use]
    pub fn run_with_cancel(&self, output_dir: &Path, cancel: &AtomicBool) -> RunReport {
        let images = self.discover(output_dir);
        let mut report = RunReport::default();

        if images.is_empty() {
            info!("No images to watermark in build output");
            return report;
        }

        info!(count = images.len(), "Watermarking images");

        for path in images {
            if cancel.load(Ordering::Relaxed) {
                report.cancelled = true;
                break;
            }
            let outcome = self.process_file(&path);
            log_outcome(&path, &outcome);
            report.record(path, outcome);
        }

        info!("{}", report.summary());
        report
    }

    /// Watermark every eligible image on the rayon pool.
    ///
    /// Each worker decodes into its own buffer; outcomes are folded into the
    /// report after the pool finishes.
    #[cfg(feature = "parallel")]
    #[must_use]
    pub fn run_parallel(&self, output_dir: &Path) -> RunReport {
        use rayon::prelude::*;

        let images = self.discover(output_dir);
        let mut report = RunReport::default();

        if images.is_empty() {
            info!("No images to watermark in build output");
            return report;
        }

        info!(count = images.len(), "Watermarking images in parallel");

        let outcomes: Vec<(PathBuf, FileOutcome)> = images
            .into_par_iter()
            .map(|path| {
                let outcome = self.process_file(&path);
                (path, outcome)
            })
            .collect();

        for (path, outcome) in outcomes {
            log_outcome(&path, &outcome);
            report.record(path, outcome);
        }

        info!("{}", report.summary());
        report
    }
}

fn log_outcome(path: &Path, outcome: &FileOutcome) {
    match outcome {
        FileOutcome::Stamped => debug!(path = %path.display(), "stamped"),
        FileOutcome::SkippedTooSmall { width } => {
            debug!(path = %path.display(), width, "skipped (too small)");
        }
        FileOutcome::DecodeError(msg) | FileOutcome::ProcessError(msg) => {
            warn!(path = %path.display(), "Failed: {msg}");
        }
    }
}

/// Watermark a finished build, as the post-build hook does.
///
/// Never returns an error. If the config is invalid or the glyph cannot be
/// loaded, one warning is logged, no file is touched and the report carries
/// the reason in [`RunReport::fatal`].
#[must_use]
pub fn watermark_build_output(output_dir: &Path, config: &WatermarkConfig) -> RunReport {
    match Watermarker::new(config.clone()) {
        Ok(watermarker) => watermarker.run(output_dir),
        Err(e) => {
            warn!("Watermark not available ({e}), skipping");
            RunReport::aborted(e.to_string())
        }
    }
}

fn load_glyph(path: &Path) -> Result<RgbaImage> {
    image::open(path)
        .map(DynamicImage::into_rgba8)
        .map_err(|source| Error::GlyphLoad {
            path: path.to_path_buf(),
            source,
        })
}

/// Recursively list files under `dir` whose extension is in `extensions`
/// (lowercase, no dot). A missing directory yields nothing.
#[must_use]
pub fn find_images(dir: &Path, extensions: &[String]) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                debug!("skipping unreadable entry: {e}");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let matched = has_extension(e.path(), extensions);
            if !matched && ImageFormat::from_path(e.path()).is_ok() {
                debug!(path = %e.path().display(), "image extension not configured, leaving as is");
            }
            matched
        })
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Width of an image, read from its header without a full decode.
fn read_width(path: &Path) -> Result<u32> {
    let (width, _) = ImageReader::open(path)?
        .with_guessed_format()?
        .into_dimensions()?;
    Ok(width)
}

/// Decode an image and report the container format it was stored in.
///
/// The format is sniffed from the file contents, falling back to the
/// extension.
///
/// # Errors
///
/// Returns an error if the file cannot be opened, its format is unknown, or
/// decoding fails.
pub fn decode_image(path: &Path) -> Result<(DynamicImage, ImageFormat)> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let format = reader
        .format()
        .ok_or_else(|| Error::UnsupportedFormat(path.display().to_string()))?;
    let image = reader.decode()?;
    Ok((image, format))
}

/// Encode `img` as `format` and overwrite `path`.
///
/// The image is encoded in memory first, so a failed encode leaves the
/// existing file intact.
///
/// `image` writes WebP losslessly only, so a lossy WebP input keeps its
/// container but is re-encoded lossless and usually grows on disk.
///
/// # Errors
///
/// Returns an error if the format cannot be written or writing fails.
pub fn save_image(
    img: &DynamicImage,
    format: ImageFormat,
    path: &Path,
    jpeg_quality: u8,
) -> Result<()> {
    let mut buf = Vec::new();

    match format {
        ImageFormat::Jpeg => {
            let mut encoder = JpegEncoder::new_with_quality(&mut buf, jpeg_quality);
            encoder.encode_image(&img.to_rgb8())?;
        }
        ImageFormat::Png
        | ImageFormat::WebP
        | ImageFormat::Bmp
        | ImageFormat::Tiff
        | ImageFormat::Gif
        | ImageFormat::Avif => {
            img.write_to(&mut Cursor::new(&mut buf), format)?;
        }
        _ => {
            return Err(Error::UnsupportedFormat(format!("{format:?}")));
        }
    }

    std::fs::write(path, buf)?;
    Ok(())
}
