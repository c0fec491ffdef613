use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use portfolio_watermark::{
    watermark_build_output, FileOutcome, Position, WatermarkConfig, Watermarker,
};
use tempfile::TempDir;

/// A build output with `dist/_astro/` and a signature glyph next to it.
struct Site {
    tmp: TempDir,
}

impl Site {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("dist/_astro")).unwrap();
        std::fs::create_dir_all(tmp.path().join("assets")).unwrap();
        Self { tmp }
    }

    fn dist(&self) -> PathBuf {
        self.tmp.path().join("dist")
    }

    fn asset(&self, name: &str) -> PathBuf {
        self.tmp.path().join("dist/_astro").join(name)
    }

    fn glyph_path(&self) -> PathBuf {
        self.tmp.path().join("assets/signature.png")
    }

    fn write_glyph(&self) {
        RgbaImage::from_fn(60, 20, |x, y| {
            if x % 5 == 0 || y == 10 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
        .save(self.glyph_path())
        .unwrap();
    }

    fn write_photo(&self, name: &str, w: u32, h: u32) -> PathBuf {
        let path = self.asset(name);
        RgbImage::from_fn(w, h, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 100]))
            .save(&path)
            .unwrap();
        path
    }

    fn config(&self) -> WatermarkConfig {
        WatermarkConfig {
            watermark_path: self.glyph_path(),
            opacity: 0.8,
            ..WatermarkConfig::default()
        }
    }
}

fn read(path: &Path) -> Vec<u8> {
    std::fs::read(path).unwrap()
}

#[test]
fn stamps_large_images_and_skips_thumbnails() {
    let site = Site::new();
    site.write_glyph();
    let large = site.write_photo("hero.png", 800, 600);
    let thumb = site.write_photo("thumb.png", 200, 150);
    let thumb_before = read(&thumb);
    let large_before = image::open(&large).unwrap().to_rgb8();

    let report = watermark_build_output(&site.dist(), &site.config());

    assert_eq!((report.processed, report.skipped, report.errors), (1, 1, 0));
    assert!(report.fatal.is_none());
    assert_eq!(read(&thumb), thumb_before);

    let large_after = image::open(&large).unwrap().to_rgb8();
    assert_eq!(large_after.dimensions(), (800, 600));
    assert_ne!(large_after, large_before);
    // Top-left corner is far from the bottom-right stamp.
    assert_eq!(large_after.get_pixel(5, 5), large_before.get_pixel(5, 5));
}

#[test]
fn min_width_boundary() {
    let site = Site::new();
    site.write_glyph();
    let below = site.write_photo("a-below.png", 399, 300);
    let exact = site.write_photo("b-exact.png", 400, 300);

    let report = watermark_build_output(&site.dist(), &site.config());

    let outcome_of = |p: &Path| {
        report
            .files
            .iter()
            .find(|r| r.path == p)
            .map(|r| r.outcome.clone())
            .unwrap()
    };
    assert_eq!(outcome_of(&below), FileOutcome::SkippedTooSmall { width: 399 });
    assert_eq!(outcome_of(&exact), FileOutcome::Stamped);
}

#[test]
fn one_corrupt_file_does_not_abort_the_batch() {
    let site = Site::new();
    site.write_glyph();
    site.write_photo("1.png", 600, 400);
    site.write_photo("2.png", 600, 400);
    let corrupt = site.asset("3.png");
    std::fs::write(&corrupt, b"\x89PNG\r\n\x1a\ngarbage").unwrap();
    site.write_photo("4.png", 600, 400);
    site.write_photo("5.png", 100, 100);

    let report = watermark_build_output(&site.dist(), &site.config());

    assert_eq!(report.files.len(), 5);
    assert_eq!(report.processed + report.skipped, 4);
    assert_eq!(report.errors, 1);
    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].path, corrupt);
    assert!(matches!(failures[0].outcome, FileOutcome::DecodeError(_)));
}

#[test]
fn missing_glyph_is_fatal_and_touches_nothing() {
    let site = Site::new();
    let a = site.write_photo("a.png", 800, 600);
    let b = site.write_photo("b.jpg", 800, 600);
    let (a_before, b_before) = (read(&a), read(&b));

    let report = watermark_build_output(&site.dist(), &site.config());

    assert!(report.fatal.is_some());
    assert_eq!(report.processed, 0);
    assert!(report.files.is_empty());
    assert_eq!(read(&a), a_before);
    assert_eq!(read(&b), b_before);
}

#[test]
fn jpeg_stays_jpeg() {
    let site = Site::new();
    site.write_glyph();
    let photo = site.write_photo("photo.jpg", 640, 480);

    let report = watermark_build_output(&site.dist(), &site.config());

    assert_eq!(report.processed, 1);
    assert!(photo.exists());
    assert_eq!(image::guess_format(&read(&photo)).unwrap(), ImageFormat::Jpeg);
    assert_eq!(image::open(&photo).unwrap().color(), image::ColorType::Rgb8);
}

#[test]
fn images_outside_the_assets_dir_are_ignored() {
    let site = Site::new();
    site.write_glyph();
    let page_image = site.dist().join("og.png");
    RgbImage::from_pixel(800, 600, Rgb([1, 2, 3]))
        .save(&page_image)
        .unwrap();
    let before = read(&page_image);

    let report = watermark_build_output(&site.dist(), &site.config());

    assert!(report.files.is_empty());
    assert_eq!(read(&page_image), before);
}

#[test]
fn second_run_stamps_again() {
    let site = Site::new();
    site.write_glyph();
    let photo = site.write_photo("photo.png", 800, 600);

    let _ = watermark_build_output(&site.dist(), &site.config());
    let once = read(&photo);
    let report = watermark_build_output(&site.dist(), &site.config());

    assert_eq!(report.processed, 1);
    assert_ne!(read(&photo), once);
}

#[test]
fn stamps_are_shared_across_equal_widths() {
    let site = Site::new();
    site.write_glyph();
    site.write_photo("a.png", 800, 600);
    site.write_photo("b.png", 800, 300);
    site.write_photo("c.png", 1200, 600);

    let wm = Watermarker::new(site.config()).unwrap();
    let report = wm.run(&site.dist());

    assert_eq!(report.processed, 3);
    assert_eq!(wm.cached_stamps(), 2);
}

#[test]
fn cancelled_run_visits_nothing() {
    let site = Site::new();
    site.write_glyph();
    let photo = site.write_photo("photo.png", 800, 600);
    let before = read(&photo);

    let wm = Watermarker::new(site.config()).unwrap();
    let report = wm.run_with_cancel(&site.dist(), &AtomicBool::new(true));

    assert!(report.cancelled);
    assert!(report.files.is_empty());
    assert_eq!(read(&photo), before);
}

#[test]
fn top_left_position_marks_top_left() {
    let site = Site::new();
    site.write_glyph();
    let photo = site.asset("white.png");
    RgbImage::from_pixel(600, 400, Rgb([255, 255, 255]))
        .save(&photo)
        .unwrap();

    let config = WatermarkConfig {
        position: Position::TopLeft,
        padding: 0,
        opacity: 1.0,
        border_width: 2,
        ..site.config()
    };
    let report = watermark_build_output(&site.dist(), &config);
    assert_eq!(report.processed, 1);

    let img = image::open(&photo).unwrap().to_rgb8();
    let dark_top_left = (0..60)
        .flat_map(|x| (0..20).map(move |y| (x, y)))
        .any(|(x, y)| img.get_pixel(x, y)[0] < 128);
    assert!(dark_top_left, "no outline near the top-left corner");
    assert_eq!(img.get_pixel(599, 399), &Rgb([255, 255, 255]));
}

#[cfg(feature = "parallel")]
#[test]
fn parallel_run_matches_sequential_counts() {
    let site = Site::new();
    site.write_glyph();
    for i in 0..6 {
        site.write_photo(&format!("{i}.png"), 500 + i * 10, 300);
    }
    site.write_photo("small.png", 50, 50);

    let wm = Watermarker::new(site.config()).unwrap();
    let report = wm.run_parallel(&site.dist());

    assert_eq!((report.processed, report.skipped, report.errors), (6, 1, 0));
}
