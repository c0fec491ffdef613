//! Stamp construction from the signature glyph.
//!
//! The glyph is expected to be opaque strokes on a transparent background.
//! For a given target width it is resized, its alpha channel is grown into an
//! outline mask, and two solid layers are stacked:
//!
//! ```text
//! border layer: border_color where dilate(alpha, border_width) >= BORDER_CUT
//! fill layer:   fill_color   with the glyph's own alpha
//! stamp:        (fill over border), alpha * opacity
//! ```
//!
//! The outline is therefore only visible as a ring around each stroke.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, Rgba, RgbaImage};

use crate::config::{Rgb, WatermarkConfig};

/// Cut applied to the dilated mask: values at or above become fully opaque.
pub const BORDER_CUT: u8 = 20;

/// A finished watermark ready to composite onto a target.
pub type Stamp = RgbaImage;

/// Width of the stamp for a target of `target_width` pixels.
///
/// `round(target_width * scale)`, never less than one pixel.
#[must_use]
pub fn stamp_width(target_width: u32, scale: f32) -> u32 {
    to_pixels(f64::from(target_width) * f64::from(scale))
}

/// Round to a pixel count of at least one.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_pixels(v: f64) -> u32 {
    v.round().clamp(1.0, f64::from(u32::MAX)) as u32
}

/// Resize the glyph to `width`, preserving aspect ratio and alpha.
#[must_use]
pub fn resize_glyph(glyph: &RgbaImage, width: u32) -> RgbaImage {
    let width = width.max(1);
    let height = if glyph.width() == 0 {
        1
    } else {
        to_pixels(f64::from(glyph.height()) * f64::from(width) / f64::from(glyph.width()))
    };
    imageops::resize(glyph, width, height, FilterType::Lanczos3)
}

/// Extract the alpha channel as a single-channel ink mask.
#[must_use]
pub fn alpha_mask(image: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([image.get_pixel(x, y)[3]])
    })
}

/// One 3x3 neighborhood-maximum pass. Edge pixels consider in-bounds
/// neighbors only.
fn dilate_once(mask: &GrayImage) -> GrayImage {
    let (w, h) = mask.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        let mut max = 0u8;
        for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
            for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                max = max.max(mask.get_pixel(nx, ny)[0]);
            }
        }
        Luma([max])
    })
}

/// Grow the mask by `passes` pixels in every direction.
///
/// The result is a pixel-wise superset of the input for any number of passes.
#[must_use]
pub fn dilate(mask: &GrayImage, passes: u32) -> GrayImage {
    let mut out = mask.clone();
    if out.width() == 0 || out.height() == 0 {
        return out;
    }
    for _ in 0..passes {
        out = dilate_once(&out);
    }
    out
}

/// Binarize: `>= cut` becomes 255, everything else 0.
#[must_use]
pub fn threshold(mask: &GrayImage, cut: u8) -> GrayImage {
    let mut out = mask.clone();
    for px in out.pixels_mut() {
        px[0] = if px[0] >= cut { 255 } else { 0 };
    }
    out
}

/// Stack the fill layer over the border layer.
fn compose_layers(
    border: &GrayImage,
    fill: &GrayImage,
    border_color: Rgb,
    fill_color: Rgb,
) -> RgbaImage {
    let bc = [border_color.r, border_color.g, border_color.b];
    let fc = [fill_color.r, fill_color.g, fill_color.b];

    RgbaImage::from_fn(fill.width(), fill.height(), |x, y| {
        let fa = f32::from(fill.get_pixel(x, y)[0]) / 255.0;
        let ba = f32::from(border.get_pixel(x, y)[0]) / 255.0;
        let out_a = fa + ba * (1.0 - fa);
        if out_a <= 0.0 {
            return Rgba([0, 0, 0, 0]);
        }

        let mut px = [0u8; 4];
        for ch in 0..3 {
            let c = (f32::from(fc[ch]) * fa + f32::from(bc[ch]) * ba * (1.0 - fa)) / out_a;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                px[ch] = c.round().clamp(0.0, 255.0) as u8;
            }
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            px[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
        }
        Rgba(px)
    })
}

/// Multiply every alpha value by `opacity`; color channels are untouched.
///
/// While `opacity > 0`, inked pixels keep at least alpha 1 so faint
/// anti-aliased edges stay part of the footprint.
pub fn apply_opacity(image: &mut RgbaImage, opacity: f32) {
    let opacity = opacity.clamp(0.0, 1.0);
    let floor = if opacity > 0.0 { 1.0 } else { 0.0 };
    for px in image.pixels_mut() {
        if px[3] == 0 {
            continue;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            px[3] = (f32::from(px[3]) * opacity).round().clamp(floor, 255.0) as u8;
        }
    }
}

/// Build the stamp for a target image `target_width` pixels wide.
///
/// The stamp is exactly [`stamp_width`] wide; its height follows the glyph's
/// aspect ratio and may exceed the target's height, in which case placement
/// and compositing clamp and crop.
#[must_use]
pub fn build_stamp(glyph: &RgbaImage, target_width: u32, config: &WatermarkConfig) -> Stamp {
    let resized = resize_glyph(glyph, stamp_width(target_width, config.scale));
    let ink = alpha_mask(&resized);
    let border = threshold(&dilate(&ink, config.border_width), BORDER_CUT);

    let mut stamp = compose_layers(&border, &ink, config.border_color, config.fill_color);
    apply_opacity(&mut stamp, config.opacity);
    stamp
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct StampKey {
    width: u32,
    fingerprint: u64,
}

/// Memoized stamps keyed by stamp width and config fingerprint.
///
/// Safe to share between threads; built stamps are handed out read-only.
#[derive(Debug, Default)]
pub struct StampCache {
    stamps: Mutex<HashMap<StampKey, Arc<Stamp>>>,
}

impl StampCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached stamp for this target width, building it on a miss.
    pub fn get_or_build(
        &self,
        glyph: &RgbaImage,
        target_width: u32,
        config: &WatermarkConfig,
    ) -> Arc<Stamp> {
        let key = StampKey {
            width: stamp_width(target_width, config.scale),
            fingerprint: config.stamp_fingerprint(),
        };

        if let Some(stamp) = self.lock().get(&key) {
            return Arc::clone(stamp);
        }

        // Built outside the lock; a concurrent miss on the same key keeps the first insert.
        let built = Arc::new(build_stamp(glyph, target_width, config));
        Arc::clone(self.lock().entry(key).or_insert(built))
    }

    /// Number of distinct stamps built so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no stamp has been built yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<StampKey, Arc<Stamp>>> {
        self.stamps.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
