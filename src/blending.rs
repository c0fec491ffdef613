//! Alpha compositing of a stamp onto a target image.
//!
//! Forward "over" blending, per covered pixel:
//!
//! ```text
//! a_out = a_s + a_t * (1 - a_s)
//! c_out = (c_s * a_s + c_t * a_t * (1 - a_s)) / a_out
//! ```
//!
//! with `a_s` taken from the stamp's (already opacity-scaled) alpha channel.
//! On an opaque target this is `a_s * stamp + (1 - a_s) * target`.

use image::RgbaImage;

/// Blend `stamp` onto `image` in place with its top-left corner at
/// (`pos_x`, `pos_y`).
///
/// Any part of the stamp past the right or bottom edge is cropped; pixels
/// outside the stamp's footprint are untouched. Transparent target pixels
/// take the stamp's color rather than being darkened toward black.
pub fn overlay(image: &mut RgbaImage, stamp: &RgbaImage, pos_x: u32, pos_y: u32) {
    let img_w = image.width();
    let img_h = image.height();

    // Clip to image bounds
    let x2 = pos_x.saturating_add(stamp.width()).min(img_w);
    let y2 = pos_y.saturating_add(stamp.height()).min(img_h);

    if pos_x >= x2 || pos_y >= y2 {
        return;
    }

    for dy in 0..(y2 - pos_y) {
        for dx in 0..(x2 - pos_x) {
            let src = stamp.get_pixel(dx, dy);
            if src[3] == 0 {
                continue;
            }

            let alpha = f32::from(src[3]) / 255.0;
            let px = image.get_pixel_mut(pos_x + dx, pos_y + dy);
            let under = f32::from(px[3]) / 255.0 * (1.0 - alpha);
            let coverage = alpha + under;

            for ch in 0..3 {
                let blended = (f32::from(src[ch]) * alpha + f32::from(px[ch]) * under) / coverage;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                {
                    px[ch] = blended.round().clamp(0.0, 255.0) as u8;
                }
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                px[3] = (coverage * 255.0).round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}
