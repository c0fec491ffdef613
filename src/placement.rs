//! Stamp placement: corner + padding to a top-left pixel offset.

use crate::config::Position;

/// Top-left offset of a `stamp` (w, h) on a `target` (W, H).
///
/// - bottom-right: `(W - w - p, H - h - p)`
/// - bottom-left: `(p, H - h - p)`
/// - top-right: `(W - w - p, p)`
/// - top-left: `(p, p)`
///
/// Negative coordinates clamp to 0, so an oversized stamp sits flush against
/// the edge instead of leaving the canvas.
#[must_use]
pub fn offset(
    position: Position,
    target: (u32, u32),
    stamp: (u32, u32),
    padding: u32,
) -> (u32, u32) {
    let (tw, th) = (i64::from(target.0), i64::from(target.1));
    let (sw, sh) = (i64::from(stamp.0), i64::from(stamp.1));
    let p = i64::from(padding);

    let far_x = tw - sw - p;
    let far_y = th - sh - p;

    let (x, y) = match position {
        Position::BottomRight => (far_x, far_y),
        Position::BottomLeft => (p, far_y),
        Position::TopRight => (far_x, p),
        Position::TopLeft => (p, p),
    };

    (clamp_coord(x), clamp_coord(y))
}

fn clamp_coord(v: i64) -> u32 {
    u32::try_from(v.max(0)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_follow_formulas() {
        let target = (1000, 800);
        let stamp = (100, 40);
        assert_eq!(offset(Position::BottomRight, target, stamp, 20), (880, 740));
        assert_eq!(offset(Position::BottomLeft, target, stamp, 20), (20, 740));
        assert_eq!(offset(Position::TopRight, target, stamp, 20), (880, 20));
        assert_eq!(offset(Position::TopLeft, target, stamp, 20), (20, 20));
    }

    #[test]
    fn oversized_padding_clamps_to_origin() {
        assert_eq!(offset(Position::BottomRight, (100, 100), (30, 30), 90), (0, 0));
    }

    #[test]
    fn clamps_each_axis_independently() {
        // Stamp taller than the target: x is fine, y clamps.
        assert_eq!(offset(Position::BottomRight, (500, 50), (50, 80), 10), (440, 0));
        assert_eq!(offset(Position::TopRight, (40, 400), (60, 10), 0), (0, 0));
    }

    #[test]
    fn zero_padding_sits_flush() {
        assert_eq!(offset(Position::BottomRight, (100, 100), (30, 20), 0), (70, 80));
    }
}
