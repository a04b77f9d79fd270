//! Zoned tone mapping: the final pass producing the sketch rendering.
//!
//! Blends luminance, edge strength, and the expanded background mask
//! into a grayscale output frame. Background pixels become pure white;
//! strong contours become gray lines (never pure black); everything
//! else is mapped through shadow / mid / highlight zones, with faint
//! edges blended toward white rather than darkened.
//!
//! The ordering of the background check against the weak-edge blend,
//! the strict `edge > 0.2` contour comparison, and the saturating
//! blend formula are all replicated from the shipped renderer on
//! purpose; see the edge-case tests below.

use crate::types::{BackgroundMask, EdgeField, RgbaImage, SketchParams, ToneField};

/// Edge strength above which a pixel is rendered as a contour line.
const CONTOUR_THRESHOLD: f32 = 0.2;

/// Fixed tone boundary between the shadow and mid zones.
const MID_ZONE_FLOOR: f32 = 180.0;

/// Render the output frame from the three per-pixel fields.
///
/// Every output pixel is written as `(v, v, v, 255)` — grayscale at
/// full opacity. Values are clamped to `[0, 255]` and rounded on the
/// byte write.
#[must_use = "returns the rendered output frame"]
pub fn render(
    tones: &ToneField,
    edges: &EdgeField,
    background: &BackgroundMask,
    params: &SketchParams,
) -> RgbaImage {
    RgbaImage::from_fn(tones.width(), tones.height(), |x, y| {
        let value = map_pixel(
            tones.get(x, y),
            edges.get(x, y),
            background.get(x, y),
            params,
        );
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let byte = value.clamp(0.0, 255.0).round() as u8;
        image::Rgba([byte, byte, byte, 255])
    })
}

/// Map one pixel to its output gray value (unclamped).
fn map_pixel(tone: f32, edge: f32, background: bool, params: &SketchParams) -> f32 {
    // Contrast around the 128 midpoint, then brightness.
    let tone = ((tone - 128.0) * params.contrast_factor + 128.0) * params.brightness_factor;

    // Background is always white. The tone test re-captures bright,
    // featureless pixels the mask passes over.
    if background || (tone > params.background_threshold && edge < params.background_edge_threshold)
    {
        return 255.0;
    }

    let mut value = if edge > CONTOUR_THRESHOLD {
        // Strong contour: gray line, floored at shadow_gray.
        params.shadow_gray.max(edge.mul_add(-180.0, 255.0))
    } else if tone > params.highlight_threshold {
        255.0
    } else if tone > MID_ZONE_FLOOR {
        let t = (tone - MID_ZONE_FLOOR) / (params.highlight_threshold - MID_ZONE_FLOOR);
        (255.0 - params.mid_gray).mul_add(t, params.mid_gray)
    } else {
        let t = (tone / MID_ZONE_FLOOR).max(0.0);
        (params.mid_gray - params.shadow_gray).mul_add(t, params.shadow_gray)
    };

    // Faint edges soften toward white instead of darkening.
    if edge > 0.0 && edge <= CONTOUR_THRESHOLD {
        value = 255.0_f32.min(edge.mul_add(-3.0, 1.0).mul_add(255.0 - value, value));
    }

    value
}
