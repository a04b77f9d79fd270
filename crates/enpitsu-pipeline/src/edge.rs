//! Gradient-based edge detection with single-pixel noise suppression.
//!
//! For every pixel with a full `edge_radius` neighborhood, the
//! detector examines all neighbors in the square window and measures
//! the absolute luminance gradient to each. Neighbors below
//! `noise_threshold` are ignored; if more than two remain, edge
//! strength is the maximum gradient normalized by `edge_threshold`
//! (saturating at 1) and scaled by `edge_strength`. Requiring more
//! than two strong gradients rejects isolated single-pixel spikes
//! while preserving coherent contours.
//!
//! Pixels within `edge_radius` of the image border keep strength 0 —
//! a known boundary limitation of the windowed detector.
//!
//! Independent of the background mask; reads only the tone field.

use crate::types::{EdgeField, SketchParams, ToneField};

/// Minimum number of above-noise gradients for a pixel to count as an
/// edge. At most two can come from a single stray pixel crossing the
/// window, so this rejects salt-and-pepper noise.
const MIN_GRADIENT_COUNT: u32 = 3;

/// Compute the normalized edge-strength field from luminance.
///
/// Uses `edge_radius`, `noise_threshold`, `edge_threshold`, and
/// `edge_strength` from `params`. Output values are in
/// `[0, edge_strength]`.
#[must_use = "returns the edge strength field"]
pub fn detect_edges(tones: &ToneField, params: &SketchParams) -> EdgeField {
    let width = tones.width();
    let height = tones.height();
    let radius = params.edge_radius;

    EdgeField::from_fn(width, height, |x, y| {
        if x < radius || y < radius || x + radius >= width || y + radius >= height {
            return 0.0;
        }

        let center = tones.get(x, y);
        let mut max_gradient = 0.0_f32;
        let mut gradient_count = 0_u32;

        for ny in (y - radius)..=(y + radius) {
            for nx in (x - radius)..=(x + radius) {
                let gradient = (center - tones.get(nx, ny)).abs();
                if gradient > params.noise_threshold {
                    max_gradient = max_gradient.max(gradient);
                    gradient_count += 1;
                }
            }
        }

        if gradient_count >= MIN_GRADIENT_COUNT {
            (max_gradient / params.edge_threshold).min(1.0) * params.edge_strength
        } else {
            0.0
        }
    })
}
