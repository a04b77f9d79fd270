//! Initial background classification by luminance threshold.
//!
//! A pixel is marked background iff its tone strictly exceeds the
//! threshold. Purely pointwise; no neighbor interaction. The resulting
//! mask is refined by [`crate::regions`] (small-region removal) and
//! [`crate::expand`] (edge-gated dilation) before tone mapping.

use crate::types::{BackgroundMask, ToneField};

/// Classify bright pixels as background.
///
/// This is the second pipeline step, directly after luminance
/// extraction.
#[must_use = "returns the initial background mask"]
pub fn classify_background(tones: &ToneField, threshold: f32) -> BackgroundMask {
    let mut mask = BackgroundMask::new(tones.width(), tones.height());
    for y in 0..tones.height() {
        for x in 0..tones.width() {
            if tones.get(x, y) > threshold {
                mask.set(x, y, true);
            }
        }
    }
    mask
}
