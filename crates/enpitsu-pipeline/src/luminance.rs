//! Luminance extraction: RGBA frame to per-pixel tone field.
//!
//! The standard perceptual luminance formula is used:
//! `0.299*R + 0.587*G + 0.114*B`. Alpha is ignored.
//!
//! This is the first processing step in the pipeline: validated frame
//! in, [`ToneField`] out. The field is computed once and never mutated
//! afterwards.

use crate::types::{RgbaImage, ToneField};

/// Perceptual channel weights for RGB-to-luminance conversion.
const WEIGHT_R: f32 = 0.299;
const WEIGHT_G: f32 = 0.587;
const WEIGHT_B: f32 = 0.114;

/// Extract per-pixel luminance from an RGBA frame.
///
/// Total over any valid frame; no error conditions.
#[must_use = "returns the extracted tone field"]
pub fn extract_tones(image: &RgbaImage) -> ToneField {
    ToneField::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, _] = image.get_pixel(x, y).0;
        f32::from(b).mul_add(
            WEIGHT_B,
            f32::from(r).mul_add(WEIGHT_R, f32::from(g) * WEIGHT_G),
        )
    })
}
