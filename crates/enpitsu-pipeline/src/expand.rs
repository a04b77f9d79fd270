//! Edge-gated background dilation.
//!
//! Grows the filtered background mask outward into neighboring pixels
//! whose edge strength is below `background_edge_threshold`, over a
//! fixed number of iterations. Strong edges act as a fence, keeping
//! background from bleeding across subject contours.
//!
//! Each iteration is double-buffered: it reads the mask exactly as the
//! previous iteration left it, so growth within one pass cannot cascade
//! through pixels marked in the same pass. The input mask is never
//! mutated; the caller receives a new mask.

use crate::types::{BackgroundMask, EdgeField};

/// Dilate `mask` into low-edge neighbors over `iterations` passes.
///
/// Only interior pixels seed dilation (a seed needs its full 3x3
/// neighborhood), but border pixels can still be marked as neighbors
/// of an interior seed.
#[must_use = "returns the expanded background mask"]
pub fn expand_background(
    mask: &BackgroundMask,
    edges: &EdgeField,
    iterations: u32,
    edge_threshold: f32,
) -> BackgroundMask {
    let width = mask.width();
    let height = mask.height();
    let mut current = mask.clone();

    if width < 3 || height < 3 {
        return current;
    }

    for _ in 0..iterations {
        let mut next = current.clone();
        for y in 1..height - 1 {
            for x in 1..width - 1 {
                if !current.get(x, y) {
                    continue;
                }
                for ny in (y - 1)..=(y + 1) {
                    for nx in (x - 1)..=(x + 1) {
                        if edges.get(nx, ny) < edge_threshold {
                            next.set(nx, ny, true);
                        }
                    }
                }
            }
        }
        current = next;
    }

    current
}
