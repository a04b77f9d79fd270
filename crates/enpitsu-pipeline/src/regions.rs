//! Connected-component filtering of the background mask.
//!
//! Small isolated bright patches (reflections, specular highlights,
//! sensor noise) pass the luminance threshold but are not actually
//! background. This stage labels 4-connected background regions via
//! an explicit-stack flood fill and reclassifies every region smaller
//! than `min_connected_pixels` back to foreground.
//!
//! The label array is scratch state local to one call and discarded
//! afterwards. Label ids increase monotonically and are never reused,
//! including for discarded regions.

use crate::types::BackgroundMask;

/// Counts produced by one run of [`filter_small_regions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionFilterStats {
    /// Number of connected background regions found (kept + discarded).
    pub region_count: u32,
    /// Number of regions below the size threshold.
    pub discarded_region_count: u32,
    /// Total pixels reclassified to foreground.
    pub discarded_pixel_count: u64,
}

/// Remove background regions smaller than `min_connected_pixels`.
///
/// Pixels are scanned in raster order; each unlabeled background pixel
/// seeds a 4-connected flood fill. The fill uses an explicit stack of
/// coordinates, never recursion, so memory stays bounded for
/// arbitrarily large frames.
pub fn filter_small_regions(mask: &mut BackgroundMask, min_connected_pixels: u32) -> RegionFilterStats {
    let width = mask.width() as usize;
    let height = mask.height() as usize;

    // 0 = unlabeled, >0 = region id.
    let mut labels = vec![0_u32; width * height];
    let mut next_region_id = 1_u32;
    let mut stats = RegionFilterStats {
        region_count: 0,
        discarded_region_count: 0,
        discarded_pixel_count: 0,
    };

    for y in 0..height {
        for x in 0..width {
            if !mask.flags()[y * width + x] || labels[y * width + x] != 0 {
                continue;
            }
            let size = flood_fill(mask, &mut labels, x, y, next_region_id);
            stats.region_count += 1;
            if size < u64::from(min_connected_pixels) {
                clear_region(mask, &labels, next_region_id);
                stats.discarded_region_count += 1;
                stats.discarded_pixel_count += size;
            }
            // Ids are not reused even when the region was discarded.
            next_region_id += 1;
        }
    }

    stats
}

/// Label the 4-connected background region containing `(x, y)` and
/// return its size in pixels.
fn flood_fill(
    mask: &BackgroundMask,
    labels: &mut [u32],
    x: usize,
    y: usize,
    region_id: u32,
) -> u64 {
    let width = mask.width() as usize;
    let height = mask.height() as usize;
    let mut size = 0_u64;
    let mut stack = vec![(x, y)];

    while let Some((cx, cy)) = stack.pop() {
        let idx = cy * width + cx;
        if !mask.flags()[idx] || labels[idx] != 0 {
            continue;
        }
        labels[idx] = region_id;
        size += 1;

        if cx + 1 < width {
            stack.push((cx + 1, cy));
        }
        if cx > 0 {
            stack.push((cx - 1, cy));
        }
        if cy + 1 < height {
            stack.push((cx, cy + 1));
        }
        if cy > 0 {
            stack.push((cx, cy - 1));
        }
    }

    size
}

/// Reset every pixel carrying `region_id` back to foreground.
fn clear_region(mask: &mut BackgroundMask, labels: &[u32], region_id: u32) {
    let width = mask.width();
    for (idx, &label) in labels.iter().enumerate() {
        if label == region_id {
            let x = (idx % width as usize) as u32;
            let y = (idx / width as usize) as u32;
            mask.set(x, y, false);
        }
    }
}
