//! enpitsu-pipeline: Pure pencil-sketch transformation pipeline (sans-IO).
//!
//! Converts a captured RGBA frame into a monochrome pencil-sketch
//! rendering through: luminance extraction -> background classification
//! -> connected-component filtering -> edge detection -> edge-gated
//! background expansion -> zoned tone mapping.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! pixel buffers and returns structured data. Capture, encoding, and
//! printing live outside.

pub mod background;
pub mod diagnostics;
pub mod edge;
pub mod expand;
pub mod luminance;
pub mod pipeline;
pub mod regions;
pub mod tonemap;
pub mod types;

pub use diagnostics::{PipelineDiagnostics, PipelineSummary, StageDiagnostics, StageMetrics};
pub use pipeline::Pipeline;
pub use regions::RegionFilterStats;
pub use types::{
    BackgroundMask, Dimensions, EdgeField, PipelineError, PixelBuffer, RgbaImage, SketchParams,
    StagedResult, Style, ToneField,
};

use std::time::Instant;

/// Apply the transformation for `style` to a raw captured frame.
///
/// This is the external contract of the crate: a [`PixelBuffer`] in, a
/// [`PixelBuffer`] of identical dimensions out. Only
/// [`Style::Pencil`] has a defined algorithm.
///
/// # Errors
///
/// Returns [`PipelineError::UnsupportedStyle`] for styles without a
/// defined transform, and the validation errors documented on
/// [`process`] for malformed frames or parameters.
pub fn transform(
    buffer: PixelBuffer,
    style: Style,
    params: &SketchParams,
) -> Result<PixelBuffer, PipelineError> {
    match style {
        Style::Pencil => {
            params.validate()?;
            let image = buffer.into_image()?;
            let output = process(&image, params)?;
            Ok(PixelBuffer::from_image(output))
        }
        other => Err(PipelineError::UnsupportedStyle(other)),
    }
}

/// Run the full pencil-sketch pipeline on a decoded frame.
///
/// # Pipeline steps
///
/// 1. Luminance extraction (ITU-R BT.601 weights)
/// 2. Background classification by luminance threshold
/// 3. Small-region removal (4-connected flood fill)
/// 4. Windowed gradient edge detection
/// 5. Edge-gated background dilation
/// 6. Zoned tone mapping to an opaque grayscale frame
///
/// Intermediates are dropped as soon as the next stage is done with
/// them; use [`process_staged`] or [`Pipeline`] to keep them.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] when `params` violates a
/// construction invariant.
pub fn process(image: &RgbaImage, params: &SketchParams) -> Result<RgbaImage, PipelineError> {
    params.validate()?;

    // 1. Luminance extraction.
    let tones = luminance::extract_tones(image);

    // 2. Background classification.
    let mut mask = background::classify_background(&tones, params.background_threshold);

    // 3. Small-region removal.
    let _ = regions::filter_small_regions(&mut mask, params.min_connected_pixels);

    // 4. Edge detection (reads only the tone field).
    let edges = edge::detect_edges(&tones, params);

    // 5. Edge-gated background dilation.
    let expanded = expand::expand_background(
        &mask,
        &edges,
        params.expand_background,
        params.background_edge_threshold,
    );

    // 6. Zoned tone mapping.
    Ok(tonemap::render(&tones, &edges, &expanded, params))
}

/// Run the full pipeline, keeping every intermediate stage output and
/// collecting per-stage timing and metrics.
///
/// Returns the [`StagedResult`] (all intermediates) and the
/// [`PipelineDiagnostics`] for the run. This is the entry point the
/// tuning UI and the bench harness use; [`process`] is the cheap path
/// when only the final frame matters.
///
/// # Errors
///
/// Returns the validation errors documented on
/// [`PixelBuffer::into_image`] and [`SketchParams::validate`].
pub fn process_staged(
    buffer: PixelBuffer,
    params: &SketchParams,
) -> Result<(StagedResult, PipelineDiagnostics), PipelineError> {
    let total_start = Instant::now();

    // 1. Validation.
    let stage_start = Instant::now();
    params.validate()?;
    let buffer_bytes = buffer.data.len();
    let original = buffer.into_image()?;
    let dimensions = Dimensions {
        width: original.width(),
        height: original.height(),
    };
    let validate = StageDiagnostics {
        duration: stage_start.elapsed(),
        metrics: StageMetrics::Validate {
            buffer_bytes,
            width: dimensions.width,
            height: dimensions.height,
            pixel_count: dimensions.pixel_count(),
        },
    };

    // 2. Luminance extraction.
    let stage_start = Instant::now();
    let tones = luminance::extract_tones(&original);
    let luminance = StageDiagnostics {
        duration: stage_start.elapsed(),
        metrics: StageMetrics::Luminance {
            width: tones.width(),
            height: tones.height(),
        },
    };

    // 3. Background classification.
    let stage_start = Instant::now();
    let mut mask = background::classify_background(&tones, params.background_threshold);
    let initial_count = mask.background_count();
    let background = StageDiagnostics {
        duration: stage_start.elapsed(),
        metrics: StageMetrics::Background {
            threshold: params.background_threshold,
            background_pixel_count: initial_count,
            total_pixel_count: dimensions.pixel_count(),
        },
    };

    // 4. Small-region removal.
    let stage_start = Instant::now();
    let stats = regions::filter_small_regions(&mut mask, params.min_connected_pixels);
    let filtered_count = mask.background_count();
    let regions = StageDiagnostics {
        duration: stage_start.elapsed(),
        metrics: StageMetrics::Regions {
            min_connected_pixels: params.min_connected_pixels,
            region_count: stats.region_count,
            discarded_region_count: stats.discarded_region_count,
            discarded_pixel_count: stats.discarded_pixel_count,
            background_pixel_count: filtered_count,
        },
    };

    // 5. Edge detection.
    let stage_start = Instant::now();
    let edge_field = edge::detect_edges(&tones, params);
    let edge_pixel_count = diagnostics::count_edge_pixels(&edge_field);
    let edges = StageDiagnostics {
        duration: stage_start.elapsed(),
        metrics: StageMetrics::EdgeDetection {
            radius: params.edge_radius,
            noise_threshold: params.noise_threshold,
            edge_threshold: params.edge_threshold,
            edge_pixel_count,
            max_strength: diagnostics::max_edge_strength(&edge_field),
        },
    };

    // 6. Edge-gated background dilation.
    let stage_start = Instant::now();
    let expanded = expand::expand_background(
        &mask,
        &edge_field,
        params.expand_background,
        params.background_edge_threshold,
    );
    let expanded_count = expanded.background_count();
    let expansion = StageDiagnostics {
        duration: stage_start.elapsed(),
        metrics: StageMetrics::Expansion {
            iterations: params.expand_background,
            edge_threshold: params.background_edge_threshold,
            // Dilation only ever adds pixels.
            pixels_added: expanded_count.saturating_sub(filtered_count),
        },
    };

    // 7. Zoned tone mapping.
    let stage_start = Instant::now();
    let output = tonemap::render(&tones, &edge_field, &expanded, params);
    let white_pixel_count = diagnostics::count_white_pixels(&output);
    let tonemap = StageDiagnostics {
        duration: stage_start.elapsed(),
        metrics: StageMetrics::ToneMap {
            white_pixel_count,
            total_pixel_count: dimensions.pixel_count(),
        },
    };

    let diagnostics = PipelineDiagnostics {
        validate,
        luminance,
        background,
        regions,
        edges,
        expansion,
        tonemap,
        total_duration: total_start.elapsed(),
        summary: PipelineSummary {
            image_width: dimensions.width,
            image_height: dimensions.height,
            pixel_count: dimensions.pixel_count(),
            background_pixel_count: expanded_count,
            edge_pixel_count,
            white_pixel_count,
        },
    };

    let staged = StagedResult {
        original,
        tones,
        background: mask,
        edges: edge_field,
        expanded,
        output,
        dimensions,
    };

    Ok((staged, diagnostics))
}
