//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! These diagnostics are permanent instrumentation intended for
//! parameter tuning — the sketch pipeline's output quality is governed
//! by a dozen numeric parameters, and the per-stage counts show where
//! a change bites. Every call to
//! [`process_staged`](crate::process_staged) collects diagnostics
//! alongside the pipeline results.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single pipeline run.
///
/// One field per pipeline stage, in execution order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 1: frame validation.
    pub validate: StageDiagnostics,
    /// Stage 2: luminance extraction.
    pub luminance: StageDiagnostics,
    /// Stage 3: background classification.
    pub background: StageDiagnostics,
    /// Stage 4: connected-component filtering.
    pub regions: StageDiagnostics,
    /// Stage 5: edge detection.
    pub edges: StageDiagnostics,
    /// Stage 6: background expansion.
    pub expansion: StageDiagnostics,
    /// Stage 7: tone mapping.
    pub tonemap: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics (counts, sizes, etc.).
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Frame validation metrics.
    Validate {
        /// Size of the input frame in bytes.
        buffer_bytes: usize,
        /// Frame width in pixels.
        width: u32,
        /// Frame height in pixels.
        height: u32,
        /// Total pixel count (`width * height`).
        pixel_count: u64,
    },
    /// Luminance extraction metrics.
    Luminance {
        /// Field width in pixels.
        width: u32,
        /// Field height in pixels.
        height: u32,
    },
    /// Background classification metrics.
    Background {
        /// Luminance threshold used.
        threshold: f32,
        /// Pixels initially classified as background.
        background_pixel_count: u64,
        /// Total pixel count for computing background density.
        total_pixel_count: u64,
    },
    /// Connected-component filter metrics.
    Regions {
        /// Minimum region size kept.
        min_connected_pixels: u32,
        /// Connected background regions found.
        region_count: u32,
        /// Regions reclassified to foreground.
        discarded_region_count: u32,
        /// Pixels reclassified to foreground.
        discarded_pixel_count: u64,
        /// Background pixels remaining after filtering.
        background_pixel_count: u64,
    },
    /// Edge detection metrics.
    EdgeDetection {
        /// Window half-width.
        radius: u32,
        /// Noise suppression gradient.
        noise_threshold: f32,
        /// Saturation gradient.
        edge_threshold: f32,
        /// Pixels with nonzero edge strength.
        edge_pixel_count: u64,
        /// Largest edge strength in the field.
        max_strength: f32,
    },
    /// Background expansion metrics.
    Expansion {
        /// Dilation iterations performed.
        iterations: u32,
        /// Edge strength gate for expansion.
        edge_threshold: f32,
        /// Pixels newly marked background.
        pixels_added: u64,
    },
    /// Tone mapping metrics.
    ToneMap {
        /// Output pixels rendered pure white.
        white_pixel_count: u64,
        /// Total pixel count for computing white coverage.
        total_pixel_count: u64,
    },
}

/// High-level summary counts for the entire pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Source frame width in pixels.
    pub image_width: u32,
    /// Source frame height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Background pixels after expansion.
    pub background_pixel_count: u64,
    /// Pixels with nonzero edge strength.
    pub edge_pixel_count: u64,
    /// Output pixels rendered pure white.
    pub white_pixel_count: u64,
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Sketch Pipeline Diagnostics\n{}", "=".repeat(60)));
        lines.push(format!(
            "Frame: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        // Per-stage breakdown.
        lines.push(format!(
            "{:<16} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages: [(&str, &StageDiagnostics); 7] = [
            ("Validate", &self.validate),
            ("Luminance", &self.luminance),
            ("Background", &self.background),
            ("Regions", &self.regions),
            ("Edges", &self.edges),
            ("Expansion", &self.expansion),
            ("Tone Map", &self.tonemap),
        ];

        for (name, diag) in &stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<16} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Background: {}  |  Edge pixels: {}  |  White output: {}",
            self.summary.background_pixel_count,
            self.summary.edge_pixel_count,
            self.summary.white_pixel_count,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Validate {
            buffer_bytes,
            width,
            height,
            ..
        } => {
            format!("{buffer_bytes} bytes -> {width}x{height}")
        }
        StageMetrics::Luminance { width, height } => format!("{width}x{height}"),
        StageMetrics::Background {
            threshold,
            background_pixel_count,
            total_pixel_count,
        } => {
            let density = percentage(*background_pixel_count, *total_pixel_count);
            format!("threshold={threshold:.1} marked={background_pixel_count} ({density:.1}%)")
        }
        StageMetrics::Regions {
            min_connected_pixels,
            region_count,
            discarded_region_count,
            discarded_pixel_count,
            background_pixel_count,
        } => {
            format!(
                "min={min_connected_pixels} regions={region_count} dropped={discarded_region_count} ({discarded_pixel_count} px), kept={background_pixel_count}",
            )
        }
        StageMetrics::EdgeDetection {
            radius,
            noise_threshold,
            edge_threshold,
            edge_pixel_count,
            max_strength,
        } => {
            format!(
                "r={radius} noise={noise_threshold:.1} sat={edge_threshold:.1} edges={edge_pixel_count} max={max_strength:.3}",
            )
        }
        StageMetrics::Expansion {
            iterations,
            edge_threshold,
            pixels_added,
        } => {
            format!("iters={iterations} gate={edge_threshold:.3} added={pixels_added}")
        }
        StageMetrics::ToneMap {
            white_pixel_count,
            total_pixel_count,
        } => {
            let coverage = percentage(*white_pixel_count, *total_pixel_count);
            format!("white={white_pixel_count} ({coverage:.1}%)")
        }
    }
}

/// Percentage of `part` in `total`, 0 when `total` is 0.
#[allow(clippy::cast_precision_loss)]
fn percentage(part: u64, total: u64) -> f64 {
    if total > 0 {
        part as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

/// Count pixels with nonzero edge strength.
pub(crate) fn count_edge_pixels(edges: &crate::EdgeField) -> u64 {
    edges.values().iter().map(|&v| u64::from(v > 0.0)).sum()
}

/// Largest edge strength in the field, 0 for an empty field.
pub(crate) fn max_edge_strength(edges: &crate::EdgeField) -> f32 {
    edges.values().iter().copied().fold(0.0, f32::max)
}

/// Count output pixels rendered pure white.
pub(crate) fn count_white_pixels(output: &crate::RgbaImage) -> u64 {
    output.pixels().map(|p| u64::from(p.0[0] == 255)).sum()
}
