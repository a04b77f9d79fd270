//! Shared types for the enpitsu sketch transformation pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `RgbaImage` so downstream crates can reference raster
/// data without depending on `image` directly.
pub use image::RgbaImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total pixel count (`width * height`).
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// A raw row-major RGBA frame as handed over by the capture subsystem.
///
/// This is the external contract type: the capture side produces one,
/// the print side consumes one, and [`transform`](crate::transform)
/// validates it into an [`RgbaImage`] on entry. The data length must
/// be exactly `width * height * 4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major RGBA bytes, length `width * height * 4`.
    pub data: Vec<u8>,
}

impl PixelBuffer {
    /// Create a pixel buffer from raw parts. No validation is
    /// performed here; [`into_image`](Self::into_image) checks the
    /// invariants when the buffer enters the pipeline.
    #[must_use]
    pub const fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    /// Wrap a decoded [`RgbaImage`] without copying.
    #[must_use]
    pub fn from_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: image.into_raw(),
        }
    }

    /// Validate the buffer and convert it into an [`RgbaImage`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDimensions`] when either
    /// dimension is zero, [`PipelineError::ResourceLimit`] when
    /// `width * height * 4` is not representable in memory, and
    /// [`PipelineError::BufferSizeMismatch`] when the data length does
    /// not match the dimensions.
    pub fn into_image(self) -> Result<RgbaImage, PipelineError> {
        if self.width == 0 || self.height == 0 {
            return Err(PipelineError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        let expected = (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or(PipelineError::ResourceLimit {
                width: self.width,
                height: self.height,
            })?;
        if self.data.len() != expected {
            return Err(PipelineError::BufferSizeMismatch {
                expected,
                actual: self.data.len(),
            });
        }
        RgbaImage::from_raw(self.width, self.height, self.data).ok_or(
            // from_raw only fails on a length mismatch, which the
            // check above already rules out.
            PipelineError::ResourceLimit {
                width: self.width,
                height: self.height,
            },
        )
    }
}

/// Per-pixel luminance values, computed once by the luminance stage
/// and read-only for the remainder of the pipeline.
///
/// Stored as a flat row-major `f32` array indexed by `y * width + x`.
/// `f32` is the single floating width used for every intermediate
/// field in this crate.
#[derive(Debug, Clone, PartialEq)]
pub struct ToneField {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl ToneField {
    /// Build a tone field from raw values. Returns `None` if the value
    /// count does not match `width * height`.
    #[must_use]
    pub fn from_values(width: u32, height: u32, values: Vec<f32>) -> Option<Self> {
        (values.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            values,
        })
    }

    /// Build a tone field by evaluating `f` at every `(x, y)` in
    /// row-major order.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> f32) -> Self {
        let mut values = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                values.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            values,
        }
    }

    /// Field width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Field height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Luminance at `(x, y)`.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.values[y as usize * self.width as usize + x as usize]
    }

    /// The flat row-major value array.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

/// Per-pixel normalized edge strength in `[0, edge_strength]`,
/// computed once by the edge detection stage.
///
/// Same flat row-major `f32` layout as [`ToneField`]. Pixels within
/// `edge_radius` of the image border are always 0 (the detector needs
/// a full neighborhood).
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeField {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl EdgeField {
    /// Build an edge field from raw values. Returns `None` if the
    /// value count does not match `width * height`.
    #[must_use]
    pub fn from_values(width: u32, height: u32, values: Vec<f32>) -> Option<Self> {
        (values.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            values,
        })
    }

    /// Build an edge field by evaluating `f` at every `(x, y)` in
    /// row-major order.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> f32) -> Self {
        let mut values = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                values.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            values,
        }
    }

    /// Field width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Field height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Edge strength at `(x, y)`.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.values[y as usize * self.width as usize + x as usize]
    }

    /// The flat row-major value array.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

/// Per-pixel background classification.
///
/// `true` marks a pixel presumed to be non-subject (rendered white).
/// Flat row-major layout matching the other fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundMask {
    width: u32,
    height: u32,
    flags: Vec<bool>,
}

impl BackgroundMask {
    /// Create an all-foreground mask.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            flags: vec![false; width as usize * height as usize],
        }
    }

    /// Build a mask from raw flags. Returns `None` if the flag count
    /// does not match `width * height`.
    #[must_use]
    pub fn from_flags(width: u32, height: u32, flags: Vec<bool>) -> Option<Self> {
        (flags.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            flags,
        })
    }

    /// Mask width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Mask height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Whether `(x, y)` is classified as background.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.flags[y as usize * self.width as usize + x as usize]
    }

    /// Set the classification at `(x, y)`.
    pub fn set(&mut self, x: u32, y: u32, background: bool) {
        self.flags[y as usize * self.width as usize + x as usize] = background;
    }

    /// The flat row-major flag array.
    #[must_use]
    pub fn flags(&self) -> &[bool] {
        &self.flags
    }

    /// Number of pixels classified as background.
    #[must_use]
    pub fn background_count(&self) -> u64 {
        self.flags.iter().map(|&b| u64::from(b)).sum()
    }
}

/// Which artistic style to apply.
///
/// Only [`Pencil`](Self::Pencil) has a defined algorithm. The other
/// variants are enumerated for configuration compatibility and
/// surface [`PipelineError::UnsupportedStyle`] until they gain one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    /// Monochrome pencil-sketch rendering.
    Pencil,
    /// Reserved; no defined transform.
    Watercolor,
    /// Reserved; no defined transform.
    OilPainting,
}

impl std::fmt::Display for Style {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pencil => "pencil",
            Self::Watercolor => "watercolor",
            Self::OilPainting => "oilpainting",
        };
        f.write_str(name)
    }
}

/// Tuning parameters for the pencil-sketch transformation.
///
/// Shared read-only across all stages of one invocation. The record
/// itself is owned by the configuration layer outside this crate;
/// defaults here match the values the photo booth ships with.
///
/// Tone-domain parameters (`*_threshold`, `*_gray`) are expressed in
/// the 0-255 luminance range; edge-domain parameters
/// (`edge_strength`, `background_edge_threshold`) live in the
/// normalized `[0, 1]` edge-strength range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SketchParams {
    /// Brightness multiplier applied after contrast adjustment.
    pub brightness_factor: f32,

    /// Contrast multiplier applied around the 128 midpoint.
    pub contrast_factor: f32,

    /// Peak normalized edge strength; lower values soften lines.
    pub edge_strength: f32,

    /// Gradient magnitude that saturates edge strength.
    /// Must be positive.
    pub edge_threshold: f32,

    /// Darkest output gray for shadows and contours (never pure black).
    pub shadow_gray: f32,

    /// Output gray at the shadow/highlight zone boundary.
    pub mid_gray: f32,

    /// Adjusted tone above which output is pure white.
    /// Must exceed 180 so the mid-zone interpolation divisor stays
    /// non-zero.
    pub highlight_threshold: f32,

    /// Luminance above which a pixel is initially classified as
    /// background.
    pub background_threshold: f32,

    /// Half-width of the square edge detection window. Pixels within
    /// this distance of the border keep edge strength 0.
    pub edge_radius: u32,

    /// Edge strength below which background may expand into a pixel.
    pub background_edge_threshold: f32,

    /// Gradient magnitude below which a neighbor is ignored as noise.
    pub noise_threshold: f32,

    /// Number of background dilation iterations.
    pub expand_background: u32,

    /// Minimum 4-connected background region size; smaller regions
    /// are reclassified as foreground.
    pub min_connected_pixels: u32,
}

impl SketchParams {
    /// Default brightness multiplier.
    pub const DEFAULT_BRIGHTNESS_FACTOR: f32 = 1.4;
    /// Default contrast multiplier.
    pub const DEFAULT_CONTRAST_FACTOR: f32 = 1.2;
    /// Default peak edge strength.
    pub const DEFAULT_EDGE_STRENGTH: f32 = 0.8;
    /// Default edge saturation gradient.
    pub const DEFAULT_EDGE_THRESHOLD: f32 = 12.0;
    /// Default shadow gray level.
    pub const DEFAULT_SHADOW_GRAY: f32 = 180.0;
    /// Default mid gray level.
    pub const DEFAULT_MID_GRAY: f32 = 220.0;
    /// Default highlight threshold.
    pub const DEFAULT_HIGHLIGHT_THRESHOLD: f32 = 230.0;
    /// Default background luminance threshold.
    pub const DEFAULT_BACKGROUND_THRESHOLD: f32 = 130.0;
    /// Default edge detection window half-width.
    pub const DEFAULT_EDGE_RADIUS: u32 = 3;
    /// Default background expansion edge gate.
    pub const DEFAULT_BACKGROUND_EDGE_THRESHOLD: f32 = 0.08;
    /// Default noise suppression gradient.
    pub const DEFAULT_NOISE_THRESHOLD: f32 = 10.0;
    /// Default background expansion iteration count.
    pub const DEFAULT_EXPAND_BACKGROUND: u32 = 2;
    /// Default minimum connected background region size.
    pub const DEFAULT_MIN_CONNECTED_PIXELS: u32 = 100;

    /// Check the construction invariants the tone-mapping formulas
    /// rely on.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] when a parameter is
    /// non-finite, `edge_threshold` is not positive,
    /// `highlight_threshold` does not exceed 180, or `edge_strength`
    /// is negative.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let floats = [
            ("brightness_factor", self.brightness_factor),
            ("contrast_factor", self.contrast_factor),
            ("edge_strength", self.edge_strength),
            ("edge_threshold", self.edge_threshold),
            ("shadow_gray", self.shadow_gray),
            ("mid_gray", self.mid_gray),
            ("highlight_threshold", self.highlight_threshold),
            ("background_threshold", self.background_threshold),
            ("background_edge_threshold", self.background_edge_threshold),
            ("noise_threshold", self.noise_threshold),
        ];
        for (name, value) in floats {
            if !value.is_finite() {
                return Err(PipelineError::InvalidConfig(format!(
                    "{name} must be finite, got {value}",
                )));
            }
        }
        if self.edge_threshold <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "edge_threshold must be positive, got {}",
                self.edge_threshold,
            )));
        }
        if self.highlight_threshold <= 180.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "highlight_threshold must exceed 180, got {}",
                self.highlight_threshold,
            )));
        }
        if self.edge_strength < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "edge_strength must be non-negative, got {}",
                self.edge_strength,
            )));
        }
        Ok(())
    }
}

impl Default for SketchParams {
    fn default() -> Self {
        Self {
            brightness_factor: Self::DEFAULT_BRIGHTNESS_FACTOR,
            contrast_factor: Self::DEFAULT_CONTRAST_FACTOR,
            edge_strength: Self::DEFAULT_EDGE_STRENGTH,
            edge_threshold: Self::DEFAULT_EDGE_THRESHOLD,
            shadow_gray: Self::DEFAULT_SHADOW_GRAY,
            mid_gray: Self::DEFAULT_MID_GRAY,
            highlight_threshold: Self::DEFAULT_HIGHLIGHT_THRESHOLD,
            background_threshold: Self::DEFAULT_BACKGROUND_THRESHOLD,
            edge_radius: Self::DEFAULT_EDGE_RADIUS,
            background_edge_threshold: Self::DEFAULT_BACKGROUND_EDGE_THRESHOLD,
            noise_threshold: Self::DEFAULT_NOISE_THRESHOLD,
            expand_background: Self::DEFAULT_EXPAND_BACKGROUND,
            min_connected_pixels: Self::DEFAULT_MIN_CONNECTED_PIXELS,
        }
    }
}

/// Result of running the pipeline with all intermediate stage outputs
/// preserved.
///
/// Each field captures the output of one logical pipeline stage,
/// enabling previews and diagnostics for every step of the processing
/// chain. All intermediates are scoped to a single invocation; nothing
/// is reused across calls.
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// Stage 1: validated source frame.
    pub original: RgbaImage,
    /// Stage 2: per-pixel luminance.
    pub tones: ToneField,
    /// Stages 3+4: background mask after small-region filtering.
    pub background: BackgroundMask,
    /// Stage 5: normalized edge strength.
    pub edges: EdgeField,
    /// Stage 6: edge-gated dilated background mask.
    pub expanded: BackgroundMask,
    /// Stage 7: final grayscale rendering (full opacity).
    pub output: RgbaImage,
    /// Source frame dimensions in pixels.
    pub dimensions: Dimensions,
}

/// Errors that can occur during sketch transformation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum PipelineError {
    /// Frame width or height was zero.
    #[error("invalid frame dimensions {width}x{height}")]
    InvalidDimensions {
        /// Reported frame width.
        width: u32,
        /// Reported frame height.
        height: u32,
    },

    /// Frame data length did not match `width * height * 4`.
    #[error("frame buffer length mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch {
        /// Expected byte length.
        expected: usize,
        /// Actual byte length.
        actual: usize,
    },

    /// Frame dimensions exceed what can be allocated.
    #[error("frame of {width}x{height} pixels exceeds addressable memory")]
    ResourceLimit {
        /// Reported frame width.
        width: u32,
        /// Reported frame height.
        height: u32,
    },

    /// The requested style has no defined transform.
    #[error("unsupported transformation style: {0}")]
    UnsupportedStyle(Style),

    /// Parameter record violates a construction invariant.
    #[error("invalid sketch parameters: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- PixelBuffer tests ---

    #[test]
    fn pixel_buffer_round_trips_through_image() {
        let image = RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]));
        let buffer = PixelBuffer::from_image(image.clone());
        assert_eq!(buffer.width, 3);
        assert_eq!(buffer.height, 2);
        assert_eq!(buffer.data.len(), 24);
        let restored = buffer.into_image().unwrap();
        assert_eq!(restored, image);
    }

    #[test]
    fn pixel_buffer_zero_width_rejected() {
        let result = PixelBuffer::new(0, 4, vec![]).into_image();
        assert!(matches!(
            result,
            Err(PipelineError::InvalidDimensions {
                width: 0,
                height: 4,
            }),
        ));
    }

    #[test]
    fn pixel_buffer_zero_height_rejected() {
        let result = PixelBuffer::new(4, 0, vec![]).into_image();
        assert!(matches!(
            result,
            Err(PipelineError::InvalidDimensions {
                width: 4,
                height: 0,
            }),
        ));
    }

    #[test]
    fn pixel_buffer_length_mismatch_rejected() {
        let result = PixelBuffer::new(2, 2, vec![0; 15]).into_image();
        assert!(matches!(
            result,
            Err(PipelineError::BufferSizeMismatch {
                expected: 16,
                actual: 15,
            }),
        ));
    }

    // --- Field tests ---

    #[test]
    fn tone_field_indexing_is_row_major() {
        let values: Vec<f32> = (0..6).map(|i| i as f32).collect();
        let field = ToneField::from_values(3, 2, values).unwrap();
        assert!((field.get(0, 0) - 0.0).abs() < f32::EPSILON);
        assert!((field.get(2, 0) - 2.0).abs() < f32::EPSILON);
        assert!((field.get(0, 1) - 3.0).abs() < f32::EPSILON);
        assert!((field.get(2, 1) - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn tone_field_wrong_length_rejected() {
        assert!(ToneField::from_values(3, 2, vec![0.0; 5]).is_none());
    }

    #[test]
    fn edge_field_wrong_length_rejected() {
        assert!(EdgeField::from_values(3, 2, vec![0.0; 7]).is_none());
    }

    #[test]
    fn background_mask_starts_all_foreground() {
        let mask = BackgroundMask::new(4, 4);
        assert_eq!(mask.background_count(), 0);
    }

    #[test]
    fn background_mask_set_and_count() {
        let mut mask = BackgroundMask::new(4, 4);
        mask.set(1, 2, true);
        mask.set(3, 3, true);
        assert!(mask.get(1, 2));
        assert!(mask.get(3, 3));
        assert!(!mask.get(0, 0));
        assert_eq!(mask.background_count(), 2);
    }

    // --- SketchParams tests ---

    #[test]
    fn default_params_match_shipping_values() {
        let params = SketchParams::default();
        assert!((params.brightness_factor - 1.4).abs() < f32::EPSILON);
        assert!((params.contrast_factor - 1.2).abs() < f32::EPSILON);
        assert!((params.edge_strength - 0.8).abs() < f32::EPSILON);
        assert!((params.edge_threshold - 12.0).abs() < f32::EPSILON);
        assert!((params.shadow_gray - 180.0).abs() < f32::EPSILON);
        assert!((params.mid_gray - 220.0).abs() < f32::EPSILON);
        assert!((params.highlight_threshold - 230.0).abs() < f32::EPSILON);
        assert!((params.background_threshold - 130.0).abs() < f32::EPSILON);
        assert_eq!(params.edge_radius, 3);
        assert!((params.background_edge_threshold - 0.08).abs() < f32::EPSILON);
        assert!((params.noise_threshold - 10.0).abs() < f32::EPSILON);
        assert_eq!(params.expand_background, 2);
        assert_eq!(params.min_connected_pixels, 100);
    }

    #[test]
    fn default_params_are_valid() {
        assert!(SketchParams::default().validate().is_ok());
    }

    #[test]
    fn zero_edge_threshold_rejected() {
        let params = SketchParams {
            edge_threshold: 0.0,
            ..SketchParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(PipelineError::InvalidConfig(_)),
        ));
    }

    #[test]
    fn highlight_threshold_at_180_rejected() {
        // 180 is the fixed mid-zone boundary; the interpolation
        // divisor (highlight_threshold - 180) must stay non-zero.
        let params = SketchParams {
            highlight_threshold: 180.0,
            ..SketchParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(PipelineError::InvalidConfig(_)),
        ));
    }

    #[test]
    fn non_finite_param_rejected() {
        let params = SketchParams {
            contrast_factor: f32::NAN,
            ..SketchParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(PipelineError::InvalidConfig(_)),
        ));
    }

    #[test]
    fn negative_edge_strength_rejected() {
        let params = SketchParams {
            edge_strength: -0.1,
            ..SketchParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(PipelineError::InvalidConfig(_)),
        ));
    }

    #[test]
    fn params_serde_round_trip() {
        let params = SketchParams {
            edge_radius: 2,
            min_connected_pixels: 64,
            ..SketchParams::default()
        };
        let json = serde_json::to_string(&params).unwrap();
        let deserialized: SketchParams = serde_json::from_str(&json).unwrap();
        assert_eq!(params, deserialized);
    }

    // --- Style tests ---

    #[test]
    fn style_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Style::Pencil).unwrap(), "\"pencil\"");
        assert_eq!(
            serde_json::to_string(&Style::OilPainting).unwrap(),
            "\"oilpainting\"",
        );
    }

    #[test]
    fn style_display_matches_config_strings() {
        assert_eq!(Style::Pencil.to_string(), "pencil");
        assert_eq!(Style::Watercolor.to_string(), "watercolor");
        assert_eq!(Style::OilPainting.to_string(), "oilpainting");
    }

    // --- PipelineError tests ---

    #[test]
    fn error_dimension_display() {
        let err = PipelineError::InvalidDimensions {
            width: 0,
            height: 7,
        };
        assert_eq!(err.to_string(), "invalid frame dimensions 0x7");
    }

    #[test]
    fn error_mismatch_display() {
        let err = PipelineError::BufferSizeMismatch {
            expected: 16,
            actual: 12,
        };
        assert_eq!(
            err.to_string(),
            "frame buffer length mismatch: expected 16 bytes, got 12",
        );
    }

    #[test]
    fn error_unsupported_style_display() {
        let err = PipelineError::UnsupportedStyle(Style::Watercolor);
        assert_eq!(err.to_string(), "unsupported transformation style: watercolor");
    }

    #[test]
    fn error_serde_round_trip() {
        let err = PipelineError::UnsupportedStyle(Style::OilPainting);
        let json = serde_json::to_string(&err).unwrap();
        let deserialized: PipelineError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, deserialized);
    }
}
