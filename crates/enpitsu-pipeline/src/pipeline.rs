//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::process`] which runs the entire pipeline in one
//! call, [`Pipeline`] lets the caller drive execution one step at a
//! time:
//!
//! ```rust
//! # use enpitsu_pipeline::{Pipeline, PixelBuffer, SketchParams, PipelineError};
//! # fn run(frame: PixelBuffer) -> Result<(), PipelineError> {
//! let params = SketchParams::default();
//! let pipeline = Pipeline::new(frame, params)
//!     .validate()?
//!     .extract_tones()
//!     .classify_background()
//!     .filter_regions()
//!     .detect_edges()
//!     .expand_background()
//!     .render();
//!
//! let staged = pipeline.into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline
//! state (or `Result` for the fallible validation stage), carrying all
//! previously computed intermediates. The caller can inspect the
//! current stage's output via accessor methods at any point.
//!
//! # Memory
//!
//! Every stage retains the full intermediate stack (source frame, tone
//! field, masks, edge field) alongside its own product. This is
//! intentional: [`StagedResult`] needs every intermediate for preview
//! and diagnostics. Callers that only need the final frame should
//! prefer [`crate::process`], which lets each intermediate drop as
//! soon as the next stage is done with it.

use crate::diagnostics::StageMetrics;
use crate::regions::RegionFilterStats;
use crate::types::{
    BackgroundMask, Dimensions, EdgeField, PixelBuffer, PipelineError, RgbaImage, SketchParams,
    StagedResult, ToneField,
};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// The source frame and parameters are stored but not yet touched.
/// Call [`validate`](Self::validate) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing — call .validate() to continue"]
pub struct Pending {
    params: SketchParams,
    buffer: PixelBuffer,
}

impl Pending {
    /// The raw source frame.
    #[must_use]
    pub const fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    /// Check the parameters and frame invariants and advance to the
    /// [`Validated`] stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] when the parameters
    /// violate a construction invariant, and
    /// [`PipelineError::InvalidDimensions`] /
    /// [`PipelineError::BufferSizeMismatch`] /
    /// [`PipelineError::ResourceLimit`] when the frame does not match
    /// its declared shape.
    pub fn validate(self) -> Result<Validated, PipelineError> {
        self.params.validate()?;
        let buffer_bytes = self.buffer.data.len();
        let image = self.buffer.into_image()?;
        let dimensions = Dimensions {
            width: image.width(),
            height: image.height(),
        };
        Ok(Validated {
            params: self.params,
            image,
            buffer_bytes,
            dimensions,
        })
    }
}

// ───────────────────────── Stage 1: Validated ────────────────────────

/// Pipeline state after frame validation.
///
/// The raw bytes now live in an [`RgbaImage`] with checked dimensions.
/// Call [`extract_tones`](Self::extract_tones) to advance to the next
/// stage.
#[must_use = "pipeline stages are consumed by advancing — call .extract_tones() to continue"]
pub struct Validated {
    params: SketchParams,
    image: RgbaImage,
    buffer_bytes: usize,
    dimensions: Dimensions,
}

impl Validated {
    /// The validated source frame.
    #[must_use]
    pub const fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Advance to the luminance extraction stage.
    pub fn extract_tones(self) -> TonesExtracted {
        let tones = crate::luminance::extract_tones(&self.image);
        TonesExtracted {
            params: self.params,
            image: self.image,
            tones,
            dimensions: self.dimensions,
        }
    }
}

// ───────────────────────── Stage 2: TonesExtracted ───────────────────

/// Pipeline state after luminance extraction.
///
/// The tone field is computed once here and stays read-only for the
/// rest of the pipeline. Call
/// [`classify_background`](Self::classify_background) to advance.
#[must_use = "pipeline stages are consumed by advancing — call .classify_background() to continue"]
pub struct TonesExtracted {
    params: SketchParams,
    image: RgbaImage,
    tones: ToneField,
    dimensions: Dimensions,
}

impl TonesExtracted {
    /// The per-pixel luminance field.
    #[must_use]
    pub const fn tones(&self) -> &ToneField {
        &self.tones
    }

    /// Advance to the background classification stage.
    pub fn classify_background(self) -> BackgroundClassified {
        let initial =
            crate::background::classify_background(&self.tones, self.params.background_threshold);
        BackgroundClassified {
            params: self.params,
            image: self.image,
            tones: self.tones,
            initial,
            dimensions: self.dimensions,
        }
    }
}

// ───────────────────────── Stage 3: BackgroundClassified ─────────────

/// Pipeline state after the initial background threshold.
///
/// The mask still contains small isolated bright patches; call
/// [`filter_regions`](Self::filter_regions) to remove them.
#[must_use = "pipeline stages are consumed by advancing — call .filter_regions() to continue"]
pub struct BackgroundClassified {
    params: SketchParams,
    image: RgbaImage,
    tones: ToneField,
    initial: BackgroundMask,
    dimensions: Dimensions,
}

impl BackgroundClassified {
    /// The unfiltered background mask.
    #[must_use]
    pub const fn initial_mask(&self) -> &BackgroundMask {
        &self.initial
    }

    /// Advance to the connected-component filtering stage.
    pub fn filter_regions(self) -> RegionsFiltered {
        let mut background = self.initial;
        let stats =
            crate::regions::filter_small_regions(&mut background, self.params.min_connected_pixels);
        RegionsFiltered {
            params: self.params,
            image: self.image,
            tones: self.tones,
            background,
            stats,
            dimensions: self.dimensions,
        }
    }
}

// ───────────────────────── Stage 4: RegionsFiltered ──────────────────

/// Pipeline state after small-region removal.
///
/// Call [`detect_edges`](Self::detect_edges) to advance to the next
/// stage.
#[must_use = "pipeline stages are consumed by advancing — call .detect_edges() to continue"]
pub struct RegionsFiltered {
    params: SketchParams,
    image: RgbaImage,
    tones: ToneField,
    background: BackgroundMask,
    stats: RegionFilterStats,
    dimensions: Dimensions,
}

impl RegionsFiltered {
    /// The filtered background mask.
    #[must_use]
    pub const fn background(&self) -> &BackgroundMask {
        &self.background
    }

    /// Counts from the region filter.
    #[must_use]
    pub const fn stats(&self) -> RegionFilterStats {
        self.stats
    }

    /// Advance to the edge detection stage.
    ///
    /// Edge detection reads only the tone field; it is independent of
    /// the background mask.
    pub fn detect_edges(self) -> EdgesDetected {
        let edges = crate::edge::detect_edges(&self.tones, &self.params);
        EdgesDetected {
            params: self.params,
            image: self.image,
            tones: self.tones,
            background: self.background,
            stats: self.stats,
            edges,
            dimensions: self.dimensions,
        }
    }
}

// ───────────────────────── Stage 5: EdgesDetected ────────────────────

/// Pipeline state after edge detection.
///
/// Call [`expand_background`](Self::expand_background) to advance to
/// the next stage.
#[must_use = "pipeline stages are consumed by advancing — call .expand_background() to continue"]
pub struct EdgesDetected {
    params: SketchParams,
    image: RgbaImage,
    tones: ToneField,
    background: BackgroundMask,
    stats: RegionFilterStats,
    edges: EdgeField,
    dimensions: Dimensions,
}

impl EdgesDetected {
    /// The normalized edge strength field.
    #[must_use]
    pub const fn edges(&self) -> &EdgeField {
        &self.edges
    }

    /// Advance to the background expansion stage.
    pub fn expand_background(self) -> BackgroundExpanded {
        let expanded = crate::expand::expand_background(
            &self.background,
            &self.edges,
            self.params.expand_background,
            self.params.background_edge_threshold,
        );
        BackgroundExpanded {
            params: self.params,
            image: self.image,
            tones: self.tones,
            background: self.background,
            stats: self.stats,
            edges: self.edges,
            expanded,
            dimensions: self.dimensions,
        }
    }
}

// ───────────────────────── Stage 6: BackgroundExpanded ───────────────

/// Pipeline state after edge-gated background dilation.
///
/// Call [`render`](Self::render) to advance to the final stage.
#[must_use = "pipeline stages are consumed by advancing — call .render() to continue"]
pub struct BackgroundExpanded {
    params: SketchParams,
    image: RgbaImage,
    tones: ToneField,
    background: BackgroundMask,
    stats: RegionFilterStats,
    edges: EdgeField,
    expanded: BackgroundMask,
    dimensions: Dimensions,
}

impl BackgroundExpanded {
    /// The expanded background mask.
    #[must_use]
    pub const fn expanded(&self) -> &BackgroundMask {
        &self.expanded
    }

    /// Advance to the tone mapping stage — the final pipeline step.
    pub fn render(self) -> Rendered {
        let output =
            crate::tonemap::render(&self.tones, &self.edges, &self.expanded, &self.params);
        Rendered {
            image: self.image,
            tones: self.tones,
            background: self.background,
            stats: self.stats,
            edges: self.edges,
            expanded: self.expanded,
            output,
            dimensions: self.dimensions,
        }
    }
}

// ───────────────────────── Stage 7: Rendered ─────────────────────────

/// Pipeline state after tone mapping — the final stage.
///
/// Call [`into_result`](Self::into_result) to extract the
/// [`StagedResult`] containing all intermediates.
#[must_use = "call .into_result() to extract the StagedResult"]
pub struct Rendered {
    image: RgbaImage,
    tones: ToneField,
    background: BackgroundMask,
    stats: RegionFilterStats,
    edges: EdgeField,
    expanded: BackgroundMask,
    output: RgbaImage,
    dimensions: Dimensions,
}

impl Rendered {
    /// The final grayscale output frame.
    #[must_use]
    pub const fn output(&self) -> &RgbaImage {
        &self.output
    }

    /// Frame dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Consume the pipeline and return the full [`StagedResult`].
    #[must_use]
    pub fn into_result(self) -> StagedResult {
        StagedResult {
            original: self.image,
            tones: self.tones,
            background: self.background,
            edges: self.edges,
            expanded: self.expanded,
            output: self.output,
            dimensions: self.dimensions,
        }
    }
}

// ──────────────────── PipelineStage trait + Stage enum ────────────────

/// Total number of stages in the pipeline.
pub const STAGE_COUNT: usize = 8;

/// The output produced by a single pipeline stage.
///
/// Each variant borrows the data that the corresponding stage computed.
/// Use this with [`PipelineStage::output`] or [`Stage::output`] to
/// inspect intermediates in a uniform, type-erased way.
#[must_use]
pub enum StageOutput<'a> {
    /// Source frame (not yet validated).
    Source {
        /// The raw frame.
        buffer: &'a PixelBuffer,
    },
    /// Validated source frame.
    Validated {
        /// The checked RGBA image.
        image: &'a RgbaImage,
    },
    /// Luminance extraction result.
    TonesExtracted {
        /// The per-pixel luminance field.
        tones: &'a ToneField,
    },
    /// Initial background classification result.
    BackgroundClassified {
        /// The unfiltered background mask.
        mask: &'a BackgroundMask,
    },
    /// Connected-component filtering result.
    RegionsFiltered {
        /// The filtered background mask.
        mask: &'a BackgroundMask,
    },
    /// Edge detection result.
    EdgesDetected {
        /// The normalized edge strength field.
        edges: &'a EdgeField,
    },
    /// Background expansion result.
    BackgroundExpanded {
        /// The dilated background mask.
        mask: &'a BackgroundMask,
    },
    /// Tone mapping result.
    Rendered {
        /// The final grayscale frame.
        output: &'a RgbaImage,
        /// Frame dimensions.
        dimensions: Dimensions,
    },
}

/// Trait implemented by every pipeline stage, enabling uniform iteration.
///
/// Both the typed API (individual stage structs) and the dynamic API
/// ([`Stage`] enum) are available. This trait bridges the two: each
/// stage struct implements it, and [`Stage`] delegates to whichever
/// variant it holds.
///
/// # Loop pattern
///
/// ```rust
/// # use enpitsu_pipeline::{Pipeline, PixelBuffer, SketchParams, PipelineError};
/// # use enpitsu_pipeline::pipeline::{Stage, PipelineStage, Advance};
/// # fn run(frame: PixelBuffer) -> Result<(), PipelineError> {
/// let mut stage: Stage = Pipeline::new(frame, SketchParams::default()).into();
/// loop {
///     match stage.advance()? {
///         Advance::Next(next) => stage = next,
///         Advance::Complete(done) => { stage = done; break; }
///     }
/// }
/// let result = stage.complete()?;
/// # Ok(())
/// # }
/// ```
pub trait PipelineStage: Sized {
    /// Human-readable name of this stage (e.g. `"source"`, `"edges"`).
    const NAME: &str;

    /// Zero-based index of this stage (`0` for Pending through `7` for
    /// Rendered).
    const INDEX: usize;

    /// The output this stage produced.
    fn output(&self) -> StageOutput<'_>;

    /// Stage-specific metrics for diagnostics.
    ///
    /// Returns `None` for the initial [`Pending`] stage which has not
    /// yet performed any processing. All other stages return
    /// `Some(metrics)` describing the work done to reach this state.
    fn metrics(&self) -> Option<StageMetrics>;

    /// Advance to the next stage.
    ///
    /// Returns `Ok(Some(stage))` on success, `Ok(None)` if already at
    /// the final stage, or `Err` if the stage transition fails.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] when frame or parameter validation
    /// fails. All stages past [`Validated`] are infallible.
    fn next(self) -> Result<Option<Stage>, PipelineError>;

    /// Run all remaining stages to completion and return the final
    /// [`StagedResult`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if any remaining fallible stage fails.
    fn complete(self) -> Result<StagedResult, PipelineError>;
}

impl PipelineStage for Pending {
    const NAME: &str = "source";
    const INDEX: usize = 0;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Source {
            buffer: &self.buffer,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        None
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Validated(self.validate()?)))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.validate()?.complete()
    }
}

impl PipelineStage for Validated {
    const NAME: &str = "validate";
    const INDEX: usize = 1;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Validated { image: &self.image }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::Validate {
            buffer_bytes: self.buffer_bytes,
            width: self.dimensions.width,
            height: self.dimensions.height,
            pixel_count: self.dimensions.pixel_count(),
        })
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::TonesExtracted(self.extract_tones())))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.extract_tones().complete()
    }
}

impl PipelineStage for TonesExtracted {
    const NAME: &str = "luminance";
    const INDEX: usize = 2;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::TonesExtracted { tones: &self.tones }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::Luminance {
            width: self.tones.width(),
            height: self.tones.height(),
        })
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::BackgroundClassified(self.classify_background())))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.classify_background().complete()
    }
}

impl PipelineStage for BackgroundClassified {
    const NAME: &str = "background";
    const INDEX: usize = 3;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::BackgroundClassified {
            mask: &self.initial,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::Background {
            threshold: self.params.background_threshold,
            background_pixel_count: self.initial.background_count(),
            total_pixel_count: self.dimensions.pixel_count(),
        })
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::RegionsFiltered(self.filter_regions())))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.filter_regions().complete()
    }
}

impl PipelineStage for RegionsFiltered {
    const NAME: &str = "regions";
    const INDEX: usize = 4;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::RegionsFiltered {
            mask: &self.background,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::Regions {
            min_connected_pixels: self.params.min_connected_pixels,
            region_count: self.stats.region_count,
            discarded_region_count: self.stats.discarded_region_count,
            discarded_pixel_count: self.stats.discarded_pixel_count,
            background_pixel_count: self.background.background_count(),
        })
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::EdgesDetected(self.detect_edges())))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.detect_edges().complete()
    }
}

impl PipelineStage for EdgesDetected {
    const NAME: &str = "edges";
    const INDEX: usize = 5;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::EdgesDetected { edges: &self.edges }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::EdgeDetection {
            radius: self.params.edge_radius,
            noise_threshold: self.params.noise_threshold,
            edge_threshold: self.params.edge_threshold,
            edge_pixel_count: crate::diagnostics::count_edge_pixels(&self.edges),
            max_strength: crate::diagnostics::max_edge_strength(&self.edges),
        })
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::BackgroundExpanded(self.expand_background())))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.expand_background().complete()
    }
}

impl PipelineStage for BackgroundExpanded {
    const NAME: &str = "expand";
    const INDEX: usize = 6;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::BackgroundExpanded {
            mask: &self.expanded,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::Expansion {
            iterations: self.params.expand_background,
            edge_threshold: self.params.background_edge_threshold,
            // Expansion only ever adds pixels.
            pixels_added: self
                .expanded
                .background_count()
                .saturating_sub(self.background.background_count()),
        })
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Rendered(self.render())))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        Ok(self.render().into_result())
    }
}

impl PipelineStage for Rendered {
    const NAME: &str = "tonemap";
    const INDEX: usize = 7;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Rendered {
            output: &self.output,
            dimensions: self.dimensions,
        }
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::ToneMap {
            white_pixel_count: crate::diagnostics::count_white_pixels(&self.output),
            total_pixel_count: self.dimensions.pixel_count(),
        })
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(None)
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        Ok(self.into_result())
    }
}

/// Enum wrapping all pipeline stages for uniform, loopable access.
///
/// Use [`From`] conversions to enter the dynamic API from any typed
/// stage, then call [`advance`](Self::advance) in a loop.
#[must_use]
pub enum Stage {
    /// See [`Pending`].
    Pending(Pending),
    /// See [`Validated`].
    Validated(Validated),
    /// See [`TonesExtracted`].
    TonesExtracted(TonesExtracted),
    /// See [`BackgroundClassified`].
    BackgroundClassified(BackgroundClassified),
    /// See [`RegionsFiltered`].
    RegionsFiltered(RegionsFiltered),
    /// See [`EdgesDetected`].
    EdgesDetected(EdgesDetected),
    /// See [`BackgroundExpanded`].
    BackgroundExpanded(BackgroundExpanded),
    /// See [`Rendered`].
    Rendered(Rendered),
}

/// Compile-time guard: if a [`Stage`] variant is added, this match becomes
/// non-exhaustive and the build fails — reminding you to bump [`STAGE_COUNT`].
#[allow(dead_code, clippy::match_same_arms)]
const fn _stage_count_guard(s: &Stage) {
    match s {
        Stage::Pending(_)
        | Stage::Validated(_)
        | Stage::TonesExtracted(_)
        | Stage::BackgroundClassified(_)
        | Stage::RegionsFiltered(_)
        | Stage::EdgesDetected(_)
        | Stage::BackgroundExpanded(_)
        | Stage::Rendered(_) => {}
    }
}

/// Result of [`Stage::advance`]: either the next stage or the
/// completed final stage returned unchanged.
#[must_use]
pub enum Advance {
    /// The pipeline advanced to this next stage.
    Next(Stage),
    /// The pipeline was already at the final stage — returned unchanged.
    Complete(Stage),
}

/// Delegate a method call to whichever `Stage` variant is active.
macro_rules! delegate {
    ($self:ident, $method:ident $(, $arg:expr)*) => {
        match $self {
            Self::Pending(s) => s.$method($($arg),*),
            Self::Validated(s) => s.$method($($arg),*),
            Self::TonesExtracted(s) => s.$method($($arg),*),
            Self::BackgroundClassified(s) => s.$method($($arg),*),
            Self::RegionsFiltered(s) => s.$method($($arg),*),
            Self::EdgesDetected(s) => s.$method($($arg),*),
            Self::BackgroundExpanded(s) => s.$method($($arg),*),
            Self::Rendered(s) => s.$method($($arg),*),
        }
    };
}

impl Stage {
    /// Human-readable name of the current stage.
    #[must_use]
    pub fn name(&self) -> &'static str {
        delegate!(self, name)
    }

    /// Zero-based index of the current stage.
    #[must_use]
    pub fn index(&self) -> usize {
        delegate!(self, index)
    }

    /// The output this stage produced.
    pub fn output(&self) -> StageOutput<'_> {
        // Trait-qualified so `Rendered`'s inherent `output` doesn't shadow
        // the `PipelineStage` method inside the delegation match.
        match self {
            Self::Pending(s) => PipelineStage::output(s),
            Self::Validated(s) => PipelineStage::output(s),
            Self::TonesExtracted(s) => PipelineStage::output(s),
            Self::BackgroundClassified(s) => PipelineStage::output(s),
            Self::RegionsFiltered(s) => PipelineStage::output(s),
            Self::EdgesDetected(s) => PipelineStage::output(s),
            Self::BackgroundExpanded(s) => PipelineStage::output(s),
            Self::Rendered(s) => PipelineStage::output(s),
        }
    }

    /// Stage-specific metrics for diagnostics.
    ///
    /// Returns `None` for the initial `Pending` stage.
    #[must_use]
    pub fn metrics(&self) -> Option<StageMetrics> {
        delegate!(self, metrics)
    }

    /// Whether the pipeline is at the final stage.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Rendered(_))
    }

    /// Advance to the next stage.
    ///
    /// Returns `Ok(Some(next_stage))` on success, `Ok(None)` if
    /// already complete (the `Rendered` value is consumed), or `Err`
    /// if the transition fails.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if a fallible stage transition fails.
    pub fn next(self) -> Result<Option<Self>, PipelineError> {
        delegate!(self, next)
    }

    /// Advance to the next stage, returning `self` unchanged if
    /// already complete.
    ///
    /// This is the loop-friendly version of [`next`](Self::next).
    /// Unlike `next()`, which consumes the final stage and returns
    /// `Ok(None)`, `advance()` returns [`Advance::Complete`] with
    /// the final stage so you can still call
    /// [`complete`](Self::complete) on it.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if a fallible stage transition fails.
    pub fn advance(self) -> Result<Advance, PipelineError> {
        if self.is_complete() {
            return Ok(Advance::Complete(self));
        }
        // Non-complete stages always return Ok(Some(_)) from next().
        // The is_complete() guard above ensures we never reach None here.
        #[allow(clippy::unreachable)]
        let next = self
            .next()?
            .unwrap_or_else(|| unreachable!("non-complete stage returned None from next()"));
        Ok(Advance::Next(next))
    }

    /// Run all remaining stages to completion.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if any remaining fallible stage fails.
    pub fn complete(self) -> Result<StagedResult, PipelineError> {
        delegate!(self, complete)
    }
}

// Provide a private helper trait so the macro can call `.name()` and
// `.index()` on `&self` — the `PipelineStage` trait's associated
// constants aren't callable via `self.NAME`.
trait StageMetadata {
    fn name(&self) -> &'static str;
    fn index(&self) -> usize;
}

impl<T: PipelineStage> StageMetadata for T {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn index(&self) -> usize {
        T::INDEX
    }
}

impl From<Pending> for Stage {
    fn from(s: Pending) -> Self {
        Self::Pending(s)
    }
}

impl From<Validated> for Stage {
    fn from(s: Validated) -> Self {
        Self::Validated(s)
    }
}

impl From<TonesExtracted> for Stage {
    fn from(s: TonesExtracted) -> Self {
        Self::TonesExtracted(s)
    }
}

impl From<BackgroundClassified> for Stage {
    fn from(s: BackgroundClassified) -> Self {
        Self::BackgroundClassified(s)
    }
}

impl From<RegionsFiltered> for Stage {
    fn from(s: RegionsFiltered) -> Self {
        Self::RegionsFiltered(s)
    }
}

impl From<EdgesDetected> for Stage {
    fn from(s: EdgesDetected) -> Self {
        Self::EdgesDetected(s)
    }
}

impl From<BackgroundExpanded> for Stage {
    fn from(s: BackgroundExpanded) -> Self {
        Self::BackgroundExpanded(s)
    }
}

impl From<Rendered> for Stage {
    fn from(s: Rendered) -> Self {
        Self::Rendered(s)
    }
}

// ───────────────────── Pipeline entry point ──────────────────────────

/// Incremental sketch transformation pipeline.
///
/// Created via [`Pipeline::new`], which stores the source frame and
/// parameters without doing any processing. The caller then chains
/// stage methods to advance through the pipeline:
///
/// ```rust
/// # use enpitsu_pipeline::{Pipeline, PixelBuffer, SketchParams, PipelineError};
/// # fn run(frame: PixelBuffer) -> Result<(), PipelineError> {
/// let result = Pipeline::new(frame, SketchParams::default())
///     .validate()?
///     .extract_tones()
///     .classify_background()
///     .filter_regions()
///     .detect_edges()
///     .expand_background()
///     .render()
///     .into_result();
/// # Ok(())
/// # }
/// ```
///
/// Each stage method consumes the current state and returns the next,
/// making it a compile-time error to skip stages or call them out of
/// order.
pub struct Pipeline;

impl Pipeline {
    /// Create a new pipeline from a source frame and parameters.
    ///
    /// No processing is performed — the frame and parameters are
    /// simply stored. Call [`.validate()`](Pending::validate) (or
    /// convert to a [`Stage`] and loop) to begin processing.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(buffer: PixelBuffer, params: SketchParams) -> Pending {
        Pending { params, buffer }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Frame with a black left half and white right half — a sharp
    /// vertical boundary the edge detector will pick up.
    fn sharp_edge_frame(width: u32, height: u32) -> PixelBuffer {
        let image = RgbaImage::from_fn(width, height, |x, _y| {
            if x < width / 2 {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        });
        PixelBuffer::from_image(image)
    }

    /// Uniform white frame.
    fn white_frame(width: u32, height: u32) -> PixelBuffer {
        PixelBuffer::from_image(RgbaImage::from_pixel(
            width,
            height,
            image::Rgba([255, 255, 255, 255]),
        ))
    }

    // ─────────── Typed API tests ─────────────────────────────────

    #[test]
    fn pending_exposes_buffer() {
        let frame = sharp_edge_frame(16, 16);
        let pending = Pipeline::new(frame, SketchParams::default());
        assert_eq!(pending.buffer().width, 16);
        assert_eq!(pending.buffer().data.len(), 16 * 16 * 4);
    }

    #[test]
    fn validate_rejects_mismatched_buffer() {
        let buffer = PixelBuffer::new(4, 4, vec![0; 60]);
        let result = Pipeline::new(buffer, SketchParams::default()).validate();
        assert!(matches!(
            result,
            Err(PipelineError::BufferSizeMismatch { .. }),
        ));
    }

    #[test]
    fn validate_rejects_zero_dimensions() {
        let buffer = PixelBuffer::new(0, 4, vec![]);
        let result = Pipeline::new(buffer, SketchParams::default()).validate();
        assert!(matches!(
            result,
            Err(PipelineError::InvalidDimensions { .. }),
        ));
    }

    #[test]
    fn validate_rejects_bad_params() {
        let params = SketchParams {
            edge_threshold: -1.0,
            ..SketchParams::default()
        };
        let result = Pipeline::new(sharp_edge_frame(8, 8), params).validate();
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn validated_exposes_image() {
        let validated = Pipeline::new(sharp_edge_frame(16, 16), SketchParams::default())
            .validate()
            .unwrap();
        assert_eq!(validated.image().dimensions(), (16, 16));
    }

    #[test]
    fn tones_extracted_exposes_tones() {
        let stage = Pipeline::new(sharp_edge_frame(16, 16), SketchParams::default())
            .validate()
            .unwrap()
            .extract_tones();
        assert_eq!(stage.tones().width(), 16);
        assert!((stage.tones().get(0, 0) - 0.0).abs() < f32::EPSILON);
        assert!((stage.tones().get(15, 0) - 255.0).abs() < 0.01);
    }

    #[test]
    fn background_classified_exposes_initial_mask() {
        let stage = Pipeline::new(sharp_edge_frame(16, 16), SketchParams::default())
            .validate()
            .unwrap()
            .extract_tones()
            .classify_background();
        // The white half is initially background.
        assert_eq!(stage.initial_mask().background_count(), 8 * 16);
    }

    #[test]
    fn regions_filtered_drops_small_regions() {
        // On a 16x16 frame the white half is 128 pixels — above the
        // default 100 minimum, so it survives.
        let stage = Pipeline::new(sharp_edge_frame(16, 16), SketchParams::default())
            .validate()
            .unwrap()
            .extract_tones()
            .classify_background()
            .filter_regions();
        assert_eq!(stage.background().background_count(), 128);
        assert_eq!(stage.stats().region_count, 1);
        assert_eq!(stage.stats().discarded_region_count, 0);
    }

    #[test]
    fn regions_filtered_clears_small_bright_patch() {
        // Dark frame with a 3x3 bright patch: 9 pixels < 100 minimum.
        let mut image = RgbaImage::from_pixel(16, 16, image::Rgba([0, 0, 0, 255]));
        for y in 6..9 {
            for x in 6..9 {
                image.put_pixel(x, y, image::Rgba([255, 255, 255, 255]));
            }
        }
        let stage = Pipeline::new(PixelBuffer::from_image(image), SketchParams::default())
            .validate()
            .unwrap()
            .extract_tones()
            .classify_background()
            .filter_regions();
        assert_eq!(stage.background().background_count(), 0);
        assert_eq!(stage.stats().discarded_region_count, 1);
        assert_eq!(stage.stats().discarded_pixel_count, 9);
    }

    #[test]
    fn edges_detected_exposes_edges() {
        let stage = Pipeline::new(sharp_edge_frame(16, 16), SketchParams::default())
            .validate()
            .unwrap()
            .extract_tones()
            .classify_background()
            .filter_regions()
            .detect_edges();
        assert!(stage.edges().get(7, 8) > 0.2);
        assert!(stage.edges().get(0, 0).abs() < f32::EPSILON);
    }

    #[test]
    fn background_expanded_exposes_expanded_mask() {
        let stage = Pipeline::new(sharp_edge_frame(16, 16), SketchParams::default())
            .validate()
            .unwrap()
            .extract_tones()
            .classify_background()
            .filter_regions()
            .detect_edges()
            .expand_background();
        // Expansion never removes pixels.
        assert!(stage.expanded().background_count() >= 128);
    }

    #[test]
    fn rendered_exposes_output_and_dimensions() {
        let rendered = Pipeline::new(sharp_edge_frame(16, 16), SketchParams::default())
            .validate()
            .unwrap()
            .extract_tones()
            .classify_background()
            .filter_regions()
            .detect_edges()
            .expand_background()
            .render();
        assert_eq!(rendered.output().dimensions(), (16, 16));
        assert_eq!(
            rendered.dimensions(),
            Dimensions {
                width: 16,
                height: 16,
            },
        );
    }

    #[test]
    fn into_result_carries_all_intermediates() {
        let result = Pipeline::new(sharp_edge_frame(16, 16), SketchParams::default())
            .validate()
            .unwrap()
            .extract_tones()
            .classify_background()
            .filter_regions()
            .detect_edges()
            .expand_background()
            .render()
            .into_result();
        assert_eq!(result.original.dimensions(), (16, 16));
        assert_eq!(result.tones.width(), 16);
        assert_eq!(result.background.width(), 16);
        assert_eq!(result.edges.width(), 16);
        assert_eq!(result.expanded.width(), 16);
        assert_eq!(result.output.dimensions(), (16, 16));
    }

    // ─────────── Helper: drive a Stage to completion ────────────

    /// Advance a [`Stage`] to completion, returning the final stage
    /// and a log of `(index, name)` pairs visited along the way.
    fn drive_to_end(start: Stage) -> Result<(Stage, Vec<(usize, &'static str)>), PipelineError> {
        let mut log = vec![(start.index(), start.name())];
        let mut stage = start;
        loop {
            match stage.advance()? {
                Advance::Next(next) => {
                    log.push((next.index(), next.name()));
                    stage = next;
                }
                Advance::Complete(done) => return Ok((done, log)),
            }
        }
    }

    // ─────────── PipelineStage trait + Stage enum tests ───────────

    #[test]
    fn stage_names_and_indices() {
        let start: Stage = Pipeline::new(sharp_edge_frame(16, 16), SketchParams::default()).into();
        let (_, log) = drive_to_end(start).unwrap();
        let expected = [
            (0, "source"),
            (1, "validate"),
            (2, "luminance"),
            (3, "background"),
            (4, "regions"),
            (5, "edges"),
            (6, "expand"),
            (7, "tonemap"),
        ];
        assert_eq!(log.as_slice(), &expected);
    }

    #[test]
    fn loop_to_completion_matches_chained_api() {
        let frame = sharp_edge_frame(16, 16);
        let params = SketchParams::default();

        let chained = Pipeline::new(frame.clone(), params.clone())
            .validate()
            .unwrap()
            .extract_tones()
            .classify_background()
            .filter_regions()
            .detect_edges()
            .expand_background()
            .render()
            .into_result();

        let start: Stage = Pipeline::new(frame, params).into();
        let (final_stage, _) = drive_to_end(start).unwrap();
        let looped = final_stage.complete().unwrap();

        assert_eq!(chained.original, looped.original);
        assert_eq!(chained.tones, looped.tones);
        assert_eq!(chained.background, looped.background);
        assert_eq!(chained.edges, looped.edges);
        assert_eq!(chained.expanded, looped.expanded);
        assert_eq!(chained.output, looped.output);
        assert_eq!(chained.dimensions, looped.dimensions);
    }

    #[test]
    fn complete_from_pending() {
        let pending = Pipeline::new(white_frame(16, 16), SketchParams::default());
        let result = pending.complete().unwrap();
        assert_eq!(result.output.dimensions(), (16, 16));
    }

    #[test]
    fn complete_from_mid_stage() {
        let stage = Pipeline::new(sharp_edge_frame(16, 16), SketchParams::default())
            .validate()
            .unwrap()
            .extract_tones()
            .classify_background();
        let result = stage.complete().unwrap();
        assert_eq!(result.output.dimensions(), (16, 16));
    }

    #[test]
    fn complete_from_rendered_is_into_result() {
        let rendered = Pipeline::new(sharp_edge_frame(16, 16), SketchParams::default())
            .validate()
            .unwrap()
            .extract_tones()
            .classify_background()
            .filter_regions()
            .detect_edges()
            .expand_background()
            .render();
        let result = rendered.complete().unwrap();
        assert_eq!(result.output.dimensions(), (16, 16));
    }

    #[test]
    fn next_on_rendered_returns_none() {
        let rendered = Pipeline::new(sharp_edge_frame(16, 16), SketchParams::default())
            .validate()
            .unwrap()
            .extract_tones()
            .classify_background()
            .filter_regions()
            .detect_edges()
            .expand_background()
            .render();
        assert!(rendered.next().unwrap().is_none());
    }

    #[test]
    fn stage_is_complete() {
        let start: Stage = Pipeline::new(sharp_edge_frame(16, 16), SketchParams::default()).into();
        assert!(!start.is_complete());

        let (final_stage, _) = drive_to_end(start).unwrap();
        assert!(final_stage.is_complete());
    }

    #[test]
    fn output_variant_matches_stage() {
        let start: Stage = Pipeline::new(sharp_edge_frame(16, 16), SketchParams::default()).into();

        let mut stage = start;
        let mut visited = 0;
        loop {
            let idx = stage.index();
            let variant_idx = match stage.output() {
                StageOutput::Source { .. } => 0,
                StageOutput::Validated { .. } => 1,
                StageOutput::TonesExtracted { .. } => 2,
                StageOutput::BackgroundClassified { .. } => 3,
                StageOutput::RegionsFiltered { .. } => 4,
                StageOutput::EdgesDetected { .. } => 5,
                StageOutput::BackgroundExpanded { .. } => 6,
                StageOutput::Rendered { .. } => 7,
            };
            assert_eq!(idx, variant_idx, "output variant mismatch at index {idx}");
            visited += 1;
            match stage.advance().unwrap() {
                Advance::Next(next) => stage = next,
                Advance::Complete(_) => break,
            }
        }
        assert_eq!(visited, STAGE_COUNT);
    }

    #[test]
    fn metrics_are_none_only_for_pending() {
        let start: Stage = Pipeline::new(sharp_edge_frame(16, 16), SketchParams::default()).into();
        assert!(start.metrics().is_none());

        let mut stage = start;
        loop {
            match stage.advance().unwrap() {
                Advance::Next(next) => {
                    assert!(
                        next.metrics().is_some(),
                        "stage {} should have metrics",
                        next.name(),
                    );
                    stage = next;
                }
                Advance::Complete(_) => break,
            }
        }
    }

    #[test]
    fn from_conversions_preserve_index() {
        let frame = sharp_edge_frame(16, 16);
        let pending = Pipeline::new(frame.clone(), SketchParams::default());
        let stage: Stage = pending.into();
        assert_eq!(stage.index(), 0);

        let validated = Pipeline::new(frame.clone(), SketchParams::default())
            .validate()
            .unwrap();
        let stage: Stage = validated.into();
        assert_eq!(stage.index(), 1);

        let tones = Pipeline::new(frame.clone(), SketchParams::default())
            .validate()
            .unwrap()
            .extract_tones();
        let stage: Stage = tones.into();
        assert_eq!(stage.index(), 2);

        let classified = Pipeline::new(frame, SketchParams::default())
            .validate()
            .unwrap()
            .extract_tones()
            .classify_background();
        let stage: Stage = classified.into();
        assert_eq!(stage.index(), 3);
    }

    #[test]
    fn stage_complete_from_enum() {
        let stage: Stage = Pipeline::new(white_frame(16, 16), SketchParams::default()).into();
        let result = stage.complete().unwrap();
        assert_eq!(result.output.dimensions(), (16, 16));
    }

    #[test]
    fn loop_with_progress_tracking() {
        let start: Stage = Pipeline::new(sharp_edge_frame(16, 16), SketchParams::default()).into();
        let (_, log) = drive_to_end(start).unwrap();
        let indices: Vec<usize> = log.iter().map(|(idx, _)| *idx).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn pending_validation_error_via_advance() {
        let stage: Stage =
            Pipeline::new(PixelBuffer::new(2, 2, vec![0; 3]), SketchParams::default()).into();
        let result = stage.advance();
        assert!(matches!(
            result,
            Err(PipelineError::BufferSizeMismatch { .. }),
        ));
    }
}
