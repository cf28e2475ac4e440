//! Error kinds reported by the blend engine.
//!
//! Per-sample failures are absorbed (the sample is dropped); per-stage
//! failures degrade to a fallback when one exists. These variants reach
//! the caller only when a stage has no usable fallback, and even then
//! they ride on the outcome struct next to whatever diagnostic geometry
//! was produced.

use thiserror::Error;

/// Errors from the fillet/chamfer pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlendError {
    /// The edge's sample points show no variation.
    #[error("centerline is degenerate: no variation among sample points")]
    DegenerateCenterline,

    /// Fewer than two cross-sections survived sampling and solving.
    #[error("insufficient samples: {usable} usable cross-sections")]
    InsufficientSamples {
        /// How many cross-sections survived.
        usable: usize,
    },

    /// Faces were parallel or anti-parallel at every sample.
    #[error("angle unsolvable: faces parallel or anti-parallel at every sample")]
    AngleUnsolvable,

    /// The tube builder produced no usable tool solid.
    #[error("tube generation failed: {0}")]
    TubeGenerationFailure(String),

    /// The wedge/prism builder emitted zero valid triangles.
    #[error("wedge triangulation produced no valid triangles ({rejected} rejected)")]
    WedgeTriangulationFailure {
        /// Degenerate triangles that were filtered out.
        rejected: usize,
    },

    /// Boolean combination failed after exhausting every repair retry.
    #[error("boolean combination failed after {attempts} attempts: {reason}")]
    BooleanCombinationFailure {
        /// Repair attempts made.
        attempts: u32,
        /// Backend failure description.
        reason: String,
    },

    /// Soft failure: the requested radius does not fit the adjacent
    /// faces; `allowed` is the largest radius that does.
    #[error("radius {requested} exceeds face extent; maximum usable radius is {allowed}")]
    RadiusExceedsFaceExtent {
        /// The radius the caller asked for.
        requested: f64,
        /// The largest radius that stays within face bounds.
        allowed: f64,
    },
}
