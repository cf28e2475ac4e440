#![warn(missing_docs)]

//! Parametric edge rounding and beveling for the arris toolkit.
//!
//! Given an edge shared by two faces of a solid (open or closed,
//! straight or curved, with any workable dihedral angle), this crate
//! computes a constant-radius fillet or a planar chamfer and fuses it
//! into the solid through a boolean kernel:
//!
//! 1. sample the edge (tangents, per-face local normals, projections),
//! 2. solve per-section tangent circles (fillet) or offset rails
//!    (chamfer),
//! 3. correct polyline orientation and collapse rail self-crossings,
//! 4. stitch the wedge/prism tool solid and sweep the tube tool,
//! 5. combine everything with escalating-tolerance boolean repair.
//!
//! Failure degrades, it does not abort: every entry point returns an
//! outcome struct carrying whatever diagnostic polylines and partial
//! solids were produced, with `final_solid == None` plus an error when
//! no usable result exists.

pub mod circle;
pub mod combine;
pub mod config;
pub mod crossing;
pub mod edge;
pub mod error;
pub mod orient;
pub mod rail;
pub mod sample;
pub mod tube;
pub mod wedge;

use arris_csg::CsgKernel;
use arris_math::Point3;
use arris_solid::Solid;

pub use circle::{solve_centerline, Centerline};
pub use config::{BlendConfig, SideMode, TubeStrategy};
pub use edge::{BlendEdge, EdgeFaces, FacePair, FaceRef};
pub use error::BlendError;
pub use rail::RailTriple;
pub use tube::{TubeResult, TubeSpec};

/// A fillet request: which edge, how round, and how to work.
#[derive(Debug, Clone)]
pub struct FilletRequest {
    /// The edge to round.
    pub edge: BlendEdge,
    /// Fillet radius.
    pub radius: f64,
    /// Engine configuration.
    pub config: BlendConfig,
}

/// Everything a fillet attempt produced, usable or diagnostic.
#[derive(Debug, Clone, Default)]
pub struct FilletOutcome {
    /// The swept tube tool, when tube construction got that far.
    pub tube: Option<Solid>,
    /// The wedge tool, when triangulation got that far.
    pub wedge: Option<Solid>,
    /// The combined result; `None` means the attempt degraded.
    pub final_solid: Option<Solid>,
    /// Solved arc centers.
    pub centerline: Vec<Point3>,
    /// Tangency curve on face A.
    pub tangent_a: Vec<Point3>,
    /// Tangency curve on face B.
    pub tangent_b: Vec<Point3>,
    /// Reduced-radius recommendation when the request does not fit.
    pub radius_clamp: Option<f64>,
    /// The failure that stopped or degraded the pipeline, if any.
    pub error: Option<BlendError>,
}

/// Compute only the fillet centerline and companion curves.
pub fn fillet_centerline(
    solid: &Solid,
    edge: &BlendEdge,
    radius: f64,
    config: &BlendConfig,
) -> Result<Centerline, BlendError> {
    circle::solve_centerline(solid, edge, radius, config)
}

/// Round an edge of `solid` and return the full outcome.
pub fn fillet_solid(
    solid: &Solid,
    request: &FilletRequest,
    kernel: &dyn CsgKernel,
) -> FilletOutcome {
    let mut outcome = FilletOutcome::default();
    let config = &request.config;

    let centerline =
        match circle::solve_centerline(solid, &request.edge, request.radius, config) {
            Ok(cl) => cl,
            Err(e) => {
                outcome.error = Some(e);
                return outcome;
            }
        };
    outcome.centerline = centerline.points.clone();
    outcome.tangent_a = centerline.tangency_a.clone();
    outcome.tangent_b = centerline.tangency_b.clone();
    outcome.radius_clamp = centerline.radius_clamp;

    let push = solid.bounding_diagonal() * 1e-4;
    let wedge = match wedge::build_fillet_wedge("FILLET", &centerline, request.radius, Some(push))
    {
        Ok(w) => w,
        Err(e) => {
            outcome.error = Some(e);
            return outcome;
        }
    };
    outcome.wedge = Some(wedge.clone());

    let spec = TubeSpec {
        outer_radius: request.radius,
        inner_radius: None,
        segments: config.segments,
        closed: centerline.closed,
        strategy: config.strategy,
    };
    // The wrap duplicate is a polyline convention; the tube closes itself
    let path = if centerline.closed {
        &centerline.points[..centerline.points.len() - 1]
    } else {
        &centerline.points[..]
    };
    let tube = match tube::build_tube(path, &spec, kernel) {
        Ok(t) => t,
        Err(e) => {
            outcome.error = Some(e);
            return outcome;
        }
    };
    outcome.tube = Some(tube.solid.clone());

    // The rounded cut piece: wedge with the tube's bite taken out
    let rounded = combine::subtract_with_repair(&wedge, &tube.solid, kernel, config);
    if let Some(e) = &rounded.error {
        // Degraded: carry on with the unrounded wedge, but say so
        log::warn!("wedge/tube combination degraded: {e}");
        outcome.error = Some(e.clone());
    }

    let combined = match config.side {
        SideMode::Inset => combine::subtract_with_repair(solid, &rounded.solid, kernel, config),
        SideMode::Outset => combine::union_with_repair(solid, &rounded.solid, kernel, config),
    };
    match combined.error {
        None => outcome.final_solid = Some(combined.solid),
        Some(e) => outcome.error = Some(e),
    }
    outcome
}

/// A chamfer request: which edge, how deep, and how to work.
#[derive(Debug, Clone)]
pub struct ChamferRequest {
    /// The edge to bevel.
    pub edge: BlendEdge,
    /// Offset distance along each face.
    pub distance: f64,
    /// Base name for the tool's face families
    /// (`<base>_SIDE_A`, `_SIDE_B`, `_BEVEL`, `_CAP0`, `_CAP1`).
    pub base_name: String,
    /// Engine configuration.
    pub config: BlendConfig,
}

impl ChamferRequest {
    /// Request with the default `CHAMFER` face-family base.
    pub fn new(edge: BlendEdge, distance: f64, config: BlendConfig) -> Self {
        Self {
            edge,
            distance,
            base_name: "CHAMFER".to_string(),
            config,
        }
    }
}

/// Everything a chamfer attempt produced.
#[derive(Debug, Clone, Default)]
pub struct ChamferOutcome {
    /// The bevel prism tool.
    pub tool: Option<Solid>,
    /// The combined result; `None` means the attempt degraded.
    pub final_solid: Option<Solid>,
    /// The (possibly inflated, crossing-collapsed) edge polyline.
    pub edge_points: Vec<Point3>,
    /// Rail along face A.
    pub rail_a: Vec<Point3>,
    /// Rail along face B.
    pub rail_b: Vec<Point3>,
    /// The failure that stopped or degraded the pipeline, if any.
    pub error: Option<BlendError>,
}

/// Build the chamfer prism tool for an edge without combining it.
pub fn build_chamfer_tool(
    solid: &Solid,
    request: &ChamferRequest,
) -> Result<(Solid, RailTriple), BlendError> {
    let config = &request.config;
    let mut triple = rail::solve_rails(solid, &request.edge, request.distance, config)?;

    // Sharp bends can fold an open rail over itself
    if !triple.closed {
        crossing::resolve_crossings(
            [&mut triple.edge_points, &mut triple.rail_a, &mut triple.rail_b],
            1,
        );
        crossing::resolve_crossings(
            [&mut triple.edge_points, &mut triple.rail_a, &mut triple.rail_b],
            2,
        );
    }

    let push = solid.bounding_diagonal() * 1e-4;
    let tool = wedge::build_chamfer_prism(&request.base_name, &triple, request.distance, Some(push))?;
    Ok((tool, triple))
}

/// Bevel an edge of `solid` and return the full outcome.
pub fn chamfer_solid(
    solid: &Solid,
    request: &ChamferRequest,
    kernel: &dyn CsgKernel,
) -> ChamferOutcome {
    let mut outcome = ChamferOutcome::default();
    let config = &request.config;

    let (tool, triple) = match build_chamfer_tool(solid, request) {
        Ok(pair) => pair,
        Err(e) => {
            outcome.error = Some(e);
            return outcome;
        }
    };
    outcome.edge_points = triple.edge_points.clone();
    outcome.rail_a = triple.rail_a.clone();
    outcome.rail_b = triple.rail_b.clone();
    outcome.tool = Some(tool.clone());

    let combined = match config.side {
        SideMode::Inset => combine::subtract_with_repair(solid, &tool, kernel, config),
        SideMode::Outset => combine::union_with_repair(solid, &tool, kernel, config),
    };
    match combined.error {
        None => outcome.final_solid = Some(combined.solid),
        Some(e) => outcome.error = Some(e),
    }
    outcome
}
