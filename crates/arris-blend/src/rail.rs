//! Offset-rail solving for chamfer bevels.
//!
//! Unlike the tangent-circle solver, rails use one *fixed* sign per
//! face, chosen once at a representative mid-edge sample: chamfer rails
//! must stay planar-offset along their faces, so a per-sample best-fit
//! would let the bevel wander.

use arris_math::{try_normalize, Point3, Tolerance, Vec3};
use arris_solid::Solid;

use crate::config::{BlendConfig, SideMode};
use crate::edge::BlendEdge;
use crate::error::BlendError;
use crate::orient;
use crate::sample::{sample_edge, CrossSection};

/// Edge polyline with its two companion rails, index-locked.
///
/// Closed loops duplicate the first point at the end of every array.
#[derive(Debug, Clone)]
pub struct RailTriple {
    /// The (optionally inflated) edge samples.
    pub edge_points: Vec<Point3>,
    /// Rail offset along face A.
    pub rail_a: Vec<Point3>,
    /// Rail offset along face B.
    pub rail_b: Vec<Point3>,
    /// Whether the rails close into loops.
    pub closed: bool,
}

/// Solve both rails for an edge at the requested offset distance.
pub fn solve_rails(
    solid: &Solid,
    edge: &BlendEdge,
    distance: f64,
    config: &BlendConfig,
) -> Result<RailTriple, BlendError> {
    let tol = Tolerance::derive(solid.bounding_diagonal(), distance);
    let sections = sample_edge(solid, edge, &tol)?;

    // One global sign per face, picked at a representative sample.
    // Anti-parallel faces leave no bisector to test against
    let representative = &sections[sections.len() / 2];
    let sign_a =
        rail_sign(representative, Rail::A, config.side).ok_or(BlendError::AngleUnsolvable)?;
    let sign_b =
        rail_sign(representative, Rail::B, config.side).ok_or(BlendError::AngleUnsolvable)?;

    let inflate = config.inflate * distance;
    let mut edge_points = Vec::with_capacity(sections.len());
    let mut rail_a = Vec::with_capacity(sections.len());
    let mut rail_b = Vec::with_capacity(sections.len());

    for section in &sections {
        let Some(dir_a) = rail_direction(section, Rail::A) else {
            continue;
        };
        let Some(dir_b) = rail_direction(section, Rail::B) else {
            continue;
        };
        let mut point = section.point;
        let mut ra = section.point + sign_a * distance * dir_a;
        let mut rb = section.point + sign_b * distance * dir_b;

        if inflate > 0.0 {
            // Oversize the tool: apex out along the bisector, rails on
            // along their own faces
            if let Some(avg) = try_normalize(&(section.normal_a + section.normal_b), 1e-9) {
                point += inflate * avg;
            }
            ra += sign_a * inflate * dir_a;
            rb += sign_b * inflate * dir_b;
        }

        edge_points.push(point);
        rail_a.push(ra);
        rail_b.push(rb);
    }

    if edge_points.len() < 2 {
        return Err(BlendError::InsufficientSamples {
            usable: edge_points.len(),
        });
    }

    orient::align_by_direction(&mut edge_points, &mut rail_a, &mut rail_b);

    if edge.closed() {
        edge_points.push(edge_points[0]);
        rail_a.push(rail_a[0]);
        rail_b.push(rail_b[0]);
    }

    Ok(RailTriple {
        edge_points,
        rail_a,
        rail_b,
        closed: edge.closed(),
    })
}

#[derive(Clone, Copy)]
enum Rail {
    A,
    B,
}

/// In-face direction perpendicular to the edge: `normalize(n × t)`.
fn rail_direction(section: &CrossSection, rail: Rail) -> Option<Vec3> {
    let normal = match rail {
        Rail::A => section.normal_a,
        Rail::B => section.normal_b,
    };
    try_normalize(&normal.cross(&section.tangent), 1e-9)
}

/// Global sign for one rail: the offset direction's projection onto the
/// averaged face-normal pair must match the requested side (inset moves
/// onto the material, outset away from it).
fn rail_sign(section: &CrossSection, rail: Rail, side: SideMode) -> Option<f64> {
    let dir = rail_direction(section, rail)?;
    let avg = try_normalize(&(section.normal_a + section.normal_b), 1e-9)?;
    let toward_outside = dir.dot(&avg);
    let sign = match side {
        SideMode::Inset => {
            if toward_outside < 0.0 {
                1.0
            } else {
                -1.0
            }
        }
        SideMode::Outset => {
            if toward_outside > 0.0 {
                1.0
            } else {
                -1.0
            }
        }
    };
    Some(sign)
}
