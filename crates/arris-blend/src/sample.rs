//! Tangency sampling along an edge.
//!
//! Walks the edge polyline, inserting a midpoint sample between every
//! pair of consecutive vertices so curvature between straight segments
//! is captured, and estimates a tangent plus per-face local normals and
//! projections at every sample. Samples that cannot produce a usable
//! tangent or normal are dropped, never fabricated.

use arris_math::{lerp_point, try_normalize, Point3, Tolerance, Vec3};
use arris_solid::Solid;

use crate::edge::{BlendEdge, FaceRef};
use crate::error::BlendError;

/// One cross-section of the edge: everything a solver needs at a sample.
#[derive(Debug, Clone)]
pub struct CrossSection {
    /// Sample point on the edge.
    pub point: Point3,
    /// Unit tangent (central difference of neighbors).
    pub tangent: Vec3,
    /// Local outward normal of face A at the projection.
    pub normal_a: Vec3,
    /// Local outward normal of face B at the projection.
    pub normal_b: Vec3,
    /// Nearest point on face A's triangle set.
    pub proj_a: Point3,
    /// Nearest point on face B's triangle set.
    pub proj_b: Point3,
    /// Owning segment of the original edge (for composite edges).
    pub segment: usize,
}

/// Sample an edge against its bounding faces.
///
/// Returns at least two cross-sections or an error; per-sample failures
/// are silently absorbed by dropping the sample.
pub fn sample_edge(
    solid: &Solid,
    edge: &BlendEdge,
    tol: &Tolerance,
) -> Result<Vec<CrossSection>, BlendError> {
    let points = edge.points();
    if points.len() < 2 {
        return Err(BlendError::DegenerateCenterline);
    }
    let spread = points
        .iter()
        .map(|p| (p - points[0]).norm())
        .fold(0.0f64, f64::max);
    if tol.is_zero(spread) {
        return Err(BlendError::DegenerateCenterline);
    }

    // Expanded sample list: vertices interleaved with segment midpoints
    let expanded = expand_with_midpoints(points, edge.closed());

    let mut sections = Vec::with_capacity(expanded.len());
    let mut angle_drops = 0usize;
    for (i, &(point, segment)) in expanded.iter().enumerate() {
        let Some(tangent) = tangent_at(&expanded, i, edge.closed(), tol) else {
            continue;
        };

        let pair = edge.pair_for_segment(segment);
        let Some((proj_a, normal_a)) = resolve_face(solid, &pair.a, &point) else {
            continue;
        };
        let Some((proj_b, normal_b)) = resolve_face(solid, &pair.b, &point) else {
            continue;
        };

        // A normal parallel to the tangent leaves no section plane
        if try_normalize(&normal_a.cross(&tangent), 1e-9).is_none()
            || try_normalize(&normal_b.cross(&tangent), 1e-9).is_none()
        {
            angle_drops += 1;
            continue;
        }

        sections.push(CrossSection {
            point,
            tangent,
            normal_a,
            normal_b,
            proj_a,
            proj_b,
            segment,
        });
    }

    if sections.len() < 2 {
        if angle_drops > 0 && sections.is_empty() {
            return Err(BlendError::AngleUnsolvable);
        }
        return Err(BlendError::InsufficientSamples {
            usable: sections.len(),
        });
    }
    Ok(sections)
}

/// Interleave segment midpoints with the original vertices. Each entry
/// carries the index of the segment it belongs to.
fn expand_with_midpoints(points: &[Point3], closed: bool) -> Vec<(Point3, usize)> {
    let n = points.len();
    let mut out = Vec::with_capacity(2 * n);
    for i in 0..n {
        let vertex_segment = if closed { i } else { i.min(n.saturating_sub(2)) };
        out.push((points[i], vertex_segment));
        let is_last = i + 1 == n;
        if is_last && !closed {
            break;
        }
        let j = (i + 1) % n;
        out.push((lerp_point(&points[i], &points[j], 0.5), i));
    }
    out
}

fn tangent_at(
    expanded: &[(Point3, usize)],
    i: usize,
    closed: bool,
    tol: &Tolerance,
) -> Option<Vec3> {
    let n = expanded.len();
    let (prev, next) = if closed {
        (expanded[(i + n - 1) % n].0, expanded[(i + 1) % n].0)
    } else if i == 0 {
        (expanded[0].0, expanded[1].0)
    } else if i + 1 == n {
        (expanded[n - 2].0, expanded[n - 1].0)
    } else {
        (expanded[i - 1].0, expanded[i + 1].0)
    };
    try_normalize(&(next - prev), tol.weld)
}

/// Resolve a face reference near a point into (projection, local normal).
pub(crate) fn resolve_face(solid: &Solid, face: &FaceRef, near: &Point3) -> Option<(Point3, Vec3)> {
    match face {
        FaceRef::Named(name) => {
            let proj = solid.project_onto_face(name, near)?;
            let normal = solid
                .local_normal(name, &proj)
                .or_else(|| solid.average_normal(name))?;
            Some((proj, normal))
        }
        FaceRef::Blended { first, second, t } => {
            let (pa, na) = resolve_face(solid, &FaceRef::Named(first.clone()), near)?;
            let (pb, nb) = resolve_face(solid, &FaceRef::Named(second.clone()), near)?;
            let t = t.clamp(0.0, 1.0);
            let normal = try_normalize(&((1.0 - t) * na + t * nb), 1e-9)?;
            let proj = if (near - pa).norm_squared() <= (near - pb).norm_squared() {
                pa
            } else {
                pb
            };
            Some((proj, normal))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use arris_solid::make_box;

    fn top_right_edge(n: usize, sx: f64) -> BlendEdge {
        // The edge shared by TOP (z = 1) and RIGHT (x = sx) of a box,
        // sampled with n points along y
        let points = (0..n)
            .map(|i| Point3::new(sx, i as f64 / (n - 1) as f64, 1.0))
            .collect();
        BlendEdge::between_faces(points, false, "TOP", "RIGHT")
    }

    #[test]
    fn test_open_edge_sample_count_and_tangents() {
        let solid = make_box(1.0, 1.0, 1.0);
        let edge = top_right_edge(5, 1.0);
        let tol = Tolerance::derive(solid.bounding_diagonal(), 0.1);
        let sections = sample_edge(&solid, &edge, &tol).unwrap();
        // 5 vertices + 4 midpoints
        assert_eq!(sections.len(), 9);
        for s in &sections {
            assert_relative_eq!(s.tangent.y, 1.0, epsilon = 1e-9);
            assert!(s.normal_a.z > 0.9, "face A normal should be ~+Z");
            assert!(s.normal_b.x > 0.9, "face B normal should be ~+X");
            assert_relative_eq!(s.proj_a.z, 1.0, epsilon = 1e-9);
            assert_relative_eq!(s.proj_b.x, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_closed_composite_loop_wraps_midpoints() {
        // The whole TOP boundary: a composite edge with one face pair
        // per segment
        let solid = make_box(2.0, 2.0, 2.0);
        let square = vec![
            Point3::new(0.0, 0.0, 2.0),
            Point3::new(2.0, 0.0, 2.0),
            Point3::new(2.0, 2.0, 2.0),
            Point3::new(0.0, 2.0, 2.0),
        ];
        let pairs = vec![
            crate::edge::FacePair::named("TOP", "FRONT"),
            crate::edge::FacePair::named("TOP", "RIGHT"),
            crate::edge::FacePair::named("TOP", "BACK"),
            crate::edge::FacePair::named("TOP", "LEFT"),
        ];
        let edge = BlendEdge::new(square, true, crate::edge::EdgeFaces::PerSegment(pairs));
        let tol = Tolerance::derive(solid.bounding_diagonal(), 0.1);
        let sections = sample_edge(&solid, &edge, &tol).unwrap();
        // 4 vertices + 4 midpoints, including the wrap midpoint between
        // the last and first vertex
        assert_eq!(sections.len(), 8);
        // Each midpoint resolves its own segment's side face
        let mid_front = &sections[1];
        assert!(mid_front.normal_b.y < -0.9);
        let mid_right = &sections[3];
        assert!(mid_right.normal_b.x > 0.9);
    }

    #[test]
    fn test_degenerate_edge_rejected() {
        let solid = make_box(1.0, 1.0, 1.0);
        let edge = BlendEdge::between_faces(
            vec![Point3::new(1.0, 0.5, 1.0); 4],
            false,
            "TOP",
            "RIGHT",
        );
        let tol = Tolerance::derive(solid.bounding_diagonal(), 0.1);
        assert!(matches!(
            sample_edge(&solid, &edge, &tol),
            Err(BlendError::DegenerateCenterline)
        ));
    }

    #[test]
    fn test_unknown_face_drops_all_samples() {
        let solid = make_box(1.0, 1.0, 1.0);
        let edge = top_right_edge(3, 1.0);
        let edge = BlendEdge::between_faces(edge.points().to_vec(), false, "TOP", "NO_SUCH");
        let tol = Tolerance::derive(solid.bounding_diagonal(), 0.1);
        assert!(matches!(
            sample_edge(&solid, &edge, &tol),
            Err(BlendError::InsufficientSamples { usable: 0 })
        ));
    }

    #[test]
    fn test_blended_pair_interpolates_normals() {
        let solid = make_box(1.0, 1.0, 1.0);
        let points = vec![
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(1.0, 0.5, 1.0),
            Point3::new(1.0, 1.0, 1.0),
        ];
        let edge = BlendEdge::new(
            points,
            false,
            crate::edge::EdgeFaces::Shared(crate::edge::FacePair {
                a: FaceRef::named("TOP"),
                b: FaceRef::Blended {
                    first: "RIGHT".to_string(),
                    second: "BACK".to_string(),
                    t: 0.5,
                },
            }),
        );
        let tol = Tolerance::derive(solid.bounding_diagonal(), 0.1);
        let sections = sample_edge(&solid, &edge, &tol).unwrap();
        for s in &sections {
            // Halfway blend of +X and +Y, renormalized
            assert_relative_eq!(s.normal_b.x, s.normal_b.y, epsilon = 1e-6);
            assert!(s.normal_b.x > 0.5);
        }
    }
}
