//! Tangent-circle solving for fillet centerlines.
//!
//! For each cross-section the solver places an arc center at exactly
//! `radius` from both faces, tangent to each, working in the section's
//! 2D frame. Two candidate centers (inset and outset) are scored by
//! re-projection residual, side preference, and deviation from the
//! theoretical `radius / sin(angle/2)` distance; degraded samples fall
//! back to the angle bisector, then to the averaged face normal.

use arris_math::{Point2, Point3, SectionFrame, Tolerance, Vec2, Vec3};
use arris_solid::Solid;

use crate::config::{BlendConfig, SideMode};
use crate::edge::{BlendEdge, FaceRef};
use crate::error::BlendError;
use crate::orient;
use crate::sample::{resolve_face, sample_edge, CrossSection};

/// A solved fillet centerline with its companion polylines.
///
/// All arrays share index `i` meaning "same cross-section"; closed loops
/// duplicate the first sample at the end of every array.
#[derive(Debug, Clone)]
pub struct Centerline {
    /// Arc centers.
    pub points: Vec<Point3>,
    /// Tangency points on face A.
    pub tangency_a: Vec<Point3>,
    /// Tangency points on face B.
    pub tangency_b: Vec<Point3>,
    /// The edge sample each cross-section came from.
    pub edge_points: Vec<Point3>,
    /// Whether the centerline closes into a loop.
    pub closed: bool,
    /// Largest radius that keeps tangency points within face bounds,
    /// when smaller than the requested radius.
    pub radius_clamp: Option<f64>,
}

struct SectionSolution {
    center: Point3,
    tangency_a: Point3,
    tangency_b: Point3,
    edge_point: Point3,
    max_radius: Option<f64>,
}

/// Solve the fillet centerline for an edge at the requested radius.
pub fn solve_centerline(
    solid: &Solid,
    edge: &BlendEdge,
    radius: f64,
    config: &BlendConfig,
) -> Result<Centerline, BlendError> {
    let tol = Tolerance::derive(solid.bounding_diagonal(), radius);
    let sections = sample_edge(solid, edge, &tol)?;

    let mut solutions = Vec::with_capacity(sections.len());
    let mut angle_drops = 0usize;
    for section in &sections {
        match solve_section(solid, edge, section, radius, config, &tol) {
            Some(solution) => solutions.push(solution),
            None => angle_drops += 1,
        }
    }

    if solutions.len() < 2 {
        if solutions.is_empty() && angle_drops > 0 {
            return Err(BlendError::AngleUnsolvable);
        }
        return Err(BlendError::InsufficientSamples {
            usable: solutions.len(),
        });
    }

    let mut radius_clamp: Option<f64> = None;
    for s in &solutions {
        if let Some(allowed) = s.max_radius {
            if allowed < radius {
                radius_clamp = Some(radius_clamp.map_or(allowed, |r: f64| r.min(allowed)));
            }
        }
    }
    if config.debug {
        if let Some(allowed) = radius_clamp {
            log::warn!("fillet radius {radius} exceeds face extent; clamp to {allowed}");
        }
    }

    let mut points: Vec<Point3> = solutions.iter().map(|s| s.center).collect();
    let mut tangency_a: Vec<Point3> = solutions.iter().map(|s| s.tangency_a).collect();
    let mut tangency_b: Vec<Point3> = solutions.iter().map(|s| s.tangency_b).collect();
    let mut edge_points: Vec<Point3> = solutions.iter().map(|s| s.edge_point).collect();

    orient::align_by_radius(&mut points, &mut tangency_a, &mut tangency_b, radius);

    if edge.closed() {
        points.push(points[0]);
        tangency_a.push(tangency_a[0]);
        tangency_b.push(tangency_b[0]);
        edge_points.push(edge_points[0]);
    }

    Ok(Centerline {
        points,
        tangency_a,
        tangency_b,
        edge_points,
        closed: edge.closed(),
        radius_clamp,
    })
}

/// Solve one cross-section. `None` drops the sample.
fn solve_section(
    solid: &Solid,
    edge: &BlendEdge,
    section: &CrossSection,
    radius: f64,
    config: &BlendConfig,
    tol: &Tolerance,
) -> Option<SectionSolution> {
    let frame = SectionFrame::new(section.point, section.tangent, section.normal_a)?;
    let pair = edge.pair_for_segment(section.segment);

    let mut na2 = plane_normal(&frame, &section.normal_a)?;
    let mut nb2 = plane_normal(&frame, &section.normal_b)?;
    let mut proj_a2 = frame.to_plane(&section.proj_a);
    let mut proj_b2 = frame.to_plane(&section.proj_b);

    // In-plane direction of the averaged original face normals, kept as
    // the last-resort center direction when the bisector degenerates
    let fallback_dir = normalize2(frame.vec_to_plane(&(section.normal_a + section.normal_b)));

    let mut solved = solve_in_frame(
        &frame, solid, pair, na2, nb2, proj_a2, proj_b2, radius, config.side, fallback_dir, tol,
    )?;

    // Refine on curved faces: re-estimate local normals at the tangency
    // points when the solve lands far from theory or the angle is sharp
    for _ in 0..config.refine_passes {
        let needs_refine = solved.deviation > 0.1 || solved.angle < 60f64.to_radians();
        if !needs_refine {
            break;
        }
        let ta3 = frame.to_world(&solved.tangency_a);
        let tb3 = frame.to_world(&solved.tangency_b);
        let (ra3, na3) = resolve_face(solid, &pair.a, &ta3)?;
        let (rb3, nb3) = resolve_face(solid, &pair.b, &tb3)?;
        na2 = plane_normal(&frame, &na3)?;
        nb2 = plane_normal(&frame, &nb3)?;
        proj_a2 = frame.to_plane(&ra3);
        proj_b2 = frame.to_plane(&rb3);
        solved = solve_in_frame(
            &frame, solid, pair, na2, nb2, proj_a2, proj_b2, radius, config.side, fallback_dir, tol,
        )?;
    }

    // Hard cap against runaway centers on near-degenerate sections:
    // snap back to the bisector estimate
    let expected = solved.expected;
    let cap = (6.0 * radius).min(3.0 * expected);
    if solved.center.coords.norm() > cap {
        let dir = normalize2(na2 + nb2).or(fallback_dir)?;
        let sign = side_sign(config.side);
        let c = Point2::from(dir * (sign * expected.min(cap)));
        solved.center = c;
        solved.tangency_a = c - sign * radius * na2;
        solved.tangency_b = c - sign * radius * nb2;
    }

    let tangency_a = frame.to_world(&solved.tangency_a);
    let tangency_b = frame.to_world(&solved.tangency_b);

    let max_radius = face_extent_limit(
        solid,
        pair_names(pair),
        &section.point,
        &tangency_a,
        &tangency_b,
        radius,
    );

    Some(SectionSolution {
        center: frame.to_world(&solved.center),
        tangency_a,
        tangency_b,
        edge_point: section.point,
        max_radius,
    })
}

struct FrameSolution {
    center: Point2,
    tangency_a: Point2,
    tangency_b: Point2,
    expected: f64,
    deviation: f64,
    angle: f64,
}

fn side_sign(side: SideMode) -> f64 {
    match side {
        SideMode::Inset => -1.0,
        SideMode::Outset => 1.0,
    }
}

/// Project a face normal into the section plane, normalized.
fn plane_normal(frame: &SectionFrame, normal: &Vec3) -> Option<Vec2> {
    normalize2(frame.vec_to_plane(normal))
}

fn normalize2(v: Vec2) -> Option<Vec2> {
    let len = v.norm();
    if len < 1e-9 {
        None
    } else {
        Some(v / len)
    }
}

#[allow(clippy::too_many_arguments)]
fn solve_in_frame(
    frame: &SectionFrame,
    solid: &Solid,
    pair: &crate::edge::FacePair,
    na2: Vec2,
    nb2: Vec2,
    proj_a2: Point2,
    proj_b2: Point2,
    radius: f64,
    side: SideMode,
    fallback_dir: Option<Vec2>,
    tol: &Tolerance,
) -> Option<FrameSolution> {
    let cos_angle = na2.dot(&nb2).clamp(-1.0, 1.0);
    let angle = cos_angle.acos();
    let half = angle * 0.5;
    if half.sin() < tol.angle {
        // Parallel faces: no tangent circle exists
        return None;
    }
    let expected = radius / half.sin();
    let preferred = side_sign(side);

    let mut best: Option<(f64, FrameSolution)> = None;
    for sign in [1.0f64, -1.0] {
        let Some(center) = intersect_offsets(na2, nb2, proj_a2, proj_b2, sign * radius) else {
            continue;
        };
        let tangency_a = center - sign * radius * na2;
        let tangency_b = center - sign * radius * nb2;

        // Re-project implied tangencies onto the faces
        let residual = reprojection_residual(frame, solid, pair, &tangency_a, &tangency_b);
        let distance = center.coords.norm();
        let deviation = (distance - expected).abs() / expected;
        let wrong_side = if on_preferred_side(&center, na2, nb2, preferred) {
            0.0
        } else {
            1.0
        };
        let score = residual / radius + deviation + wrong_side;

        let candidate = FrameSolution {
            center,
            tangency_a,
            tangency_b,
            expected,
            deviation,
            angle,
        };
        if best.as_ref().map_or(true, |(s, _)| score < *s) {
            best = Some((score, candidate));
        }
    }

    if let Some((_, solution)) = best {
        return Some(solution);
    }

    // Both offset-plane intersections failed: bisector fallback, then
    // the averaged original face-normal direction
    let dir = match normalize2(na2 + nb2) {
        Some(d) => d,
        None => fallback_dir?,
    };
    let center = Point2::from(dir * (preferred * expected));
    Some(FrameSolution {
        center,
        tangency_a: center - preferred * radius * na2,
        tangency_b: center - preferred * radius * nb2,
        expected,
        deviation: 0.0,
        angle,
    })
}

/// Intersect the two offset lines `n · x = n · anchor + offset`.
fn intersect_offsets(
    na2: Vec2,
    nb2: Vec2,
    proj_a2: Point2,
    proj_b2: Point2,
    offset: f64,
) -> Option<Point2> {
    let det = na2.x * nb2.y - na2.y * nb2.x;
    if det.abs() < 1e-12 {
        return None;
    }
    let ra = na2.dot(&proj_a2.coords) + offset;
    let rb = nb2.dot(&proj_b2.coords) + offset;
    Some(Point2::new(
        (ra * nb2.y - rb * na2.y) / det,
        (na2.x * rb - nb2.x * ra) / det,
    ))
}

fn reprojection_residual(
    frame: &SectionFrame,
    solid: &Solid,
    pair: &crate::edge::FacePair,
    tangency_a: &Point2,
    tangency_b: &Point2,
) -> f64 {
    let ta3 = frame.to_world(tangency_a);
    let tb3 = frame.to_world(tangency_b);
    let res_a = resolve_face(solid, &pair.a, &ta3)
        .map(|(p, _)| (ta3 - p).norm())
        .unwrap_or(0.0);
    let res_b = resolve_face(solid, &pair.b, &tb3)
        .map(|(p, _)| (tb3 - p).norm())
        .unwrap_or(0.0);
    res_a + res_b
}

fn on_preferred_side(center: &Point2, na2: Vec2, nb2: Vec2, preferred: f64) -> bool {
    let avg = na2 + nb2;
    let len = avg.norm();
    if len < 1e-9 {
        return true;
    }
    center.coords.dot(&avg) * preferred >= 0.0
}

/// Largest radius keeping both tangencies within their faces' triangle
/// extents, from this section's viewpoint.
fn face_extent_limit(
    solid: &Solid,
    names: (Option<&str>, Option<&str>),
    edge_point: &Point3,
    tangency_a: &Point3,
    tangency_b: &Point3,
    radius: f64,
) -> Option<f64> {
    let mut limit: Option<f64> = None;
    for (name, tangency) in [(names.0, tangency_a), (names.1, tangency_b)] {
        let Some(name) = name else { continue };
        let offset = tangency - edge_point;
        let run = offset.norm();
        if run < 1e-12 {
            continue;
        }
        let dir = offset / run;
        let Some(extent) = solid.face_extent_along(name, edge_point, &dir) else {
            continue;
        };
        if extent < run {
            // Tangency offset scales linearly with radius
            let allowed = radius * extent / run;
            limit = Some(limit.map_or(allowed, |l: f64| l.min(allowed)));
        }
    }
    limit
}

fn pair_names(pair: &crate::edge::FacePair) -> (Option<&str>, Option<&str>) {
    fn name(r: &FaceRef) -> Option<&str> {
        match r {
            FaceRef::Named(n) => Some(n.as_str()),
            FaceRef::Blended { .. } => None,
        }
    }
    (name(&pair.a), name(&pair.b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use arris_solid::{make_box, make_cylinder};

    fn straight_edge_config() -> BlendConfig {
        BlendConfig::default()
    }

    #[test]
    fn test_right_angle_straight_edge_centerline() {
        // 90-degree dihedral along a 20-unit edge, radius 2: the
        // centerline is a straight line offset 2/sin(45) from the edge
        let solid = make_box(10.0, 20.0, 10.0);
        let points = (0..9)
            .map(|i| Point3::new(10.0, 20.0 * i as f64 / 8.0, 10.0))
            .collect();
        let edge = BlendEdge::between_faces(points, false, "TOP", "RIGHT");
        let cl = solve_centerline(&solid, &edge, 2.0, &straight_edge_config()).unwrap();

        let expected = 2.0 / (45f64).to_radians().sin();
        for (c, e) in cl.points.iter().zip(&cl.edge_points) {
            assert_relative_eq!((c - e).norm(), expected, epsilon = 1e-6);
            // Inset: the center sits inside the material
            assert!(c.x < 10.0 && c.z < 10.0);
        }
        for (c, t) in cl.points.iter().zip(&cl.tangency_a) {
            assert_relative_eq!((c - t).norm(), 2.0, epsilon = 1e-6);
        }
        for (c, t) in cl.points.iter().zip(&cl.tangency_b) {
            assert_relative_eq!((c - t).norm(), 2.0, epsilon = 1e-6);
        }
        // Straightness: all centers on one line
        let first = cl.points[0];
        let last = cl.points[cl.points.len() - 1];
        let dir = (last - first).normalize();
        for c in &cl.points {
            let d = (c - first) - (c - first).dot(&dir) * dir;
            assert!(d.norm() < 1e-6, "centerline not straight: {d:?}");
        }
        assert!(cl.radius_clamp.is_none());
    }

    #[test]
    fn test_closed_circular_edge_closes() {
        // Rim edge of a cylinder between the flat TOP and curved SIDE
        let solid = make_cylinder(10.0, 5.0, 96);
        let n = 48;
        let points: Vec<Point3> = (0..n)
            .map(|i| {
                let theta = std::f64::consts::TAU * i as f64 / n as f64;
                Point3::new(10.0 * theta.cos(), 10.0 * theta.sin(), 5.0)
            })
            .collect();
        let edge = BlendEdge::between_faces(points, true, "TOP", "SIDE");
        let cl = solve_centerline(&solid, &edge, 1.0, &straight_edge_config()).unwrap();

        assert!(cl.closed);
        // Closed arrays duplicate the first point at the end
        let len = cl.points.len();
        assert_relative_eq!((cl.points[0] - cl.points[len - 1]).norm(), 0.0);
        assert_eq!(cl.tangency_a.len(), len);
        assert_eq!(cl.tangency_b.len(), len);
        for (c, t) in cl.points.iter().zip(&cl.tangency_a) {
            assert_relative_eq!((c - t).norm(), 1.0, epsilon = 0.05);
        }
        // Centers pulled inside the rim and below the top
        for c in &cl.points {
            let r = (c.x * c.x + c.y * c.y).sqrt();
            assert!(r < 10.0 && c.z < 5.0);
        }
    }

    #[test]
    fn test_radius_clamp_reported_for_oversized_radius() {
        // Box only 2 deep below the TOP/RIGHT edge: radius 5 cannot fit
        let solid = make_box(2.0, 20.0, 2.0);
        let points = (0..9)
            .map(|i| Point3::new(2.0, 20.0 * i as f64 / 8.0, 2.0))
            .collect();
        let edge = BlendEdge::between_faces(points, false, "TOP", "RIGHT");
        let cl = solve_centerline(&solid, &edge, 5.0, &straight_edge_config()).unwrap();
        let clamp = cl.radius_clamp.expect("oversized radius must report a clamp");
        assert!(clamp < 5.0);
        assert!(clamp > 0.0);
    }

    #[test]
    fn test_parallel_faces_unsolvable() {
        // TOP and BOTTOM are anti-parallel: no tangent circle
        let solid = make_box(4.0, 4.0, 4.0);
        let points = (0..5)
            .map(|i| Point3::new(2.0, i as f64, 2.0))
            .collect();
        let edge = BlendEdge::between_faces(points, false, "TOP", "TOP");
        let result = solve_centerline(&solid, &edge, 0.5, &straight_edge_config());
        assert!(matches!(
            result,
            Err(BlendError::AngleUnsolvable) | Err(BlendError::InsufficientSamples { .. })
        ));
    }
}
