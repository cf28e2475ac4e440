//! Tube tool-solid construction for fillets.
//!
//! Two strategies produce the capsule-like solid that sweeps the
//! centerline at constant radius:
//!
//! - **Fast rings**: smooth the path, propagate rotation-minimizing
//!   frames (double reflection), extrude radial rings, cap open ends.
//!   A cleanup pass (weld + duplicate-face removal + winding repair)
//!   follows, and a capsule-overlap scan flags paths that fold back
//!   within a tube diameter; the count comparison against the pre-clean
//!   mesh backs the scan up. A kernel that resolves self-intersections
//!   on union-with-self can be swapped in behind the same seam.
//! - **Sphere hulls** (slow, always correct): a sphere per path point,
//!   convex hull of each consecutive pair, everything unioned; open
//!   ends are trimmed flat by the end-tangent plane.

use arris_csg::CsgKernel;
use arris_math::{any_perpendicular, try_normalize, Point3, Vec3};
use arris_mesh::LabeledMesh;
use arris_solid::Solid;

use crate::config::TubeStrategy;
use crate::error::BlendError;

/// Outer surface face label.
pub const OUTER: &str = "Outer";
/// Inner surface face label (hollow tubes).
pub const INNER: &str = "Inner";
/// Start cap face label.
pub const CAP_START: &str = "CapStart";
/// End cap face label.
pub const CAP_END: &str = "CapEnd";

/// Parameters for one tube build.
#[derive(Debug, Clone)]
pub struct TubeSpec {
    /// Outer radius.
    pub outer_radius: f64,
    /// Optional inner radius for a hollow tube.
    pub inner_radius: Option<f64>,
    /// Radial resolution.
    pub segments: u32,
    /// Whether the path closes into a loop.
    pub closed: bool,
    /// Construction strategy.
    pub strategy: TubeStrategy,
}

/// A built tube plus its diagnostics.
#[derive(Debug, Clone)]
pub struct TubeResult {
    /// The tool solid.
    pub solid: Solid,
    /// The (smoothed) centerline actually swept, for diagnostics.
    pub centerline: Vec<Point3>,
    /// Whether the sphere-hull path produced the result.
    pub used_slow_path: bool,
    /// Whether cleanup saw evidence of self-intersection.
    pub self_intersection_suspected: bool,
}

/// Build a tube along `path`.
pub fn build_tube(
    path: &[Point3],
    spec: &TubeSpec,
    kernel: &dyn CsgKernel,
) -> Result<TubeResult, BlendError> {
    let path = dedupe_path(path, spec.closed);
    if path.len() < 2 {
        return Err(BlendError::TubeGenerationFailure(
            "path has fewer than two distinct points".to_string(),
        ));
    }

    let folded = path_folds_back(&path, spec.outer_radius, spec.closed);
    match spec.strategy {
        TubeStrategy::SphereHulls => build_sphere_hull_tube(&path, spec, kernel),
        TubeStrategy::FastRings => build_fast_ring_tube(&path, spec, folded),
        TubeStrategy::Auto => {
            if folded {
                log::debug!("tube path folds back on itself; using sphere hulls");
                return build_sphere_hull_tube(&path, spec, kernel);
            }
            match build_fast_ring_tube(&path, spec, folded) {
                Ok(result) if !result.self_intersection_suspected => Ok(result),
                // Fast path unusable: the slow path always works
                _ => build_sphere_hull_tube(&path, spec, kernel),
            }
        }
    }
}

fn dedupe_path(path: &[Point3], closed: bool) -> Vec<Point3> {
    let mut out: Vec<Point3> = Vec::with_capacity(path.len());
    for p in path {
        if out
            .last()
            .is_some_and(|last| (p - last).norm_squared() < 1e-24)
        {
            continue;
        }
        out.push(*p);
    }
    if closed && out.len() > 1 {
        if (out[0] - out[out.len() - 1]).norm_squared() < 1e-24 {
            out.pop();
        }
    }
    out
}

// =============================================================================
// Fast path: ring extrusion over rotation-minimizing frames
// =============================================================================

fn build_fast_ring_tube(
    path: &[Point3],
    spec: &TubeSpec,
    folded: bool,
) -> Result<TubeResult, BlendError> {
    let r = spec.outer_radius;
    let smoothed = smooth_path(path, r, spec.closed);
    if smoothed.len() < 2 {
        return Err(BlendError::TubeGenerationFailure(
            "path collapsed during smoothing".to_string(),
        ));
    }

    let frames = transport_frames(&smoothed, spec.closed).ok_or_else(|| {
        BlendError::TubeGenerationFailure("no usable tangent frames along path".to_string())
    })?;

    let segments = spec.segments.max(3) as usize;
    let mut mesh = LabeledMesh::new();
    let outer_rings: Vec<Vec<Point3>> = frames.iter().map(|f| f.ring(r, segments)).collect();
    stitch_rings(&mut mesh, &outer_rings, OUTER, spec.closed, false);

    let inner_rings = spec.inner_radius.map(|ri| {
        frames
            .iter()
            .map(|f| f.ring(ri, segments))
            .collect::<Vec<_>>()
    });
    if let Some(inner) = &inner_rings {
        stitch_rings(&mut mesh, inner, INNER, spec.closed, true);
    }

    if !spec.closed {
        cap_ring(
            &mut mesh,
            &outer_rings[0],
            inner_rings.as_ref().map(|r| r[0].as_slice()),
            &frames[0].position,
            CAP_START,
            true,
        );
        let last = outer_rings.len() - 1;
        cap_ring(
            &mut mesh,
            &outer_rings[last],
            inner_rings.as_ref().map(|r| r[last].as_slice()),
            &frames[last].position,
            CAP_END,
            false,
        );
    }

    // Cleanup pass in place of a kernel self-union: weld, strip exact
    // duplicate faces, renormalize windings, then compare counts
    let before = mesh.num_triangles();
    let mut cleaned = mesh
        .weld(r * 1e-7)
        .dedupe_triangles()
        .drop_degenerate(r * r * 1e-10);
    cleaned.fix_windings_by_adjacency();
    let after = cleaned.num_triangles();
    let suspected = folded || after > before;

    let names = vec![
        OUTER.to_string(),
        INNER.to_string(),
        CAP_START.to_string(),
        CAP_END.to_string(),
    ];
    Ok(TubeResult {
        solid: Solid::from_mesh(cleaned, names),
        centerline: smoothed,
        used_slow_path: false,
        self_intersection_suspected: suspected,
    })
}

/// Drop collinear vertices and split sharp corners at the tangent-half-
/// angle trim distance, so rings never interpenetrate at a bend.
fn smooth_path(path: &[Point3], radius: f64, closed: bool) -> Vec<Point3> {
    let n = path.len();
    if n < 3 {
        return path.to_vec();
    }
    let mut out: Vec<Point3> = Vec::with_capacity(n + 8);
    let range: Box<dyn Iterator<Item = usize>> = if closed {
        Box::new(0..n)
    } else {
        Box::new(1..n - 1)
    };
    if !closed {
        out.push(path[0]);
    }
    for i in range {
        let prev = path[(i + n - 1) % n];
        let curr = path[i];
        let next = path[(i + 1) % n];
        let Some(d_in) = try_normalize(&(curr - prev), 1e-12) else {
            continue;
        };
        let Some(d_out) = try_normalize(&(next - curr), 1e-12) else {
            continue;
        };
        let cos_turn = d_in.dot(&d_out).clamp(-1.0, 1.0);
        if cos_turn > 1.0 - 1e-9 {
            // Collinear: contributes nothing to curvature
            continue;
        }
        let turn = cos_turn.acos();
        if turn < 60f64.to_radians() {
            out.push(curr);
            continue;
        }
        // Sharp corner: retreat along both segments by the half-angle
        // trim distance so the two rings clear each other
        let trim = (radius * (turn * 0.5).tan())
            .min(0.4 * (curr - prev).norm())
            .min(0.4 * (next - curr).norm());
        out.push(curr - d_in * trim);
        out.push(curr + d_out * trim);
    }
    if !closed {
        out.push(path[n - 1]);
    }
    if out.len() < 2 {
        return path.to_vec();
    }
    out
}

struct Frame {
    position: Point3,
    normal: Vec3,
    binormal: Vec3,
}

impl Frame {
    fn ring(&self, radius: f64, segments: usize) -> Vec<Point3> {
        (0..segments)
            .map(|k| {
                let theta = std::f64::consts::TAU * k as f64 / segments as f64;
                self.position + radius * (theta.cos() * self.normal + theta.sin() * self.binormal)
            })
            .collect()
    }
}

/// Rotation-minimizing frames along a polyline by the double-reflection
/// method: reflect the previous frame across the chord, then across the
/// new tangent, so the normal never spins about the path.
fn transport_frames(path: &[Point3], closed: bool) -> Option<Vec<Frame>> {
    let n = path.len();
    let tangent_at = |i: usize| -> Option<Vec3> {
        let (prev, next) = if closed {
            (path[(i + n - 1) % n], path[(i + 1) % n])
        } else if i == 0 {
            (path[0], path[1])
        } else if i + 1 == n {
            (path[n - 2], path[n - 1])
        } else {
            (path[i - 1], path[i + 1])
        };
        try_normalize(&(next - prev), 1e-12)
    };

    let t0 = tangent_at(0)?;
    let n0 = any_perpendicular(&t0)?;
    let mut frames = Vec::with_capacity(n);
    frames.push(Frame {
        position: path[0],
        normal: n0,
        binormal: t0.cross(&n0),
    });

    let mut prev_tangent = t0;
    for i in 1..n {
        let prev: &Frame = &frames[i - 1];
        let xi = path[i];
        let v1 = xi - prev.position;
        let c1 = v1.dot(&v1);
        let ti = tangent_at(i).unwrap_or(prev_tangent);

        let (normal, binormal) = if c1 < 1e-24 {
            (prev.normal, prev.binormal)
        } else {
            let reflected_n = prev.normal - (2.0 / c1) * v1.dot(&prev.normal) * v1;
            let reflected_t = prev_tangent - (2.0 / c1) * v1.dot(&prev_tangent) * v1;
            let v2 = ti - reflected_t;
            let c2 = v2.dot(&v2);
            let ni = if c2 < 1e-24 {
                reflected_n
            } else {
                reflected_n - (2.0 / c2) * v2.dot(&reflected_n) * v2
            };
            let ni = try_normalize(&ni, 1e-12).unwrap_or(prev.normal);
            (ni, ti.cross(&ni))
        };

        frames.push(Frame {
            position: xi,
            normal,
            binormal,
        });
        prev_tangent = ti;
    }
    Some(frames)
}

/// Quad-stitch consecutive rings; `flip` reverses winding for inner
/// surfaces. Closed paths wrap the last ring to the first with the
/// twist offset that best matches the two rings.
fn stitch_rings(
    mesh: &mut LabeledMesh,
    rings: &[Vec<Point3>],
    label: &str,
    closed: bool,
    flip: bool,
) {
    let label_id = match label {
        OUTER => 0,
        INNER => 1,
        CAP_START => 2,
        _ => 3,
    };
    let s = rings[0].len();
    let pairs = if closed { rings.len() } else { rings.len() - 1 };
    for i in 0..pairs {
        let j = (i + 1) % rings.len();
        // Wrap seam: compensate transport twist by index offset
        let offset = if closed && j == 0 {
            best_twist_offset(&rings[i], &rings[0])
        } else {
            0
        };
        for k in 0..s {
            let k1 = (k + 1) % s;
            let a = rings[i][k];
            let b = rings[i][k1];
            let c = rings[j][(k1 + offset) % s];
            let d = rings[j][(k + offset) % s];
            if flip {
                push_tri(mesh, label_id, a, c, b);
                push_tri(mesh, label_id, a, d, c);
            } else {
                push_tri(mesh, label_id, a, b, c);
                push_tri(mesh, label_id, a, c, d);
            }
        }
    }
}

fn best_twist_offset(from: &[Point3], to: &[Point3]) -> usize {
    let s = from.len();
    let mut best = (f64::INFINITY, 0usize);
    for offset in 0..s {
        let mut score = 0.0;
        for k in 0..s {
            score += (from[k] - to[(k + offset) % s]).norm_squared();
        }
        if score < best.0 {
            best = (score, offset);
        }
    }
    best.1
}

fn cap_ring(
    mesh: &mut LabeledMesh,
    outer: &[Point3],
    inner: Option<&[Point3]>,
    center: &Point3,
    label: &str,
    start: bool,
) {
    let label_id = if label == CAP_START { 2 } else { 3 };
    let s = outer.len();
    match inner {
        None => {
            for k in 0..s {
                let k1 = (k + 1) % s;
                if start {
                    push_tri(mesh, label_id, *center, outer[k1], outer[k]);
                } else {
                    push_tri(mesh, label_id, *center, outer[k], outer[k1]);
                }
            }
        }
        Some(inner) => {
            for k in 0..s {
                let k1 = (k + 1) % s;
                if start {
                    push_tri(mesh, label_id, outer[k], inner[k1], inner[k]);
                    push_tri(mesh, label_id, outer[k], outer[k1], inner[k1]);
                } else {
                    push_tri(mesh, label_id, outer[k], inner[k], inner[k1]);
                    push_tri(mesh, label_id, outer[k], inner[k1], outer[k1]);
                }
            }
        }
    }
}

fn push_tri(mesh: &mut LabeledMesh, label: u32, a: Point3, b: Point3, c: Point3) {
    mesh.push_triangle(label, a, b, c);
}

/// Does the path fold back within a tube diameter of itself? Capsule
/// test over segment pairs separated by more than a diameter of arc
/// length.
fn path_folds_back(path: &[Point3], radius: f64, closed: bool) -> bool {
    let n = path.len();
    let segs = if closed { n } else { n - 1 };
    if segs < 3 {
        return false;
    }
    let seg = |i: usize| (path[i], path[(i + 1) % n]);
    let mut cumulative = vec![0.0f64; segs + 1];
    for i in 0..segs {
        let (a, b) = seg(i);
        cumulative[i + 1] = cumulative[i] + (b - a).norm();
    }
    let total = cumulative[segs];
    let clearance = 2.0 * radius;

    for i in 0..segs {
        for j in (i + 2)..segs {
            if closed && i == 0 && j == segs - 1 {
                continue;
            }
            let mid_i = 0.5 * (cumulative[i] + cumulative[i + 1]);
            let mid_j = 0.5 * (cumulative[j] + cumulative[j + 1]);
            let mut arc = (mid_j - mid_i).abs();
            if closed {
                arc = arc.min(total - arc);
            }
            let (ai, bi) = seg(i);
            let (aj, bj) = seg(j);
            let slack = 0.5 * ((bi - ai).norm() + (bj - aj).norm());
            if arc - slack < clearance * 1.25 {
                continue;
            }
            if segment_distance(&ai, &bi, &aj, &bj) < clearance {
                return true;
            }
        }
    }
    false
}

/// Minimum distance between two 3D segments.
fn segment_distance(p1: &Point3, q1: &Point3, p2: &Point3, q2: &Point3) -> f64 {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.dot(&d1);
    let e = d2.dot(&d2);
    let f = d2.dot(&r);

    let (mut s, mut t);
    if a <= 1e-30 && e <= 1e-30 {
        return (p1 - p2).norm();
    }
    if a <= 1e-30 {
        s = 0.0;
        t = (f / e).clamp(0.0, 1.0);
    } else {
        let c = d1.dot(&r);
        if e <= 1e-30 {
            t = 0.0;
            s = (-c / a).clamp(0.0, 1.0);
        } else {
            let b = d1.dot(&d2);
            let denom = a * e - b * b;
            s = if denom.abs() > 1e-30 {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
        }
    }
    let c1 = p1 + s * d1;
    let c2 = p2 + t * d2;
    (c1 - c2).norm()
}

// =============================================================================
// Slow path: convex hulls of sphere pairs
// =============================================================================

fn build_sphere_hull_tube(
    path: &[Point3],
    spec: &TubeSpec,
    kernel: &dyn CsgKernel,
) -> Result<TubeResult, BlendError> {
    let r = spec.outer_radius;
    let n = path.len();
    let segs = if spec.closed { n } else { n - 1 };

    let mut accumulated: Option<LabeledMesh> = None;
    for i in 0..segs {
        let a = path[i];
        let b = path[(i + 1) % n];
        let segment = hull_of_sphere_pair(&a, &b, r, spec.segments)?;
        accumulated = Some(match accumulated {
            None => segment,
            Some(acc) => match kernel.union(&acc, &segment) {
                Ok(m) => m,
                // Keep the geometry even when the union fails
                Err(_) => {
                    let mut merged = acc;
                    merged.merge(&segment);
                    merged.weld(r * 1e-6)
                }
            },
        });
    }
    let mut mesh = accumulated.ok_or_else(|| {
        BlendError::TubeGenerationFailure("no hull segments produced".to_string())
    })?;

    // Flatten the round ends: cut everything beyond the end planes
    if !spec.closed {
        for (end, start_side) in [(0usize, true), (n - 1, false)] {
            let tangent = if start_side {
                try_normalize(&(path[0] - path[1]), 1e-12)
            } else {
                try_normalize(&(path[n - 1] - path[n - 2]), 1e-12)
            };
            let Some(tangent) = tangent else { continue };
            let slab = slab_beyond(&path[end], &tangent, 3.0 * r);
            match kernel.subtract(&mesh, &slab) {
                Ok(trimmed) if trimmed.num_triangles() > 0 => mesh = trimmed,
                _ => log::debug!("end-plane trim failed; keeping round cap"),
            }
        }
    }

    if let Some(ri) = spec.inner_radius {
        let inner_spec = TubeSpec {
            outer_radius: ri,
            inner_radius: None,
            ..spec.clone()
        };
        let inner = build_sphere_hull_tube(path, &inner_spec, kernel)?;
        if let Ok(hollow) = kernel.subtract(&mesh, inner.solid.mesh()) {
            mesh = hollow;
        }
    }

    let relabeled = relabel_tube(mesh, path, spec);
    Ok(TubeResult {
        solid: relabeled,
        centerline: path.to_vec(),
        used_slow_path: true,
        self_intersection_suspected: false,
    })
}

fn hull_of_sphere_pair(
    a: &Point3,
    b: &Point3,
    radius: f64,
    segments: u32,
) -> Result<LabeledMesh, BlendError> {
    let mut cloud: Vec<Vec<f64>> = Vec::new();
    for center in [a, b] {
        sphere_cloud(center, radius, segments, &mut cloud);
    }
    let hull = chull::ConvexHullWrapper::try_new(&cloud, None)
        .map_err(|e| BlendError::TubeGenerationFailure(format!("convex hull failed: {e:?}")))?;
    let (verts, indices) = hull.vertices_indices();

    let mut mesh = LabeledMesh::new();
    for tri in indices.chunks(3) {
        let p = |k: usize| Point3::new(verts[tri[k]][0], verts[tri[k]][1], verts[tri[k]][2]);
        mesh.push_triangle(0, p(0), p(1), p(2));
    }
    mesh.fix_windings_by_adjacency();
    Ok(mesh)
}

fn sphere_cloud(center: &Point3, radius: f64, segments: u32, out: &mut Vec<Vec<f64>>) {
    let lat_steps = (segments / 2).max(3);
    let lon_steps = segments.max(6);
    for lat in 0..=lat_steps {
        let phi = std::f64::consts::PI * lat as f64 / lat_steps as f64;
        let (sin_phi, cos_phi) = phi.sin_cos();
        for lon in 0..lon_steps {
            let theta = std::f64::consts::TAU * lon as f64 / lon_steps as f64;
            out.push(vec![
                center.x + radius * sin_phi * theta.cos(),
                center.y + radius * sin_phi * theta.sin(),
                center.z + radius * cos_phi,
            ]);
            if lat == 0 || lat == lat_steps {
                // One point suffices at the poles
                break;
            }
        }
    }
}

/// A box occupying the half-space beyond `point` along `direction`,
/// `extent` deep and `2 × extent` wide.
fn slab_beyond(point: &Point3, direction: &Vec3, extent: f64) -> LabeledMesh {
    let t = *direction;
    let u = any_perpendicular(&t).unwrap_or_else(Vec3::x);
    let v = t.cross(&u);
    let corner = |du: f64, dv: f64, dt: f64| point + du * extent * u + dv * extent * v + dt * t;

    let c = [
        corner(-1.0, -1.0, 0.0),
        corner(1.0, -1.0, 0.0),
        corner(1.0, 1.0, 0.0),
        corner(-1.0, 1.0, 0.0),
        corner(-1.0, -1.0, extent),
        corner(1.0, -1.0, extent),
        corner(1.0, 1.0, extent),
        corner(-1.0, 1.0, extent),
    ];
    const FACES: [[usize; 3]; 12] = [
        [0, 2, 1],
        [0, 3, 2],
        [4, 5, 6],
        [4, 6, 7],
        [0, 1, 5],
        [0, 5, 4],
        [1, 2, 6],
        [1, 6, 5],
        [2, 3, 7],
        [2, 7, 6],
        [3, 0, 4],
        [3, 4, 7],
    ];
    let mut mesh = LabeledMesh::new();
    for f in FACES {
        mesh.push_triangle(0, c[f[0]], c[f[1]], c[f[2]]);
    }
    mesh
}

/// Assign Outer/Inner/CapStart/CapEnd labels: end-plane proximity first,
/// then nearest-to-centerline split when an inner radius exists.
fn relabel_tube(mesh: LabeledMesh, path: &[Point3], spec: &TubeSpec) -> Solid {
    let r = spec.outer_radius;
    let cap_tol = r * 0.05;
    let start = path[0];
    let end = path[path.len() - 1];
    let start_tangent = try_normalize(&(path[1] - path[0]), 1e-12);
    let end_tangent = try_normalize(&(end - path[path.len() - 2]), 1e-12);

    let mut out = LabeledMesh {
        positions: mesh.positions.clone(),
        indices: mesh.indices.clone(),
        labels: Vec::with_capacity(mesh.num_triangles()),
    };
    let split = spec
        .inner_radius
        .map(|ri| (r + ri) * 0.5);

    for t in 0..mesh.num_triangles() {
        let [a, b, c] = mesh.triangle(t);
        let centroid = arris_mesh::triangle_centroid(&a, &b, &c);
        let mut label = 0u32;
        if !spec.closed {
            if let Some(tan) = start_tangent {
                if ((centroid - start).dot(&tan)).abs() < cap_tol {
                    label = 2;
                }
            }
            if let Some(tan) = end_tangent {
                if ((centroid - end).dot(&tan)).abs() < cap_tol {
                    label = 3;
                }
            }
        }
        if label == 0 {
            if let Some(split) = split {
                let d = distance_to_polyline(&centroid, path, spec.closed);
                label = if d < split { 1 } else { 0 };
            }
        }
        out.labels.push(label);
    }

    Solid::from_mesh(
        out,
        vec![
            OUTER.to_string(),
            INNER.to_string(),
            CAP_START.to_string(),
            CAP_END.to_string(),
        ],
    )
}

fn distance_to_polyline(p: &Point3, path: &[Point3], closed: bool) -> f64 {
    let n = path.len();
    let segs = if closed { n } else { n - 1 };
    let mut best = f64::INFINITY;
    for i in 0..segs {
        let a = path[i];
        let b = path[(i + 1) % n];
        let d = segment_distance(p, p, &a, &b);
        best = best.min(d);
    }
    best
}
