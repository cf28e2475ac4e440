#![warn(missing_docs)]

//! Math types for the arris mesh CAD kernel.
//!
//! Thin wrappers around nalgebra providing domain-specific types for
//! discrete 3D geometry: points, vectors, directions, edge-local section
//! frames, best-fit planes, and the scale-adaptive tolerance model used
//! by every stage of the blend engine.

use nalgebra::{Unit, Vector2, Vector3};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A point in 2D section/parameter space.
pub type Point2 = nalgebra::Point2<f64>;

/// A vector in 2D space.
pub type Vec2 = Vector2<f64>;

/// Linear interpolation between two points.
pub fn lerp_point(a: &Point3, b: &Point3, t: f64) -> Point3 {
    Point3::new(
        a.x + t * (b.x - a.x),
        a.y + t * (b.y - a.y),
        a.z + t * (b.z - a.z),
    )
}

/// Pick an arbitrary unit vector perpendicular to `v`.
///
/// Returns `None` when `v` is (near) zero length.
pub fn any_perpendicular(v: &Vec3) -> Option<Vec3> {
    let len = v.norm();
    if len < 1e-15 {
        return None;
    }
    let n = v / len;
    // Cross against whichever axis is least aligned with n
    let arbitrary = if n.x.abs() < 0.9 { Vec3::x() } else { Vec3::y() };
    let perp = arbitrary.cross(&n);
    let plen = perp.norm();
    if plen < 1e-12 {
        None
    } else {
        Some(perp / plen)
    }
}

/// Normalize a vector, returning `None` for (near) zero input instead of NaN.
pub fn try_normalize(v: &Vec3, min_len: f64) -> Option<Vec3> {
    let len = v.norm();
    if len < min_len {
        None
    } else {
        Some(v / len)
    }
}

// =============================================================================
// Tolerance
// =============================================================================

/// Scale-adaptive tolerances for geometric comparisons.
///
/// Every tolerance is derived per call from the model's bounding diagonal
/// and the requested feature size (radius or chamfer distance), so the
/// same code behaves identically on millimeter- and meter-scale models.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Distance below which two vertices are treated as coincident.
    pub weld: f64,
    /// Acceptable residual when re-projecting a point onto a face.
    pub projection: f64,
    /// Minimum `sin(angle/2)` for a dihedral angle to be solvable.
    pub angle: f64,
}

impl Tolerance {
    /// Derive tolerances for an operation on a model with the given
    /// bounding diagonal and feature size (radius or offset distance).
    pub fn derive(bounding_diagonal: f64, feature_size: f64) -> Self {
        let scale = bounding_diagonal.max(feature_size.abs()).max(1e-9);
        Self {
            weld: scale * 1e-7,
            projection: feature_size.abs().max(scale * 1e-3) * 1e-2,
            angle: 1e-3,
        }
    }

    /// Check if two points are coincident within the weld tolerance.
    pub fn points_equal(&self, a: &Point3, b: &Point3) -> bool {
        (a - b).norm() < self.weld
    }

    /// Check if a scalar distance is effectively zero.
    pub fn is_zero(&self, d: f64) -> bool {
        d.abs() < self.weld
    }
}

// =============================================================================
// Section frame
// =============================================================================

/// An edge-local 2D coordinate frame for cross-section solves.
///
/// The tangent is the out-of-plane axis; `u` and `v` span the section
/// plane, with `u = normal_a × tangent` and `v = tangent × u`.
#[derive(Debug, Clone)]
pub struct SectionFrame {
    /// Section origin (the edge sample point).
    pub origin: Point3,
    /// In-plane u axis.
    pub u: Vec3,
    /// In-plane v axis.
    pub v: Vec3,
    /// Out-of-plane axis (the edge tangent).
    pub tangent: Vec3,
}

impl SectionFrame {
    /// Build a section frame at `origin` from a unit tangent and the first
    /// face's normal. Returns `None` when the normal is parallel to the
    /// tangent (no well-defined section plane).
    pub fn new(origin: Point3, tangent: Vec3, normal_a: Vec3) -> Option<Self> {
        let u = try_normalize(&normal_a.cross(&tangent), 1e-10)?;
        let v = try_normalize(&tangent.cross(&u), 1e-10)?;
        Some(Self {
            origin,
            u,
            v,
            tangent,
        })
    }

    /// Project a world-space point into the section plane.
    pub fn to_plane(&self, p: &Point3) -> Point2 {
        let d = p - self.origin;
        Point2::new(d.dot(&self.u), d.dot(&self.v))
    }

    /// Project a world-space vector into the section plane.
    pub fn vec_to_plane(&self, w: &Vec3) -> Vec2 {
        Vec2::new(w.dot(&self.u), w.dot(&self.v))
    }

    /// Lift a section-plane point back to world space.
    pub fn to_world(&self, p: &Point2) -> Point3 {
        self.origin + p.x * self.u + p.y * self.v
    }
}

// =============================================================================
// Best-fit plane
// =============================================================================

/// A plane fitted to a point set, with an in-plane basis.
#[derive(Debug, Clone)]
pub struct FitPlane {
    /// Centroid of the fitted points.
    pub origin: Point3,
    /// Unit plane normal.
    pub normal: Vec3,
    /// In-plane u axis.
    pub u: Vec3,
    /// In-plane v axis.
    pub v: Vec3,
}

impl FitPlane {
    /// Project a point into the plane's (u, v) coordinates.
    pub fn project(&self, p: &Point3) -> Point2 {
        let d = p - self.origin;
        Point2::new(d.dot(&self.u), d.dot(&self.v))
    }
}

/// Fit a plane to a polyline using Newell's method over the implied loop.
///
/// For nearly collinear input the Newell normal degenerates; the fallback
/// takes the dominant segment direction and an arbitrary perpendicular so
/// callers always get *some* plane containing the points' general run.
pub fn best_fit_plane(points: &[Point3]) -> Option<FitPlane> {
    if points.len() < 3 {
        return None;
    }
    let n = points.len();
    let mut centroid = Vec3::zeros();
    for p in points {
        centroid += p.coords;
    }
    let origin = Point3::from(centroid / n as f64);

    let mut normal = Vec3::zeros();
    for i in 0..n {
        let curr = points[i];
        let next = points[(i + 1) % n];
        normal.x += (curr.y - next.y) * (curr.z + next.z);
        normal.y += (curr.z - next.z) * (curr.x + next.x);
        normal.z += (curr.x - next.x) * (curr.y + next.y);
    }

    let run = points[n - 1] - points[0];
    let normal = match try_normalize(&normal, 1e-12) {
        Some(nrm) => nrm,
        // Collinear points: any plane containing the run direction works
        None => any_perpendicular(&run).or_else(|| any_perpendicular(&Vec3::z()))?,
    };

    let u = try_normalize(&(&run - run.dot(&normal) * normal), 1e-12)
        .or_else(|| any_perpendicular(&normal))?;
    let v = normal.cross(&u);
    Some(FitPlane {
        origin,
        normal,
        u,
        v,
    })
}
