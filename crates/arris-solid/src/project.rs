//! Point-to-triangle projection.

use arris_math::Point3;

/// Closest point to `p` on triangle `(a, b, c)`.
///
/// Voronoi-region walk: test the vertex, edge, and face regions in turn
/// and clamp barycentric coordinates accordingly.
pub fn closest_point_on_triangle(p: &Point3, a: &Point3, b: &Point3, c: &Point3) -> Point3 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return *a;
    }

    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return *b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let denom = d1 - d3;
        let t = if denom.abs() > 1e-30 { d1 / denom } else { 0.0 };
        return a + t * ab;
    }

    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return *c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let denom = d2 - d6;
        let t = if denom.abs() > 1e-30 { d2 / denom } else { 0.0 };
        return a + t * ac;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let denom = (d4 - d3) + (d5 - d6);
        let t = if denom.abs() > 1e-30 {
            (d4 - d3) / denom
        } else {
            0.0
        };
        return b + t * (c - b);
    }

    let denom = va + vb + vc;
    if denom.abs() < 1e-30 {
        // Degenerate triangle: fall back to the nearest corner
        let da = (p - a).norm_squared();
        let db = (p - b).norm_squared();
        let dc = (p - c).norm_squared();
        return if da <= db && da <= dc {
            *a
        } else if db <= dc {
            *b
        } else {
            *c
        };
    }
    let v = vb / denom;
    let w = vc / denom;
    a + v * ab + w * ac
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_interior_projection() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(4.0, 0.0, 0.0);
        let c = Point3::new(0.0, 4.0, 0.0);
        let q = closest_point_on_triangle(&Point3::new(1.0, 1.0, 3.0), &a, &b, &c);
        assert_relative_eq!(q.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(q.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(q.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_edge_and_vertex_clamping() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(4.0, 0.0, 0.0);
        let c = Point3::new(0.0, 4.0, 0.0);
        // Below the ab edge
        let q = closest_point_on_triangle(&Point3::new(2.0, -1.0, 0.0), &a, &b, &c);
        assert_relative_eq!(q.y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(q.x, 2.0, epsilon = 1e-12);
        // Beyond vertex b
        let q2 = closest_point_on_triangle(&Point3::new(9.0, -1.0, 0.0), &a, &b, &c);
        assert_relative_eq!((q2 - b).norm(), 0.0, epsilon = 1e-12);
    }
}
