//! Primitive solid constructors.
//!
//! Explicit vertex tables with outward-normal winding; faces are named
//! so downstream features can address them.

use arris_math::Point3;

use crate::Solid;

/// Axis-aligned box with corner at the origin and dimensions
/// `(sx, sy, sz)`. Faces: `BOTTOM`, `TOP`, `FRONT`, `BACK`, `LEFT`,
/// `RIGHT`.
pub fn make_box(sx: f64, sy: f64, sz: f64) -> Solid {
    let p = Point3::new;
    let mut solid = Solid::new();

    solid.add_triangle("BOTTOM", p(0.0, 0.0, 0.0), p(sx, sy, 0.0), p(sx, 0.0, 0.0));
    solid.add_triangle("BOTTOM", p(0.0, 0.0, 0.0), p(0.0, sy, 0.0), p(sx, sy, 0.0));
    solid.add_triangle("TOP", p(0.0, 0.0, sz), p(sx, 0.0, sz), p(sx, sy, sz));
    solid.add_triangle("TOP", p(0.0, 0.0, sz), p(sx, sy, sz), p(0.0, sy, sz));
    solid.add_triangle("FRONT", p(0.0, 0.0, 0.0), p(sx, 0.0, 0.0), p(sx, 0.0, sz));
    solid.add_triangle("FRONT", p(0.0, 0.0, 0.0), p(sx, 0.0, sz), p(0.0, 0.0, sz));
    solid.add_triangle("BACK", p(0.0, sy, 0.0), p(sx, sy, sz), p(sx, sy, 0.0));
    solid.add_triangle("BACK", p(0.0, sy, 0.0), p(0.0, sy, sz), p(sx, sy, sz));
    solid.add_triangle("LEFT", p(0.0, 0.0, 0.0), p(0.0, 0.0, sz), p(0.0, sy, sz));
    solid.add_triangle("LEFT", p(0.0, 0.0, 0.0), p(0.0, sy, sz), p(0.0, sy, 0.0));
    solid.add_triangle("RIGHT", p(sx, 0.0, 0.0), p(sx, sy, sz), p(sx, 0.0, sz));
    solid.add_triangle("RIGHT", p(sx, 0.0, 0.0), p(sx, sy, 0.0), p(sx, sy, sz));

    solid
}

/// Cylinder along +Z from the origin, radius `r`, height `h`, with
/// `segments` facets. Faces: `SIDE`, `TOP`, `BOTTOM`.
pub fn make_cylinder(r: f64, h: f64, segments: u32) -> Solid {
    let segments = segments.max(3);
    let mut solid = Solid::new();

    let ring: Vec<(f64, f64)> = (0..segments)
        .map(|i| {
            let theta = std::f64::consts::TAU * i as f64 / segments as f64;
            (r * theta.cos(), r * theta.sin())
        })
        .collect();

    let bottom_center = Point3::new(0.0, 0.0, 0.0);
    let top_center = Point3::new(0.0, 0.0, h);

    for i in 0..segments as usize {
        let j = (i + 1) % segments as usize;
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        let b_i = Point3::new(xi, yi, 0.0);
        let b_j = Point3::new(xj, yj, 0.0);
        let t_i = Point3::new(xi, yi, h);
        let t_j = Point3::new(xj, yj, h);

        solid.add_triangle("SIDE", b_i, b_j, t_j);
        solid.add_triangle("SIDE", b_i, t_j, t_i);
        solid.add_triangle("TOP", top_center, t_i, t_j);
        solid.add_triangle("BOTTOM", bottom_center, b_j, b_i);
    }

    solid
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_box_is_closed_with_positive_volume() {
        let solid = make_box(1.0, 2.0, 3.0);
        assert!(solid.mesh().is_closed());
        assert_relative_eq!(solid.volume(), 6.0, epsilon = 1e-9);
    }

    #[test]
    fn test_cylinder_volume_approaches_exact() {
        let solid = make_cylinder(1.0, 2.0, 64);
        assert!(solid.mesh().is_closed());
        let exact = PI * 2.0;
        let vol = solid.volume();
        assert!(
            vol < exact && vol > exact * 0.99,
            "inscribed prism volume {vol} vs {exact}"
        );
    }
}
