//! Wedge and prism tool-solid construction.
//!
//! Stitches the solved polylines into closed triangle meshes ready for
//! boolean combination. Chamfer prisms span edge + two rails; fillet
//! wedges span edge + two tangency curves + centerline. Triangles whose
//! area falls below the feature-scaled threshold are rejected and
//! counted; a build that rejects everything reports failure so the
//! caller can return diagnostics instead of a broken solid.

use arris_math::Point3;
use arris_solid::Solid;

use crate::circle::Centerline;
use crate::error::BlendError;
use crate::rail::RailTriple;

/// Face-family suffixes shared by both builders.
pub const SIDE_A: &str = "SIDE_A";
/// See [`SIDE_A`].
pub const SIDE_B: &str = "SIDE_B";
/// Bevel face family of a chamfer prism.
pub const BEVEL: &str = "BEVEL";
/// Fillet wedge strip between centerline and tangency A.
pub const WEDGE_A: &str = "WEDGE_A";
/// Fillet wedge strip between centerline and tangency B.
pub const WEDGE_B: &str = "WEDGE_B";
/// Start cap family.
pub const CAP0: &str = "CAP0";
/// End cap family.
pub const CAP1: &str = "CAP1";

struct TriangleSink {
    solid: Solid,
    min_area: f64,
    emitted: usize,
    rejected: usize,
}

impl TriangleSink {
    fn new(min_area: f64) -> Self {
        Self {
            solid: Solid::new(),
            min_area,
            emitted: 0,
            rejected: 0,
        }
    }

    fn triangle(&mut self, label: &str, p0: Point3, p1: Point3, p2: Point3) {
        if arris_mesh::triangle_area(&p0, &p1, &p2) < self.min_area {
            self.rejected += 1;
            return;
        }
        self.solid.add_triangle(label, p0, p1, p2);
        self.emitted += 1;
    }

    fn quad(&mut self, label: &str, p0: Point3, p1: Point3, p2: Point3, p3: Point3) {
        self.triangle(label, p0, p1, p2);
        self.triangle(label, p0, p2, p3);
    }

    fn finish(self, push_sides: Option<f64>, base: &str) -> Result<Solid, BlendError> {
        if self.emitted == 0 {
            return Err(BlendError::WedgeTriangulationFailure {
                rejected: self.rejected,
            });
        }
        let mut solid = self.solid;
        solid.fix_triangle_windings_by_adjacency();
        if let Some(eps) = push_sides {
            // Side walls sit flush against original solid faces; nudge
            // them out so the boolean never sees coincident geometry
            solid.push_face(&family(base, SIDE_A), eps);
            solid.push_face(&family(base, SIDE_B), eps);
        }
        Ok(solid)
    }
}

/// `<base>_<suffix>` face-family name.
pub fn family(base: &str, suffix: &str) -> String {
    format!("{base}_{suffix}")
}

/// Stitch a chamfer prism from a rail triple.
///
/// Quads between edge/rail pairs become `SIDE_A`/`SIDE_B`, the rail-to-
/// rail face becomes `BEVEL`; open edges get triangle caps `CAP0`/`CAP1`.
pub fn build_chamfer_prism(
    base: &str,
    triple: &RailTriple,
    distance: f64,
    push_sides: Option<f64>,
) -> Result<Solid, BlendError> {
    let n = triple.edge_points.len();
    if n < 2 {
        return Err(BlendError::WedgeTriangulationFailure { rejected: 0 });
    }
    let mut sink = TriangleSink::new(distance * distance * 1e-8);

    let e = &triple.edge_points;
    let a = &triple.rail_a;
    let b = &triple.rail_b;

    // Closed triples arrive wrap-duplicated, so consecutive pairs cover
    // the loop either way
    for i in 0..n - 1 {
        let j = i + 1;
        sink.quad(&family(base, SIDE_A), e[i], e[j], a[j], a[i]);
        sink.quad(&family(base, SIDE_B), e[i], e[j], b[j], b[i]);
        sink.quad(&family(base, BEVEL), a[i], a[j], b[j], b[i]);
    }

    if !triple.closed {
        sink.triangle(&family(base, CAP0), e[0], a[0], b[0]);
        sink.triangle(&family(base, CAP1), e[n - 1], b[n - 1], a[n - 1]);
    }

    sink.finish(push_sides, base)
}

/// Stitch a fillet wedge from a solved centerline.
///
/// Closed loops produce the four strips `SIDE_A`, `WEDGE_A`, `WEDGE_B`,
/// `SIDE_B`; open edges add two triangulated end caps.
pub fn build_fillet_wedge(
    base: &str,
    centerline: &Centerline,
    radius: f64,
    push_sides: Option<f64>,
) -> Result<Solid, BlendError> {
    let n = centerline.points.len();
    if n < 2 {
        return Err(BlendError::WedgeTriangulationFailure { rejected: 0 });
    }
    let mut sink = TriangleSink::new(radius * radius * 1e-8);

    let c = &centerline.points;
    let ta = &centerline.tangency_a;
    let tb = &centerline.tangency_b;
    let e = &centerline.edge_points;

    for i in 0..n - 1 {
        let j = i + 1;
        sink.quad(&family(base, SIDE_A), e[i], e[j], ta[j], ta[i]);
        sink.quad(&family(base, WEDGE_A), ta[i], ta[j], c[j], c[i]);
        sink.quad(&family(base, WEDGE_B), c[i], c[j], tb[j], tb[i]);
        sink.quad(&family(base, SIDE_B), tb[i], tb[j], e[j], e[i]);
    }

    if !centerline.closed {
        sink.triangle(&family(base, CAP0), e[0], ta[0], c[0]);
        sink.triangle(&family(base, CAP0), e[0], c[0], tb[0]);
        let k = n - 1;
        sink.triangle(&family(base, CAP1), e[k], c[k], ta[k]);
        sink.triangle(&family(base, CAP1), e[k], tb[k], c[k]);
    }

    sink.finish(push_sides, base)
}
