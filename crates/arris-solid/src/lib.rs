#![warn(missing_docs)]

//! Solid authoring and query surface for the arris toolkit.
//!
//! [`Solid`] owns a [`LabeledMesh`] plus the face-name bookkeeping the
//! blend engine queries: triangle enumeration per named face, average
//! and local normals, nearest-point projection, face metadata, welding,
//! winding repair, and boolean combination through any [`CsgKernel`].

use std::collections::HashMap;

use arris_csg::{CsgError, CsgKernel};
use arris_math::{Point3, Vec3};
use arris_mesh::{triangle_area, triangle_normal, LabeledMesh};

mod primitives;
mod project;

pub use primitives::{make_box, make_cylinder};
pub use project::closest_point_on_triangle;

/// A solid: a labeled triangle mesh with named faces and per-face
/// metadata.
#[derive(Debug, Clone, Default)]
pub struct Solid {
    mesh: LabeledMesh,
    names: Vec<String>,
    name_to_id: HashMap<String, u32>,
    metadata: HashMap<u32, serde_json::Value>,
    epsilon: f64,
}

impl Solid {
    /// Empty solid.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing mesh, naming its labels in order.
    ///
    /// `names` must cover every label id used by the mesh.
    pub fn from_mesh(mesh: LabeledMesh, names: Vec<String>) -> Self {
        let name_to_id = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i as u32))
            .collect();
        Self {
            mesh,
            names,
            name_to_id,
            metadata: HashMap::new(),
            epsilon: 0.0,
        }
    }

    /// The id for a face name, allocating a new face group on first use.
    pub fn face_id(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.name_to_id.get(name) {
            return id;
        }
        let id = self.names.len() as u32;
        self.names.push(name.to_string());
        self.name_to_id.insert(name.to_string(), id);
        id
    }

    /// The id for an existing face name, if any.
    pub fn lookup_face(&self, name: &str) -> Option<u32> {
        self.name_to_id.get(name).copied()
    }

    /// The name of a face id.
    pub fn face_name(&self, id: u32) -> Option<&str> {
        self.names.get(id as usize).map(|s| s.as_str())
    }

    /// All face names.
    pub fn face_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|s| s.as_str())
    }

    /// Append a triangle to a named face.
    pub fn add_triangle(&mut self, face: &str, p0: Point3, p1: Point3, p2: Point3) {
        let id = self.face_id(face);
        self.mesh.push_triangle(id, p0, p1, p2);
    }

    /// Triangles of a named face.
    pub fn face_triangles(&self, face: &str) -> Vec<[Point3; 3]> {
        let Some(id) = self.lookup_face(face) else {
            return Vec::new();
        };
        (0..self.mesh.num_triangles())
            .filter(|&t| self.mesh.labels[t] == id)
            .map(|t| self.mesh.triangle(t))
            .collect()
    }

    /// Attach metadata to a named face.
    pub fn set_face_metadata(&mut self, face: &str, data: serde_json::Value) {
        let id = self.face_id(face);
        self.metadata.insert(id, data);
    }

    /// Metadata previously attached to a named face.
    pub fn face_metadata(&self, face: &str) -> Option<&serde_json::Value> {
        self.lookup_face(face).and_then(|id| self.metadata.get(&id))
    }

    /// Area-weighted average outward normal of a named face.
    pub fn average_normal(&self, face: &str) -> Option<Vec3> {
        let tris = self.face_triangles(face);
        let mut acc = Vec3::zeros();
        for [a, b, c] in &tris {
            if let Some(n) = triangle_normal(a, b, c) {
                acc += n * triangle_area(a, b, c);
            }
        }
        arris_math::try_normalize(&acc, 1e-12)
    }

    /// Local outward normal of a named face near `at`.
    ///
    /// Distance-weighted blend of the face's triangle normals, so curved
    /// faces report the normal of the region actually nearest the query
    /// point. Falls back to the average normal when the blend degenerates.
    pub fn local_normal(&self, face: &str, at: &Point3) -> Option<Vec3> {
        let tris = self.face_triangles(face);
        if tris.is_empty() {
            return None;
        }
        let scale = self.mesh.bounding_diagonal().max(1e-9);
        let soft = scale * 1e-3;
        let mut acc = Vec3::zeros();
        for [a, b, c] in &tris {
            let Some(n) = triangle_normal(a, b, c) else {
                continue;
            };
            let closest = closest_point_on_triangle(at, a, b, c);
            let d = (at - closest).norm();
            acc += n / (d * d + soft * soft);
        }
        arris_math::try_normalize(&acc, 1e-12).or_else(|| self.average_normal(face))
    }

    /// Nearest point on a named face's triangle set.
    pub fn project_onto_face(&self, face: &str, p: &Point3) -> Option<Point3> {
        let tris = self.face_triangles(face);
        let mut best: Option<(f64, Point3)> = None;
        for [a, b, c] in &tris {
            let q = closest_point_on_triangle(p, a, b, c);
            let d = (p - q).norm_squared();
            if best.map_or(true, |(bd, _)| d < bd) {
                best = Some((d, q));
            }
        }
        best.map(|(_, q)| q)
    }

    /// Farthest extent of a named face from `origin` along `dir`.
    ///
    /// Used by the radius-clamp check: how much face material exists in
    /// the direction a tangency point would move.
    pub fn face_extent_along(&self, face: &str, origin: &Point3, dir: &Vec3) -> Option<f64> {
        let tris = self.face_triangles(face);
        if tris.is_empty() {
            return None;
        }
        let mut extent: f64 = 0.0;
        for tri in &tris {
            for v in tri {
                extent = extent.max((v - origin).dot(dir));
            }
        }
        Some(extent)
    }

    /// Nudge a named face outward along its average normal.
    ///
    /// Detaches the face's triangles onto fresh vertices so the nudge
    /// cannot drag neighboring faces along; the epsilon-sized gap this
    /// opens is below every boolean tolerance in use.
    pub fn push_face(&mut self, face: &str, distance: f64) {
        let Some(id) = self.lookup_face(face) else {
            return;
        };
        let Some(normal) = self.average_normal(face) else {
            return;
        };
        let shift = normal * distance;
        let mut rebuilt = LabeledMesh::new();
        for t in 0..self.mesh.num_triangles() {
            let [a, b, c] = self.mesh.triangle(t);
            if self.mesh.labels[t] == id {
                rebuilt.push_triangle(id, a + shift, b + shift, c + shift);
            } else {
                rebuilt.push_triangle(self.mesh.labels[t], a, b, c);
            }
        }
        self.mesh = rebuilt;
    }

    /// Set the weld epsilon and run weld + degenerate cleanup now.
    pub fn set_epsilon(&mut self, eps: f64) {
        self.epsilon = eps;
        self.mesh = self.mesh.weld(eps).drop_degenerate(eps * eps);
    }

    /// The current weld epsilon (0 when never set).
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Normalize triangle windings by adjacency.
    pub fn fix_triangle_windings_by_adjacency(&mut self) {
        self.mesh.fix_windings_by_adjacency();
    }

    /// Diagonal of the axis-aligned bounding box.
    pub fn bounding_diagonal(&self) -> f64 {
        self.mesh.bounding_diagonal()
    }

    /// Enclosed volume (meaningful for closed, outward-wound solids).
    pub fn volume(&self) -> f64 {
        self.mesh.signed_volume()
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.mesh.num_triangles()
    }

    /// Borrow the underlying mesh.
    pub fn mesh(&self) -> &LabeledMesh {
        &self.mesh
    }

    /// Take the underlying mesh and name table apart.
    pub fn into_parts(self) -> (LabeledMesh, Vec<String>) {
        (self.mesh, self.names)
    }

    // =========================================================================
    // Booleans
    // =========================================================================

    /// `self ∪ other`.
    pub fn union(&self, other: &Solid, kernel: &dyn CsgKernel) -> Result<Solid, CsgError> {
        self.boolean(other, kernel, BoolOp::Union)
    }

    /// `self − other`.
    pub fn subtract(&self, other: &Solid, kernel: &dyn CsgKernel) -> Result<Solid, CsgError> {
        self.boolean(other, kernel, BoolOp::Subtract)
    }

    /// `self ∩ other`.
    pub fn intersect(&self, other: &Solid, kernel: &dyn CsgKernel) -> Result<Solid, CsgError> {
        self.boolean(other, kernel, BoolOp::Intersect)
    }

    /// Raw mesh-merge: index-offset concatenation of both triangle
    /// soups with merged name tables and no boolean logic. Trades
    /// topological correctness for never losing geometry.
    pub fn merge_raw(&self, other: &Solid) -> Solid {
        let (mut out, other_mesh) = self.merged_bookkeeping(other);
        out.mesh.merge(&other_mesh);
        out
    }

    fn boolean(
        &self,
        other: &Solid,
        kernel: &dyn CsgKernel,
        op: BoolOp,
    ) -> Result<Solid, CsgError> {
        let (mut out, other_mesh) = self.merged_bookkeeping(other);
        out.mesh = match op {
            BoolOp::Union => kernel.union(&self.mesh, &other_mesh)?,
            BoolOp::Subtract => kernel.subtract(&self.mesh, &other_mesh)?,
            BoolOp::Intersect => kernel.intersect(&self.mesh, &other_mesh)?,
        };
        Ok(out)
    }

    /// Merge the two solids' label bookkeeping: shift the other
    /// operand's label ids past ours so the two domains stay disjoint,
    /// and rename colliding face names. Returns a result shell (with
    /// this solid's mesh) and the other operand's shifted mesh.
    fn merged_bookkeeping(&self, other: &Solid) -> (Solid, LabeledMesh) {
        let offset = self.names.len() as u32;
        let mut other_mesh = other.mesh.clone();
        for label in &mut other_mesh.labels {
            *label += offset;
        }

        let mut names = self.names.clone();
        let mut name_to_id = self.name_to_id.clone();
        for (i, name) in other.names.iter().enumerate() {
            let mut merged = name.clone();
            while name_to_id.contains_key(&merged) {
                merged.push('\'');
            }
            name_to_id.insert(merged.clone(), offset + i as u32);
            names.push(merged);
        }

        let mut metadata = self.metadata.clone();
        for (&id, data) in &other.metadata {
            metadata.insert(id + offset, data.clone());
        }

        (
            Solid {
                mesh: self.mesh.clone(),
                names,
                name_to_id,
                metadata,
                epsilon: self.epsilon,
            },
            other_mesh,
        )
    }
}

#[derive(Clone, Copy)]
enum BoolOp {
    Union,
    Subtract,
    Intersect,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use arris_csg::BspKernel;

    #[test]
    fn test_box_faces_and_normals() {
        let solid = make_box(2.0, 3.0, 4.0);
        assert_eq!(solid.face_names().count(), 6);
        assert!(solid.mesh().is_closed());
        assert_relative_eq!(solid.volume(), 24.0, epsilon = 1e-9);

        let top = solid.average_normal("TOP").unwrap();
        assert_relative_eq!(top.z, 1.0, epsilon = 1e-12);
        let left = solid.average_normal("LEFT").unwrap();
        assert_relative_eq!(left.x, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_projection_onto_face() {
        let solid = make_box(2.0, 2.0, 2.0);
        let q = solid
            .project_onto_face("TOP", &Point3::new(0.5, 0.5, 5.0))
            .unwrap();
        assert_relative_eq!(q.z, 2.0, epsilon = 1e-12);
        assert_relative_eq!(q.x, 0.5, epsilon = 1e-12);
        // Outside the face: clamps to the boundary
        let q2 = solid
            .project_onto_face("TOP", &Point3::new(5.0, 0.5, 5.0))
            .unwrap();
        assert_relative_eq!(q2.x, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_local_normal_on_cylinder_side() {
        let solid = make_cylinder(1.0, 2.0, 48);
        // Near the +X side of the barrel, the local normal points +X
        let n = solid
            .local_normal("SIDE", &Point3::new(1.0, 0.0, 1.0))
            .unwrap();
        assert!(n.x > 0.95, "local normal should be ~+X, got {n:?}");
        assert!(n.z.abs() < 0.1);
        // The averaged barrel normal cancels out; local stays meaningful
        let top = solid.local_normal("TOP", &Point3::new(0.2, 0.0, 2.0)).unwrap();
        assert_relative_eq!(top.z, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_face_metadata_round_trip() {
        let mut solid = make_box(1.0, 1.0, 1.0);
        solid.set_face_metadata("TOP", serde_json::json!({ "tag": "datum" }));
        assert_eq!(
            solid.face_metadata("TOP").unwrap()["tag"],
            serde_json::json!("datum")
        );
        assert!(solid.face_metadata("BOTTOM").is_none());
    }

    #[test]
    fn test_push_face_moves_only_target() {
        let mut solid = make_box(1.0, 1.0, 1.0);
        solid.push_face("TOP", 0.25);
        let top = solid.face_triangles("TOP");
        for tri in &top {
            for v in tri {
                assert_relative_eq!(v.z, 1.25, epsilon = 1e-12);
            }
        }
        let bottom = solid.face_triangles("BOTTOM");
        for tri in &bottom {
            for v in tri {
                assert_relative_eq!(v.z, 0.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_set_epsilon_welds() {
        let mut solid = make_box(1.0, 1.0, 1.0);
        let before = solid.mesh().num_vertices();
        solid.set_epsilon(1e-6);
        assert!(solid.mesh().num_vertices() < before);
        assert!(solid.mesh().is_closed());
    }

    #[test]
    fn test_boolean_merges_name_tables() {
        let a = make_box(1.0, 1.0, 1.0);
        let mut b = make_box(1.0, 1.0, 1.0);
        b = {
            // shift b so the subtraction carves a corner
            let (mut mesh, names) = b.into_parts();
            for i in 0..mesh.num_vertices() {
                mesh.positions[3 * i] += 0.5;
                mesh.positions[3 * i + 1] += 0.5;
                mesh.positions[3 * i + 2] += 0.5;
            }
            Solid::from_mesh(mesh, names)
        };
        let kernel = BspKernel::new();
        let out = a.subtract(&b, &kernel).unwrap();
        assert_relative_eq!(out.volume(), 1.0 - 0.125, epsilon = 1e-6);
        // Both operands' names survive, disjoint
        assert_eq!(out.face_names().count(), 12);
        // Cut faces carry the tool's labels
        assert!(!out.face_triangles("BOTTOM'").is_empty());
    }

    #[test]
    fn test_face_extent_along() {
        let solid = make_box(2.0, 1.0, 1.0);
        let extent = solid
            .face_extent_along("TOP", &Point3::new(0.0, 0.5, 1.0), &Vec3::x())
            .unwrap();
        assert_relative_eq!(extent, 2.0, epsilon = 1e-12);
    }
}
