#![warn(missing_docs)]

//! Boolean CSG kernel seam for the arris toolkit.
//!
//! The blend engine talks to *a* boolean kernel, not *the* boolean
//! kernel: [`CsgKernel`] is the trait every backend implements, and
//! [`BspKernel`] is the default in-tree implementation based on BSP
//! clipping. A browser host may install a different backend (e.g. an
//! asynchronously initialized native module) without touching the core.
//!
//! Every backend must propagate the originating face-label id of each
//! output triangle. Label-id domains of the two operands are assumed
//! disjoint; merging them beforehand is the caller's job.

use arris_mesh::LabeledMesh;
use thiserror::Error;

mod bsp;

/// Errors a boolean backend can report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CsgError {
    /// An operand had no triangles where the operation requires one.
    #[error("boolean operand is empty")]
    EmptyOperand,

    /// The backend produced unusable output (empty or non-finite) from
    /// non-degenerate input.
    #[error("boolean produced a degenerate result: {0}")]
    DegenerateResult(String),
}

/// A boolean CSG backend over labeled triangle meshes.
pub trait CsgKernel {
    /// `a ∪ b`.
    fn union(&self, a: &LabeledMesh, b: &LabeledMesh) -> Result<LabeledMesh, CsgError>;

    /// `a − b`.
    fn subtract(&self, a: &LabeledMesh, b: &LabeledMesh) -> Result<LabeledMesh, CsgError>;

    /// `a ∩ b`.
    fn intersect(&self, a: &LabeledMesh, b: &LabeledMesh) -> Result<LabeledMesh, CsgError>;
}

/// The default boolean backend: BSP-tree clipping.
///
/// Input meshes are welded (the explicit "merge" step that populates
/// duplicate-vertex bookkeeping) before tree construction. Each polygon
/// carries its face label through every split, so provenance survives
/// the operation.
#[derive(Debug, Clone)]
pub struct BspKernel {
    /// Distance below which a vertex is treated as lying on a splitting
    /// plane.
    plane_epsilon: f64,
}

impl Default for BspKernel {
    fn default() -> Self {
        Self {
            plane_epsilon: 1e-6,
        }
    }
}

impl BspKernel {
    /// Backend with the default plane tolerance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend with an explicit plane tolerance (scale it to the model).
    pub fn with_epsilon(plane_epsilon: f64) -> Self {
        Self { plane_epsilon }
    }

    fn prepare(&self, mesh: &LabeledMesh) -> Vec<bsp::Polygon> {
        let welded = mesh.weld(self.plane_epsilon * 0.5);
        bsp::polygons_from_mesh(&welded)
    }

    fn finish(&self, polygons: Vec<bsp::Polygon>) -> Result<LabeledMesh, CsgError> {
        let mesh = bsp::mesh_from_polygons(&polygons);
        if mesh.positions.iter().any(|c| !c.is_finite()) {
            return Err(CsgError::DegenerateResult(
                "non-finite coordinates".to_string(),
            ));
        }
        Ok(mesh)
    }
}

impl CsgKernel for BspKernel {
    fn union(&self, a: &LabeledMesh, b: &LabeledMesh) -> Result<LabeledMesh, CsgError> {
        if a.num_triangles() == 0 {
            return Ok(b.clone());
        }
        if b.num_triangles() == 0 {
            return Ok(a.clone());
        }
        let mut na = bsp::Node::from_polygons(self.prepare(a), self.plane_epsilon);
        let mut nb = bsp::Node::from_polygons(self.prepare(b), self.plane_epsilon);
        na.clip_to(&nb);
        nb.clip_to(&na);
        nb.invert();
        nb.clip_to(&na);
        nb.invert();
        na.build(nb.all_polygons());
        let result = self.finish(na.all_polygons())?;
        if result.num_triangles() == 0 {
            return Err(CsgError::DegenerateResult(
                "union of non-empty operands is empty".to_string(),
            ));
        }
        Ok(result)
    }

    fn subtract(&self, a: &LabeledMesh, b: &LabeledMesh) -> Result<LabeledMesh, CsgError> {
        if a.num_triangles() == 0 {
            return Err(CsgError::EmptyOperand);
        }
        if b.num_triangles() == 0 {
            return Ok(a.clone());
        }
        let mut na = bsp::Node::from_polygons(self.prepare(a), self.plane_epsilon);
        let mut nb = bsp::Node::from_polygons(self.prepare(b), self.plane_epsilon);
        na.invert();
        na.clip_to(&nb);
        nb.clip_to(&na);
        nb.invert();
        nb.clip_to(&na);
        nb.invert();
        na.build(nb.all_polygons());
        na.invert();
        self.finish(na.all_polygons())
    }

    fn intersect(&self, a: &LabeledMesh, b: &LabeledMesh) -> Result<LabeledMesh, CsgError> {
        if a.num_triangles() == 0 || b.num_triangles() == 0 {
            return Err(CsgError::EmptyOperand);
        }
        let mut na = bsp::Node::from_polygons(self.prepare(a), self.plane_epsilon);
        let mut nb = bsp::Node::from_polygons(self.prepare(b), self.plane_epsilon);
        na.invert();
        nb.clip_to(&na);
        nb.invert();
        na.clip_to(&nb);
        nb.clip_to(&na);
        na.build(nb.all_polygons());
        na.invert();
        self.finish(na.all_polygons())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use arris_math::{Point3, Vec3};

    fn box_mesh(origin: Point3, size: Vec3, label_base: u32) -> LabeledMesh {
        let (x0, y0, z0) = (origin.x, origin.y, origin.z);
        let (x1, y1, z1) = (x0 + size.x, y0 + size.y, z0 + size.z);
        let p = Point3::new;
        let mut mesh = LabeledMesh::new();
        let l = |k: u32| label_base + k;
        mesh.push_triangle(l(0), p(x0, y0, z0), p(x1, y1, z0), p(x1, y0, z0));
        mesh.push_triangle(l(0), p(x0, y0, z0), p(x0, y1, z0), p(x1, y1, z0));
        mesh.push_triangle(l(1), p(x0, y0, z1), p(x1, y0, z1), p(x1, y1, z1));
        mesh.push_triangle(l(1), p(x0, y0, z1), p(x1, y1, z1), p(x0, y1, z1));
        mesh.push_triangle(l(2), p(x0, y0, z0), p(x1, y0, z0), p(x1, y0, z1));
        mesh.push_triangle(l(2), p(x0, y0, z0), p(x1, y0, z1), p(x0, y0, z1));
        mesh.push_triangle(l(3), p(x0, y1, z0), p(x1, y1, z1), p(x1, y1, z0));
        mesh.push_triangle(l(3), p(x0, y1, z0), p(x0, y1, z1), p(x1, y1, z1));
        mesh.push_triangle(l(4), p(x0, y0, z0), p(x0, y0, z1), p(x0, y1, z1));
        mesh.push_triangle(l(4), p(x0, y0, z0), p(x0, y1, z1), p(x0, y1, z0));
        mesh.push_triangle(l(5), p(x1, y0, z0), p(x1, y1, z1), p(x1, y0, z1));
        mesh.push_triangle(l(5), p(x1, y0, z0), p(x1, y1, z0), p(x1, y1, z1));
        mesh
    }

    #[test]
    fn test_union_of_overlapping_boxes() {
        let a = box_mesh(Point3::origin(), Vec3::new(1.0, 1.0, 1.0), 0);
        let b = box_mesh(Point3::new(0.5, 0.25, 0.25), Vec3::new(1.0, 0.5, 0.5), 10);
        let kernel = BspKernel::new();
        let out = kernel.union(&a, &b).unwrap();
        // 1.0 + 0.25 − overlap(0.5·0.5·0.5)
        assert_relative_eq!(out.signed_volume(), 1.125, epsilon = 1e-6);
    }

    #[test]
    fn test_subtract_carves_overlap() {
        let a = box_mesh(Point3::origin(), Vec3::new(1.0, 1.0, 1.0), 0);
        let b = box_mesh(Point3::new(0.5, -0.5, -0.5), Vec3::new(1.0, 2.0, 2.0), 10);
        let kernel = BspKernel::new();
        let out = kernel.subtract(&a, &b).unwrap();
        assert_relative_eq!(out.signed_volume(), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_intersect_keeps_overlap() {
        let a = box_mesh(Point3::origin(), Vec3::new(1.0, 1.0, 1.0), 0);
        let b = box_mesh(Point3::new(0.5, -0.5, -0.5), Vec3::new(1.0, 2.0, 2.0), 10);
        let kernel = BspKernel::new();
        let out = kernel.intersect(&a, &b).unwrap();
        assert_relative_eq!(out.signed_volume(), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_labels_survive_subtract() {
        let a = box_mesh(Point3::origin(), Vec3::new(1.0, 1.0, 1.0), 0);
        let b = box_mesh(Point3::new(0.5, -0.5, -0.5), Vec3::new(1.0, 2.0, 2.0), 10);
        let kernel = BspKernel::new();
        let out = kernel.subtract(&a, &b).unwrap();
        assert!(out.labels.iter().all(|&l| l <= 5 || (10..=15).contains(&l)));
        // Cut faces come from the tool's labels
        assert!(out.labels.iter().any(|&l| l >= 10));
        assert!(out.labels.iter().any(|&l| l <= 5));
    }

    #[test]
    fn test_union_with_empty_operand() {
        let a = box_mesh(Point3::origin(), Vec3::new(1.0, 1.0, 1.0), 0);
        let kernel = BspKernel::new();
        let out = kernel.union(&a, &LabeledMesh::new()).unwrap();
        assert_eq!(out.num_triangles(), a.num_triangles());
        assert!(matches!(
            kernel.intersect(&a, &LabeledMesh::new()),
            Err(CsgError::EmptyOperand)
        ));
    }

    #[test]
    fn test_subtract_disjoint_leaves_target() {
        let a = box_mesh(Point3::origin(), Vec3::new(1.0, 1.0, 1.0), 0);
        let b = box_mesh(Point3::new(5.0, 5.0, 5.0), Vec3::new(1.0, 1.0, 1.0), 10);
        let kernel = BspKernel::new();
        let out = kernel.subtract(&a, &b).unwrap();
        assert_relative_eq!(out.signed_volume(), 1.0, epsilon = 1e-6);
        assert!(out.labels.iter().all(|&l| l <= 5));
    }
}
