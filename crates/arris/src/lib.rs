#![warn(missing_docs)]

//! arris: a mesh CAD toolkit with parametric edge rounding.
//!
//! Re-exports the kernel crates and adds the convenience edge-feature
//! methods on [`Solid`].
//!
//! # Example
//!
//! ```
//! use arris::{make_box, BlendConfig, BlendEdge, BspKernel, EdgeFeatures, Point3};
//!
//! let block = make_box(10.0, 10.0, 10.0);
//! let edge = BlendEdge::between_faces(
//!     vec![
//!         Point3::new(10.0, 0.0, 10.0),
//!         Point3::new(10.0, 5.0, 10.0),
//!         Point3::new(10.0, 10.0, 10.0),
//!     ],
//!     false,
//!     "TOP",
//!     "RIGHT",
//! );
//! let kernel = BspKernel::new();
//! let outcome = block.fillet_edge(&edge, 1.0, &BlendConfig::default(), &kernel);
//! assert!(outcome.final_solid.is_some());
//! ```

pub use arris_blend;
pub use arris_csg;
pub use arris_math;
pub use arris_mesh;
pub use arris_solid;

pub use arris_blend::{
    chamfer_solid, fillet_centerline, fillet_solid, BlendConfig, BlendEdge, BlendError,
    Centerline, ChamferOutcome, ChamferRequest, EdgeFaces, FacePair, FaceRef, FilletOutcome,
    FilletRequest, SideMode, TubeStrategy,
};
pub use arris_csg::{BspKernel, CsgError, CsgKernel};
pub use arris_math::{Point3, Vec3};
pub use arris_mesh::LabeledMesh;
pub use arris_solid::{make_box, make_cylinder, Solid};

/// Edge-modification convenience methods on [`Solid`].
pub trait EdgeFeatures {
    /// Round an edge at the given radius.
    fn fillet_edge(
        &self,
        edge: &BlendEdge,
        radius: f64,
        config: &BlendConfig,
        kernel: &dyn CsgKernel,
    ) -> FilletOutcome;

    /// Bevel an edge at the given offset distance.
    fn chamfer_edge(
        &self,
        edge: &BlendEdge,
        distance: f64,
        config: &BlendConfig,
        kernel: &dyn CsgKernel,
    ) -> ChamferOutcome;
}

impl EdgeFeatures for Solid {
    fn fillet_edge(
        &self,
        edge: &BlendEdge,
        radius: f64,
        config: &BlendConfig,
        kernel: &dyn CsgKernel,
    ) -> FilletOutcome {
        let request = FilletRequest {
            edge: edge.clone(),
            radius,
            config: config.clone(),
        };
        fillet_solid(self, &request, kernel)
    }

    fn chamfer_edge(
        &self,
        edge: &BlendEdge,
        distance: f64,
        config: &BlendConfig,
        kernel: &dyn CsgKernel,
    ) -> ChamferOutcome {
        let request = ChamferRequest::new(edge.clone(), distance, config.clone());
        chamfer_solid(self, &request, kernel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facade_chamfer_round_trip() {
        let block = make_box(8.0, 8.0, 8.0);
        let edge = BlendEdge::between_faces(
            vec![
                Point3::new(8.0, 0.0, 8.0),
                Point3::new(8.0, 4.0, 8.0),
                Point3::new(8.0, 8.0, 8.0),
            ],
            false,
            "TOP",
            "RIGHT",
        );
        let kernel = BspKernel::new();
        let outcome = block.chamfer_edge(&edge, 0.5, &BlendConfig::default(), &kernel);
        assert!(outcome.error.is_none());
        let result = outcome.final_solid.unwrap();
        assert!(result.volume() < block.volume());
    }
}
