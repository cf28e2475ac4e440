//! Boolean combination with escalating repair.
//!
//! The direct boolean runs first. On failure, up to three repair
//! attempts rebuild welded, gap-patched copies of both operands at an
//! escalating weld tolerance (×4 per attempt) and retry. A union that
//! still fails falls back to a raw mesh-merge plus repair; anything
//! else passes the target through unchanged with the error recorded,
//! so the caller's pipeline never aborts.

use arris_csg::CsgKernel;
use arris_mesh::{patch_gaps, triangle_centroid, triangle_normal};
use arris_solid::Solid;

use crate::config::BlendConfig;
use crate::error::BlendError;

/// Synthetic face label for repaired triangles with no confident match.
pub const RECOVERED: &str = "RECOVERED";

/// What a combination did to produce its result.
#[derive(Debug, Clone)]
pub struct CombineOutcome {
    /// The combined (or passed-through) solid.
    pub solid: Solid,
    /// Repair attempts consumed (0 = direct boolean succeeded).
    pub attempts: u32,
    /// Whether the raw mesh-merge last resort produced the result.
    pub used_raw_merge: bool,
    /// Whether the target was passed through unchanged.
    pub passed_through: bool,
    /// The failure that exhausted the retries, if any.
    pub error: Option<BlendError>,
}

#[derive(Clone, Copy, PartialEq)]
enum Op {
    Union,
    Subtract,
}

/// `a − b` with escalating repair.
pub fn subtract_with_repair(
    a: &Solid,
    b: &Solid,
    kernel: &dyn CsgKernel,
    config: &BlendConfig,
) -> CombineOutcome {
    combine(a, b, kernel, config, Op::Subtract)
}

/// `a ∪ b` with escalating repair and the raw-merge last resort.
pub fn union_with_repair(
    a: &Solid,
    b: &Solid,
    kernel: &dyn CsgKernel,
    config: &BlendConfig,
) -> CombineOutcome {
    combine(a, b, kernel, config, Op::Union)
}

fn combine(
    a: &Solid,
    b: &Solid,
    kernel: &dyn CsgKernel,
    config: &BlendConfig,
    op: Op,
) -> CombineOutcome {
    let mut last_error = match apply(a, b, kernel, op) {
        Ok(solid) => {
            return CombineOutcome {
                solid,
                attempts: 0,
                used_raw_merge: false,
                passed_through: false,
                error: None,
            }
        }
        Err(e) => e,
    };

    let base_eps = {
        let from_solid = if a.epsilon() > 0.0 {
            a.epsilon() * 10.0
        } else {
            a.bounding_diagonal().max(b.bounding_diagonal()) * 1e-6
        };
        from_solid.max(1e-5)
    };

    let mut attempts = 0;
    while attempts < config.max_boolean_attempts {
        let eps = base_eps * 4f64.powi(attempts as i32);
        attempts += 1;
        log::debug!("boolean retry {attempts} at weld tolerance {eps:.2e}");
        let ra = repaired_copy(a, eps);
        let rb = repaired_copy(b, eps);
        match apply(&ra, &rb, kernel, op) {
            Ok(solid) => {
                return CombineOutcome {
                    solid,
                    attempts,
                    used_raw_merge: false,
                    passed_through: false,
                    error: None,
                }
            }
            Err(e) => last_error = e,
        }
    }

    if op == Op::Union {
        // Last resort: keep every triangle, give up on topology
        let merged = a.merge_raw(b);
        let repaired = repaired_copy(&merged, base_eps);
        return CombineOutcome {
            solid: repaired,
            attempts,
            used_raw_merge: true,
            passed_through: false,
            error: None,
        };
    }

    CombineOutcome {
        solid: a.clone(),
        attempts,
        used_raw_merge: false,
        passed_through: true,
        error: Some(BlendError::BooleanCombinationFailure {
            attempts,
            reason: last_error.to_string(),
        }),
    }
}

fn apply(a: &Solid, b: &Solid, kernel: &dyn CsgKernel, op: Op) -> Result<Solid, arris_csg::CsgError> {
    match op {
        Op::Union => a.union(b, kernel),
        Op::Subtract => a.subtract(b, kernel),
    }
}

/// Weld + gap-patch + degenerate cleanup at `eps`, then reassign face
/// labels by nearest-centroid/normal matching against the original
/// labeled triangles. Triangles with no confident match get the
/// synthetic [`RECOVERED`] label.
pub fn repaired_copy(solid: &Solid, eps: f64) -> Solid {
    let mut mesh = solid.mesh().weld(eps).drop_degenerate(eps * eps);
    patch_gaps(&mut mesh);
    mesh.fix_windings_by_adjacency();

    // Matching reference: the original labeled triangles
    let original = solid.mesh();
    let scale = solid.bounding_diagonal().max(1e-9);
    struct Ref {
        centroid: arris_math::Point3,
        normal: Option<arris_math::Vec3>,
        label: u32,
    }
    let refs: Vec<Ref> = (0..original.num_triangles())
        .map(|t| {
            let [a, b, c] = original.triangle(t);
            Ref {
                centroid: triangle_centroid(&a, &b, &c),
                normal: triangle_normal(&a, &b, &c),
                label: original.labels[t],
            }
        })
        .collect();

    let mut names: Vec<String> = solid.face_names().map(|s| s.to_string()).collect();
    let recovered_id = names.len() as u32;
    names.push(RECOVERED.to_string());

    for t in 0..mesh.num_triangles() {
        let [a, b, c] = mesh.triangle(t);
        let centroid = triangle_centroid(&a, &b, &c);
        let normal = triangle_normal(&a, &b, &c);
        let mut best: Option<(f64, u32)> = None;
        for r in &refs {
            let mut score = (centroid - r.centroid).norm() / scale;
            if let (Some(n), Some(rn)) = (&normal, &r.normal) {
                score += (1.0 - n.dot(rn)) * 0.5;
            }
            if best.map_or(true, |(s, _)| score < s) {
                best = Some((score, r.label));
            }
        }
        mesh.labels[t] = match best {
            // Scale-relative confidence threshold
            Some((score, label)) if score < 0.25 => label,
            _ => recovered_id,
        };
    }

    let mut repaired = Solid::from_mesh(mesh, names);
    for name in solid.face_names() {
        if let Some(data) = solid.face_metadata(name) {
            repaired.set_face_metadata(name, data.clone());
        }
    }
    repaired
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use arris_csg::{BspKernel, CsgError, CsgKernel};
    use arris_mesh::LabeledMesh;
    use arris_solid::make_box;

    /// Kernel that refuses open operands, like an exact kernel choking
    /// on a sliver-holed mesh, but delegates clean input.
    struct StrictKernel {
        inner: BspKernel,
    }

    impl CsgKernel for StrictKernel {
        fn union(&self, a: &LabeledMesh, b: &LabeledMesh) -> Result<LabeledMesh, CsgError> {
            self.check(a)?;
            self.check(b)?;
            self.inner.union(a, b)
        }
        fn subtract(&self, a: &LabeledMesh, b: &LabeledMesh) -> Result<LabeledMesh, CsgError> {
            self.check(a)?;
            self.check(b)?;
            self.inner.subtract(a, b)
        }
        fn intersect(&self, a: &LabeledMesh, b: &LabeledMesh) -> Result<LabeledMesh, CsgError> {
            self.check(a)?;
            self.check(b)?;
            self.inner.intersect(a, b)
        }
    }

    impl StrictKernel {
        fn check(&self, mesh: &LabeledMesh) -> Result<(), CsgError> {
            if mesh.is_closed() {
                Ok(())
            } else {
                Err(CsgError::DegenerateResult("open operand".to_string()))
            }
        }
    }

    /// Kernel that always fails.
    struct DeadKernel;

    impl CsgKernel for DeadKernel {
        fn union(&self, _: &LabeledMesh, _: &LabeledMesh) -> Result<LabeledMesh, CsgError> {
            Err(CsgError::DegenerateResult("dead".to_string()))
        }
        fn subtract(&self, _: &LabeledMesh, _: &LabeledMesh) -> Result<LabeledMesh, CsgError> {
            Err(CsgError::DegenerateResult("dead".to_string()))
        }
        fn intersect(&self, _: &LabeledMesh, _: &LabeledMesh) -> Result<LabeledMesh, CsgError> {
            Err(CsgError::DegenerateResult("dead".to_string()))
        }
    }

    fn shifted_box(d: f64) -> Solid {
        let b = make_box(1.0, 1.0, 1.0);
        let (mut mesh, names) = b.into_parts();
        for i in 0..mesh.num_vertices() {
            mesh.positions[3 * i] += d;
            mesh.positions[3 * i + 1] += d;
            mesh.positions[3 * i + 2] += d;
        }
        Solid::from_mesh(mesh, names)
    }

    /// Box with one triangle removed: an open mesh a strict kernel
    /// rejects until gap patching closes it.
    fn holed_box() -> Solid {
        let b = make_box(1.0, 1.0, 1.0);
        let (mesh, names) = b.into_parts();
        let mut holed = LabeledMesh {
            positions: mesh.positions.clone(),
            indices: Vec::new(),
            labels: Vec::new(),
        };
        for t in 1..mesh.num_triangles() {
            holed
                .indices
                .extend_from_slice(&mesh.indices[3 * t..3 * t + 3]);
            holed.labels.push(mesh.labels[t]);
        }
        Solid::from_mesh(holed, names)
    }

    #[test]
    fn test_direct_subtract_uses_no_repair() {
        let kernel = BspKernel::new();
        let out = subtract_with_repair(
            &make_box(1.0, 1.0, 1.0),
            &shifted_box(0.5),
            &kernel,
            &BlendConfig::default(),
        );
        assert_eq!(out.attempts, 0);
        assert!(!out.passed_through);
        assert!(out.error.is_none());
        assert_relative_eq!(out.solid.volume(), 0.875, epsilon = 1e-6);
    }

    #[test]
    fn test_repair_heals_open_operand() {
        let kernel = StrictKernel {
            inner: BspKernel::new(),
        };
        let out = subtract_with_repair(
            &holed_box(),
            &shifted_box(0.5),
            &kernel,
            &BlendConfig::default(),
        );
        assert!(out.attempts >= 1 && out.attempts <= 3);
        assert!(!out.passed_through, "repair should heal the hole: {:?}", out.error);
        assert_relative_eq!(out.solid.volume(), 0.875, epsilon = 1e-4);
    }

    #[test]
    fn test_subtract_passes_target_through_after_exhausting_retries() {
        let a = make_box(1.0, 1.0, 1.0);
        let out = subtract_with_repair(&a, &shifted_box(0.5), &DeadKernel, &BlendConfig::default());
        assert_eq!(out.attempts, 3);
        assert!(out.passed_through);
        assert!(matches!(
            out.error,
            Some(BlendError::BooleanCombinationFailure { attempts: 3, .. })
        ));
        // The target came through unchanged
        assert_relative_eq!(out.solid.volume(), a.volume(), epsilon = 1e-12);
    }

    #[test]
    fn test_union_falls_back_to_raw_merge() {
        let a = make_box(1.0, 1.0, 1.0);
        let b = shifted_box(3.0);
        let out = union_with_repair(&a, &b, &DeadKernel, &BlendConfig::default());
        assert!(out.used_raw_merge);
        assert!(out.error.is_none());
        // Disjoint boxes: the merged soup holds both volumes
        assert_relative_eq!(out.solid.volume(), 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_repaired_copy_reassigns_labels() {
        let solid = make_box(2.0, 2.0, 2.0);
        let repaired = repaired_copy(&solid, 1e-6);
        assert!(repaired.mesh().is_closed());
        // Confident matches keep their families
        assert_eq!(repaired.face_triangles("TOP").len(), 2);
        assert_eq!(repaired.face_triangles("BOTTOM").len(), 2);
        assert!(repaired.face_triangles(RECOVERED).is_empty());
    }

    #[test]
    fn test_repaired_copy_patches_hole_with_label() {
        let solid = holed_box();
        let repaired = repaired_copy(&solid, 1e-6);
        assert!(repaired.mesh().is_closed());
        assert_relative_eq!(repaired.volume(), 1.0, epsilon = 1e-9);
    }
}
