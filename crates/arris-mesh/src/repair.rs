//! Boundary-gap patching.
//!
//! Finds open boundary loops (directed edges with no opposite partner),
//! chains them, and fills each closed loop with a triangle fan so small
//! holes left by welding or degenerate cleanup do not leak through a
//! boolean operation. Open chains that never close are left alone.

use std::collections::HashMap;

use arris_math::Point3;

use crate::LabeledMesh;

/// Fill closed boundary loops with fan triangles. Returns the number of
/// triangles added. Loops inherit the face label of the triangle owning
/// the first boundary edge encountered.
pub fn patch_gaps(mesh: &mut LabeledMesh) -> usize {
    let keys = mesh.vertex_keys();

    // Directed edge -> (origin vertex index, owner triangle label)
    let mut open: HashMap<([i64; 3], [i64; 3]), (u32, u32)> = HashMap::new();
    {
        let mut directed: HashMap<([i64; 3], [i64; 3]), (u32, u32)> = HashMap::new();
        for t in 0..mesh.num_triangles() {
            let idx = [
                mesh.indices[3 * t],
                mesh.indices[3 * t + 1],
                mesh.indices[3 * t + 2],
            ];
            for e in 0..3 {
                let ia = idx[e];
                let ib = idx[(e + 1) % 3];
                let ka = keys[ia as usize];
                let kb = keys[ib as usize];
                if ka == kb {
                    continue;
                }
                directed.insert((ka, kb), (ia, mesh.labels[t]));
            }
        }
        for (&(a, b), &payload) in &directed {
            if !directed.contains_key(&(b, a)) {
                open.insert((a, b), payload);
            }
        }
    }

    if open.is_empty() {
        return 0;
    }

    // Chain boundary edges into loops: from-key -> edge
    let mut by_start: HashMap<[i64; 3], ([i64; 3], u32, u32)> = HashMap::new();
    for (&(a, b), &(origin, label)) in &open {
        by_start.insert(a, (b, origin, label));
    }

    let max_len = open.len();
    let mut added = 0;
    let mut loops_patched = 0;

    loop {
        let Some(&start) = by_start.keys().next() else {
            break;
        };
        if loops_patched >= 64 {
            break;
        }
        let mut loop_verts: Vec<u32> = Vec::new();
        let mut loop_label = 0u32;
        let mut cursor = start;
        let mut closed = false;
        for _ in 0..=max_len {
            let Some(&(next, origin, label)) = by_start.get(&cursor) else {
                break;
            };
            if loop_verts.is_empty() {
                loop_label = label;
            }
            loop_verts.push(origin);
            by_start.remove(&cursor);
            cursor = next;
            if cursor == start {
                closed = true;
                break;
            }
        }

        if !closed || loop_verts.len() < 3 {
            continue;
        }
        loops_patched += 1;

        // Boundary loops run opposite to the missing triangles' winding
        loop_verts.reverse();
        let points: Vec<Point3> = loop_verts
            .iter()
            .map(|&i| mesh.vertex(i as usize))
            .collect();

        if points.len() == 3 {
            mesh.push_triangle(loop_label, points[0], points[1], points[2]);
            added += 1;
        } else {
            let sum = points
                .iter()
                .fold(arris_math::Vec3::zeros(), |acc, p| acc + p.coords);
            let centroid = Point3::from(sum / points.len() as f64);
            for i in 0..points.len() {
                let a = points[i];
                let b = points[(i + 1) % points.len()];
                mesh.push_triangle(loop_label, centroid, a, b);
                added += 1;
            }
        }
    }

    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::cube_soup;
    use approx::assert_relative_eq;

    fn remove_triangle(mesh: &LabeledMesh, t: usize) -> LabeledMesh {
        let mut out = LabeledMesh {
            positions: mesh.positions.clone(),
            indices: Vec::new(),
            labels: Vec::new(),
        };
        for i in 0..mesh.num_triangles() {
            if i == t {
                continue;
            }
            out.indices.extend_from_slice(&mesh.indices[3 * i..3 * i + 3]);
            out.labels.push(mesh.labels[i]);
        }
        out
    }

    #[test]
    fn test_patch_single_missing_triangle() {
        let mut holed = remove_triangle(&cube_soup(2.0), 4);
        assert!(!holed.is_closed());
        let added = patch_gaps(&mut holed);
        assert_eq!(added, 1);
        assert!(holed.is_closed());
        assert_relative_eq!(holed.signed_volume(), 8.0, epsilon = 1e-9);
    }

    #[test]
    fn test_patch_quad_hole() {
        // Remove both front-face triangles: a 4-edge boundary loop
        let holed = remove_triangle(&cube_soup(2.0), 5);
        let mut holed = remove_triangle(&holed, 4);
        assert!(!holed.is_closed());
        let added = patch_gaps(&mut holed);
        assert!(added >= 2);
        assert!(holed.is_closed());
        assert_relative_eq!(holed.signed_volume(), 8.0, epsilon = 1e-9);
    }

    #[test]
    fn test_patch_noop_on_closed_mesh() {
        let mut cube = cube_soup(1.0);
        assert_eq!(patch_gaps(&mut cube), 0);
        assert_eq!(cube.num_triangles(), 12);
    }
}
