#![warn(missing_docs)]

//! Labeled triangle mesh storage and repair for the arris kernel.
//!
//! [`LabeledMesh`] is the wire layout every boolean backend consumes:
//! flat vertex positions, flat triangle indices, and one face-label id
//! per triangle. Repair utilities are conservative and bounded: vertex
//! welding, degenerate-triangle cleanup, boundary-gap patching, and
//! adjacency-based winding normalization.

use std::collections::HashMap;

use arris_math::{Point3, Vec3};

mod repair;

pub use repair::patch_gaps;

/// A triangle mesh with one face-label id per triangle.
///
/// Layout: `positions` holds `vertex_count × 3` coordinates,
/// `indices` holds `triangle_count × 3` vertex indices, and `labels`
/// holds `triangle_count` face-label ids. Label-id domains of two meshes
/// are assumed disjoint unless the caller merges them explicitly.
#[derive(Debug, Clone, Default)]
pub struct LabeledMesh {
    /// Flat vertex positions: `[x0, y0, z0, x1, y1, z1, ...]`.
    pub positions: Vec<f64>,
    /// Flat triangle indices: `[i0, i1, i2, ...]`.
    pub indices: Vec<u32>,
    /// One face-label id per triangle.
    pub labels: Vec<u32>,
}

impl LabeledMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.positions.len() / 3
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }

    /// Vertex position by index.
    pub fn vertex(&self, i: usize) -> Point3 {
        Point3::new(
            self.positions[3 * i],
            self.positions[3 * i + 1],
            self.positions[3 * i + 2],
        )
    }

    /// The three corner points of triangle `t`.
    pub fn triangle(&self, t: usize) -> [Point3; 3] {
        [
            self.vertex(self.indices[3 * t] as usize),
            self.vertex(self.indices[3 * t + 1] as usize),
            self.vertex(self.indices[3 * t + 2] as usize),
        ]
    }

    /// Append a triangle as three fresh (unwelded) vertices.
    pub fn push_triangle(&mut self, label: u32, p0: Point3, p1: Point3, p2: Point3) {
        let base = self.num_vertices() as u32;
        for p in [p0, p1, p2] {
            self.positions.extend_from_slice(&[p.x, p.y, p.z]);
        }
        self.indices.extend_from_slice(&[base, base + 1, base + 2]);
        self.labels.push(label);
    }

    /// Raw merge: index-offset concatenation of another mesh's triangle
    /// soup, with no boolean logic and no label remapping.
    pub fn merge(&mut self, other: &LabeledMesh) {
        let offset = self.num_vertices() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.indices.extend(other.indices.iter().map(|&i| i + offset));
        self.labels.extend_from_slice(&other.labels);
    }

    /// Diagonal length of the axis-aligned bounding box.
    pub fn bounding_diagonal(&self) -> f64 {
        if self.positions.is_empty() {
            return 0.0;
        }
        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        for chunk in self.positions.chunks_exact(3) {
            for k in 0..3 {
                min[k] = min[k].min(chunk[k]);
                max[k] = max[k].max(chunk[k]);
            }
        }
        let d = [max[0] - min[0], max[1] - min[1], max[2] - min[2]];
        (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt()
    }

    /// Signed volume by the divergence theorem; positive for closed
    /// meshes with outward winding.
    pub fn signed_volume(&self) -> f64 {
        let mut vol = 0.0;
        for t in 0..self.num_triangles() {
            let [a, b, c] = self.triangle(t);
            vol += a.coords.dot(&b.coords.cross(&c.coords));
        }
        vol / 6.0
    }

    /// Weld coincident vertices within `eps`, dropping triangles that
    /// collapse (two or more corners welded together).
    pub fn weld(&self, eps: f64) -> LabeledMesh {
        let scale = if eps > 0.0 { 1.0 / eps } else { 1e9 };
        let mut keys: HashMap<[i64; 3], u32> = HashMap::new();
        let mut remap = Vec::with_capacity(self.num_vertices());
        let mut out = LabeledMesh::new();

        for i in 0..self.num_vertices() {
            let p = self.vertex(i);
            let key = quantize(&p, scale);
            let idx = *keys.entry(key).or_insert_with(|| {
                let idx = out.positions.len() as u32 / 3;
                out.positions.extend_from_slice(&[p.x, p.y, p.z]);
                idx
            });
            remap.push(idx);
        }

        for t in 0..self.num_triangles() {
            let i0 = remap[self.indices[3 * t] as usize];
            let i1 = remap[self.indices[3 * t + 1] as usize];
            let i2 = remap[self.indices[3 * t + 2] as usize];
            if i0 == i1 || i1 == i2 || i2 == i0 {
                continue;
            }
            out.indices.extend_from_slice(&[i0, i1, i2]);
            out.labels.push(self.labels[t]);
        }
        out
    }

    /// Drop triangles whose area falls below `min_area`.
    pub fn drop_degenerate(&self, min_area: f64) -> LabeledMesh {
        let mut out = LabeledMesh {
            positions: self.positions.clone(),
            indices: Vec::new(),
            labels: Vec::new(),
        };
        for t in 0..self.num_triangles() {
            let [a, b, c] = self.triangle(t);
            if triangle_area(&a, &b, &c) < min_area {
                continue;
            }
            out.indices
                .extend_from_slice(&self.indices[3 * t..3 * t + 3]);
            out.labels.push(self.labels[t]);
        }
        out
    }

    /// Remove exact duplicate triangles (same corner positions and
    /// label, any cyclic rotation), keeping the first occurrence.
    pub fn dedupe_triangles(&self) -> LabeledMesh {
        let keys = self.vertex_keys();
        let mut seen: HashMap<([i64; 3], [i64; 3], [i64; 3], u32), ()> = HashMap::new();
        let mut out = LabeledMesh {
            positions: self.positions.clone(),
            indices: Vec::new(),
            labels: Vec::new(),
        };
        for t in 0..self.num_triangles() {
            let mut k = [
                keys[self.indices[3 * t] as usize],
                keys[self.indices[3 * t + 1] as usize],
                keys[self.indices[3 * t + 2] as usize],
            ];
            // Canonical rotation: smallest key first, winding preserved
            let lo = (0..3).min_by_key(|&i| k[i]).unwrap_or(0);
            k.rotate_left(lo);
            if seen.insert((k[0], k[1], k[2], self.labels[t]), ()).is_some() {
                continue;
            }
            out.indices
                .extend_from_slice(&self.indices[3 * t..3 * t + 3]);
            out.labels.push(self.labels[t]);
        }
        out
    }

    /// True when every edge is shared by exactly two triangles with
    /// opposite orientation (a closed 2-manifold by edge count).
    pub fn is_closed(&self) -> bool {
        let edges = self.directed_edge_counts();
        edges
            .iter()
            .all(|(&(a, b), &count)| count == 1 && edges.get(&(b, a)) == Some(&1))
    }

    /// Directed edges that have no opposite partner (gap boundary).
    pub fn boundary_edges(&self) -> Vec<([i64; 3], [i64; 3])> {
        let edges = self.directed_edge_counts();
        edges
            .keys()
            .filter(|(a, b)| !edges.contains_key(&(*b, *a)))
            .copied()
            .collect()
    }

    /// Normalize triangle windings so adjacent triangles agree, then
    /// orient each connected component outward (positive signed volume).
    pub fn fix_windings_by_adjacency(&mut self) {
        let keys = self.vertex_keys();
        // Map each undirected edge to the triangles using it
        let mut edge_tris: HashMap<([i64; 3], [i64; 3]), Vec<usize>> = HashMap::new();
        for t in 0..self.num_triangles() {
            for (a, b) in self.triangle_edge_keys(t, &keys) {
                let key = if a < b { (a, b) } else { (b, a) };
                edge_tris.entry(key).or_default().push(t);
            }
        }

        let n_tris = self.num_triangles();
        let mut visited = vec![false; n_tris];
        let mut flip = vec![false; n_tris];

        for seed in 0..n_tris {
            if visited[seed] {
                continue;
            }
            let mut component = Vec::new();
            let mut stack = vec![seed];
            visited[seed] = true;
            while let Some(t) = stack.pop() {
                component.push(t);
                for (a, b) in self.triangle_edge_keys(t, &keys) {
                    let (ea, eb) = if flip[t] { (b, a) } else { (a, b) };
                    let key = if ea < eb { (ea, eb) } else { (eb, ea) };
                    let Some(users) = edge_tris.get(&key) else {
                        continue;
                    };
                    for &other in users {
                        if other == t || visited[other] {
                            continue;
                        }
                        // Consistent winding: the shared edge runs in
                        // opposite directions in the two triangles
                        let other_has_same_dir = self
                            .triangle_edge_keys(other, &keys)
                            .into_iter()
                            .any(|(oa, ob)| (oa, ob) == (ea, eb));
                        flip[other] = other_has_same_dir;
                        visited[other] = true;
                        stack.push(other);
                    }
                }
            }

            for &t in &component {
                if flip[t] {
                    self.indices.swap(3 * t + 1, 3 * t + 2);
                    flip[t] = false;
                }
            }
            // Orient the component outward
            let mut vol = 0.0;
            for &t in &component {
                let [a, b, c] = self.triangle(t);
                vol += a.coords.dot(&b.coords.cross(&c.coords));
            }
            if vol < 0.0 {
                for &t in &component {
                    self.indices.swap(3 * t + 1, 3 * t + 2);
                }
            }
        }
    }

    fn vertex_keys(&self) -> Vec<[i64; 3]> {
        let diag = self.bounding_diagonal().max(1e-9);
        let scale = 1.0 / (diag * 1e-9);
        (0..self.num_vertices())
            .map(|i| quantize(&self.vertex(i), scale))
            .collect()
    }

    fn triangle_edge_keys(
        &self,
        t: usize,
        keys: &[[i64; 3]],
    ) -> [([i64; 3], [i64; 3]); 3] {
        let k0 = keys[self.indices[3 * t] as usize];
        let k1 = keys[self.indices[3 * t + 1] as usize];
        let k2 = keys[self.indices[3 * t + 2] as usize];
        [(k0, k1), (k1, k2), (k2, k0)]
    }

    fn directed_edge_counts(&self) -> HashMap<([i64; 3], [i64; 3]), u32> {
        let keys = self.vertex_keys();
        let mut edges: HashMap<([i64; 3], [i64; 3]), u32> = HashMap::new();
        for t in 0..self.num_triangles() {
            for (a, b) in self.triangle_edge_keys(t, &keys) {
                if a == b {
                    continue;
                }
                *edges.entry((a, b)).or_insert(0) += 1;
            }
        }
        edges
    }
}

fn quantize(p: &Point3, scale: f64) -> [i64; 3] {
    [
        (p.x * scale).round() as i64,
        (p.y * scale).round() as i64,
        (p.z * scale).round() as i64,
    ]
}

/// Area of a triangle.
pub fn triangle_area(a: &Point3, b: &Point3, c: &Point3) -> f64 {
    (b - a).cross(&(c - a)).norm() * 0.5
}

/// Unit normal of a triangle, `None` when degenerate.
pub fn triangle_normal(a: &Point3, b: &Point3, c: &Point3) -> Option<Vec3> {
    let n = (b - a).cross(&(c - a));
    let len = n.norm();
    if len < 1e-15 {
        None
    } else {
        Some(n / len)
    }
}

/// Centroid of a triangle.
pub fn triangle_centroid(a: &Point3, b: &Point3, c: &Point3) -> Point3 {
    Point3::from((a.coords + b.coords + c.coords) / 3.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Unit cube as a 12-triangle soup with one label per axis pair.
    pub(crate) fn cube_soup(size: f64) -> LabeledMesh {
        let s = size;
        let p = |x: f64, y: f64, z: f64| Point3::new(x, y, z);
        let mut mesh = LabeledMesh::new();
        // bottom (label 0), top (1), front (2), back (3), left (4), right (5)
        mesh.push_triangle(0, p(0.0, 0.0, 0.0), p(s, s, 0.0), p(s, 0.0, 0.0));
        mesh.push_triangle(0, p(0.0, 0.0, 0.0), p(0.0, s, 0.0), p(s, s, 0.0));
        mesh.push_triangle(1, p(0.0, 0.0, s), p(s, 0.0, s), p(s, s, s));
        mesh.push_triangle(1, p(0.0, 0.0, s), p(s, s, s), p(0.0, s, s));
        mesh.push_triangle(2, p(0.0, 0.0, 0.0), p(s, 0.0, 0.0), p(s, 0.0, s));
        mesh.push_triangle(2, p(0.0, 0.0, 0.0), p(s, 0.0, s), p(0.0, 0.0, s));
        mesh.push_triangle(3, p(0.0, s, 0.0), p(s, s, s), p(s, s, 0.0));
        mesh.push_triangle(3, p(0.0, s, 0.0), p(0.0, s, s), p(s, s, s));
        mesh.push_triangle(4, p(0.0, 0.0, 0.0), p(0.0, 0.0, s), p(0.0, s, s));
        mesh.push_triangle(4, p(0.0, 0.0, 0.0), p(0.0, s, s), p(0.0, s, 0.0));
        mesh.push_triangle(5, p(s, 0.0, 0.0), p(s, s, s), p(s, 0.0, s));
        mesh.push_triangle(5, p(s, 0.0, 0.0), p(s, s, 0.0), p(s, s, s));
        mesh
    }

    #[test]
    fn test_cube_soup_is_closed_and_has_volume() {
        let cube = cube_soup(2.0);
        assert!(cube.is_closed());
        assert_relative_eq!(cube.signed_volume(), 8.0, epsilon = 1e-9);
        assert_relative_eq!(cube.bounding_diagonal(), (12.0f64).sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_weld_merges_soup_vertices() {
        let cube = cube_soup(1.0);
        assert_eq!(cube.num_vertices(), 36);
        let welded = cube.weld(1e-6);
        assert_eq!(welded.num_vertices(), 8);
        assert_eq!(welded.num_triangles(), 12);
        assert!(welded.is_closed());
    }

    #[test]
    fn test_weld_drops_collapsed_triangles() {
        let mut mesh = LabeledMesh::new();
        mesh.push_triangle(
            0,
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1e-9, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        let welded = mesh.weld(1e-6);
        assert_eq!(welded.num_triangles(), 0);
    }

    #[test]
    fn test_drop_degenerate() {
        let mut mesh = LabeledMesh::new();
        mesh.push_triangle(
            0,
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        mesh.push_triangle(
            1,
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 1e-9, 0.0),
        );
        let cleaned = mesh.drop_degenerate(1e-6);
        assert_eq!(cleaned.num_triangles(), 1);
        assert_eq!(cleaned.labels, vec![0]);
    }

    #[test]
    fn test_raw_merge_offsets_indices() {
        let mut a = cube_soup(1.0);
        let b = cube_soup(1.0);
        let verts_before = a.num_vertices() as u32;
        a.merge(&b);
        assert_eq!(a.num_triangles(), 24);
        assert!(a.indices[36..].iter().all(|&i| i >= verts_before));
    }

    #[test]
    fn test_fix_windings_repairs_flipped_triangle() {
        let mut cube = cube_soup(1.0);
        // Sabotage: flip two triangles
        cube.indices.swap(1, 2);
        cube.indices.swap(19, 20);
        assert!(cube.signed_volume() < 1.0);
        cube.fix_windings_by_adjacency();
        assert_relative_eq!(cube.signed_volume(), 1.0, epsilon = 1e-9);
        assert!(cube.is_closed());
    }

    #[test]
    fn test_boundary_edges_of_open_mesh() {
        let mut mesh = LabeledMesh::new();
        mesh.push_triangle(
            0,
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        assert!(!mesh.is_closed());
        assert_eq!(mesh.boundary_edges().len(), 3);
        assert!(cube_soup(1.0).boundary_edges().is_empty());
    }

    #[test]
    fn test_dedupe_triangles() {
        let mut cube = cube_soup(1.0);
        let copy = cube.clone();
        cube.merge(&copy);
        assert_eq!(cube.num_triangles(), 24);
        let deduped = cube.dedupe_triangles();
        assert_eq!(deduped.num_triangles(), 12);
        assert_relative_eq!(deduped.signed_volume(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_triangle_helpers() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(2.0, 0.0, 0.0);
        let c = Point3::new(0.0, 2.0, 0.0);
        assert_relative_eq!(triangle_area(&a, &b, &c), 2.0);
        let n = triangle_normal(&a, &b, &c).unwrap();
        assert_relative_eq!(n.z, 1.0);
        let g = triangle_centroid(&a, &b, &c);
        assert_relative_eq!(g.x, 2.0 / 3.0);
        assert!(triangle_normal(&a, &b, &b).is_none());
    }
}
