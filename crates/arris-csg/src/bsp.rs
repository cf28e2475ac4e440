//! BSP-tree polygon clipping.
//!
//! The classic solid-CSG construction: polygons are partitioned by
//! splitting planes into a binary tree; clipping one tree against
//! another removes the parts of its polygon set inside the other solid.
//! Split fragments inherit the face label of the polygon they came from.

use arris_math::{Point3, Vec3};
use arris_mesh::LabeledMesh;

const COPLANAR: u8 = 0;
const FRONT: u8 = 1;
const BACK: u8 = 2;
const SPANNING: u8 = 3;

/// A splitting plane in `normal · x = w` form.
#[derive(Debug, Clone)]
pub(crate) struct SplitPlane {
    normal: Vec3,
    w: f64,
}

impl SplitPlane {
    fn from_points(a: &Point3, b: &Point3, c: &Point3) -> Option<Self> {
        let n = (b - a).cross(&(c - a));
        let len = n.norm();
        if len < 1e-15 {
            return None;
        }
        let normal = n / len;
        Some(Self {
            normal,
            w: normal.dot(&a.coords),
        })
    }

    fn flip(&mut self) {
        self.normal = -self.normal;
        self.w = -self.w;
    }

    /// Classify `polygon` against this plane and distribute it (or its
    /// split fragments) into the four output lists.
    fn split_polygon(
        &self,
        polygon: &Polygon,
        eps: f64,
        coplanar_front: &mut Vec<Polygon>,
        coplanar_back: &mut Vec<Polygon>,
        front: &mut Vec<Polygon>,
        back: &mut Vec<Polygon>,
    ) {
        let mut polygon_type = 0u8;
        let mut types = Vec::with_capacity(polygon.vertices.len());
        for v in &polygon.vertices {
            let t = self.normal.dot(&v.coords) - self.w;
            let ty = if t < -eps {
                BACK
            } else if t > eps {
                FRONT
            } else {
                COPLANAR
            };
            polygon_type |= ty;
            types.push(ty);
        }

        match polygon_type {
            COPLANAR => {
                if self.normal.dot(&polygon.plane.normal) > 0.0 {
                    coplanar_front.push(polygon.clone());
                } else {
                    coplanar_back.push(polygon.clone());
                }
            }
            FRONT => front.push(polygon.clone()),
            BACK => back.push(polygon.clone()),
            _ => {
                let n = polygon.vertices.len();
                let mut f: Vec<Point3> = Vec::new();
                let mut b: Vec<Point3> = Vec::new();
                for i in 0..n {
                    let j = (i + 1) % n;
                    let ti = types[i];
                    let tj = types[j];
                    let vi = polygon.vertices[i];
                    let vj = polygon.vertices[j];
                    if ti != BACK {
                        f.push(vi);
                    }
                    if ti != FRONT {
                        b.push(vi);
                    }
                    if (ti | tj) == SPANNING {
                        let denom = self.normal.dot(&(vj - vi));
                        if denom.abs() > 1e-15 {
                            let t = (self.w - self.normal.dot(&vi.coords)) / denom;
                            let v = arris_math::lerp_point(&vi, &vj, t);
                            f.push(v);
                            b.push(v);
                        }
                    }
                }
                if f.len() >= 3 {
                    if let Some(p) = Polygon::new(f, polygon.label) {
                        front.push(p);
                    }
                }
                if b.len() >= 3 {
                    if let Some(p) = Polygon::new(b, polygon.label) {
                        back.push(p);
                    }
                }
            }
        }
    }
}

/// A convex polygon carrying its originating face label.
#[derive(Debug, Clone)]
pub(crate) struct Polygon {
    vertices: Vec<Point3>,
    plane: SplitPlane,
    label: u32,
}

impl Polygon {
    fn new(vertices: Vec<Point3>, label: u32) -> Option<Self> {
        if vertices.len() < 3 {
            return None;
        }
        let plane = SplitPlane::from_points(&vertices[0], &vertices[1], &vertices[2])?;
        Some(Self {
            vertices,
            plane,
            label,
        })
    }

    fn flip(&mut self) {
        self.vertices.reverse();
        self.plane.flip();
    }
}

/// A node in the BSP tree.
#[derive(Debug, Default)]
pub(crate) struct Node {
    plane: Option<SplitPlane>,
    front: Option<Box<Node>>,
    back: Option<Box<Node>>,
    polygons: Vec<Polygon>,
    eps: f64,
}

impl Node {
    pub(crate) fn from_polygons(polygons: Vec<Polygon>, eps: f64) -> Self {
        let mut node = Node {
            eps,
            ..Default::default()
        };
        node.build(polygons);
        node
    }

    /// Invert solid/empty space: flip polygons, planes, and subtrees.
    pub(crate) fn invert(&mut self) {
        for p in &mut self.polygons {
            p.flip();
        }
        if let Some(plane) = &mut self.plane {
            plane.flip();
        }
        if let Some(f) = &mut self.front {
            f.invert();
        }
        if let Some(b) = &mut self.back {
            b.invert();
        }
        std::mem::swap(&mut self.front, &mut self.back);
    }

    /// Remove the parts of `polygons` inside this tree's solid.
    fn clip_polygons(&self, polygons: Vec<Polygon>) -> Vec<Polygon> {
        let Some(plane) = &self.plane else {
            return polygons;
        };
        let mut front = Vec::new();
        let mut back = Vec::new();
        let mut coplanar_front = Vec::new();
        let mut coplanar_back = Vec::new();
        for p in &polygons {
            plane.split_polygon(
                p,
                self.eps,
                &mut coplanar_front,
                &mut coplanar_back,
                &mut front,
                &mut back,
            );
        }
        front.append(&mut coplanar_front);
        back.append(&mut coplanar_back);
        let mut front = match &self.front {
            Some(f) => f.clip_polygons(front),
            None => front,
        };
        let back = match &self.back {
            Some(b) => b.clip_polygons(back),
            // No back subtree: back side is inside the solid
            None => Vec::new(),
        };
        front.extend(back);
        front
    }

    /// Remove every polygon of `self` that lies inside `other`'s solid.
    pub(crate) fn clip_to(&mut self, other: &Node) {
        self.polygons = other.clip_polygons(std::mem::take(&mut self.polygons));
        if let Some(f) = &mut self.front {
            f.clip_to(other);
        }
        if let Some(b) = &mut self.back {
            b.clip_to(other);
        }
    }

    /// Collect every polygon in the tree.
    pub(crate) fn all_polygons(&self) -> Vec<Polygon> {
        let mut out = self.polygons.clone();
        if let Some(f) = &self.front {
            out.extend(f.all_polygons());
        }
        if let Some(b) = &self.back {
            out.extend(b.all_polygons());
        }
        out
    }

    /// Insert polygons, splitting them down the tree.
    pub(crate) fn build(&mut self, polygons: Vec<Polygon>) {
        if polygons.is_empty() {
            return;
        }
        if self.plane.is_none() {
            self.plane = Some(polygons[0].plane.clone());
        }
        let plane = match &self.plane {
            Some(p) => p.clone(),
            None => return,
        };
        let mut front = Vec::new();
        let mut back = Vec::new();
        let mut coplanar_front = Vec::new();
        let mut coplanar_back = Vec::new();
        for p in &polygons {
            plane.split_polygon(
                p,
                self.eps,
                &mut coplanar_front,
                &mut coplanar_back,
                &mut front,
                &mut back,
            );
        }
        self.polygons.append(&mut coplanar_front);
        self.polygons.append(&mut coplanar_back);
        if !front.is_empty() {
            self.front
                .get_or_insert_with(|| {
                    Box::new(Node {
                        eps: self.eps,
                        ..Default::default()
                    })
                })
                .build(front);
        }
        if !back.is_empty() {
            self.back
                .get_or_insert_with(|| {
                    Box::new(Node {
                        eps: self.eps,
                        ..Default::default()
                    })
                })
                .build(back);
        }
    }
}

/// Convert a labeled mesh into BSP polygons, skipping degenerate
/// triangles.
pub(crate) fn polygons_from_mesh(mesh: &LabeledMesh) -> Vec<Polygon> {
    let mut out = Vec::with_capacity(mesh.num_triangles());
    for t in 0..mesh.num_triangles() {
        let [a, b, c] = mesh.triangle(t);
        if let Some(p) = Polygon::new(vec![a, b, c], mesh.labels[t]) {
            out.push(p);
        }
    }
    out
}

/// Convert BSP polygons back into a labeled mesh by fan triangulation
/// (split fragments are convex).
pub(crate) fn mesh_from_polygons(polygons: &[Polygon]) -> LabeledMesh {
    let mut mesh = LabeledMesh::new();
    for poly in polygons {
        for i in 1..poly.vertices.len() - 1 {
            mesh.push_triangle(
                poly.label,
                poly.vertices[0],
                poly.vertices[i],
                poly.vertices[i + 1],
            );
        }
    }
    mesh
}
