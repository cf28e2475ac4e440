//! Edge descriptions consumed by the blend engine.

use arris_math::Point3;

/// Reference to a bounding face of an edge.
#[derive(Debug, Clone, PartialEq)]
pub enum FaceRef {
    /// A single named face of the solid.
    Named(String),
    /// A transition between two side faces of a broken edge: normals are
    /// interpolated across `t`, projections use whichever face is nearer.
    Blended {
        /// Face at `t = 0`.
        first: String,
        /// Face at `t = 1`.
        second: String,
        /// Interpolation parameter in `[0, 1]`.
        t: f64,
    },
}

impl FaceRef {
    /// Shorthand for a named face.
    pub fn named(name: &str) -> Self {
        FaceRef::Named(name.to_string())
    }
}

/// The two faces bounding an edge (or one of its segments).
#[derive(Debug, Clone, PartialEq)]
pub struct FacePair {
    /// Face on the A side.
    pub a: FaceRef,
    /// Face on the B side.
    pub b: FaceRef,
}

impl FacePair {
    /// Pair of two named faces.
    pub fn named(a: &str, b: &str) -> Self {
        Self {
            a: FaceRef::named(a),
            b: FaceRef::named(b),
        }
    }
}

/// Face assignment along the edge.
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeFaces {
    /// One face pair shared by the whole edge.
    Shared(FacePair),
    /// One face pair per segment (composite/blended edges). Must have
    /// one entry per segment: `points − 1` for open edges, `points` for
    /// closed loops.
    PerSegment(Vec<FacePair>),
}

/// An edge to round or bevel: an ordered polyline between two faces of
/// a solid.
#[derive(Debug, Clone)]
pub struct BlendEdge {
    points: Vec<Point3>,
    closed: bool,
    faces: EdgeFaces,
}

impl BlendEdge {
    /// Build an edge, deduplicating consecutive coincident points and
    /// dropping a duplicated wrap point on closed loops.
    pub fn new(points: Vec<Point3>, closed: bool, faces: EdgeFaces) -> Self {
        let mut deduped: Vec<Point3> = Vec::with_capacity(points.len());
        for p in points {
            if deduped
                .last()
                .is_some_and(|last| (p - last).norm_squared() < 1e-24)
            {
                continue;
            }
            deduped.push(p);
        }
        if closed && deduped.len() > 1 {
            let first = deduped[0];
            if deduped
                .last()
                .is_some_and(|last| (first - last).norm_squared() < 1e-24)
            {
                deduped.pop();
            }
        }
        Self {
            points: deduped,
            closed,
            faces,
        }
    }

    /// Straight or curved edge with one shared face pair.
    pub fn between_faces(points: Vec<Point3>, closed: bool, face_a: &str, face_b: &str) -> Self {
        Self::new(points, closed, EdgeFaces::Shared(FacePair::named(face_a, face_b)))
    }

    /// The deduplicated edge polyline.
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    /// Whether the edge closes into a loop.
    pub fn closed(&self) -> bool {
        self.closed
    }

    /// Number of segments (wrapping for closed loops).
    pub fn num_segments(&self) -> usize {
        if self.points.len() < 2 {
            0
        } else if self.closed {
            self.points.len()
        } else {
            self.points.len() - 1
        }
    }

    /// The face pair governing segment `seg`.
    pub fn pair_for_segment(&self, seg: usize) -> &FacePair {
        match &self.faces {
            EdgeFaces::Shared(pair) => pair,
            EdgeFaces::PerSegment(pairs) => {
                let idx = seg.min(pairs.len().saturating_sub(1));
                &pairs[idx]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupes_consecutive_points() {
        let edge = BlendEdge::between_faces(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
            ],
            false,
            "TOP",
            "RIGHT",
        );
        assert_eq!(edge.points().len(), 3);
        assert_eq!(edge.num_segments(), 2);
    }

    #[test]
    fn test_closed_loop_drops_wrap_point() {
        let square = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
        ];
        let edge = BlendEdge::between_faces(square, true, "TOP", "SIDE");
        assert_eq!(edge.points().len(), 4);
        assert_eq!(edge.num_segments(), 4);
    }

    #[test]
    fn test_per_segment_pairs() {
        let pairs = vec![
            FacePair::named("TOP", "FRONT"),
            FacePair::named("TOP", "RIGHT"),
        ];
        let edge = BlendEdge::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
            ],
            false,
            EdgeFaces::PerSegment(pairs),
        );
        assert_eq!(edge.pair_for_segment(0), &FacePair::named("TOP", "FRONT"));
        assert_eq!(edge.pair_for_segment(1), &FacePair::named("TOP", "RIGHT"));
        // Out-of-range clamps to the last entry
        assert_eq!(edge.pair_for_segment(9), &FacePair::named("TOP", "RIGHT"));
    }
}
