//! Orientation correction for polyline triples.
//!
//! Independently solved samples can disagree on progression direction:
//! the centerline and its two companion curves must share one per-index
//! correspondence. Correction only ever reverses whole arrays in
//! lockstep-preserving fashion; it never reorders individual indices.
//!
//! The radius-scored search over all eight reversal combinations is a
//! heuristic without a formal correctness proof for every sampled
//! topology; highly twisted composite edges that defeat it are a known
//! limitation, not a bug.

use arris_math::{try_normalize, Point3, Vec3};

/// Which of the three arrays a correction reversed.
pub type Reversals = [bool; 3];

/// Align a centerline and its two companion curves using the known
/// expected radius: try all eight reversal combinations and keep the one
/// whose tangency distances best match `radius` at representative
/// indices. Returns the reversals applied.
pub fn align_by_radius(
    center: &mut Vec<Point3>,
    a: &mut Vec<Point3>,
    b: &mut Vec<Point3>,
    radius: f64,
) -> Reversals {
    let n = center.len();
    if n < 2 || a.len() != n || b.len() != n {
        return [false; 3];
    }

    let probes = [n / 4, n / 2, (3 * n) / 4];
    let mut best = (f64::INFINITY, [false; 3]);
    for combo in 0u8..8 {
        let rev = [combo & 1 != 0, combo & 2 != 0, combo & 4 != 0];
        let mut score = 0.0;
        for &i in &probes {
            let ic = if rev[0] { n - 1 - i } else { i };
            let ia = if rev[1] { n - 1 - i } else { i };
            let ib = if rev[2] { n - 1 - i } else { i };
            score += ((center[ic] - a[ia]).norm() - radius).abs();
            score += ((center[ic] - b[ib]).norm() - radius).abs();
        }
        // Strict improvement only, so the identity combination wins ties
        if score < best.0 - 1e-12 {
            best = (score, rev);
        }
    }

    apply(center, a, b, best.1);
    best.1
}

/// Align without a known radius: net progression directions must agree.
/// If both companion curves oppose the centerline, the centerline is
/// flipped instead (fewest total reversals). A cross-product-sign vote
/// over sampled index triples settles near-ambiguous cases.
pub fn align_by_direction(
    center: &mut Vec<Point3>,
    a: &mut Vec<Point3>,
    b: &mut Vec<Point3>,
) -> Reversals {
    let n = center.len();
    if n < 2 || a.len() != n || b.len() != n {
        return [false; 3];
    }

    let dir_c = net_direction(center);
    let dir_a = net_direction(a);
    let dir_b = net_direction(b);
    let (Some(dir_c), Some(dir_a), Some(dir_b)) = (dir_c, dir_a, dir_b) else {
        return [false; 3];
    };

    let dot_a = dir_a.dot(&dir_c);
    let dot_b = dir_b.dot(&dir_c);

    let mut rev = [false; 3];
    let flip_a = if dot_a.abs() < 0.1 {
        spoke_vote(center, a) < 0
    } else {
        dot_a < 0.0
    };
    let flip_b = if dot_b.abs() < 0.1 {
        spoke_vote(center, b) < 0
    } else {
        dot_b < 0.0
    };

    if flip_a && flip_b {
        rev[0] = true;
    } else {
        rev[1] = flip_a;
        rev[2] = flip_b;
    }
    apply(center, a, b, rev);
    rev
}

fn apply(center: &mut [Point3], a: &mut [Point3], b: &mut [Point3], rev: Reversals) {
    if rev[0] {
        center.reverse();
    }
    if rev[1] {
        a.reverse();
    }
    if rev[2] {
        b.reverse();
    }
}

/// Net progression vector: normalized sum of consecutive deltas.
fn net_direction(poly: &[Point3]) -> Option<Vec3> {
    let mut acc = Vec3::zeros();
    for w in poly.windows(2) {
        acc += w[1] - w[0];
    }
    try_normalize(&acc, 1e-12)
}

/// Sign vote over sampled index triples: does the companion's spoke
/// rotate the same way around the centerline at the start as at the end?
/// Compares the cross of progression and spoke against its value at the
/// first sampled triple.
fn spoke_vote(center: &[Point3], x: &[Point3]) -> i32 {
    let n = center.len();
    if n < 3 {
        return 1;
    }
    let probes = [n / 4, n / 2, (3 * n) / 4];
    let mut reference: Option<Vec3> = None;
    let mut vote = 0;
    for &i in &probes {
        let i = i.clamp(1, n - 2);
        let progression = center[i + 1] - center[i - 1];
        let spoke = x[i] - center[i];
        let cross = progression.cross(&spoke);
        match &reference {
            None => {
                reference = Some(cross);
                vote += 1;
            }
            Some(r) => {
                vote += if cross.dot(r) >= 0.0 { 1 } else { -1 };
            }
        }
    }
    vote
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight_triple(n: usize) -> (Vec<Point3>, Vec<Point3>, Vec<Point3>) {
        let center: Vec<Point3> = (0..n).map(|i| Point3::new(i as f64, 0.0, 0.0)).collect();
        let a = center
            .iter()
            .map(|p| Point3::new(p.x, 1.0, 0.0))
            .collect();
        let b = center
            .iter()
            .map(|p| Point3::new(p.x, 0.0, 1.0))
            .collect();
        (center, a, b)
    }

    #[test]
    fn test_align_by_radius_recovers_reversed_companion() {
        let (mut c, mut a, mut b) = straight_triple(9);
        a.reverse();
        let rev = align_by_radius(&mut c, &mut a, &mut b, 1.0);
        assert_eq!(rev, [false, true, false]);
        for i in 0..c.len() {
            assert!(((c[i] - a[i]).norm() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_align_by_radius_idempotent() {
        let (mut c, mut a, mut b) = straight_triple(9);
        let first = align_by_radius(&mut c, &mut a, &mut b, 1.0);
        assert_eq!(first, [false, false, false]);
        let second = align_by_radius(&mut c, &mut a, &mut b, 1.0);
        assert_eq!(second, [false, false, false]);
    }

    #[test]
    fn test_align_by_direction_flips_opposing_companion() {
        let (mut c, mut a, mut b) = straight_triple(9);
        b.reverse();
        let rev = align_by_direction(&mut c, &mut a, &mut b);
        assert_eq!(rev, [false, false, true]);
        assert!((b[0].x - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_align_by_direction_prefers_flipping_centerline() {
        let (mut c, mut a, mut b) = straight_triple(9);
        a.reverse();
        b.reverse();
        let rev = align_by_direction(&mut c, &mut a, &mut b);
        // Flipping the centerline alone beats two companion flips
        assert_eq!(rev, [true, false, false]);
    }

    #[test]
    fn test_align_by_direction_idempotent() {
        let (mut c, mut a, mut b) = straight_triple(9);
        align_by_direction(&mut c, &mut a, &mut b);
        let again = align_by_direction(&mut c, &mut a, &mut b);
        assert_eq!(again, [false, false, false]);
    }
}
