//! Self-intersection collapse for open chamfer rails.
//!
//! A rail offset from a sharply bending edge can cross itself; a
//! crossing rail produces an inverted, self-intersecting bevel. The
//! resolver projects the rail onto its own best-fit plane, scans
//! non-adjacent segment pairs for 2D intersections, and collapses the
//! index range between the two hits into a single averaged point,
//! applied at identical indices across the whole rail triple so
//! cross-section correspondence survives.

use arris_math::{best_fit_plane, lerp_point, Point2, Point3};

/// Result of a resolution run.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossingStats {
    /// Collapse operations performed.
    pub collapses: usize,
    /// Scan iterations used.
    pub iterations: usize,
}

/// Count planar self-crossings of a polyline (non-adjacent segments).
pub fn count_crossings(points: &[Point3]) -> usize {
    let Some(projected) = project_to_plane(points) else {
        return 0;
    };
    let mut count = 0;
    let segs = projected.len().saturating_sub(1);
    for i in 0..segs {
        for j in (i + 2)..segs {
            if segment_intersection(
                &projected[i],
                &projected[i + 1],
                &projected[j],
                &projected[j + 1],
            )
            .is_some()
            {
                count += 1;
            }
        }
    }
    count
}

/// Collapse self-crossings of the rail at index `primary`, editing every
/// rail in the triple at identical indices. Returns the work done.
///
/// Bounded: stops when no crossing remains or the iteration cap
/// `min(4096, points² × rails)` is reached.
pub fn resolve_crossings(mut rails: [&mut Vec<Point3>; 3], primary: usize) -> CrossingStats {
    let mut stats = CrossingStats::default();
    let n0 = rails[primary].len();
    let cap = 4096usize.min(n0 * n0 * rails.len()).max(1);

    while stats.iterations < cap {
        stats.iterations += 1;

        let Some(projected) = project_to_plane(rails[primary].as_slice()) else {
            break;
        };
        let segs = projected.len().saturating_sub(1);
        let mut hit: Option<(usize, usize, f64, f64)> = None;
        'scan: for i in 0..segs {
            for j in (i + 2)..segs {
                if let Some((t, u)) = segment_intersection(
                    &projected[i],
                    &projected[i + 1],
                    &projected[j],
                    &projected[j + 1],
                ) {
                    hit = Some((i, j, t, u));
                    break 'scan;
                }
            }
        }

        let Some((i, j, t, u)) = hit else {
            break;
        };

        // Collapse indices i+1..=j into one averaged point, lockstep
        // across all rails
        for rail in rails.iter_mut() {
            let a = lerp_point(&rail[i], &rail[i + 1], t);
            let b = lerp_point(&rail[j], &rail[j + 1], u);
            let merged = lerp_point(&a, &b, 0.5);
            rail.splice(i + 1..=j, std::iter::once(merged));
        }
        stats.collapses += 1;
    }
    stats
}

fn project_to_plane(points: &[Point3]) -> Option<Vec<Point2>> {
    let plane = best_fit_plane(points)?;
    Some(points.iter().map(|p| plane.project(p)).collect())
}

/// Proper 2D segment intersection (interior of both segments), with a
/// small parameter margin so shared endpoints do not count.
fn segment_intersection(a0: &Point2, a1: &Point2, b0: &Point2, b1: &Point2) -> Option<(f64, f64)> {
    let r = a1 - a0;
    let s = b1 - b0;
    let denom = r.x * s.y - r.y * s.x;
    if denom.abs() < 1e-15 {
        return None;
    }
    let d = b0 - a0;
    let t = (d.x * s.y - d.y * s.x) / denom;
    let u = (d.x * r.y - d.y * r.x) / denom;
    const MARGIN: f64 = 1e-9;
    if t > MARGIN && t < 1.0 - MARGIN && u > MARGIN && u < 1.0 - MARGIN {
        Some((t, u))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bowtie_rail() -> Vec<Point3> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
            Point3::new(4.0, 2.0, 0.0),
            Point3::new(2.0, -1.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ]
    }

    #[test]
    fn test_count_crossings_detects_bowtie() {
        assert_eq!(count_crossings(&bowtie_rail()), 2);
        let straight: Vec<Point3> =
            (0..5).map(|i| Point3::new(i as f64, 0.0, 0.0)).collect();
        assert_eq!(count_crossings(&straight), 0);
    }

    #[test]
    fn test_resolve_reduces_crossings_in_lockstep() {
        let mut primary = bowtie_rail();
        let mut companion_a: Vec<Point3> = primary
            .iter()
            .map(|p| Point3::new(p.x, p.y, 1.0))
            .collect();
        let mut companion_b: Vec<Point3> = primary
            .iter()
            .map(|p| Point3::new(p.x, p.y, -1.0))
            .collect();

        let before = count_crossings(&primary);
        let stats = resolve_crossings([&mut primary, &mut companion_a, &mut companion_b], 0);
        assert!(stats.collapses >= 1);
        let after = count_crossings(&primary);
        assert!(after < before, "crossings must strictly decrease");
        assert_eq!(after, 0);

        // Lockstep: all rails collapsed at identical indices
        assert_eq!(primary.len(), companion_a.len());
        assert_eq!(primary.len(), companion_b.len());
    }

    #[test]
    fn test_resolve_noop_on_clean_rail() {
        let mut primary: Vec<Point3> =
            (0..6).map(|i| Point3::new(i as f64, (i % 2) as f64, 0.0)).collect();
        let original = primary.clone();
        let mut a = primary.clone();
        let mut b = primary.clone();
        let stats = resolve_crossings([&mut primary, &mut a, &mut b], 0);
        assert_eq!(stats.collapses, 0);
        assert_eq!(primary, original);
    }

    #[test]
    fn test_iteration_cap_bounds_work() {
        let mut primary = bowtie_rail();
        let mut a = bowtie_rail();
        let mut b = bowtie_rail();
        let stats = resolve_crossings([&mut primary, &mut a, &mut b], 0);
        assert!(stats.iterations <= 4096usize.min(5 * 5 * 3));
    }
}
