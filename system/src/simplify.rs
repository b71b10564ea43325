//! Ramer-Douglas-Peucker reduction of a sampled pointer trace.

use euclid::default::Point2D;

use crate::types::Position;

/// Distance from `point` to the segment `start`-`end`.
///
/// A degenerate segment (`start == end`) measures the distance to `start`.
pub fn segment_distance(point: Point2D<f64>, start: Point2D<f64>, end: Point2D<f64>) -> f64 {
    let baseline = end - start;
    let len_sq = baseline.square_length();
    let closest = if len_sq == 0.0 {
        start
    } else {
        let t = ((point - start).dot(baseline) / len_sq).max(0.0).min(1.0);
        start + baseline * t
    };
    (point - closest).length()
}

/// Simplifies `points` so that no dropped point lies farther than `tolerance`
/// from the kept polyline. The first and last points are always kept.
///
/// Splits are processed with an explicit stack, so long traces do not grow
/// the call stack.
pub fn simplify(points: &[Point2D<f64>], tolerance: f64) -> Vec<Point2D<f64>> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let last = points.len() - 1;
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[last] = true;

    let mut pending = vec![(0, last)];
    while let Some((first, last)) = pending.pop() {
        if last - first < 2 {
            continue;
        }

        let (start, end) = (points[first], points[last]);
        let mut farthest = first + 1;
        let mut max_distance = segment_distance(points[farthest], start, end);
        for (index, point) in points.iter().enumerate().take(last).skip(first + 2) {
            let distance = segment_distance(*point, start, end);
            if distance > max_distance {
                max_distance = distance;
                farthest = index;
            }
        }

        if max_distance > tolerance {
            keep[farthest] = true;
            pending.push((farthest, last));
            pending.push((first, farthest));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(point, kept)| if kept { Some(*point) } else { None })
        .collect()
}

/// [`simplify`] over wire positions.
pub fn simplify_positions(positions: &[Position], tolerance: f64) -> Vec<Position> {
    let points: Vec<Point2D<f64>> = positions.iter().map(|p| (*p).into()).collect();
    simplify(&points, tolerance)
        .into_iter()
        .map(Position::from)
        .collect()
}
