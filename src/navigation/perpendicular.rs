//! Perpendicular detection over a distance scan
//!
//! A beam that hits a flat wall at a right angle returns the shortest range,
//! so the direction nearest-normal to a wall sits at the center of the
//! lowest dip in an ordered scan. Plateaus are resolved to their midpoint.

/// Index of the scan direction nearest-normal to a wall.
///
/// Index 0 cannot be a candidate on the forward pass since it has no left
/// context; when no interior minimum exists the reversed scan is searched
/// once and its result mirrored back. Returns `None` only for an empty scan.
pub fn find_perpendicular<T: PartialOrd + Copy>(distances: &[T]) -> Option<usize> {
    if distances.is_empty() {
        return None;
    }

    if let Some(index) = find_dip(distances) {
        return Some(index);
    }

    let reversed: Vec<T> = distances.iter().rev().copied().collect();
    match find_dip(&reversed) {
        Some(index) => Some(distances.len() - 1 - index),
        None => Some(0),
    }
}

/// Single forward pass: lowest value with an interior local minimum
fn find_dip<T: PartialOrd + Copy>(distances: &[T]) -> Option<usize> {
    let mut values: Vec<T> = distances.to_vec();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    values.dedup_by(|a, b| a == b);

    for value in values {
        for i in 1..distances.len() {
            if distances[i] != value || is_on_slope(distances, i) {
                continue;
            }

            let mut left_bound = i;
            while left_bound > 0 && !(distances[left_bound - 1] > value) {
                left_bound -= 1;
            }
            let mut right_bound = i;
            while right_bound + 1 < distances.len() && !(distances[right_bound + 1] > value) {
                right_bound += 1;
            }

            return Some((left_bound + right_bound) / 2);
        }
    }
    None
}

/// True if either neighbour is strictly smaller
fn is_on_slope<T: PartialOrd + Copy>(distances: &[T], i: usize) -> bool {
    let value = distances[i];
    let left_smaller = i > 0 && distances[i - 1] < value;
    let right_smaller = i + 1 < distances.len() && distances[i + 1] < value;
    left_smaller || right_smaller
}
