//! Cutting trip shapes down to the ridden section.

use crate::domain::LatLon;

/// Index of the shape vertex closest to `target`.
fn nearest_vertex(shape: &[LatLon], target: LatLon) -> usize {
    shape
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            a.approx_distance_sq(&target)
                .total_cmp(&b.approx_distance_sq(&target))
        })
        .map_or(0, |(i, _)| i)
}

/// The part of `shape` between the vertices nearest to `from` and `to`,
/// in travel order.
///
/// Returns `None` if the shape has fewer than two vertices. If the section
/// collapses to a single vertex, the straight line `from -> to` is returned
/// instead.
pub fn extract_section(shape: &[LatLon], from: LatLon, to: LatLon) -> Option<Vec<LatLon>> {
    if shape.len() < 2 {
        return None;
    }

    let start = nearest_vertex(shape, from);
    let end = nearest_vertex(shape, to);

    let section: Vec<LatLon> = if start <= end {
        shape[start..=end].to_vec()
    } else {
        shape[end..=start].iter().rev().copied().collect()
    };

    if section.len() < 2 {
        return Some(vec![from, to]);
    }
    Some(section)
}
