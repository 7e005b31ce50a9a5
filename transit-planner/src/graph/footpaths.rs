//! Walking transfers between stops.

use crate::domain::{LatLon, StopIdx, travel_seconds};

/// A walk from one stop to another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footpath {
    pub to: StopIdx,
    pub distance_m: f64,
    pub walk_seconds: u32,
}

/// Pair every two stops closer than `max_distance_m` and insert a footpath
/// in both directions.
///
/// Quadratic in the number of stops. Each stop's list is sorted by distance.
pub fn build_footpaths(
    positions: &[LatLon],
    max_distance_m: f64,
    walk_speed: f64,
) -> Vec<Vec<Footpath>> {
    let mut paths: Vec<Vec<Footpath>> = vec![Vec::new(); positions.len()];

    for i in 0..positions.len() {
        for j in (i + 1)..positions.len() {
            let distance_m = positions[i].distance_m(&positions[j]);
            if distance_m > max_distance_m {
                continue;
            }
            let walk_seconds = travel_seconds(distance_m, walk_speed);
            paths[i].push(Footpath {
                to: StopIdx(j),
                distance_m,
                walk_seconds,
            });
            paths[j].push(Footpath {
                to: StopIdx(i),
                distance_m,
                walk_seconds,
            });
        }
    }

    sort_by_distance(&mut paths);
    paths
}

/// Apply explicit transfer records `(from, to, min_transfer_time)` on top
/// of generated footpaths.
///
/// A record for a pair that already has a footpath sets its walk time when
/// the record gives one; a record for any other pair adds a footpath with
/// the distance from the stop positions. Self-transfers are ignored.
pub fn apply_transfers(
    paths: &mut [Vec<Footpath>],
    positions: &[LatLon],
    transfers: &[(StopIdx, StopIdx, Option<u32>)],
    walk_speed: f64,
) {
    for &(from, to, min_time) in transfers {
        if from == to {
            continue;
        }
        let list = &mut paths[from.0];
        match list.iter_mut().find(|fp| fp.to == to) {
            Some(existing) => {
                if let Some(seconds) = min_time {
                    existing.walk_seconds = seconds;
                }
            }
            None => {
                let distance_m = positions[from.0].distance_m(&positions[to.0]);
                list.push(Footpath {
                    to,
                    distance_m,
                    walk_seconds: min_time
                        .unwrap_or_else(|| travel_seconds(distance_m, walk_speed)),
                });
            }
        }
    }

    sort_by_distance(paths);
}

fn sort_by_distance(paths: &mut [Vec<Footpath>]) {
    for list in paths {
        list.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_positions() -> impl Strategy<Value = Vec<LatLon>> {
        proptest::collection::vec(
            (45.17f64..45.20, 0.70f64..0.74).prop_map(|(lat, lon)| LatLon::new(lat, lon)),
            0..40,
        )
    }

    proptest! {
        /// Every generated footpath has a mirror with identical distance and
        /// time, and respects the radius.
        #[test]
        fn footpaths_are_symmetric_and_bounded(
            positions in arb_positions(),
            radius in 0.0f64..1500.0,
        ) {
            let paths = build_footpaths(&positions, radius, 1.25);
            prop_assert_eq!(paths.len(), positions.len());

            for (from, list) in paths.iter().enumerate() {
                for fp in list {
                    prop_assert!(fp.distance_m <= radius);
                    prop_assert_ne!(fp.to.0, from);
                    let back = paths[fp.to.0]
                        .iter()
                        .find(|b| b.to == StopIdx(from));
                    prop_assert!(back.is_some());
                    let back = back.unwrap();
                    prop_assert_eq!(back.distance_m, fp.distance_m);
                    prop_assert_eq!(back.walk_seconds, fp.walk_seconds);
                }
                prop_assert!(list.windows(2).all(|w| w[0].distance_m <= w[1].distance_m));
            }
        }
    }
}
