//! Itinerary ranking.
//!
//! Candidates from every search window are merged, filtered for plausibility,
//! deduplicated, pruned of dominated options, and finally cut down to a small
//! set that favours variety of first-boarded route over raw cost.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::domain::Itinerary;
use crate::raptor::remove_dominated;

use super::EngineConfig;

/// Generalized cost of an itinerary, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    pub transfer_penalty_secs: f64,
    pub walk_speed: f64,
    pub walk_reluctance: f64,
}

impl CostModel {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            transfer_penalty_secs: f64::from(config.rank_transfer_penalty_secs),
            walk_speed: config.walk_speed,
            walk_reluctance: config.walk_reluctance,
        }
    }

    /// Duration, plus a penalty per transfer, plus walking time weighted by
    /// reluctance.
    pub fn cost(&self, itinerary: &Itinerary) -> f64 {
        itinerary.duration_seconds() as f64
            + itinerary.transfers() as f64 * self.transfer_penalty_secs
            + (itinerary.walk_distance_m() / self.walk_speed) * self.walk_reluctance
    }

    /// Cheaper first; equal costs put fewer transfers first.
    pub fn compare(&self, a: &Itinerary, b: &Itinerary) -> Ordering {
        self.cost(a)
            .total_cmp(&self.cost(b))
            .then_with(|| a.transfers().cmp(&b.transfers()))
    }

    fn pareto_key(&self, itinerary: &Itinerary) -> (i64, usize) {
        (self.cost(itinerary).round() as i64, itinerary.transfers())
    }
}

/// Longest acceptable duration given the best transit duration.
pub fn acceptable_duration(best_secs: i64) -> i64 {
    if best_secs < 900 {
        (best_secs * 2).max(best_secs + 1800)
    } else {
        best_secs * 2
    }
}

/// Drop transit itineraries that take implausibly long compared to the
/// fastest transit itinerary. Street-only itineraries are never dropped.
pub fn quality_filter(mut itineraries: Vec<Itinerary>) -> Vec<Itinerary> {
    let best = itineraries
        .iter()
        .filter(|it| !it.is_street_only())
        .map(Itinerary::duration_seconds)
        .min();

    if let Some(best) = best {
        let limit = acceptable_duration(best);
        itineraries.retain(|it| it.is_street_only() || it.duration_seconds() <= limit);
    }

    itineraries
}

/// Keep only the cheapest itinerary for each sequence of
/// `(route, board stop, alight stop)`.
pub fn deduplicate(mut itineraries: Vec<Itinerary>, model: &CostModel) -> Vec<Itinerary> {
    if itineraries.len() <= 1 {
        return itineraries;
    }

    itineraries.sort_by(|a, b| model.compare(a, b));

    let mut seen: HashSet<Vec<(String, Option<String>, Option<String>)>> = HashSet::new();
    itineraries.retain(|it| {
        let key = it
            .transit_signature()
            .into_iter()
            .map(|(route, board, alight)| {
                (
                    route.to_string(),
                    board.map(str::to_string),
                    alight.map(str::to_string),
                )
            })
            .collect();
        seen.insert(key)
    });

    itineraries
}

/// Within each group sharing a first-boarded route, remove itineraries
/// dominated on `(cost, transfers)`.
///
/// Groups keep the order in which their first member appeared.
pub fn remove_dominated_by_route(itineraries: Vec<Itinerary>, model: &CostModel) -> Vec<Itinerary> {
    let mut groups: Vec<(Option<String>, Vec<Itinerary>)> = Vec::new();

    for it in itineraries {
        let route = it.first_route_id().map(str::to_string);
        match groups.iter_mut().find(|(r, _)| *r == route) {
            Some((_, group)) => group.push(it),
            None => groups.push((route, vec![it])),
        }
    }

    groups
        .into_iter()
        .flat_map(|(_, group)| remove_dominated(group, |it| model.pareto_key(it)))
        .collect()
}

/// Pick at most `max` itineraries: the cheapest street-only one, the
/// cheapest of every distinct first-boarded route, then the cheapest of the
/// rest. Returned in cost order.
pub fn select_diverse(mut itineraries: Vec<Itinerary>, model: &CostModel, max: usize) -> Vec<Itinerary> {
    itineraries.sort_by(|a, b| model.compare(a, b));

    let mut picked = vec![false; itineraries.len()];
    let mut routes: HashSet<Option<&str>> = HashSet::new();
    let mut count = 0;

    let street_only = itineraries
        .iter()
        .position(Itinerary::is_street_only)
        .filter(|_| max > 0);
    if let Some(i) = street_only {
        picked[i] = true;
        routes.insert(None);
        count += 1;
    }

    for (i, it) in itineraries.iter().enumerate() {
        if count == max {
            break;
        }
        if !picked[i] && routes.insert(it.first_route_id()) {
            picked[i] = true;
            count += 1;
        }
    }
    for flag in picked.iter_mut() {
        if count == max {
            break;
        }
        if !*flag {
            *flag = true;
            count += 1;
        }
    }

    // `picked` is in cost order, so filtering preserves it.
    itineraries
        .into_iter()
        .zip(picked)
        .filter_map(|(it, keep)| keep.then_some(it))
        .collect()
}

/// The full ranking pipeline.
pub fn rank_itineraries(itineraries: Vec<Itinerary>, model: &CostModel, max: usize) -> Vec<Itinerary> {
    let filtered = quality_filter(itineraries);
    let unique = deduplicate(filtered, model);
    let pruned = remove_dominated_by_route(unique, model);
    select_diverse(pruned, model, max)
}


#[cfg(test)]
mod proptests {
    use super::tests::{itinerary, ride, walk};
    use super::*;
    use crate::raptor::dominates;
    use proptest::prelude::*;

    /// `(first route, optional second route, start, ride, wait, ride, walk metres)`
    type Params = (u8, Option<u8>, i64, i64, i64, i64, u16);

    fn build((r1, r2, start, d1, wait, d2, walk_m): Params) -> Itinerary {
        let walk_secs = (f64::from(walk_m) / 1.25).round() as i64;
        let board = start + walk_secs;
        let mut legs = vec![];
        if walk_m > 0 {
            legs.push(walk(start, board, f64::from(walk_m)));
        }
        legs.push(ride(&format!("L{r1}"), "A", "B", board, board + d1));
        if let Some(r2) = r2 {
            let dep = board + d1 + wait;
            legs.push(ride(&format!("L{r2}"), "B", "C", dep, dep + d2));
        }
        itinerary(legs)
    }

    fn itinerary_strategy() -> impl Strategy<Value = Itinerary> {
        (
            0u8..4,
            prop::option::of(0u8..4),
            0i64..3600,
            300i64..2400,
            0i64..900,
            300i64..2400,
            0u16..800,
        )
            .prop_map(build)
    }

    fn itineraries_strategy() -> impl Strategy<Value = Vec<Itinerary>> {
        prop::collection::vec(itinerary_strategy(), 0..15)
    }

    fn model() -> CostModel {
        CostModel::from_config(&EngineConfig::default())
    }

    proptest! {
        #[test]
        fn ranked_is_bounded_and_sorted(its in itineraries_strategy(), max in 1usize..6) {
            let m = model();
            let result = rank_itineraries(its, &m, max);

            prop_assert!(result.len() <= max);
            for w in result.windows(2) {
                prop_assert!(m.compare(&w[0], &w[1]) != Ordering::Greater);
            }
        }

        #[test]
        fn no_domination_within_a_first_route(its in itineraries_strategy()) {
            let m = model();
            let result = rank_itineraries(its, &m, 10);

            for a in &result {
                for b in &result {
                    if a.first_route_id() == b.first_route_id() {
                        prop_assert!(!dominates(m.pareto_key(a), m.pareto_key(b)));
                    }
                }
            }
        }

        #[test]
        fn signatures_are_unique(its in itineraries_strategy()) {
            let result = deduplicate(its, &model());
            let mut seen = HashSet::new();
            for it in &result {
                let signature = format!("{:?}", it.transit_signature());
                prop_assert!(seen.insert(signature));
            }
        }

        #[test]
        fn every_first_route_is_represented_when_room(its in itineraries_strategy()) {
            let m = model();
            let pruned = remove_dominated_by_route(deduplicate(its, &m), &m);
            let distinct: HashSet<Option<String>> = pruned
                .iter()
                .map(|it| it.first_route_id().map(str::to_string))
                .collect();

            let result = select_diverse(pruned, &m, distinct.len());
            let picked: HashSet<Option<String>> = result
                .iter()
                .map(|it| it.first_route_id().map(str::to_string))
                .collect();
            prop_assert_eq!(picked, distinct);
        }
    }

    // Check the generator actually produces dominated itineraries.
    #[test]
    fn remove_dominated_by_route_distribution() {
        use proptest::test_runner::{Config, TestRunner};
        use std::cell::Cell;

        let mut runner = TestRunner::new(Config::with_cases(300));
        let pruned_count = Cell::new(0u32);
        let total_tests = Cell::new(0u32);

        let _ = runner.run(&itineraries_strategy(), |its| {
            let original_len = its.len();
            let result = remove_dominated_by_route(its, &model());

            if result.len() < original_len {
                pruned_count.set(pruned_count.get() + 1);
            }
            total_tests.set(total_tests.get() + 1);
            Ok(())
        });

        assert!(
            pruned_count.get() > 0,
            "Never pruned an itinerary in {} tests",
            total_tests.get()
        );
    }
}
