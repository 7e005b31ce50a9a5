//! Pareto filtering on (cost, transfers).

/// Returns true if `a` is at least as good as `b` on both criteria and
/// strictly better on one.
pub fn dominates(a: (i64, usize), b: (i64, usize)) -> bool {
    a.0 <= b.0 && a.1 <= b.1 && (a.0 < b.0 || a.1 < b.1)
}

/// Remove items dominated on `(cost, transfers)`.
///
/// Items with identical keys are all kept. Relative order of survivors is
/// preserved.
pub fn remove_dominated<T, F>(items: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> (i64, usize),
{
    if items.len() <= 1 {
        return items;
    }

    let mut result: Vec<T> = Vec::with_capacity(items.len());

    for item in items {
        let k = key(&item);
        let dominated = result.iter().any(|existing| dominates(key(existing), k));

        if !dominated {
            result.retain(|existing| !dominates(k, key(existing)));
            result.push(item);
        }
    }

    result
}
