//! Keyed joins over typed record slices.
//!
//! Output order follows the left side; for each left row, matches follow the
//! right side's order. A key matching several rows yields one output row per
//! match, as a relational join does.

use std::collections::HashMap;
use std::hash::Hash;

fn index_by<'r, R, K, F>(right: &'r [R], right_key: F) -> HashMap<K, Vec<&'r R>>
where
    K: Eq + Hash,
    F: Fn(&'r R) -> Option<K>,
{
    let mut index: HashMap<K, Vec<&'r R>> = HashMap::new();
    for row in right {
        if let Some(key) = right_key(row) {
            index.entry(key).or_default().push(row);
        }
    }
    index
}

/// Rows present on both sides.
pub fn inner_join<'l, 'r, L, R, K, FL, FR>(
    left: &'l [L],
    right: &'r [R],
    left_key: FL,
    right_key: FR,
) -> Vec<(&'l L, &'r R)>
where
    K: Eq + Hash,
    FL: Fn(&'l L) -> K,
    FR: Fn(&'r R) -> Option<K>,
{
    let index = index_by(right, right_key);
    let mut joined = Vec::new();
    for row in left {
        if let Some(matches) = index.get(&left_key(row)) {
            joined.extend(matches.iter().map(|m| (row, *m)));
        }
    }
    joined
}

/// Every left row, paired with each right match or with `None`.
///
/// A left row whose key is `None` never matches.
pub fn left_join<'l, 'r, L, R, K, FL, FR>(
    left: &'l [L],
    right: &'r [R],
    left_key: FL,
    right_key: FR,
) -> Vec<(&'l L, Option<&'r R>)>
where
    K: Eq + Hash,
    FL: Fn(&'l L) -> Option<K>,
    FR: Fn(&'r R) -> Option<K>,
{
    let index = index_by(right, right_key);
    let mut joined = Vec::new();
    for row in left {
        match left_key(row).and_then(|key| index.get(&key)) {
            Some(matches) => joined.extend(matches.iter().map(|m| (row, Some(*m)))),
            None => joined.push((row, None)),
        }
    }
    joined
}
