use std::collections::BTreeSet;

use crate::store::RecordStore;

pub const ALL_CATEGORIES_LABEL: &str = "All Categories";

/// Distinct categories in lexicographic order, led by the empty
/// "all categories" sentinel.
pub fn category_index(store: &RecordStore) -> Vec<String> {
    let distinct: BTreeSet<&str> = store
        .records()
        .iter()
        .flat_map(|record| record.categories.iter().map(String::as_str))
        .collect();
    let mut out = Vec::with_capacity(distinct.len() + 1);
    out.push(String::new());
    out.extend(distinct.into_iter().map(str::to_string));
    out
}

pub fn category_label(value: &str) -> &str {
    if value.is_empty() {
        ALL_CATEGORIES_LABEL
    } else {
        value
    }
}
