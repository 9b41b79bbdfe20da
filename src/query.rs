use std::{
    cmp::{Ordering, Reverse},
    fmt,
    str::FromStr,
};

use icu_collator::{Collator, CollatorOptions};
use serde::{Deserialize, Serialize};

use crate::{record::BookmarkRecord, store::RecordStore};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    #[default]
    DateDesc,
    DateAsc,
    TitleAsc,
    TitleDesc,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [
        SortKey::DateDesc,
        SortKey::DateAsc,
        SortKey::TitleAsc,
        SortKey::TitleDesc,
    ];

    pub fn next(self) -> Self {
        match self {
            SortKey::DateDesc => SortKey::DateAsc,
            SortKey::DateAsc => SortKey::TitleAsc,
            SortKey::TitleAsc => SortKey::TitleDesc,
            SortKey::TitleDesc => SortKey::DateDesc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::DateDesc => "date-desc",
            SortKey::DateAsc => "date-asc",
            SortKey::TitleAsc => "title-asc",
            SortKey::TitleDesc => "title-desc",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortKey::DateDesc => "Newest first",
            SortKey::DateAsc => "Oldest first",
            SortKey::TitleAsc => "Title A-Z",
            SortKey::TitleDesc => "Title Z-A",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown sort key {0:?} (expected date-desc, date-asc, title-asc or title-desc)")]
pub struct UnknownSortKey(pub String);

impl FromStr for SortKey {
    type Err = UnknownSortKey;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        SortKey::ALL
            .into_iter()
            .find(|key| key.as_str() == value.trim())
            .ok_or_else(|| UnknownSortKey(value.to_string()))
    }
}

/// The three independent user inputs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryState {
    pub search_text: String,
    /// Empty means no category filter.
    pub category: String,
    pub sort_key: SortKey,
}

/// Store indices of the records passing the current filter, in display order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DerivedView {
    indices: Vec<usize>,
}

impl DerivedView {
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn records<'a>(
        &'a self,
        store: &'a RecordStore,
    ) -> impl Iterator<Item = &'a BookmarkRecord> + 'a {
        self.indices.iter().filter_map(move |index| store.get(*index))
    }
}

pub fn derive_view(store: &RecordStore, query: &QueryState) -> DerivedView {
    let mut indices = filter_indices(store, query);
    sort_indices(&mut indices, store, query.sort_key);
    DerivedView { indices }
}

pub fn filter_indices(store: &RecordStore, query: &QueryState) -> Vec<usize> {
    let needle = query.search_text.to_lowercase();
    store
        .records()
        .iter()
        .enumerate()
        .filter_map(|(index, record)| {
            if matches_record(record, &query.category, &needle) {
                Some(index)
            } else {
                None
            }
        })
        .collect()
}

fn matches_record(record: &BookmarkRecord, category: &str, needle: &str) -> bool {
    if !category.is_empty() && !record.has_category(category) {
        return false;
    }
    if needle.is_empty() {
        return true;
    }
    record.searchable_text().contains(needle)
}

/// Stable: records with equal keys keep their filter-stage order.
pub fn sort_indices(indices: &mut [usize], store: &RecordStore, sort_key: SortKey) {
    let records = store.records();
    match sort_key {
        SortKey::DateDesc => {
            indices.sort_by_cached_key(|index| Reverse(records[*index].sort_timestamp()))
        }
        SortKey::DateAsc => indices.sort_by_cached_key(|index| records[*index].sort_timestamp()),
        SortKey::TitleAsc | SortKey::TitleDesc => {
            let collator = TitleCollator::new();
            indices.sort_by(|a, b| {
                let (left, right) = (&records[*a].title, &records[*b].title);
                if sort_key == SortKey::TitleAsc {
                    collator.compare(left, right)
                } else {
                    collator.compare(right, left)
                }
            });
        }
    }
}

/// Root-locale collation for titles. Accents and case are secondary to the
/// base letters, so "Éclair" sorts among the E's and "apple" before "Banana".
pub struct TitleCollator {
    collator: Option<Collator>,
}

impl TitleCollator {
    pub fn new() -> Self {
        let collator = match Collator::try_new(&Default::default(), CollatorOptions::new()) {
            Ok(collator) => Some(collator),
            Err(err) => {
                tracing::warn!(error = %err, "root collator unavailable, comparing folded titles");
                None
            }
        };
        TitleCollator { collator }
    }

    pub fn compare(&self, left: &str, right: &str) -> Ordering {
        match &self.collator {
            Some(collator) => collator.compare(left, right),
            None => left
                .to_lowercase()
                .cmp(&right.to_lowercase())
                .then_with(|| right.cmp(left)),
        }
    }
}

impl Default for TitleCollator {
    fn default() -> Self {
        Self::new()
    }
}

pub fn compare_titles(left: &str, right: &str) -> Ordering {
    TitleCollator::new().compare(left, right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::sample;

    fn titles(view: &DerivedView, store: &RecordStore) -> Vec<String> {
        view.records(store).map(|r| r.title.clone()).collect()
    }

    fn two_record_store() -> RecordStore {
        RecordStore::new(vec![
            sample("A", "2024-01-01", &["x"]),
            sample("B", "2024-06-01", &["y"]),
        ])
    }

    #[test]
    fn empty_query_keeps_everything_sorted_by_date() {
        let store = two_record_store();
        let view = derive_view(&store, &QueryState::default());
        assert_eq!(view.len(), store.len());
        assert_eq!(titles(&view, &store), vec!["B", "A"]);
    }

    #[test]
    fn date_ascending_reverses_order() {
        let store = two_record_store();
        let query = QueryState {
            sort_key: SortKey::DateAsc,
            ..QueryState::default()
        };
        assert_eq!(titles(&derive_view(&store, &query), &store), vec!["A", "B"]);
    }

    #[test]
    fn category_filter_is_exact() {
        let store = two_record_store();
        let mut query = QueryState {
            category: "y".to_string(),
            ..QueryState::default()
        };
        assert_eq!(titles(&derive_view(&store, &query), &store), vec!["B"]);

        query.category = "z".to_string();
        assert!(derive_view(&store, &query).is_empty());

        let store = RecordStore::new(vec![sample("T", "2024-01-01", &["Technology"])]);
        let query = QueryState {
            category: "Tech".to_string(),
            ..QueryState::default()
        };
        assert!(derive_view(&store, &query).is_empty());
    }

    #[test]
    fn category_filter_is_case_sensitive() {
        let store = RecordStore::new(vec![sample("T", "2024-01-01", &["rust"])]);
        let query = QueryState {
            category: "Rust".to_string(),
            ..QueryState::default()
        };
        assert!(derive_view(&store, &query).is_empty());
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let mut record = sample("Snakes", "2024-01-01", &[]);
        record.description = "A python tutorial".to_string();
        let store = RecordStore::new(vec![record, sample("Other", "2024-01-02", &[])]);
        let query = QueryState {
            search_text: "PYTHON".to_string(),
            ..QueryState::default()
        };
        assert_eq!(titles(&derive_view(&store, &query), &store), vec!["Snakes"]);
    }

    #[test]
    fn search_matches_notes_and_categories() {
        let mut noted = sample("Noted", "2024-01-01", &[]);
        noted.notes = Some("gift idea".to_string());
        let store = RecordStore::new(vec![noted, sample("Tagged", "2024-01-02", &["Gifts"])]);
        let query = QueryState {
            search_text: "gift".to_string(),
            sort_key: SortKey::TitleAsc,
            ..QueryState::default()
        };
        assert_eq!(
            titles(&derive_view(&store, &query), &store),
            vec!["Noted", "Tagged"]
        );
    }

    #[test]
    fn search_can_match_across_field_boundary() {
        let mut record = sample("Alpha", "2024-01-01", &[]);
        record.description = "beta".to_string();
        let store = RecordStore::new(vec![record]);
        let query = QueryState {
            search_text: "alpha beta".to_string(),
            ..QueryState::default()
        };
        assert_eq!(derive_view(&store, &query).len(), 1);
    }

    #[test]
    fn search_and_category_are_conjunctive() {
        let store = RecordStore::new(vec![
            sample("Rust Book", "2024-01-01", &["docs"]),
            sample("Rust Blog", "2024-01-02", &["news"]),
        ]);
        let query = QueryState {
            search_text: "rust".to_string(),
            category: "news".to_string(),
            sort_key: SortKey::DateDesc,
        };
        assert_eq!(titles(&derive_view(&store, &query), &store), vec!["Rust Blog"]);
    }

    #[test]
    fn title_sort_with_search() {
        let store = RecordStore::new(vec![
            sample("Banana", "2024-01-01", &[]),
            sample("Apple", "2024-01-02", &[]),
        ]);
        let query = QueryState {
            search_text: "a".to_string(),
            sort_key: SortKey::TitleAsc,
            ..QueryState::default()
        };
        assert_eq!(
            titles(&derive_view(&store, &query), &store),
            vec!["Apple", "Banana"]
        );

        let query = QueryState {
            sort_key: SortKey::TitleDesc,
            ..query
        };
        assert_eq!(
            titles(&derive_view(&store, &query), &store),
            vec!["Banana", "Apple"]
        );
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let store = RecordStore::new(vec![
            sample("First", "2024-02-01", &[]),
            sample("Second", "2024-02-01", &[]),
            sample("Newer", "2024-03-01", &[]),
            sample("Third", "2024-02-01", &[]),
        ]);
        let view = derive_view(&store, &QueryState::default());
        assert_eq!(
            titles(&view, &store),
            vec!["Newer", "First", "Second", "Third"]
        );

        let store = RecordStore::new(vec![
            sample("Same", "2024-01-01", &["one"]),
            sample("Same", "2024-05-01", &["two"]),
        ]);
        let query = QueryState {
            sort_key: SortKey::TitleAsc,
            ..QueryState::default()
        };
        assert_eq!(derive_view(&store, &query).indices(), &[0, 1]);
    }

    #[test]
    fn invalid_dates_sort_as_oldest() {
        let store = RecordStore::new(vec![
            sample("Broken", "not a date", &[]),
            sample("Valid", "2001-01-01", &[]),
        ]);
        let view = derive_view(&store, &QueryState::default());
        assert_eq!(titles(&view, &store), vec!["Valid", "Broken"]);
    }

    #[test]
    fn derivation_is_idempotent() {
        let store = RecordStore::new(vec![
            sample("Gamma", "2023-01-01", &["c"]),
            sample("alpha", "2023-01-01", &["a"]),
            sample("Beta", "2022-01-01", &["a"]),
        ]);
        let query = QueryState {
            search_text: "a".to_string(),
            category: "a".to_string(),
            sort_key: SortKey::TitleAsc,
        };
        let first = derive_view(&store, &query);
        let second = derive_view(&store, &query);
        assert_eq!(first, second);
        assert_eq!(titles(&first, &store), vec!["alpha", "Beta"]);
    }

    #[test]
    fn titles_compare_like_a_collator() {
        assert_eq!(compare_titles("apple", "Banana"), Ordering::Less);
        assert_eq!(compare_titles("a", "A"), Ordering::Less);
        assert_eq!(compare_titles("Same", "Same"), Ordering::Equal);
        assert_eq!(compare_titles("Éclair", "Zebra"), Ordering::Less);
        assert_eq!(compare_titles("éclair", "Eclipse"), Ordering::Less);
        assert_eq!(compare_titles("Eclair", "Éclair"), Ordering::Less);
    }

    #[test]
    fn accented_titles_sort_with_their_base_letter() {
        let store = RecordStore::new(vec![
            sample("Zebra", "2024-01-01", &[]),
            sample("Éclair", "2024-01-02", &[]),
            sample("apple", "2024-01-03", &[]),
            sample("Fig", "2024-01-04", &[]),
            sample("eclipse", "2024-01-05", &[]),
        ]);
        let query = QueryState {
            sort_key: SortKey::TitleAsc,
            ..QueryState::default()
        };
        assert_eq!(
            titles(&derive_view(&store, &query), &store),
            vec!["apple", "Éclair", "eclipse", "Fig", "Zebra"]
        );

        let query = QueryState {
            sort_key: SortKey::TitleDesc,
            ..query
        };
        assert_eq!(
            titles(&derive_view(&store, &query), &store),
            vec!["Zebra", "Fig", "eclipse", "Éclair", "apple"]
        );
    }

    #[test]
    fn date_sort_keeps_ties_in_filter_order_both_ways() {
        let store = RecordStore::new(vec![
            sample("First", "2024-02-01T09:00Z", &[]),
            sample("Second", "2024-02-01T09:00:00+00:00", &[]),
            sample("Older", "2023-12-01", &[]),
        ]);
        let query = QueryState::default();
        assert_eq!(
            titles(&derive_view(&store, &query), &store),
            vec!["First", "Second", "Older"]
        );
        let query = QueryState {
            sort_key: SortKey::DateAsc,
            ..query
        };
        assert_eq!(
            titles(&derive_view(&store, &query), &store),
            vec!["Older", "First", "Second"]
        );
    }

    #[test]
    fn sort_keys_parse_and_cycle() {
        assert_eq!("title-desc".parse::<SortKey>().unwrap(), SortKey::TitleDesc);
        assert!("newest".parse::<SortKey>().is_err());
        let mut key = SortKey::default();
        for _ in 0..SortKey::ALL.len() {
            key = key.next();
        }
        assert_eq!(key, SortKey::DateDesc);
    }
}
