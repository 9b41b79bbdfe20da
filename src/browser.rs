use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::{
    category::category_index,
    debounce::Debouncer,
    present::{present, Page},
    query::{derive_view, DerivedView, QueryState, SortKey},
    store::{LoadError, RecordStore},
};

/// Owns the loaded store and the three user inputs, and keeps the derived
/// view in step with them. Every accepted input recomputes the whole view.
pub struct Browser {
    store: RecordStore,
    categories: Vec<String>,
    query: QueryState,
    view: DerivedView,
    search_input: String,
    debouncer: Debouncer,
    load_error: Option<LoadError>,
}

impl Browser {
    pub fn new(store: RecordStore, debouncer: Debouncer) -> Self {
        Self::with_sort(store, debouncer, SortKey::default())
    }

    pub fn with_sort(store: RecordStore, debouncer: Debouncer, sort_key: SortKey) -> Self {
        let categories = category_index(&store);
        let query = QueryState {
            sort_key,
            ..QueryState::default()
        };
        let view = derive_view(&store, &query);
        Self {
            store,
            categories,
            query,
            view,
            search_input: String::new(),
            debouncer,
            load_error: None,
        }
    }

    /// A failed load leaves an empty, inert browser that reports the failure.
    pub fn from_load(
        result: Result<RecordStore, LoadError>,
        debouncer: Debouncer,
        sort_key: SortKey,
    ) -> Self {
        match result {
            Ok(store) => Self::with_sort(store, debouncer, sort_key),
            Err(err) => {
                tracing::error!(error = %err, "failed to load bookmarks");
                let mut browser = Self::with_sort(RecordStore::default(), debouncer, sort_key);
                browser.load_error = Some(err);
                browser
            }
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn query(&self) -> &QueryState {
        &self.query
    }

    pub fn view(&self) -> &DerivedView {
        &self.view
    }

    pub fn search_input(&self) -> &str {
        &self.search_input
    }

    pub fn load_error(&self) -> Option<&LoadError> {
        self.load_error.as_ref()
    }

    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    /// Records a keystroke's worth of search text; the view catches up once
    /// typing pauses (see [`Browser::tick`]).
    pub fn input_search(&mut self, raw: &str, now: Instant) {
        if self.search_input == raw {
            return;
        }
        self.search_input = raw.to_string();
        self.debouncer.schedule(now);
    }

    /// Returns true when a pending search was applied and changed the query.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.debouncer.fire(now) {
            tracing::debug!(search = %self.search_input, "debounced search fired");
            return self.apply_search();
        }
        false
    }

    pub fn commit_search(&mut self) -> bool {
        self.debouncer.cancel();
        self.apply_search()
    }

    pub fn set_category(&mut self, category: &str) -> bool {
        if self.query.category == category {
            return false;
        }
        self.query.category = category.to_string();
        self.recompute();
        true
    }

    pub fn cycle_category(&mut self, forward: bool) -> bool {
        let len = self.categories.len();
        if len <= 1 {
            return false;
        }
        let current = self
            .categories
            .iter()
            .position(|value| *value == self.query.category)
            .unwrap_or(0);
        let next = if forward {
            (current + 1) % len
        } else {
            (current + len - 1) % len
        };
        let value = self.categories[next].clone();
        self.set_category(&value)
    }

    pub fn set_sort(&mut self, sort_key: SortKey) -> bool {
        if self.query.sort_key == sort_key {
            return false;
        }
        self.query.sort_key = sort_key;
        self.recompute();
        true
    }

    pub fn cycle_sort(&mut self) -> bool {
        self.set_sort(self.query.sort_key.next())
    }

    pub fn page(&self, now: DateTime<Utc>) -> Page {
        match &self.load_error {
            Some(err) => Page::load_failed(err),
            None => present(&self.store, &self.view, now),
        }
    }

    fn apply_search(&mut self) -> bool {
        let trimmed = self.search_input.trim();
        if self.query.search_text == trimmed {
            return false;
        }
        self.query.search_text = trimmed.to_string();
        self.recompute();
        true
    }

    fn recompute(&mut self) {
        self.view = derive_view(&self.store, &self.query);
    }
}
