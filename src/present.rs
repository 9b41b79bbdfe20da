use chrono::{DateTime, Utc};
use url::Url;

use crate::{
    query::DerivedView,
    record::BookmarkRecord,
    store::{LoadError, RecordStore},
    AppResult,
};

pub const NO_RESULTS_MESSAGE: &str = "No bookmarks found. Try adjusting your search or filters.";
pub const INVALID_DATE_LABEL: &str = "Invalid Date";

/// Something that can display a presented page: a terminal frame, an HTML
/// document, a test recorder.
pub trait Surface {
    fn render(&mut self, page: &Page) -> AppResult<()>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Favicon {
    /// The surface shows `fallback` if the image cannot be displayed.
    Image { src: String, fallback: String },
    Placeholder(String),
}

impl Favicon {
    pub fn glyph(&self) -> &str {
        match self {
            Favicon::Image { fallback, .. } => fallback,
            Favicon::Placeholder(glyph) => glyph,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Card {
    pub favicon: Favicon,
    pub title: String,
    pub url: String,
    pub display_url: String,
    pub description: String,
    pub tags: Vec<String>,
    pub date_label: String,
    pub notes: Option<String>,
}

impl Card {
    pub fn from_record(record: &BookmarkRecord, now: DateTime<Utc>) -> Self {
        let glyph = record.placeholder_glyph();
        let favicon = match record.favicon.as_deref() {
            Some(src) if !src.trim().is_empty() => Favicon::Image {
                src: src.to_string(),
                fallback: glyph,
            },
            _ => Favicon::Placeholder(glyph),
        };
        Card {
            favicon,
            title: record.title.clone(),
            url: record.url.clone(),
            display_url: truncate_url(&record.url),
            description: record.description.clone(),
            tags: record.categories.clone(),
            date_label: relative_date_label(record.added_at(), now),
            notes: record.notes.clone().filter(|value| !value.is_empty()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Listing {
    Cards(Vec<Card>),
    NoResults,
    LoadFailed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page {
    pub summary: String,
    pub listing: Listing,
}

impl Page {
    /// No count is shown; the failure message is the whole page.
    pub fn load_failed(error: &LoadError) -> Self {
        Page {
            summary: String::new(),
            listing: Listing::LoadFailed(error.user_message().to_string()),
        }
    }

    pub fn cards(&self) -> &[Card] {
        match &self.listing {
            Listing::Cards(cards) => cards,
            _ => &[],
        }
    }
}

pub fn present(store: &RecordStore, view: &DerivedView, now: DateTime<Utc>) -> Page {
    let listing = if view.is_empty() {
        Listing::NoResults
    } else {
        Listing::Cards(
            view.records(store)
                .map(|record| Card::from_record(record, now))
                .collect(),
        )
    };
    Page {
        summary: summary(view.len(), store.len()),
        listing,
    }
}

pub fn summary(shown: usize, total: usize) -> String {
    if shown == total {
        format!("Showing all {} bookmarks", total)
    } else {
        format!("Showing {} of {} bookmarks", shown, total)
    }
}

/// Host and path only; the raw string when it is not an absolute URL.
pub fn truncate_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(parsed) => format!("{}{}", parsed.host_str().unwrap_or(""), parsed.path()),
        Err(_) => raw.to_string(),
    }
}

pub fn relative_date_label(added: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(added) = added else {
        return INVALID_DATE_LABEL.to_string();
    };
    let days = (now.date_naive() - added.date_naive()).num_days().abs();
    match days {
        0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        2..=6 => format!("{} days ago", days),
        7..=29 => format!("{} weeks ago", days / 7),
        30..=364 => format!("{} months ago", days / 30),
        _ => added.format("%b %-d, %Y").to_string(),
    }
}
