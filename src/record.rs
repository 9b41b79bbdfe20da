use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const LOCAL_DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const OFFSET_DATE_TIME_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M%:z",
    "%Y-%m-%d %H:%M%z",
];

/// One saved link as it appears in the bookmarks file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkRecord {
    pub url: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub categories: Vec<String>,
    /// ISO-8601 timestamp or plain `YYYY-MM-DD` date.
    pub date_added: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
}

impl BookmarkRecord {
    pub fn added_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.date_added)
    }

    /// Milliseconds since the epoch; unparsable dates collapse to the epoch.
    pub fn sort_timestamp(&self) -> i64 {
        self.added_at()
            .map(|value| value.timestamp_millis())
            .unwrap_or(0)
    }

    pub fn placeholder_glyph(&self) -> String {
        self.title
            .chars()
            .next()
            .map(|ch| ch.to_uppercase().collect())
            .unwrap_or_default()
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|value| value == category)
    }

    /// Lowercased haystack for search. Fields are joined with a single space,
    /// so a query may match across the boundary of two fields.
    pub fn searchable_text(&self) -> String {
        let mut parts = vec![
            self.title.as_str(),
            self.description.as_str(),
            self.url.as_str(),
            self.notes.as_deref().unwrap_or(""),
        ];
        parts.extend(self.categories.iter().map(String::as_str));
        parts.join(" ").to_lowercase()
    }
}

/// Accepts RFC 3339, ISO-8601 date-times with or without seconds and offset
/// (a missing offset means UTC), and plain `YYYY-MM-DD` dates.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in OFFSET_DATE_TIME_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(trimmed, format) {
            return Some(parsed.with_timezone(&Utc));
        }
    }
    if let Some(local) = trimmed.strip_suffix(['Z', 'z']) {
        return parse_local_date_time(local);
    }
    parse_local_date_time(trimmed).or_else(|| {
        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|value| value.and_utc())
    })
}

fn parse_local_date_time(value: &str) -> Option<DateTime<Utc>> {
    LOCAL_DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|parsed| parsed.and_utc())
}

/// JSON Schema describing the bookmarks file: an array of records.
pub fn bookmark_schema() -> serde_json::Result<serde_json::Value> {
    serde_json::to_value(schemars::schema_for!(Vec<BookmarkRecord>))
}

#[cfg(test)]
pub(crate) fn sample(title: &str, date_added: &str, categories: &[&str]) -> BookmarkRecord {
    BookmarkRecord {
        url: format!("https://example.com/{}", title.to_lowercase()),
        title: title.to_string(),
        description: String::new(),
        categories: categories.iter().map(|value| value.to_string()).collect(),
        date_added: date_added.to_string(),
        notes: None,
        favicon: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_supported_timestamp_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 10, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-05T10:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05T12:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05T10:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05 10:30"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05T10:30Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05T12:30+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05T12:30+0200"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05T08:30:00-0200"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05T10:30:00.000z"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-03-05"),
            Some(Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn invalid_dates_sort_as_epoch() {
        let record = sample("Broken", "last tuesday", &[]);
        assert_eq!(record.added_at(), None);
        assert_eq!(record.sort_timestamp(), 0);
    }

    #[test]
    fn placeholder_glyph_uppercases_first_char() {
        assert_eq!(sample("rust book", "2024-01-01", &[]).placeholder_glyph(), "R");
        assert_eq!(sample("", "2024-01-01", &[]).placeholder_glyph(), "");
    }

    #[test]
    fn searchable_text_joins_every_field() {
        let mut record = sample("Python", "2024-01-01", &["Lang", "Docs"]);
        record.description = "Tutorial".to_string();
        record.notes = Some("Read Later".to_string());
        assert_eq!(
            record.searchable_text(),
            "python tutorial https://example.com/python read later lang docs"
        );
    }

    #[test]
    fn deserializes_camel_case_with_optional_fields() {
        let raw = r#"{
            "url": "https://rust-lang.org",
            "title": "Rust",
            "description": "",
            "categories": ["Lang"],
            "dateAdded": "2024-01-01"
        }"#;
        let record: BookmarkRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.date_added, "2024-01-01");
        assert_eq!(record.notes, None);
        assert_eq!(record.favicon, None);
    }

    #[test]
    fn schema_lists_required_fields() {
        let schema = bookmark_schema().unwrap();
        let text = schema.to_string();
        assert!(text.contains("dateAdded"));
        assert!(text.contains("BookmarkRecord"));
    }
}
