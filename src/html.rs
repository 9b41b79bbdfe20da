use std::{fmt::Write as _, io::Write};

use crate::{
    present::{Card, Favicon, Listing, Page, Surface, NO_RESULTS_MESSAGE},
    theme::Theme,
    AppResult,
};

const STYLE: &str = "\
body { font-family: system-ui, sans-serif; margin: 0; padding: 24px; background: #f8fafc; color: #0f172a; }
body.dark-mode { background: #18181b; color: #e4e4e7; }
.bookmark-count { color: #64748b; margin-bottom: 16px; }
.bookmarks { display: grid; grid-template-columns: repeat(auto-fill, minmax(320px, 1fr)); gap: 16px; }
.bookmark-card { border: 1px solid #cbd5e1; border-radius: 8px; padding: 16px; }
.bookmark-header { display: flex; gap: 12px; align-items: flex-start; }
.bookmark-favicon, .bookmark-favicon-placeholder { width: 32px; height: 32px; border-radius: 6px; }
.bookmark-favicon-placeholder { display: flex; align-items: center; justify-content: center; background: #2563eb; color: #fff; font-weight: bold; }
.bookmark-url, .bookmark-date { color: #64748b; font-size: 0.85em; }
.bookmark-tag { display: inline-block; margin: 4px 4px 0 0; padding: 2px 8px; border-radius: 999px; background: #dbeafe; color: #1e40af; font-size: 0.8em; }
.bookmark-notes { margin-top: 8px; font-style: italic; }
.no-results { padding: 32px; text-align: center; color: #64748b; }
";

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Writes each rendered page as a standalone HTML document.
pub struct HtmlSurface<W: Write> {
    writer: W,
    theme: Theme,
}

impl<W: Write> HtmlSurface<W> {
    pub fn new(writer: W, theme: Theme) -> Self {
        Self { writer, theme }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Surface for HtmlSurface<W> {
    fn render(&mut self, page: &Page) -> AppResult<()> {
        let document = render_document(page, self.theme);
        self.writer.write_all(document.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }
}

pub fn render_document(page: &Page, theme: Theme) -> String {
    let mut out = String::new();
    let body_class = match theme {
        Theme::Dark => " class=\"dark-mode\"",
        Theme::Light => "",
    };
    let _ = writeln!(&mut out, "<!DOCTYPE html>");
    let _ = writeln!(&mut out, "<html lang=\"en\">");
    let _ = writeln!(&mut out, "<head>");
    let _ = writeln!(&mut out, "  <meta charset=\"utf-8\">");
    let _ = writeln!(&mut out, "  <title>Bookmarks</title>");
    let _ = writeln!(&mut out, "  <style>\n{}  </style>", STYLE);
    let _ = writeln!(&mut out, "</head>");
    let _ = writeln!(&mut out, "<body{}>", body_class);
    let _ = writeln!(
        &mut out,
        "  <div class=\"bookmark-count\">{}</div>",
        escape_html(&page.summary)
    );
    match &page.listing {
        Listing::Cards(cards) => {
            let _ = writeln!(&mut out, "  <div class=\"bookmarks\">");
            for card in cards {
                out.push_str(&render_card(card));
            }
            let _ = writeln!(&mut out, "  </div>");
        }
        Listing::NoResults => {
            let _ = writeln!(
                &mut out,
                "  <div class=\"no-results\">{}</div>",
                escape_html(NO_RESULTS_MESSAGE)
            );
        }
        Listing::LoadFailed(message) => {
            let _ = writeln!(
                &mut out,
                "  <div class=\"no-results\">{}</div>",
                escape_html(message)
            );
        }
    }
    let _ = writeln!(&mut out, "</body>");
    let _ = writeln!(&mut out, "</html>");
    out
}

fn render_card(card: &Card) -> String {
    let mut out = String::new();
    let _ = writeln!(&mut out, "    <div class=\"bookmark-card\">");
    let _ = writeln!(&mut out, "      <div class=\"bookmark-header\">");
    match &card.favicon {
        Favicon::Image { src, fallback } => {
            let _ = writeln!(
                &mut out,
                "        <img src=\"{}\" alt=\"\" class=\"bookmark-favicon\" onerror=\"this.style.display='none'; this.nextElementSibling.style.display='flex';\">",
                escape_html(src)
            );
            let _ = writeln!(
                &mut out,
                "        <div class=\"bookmark-favicon-placeholder\" style=\"display:none;\">{}</div>",
                escape_html(fallback)
            );
        }
        Favicon::Placeholder(glyph) => {
            let _ = writeln!(
                &mut out,
                "        <div class=\"bookmark-favicon-placeholder\">{}</div>",
                escape_html(glyph)
            );
        }
    }
    let _ = writeln!(&mut out, "        <div class=\"bookmark-title\">");
    let _ = writeln!(
        &mut out,
        "          <a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a>",
        escape_html(&card.url),
        escape_html(&card.title)
    );
    let _ = writeln!(
        &mut out,
        "          <div class=\"bookmark-url\">{}</div>",
        escape_html(&card.display_url)
    );
    let _ = writeln!(&mut out, "        </div>");
    let _ = writeln!(&mut out, "      </div>");
    let _ = writeln!(
        &mut out,
        "      <div class=\"bookmark-description\">{}</div>",
        escape_html(&card.description)
    );
    let _ = write!(&mut out, "      <div class=\"bookmark-tags\">");
    for tag in &card.tags {
        let _ = write!(
            &mut out,
            "<span class=\"bookmark-tag\">{}</span>",
            escape_html(tag)
        );
    }
    let _ = writeln!(&mut out, "</div>");
    let _ = writeln!(
        &mut out,
        "      <div class=\"bookmark-date\">Added: {}</div>",
        escape_html(&card.date_label)
    );
    if let Some(notes) = &card.notes {
        let _ = writeln!(
            &mut out,
            "      <div class=\"bookmark-notes\">{}</div>",
            escape_html(notes)
        );
    }
    let _ = writeln!(&mut out, "    </div>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::present::summary;

    fn hostile_card() -> Card {
        Card {
            favicon: Favicon::Image {
                src: "x\" onload=\"alert(1)".to_string(),
                fallback: "<".to_string(),
            },
            title: "<script>alert('t')</script>".to_string(),
            url: "javascript:\"x\"".to_string(),
            display_url: "a&b".to_string(),
            description: "<b>bold</b>".to_string(),
            tags: vec!["<i>".to_string()],
            date_label: "Today".to_string(),
            notes: Some("1 < 2".to_string()),
        }
    }

    #[test]
    fn escapes_special_characters() {
        assert_eq!(
            escape_html("<a href=\"x\">Tom & Jerry's</a>"),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
    }

    #[test]
    fn every_card_field_is_escaped() {
        let page = Page {
            summary: summary(1, 1),
            listing: Listing::Cards(vec![hostile_card()]),
        };
        let html = render_document(&page, Theme::Light);
        assert!(!html.contains("<script>"));
        assert!(!html.contains("<b>bold"));
        assert!(!html.contains("<i>"));
        assert!(!html.contains("onload=\"alert"));
        assert!(html.contains("&lt;script&gt;alert(&#39;t&#39;)&lt;/script&gt;"));
        assert!(html.contains("href=\"javascript:&quot;x&quot;\""));
        assert!(html.contains("1 &lt; 2"));
        assert!(html.contains("a&amp;b"));
        assert!(html.contains("style=\"display:none;\">&lt;</div>"));
    }

    #[test]
    fn notes_are_omitted_when_absent() {
        let mut card = hostile_card();
        card.notes = None;
        let page = Page {
            summary: summary(1, 1),
            listing: Listing::Cards(vec![card]),
        };
        assert!(!render_document(&page, Theme::Light).contains("bookmark-notes\">"));
    }

    #[test]
    fn no_results_and_dark_theme() {
        let page = Page {
            summary: summary(0, 4),
            listing: Listing::NoResults,
        };
        let mut surface = HtmlSurface::new(Vec::new(), Theme::Dark);
        surface.render(&page).unwrap();
        let html = String::from_utf8(surface.into_inner()).unwrap();
        assert!(html.contains("<body class=\"dark-mode\">"));
        assert!(html.contains("Showing 0 of 4 bookmarks"));
        assert!(html.contains(NO_RESULTS_MESSAGE));
        assert!(!html.contains("bookmark-card\">"));
    }
}
