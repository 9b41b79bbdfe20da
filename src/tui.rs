use std::{
    io,
    time::{Duration, Instant},
};

use chrono::Utc;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
        MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use marklist::{
    browser::Browser,
    category::category_label,
    present::{Card, Listing, Page, Surface, NO_RESULTS_MESSAGE},
    theme::{Palette, Theme, ThemeStore},
    AppResult,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Terminal,
};
use tui_input::backend::crossterm::EventHandler;
use tui_input::{Input, InputRequest};

const TICK: Duration = Duration::from_millis(100);
const PAGE_STEP: usize = 5;

type Backend = CrosstermBackend<io::Stderr>;

/// What the header shows besides the page itself.
struct Controls {
    search: String,
    search_cursor: usize,
    category: String,
    sort_label: &'static str,
    pending: bool,
}

impl Controls {
    fn from_browser(browser: &Browser, input: &Input) -> Self {
        Self {
            search: input.value().to_string(),
            search_cursor: input.visual_cursor(),
            category: category_label(&browser.query().category).to_string(),
            sort_label: browser.query().sort_key.label(),
            pending: browser.debouncer().is_pending(),
        }
    }
}

pub struct TerminalSurface {
    terminal: Terminal<Backend>,
    theme: Theme,
    controls: Controls,
    list_state: ListState,
}

impl TerminalSurface {
    /// Takes over stderr: raw mode, alternate screen, mouse capture. Dropping
    /// the surface hands the terminal back.
    fn enter(theme: Theme) -> AppResult<Self> {
        enable_raw_mode()?;
        let mut stderr = io::stderr();
        if let Err(err) = execute!(stderr, EnterAlternateScreen, EnableMouseCapture) {
            let _ = disable_raw_mode();
            return Err(err.into());
        }
        let terminal = match Terminal::new(CrosstermBackend::new(stderr)) {
            Ok(terminal) => terminal,
            Err(err) => {
                restore_terminal();
                return Err(err.into());
            }
        };
        Ok(Self {
            terminal,
            theme,
            controls: Controls {
                search: String::new(),
                search_cursor: 0,
                category: category_label("").to_string(),
                sort_label: "",
                pending: false,
            },
            list_state: ListState::default(),
        })
    }

    fn select(&mut self, selected: Option<usize>) {
        self.list_state.select(selected);
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        restore_terminal();
    }
}

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stderr(), LeaveAlternateScreen, DisableMouseCapture);
}

impl Surface for TerminalSurface {
    fn render(&mut self, page: &Page) -> AppResult<()> {
        let palette = self.theme.palette();
        let theme = self.theme;
        let controls = &self.controls;
        let list_state = &mut self.list_state;
        self.terminal.draw(|frame| {
            let ui = compute_ui_layout(frame.area());
            frame.render_widget(
                Block::default().style(Style::default().bg(palette.background)),
                frame.area(),
            );

            let search_title = if controls.pending {
                "Search (typing...)"
            } else {
                "Search"
            };
            let search_block = Block::default()
                .borders(Borders::ALL)
                .title(search_title)
                .border_style(Style::default().fg(palette.accent))
                .border_type(BorderType::Rounded);
            let search_inner = search_block.inner(ui.search_area);
            let search_width = search_inner.width.saturating_sub(1) as usize;
            let scroll = controls.search_cursor.saturating_sub(search_width);
            let search = Paragraph::new(controls.search.as_str())
                .style(Style::default().fg(palette.text))
                .scroll((0, scroll as u16))
                .block(search_block);
            frame.render_widget(search, ui.search_area);
            if search_inner.width > 0 && search_inner.height > 0 {
                let cursor_x = controls.search_cursor.saturating_sub(scroll);
                frame.set_cursor_position((search_inner.x + cursor_x as u16, search_inner.y));
            }

            let label_style = Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD);
            let value_style = Style::default().fg(palette.text);
            let filters = Line::from(vec![
                Span::styled("Category: ", label_style),
                Span::styled(controls.category.clone(), value_style),
                Span::raw("   "),
                Span::styled("Sort: ", label_style),
                Span::styled(controls.sort_label, value_style),
                Span::raw("   "),
                Span::styled("Theme: ", label_style),
                Span::styled(theme.as_str(), value_style),
            ]);
            frame.render_widget(Paragraph::new(filters), ui.filter_area);
            frame.render_widget(
                Paragraph::new(Span::styled(
                    page.summary.clone(),
                    Style::default().fg(palette.muted),
                )),
                ui.summary_area,
            );

            let cards_block = Block::default()
                .borders(Borders::ALL)
                .title("Bookmarks")
                .border_style(Style::default().fg(palette.muted))
                .border_type(BorderType::Rounded);
            match &page.listing {
                Listing::Cards(cards) => {
                    let inner_width = cards_block.inner(ui.cards_area).width as usize;
                    let items: Vec<ListItem> = cards
                        .iter()
                        .map(|card| build_card_item(card, inner_width, &palette))
                        .collect();
                    let list = List::new(items)
                        .block(cards_block)
                        .highlight_style(Style::default().bg(palette.highlight))
                        .highlight_symbol("> ");
                    frame.render_stateful_widget(list, ui.cards_area, list_state);
                }
                Listing::NoResults => {
                    frame.render_widget(
                        build_message(NO_RESULTS_MESSAGE, palette.muted).block(cards_block),
                        ui.cards_area,
                    );
                }
                Listing::LoadFailed(message) => {
                    frame.render_widget(
                        build_message(message, Color::Red).block(cards_block),
                        ui.cards_area,
                    );
                }
            }

            let help = Paragraph::new(build_help_line(&palette))
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title("Keys")
                        .border_style(Style::default().fg(palette.muted))
                        .border_type(BorderType::Rounded),
                )
                .alignment(Alignment::Left)
                .wrap(Wrap { trim: true });
            frame.render_widget(help, ui.help_area);
        })?;
        Ok(())
    }
}

/// Runs the interactive browser. Returns the URL picked with Enter, if any.
pub fn run(mut browser: Browser, theme_store: &ThemeStore) -> AppResult<Option<String>> {
    let mut surface = TerminalSurface::enter(theme_store.initial_theme())?;
    let mut input = Input::default();
    let mut selected = 0usize;

    loop {
        let page = browser.page(Utc::now());
        let total = page.cards().len();
        selected = move_selection(selected, 0, total);
        surface.controls = Controls::from_browser(&browser, &input);
        surface.select(if total > 0 { Some(selected) } else { None });
        surface.render(&page)?;

        let timeout = browser
            .debouncer()
            .remaining(Instant::now())
            .map(|remaining| remaining.min(TICK))
            .unwrap_or(TICK);
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) => {
                    match handle_key(key, &mut browser, &mut input, &mut surface, theme_store) {
                        KeyOutcome::Quit => {
                            surface.terminal.show_cursor()?;
                            return Ok(None);
                        }
                        KeyOutcome::Pick => {
                            if let Some(card) = page.cards().get(selected) {
                                surface.terminal.show_cursor()?;
                                return Ok(Some(card.url.clone()));
                            }
                        }
                        KeyOutcome::ViewChanged => selected = 0,
                        KeyOutcome::Move(step) => {
                            selected = move_selection(selected, step, total);
                        }
                        KeyOutcome::None => {}
                    }
                }
                Event::Mouse(mouse) => match mouse.kind {
                    MouseEventKind::ScrollUp => selected = move_selection(selected, -1, total),
                    MouseEventKind::ScrollDown => selected = move_selection(selected, 1, total),
                    _ => {}
                },
                _ => {}
            }
        }

        if browser.tick(Instant::now()) {
            selected = 0;
        }
    }
}

enum KeyOutcome {
    None,
    Quit,
    Pick,
    ViewChanged,
    Move(isize),
}

fn handle_key(
    key: KeyEvent,
    browser: &mut Browser,
    input: &mut Input,
    surface: &mut TerminalSurface,
    theme_store: &ThemeStore,
) -> KeyOutcome {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => return KeyOutcome::Quit,
        KeyCode::Char('c') if ctrl => return KeyOutcome::Quit,
        KeyCode::Enter => {
            if browser.debouncer().is_pending() {
                return changed(browser.commit_search());
            }
            return KeyOutcome::Pick;
        }
        KeyCode::Tab => return changed(browser.cycle_category(true)),
        KeyCode::BackTab => return changed(browser.cycle_category(false)),
        KeyCode::Char('s') if ctrl => return changed(browser.cycle_sort()),
        KeyCode::Char('d') if ctrl => {
            surface.theme = surface.theme.toggle();
            if let Err(err) = theme_store.save(surface.theme) {
                tracing::warn!(error = %err, "failed to persist theme");
            }
            return KeyOutcome::None;
        }
        KeyCode::Char('k') if ctrl => {
            input.reset();
            browser.input_search("", Instant::now());
            return KeyOutcome::None;
        }
        KeyCode::Up => return KeyOutcome::Move(-1),
        KeyCode::Down => return KeyOutcome::Move(1),
        KeyCode::PageUp => return KeyOutcome::Move(-(PAGE_STEP as isize)),
        KeyCode::PageDown => return KeyOutcome::Move(PAGE_STEP as isize),
        KeyCode::Home if ctrl => return KeyOutcome::Move(isize::MIN),
        KeyCode::End if ctrl => return KeyOutcome::Move(isize::MAX),
        _ => {}
    }

    let before = input.value().to_string();
    if key.code == KeyCode::Char('u') && ctrl {
        input.handle(InputRequest::DeleteLine);
    } else {
        let _ = input.handle_event(&Event::Key(key));
    }
    if input.value() != before {
        browser.input_search(input.value(), Instant::now());
    }
    KeyOutcome::None
}

fn changed(value: bool) -> KeyOutcome {
    if value {
        KeyOutcome::ViewChanged
    } else {
        KeyOutcome::None
    }
}

fn move_selection(current: usize, step: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let target = if step.is_negative() {
        current.saturating_sub(step.unsigned_abs())
    } else {
        current.saturating_add(step.unsigned_abs())
    };
    target.min(len - 1)
}

#[derive(Clone, Copy)]
struct UiLayout {
    search_area: Rect,
    filter_area: Rect,
    summary_area: Rect,
    cards_area: Rect,
    help_area: Rect,
}

fn compute_ui_layout(size: Rect) -> UiLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(4),
            Constraint::Length(3),
        ])
        .split(size);
    UiLayout {
        search_area: chunks[0],
        filter_area: chunks[1],
        summary_area: chunks[2],
        cards_area: chunks[3],
        help_area: chunks[4],
    }
}

fn build_message(message: &str, color: Color) -> Paragraph<'static> {
    Paragraph::new(Span::styled(message.to_string(), Style::default().fg(color)))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
}

fn build_card_item(card: &Card, width: usize, palette: &Palette) -> ListItem<'static> {
    let text_style = Style::default().fg(palette.text);
    let muted_style = Style::default().fg(palette.muted);
    let width = width.saturating_sub(2);

    let glyph = format!("[{}] ", card.favicon.glyph());
    let date = format!("Added: {}", card.date_label);
    let glyph_len = glyph.chars().count();
    let date_len = date.chars().count();
    let title_room = width.saturating_sub(glyph_len + date_len + 1);
    let title = fit_cell(&card.title, title_room);
    let padding = width.saturating_sub(glyph_len + title.chars().count() + date_len);

    let mut lines = vec![Line::from(vec![
        Span::styled(
            glyph,
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(title, text_style.add_modifier(Modifier::BOLD)),
        Span::raw(" ".repeat(padding)),
        Span::styled(date, muted_style),
    ])];
    lines.push(Line::from(Span::styled(
        fit_cell(&card.display_url, width),
        muted_style.add_modifier(Modifier::ITALIC),
    )));
    if !card.description.is_empty() {
        lines.push(Line::from(Span::styled(
            fit_cell(&card.description, width),
            text_style,
        )));
    }
    if !card.tags.is_empty() {
        lines.push(Line::from(build_tag_spans(&card.tags, palette.tag)));
    }
    if let Some(notes) = &card.notes {
        lines.push(Line::from(Span::styled(
            fit_cell(&format!("Note: {}", notes), width),
            muted_style,
        )));
    }
    lines.push(Line::from(""));
    ListItem::new(Text::from(lines))
}

fn build_tag_spans(tags: &[String], fallback: Color) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    for (index, tag) in tags.iter().enumerate() {
        if index > 0 {
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled(
            format!("[{}]", tag),
            Style::default()
                .fg(tag_color(tag, fallback))
                .add_modifier(Modifier::ITALIC),
        ));
    }
    spans
}

fn build_help_line(palette: &Palette) -> Line<'static> {
    let key_style = Style::default()
        .fg(palette.muted)
        .add_modifier(Modifier::BOLD);
    let label_style = Style::default().fg(palette.text);
    let hints = [
        ("Type", "search"),
        ("Enter", "apply/pick"),
        ("Tab", "category"),
        ("^S", "sort"),
        ("^D", "theme"),
        ("^K", "clear"),
        ("Esc", "quit"),
    ];
    let mut spans = Vec::new();
    for (index, (key, label)) in hints.iter().enumerate() {
        if index > 0 {
            spans.push(Span::raw("  "));
        }
        spans.push(Span::styled(*key, key_style));
        spans.push(Span::raw(" "));
        spans.push(Span::styled(*label, label_style));
    }
    Line::from(spans)
}

/// Fits `value` into `width` cells, marking a cut with a trailing `…`.
fn fit_cell(value: &str, width: usize) -> String {
    match value.char_indices().nth(width) {
        None => value.to_string(),
        Some(_) if width == 0 => String::new(),
        Some(_) => {
            let mut fitted: String = value.chars().take(width - 1).collect();
            fitted.push('…');
            fitted
        }
    }
}

fn tag_color(tag: &str, fallback: Color) -> Color {
    let mut hash = 2166136261u32;
    for byte in tag.as_bytes() {
        hash ^= *byte as u32;
        hash = hash.wrapping_mul(16777619);
    }
    let hue = (hash % 360) as f32;
    hsl_to_rgb(hue, 0.6, 0.5).unwrap_or(fallback)
}

fn hsl_to_rgb(hue: f32, sat: f32, light: f32) -> Option<Color> {
    if !(0.0..=360.0).contains(&hue) {
        return None;
    }
    let c = (1.0 - (2.0 * light - 1.0).abs()) * sat;
    let h = hue / 60.0;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r1, g1, b1) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = light - c / 2.0;
    let channel = |value: f32| ((value + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Some(Color::Rgb(channel(r1), channel(g1), channel(b1)))
}
