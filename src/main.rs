mod tui;

use std::{
    env, fs,
    io::{self, Write},
    path::PathBuf,
    str::FromStr,
};

use chrono::Utc;
use marklist::{
    browser::Browser,
    config::{self, Config},
    debounce::Debouncer,
    html::HtmlSurface,
    logging::{init_logging, LogTarget},
    present::Surface,
    query::SortKey,
    record::bookmark_schema,
    store::{self, BookmarkSource},
    theme::{Theme, ThemeStore},
    AppResult,
};

const DEFAULT_BOOKMARKS_FILE: &str = "bookmarks.json";

#[derive(Debug, Default, PartialEq, Eq)]
struct RenderArgs {
    source: Option<String>,
    search: Option<String>,
    category: Option<String>,
    sort: Option<SortKey>,
    theme: Option<Theme>,
    output: Option<PathBuf>,
}

fn main() -> AppResult<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let command = args.first().map(String::as_str);
    let result = match command {
        None => run_browse(None),
        Some("browse") => run_browse(args.get(1).cloned()),
        Some("render") => match parse_render_args(&args[1..]) {
            Ok(render_args) => run_render(render_args),
            Err(message) => usage_error(&message),
        },
        Some("schema") => run_schema(),
        Some("--help") | Some("-h") => {
            print_usage();
            Ok(())
        }
        Some(other) if !other.starts_with('-') && args.len() == 1 => {
            run_browse(Some(other.to_string()))
        }
        Some(_) => usage_error("Unknown command."),
    };
    if let Err(err) = &result {
        tracing::error!(error = %err, "marklist failed");
    }
    result
}

fn usage_error(message: &str) -> AppResult<()> {
    eprintln!("{}", message);
    print_usage();
    std::process::exit(2);
}

fn print_usage() {
    eprintln!(
        "Usage:\n  marklist [browse] [SOURCE]\n  marklist render [--search TEXT] [--category NAME] [--sort date-desc|date-asc|title-asc|title-desc] [--theme dark|light] [--output PATH] [SOURCE]\n  marklist schema\n\nSOURCE is a bookmarks JSON file or - for stdin (default: bookmarks.json or the configured path)."
    );
}

fn load_settings() -> AppResult<(Config, ThemeStore)> {
    let home = config::home_dir()?;
    let config = config::load_config(&home)?;
    Ok((config, ThemeStore::default_location(&home)))
}

fn resolve_source(arg: Option<&str>, config: &Config) -> BookmarkSource {
    match arg {
        Some(raw) => BookmarkSource::from_arg(raw),
        None => BookmarkSource::File(
            config
                .bookmarks
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BOOKMARKS_FILE)),
        ),
    }
}

fn run_browse(source_arg: Option<String>) -> AppResult<()> {
    let (config, theme_store) = load_settings()?;
    let target = match &config.log_file {
        Some(path) => LogTarget::File(path.clone()),
        None => LogTarget::Disabled,
    };
    init_logging(target)?;
    for path in &config.loaded_from {
        tracing::info!(path = %path.display(), "read config");
    }

    let source = resolve_source(source_arg.as_deref(), &config);
    let browser = Browser::from_load(
        store::load(&source),
        Debouncer::new(config.search_debounce),
        config.default_sort,
    );
    if source.is_stdin() {
        reattach_keyboard()?;
    }

    match tui::run(browser, &theme_store)? {
        Some(url) => write_selection(&url),
        None => std::process::exit(1),
    }
}

fn run_render(args: RenderArgs) -> AppResult<()> {
    init_logging(LogTarget::Stderr)?;
    let (config, theme_store) = load_settings()?;
    let source = resolve_source(args.source.as_deref(), &config);
    let sort = args.sort.unwrap_or(config.default_sort);
    let mut browser = Browser::from_load(
        store::load(&source),
        Debouncer::new(config.search_debounce),
        sort,
    );
    if let Some(search) = &args.search {
        browser.input_search(search, std::time::Instant::now());
        browser.commit_search();
    }
    if let Some(category) = &args.category {
        browser.set_category(category);
    }
    let page = browser.page(Utc::now());
    let theme = args.theme.unwrap_or_else(|| theme_store.initial_theme());

    match &args.output {
        Some(path) => {
            let file = fs::File::create(path)?;
            HtmlSurface::new(io::BufWriter::new(file), theme).render(&page)?;
            tracing::info!(path = %path.display(), summary = %page.summary, "wrote bookmarks page");
        }
        None => {
            let stdout = io::stdout();
            HtmlSurface::new(stdout.lock(), theme).render(&page)?;
        }
    }
    Ok(())
}

fn run_schema() -> AppResult<()> {
    init_logging(LogTarget::Stderr)?;
    let schema = bookmark_schema()?;
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &schema)?;
    writeln!(stdout)?;
    Ok(())
}

fn parse_render_args(args: &[String]) -> Result<RenderArgs, String> {
    let mut parsed = RenderArgs::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value_for = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("Missing value for {}.", flag))
        };
        match arg.as_str() {
            "--search" | "-s" => parsed.search = Some(value_for(arg)?),
            "--category" | "-c" => parsed.category = Some(value_for(arg)?),
            "--sort" => {
                let raw = value_for(arg)?;
                parsed.sort = Some(SortKey::from_str(&raw).map_err(|err| err.to_string())?);
            }
            "--theme" => {
                let raw = value_for(arg)?;
                parsed.theme =
                    Some(Theme::parse(&raw).ok_or_else(|| format!("Unknown theme {:?}.", raw))?);
            }
            "--output" | "-o" => parsed.output = Some(PathBuf::from(value_for(arg)?)),
            "-" => parsed.source = Some(arg.clone()),
            flag if flag.starts_with('-') => return Err(format!("Unknown option {}.", flag)),
            _ if parsed.source.is_none() => parsed.source = Some(arg.clone()),
            _ => return Err(format!("Unexpected argument {}.", arg)),
        }
    }
    Ok(parsed)
}

/// Bookmarks piped through `-` leave stdin at EOF; point fd 0 back at the
/// controlling terminal so crossterm can read keys.
#[cfg(unix)]
fn reattach_keyboard() -> AppResult<()> {
    use std::io::IsTerminal;
    use std::os::unix::io::AsRawFd;

    if io::stdin().is_terminal() {
        return Ok(());
    }
    let tty = fs::File::open("/dev/tty")?;
    // SAFETY: both descriptors are open for the duration of the call.
    if unsafe { libc::dup2(tty.as_raw_fd(), libc::STDIN_FILENO) } < 0 {
        return Err(io::Error::last_os_error().into());
    }
    tracing::debug!("stdin reattached to /dev/tty");
    Ok(())
}

#[cfg(not(unix))]
fn reattach_keyboard() -> AppResult<()> {
    Ok(())
}

fn write_selection(url: &str) -> AppResult<()> {
    if let Ok(output_path) = env::var("MARKLIST_OUTPUT") {
        if !output_path.is_empty() {
            fs::write(output_path, url)?;
            return Ok(());
        }
    }
    println!("{}", url);
    Ok(())
}
