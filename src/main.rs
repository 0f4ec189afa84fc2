//! Dex Explorer - Main entry point

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

mod api;
mod app;
mod constants;
mod error;
mod favorites;
mod query;
mod settings;
mod storage;
mod types;
mod ui;
mod url_state;
mod utils;

use app::{spawn_debouncer, Explorer, ListView};
use clap::{Args, Parser, Subcommand};
use constants::*;
use error::QueryError;
use settings::Settings;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;
use storage::LocalStorage;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{reload, EnvFilter, Registry};
use types::{SortDirection, SortField};
use ui::components::{render_detail, render_list};
use url_state::{
    Navigation, PARAM_DIR, PARAM_FAVORITES, PARAM_PAGE, PARAM_SEARCH, PARAM_SORT, PARAM_TYPE,
};
use utils::get_data_dir;

// Collapse bursts of repaint requests into one redraw
const FRAME_COALESCE: Duration = Duration::from_millis(50);

#[derive(Parser)]
#[command(name = "dex-explorer", version, about = "Browse the PokeAPI catalog")]
struct Cli {
    /// Starting query string, e.g. "q=char&type=fire&sort=name&page=2"
    #[arg(long, global = true, env = "DEX_QUERY", default_value = "")]
    query: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print one page of the filtered list
    List(ListArgs),
    /// Print the detail view of one entry
    Show { name: String },
    /// Toggle an entry in the favorites
    Fav { name: String },
    /// Print all favorites
    Favorites,
    /// Print the available types
    Types,
    /// Interactive browser (default)
    Browse,
}

#[derive(Args)]
struct ListArgs {
    #[arg(long)]
    search: Option<String>,
    #[arg(long = "type")]
    type_filter: Option<String>,
    /// name | id
    #[arg(long)]
    sort: Option<String>,
    /// asc | desc
    #[arg(long)]
    dir: Option<String>,
    #[arg(long)]
    page: Option<usize>,
    /// Only show favorites
    #[arg(long)]
    fav: bool,
}

#[derive(Debug, thiserror::Error)]
enum CommandError {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("terminal error: {0}")]
    Io(#[from] std::io::Error),
}

type LogFilterHandle = reload::Handle<EnvFilter, Registry>;

/// Initialize file logging. Returns a guard that must be held for the app
/// lifetime, and a handle for swapping the filter once settings are read.
fn init_logging(
    data_dir: &Path,
) -> (tracing_appender::non_blocking::WorkerGuard, LogFilterHandle) {
    use tracing_subscriber::{fmt, prelude::*};

    let logs_dir = data_dir.join("logs");
    std::fs::create_dir_all(&logs_dir).ok();

    let file_appender = tracing_appender::rolling::daily(&logs_dir, "dex-explorer.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,dex_explorer=debug"));
    let (env_filter, handle) = reload::Layer::new(env_filter);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    (guard, handle)
}

/// Filter directive from settings; RUST_LOG wins when set
fn settings_log_filter(settings: &Settings, rust_log_set: bool) -> Option<&str> {
    if rust_log_set {
        return None;
    }
    settings
        .log_filter
        .as_deref()
        .map(str::trim)
        .filter(|directive| !directive.is_empty())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let data_dir = get_data_dir();
    std::fs::create_dir_all(&data_dir).ok();

    // Initialize logging - guard must live for entire app lifetime
    let (_log_guard, log_filter) = init_logging(&data_dir);

    info!(version = APP_VERSION, "Dex Explorer starting");

    let settings = Settings::load(&data_dir);
    let rust_log_set = std::env::var_os(EnvFilter::DEFAULT_ENV).is_some();
    if let Some(directive) = settings_log_filter(&settings, rust_log_set) {
        match log_filter.reload(EnvFilter::new(directive)) {
            Ok(()) => debug!(directive, "Log filter set from settings"),
            Err(e) => warn!(error = %e, "Failed to apply log filter from settings"),
        }
    }

    // Write defaults on first run so they can be edited
    if !data_dir.join("settings.json").exists() {
        settings.save(&data_dir);
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to start runtime");
            eprintln!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let code = runtime.block_on(run(cli, &data_dir, settings));
    info!("Dex Explorer exiting");
    code
}

async fn run(cli: Cli, data_dir: &Path, settings: Settings) -> ExitCode {
    let storage_path = data_dir.join("storage.db");
    let storage = match LocalStorage::open(&storage_path) {
        Ok(storage) => {
            info!(path = %storage_path.display(), "Storage opened");
            storage
        }
        Err(e) => {
            error!(error = %e, path = %storage_path.display(), "Failed to open storage");
            eprintln!("Failed to open storage: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut explorer = Explorer::new(settings, storage, &cli.query);

    let result = match cli.command.unwrap_or(Command::Browse) {
        Command::List(args) => list(&mut explorer, args).await,
        Command::Show { name } => show(&explorer, &name).await,
        Command::Fav { name } => {
            let on = explorer.toggle_favorite(&name);
            println!("{} {}", name, if on { "added to favorites" } else { "removed from favorites" });
            Ok(())
        }
        Command::Favorites => {
            for name in explorer.favorites().favorites() {
                println!("{}", name);
            }
            Ok(())
        }
        Command::Types => types(&explorer).await,
        Command::Browse => browse(&mut explorer).await,
    };
    explorer.shutdown();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// ONE-SHOT COMMANDS
// ============================================================================

async fn list(explorer: &mut Explorer, args: ListArgs) -> Result<(), CommandError> {
    let page = args.page.map(|p| p.to_string());
    let mut updates: Vec<(&str, Option<&str>)> = Vec::new();
    if let Some(search) = args.search.as_deref() {
        updates.push((PARAM_SEARCH, Some(search)));
    }
    if let Some(type_name) = args.type_filter.as_deref() {
        if !is_known_type(type_name) {
            warn!(type_name, "Filtering by a type outside the known list");
        }
        updates.push((PARAM_TYPE, Some(type_name)));
    }
    if let Some(sort) = args.sort.as_deref() {
        updates.push((PARAM_SORT, Some(SortField::from_param(sort).as_param())));
    }
    if let Some(dir) = args.dir.as_deref() {
        updates.push((PARAM_DIR, Some(SortDirection::from_param(dir).as_param())));
    }
    if args.fav {
        updates.push((PARAM_FAVORITES, Some("1")));
    }
    if let Some(page) = page.as_deref() {
        updates.push((PARAM_PAGE, Some(page)));
    }
    if !updates.is_empty() {
        explorer.set_params(&updates, Navigation::Replace);
    }

    let loaded = explorer.load().await;
    if loaded.is_ok() {
        explorer.load_page_details().await;
    }
    println!("{}", explorer.url().location());
    println!("{}", render_list(&explorer.list_view()));
    loaded.map_err(CommandError::from)
}

async fn show(explorer: &Explorer, name: &str) -> Result<(), CommandError> {
    let view = explorer.detail_view(name).await?;
    println!("{}", render_detail(&view));
    Ok(())
}

async fn types(explorer: &Explorer) -> Result<(), CommandError> {
    for name in explorer.type_names().await? {
        println!("{}", name);
    }
    Ok(())
}

// ============================================================================
// INTERACTIVE BROWSER
// ============================================================================

const HELP: &str = "\
commands:
  search [text]      filter by name (empty clears)
  type [name|all]    filter by type
  sort name|id       sort field
  dir asc|desc       sort direction
  page N | next | prev
  back | forward     history navigation
  fav <name>         toggle favorite
  favonly            toggle favorites-only
  show <name>        detail view
  retry [name]       re-issue failed queries
  help | quit";

async fn browse(explorer: &mut Explorer) -> Result<(), CommandError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let (search_tx, mut search_rx, _debouncer) = spawn_debouncer::<String>(DEBOUNCE_DELAY);
    let mut frames = explorer.repaint().subscribe();
    let mut poll = tokio::time::interval(explorer.settings().storage_poll_interval());
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

    println!("{}", HELP);
    explorer.repaint().request();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("Input closed");
                    break;
                };
                if !handle_command(explorer, line.trim(), &search_tx).await {
                    break;
                }
            }
            Some(text) = search_rx.recv() => explorer.commit_search(&text),
            _ = poll.tick() => {
                explorer.sync_storage();
            }
            changed = frames.changed() => {
                if changed.is_err() {
                    break;
                }
                tokio::time::sleep(FRAME_COALESCE).await;
                frames.borrow_and_update();
                explorer.ensure_queries();
                explorer.mount_visible_cards();
                redraw(explorer);
            }
        }
    }
    Ok(())
}

fn is_known_type(name: &str) -> bool {
    POKEMON_TYPES.contains(&name.trim().to_lowercase().as_str())
}

fn redraw(explorer: &Explorer) {
    let view = explorer.list_view();
    println!();
    println!("── {} ──", explorer.url().location());
    println!("{}", render_list(&view));
    if let ListView::Failed { error, .. } = &view {
        debug!(error = %error, "List view failed");
    }
}

/// Returns false when the browser should exit
async fn handle_command(
    explorer: &mut Explorer,
    line: &str,
    search_tx: &UnboundedSender<String>,
) -> bool {
    let (command, arg) = match line.split_once(char::is_whitespace) {
        Some((command, arg)) => (command, arg.trim()),
        None => (line, ""),
    };

    match command {
        "" => {}
        "quit" | "exit" | "q" => return false,
        "help" | "?" => println!("{}", HELP),
        "search" => {
            if search_tx.send(arg.to_string()).is_err() {
                warn!("Search debouncer stopped");
            }
        }
        "type" => match arg {
            "" | "all" => explorer.set_type(None),
            name if is_known_type(name) => explorer.set_type(Some(name)),
            name => println!("Unknown type `{}`, one of: {}", name, POKEMON_TYPES.join(", ")),
        },
        "sort" => explorer.set_sort(SortField::from_param(arg)),
        "dir" => explorer.set_direction(SortDirection::from_param(arg)),
        "page" => match arg.parse::<usize>() {
            Ok(page) if page >= 1 => explorer.goto_page(page),
            _ => println!("usage: page N (N >= 1)"),
        },
        "next" => {
            if !explorer.next_page() {
                println!("Already on the last page.");
            }
        }
        "prev" => {
            if !explorer.prev_page() {
                println!("Already on the first page.");
            }
        }
        "back" => {
            if !explorer.back() {
                println!("Nothing to go back to.");
            }
        }
        "forward" => {
            if !explorer.forward() {
                println!("Nothing to go forward to.");
            }
        }
        "fav" if !arg.is_empty() => {
            let on = explorer.toggle_favorite(arg);
            println!("{} {}", arg, if on { "★" } else { "☆" });
        }
        "favonly" => explorer.toggle_favorites_only(),
        "show" if !arg.is_empty() => match explorer.detail_view(arg).await {
            Ok(view) => {
                println!("{}", render_detail(&view));
                println!("(link: {})", explorer.detail_href(&view.name));
            }
            Err(QueryError::Cancelled) => {}
            Err(e) => println!("Failed to load {}: {}", arg, e),
        },
        "retry" => match arg {
            "" => explorer.retry(),
            name => explorer.retry_detail(name),
        },
        _ => println!("Unknown command `{}`, type `help`", line),
    }
    true
}
