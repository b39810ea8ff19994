mod commands;
mod render;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use hourcount_core::config::HoursConfig;
use hourcount_core::source::JsonFileStore;
use hourcount_core::window::DateWindow;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hourcount")]
#[command(about = "Count scheduled hours across your calendar feeds")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sum hours across all configured calendars
    Sum {
        /// Count events starting from this date (YYYY-MM-DD or RFC 3339, default: 1970-01-01)
        #[arg(long)]
        from: Option<String>,

        /// Count events starting until this date (YYYY-MM-DD or RFC 3339, default: now)
        #[arg(long)]
        to: Option<String>,
    },
    /// List configured calendars
    List,
    /// Add a calendar feed
    Add {
        /// Display name
        name: String,
        /// Feed URL (https:// or webcal://)
        url: String,
    },
    /// Remove calendars by name or URL
    Remove {
        calendar: String,
    },
    /// Rename a calendar
    Rename {
        /// Current name or URL
        calendar: String,
        name: String,
    },
    /// Point a calendar at a new feed URL, keeping its name and position
    SetUrl {
        /// Current name or URL
        calendar: String,
        url: String,
    },
    /// Keep a session open, recomputing as calendars and dates change
    Interactive {
        #[arg(long)]
        from: Option<String>,

        #[arg(long)]
        to: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = HoursConfig::load()?;
    let store = JsonFileStore::new(config.sources_path());
    debug!(sources_path = %config.sources_path().display(), "configuration loaded");

    match cli.command {
        Commands::Sum { from, to } => {
            let window = parse_window(from.as_deref(), to.as_deref())?;
            commands::sum::run(&config, store, window).await
        }
        Commands::List => commands::sources::list(&store),
        Commands::Add { name, url } => commands::sources::add(&store, name, url),
        Commands::Remove { calendar } => commands::sources::remove(&store, &calendar),
        Commands::Rename { calendar, name } => commands::sources::rename(&store, &calendar, name),
        Commands::SetUrl { calendar, url } => commands::sources::set_url(&store, &calendar, url),
        Commands::Interactive { from, to } => {
            let window = parse_window(from.as_deref(), to.as_deref())?;
            commands::interactive::run(&config, store, window).await
        }
    }
}

/// Logs go to stderr so results on stdout stay clean. Set RUST_LOG to see more.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_window(from: Option<&str>, to: Option<&str>) -> Result<DateWindow> {
    DateWindow::from_args(from, to).map_err(|e| anyhow::anyhow!(e))
}
