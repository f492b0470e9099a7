use std::env;
use std::io;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use menukit::config::{self, global_config_path, write_example_config};
use menukit::definition::load_definition;
use menukit::{FileCache, MemoryCache, Menu, MenuOutcome, TerminalScreen, tty};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "menukit",
    version,
    about = "Two-column fuzzy terminal menus",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    /// Override config path. If omitted, menukit checks ./menukit.toml, ./.menukit.toml, and then ~/.config/menukit/config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Remember the selection under this id and start from it next time
    #[arg(long)]
    restore_id: Option<String>,

    /// Write diagnostics to stderr (filter with MENUKIT_LOG)
    #[arg(long)]
    log: bool,

    /// Menu definition (TOML)
    menu: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write an example config to the global config path
    Init {
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    if cli.log {
        init_logging();
    }

    if let Some(Command::Init { force }) = cli.command {
        let path = global_config_path()?;
        write_example_config(&path, force)?;
        println!("wrote {}", path.display());
        return Ok(());
    }

    let menu_path = cli
        .menu
        .context("no menu definition given (usage: menukit <menu.toml>)")?;
    let cwd = env::current_dir()?;
    let loaded = config::load(&cwd, cli.config.as_deref())?;
    let theme = loaded.config.theme()?;
    let settings = loaded.config.settings();
    let options = load_definition(&menu_path)?.into_options(cli.restore_id);
    tracing::debug!(config = ?loaded.path, menu = %menu_path.display(), "starting menu");

    let outcome = match FileCache::default_path() {
        Some(path) => {
            let cache = FileCache::open(path);
            let mut menu = Menu::new(TerminalScreen::enter()?, cache, settings, theme);
            menu.configure(options);
            tty::run(&mut menu)?
        }
        None => {
            tracing::warn!("no cache directory; selections will not be remembered");
            let cache = MemoryCache::new();
            let mut menu = Menu::new(TerminalScreen::enter()?, cache, settings, theme);
            menu.configure(options);
            tty::run(&mut menu)?
        }
    };
    print_outcome(outcome)
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("MENUKIT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn print_outcome(outcome: Option<MenuOutcome<Value>>) -> Result<()> {
    let Some(MenuOutcome { value: Some(value), .. }) = outcome else {
        process::exit(1);
    };
    let rendered = serde_json::to_string(&value).context("failed to serialize selection")?;
    println!("{rendered}");
    Ok(())
}
