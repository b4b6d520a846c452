//! epub-chapters - Split EPUB files into one EPUB per chapter

mod app;
mod catalog;
mod config;
mod error;
mod orchestrator;
mod prompt;
mod range;
mod slug;

use anyhow::{Context, Result};
use app::{PresetSelection, SessionOptions};
use clap::{Parser, Subcommand};
use config::SplitConfig;
use prompt::Prompter;
use std::io;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "epub-chapters")]
#[command(about = "Split EPUB files into one EPUB per chapter", long_about = None)]
#[command(version)]
struct Args {
    /// Directory containing the source EPUB files (default from config)
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Directory the per-book output folders are created in (default from config)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// EPUB file name inside the input directory; skips the file prompt
    #[arg(long)]
    file: Option<String>,

    /// Split every chapter without asking for a range
    #[arg(long, conflicts_with = "chapters")]
    all: bool,

    /// Chapter range to split (e.g., "1-3,5,7-9")
    #[arg(long)]
    chapters: Option<String>,

    /// Do not ask for confirmation before writing
    #[arg(short = 'y', long)]
    yes: bool,

    /// Only list the chapters of the selected file
    #[arg(long, conflicts_with_all = ["all", "chapters"])]
    list: bool,

    /// Enable debug output
    #[arg(short, long, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set default input directory
    SetInputDir {
        /// Directory scanned for EPUB files
        path: PathBuf,
    },
    /// Set default output directory
    SetOutputDir {
        /// Directory chapter files are written under
        path: PathBuf,
    },
    /// Set whether to confirm before splitting
    SetConfirm {
        /// true or false
        #[arg(action = clap::ArgAction::Set)]
        value: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    if let Some(Commands::Config { action }) = &args.command {
        return handle_config_command(action);
    }

    let config = SplitConfig::load().context("Failed to load configuration")?;
    let options = session_options(&args, &config);
    log::debug!("Session options: {:?}", options);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut prompter = Prompter::new(stdin.lock(), stdout.lock());
    let end = app::run(&options, &mut prompter)?;
    log::debug!("Session ended: {:?}", end);

    Ok(())
}

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .init();
}

/// Command-line flags take precedence over the config file.
fn session_options(args: &Args, config: &SplitConfig) -> SessionOptions {
    let selection = if args.all {
        Some(PresetSelection::All)
    } else {
        args.chapters.clone().map(PresetSelection::Range)
    };

    SessionOptions {
        input_dir: args
            .input_dir
            .clone()
            .unwrap_or_else(|| config.input_dir.clone()),
        output_dir: args
            .output_dir
            .clone()
            .unwrap_or_else(|| config.output_dir.clone()),
        file: args.file.clone(),
        selection,
        confirm: config.confirm && !args.yes,
        list_only: args.list,
    }
}

fn handle_config_command(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = SplitConfig::load()?;
            println!("Configuration file: {:?}", SplitConfig::config_path()?);
            println!();
            println!("input_dir = \"{}\"", config.input_dir.display());
            println!("output_dir = \"{}\"", config.output_dir.display());
            println!("confirm = {}", config.confirm);
        }
        ConfigAction::SetInputDir { path } => {
            let mut config = SplitConfig::load()?;
            config.input_dir = path.clone();
            config.save()?;
            println!("Default input directory set to: {}", path.display());
        }
        ConfigAction::SetOutputDir { path } => {
            let mut config = SplitConfig::load()?;
            config.output_dir = path.clone();
            config.save()?;
            println!("Default output directory set to: {}", path.display());
        }
        ConfigAction::SetConfirm { value } => {
            let mut config = SplitConfig::load()?;
            config.confirm = *value;
            config.save()?;
            println!("Confirmation before splitting set to: {}", value);
        }
    }
    Ok(())
}
