//! Validation harness for the nix-blazar binary cache setup and the
//! Jujutsu recipes in its justfile.
//!
//! `cache` checks the static configuration files, `jj` drives the task
//! runner's jj recipes and asserts on their behaviour. Both print every
//! finding at the end and exit non-zero only when an error was recorded.
use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use nix_blazar_check::core::config::{ConfigFormat, ConfigManager};
use nix_blazar_check::utils::{self, OutputFormat};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nix-blazar-check")]
#[command(about = "Validate the binary cache setup and exercise the jj justfile recipes")]
#[command(version)]
struct Cli {
    /// Project root (defaults to the nearest ancestor containing a justfile)
    #[arg(long, global = true)]
    project_root: Option<PathBuf>,

    /// Configuration override file (.toml, .yaml, .yml or .json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the binary cache configuration files
    Cache,
    /// Exercise the Jujutsu recipes through the task runner
    Jj,
    /// Run both harnesses (default)
    All,
    /// Print the effective configuration
    ExportConfig {
        #[arg(long, value_enum, default_value_t = ExportFormat::Toml)]
        to: ExportFormat,
        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Toml,
    Yaml,
    Json,
}

impl From<ExportFormat> for ConfigFormat {
    fn from(format: ExportFormat) -> Self {
        match format {
            ExportFormat::Toml => ConfigFormat::Toml,
            ExportFormat::Yaml => ConfigFormat::Yaml,
            ExportFormat::Json => ConfigFormat::Json,
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let manager = ConfigManager::new(cli.project_root, cli.config)?;

    let format = cli.format;
    let runs = match cli.command.unwrap_or(Commands::All) {
        Commands::ExportConfig { to, output } => {
            utils::export_config(&manager, to.into(), output.as_deref())?;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Cache => {
            let config = utils::load_validated_config(&manager)?;
            vec![utils::validate_cache(&manager, &config, format)?]
        }
        Commands::Jj => {
            let config = utils::load_validated_config(&manager)?;
            vec![utils::test_jj(&manager, &config, format)?]
        }
        Commands::All => {
            let config = utils::load_validated_config(&manager)?;
            vec![
                utils::validate_cache(&manager, &config, format)?,
                utils::test_jj(&manager, &config, format)?,
            ]
        }
    };

    if runs.iter().all(|run| run.is_success()) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(1))
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if cli.no_color {
        colored::control::set_override(false);
    }

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}
