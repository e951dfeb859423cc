use std::path::{Path, PathBuf};

mod analyze;
mod check;
mod compare;
mod generate;
mod init;
mod terminal;

use anyhow::Context;
use clap::ArgAction;
use vuid::{
    Config, Database, Reconciliation, RequirementSet,
    storage::{document, header},
};

/// The configuration file picked up from the working directory when
/// `--config` is not given.
const DEFAULT_CONFIG: &str = "vuid.toml";

/// Where the generated header is written by default.
const DEFAULT_HEADER: &str = "vk_validation_error_messages.h";

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the configuration file (defaults to `vuid.toml` if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        self.command.run(self.config.as_deref())
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Write a configuration file with default settings
    Init(init::Command),

    /// Extract identifiers and write the header (and optionally a fresh
    /// database)
    Generate(generate::Command),

    /// Reconcile extracted identifiers against a database
    ///
    /// Unchanged statements keep their published identifiers, moved statements
    /// are re-anchored, and new statements get fresh identifiers.
    Compare(compare::Command),

    /// Check whether a database is up to date (exits with code 2 if not)
    Check(check::Command),

    /// Show how many identifiers and repeated messages the document holds
    Analyze(analyze::Command),
}

impl Command {
    fn run(self, config_path: Option<&Path>) -> anyhow::Result<()> {
        match self {
            Self::Init(command) => {
                command.run(config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG)))?;
            }
            Self::Generate(command) => command.run(&load_config(config_path)?)?,
            Self::Compare(command) => command.run(&load_config(config_path)?)?,
            Self::Check(command) => command.run(&load_config(config_path)?)?,
            Self::Analyze(command) => command.run(&load_config(config_path)?)?,
        }
        Ok(())
    }
}

/// Arguments shared by every command that reads the specification.
#[derive(Debug, Clone, clap::Args)]
pub struct SpecArgs {
    /// Path to the XHTML specification
    #[arg(long, value_name = "PATH", default_value = "vkspec.html")]
    spec: PathBuf,
}

impl SpecArgs {
    /// Reads and parses the specification, then extracts its statements.
    fn extract(&self, config: &Config) -> anyhow::Result<RequirementSet> {
        let text = document::read(&self.spec)
            .with_context(|| format!("Failed to read {}", self.spec.display()))?;
        let tree = document::parse(&text)
            .with_context(|| format!("Failed to parse {}", self.spec.display()))?;
        let requirements = vuid::extract(tree.root_element(), config)?;
        tracing::info!(count = requirements.len(), "extracted identifiers");
        Ok(requirements)
    }
}

/// Output format for commands with machine-readable output.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let path = match path {
        Some(path) => path,
        None if Path::new(DEFAULT_CONFIG).is_file() => Path::new(DEFAULT_CONFIG),
        None => return Ok(Config::default()),
    };

    Config::load(path).with_context(|| format!("Failed to load config from {}", path.display()))
}

fn load_database(path: &Path) -> anyhow::Result<Database> {
    Database::load(path).with_context(|| format!("Failed to load database {}", path.display()))
}

/// Reconciles `candidate` against the published database and rejects the
/// outcome if any record was lost.
fn reconcile_against(
    candidate: &RequirementSet,
    baseline: &Database,
) -> anyhow::Result<Reconciliation> {
    let outcome = vuid::reconcile(candidate, &baseline.requirements(), baseline.watermark().minter());
    outcome
        .validate()
        .context("Refusing to use the reconciled identifiers")?;
    Ok(outcome)
}

fn write_header(requirements: &RequirementSet, path: &Path) -> anyhow::Result<()> {
    header::write(requirements, path)
        .with_context(|| format!("Failed to write header {}", path.display()))
}
