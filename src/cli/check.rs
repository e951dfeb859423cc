use std::{path::PathBuf, process};

use tracing::instrument;
use vuid::{Config, domain::Summary};

use super::{SpecArgs, load_database, reconcile_against, terminal::Colorize};

#[derive(Debug, clap::Parser)]
pub struct Command {
    #[command(flatten)]
    spec: SpecArgs,

    /// Path to the published database
    #[arg(long, value_name = "PATH")]
    db: PathBuf,
}

/// Whether the database would change if the document were reconciled now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Drift {
    changed: bool,
    advisories: usize,
    summary: Summary,
}

impl Command {
    #[instrument(skip(config))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let drift = self.drift(config)?;
        let summary = drift.summary;

        if !drift.changed {
            println!("{}", "✅ Database is up to date.".success());
            return Ok(());
        }

        println!("{}", "⚠️  Database is out of date".warning());
        println!(
            "  {} re-anchored, {} new, {} advisories",
            summary.re_anchored, summary.minted, drift.advisories
        );
        process::exit(2);
    }

    /// Reconciles without writing anything and compares the outcome with the
    /// published database.
    fn drift(&self, config: &Config) -> anyhow::Result<Drift> {
        let candidate = self.spec.extract(config)?;
        let baseline = load_database(&self.db)?;

        let outcome = reconcile_against(&candidate, &baseline)?;
        let changed =
            outcome.requirements().fingerprint() != baseline.requirements().fingerprint();

        Ok(Drift {
            changed,
            advisories: outcome.advisories().len(),
            summary: outcome.summary(),
        })
    }
}
