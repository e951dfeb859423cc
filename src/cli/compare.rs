use std::{path::PathBuf, process};

use anyhow::Context;
use tracing::instrument;
use vuid::{Config, Database, Reconciliation};

use super::{
    DEFAULT_HEADER, OutputFormat, SpecArgs, load_database, reconcile_against,
    terminal::{Colorize, heading, is_narrow},
    write_header,
};

#[derive(Debug, clap::Parser)]
#[allow(clippy::struct_excessive_bools)]
pub struct Command {
    #[command(flatten)]
    spec: SpecArgs,

    /// Path to the published database
    #[arg(long, value_name = "PATH")]
    db: PathBuf,

    /// Path of the generated header
    #[arg(long, value_name = "PATH", default_value = DEFAULT_HEADER)]
    out: PathBuf,

    /// Rewrite the database with the reconciled identifiers
    #[arg(long)]
    update_db: bool,

    /// Exit with code 2 if any advisories were raised
    #[arg(long)]
    strict: bool,

    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,
}

impl Command {
    #[instrument(skip(config))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let outcome = self.apply(config)?;

        match self.output {
            OutputFormat::Json => Self::output_json(&outcome)?,
            OutputFormat::Table => Self::output_table(&outcome),
        }

        if self.strict && !outcome.advisories().is_empty() {
            process::exit(2);
        }

        Ok(())
    }

    /// Reconciles the document against the database and writes the outputs.
    ///
    /// Nothing is written unless every extracted statement kept a unique
    /// identifier.
    fn apply(&self, config: &Config) -> anyhow::Result<Reconciliation> {
        let candidate = self.spec.extract(config)?;
        let baseline = load_database(&self.db)?;

        let outcome = reconcile_against(&candidate, &baseline)?;

        write_header(outcome.requirements(), &self.out)?;

        if self.update_db {
            Database::from_requirements(outcome.requirements(), Some(&baseline))
                .save(&self.db)
                .with_context(|| format!("Failed to write database {}", self.db.display()))?;
        }

        Ok(outcome)
    }

    fn output_json(outcome: &Reconciliation) -> anyhow::Result<()> {
        use serde_json::json;

        let output = json!({
            "summary": outcome.summary(),
            "watermark": outcome.watermark().value(),
            "advisories": outcome.advisories(),
        });

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn output_table(outcome: &Reconciliation) {
        let summary = outcome.summary();

        println!("{}", heading("Reconciled identifiers"));

        if is_narrow() {
            println!("exact        {}", summary.exact);
            println!("re-anchored  {}", summary.re_anchored);
            println!("minted       {}", summary.minted);
            println!("collisions   {}", summary.collisions);
        } else {
            println!(
                "exact {}  re-anchored {}  minted {}  collisions {}",
                summary.exact, summary.re_anchored, summary.minted, summary.collisions
            );
        }
        println!(
            "{}",
            format!("highest identifier: {}", outcome.watermark()).dim()
        );

        if outcome.advisories().is_empty() {
            println!("{}", "✅ No advisories.".success());
            return;
        }

        println!();
        println!(
            "{}",
            format!("⚠️  {} advisories need review", outcome.advisories().len()).warning()
        );
        for advisory in outcome.advisories() {
            println!("  • {advisory}");
        }
    }
}
