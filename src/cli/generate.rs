use std::path::PathBuf;

use anyhow::Context;
use tracing::instrument;
use vuid::{Config, Database};

use super::{DEFAULT_HEADER, SpecArgs, terminal::Colorize, write_header};

#[derive(Debug, clap::Parser)]
pub struct Command {
    #[command(flatten)]
    spec: SpecArgs,

    /// Path of the generated header
    #[arg(long, value_name = "PATH", default_value = DEFAULT_HEADER)]
    out: PathBuf,

    /// Also write a fresh database to this path, replacing any existing one
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,
}

impl Command {
    #[instrument(skip(config))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let requirements = self.spec.extract(config)?;
        let stats = requirements.stats();

        println!(
            "Found {} identifiers ({} repeated messages)",
            stats.records.to_string().info(),
            stats.repeated_messages
        );

        if let Some(path) = &self.db {
            Database::from_requirements(&requirements, None)
                .save(path)
                .with_context(|| format!("Failed to write database {}", path.display()))?;
            println!("{}", format!("✅ Wrote database {}", path.display()).success());
        }

        write_header(&requirements, &self.out)?;
        println!("{}", format!("✅ Wrote header {}", self.out.display()).success());

        Ok(())
    }
}
