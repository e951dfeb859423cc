use std::path::Path;

use anyhow::Context;
use tracing::instrument;
use vuid::{Config, domain::IdPrefix};

use super::terminal::Colorize;

#[derive(Debug, clap::Parser)]
pub struct Command {
    /// URL of the published specification, linked from every message
    #[arg(long, value_name = "URL")]
    spec_url: Option<String>,

    /// Prefix of every identifier (uppercase letters and underscores)
    #[arg(long, value_name = "PREFIX")]
    id_prefix: Option<IdPrefix>,

    /// Overwrite an existing configuration file
    #[arg(long)]
    force: bool,
}

impl Command {
    #[instrument(level = "debug")]
    pub fn run(self, path: &Path) -> anyhow::Result<()> {
        if path.exists() && !self.force {
            anyhow::bail!(
                "{} already exists (pass --force to overwrite it)",
                path.display()
            );
        }

        let mut config = Config::default();
        if let Some(spec_url) = self.spec_url {
            config.set_spec_url(spec_url);
        }
        if let Some(id_prefix) = self.id_prefix {
            config.set_id_prefix(id_prefix);
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        config
            .save(path)
            .with_context(|| format!("Failed to write config {}", path.display()))?;

        println!("{}", format!("✅ Wrote {}", path.display()).success());
        println!(
            "{}",
            "Next: `vuid generate --db <PATH>` publishes a first database.".dim()
        );
        Ok(())
    }
}
