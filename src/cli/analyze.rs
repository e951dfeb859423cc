use tracing::instrument;
use vuid::{Config, domain::Stats};

use super::{
    OutputFormat, SpecArgs,
    terminal::{Colorize, heading},
};

#[derive(Debug, clap::Parser)]
pub struct Command {
    #[command(flatten)]
    spec: SpecArgs,

    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,
}

impl Command {
    #[instrument(level = "debug", skip(config))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let stats = self.spec.extract(config)?.stats();

        match self.output {
            OutputFormat::Json => Self::output_json(stats)?,
            OutputFormat::Table => Self::output_table(stats),
        }
        Ok(())
    }

    fn output_json(stats: Stats) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        Ok(())
    }

    fn output_table(stats: Stats) {
        println!("{}", heading("Valid Usage statements"));
        println!("Identifiers       {}", stats.records.to_string().info());
        println!("Repeated messages {}", stats.repeated_messages.to_string().info());
        if stats.repeated_messages > 0 {
            println!(
                "{}",
                "Repeated messages re-anchor to a single identifier when compared.".dim()
            );
        }
    }
}
