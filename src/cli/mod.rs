mod aggregate;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use aggregate::AggregateArgs;
use streamatlas::services::writer;
use streamatlas::types::{AtlasError, MapStats};

/// Per-country streaming statistics for choropleth world maps
#[derive(Parser)]
#[command(name = "streamatlas")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate track records into a per-country table
    Aggregate(AggregateArgs),

    /// Show summary statistics of an aggregated table
    Stats {
        /// Aggregated output file
        #[arg(value_name = "FILE", default_value = "data/byCountry.json")]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        match self.command {
            Commands::Aggregate(args) => args.run()?,
            Commands::Stats { file, json } => {
                let table = writer::read_table(&file)?;
                let stats = MapStats::from_table(&table);
                if json {
                    let out = serde_json::to_string_pretty(&stats)
                        .map_err(|e| AtlasError::Output(e.to_string()))?;
                    println!("{}", out);
                } else {
                    print_stats(&stats);
                }
            }
        }
        Ok(())
    }
}

fn print_stats(stats: &MapStats) {
    println!("Countries:      {}", stats.country_count);
    println!("Total streams:  {}", stats.total_streams);
    match (&stats.peak_country, stats.max_streams) {
        (Some(country), Some(max)) => println!("Max streams:    {} ({})", max, country),
        _ => println!("Max streams:    -"),
    }
    if stats.poisoned_countries > 0 {
        println!("Invalid totals: {}", stats.poisoned_countries);
    }
    for range in &stats.feature_ranges {
        println!(
            "{:<15} {:.3} .. {:.3}",
            format!("{}:", range.feature),
            range.min,
            range.max
        );
    }
}
