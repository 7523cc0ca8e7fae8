//! `streamatlas aggregate` subcommand: track rows → per-country table

use clap::{Args, ValueEnum};
use std::path::PathBuf;

use streamatlas::services::{
    writer, AggregateOptions, Aggregator, CountryNormalizer, DataLoaderService, InvalidStreams,
    ValidityGate,
};
use streamatlas::types::{Feature, Result};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateArg {
    /// Count every record's streams
    Lax,
    /// Skip records whose first --feature (energy by default) does not parse
    Primary,
}

impl From<GateArg> for ValidityGate {
    fn from(arg: GateArg) -> Self {
        match arg {
            GateArg::Lax => ValidityGate::Lax,
            GateArg::Primary => ValidityGate::PrimaryFeature,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvalidStreamsArg {
    /// Write the country's total as null
    Poison,
    /// Ignore the unparseable value
    Skip,
}

impl From<InvalidStreamsArg> for InvalidStreams {
    fn from(arg: InvalidStreamsArg) -> Self {
        match arg {
            InvalidStreamsArg::Poison => InvalidStreams::Poison,
            InvalidStreamsArg::Skip => InvalidStreams::Skip,
        }
    }
}

/// Aggregate per-track records into per-country totals and feature means
#[derive(Args, Debug)]
pub struct AggregateArgs {
    /// Input files, directories or glob patterns (.json arrays or .jsonl rows)
    #[arg(value_name = "INPUT", default_value = "data/spotify.json")]
    pub inputs: Vec<String>,

    /// Output file
    #[arg(short, long, default_value = "data/byCountry.json")]
    pub output: PathBuf,

    /// Feature to average per country (repeatable, order is kept)
    #[arg(long = "feature", value_name = "NAME", conflicts_with = "streams_only")]
    pub features: Vec<String>,

    /// Only total streams; write plain numbers per country
    #[arg(long)]
    pub streams_only: bool,

    /// Record validity gate
    #[arg(long, value_enum, default_value_t = GateArg::Lax)]
    pub gate: GateArg,

    /// What an unparseable streams value does to a country's total
    #[arg(long, value_enum, default_value_t = InvalidStreamsArg::Poison)]
    pub invalid_streams: InvalidStreamsArg,

    /// Rewrite known country names to match the world map dataset
    #[arg(long)]
    pub normalize_names: bool,

    /// Extra country rename applied before aggregation (repeatable)
    #[arg(long = "rename", value_name = "FROM=TO")]
    pub renames: Vec<String>,

    /// Pretty-print the output JSON
    #[arg(long)]
    pub pretty: bool,

    /// Also print the table to stdout
    #[arg(long)]
    pub print: bool,
}

impl AggregateArgs {
    pub fn options(&self) -> AggregateOptions {
        let features = if self.streams_only {
            Vec::new()
        } else if self.features.is_empty() {
            match self.gate {
                GateArg::Lax => Feature::defaults(),
                GateArg::Primary => Feature::gated_defaults(),
            }
        } else {
            self.features.iter().map(|f| Feature::new(f.as_str())).collect()
        };

        AggregateOptions::new(features)
            .with_gate(self.gate.into())
            .with_invalid_streams(self.invalid_streams.into())
    }

    pub fn normalizer(&self) -> Result<CountryNormalizer> {
        let mut normalizer = if self.normalize_names {
            CountryNormalizer::new()
        } else {
            CountryNormalizer::renames_only()
        };
        for rename in &self.renames {
            normalizer.add_rename(rename)?;
        }
        Ok(normalizer)
    }

    pub fn run(self) -> Result<()> {
        let options = self.options();
        options.validate()?;

        let loader = DataLoaderService::with_normalizer(self.normalizer()?);
        let loaded = loader.load(&self.inputs)?;

        let table = Aggregator::aggregate(&loaded.records, &options);
        log::info!(
            "aggregated {} records into {} countries",
            loaded.records.len(),
            table.len()
        );

        writer::write_table(&self.output, &table, self.pretty)?;

        if self.print {
            println!("{}", writer::to_json(&table, true)?);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn args(inputs: Vec<String>, output: PathBuf) -> AggregateArgs {
        AggregateArgs {
            inputs,
            output,
            features: Vec::new(),
            streams_only: false,
            gate: GateArg::Lax,
            invalid_streams: InvalidStreamsArg::Poison,
            normalize_names: false,
            renames: Vec::new(),
            pretty: false,
            print: false,
        }
    }

    fn fixture(name: &str) -> String {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join(name)
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn test_options_default_features() {
        let a = args(Vec::new(), PathBuf::from("out.json"));
        let options = a.options();
        assert_eq!(options.features, Feature::defaults());
        assert_eq!(options.gate, ValidityGate::Lax);
        assert_eq!(options.invalid_streams, InvalidStreams::Poison);
    }

    #[test]
    fn test_options_streams_only() {
        let mut a = args(Vec::new(), PathBuf::from("out.json"));
        a.streams_only = true;
        assert!(a.options().features.is_empty());
    }

    #[test]
    fn test_options_primary_gate_defaults_to_energy() {
        let mut a = args(Vec::new(), PathBuf::from("out.json"));
        a.gate = GateArg::Primary;

        let options = a.options();
        assert_eq!(options.primary_feature(), Some(&Feature::new("energy")));
        assert_eq!(options.features, Feature::gated_defaults());
    }

    #[test]
    fn test_options_explicit_features_keep_order() {
        let mut a = args(Vec::new(), PathBuf::from("out.json"));
        a.features = vec!["energy".into(), "valence".into()];
        a.gate = GateArg::Primary;

        let options = a.options();
        assert_eq!(options.primary_feature(), Some(&Feature::new("energy")));
        assert_eq!(options.features.len(), 2);
        assert_eq!(options.gate, ValidityGate::PrimaryFeature);
    }

    #[test]
    fn test_normalizer_rejects_bad_rename() {
        let mut a = args(Vec::new(), PathBuf::from("out.json"));
        a.renames = vec!["Korea".into()];
        assert!(a.normalizer().is_err());
    }

    #[test]
    fn test_run_writes_output() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("byCountry.json");
        let mut a = args(vec![fixture("spotify-sample.json")], output.clone());
        a.normalize_names = true;

        a.run().unwrap();

        let table = writer::read_table(&output).unwrap();
        assert_eq!(table.len(), 3);
        assert!(table.contains("United States of America"));
        assert_eq!(table.get("Chile").unwrap().streams.value(), Some(2000));
    }

    #[test]
    fn test_run_streams_only_writes_plain_numbers() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("totals.json");
        let mut a = args(vec![fixture("spotify-sample.json")], output.clone());
        a.streams_only = true;

        a.run().unwrap();

        let content = fs::read_to_string(&output).unwrap();
        assert_eq!(
            content,
            r#"{"Chile":2000,"United States":6000,"Korea":300}"#
        );
    }

    #[test]
    fn test_run_primary_gate_on_energy() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("gated.json");
        let mut a = args(vec![fixture("spotify-sample.json")], output.clone());
        a.features = vec!["energy".into(), "danceability".into()];
        a.gate = GateArg::Primary;

        a.run().unwrap();

        let table = writer::read_table(&output).unwrap();
        // Chile's second row has unparseable energy and is dropped entirely
        assert_eq!(table.get("Chile").unwrap().streams.value(), Some(1200));
    }

    #[test]
    fn test_run_primary_gate_default_features() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("gated.json");
        let mut a = args(vec![fixture("spotify-sample.json")], output.clone());
        a.gate = GateArg::Primary;

        a.run().unwrap();

        let table = writer::read_table(&output).unwrap();
        assert_eq!(table.get("Chile").unwrap().streams.value(), Some(1200));
        assert_eq!(table.features()[0], Feature::new("energy"));
    }

    #[test]
    fn test_run_empty_input_writes_empty_table() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("empty-out.json");

        args(vec![fixture("empty.json")], output.clone())
            .run()
            .unwrap();

        assert_eq!(fs::read_to_string(&output).unwrap(), "{}");
    }

    #[test]
    fn test_run_primary_gate_without_features_fails() {
        let tmp = TempDir::new().unwrap();
        let mut a = args(vec![fixture("spotify-sample.json")], tmp.path().join("x.json"));
        a.streams_only = true;
        a.gate = GateArg::Primary;

        assert!(a.run().is_err());
    }

    #[test]
    fn test_run_idempotent_output() {
        let tmp = TempDir::new().unwrap();
        let first = tmp.path().join("first.json");
        let second = tmp.path().join("second.json");

        args(vec![fixture("spotify-sample.json")], first.clone())
            .run()
            .unwrap();
        args(vec![fixture("spotify-sample.json")], second.clone())
            .run()
            .unwrap();

        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
    }
}
