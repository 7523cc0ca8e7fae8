//! Services for loading, aggregating and writing country data

pub mod aggregator;
pub mod data_loader;
pub mod normalizer;
pub mod writer;

pub use aggregator::{AggregateOptions, Aggregator, InvalidStreams, ValidityGate};
pub use data_loader::DataLoaderService;
pub use normalizer::{normalize_country, CountryNormalizer};
pub use writer::{read_table, write_table};
