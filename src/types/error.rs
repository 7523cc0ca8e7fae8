use thiserror::Error;

/// streamatlas error types
#[derive(Error, Debug)]
pub enum AtlasError {
    /// Failed to parse input records or an output table
    #[error("parse error: {0}")]
    Parse(String),

    /// File I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid aggregation or CLI configuration
    #[error("config error: {0}")]
    Config(String),

    /// Writing the output table failed
    #[error("output error: {0}")]
    Output(String),
}

/// Result type alias for streamatlas
pub type Result<T> = std::result::Result<T, AtlasError>;
