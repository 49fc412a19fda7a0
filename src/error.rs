//! The [`CisGrnError`] `enum` definition and error messages.
//!
use std::num::{ParseFloatError, ParseIntError};
use std::string::FromUtf8Error;
use thiserror::Error;

/// The [`CisGrnError`] defines the standard set of errors that should
/// be passed to the user.
#[derive(Debug, Error)]
pub enum CisGrnError {
    // IO related errors
    #[error("File reading error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Delimited file error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Could not convert FASTA sequence name to UTF8: {0}")]
    FromUtf8Error(#[from] FromUtf8Error),

    // File parsing related errors
    #[error("Integer parsing error: {0}")]
    ParseIntError(#[from] ParseIntError),
    #[error("Float parsing error: {0}")]
    ParseFloatError(#[from] ParseFloatError),
    #[error("Column '{0}' is missing from the header of '{1}'")]
    MissingColumn(String, String),
    #[error("File '{0}' has no header row")]
    MissingHeader(String),
    #[error("Invalid gene ID pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    // Expression matrix errors
    #[error("No sample columns were selected from the expression matrix")]
    NoSampleColumns,
    #[error("Expression matrix is empty after filtering")]
    EmptyExpressionMatrix,
    #[error("Foreground (cluster {0}) is empty: check the cluster column and label")]
    EmptyForeground(String),
    #[error("Background pool (all clusters except {0}) is empty: check the cluster column and label")]
    EmptyBackgroundPool(String),
    #[error("No usable transcription factors found after filtering for expression and variability")]
    NoTranscriptionFactors,

    // Statistics errors
    #[error("No shuffled control FIMO results were found under '{0}'")]
    NoShuffledControls(String),

    // External tools
    #[error("Could not run '{0}': {1}")]
    ExternalCommand(String, std::io::Error),
    #[error("'{0}' exited unsuccessfully ({1})")]
    ExternalCommandFailed(String, String),

    // Parameter errors
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Could not build thread pool: {0}")]
    ThreadPoolError(#[from] rayon::ThreadPoolBuildError),

    // Command line tool related errors
    #[error("Could not initialize logging: {0}")]
    LoggerError(#[from] log::SetLoggerError),
    #[error("Command line argument error: {0}")]
    ArgumentError(#[from] clap::error::Error),
}
