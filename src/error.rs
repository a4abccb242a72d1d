use std::path::PathBuf;

use thiserror::Error;

/// Why a probe classified an endpoint as down.
///
/// The `Display` form is the down-reason written to the event log.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("SSL Error: {0}")]
    Tls(String),

    #[error("HTTP Error: {0}")]
    HttpStatus(String),

    #[error("Request Error: {0}")]
    Transport(String),

    #[error("Error: {0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum LogError {
    #[error("failed to append to event log {path}: {source}")]
    Append {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read event log {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("transition event could not be recorded: {0}")]
    LogWrite(#[from] LogError),

    #[error("no endpoints configured")]
    NoEndpoints,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    Log(#[from] LogError),

    #[error("failed to write report {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to write report {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
