use std::path::PathBuf;

use snafu::Snafu;
use strum::IntoStaticStr;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu, IntoStaticStr)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("DataTypeError: {}", source))]
    DataType {
        source: scenario_datatypes::error::Error,
    },

    #[snafu(display("OperatorError: {}", source))]
    Operator {
        source: scenario_operators::error::Error,
    },

    #[snafu(display("Unknown job type {job_type:?}"))]
    UnknownJobType { job_type: String },

    #[snafu(display("Malformed arguments for job type {job_type}: {source}"))]
    MalformedJob {
        job_type: String,
        source: serde_json::Error,
    },

    #[snafu(display("Job of type {job_type} is missing the server attribute {attribute:?}"))]
    MissingServerAttribute {
        job_type: String,
        attribute: &'static str,
    },

    #[snafu(display("Malformed job envelope: {}", source))]
    MalformedEnvelope { source: serde_json::Error },

    #[snafu(display("Request to job queue {url} failed: {source}"))]
    QueueRequest { url: String, source: reqwest::Error },

    #[snafu(display("Invalid job queue url: {}", source))]
    InvalidQueueUrl { source: url::ParseError },

    #[snafu(display("Model {model} failed: {reason}"))]
    ModelExecution { model: String, reason: String },

    #[snafu(display("Cannot run model command {command:?}: {source}"))]
    ModelCommand {
        command: String,
        source: std::io::Error,
    },

    #[snafu(display(
        "Base land-cover raster is in {actual}, but {configured} is configured as native projection"
    ))]
    BaseLulcProjectionMismatch { configured: String, actual: String },

    #[snafu(display("Cannot create directory {}: {}", path.display(), source))]
    WorkspaceCreation {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Io error: {}", source))]
    Io { source: std::io::Error },

    SerdeJson {
        source: serde_json::Error,
    },

    TokioJoin {
        source: tokio::task::JoinError,
    },

    #[snafu(display("Invalid log spec: {}", source))]
    LogSpec {
        source: tracing_subscriber::filter::ParseError,
    },

    #[snafu(display("Cannot initialize log file: {}", source))]
    LogFile {
        source: tracing_appender::rolling::InitError,
    },

    Config {
        source: config::ConfigError,
    },

    ConfigLockFailed,

    MissingWorkingDirectory {
        source: std::io::Error,
    },

    MissingSettingsDirectory,
}

impl From<scenario_datatypes::error::Error> for Error {
    fn from(datatype_error: scenario_datatypes::error::Error) -> Self {
        Self::DataType {
            source: datatype_error,
        }
    }
}

impl From<scenario_operators::error::Error> for Error {
    fn from(operator_error: scenario_operators::error::Error) -> Self {
        Self::Operator {
            source: operator_error,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(io_error: std::io::Error) -> Self {
        Self::Io { source: io_error }
    }
}

impl From<serde_json::Error> for Error {
    fn from(serde_json_error: serde_json::Error) -> Self {
        Self::SerdeJson {
            source: serde_json_error,
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(source: tokio::task::JoinError) -> Self {
        Error::TokioJoin { source }
    }
}

impl From<config::ConfigError> for Error {
    fn from(source: config::ConfigError) -> Self {
        Error::Config { source }
    }
}
