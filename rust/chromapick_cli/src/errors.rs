use chromapick::ChromaPickError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Error interpreting the config: {0}")]
    Config(String),
    #[error("Error reading file {path}: {source}")]
    Io {
        source: std::io::Error,
        path: String,
    },
    #[error("Error parsing json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Error reading csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("Input is missing column `{column}`")]
    MissingColumn { column: String },
    #[error("Row {row}: unable to parse datapoint `{entry}`: {reason}")]
    Datapoint {
        row: usize,
        entry: String,
        reason: String,
    },
    #[error(transparent)]
    Picking(#[from] ChromaPickError),
}

impl CliError {
    pub fn io(source: std::io::Error, path: &std::path::Path) -> Self {
        CliError::Io {
            source,
            path: path.to_string_lossy().to_string(),
        }
    }
}
