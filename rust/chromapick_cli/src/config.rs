use chromapick::PickerConfig;
use clap::ValueEnum;
use serde::{
    Deserialize,
    Serialize,
};
use std::path::{
    Path,
    PathBuf,
};
use tracing::warn;

use crate::cli::Cli;
use crate::errors::CliError;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub mode: PickerMode,
    pub picker: PickerConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PickerMode {
    #[default]
    Hierarchical,
    Basic,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    pub path: Option<PathBuf>,
    pub lid_column: String,
    pub building_block_columns: Vec<String>,
    pub raw_data_column: String,
    /// When set, only rows of this library id are processed.
    pub lid_to_process: Option<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: None,
            lid_column: "lid".to_string(),
            building_block_columns: vec![
                "BB1 Name".to_string(),
                "BB2 Name".to_string(),
                "BB3 Name".to_string(),
            ],
            raw_data_column: "all_datapoints".to_string(),
            lid_to_process: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct OutputConfig {
    /// CSV with the input rows and an appended retention time column.
    pub path: Option<PathBuf>,
    pub json_path: Option<PathBuf>,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, CliError> {
        match std::fs::File::open(path) {
            Ok(file) => Ok(serde_json::from_reader(std::io::BufReader::new(file))?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Config file {:?} not found, using defaults", path);
                Ok(Self::default())
            }
            Err(e) => Err(CliError::io(e, path)),
        }
    }

    /// Loads the config file (if any) and applies the command line overrides.
    pub fn with_cli_args(args: Cli) -> Result<Self, CliError> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        if let Some(input) = args.input {
            config.input.path = Some(input);
        }
        if let Some(output) = args.output {
            config.output.path = Some(output);
        }
        if let Some(json) = args.json_output {
            config.output.json_path = Some(json);
        }
        if let Some(lid) = args.lid {
            config.input.lid_to_process = Some(lid);
        }
        if let Some(mode) = args.mode {
            config.mode = mode;
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), CliError> {
        if self.input.path.is_none() {
            return Err(CliError::Config(
                "No input provided, please provide one in either the config file or with the --input flag".to_string(),
            ));
        }
        if self.output.path.is_none() {
            return Err(CliError::Config(
                "No output provided, please provide one in either the config file or with the --output flag".to_string(),
            ));
        }
        if self.input.building_block_columns.is_empty() {
            return Err(CliError::Config(
                "At least one building block column is required".to_string(),
            ));
        }
        self.picker
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))
    }
}
