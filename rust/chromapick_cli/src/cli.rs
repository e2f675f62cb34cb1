use crate::config::PickerMode;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the JSON configuration file (defaults are used when omitted)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the input CSV (will over-write the config file)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Path to the output CSV (will over-write the config file)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also write the full results as JSON to this path
    #[arg(short, long)]
    pub json_output: Option<PathBuf>,

    /// Only process rows of this library id
    #[arg(short, long)]
    pub lid: Option<String>,

    /// Peak picking strategy
    #[arg(short, long, value_enum)]
    pub mode: Option<PickerMode>,
}
