use chromapick::{
    BasicPeakPicker,
    BuildingBlock,
    HierarchicalPeakPicker,
    PeakPicker,
    PickOutcome,
    PickResults,
};
use indicatif::{
    ProgressIterator,
    ProgressStyle,
};
use std::collections::{
    BTreeMap,
    HashMap,
};
use std::path::Path;
use std::time::Instant;
use tracing::{
    debug,
    error,
    info,
};

use crate::config::{
    Config,
    PickerMode,
};
use crate::data_parser::{
    Batch,
    LibraryTable,
    families,
    libraries,
};
use crate::errors::CliError;

pub const RETENTION_TIME_COLUMN: &str = "Retention Time";

pub fn run(config: &Config) -> Result<(), CliError> {
    let start = Instant::now();
    let null_element = BuildingBlock::new(config.picker.null_building_block.as_str());
    let input = config
        .input
        .path
        .as_ref()
        .ok_or_else(|| CliError::Config("No input path".to_string()))?;
    let output = config
        .output
        .path
        .as_ref()
        .ok_or_else(|| CliError::Config("No output path".to_string()))?;

    info!("Reading library table from {:?}", input);
    let table = LibraryTable::from_path(input, &config.input, &null_element)?;

    let batches = match config.mode {
        PickerMode::Hierarchical => families(&table.members, &null_element),
        PickerMode::Basic => libraries(&table.members),
    };
    info!(
        "Picking {} chromatograms in {} batches ({:?} mode)",
        table.members.len(),
        batches.len(),
        config.mode
    );

    let picked = pick_batches(batches, config)?;
    write_csv(output, &table, &picked.row_times)?;
    let results = &picked.by_lid;
    if let Some(json_path) = &config.output.json_path {
        write_json(json_path, results)?;
    }

    let failed: usize = results.values().map(|r| r.num_failed()).sum();
    let with_rt = picked.row_times.values().filter(|t| t.is_some()).count();
    info!(
        "Assigned retention times to {}/{} rows ({} failed sequences) in {:?}",
        with_rt,
        table.records.len(),
        failed,
        start.elapsed()
    );
    Ok(())
}

#[derive(Debug, Default)]
struct PickedTable {
    by_lid: BTreeMap<String, PickResults>,
    /// Retention time per table row, `None` when nothing was picked. A row
    /// picked in several batches keeps its first outcome.
    row_times: HashMap<usize, Option<f64>>,
}

impl PickedTable {
    fn add(&mut self, batch: &Batch, outcomes: &[PickOutcome], results: PickResults) {
        for (row, outcome) in batch.rows.iter().zip(outcomes) {
            self.row_times
                .entry(*row)
                .or_insert_with(|| outcome.picked().map(|p| p.time));
        }
        self.by_lid
            .entry(batch.lid.clone())
            .or_default()
            .merge(results);
    }
}

/// Runs every batch and collects the results per library id and per row.
/// A batch that fails as a whole is logged and skipped.
fn pick_batches(batches: Vec<Batch>, config: &Config) -> Result<PickedTable, CliError> {
    let picker: Box<dyn PeakPicker> = match config.mode {
        PickerMode::Hierarchical => Box::new(
            HierarchicalPeakPicker::new(&config.picker).map_err(|e| CliError::Picking(e.into()))?,
        ),
        PickerMode::Basic => Box::new(
            BasicPeakPicker::new(&config.picker).map_err(|e| CliError::Picking(e.into()))?,
        ),
    };

    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})",
    )
    .map_err(|e| CliError::Config(e.to_string()))?;

    let mut out = PickedTable::default();
    for mut batch in batches.into_iter().progress_with_style(style) {
        let num = batch.chromatograms.len();
        let chromatograms = std::mem::take(&mut batch.chromatograms);
        match picker.pick(chromatograms) {
            Ok(report) => {
                debug!(
                    "{}: picked {}/{} ({:?})",
                    batch.lid,
                    report.results.num_picked(),
                    num,
                    report.results.timings
                );
                out.add(&batch, &report.outcomes, report.results);
            }
            Err(e) => error!("Skipping batch of {} chromatograms in {}: {}", num, batch.lid, e),
        }
    }
    Ok(out)
}

fn write_csv(
    path: &Path,
    table: &LibraryTable,
    by_row: &HashMap<usize, Option<f64>>,
) -> Result<(), CliError> {
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_path(path)?;
    let mut headers = table.headers.clone();
    headers.push_field(RETENTION_TIME_COLUMN);
    wtr.write_record(&headers)?;
    for (row, record) in table.records.iter().enumerate() {
        let mut record = record.clone();
        let rt = by_row
            .get(&row)
            .copied()
            .flatten()
            .map(|t| t.to_string())
            .unwrap_or_default();
        record.push_field(&rt);
        wtr.write_record(&record)?;
    }
    wtr.flush().map_err(|e| CliError::io(e, path))?;
    info!("Wrote {} rows to {:?}", table.records.len(), path);
    Ok(())
}

fn write_json(path: &Path, results: &BTreeMap<String, PickResults>) -> Result<(), CliError> {
    let file = std::fs::File::create(path).map_err(|e| CliError::io(e, path))?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), results)?;
    info!("Wrote results to {:?}", path);
    Ok(())
}
