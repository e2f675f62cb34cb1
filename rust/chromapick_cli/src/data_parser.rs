//! Reading library tables with one chromatogram per row.
//!
//! Each row carries a library id, one column per building block position and
//! a raw datapoint column holding entries like `"90.0:0:12.5, 91.2:0:13.0"`,
//! where the first field is the time in seconds and the third the intensity.

use chromapick::{
    BuildingBlock,
    Chromatogram,
    Hierarchy,
    Sequence,
};
use csv::StringRecord;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{
    debug,
    warn,
};

use crate::config::InputConfig;
use crate::errors::CliError;

#[derive(Debug, Clone)]
pub struct LibraryMember {
    /// Row index in the table, not counting the header.
    pub row: usize,
    pub lid: String,
    pub chromatogram: Chromatogram,
}

#[derive(Debug)]
pub struct LibraryTable {
    pub headers: StringRecord,
    pub records: Vec<StringRecord>,
    pub members: Vec<LibraryMember>,
}

/// Parses the datapoints of a single row into (time in minutes, intensity),
/// sorted by time.
pub fn parse_datapoints(field: &str, row: usize) -> Result<(Vec<f64>, Vec<f64>), CliError> {
    let mut points: Vec<(f64, f64)> = Vec::new();
    for entry in field.split(", ") {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let normalized = entry.replace(';', ":");
        let parts: Vec<&str> = normalized.split(':').collect();
        if parts.len() < 3 {
            return Err(CliError::Datapoint {
                row,
                entry: entry.to_string(),
                reason: format!("expected 3 fields, found {}", parts.len()),
            });
        }
        let parse = |s: &str| {
            s.trim().parse::<f64>().map_err(|e| CliError::Datapoint {
                row,
                entry: entry.to_string(),
                reason: e.to_string(),
            })
        };
        let seconds = parse(parts[0])?;
        let intensity = parse(parts[2])?;
        points.push((seconds / 60.0, intensity));
    }
    points.sort_by(|a, b| a.0.total_cmp(&b.0));
    Ok(points.into_iter().unzip())
}

fn column_index(headers: &StringRecord, column: &str) -> Result<usize, CliError> {
    headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| CliError::MissingColumn {
            column: column.to_string(),
        })
}

impl LibraryTable {
    pub fn from_path(
        path: &Path,
        config: &InputConfig,
        null_element: &BuildingBlock,
    ) -> Result<Self, CliError> {
        let file = std::fs::File::open(path).map_err(|e| CliError::io(e, path))?;
        Self::from_reader(file, config, null_element)
    }

    /// Rows whose datapoints cannot be parsed are logged and left out of
    /// `members`, but they are kept in `records`.
    pub fn from_reader<R: std::io::Read>(
        reader: R,
        config: &InputConfig,
        null_element: &BuildingBlock,
    ) -> Result<Self, CliError> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = rdr.headers()?.clone();
        let lid_idx = column_index(&headers, &config.lid_column)?;
        let raw_idx = column_index(&headers, &config.raw_data_column)?;
        let bb_idx = config
            .building_block_columns
            .iter()
            .map(|c| column_index(&headers, c))
            .collect::<Result<Vec<_>, _>>()?;

        let mut records = Vec::new();
        let mut members = Vec::new();
        for (row, record) in rdr.records().enumerate() {
            let record = record?;
            let lid = record.get(lid_idx).unwrap_or_default().to_string();
            let keep = config
                .lid_to_process
                .as_ref()
                .is_none_or(|wanted| *wanted == lid);
            if keep {
                match Self::parse_member(&record, row, &lid, raw_idx, &bb_idx, null_element) {
                    Ok(member) => members.push(member),
                    Err(e) => warn!("Skipping row {}: {}", row, e),
                }
            }
            records.push(record);
        }
        debug!(
            "Read {} rows, {} usable chromatograms",
            records.len(),
            members.len()
        );
        Ok(Self {
            headers,
            records,
            members,
        })
    }

    fn parse_member(
        record: &StringRecord,
        row: usize,
        lid: &str,
        raw_idx: usize,
        bb_idx: &[usize],
        null_element: &BuildingBlock,
    ) -> Result<LibraryMember, CliError> {
        let sequence: Sequence = bb_idx
            .iter()
            .map(|i| {
                let name = record.get(*i).unwrap_or_default().trim();
                if name.is_empty() || name == null_element.name {
                    null_element.clone()
                } else {
                    BuildingBlock::new(name)
                }
            })
            .collect();
        let (time, intensity) = parse_datapoints(record.get(raw_idx).unwrap_or_default(), row)?;
        let chromatogram = Chromatogram::new(sequence, time, intensity)
            .map_err(|e| CliError::Picking(e.into()))?;
        Ok(LibraryMember {
            row,
            lid: lid.to_string(),
            chromatogram,
        })
    }
}

/// Chromatograms picked together, with the table row each one came from.
#[derive(Debug, Clone)]
pub struct Batch {
    pub lid: String,
    /// Aligned with `chromatograms`.
    pub rows: Vec<usize>,
    pub chromatograms: Vec<Chromatogram>,
}

impl Batch {
    fn from_members(lid: &str, members: &[&LibraryMember]) -> Self {
        Self {
            lid: lid.to_string(),
            rows: members.iter().map(|m| m.row).collect(),
            chromatograms: members.iter().map(|m| m.chromatogram.clone()).collect(),
        }
    }
}

fn by_lid(members: &[LibraryMember]) -> BTreeMap<&str, Vec<&LibraryMember>> {
    let mut out: BTreeMap<&str, Vec<&LibraryMember>> = BTreeMap::new();
    for m in members {
        out.entry(m.lid.as_str()).or_default().push(m);
    }
    out
}

/// One batch per library id, holding every member of it.
pub fn libraries(members: &[LibraryMember]) -> Vec<Batch> {
    by_lid(members)
        .into_iter()
        .map(|(lid, lid_members)| Batch::from_members(lid, &lid_members))
        .collect()
}

/// Groups members into hierarchy batches.
///
/// Batches never mix library ids. Inside a library the sequences that are
/// not covered by a larger one become bases, and each base collects every
/// sequence it covers. A member may end up in more than one batch. The base
/// is the first chromatogram of its batch.
///
/// Rows repeating a sequence are replicates. A family whose sequences occur
/// up to `r` times is emitted as `r` batches: batch `i` takes the `i`-th
/// replicate of every sequence, or the first one when a sequence has fewer.
pub fn families(members: &[LibraryMember], null_element: &BuildingBlock) -> Vec<Batch> {
    let helper = Hierarchy::new(null_element.clone());
    let mut out = Vec::new();
    for (lid, lid_members) in by_lid(members) {
        // Distinct sequences in input order, each with its replicates.
        let mut distinct: Vec<(&Sequence, Vec<&LibraryMember>)> = Vec::new();
        for m in lid_members {
            let seq = m.chromatogram.sequence();
            match distinct.iter_mut().find(|(s, _)| *s == seq) {
                Some((_, copies)) => copies.push(m),
                None => distinct.push((seq, vec![m])),
            }
        }
        // Stable, so ties keep their input order.
        distinct.sort_by_key(|(s, _)| std::cmp::Reverse(helper.level(s)));

        let mut assigned = vec![false; distinct.len()];
        for i in 0..distinct.len() {
            if assigned[i] {
                continue;
            }
            assigned[i] = true;
            let reachable = helper.all_descendants_preserving_order(distinct[i].0);
            let mut family = vec![i];
            for (j, (other, _)) in distinct.iter().enumerate() {
                if j != i && reachable.contains(*other) {
                    family.push(j);
                    assigned[j] = true;
                }
            }

            let replicates = family.iter().map(|d| distinct[*d].1.len()).max().unwrap_or(0);
            for r in 0..replicates {
                let picked: Vec<&LibraryMember> = family
                    .iter()
                    .map(|d| {
                        let copies = &distinct[*d].1;
                        copies[r.min(copies.len() - 1)]
                    })
                    .collect();
                out.push(Batch::from_members(lid, &picked));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "lid,BB1 Name,BB2 Name,all_datapoints\n";

    fn input_config() -> InputConfig {
        InputConfig {
            building_block_columns: vec!["BB1 Name".to_string(), "BB2 Name".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_datapoints() {
        let (t, y) = parse_datapoints("120:0:5.0, 60;1;2.5, 180:0:1", 0).unwrap();
        assert_eq!(t, vec![1.0, 2.0, 3.0]);
        assert_eq!(y, vec![2.5, 5.0, 1.0]);
    }

    #[test]
    fn test_parse_datapoints_rejects_short_entries() {
        let err = parse_datapoints("60:1, 120:0:3", 4).unwrap_err();
        assert!(matches!(err, CliError::Datapoint { row: 4, .. }));
    }

    #[test]
    fn test_read_table_maps_empty_to_null() {
        let data = format!(
            "{}L1,X,,\"60:0:1, 120:0:2, 180:0:1\"\nL1,X,Y,\"60:0:1, 120:0:3, 180:0:1\"\nL1,X,Y,bad\n",
            HEADER
        );
        let table =
            LibraryTable::from_reader(data.as_bytes(), &input_config(), &BuildingBlock::null()).unwrap();
        assert_eq!(table.records.len(), 3);
        assert_eq!(table.members.len(), 2);
        assert_eq!(
            table.members[0].chromatogram.sequence(),
            &Sequence::from_names(&["X", "Null"])
        );
    }

    #[test]
    fn test_missing_column() {
        let data = "lid,BB1 Name,all_datapoints\n";
        let err = LibraryTable::from_reader(data.as_bytes(), &input_config(), &BuildingBlock::null())
            .unwrap_err();
        assert!(matches!(err, CliError::MissingColumn { column } if column == "BB2 Name"));
    }

    #[test]
    fn test_lid_filter() {
        let data = format!(
            "{}L1,X,,\"60:0:1, 120:0:2\"\nL2,X,,\"60:0:1, 120:0:2\"\n",
            HEADER
        );
        let config = InputConfig {
            lid_to_process: Some("L2".to_string()),
            ..input_config()
        };
        let table = LibraryTable::from_reader(data.as_bytes(), &config, &BuildingBlock::null()).unwrap();
        assert_eq!(table.members.len(), 1);
        assert_eq!(table.members[0].lid, "L2");
    }

    fn member(row: usize, lid: &str, names: &[&str]) -> LibraryMember {
        LibraryMember {
            row,
            lid: lid.to_string(),
            chromatogram: Chromatogram::new(
                Sequence::from_names(names),
                vec![0.0, 1.0, 2.0],
                vec![1.0, 2.0, 1.0],
            )
            .unwrap(),
        }
    }

    #[test]
    fn test_families_split_by_base() {
        let members = vec![
            member(0, "L1", &["Null", "Null"]),
            member(1, "L1", &["X", "Null"]),
            member(2, "L1", &["X", "Y"]),
            member(3, "L1", &["Z", "Null"]),
            member(4, "L2", &["X", "Null"]),
        ];
        let fams = families(&members, &BuildingBlock::null());
        assert_eq!(fams.len(), 3);

        assert_eq!(fams[0].lid, "L1");
        assert_eq!(fams[0].chromatograms[0].sequence(), &Sequence::from_names(&["X", "Y"]));
        assert_eq!(fams[0].rows, vec![2, 1, 0]);

        assert_eq!(fams[1].rows, vec![3, 0]);
        assert_eq!(fams[1].chromatograms[0].sequence(), &Sequence::from_names(&["Z", "Null"]));
        assert_eq!(fams[2].lid, "L2");
    }

    #[test]
    fn test_replicates_get_their_own_batch() {
        let members = vec![
            member(0, "L1", &["X", "Null"]),
            member(1, "L1", &["X", "Null"]),
            member(2, "L1", &["Null", "Y"]),
            member(3, "L1", &["X", "Y"]),
        ];
        let fams = families(&members, &BuildingBlock::null());
        assert_eq!(fams.len(), 2);
        assert_eq!(fams[0].rows, vec![3, 0, 2]);
        // Sequences without a second replicate reuse their first row.
        assert_eq!(fams[1].rows, vec![3, 1, 2]);
        for batch in fams.iter() {
            let mut seqs: Vec<&Sequence> = batch.chromatograms.iter().map(|c| c.sequence()).collect();
            seqs.sort();
            seqs.dedup();
            assert_eq!(seqs.len(), batch.chromatograms.len());
        }
    }

    #[test]
    fn test_libraries_keep_every_row() {
        let members = vec![
            member(0, "L1", &["X", "Null"]),
            member(1, "L2", &["X", "Null"]),
            member(2, "L1", &["X", "Null"]),
        ];
        let libs = libraries(&members);
        assert_eq!(libs.len(), 2);
        assert_eq!(libs[0].rows, vec![0, 2]);
        assert_eq!(libs[1].rows, vec![1]);
    }
}
