use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use super::fractions::FractionBoundary;
use super::loader::{Delimiter, parse_number, read_rows, read_text};
use super::model::Series;
use super::variable::VariableKey;
use crate::error::ImportError;

// ---------------------------------------------------------------------------
// Signal families of a Unicorn export
// ---------------------------------------------------------------------------

/// Block header marking a cut/noise UV trace; dropped with its value column.
const CUT_MARKER: &str = "UV_CUT";

/// Position columns are named `ml.<block header>` once the header rows are merged.
const POSITION_PREFIX: &str = "ml.";

/// Label of the synthetic first boundary.
pub const START_LABEL: &str = "1";
/// Label of the synthetic last boundary.
pub const WASTE_LABEL: &str = "Waste";

/// One two-column block of the export.
#[derive(Debug, Clone, Copy)]
struct Family {
    key: VariableKey,
    block: &'static str,
    /// Negative samples are sensor artifacts for these signals.
    non_negative: bool,
}

const FAMILIES: [Family; 9] = [
    Family { key: VariableKey::Uv, block: "UV", non_negative: false },
    Family { key: VariableKey::Ph, block: "pH", non_negative: false },
    Family { key: VariableKey::Conductivity, block: "Cond", non_negative: true },
    Family { key: VariableKey::Gradient, block: "Conc B", non_negative: true },
    Family { key: VariableKey::Fraction, block: "Fraction", non_negative: false },
    Family { key: VariableKey::PreColumnPressure, block: "PreC pressure", non_negative: true },
    Family { key: VariableKey::SystemPressure, block: "System pressure", non_negative: true },
    Family { key: VariableKey::FlowRate, block: "System flow", non_negative: true },
    Family { key: VariableKey::Injection, block: "Injection", non_negative: true },
];

// ---------------------------------------------------------------------------
// Extraction report
// ---------------------------------------------------------------------------

/// Outcome of extracting one family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FamilyStatus {
    Extracted(usize),
    /// The expected columns are not in the file.
    Missing,
    /// Columns exist but no row survived coercion/filtering.
    Empty,
}

impl fmt::Display for FamilyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FamilyStatus::Extracted(n) => write!(f, "{n} points"),
            FamilyStatus::Missing => write!(f, "not found"),
            FamilyStatus::Empty => write!(f, "no usable rows"),
        }
    }
}

/// Per-family diagnostics; anything other than `Extracted` is a partial-extraction warning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionReport {
    pub entries: Vec<(VariableKey, FamilyStatus)>,
}

impl ExtractionReport {
    pub fn warnings(&self) -> impl Iterator<Item = &(VariableKey, FamilyStatus)> {
        self.entries
            .iter()
            .filter(|(_, s)| !matches!(s, FamilyStatus::Extracted(_)))
    }

    /// Short summary for the status bar.
    pub fn summary(&self) -> String {
        let missing: Vec<String> = self.warnings().map(|(k, _)| k.to_string()).collect();
        let found = self.entries.len() - missing.len();
        if missing.is_empty() {
            format!("{found} signals imported")
        } else {
            format!("{found} signals imported; not found: {}", missing.join(", "))
        }
    }
}

/// Result of a successful ÄKTA import.
#[derive(Debug, Clone)]
pub struct AktaImport {
    pub series: BTreeMap<VariableKey, Series>,
    pub fractions: Vec<FractionBoundary>,
    pub report: ExtractionReport,
}

// ---------------------------------------------------------------------------
// Column layout
// ---------------------------------------------------------------------------

/// Data rows with merged column names; `columns` keeps (name, source index)
/// in file order after cut blocks are removed.
struct AktaTable {
    columns: Vec<(String, usize)>,
    rows: Vec<Vec<String>>,
}

impl AktaTable {
    fn from_rows(mut rows: Vec<Vec<String>>) -> Result<Self, ImportError> {
        // Title line, block headers, units; data follows.
        if rows.len() < 3 {
            return Err(ImportError::NoExtractableData);
        }
        let data = rows.split_off(3);
        let units = rows.pop().unwrap_or_default();
        let blocks = rows.pop().unwrap_or_default();

        let width = data
            .iter()
            .map(Vec::len)
            .chain([units.len(), blocks.len()])
            .max()
            .unwrap_or(0);

        let mut dropped = vec![false; width];
        let mut columns = Vec::with_capacity(width);
        for i in 0..width {
            let block = blocks.get(i).map(String::as_str).unwrap_or("");
            if block.contains(CUT_MARKER) {
                dropped[i] = true;
                if i + 1 < width {
                    dropped[i + 1] = true;
                }
            }
            let name = if block.is_empty() {
                units.get(i).cloned().unwrap_or_default()
            } else {
                format!("{POSITION_PREFIX}{block}")
            };
            columns.push((name, i));
        }
        let columns = columns.into_iter().filter(|(_, i)| !dropped[*i]).collect();

        Ok(Self { columns, rows: data })
    }

    /// Source indices of the (position, value) columns of `block`.
    fn block_columns(&self, block: &str) -> Option<(usize, usize)> {
        let wanted = format!("{POSITION_PREFIX}{block}");
        let at = self.columns.iter().position(|(name, _)| *name == wanted)?;
        let value = self.columns.get(at + 1)?;
        Some((self.columns[at].1, value.1))
    }

    fn cells(&self, a: usize, b: usize) -> impl Iterator<Item = (&str, &str)> {
        self.rows.iter().map(move |row| {
            (
                row.get(a).map(String::as_str).unwrap_or(""),
                row.get(b).map(String::as_str).unwrap_or(""),
            )
        })
    }
}

// ---------------------------------------------------------------------------
// Per-family extraction
// ---------------------------------------------------------------------------

fn extract_numeric(table: &AktaTable, family: Family) -> (Option<Series>, FamilyStatus) {
    let Some((pos_col, val_col)) = table.block_columns(family.block) else {
        return (None, FamilyStatus::Missing);
    };
    let pairs: Vec<(f64, f64)> = table
        .cells(pos_col, val_col)
        .filter_map(|(p, v)| Some((parse_number(p)?, parse_number(v)?)))
        .filter(|&(p, v)| !family.non_negative || (p >= 0.0 && v >= 0.0))
        .collect();
    if pairs.is_empty() {
        return (None, FamilyStatus::Empty);
    }
    let n = pairs.len();
    (Some(Series::from_pairs(pairs)), FamilyStatus::Extracted(n))
}

fn extract_fractions(
    table: &AktaTable,
    family: Family,
    uv: Option<&Series>,
) -> (Vec<FractionBoundary>, FamilyStatus) {
    let Some((pos_col, label_col)) = table.block_columns(family.block) else {
        return (Vec::new(), FamilyStatus::Missing);
    };
    let mut boundaries: Vec<FractionBoundary> = table
        .cells(pos_col, label_col)
        .filter(|(_, label)| !label.is_empty())
        .filter_map(|(p, label)| Some(FractionBoundary::new(parse_number(p)?, label)))
        .collect();
    if boundaries.is_empty() {
        return (boundaries, FamilyStatus::Empty);
    }
    let n = boundaries.len();
    bracket_fractions(&mut boundaries, uv);
    (boundaries, FamilyStatus::Extracted(n))
}

/// Add the synthetic start boundary at 0 and the waste boundary at the end of
/// the UV trace, then sort by position. Without UV the list is only sorted.
pub fn bracket_fractions(boundaries: &mut Vec<FractionBoundary>, uv: Option<&Series>) {
    if let Some(end) = uv.and_then(Series::max_position) {
        boundaries.insert(0, FractionBoundary::new(0.0, START_LABEL));
        boundaries.push(FractionBoundary::new(end, WASTE_LABEL));
    }
    boundaries.sort_by(|a, b| a.position.total_cmp(&b.position));
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Importer for tab-delimited Unicorn exports.
#[derive(Debug, Default, Clone, Copy)]
pub struct AktaImporter;

impl AktaImporter {
    pub fn import(&self, path: &Path) -> Result<AktaImport, ImportError> {
        let text = read_text(path)?;
        let import = self.parse(&text)?;
        log::info!("ÄKTA import of {}: {}", path.display(), import.report.summary());
        Ok(import)
    }

    pub fn parse(&self, text: &str) -> Result<AktaImport, ImportError> {
        let table = AktaTable::from_rows(read_rows(text, Delimiter::Tab)?)?;

        let mut series = BTreeMap::new();
        let mut report = ExtractionReport::default();
        let mut fraction_family = None;

        for family in FAMILIES {
            if family.key.is_fraction() {
                fraction_family = Some(family);
                continue;
            }
            let (extracted, status) = extract_numeric(&table, family);
            if !matches!(status, FamilyStatus::Extracted(_)) {
                log::warn!("{} data not found ({status})", family.key);
            }
            report.entries.push((family.key, status));
            if let Some(s) = extracted {
                series.insert(family.key, s);
            }
        }

        let mut fractions = Vec::new();
        if let Some(family) = fraction_family {
            let (boundaries, status) =
                extract_fractions(&table, family, series.get(&VariableKey::Uv));
            if !matches!(status, FamilyStatus::Extracted(_)) {
                log::warn!("{} data not found ({status})", family.key);
            }
            report.entries.push((family.key, status));
            fractions = boundaries;
        }

        if series.is_empty() && fractions.is_empty() {
            return Err(ImportError::NoExtractableData);
        }
        Ok(AktaImport {
            series,
            fractions,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(report: &ExtractionReport, key: VariableKey) -> Option<FamilyStatus> {
        report.entries.iter().find(|(k, _)| *k == key).map(|(_, s)| *s)
    }

    /// Builds an export with the given blocks; each block is (header, unit, rows).
    fn export(blocks: &[(&str, &str, &[(&str, &str)])]) -> String {
        let mut lines = vec!["Chrom.1 run".to_string()];
        let headers: Vec<String> = blocks
            .iter()
            .flat_map(|(h, _, _)| [h.to_string(), String::new()])
            .collect();
        let units: Vec<String> = blocks
            .iter()
            .flat_map(|(_, u, _)| ["ml".to_string(), u.to_string()])
            .collect();
        lines.push(headers.join("\t"));
        lines.push(units.join("\t"));
        let depth = blocks.iter().map(|(_, _, r)| r.len()).max().unwrap_or(0);
        for i in 0..depth {
            let row: Vec<String> = blocks
                .iter()
                .flat_map(|(_, _, rows)| match rows.get(i) {
                    Some((a, b)) => [a.to_string(), b.to_string()],
                    None => [String::new(), String::new()],
                })
                .collect();
            lines.push(row.join("\t"));
        }
        lines.join("\n")
    }

    #[test]
    fn test_partial_file_yields_present_families_only() {
        let text = export(&[
            ("UV", "mAU", &[("0.0", "1.0"), ("1.0", "5.0"), ("2.5", "2.0")]),
            ("pH", "pH", &[("0.0", "7.0"), ("2.0", "7.2")]),
            ("Fraction", "Fraction", &[("0.5", "A1"), ("1.5", "A2")]),
        ]);
        let import = AktaImporter.parse(&text).unwrap();

        let keys: Vec<VariableKey> = import.series.keys().copied().collect();
        assert_eq!(keys, vec![VariableKey::Uv, VariableKey::Ph]);
        assert_eq!(status(&import.report, VariableKey::Fraction), Some(FamilyStatus::Extracted(2)));
        for key in [
            VariableKey::Conductivity,
            VariableKey::Gradient,
            VariableKey::PreColumnPressure,
            VariableKey::SystemPressure,
            VariableKey::FlowRate,
            VariableKey::Injection,
        ] {
            assert!(!import.series.contains_key(&key));
            assert_eq!(status(&import.report, key), Some(FamilyStatus::Missing));
        }

        let labels: Vec<&str> = import.fractions.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["1", "A1", "A2", "Waste"]);
        assert_eq!(import.fractions[0].position, 0.0);
        assert_eq!(import.fractions[3].position, 2.5);
    }

    #[test]
    fn test_non_negative_families_drop_artifacts() {
        let text = export(&[
            ("UV", "mAU", &[("0.0", "-3.0"), ("1.0", "4.0")]),
            ("Cond", "mS/cm", &[("0.0", "-0.1"), ("1.0", "12.0"), ("x", "13.0")]),
        ]);
        let import = AktaImporter.parse(&text).unwrap();
        assert_eq!(import.series[&VariableKey::Uv].value, vec![-3.0, 4.0]);
        assert_eq!(import.series[&VariableKey::Conductivity].value, vec![12.0]);
    }

    #[test]
    fn test_cut_block_is_dropped_with_its_value_column() {
        let text = export(&[
            ("UV_CUT_TEMP", "mAU", &[("0.0", "99.0")]),
            ("UV", "mAU", &[("0.0", "1.0"), ("1.0", "2.0")]),
        ]);
        let import = AktaImporter.parse(&text).unwrap();
        assert_eq!(import.series[&VariableKey::Uv].value, vec![1.0, 2.0]);
    }

    #[test]
    fn test_value_column_follows_position_column() {
        let text = export(&[
            ("Conc B", "%B", &[("0.0", "0.0"), ("5.0", "50.0")]),
            ("System pressure", "MPa", &[("0.0", "0.3")]),
        ]);
        let import = AktaImporter.parse(&text).unwrap();
        assert_eq!(import.series[&VariableKey::Gradient].value, vec![0.0, 50.0]);
        assert_eq!(import.series[&VariableKey::SystemPressure].value, vec![0.3]);
    }

    #[test]
    fn test_fractions_without_uv_are_not_bracketed() {
        let text = export(&[("Fraction", "Fraction", &[("3.0", "B2"), ("1.0", "B1")])]);
        let import = AktaImporter.parse(&text).unwrap();
        assert!(import.series.is_empty());
        let labels: Vec<&str> = import.fractions.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["B1", "B2"]);
    }

    #[test]
    fn test_unrecognised_file_is_an_error() {
        let text = export(&[("Temp", "C", &[("0.0", "20.0")])]);
        assert!(matches!(
            AktaImporter.parse(&text),
            Err(ImportError::NoExtractableData)
        ));
        assert!(matches!(
            AktaImporter.parse("only a title"),
            Err(ImportError::NoExtractableData)
        ));
    }

    #[test]
    fn test_import_reads_utf16_file() {
        let text = export(&[("UV", "mAU", &[("0.0", "1.0"), ("1.0", "2.0")])]);
        let mut bytes = vec![0xFF, 0xFE];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.txt");
        std::fs::write(&path, bytes).unwrap();

        let import = AktaImporter.import(&path).unwrap();
        assert_eq!(import.series[&VariableKey::Uv].len(), 2);
    }
}
