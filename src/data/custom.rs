use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::fractions::FractionBoundary;
use super::loader::{Delimiter, Table, parse_number, read_rows, read_text};
use super::model::Series;
use super::variable::{VariableKey, VariableRegistry};
use crate::error::{ImportError, MappingError};

// ---------------------------------------------------------------------------
// Parsing options and the two views of the file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParseOptions {
    pub delimiter: Delimiter,
    /// Row promoted to column names; rows above it are skipped.
    pub header_row: usize,
}

/// The file read twice: raw (no header) for preview, headered for mapping.
#[derive(Debug, Clone, Default)]
pub struct CustomTables {
    pub raw: Table,
    pub headered: Table,
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

/// Columns chosen for one non-fraction slot. Columns are referenced by index.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SlotBinding {
    pub display_name: String,
    pub value_column: Option<usize>,
    pub position_column: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FractionBinding {
    pub position_column: Option<usize>,
    pub label_column: Option<usize>,
}

/// Complete mapping of table columns to variable slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub slots: BTreeMap<VariableKey, SlotBinding>,
    #[serde(default)]
    pub fraction: FractionBinding,
}

impl ColumnMapping {
    /// Every non-fraction slot unmapped, named after the current registry.
    pub fn unmapped(registry: &VariableRegistry) -> Self {
        let slots = VariableKey::ALL
            .into_iter()
            .filter(|k| !k.is_fraction())
            .map(|k| {
                (
                    k,
                    SlotBinding {
                        display_name: registry.name(k).to_string(),
                        ..Default::default()
                    },
                )
            })
            .collect();
        Self {
            slots,
            fraction: FractionBinding::default(),
        }
    }

    /// Check the mapping against a table of `width` columns.
    pub fn validate(&self, width: usize) -> Result<(), MappingError> {
        let mut seen = BTreeSet::new();
        for binding in self.active_slots().map(|(_, b)| b) {
            let name = binding.display_name.trim().to_string();
            if binding.position_column.is_none() {
                return Err(MappingError::MissingPositionColumn { name });
            }
            for column in [binding.value_column, binding.position_column]
                .into_iter()
                .flatten()
            {
                if column >= width {
                    return Err(MappingError::ColumnOutOfRange { name, column, width });
                }
            }
            if !seen.insert(name.clone()) {
                return Err(MappingError::DuplicateName { name });
            }
        }
        if let FractionBinding {
            position_column: Some(p),
            label_column: Some(l),
        } = self.fraction
        {
            if let Some(&column) = [p, l].iter().find(|&&c| c >= width) {
                return Err(MappingError::ColumnOutOfRange {
                    name: VariableKey::Fraction.to_string(),
                    column,
                    width,
                });
            }
        }
        Ok(())
    }

    /// Slots with a value column and a non-blank display name.
    pub fn active_slots(&self) -> impl Iterator<Item = (VariableKey, &SlotBinding)> {
        self.slots
            .iter()
            .filter(|(k, b)| {
                !k.is_fraction() && b.value_column.is_some() && !b.display_name.trim().is_empty()
            })
            .map(|(k, b)| (*k, b))
    }
}

// ---------------------------------------------------------------------------
// Import profiles
// ---------------------------------------------------------------------------

/// Named, reusable parsing options and mapping. Keyed by stable slot
/// identity, so a profile survives later display-name changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportProfile {
    pub parsing: ParseOptions,
    pub mapping: ColumnMapping,
}

/// All saved profiles by name (sorted).
pub type ProfileStore = BTreeMap<String, ImportProfile>;

// ---------------------------------------------------------------------------
// Importer
// ---------------------------------------------------------------------------

/// Result of a custom import: series, fractions, and the names the user chose.
#[derive(Debug, Clone, Default)]
pub struct CustomImport {
    pub series: BTreeMap<VariableKey, Series>,
    pub fractions: Vec<FractionBoundary>,
    pub display_names: BTreeMap<VariableKey, String>,
}

#[derive(Debug, Clone, Default)]
pub struct CustomImporter {
    pub options: ParseOptions,
}

impl CustomImporter {
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }

    /// Read the file and build both table views.
    pub fn load(&self, path: &Path) -> Result<CustomTables, ImportError> {
        let text = read_text(path)?;
        self.tables(&text)
    }

    pub fn tables(&self, text: &str) -> Result<CustomTables, ImportError> {
        let rows = read_rows(text, self.options.delimiter)?;
        if rows.is_empty() {
            return Err(ImportError::EmptyFile);
        }
        let headered = Table::with_header(rows.clone(), self.options.header_row)?;
        Ok(CustomTables {
            raw: Table::unheadered(rows),
            headered,
        })
    }

    /// Apply `mapping` to the headered table.
    pub fn extract(&self, table: &Table, mapping: &ColumnMapping) -> Result<CustomImport, ImportError> {
        mapping.validate(table.width())?;

        let mut import = CustomImport::default();
        for (key, binding) in mapping.active_slots() {
            let (Some(value_col), Some(pos_col)) = (binding.value_column, binding.position_column)
            else {
                continue;
            };
            let pairs: Vec<(f64, f64)> = table
                .column_pairs(pos_col, value_col)
                .filter_map(|(p, v)| Some((parse_number(p)?, parse_number(v)?)))
                .collect();
            if pairs.is_empty() {
                log::warn!("'{}' has no numeric rows", binding.display_name);
                continue;
            }
            import.series.insert(key, Series::from_pairs(pairs));
            import
                .display_names
                .insert(key, binding.display_name.trim().to_string());
        }

        if let FractionBinding {
            position_column: Some(pos_col),
            label_column: Some(label_col),
        } = mapping.fraction
        {
            let mut boundaries: Vec<FractionBoundary> = table
                .column_pairs(pos_col, label_col)
                .filter(|(_, label)| !label.is_empty())
                .filter_map(|(p, label)| Some(FractionBoundary::new(parse_number(p)?, label)))
                .collect();
            boundaries.sort_by(|a, b| a.position.total_cmp(&b.position));
            import.fractions = boundaries;
        }

        if import.series.is_empty() && import.fractions.is_empty() {
            return Err(ImportError::NoExtractableData);
        }
        Ok(import)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comma_importer() -> CustomImporter {
        CustomImporter::new(ParseOptions {
            delimiter: Delimiter::Comma,
            header_row: 0,
        })
    }

    fn uv_mapping(value: usize, position: Option<usize>) -> ColumnMapping {
        let mut mapping = ColumnMapping::unmapped(&VariableRegistry::default());
        let slot = mapping.slots.get_mut(&VariableKey::Uv).unwrap();
        slot.display_name = "Absorbance".into();
        slot.value_column = Some(value);
        slot.position_column = position;
        mapping
    }

    #[test]
    fn test_single_series_from_comma_file() {
        let importer = comma_importer();
        let tables = importer
            .tables("position,value,noise\n0,10,5\n1,12,5\n2,9,5")
            .unwrap();
        assert_eq!(tables.raw.rows.len(), 4);
        assert_eq!(tables.headered.headers, vec!["position", "value", "noise"]);

        let import = importer.extract(&tables.headered, &uv_mapping(1, Some(0))).unwrap();
        assert_eq!(import.series.len(), 1);
        let uv = &import.series[&VariableKey::Uv];
        assert_eq!(uv.points().collect::<Vec<_>>(), vec![[0.0, 10.0], [1.0, 12.0], [2.0, 9.0]]);
        assert_eq!(import.display_names[&VariableKey::Uv], "Absorbance");
    }

    #[test]
    fn test_missing_position_column_is_a_configuration_error() {
        let importer = comma_importer();
        let tables = importer.tables("x,y\n0,1\n").unwrap();
        let err = importer.extract(&tables.headered, &uv_mapping(1, None)).unwrap_err();
        assert!(matches!(
            err,
            ImportError::Mapping(MappingError::MissingPositionColumn { ref name }) if name == "Absorbance"
        ));
    }

    #[test]
    fn test_out_of_range_and_duplicate_names() {
        let importer = comma_importer();
        let tables = importer.tables("x,y\n0,1\n").unwrap();
        let err = importer.extract(&tables.headered, &uv_mapping(5, Some(0))).unwrap_err();
        assert!(matches!(err, ImportError::Mapping(MappingError::ColumnOutOfRange { column: 5, .. })));

        let mut mapping = uv_mapping(1, Some(0));
        let ph = mapping.slots.get_mut(&VariableKey::Ph).unwrap();
        ph.display_name = "Absorbance".into();
        ph.value_column = Some(1);
        ph.position_column = Some(0);
        assert_eq!(
            mapping.validate(2),
            Err(MappingError::DuplicateName { name: "Absorbance".into() })
        );
    }

    #[test]
    fn test_unsorted_rows_and_bad_cells() {
        let importer = CustomImporter::new(ParseOptions {
            delimiter: Delimiter::Whitespace,
            header_row: 1,
        });
        let text = "exported by foo\nvol  uv   frac\n2.0  9.0  F2\n0.0  n/a  F1\n1.0  12.0 F1b\n";
        let tables = importer.tables(text).unwrap();
        let mut mapping = uv_mapping(1, Some(0));
        mapping.fraction = FractionBinding {
            position_column: Some(0),
            label_column: Some(2),
        };
        let import = importer.extract(&tables.headered, &mapping).unwrap();
        assert_eq!(import.series[&VariableKey::Uv].position, vec![1.0, 2.0]);
        let labels: Vec<&str> = import.fractions.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["F1", "F1b", "F2"]);
    }

    #[test]
    fn test_nothing_mapped_is_empty_result() {
        let importer = comma_importer();
        let tables = importer.tables("x,y\n0,1\n").unwrap();
        let mapping = ColumnMapping::unmapped(&VariableRegistry::default());
        assert!(matches!(
            importer.extract(&tables.headered, &mapping),
            Err(ImportError::NoExtractableData)
        ));
    }

    #[test]
    fn test_profile_survives_rename() {
        let mut registry = VariableRegistry::default();
        let profile = ImportProfile {
            parsing: ParseOptions::default(),
            mapping: uv_mapping(1, Some(0)),
        };
        let json = serde_json::to_string(&profile).unwrap();
        registry
            .rename_all(&[(VariableKey::Uv, "A280".to_string())], &[])
            .unwrap();

        let restored: ImportProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, profile);
        let (key, _) = restored.mapping.active_slots().next().unwrap();
        assert_eq!(key, VariableKey::Uv);
        assert_eq!(registry.name(key), "A280");
    }
}
