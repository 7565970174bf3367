use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::fractions::{FractionBoundary, FractionMapper};
use super::model::{ChromatogramDataset, PlotSelection, Series};
use super::variable::{VariableKey, VariableRegistry};

// ---------------------------------------------------------------------------
// Session file
// ---------------------------------------------------------------------------

/// Saved analysis state. Variables are stored under their display names so the
/// file is readable. `keys` ties each of those names to its stable slot, so a
/// load resolves by slot and brings the saved names back; files without it
/// are resolved by name through the registry.
///
/// ```json
/// {
///   "source_file": "run42.txt",
///   "keys": { "A280": "Uv", "Fraction": "Fraction" },
///   "tables": { "A280": [[0.0, 1.2], [0.1, 1.3]] },
///   "fractions": [{ "position": 0.0, "label": "1", "original_label": "1" }],
///   "plotted": ["A280", "Fraction"],
///   "zoom": [0.0, 25.0],
///   "primary": "A280"
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(default)]
    pub source_file: Option<PathBuf>,
    /// Display name at save time → stable slot.
    #[serde(default)]
    pub keys: BTreeMap<String, VariableKey>,
    /// Baseline (pre-offset) series, in position order.
    pub tables: BTreeMap<String, Vec<[f64; 2]>>,
    #[serde(default)]
    pub fractions: Vec<FractionBoundary>,
    #[serde(default)]
    pub plotted: Vec<String>,
    #[serde(default)]
    pub zoom: Option<[f64; 2]>,
    #[serde(default)]
    pub primary: Option<String>,
}

/// Everything a session load hands back to the application state.
#[derive(Debug, Clone)]
pub struct RestoredSession {
    pub source_file: Option<PathBuf>,
    pub dataset: ChromatogramDataset,
    pub selection: PlotSelection,
    pub fraction_display: bool,
    pub zoom: Option<[f64; 2]>,
    pub primary: Option<VariableKey>,
    /// Display names the session was saved with.
    pub names: Vec<(VariableKey, String)>,
}

/// Inputs for [`SessionRecord::capture`].
pub struct SessionView<'a> {
    pub source_file: Option<&'a Path>,
    pub dataset: &'a ChromatogramDataset,
    pub registry: &'a VariableRegistry,
    pub selection: &'a PlotSelection,
    pub fraction_display: bool,
    pub zoom: Option<[f64; 2]>,
    pub primary: Option<VariableKey>,
}

impl SessionRecord {
    pub fn capture(view: &SessionView<'_>) -> Self {
        let names = view.registry;
        let tables = view
            .dataset
            .originals()
            .iter()
            .map(|(k, s)| (names.name(*k).to_string(), s.points().collect()))
            .collect();
        let keys = VariableKey::ALL
            .into_iter()
            .filter(|k| view.dataset.contains(*k))
            .map(|k| (names.name(k).to_string(), k))
            .collect();
        let mut plotted: Vec<String> = view
            .selection
            .keys()
            .iter()
            .map(|k| names.name(*k).to_string())
            .collect();
        if view.fraction_display {
            plotted.push(names.name(VariableKey::Fraction).to_string());
        }
        Self {
            source_file: view.source_file.map(Path::to_path_buf),
            keys,
            tables,
            fractions: view.dataset.fractions.boundaries().to_vec(),
            plotted,
            zoom: view.zoom,
            primary: view.primary.map(|k| names.name(k).to_string()),
        }
    }

    fn resolve(&self, name: &str, registry: &VariableRegistry) -> Option<VariableKey> {
        self.keys
            .get(name)
            .copied()
            .or_else(|| registry.key_for_name(name))
    }

    /// Rebuild the dataset and selection. Names that resolve to no slot are skipped.
    pub fn restore(&self, registry: &VariableRegistry) -> RestoredSession {
        let mut series = BTreeMap::new();
        for (name, points) in &self.tables {
            match self.resolve(name, registry) {
                Some(key) if !key.is_fraction() => {
                    let pairs = points.iter().map(|[x, y]| (*x, *y)).collect();
                    series.insert(key, Series::from_pairs(pairs));
                }
                _ => log::warn!("session variable '{name}' does not match any variable"),
            }
        }
        let dataset =
            ChromatogramDataset::new(series, FractionMapper::from_boundaries(self.fractions.clone()));

        let mut selection = PlotSelection::default();
        let mut fraction_display = false;
        for name in &self.plotted {
            match self.resolve(name, registry) {
                Some(VariableKey::Fraction) => fraction_display = !dataset.fractions.is_empty(),
                Some(key) if dataset.contains(key) => {
                    if !selection.set(key, true) {
                        log::warn!("session plots more than {} variables; '{name}' skipped", PlotSelection::MAX_AXES);
                    }
                }
                _ => log::warn!("plotted variable '{name}' is not in the session data"),
            }
        }

        let primary = self
            .primary
            .as_deref()
            .and_then(|n| self.resolve(n, registry))
            .filter(|k| dataset.contains(*k) && !k.is_fraction());

        let names = self
            .keys
            .iter()
            .filter(|(_, key)| dataset.contains(**key))
            .map(|(name, key)| (*key, name.clone()))
            .collect();

        RestoredSession {
            source_file: self.source_file.clone(),
            dataset,
            selection,
            fraction_display,
            zoom: self.zoom.filter(|[lo, hi]| lo < hi),
            primary,
            names,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("serializing session")?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&text).context("parsing session JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dataset() -> ChromatogramDataset {
        let mut map = BTreeMap::new();
        map.insert(
            VariableKey::Uv,
            Series::from_pairs(vec![(0.0, -2.0), (1.0, 10.0), (2.0, 4.0)]),
        );
        map.insert(VariableKey::Ph, Series::from_pairs(vec![(0.0, 7.0), (2.0, 7.4)]));
        let fractions = FractionMapper::from_boundaries(vec![
            FractionBoundary::new(0.0, "1"),
            FractionBoundary::new(2.0, "Waste"),
        ]);
        ChromatogramDataset::new(map, fractions)
    }

    #[test]
    fn test_save_load_round_trip() {
        let mut registry = VariableRegistry::default();
        registry
            .rename_all(&[(VariableKey::Uv, "A280".to_string())], &[])
            .unwrap();

        let mut dataset = sample_dataset();
        dataset.apply_primary_offset(Some(VariableKey::Uv), true);
        let mut selection = PlotSelection::default();
        selection.set(VariableKey::Ph, true);
        selection.set(VariableKey::Uv, true);

        let record = SessionRecord::capture(&SessionView {
            source_file: Some(Path::new("run.txt")),
            dataset: &dataset,
            registry: &registry,
            selection: &selection,
            fraction_display: true,
            zoom: Some([0.5, 1.5]),
            primary: Some(VariableKey::Uv),
        });
        // Baselines are stored, not the offset copy.
        assert_eq!(record.tables["A280"][0], [0.0, -2.0]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        record.save(&path).unwrap();
        let loaded = SessionRecord::load(&path).unwrap();
        assert_eq!(loaded, record);

        let restored = loaded.restore(&registry);
        assert_eq!(restored.selection.keys(), &[VariableKey::Ph, VariableKey::Uv]);
        assert!(restored.fraction_display);
        assert_eq!(restored.zoom, Some([0.5, 1.5]));
        assert_eq!(restored.primary, Some(VariableKey::Uv));
        assert_eq!(
            restored.dataset.get(VariableKey::Uv),
            dataset.originals().get(&VariableKey::Uv)
        );
        assert_eq!(restored.dataset.fractions.len(), 2);
    }

    #[test]
    fn test_unknown_names_are_skipped() {
        let record = SessionRecord {
            tables: BTreeMap::from([
                ("Mystery".to_string(), vec![[0.0, 1.0]]),
                ("pH".to_string(), vec![[0.0, 7.0]]),
            ]),
            plotted: vec!["Mystery".into(), "pH".into()],
            zoom: Some([3.0, 1.0]),
            ..Default::default()
        };
        let restored = record.restore(&VariableRegistry::default());
        assert_eq!(restored.dataset.keys().collect::<Vec<_>>(), vec![VariableKey::Ph]);
        assert_eq!(restored.selection.keys(), &[VariableKey::Ph]);
        assert_eq!(restored.zoom, None);
    }

    #[test]
    fn test_restore_by_key_brings_saved_names_back() {
        let mut renamed = VariableRegistry::default();
        renamed
            .rename_all(
                &[
                    (VariableKey::Uv, "A280".to_string()),
                    (VariableKey::Ph, "Acidity".to_string()),
                ],
                &[],
            )
            .unwrap();
        let dataset = sample_dataset();
        let mut selection = PlotSelection::default();
        selection.set(VariableKey::Uv, true);
        let record = SessionRecord::capture(&SessionView {
            source_file: None,
            dataset: &dataset,
            registry: &renamed,
            selection: &selection,
            fraction_display: true,
            zoom: None,
            primary: Some(VariableKey::Uv),
        });
        assert_eq!(record.keys["A280"], VariableKey::Uv);

        // A fresh application only knows the default names.
        let restored = record.restore(&VariableRegistry::default());
        assert_eq!(
            restored.dataset.keys().collect::<Vec<_>>(),
            vec![VariableKey::Uv, VariableKey::Ph]
        );
        assert_eq!(restored.selection.keys(), &[VariableKey::Uv]);
        assert!(restored.fraction_display);
        assert_eq!(restored.primary, Some(VariableKey::Uv));
        assert!(restored.names.contains(&(VariableKey::Uv, "A280".to_string())));
        assert!(restored.names.contains(&(VariableKey::Ph, "Acidity".to_string())));

        let mut registry = VariableRegistry::default();
        registry.rename_all(&restored.names, &VariableKey::ALL).unwrap();
        assert_eq!(registry, renamed);
    }
}
