use std::fmt::Display;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::analysis::integration::{Integration, IntegrationAnalyzer};
use crate::analysis::plot::{Figure, PlotEngine, PlotRequest};
use crate::analysis::range::RangeController;
use crate::config::{AppConfig, Settings};
use crate::data::akta::{AktaImporter, ExtractionReport};
use crate::data::custom::CustomImport;
use crate::data::fractions::{FractionBoundary, FractionMapper};
use crate::data::model::{ChromatogramDataset, PlotSelection};
use crate::data::session::{SessionRecord, SessionView};
use crate::data::variable::VariableKey;
use crate::error::{AnalysisError, ImportError, PlotError, RenameError};
use crate::slots::{SlotEvent, SlotTable};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub settings_path: PathBuf,
    pub settings: Settings,
    /// Typed view of `settings.plot_options`, plus in-session renames.
    pub config: AppConfig,

    /// Loaded dataset (None until user loads a file or session).
    pub dataset: Option<ChromatogramDataset>,
    pub source_file: Option<PathBuf>,

    pub slots: SlotTable,
    pub selection: PlotSelection,
    pub primary: Option<VariableKey>,
    pub fraction_display: bool,
    pub ranges: RangeController,

    /// Zoom restored from a session, applied at the first plot.
    pending_zoom: Option<[f64; 2]>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(settings_path: PathBuf) -> Self {
        let settings = Settings::load_or_default(&settings_path);
        let config = settings.config();
        Self {
            settings_path,
            settings,
            config,
            dataset: None,
            source_file: None,
            slots: SlotTable::default(),
            selection: PlotSelection::default(),
            primary: None,
            fraction_display: false,
            ranges: RangeController::default(),
            pending_zoom: None,
            status_message: None,
        }
    }

    /// Log `err` and show it in the status bar.
    pub fn fail(&mut self, what: &str, err: impl Display) {
        log::error!("{what}: {err}");
        self.status_message = Some(format!("{what}: {err}"));
    }

    fn info(&mut self, msg: String) {
        log::info!("{msg}");
        self.status_message = Some(msg);
    }

    // ---- Import ----

    /// Replace the dataset wholesale. Nothing is plotted; UV is primary if present.
    pub fn set_dataset(&mut self, mut dataset: ChromatogramDataset, source_file: Option<PathBuf>) {
        self.selection.clear();
        self.fraction_display = false;
        self.primary = dataset.default_primary();
        self.ranges.reset_for_import();
        self.pending_zoom = None;
        dataset.apply_primary_offset(self.primary, self.config.offset_primary);
        self.dataset = Some(dataset);
        self.source_file = source_file;
        self.sync_slots();
    }

    pub fn import_akta(&mut self, path: &Path) -> Result<ExtractionReport, ImportError> {
        let import = AktaImporter.import(path)?;
        let dataset = ChromatogramDataset::new(
            import.series,
            FractionMapper::from_boundaries(import.fractions),
        );
        if dataset.is_empty() {
            return Err(ImportError::NoExtractableData);
        }
        self.set_dataset(dataset, Some(path.to_path_buf()));
        self.info(format!("Loaded {}: {}", file_name(path), import.report.summary()));
        Ok(import.report)
    }

    /// Take a finished custom import. Display names chosen in the wizard are
    /// applied through the registry; if any is rejected nothing changes.
    pub fn import_custom(&mut self, import: CustomImport, path: Option<&Path>) -> Result<(), RenameError> {
        let mut active: Vec<VariableKey> = import.series.keys().copied().collect();
        if !import.fractions.is_empty() {
            active.push(VariableKey::Fraction);
        }
        let renames: Vec<(VariableKey, String)> = import
            .display_names
            .iter()
            .map(|(&key, name)| (key, name.clone()))
            .collect();
        self.apply_renames(&renames, &active)?;

        let count = import.series.len();
        let dataset = ChromatogramDataset::new(
            import.series,
            FractionMapper::from_boundaries(import.fractions),
        );
        self.set_dataset(dataset, path.map(Path::to_path_buf));
        let name = path.map_or_else(|| "custom data".to_string(), file_name);
        self.info(format!("Imported {count} variables from {name}"));
        Ok(())
    }

    // ---- Variables and selection ----

    /// Rename variables in one step; only slots holding data keep a claim on
    /// their names.
    pub fn rename(&mut self, renames: &[(VariableKey, String)]) -> Result<(), RenameError> {
        let active: Vec<VariableKey> = match &self.dataset {
            Some(ds) => VariableKey::ALL.into_iter().filter(|k| ds.contains(*k)).collect(),
            None => Vec::new(),
        };
        self.apply_renames(renames, &active)
    }

    fn apply_renames(&mut self, renames: &[(VariableKey, String)], active: &[VariableKey]) -> Result<(), RenameError> {
        for key in self.config.registry.rename_all(renames, active)? {
            self.slots.renamed(key, self.config.registry.name(key));
        }
        Ok(())
    }

    pub fn retarget_units(&mut self, key: VariableKey, new_unit: &str) {
        self.config.registry.retarget_units(key, new_unit);
    }

    /// Check or uncheck a variable. The fraction slot toggles fraction display.
    /// Returns `false` if the change was refused.
    pub fn toggle_plot(&mut self, key: VariableKey, plotted: bool) -> bool {
        let Some(dataset) = &self.dataset else {
            return false;
        };
        if plotted && !dataset.contains(key) {
            return false;
        }
        if key.is_fraction() {
            self.fraction_display = plotted;
        } else if !self.selection.set(key, plotted) {
            let msg = format!("Cannot plot more than {} plots at a time", PlotSelection::MAX_AXES);
            log::warn!("{msg}");
            self.status_message = Some(msg);
            return false;
        }
        self.sync_slots();
        true
    }

    pub fn set_primary(&mut self, primary: Option<VariableKey>) {
        self.primary = primary.filter(|k| !k.is_fraction());
        self.reapply_offset();
    }

    fn reapply_offset(&mut self) {
        if let Some(ds) = &mut self.dataset {
            if let Some(shift) = ds.apply_primary_offset(self.primary, self.config.offset_primary) {
                log::debug!("primary lifted by {shift}");
            }
        }
    }

    fn sync_slots(&mut self) {
        self.slots
            .sync(self.dataset.as_ref(), &self.selection, self.fraction_display);
    }

    /// Drain queued slot changes; called once per frame.
    pub fn drain_slot_events(&mut self) -> Vec<SlotEvent> {
        let events = self.slots.take_events();
        for event in &events {
            log::debug!("slot event: {event:?}");
        }
        events
    }

    // ---- Fractions ----

    /// Accept the fraction editor's list.
    pub fn replace_fractions(&mut self, boundaries: Vec<FractionBoundary>) {
        let count = boundaries.len();
        let Some(dataset) = self.dataset.as_mut() else {
            return;
        };
        dataset.fractions.replace(boundaries);
        if dataset.fractions.is_empty() {
            self.fraction_display = false;
        }
        self.ranges.invalidate_index_bounds();
        self.sync_slots();
        self.info(format!("{count} fraction labels applied"));
    }

    // ---- Configuration ----

    /// Apply a plot-options edit atomically and persist it. Name changes go
    /// through the registry so they stay unique.
    pub fn apply_config(&mut self, new: AppConfig) -> Result<()> {
        let renames: Vec<(VariableKey, String)> = VariableKey::ALL
            .into_iter()
            .filter(|k| new.registry.name(*k) != self.config.registry.name(*k))
            .map(|k| (k, new.registry.name(k).to_string()))
            .collect();
        self.rename(&renames).context("renaming variables")?;
        for key in VariableKey::ALL {
            self.retarget_units(key, new.registry.unit(key));
        }

        let registry = self.config.registry.clone();
        self.config = AppConfig { registry, ..new };
        self.reapply_offset();

        self.settings.plot_options = self.config.to_fields();
        self.settings
            .save(&self.settings_path)
            .context("saving plot options")?;
        self.info("Plot options saved".to_string());
        Ok(())
    }

    /// Persist the settings file as is (import profiles changed).
    pub fn save_settings(&mut self) -> Result<()> {
        self.settings.save(&self.settings_path)
    }

    // ---- Sessions ----

    pub fn save_session(&mut self, path: &Path) -> Result<()> {
        let Some(dataset) = &self.dataset else {
            bail!("no data is loaded to save a session for");
        };
        let record = SessionRecord::capture(&SessionView {
            source_file: self.source_file.as_deref(),
            dataset,
            registry: &self.config.registry,
            selection: &self.selection,
            fraction_display: self.fraction_display,
            zoom: self.ranges.zoom_window().map(|(lo, hi)| [lo, hi]),
            primary: self.primary,
        });
        record.save(path)?;
        self.info(format!("Session saved to {}", file_name(path)));
        Ok(())
    }

    pub fn load_session(&mut self, path: &Path) -> Result<()> {
        let restored = SessionRecord::load(path)?.restore(&self.config.registry);
        if restored.dataset.is_empty() {
            bail!("{} contains no usable data", file_name(path));
        }
        let active: Vec<VariableKey> = restored.names.iter().map(|(k, _)| *k).collect();
        if let Err(e) = self.apply_renames(&restored.names, &active) {
            log::warn!("keeping current variable names: {e}");
        }
        self.set_dataset(restored.dataset, restored.source_file);
        self.selection = restored.selection;
        self.fraction_display = restored.fraction_display;
        if restored.primary.is_some() {
            self.set_primary(restored.primary);
        }
        self.pending_zoom = restored.zoom;
        self.sync_slots();
        self.info(format!("Session loaded from {}", file_name(path)));
        Ok(())
    }

    // ---- Plot and integration ----

    /// Typed integration ends; index mode snaps them to fraction boundaries.
    pub fn set_integration_positions(&mut self, start: f64, end: f64) {
        if let Some(ds) = &self.dataset {
            self.ranges.set_integration_positions(start, end, &ds.fractions);
        }
    }

    /// Build this frame's figure. `None` until data is loaded.
    pub fn figure(&mut self) -> Option<Result<Figure, PlotError>> {
        let dataset = self.dataset.as_ref()?;
        let primary_series = self.primary.and_then(|k| dataset.get(k));
        self.ranges
            .sync(primary_series, &dataset.fractions, self.fraction_display);

        let keys = self.selection.keys();
        if let (Some(min), Some(max)) = (dataset.min_position_of(keys), dataset.max_position_of(keys)) {
            if self.ranges.init_zoom(min, max) {
                if let Some([lo, hi]) = self.pending_zoom.take() {
                    self.ranges.set_zoom(lo, hi);
                }
            }
        }
        let window = self
            .ranges
            .zoom_window()
            .or_else(|| Some((dataset.min_position_of(keys)?, dataset.max_position_of(keys)?)))
            .unwrap_or((0.0, 1.0));

        let engine = PlotEngine::new(&self.config);
        Some(engine.render(&PlotRequest {
            dataset,
            selection: keys,
            primary: self.primary,
            window,
            fraction_display: self.fraction_display,
            integration: self.ranges.integration_window(),
        }))
    }

    /// Integrate the primary series over the current integration range.
    pub fn integration(&self) -> Result<Integration, AnalysisError> {
        let series = self
            .primary
            .zip(self.dataset.as_ref())
            .and_then(|(k, ds)| ds.get(k))
            .ok_or(AnalysisError::NoPrimary)?;
        let (start, end) = self
            .ranges
            .integration_window()
            .ok_or(AnalysisError::NoPrimary)?;
        IntegrationAnalyzer::default().integrate(series, start, end)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SETTINGS_FILE;
    use crate::data::custom::{ColumnMapping, CustomImporter, FractionBinding, ParseOptions};
    use crate::data::loader::Delimiter;
    use crate::data::variable::VariableRegistry;

    const TEXT: &str = "vol,uv,cond,frac\n\
                        0,-2,1,A1\n\
                        1,5,2,\n\
                        2,10,3,A2\n\
                        3,4,4,\n\
                        4,-1,5,A3\n";

    fn state(dir: &tempfile::TempDir) -> AppState {
        AppState::new(dir.path().join(SETTINGS_FILE))
    }

    fn custom_import(state: &AppState) -> CustomImport {
        mapped_import(state, &[(VariableKey::Uv, "A280", 1), (VariableKey::Conductivity, "Conductivity", 2)])
    }

    fn mapped_import(state: &AppState, slots: &[(VariableKey, &str, usize)]) -> CustomImport {
        let importer = CustomImporter::new(ParseOptions {
            delimiter: Delimiter::Comma,
            header_row: 0,
        });
        let tables = importer.tables(TEXT).unwrap();
        let mut mapping = ColumnMapping::unmapped(&state.config.registry);
        for &(key, name, col) in slots {
            let slot = mapping.slots.get_mut(&key).unwrap();
            slot.display_name = name.into();
            slot.value_column = Some(col);
            slot.position_column = Some(0);
        }
        mapping.fraction = FractionBinding {
            position_column: Some(0),
            label_column: Some(3),
        };
        importer.extract(&tables.headered, &mapping).unwrap()
    }

    fn loaded(dir: &tempfile::TempDir) -> AppState {
        let mut state = state(dir);
        let import = custom_import(&state);
        state.import_custom(import, Some(Path::new("run.csv"))).unwrap();
        state.drain_slot_events();
        state
    }

    #[test]
    fn test_custom_import_applies_names_and_resets_view() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state(&dir);
        let import = custom_import(&state);
        state.import_custom(import, None).unwrap();

        assert_eq!(state.config.registry.name(VariableKey::Uv), "A280");
        assert_eq!(state.primary, Some(VariableKey::Uv));
        assert!(state.selection.keys().is_empty());
        assert!(state.slots.is_available(VariableKey::Fraction));
        let events = state.drain_slot_events();
        assert!(events.contains(&SlotEvent::Renamed {
            key: VariableKey::Uv,
            name: "A280".into()
        }));
        assert!(state.drain_slot_events().is_empty());
    }

    #[test]
    fn test_rejected_names_leave_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = loaded(&dir);
        let mut import = custom_import(&state);
        import
            .display_names
            .insert(VariableKey::Ph, "Conductivity".to_string());
        assert!(matches!(
            state.import_custom(import, Some(Path::new("other.csv"))),
            Err(RenameError::NameInUse { .. })
        ));
        assert_eq!(state.config.registry.name(VariableKey::Ph), "pH");
        assert_eq!(state.source_file.as_deref(), Some(Path::new("run.csv")));
    }

    #[test]
    fn test_toggle_plot_and_fraction_slot() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = loaded(&dir);
        assert!(state.toggle_plot(VariableKey::Uv, true));
        assert!(!state.toggle_plot(VariableKey::Ph, true));
        assert!(state.toggle_plot(VariableKey::Fraction, true));
        assert!(state.slots.is_plotted(VariableKey::Fraction));

        state.replace_fractions(Vec::new());
        assert!(!state.fraction_display);
        assert!(!state.slots.is_available(VariableKey::Fraction));

        state.replace_fractions(vec![FractionBoundary::new(1.5, "B1")]);
        assert!(state.slots.is_available(VariableKey::Fraction));
        assert!(!state.fraction_display);
    }

    #[test]
    fn test_primary_offset_follows_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = loaded(&dir);
        let mut config = state.config.clone();
        config.offset_primary = true;
        state.apply_config(config).unwrap();
        let uv = state.dataset.as_ref().unwrap().get(VariableKey::Uv).unwrap();
        assert_eq!(uv.value, vec![0.0, 7.0, 12.0, 6.0, 1.0]);

        state.set_primary(Some(VariableKey::Conductivity));
        let ds = state.dataset.as_ref().unwrap();
        assert_eq!(ds.get(VariableKey::Uv).unwrap().value[0], -2.0);
    }

    #[test]
    fn test_apply_config_persists_and_rejects_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = loaded(&dir);
        let mut config = state.config.clone();
        config
            .registry
            .rename_all(&[(VariableKey::Ph, "Acidity".to_string())], &[])
            .unwrap();
        config.registry.retarget_units(VariableKey::Ph, " (pH)");
        state.apply_config(config).unwrap();

        let saved = Settings::load(&state.settings_path).unwrap().config();
        assert_eq!(saved.registry.name(VariableKey::Ph), "Acidity");
        assert_eq!(saved.registry.unit(VariableKey::Ph), " (pH)");

        let mut names = state.config.registry.names().to_vec();
        names[VariableKey::Gradient.index()] = "A280".into();
        let mut clash = state.config.clone();
        clash.registry = VariableRegistry::from_lists(&names, state.config.registry.units());
        assert!(state.apply_config(clash).is_err());
        assert_eq!(state.config.registry.name(VariableKey::Gradient), "Gradient");
    }

    #[test]
    fn test_apply_config_swaps_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = loaded(&dir);
        let mut names = state.config.registry.names().to_vec();
        names.swap(VariableKey::Uv.index(), VariableKey::Conductivity.index());
        let mut config = state.config.clone();
        config.registry = VariableRegistry::from_lists(&names, state.config.registry.units());
        state.apply_config(config).unwrap();

        assert_eq!(state.config.registry.name(VariableKey::Uv), "Conductivity");
        assert_eq!(state.config.registry.name(VariableKey::Conductivity), "A280");
        let events = state.drain_slot_events();
        assert!(events.contains(&SlotEvent::Renamed {
            key: VariableKey::Conductivity,
            name: "A280".into()
        }));
    }

    #[test]
    fn test_custom_name_taken_from_an_empty_slot() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state(&dir);
        let import = mapped_import(&state, &[(VariableKey::Variable1, "UV", 1)]);
        state.import_custom(import, None).unwrap();

        assert!(state.dataset.is_some());
        assert_eq!(state.config.registry.key_for_name("UV"), Some(VariableKey::Variable1));
        assert_eq!(state.config.registry.name(VariableKey::Uv), "UV (2)");
        assert_eq!(state.primary, Some(VariableKey::Variable1));
    }

    #[test]
    fn test_figure_and_integration() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = loaded(&dir);
        state.toggle_plot(VariableKey::Uv, true);
        let figure = state.figure().unwrap().unwrap();
        assert_eq!(figure.x_range, (0.0, 4.0));
        assert_eq!(state.ranges.full_range_max(), Some(4.0));

        // Continuous integration over the middle half: [1, 3].
        let result = state.integration().unwrap();
        assert_eq!((result.start, result.end), (1.0, 3.0));
        assert!((result.area - (7.5 + 7.0)).abs() < 1e-9);

        state.set_primary(None);
        assert_eq!(state.integration(), Err(AnalysisError::NoPrimary));
    }

    #[test]
    fn test_session_round_trip_through_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = loaded(&dir);
        state.toggle_plot(VariableKey::Conductivity, true);
        state.toggle_plot(VariableKey::Fraction, true);
        state.figure();
        state.ranges.set_zoom(1.0, 3.0);
        let path = dir.path().join("session.json");
        state.save_session(&path).unwrap();

        let mut fresh = loaded(&dir);
        fresh.load_session(&path).unwrap();
        assert_eq!(fresh.selection.keys(), &[VariableKey::Conductivity]);
        assert!(fresh.fraction_display);
        assert_eq!(fresh.primary, Some(VariableKey::Uv));
        fresh.figure();
        assert_eq!(fresh.ranges.zoom_window(), Some((1.0, 3.0)));
    }

    #[test]
    fn test_session_restores_custom_names_in_fresh_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = loaded(&dir);
        state.toggle_plot(VariableKey::Uv, true);
        let path = dir.path().join("session.json");
        state.save_session(&path).unwrap();

        // Wizard names are not persisted in the settings file.
        let mut fresh = AppState::new(state.settings_path.clone());
        assert_eq!(fresh.config.registry.name(VariableKey::Uv), "UV");
        fresh.load_session(&path).unwrap();

        assert_eq!(fresh.config.registry.name(VariableKey::Uv), "A280");
        assert_eq!(fresh.selection.keys(), &[VariableKey::Uv]);
        assert_eq!(fresh.primary, Some(VariableKey::Uv));
        let ds = fresh.dataset.as_ref().unwrap();
        assert_eq!(ds.get(VariableKey::Uv).unwrap().value, vec![-2.0, 5.0, 10.0, 4.0, -1.0]);
        assert!(fresh.drain_slot_events().contains(&SlotEvent::Renamed {
            key: VariableKey::Uv,
            name: "A280".into()
        }));
    }

    #[test]
    fn test_save_without_data_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state(&dir);
        assert!(state.save_session(&dir.path().join("s.json")).is_err());
        assert!(state.figure().is_none());
    }
}
