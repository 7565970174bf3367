use std::collections::BTreeSet;
use std::path::PathBuf;

use eframe::egui::{self, Color32, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use crate::analysis::integration::{Amount, Integration};
use crate::config::AppConfig;
use crate::data::custom::{ColumnMapping, CustomImporter, CustomTables, ImportProfile, ParseOptions};
use crate::data::fractions::{FractionMapper, USER_ADDED};
use crate::data::loader::{Delimiter, Table};
use crate::data::variable::{VariableKey, VariableRegistry};
use crate::state::AppState;

/// Rows shown in the import preview.
const PREVIEW_ROWS: usize = 20;

/// Open dialog windows. Each is dropped when its window closes.
#[derive(Default)]
pub struct Dialogs {
    pub import: Option<ImportWizard>,
    pub fractions: Option<FractionEditor>,
    pub plot_options: Option<PlotOptionsDialog>,
    pub concentration: Option<ConcentrationCalculator>,
}

impl Dialogs {
    pub fn show(&mut self, ctx: &egui::Context, state: &mut AppState) {
        if let Some(d) = &mut self.import {
            if !d.show(ctx, state) {
                self.import = None;
            }
        }
        if let Some(d) = &mut self.fractions {
            if !d.show(ctx, state) {
                self.fractions = None;
            }
        }
        if let Some(d) = &mut self.plot_options {
            if !d.show(ctx, state) {
                self.plot_options = None;
            }
        }
        if let Some(d) = &mut self.concentration {
            if !d.show(ctx) {
                self.concentration = None;
            }
        }
    }
}

fn error_label(ui: &mut Ui, error: &Option<String>) {
    if let Some(e) = error {
        ui.label(RichText::new(e).color(Color32::RED));
    }
}

// ---------------------------------------------------------------------------
// Custom import wizard
// ---------------------------------------------------------------------------

pub struct ImportWizard {
    path: PathBuf,
    options: ParseOptions,
    tables: Option<CustomTables>,
    mapping: ColumnMapping,
    profile_name: String,
    error: Option<String>,
}

impl ImportWizard {
    pub fn open(path: PathBuf, state: &AppState) -> Self {
        let mut wizard = Self {
            path,
            options: ParseOptions::default(),
            tables: None,
            mapping: ColumnMapping::unmapped(&state.config.registry),
            profile_name: String::new(),
            error: None,
        };
        wizard.reload();
        wizard
    }

    fn reload(&mut self) {
        match CustomImporter::new(self.options).load(&self.path) {
            Ok(tables) => {
                self.tables = Some(tables);
                self.error = None;
            }
            Err(e) => {
                log::error!("preview of {} failed: {e}", self.path.display());
                self.tables = None;
                self.error = Some(e.to_string());
            }
        }
    }

    /// Returns `false` once the wizard should close.
    fn show(&mut self, ctx: &egui::Context, state: &mut AppState) -> bool {
        let mut open = true;
        let mut done = false;
        egui::Window::new("Custom import")
            .open(&mut open)
            .default_width(640.0)
            .show(ctx, |ui: &mut Ui| {
                ui.label(self.path.display().to_string());
                self.parsing_controls(ui);
                ui.separator();
                self.profile_controls(ui, state);
                ui.separator();

                let Some(tables) = &self.tables else {
                    error_label(ui, &self.error);
                    return;
                };
                ui.collapsing("Preview", |ui: &mut Ui| preview_table(ui, &tables.raw));
                let headered = tables.headered.clone();
                egui::ScrollArea::vertical()
                    .max_height(320.0)
                    .show(ui, |ui: &mut Ui| mapping_grid(ui, &headered, &mut self.mapping));

                error_label(ui, &self.error);
                if ui.button("Import").clicked() {
                    done = self.finish(&headered, state);
                }
            });
        open && !done
    }

    fn parsing_controls(&mut self, ui: &mut Ui) {
        let mut changed = false;
        ui.horizontal(|ui: &mut Ui| {
            ui.label("Delimiter");
            egui::ComboBox::from_id_salt("delimiter")
                .selected_text(self.options.delimiter.to_string())
                .show_ui(ui, |ui: &mut Ui| {
                    for d in Delimiter::ALL {
                        changed |= ui
                            .selectable_value(&mut self.options.delimiter, d, d.to_string())
                            .changed();
                    }
                });
            ui.label("Header row");
            changed |= ui
                .add(egui::DragValue::new(&mut self.options.header_row).range(0..=100))
                .changed();
        });
        if changed {
            self.reload();
        }
    }

    fn profile_controls(&mut self, ui: &mut Ui, state: &mut AppState) {
        ui.horizontal(|ui: &mut Ui| {
            ui.label("Profile");
            let names: Vec<String> = state.settings.import_profiles.keys().cloned().collect();
            let mut picked = None;
            egui::ComboBox::from_id_salt("profiles")
                .selected_text("Load…")
                .show_ui(ui, |ui: &mut Ui| {
                    for name in &names {
                        if ui.selectable_label(false, name).clicked() {
                            picked = Some(name.clone());
                        }
                    }
                });
            if let Some(profile) = picked.and_then(|n| {
                self.profile_name = n.clone();
                state.settings.import_profiles.get(&n).cloned()
            }) {
                self.options = profile.parsing;
                self.mapping = profile.mapping;
                self.reload();
            }

            ui.add(egui::TextEdit::singleline(&mut self.profile_name).desired_width(120.0));
            let name = self.profile_name.trim().to_string();
            if ui.add_enabled(!name.is_empty(), egui::Button::new("Save")).clicked() {
                let profile = ImportProfile {
                    parsing: self.options,
                    mapping: self.mapping.clone(),
                };
                state.settings.import_profiles.insert(name.clone(), profile);
                self.persist_profiles(state, format!("Profile '{name}' saved"));
            }
            let exists = state.settings.import_profiles.contains_key(&name);
            if ui.add_enabled(exists, egui::Button::new("Delete")).clicked() {
                state.settings.import_profiles.remove(&name);
                self.persist_profiles(state, format!("Profile '{name}' deleted"));
            }
        });
    }

    fn persist_profiles(&mut self, state: &mut AppState, msg: String) {
        match state.save_settings() {
            Ok(()) => {
                log::info!("{msg}");
                state.status_message = Some(msg);
            }
            Err(e) => state.fail("Saving profiles failed", format!("{e:#}")),
        }
    }

    fn finish(&mut self, table: &Table, state: &mut AppState) -> bool {
        let import = match CustomImporter::new(self.options).extract(table, &self.mapping) {
            Ok(import) => import,
            Err(e) => {
                log::error!("custom import failed: {e}");
                self.error = Some(e.to_string());
                return false;
            }
        };
        match state.import_custom(import, Some(&self.path)) {
            Ok(()) => true,
            Err(e) => {
                self.error = Some(e.to_string());
                false
            }
        }
    }
}

fn preview_table(ui: &mut Ui, table: &Table) {
    let width = table.width();
    let rows = table.rows.len().min(PREVIEW_ROWS);
    ui.push_id("preview", |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .columns(Column::auto().at_least(60.0), width)
            .max_scroll_height(200.0)
            .header(18.0, |mut header| {
                for col in 0..width {
                    header.col(|ui: &mut Ui| {
                        ui.strong(format!("Col {col}"));
                    });
                }
            })
            .body(|body| {
                body.rows(16.0, rows, |mut row| {
                    let r = row.index();
                    for col in 0..width {
                        row.col(|ui: &mut Ui| {
                            ui.label(table.cell(r, col).unwrap_or(""));
                        });
                    }
                });
            });
    });
}

fn column_combo(ui: &mut Ui, id: impl std::hash::Hash, column: &mut Option<usize>, table: &Table) {
    let text = column.map_or("-- Not mapped --".to_string(), |c| table.column_label(c));
    egui::ComboBox::from_id_salt(id)
        .selected_text(text)
        .width(160.0)
        .show_ui(ui, |ui: &mut Ui| {
            ui.selectable_value(column, None, "-- Not mapped --");
            for c in 0..table.width() {
                ui.selectable_value(column, Some(c), table.column_label(c));
            }
        });
}

fn mapping_grid(ui: &mut Ui, table: &Table, mapping: &mut ColumnMapping) {
    egui::Grid::new("mapping")
        .num_columns(3)
        .striped(true)
        .show(ui, |ui: &mut Ui| {
            ui.strong("Name");
            ui.strong("Data (y)");
            ui.strong("Volume (x)");
            ui.end_row();
            for key in VariableKey::SELECTION_ORDER {
                let Some(binding) = mapping.slots.get_mut(&key) else {
                    continue;
                };
                ui.add(egui::TextEdit::singleline(&mut binding.display_name).desired_width(140.0));
                column_combo(ui, ("value", key), &mut binding.value_column, table);
                column_combo(ui, ("position", key), &mut binding.position_column, table);
                ui.end_row();
            }
            ui.label(VariableKey::Fraction.to_string());
            column_combo(ui, "fraction_label", &mut mapping.fraction.label_column, table);
            column_combo(ui, "fraction_position", &mut mapping.fraction.position_column, table);
            ui.end_row();
        });
}

// ---------------------------------------------------------------------------
// Fraction editor
// ---------------------------------------------------------------------------

/// Edits a copy of the fraction list; "Apply" hands it back in one step.
pub struct FractionEditor {
    draft: FractionMapper,
    selected: BTreeSet<usize>,
    new_position: String,
    new_label: String,
    error: Option<String>,
}

impl FractionEditor {
    pub fn new(fractions: &FractionMapper) -> Self {
        Self {
            draft: fractions.clone(),
            selected: BTreeSet::new(),
            new_position: String::new(),
            new_label: String::new(),
            error: None,
        }
    }

    fn show(&mut self, ctx: &egui::Context, state: &mut AppState) -> bool {
        let mut open = true;
        let mut done = false;
        egui::Window::new("Label fractions")
            .open(&mut open)
            .default_width(380.0)
            .show(ctx, |ui: &mut Ui| {
                egui::ScrollArea::vertical()
                    .max_height(360.0)
                    .show(ui, |ui: &mut Ui| self.rows(ui));

                ui.separator();
                ui.horizontal(|ui: &mut Ui| {
                    ui.label("Volume");
                    ui.add(egui::TextEdit::singleline(&mut self.new_position).desired_width(60.0));
                    ui.label("Label");
                    ui.add(egui::TextEdit::singleline(&mut self.new_label).desired_width(80.0));
                    if ui.button("Add").clicked() {
                        self.add();
                    }
                });
                error_label(ui, &self.error);

                ui.horizontal(|ui: &mut Ui| {
                    if ui
                        .add_enabled(!self.selected.is_empty(), egui::Button::new("Remove selected"))
                        .clicked()
                    {
                        let rows: Vec<usize> = self.selected.iter().copied().collect();
                        self.draft.remove(&rows);
                        self.selected.clear();
                    }
                    if ui.button("Apply").clicked() {
                        state.replace_fractions(self.draft.boundaries().to_vec());
                        done = true;
                    }
                });
            });
        open && !done
    }

    fn rows(&mut self, ui: &mut Ui) {
        let mut relabels = Vec::new();
        egui::Grid::new("fraction_rows")
            .num_columns(4)
            .striped(true)
            .show(ui, |ui: &mut Ui| {
                ui.strong("");
                ui.strong("Original");
                ui.strong("Volume (mL)");
                ui.strong("Label");
                ui.end_row();
                for (row, boundary) in self.draft.boundaries().iter().enumerate() {
                    let mut checked = self.selected.contains(&row);
                    if ui.checkbox(&mut checked, "").changed() {
                        if checked {
                            self.selected.insert(row);
                        } else {
                            self.selected.remove(&row);
                        }
                    }
                    ui.label(RichText::new(&boundary.original_label).weak());
                    ui.label(format!("{:.3}", boundary.position));
                    let mut label = boundary.label.clone();
                    if ui
                        .add(egui::TextEdit::singleline(&mut label).desired_width(120.0))
                        .changed()
                    {
                        relabels.push((row, label));
                    }
                    ui.end_row();
                }
            });
        for (row, label) in relabels {
            self.draft.relabel(row, label);
        }
    }

    fn add(&mut self) {
        let Ok(position) = self.new_position.trim().parse::<f64>() else {
            self.error = Some(format!("'{}' is not a volume", self.new_position.trim()));
            return;
        };
        let label = match self.new_label.trim() {
            "" => USER_ADDED.to_string(),
            l => l.to_string(),
        };
        self.draft.add(position, label);
        self.selected.clear();
        self.new_position.clear();
        self.new_label.clear();
        self.error = None;
    }
}

// ---------------------------------------------------------------------------
// Plot options
// ---------------------------------------------------------------------------

pub struct PlotOptionsDialog {
    draft: AppConfig,
    names: Vec<String>,
    units: Vec<String>,
    error: Option<String>,
}

impl PlotOptionsDialog {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            draft: config.clone(),
            names: config.registry.names().to_vec(),
            units: config.registry.units().to_vec(),
            error: None,
        }
    }

    fn show(&mut self, ctx: &egui::Context, state: &mut AppState) -> bool {
        let mut open = true;
        let mut done = false;
        egui::Window::new("Plot options")
            .open(&mut open)
            .default_width(420.0)
            .show(ctx, |ui: &mut Ui| {
                ui.collapsing("Styles", |ui: &mut Ui| {
                    egui::Grid::new("styles").num_columns(3).show(ui, |ui: &mut Ui| {
                        for (i, style) in self.draft.styles.iter_mut().enumerate() {
                            ui.label(format!("Axis {}", i + 1));
                            ui.add(egui::TextEdit::singleline(&mut style.line).desired_width(40.0));
                            ui.add(egui::TextEdit::singleline(&mut style.color).desired_width(80.0));
                            ui.end_row();
                        }
                    });
                });
                ui.collapsing("Variables", |ui: &mut Ui| {
                    egui::Grid::new("variables").num_columns(2).show(ui, |ui: &mut Ui| {
                        ui.strong("Name");
                        ui.strong("Unit");
                        ui.end_row();
                        for key in VariableKey::ALL {
                            ui.add(egui::TextEdit::singleline(&mut self.names[key.index()]).desired_width(160.0));
                            ui.add(egui::TextEdit::singleline(&mut self.units[key.index()]).desired_width(100.0));
                            ui.end_row();
                        }
                    });
                });
                ui.collapsing("General", |ui: &mut Ui| {
                    ui.horizontal(|ui: &mut Ui| {
                        ui.label("Font");
                        ui.text_edit_singleline(&mut self.draft.font_family);
                    });
                    ui.add(egui::Slider::new(&mut self.draft.font_size, 6.0..=24.0).text("font size"));
                    ui.add(
                        egui::Slider::new(&mut self.draft.fraction_label_size, 6.0..=24.0)
                            .text("fraction label size"),
                    );
                    ui.checkbox(&mut self.draft.offset_primary, "Offset primary plot to zero");
                    ui.checkbox(&mut self.draft.highlight_peaks, "Highlight peaks");
                    ui.checkbox(&mut self.draft.show_relative_amount, "Show relative amount");
                });

                error_label(ui, &self.error);
                if ui.button("Apply").clicked() {
                    let mut config = self.draft.clone();
                    config.registry = VariableRegistry::from_lists(&self.names, &self.units);
                    match state.apply_config(config) {
                        Ok(()) => done = true,
                        Err(e) => self.error = Some(format!("{e:#}")),
                    }
                }
            });
        open && !done
    }
}

// ---------------------------------------------------------------------------
// Concentration calculator
// ---------------------------------------------------------------------------

pub struct ConcentrationCalculator {
    integration: Integration,
    extinction: String,
    path_length: String,
    molecular_weight: String,
    result: String,
}

impl ConcentrationCalculator {
    pub fn new(integration: Integration) -> Self {
        let mut calculator = Self {
            integration,
            extinction: "1.0".into(),
            path_length: "1.0".into(),
            molecular_weight: "1000".into(),
            result: String::new(),
        };
        calculator.calculate();
        calculator
    }

    fn calculate(&mut self) {
        self.result = amount_text(
            self.integration.area,
            &self.extinction,
            &self.path_length,
            &self.molecular_weight,
        );
    }

    fn show(&mut self, ctx: &egui::Context) -> bool {
        let mut open = true;
        egui::Window::new("Calculate concentration")
            .open(&mut open)
            .show(ctx, |ui: &mut Ui| {
                let i = &self.integration;
                ui.label(format!("Range: {:.3} – {:.3} mL", i.start, i.end));
                ui.label(format!("Area: {:.3}", i.area));
                ui.label(format!("Volume: {:.3} mL", i.width));
                let mut changed = false;
                egui::Grid::new("concentration").num_columns(2).show(ui, |ui: &mut Ui| {
                    ui.label("Molar ext. coeff (M⁻¹cm⁻¹)");
                    changed |= ui.text_edit_singleline(&mut self.extinction).changed();
                    ui.end_row();
                    ui.label("Path length (cm)");
                    changed |= ui.text_edit_singleline(&mut self.path_length).changed();
                    ui.end_row();
                    ui.label("Molecular weight (g/mol)");
                    changed |= ui.text_edit_singleline(&mut self.molecular_weight).changed();
                    ui.end_row();
                });
                if changed {
                    self.calculate();
                }
                ui.strong(format!("Calculated amount (mg): {}", self.result));
            });
        open
    }
}

/// Amount read-out for the calculator's text fields.
fn amount_text(area: f64, extinction: &str, path_length: &str, molecular_weight: &str) -> String {
    let parse = |s: &str| s.trim().parse::<f64>().ok();
    match (parse(extinction), parse(path_length), parse(molecular_weight)) {
        (Some(e), Some(l), Some(mw)) => match Amount::from_area(area, mw, e, l).value() {
            Some(mg) => format!("{mg:.3}"),
            None => "N/A".to_string(),
        },
        _ => "Invalid input".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fractions::FractionBoundary;

    #[test]
    fn test_amount_text_follows_inputs() {
        assert_eq!(amount_text(100.0, "1.0", "1.0", "1000"), "100.000");
        assert_eq!(amount_text(100.0, "0", "1.0", "1000"), "N/A");
        assert_eq!(amount_text(100.0, "1.0", "abc", "1000"), "Invalid input");
    }

    #[test]
    fn test_calculator_starts_with_a_result() {
        let calculator = ConcentrationCalculator::new(Integration {
            start: 1.0,
            end: 3.0,
            area: 50.0,
            width: 2.0,
            samples: 3,
        });
        assert_eq!(calculator.molecular_weight, "1000");
        assert_eq!(calculator.result, "50.000");
    }

    #[test]
    fn test_fraction_editor_keeps_original_labels() {
        let mapper = FractionMapper::from_boundaries(vec![FractionBoundary::new(1.0, "A1")]);
        let mut editor = FractionEditor::new(&mapper);
        editor.draft.relabel(0, "Pool");
        editor.new_position = "2.0".into();
        editor.add();
        let rows = editor.draft.boundaries();
        assert_eq!(rows[0].label, "Pool");
        assert_eq!(rows[0].original_label, "A1");
        assert_eq!(rows[1].original_label, USER_ADDED);
    }
}
