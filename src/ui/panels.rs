use std::path::PathBuf;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::analysis::range::{RangeMode, SLIDER_PRECISION_FACTOR};
use crate::data::variable::VariableKey;
use crate::state::AppState;
use crate::ui::dialogs::{ConcentrationCalculator, Dialogs, FractionEditor, ImportWizard, PlotOptionsDialog};

// ---------------------------------------------------------------------------
// Text mirrors of the range controls
// ---------------------------------------------------------------------------

/// Editable text for the zoom and integration ends. Refreshed from the
/// range controller every frame unless the field has focus.
#[derive(Default)]
pub struct RangeText {
    zoom: [String; 2],
    integration: [String; 2],
}

/// Single-line number entry committed on focus loss. Bad input is reverted.
fn number_field(ui: &mut Ui, buffer: &mut String, current: f64) -> Option<f64> {
    let response = ui.add(egui::TextEdit::singleline(buffer).desired_width(70.0));
    if response.lost_focus() {
        match buffer.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => return Some(v),
            _ => *buffer = format!("{current:.3}"),
        }
    } else if !response.has_focus() {
        *buffer = format!("{current:.3}");
    }
    None
}

// ---------------------------------------------------------------------------
// Left side panel – selection and ranges
// ---------------------------------------------------------------------------

/// Render the left control panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState, text: &mut RangeText, dialogs: &mut Dialogs) {
    let Some(dataset) = &state.dataset else {
        ui.heading("Plots");
        ui.separator();
        ui.label("No data loaded.");
        return;
    };
    let present: Vec<VariableKey> = dataset.keys().collect();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Plot selection ----
            ui.heading("Plots");
            ui.separator();
            for key in VariableKey::SELECTION_ORDER {
                if !state.slots.is_available(key) {
                    continue;
                }
                let mut checked = state.slots.is_plotted(key);
                let name = state.config.registry.name(key).to_string();
                if ui.checkbox(&mut checked, name).changed() {
                    state.toggle_plot(key, checked);
                }
            }

            // ---- Primary variable ----
            ui.add_space(6.0);
            ui.strong("Primary");
            let current = state
                .primary
                .map_or("None".to_string(), |k| state.config.registry.name(k).to_string());
            let mut chosen = state.primary;
            egui::ComboBox::from_id_salt("primary")
                .selected_text(current)
                .show_ui(ui, |ui: &mut Ui| {
                    ui.selectable_value(&mut chosen, None, "None");
                    for &key in &present {
                        ui.selectable_value(&mut chosen, Some(key), state.config.registry.name(key));
                    }
                });
            if chosen != state.primary {
                state.set_primary(chosen);
            }

            ui.separator();
            zoom_controls(ui, state, text);
            ui.separator();
            integration_controls(ui, state, text, dialogs);
        });
}

fn zoom_controls(ui: &mut Ui, state: &mut AppState, text: &mut RangeText) {
    ui.strong("X-axis range");
    let (Some((lo, hi)), Some((mut start, mut end))) =
        (state.ranges.zoom_bounds(), state.ranges.zoom_window())
    else {
        ui.label("Select a plot to set the range.");
        return;
    };

    let step = 1.0 / SLIDER_PRECISION_FACTOR;
    if ui
        .add(egui::Slider::new(&mut start, lo..=hi).text("min").step_by(step))
        .changed()
    {
        state.ranges.set_zoom_start(start);
    }
    if ui
        .add(egui::Slider::new(&mut end, lo..=hi).text("max").step_by(step))
        .changed()
    {
        state.ranges.set_zoom_end(end);
    }

    ui.horizontal(|ui: &mut Ui| {
        let typed_start = number_field(ui, &mut text.zoom[0], start);
        ui.label("to");
        let typed_end = number_field(ui, &mut text.zoom[1], end);
        if typed_start.is_some() || typed_end.is_some() {
            state
                .ranges
                .set_zoom(typed_start.unwrap_or(start), typed_end.unwrap_or(end));
        }
    });
    let reset = ui.button("Reset zoom");
    let reset = match state.ranges.full_range_max() {
        Some(max) => reset.on_hover_text(format!("Show 0 to {max:.3} mL")),
        None => reset,
    };
    if reset.clicked() {
        state.ranges.reset_zoom();
    }
}

fn integration_controls(ui: &mut Ui, state: &mut AppState, text: &mut RangeText, dialogs: &mut Dialogs) {
    ui.strong("Integration");
    let Some(view) = state.ranges.integration_view() else {
        ui.label("Choose a primary variable to integrate.");
        return;
    };
    let (lo, hi) = view.bounds;
    let (mut start, mut end) = view.handles;

    let position = |h: f64| match view.mode {
        RangeMode::Continuous => format!("{:.3}", h / SLIDER_PRECISION_FACTOR),
        RangeMode::Index => format!("#{h:.0}"),
    };
    if ui
        .add(egui::Slider::new(&mut start, lo..=hi).text("start").custom_formatter(|h, _| position(h)))
        .changed()
    {
        state.ranges.set_integration_start(start);
    }
    if ui
        .add(egui::Slider::new(&mut end, lo..=hi).text("end").custom_formatter(|h, _| position(h)))
        .changed()
    {
        state.ranges.set_integration_end(end);
    }

    ui.horizontal(|ui: &mut Ui| {
        let typed_start = number_field(ui, &mut text.integration[0], view.start);
        ui.label("to");
        let typed_end = number_field(ui, &mut text.integration[1], view.end);
        if typed_start.is_some() || typed_end.is_some() {
            state.set_integration_positions(typed_start.unwrap_or(view.start), typed_end.unwrap_or(view.end));
        }
    });
    if view.mode == RangeMode::Index {
        ui.label(RichText::new("Snapped to fraction boundaries").weak());
    }

    match state.integration() {
        Ok(result) => {
            ui.label(format!("Area: {:.3}", result.area));
            ui.label(format!("Volume: {:.3} mL", result.width));
            if ui.button("Calculate Conc.").clicked() {
                dialogs.concentration = Some(ConcentrationCalculator::new(result));
            }
        }
        Err(e) => {
            ui.label(RichText::new(e.to_string()).color(Color32::RED));
        }
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState, dialogs: &mut Dialogs) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open ÄKTA export…").clicked() {
                open_akta_dialog(state);
                ui.close_menu();
            }
            if ui.button("Custom import…").clicked() {
                if let Some(path) = pick_file("Custom import", &["csv", "txt", "tsv"]) {
                    dialogs.import = Some(ImportWizard::open(path, state));
                }
                ui.close_menu();
            }
            ui.separator();
            if ui.button("Load session…").clicked() {
                if let Some(path) = pick_file("Load session", &["json"]) {
                    if let Err(e) = state.load_session(&path) {
                        state.fail("Load failed", format!("{e:#}"));
                    }
                }
                ui.close_menu();
            }
            let has_data = state.dataset.is_some();
            if ui.add_enabled(has_data, egui::Button::new("Save session…")).clicked() {
                save_session_dialog(state);
                ui.close_menu();
            }
        });

        ui.menu_button("Tools", |ui: &mut Ui| {
            if ui.button("Plot options…").clicked() {
                dialogs.plot_options = Some(PlotOptionsDialog::new(&state.config));
                ui.close_menu();
            }
            if let Some(ds) = &state.dataset {
                if ui.button("Label fractions…").clicked() {
                    dialogs.fractions = Some(FractionEditor::new(&ds.fractions));
                    ui.close_menu();
                }
            }
        });

        ui.separator();

        if let Some(path) = &state.source_file {
            ui.label(path.display().to_string());
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

fn pick_file(title: &str, extensions: &[&str]) -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title(title)
        .add_filter("Supported files", extensions)
        .pick_file()
}

pub fn open_akta_dialog(state: &mut AppState) {
    let Some(path) = pick_file("Open ÄKTA export", &["txt", "csv"]) else {
        return;
    };
    if let Err(e) = state.import_akta(&path) {
        state.fail("Import failed", e);
    }
}

fn save_session_dialog(state: &mut AppState) {
    let suggested = state
        .source_file
        .as_deref()
        .and_then(|p| p.file_stem())
        .map(|stem| format!("{}_config.json", stem.to_string_lossy()))
        .unwrap_or_else(|| "session.json".to_string());
    let file = rfd::FileDialog::new()
        .set_title("Save session")
        .set_file_name(suggested)
        .add_filter("JSON", &["json"])
        .save_file();
    if let Some(path) = file {
        if let Err(e) = state.save_session(&path) {
            state.fail("Save failed", format!("{e:#}"));
        }
    }
}
