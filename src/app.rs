use eframe::egui;

use crate::config::Settings;
use crate::state::AppState;
use crate::ui::dialogs::Dialogs;
use crate::ui::panels::{self, RangeText};
use crate::ui::plot::{self, ZoomDrag};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct ChromatogramApp {
    pub state: AppState,
    dialogs: Dialogs,
    range_text: RangeText,
    zoom_drag: ZoomDrag,
}

impl Default for ChromatogramApp {
    fn default() -> Self {
        Self {
            state: AppState::new(Settings::default_path()),
            dialogs: Dialogs::default(),
            range_text: RangeText::default(),
            zoom_drag: ZoomDrag::default(),
        }
    }
}

impl eframe::App for ChromatogramApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.state.drain_slot_events();

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state, &mut self.dialogs);
        });

        // ---- Left side panel: selection and ranges ----
        egui::SidePanel::left("control_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state, &mut self.range_text, &mut self.dialogs);
            });

        // ---- Central panel: plot ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::chromatogram_plot(ui, &mut self.state, &mut self.zoom_drag);
        });

        self.dialogs.show(ctx, &mut self.state);
    }
}
