use eframe::egui::{self, Align2, Color32, PointerButton, RichText, Ui};
use egui_plot::{
    AxisHints, HPlacement, Line, MarkerShape, Plot, PlotBounds, PlotPoint, PlotPoints, Points, Polygon, Text,
    VLine,
};

use crate::analysis::plot::{Axis, X_LABEL};
use crate::color::{line_style, parse_color};
use crate::state::AppState;

/// Height of the fraction label band below the data, in normalised units.
const FRACTION_BAND: f64 = 0.12;

/// Start of an in-progress rectangle zoom, in plot x.
#[derive(Default)]
pub struct ZoomDrag {
    origin: Option<f64>,
}

fn normalise(axis: &Axis, y: f64) -> f64 {
    let (lo, hi) = axis.y_range;
    if hi > lo { (y - lo) / (hi - lo) } else { 0.5 }
}

// ---------------------------------------------------------------------------
// Chromatogram plot (central panel)
// ---------------------------------------------------------------------------

/// Every axis is drawn on a shared [0, 1] scale; each y-axis maps its marks
/// back to real values.
pub fn chromatogram_plot(ui: &mut Ui, state: &mut AppState, drag: &mut ZoomDrag) {
    let figure = match state.figure() {
        None => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("Open a file to view a chromatogram  (File → Open ÄKTA export…)");
            });
            return;
        }
        Some(Err(e)) => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.label(RichText::new(e.to_string()).color(Color32::GRAY));
            });
            return;
        }
        Some(Ok(figure)) => figure,
    };
    if let Some(warning) = &figure.capacity_warning {
        state.status_message = Some(warning.clone());
    }

    let font_size = state.config.font_size;
    let band = if figure.fraction_axis.is_some() { FRACTION_BAND } else { 0.0 };
    let (x_lo, x_hi) = figure.x_range;

    let y_axes: Vec<AxisHints> = figure
        .axes
        .iter()
        .enumerate()
        .map(|(i, axis)| {
            let (lo, hi) = axis.y_range;
            AxisHints::new_y()
                .label(axis.label.clone())
                .placement(if i == 0 { HPlacement::Left } else { HPlacement::Right })
                .formatter(move |mark, _range| {
                    if mark.value < 0.0 || mark.value > 1.0 {
                        String::new()
                    } else {
                        format!("{:.2}", lo + mark.value * (hi - lo))
                    }
                })
        })
        .collect();

    let response = Plot::new("chromatogram")
        .legend(egui_plot::Legend::default())
        .custom_x_axes(vec![AxisHints::new_x().label(X_LABEL)])
        .custom_y_axes(y_axes)
        .allow_boxed_zoom(false)
        .allow_drag(false)
        .allow_scroll(false)
        .allow_zoom(false)
        .allow_double_click_reset(false)
        .show(ui, |plot_ui| {
            plot_ui.set_plot_bounds(PlotBounds::from_min_max([x_lo, -band], [x_hi, 1.02]));

            for (i, axis) in figure.axes.iter().enumerate() {
                let points: PlotPoints = axis
                    .series
                    .points()
                    .map(|[x, y]| [x, normalise(axis, y)])
                    .collect();
                plot_ui.line(
                    Line::new(points)
                        .name(&axis.label)
                        .color(parse_color(&axis.style.color, i))
                        .style(line_style(&axis.style.line))
                        .width(1.5),
                );
            }

            if let Some(primary) = figure.primary_axis.map(|i| &figure.axes[i]) {
                if !figure.peaks.is_empty() {
                    let peaks: PlotPoints = figure
                        .peaks
                        .iter()
                        .map(|&[x, y]| [x, normalise(primary, y)])
                        .collect();
                    plot_ui.points(
                        Points::new(peaks)
                            .shape(MarkerShape::Asterisk)
                            .radius(6.0)
                            .color(Color32::RED)
                            .name("Peaks"),
                    );
                }
            }

            if let Some((start, end)) = figure.integration {
                for x in [start, end] {
                    plot_ui.vline(
                        VLine::new(x)
                            .color(Color32::DARK_RED)
                            .style(egui_plot::LineStyle::Dashed { length: 8.0 }),
                    );
                }
            }

            if let Some(fractions) = &figure.fraction_axis {
                for tick in &fractions.ticks {
                    plot_ui.vline(
                        VLine::new(tick.position)
                            .color(Color32::from_black_alpha(50))
                            .style(egui_plot::LineStyle::Dashed { length: 4.0 }),
                    );
                    plot_ui.text(Text::new(
                        PlotPoint::new(tick.position, -band / 2.0),
                        RichText::new(&tick.label).size(fractions.label_size),
                    ));
                }
            }

            let pointer = plot_ui.pointer_coordinate();
            if let (Some(p), None) = (pointer, drag.origin) {
                let hover = figure.hover(p.x);
                if let (Some([ax, ay]), Some(first)) = (hover.anchor, figure.axes.first()) {
                    let anchor = PlotPoint::new(ax, normalise(first, ay));
                    plot_ui.points(Points::new(vec![[anchor.x, anchor.y]]).radius(3.0).color(Color32::BLACK));
                    let near_top = anchor.y > 0.7;
                    let near_right = ax > x_lo + 0.8 * (x_hi - x_lo);
                    let align = match (near_right, near_top) {
                        (false, false) => Align2::LEFT_BOTTOM,
                        (false, true) => Align2::LEFT_TOP,
                        (true, false) => Align2::RIGHT_BOTTOM,
                        (true, true) => Align2::RIGHT_TOP,
                    };
                    plot_ui.text(
                        Text::new(anchor, RichText::new(figure.hover_text(&hover)).monospace().size(font_size))
                            .anchor(align),
                    );
                }
            }

            if let (Some(x0), Some(p)) = (drag.origin, pointer) {
                plot_ui.polygon(
                    Polygon::new(PlotPoints::from(vec![[x0, -band], [p.x, -band], [p.x, 1.02], [x0, 1.02]]))
                        .fill_color(Color32::from_black_alpha(20))
                        .stroke(egui::Stroke::new(1.0, Color32::BLACK)),
                );
            }

            pointer
        });

    let pointer = response.inner;
    let plot = &response.response;
    if plot.drag_started_by(PointerButton::Primary) {
        drag.origin = pointer.map(|p| p.x);
    }
    if plot.drag_stopped_by(PointerButton::Primary) {
        if let (Some(x0), Some(p)) = (drag.origin.take(), pointer) {
            state.ranges.zoom_to_rect(x0, p.x);
        }
    }
    if plot.secondary_clicked() {
        state.ranges.reset_zoom();
    }
}
