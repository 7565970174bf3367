use crate::config::{AppConfig, PlotStyle};
use crate::data::fractions::FractionBoundary;
use crate::data::model::{ChromatogramDataset, PlotSelection, Series};
use crate::data::variable::VariableKey;
use crate::error::PlotError;

use super::integration::IntegrationAnalyzer;

pub const X_LABEL: &str = "Volume (mL)";

/// Autoscale padding as a fraction of the visible range.
const Y_MARGIN: f64 = 0.1;

/// Y range for `values`: floored at 0 when the minimum is negative, 10 %
/// padding otherwise. A flat series pads by 10 % of its value (1.0 at zero).
pub fn autoscale(values: &[f64]) -> Option<(f64, f64)> {
    let (min, max) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;
    let mut range = max - min;
    if range == 0.0 {
        range = if max == 0.0 { 1.0 } else { (max * Y_MARGIN).abs() };
    }
    let lo = if min < 0.0 { 0.0 } else { min - Y_MARGIN * range };
    Some((lo, max + Y_MARGIN * range))
}

// ---------------------------------------------------------------------------
// Figure model
// ---------------------------------------------------------------------------

/// One stacked y-axis and its series.
#[derive(Debug, Clone)]
pub struct Axis {
    pub key: VariableKey,
    /// Name and unit, e.g. `UV (mAU)`.
    pub label: String,
    pub name: String,
    pub style: PlotStyle,
    pub y_range: (f64, f64),
    pub series: Series,
}

/// Secondary x-axis of fraction labels.
#[derive(Debug, Clone, Default)]
pub struct FractionAxis {
    pub ticks: Vec<FractionBoundary>,
    pub label_size: f32,
}

#[derive(Debug, Clone)]
pub struct Figure {
    pub x_range: (f64, f64),
    pub axes: Vec<Axis>,
    /// Present whenever fraction display is on, even with no visible ticks.
    pub fraction_axis: Option<FractionAxis>,
    /// Peak markers on the primary axis.
    pub peaks: Vec<[f64; 2]>,
    /// Index into `axes` of the primary variable, if it is plotted.
    pub primary_axis: Option<usize>,
    pub integration: Option<(f64, f64)>,
    pub capacity_warning: Option<String>,
}

/// Cursor readout.
#[derive(Debug, Clone, PartialEq)]
pub struct Hover {
    pub x: f64,
    /// Arrow anchor: first axis interpolated at `x`.
    pub anchor: Option<[f64; 2]>,
    /// Name and nearest-sample value per axis.
    pub readings: Vec<(String, f64)>,
}

impl Figure {
    /// Nearest sample per axis, no interpolation; the anchor interpolates the first axis.
    pub fn hover(&self, x: f64) -> Hover {
        let readings = self
            .axes
            .iter()
            .filter_map(|axis| {
                let i = axis.series.nearest_index(x)?;
                Some((axis.name.clone(), axis.series.value[i]))
            })
            .collect();
        let anchor = self
            .axes
            .first()
            .and_then(|a| a.series.interpolate(x))
            .map(|y| [x, y]);
        Hover { x, anchor, readings }
    }

    pub fn hover_text(&self, hover: &Hover) -> String {
        let mut lines = vec![format!("Volume: {:.3}", hover.x)];
        lines.extend(hover.readings.iter().map(|(name, v)| format!("{name}: {v:.3}")));
        lines.join("\n")
    }
}

// ---------------------------------------------------------------------------
// PlotEngine
// ---------------------------------------------------------------------------

/// What to draw this frame.
pub struct PlotRequest<'a> {
    pub dataset: &'a ChromatogramDataset,
    pub selection: &'a [VariableKey],
    pub primary: Option<VariableKey>,
    pub window: (f64, f64),
    pub fraction_display: bool,
    pub integration: Option<(f64, f64)>,
}

/// Builds [`Figure`]s using the styles and names in the configuration.
pub struct PlotEngine<'a> {
    config: &'a AppConfig,
    analyzer: IntegrationAnalyzer,
}

impl<'a> PlotEngine<'a> {
    pub fn new(config: &'a AppConfig) -> Self {
        Self {
            config,
            analyzer: IntegrationAnalyzer::default(),
        }
    }

    pub fn render(&self, request: &PlotRequest<'_>) -> Result<Figure, PlotError> {
        let registry = &self.config.registry;
        let Some(&first) = request.selection.first() else {
            return Err(PlotError::EmptySelection);
        };
        if request.dataset.get(first).map_or(true, Series::is_empty) {
            return Err(PlotError::EmptySeries {
                name: registry.name(first).to_string(),
            });
        }

        let capacity_warning = (request.selection.len() > PlotSelection::MAX_AXES).then(|| {
            let msg = format!(
                "Cannot plot more than {} plots at a time; showing the first {}",
                PlotSelection::MAX_AXES,
                PlotSelection::MAX_AXES
            );
            log::warn!("{msg}");
            msg
        });

        let (lo, hi) = request.window;
        let mut axes = Vec::new();
        for &key in request.selection.iter().take(PlotSelection::MAX_AXES) {
            let Some(series) = request.dataset.get(key).filter(|s| !s.is_empty()) else {
                log::warn!("skipping '{}': no data", registry.name(key));
                continue;
            };
            let visible = &series.value[series.window(lo, hi)];
            let y_range = autoscale(visible)
                .or_else(|| autoscale(&series.value))
                .unwrap_or((0.0, 1.0));
            axes.push(Axis {
                key,
                label: registry.label(key),
                name: registry.name(key).to_string(),
                style: self.config.style(axes.len()).clone(),
                y_range,
                series: series.clone(),
            });
        }

        let primary_axis = request
            .primary
            .and_then(|p| axes.iter().position(|a| a.key == p));

        let peaks = match primary_axis {
            Some(i) if self.config.highlight_peaks => {
                let series = &axes[i].series;
                self.analyzer
                    .find_peaks(&series.value)
                    .into_iter()
                    .map(|p| [series.position[p], series.value[p]])
                    .collect()
            }
            _ => Vec::new(),
        };

        let fraction_axis = request.fraction_display.then(|| FractionAxis {
            ticks: request.dataset.fractions.visible(lo, hi).cloned().collect(),
            label_size: self.config.fraction_label_size,
        });

        Ok(Figure {
            x_range: request.window,
            axes,
            fraction_axis,
            peaks,
            primary_axis,
            integration: request.integration,
            capacity_warning,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::data::fractions::FractionMapper;

    fn dataset() -> ChromatogramDataset {
        let mut map = BTreeMap::new();
        let uv: Vec<(f64, f64)> = (0..100)
            .map(|i| {
                let x = i as f64 * 0.1;
                (x, if i == 50 { 80.0 } else { 1.0 })
            })
            .collect();
        map.insert(VariableKey::Uv, Series::from_pairs(uv));
        map.insert(
            VariableKey::Conductivity,
            Series::from_pairs(vec![(0.0, -3.0), (5.0, 12.0), (9.9, 20.0)]),
        );
        map.insert(VariableKey::Ph, Series::from_pairs(vec![(0.0, 7.0), (9.9, 7.0)]));
        let fractions = FractionMapper::from_boundaries(vec![
            FractionBoundary::new(1.0, "A1"),
            FractionBoundary::new(4.0, "A2"),
            FractionBoundary::new(8.0, "A3"),
        ]);
        ChromatogramDataset::new(map, fractions)
    }

    fn request<'a>(ds: &'a ChromatogramDataset, selection: &'a [VariableKey]) -> PlotRequest<'a> {
        PlotRequest {
            dataset: ds,
            selection,
            primary: Some(VariableKey::Uv),
            window: (0.0, 9.9),
            fraction_display: false,
            integration: None,
        }
    }

    #[test]
    fn test_autoscale_rules() {
        let (lo, hi) = autoscale(&[2.0, 12.0]).unwrap();
        assert!((lo - 1.0).abs() < 1e-12 && (hi - 13.0).abs() < 1e-12);
        let (lo, hi) = autoscale(&[-5.0, 15.0]).unwrap();
        assert_eq!(lo, 0.0);
        assert!((hi - 17.0).abs() < 1e-12);
        let (lo, hi) = autoscale(&[10.0, 10.0]).unwrap();
        assert!((lo - 9.9).abs() < 1e-12 && (hi - 10.1).abs() < 1e-12);
        assert_eq!(autoscale(&[0.0]), Some((-0.1, 0.1)));
        assert_eq!(autoscale(&[]), None);
    }

    #[test]
    fn test_axes_follow_selection_order_and_styles() {
        let config = AppConfig::default();
        let ds = dataset();
        let selection = [VariableKey::Conductivity, VariableKey::Uv];
        let figure = PlotEngine::new(&config).render(&request(&ds, &selection)).unwrap();
        assert_eq!(figure.axes.len(), 2);
        assert_eq!(figure.axes[0].label, "Conductivity (mS/cm)");
        assert_eq!(figure.axes[0].style.color, "b");
        assert_eq!(figure.axes[1].style.color, "g");
        assert_eq!(figure.axes[0].y_range.0, 0.0);
        assert_eq!(figure.primary_axis, Some(1));
        assert!(figure.fraction_axis.is_none());
        assert!(figure.peaks.is_empty());
    }

    #[test]
    fn test_autoscale_uses_visible_window() {
        let config = AppConfig::default();
        let ds = dataset();
        let selection = [VariableKey::Uv];
        let mut req = request(&ds, &selection);
        req.window = (0.0, 2.0);
        let figure = PlotEngine::new(&config).render(&req).unwrap();
        // Only the flat part is visible.
        let (lo, hi) = figure.axes[0].y_range;
        assert!((lo - 0.99).abs() < 1e-9 && (hi - 1.01).abs() < 1e-9);

        // Nothing visible: fall back to the whole series.
        req.window = (50.0, 60.0);
        let figure = PlotEngine::new(&config).render(&req).unwrap();
        assert!(figure.axes[0].y_range.1 > 80.0);
    }

    #[test]
    fn test_fraction_axis_lists_visible_ticks_only() {
        let config = AppConfig::default();
        let ds = dataset();
        let selection = [VariableKey::Uv];
        let mut req = request(&ds, &selection);
        req.fraction_display = true;
        req.window = (2.0, 9.0);
        let figure = PlotEngine::new(&config).render(&req).unwrap();
        let labels: Vec<_> = figure.fraction_axis.unwrap().ticks.into_iter().map(|t| t.label).collect();
        assert_eq!(labels, vec!["A2", "A3"]);

        req.window = (8.5, 9.0);
        let figure = PlotEngine::new(&config).render(&req).unwrap();
        assert!(figure.fraction_axis.unwrap().ticks.is_empty());
    }

    #[test]
    fn test_peaks_only_when_enabled() {
        let mut config = AppConfig::default();
        config.highlight_peaks = true;
        let ds = dataset();
        let selection = [VariableKey::Ph, VariableKey::Uv];
        let figure = PlotEngine::new(&config).render(&request(&ds, &selection)).unwrap();
        assert_eq!(figure.peaks.len(), 1);
        assert!((figure.peaks[0][0] - 5.0).abs() < 1e-9);
        assert_eq!(figure.peaks[0][1], 80.0);
    }

    #[test]
    fn test_errors_and_capacity_warning() {
        let config = AppConfig::default();
        let ds = dataset();
        let engine = PlotEngine::new(&config);
        assert!(matches!(engine.render(&request(&ds, &[])), Err(PlotError::EmptySelection)));
        assert!(matches!(
            engine.render(&request(&ds, &[VariableKey::Gradient])),
            Err(PlotError::EmptySeries { .. })
        ));

        let many = [
            VariableKey::Uv,
            VariableKey::Ph,
            VariableKey::Conductivity,
            VariableKey::Gradient,
            VariableKey::FlowRate,
            VariableKey::Injection,
            VariableKey::Variable1,
        ];
        let figure = engine.render(&request(&ds, &many)).unwrap();
        assert!(figure.capacity_warning.is_some());
        assert_eq!(figure.axes.len(), 3);
    }

    #[test]
    fn test_hover_reads_nearest_samples() {
        let config = AppConfig::default();
        let ds = dataset();
        let selection = [VariableKey::Conductivity, VariableKey::Uv];
        let figure = PlotEngine::new(&config).render(&request(&ds, &selection)).unwrap();
        let hover = figure.hover(2.4);
        assert_eq!(hover.readings[0], ("Conductivity".to_string(), -3.0));
        assert_eq!(hover.readings[1], ("UV".to_string(), 1.0));
        let anchor = hover.anchor.unwrap();
        assert!((anchor[1] - (-3.0 + 15.0 * 2.4 / 5.0)).abs() < 1e-9);
        assert!(figure.hover_text(&hover).starts_with("Volume: 2.400\nConductivity: -3.000"));
    }
}
