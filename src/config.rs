use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::custom::ProfileStore;
use crate::data::variable::{VariableKey, VariableRegistry};

// ---------------------------------------------------------------------------
// AppConfig – typed view of the 34 positional plot options
// ---------------------------------------------------------------------------

/// Number of positional fields in `plot_options`.
pub const FIELD_COUNT: usize = 34;
const STYLE_COUNT: usize = 6;
const NAMES_AT: usize = 9;
const UNITS_AT: usize = 20;
const FLAGS_AT: usize = 31;

/// Line style and color code for one axis position, e.g. `--` and `r` or `#1f77b4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotStyle {
    pub line: String,
    pub color: String,
}

impl PlotStyle {
    fn parse(field: &str) -> Option<Self> {
        let (line, color) = field.split_once('@')?;
        Some(Self {
            line: line.to_string(),
            color: color.to_string(),
        })
    }

    fn to_field(&self) -> String {
        format!("{}@{}", self.line, self.color)
    }
}

/// Configuration owned by the application root and lent to the importer,
/// plot engine and range controller.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub styles: [PlotStyle; STYLE_COUNT],
    pub font_family: String,
    pub font_size: f32,
    pub fraction_label_size: f32,
    pub registry: VariableRegistry,
    /// Lift the primary series so its minimum is zero.
    pub offset_primary: bool,
    /// Mark detected peaks on the primary series.
    pub highlight_peaks: bool,
    /// Reserved; stored but not acted on.
    pub show_relative_amount: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_fields(&default_fields())
    }
}

/// Factory-default `plot_options`.
pub fn default_fields() -> Vec<String> {
    default_fields_static().iter().map(|s| s.to_string()).collect()
}

impl AppConfig {
    /// Parse positional fields; malformed or missing entries take their defaults.
    pub fn from_fields(fields: &[String]) -> Self {
        let defaults = default_fields_static();
        let field = |i: usize| fields.get(i).map(String::as_str).unwrap_or(defaults[i]);
        let number = |i: usize| -> f32 {
            field(i).trim().parse().unwrap_or_else(|_| {
                log::warn!("plot option {i} ('{}') is not a number", field(i));
                defaults[i].parse().unwrap_or(10.0)
            })
        };
        let flag = |i: usize| field(i).trim().eq_ignore_ascii_case("true");

        let styles = std::array::from_fn(|i| {
            PlotStyle::parse(field(i)).unwrap_or_else(|| {
                log::warn!("plot style '{}' is malformed", field(i));
                PlotStyle::parse(defaults[i]).unwrap_or(PlotStyle {
                    line: "-".into(),
                    color: "b".into(),
                })
            })
        });

        let slice = |at: usize| -> Vec<String> {
            (at..at + VariableKey::ALL.len())
                .map(|i| field(i).to_string())
                .collect()
        };

        Self {
            styles,
            font_family: field(6).to_string(),
            font_size: number(7),
            fraction_label_size: number(8),
            registry: VariableRegistry::from_lists(&slice(NAMES_AT), &slice(UNITS_AT)),
            offset_primary: flag(FLAGS_AT),
            highlight_peaks: flag(FLAGS_AT + 1),
            show_relative_amount: flag(FLAGS_AT + 2),
        }
    }

    pub fn to_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = self.styles.iter().map(PlotStyle::to_field).collect();
        fields.push(self.font_family.clone());
        fields.push(self.font_size.to_string());
        fields.push(self.fraction_label_size.to_string());
        fields.extend(self.registry.names().iter().cloned());
        fields.extend(self.registry.units().iter().cloned());
        for flag in [self.offset_primary, self.highlight_peaks, self.show_relative_amount] {
            fields.push(if flag { "True" } else { "False" }.to_string());
        }
        fields
    }

    /// Style for the `i`-th stacked axis.
    pub fn style(&self, i: usize) -> &PlotStyle {
        &self.styles[i % STYLE_COUNT]
    }
}

fn default_fields_static() -> [&'static str; FIELD_COUNT] {
    let mut out = [""; FIELD_COUNT];
    let head = ["-@b", "-@g", "-@r", "-@m", "-@c", "-@k", "Arial", "10", "10"];
    out[..head.len()].copy_from_slice(&head);
    for key in VariableKey::ALL {
        out[NAMES_AT + key.index()] = key.default_name();
        out[UNITS_AT + key.index()] = key.default_unit();
    }
    out[FLAGS_AT..].copy_from_slice(&["False", "False", "True"]);
    out
}

// ---------------------------------------------------------------------------
// Settings file
// ---------------------------------------------------------------------------

pub const SETTINGS_FILE: &str = "Settings_CA.json";

/// On-disk settings: positional plot options plus named import profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub plot_options: Vec<String>,
    pub import_profiles: ProfileStore,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            plot_options: default_fields(),
            import_profiles: ProfileStore::new(),
        }
    }
}

impl Settings {
    /// Settings live next to the executable.
    pub fn default_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_default()
            .join(SETTINGS_FILE)
    }

    /// Load, or write and return defaults if the file is missing or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                if path.exists() {
                    log::warn!("could not read {}: {e:#}; creating a new one", path.display());
                }
                let settings = Self::default();
                if let Err(e) = settings.save(path) {
                    log::error!("could not write default settings: {e:#}");
                }
                settings
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&text).context("parsing settings JSON")?;
        if settings.plot_options.len() != FIELD_COUNT {
            anyhow::bail!(
                "expected {FIELD_COUNT} plot options, found {}",
                settings.plot_options.len()
            );
        }
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("serializing settings")?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
    }

    pub fn config(&self) -> AppConfig {
        AppConfig::from_fields(&self.plot_options)
    }
}
