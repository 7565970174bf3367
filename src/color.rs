use std::str::FromStr;

use eframe::egui::Color32;
use egui_plot::LineStyle;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            let rgb: Srgb<u8> = rgb.into_format();
            Color32::from_rgb(rgb.red, rgb.green, rgb.blue)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Style codes from the plot options
// ---------------------------------------------------------------------------

/// Colour for a single-letter code (`b g r m c y k`) or `#RRGGBB`.
/// Unknown codes fall back to the palette colour for axis `slot`.
pub fn parse_color(code: &str, slot: usize) -> Color32 {
    let code = code.trim();
    let named = match code {
        "b" => Some(Color32::from_rgb(0, 0, 255)),
        "g" => Some(Color32::from_rgb(0, 128, 0)),
        "r" => Some(Color32::from_rgb(255, 0, 0)),
        "c" => Some(Color32::from_rgb(0, 191, 191)),
        "m" => Some(Color32::from_rgb(191, 0, 191)),
        "y" => Some(Color32::from_rgb(191, 191, 0)),
        "k" => Some(Color32::BLACK),
        "w" => Some(Color32::WHITE),
        _ => None,
    };
    if let Some(color) = named {
        return color;
    }
    match Srgb::<u8>::from_str(code) {
        Ok(rgb) => Color32::from_rgb(rgb.red, rgb.green, rgb.blue),
        Err(_) => {
            log::warn!("unknown colour code '{code}'");
            let palette = generate_palette(6);
            palette[slot % palette.len()]
        }
    }
}

/// Line style for `-`, `--`, `-.` and `:`.
pub fn line_style(code: &str) -> LineStyle {
    match code.trim() {
        "--" => LineStyle::Dashed { length: 10.0 },
        "-." => LineStyle::Dashed { length: 4.0 },
        ":" => LineStyle::Dotted { spacing: 5.0 },
        _ => LineStyle::Solid,
    }
}
