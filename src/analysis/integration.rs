use std::fmt;

use crate::data::model::Series;
use crate::error::AnalysisError;

/// Area under the primary series over a sub-range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Integration {
    pub start: f64,
    pub end: f64,
    pub area: f64,
    /// `end - start`.
    pub width: f64,
    /// Samples that fell inside the range.
    pub samples: usize,
}

/// Beer–Lambert amount in mg; undefined when ε or the path length is zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Amount {
    Milligrams(f64),
    Undefined,
}

impl Amount {
    /// `area × mw / (ε × l × 1000)`.
    pub fn from_area(area: f64, molecular_weight: f64, extinction: f64, path_length: f64) -> Self {
        let denominator = extinction * path_length * 1000.0;
        if denominator == 0.0 || !denominator.is_finite() {
            return Amount::Undefined;
        }
        Amount::Milligrams(area * molecular_weight / denominator)
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Amount::Milligrams(v) => Some(*v),
            Amount::Undefined => None,
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Amount::Milligrams(v) => write!(f, "{v:.3} mg"),
            Amount::Undefined => f.write_str("undefined"),
        }
    }
}

/// Integration and peak detection on the primary series.
#[derive(Debug, Clone, Copy)]
pub struct IntegrationAnalyzer {
    /// Minimum peak prominence in value units.
    pub prominence: f64,
    /// Minimum spacing between peaks in samples.
    pub distance: usize,
}

impl Default for IntegrationAnalyzer {
    fn default() -> Self {
        Self {
            prominence: 10.0,
            distance: 10,
        }
    }
}

impl IntegrationAnalyzer {
    /// Trapezoidal area of `series` over `start ≤ position ≤ end`.
    pub fn integrate(&self, series: &Series, start: f64, end: f64) -> Result<Integration, AnalysisError> {
        if !(start < end) {
            return Err(AnalysisError::InvalidRange { start, end });
        }
        let part = series.restrict(start, end);
        if part.is_empty() {
            return Err(AnalysisError::NoPointsInRange { start, end });
        }
        let (x, y) = (&part.position, &part.value);
        let area = x
            .windows(2)
            .zip(y.windows(2))
            .map(|(xs, ys)| (xs[1] - xs[0]) * (ys[0] + ys[1]) / 2.0)
            .sum();
        Ok(Integration {
            start,
            end,
            area,
            width: end - start,
            samples: x.len(),
        })
    }

    /// Indices of peaks with at least `prominence`, no two closer than
    /// `distance` samples. Taller peaks win the spacing contest.
    pub fn find_peaks(&self, values: &[f64]) -> Vec<usize> {
        let mut peaks = local_maxima(values);

        if self.distance > 1 && peaks.len() > 1 {
            let mut keep = vec![true; peaks.len()];
            let mut by_height: Vec<usize> = (0..peaks.len()).collect();
            by_height.sort_by(|&a, &b| values[peaks[b]].total_cmp(&values[peaks[a]]));
            for &i in &by_height {
                if !keep[i] {
                    continue;
                }
                for j in (0..peaks.len()).filter(|&j| j != i) {
                    if peaks[i].abs_diff(peaks[j]) < self.distance {
                        keep[j] = false;
                    }
                }
            }
            peaks = peaks
                .into_iter()
                .zip(keep)
                .filter_map(|(p, k)| k.then_some(p))
                .collect();
        }

        peaks.retain(|&p| prominence(values, p) >= self.prominence);
        peaks
    }
}

/// Strict local maxima; a flat top counts once, at its middle sample.
fn local_maxima(values: &[f64]) -> Vec<usize> {
    let mut out = Vec::new();
    let n = values.len();
    let mut i = 1;
    while i + 1 < n {
        if values[i - 1] < values[i] {
            let mut ahead = i + 1;
            while ahead + 1 < n && values[ahead] == values[i] {
                ahead += 1;
            }
            if values[ahead] < values[i] {
                out.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    out
}

/// Height of a peak above the higher of its two bases.
fn prominence(values: &[f64], peak: usize) -> f64 {
    let height = values[peak];
    let mut left_min = height;
    for &v in values[..peak].iter().rev() {
        if v > height {
            break;
        }
        left_min = left_min.min(v);
    }
    let mut right_min = height;
    for &v in &values[peak + 1..] {
        if v > height {
            break;
        }
        right_min = right_min.min(v);
    }
    height - left_min.max(right_min)
}
