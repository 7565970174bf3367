use std::collections::BTreeMap;

use super::fractions::FractionMapper;
use super::variable::VariableKey;

// ---------------------------------------------------------------------------
// Series – one measured variable
// ---------------------------------------------------------------------------

/// Ordered (position, value) samples of one variable. Positions are
/// non-decreasing; `position` and `value` always have the same length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    /// Volume axis (x).
    pub position: Vec<f64>,
    /// Measured value (y).
    pub value: Vec<f64>,
}

impl Series {
    /// Build from unsorted pairs; sorts by position, keeping the input order of ties.
    pub fn from_pairs(mut pairs: Vec<(f64, f64)>) -> Self {
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (position, value) = pairs.into_iter().unzip();
        Self { position, value }
    }

    pub fn len(&self) -> usize {
        self.position.len()
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = [f64; 2]> + '_ {
        self.position
            .iter()
            .zip(self.value.iter())
            .map(|(&x, &y)| [x, y])
    }

    pub fn min_position(&self) -> Option<f64> {
        self.position.first().copied()
    }

    pub fn max_position(&self) -> Option<f64> {
        self.position.last().copied()
    }

    pub fn min_value(&self) -> Option<f64> {
        self.value.iter().copied().reduce(f64::min)
    }

    /// Index range of samples with `lo <= position <= hi`.
    pub fn window(&self, lo: f64, hi: f64) -> std::ops::Range<usize> {
        let start = self.position.partition_point(|&p| p < lo);
        let end = self.position.partition_point(|&p| p <= hi);
        start..end.max(start)
    }

    /// Copy of the samples with `lo <= position <= hi`.
    pub fn restrict(&self, lo: f64, hi: f64) -> Series {
        let range = self.window(lo, hi);
        Series {
            position: self.position[range.clone()].to_vec(),
            value: self.value[range].to_vec(),
        }
    }

    /// Index of the sample whose position is closest to `x`.
    pub fn nearest_index(&self, x: f64) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        let i = self.position.partition_point(|&p| p < x);
        if i == 0 {
            return Some(0);
        }
        if i == self.len() {
            return Some(self.len() - 1);
        }
        if (x - self.position[i - 1]).abs() <= (self.position[i] - x).abs() {
            Some(i - 1)
        } else {
            Some(i)
        }
    }

    /// Linear interpolation at `x`, clamped to the end values outside the domain.
    pub fn interpolate(&self, x: f64) -> Option<f64> {
        let n = self.len();
        if n == 0 {
            return None;
        }
        if x <= self.position[0] {
            return Some(self.value[0]);
        }
        if x >= self.position[n - 1] {
            return Some(self.value[n - 1]);
        }
        let i = self.position.partition_point(|&p| p <= x);
        let (x0, x1) = (self.position[i - 1], self.position[i]);
        let (y0, y1) = (self.value[i - 1], self.value[i]);
        if x1 == x0 {
            return Some(y0);
        }
        Some(y0 + (y1 - y0) * (x - x0) / (x1 - x0))
    }
}

// ---------------------------------------------------------------------------
// ChromatogramDataset – the complete loaded dataset
// ---------------------------------------------------------------------------

/// Current and baseline series per stable key, plus the fraction boundaries.
#[derive(Debug, Clone, Default)]
pub struct ChromatogramDataset {
    current: BTreeMap<VariableKey, Series>,
    original: BTreeMap<VariableKey, Series>,
    pub fractions: FractionMapper,
}

impl ChromatogramDataset {
    /// Empty series are discarded; the fraction slot is carried by `fractions`.
    pub fn new(series: BTreeMap<VariableKey, Series>, fractions: FractionMapper) -> Self {
        let original: BTreeMap<VariableKey, Series> = series
            .into_iter()
            .filter(|(k, s)| !s.is_empty() && !k.is_fraction())
            .collect();
        Self {
            current: original.clone(),
            original,
            fractions,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty() && self.fractions.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = VariableKey> + '_ {
        self.current.keys().copied()
    }

    pub fn get(&self, key: VariableKey) -> Option<&Series> {
        self.current.get(&key)
    }

    pub fn originals(&self) -> &BTreeMap<VariableKey, Series> {
        &self.original
    }

    /// Whether `key` can be selected: a non-empty series, or fractions for the fraction slot.
    pub fn contains(&self, key: VariableKey) -> bool {
        if key.is_fraction() {
            !self.fractions.is_empty()
        } else {
            self.current.contains_key(&key)
        }
    }

    /// Default primary variable: UV when present, otherwise the first series.
    pub fn default_primary(&self) -> Option<VariableKey> {
        if self.current.contains_key(&VariableKey::Uv) {
            Some(VariableKey::Uv)
        } else {
            self.keys().next()
        }
    }

    /// Largest position over the given keys.
    pub fn max_position_of(&self, keys: &[VariableKey]) -> Option<f64> {
        keys.iter()
            .filter_map(|k| self.get(*k).and_then(Series::max_position))
            .reduce(f64::max)
    }

    pub fn min_position_of(&self, keys: &[VariableKey]) -> Option<f64> {
        keys.iter()
            .filter_map(|k| self.get(*k).and_then(Series::min_position))
            .reduce(f64::min)
    }

    /// Restore every series from its baseline, then, if `enabled`, lift the
    /// primary series so its minimum sits at zero. Returns the applied shift.
    pub fn apply_primary_offset(&mut self, primary: Option<VariableKey>, enabled: bool) -> Option<f64> {
        self.current = self.original.clone();
        if !enabled {
            return None;
        }
        let key = primary?;
        let series = self.current.get_mut(&key)?;
        let min = series.min_value()?;
        if min >= 0.0 {
            return None;
        }
        for v in &mut series.value {
            *v -= min;
        }
        Some(-min)
    }
}

// ---------------------------------------------------------------------------
// PlotSelection – ordered keys to plot
// ---------------------------------------------------------------------------

/// Ordered list of plotted variables; order fixes axis stacking and style.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlotSelection {
    keys: Vec<VariableKey>,
}

impl PlotSelection {
    pub const MAX_AXES: usize = 6;

    pub fn keys(&self) -> &[VariableKey] {
        &self.keys
    }

    pub fn contains(&self, key: VariableKey) -> bool {
        self.keys.contains(&key)
    }

    /// Add or remove `key`. Returns `false` when adding would exceed the axis cap.
    pub fn set(&mut self, key: VariableKey, plotted: bool) -> bool {
        if key.is_fraction() {
            return false;
        }
        if plotted {
            if self.contains(key) {
                return true;
            }
            if self.keys.len() >= Self::MAX_AXES {
                return false;
            }
            self.keys.push(key);
        } else {
            self.keys.retain(|k| *k != key);
        }
        true
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(points: &[(f64, f64)]) -> Series {
        Series::from_pairs(points.to_vec())
    }

    #[test]
    fn test_from_pairs_sorts_by_position() {
        let s = series(&[(2.0, 9.0), (0.0, 10.0), (1.0, 12.0)]);
        assert_eq!(s.position, vec![0.0, 1.0, 2.0]);
        assert_eq!(s.value, vec![10.0, 12.0, 9.0]);
    }

    #[test]
    fn test_window_and_restrict_are_inclusive() {
        let s = series(&[(0.0, 1.0), (1.0, 2.0), (2.0, 3.0), (3.0, 4.0)]);
        assert_eq!(s.window(1.0, 2.0), 1..3);
        assert_eq!(s.restrict(1.0, 2.0).value, vec![2.0, 3.0]);
        assert!(s.restrict(5.0, 6.0).is_empty());
    }

    #[test]
    fn test_nearest_and_interpolate() {
        let s = series(&[(0.0, 0.0), (1.0, 10.0), (2.0, 20.0)]);
        assert_eq!(s.nearest_index(0.4), Some(0));
        assert_eq!(s.nearest_index(0.6), Some(1));
        assert_eq!(s.nearest_index(99.0), Some(2));
        assert!((s.interpolate(1.5).unwrap() - 15.0).abs() < 1e-12);
        assert_eq!(s.interpolate(-1.0), Some(0.0));
        assert_eq!(s.interpolate(5.0), Some(20.0));
    }

    #[test]
    fn test_offset_to_zero_is_idempotent_and_reversible() {
        let mut map = BTreeMap::new();
        map.insert(VariableKey::Uv, series(&[(0.0, -5.0), (1.0, 3.0), (2.0, 0.0)]));
        map.insert(VariableKey::Ph, series(&[(0.0, -1.0)]));
        let mut ds = ChromatogramDataset::new(map, FractionMapper::default());

        assert_eq!(ds.apply_primary_offset(Some(VariableKey::Uv), true), Some(5.0));
        assert_eq!(ds.get(VariableKey::Uv).unwrap().value, vec![0.0, 8.0, 5.0]);
        // Other series untouched.
        assert_eq!(ds.get(VariableKey::Ph).unwrap().value, vec![-1.0]);

        ds.apply_primary_offset(Some(VariableKey::Uv), true);
        assert_eq!(ds.get(VariableKey::Uv).unwrap().value, vec![0.0, 8.0, 5.0]);

        assert_eq!(ds.apply_primary_offset(Some(VariableKey::Uv), false), None);
        assert_eq!(ds.get(VariableKey::Uv).unwrap().value, vec![-5.0, 3.0, 0.0]);
        assert_eq!(ds.get(VariableKey::Uv), ds.originals().get(&VariableKey::Uv));
    }

    #[test]
    fn test_empty_series_are_discarded() {
        let mut map = BTreeMap::new();
        map.insert(VariableKey::Uv, series(&[(0.0, 1.0)]));
        map.insert(VariableKey::Conductivity, Series::default());
        let ds = ChromatogramDataset::new(map, FractionMapper::default());
        assert_eq!(ds.keys().collect::<Vec<_>>(), vec![VariableKey::Uv]);
        assert!(!ds.contains(VariableKey::Fraction));
    }

    #[test]
    fn test_selection_caps_at_six_axes() {
        let mut sel = PlotSelection::default();
        for key in VariableKey::SELECTION_ORDER.iter().take(6) {
            assert!(sel.set(*key, true));
        }
        assert!(!sel.set(VariableKey::Variable2, true));
        assert_eq!(sel.keys().len(), 6);
        assert!(!sel.set(VariableKey::Fraction, true));
        assert!(sel.set(VariableKey::Uv, false));
        assert_eq!(sel.keys().first(), Some(&VariableKey::Ph));
    }
}
