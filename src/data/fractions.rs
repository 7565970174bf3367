use serde::{Deserialize, Serialize};

/// Label given to boundaries added by hand.
pub const USER_ADDED: &str = "User Added";

/// One labelled fraction edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FractionBoundary {
    pub position: f64,
    pub label: String,
    /// Label as it came from the source file (or [`USER_ADDED`]).
    #[serde(default)]
    pub original_label: String,
}

impl FractionBoundary {
    pub fn new(position: f64, label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            position,
            original_label: label.clone(),
            label,
        }
    }
}

// ---------------------------------------------------------------------------
// FractionMapper – ordered, editable boundary list
// ---------------------------------------------------------------------------

/// Fraction boundaries kept sorted by position. The index of a boundary is
/// its row in this list, which is what index-mode ranges refer to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FractionMapper {
    boundaries: Vec<FractionBoundary>,
    revision: u64,
}

impl FractionMapper {
    pub fn from_boundaries(mut boundaries: Vec<FractionBoundary>) -> Self {
        boundaries.sort_by(|a, b| a.position.total_cmp(&b.position));
        Self {
            boundaries,
            revision: 0,
        }
    }

    pub fn boundaries(&self) -> &[FractionBoundary] {
        &self.boundaries
    }

    pub fn positions(&self) -> Vec<f64> {
        self.boundaries.iter().map(|b| b.position).collect()
    }

    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    /// Bumped on every mutation; range controllers compare it to detect stale bounds.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Insert after any boundary at the same position. Returns the new row.
    pub fn add(&mut self, position: f64, label: impl Into<String>) -> usize {
        let row = self.boundaries.partition_point(|b| b.position <= position);
        self.boundaries.insert(
            row,
            FractionBoundary {
                position,
                label: label.into(),
                original_label: USER_ADDED.to_string(),
            },
        );
        self.revision += 1;
        row
    }

    /// Delete the given rows; indices past the end are ignored.
    pub fn remove(&mut self, indices: &[usize]) -> usize {
        let mut rows: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&i| i < self.boundaries.len())
            .collect();
        rows.sort_unstable();
        rows.dedup();
        for &row in rows.iter().rev() {
            self.boundaries.remove(row);
        }
        if !rows.is_empty() {
            self.revision += 1;
        }
        rows.len()
    }

    /// Returns `false` if `index` is out of range.
    pub fn relabel(&mut self, index: usize, new_label: impl Into<String>) -> bool {
        match self.boundaries.get_mut(index) {
            Some(b) => {
                b.label = new_label.into();
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    /// Replace the whole list at once (fraction editor "OK").
    pub fn replace(&mut self, boundaries: Vec<FractionBoundary>) {
        let revision = self.revision + 1;
        *self = Self::from_boundaries(boundaries);
        self.revision = revision;
    }

    /// Row of the boundary closest to `position`.
    pub fn nearest_index(&self, position: f64) -> Option<usize> {
        self.boundaries
            .iter()
            .enumerate()
            .min_by(|a, b| {
                (a.1.position - position)
                    .abs()
                    .total_cmp(&(b.1.position - position).abs())
            })
            .map(|(i, _)| i)
    }

    /// Boundaries with `lo <= position <= hi`.
    pub fn visible(&self, lo: f64, hi: f64) -> impl Iterator<Item = &FractionBoundary> {
        self.boundaries
            .iter()
            .filter(move |b| b.position >= lo && b.position <= hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_sorted(m: &FractionMapper) -> bool {
        m.boundaries()
            .windows(2)
            .all(|w| w[0].position <= w[1].position)
    }

    #[test]
    fn test_add_keeps_order() {
        let mut m = FractionMapper::from_boundaries(vec![
            FractionBoundary::new(10.0, "B"),
            FractionBoundary::new(0.0, "A"),
        ]);
        assert_eq!(m.add(5.0, "mid"), 1);
        assert_eq!(m.add(10.0, "tie"), 3);
        assert_eq!(m.add(-1.0, "first"), 0);
        assert!(is_sorted(&m));
        assert_eq!(m.boundaries()[2].original_label, USER_ADDED);
    }

    #[test]
    fn test_remove_reindexes_and_ignores_bad_rows() {
        let mut m = FractionMapper::from_boundaries(
            (0..5).map(|i| FractionBoundary::new(i as f64, i.to_string())).collect(),
        );
        assert_eq!(m.remove(&[3, 1, 1, 99]), 2);
        let labels: Vec<&str> = m.boundaries().iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["0", "2", "4"]);
        assert!(is_sorted(&m));
    }

    #[test]
    fn test_every_mutation_bumps_revision() {
        let mut m = FractionMapper::default();
        let r0 = m.revision();
        m.add(1.0, "1");
        assert!(m.revision() > r0);
        let r1 = m.revision();
        assert!(m.relabel(0, "one"));
        assert!(m.revision() > r1);
        assert!(!m.relabel(7, "nope"));
        let r2 = m.revision();
        m.remove(&[0]);
        assert!(m.revision() > r2);
        assert!(m.is_empty());
    }

    #[test]
    fn test_nearest_and_visible() {
        let m = FractionMapper::from_boundaries(vec![
            FractionBoundary::new(0.0, "1"),
            FractionBoundary::new(4.0, "2"),
            FractionBoundary::new(9.0, "Waste"),
        ]);
        assert_eq!(m.nearest_index(5.9), Some(1));
        assert_eq!(m.nearest_index(7.0), Some(2));
        let labels: Vec<&str> = m.visible(1.0, 9.0).map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["2", "Waste"]);
    }
}
