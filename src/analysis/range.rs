use crate::data::fractions::FractionMapper;
use crate::data::model::Series;

/// Continuous positions are held as integers scaled by this factor.
pub const SLIDER_PRECISION_FACTOR: f64 = 1000.0;

/// Rectangle zooms narrower than this are treated as clicks.
pub const MIN_ZOOM_SPAN: f64 = 0.1;

fn to_units(position: f64) -> i64 {
    (position * SLIDER_PRECISION_FACTOR).round() as i64
}

fn from_units(units: i64) -> f64 {
    units as f64 / SLIDER_PRECISION_FACTOR
}

// ---------------------------------------------------------------------------
// HandlePair – two slider handles with start < end
// ---------------------------------------------------------------------------

/// Start/end handles inside `[lo, hi]`. Moving one handle onto or past the
/// other pushes the other so that `start < end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlePair {
    lo: i64,
    hi: i64,
    start: i64,
    end: i64,
}

impl HandlePair {
    /// Bounds narrower than one unit are widened to one unit.
    pub fn new(lo: i64, hi: i64) -> Self {
        let lo = lo.min(i64::MAX - 1);
        let hi = hi.max(lo + 1);
        Self {
            lo,
            hi,
            start: lo,
            end: hi,
        }
    }

    pub fn bounds(&self) -> (i64, i64) {
        (self.lo, self.hi)
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn set_start(&mut self, value: i64) {
        let start = value.clamp(self.lo, self.hi - 1);
        if start >= self.end {
            self.end = start.saturating_add(1);
        }
        self.start = start;
    }

    pub fn set_end(&mut self, value: i64) {
        let end = value.clamp(self.lo.saturating_add(1), self.hi);
        if end <= self.start {
            self.start = end.saturating_sub(1);
        }
        self.end = end;
    }

    /// Set both handles at once; a crossed pair keeps `start` and pushes `end`.
    pub fn set_both(&mut self, start: i64, end: i64) {
        let start = start.clamp(self.lo, self.hi - 1);
        let end = end.clamp(self.lo.saturating_add(1), self.hi);
        self.start = start;
        self.end = if end <= start { start.saturating_add(1) } else { end };
    }

    /// Change the bounds and pull the handles inside them.
    pub fn rebound(&mut self, lo: i64, hi: i64) {
        let (start, end) = (self.start, self.end);
        *self = Self::new(lo, hi);
        self.set_both(start, end);
    }
}

// ---------------------------------------------------------------------------
// Range controller
// ---------------------------------------------------------------------------

/// How integration handles are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeMode {
    /// Handles are positions × [`SLIDER_PRECISION_FACTOR`].
    Continuous,
    /// Handles are rows of the fraction boundary list.
    Index,
}

/// What the integration handles were last configured against.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Binding {
    Continuous { lo: i64, hi: i64 },
    Index { revision: u64, len: usize },
}

/// Integration handles as the UI shows them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegrationView {
    pub mode: RangeMode,
    pub bounds: (i64, i64),
    pub handles: (i64, i64),
    /// Handle positions in volume units.
    pub start: f64,
    pub end: f64,
}

/// Single source of truth for the zoom window and the integration sub-range.
#[derive(Debug, Clone, Default)]
pub struct RangeController {
    zoom: Option<HandlePair>,
    full_range_max: Option<f64>,
    integration: Option<HandlePair>,
    binding: Option<Binding>,
    boundaries: Vec<f64>,
    stale: bool,
}

impl RangeController {
    /// Forget everything; called when a new dataset replaces the old one.
    pub fn reset_for_import(&mut self) {
        *self = Self::default();
    }

    // ---- Zoom window ----

    /// First plot after an import: cache the full range and show all of it.
    /// Later calls are no-ops. Returns whether the window was initialised.
    pub fn init_zoom(&mut self, data_min: f64, data_max: f64) -> bool {
        if self.full_range_max.is_some() {
            return false;
        }
        self.full_range_max = Some(data_max);
        let mut pair = HandlePair::new(to_units(data_min.min(0.0)), to_units(data_max));
        pair.set_both(to_units(data_min), to_units(data_max));
        self.zoom = Some(pair);
        log::debug!("zoom initialised to [{data_min}, {data_max}]");
        true
    }

    pub fn full_range_max(&self) -> Option<f64> {
        self.full_range_max
    }

    pub fn zoom_window(&self) -> Option<(f64, f64)> {
        self.zoom.map(|z| (from_units(z.start()), from_units(z.end())))
    }

    pub fn zoom_bounds(&self) -> Option<(f64, f64)> {
        self.zoom.map(|z| {
            let (lo, hi) = z.bounds();
            (from_units(lo), from_units(hi))
        })
    }

    pub fn set_zoom_start(&mut self, position: f64) {
        if let Some(z) = &mut self.zoom {
            z.set_start(to_units(position));
        }
    }

    pub fn set_zoom_end(&mut self, position: f64) {
        if let Some(z) = &mut self.zoom {
            z.set_end(to_units(position));
        }
    }

    /// Text or session entry of both ends.
    pub fn set_zoom(&mut self, min: f64, max: f64) {
        if let Some(z) = &mut self.zoom {
            z.set_both(to_units(min), to_units(max));
        }
    }

    /// Rectangle-drag zoom from two x coordinates in either order.
    /// Returns `false` for drags narrower than [`MIN_ZOOM_SPAN`].
    pub fn zoom_to_rect(&mut self, x1: f64, x2: f64) -> bool {
        let (lo, hi) = (x1.min(x2), x1.max(x2));
        if hi - lo < MIN_ZOOM_SPAN || self.zoom.is_none() {
            return false;
        }
        self.set_zoom(lo, hi);
        true
    }

    /// Show `[0, full_range_max]`.
    pub fn reset_zoom(&mut self) {
        if let (Some(max), Some(z)) = (self.full_range_max, &mut self.zoom) {
            if max > 0.0 {
                z.set_both(0, to_units(max));
            }
        }
    }

    // ---- Integration range ----

    /// Mark index bounds stale after the fraction list changed.
    pub fn invalidate_index_bounds(&mut self) {
        self.stale = true;
    }

    pub fn mode(&self) -> Option<RangeMode> {
        match self.binding? {
            Binding::Continuous { .. } => Some(RangeMode::Continuous),
            Binding::Index { .. } => Some(RangeMode::Index),
        }
    }

    /// Bring the integration handles in line with the current primary series
    /// and fraction display. Call before every render.
    pub fn sync(&mut self, primary: Option<&Series>, fractions: &FractionMapper, fraction_display: bool) {
        if fraction_display && fractions.len() >= 2 {
            let wanted = Binding::Index {
                revision: fractions.revision(),
                len: fractions.len(),
            };
            match (self.binding, self.integration.as_mut()) {
                (Some(current), _) if current == wanted && !self.stale => {}
                (Some(Binding::Index { .. }), Some(pair)) => {
                    pair.rebound(0, fractions.len() as i64 - 1);
                    self.boundaries = fractions.positions();
                    self.binding = Some(wanted);
                }
                _ => {
                    let n = fractions.len() as i64;
                    let mut pair = HandlePair::new(0, n - 1);
                    pair.set_both(n / 4, (n * 3) / 4);
                    self.integration = Some(pair);
                    self.boundaries = fractions.positions();
                    self.binding = Some(wanted);
                }
            }
            self.stale = false;
            return;
        }

        let Some((min, max)) = primary.and_then(|s| Some((s.min_position()?, s.max_position()?)))
        else {
            self.integration = None;
            self.binding = None;
            return;
        };
        let wanted = Binding::Continuous {
            lo: to_units(min),
            hi: to_units(max),
        };
        if self.binding != Some(wanted) {
            let mut pair = HandlePair::new(to_units(min), to_units(max));
            pair.set_both(
                to_units(min + 0.25 * (max - min)),
                to_units(min + 0.75 * (max - min)),
            );
            self.integration = Some(pair);
            self.binding = Some(wanted);
            self.boundaries.clear();
        }
        self.stale = false;
    }

    fn handle_position(&self, handle: i64) -> f64 {
        match self.binding {
            Some(Binding::Index { .. }) => {
                let i = handle.clamp(0, self.boundaries.len() as i64 - 1).max(0) as usize;
                self.boundaries.get(i).copied().unwrap_or(0.0)
            }
            _ => from_units(handle),
        }
    }

    /// Integration range in volume units.
    pub fn integration_window(&self) -> Option<(f64, f64)> {
        let pair = self.integration?;
        Some((self.handle_position(pair.start()), self.handle_position(pair.end())))
    }

    pub fn integration_view(&self) -> Option<IntegrationView> {
        let pair = self.integration?;
        let (start, end) = self.integration_window()?;
        Some(IntegrationView {
            mode: self.mode()?,
            bounds: pair.bounds(),
            handles: (pair.start(), pair.end()),
            start,
            end,
        })
    }

    pub fn set_integration_start(&mut self, handle: i64) {
        if let Some(p) = &mut self.integration {
            p.set_start(handle);
        }
    }

    pub fn set_integration_end(&mut self, handle: i64) {
        if let Some(p) = &mut self.integration {
            p.set_end(handle);
        }
    }

    /// Typed positions; in index mode they snap to the nearest boundary of
    /// `fractions` (the lower row on a tie).
    pub fn set_integration_positions(&mut self, start: f64, end: f64, fractions: &FractionMapper) {
        let (s, e) = match self.binding {
            Some(Binding::Index { .. }) => {
                let snap = |p: f64| fractions.nearest_index(p).map_or(0, |i| i as i64);
                (snap(start), snap(end))
            }
            _ => (to_units(start), to_units(end)),
        };
        if let Some(p) = &mut self.integration {
            p.set_both(s, e);
        }
    }
}
