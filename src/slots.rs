use crate::data::model::{ChromatogramDataset, PlotSelection};
use crate::data::variable::VariableKey;

/// Change notification for one variable slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotEvent {
    Available { key: VariableKey, available: bool },
    Plotted { key: VariableKey, plotted: bool },
    Renamed { key: VariableKey, name: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotState {
    pub available: bool,
    pub plotted: bool,
}

/// Per-slot availability and plotted flags. Every change is queued as a
/// [`SlotEvent`]; the UI drains the queue once per frame.
#[derive(Debug, Clone, Default)]
pub struct SlotTable {
    states: [SlotState; 11],
    events: Vec<SlotEvent>,
}

impl SlotTable {
    pub fn get(&self, key: VariableKey) -> SlotState {
        self.states[key.index()]
    }

    pub fn is_available(&self, key: VariableKey) -> bool {
        self.get(key).available
    }

    pub fn is_plotted(&self, key: VariableKey) -> bool {
        self.get(key).plotted
    }

    pub fn set_available(&mut self, key: VariableKey, available: bool) {
        let state = &mut self.states[key.index()];
        if state.available != available {
            state.available = available;
            self.events.push(SlotEvent::Available { key, available });
        }
    }

    pub fn set_plotted(&mut self, key: VariableKey, plotted: bool) {
        let state = &mut self.states[key.index()];
        if state.plotted != plotted {
            state.plotted = plotted;
            self.events.push(SlotEvent::Plotted { key, plotted });
        }
    }

    pub fn renamed(&mut self, key: VariableKey, name: &str) {
        self.events.push(SlotEvent::Renamed {
            key,
            name: name.to_string(),
        });
    }

    /// Recompute availability from `dataset` and mirror the plotted flags.
    pub fn sync(&mut self, dataset: Option<&ChromatogramDataset>, selection: &PlotSelection, fraction_display: bool) {
        for key in VariableKey::ALL {
            let available = dataset.is_some_and(|ds| ds.contains(key));
            self.set_available(key, available);
            let plotted = if key.is_fraction() {
                fraction_display
            } else {
                selection.contains(key)
            };
            self.set_plotted(key, plotted);
        }
    }

    pub fn take_events(&mut self) -> Vec<SlotEvent> {
        std::mem::take(&mut self.events)
    }
}
