/// Analysis layer: everything that turns the dataset into what is drawn and measured.
///
/// ```text
///   ChromatogramDataset ──► PlotEngine ──► Figure (axes, fraction ticks, peaks)
///            │                  ▲
///            │                  │ zoom window
///            ▼                  │
///   IntegrationAnalyzer ◄── RangeController ◄── FractionMapper (index mode)
/// ```

pub mod integration;
pub mod plot;
pub mod range;
