/// Data layer: variable identity, importers, and the canonical dataset.
///
/// Architecture:
/// ```text
///  Unicorn .txt (UTF-16)      any .csv / .txt
///        │                          │
///        ▼                          ▼
///   ┌──────────┐             ┌──────────┐
///   │   akta    │             │  custom   │  mapping + profiles
///   └──────────┘             └──────────┘
///        │  VariableKey → Series     │
///        └────────────┬─────────────┘
///                     ▼
///          ┌─────────────────────┐
///          │ ChromatogramDataset │  current + original series, fractions
///          └─────────────────────┘
///                     │
///                     ▼
///          ┌─────────────────────┐
///          │       session       │  save / restore as JSON
///          └─────────────────────┘
/// ```

pub mod akta;
pub mod custom;
pub mod fractions;
pub mod loader;
pub mod model;
pub mod session;
pub mod variable;
