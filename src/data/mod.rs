//! Data layer: metric tables, loading, normalization and pivoting.
//!
//! ```text
//!  .csv / .json / .parquet
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader  │  parse file → MetricsTable / ComparisonTable
//!   └──────────┘
//!        │
//!        ▼
//!   ┌───────────┐
//!   │ normalize │  percentage columns → [0, 1]
//!   └───────────┘
//!        │
//!        ▼
//!   ┌───────────────────┐
//!   │ MetricsCollection │  datasets sharing algorithms and metrics
//!   └───────────────────┘
//!
//!   ComparisonTable ──► ComparisonBuilder ──► ComparisonPivot per metric
//! ```

pub mod comparison;
pub mod loader;
pub mod model;
pub mod normalize;
