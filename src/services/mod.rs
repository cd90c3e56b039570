//! Service layer for IDLens business logic.
//!
//! Domain logic separated from UI concerns; the CLI drives services
//! through events.

mod analyze;

pub use analyze::{AnalyzeEvent, AnalyzeResult, AnalyzeService};
