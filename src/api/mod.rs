pub mod analyzer;
pub mod catalogue;
pub mod error;

pub use analyzer::{AnalyzerStats, EventFormat, PlaybackAnalyzer};
pub use catalogue::{analyze_all, analyze_entry, default_encoder, discover, open_source, CatalogueEntry, InputKind};
pub use error::AnalyzerError;
