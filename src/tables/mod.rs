// src/tables/mod.rs
pub mod header;
pub mod parser;
pub mod render;

// Re-export key table types for convenience
pub use header::{match_header_feature, HeaderFeature, HeaderMatch, MatchTier};
pub use parser::{TableGrid, TableParser};
pub use render::TableFormat;
