// src/rules/mod.rs
pub mod config;
pub mod loader;
pub mod model;

// Re-export key rule types for convenience
pub use config::{
    AnchorConfig, BoundaryConfig, Direction, ExtractMethod, RegexConfig, RuleConfig, TableConfig, TableMode,
};
pub use loader::{load_rules, parse_rules};
pub use model::{ExtractionRule, RuleDefinition, RuleType};
