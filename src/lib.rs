// src/lib.rs
//! Rule-driven field extraction for contract text recovered from OCR or
//! markdown conversion, including HTML tables embedded in that text.

pub mod engine;
pub mod extractors;
pub mod result;
pub mod rules;
pub mod storage;
pub mod tables;
pub mod utils;

pub use engine::{Engine, EngineConfig};
pub use result::{CharSpan, ExtractionResult};
pub use rules::{ExtractionRule, RuleConfig, RuleDefinition, RuleType};
pub use utils::error::{AppError, ExtractError, RuleError, StorageError};
