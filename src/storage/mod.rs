// src/storage/mod.rs
use std::fs;
use std::path::{Path, PathBuf};

use crate::result::ExtractionResult;
use crate::rules::ExtractionRule;
use crate::utils::error::StorageError;

pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path for `<name><suffix>` inside the output directory.
    pub fn path_for(&self, name: &str, suffix: &str) -> PathBuf {
        self.base_dir.join(format!("{}{}", file_stem(name), suffix))
    }

    /// Saves the result as pretty JSON to `<name>_result.json`
    pub fn save_result(&self, name: &str, result: &ExtractionResult) -> Result<PathBuf, StorageError> {
        let file_path = self.path_for(name, "_result.json");

        let json = serde_json::to_string_pretty(result).map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&file_path, json).map_err(StorageError::IoError)?;

        tracing::info!("Saved result to {}", file_path.display());
        Ok(file_path)
    }

    /// Saves metadata about the extraction run to `<name>_meta.json`
    pub fn save_result_metadata(
        &self,
        name: &str,
        rule: &ExtractionRule,
        result: &ExtractionResult,
    ) -> Result<PathBuf, StorageError> {
        let file_path = self.path_for(name, "_meta.json");

        let metadata = serde_json::json!({
            "rule_id": rule.id,
            "rule_name": rule.name,
            "rule_type": rule.type_name(),
            "priority": rule.priority,
            "success": result.success,
            "matched_rule_id": result.matched_rule_id,
            "value_length": result.value.as_ref().map(|v| v.chars().count()),
            "confidence": result.confidence,
            "extraction_timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let metadata_str =
            serde_json::to_string_pretty(&metadata).map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&file_path, metadata_str).map_err(StorageError::IoError)?;

        tracing::info!("Saved metadata to {}", file_path.display());
        Ok(file_path)
    }
}

// Rule ids come from users; keep them to one path segment.
fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .collect();
    let stem = stem.trim_matches('.');
    if stem.is_empty() {
        "result".to_string()
    } else {
        stem.to_string()
    }
}
