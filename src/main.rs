// src/main.rs
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use contract_extractor::extractors::catalog;
use contract_extractor::extractors::PatternBudget;
use contract_extractor::rules::{load_rules, ExtractionRule};
use contract_extractor::storage::StorageManager;
use contract_extractor::utils::{self, AppError};
use contract_extractor::{Engine, EngineConfig, ExtractionResult};

/// Command Line Interface for rule-based contract field extraction
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Text file to extract from (OCR or markdown output, may contain HTML tables)
    #[arg(short, long, required_unless_present = "list_patterns")]
    input: Option<PathBuf>,

    /// JSON file with one rule definition or an array of them
    #[arg(short, long, required_unless_present = "list_patterns")]
    rules: Option<PathBuf>,

    /// Evaluate only the rule with this id
    #[arg(long, conflicts_with = "each")]
    rule_id: Option<String>,

    /// Evaluate every enabled rule instead of stopping at the first success
    #[arg(long)]
    each: bool,

    /// Output directory for result files
    #[arg(short, long, default_value = "./output")]
    output_dir: String,

    /// Debug mode - collect extraction traces and save annotated HTML
    #[arg(short, long)]
    debug: bool,

    /// Wall-clock limit for evaluating one user pattern, in milliseconds
    #[arg(long, env = "EXTRACT_REGEX_TIME_LIMIT_MS", default_value = "250")]
    regex_time_limit_ms: u64,

    /// Print the catalog of common patterns and exit
    #[arg(long)]
    list_patterns: bool,
}

fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::info!("Starting processing for args: {:?}", args);

    if args.list_patterns {
        let listing = serde_json::to_string_pretty(catalog::common_patterns())
            .map_err(|e| AppError::Processing(e.to_string()))?;
        println!("{}", listing);
        return Ok(());
    }

    let (Some(input), Some(rules_path)) = (args.input.as_deref(), args.rules.as_deref()) else {
        return Err(AppError::Config("--input and --rules are required".to_string()));
    };

    // 3. Build the engine and load rules under the same pattern budget
    let budget = PatternBudget::default().with_time_limit(Duration::from_millis(args.regex_time_limit_ms));
    let engine = Engine::new(EngineConfig {
        debug: args.debug,
        budget: budget.clone(),
    });
    let rules = load_rules(rules_path, &budget)?;
    if rules.is_empty() {
        return Err(AppError::Config(format!("No rules found in {}", rules_path.display())));
    }

    let text = std::fs::read_to_string(input)?;
    tracing::info!("Read {} characters from {}", text.chars().count(), input.display());

    // 4. Initialize storage
    let storage = StorageManager::new(&args.output_dir)?;
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());

    // 5. Evaluate
    let outcomes: Vec<(String, &ExtractionRule, ExtractionResult)> = if let Some(id) = &args.rule_id {
        let rule = rules
            .iter()
            .find(|r| &r.id == id)
            .ok_or_else(|| AppError::Config(format!("No rule with id '{}'", id)))?;
        vec![(stem.clone(), rule, engine.extract(&text, rule))]
    } else if args.each {
        engine
            .extract_each(&text, &rules)
            .into_iter()
            .filter_map(|(id, result)| {
                let rule = rules.iter().find(|r| r.id == id)?;
                Some((format!("{}_{}", stem, id), rule, result))
            })
            .collect()
    } else {
        let result = engine.extract_with_rules(&text, &rules);
        // a failed batch is attributed to the last rule it tried
        let rule = result
            .matched_rule_id
            .as_deref()
            .and_then(|id| rules.iter().find(|r| r.id == id))
            .or_else(|| rules.iter().filter(|r| r.enabled).rev().min_by_key(|r| r.priority))
            .or_else(|| rules.first())
            .ok_or_else(|| AppError::Config("No rules to attribute the result to".to_string()))?;
        vec![(stem.clone(), rule, result)]
    };

    // 6. Report and save
    let mut success_count = 0;
    let mut failure_count = 0;
    for (name, rule, result) in &outcomes {
        if result.success {
            success_count += 1;
            tracing::info!("Rule '{}' extracted: {}", rule.id, result.value.as_deref().unwrap_or_default());
        } else {
            failure_count += 1;
            tracing::warn!(
                "Rule '{}' failed: {}",
                rule.id,
                result.error_message.as_deref().unwrap_or_default()
            );
        }

        match serde_json::to_string_pretty(result) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::error!("Failed to serialize result: {}", e),
        }

        match storage.save_result(name, result) {
            Ok(path) => tracing::info!("Saved result to: {}", path.display()),
            Err(e) => tracing::error!("Failed to save result: {}", e),
        }
        match storage.save_result_metadata(name, rule, result) {
            Ok(path) => tracing::info!("Saved result metadata to: {}", path.display()),
            Err(e) => tracing::error!("Failed to save result metadata: {}", e),
        }
    }

    if args.debug {
        save_annotated(&storage, &stem, &text, &outcomes);
    }

    tracing::info!("Processing finished. Success: {}, Failures: {}", success_count, failure_count);

    if success_count == 0 {
        return Err(AppError::Processing(format!(
            "No value extracted by {} rule evaluation(s)",
            failure_count
        )));
    }

    Ok(())
}

fn save_annotated(
    storage: &StorageManager,
    stem: &str,
    text: &str,
    outcomes: &[(String, &ExtractionRule, ExtractionResult)],
) {
    let pairs: Vec<(&ExtractionRule, &ExtractionResult)> = outcomes.iter().map(|(_, rule, result)| (*rule, result)).collect();
    let path = storage.path_for(stem, "_annotated.html");
    if let Err(e) = utils::html_debug::create_debug_html(text, &path, &pairs) {
        tracing::warn!("Failed to create debug HTML: {}", e);
    }
}
