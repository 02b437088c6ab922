//! Output formatting for multiple formats
//!
//! Summaries are printed to stdout as JSON, YAML or human-readable text.
//!
//! # Example
//!
//! ```no_run
//! use promptpair::cli::output::{OutputFormat, OutputFormatter};
//! use promptpair::pipeline::RunSummary;
//!
//! let formatter = OutputFormatter::new(OutputFormat::Json);
//! let output = formatter.format_run(&RunSummary::default()).unwrap();
//! println!("{}", output);
//! ```

use anyhow::{Context, Result};
use std::path::Path;

use crate::classify::Classification;
use crate::config::HarvestConfig;
use crate::pipeline::RunSummary;
use crate::signature::BuildSummary;

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the result of a signature build
    pub fn format_build(&self, summary: &BuildSummary) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(summary)
                .context("Failed to serialize build summary to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(summary).context("Failed to serialize build summary to YAML")
            }
            OutputFormat::Human => Ok(self.format_build_human(summary)),
        }
    }

    /// Formats the end-of-run summary of an extraction
    pub fn format_run(&self, summary: &RunSummary) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(summary)
                .context("Failed to serialize run summary to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(summary).context("Failed to serialize run summary to YAML")
            }
            OutputFormat::Human => Ok(self.format_run_human(summary)),
        }
    }

    /// Formats the classification of a single file
    pub fn format_classification(
        &self,
        file: &Path,
        classification: &Classification,
    ) -> Result<String> {
        let output = serde_json::json!({
            "file": file,
            "prompt_type": classification.prompt_type,
            "score": classification.score,
            "method": classification.method,
            "ambiguity": classification.ambiguity,
        });

        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&output)
                .context("Failed to serialize classification to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(&output).context("Failed to serialize classification to YAML")
            }
            OutputFormat::Human => Ok(self.format_classification_human(file, classification)),
        }
    }

    /// Formats configuration display
    pub fn format_config(&self, config: &HarvestConfig) -> Result<String> {
        let config_map: std::collections::BTreeMap<_, _> =
            config.to_display_map().into_iter().collect();
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&config_map)
                .context("Failed to serialize config to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(&config_map).context("Failed to serialize config to YAML")
            }
            OutputFormat::Human => Ok(config.to_string()),
        }
    }

    fn format_build_human(&self, summary: &BuildSummary) -> String {
        let mut output = String::new();

        if summary.failed.is_empty() {
            output.push_str("\u{2713} Signature Build\n");
        } else {
            output.push_str("\u{26A0} Signature Build (Incomplete)\n");
        }
        output.push_str(RULE);
        output.push_str("\n\n");

        output.push_str(&format!("Built: {}\n", summary.built.len()));
        for entry in &summary.built {
            output.push_str(&format!(
                "  {:<28} {} markers from {} samples\n",
                entry.prompt_type, entry.markers, entry.samples
            ));
        }

        if !summary.failed.is_empty() {
            output.push_str(&format!("\nFailed: {}\n", summary.failed.len()));
            for entry in &summary.failed {
                match entry.prompt_type {
                    Some(prompt_type) => {
                        output.push_str(&format!("  - {}: {}\n", prompt_type, entry.reason))
                    }
                    None => output.push_str(&format!("  - {}\n", entry.reason)),
                }
            }
        }

        output
    }

    fn format_run_human(&self, summary: &RunSummary) -> String {
        let mut output = String::new();

        if summary.has_warnings() {
            output.push_str("\u{26A0} Extraction Complete (with warnings)\n");
        } else {
            output.push_str("\u{2713} Extraction Complete\n");
        }
        output.push_str(RULE);
        output.push_str("\n\n");

        output.push_str(&format!("Log files:     {}\n", summary.log_files));
        output.push_str(&format!("Records:       {}\n", summary.records));
        output.push_str(&format!("\u{251C}\u{2500} Requests:  {}\n", summary.requests));
        output.push_str(&format!("\u{2514}\u{2500} Responses: {}\n\n", summary.responses));

        output.push_str(&format!(
            "Pairs written: {}\n",
            summary.total_pairs_written()
        ));
        for (prompt_type, count) in &summary.pairs_written {
            output.push_str(&format!("  {:<28} {}\n", prompt_type, count));
        }

        let issues = [
            ("Unreadable files", summary.unreadable_files),
            ("Interrupted reads", summary.read_errors),
            ("Malformed records", summary.parse_errors),
            ("Ambiguous matches", summary.ambiguous_matches),
            ("Duplicate requests", summary.duplicate_requests),
            ("Write errors", summary.write_errors),
            ("Unmatched requests", summary.unmatched_requests.len()),
            ("Orphan responses", summary.orphan_responses.len()),
            ("Unusable signatures", summary.signature_failures.len()),
            ("Types without signatures", summary.missing_signatures.len()),
        ];
        if issues.iter().any(|(_, count)| *count > 0) {
            output.push_str("\n\u{26A0} Warnings:\n");
            for (label, count) in issues.iter().filter(|(_, count)| *count > 0) {
                output.push_str(&format!("  - {}: {}\n", label, count));
            }
        }

        for failure in &summary.signature_failures {
            output.push_str(&format!("\n\u{2717} {}", failure));
        }
        if !summary.signature_failures.is_empty() {
            output.push('\n');
        }

        if !summary.missing_signatures.is_empty() {
            let names: Vec<&str> = summary
                .missing_signatures
                .iter()
                .map(|t| t.as_str())
                .collect();
            output.push_str(&format!("\nNo signature: {}\n", names.join(", ")));
        }

        if !summary.unmatched_requests.is_empty() {
            output.push_str(&format!(
                "\nUnmatched: {}\n",
                summary.unmatched_requests.join(", ")
            ));
        }

        if let Some(ref path) = summary.timing_report {
            output.push_str(&format!("\nTiming report: {}\n", path.display()));
        }

        output
    }

    fn format_classification_human(&self, file: &Path, classification: &Classification) -> String {
        let mut output = format!(
            "{}: {} (score {:.2}, {})\n",
            file.display(),
            classification.prompt_type,
            classification.score,
            classification.method
        );
        if let Some(ref ambiguity) = classification.ambiguity {
            output.push_str(&format!("\u{26A0} {}\n", ambiguity));
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::MatchMethod;
    use crate::prompt::PromptType;
    use crate::signature::builder::{BuiltEntry, FailedEntry};
    use std::path::PathBuf;

    fn run_summary() -> RunSummary {
        let mut summary = RunSummary {
            log_files: 2,
            records: 3,
            requests: 2,
            responses: 1,
            unmatched_requests: vec!["7".to_string()],
            ..Default::default()
        };
        summary.pairs_written.insert(PromptType::EvaluateMood, 1);
        summary
    }

    #[test]
    fn test_run_summary_json() {
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let output = formatter.format_run(&run_summary()).unwrap();

        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["pairs_written"]["evaluate_mood"], 1);
        assert_eq!(value["unmatched_requests"][0], "7");
        assert!(value.get("timing_report").is_none());
    }

    #[test]
    fn test_run_summary_yaml() {
        let formatter = OutputFormatter::new(OutputFormat::Yaml);
        let output = formatter.format_run(&run_summary()).unwrap();

        assert!(output.contains("evaluate_mood: 1"));
        assert!(output.contains("records: 3"));
    }

    #[test]
    fn test_run_summary_human() {
        let formatter = OutputFormatter::new(OutputFormat::Human);
        let output = formatter.format_run(&run_summary()).unwrap();

        assert!(output.contains("Extraction Complete (with warnings)"));
        assert!(output.contains("Pairs written: 1"));
        assert!(output.contains("evaluate_mood"));
        assert!(output.contains("Unmatched requests: 1"));
        assert!(output.contains("Unmatched: 7"));
    }

    #[test]
    fn test_clean_run_has_no_warnings_section() {
        let formatter = OutputFormatter::new(OutputFormat::Human);
        let output = formatter.format_run(&RunSummary::default()).unwrap();

        assert!(output.starts_with("\u{2713} Extraction Complete\n"));
        assert!(!output.contains("Warnings"));
    }

    #[test]
    fn test_signature_problems_human() {
        let summary = RunSummary {
            signature_failures: vec![
                "invalid signature artifact prompt_types/evaluate_mood.json".to_string(),
            ],
            missing_signatures: vec![PromptType::EvaluateMood, PromptType::PlayerThoughts],
            ..Default::default()
        };

        let output = OutputFormatter::new(OutputFormat::Human)
            .format_run(&summary)
            .unwrap();
        assert!(output.contains("(with warnings)"));
        assert!(output.contains("Unusable signatures: 1"));
        assert!(output.contains("Types without signatures: 2"));
        assert!(output.contains("evaluate_mood.json"));
        assert!(output.contains("No signature: evaluate_mood, player_thoughts"));
    }

    #[test]
    fn test_build_summary_human() {
        let summary = BuildSummary {
            built: vec![BuiltEntry {
                prompt_type: PromptType::EvaluateMood,
                markers: 3,
                samples: 2,
            }],
            failed: vec![FailedEntry {
                prompt_type: Some(PromptType::DialogueResponse),
                reason: "no samples".to_string(),
            }],
        };

        let output = OutputFormatter::new(OutputFormat::Human)
            .format_build(&summary)
            .unwrap();
        assert!(output.contains("(Incomplete)"));
        assert!(output.contains("3 markers from 2 samples"));
        assert!(output.contains("- dialogue_response: no samples"));
    }

    #[test]
    fn test_classification_formats() {
        let classification = Classification {
            prompt_type: PromptType::EvaluateMood,
            score: 1.0,
            method: MatchMethod::Markers,
            ambiguity: None,
        };
        let file = PathBuf::from("prompt.txt");

        let human = OutputFormatter::new(OutputFormat::Human)
            .format_classification(&file, &classification)
            .unwrap();
        assert_eq!(human, "prompt.txt: evaluate_mood (score 1.00, markers)\n");

        let json = OutputFormatter::new(OutputFormat::Json)
            .format_classification(&file, &classification)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["prompt_type"], "evaluate_mood");
        assert_eq!(value["method"], "markers");
    }
}
