//! Subcommand handlers
//!
//! Each handler returns the process exit code: 0 on success, 1 on a fatal
//! error. Recoverable conditions are reported in the printed summary.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use super::commands::{ClassifyArgs, ExtractArgs, SignaturesArgs};
use super::output::{OutputFormat, OutputFormatter};
use crate::classify::{ClassifierConfig, RequestClassifier, VariantsFile};
use crate::config::HarvestConfig;
use crate::discovery::discover_logs;
use crate::logstream::parser::extract_request_payload;
use crate::pipeline::Pipeline;
use crate::progress::LoggingHandler;
use crate::signature::{collect_samples, BuilderConfig, SignatureBuilder, SignatureStore};

pub fn handle_signatures(args: &SignaturesArgs, quiet: bool) -> i32 {
    report(run_signatures(args, quiet))
}

pub fn handle_extract(args: &ExtractArgs, quiet: bool) -> i32 {
    report(run_extract(args, quiet))
}

pub fn handle_classify(args: &ClassifyArgs) -> i32 {
    report(run_classify(args))
}

fn report(result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

fn load_config(apply: impl FnOnce(&mut HarvestConfig)) -> Result<HarvestConfig> {
    let mut config = HarvestConfig::default();
    apply(&mut config);
    config.validate().context("Invalid configuration")?;
    debug!(config = ?config.to_display_map(), "Effective configuration");
    Ok(config)
}

fn override_path(target: &mut PathBuf, value: &Option<PathBuf>) {
    if let Some(path) = value {
        *target = path.clone();
    }
}

fn run_signatures(args: &SignaturesArgs, quiet: bool) -> Result<()> {
    let config = load_config(|config| {
        override_path(&mut config.prompts_dir, &args.prompts_dir);
        override_path(&mut config.types_dir, &args.types_dir);
        if args.exceptions_file.is_some() {
            config.exceptions_file = args.exceptions_file.clone();
        }
    })?;

    let samples = collect_samples(&config.prompts_dir).with_context(|| {
        format!(
            "Failed to collect prompt samples from {}",
            config.prompts_dir.display()
        )
    })?;

    let mut builder_config = BuilderConfig::default();
    if let Some(ref path) = config.exceptions_file {
        builder_config = builder_config
            .with_exceptions_file(path)
            .context("Failed to load exceptions file")?;
    }

    let report = SignatureBuilder::new(builder_config).build_all(&samples);
    for failure in &report.failures {
        warn!(error = %failure, "Signature not built");
    }

    let store = SignatureStore::new(&config.types_dir);
    let saved = store
        .save_report(&report)
        .context("Failed to write signature artifacts")?;
    info!(
        written = saved.written.len(),
        removed = saved.removed.len(),
        dir = %config.types_dir.display(),
        "Wrote signature artifacts"
    );

    if !quiet {
        let formatter = OutputFormatter::new(args.format.into());
        println!("{}", formatter.format_build(&report.summary())?);
    }

    if report.built.is_empty() {
        anyhow::bail!(
            "No signatures could be built from {}",
            config.prompts_dir.display()
        );
    }
    Ok(())
}

fn run_extract(args: &ExtractArgs, quiet: bool) -> Result<()> {
    let config = load_config(|config| {
        if !args.log_dirs.is_empty() {
            config.log_dirs = args.log_dirs.clone();
        }
        override_path(&mut config.output_dir, &args.output_dir);
        override_path(&mut config.types_dir, &args.types_dir);
        if args.variants_file.is_some() {
            config.variants_file = args.variants_file.clone();
        }
        if let Some(min_confidence) = args.min_confidence {
            config.min_confidence = min_confidence;
        }
    })?;

    let logs = discover_logs(&config.log_dirs);
    let pipeline = Pipeline::load(
        &config.types_dir,
        config.variants_file.as_deref(),
        config.classifier_config(),
        &config.output_dir,
    )
    .context("Failed to set up extraction")?
    .with_progress(LoggingHandler);

    let summary = pipeline.run(&logs.files).with_context(|| {
        format!(
            "Extraction failed (searched {})",
            config
                .log_dirs
                .iter()
                .map(|d| d.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )
    })?;

    if !quiet {
        let formatter = OutputFormatter::new(args.format.into());
        println!("{}", formatter.format_run(&summary)?);
    }
    Ok(())
}

fn run_classify(args: &ClassifyArgs) -> Result<()> {
    let config = load_config(|config| {
        override_path(&mut config.types_dir, &args.types_dir);
        if args.variants_file.is_some() {
            config.variants_file = args.variants_file.clone();
        }
        if let Some(min_confidence) = args.min_confidence {
            config.min_confidence = min_confidence;
        }
    })?;

    let classifier = load_classifier(&config, config.classifier_config())?;

    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let text = String::from_utf8_lossy(&bytes);
    let prompt = extract_request_payload(&text).unwrap_or_else(|_| text.to_string());

    let classification = classifier.classify(&prompt);
    let format: OutputFormat = args.format.into();
    println!(
        "{}",
        OutputFormatter::new(format).format_classification(&args.file, &classification)?
    );
    Ok(())
}

fn load_classifier(
    config: &HarvestConfig,
    mut classifier_config: ClassifierConfig,
) -> Result<RequestClassifier> {
    let loaded = SignatureStore::new(&config.types_dir)
        .load_all()
        .context("Failed to load signatures")?;
    let mut signatures = loaded.signatures;

    if let Some(ref path) = config.variants_file {
        VariantsFile::load(path)
            .context("Failed to load variants file")?
            .apply(&mut signatures, &mut classifier_config);
    }

    Ok(RequestClassifier::new(signatures, classifier_config))
}
