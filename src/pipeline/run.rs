use super::summary::RunSummary;
use crate::classify::{ClassifierConfig, RequestClassifier, VariantsError, VariantsFile};
use crate::discovery::LogFile;
use crate::logstream::{LogStreamReader, ReadError, Role};
use crate::output::{PairWriter, TimingCollector, WriteError};
use crate::pairing::PairCorrelator;
use crate::prompt::PromptType;
use crate::progress::{ProgressEvent, ProgressHandler};
use crate::signature::{SignatureStore, StoreError};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Conditions that stop a run before any output is produced
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no input log files")]
    NoInput,

    #[error("output root {path} is not writable: {source}")]
    OutputRoot {
        path: PathBuf,
        #[source]
        source: WriteError,
    },

    #[error("failed to load signatures: {0}")]
    Signatures(#[from] StoreError),

    #[error(transparent)]
    Variants(#[from] VariantsError),
}

/// Classifies, pairs and stores every record of a set of log files.
///
/// Stages run in a fixed order over one pass of the logs: read, classify
/// requests, correlate, write completed pairs, report leftovers, write the
/// timing report.
pub struct Pipeline {
    classifier: RequestClassifier,
    writer: PairWriter,
    progress_handler: Option<Box<dyn ProgressHandler>>,

    /// Artifacts that could not be loaded, as error messages
    signature_failures: Vec<String>,

    /// Known types left without a usable signature
    missing_signatures: Vec<PromptType>,
}

impl Pipeline {
    pub fn new(classifier: RequestClassifier, writer: PairWriter) -> Self {
        Self {
            classifier,
            writer,
            progress_handler: None,
            signature_failures: Vec::new(),
            missing_signatures: Vec::new(),
        }
    }

    /// Builds a pipeline from a signature directory, an optional variants
    /// file and an output root.
    pub fn load(
        types_dir: &Path,
        variants_file: Option<&Path>,
        mut config: ClassifierConfig,
        output_root: impl Into<PathBuf>,
    ) -> Result<Self, PipelineError> {
        let loaded = SignatureStore::new(types_dir).load_all()?;
        let mut signatures = loaded.signatures;

        if let Some(path) = variants_file {
            VariantsFile::load(path)?.apply(&mut signatures, &mut config);
        }

        if signatures.is_empty() {
            warn!(
                dir = %types_dir.display(),
                "No usable signatures; every request will be classified as unknown"
            );
        }

        let missing_signatures: Vec<PromptType> = PromptType::known()
            .filter(|prompt_type| signatures.get(*prompt_type).is_none())
            .collect();
        let signature_failures: Vec<String> =
            loaded.failures.iter().map(ToString::to_string).collect();

        let mut pipeline = Self::new(
            RequestClassifier::new(signatures, config),
            PairWriter::new(output_root),
        );
        pipeline.signature_failures = signature_failures;
        pipeline.missing_signatures = missing_signatures;
        Ok(pipeline)
    }

    pub fn with_progress(mut self, handler: impl ProgressHandler + 'static) -> Self {
        self.progress_handler = Some(Box::new(handler));
        self
    }

    pub fn classifier(&self) -> &RequestClassifier {
        &self.classifier
    }

    pub fn writer(&self) -> &PairWriter {
        &self.writer
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(handler) = &self.progress_handler {
            handler.on_progress(&event);
        }
    }

    /// Runs over `log_files` in the given order.
    ///
    /// Only an empty file list or an unwritable output root fail the run;
    /// everything else is counted in the returned summary.
    pub fn run(&self, log_files: &[LogFile]) -> Result<RunSummary, PipelineError> {
        let result = self.run_inner(log_files);
        if let Err(e) = &result {
            self.emit(ProgressEvent::Failed {
                error: e.to_string(),
            });
        }
        result
    }

    fn run_inner(&self, log_files: &[LogFile]) -> Result<RunSummary, PipelineError> {
        let start = Instant::now();
        if log_files.is_empty() {
            return Err(PipelineError::NoInput);
        }

        self.writer
            .prepare()
            .map_err(|source| PipelineError::OutputRoot {
                path: self.writer.root().to_path_buf(),
                source,
            })?;

        self.emit(ProgressEvent::Started {
            log_files: log_files.len(),
            signatures: self.classifier.signatures().len(),
        });

        let mut summary = RunSummary {
            log_files: log_files.len(),
            signature_failures: self.signature_failures.clone(),
            missing_signatures: self.missing_signatures.clone(),
            ..Default::default()
        };
        let mut correlator = PairCorrelator::new();
        let mut timing = TimingCollector::new();
        let mut reader = LogStreamReader::new(log_files.iter().cloned());

        for item in reader.by_ref() {
            let record = match item {
                Ok(record) => record,
                Err(ReadError::Parse(e)) => {
                    warn!(error = %e, "Skipping malformed record");
                    summary.parse_errors += 1;
                    continue;
                }
                Err(e @ ReadError::Io { .. }) => {
                    warn!(error = %e, "Skipping unreadable log file");
                    summary.unreadable_files += 1;
                    continue;
                }
                Err(e @ ReadError::Interrupted { .. }) => {
                    warn!(error = %e, "Log file read stopped early");
                    summary.read_errors += 1;
                    continue;
                }
            };
            summary.records += 1;

            match record.role {
                Role::Request => {
                    summary.requests += 1;
                    let classified = self.classifier.classify_record(record);
                    if classified.ambiguous {
                        summary.ambiguous_matches += 1;
                    }
                    summary.count_classified(classified.prompt_type);
                    if correlator.observe_request(classified).is_some() {
                        summary.duplicate_requests += 1;
                    }
                }
                Role::Response => {
                    summary.responses += 1;
                    let pair = match correlator.observe_response(record) {
                        Ok(pair) => pair,
                        Err(orphan) => {
                            summary.orphan_responses.push(orphan.id);
                            continue;
                        }
                    };

                    match self.writer.write(&pair) {
                        Ok(_) => {
                            summary.count_written(pair.prompt_type());
                            timing.record(&pair);
                            self.emit(ProgressEvent::PairWritten {
                                id: pair.id().to_string(),
                                prompt_type: pair.prompt_type(),
                            });
                        }
                        Err(e) => {
                            warn!(id = %pair.id(), error = %e, "Failed to write pair");
                            summary.write_errors += 1;
                            self.emit(ProgressEvent::WriteFailed {
                                id: pair.id().to_string(),
                                error: e.to_string(),
                            });
                        }
                    }
                }
            }
        }

        debug!(stats = ?reader.stats(), "Finished reading logs");

        let outcome = correlator.finish();
        summary.unmatched_requests = outcome.unmatched.into_iter().map(|u| u.id).collect();

        match timing.write(self.writer.root()) {
            Ok(path) => summary.timing_report = Some(path),
            Err(e) => {
                warn!(error = %e, "Failed to write timing report");
                summary.write_errors += 1;
            }
        }

        info!(
            records = summary.records,
            pairs = summary.total_pairs_written(),
            unmatched = summary.unmatched_requests.len(),
            orphans = summary.orphan_responses.len(),
            parse_errors = summary.parse_errors,
            "Run complete"
        );
        self.emit(ProgressEvent::Completed {
            pairs_written: summary.total_pairs_written(),
            unmatched: summary.unmatched_requests.len(),
            total_time: start.elapsed(),
        });

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::LogKind;
    use crate::signature::{PromptTypeSignature, SignatureSet};
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    struct RecordingHandler {
        events: Arc<Mutex<Vec<String>>>,
    }

    impl ProgressHandler for RecordingHandler {
        fn on_progress(&self, event: &ProgressEvent) {
            let name = match event {
                ProgressEvent::Started { .. } => "started",
                ProgressEvent::PairWritten { .. } => "pair",
                ProgressEvent::WriteFailed { .. } => "write_failed",
                ProgressEvent::Completed { .. } => "completed",
                ProgressEvent::Failed { .. } => "failed",
            };
            self.events.lock().unwrap().push(name.to_string());
        }
    }

    fn pipeline(root: &Path) -> Pipeline {
        let signatures: SignatureSet = vec![PromptTypeSignature::new(
            PromptType::EvaluateMood,
            vec!["you are an ai mood analyzer".to_string()],
        )]
        .into_iter()
        .collect();
        Pipeline::new(
            RequestClassifier::new(signatures, ClassifierConfig::default()),
            PairWriter::new(root),
        )
    }

    #[test]
    fn test_empty_input_is_fatal() {
        let dir = TempDir::new().unwrap();
        let events = Arc::new(Mutex::new(Vec::new()));
        let result = pipeline(dir.path())
            .with_progress(RecordingHandler {
                events: events.clone(),
            })
            .run(&[]);

        assert!(matches!(result, Err(PipelineError::NoInput)));
        assert_eq!(*events.lock().unwrap(), vec!["failed"]);
    }

    #[test]
    fn test_unwritable_output_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("data");
        fs::write(&blocker, "not a directory").unwrap();
        let log = dir.path().join("openrouter_input.log");
        fs::write(&log, "").unwrap();

        let result = pipeline(&blocker).run(&[LogFile::new(log, LogKind::Request)]);
        assert!(matches!(result, Err(PipelineError::OutputRoot { .. })));
    }

    #[test]
    fn test_run_pairs_and_reports_progress() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("openrouter_input.log");
        fs::write(
            &input,
            "[2024-01-15 10:30:45.000] Generate chat completion [42]:\n\
             {\"messages\": [{\"role\": \"system\", \"content\": \"You are an AI mood analyzer.\"}]}\n",
        )
        .unwrap();
        let output = dir.path().join("openrouter_output.log");
        fs::write(
            &output,
            "[2024-01-15 10:30:46.000] Generate chat completion response [42]:\nContent\n",
        )
        .unwrap();
        let logs = [
            LogFile::new(input, LogKind::Request),
            LogFile::new(output, LogKind::Response),
        ];

        let events = Arc::new(Mutex::new(Vec::new()));
        let summary = pipeline(&dir.path().join("data"))
            .with_progress(RecordingHandler {
                events: events.clone(),
            })
            .run(&logs)
            .unwrap();

        assert_eq!(summary.pairs_written_for(PromptType::EvaluateMood), 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("data/response/evaluate_mood/42")).unwrap(),
            "Content"
        );
        assert_eq!(
            *events.lock().unwrap(),
            vec!["started", "pair", "completed"]
        );
    }

    #[test]
    fn test_load_requires_signature_directory() {
        let dir = TempDir::new().unwrap();
        let result = Pipeline::load(
            &dir.path().join("missing"),
            None,
            ClassifierConfig::default(),
            dir.path().join("data"),
        );
        assert!(matches!(
            result,
            Err(PipelineError::Signatures(StoreError::MissingDirectory(_)))
        ));
    }

    #[test]
    fn test_load_reports_unusable_signatures() {
        let dir = TempDir::new().unwrap();
        let store = SignatureStore::new(dir.path().join("types"));
        store
            .save(
                &PromptTypeSignature::new(
                    PromptType::PlayerThoughts,
                    vec!["you are the player".to_string()],
                ),
                "",
            )
            .unwrap();
        fs::write(store.artifact_path(PromptType::EvaluateMood), "{ not json").unwrap();

        let pipeline = Pipeline::load(
            store.dir(),
            None,
            ClassifierConfig::default(),
            dir.path().join("data"),
        )
        .unwrap();

        assert_eq!(pipeline.signature_failures.len(), 1);
        assert!(pipeline.signature_failures[0].contains("evaluate_mood.json"));
        assert!(pipeline
            .missing_signatures
            .contains(&PromptType::EvaluateMood));
        assert!(!pipeline
            .missing_signatures
            .contains(&PromptType::PlayerThoughts));
    }
}
