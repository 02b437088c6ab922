//! promptpair - request/response pair extraction from chat-completion logs
//!
//! A game talks to a language model through a chat-completion endpoint and
//! logs every request and response. This library turns those raw logs into a
//! dataset: each request is classified into a prompt type, paired with its
//! response by identifier, and both payloads are stored under that type.
//!
//! # Core Concepts
//!
//! - **Signature**: the literal instruction fragments ("markers") every
//!   rendered prompt of one type repeats, derived from sample templates
//! - **Classification**: scoring a request against every signature and
//!   picking the best match above a threshold, or `unknown`
//! - **Correlation**: matching a response to the pending request with the
//!   same identifier
//!
//! # Example Usage
//!
//! ```no_run
//! use promptpair::{discover_logs, HarvestConfig, Pipeline};
//!
//! let config = HarvestConfig::default();
//! let logs = discover_logs(&config.log_dirs);
//!
//! let pipeline = Pipeline::load(
//!     &config.types_dir,
//!     config.variants_file.as_deref(),
//!     config.classifier_config(),
//!     &config.output_dir,
//! )?;
//! let summary = pipeline.run(&logs.files)?;
//! println!("{} pairs written", summary.total_pairs_written());
//! # Ok::<(), promptpair::PipelineError>(())
//! ```
//!
//! # Project Structure
//!
//! - [`signature`]: signature derivation from templates and artifact storage
//! - [`classify`]: request classification against a signature set
//! - [`logstream`]: log record parsing and streaming
//! - [`pairing`]: request/response correlation
//! - [`output`]: pair files and the timing report
//! - [`pipeline`]: the end-to-end extraction run

pub mod classify;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod logstream;
pub mod output;
pub mod pairing;
pub mod pipeline;
pub mod progress;
pub mod prompt;
pub mod signature;
pub mod util;

// Re-export key types for convenient access
pub use classify::{AmbiguousMatch, Classification, ClassifierConfig, RequestClassifier};
pub use config::{ConfigError, HarvestConfig};
pub use discovery::{discover_logs, DiscoveredLogs, LogFile, LogKind};
pub use logstream::{LogRecord, LogStreamReader, ParseError, Role};
pub use output::{PairWriter, TimingReport, WriteError};
pub use pairing::{OrphanResponse, PairCorrelator, RequestResponsePair, UnmatchedRequest};
pub use pipeline::{Pipeline, PipelineError, RunSummary};
pub use prompt::PromptType;
pub use signature::{
    BuildError, PromptTypeSignature, SignatureBuilder, SignatureSet, SignatureStore, StoreError,
};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
