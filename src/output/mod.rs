//! Persistence of completed pairs and their timing

pub mod timing;
pub mod writer;

pub use timing::{TimingCollector, TimingEntry, TimingReport, TypeTiming, TIMING_REPORT_FILE};
pub use writer::{validate_identifier, PairWriter, WriteError, WrittenPair};
