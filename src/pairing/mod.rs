//! Request/response correlation by shared identifier

pub mod correlator;
pub mod pair;

pub use correlator::{
    CorrelationOutcome, CorrelationStats, OrphanResponse, PairCorrelator, UnmatchedRequest,
};
pub use pair::RequestResponsePair;
