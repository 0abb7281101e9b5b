use thiserror::Error;

use potreg_core::errors::CoreError;
use potreg_core::models::Region;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Candidate regions must be sorted and disjoint, found {0} before {1}")]
    UnsortedRegions(String, String),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(String),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to load reads for {region} from {source_name}: {reason}")]
    LoadFailed {
        source_name: String,
        region: String,
        reason: String,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}

///
/// A section of a chromosome that could not be scanned. Its reads are
/// neither scanned nor tallied; the rest of the scan carries on.
///
#[derive(Debug, Clone)]
pub struct ChunkFailure {
    pub region: Region,
    pub reason: String,
}
