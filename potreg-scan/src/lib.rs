//! # Potential region scanning
//!
//! Finds the minimal set of genomic intervals that could contain enriched
//! signal, so that downstream event calling only has to look there.
//!
//! Each chromosome is cut into large sections. Within a section, reads are
//! binned into a landscape and every bin is tested against genome-wide and
//! local Poisson backgrounds; passing bins grow into candidate windows,
//! over-long windows are split at quiet points, and every read is tallied as
//! falling inside or outside a window.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use potreg_core::models::Genome;
//! use potreg_scan::{CachedReadSource, Condition, PotentialRegionFilter, ScanConfig};
//!
//! let genome = Genome::from_chrom_sizes("hg38.chrom.sizes").unwrap();
//! let mut condition = Condition::new("ctcf");
//! condition.add_signal(Arc::new(CachedReadSource::from_bed("rep1", "rep1.bed.gz", false).unwrap()));
//!
//! let mut filter = PotentialRegionFilter::new(ScanConfig::default(), genome, vec![condition]).unwrap();
//! let regions = filter.execute().unwrap();
//! ```
pub mod background;
pub mod config;
pub mod consts;
pub mod counter;
pub mod errors;
pub mod exclude;
pub mod filter;
pub mod landscape;
pub mod scanner;
pub mod source;
pub mod splitter;

// re-export for cleaner imports
pub use self::background::{BackgroundCollection, BackgroundModel, PoissonBackgroundModel};
pub use self::config::ScanConfig;
pub use self::errors::{ChunkFailure, ScanError, SourceError};
pub use self::filter::PotentialRegionFilter;
pub use self::source::{CachedReadSource, Channel, Condition, ReadSource};
