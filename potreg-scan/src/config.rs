use serde::{Deserialize, Serialize};

use potreg_core::models::Region;

use crate::consts::*;
use crate::errors::ScanError;

///
/// Tunables for a potential region scan. Every field has a default, so a
/// TOML config file only needs to name what it changes.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub bin_width: u32,
    pub window_extension: Option<u32>,
    pub bin_step: u32,
    pub max_section: u32,
    pub max_analysis_window: u32,
    pub preferred_split_length: Option<u32>,
    pub max_threads: usize,
    pub cache_all_data: bool,
    pub log_confidence: f64,
    pub local_background_windows: Vec<u32>,
    pub mappable_genome_prop: f64,
    pub stranded: bool,
    pub progress: bool,
    pub regions_to_ignore: Vec<Region>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            bin_width: DEFAULT_BIN_WIDTH,
            window_extension: None,
            bin_step: DEFAULT_BIN_STEP,
            max_section: DEFAULT_MAX_SECTION,
            max_analysis_window: DEFAULT_MAX_ANALYSIS_WINDOW,
            preferred_split_length: None,
            max_threads: DEFAULT_MAX_THREADS,
            cache_all_data: true,
            log_confidence: DEFAULT_LOG_CONFIDENCE,
            local_background_windows: vec![DEFAULT_LOCAL_WINDOW],
            mappable_genome_prop: DEFAULT_MAPPABLE_GENOME_PROP,
            stranded: false,
            progress: false,
            regions_to_ignore: Vec::new(),
        }
    }
}

impl ScanConfig {
    pub fn validate(&self) -> Result<(), ScanError> {
        let invalid = |msg: String| Err(ScanError::InvalidConfig(msg));

        if self.bin_width == 0 {
            return invalid("bin_width must be positive".to_string());
        }
        if self.bin_step == 0 {
            return invalid("bin_step must be positive".to_string());
        }
        if self.max_analysis_window == 0 {
            return invalid("max_analysis_window must be positive".to_string());
        }
        if self.max_threads == 0 {
            return invalid("max_threads must be positive".to_string());
        }
        if self.expansion() == 0 {
            return invalid("window extension plus half the bin width must be positive".to_string());
        }
        let min_section = 2 * (self.bin_width as u64 + self.expansion() as u64);
        if (self.max_section as u64) < min_section {
            return invalid(format!(
                "max_section ({}) must be at least {}",
                self.max_section, min_section
            ));
        }
        // the split band must hold at least one bin position
        if self.effective_bin_step() >= 2 * SPLIT_TOLERANCE {
            return invalid(format!(
                "bin step ({}) must be below {}",
                self.effective_bin_step(),
                2 * SPLIT_TOLERANCE
            ));
        }
        if self.preferred_split_length() <= SPLIT_TOLERANCE {
            return invalid(format!(
                "preferred split length ({}) must exceed {}",
                self.preferred_split_length(),
                SPLIT_TOLERANCE
            ));
        }
        if !(self.mappable_genome_prop > 0.0 && self.mappable_genome_prop <= 1.0) {
            return invalid(format!(
                "mappable_genome_prop ({}) must lie in (0, 1]",
                self.mappable_genome_prop
            ));
        }
        if !self.log_confidence.is_finite() || self.log_confidence >= 0.0 {
            return invalid(format!(
                "log_confidence ({}) must be a negative log10 p-value",
                self.log_confidence
            ));
        }
        if self.local_background_windows.contains(&0) {
            return invalid("local background windows must be positive".to_string());
        }

        Ok(())
    }

    pub fn window_extension(&self) -> u32 {
        self.window_extension.unwrap_or(self.bin_width / 2)
    }

    /// Distance a passing bin reaches on either side of its position.
    pub fn expansion(&self) -> u32 {
        self.window_extension().saturating_add(self.bin_width / 2)
    }

    /// The configured step, never more than half a bin.
    pub fn effective_bin_step(&self) -> u32 {
        self.bin_step.min((self.bin_width / 2).max(1))
    }

    /// Reads loaded past the end of a section so bins near its end see their whole footprint.
    pub fn overhang(&self) -> u32 {
        self.expansion().max(self.bin_width)
    }

    /// Reads loaded before the start of a section, a whole number of bin steps.
    pub fn lookback(&self) -> u32 {
        let step = self.effective_bin_step();
        ((self.bin_width / 2).div_ceil(step) + 1) * step
    }

    pub fn preferred_split_length(&self) -> u32 {
        self.preferred_split_length
            .unwrap_or(self.max_analysis_window)
    }

    /// Chromosomes can only be spread over several workers when all reads are cached.
    pub fn worker_count(&self) -> usize {
        if self.cache_all_data {
            self.max_threads
        } else {
            1
        }
    }
}
