//! Count thresholds a bin must clear to be considered potentially enriched.

pub mod poisson;

use std::fmt::Debug;

use log::debug;

use potreg_core::models::{Region, Strand};

use crate::config::ScanConfig;
use crate::consts::MIN_SIGNAL_LOCAL_WINDOW;
use crate::source::Condition;

pub use self::poisson::{PoissonBackgroundModel, poisson_count_threshold};

pub trait BackgroundModel: Send + Sync + Debug {
    fn is_genome_wide(&self) -> bool;

    /// `None` applies to both strands.
    fn strand(&self) -> Option<Strand>;

    fn count_threshold(&self) -> u32;

    fn passes_threshold(&self, count: u32) -> bool {
        count > self.count_threshold()
    }

    ///
    /// Re-estimate the model around `offset`, a position relative to the
    /// start of `region`. The start arrays are indexed by bin of `bin_step`.
    /// Genome-wide models ignore this.
    ///
    fn update_model(
        &mut self,
        region: &Region,
        offset: u32,
        signal_starts: &[f64],
        control_starts: Option<&[f64]>,
        bin_step: u32,
    );

    fn clone_box(&self) -> Box<dyn BackgroundModel>;
}

impl Clone for Box<dyn BackgroundModel> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

fn applies_to(model_strand: Option<Strand>, strand: Option<Strand>) -> bool {
    match (model_strand, strand) {
        (None, _) => true,
        (Some(m), Some(s)) => m == s,
        (Some(_), None) => false,
    }
}

///
/// All background models of one condition. Local models carry per-bin
/// state, so each worker scans with its own clone.
///
#[derive(Debug, Clone, Default)]
pub struct BackgroundCollection {
    models: Vec<Box<dyn BackgroundModel>>,
}

impl BackgroundCollection {
    pub fn new() -> Self {
        Self::default()
    }

    ///
    /// One genome-wide model from the condition's signal, plus a local model
    /// per configured window: control-based when the condition has
    /// controls, otherwise signal-based and only for wide windows.
    ///
    pub fn for_condition(condition: &Condition, config: &ScanConfig, genome_length: u64) -> Self {
        let mut collection = BackgroundCollection::new();
        let signal_total = condition.total_signal_weight();

        collection.add_background_model(Box::new(PoissonBackgroundModel::genome_wide(
            config.log_confidence,
            signal_total,
            genome_length,
            config.mappable_genome_prop,
            config.bin_width,
        )));

        for &window in &config.local_background_windows {
            if condition.has_controls() {
                collection.add_background_model(Box::new(PoissonBackgroundModel::local(
                    window,
                    config.log_confidence,
                    condition.total_control_weight(),
                    genome_length,
                    config.mappable_genome_prop,
                    config.bin_width,
                    false,
                )));
            } else if window >= MIN_SIGNAL_LOCAL_WINDOW {
                collection.add_background_model(Box::new(PoissonBackgroundModel::local(
                    window,
                    config.log_confidence,
                    signal_total,
                    genome_length,
                    config.mappable_genome_prop,
                    config.bin_width,
                    true,
                )));
            } else {
                debug!(
                    "Skipping {}bp signal-based local background for {}",
                    window, condition.name
                );
            }
        }

        collection
    }

    pub fn add_background_model(&mut self, model: Box<dyn BackgroundModel>) {
        self.models.push(model);
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Stage one: only genome-wide models are consulted.
    pub fn passes_genomic_threshold(&self, count: u32, strand: Option<Strand>) -> bool {
        self.models
            .iter()
            .filter(|m| m.is_genome_wide() && applies_to(m.strand(), strand))
            .all(|m| m.passes_threshold(count))
    }

    pub fn update_models(
        &mut self,
        region: &Region,
        offset: u32,
        signal_starts: &[f64],
        control_starts: Option<&[f64]>,
        bin_step: u32,
    ) {
        for model in self.models.iter_mut().filter(|m| !m.is_genome_wide()) {
            model.update_model(region, offset, signal_starts, control_starts, bin_step);
        }
    }

    /// Stage two: every model on the strand must pass.
    pub fn passes_all_thresholds(&self, count: u32, strand: Option<Strand>) -> bool {
        self.models
            .iter()
            .filter(|m| applies_to(m.strand(), strand))
            .all(|m| m.passes_threshold(count))
    }

    pub fn genomic_model_threshold(&self) -> Option<u32> {
        self.models
            .iter()
            .find(|m| m.is_genome_wide())
            .map(|m| m.count_threshold())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use rstest::*;

    use potreg_core::models::StrandedRead;

    use crate::source::CachedReadSource;

    fn source(name: &str, n: u32) -> Arc<CachedReadSource> {
        let reads = (0..n)
            .map(|i| ("chr1".to_string(), StrandedRead::new(i * 10 + 1, Strand::Forward, 1.0)))
            .collect();
        Arc::new(CachedReadSource::new(name, reads))
    }

    #[fixture]
    fn config() -> ScanConfig {
        ScanConfig {
            local_background_windows: vec![1000, 10_000],
            ..Default::default()
        }
    }

    #[rstest]
    fn test_signal_only_condition_skips_narrow_local(config: ScanConfig) {
        let mut condition = Condition::new("ctcf");
        condition.add_signal(source("rep1", 150));

        let collection = BackgroundCollection::for_condition(&condition, &config, 100_000);
        // global + the 10kb signal-based model
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.genomic_model_threshold(), Some(6));
    }

    #[rstest]
    fn test_controlled_condition_gets_every_local(config: ScanConfig) {
        let mut condition = Condition::new("ctcf");
        condition.add_signal(source("rep1", 150));
        condition.add_control(source("input", 150));

        let collection = BackgroundCollection::for_condition(&condition, &config, 100_000);
        assert_eq!(collection.len(), 3);
    }

    #[rstest]
    fn test_two_stage_thresholds() {
        let mut collection = BackgroundCollection::new();
        collection.add_background_model(Box::new(PoissonBackgroundModel::genome_wide(
            -6.0, 150.0, 100_000, 0.8, 200,
        )));
        collection.add_background_model(Box::new(PoissonBackgroundModel::local(
            1000, -6.0, 150.0, 100_000, 0.8, 200, true,
        )));

        assert!(!collection.passes_genomic_threshold(6, None));
        assert!(collection.passes_genomic_threshold(7, None));

        // a dense neighbourhood raises the local threshold above the global one
        let starts = vec![10.0; 51];
        collection.update_models(&Region::new("chr1", 1, 5000), 2500, &starts, None, 100);
        assert!(!collection.passes_all_thresholds(7, None));
        assert!(collection.passes_all_thresholds(10_000, None));
    }

    #[rstest]
    fn test_stranded_models_only_apply_to_their_strand() {
        let mut collection = BackgroundCollection::new();
        collection.add_background_model(Box::new(
            PoissonBackgroundModel::genome_wide(-6.0, 150.0, 100_000, 0.8, 200)
                .with_strand(Strand::Forward),
        ));

        assert!(!collection.passes_genomic_threshold(2, Some(Strand::Forward)));
        // nothing applies to the reverse strand
        assert!(collection.passes_genomic_threshold(2, Some(Strand::Reverse)));
    }

    #[rstest]
    fn test_clones_are_independent() {
        let mut collection = BackgroundCollection::new();
        collection.add_background_model(Box::new(PoissonBackgroundModel::local(
            1000, -6.0, 150.0, 100_000, 0.8, 200, true,
        )));
        let pristine = collection.clone();

        collection.update_models(&Region::new("chr1", 1, 5000), 2500, &[10.0; 51], None, 100);
        assert!(pristine.passes_all_thresholds(7, None));
        assert!(!collection.passes_all_thresholds(7, None));
    }
}
