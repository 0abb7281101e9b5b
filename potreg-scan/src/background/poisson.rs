use statrs::distribution::{DiscreteCDF, Poisson};

use potreg_core::models::{Region, Strand};

use super::BackgroundModel;

///
/// Smallest count `k >= 1` such that `P(X > k) <= 10^log_confidence` for
/// `X ~ Poisson(lambda)`. Degenerate rates give a threshold of 1.
///
pub fn poisson_count_threshold(lambda: f64, log_confidence: f64) -> u32 {
    if !lambda.is_finite() || lambda <= 0.0 {
        return 1;
    }
    let poisson = match Poisson::new(lambda) {
        Ok(p) => p,
        Err(_) => return 1,
    };
    let alpha = 10f64.powf(log_confidence);

    // the tail at the mean is still far above any sensible cutoff, so start there
    let mut k = (lambda.floor() as u64).max(1);
    if poisson.sf(k) <= alpha {
        k = 1;
    }
    while poisson.sf(k) > alpha {
        k += 1;
    }

    k.min(u32::MAX as u64) as u32
}

///
/// Poisson background over a bin of fixed width. A model without a window
/// size is genome-wide; otherwise it re-estimates its rate from the read
/// starts around each bin it is asked about.
///
#[derive(Debug, Clone)]
pub struct PoissonBackgroundModel {
    window_size: Option<u32>,
    log_confidence: f64,
    total_reads: f64,
    genome_length: f64,
    mappable_prop: f64,
    bin_width: f64,
    strand: Option<Strand>,
    use_signal: bool,
    count_threshold: u32,
}

impl PoissonBackgroundModel {
    pub fn genome_wide(
        log_confidence: f64,
        total_reads: f64,
        genome_length: u64,
        mappable_prop: f64,
        bin_width: u32,
    ) -> Self {
        let mut model = PoissonBackgroundModel {
            window_size: None,
            log_confidence,
            total_reads,
            genome_length: genome_length as f64,
            mappable_prop,
            bin_width: bin_width as f64,
            strand: None,
            use_signal: false,
            count_threshold: 1,
        };
        model.count_threshold = poisson_count_threshold(model.global_lambda(), log_confidence);
        model
    }

    ///
    /// A local model of `window_size` bp. Until its first refresh it uses
    /// the genome-wide rate implied by `total_reads`.
    ///
    /// # Arguments
    /// - use_signal: estimate from signal starts instead of control starts
    pub fn local(
        window_size: u32,
        log_confidence: f64,
        total_reads: f64,
        genome_length: u64,
        mappable_prop: f64,
        bin_width: u32,
        use_signal: bool,
    ) -> Self {
        let mut model = Self::genome_wide(
            log_confidence,
            total_reads,
            genome_length,
            mappable_prop,
            bin_width,
        );
        model.window_size = Some(window_size);
        model.use_signal = use_signal;
        model
    }

    pub fn with_strand(mut self, strand: Strand) -> Self {
        self.strand = Some(strand);
        self
    }

    pub fn global_lambda(&self) -> f64 {
        let mappable_len = self.genome_length * self.mappable_prop;
        if mappable_len <= 0.0 {
            return 0.0;
        }
        self.total_reads * self.bin_width / mappable_len
    }
}

impl BackgroundModel for PoissonBackgroundModel {
    fn is_genome_wide(&self) -> bool {
        self.window_size.is_none()
    }

    fn strand(&self) -> Option<Strand> {
        self.strand
    }

    fn count_threshold(&self) -> u32 {
        self.count_threshold
    }

    fn update_model(
        &mut self,
        _region: &Region,
        offset: u32,
        signal_starts: &[f64],
        control_starts: Option<&[f64]>,
        bin_step: u32,
    ) {
        let Some(window) = self.window_size else {
            return;
        };
        let starts = if self.use_signal {
            Some(signal_starts)
        } else {
            control_starts
        };
        let Some(starts) = starts else {
            return;
        };
        if starts.is_empty() || bin_step == 0 {
            return;
        }

        let half = (window / 2) as u64;
        let step = bin_step as u64;
        let offset = offset as u64;
        let first_bin = (offset.saturating_sub(half) / step) as usize;
        let last_bin = (((offset + half) / step) as usize).min(starts.len());
        if last_bin <= first_bin {
            return;
        }

        let sum: f64 = starts[first_bin..last_bin].iter().sum();
        let covered = ((last_bin - first_bin) as u64 * step) as f64;
        let lambda = sum * self.bin_width / covered;
        self.count_threshold = poisson_count_threshold(lambda, self.log_confidence);
    }

    fn clone_box(&self) -> Box<dyn BackgroundModel> {
        Box::new(self.clone())
    }
}
