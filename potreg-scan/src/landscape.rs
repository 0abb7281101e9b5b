use potreg_core::models::{Region, Strand, StrandedRead};

///
/// Per-bin read weight over one region. `starts` holds the weight of reads
/// starting in each step-sized bin; `landscape` holds the weight of reads
/// whose footprint (coordinate plus or minus half a bin width) touches it.
///
#[derive(Debug, Clone, PartialEq)]
pub struct HitLandscape {
    pub landscape: Vec<f64>,
    pub starts: Vec<f64>,
}

impl HitLandscape {
    pub fn num_bins(&self) -> usize {
        self.landscape.len()
    }

    /// Landscape value at `bin`, zero past the end.
    pub fn count(&self, bin: usize) -> f64 {
        self.landscape.get(bin).copied().unwrap_or(0.0)
    }
}

///
/// Build the hit landscape of `reads` over `region`, binned every
/// `bin_step` bp. Reads outside the region are clamped onto its edges.
///
/// # Arguments
/// - reads: read positions, in any order
/// - region: the span the bins cover; bin 0 starts at `region.start`
/// - bin_width: footprint of one read, centred on its coordinate
/// - bin_step: distance between consecutive bins
/// - strand: only count reads on this strand, or all when `None`
///
pub fn make_hit_landscape(
    reads: &[StrandedRead],
    region: &Region,
    bin_width: u32,
    bin_step: u32,
    strand: Option<Strand>,
) -> HitLandscape {
    let width = region.width() as i64;
    let step = bin_step.max(1) as i64;
    let num_bins = width / step;
    let half_width = bin_width as f64 / 2.0;

    let mut landscape = vec![0.0; num_bins as usize + 1];
    let mut starts = vec![0.0; num_bins as usize + 1];

    for read in reads.iter().filter(|r| strand.is_none_or(|s| r.strand == s)) {
        let offset = (read.coordinate as i64 - region.start as i64).clamp(0, width);

        let start_bin = (offset / step).clamp(0, num_bins);
        starts[start_bin as usize] += read.weight;

        let first_bin =
            (((offset as f64 - half_width) / step as f64).floor() as i64).clamp(0, num_bins);
        let last_bin =
            (((offset as f64 + half_width) / step as f64).floor() as i64).clamp(0, num_bins);
        for bin in first_bin..=last_bin {
            landscape[bin as usize] += read.weight;
        }
    }

    HitLandscape { landscape, starts }
}

/// One landscape per condition, all over the same region.
pub fn make_condition_landscapes(
    hits: &[Vec<StrandedRead>],
    region: &Region,
    bin_width: u32,
    bin_step: u32,
    strand: Option<Strand>,
) -> Vec<HitLandscape> {
    hits.iter()
        .map(|reads| make_hit_landscape(reads, region, bin_width, bin_step, strand))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn region() -> Region {
        Region::new("chr1", 1001, 2000)
    }

    #[rstest]
    fn test_bin_count(region: Region) {
        let hl = make_hit_landscape(&[], &region, 200, 100, None);
        // 1000bp / 100 = 10 bins, plus the closing bin
        assert_eq!(hl.num_bins(), 11);
        assert!(hl.landscape.iter().all(|v| *v == 0.0));
    }

    #[rstest]
    fn test_single_read_footprint(region: Region) {
        // offset 450: start bin 4, footprint bins (350/100)..=(550/100) = 3..=5
        let reads = vec![StrandedRead::new(1451, Strand::Forward, 2.0)];
        let hl = make_hit_landscape(&reads, &region, 200, 100, None);

        assert_eq!(hl.starts[4], 2.0);
        assert_eq!(hl.starts.iter().sum::<f64>(), 2.0);
        assert_eq!(
            hl.landscape,
            vec![0.0, 0.0, 0.0, 2.0, 2.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0]
        );
    }

    #[rstest]
    fn test_reads_outside_region_are_clamped(region: Region) {
        let reads = vec![
            StrandedRead::new(10, Strand::Forward, 1.0),
            StrandedRead::new(5000, Strand::Forward, 1.0),
        ];
        let hl = make_hit_landscape(&reads, &region, 200, 100, None);

        assert_eq!(hl.starts[0], 1.0);
        assert_eq!(hl.starts[10], 1.0);
        assert_eq!(hl.landscape[0], 1.0);
        assert_eq!(hl.landscape[1], 1.0);
        assert_eq!(hl.landscape[10], 1.0);
    }

    #[rstest]
    fn test_strand_filter(region: Region) {
        let reads = vec![
            StrandedRead::new(1101, Strand::Forward, 1.0),
            StrandedRead::new(1101, Strand::Reverse, 1.0),
        ];
        let fwd = make_hit_landscape(&reads, &region, 200, 100, Some(Strand::Forward));
        let both = make_hit_landscape(&reads, &region, 200, 100, None);

        assert_eq!(fwd.starts[1], 1.0);
        assert_eq!(both.starts[1], 2.0);
    }

    #[rstest]
    fn test_rebuild_is_idempotent(region: Region) {
        let reads: Vec<StrandedRead> = (0..40)
            .map(|i| StrandedRead::new(1001 + i * 25, Strand::Forward, 1.0))
            .collect();
        let first = make_hit_landscape(&reads, &region, 200, 100, None);
        let second = make_hit_landscape(&reads, &region, 200, 100, None);
        assert_eq!(first, second);
    }
}
