use potreg_core::models::{Region, Strand};

use crate::background::BackgroundCollection;
use crate::landscape::HitLandscape;

///
/// Bin positions evaluated for one section: `first`, `first + step`, ...
/// strictly below `end`. Position `first` maps to landscape bin `first_bin`.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanGrid {
    pub first: u32,
    pub end: u32,
    pub step: u32,
    pub first_bin: usize,
}

impl ScanGrid {
    pub fn positions(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        let step = self.step.max(1) as usize;
        (self.first..self.end.max(self.first))
            .step_by(step)
            .enumerate()
            .map(|(k, pos)| (self.first_bin + k, pos))
    }
}

///
/// Turns a stream of passing bin positions along one chromosome into
/// candidate windows. Each pass claims `[pos - expansion, pos - 1 + expansion]`
/// clamped to the chromosome; overlapping claims merge into the open window,
/// anything else closes it.
///
#[derive(Debug, Clone)]
pub struct WindowScanner {
    chrom: Region,
    expansion: u32,
    open: Option<Region>,
}

impl WindowScanner {
    pub fn new(chrom: &Region, expansion: u32) -> Self {
        WindowScanner {
            chrom: chrom.clone(),
            expansion,
            open: None,
        }
    }

    pub fn open_window(&self) -> Option<&Region> {
        self.open.as_ref()
    }

    fn claim(&self, pos: u32) -> Region {
        let start = pos.saturating_sub(self.expansion).max(self.chrom.start);
        let end = (pos as u64 + self.expansion as u64)
            .saturating_sub(1)
            .min(self.chrom.end as u64) as u32;
        Region::new(self.chrom.chr.clone(), start, end.max(start))
    }

    ///
    /// Record a passing bin at `pos`. Returns the window this pass closed, if any.
    ///
    pub fn record_pass(&mut self, pos: u32) -> Option<Region> {
        let claim = self.claim(pos);
        match self.open.take() {
            Some(open) if open.overlaps(&claim) => {
                self.open = Some(Region::new(
                    open.chr.clone(),
                    open.start.min(claim.start),
                    open.end.max(claim.end),
                ));
                None
            }
            previous => {
                self.open = Some(claim);
                previous
            }
        }
    }

    ///
    /// Evaluate every position of `grid`, returning the windows closed along
    /// the way. The last window stays open for the next section.
    ///
    pub fn scan<F>(&mut self, grid: &ScanGrid, mut passes: F) -> Vec<Region>
    where
        F: FnMut(usize, u32) -> bool,
    {
        let mut closed = Vec::new();
        for (bin, pos) in grid.positions() {
            if !passes(bin, pos) {
                continue;
            }
            if let Some(window) = self.record_pass(pos) {
                closed.push(window);
            }
        }
        closed
    }

    /// Close the chromosome, handing back the window still open.
    pub fn finish(&mut self) -> Option<Region> {
        self.open.take()
    }
}

///
/// Two-stage test of one bin: a condition passes when its count clears the
/// genome-wide threshold and, after its local models are refreshed around
/// the bin, every threshold. The bin passes when any condition does.
///
/// # Arguments
/// - bin: landscape bin of the position
/// - offset: position relative to `region.start`
/// - region: the span the landscapes cover
/// - signal: one landscape per condition
/// - control: one landscape per condition, when any condition has controls
///
#[allow(clippy::too_many_arguments)]
pub fn bin_passes(
    bin: usize,
    offset: u32,
    region: &Region,
    signal: &[HitLandscape],
    control: Option<&[HitLandscape]>,
    backgrounds: &mut [BackgroundCollection],
    bin_step: u32,
    strand: Option<Strand>,
) -> bool {
    for (cond, background) in backgrounds.iter_mut().enumerate() {
        let Some(landscape) = signal.get(cond) else {
            continue;
        };
        let count = landscape.count(bin) as u32;
        if !background.passes_genomic_threshold(count, strand) {
            continue;
        }

        let control_starts = control
            .and_then(|c| c.get(cond))
            .map(|c| c.starts.as_slice());
        background.update_models(region, offset, &landscape.starts, control_starts, bin_step);
        if background.passes_all_thresholds(count, strand) {
            return true;
        }
    }
    false
}

///
/// Sort windows and merge the ones that overlap. Windows that only touch
/// stay separate.
///
pub fn union_windows(mut windows: Vec<Region>) -> Vec<Region> {
    windows.sort();
    let mut merged: Vec<Region> = Vec::with_capacity(windows.len());
    for window in windows {
        match merged.last_mut() {
            Some(last) if last.overlaps(&window) => {
                last.end = last.end.max(window.end);
            }
            _ => merged.push(window),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    use crate::background::PoissonBackgroundModel;
    use crate::landscape::make_hit_landscape;
    use potreg_core::models::StrandedRead;

    #[fixture]
    fn chrom() -> Region {
        Region::new("chr1", 1, 10_000)
    }

    #[rstest]
    fn test_grid_positions() {
        let grid = ScanGrid {
            first: 101,
            end: 401,
            step: 100,
            first_bin: 3,
        };
        let positions: Vec<(usize, u32)> = grid.positions().collect();
        assert_eq!(positions, vec![(3, 101), (4, 201), (5, 301)]);
    }

    #[rstest]
    fn test_empty_grid() {
        let grid = ScanGrid {
            first: 500,
            end: 100,
            step: 100,
            first_bin: 0,
        };
        assert_eq!(grid.positions().count(), 0);
    }

    #[rstest]
    fn test_claim_clamped_to_chromosome(chrom: Region) {
        let mut scanner = WindowScanner::new(&chrom, 200);
        scanner.record_pass(50);
        assert_eq!(scanner.open_window(), Some(&Region::new("chr1", 1, 249)));

        let mut scanner = WindowScanner::new(&chrom, 200);
        scanner.record_pass(9_950);
        assert_eq!(scanner.open_window(), Some(&Region::new("chr1", 9_750, 10_000)));
    }

    #[rstest]
    fn test_consecutive_passes_merge(chrom: Region) {
        let mut scanner = WindowScanner::new(&chrom, 200);
        assert_eq!(scanner.record_pass(1001), None);
        assert_eq!(scanner.record_pass(1101), None);
        assert_eq!(scanner.record_pass(1201), None);
        assert_eq!(scanner.finish(), Some(Region::new("chr1", 801, 1400)));
        assert_eq!(scanner.finish(), None);
    }

    #[rstest]
    fn test_gap_closes_window(chrom: Region) {
        let mut scanner = WindowScanner::new(&chrom, 200);
        scanner.record_pass(1001);
        let closed = scanner.record_pass(3001);
        assert_eq!(closed, Some(Region::new("chr1", 801, 1200)));
        assert_eq!(scanner.open_window(), Some(&Region::new("chr1", 2801, 3200)));
    }

    #[rstest]
    fn test_merged_window_spans_all_claims(chrom: Region) {
        // every claim of a run of passes lies inside the window they produce
        let passes = [2001u32, 2101, 2201, 2301, 2501];
        let mut scanner = WindowScanner::new(&chrom, 200);
        for pos in passes {
            assert_eq!(scanner.record_pass(pos), None);
        }
        let window = scanner.finish().unwrap();
        let min_start = passes.iter().map(|p| p - 200).min().unwrap();
        let max_end = passes.iter().map(|p| p + 199).max().unwrap();
        assert_eq!(window, Region::new("chr1", min_start, max_end));
    }

    #[rstest]
    fn test_scan_with_predicate(chrom: Region) {
        let grid = ScanGrid {
            first: 1,
            end: 5001,
            step: 100,
            first_bin: 0,
        };
        let mut scanner = WindowScanner::new(&chrom, 200);
        let closed = scanner.scan(&grid, |bin, _| (10..13).contains(&bin) || bin == 40);
        assert_eq!(closed, vec![Region::new("chr1", 801, 1400)]);
        assert_eq!(scanner.finish(), Some(Region::new("chr1", 3801, 4200)));
    }

    #[rstest]
    fn test_bin_passes_two_stages(chrom: Region) {
        let mut background = BackgroundCollection::new();
        background.add_background_model(Box::new(PoissonBackgroundModel::genome_wide(
            -6.0, 150.0, 100_000, 0.8, 200,
        )));
        let mut backgrounds = vec![background];

        let reads: Vec<StrandedRead> = (0..20)
            .map(|i| StrandedRead::new(5001 + i * 5, Strand::Forward, 1.0))
            .collect();
        let signal = vec![make_hit_landscape(&reads, &chrom, 200, 100, None)];

        assert!(bin_passes(50, 5000, &chrom, &signal, None, &mut backgrounds, 100, None));
        assert!(!bin_passes(10, 1000, &chrom, &signal, None, &mut backgrounds, 100, None));
    }

    #[rstest]
    fn test_union_windows() {
        let windows = vec![
            Region::new("chr1", 500, 900),
            Region::new("chr1", 100, 300),
            Region::new("chr1", 250, 400),
            Region::new("chr1", 401, 450),
        ];
        assert_eq!(
            union_windows(windows),
            vec![
                Region::new("chr1", 100, 400),
                Region::new("chr1", 401, 450),
                Region::new("chr1", 500, 900),
            ]
        );
    }
}
