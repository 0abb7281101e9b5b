use potreg_core::models::{Region, Strand, StrandedRead};

use crate::consts::{SPLIT_TOLERANCE, SPLIT_TRIGGER_FACTOR};
use crate::landscape::make_hit_landscape;

///
/// Cuts over-long windows into parts of roughly the preferred length,
/// placing each cut at the quietest bin near the target length.
///
#[derive(Debug, Clone, Copy)]
pub struct WindowSplitter {
    bin_width: u32,
    bin_step: u32,
    preferred_length: u32,
}

impl WindowSplitter {
    pub fn new(bin_width: u32, bin_step: u32, preferred_length: u32) -> Self {
        WindowSplitter {
            bin_width,
            bin_step: bin_step.max(1),
            preferred_length,
        }
    }

    ///
    /// Split `window` using the summed landscape of every condition's reads.
    ///
    pub fn split_window(
        &self,
        window: &Region,
        hits: &[Vec<StrandedRead>],
        strand: Option<Strand>,
    ) -> Vec<Region> {
        let mut totals: Vec<f64> = Vec::new();
        for reads in hits {
            let hl = make_hit_landscape(reads, window, self.bin_width, self.bin_step, strand);
            if totals.is_empty() {
                totals = hl.landscape;
            } else {
                for (total, value) in totals.iter_mut().zip(hl.landscape) {
                    *total += value;
                }
            }
        }

        self.split_with_totals(window, &totals)
    }

    ///
    /// Split `window` given the per-bin totals of a landscape built over it.
    /// The returned parts are contiguous and together cover the window.
    ///
    pub fn split_with_totals(&self, window: &Region, totals: &[f64]) -> Vec<Region> {
        let preferred = self.preferred_length as u64;
        let tolerance = SPLIT_TOLERANCE as u64;
        let step = self.bin_step as u64;
        let scan_end = (window.end as u64).saturating_sub(self.bin_width as u64);
        let end = window.end as u64;

        let mut parts = Vec::new();
        let mut part_start = window.start as u64;
        let mut min_total = f64::MAX;
        let mut min_pos: Option<u64> = None;

        let mut pos = window.start as u64;
        let mut bin = 0usize;
        while pos < scan_end {
            if ((end - part_start) as f64) < preferred as f64 * SPLIT_TRIGGER_FACTOR {
                break;
            }

            let total = totals.get(bin).copied().unwrap_or(0.0);
            let band_start = part_start + preferred - tolerance;
            let band_end = part_start + preferred + tolerance;
            if pos > band_start && pos < band_end && total < min_total {
                min_total = total;
                min_pos = Some(pos);
            }

            if pos >= band_end {
                if let Some(cut) = min_pos {
                    parts.push(Region::new(window.chr.clone(), part_start as u32, cut as u32));
                    part_start = cut + 1;
                }
                min_total = f64::MAX;
                min_pos = None;
            }

            pos += step;
            bin += 1;
        }

        parts.push(Region::new(window.chr.clone(), part_start as u32, window.end));
        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn splitter() -> WindowSplitter {
        WindowSplitter::new(200, 100, 10_000)
    }

    fn assert_tiles(window: &Region, parts: &[Region]) {
        assert_eq!(parts.first().unwrap().start, window.start);
        assert_eq!(parts.last().unwrap().end, window.end);
        for pair in parts.windows(2) {
            assert_eq!(pair[0].end + 1, pair[1].start);
        }
    }

    #[rstest]
    fn test_short_window_untouched(splitter: WindowSplitter) {
        let window = Region::new("chr1", 1, 14_000);
        let parts = splitter.split_with_totals(&window, &[1.0; 141]);
        assert_eq!(parts, vec![window]);
    }

    #[rstest]
    #[case(35_001)]
    #[case(52_345)]
    #[case(100_000)]
    fn test_children_near_preferred_length(splitter: WindowSplitter, #[case] width: u32) {
        let window = Region::new("chr2", 5_001, 5_000 + width);
        let totals = vec![3.0; (width / 100) as usize + 1];
        let parts = splitter.split_with_totals(&window, &totals);

        assert!(parts.len() >= 2);
        assert_tiles(&window, &parts);
        for part in &parts[..parts.len() - 1] {
            assert!(part.width() >= 9_000, "{} too short", part);
            assert!(part.width() <= 11_000, "{} too long", part);
        }
    }

    #[rstest]
    fn test_cut_at_quietest_bin(splitter: WindowSplitter) {
        let window = Region::new("chr1", 1, 20_000);
        let mut totals = vec![10.0; 201];
        // bin 104 sits at position 10_401, inside the band (9_001, 11_001)
        totals[104] = 0.5;
        let parts = splitter.split_with_totals(&window, &totals);

        assert_eq!(
            parts,
            vec![Region::new("chr1", 1, 10_401), Region::new("chr1", 10_402, 20_000)]
        );
    }

    #[rstest]
    fn test_split_from_reads() {
        let splitter = WindowSplitter::new(200, 100, 2_000);
        let window = Region::new("chr1", 1, 6_000);
        // dense everywhere except a gap around 2_500
        let reads: Vec<StrandedRead> = (0..600)
            .map(|i| 1 + i * 10)
            .filter(|c| !(2_300..2_700).contains(c))
            .map(|c| StrandedRead::new(c, Strand::Forward, 1.0))
            .collect();

        let parts = splitter.split_window(&window, &[reads], None);
        assert_tiles(&window, &parts);
        assert!(parts.len() >= 2);
        assert!((2_300..2_700).contains(&parts[0].end), "cut at {}", parts[0].end);
    }
}
