use std::ops::AddAssign;

use potreg_core::models::{Region, StrandedRead};

use crate::errors::ScanError;

/// Read weight inside and outside the candidate windows of one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChannelTally {
    pub potential: f64,
    pub non_potential: f64,
}

impl ChannelTally {
    pub fn total(&self) -> f64 {
        self.potential + self.non_potential
    }
}

impl AddAssign for ChannelTally {
    fn add_assign(&mut self, other: Self) {
        self.potential += other.potential;
        self.non_potential += other.non_potential;
    }
}

///
/// Classifies read coordinates against settled candidate windows. Only
/// reads in `[count_from, count_to)` are tallied, so consecutive spans of
/// a chromosome never count a read twice.
///
#[derive(Debug)]
pub struct RegionCounter<'a> {
    regions: &'a [Region],
    count_from: u64,
    count_to: u64,
}

impl<'a> RegionCounter<'a> {
    ///
    /// # Arguments
    /// - regions: candidate windows of one chromosome, sorted by start and disjoint
    /// - count_from: first coordinate to tally
    /// - count_to: first coordinate past the tallied span
    pub fn new(regions: &'a [Region], count_from: u64, count_to: u64) -> Result<Self, ScanError> {
        for pair in regions.windows(2) {
            if pair[0].chr != pair[1].chr || pair[0].end >= pair[1].start {
                return Err(ScanError::UnsortedRegions(
                    pair[0].to_string(),
                    pair[1].to_string(),
                ));
            }
        }

        Ok(RegionCounter {
            regions,
            count_from,
            count_to,
        })
    }

    /// The candidate window holding `coordinate`, if any.
    pub fn find_region(&self, coordinate: u32) -> Option<&'a Region> {
        // last region starting at or before the coordinate
        let idx = self.regions.partition_point(|r| r.start <= coordinate);
        if idx == 0 {
            return None;
        }
        let candidate = &self.regions[idx - 1];
        candidate.contains(coordinate).then_some(candidate)
    }

    pub fn in_section(&self, coordinate: u32) -> bool {
        (coordinate as u64) >= self.count_from && (coordinate as u64) < self.count_to
    }

    pub fn tally(&self, reads: &[StrandedRead]) -> ChannelTally {
        let mut tally = ChannelTally::default();
        for read in reads.iter().filter(|r| self.in_section(r.coordinate)) {
            if self.find_region(read.coordinate).is_some() {
                tally.potential += read.weight;
            } else {
                tally.non_potential += read.weight;
            }
        }
        tally
    }
}
