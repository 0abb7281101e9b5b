use std::collections::HashMap;

use potreg_core::models::Region;

use crate::scanner::union_windows;

///
/// Regions no candidate window may touch, indexed per chromosome for
/// binary-searched overlap queries.
///
#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    by_chrom: HashMap<String, Vec<Region>>,
}

impl IgnoreList {
    pub fn new(regions: &[Region]) -> Self {
        let mut by_chrom: HashMap<String, Vec<Region>> = HashMap::new();
        for region in regions {
            by_chrom
                .entry(region.chr.clone())
                .or_default()
                .push(region.clone());
        }
        for chrom_regions in by_chrom.values_mut() {
            *chrom_regions = union_windows(std::mem::take(chrom_regions));
        }
        IgnoreList { by_chrom }
    }

    pub fn is_empty(&self) -> bool {
        self.by_chrom.is_empty()
    }

    pub fn overlaps_any(&self, region: &Region) -> bool {
        let Some(ignored) = self.by_chrom.get(&region.chr) else {
            return false;
        };
        // first ignored region ending at or after our start
        let idx = ignored.partition_point(|r| r.end < region.start);
        ignored.get(idx).is_some_and(|r| r.start <= region.end)
    }

    /// Drop every region that overlaps an ignored one.
    pub fn filter(&self, regions: Vec<Region>) -> Vec<Region> {
        if self.is_empty() {
            return regions;
        }
        regions
            .into_iter()
            .filter(|r| !self.overlaps_any(r))
            .collect()
    }
}
