use std::path::Path;

use crate::errors::CoreError;
use crate::models::Region;
use crate::utils::read_chrom_sizes;

///
/// Chromosome names and lengths of one genome assembly, in file order.
///
#[derive(Debug, Clone)]
pub struct Genome {
    chroms: Vec<(String, u32)>,
}

impl Genome {
    pub fn from_chrom_sizes<T: AsRef<Path>>(path: T) -> Result<Self, CoreError> {
        let chroms = read_chrom_sizes(path)?;
        Ok(Genome { chroms })
    }

    ///
    /// Every chromosome as a region spanning `[1, length]`. Zero-length
    /// entries are skipped.
    ///
    pub fn chromosomes(&self) -> Vec<Region> {
        self.chroms
            .iter()
            .filter(|(_, len)| *len > 0)
            .map(|(name, len)| Region::new(name.clone(), 1, *len))
            .collect()
    }

    pub fn chrom_length(&self, chr: &str) -> Option<u32> {
        self.chroms
            .iter()
            .find(|(name, _)| name == chr)
            .map(|(_, len)| *len)
    }

    pub fn genome_length(&self) -> u64 {
        self.chroms.iter().map(|(_, len)| *len as u64).sum()
    }

    pub fn len(&self) -> usize {
        self.chroms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chroms.is_empty()
    }
}

impl From<Vec<(String, u32)>> for Genome {
    fn from(chroms: Vec<(String, u32)>) -> Self {
        Genome { chroms }
    }
}
