//! Where reads come from: per-sample read sources grouped into conditions.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

use potreg_core::errors::CoreError;
use potreg_core::models::{Region, Strand, StrandedRead};
use potreg_core::utils::{get_dynamic_reader, is_header_line};

use crate::errors::SourceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Signal,
    Control,
}

///
/// Supplier of stranded, weighted read 5' positions for one sample.
///
pub trait ReadSource: Send + Sync {
    fn name(&self) -> &str;

    /// Reads whose coordinate lies in the closed `region`, sorted by coordinate.
    fn reads(&self, region: &Region) -> Result<Vec<StrandedRead>, SourceError>;

    fn total_weight(&self) -> f64;
}

///
/// A whole sample held in memory, one coordinate-sorted vector per chromosome.
///
#[derive(Debug, Clone, Default)]
pub struct CachedReadSource {
    name: String,
    reads: HashMap<String, Vec<StrandedRead>>,
    total_weight: f64,
}

impl CachedReadSource {
    pub fn new<S: Into<String>>(name: S, reads: Vec<(String, StrandedRead)>) -> Self {
        let mut by_chrom: HashMap<String, Vec<StrandedRead>> = HashMap::new();
        for (chr, read) in reads {
            by_chrom.entry(chr).or_default().push(read);
        }
        Self::from_chrom_reads(name, by_chrom)
    }

    pub fn from_chrom_reads<S: Into<String>>(
        name: S,
        mut reads: HashMap<String, Vec<StrandedRead>>,
    ) -> Self {
        let mut total_weight = 0.0;
        for chrom_reads in reads.values_mut() {
            chrom_reads.sort_by_key(|r| r.coordinate);
            total_weight += chrom_reads.iter().map(|r| r.weight).sum::<f64>();
        }

        CachedReadSource {
            name: name.into(),
            reads,
            total_weight,
        }
    }

    ///
    /// Load reads from a bed or bed.gz file, one read per line. The read's
    /// 5' end becomes its coordinate.
    ///
    /// # Arguments
    /// - name: label used in logs and errors
    /// - path: bed file on disk
    /// - use_scores: weigh each read by its score column instead of 1
    pub fn from_bed<S: Into<String>, P: AsRef<Path>>(
        name: S,
        path: P,
        use_scores: bool,
    ) -> Result<Self, CoreError> {
        let reader = get_dynamic_reader(path.as_ref())?;

        let mut by_chrom: HashMap<String, Vec<StrandedRead>> = HashMap::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() || is_header_line(&line) {
                continue;
            }
            let (chr, read) = parse_read_line(&line, use_scores)
                .ok_or_else(|| CoreError::ReadParseError(line.clone()))?;
            by_chrom.entry(chr).or_default().push(read);
        }

        Ok(Self::from_chrom_reads(name, by_chrom))
    }

    pub fn read_count(&self) -> usize {
        self.reads.values().map(|v| v.len()).sum()
    }
}

fn parse_read_line(line: &str, use_scores: bool) -> Option<(String, StrandedRead)> {
    let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
    if fields.len() < 3 || fields[0].is_empty() {
        return None;
    }
    let start = fields[1].parse::<u32>().ok()?;
    let end = fields[2].parse::<u32>().ok()?;
    if end <= start {
        return None;
    }

    let strand = match fields.get(5) {
        Some(s) if *s != "." => s.parse::<Strand>().ok()?,
        _ => Strand::Forward,
    };
    let weight = if use_scores {
        fields
            .get(4)
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|w| w.is_finite())
            .unwrap_or(1.0)
    } else {
        1.0
    };
    let coordinate = match strand {
        Strand::Forward => start + 1,
        Strand::Reverse => end,
    };

    Some((fields[0].to_string(), StrandedRead::new(coordinate, strand, weight)))
}

impl ReadSource for CachedReadSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn reads(&self, region: &Region) -> Result<Vec<StrandedRead>, SourceError> {
        let Some(chrom_reads) = self.reads.get(&region.chr) else {
            return Ok(Vec::new());
        };
        let lo = chrom_reads.partition_point(|r| r.coordinate < region.start);
        let hi = chrom_reads.partition_point(|r| r.coordinate <= region.end);
        if hi <= lo {
            return Ok(Vec::new());
        }
        Ok(chrom_reads[lo..hi].to_vec())
    }

    fn total_weight(&self) -> f64 {
        self.total_weight
    }
}

///
/// An experimental condition: signal replicates plus optional control samples.
///
#[derive(Clone)]
pub struct Condition {
    pub name: String,
    pub index: usize,
    signal: Vec<Arc<dyn ReadSource>>,
    controls: Vec<Arc<dyn ReadSource>>,
}

impl std::fmt::Debug for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Condition")
            .field("name", &self.name)
            .field("index", &self.index)
            .field(
                "signal",
                &self.signal.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field(
                "controls",
                &self.controls.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Condition {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Condition {
            name: name.into(),
            index: 0,
            signal: Vec::new(),
            controls: Vec::new(),
        }
    }

    pub fn add_signal(&mut self, source: Arc<dyn ReadSource>) {
        self.signal.push(source);
    }

    pub fn add_control(&mut self, source: Arc<dyn ReadSource>) {
        self.controls.push(source);
    }

    pub fn signal_sources(&self) -> &[Arc<dyn ReadSource>] {
        &self.signal
    }

    pub fn has_controls(&self) -> bool {
        !self.controls.is_empty()
    }

    pub fn total_signal_weight(&self) -> f64 {
        self.signal.iter().map(|s| s.total_weight()).sum()
    }

    pub fn total_control_weight(&self) -> f64 {
        self.controls.iter().map(|s| s.total_weight()).sum()
    }

    ///
    /// Pooled reads of every source on one channel, sorted by coordinate.
    ///
    pub fn reads(
        &self,
        region: &Region,
        channel: Channel,
    ) -> Result<Vec<StrandedRead>, SourceError> {
        let sources = match channel {
            Channel::Signal => &self.signal,
            Channel::Control => &self.controls,
        };

        let mut pooled = Vec::new();
        for source in sources {
            pooled.extend(source.reads(region)?);
        }
        if sources.len() > 1 {
            pooled.sort_by_key(|r| r.coordinate);
        }

        Ok(pooled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use flate2::Compression;
    use flate2::write::GzEncoder;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn source() -> CachedReadSource {
        CachedReadSource::new(
            "rep1",
            vec![
                ("chr1".to_string(), StrandedRead::new(300, Strand::Forward, 1.0)),
                ("chr1".to_string(), StrandedRead::new(100, Strand::Reverse, 2.0)),
                ("chr2".to_string(), StrandedRead::new(50, Strand::Forward, 1.0)),
                ("chr1".to_string(), StrandedRead::new(200, Strand::Forward, 1.0)),
            ],
        )
    }

    #[rstest]
    fn test_reads_are_sorted_and_bounded(source: CachedReadSource) {
        let reads = source.reads(&Region::new("chr1", 100, 200)).unwrap();
        let coords: Vec<u32> = reads.iter().map(|r| r.coordinate).collect();
        assert_eq!(coords, vec![100, 200]);
        assert_eq!(source.total_weight(), 5.0);
        assert_eq!(source.read_count(), 4);
    }

    #[rstest]
    fn test_unknown_chromosome_is_empty(source: CachedReadSource) {
        assert!(source.reads(&Region::new("chrX", 1, 1000)).unwrap().is_empty());
    }

    #[rstest]
    fn test_from_bed_uses_five_prime_ends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reads.bed");
        std::fs::write(
            &path,
            "track name=reads\nchr1\t99\t135\tr1\t7\t+\nchr1\t199\t235\tr2\t3\t-\nchr1\t10\t46\n",
        )
        .unwrap();

        let source = CachedReadSource::from_bed("rep1", &path, false).unwrap();
        let reads = source.reads(&Region::new("chr1", 1, 1000)).unwrap();
        assert_eq!(
            reads,
            vec![
                StrandedRead::new(11, Strand::Forward, 1.0),
                StrandedRead::new(100, Strand::Forward, 1.0),
                StrandedRead::new(235, Strand::Reverse, 1.0),
            ]
        );

        let scored = CachedReadSource::from_bed("rep1", &path, true).unwrap();
        assert_eq!(scored.total_weight(), 11.0);
    }

    #[rstest]
    fn test_from_bed_gz() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reads.bed.gz");
        let mut encoder = GzEncoder::new(
            std::fs::File::create(&path).unwrap(),
            Compression::default(),
        );
        encoder.write_all(b"chr2\t0\t36\tr\t0\t+\n").unwrap();
        encoder.finish().unwrap();

        let source = CachedReadSource::from_bed("rep1", &path, false).unwrap();
        assert_eq!(source.read_count(), 1);
    }

    #[rstest]
    fn test_from_bed_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.bed");
        std::fs::write(&path, "chr1\tten\t20\n").unwrap();

        assert!(matches!(
            CachedReadSource::from_bed("rep1", &path, false),
            Err(CoreError::ReadParseError(_))
        ));
    }

    #[rstest]
    fn test_condition_pools_replicates(source: CachedReadSource) {
        let mut condition = Condition::new("ctcf");
        condition.add_signal(Arc::new(source));
        condition.add_signal(Arc::new(CachedReadSource::new(
            "rep2",
            vec![("chr1".to_string(), StrandedRead::new(150, Strand::Forward, 1.0))],
        )));

        let reads = condition
            .reads(&Region::new("chr1", 1, 1000), Channel::Signal)
            .unwrap();
        let coords: Vec<u32> = reads.iter().map(|r| r.coordinate).collect();
        assert_eq!(coords, vec![100, 150, 200, 300]);
        assert_eq!(condition.total_signal_weight(), 6.0);

        assert!(!condition.has_controls());
        assert!(condition
            .reads(&Region::new("chr1", 1, 1000), Channel::Control)
            .unwrap()
            .is_empty());
    }
}
