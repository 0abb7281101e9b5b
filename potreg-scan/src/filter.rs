use std::sync::{Mutex, PoisonError};

use indicatif::ProgressBar;
use log::{debug, info, warn};
use rayon::prelude::*;

use potreg_core::models::{Genome, Region, Strand, StrandedRead};

use crate::background::BackgroundCollection;
use crate::config::ScanConfig;
use crate::counter::{ChannelTally, RegionCounter};
use crate::errors::{ChunkFailure, ScanError};
use crate::exclude::IgnoreList;
use crate::landscape::make_condition_landscapes;
use crate::scanner::{ScanGrid, WindowScanner, bin_passes, union_windows};
use crate::source::{Channel, Condition};
use crate::splitter::WindowSplitter;

/// Running per-condition read weight, split by channel and by whether the read fell in a window.
#[derive(Debug)]
struct Tallies {
    signal: Mutex<Vec<ChannelTally>>,
    control: Mutex<Vec<ChannelTally>>,
}

impl Tallies {
    fn new(num_conditions: usize) -> Self {
        Tallies {
            signal: Mutex::new(vec![ChannelTally::default(); num_conditions]),
            control: Mutex::new(vec![ChannelTally::default(); num_conditions]),
        }
    }

    fn add(&self, signal: &[ChannelTally], control: &[ChannelTally]) {
        let mut totals = self.signal.lock().unwrap_or_else(PoisonError::into_inner);
        for (total, tally) in totals.iter_mut().zip(signal) {
            *total += *tally;
        }
        drop(totals);

        let mut totals = self.control.lock().unwrap_or_else(PoisonError::into_inner);
        for (total, tally) in totals.iter_mut().zip(control) {
            *total += *tally;
        }
    }

    fn signal(&self, condition: usize) -> ChannelTally {
        let totals = self.signal.lock().unwrap_or_else(PoisonError::into_inner);
        totals.get(condition).copied().unwrap_or_default()
    }

    fn control(&self, condition: usize) -> ChannelTally {
        let totals = self.control.lock().unwrap_or_else(PoisonError::into_inner);
        totals.get(condition).copied().unwrap_or_default()
    }
}

/// Reads of one section, one vector per condition.
struct SectionReads {
    signal: Vec<Vec<StrandedRead>>,
    control: Vec<Vec<StrandedRead>>,
}

///
/// Windows of one chromosome that later sections may still grow or merge
/// into, plus the counted reads whose classification depends on them.
/// Reads below `tallied_to` are already in the totals; the ones kept below
/// it only serve as landscape context for splitting.
///
struct Pending {
    windows: Vec<Region>,
    signal: Vec<Vec<StrandedRead>>,
    control: Vec<Vec<StrandedRead>>,
    tallied_to: u64,
}

impl Pending {
    fn new(num_conditions: usize, chrom: &Region) -> Self {
        Pending {
            windows: Vec::new(),
            signal: vec![Vec::new(); num_conditions],
            control: vec![Vec::new(); num_conditions],
            tallied_to: chrom.start as u64,
        }
    }

    /// Hold the reads `section` counts, `[first, count_to)`.
    fn add_reads(&mut self, reads: SectionReads, section: &Section) {
        let counted = |r: &StrandedRead| {
            r.coordinate >= section.first && (r.coordinate as u64) < section.count_to
        };
        for (held, new) in self.signal.iter_mut().zip(reads.signal) {
            held.extend(new.into_iter().filter(|r| counted(r)));
        }
        for (held, new) in self.control.iter_mut().zip(reads.control) {
            held.extend(new.into_iter().filter(|r| counted(r)));
        }
    }

    /// Forget reads below `from`.
    fn release(&mut self, from: u64) {
        for held in self.signal.iter_mut().chain(self.control.iter_mut()) {
            held.retain(|r| r.coordinate as u64 >= from);
        }
    }
}

/// Where one section of a chromosome starts, ends and counts.
#[derive(Debug, Clone)]
struct Section {
    /// reads loaded for the section, including lookback and overhang
    load: Region,
    first: u32,
    scan_end: u32,
    count_to: u64,
}

///
/// Scans every chromosome of a genome for potentially enriched regions:
/// spans where any condition's read landscape clears its background
/// thresholds. Also tallies, per condition, how much signal and control
/// weight falls inside and outside those regions.
///
pub struct PotentialRegionFilter {
    config: ScanConfig,
    genome: Genome,
    conditions: Vec<Condition>,
    backgrounds: Vec<BackgroundCollection>,
    ignore: IgnoreList,
    splitter: WindowSplitter,
    bin_width: u32,
    bin_step: u32,
    expansion: u32,
    any_controls: bool,
    read_lock: Mutex<()>,
    potential_regions: Mutex<Vec<Region>>,
    tallies: Tallies,
    failures: Mutex<Vec<ChunkFailure>>,
    pot_region_length_total: u64,
}

impl PotentialRegionFilter {
    pub fn new(
        config: ScanConfig,
        genome: Genome,
        mut conditions: Vec<Condition>,
    ) -> Result<Self, ScanError> {
        config.validate()?;
        if conditions.is_empty() {
            return Err(ScanError::InvalidConfig(
                "at least one condition is required".to_string(),
            ));
        }
        if genome.is_empty() {
            return Err(ScanError::InvalidConfig(
                "the genome has no chromosomes".to_string(),
            ));
        }

        let genome_length = genome.genome_length();
        let mut backgrounds = Vec::with_capacity(conditions.len());
        for (index, condition) in conditions.iter_mut().enumerate() {
            condition.index = index;
            let background = BackgroundCollection::for_condition(condition, &config, genome_length);
            info!(
                "Potential region genomic threshold for {} with bin width {}: {}",
                condition.name,
                config.bin_width,
                background.genomic_model_threshold().unwrap_or_default()
            );
            backgrounds.push(background);
        }

        let bin_step = config.effective_bin_step();
        let splitter = WindowSplitter::new(config.bin_width, bin_step, config.preferred_split_length());
        let any_controls = conditions.iter().any(|c| c.has_controls());
        let ignore = IgnoreList::new(&config.regions_to_ignore);
        let num_conditions = conditions.len();

        Ok(PotentialRegionFilter {
            bin_width: config.bin_width,
            bin_step,
            expansion: config.expansion(),
            config,
            genome,
            conditions,
            backgrounds,
            ignore,
            splitter,
            any_controls,
            read_lock: Mutex::new(()),
            potential_regions: Mutex::new(Vec::new()),
            tallies: Tallies::new(num_conditions),
            failures: Mutex::new(Vec::new()),
            pot_region_length_total: 0,
        })
    }

    ///
    /// Scan the whole genome. Chromosomes are dealt round-robin to a fixed
    /// pool of workers; each worker keeps its own copy of the background
    /// models. Sections that fail to load are logged, recorded and skipped.
    ///
    /// Returns the potential regions, sorted.
    ///
    pub fn execute(&mut self) -> Result<Vec<Region>, ScanError> {
        self.reset();

        let chromosomes = self.genome.chromosomes();
        let num_threads = self.config.worker_count();
        info!(
            "Scanning {} chromosomes for potential regions with {} worker(s)",
            chromosomes.len(),
            num_threads
        );

        let assignments = assign_round_robin(chromosomes.clone(), num_threads);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .map_err(|e| ScanError::ThreadPool(e.to_string()))?;

        let bar = if self.config.progress {
            ProgressBar::new(chromosomes.len() as u64)
        } else {
            ProgressBar::hidden()
        };

        let this: &Self = self;
        pool.install(|| {
            assignments
                .par_iter()
                .for_each(|chroms| this.run_worker(chroms, &bar));
        });
        bar.finish_and_clear();

        let regions = {
            let mut regions = self
                .potential_regions
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let filtered = self.ignore.filter(std::mem::take(&mut *regions));
            *regions = union_windows(filtered);
            regions.clone()
        };
        self.pot_region_length_total = regions.iter().map(|r| r.width() as u64).sum();

        info!(
            "Found {} potential regions covering {}bp",
            regions.len(),
            self.pot_region_length_total
        );
        for condition in &self.conditions {
            let signal = self.tallies.signal(condition.index);
            info!(
                "{}: {:.1} signal reads in potential regions, {:.1} outside",
                condition.name, signal.potential, signal.non_potential
            );
        }
        let num_failures = self.chunk_failures().len();
        if num_failures > 0 {
            warn!("{} sections could not be scanned", num_failures);
        }

        Ok(regions)
    }

    fn reset(&mut self) {
        *self
            .potential_regions
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner) = Vec::new();
        *self.failures.get_mut().unwrap_or_else(PoisonError::into_inner) = Vec::new();
        self.tallies = Tallies::new(self.conditions.len());
        self.pot_region_length_total = 0;
    }

    fn run_worker(&self, chromosomes: &[Region], bar: &ProgressBar) {
        let mut backgrounds = self.backgrounds.clone();
        let mut found = Vec::new();

        for chrom in chromosomes {
            let windows = self.scan_chromosome(chrom, &mut backgrounds);
            debug!("{}: {} potential regions", chrom.chr, windows.len());
            found.extend(windows);
            bar.inc(1);
        }

        if !found.is_empty() {
            self.potential_regions
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend(found);
        }
    }

    fn strands(&self) -> Vec<Option<Strand>> {
        if self.config.stranded {
            vec![Some(Strand::Forward), Some(Strand::Reverse)]
        } else {
            vec![None]
        }
    }

    fn sections(&self, chrom: &Region) -> Vec<Section> {
        let max_section = self.config.max_section as u64;
        let overhang = self.config.overhang() as u64;
        let lookback = self.config.lookback() as u64;
        let chrom_start = chrom.start as u64;
        let chrom_end = chrom.end as u64;

        let mut sections = Vec::new();
        let mut x = chrom_start;
        while x <= chrom_end {
            let y = (x + max_section + overhang).min(chrom_end);
            let is_last = y == chrom_end;
            let load_start = x.saturating_sub(lookback).max(chrom_start);
            let scan_end = if is_last {
                y.saturating_sub(self.bin_width as u64)
            } else {
                (x + max_section).min(y.saturating_sub(self.bin_width as u64))
            };
            let count_to = if is_last { y + 1 } else { x + max_section };

            sections.push(Section {
                load: Region::new(chrom.chr.clone(), load_start as u32, y as u32),
                first: x as u32,
                scan_end: scan_end as u32,
                count_to,
            });

            if is_last {
                break;
            }
            x += max_section;
        }
        sections
    }

    fn scan_chromosome(
        &self,
        chrom: &Region,
        backgrounds: &mut [BackgroundCollection],
    ) -> Vec<Region> {
        let strands = self.strands();
        let mut scanners: Vec<WindowScanner> = strands
            .iter()
            .map(|_| WindowScanner::new(chrom, self.expansion))
            .collect();

        let mut windows = Vec::new();
        let mut pending = Pending::new(self.conditions.len(), chrom);
        let sections = self.sections(chrom);

        for (i, section) in sections.iter().enumerate() {
            match self.scan_section(section, &strands, &mut scanners, backgrounds) {
                Ok((closed, reads)) => {
                    pending.windows.extend(closed);
                    pending.add_reads(reads, section);
                }
                Err(e) => {
                    let failed = Region::new(chrom.chr.clone(), section.first, section.load.end);
                    self.record_failure(failed, &e);
                }
            }

            let Some(next) = sections.get(i + 1) else {
                continue;
            };
            // no later pass can claim anything below this
            let reach = (next.first as u64).saturating_sub(self.expansion as u64);
            let frontier = scanners
                .iter()
                .filter_map(|s| s.open_window())
                .map(|w| w.start as u64)
                .fold(reach, u64::min);
            match self.settle(&mut pending, frontier) {
                Ok(settled) => windows.extend(settled),
                Err(e) => self.record_failure(chrom.clone(), &e),
            }
        }

        for scanner in scanners.iter_mut() {
            if let Some(window) = scanner.finish() {
                pending.windows.push(window);
            }
        }
        match self.settle(&mut pending, u64::MAX) {
            Ok(settled) => windows.extend(settled),
            Err(e) => self.record_failure(chrom.clone(), &e),
        }

        windows
    }

    fn record_failure(&self, region: Region, e: &ScanError) {
        warn!("Skipping {}: {}", region, e);
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ChunkFailure {
                region,
                reason: e.to_string(),
            });
    }

    ///
    /// Scan one section on every strand. Returns the windows closed in this
    /// section, unsplit, together with the section's reads.
    ///
    fn scan_section(
        &self,
        section: &Section,
        strands: &[Option<Strand>],
        scanners: &mut [WindowScanner],
        backgrounds: &mut [BackgroundCollection],
    ) -> Result<(Vec<Region>, SectionReads), ScanError> {
        let reads = self.load_reads(&section.load)?;
        let load = &section.load;
        let grid = ScanGrid {
            first: section.first,
            end: section.scan_end,
            step: self.bin_step,
            first_bin: ((section.first - load.start) / self.bin_step) as usize,
        };

        let mut closed = Vec::new();
        for (strand, scanner) in strands.iter().zip(scanners.iter_mut()) {
            let signal =
                make_condition_landscapes(&reads.signal, load, self.bin_width, self.bin_step, *strand);
            let control = self.any_controls.then(|| {
                make_condition_landscapes(&reads.control, load, self.bin_width, self.bin_step, *strand)
            });

            closed.extend(scanner.scan(&grid, |bin, pos| {
                bin_passes(
                    bin,
                    pos - load.start,
                    load,
                    &signal,
                    control.as_deref(),
                    backgrounds,
                    self.bin_step,
                    *strand,
                )
            }));
        }

        Ok((closed, reads))
    }

    ///
    /// Finalise the pending windows that end below `frontier`, the lowest
    /// coordinate a still open or future window can claim. Windows of both
    /// strands are unioned first, then split, then checked against the
    /// ignore list. Held reads below the first unsettled window are tallied
    /// against the result.
    ///
    fn settle(&self, pending: &mut Pending, frontier: u64) -> Result<Vec<Region>, ScanError> {
        let merged = union_windows(std::mem::take(&mut pending.windows));
        let (ready, waiting): (Vec<Region>, Vec<Region>) = merged
            .into_iter()
            .partition(|w| (w.end as u64) < frontier);
        let settled_to = waiting
            .first()
            .map_or(frontier, |w| frontier.min(w.start as u64));
        pending.windows = waiting;

        let mut settled = Vec::new();
        for window in ready {
            settled.extend(self.emit_window(window, &pending.signal));
        }
        let settled = self.ignore.filter(settled);

        if settled_to > pending.tallied_to {
            let counter = RegionCounter::new(&settled, pending.tallied_to, settled_to)?;
            let signal: Vec<ChannelTally> = pending.signal.iter().map(|r| counter.tally(r)).collect();
            let control: Vec<ChannelTally> =
                pending.control.iter().map(|r| counter.tally(r)).collect();
            self.tallies.add(&signal, &control);
            pending.tallied_to = settled_to;
        }
        pending.release(settled_to.saturating_sub(self.config.lookback() as u64));

        Ok(settled)
    }

    fn load_reads(&self, region: &Region) -> Result<SectionReads, ScanError> {
        let _guard = self.read_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut signal = Vec::with_capacity(self.conditions.len());
        let mut control = Vec::with_capacity(self.conditions.len());
        for condition in &self.conditions {
            signal.push(condition.reads(region, Channel::Signal)?);
            control.push(condition.reads(region, Channel::Control)?);
        }

        Ok(SectionReads { signal, control })
    }

    ///
    /// Split `window` when it is longer than the maximum analysis window.
    /// `signal` holds every read counted from the window's start onwards on
    /// both strands, so a window grown over several sections is cut on its
    /// whole landscape.
    ///
    fn emit_window(&self, window: Region, signal: &[Vec<StrandedRead>]) -> Vec<Region> {
        if window.width() <= self.config.max_analysis_window {
            return vec![window];
        }
        let parts = self.splitter.split_window(&window, signal, None);
        debug!("Split {} into {} parts", window, parts.len());
        parts
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn potential_regions(&self) -> Vec<Region> {
        self.potential_regions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn chunk_failures(&self) -> Vec<ChunkFailure> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn pot_region_length_total(&self) -> u64 {
        self.pot_region_length_total
    }

    pub fn pot_reg_counts_sig_channel(&self, condition: usize) -> f64 {
        self.tallies.signal(condition).potential
    }

    pub fn non_pot_reg_counts_sig_channel(&self, condition: usize) -> f64 {
        self.tallies.signal(condition).non_potential
    }

    pub fn pot_reg_counts_ctrl_channel(&self, condition: usize) -> f64 {
        self.tallies.control(condition).potential
    }

    pub fn non_pot_reg_counts_ctrl_channel(&self, condition: usize) -> f64 {
        self.tallies.control(condition).non_potential
    }
}

///
/// Deal chromosomes to `workers` slots in turn: the first to slot 0, the
/// second to slot 1 and so on, wrapping around.
///
pub fn assign_round_robin(chromosomes: Vec<Region>, workers: usize) -> Vec<Vec<Region>> {
    let workers = workers.max(1);
    let mut slots: Vec<Vec<Region>> = vec![Vec::new(); workers];
    for (i, chrom) in chromosomes.into_iter().enumerate() {
        slots[i % workers].push(chrom);
    }
    slots
}
