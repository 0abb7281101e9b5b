use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;
use log::info;

use potreg_core::models::{Genome, RegionSet};
use potreg_scan::{CachedReadSource, Condition, PotentialRegionFilter, ScanConfig};

pub fn run_scan(matches: &ArgMatches) -> Result<()> {
    let chromsizes = matches
        .get_one::<String>("chromsizes")
        .ok_or_else(|| anyhow!("A chrom sizes file is required."))?;

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => load_config(Path::new(path))?,
        None => ScanConfig::default(),
    };
    apply_overrides(&mut config, matches)?;

    let genome = Genome::from_chrom_sizes(chromsizes)
        .with_context(|| format!("Failed to read chrom sizes from {}", chromsizes))?;

    let use_scores = matches.get_flag("score");
    let signal: Vec<&String> = matches
        .get_many::<String>("signal")
        .map(|v| v.collect())
        .unwrap_or_default();
    let control: Vec<&String> = matches
        .get_many::<String>("control")
        .map(|v| v.collect())
        .unwrap_or_default();
    let conditions = build_conditions(&signal, &control, use_scores)?;

    let mut filter = PotentialRegionFilter::new(config, genome, conditions)?;
    let regions = filter.execute()?;

    for condition in filter.conditions() {
        let i = condition.index;
        info!(
            "{} ({} signal samples): signal {:.1} in / {:.1} out, control {:.1} in / {:.1} out",
            condition.name,
            condition.signal_sources().len(),
            filter.pot_reg_counts_sig_channel(i),
            filter.non_pot_reg_counts_sig_channel(i),
            filter.pot_reg_counts_ctrl_channel(i),
            filter.non_pot_reg_counts_ctrl_channel(i),
        );
    }

    let rs = RegionSet::from(regions);
    info!("Writing {} regions covering {}bp", rs.len(), rs.total_width());
    match matches.get_one::<String>("output") {
        Some(path) if path.ends_with(".gz") => rs.to_bed_gz(path)?,
        Some(path) => rs.to_bed(path)?,
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            rs.write_bed(&mut writer)?;
            writer.flush()?;
        }
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<ScanConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: ScanConfig = toml::from_str(&text)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    Ok(config)
}

fn apply_overrides(config: &mut ScanConfig, matches: &ArgMatches) -> Result<()> {
    if let Some(threads) = matches.get_one::<usize>("threads") {
        config.max_threads = *threads;
    }
    if let Some(width) = matches.get_one::<u32>("binwidth") {
        config.bin_width = *width;
    }
    if let Some(step) = matches.get_one::<u32>("binstep") {
        config.bin_step = *step;
    }
    if matches.get_flag("stranded") {
        config.stranded = true;
    }
    if let Some(ignore) = matches.get_one::<String>("ignore") {
        let rs = RegionSet::try_from(ignore.as_str())
            .with_context(|| format!("Failed to read ignore list {}", ignore))?;
        config.regions_to_ignore.extend(rs.regions);
    }
    config.progress = true;
    Ok(())
}

/// Split a `NAME=PATH` argument.
fn parse_sample_arg(value: &str) -> Result<(&str, &str)> {
    match value.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => Ok((name, path)),
        _ => Err(anyhow!("Expected NAME=PATH, got '{}'", value)),
    }
}

///
/// Group samples into conditions by name, in order of first appearance
/// among the signal arguments. Every control must name a condition that
/// has signal.
///
fn build_conditions(
    signal: &[&String],
    control: &[&String],
    use_scores: bool,
) -> Result<Vec<Condition>> {
    let mut conditions: Vec<Condition> = Vec::new();

    for value in signal {
        let (name, path) = parse_sample_arg(value)?;
        let source = load_source(path, use_scores)?;
        match conditions.iter_mut().find(|c| c.name == name) {
            Some(condition) => condition.add_signal(source),
            None => {
                let mut condition = Condition::new(name);
                condition.add_signal(source);
                conditions.push(condition);
            }
        }
    }

    for value in control {
        let (name, path) = parse_sample_arg(value)?;
        let condition = conditions
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| anyhow!("Control given for unknown condition '{}'", name))?;
        condition.add_control(load_source(path, use_scores)?);
    }

    Ok(conditions)
}

fn load_source(path: &str, use_scores: bool) -> Result<Arc<CachedReadSource>> {
    let label = Path::new(path)
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string());
    let source = CachedReadSource::from_bed(label, path, use_scores)
        .with_context(|| format!("Failed to load reads from {}", path))?;
    info!("Loaded {} reads from {}", source.read_count(), path);
    Ok(Arc::new(source))
}
