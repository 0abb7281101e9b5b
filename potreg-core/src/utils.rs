use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::errors::CoreError;

///
/// Get a reader for either a gzip'd or non-gzip'd file.
///
/// # Arguments
///
/// - path: path to the file to read
///
pub fn get_dynamic_reader(path: &Path) -> Result<BufReader<Box<dyn Read>>, CoreError> {
    let is_gzipped = path.extension() == Some(OsStr::new("gz"));
    let file = File::open(path)
        .map_err(|e| CoreError::FileReadError(format!("{}: {}", path.display(), e)))?;
    let file: Box<dyn Read> = match is_gzipped {
        true => Box::new(MultiGzDecoder::new(file)),
        false => Box::new(file),
    };

    Ok(BufReader::new(file))
}

/// Header, track and comment lines carry no intervals.
pub fn is_header_line(line: &str) -> bool {
    line.starts_with("browser") || line.starts_with("track") || line.starts_with('#')
}

/// Parses a bed like line into a contig (chromosome), start and end.
/// This ignores any other columns beyond start and end.
pub fn parse_bedlike_line(line: &str) -> Option<(String, u32, u32)> {
    let mut fields = line.split('\t');
    let ctg = fields.next()?.trim();
    let st = fields.next()?.trim().parse::<u32>().ok()?;
    let en = fields.next()?.trim().parse::<u32>().ok()?;

    if ctg.is_empty() {
        return None;
    }

    Some((ctg.to_string(), st, en))
}

///
/// Read a chrom sizes file (`name<whitespace>length` per line), keeping file order.
///
pub fn read_chrom_sizes<T: AsRef<Path>>(path: T) -> Result<Vec<(String, u32)>, CoreError> {
    let reader = get_dynamic_reader(path.as_ref())?;

    let mut chrom_sizes: Vec<(String, u32)> = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut parts = line.split_whitespace();
        let name = parts
            .next()
            .ok_or_else(|| CoreError::ChromSizesError(line.to_string()))?;
        let size = parts
            .next()
            .and_then(|s| s.parse::<u32>().ok())
            .ok_or_else(|| CoreError::ChromSizesError(line.to_string()))?;

        chrom_sizes.push((name.to_string(), size));
    }

    Ok(chrom_sizes)
}
