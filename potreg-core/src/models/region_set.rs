use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;

use crate::errors::CoreError;
use crate::models::Region;
use crate::utils::{get_dynamic_reader, is_header_line, parse_bedlike_line};

///
/// RegionSet struct, an ordered collection of regions, such as a bed file.
///
#[derive(Clone, Debug, Default)]
pub struct RegionSet {
    pub regions: Vec<Region>,
    pub path: Option<PathBuf>,
}

impl TryFrom<&Path> for RegionSet {
    type Error = CoreError;

    ///
    /// Create a new [RegionSet] from a bed file. BED intervals are 0-based
    /// half-open; they are converted to closed 1-based regions.
    ///
    /// # Arguments:
    /// - value: path to bed file on disk.
    fn try_from(value: &Path) -> Result<Self, CoreError> {
        let reader = get_dynamic_reader(value)?;

        let mut new_regions: Vec<Region> = Vec::new();
        let mut first_line = true;

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() || is_header_line(&line) {
                continue;
            }

            match parse_bedlike_line(&line) {
                Some((chr, start, end)) if end > start => {
                    new_regions.push(Region::new(chr, start + 1, end));
                }
                // column headers like `chr start end` without a leading #
                None if first_line => {}
                _ => return Err(CoreError::RegionParseError(line)),
            }
            first_line = false;
        }

        if new_regions.is_empty() {
            return Err(CoreError::EmptyRegionSet(value.display().to_string()));
        }

        let mut rs = RegionSet {
            regions: new_regions,
            path: Some(value.to_owned()),
        };
        rs.sort();

        Ok(rs)
    }
}

impl TryFrom<&str> for RegionSet {
    type Error = CoreError;

    fn try_from(value: &str) -> Result<Self, CoreError> {
        RegionSet::try_from(Path::new(value))
    }
}

impl From<Vec<Region>> for RegionSet {
    fn from(regions: Vec<Region>) -> Self {
        RegionSet {
            regions,
            path: None,
        }
    }
}

impl<'a> IntoIterator for &'a RegionSet {
    type Item = &'a Region;
    type IntoIter = std::slice::Iter<'a, Region>;

    fn into_iter(self) -> Self::IntoIter {
        self.regions.iter()
    }
}

impl RegionSet {
    ///
    /// Save a regionset to disk as bed file
    ///
    /// # Arguments
    /// - path: the path to the file to dump to
    pub fn to_bed<T: AsRef<Path>>(&self, path: T) -> std::io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = BufWriter::new(File::create(path)?);
        self.write_bed(&mut file)?;
        file.flush()
    }

    ///
    /// Save a regionset to disk as bed.gz file
    ///
    /// # Arguments
    /// - path: the path to the file to dump to
    pub fn to_bed_gz<T: AsRef<Path>>(&self, path: T) -> std::io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = File::create(path)?;
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::best());
        self.write_bed(&mut encoder)?;
        encoder.finish()?;

        Ok(())
    }

    /// Write one BED line per region to any writer.
    pub fn write_bed<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for region in &self.regions {
            writeln!(writer, "{}", region.as_string())?;
        }
        Ok(())
    }

    ///
    /// Sort by chromosome, then start.
    ///
    pub fn sort(&mut self) {
        self.regions.sort();
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    ///
    /// Sum of all region widths
    ///
    pub fn total_width(&self) -> u64 {
        self.regions.iter().map(|r| r.width() as u64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    fn write_bed(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[rstest]
    fn test_open_from_path_converts_coordinates() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_bed(
            dir.path(),
            "ignore.bed",
            "track name=towers\nchr2\t10\t20\nchr1\t0\t100\tname\n",
        );

        let rs = RegionSet::try_from(path.as_path()).unwrap();
        assert_eq!(
            rs.regions,
            vec![Region::new("chr1", 1, 100), Region::new("chr2", 11, 20)]
        );
        assert_eq!(rs.total_width(), 110);
    }

    #[rstest]
    fn test_column_header_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_bed(dir.path(), "hdr.bed", "chrom\tstart\tend\nchr1\t5\t6\n");

        let rs = RegionSet::try_from(path.as_path()).unwrap();
        assert_eq!(rs.len(), 1);
    }

    #[rstest]
    fn test_empty_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_bed(dir.path(), "empty.bed", "# nothing here\n");

        assert!(matches!(
            RegionSet::try_from(path.as_path()),
            Err(CoreError::EmptyRegionSet(_))
        ));
    }

    #[rstest]
    fn test_save_bed_gz_and_reload() {
        let rs = RegionSet::from(vec![
            Region::new("chr1", 101, 300),
            Region::new("chr1", 1001, 1500),
        ]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("regions.bed.gz");
        rs.to_bed_gz(&path).unwrap();

        let reloaded = RegionSet::try_from(path.as_path()).unwrap();
        assert_eq!(reloaded.regions, rs.regions);
    }
}
