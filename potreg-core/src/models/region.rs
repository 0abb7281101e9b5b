use std::cmp::Ordering;
use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

///
/// Region struct, a closed interval `[start, end]` on one chromosome.
/// Coordinates are 1-based, so a chromosome of length `n` is `[1, n]`.
///
#[derive(Eq, PartialEq, Hash, Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub chr: String,
    pub start: u32,
    pub end: u32,
}

impl Region {
    pub fn new<S: Into<String>>(chr: S, start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "region start must not exceed its end");
        Region {
            chr: chr.into(),
            start,
            end,
        }
    }

    ///
    /// Number of bases covered, both ends included
    ///
    pub fn width(&self) -> u32 {
        self.end - self.start + 1
    }

    /// Do the two regions share at least one base?
    pub fn overlaps(&self, other: &Region) -> bool {
        self.chr == other.chr && self.start <= other.end && other.start <= self.end
    }

    pub fn contains(&self, coordinate: u32) -> bool {
        coordinate >= self.start && coordinate <= self.end
    }

    ///
    /// Get the BED line for this region (0-based, half-open)
    ///
    pub fn as_string(&self) -> String {
        format!(
            "{}\t{}\t{}",
            self.chr,
            self.start.saturating_sub(1),
            self.end
        )
    }

    /// `chr:start-end`, the form accepted by [`Region::from_str`].
    pub fn location_string(&self) -> String {
        format!("{}:{}-{}", self.chr, self.start, self.end)
    }
}

impl Ord for Region {
    fn cmp(&self, other: &Self) -> Ordering {
        self.chr
            .cmp(&other.chr)
            .then_with(|| self.start.cmp(&other.start))
            .then_with(|| self.end.cmp(&other.end))
    }
}

impl PartialOrd for Region {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.location_string())
    }
}

impl FromStr for Region {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_err = || CoreError::RegionParseError(s.to_string());

        let (chr, span) = s.rsplit_once(':').ok_or_else(parse_err)?;
        let (start, end) = span.split_once('-').ok_or_else(parse_err)?;
        let start: u32 = start.trim().parse().map_err(|_| parse_err())?;
        let end: u32 = end.trim().parse().map_err(|_| parse_err())?;

        if chr.is_empty() || start > end {
            return Err(parse_err());
        }

        Ok(Region::new(chr, start, end))
    }
}
