use std::fmt::{self, Display};
use std::str::FromStr;

use crate::errors::CoreError;

#[derive(Eq, PartialEq, Hash, Debug, Clone, Copy)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    pub fn as_char(&self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }
}

impl Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for Strand {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Strand::Forward),
            "-" => Ok(Strand::Reverse),
            _ => Err(CoreError::ReadParseError(format!("unknown strand: {}", s))),
        }
    }
}

///
/// A weighted, stranded read position (typically the 5' end of a read).
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrandedRead {
    pub coordinate: u32,
    pub strand: Strand,
    pub weight: f64,
}

impl StrandedRead {
    pub fn new(coordinate: u32, strand: Strand, weight: f64) -> Self {
        StrandedRead {
            coordinate,
            strand,
            weight,
        }
    }
}
