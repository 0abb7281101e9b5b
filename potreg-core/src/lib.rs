//! Core data model shared by the potreg crates: closed genomic regions,
//! stranded weighted reads, genome metadata and small BED helpers.

pub mod errors;
pub mod models;
pub mod utils;
