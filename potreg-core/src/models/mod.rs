pub mod genome;
pub mod read;
pub mod region;
pub mod region_set;

// re-export for cleaner imports
pub use self::genome::Genome;
pub use self::read::{Strand, StrandedRead};
pub use self::region::Region;
pub use self::region_set::RegionSet;
