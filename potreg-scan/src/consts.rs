pub const DEFAULT_BIN_WIDTH: u32 = 200;
pub const DEFAULT_BIN_STEP: u32 = 100;
pub const DEFAULT_MAX_SECTION: u32 = 50_000_000;
pub const DEFAULT_MAX_ANALYSIS_WINDOW: u32 = 10_000;
pub const DEFAULT_MAX_THREADS: usize = 1;
pub const DEFAULT_LOG_CONFIDENCE: f64 = -6.0;
pub const DEFAULT_LOCAL_WINDOW: u32 = 10_000;
pub const DEFAULT_MAPPABLE_GENOME_PROP: f64 = 0.8;

/// Half-width of the band around the preferred length where split points are searched.
pub const SPLIT_TOLERANCE: u32 = 1_000;

/// A part is only cut once the remaining window is longer than this multiple of the preferred length.
pub const SPLIT_TRIGGER_FACTOR: f64 = 1.5;

/// Signal-based local backgrounds narrower than this are skipped; they would suppress real enrichment.
pub const MIN_SIGNAL_LOCAL_WINDOW: u32 = 10_000;
