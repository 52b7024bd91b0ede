// Pipeline processing: text normalization, cleaning and deduplication

pub mod clean;
pub mod dedupe;
pub mod normalize;

pub use clean::{clean, CleanMetrics, CleanOutput};
