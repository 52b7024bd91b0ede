// Pipeline ingestion: line decoding and the review/business join

pub mod decoder;
pub mod joiner;
pub mod literal;

pub use decoder::DualFormatDecoder;
pub use joiner::{join, join_files, JoinOutput, JoinStats};
