//! Defaults shared across the join, cleaning and labeling stages.

// Fill values for missing join/cleaning fields
pub const UNKNOWN_BUSINESS: &str = "Unknown Business";
pub const ANONYMOUS_USER: &str = "Anonymous User";

// Rating bounds (inclusive)
pub const MIN_RATING: f64 = 1.0;
pub const MAX_RATING: f64 = 5.0;

// Classifier request defaults
pub const DEFAULT_ENDPOINT: &str = "https://router.huggingface.co/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "Qwen/Qwen3-4B-Instruct-2507";
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_TEMPERATURE: f32 = 0.1;
pub const DEFAULT_API_KEY_ENV: &str = "HF_TOKEN";

// Labeling loop defaults
pub const DEFAULT_BATCH_SIZE: usize = 5;
pub const DEFAULT_BATCH_DELAY_MS: u64 = 1000;

pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

// Hand-label export defaults
pub const DEFAULT_SAMPLE_SIZE: usize = 200;
pub const DEFAULT_SAMPLE_OFFSET: usize = 1000;
pub const DEFAULT_SAMPLE_SEED: u64 = 42;
