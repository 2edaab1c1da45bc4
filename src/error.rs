//! Configuration errors
//!
//! The simulation itself never fails: malformed bodies are skipped, pools grow
//! on demand and degenerate geometry is ignored. Only loading tunables can go
//! wrong.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("`{field}` must be finite and positive, got {value}")]
    NotPositive { field: &'static str, value: f32 },
    #[error("`{field}` must be finite and non-negative, got {value}")]
    Negative { field: &'static str, value: f32 },
    #[error("`{field}` must be finite, got {value}")]
    NotFinite { field: &'static str, value: f32 },
    #[error("`{field}` must lie in [{min}, {max}], got {value}")]
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    #[error("restitution must lie in [0, 1], got {0}")]
    Restitution(f32),
    #[error("range `{field}` has min {min} greater than max {max}")]
    InvertedRange { field: &'static str, min: f32, max: f32 },
}
