use thiserror::Error;

/// A parameter record was rejected before it reached the models.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be finite")]
    NotFinite { name: &'static str },

    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("{name} must not be negative, got {value}")]
    Negative { name: &'static str, value: f64 },

    #[error("{name}: out_min {out_min} is above out_max {out_max}")]
    InvertedBounds { name: &'static str, out_min: f64, out_max: f64 },

    #[error("pole pair count must be at least 1")]
    ZeroPolePairs,
}
