// Error types: configuration validation failures and simulator usage errors

use thiserror::Error;

/// Configuration Errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Unknown observation encoding '{0}' (expected color, gray or layered)")]
    UnknownEncoding(String),
    #[error("Unknown policy '{0}' (expected random, nearest or a bucket index)")]
    UnknownPolicy(String),
    #[error("Generation direction count must be positive")]
    ZeroGenerationDirections,
    #[error("Shoot discretization must have at least one bucket")]
    ZeroShootBuckets,
    #[error("Output grid must be at least 1x1 (got {width}x{height})")]
    EmptyOutput { width: usize, height: usize },
    #[error("World scale must be positive (got {0})")]
    InvalidWorldScale(f64),
    #[error("Polygon edge count {0} is outside {{3, 4, 5}}")]
    InvalidEdgeCount(u8),
    #[error("Polygon edge count {0} appears more than once")]
    DuplicateEdgeProfile(u8),
    #[error("No profile configured for polygon edge count {0}")]
    MissingEdgeProfile(u8),
    #[error("Polygon profile for edge count {edges} has a non-positive {field}")]
    NonPositiveProfileValue { edges: u8, field: &'static str },
    #[error("Entity constant {0} must be positive")]
    NonPositiveConstant(&'static str),
    #[error("Spawn distance band [{min}, {max}] is empty")]
    EmptyDistanceBand { min: f64, max: f64 },
    #[error("Spawn margin {margin} is smaller than the largest polygon radius {radius}")]
    MarginTooSmall { margin: f64, radius: f64 },
    #[error("Spawn margin {0} leaves no room inside the world")]
    MarginTooLarge(f64),
    #[error("Jitter divider must be positive (got {0})")]
    InvalidJitterDivider(f64),
    #[error("Episode length must be at least one tick")]
    ZeroEpisodeLength,
    #[error("At least one generation direction per episode is required")]
    ZeroDirectionsPerEpisode,
}

/// Simulator Errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("step called before reset: the world state is empty")]
    NotReset,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}
