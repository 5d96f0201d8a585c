use crate::config::ConfigurationError;
use crate::provider::ProviderError;

/// Crate-level error umbrella. Per-item validation and provider task failures
/// are not errors at this level; they are converted into work item state at
/// the scheduling boundary and never propagate out of the main loop.
#[derive(Debug, thiserror::Error)]
pub enum RelocatorError {
    #[error("State transition error: {0}")]
    StateTransition(String),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Input error: {0}")]
    Input(String),
}

pub type Result<T> = std::result::Result<T, RelocatorError>;
