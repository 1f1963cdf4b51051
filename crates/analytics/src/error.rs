use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalyticsError {
    #[error("invalid calculation input: {0}")]
    InvalidInput(String),

    #[error("invalid policy: {0}")]
    InvalidPolicy(String),
}
