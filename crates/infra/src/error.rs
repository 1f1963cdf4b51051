//! Caller-facing errors of the analytics service.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use bloomstock_core::DomainError;

use crate::store::StoreError;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: String },

    #[error("invalid `{field}`: {message}")]
    InvalidInput { field: String, message: String },

    #[error("storage failure: {0}")]
    Storage(String),
}

impl ServiceError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::NotFound { .. } => "NOT_FOUND",
            ServiceError::InvalidInput { .. } => "INVALID_INPUT",
            ServiceError::Storage(_) => "STORAGE_FAILURE",
        }
    }

    pub fn detail(&self) -> ErrorDetail {
        ErrorDetail {
            code: self.code().to_string(),
            message: self.to_string(),
            field: match self {
                ServiceError::InvalidInput { field, .. } => Some(field.clone()),
                _ => None,
            },
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation { field, message } => Self::InvalidInput { field, message },
            DomainError::InvariantViolation(message) => Self::InvalidInput {
                field: "state".to_string(),
                message,
            },
            DomainError::InvalidId(message) => Self::InvalidInput {
                field: "id".to_string(),
                message,
            },
            DomainError::NotFound(what) => Self::NotFound {
                entity: what,
                id: String::new(),
            },
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound {
                entity: entity.to_string(),
                id,
            },
            StoreError::Rejected(domain) => domain.into(),
            other => Self::Storage(other.to_string()),
        }
    }
}

/// Field-level error payload for presentation layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Outcome of a single-item call: a success flag plus data or a readable error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl<T> ActionResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(err: &ServiceError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err.detail()),
        }
    }
}

impl<T> From<Result<T, ServiceError>> for ActionResult<T> {
    fn from(result: Result<T, ServiceError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::failed(&e),
        }
    }
}
