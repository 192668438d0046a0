//! # Settings Errors
//!
//! Error handling for the layered settings engine.
//!
//! - Uses `thiserror` for structured error definitions
//! - Every variant carries named fields for context
//! - Store-level failures convert into [`SettingsError::StoreUnavailable`]
//!   so callers see a single, definitive outcome per attempt

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the resolution engine and the configuration manager.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Setting not found: {name}")]
    NotFound { name: String },

    #[error("Store {backend} unavailable: {reason}")]
    StoreUnavailable { backend: String, reason: String },

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Partial write: {failed:?} could not be written")]
    PartialWrite { failed: Vec<String> },

    #[error("Invalid settings configuration: {reason}")]
    InvalidConfig { reason: String }
}

impl SettingsError {
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub fn invalid_value(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.to_string()
        }
    }

    pub fn invalid_config(reason: impl ToString) -> Self {
        Self::InvalidConfig {
            reason: reason.to_string()
        }
    }

    /// Whether the caller may treat this as a plain lookup miss.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. })
    }

    /// Stable machine-readable code, used as the `code` label on lookup
    /// failure metrics.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::StoreUnavailable { .. } => ErrorCode::StoreUnavailable,
            Self::InvalidValue { .. } => ErrorCode::InvalidValue,
            Self::PartialWrite { .. } => ErrorCode::PartialWrite,
            Self::InvalidConfig { .. } => ErrorCode::InvalidConfig
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    StoreUnavailable,
    InvalidValue,
    PartialWrite,
    InvalidConfig
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::NotFound => write!(f, "not_found"),
            ErrorCode::StoreUnavailable => write!(f, "store_unavailable"),
            ErrorCode::InvalidValue => write!(f, "invalid_value"),
            ErrorCode::PartialWrite => write!(f, "partial_write"),
            ErrorCode::InvalidConfig => write!(f, "invalid_config")
        }
    }
}

/// Key-value store client errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Connection to {backend} failed: {reason}")]
    ConnectionError { backend: String, reason: String },

    #[error("Query on {backend} failed: {reason}")]
    QueryError { backend: String, reason: String },

    #[error("Serialization error: {error_type} - {reason}")]
    SerializationError { error_type: String, reason: String },

    #[error("Operation on {backend} timed out after {timeout_ms}ms")]
    Timeout { backend: String, timeout_ms: u64 }
}

impl From<StorageError> for SettingsError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ConnectionError { backend, reason }
            | StorageError::QueryError { backend, reason } => {
                SettingsError::StoreUnavailable { backend, reason }
            }
            StorageError::Timeout {
                backend,
                timeout_ms
            } => {
                tracing::warn!(%backend, timeout_ms, "Store operation timed out");
                SettingsError::StoreUnavailable {
                    backend,
                    reason: format!("timed out after {timeout_ms}ms")
                }
            }
            StorageError::SerializationError { error_type, reason } => {
                SettingsError::InvalidValue {
                    key: error_type,
                    reason
                }
            }
        }
    }
}

/// Marker-file discovery errors
#[derive(Debug, Error)]
pub enum LocatorError {
    #[error("Marker {marker} not found on path from {}", start.display())]
    NotFoundOnPath { marker: String, start: PathBuf },

    #[error("Failed to inspect {}: {reason}", path.display())]
    Io { path: PathBuf, reason: String }
}
