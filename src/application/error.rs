use std::error::Error as StdError;

use axum::{http::StatusCode, response::Response};
use thiserror::Error;

use crate::{
    application::repos::StoreError,
    domain::{error::DomainError, manifest::ManifestType},
    infra::error::InfraError,
};

/// Diagnostic attached to failing responses and consumed by the logging middleware.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Failures surfaced by manifest resolution and cache administration.
///
/// Cache backend faults never appear here; they are absorbed by the resolver.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("unknown manifest type `{0}`")]
    UnknownType(String),
    #[error("manifest `{0}` has not been produced yet")]
    NotFound(ManifestType),
    #[error("failed to load manifest `{manifest_type}`")]
    Storage {
        manifest_type: ManifestType,
        #[source]
        source: StoreError,
    },
    #[error("cache administration credential rejected")]
    Unauthorized,
    #[error("cache backend rejected administrative operation: {0}")]
    CacheAdmin(String),
}

impl ManifestError {
    pub fn storage(manifest_type: ManifestType, source: StoreError) -> Self {
        if source.is_not_found() {
            return Self::NotFound(manifest_type);
        }
        Self::Storage {
            manifest_type,
            source,
        }
    }
}

impl From<DomainError> for ManifestError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::UnknownManifestType { value } => Self::UnknownType(value),
        }
    }
}

/// Process-level failure reported by the binary before exiting.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
