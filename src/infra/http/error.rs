use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use manifestd_api_types::ErrorBody;

use crate::{
    application::error::{ErrorReport, ManifestError},
    domain::manifest::ManifestType,
};

pub mod codes {
    pub const UNKNOWN_MANIFEST_TYPE: &str = "unknown_manifest_type";
    pub const MANIFEST_NOT_FOUND: &str = "manifest_not_found";
    pub const STORAGE_ERROR: &str = "storage_error";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const CACHE_UNAVAILABLE: &str = "cache_unavailable";
}

/// Failing HTTP response: a JSON [`ErrorBody`] plus the report logged by middleware.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
    report: ErrorReport,
}

impl ApiError {
    fn new(status: StatusCode, code: &str, message: String, report: ErrorReport) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: code.to_string(),
                message,
                available_types: None,
                suggestion: None,
            },
            report,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &ErrorBody {
        &self.body
    }

    fn with_available_types(mut self) -> Self {
        self.body.available_types = Some(ManifestType::names());
        self
    }

    fn with_suggestion(mut self, suggestion: String) -> Self {
        self.body.suggestion = Some(suggestion);
        self
    }
}

impl From<ManifestError> for ApiError {
    fn from(error: ManifestError) -> Self {
        const SOURCE: &str = "infra::http::manifests";

        match &error {
            ManifestError::UnknownType(name) => {
                let status = StatusCode::NOT_FOUND;
                ApiError::new(
                    status,
                    codes::UNKNOWN_MANIFEST_TYPE,
                    format!("Manifest type '{name}' does not exist"),
                    ErrorReport::from_error(SOURCE, status, &error),
                )
                .with_available_types()
            }
            ManifestError::NotFound(ty) => {
                let status = StatusCode::NOT_FOUND;
                ApiError::new(
                    status,
                    codes::MANIFEST_NOT_FOUND,
                    format!("Manifest '{ty}' has not been generated yet"),
                    ErrorReport::from_error(SOURCE, status, &error),
                )
                .with_suggestion(format!(
                    "Run the manifest producer to write {} and retry",
                    ty.relative_path()
                ))
            }
            ManifestError::Storage { manifest_type, .. } => {
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                ApiError::new(
                    status,
                    codes::STORAGE_ERROR,
                    format!("Failed to load manifest '{manifest_type}'"),
                    ErrorReport::from_error(SOURCE, status, &error),
                )
            }
            ManifestError::Unauthorized => {
                let status = StatusCode::UNAUTHORIZED;
                ApiError::new(
                    status,
                    codes::UNAUTHORIZED,
                    "Invalid or missing cache secret".to_string(),
                    ErrorReport::from_error("infra::http::cache", status, &error),
                )
            }
            ManifestError::CacheAdmin(_) => {
                let status = StatusCode::SERVICE_UNAVAILABLE;
                ApiError::new(
                    status,
                    codes::CACHE_UNAVAILABLE,
                    "Cache backend is unavailable".to_string(),
                    ErrorReport::from_error("infra::http::cache", status, &error),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();
        self.report.attach(&mut response);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::repos::StoreError;

    #[test]
    fn unknown_type_lists_available_types() {
        let error = ApiError::from(ManifestError::UnknownType("gallery".to_string()));
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
        assert_eq!(error.body().error, codes::UNKNOWN_MANIFEST_TYPE);
        assert_eq!(
            error.body().available_types.as_deref(),
            Some(&["concert".to_string(), "events".to_string(), "universal".to_string()][..])
        );
        assert!(error.body().suggestion.is_none());
    }

    #[test]
    fn missing_document_carries_suggestion() {
        let error = ApiError::from(ManifestError::NotFound(ManifestType::Events));
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
        assert_eq!(error.body().error, codes::MANIFEST_NOT_FOUND);
        assert!(
            error
                .body()
                .suggestion
                .as_deref()
                .is_some_and(|s| s.contains("events/manifest.json"))
        );
        assert!(error.body().available_types.is_none());
    }

    #[test]
    fn storage_fault_is_internal_and_keeps_chain_in_report() {
        let error = ApiError::from(ManifestError::Storage {
            manifest_type: ManifestType::Concert,
            source: StoreError::Timeout {
                path: "concert/manifest.json".to_string(),
                limit_ms: 10,
            },
        });
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.body().error, codes::STORAGE_ERROR);
        assert!(!error.body().message.contains("10ms"));

        let response = error.into_response();
        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("report attached");
        assert_eq!(report.messages.len(), 2);
    }

    #[test]
    fn unauthorized_maps_to_401() {
        let error = ApiError::from(ManifestError::Unauthorized);
        assert_eq!(error.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(error.body().error, codes::UNAUTHORIZED);
    }
}
