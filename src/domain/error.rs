use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("unknown manifest type `{value}`")]
    UnknownManifestType { value: String },
}

impl DomainError {
    pub fn unknown_manifest_type(value: impl Into<String>) -> Self {
        Self::UnknownManifestType {
            value: value.into(),
        }
    }
}
