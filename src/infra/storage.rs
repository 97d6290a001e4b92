//! Filesystem-backed manifest store.

use std::{
    io::ErrorKind,
    path::PathBuf,
    time::Duration,
};

use async_trait::async_trait;
use serde_json::Value;
use time::OffsetDateTime;
use tokio::{fs, time::timeout};

use crate::{
    application::repos::{ManifestStore, StoreError},
    domain::manifest::ManifestType,
};

/// Reads producer-written JSON documents below a root directory.
#[derive(Debug, Clone)]
pub struct FsManifestStore {
    root: PathBuf,
    read_timeout: Duration,
}

impl FsManifestStore {
    pub fn new(root: impl Into<PathBuf>, read_timeout: Duration) -> Self {
        Self {
            root: root.into(),
            read_timeout,
        }
    }

    pub fn path_for(&self, ty: ManifestType) -> PathBuf {
        self.root.join(ty.relative_path())
    }

    fn timeout_error(&self, ty: ManifestType) -> StoreError {
        StoreError::Timeout {
            path: ty.relative_path().to_string(),
            limit_ms: u64::try_from(self.read_timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

fn io_error(ty: ManifestType, source: std::io::Error) -> StoreError {
    let path = ty.relative_path().to_string();
    if source.kind() == ErrorKind::NotFound {
        StoreError::NotFound { path }
    } else {
        StoreError::Io { path, source }
    }
}

#[async_trait]
impl ManifestStore for FsManifestStore {
    async fn read(&self, ty: ManifestType) -> Result<Value, StoreError> {
        let path = self.path_for(ty);
        let bytes = timeout(self.read_timeout, fs::read(&path))
            .await
            .map_err(|_| self.timeout_error(ty))?
            .map_err(|err| io_error(ty, err))?;

        serde_json::from_slice(&bytes).map_err(|source| StoreError::Parse {
            path: ty.relative_path().to_string(),
            source,
        })
    }

    async fn modified_at(&self, ty: ManifestType) -> Result<Option<OffsetDateTime>, StoreError> {
        let path = self.path_for(ty);
        let metadata = timeout(self.read_timeout, fs::metadata(&path))
            .await
            .map_err(|_| self.timeout_error(ty))?
            .map_err(|err| io_error(ty, err))?;

        // Some filesystems do not record modification times.
        Ok(metadata.modified().ok().map(OffsetDateTime::from))
    }
}
