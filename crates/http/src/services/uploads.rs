//! File uploads

use crate::client::request::{FilePart, PendingRequest};
use crate::client::{ApiClient, error::ClientError};
use crate::types::UploadKind;
use serde_json::Value;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct UploadService {
    client: ApiClient,
}

impl UploadService {
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Upload one file; returns the backend's description of the stored file
    pub async fn upload(&self, kind: UploadKind, file: FilePart) -> Result<Value, ClientError> {
        debug!(path = kind.path(), file_name = %file.file_name, size = file.bytes.len(), "Uploading file");
        self.client
            .fetch(&PendingRequest::post(kind.path()).file(file))
            .await
    }
}
