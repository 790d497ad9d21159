//! Asset host client and the parallel media upload fan-out.

use bytes::Bytes;
use futures::future::try_join_all;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::{error, info, instrument};

use crate::config::AppConfig;
use crate::errors::ServiceError;

/// One file pulled out of the admin's multipart request
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Debug, Deserialize)]
struct AssetHostResponse {
    url: String,
}

#[derive(Clone)]
pub struct AssetStorageClient {
    http: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl AssetStorageClient {
    pub fn new(http: Client, base_url: String, api_key: String, api_secret: String) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            api_secret,
        }
    }

    pub fn from_config(http: Client, config: &AppConfig) -> Self {
        Self::new(
            http,
            config.asset_base_url.clone(),
            config.asset_api_key.clone(),
            config.asset_api_secret.clone(),
        )
    }

    /// Uploads a single file to the asset host, returning its public URL.
    #[instrument(skip(self, file), fields(file_name = %file.file_name))]
    pub async fn upload(&self, file: UploadFile) -> Result<String, ServiceError> {
        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .map_err(|_| {
                ServiceError::ValidationError(format!(
                    "unsupported content type: {}",
                    file.content_type
                ))
            })?;
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(format!("{}/upload", self.base_url))
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                error!("Asset host request failed: {}", e);
                ServiceError::ExternalServiceError("asset host unreachable".to_string())
            })?;

        if !response.status().is_success() {
            error!(
                status = %response.status(),
                file_name = %file.file_name,
                "Asset host rejected upload"
            );
            return Err(ServiceError::ExternalServiceError(
                "asset host rejected upload".to_string(),
            ));
        }

        let body = response.json::<AssetHostResponse>().await.map_err(|e| {
            error!("Asset host returned malformed body: {}", e);
            ServiceError::ExternalServiceError("asset host returned malformed body".to_string())
        })?;

        Ok(body.url)
    }

    /// Uploads all files concurrently; the whole batch succeeds or the whole
    /// request fails. The first failure propagates and uploads that already
    /// finished are left on the asset host (they are unreferenced and cheap).
    #[instrument(skip(self, files), fields(count = files.len()))]
    pub async fn upload_many(&self, files: Vec<UploadFile>) -> Result<Vec<String>, ServiceError> {
        if files.is_empty() {
            return Err(ServiceError::ValidationError(
                "no files provided".to_string(),
            ));
        }

        let uploads = files.into_iter().map(|file| self.upload(file));
        let urls = try_join_all(uploads).await?;

        info!(count = urls.len(), "Media batch uploaded");
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_batch_is_a_validation_error() {
        let client = AssetStorageClient::new(
            Client::new(),
            "http://127.0.0.1:9".to_string(),
            "key".to_string(),
            "secret".to_string(),
        );
        let err = client.upload_many(Vec::new()).await.unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }
}
