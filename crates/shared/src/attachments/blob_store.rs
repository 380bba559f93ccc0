use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_BLOB_API_URL: &str = "https://blob.vercel-storage.com";
const BLOB_API_VERSION: &str = "7";
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

pub type BlobPutFuture<'a> = Pin<Box<dyn Future<Output = Result<String, UploadError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("attachment storage is not configured")]
    NotConfigured,
    #[error("attachment storage is unreachable: {0}")]
    Unavailable(String),
    #[error("attachment storage rejected the file with status {status}")]
    Rejected { status: u16 },
    #[error("attachment storage returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// Object store that accepts a file under a pathname and returns its public URL.
pub trait BlobStore: Send + Sync {
    fn put<'a>(
        &'a self,
        pathname: &'a str,
        content_type: Option<&'a str>,
        bytes: Vec<u8>,
    ) -> BlobPutFuture<'a>;
}

#[derive(Debug, Clone)]
pub struct BlobStoreConfig {
    pub api_url: String,
    pub token: Option<String>,
}

#[derive(Clone)]
pub struct HttpBlobStore {
    client: reqwest::Client,
    config: BlobStoreConfig,
}

#[derive(Debug, Deserialize)]
struct BlobPutResponse {
    url: String,
}

impl HttpBlobStore {
    pub fn new(config: BlobStoreConfig) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .build()
            .map_err(|err| UploadError::Unavailable(err.to_string()))?;
        Ok(Self { client, config })
    }

    async fn put_public(
        &self,
        pathname: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<String, UploadError> {
        let Some(token) = self.config.token.as_deref() else {
            return Err(UploadError::NotConfigured);
        };

        let endpoint = format!("{}/{}", self.config.api_url.trim_end_matches('/'), pathname);
        let mut builder = self
            .client
            .put(&endpoint)
            .bearer_auth(token)
            .header("x-api-version", BLOB_API_VERSION)
            .header("x-access", "public")
            .body(bytes);
        if let Some(content_type) = content_type {
            builder = builder.header("x-content-type", content_type);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| UploadError::Unavailable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Rejected {
                status: status.as_u16(),
            });
        }

        let parsed = response
            .json::<BlobPutResponse>()
            .await
            .map_err(|err| UploadError::InvalidResponse(err.to_string()))?;
        if parsed.url.trim().is_empty() {
            return Err(UploadError::InvalidResponse("empty_url".to_string()));
        }

        Ok(parsed.url)
    }
}

impl BlobStore for HttpBlobStore {
    fn put<'a>(
        &'a self,
        pathname: &'a str,
        content_type: Option<&'a str>,
        bytes: Vec<u8>,
    ) -> BlobPutFuture<'a> {
        Box::pin(self.put_public(pathname, content_type, bytes))
    }
}
