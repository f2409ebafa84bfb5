//! Google Cloud Storage implementation of [`ObjectSink`] over the JSON API.
//!
//! Authentication is a bearer access token, either given directly or minted once from a
//! service-account key when the sink is connected (see [`crate::credentials`]). The
//! endpoint can be pointed at an emulator.

use async_trait::async_trait;
use reqwest::{Body, Client, Response, Url};
use std::path::Path;
use tokio_util::io::ReaderStream;
use tracing::{debug, error};

use crate::contract::{ObjectSink, SinkError};
use crate::credentials::Credentials;

pub const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

pub struct GcsSink {
    client: Client,
    endpoint: Url,
    bucket: String,
    access_token: String,
}

impl GcsSink {
    pub fn new(bucket: impl Into<String>, access_token: impl Into<String>) -> Result<Self, SinkError> {
        Self::with_endpoint(bucket, access_token, DEFAULT_ENDPOINT)
    }

    pub fn with_endpoint(
        bucket: impl Into<String>,
        access_token: impl Into<String>,
        endpoint: &str,
    ) -> Result<Self, SinkError> {
        Ok(Self {
            client: http_client()?,
            endpoint: Url::parse(endpoint)?,
            bucket: bucket.into(),
            access_token: access_token.into(),
        })
    }

    /// Resolve `credentials` to an access token and build a sink for `bucket`.
    pub async fn connect(
        bucket: impl Into<String>,
        credentials: &Credentials,
        endpoint: Option<&str>,
    ) -> Result<Self, SinkError> {
        let client = http_client()?;
        let access_token = credentials.access_token(&client).await?;
        Ok(Self {
            client,
            endpoint: Url::parse(endpoint.unwrap_or(DEFAULT_ENDPOINT))?,
            bucket: bucket.into(),
            access_token,
        })
    }

    /// `{endpoint}/upload/storage/v1/b/{bucket}/o?uploadType=media&name={key}`
    fn media_upload_url(&self, key: &str) -> Result<Url, SinkError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| format!("endpoint cannot be a base URL: {}", self.endpoint))?
            .pop_if_empty()
            .extend(["upload", "storage", "v1", "b", self.bucket.as_str(), "o"]);
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", key);
        Ok(url)
    }

    /// `{endpoint}/storage/v1/b/{bucket}/o/{key}` with the key as a single escaped segment.
    fn object_url(&self, key: &str) -> Result<Url, SinkError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| format!("endpoint cannot be a base URL: {}", self.endpoint))?
            .pop_if_empty()
            .extend(["storage", "v1", "b", self.bucket.as_str(), "o", key]);
        Ok(url)
    }
}

fn http_client() -> Result<Client, SinkError> {
    Ok(Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

async fn check_status(response: Response, action: &str, key: &str) -> Result<(), SinkError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    error!(%status, key, body = %body, "[GCS][ERROR] {action} failed");
    Err(format!("{action} of {key} failed with status {status}: {body}").into())
}

#[async_trait]
impl ObjectSink for GcsSink {
    async fn put_object(&self, local_path: &Path, destination_key: &str) -> Result<(), SinkError> {
        let file = tokio::fs::File::open(local_path).await?;
        let size = file.metadata().await?.len();
        let url = self.media_upload_url(destination_key)?;
        debug!(key = destination_key, size, bucket = %self.bucket, "[GCS] Writing object");

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .header(reqwest::header::CONTENT_LENGTH, size)
            .body(Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await?;
        check_status(response, "write", destination_key).await
    }

    async fn set_content_type(&self, destination_key: &str, content_type: &str) -> Result<(), SinkError> {
        let url = self.object_url(destination_key)?;
        debug!(key = destination_key, content_type, "[GCS] Updating object attributes");

        let response = self
            .client
            .patch(url)
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({ "contentType": content_type }))
            .send()
            .await?;
        check_status(response, "attribute update", destination_key).await
    }
}
