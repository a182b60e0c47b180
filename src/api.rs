// Storage client module: the `ObjectStore` seam used by the upload flow and
// a small blocking HTTP client that talks to the provider's upload and
// listing endpoints.

use crate::auth::{Credentials, TOKEN_TTL_SECS};
use crate::config::SessionConfig;
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use reqwest::blocking::{multipart, Client, Response};
use reqwest::header::AUTHORIZATION;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::time::Duration;

/// Stream handed to [`ObjectStore::put`].
pub struct UploadBody {
    pub reader: Box<dyn Read + Send>,
    pub len: u64,
    pub file_name: String,
}

/// Result of a successful put.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PutRet {
    pub key: String,
    #[serde(default)]
    pub hash: String,
}

/// One object of a bucket listing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub key: String,
    #[serde(default)]
    pub hash: String,
    #[serde(rename = "fsize", default)]
    pub size: i64,
    #[serde(rename = "mimeType", default)]
    pub mime_type: String,
    /// Upload time in units of 100 nanoseconds since the epoch.
    #[serde(rename = "putTime", default)]
    pub put_time: i64,
}

impl ListEntry {
    pub fn uploaded_at(&self) -> Option<DateTime<Utc>> {
        let secs = self.put_time.div_euclid(10_000_000);
        let nanos = (self.put_time.rem_euclid(10_000_000) * 100) as u32;
        DateTime::from_timestamp(secs, nanos)
    }
}

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    items: Vec<ListEntry>,
}

/// The external object storage collaborator.
pub trait ObjectStore: Send + Sync {
    fn upload_token(&self, bucket: &str) -> Result<String, StoreError>;
    fn put(&self, token: &str, key: &str, body: UploadBody) -> Result<PutRet, StoreError>;
    fn list_files(
        &self,
        bucket: &str,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<ListEntry>, StoreError>;
}

/// Blocking HTTP client for the provider's form upload and list APIs.
#[derive(Clone)]
pub struct QiniuClient {
    client: Client,
    credentials: Credentials,
    up_host: String,
    rsf_host: String,
}

impl QiniuClient {
    /// Build a client from the session config. The credentials are derived
    /// here once and reused for every request.
    pub fn from_config(config: &SessionConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(config.request_timeout_secs.map(Duration::from_secs))
            .build()?;
        Ok(QiniuClient {
            client,
            credentials: Credentials::new(&config.access_key, &config.secret_key),
            up_host: config.up_host.trim_end_matches('/').to_string(),
            rsf_host: config.rsf_host.trim_end_matches('/').to_string(),
        })
    }

    fn check(res: Response) -> Result<Response, StoreError> {
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().unwrap_or_else(|_| "".into());
            return Err(StoreError::Status { status, body });
        }
        Ok(res)
    }
}

impl ObjectStore for QiniuClient {
    fn upload_token(&self, bucket: &str) -> Result<String, StoreError> {
        let deadline = Utc::now().timestamp() + TOKEN_TTL_SECS;
        self.credentials.upload_token(bucket, deadline)
    }

    fn put(&self, token: &str, key: &str, body: UploadBody) -> Result<PutRet, StoreError> {
        let part = multipart::Part::reader_with_length(body.reader, body.len)
            .file_name(body.file_name);
        let form = multipart::Form::new()
            .text("token", token.to_string())
            .text("key", key.to_string())
            .part("file", part);

        tracing::debug!(host = %self.up_host, key, "form upload");
        let res = self.client.post(&self.up_host).multipart(form).send()?;
        let ret: PutRet = Self::check(res)?
            .json()
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;
        Ok(ret)
    }

    fn list_files(
        &self,
        bucket: &str,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<ListEntry>, StoreError> {
        let limit = limit.to_string();
        let url = Url::parse_with_params(
            &format!("{}/list", self.rsf_host),
            &[("bucket", bucket), ("prefix", prefix), ("limit", limit.as_str())],
        )
        .map_err(|e| StoreError::InvalidUrl(e.to_string()))?;

        let path_and_query = format!("{}?{}", url.path(), url.query().unwrap_or(""));
        let authorization = self.credentials.management_authorization(&path_and_query)?;

        let res = self
            .client
            .get(url)
            .header(AUTHORIZATION, authorization)
            .send()?;
        let list: ListResponse = Self::check(res)?
            .json()
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;
        Ok(list.items)
    }
}
