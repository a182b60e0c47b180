// Upload orchestration: resolve the path, apply the size and type policy,
// then hand the file to the storage collaborator.

use crate::api::{ObjectStore, QiniuClient, UploadBody};
use crate::config::SessionConfig;
use crate::error::{StoreError, UploadError};
use crate::path::{extension_of, PathNormalizer};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Largest accepted upload, 10 MiB.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
pub const ALLOWED_EXTENSIONS: [&str; 6] = [".jpg", ".jpeg", ".png", ".gif", ".webp", ".bmp"];
pub const KEY_PREFIX: &str = "images/";
/// Host used for links when no custom domain is configured.
pub const FALLBACK_HOST: &str = "example.com";

/// Raw user input for one upload attempt.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub raw_input: String,
}

impl UploadRequest {
    pub fn new(raw_input: impl Into<String>) -> Self {
        Self {
            raw_input: raw_input.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub success: bool,
    pub remote_key: String,
    pub url: String,
    pub size_bytes: i64,
    pub hash: String,
    pub message: String,
}

/// A stored image as shown by `list` and `GET /api/images`.
#[derive(Debug, Clone, Serialize)]
pub struct RemoteFile {
    pub key: String,
    pub hash: String,
    pub url: String,
    pub size_bytes: i64,
    pub mime_type: String,
    pub uploaded: Option<DateTime<Utc>>,
}

pub fn is_image_file(name: &str) -> bool {
    let ext = extension_of(Path::new(name));
    ALLOWED_EXTENSIONS.contains(&ext.as_str())
}

/// Size and extension gate applied before any upload.
pub fn check_policy(name: &str, size: u64) -> Result<(), UploadError> {
    if size > MAX_FILE_SIZE {
        return Err(UploadError::PolicyRejected(format!(
            "file is {:.2} MB, the limit is 10 MB",
            size as f64 / 1024.0 / 1024.0
        )));
    }
    if !is_image_file(name) {
        return Err(UploadError::PolicyRejected(
            "unsupported file type, only jpg, jpeg, png, gif, webp and bmp images are allowed"
                .to_string(),
        ));
    }
    Ok(())
}

/// `images/<unix nanos><ext>` with the extension as given by the user.
pub fn storage_key(file_name: &str, timestamp_nanos: u128) -> String {
    let ext = Path::new(file_name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    format!("{}{}{}", KEY_PREFIX, timestamp_nanos, ext)
}

pub fn public_url(domain: &str, key: &str) -> String {
    let domain = domain.trim().trim_end_matches('/');
    if domain.is_empty() {
        format!("https://{}/{}", FALLBACK_HOST, key)
    } else if domain.starts_with("http://") || domain.starts_with("https://") {
        format!("{}/{}", domain, key)
    } else {
        format!("https://{}/{}", domain, key)
    }
}

pub fn mime_type(name: &str) -> &'static str {
    match extension_of(Path::new(name)).as_str() {
        ".jpg" | ".jpeg" => "image/jpeg",
        ".png" => "image/png",
        ".gif" => "image/gif",
        ".webp" => "image/webp",
        ".bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

fn now_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default()
}

fn progress_bar(len: u64, file_name: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let style = ProgressStyle::with_template(
        "{spinner} {msg} [{bar:40}] {bytes}/{total_bytes} ({eta})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style.progress_chars("=> "));
    pb.set_message(file_name.to_string());
    pb
}

/// Orchestrates uploads and listings against one bucket.
pub struct Uploader {
    store: Option<Box<dyn ObjectStore>>,
    normalizer: PathNormalizer,
    bucket: String,
    domain: String,
    show_progress: bool,
}

impl Uploader {
    pub fn new(
        store: Option<Box<dyn ObjectStore>>,
        config: &SessionConfig,
        normalizer: PathNormalizer,
    ) -> Self {
        Self {
            store,
            normalizer,
            bucket: config.bucket.clone(),
            domain: config.domain.clone(),
            show_progress: config.show_progress,
        }
    }

    /// Uses the HTTP client when credentials and bucket are configured.
    pub fn from_config(
        config: &SessionConfig,
        normalizer: PathNormalizer,
    ) -> Result<Self, StoreError> {
        let store: Option<Box<dyn ObjectStore>> = if config.is_configured() {
            Some(Box::new(QiniuClient::from_config(config)?))
        } else {
            tracing::debug!("storage credentials missing");
            None
        };
        Ok(Self::new(store, config, normalizer))
    }

    pub fn is_configured(&self) -> bool {
        self.store.is_some()
    }

    fn store(&self) -> Result<&dyn ObjectStore, UploadError> {
        self.store.as_deref().ok_or(UploadError::NotConfigured)
    }

    /// Upload the file named by `request`.
    pub fn upload(&self, request: &UploadRequest) -> Result<UploadOutcome, UploadError> {
        let store = self.store()?;
        let path = self.normalizer.normalize(&request.raw_input)?;
        // Size and kind must describe the handle that is sent.
        let file = File::open(&path.value)?;
        let meta = file.metadata()?;
        if !meta.is_file() {
            return Err(UploadError::PolicyRejected(format!(
                "{} is not a regular file",
                path.value.display()
            )));
        }

        let file_name = path
            .value
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let size = meta.len();
        check_policy(&file_name, size)?;

        let pb = if self.show_progress {
            progress_bar(size, &file_name)
        } else {
            ProgressBar::hidden()
        };
        let body = UploadBody {
            reader: Box::new(pb.wrap_read(file.take(size))),
            len: size,
            file_name: file_name.clone(),
        };
        let result = self.put(store, &file_name, body);
        pb.finish_and_clear();
        result
    }

    /// Upload an in-memory file, used by the HTTP surface.
    pub fn upload_bytes(&self, file_name: &str, data: Vec<u8>) -> Result<UploadOutcome, UploadError> {
        let store = self.store()?;
        check_policy(file_name, data.len() as u64)?;
        let body = UploadBody {
            len: data.len() as u64,
            reader: Box::new(Cursor::new(data)),
            file_name: file_name.to_string(),
        };
        self.put(store, file_name, body)
    }

    fn put(
        &self,
        store: &dyn ObjectStore,
        file_name: &str,
        body: UploadBody,
    ) -> Result<UploadOutcome, UploadError> {
        let key = storage_key(file_name, now_nanos());
        let size = body.len as i64;
        let token = store
            .upload_token(&self.bucket)
            .map_err(UploadError::RemoteUploadFailed)?;
        let ret = store
            .put(&token, &key, body)
            .map_err(UploadError::RemoteUploadFailed)?;

        tracing::info!(key = %ret.key, size, "uploaded");
        Ok(UploadOutcome {
            success: true,
            url: public_url(&self.domain, &ret.key),
            remote_key: ret.key,
            size_bytes: size,
            hash: ret.hash,
            message: "upload succeeded".to_string(),
        })
    }

    /// Image objects under `prefix`, at most `limit` entries requested.
    pub fn list(&self, prefix: &str, limit: usize) -> Result<Vec<RemoteFile>, UploadError> {
        let store = self.store()?;
        let entries = store
            .list_files(&self.bucket, prefix, limit)
            .map_err(UploadError::ListFailed)?;
        Ok(entries
            .into_iter()
            .filter(|e| is_image_file(&e.key))
            .map(|e| RemoteFile {
                url: public_url(&self.domain, &e.key),
                uploaded: e.uploaded_at(),
                key: e.key,
                hash: e.hash,
                size_bytes: e.size,
                mime_type: e.mime_type,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ListEntry, PutRet};
    use crate::path::HostEnv;
    use std::io::Read;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        puts: Mutex<Vec<(String, String, Vec<u8>)>>,
        fail: bool,
    }

    impl ObjectStore for MemoryStore {
        fn upload_token(&self, bucket: &str) -> Result<String, StoreError> {
            Ok(format!("token-{}", bucket))
        }

        fn put(&self, token: &str, key: &str, mut body: UploadBody) -> Result<PutRet, StoreError> {
            if self.fail {
                return Err(StoreError::Status {
                    status: 401,
                    body: "bad token".into(),
                });
            }
            let mut data = Vec::new();
            body.reader.read_to_end(&mut data).unwrap();
            self.puts
                .lock()
                .unwrap()
                .push((token.to_string(), key.to_string(), data));
            Ok(PutRet {
                key: key.to_string(),
                hash: "FhashX".into(),
            })
        }

        fn list_files(&self, _: &str, prefix: &str, _: usize) -> Result<Vec<ListEntry>, StoreError> {
            Ok(["a.png", "b.txt", "c.JPG"]
                .iter()
                .map(|n| ListEntry {
                    key: format!("{}{}", prefix, n),
                    hash: String::new(),
                    size: 10,
                    mime_type: String::new(),
                    put_time: 0,
                })
                .collect())
        }
    }

    fn config() -> SessionConfig {
        SessionConfig {
            access_key: "ak".into(),
            secret_key: "sk".into(),
            bucket: "pics".into(),
            domain: "cdn.example.org".into(),
            show_progress: false,
            ..Default::default()
        }
    }

    fn uploader(store: MemoryStore) -> Uploader {
        Uploader::new(Some(Box::new(store)), &config(), PathNormalizer::new(HostEnv::Native))
    }

    #[test]
    fn extension_allow_list_is_case_insensitive() {
        assert!(check_policy("photo.JPG", 1).is_ok());
        assert!(check_policy("photo.jpg", 1).is_ok());
        assert!(check_policy("x.Webp", 1).is_ok());
        assert!(matches!(
            check_policy("doc.pdf", 1),
            Err(UploadError::PolicyRejected(_))
        ));
        assert!(matches!(
            check_policy("noext", 1),
            Err(UploadError::PolicyRejected(_))
        ));
    }

    #[test]
    fn size_limit_boundary() {
        assert!(check_policy("a.png", MAX_FILE_SIZE).is_ok());
        assert!(matches!(
            check_policy("a.png", MAX_FILE_SIZE + 1),
            Err(UploadError::PolicyRejected(_))
        ));
    }

    #[test]
    fn keys_and_urls() {
        assert_eq!(storage_key("cat.PNG", 42), "images/42.PNG");
        assert_eq!(storage_key("noext", 7), "images/7");
        assert_eq!(public_url("cdn.example.org", "images/1.png"), "https://cdn.example.org/images/1.png");
        assert_eq!(public_url("http://cdn.example.org/", "k"), "http://cdn.example.org/k");
        assert_eq!(public_url("", "images/1.png"), "https://example.com/images/1.png");
        assert_eq!(mime_type("a.JPEG"), "image/jpeg");
        assert_eq!(mime_type("a.bin"), "application/octet-stream");
    }

    #[test]
    fn not_configured_without_store() {
        let up = Uploader::new(None, &config(), PathNormalizer::default());
        assert!(!up.is_configured());
        assert!(matches!(
            up.upload(&UploadRequest::new("/tmp/x.png")),
            Err(UploadError::NotConfigured)
        ));
        assert!(matches!(up.list("images/", 20), Err(UploadError::NotConfigured)));
    }

    #[test]
    fn uploads_existing_image() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("shot.PNG");
        std::fs::write(&file, b"\x89PNG data").unwrap();

        let up = uploader(MemoryStore::default());
        let outcome = up
            .upload(&UploadRequest::new(format!("  \"{}\"  ", file.display())))
            .unwrap();
        assert!(outcome.success);
        assert!(outcome.remote_key.starts_with("images/"));
        assert!(outcome.remote_key.ends_with(".PNG"));
        assert_eq!(outcome.size_bytes, 9);
        assert_eq!(outcome.hash, "FhashX");
        assert_eq!(outcome.url, format!("https://cdn.example.org/{}", outcome.remote_key));
    }

    #[test]
    fn missing_file_and_rejected_type() {
        let up = uploader(MemoryStore::default());
        assert!(matches!(
            up.upload(&UploadRequest::new("/no/such/file.png")),
            Err(UploadError::FileMissing(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("doc.pdf");
        std::fs::write(&file, b"%PDF").unwrap();
        assert!(matches!(
            up.upload(&UploadRequest::new(file.display().to_string())),
            Err(UploadError::PolicyRejected(_))
        ));
        assert!(matches!(
            up.upload(&UploadRequest::new(dir.path().display().to_string())),
            Err(UploadError::PolicyRejected(_))
        ));
    }

    #[test]
    fn oversized_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("big.jpg");
        let f = File::create(&file).unwrap();
        f.set_len(MAX_FILE_SIZE + 1).unwrap();

        let up = uploader(MemoryStore::default());
        assert!(matches!(
            up.upload(&UploadRequest::new(file.display().to_string())),
            Err(UploadError::PolicyRejected(_))
        ));
    }

    #[test]
    fn exact_limit_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("max.png");
        let f = File::create(&file).unwrap();
        f.set_len(MAX_FILE_SIZE).unwrap();

        let up = uploader(MemoryStore::default());
        let outcome = up
            .upload(&UploadRequest::new(file.display().to_string()))
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.size_bytes, MAX_FILE_SIZE as i64);
    }

    #[test]
    fn remote_failure_is_reported() {
        let up = uploader(MemoryStore {
            fail: true,
            ..Default::default()
        });
        let err = up.upload_bytes("a.gif", b"GIF89a".to_vec()).unwrap_err();
        assert!(matches!(err, UploadError::RemoteUploadFailed(_)));
    }

    #[test]
    fn upload_bytes_from_memory() {
        let store = MemoryStore::default();
        let up = uploader(store);
        let outcome = up.upload_bytes("a.webp", b"RIFF".to_vec()).unwrap();
        assert_eq!(outcome.size_bytes, 4);
        assert!(outcome.remote_key.ends_with(".webp"));
    }

    #[test]
    fn listing_keeps_images_only() {
        let up = uploader(MemoryStore::default());
        let files = up.list("images/", 20).unwrap();
        let keys: Vec<_> = files.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["images/a.png", "images/c.JPG"]);
        assert_eq!(files[0].url, "https://cdn.example.org/images/a.png");
    }
}
