// Request signing for the storage provider: HMAC-SHA1 over the payload,
// encoded with the URL-safe base64 alphabet.

use crate::error::StoreError;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use hmac::{Hmac, Mac as _};
use serde::Serialize;
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Upload tokens stay valid for one hour.
pub const TOKEN_TTL_SECS: i64 = 3600;

/// Access/secret key pair. Built once per session and shared by the client.
#[derive(Clone)]
pub struct Credentials {
    access_key: String,
    secret_key: String,
}

#[derive(Serialize)]
struct PutPolicy<'a> {
    scope: &'a str,
    deadline: i64,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    fn sign(&self, data: &[u8]) -> Result<String, StoreError> {
        let mut mac = HmacSha1::new_from_slice(self.secret_key.as_bytes())
            .map_err(|e| StoreError::Signing(e.to_string()))?;
        mac.update(data);
        Ok(URL_SAFE.encode(mac.finalize().into_bytes()))
    }

    /// `ak:sign(encoded):encoded` where `encoded` is the base64 payload.
    fn sign_with_data(&self, data: &[u8]) -> Result<String, StoreError> {
        let encoded = URL_SAFE.encode(data);
        let sign = self.sign(encoded.as_bytes())?;
        Ok(format!("{}:{}:{}", self.access_key, sign, encoded))
    }

    /// Token authorising uploads into `bucket` until `deadline` (unix seconds).
    pub fn upload_token(&self, bucket: &str, deadline: i64) -> Result<String, StoreError> {
        let policy = PutPolicy {
            scope: bucket,
            deadline,
        };
        let json =
            serde_json::to_vec(&policy).map_err(|e| StoreError::Signing(e.to_string()))?;
        self.sign_with_data(&json)
    }

    /// `Authorization` header value for a body-less management request.
    pub fn management_authorization(&self, path_and_query: &str) -> Result<String, StoreError> {
        let sign = self.sign(format!("{}\n", path_and_query).as_bytes())?;
        Ok(format!("QBox {}:{}", self.access_key, sign))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .finish()
    }
}
