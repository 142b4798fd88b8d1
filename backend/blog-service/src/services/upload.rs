/// Signed parameters for direct browser uploads to the image CDN
use crate::config::UploadConfig;
use serde::Serialize;
use uuid::Uuid;

pub const UPLOAD_TOKEN_TTL_SECS: i64 = 1800;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UploadAuth {
    pub token: String,
    pub expire: i64,
    pub signature: String,
}

#[derive(Clone)]
pub struct UploadSigner {
    private_key: String,
}

impl UploadSigner {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            private_key: config.private_key.clone(),
        }
    }

    pub fn authorize(&self, now_unix: i64) -> UploadAuth {
        self.sign(Uuid::new_v4().to_string(), now_unix + UPLOAD_TOKEN_TTL_SECS)
    }

    /// `signature = hex(HMAC-SHA1(private_key, token || expire))`
    pub fn sign(&self, token: String, expire: i64) -> UploadAuth {
        let payload = format!("{}{}", token, expire);
        let signature =
            crypto_core::hash::hmac_sha1_hex(self.private_key.as_bytes(), payload.as_bytes());
        UploadAuth {
            token,
            expire,
            signature,
        }
    }
}
