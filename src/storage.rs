//! Object storage boundary.
//!
//! The domain never talks to a bucket directly and never hands out permanent
//! object paths. Everything goes through [`ObjectStore`], whose only job is
//! to turn an opaque object key into a short-lived signed read URL.

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::errors::ServiceError;

/// Contract the attachment gateway needs from an object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Mints a time-limited, credential-free read URL for `object_key`.
    async fn signed_url(&self, object_key: &str, ttl_secs: u64) -> Result<String, ServiceError>;
}

type HmacSha256 = Hmac<Sha256>;

/// Signs download URLs with HMAC-SHA256.
///
/// URL shape: `{base}/{key}?expires={unix}&signature={hex}` where the
/// signature covers `{key}.{expires}`. The edge serving `base` verifies
/// signature and expiry; a bare object key grants nothing.
pub struct HmacObjectStore {
    base_url: String,
    secret: String,
}

impl HmacObjectStore {
    pub fn new(base_url: impl Into<String>, secret: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            secret: secret.into(),
        }
    }

    fn sign(&self, object_key: &str, expires: i64) -> Result<String, ServiceError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| ServiceError::StorageError(format!("Invalid signing key: {}", e)))?;
        mac.update(format!("{}.{}", object_key, expires).as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

#[async_trait]
impl ObjectStore for HmacObjectStore {
    async fn signed_url(&self, object_key: &str, ttl_secs: u64) -> Result<String, ServiceError> {
        if object_key.is_empty() || object_key.contains("..") {
            return Err(ServiceError::StorageError(
                "Refusing to sign malformed object key".to_string(),
            ));
        }

        let expires = Utc::now().timestamp() + ttl_secs as i64;
        let signature = self.sign(object_key, expires)?;

        Ok(format!(
            "{}/{}?expires={}&signature={}",
            self.base_url, object_key, expires, signature
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> HmacObjectStore {
        HmacObjectStore::new("http://cdn.example/attachments/", "test-signing-secret-test-signing")
    }

    #[test]
    fn signature_is_deterministic_for_same_inputs() {
        let store = store();
        let a = store.sign("orders/1/sketch.png", 1_700_000_000).unwrap();
        let b = store.sign("orders/1/sketch.png", 1_700_000_000).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn signature_changes_with_key_and_expiry() {
        let store = store();
        let base = store.sign("orders/1/sketch.png", 1_700_000_000).unwrap();
        assert_ne!(base, store.sign("orders/2/sketch.png", 1_700_000_000).unwrap());
        assert_ne!(base, store.sign("orders/1/sketch.png", 1_700_000_060).unwrap());
    }

    #[tokio::test]
    async fn signed_url_has_expected_shape_and_no_secret() {
        let store = store();
        let url = store.signed_url("orders/1/sketch.png", 3600).await.unwrap();
        assert!(url.starts_with("http://cdn.example/attachments/orders/1/sketch.png?expires="));
        assert!(url.contains("&signature="));
        assert!(!url.contains("secret"));
    }

    #[tokio::test]
    async fn malformed_keys_are_refused() {
        let store = store();
        assert!(store.signed_url("", 3600).await.is_err());
        assert!(store.signed_url("../etc/passwd", 3600).await.is_err());
    }
}
