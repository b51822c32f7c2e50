//! Signed URL generation for an external image cache.
//!
//! The cache front-end accepts URLs of the form
//! `{prefix}/{scheme}/{host}{path}?e={expire}&s={sig}` and only serves
//! requests whose signature checks out. Expirations are snapped to coarse
//! buckets with a stable per-URI jitter so identical source URLs keep
//! producing identical cache URLs (and stay cacheable) while still aging out.

use std::sync::Arc;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use md5::Digest;
use md5::Md5;
use serde::Deserialize;
use url::Url;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid source url: {0}")]
    InvalidUrl(String),
}

/// Rewrites an upstream resource URL into a signed cache URL.
pub trait ExtCache: Send + Sync {
    fn generate(&self, url: &str) -> Result<String>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    pub enabled: bool,
    /// Base of the cache front-end, e.g. `https://cache.example/c`.
    pub prefix: String,
    pub hash_prefix: String,
    pub secret: String,
    /// Minimum lifetime of a generated URL, in seconds.
    pub expire_secs: u64,
}

/// Builds the configured [`ExtCache`], or `None` when disabled.
pub fn new(config: Config) -> Option<Arc<dyn ExtCache>> {
    if !config.enabled {
        return None;
    }
    Some(Arc::new(SignedExtCache { config }))
}

struct SignedExtCache {
    config: Config,
}

impl SignedExtCache {
    fn generate_at(&self, url_str: &str, now: u64) -> Result<String> {
        let url = Url::parse(url_str).map_err(|err| Error::InvalidUrl(err.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| Error::InvalidUrl(url_str.to_owned()))?;

        let uri = format!("/{}/{}{}", url.scheme(), host, url.path());
        let expire = snap_expire(&uri, now, self.config.expire_secs);

        let mut hasher = Md5::new();
        hasher.update(expire.to_string().as_bytes());
        hasher.update(self.config.hash_prefix.as_bytes());
        hasher.update(uri.as_bytes());
        hasher.update(self.config.secret.as_bytes());
        let sig = URL_SAFE_NO_PAD.encode(hasher.finalize());

        Ok(format!("{}{uri}?e={expire}&s={sig}", self.config.prefix))
    }
}

impl ExtCache for SignedExtCache {
    fn generate(&self, url: &str) -> Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.generate_at(url, now)
    }
}

/// Rounds `now + min` up to a 16-bit bucket, then adds a stable per-URI
/// offset. Identical URIs map to identical expirations within a bucket.
fn snap_expire(uri: &str, now: u64, min: u64) -> u64 {
    ((now + min + 0xFFFF) & !0xFFFF) + u64::from(fnv1_32(uri.as_bytes()) & 0xFFFF)
}

/// 32-bit FNV-1. Not cryptographic; only spreads URIs across a bucket.
fn fnv1_32(data: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for &b in data {
        hash = hash.wrapping_mul(0x0100_0193);
        hash ^= u32::from(b);
    }
    hash
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use pretty_assertions::assert_eq;

    use super::*;

    fn cache() -> SignedExtCache {
        SignedExtCache {
            config: Config {
                enabled: true,
                prefix: "https://cache.example/c".to_owned(),
                hash_prefix: "hp".to_owned(),
                secret: "s3cret".to_owned(),
                expire_secs: 3600,
            },
        }
    }

    #[test]
    fn url_shape_and_canonical_uri() {
        let generated = cache()
            .generate_at("http://i.imgur.com/abc123.jpg?x=1", 1_700_000_000)
            .unwrap();
        assert!(
            generated.starts_with("https://cache.example/c/http/i.imgur.com/abc123.jpg?e="),
            "{generated}"
        );
        assert!(generated.contains("&s="), "{generated}");
    }

    #[test]
    fn identical_urls_sign_identically_within_a_bucket() {
        let c = cache();
        let a = c.generate_at("https://example.com/a.png", 1_700_000_000).unwrap();
        let b = c.generate_at("https://example.com/a.png", 1_700_000_100).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn expire_is_bucketed_with_stable_jitter() {
        let e1 = snap_expire("/http/a/x", 1_700_000_000, 60);
        assert_eq!(e1 & !0xFFFF, (1_700_000_000u64 + 60 + 0xFFFF) & !0xFFFF);
        assert_eq!(e1, snap_expire("/http/a/x", 1_700_000_000, 60));
        // Different URIs land on different offsets within the bucket.
        assert_ne!(e1, snap_expire("/http/a/y", 1_700_000_000, 60));
    }

    #[test]
    fn disabled_config_builds_nothing() {
        assert!(new(Config::default()).is_none());
    }

    #[test]
    fn rejects_relative_urls() {
        assert!(cache().generate_at("not-a-url", 0).is_err());
    }
}
