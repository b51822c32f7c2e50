use std::time::Duration;

use serde::Deserialize;

const DEFAULT_KV_MAX_OPEN: usize = 16;

/// Tuning knobs of the gateway core. Everything has a usable default; the
/// embedding binary deserializes this from its config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Gate sizing for the KV tier: max inflight connections, and as many
    /// queued waiters again.
    pub kv_max_open: usize,

    pub article_ttl_secs: u64,
    pub article_part_ttl_secs: u64,
    pub bbs_index_ttl_secs: u64,
    pub search_ttl_secs: u64,
    pub feed_ttl_secs: u64,

    pub ext_cache: bbsweb_extcache::Config,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kv_max_open: DEFAULT_KV_MAX_OPEN,
            article_ttl_secs: 600,
            article_part_ttl_secs: 60,
            bbs_index_ttl_secs: 60,
            search_ttl_secs: 600,
            feed_ttl_secs: 600,
            ext_cache: bbsweb_extcache::Config::default(),
        }
    }
}

impl Config {
    pub fn check_and_fill_defaults(&mut self) {
        if self.kv_max_open == 0 {
            self.kv_max_open = DEFAULT_KV_MAX_OPEN;
        }
    }

    pub fn article_ttl(&self) -> Duration {
        Duration::from_secs(self.article_ttl_secs)
    }

    pub fn article_part_ttl(&self) -> Duration {
        Duration::from_secs(self.article_part_ttl_secs)
    }

    pub fn bbs_index_ttl(&self) -> Duration {
        Duration::from_secs(self.bbs_index_ttl_secs)
    }

    pub fn search_ttl(&self) -> Duration {
        Duration::from_secs(self.search_ttl_secs)
    }

    pub fn feed_ttl(&self) -> Duration {
        Duration::from_secs(self.feed_ttl_secs)
    }
}

/// Cached not-found answers age out quicker than real entities.
pub(crate) fn invalid_ttl(ttl: Duration) -> Duration {
    (ttl / 4).max(Duration::from_secs(1))
}
