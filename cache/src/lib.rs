//! Two-tier coalescing cache: an external key/value store fronted by an
//! in-process single-flight layer.
//!
//! A lookup first consults the KV tier; on a miss the caller joins the
//! per-key fan-in, and exactly one detached task runs the generator. The
//! generated value is stored best-effort and every waiter receives the same
//! result. KV traffic is bounded by a [`bbsweb_gate::Gate`].

mod kv;
mod manager;
mod singleflight;

pub use kv::DEFAULT_TIMEOUT;
pub use kv::GatedStore;
pub use kv::KvError;
pub use kv::KvStore;
pub use kv::MemoryStore;
pub use manager::CacheManager;
pub use manager::Generator;
pub use manager::TypedManager;
pub use singleflight::SingleFlight;

/// A cacheable request. The sole obligation is a stable string form: equal
/// keys produce equal strings, and the string is the KV cache key.
pub trait Key {
    fn cache_key(&self) -> String;
}
