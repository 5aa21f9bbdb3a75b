//! Concurrent memoizing caches.
//!
//! Both caches map a key to the outcome of an init function and guarantee the
//! function runs at most once per cached key, no matter how many threads ask
//! for it at the same time. Concurrent callers for the same key wait for the
//! first one and share its outcome, errors included. The cache lock is never
//! held while an init function runs, so slow computations only block callers
//! of the same key.
//!
//! - [`Cache`] grows without limit.
//! - [`LruCache`] holds at most `capacity` keys and evicts the least recently
//!   used one to admit a new key, optionally notifying a callback.
//!
//! ```
//! use concurrent_memo::LruCache;
//!
//! let cache = LruCache::<&str, String>::builder(2)
//!     .on_evict(|key| println!("{} evicted", key))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(cache.get_or_init("k1", || "v1".to_owned()), "v1");
//! assert_eq!(cache.get_or_init("k1", || "other".to_owned()), "v1");
//! ```
//!
//! There is no timeout: if an init function never returns, every caller of
//! that key blocks forever.

mod bounded;
mod error;
mod recency;
mod slot;
mod unbounded;

pub use bounded::{LruBuilder, LruCache};
pub use error::Error;
pub use unbounded::Cache;

mod compile_time_assertions {
    use crate::*;

    #[allow(unreachable_code)]
    fn _assert_public_types_send_sync() {
        _assert_send_sync::<Cache<u32, u32>>(unreachable!());
        _assert_send_sync::<Cache<String, u32, String>>(unreachable!());
        _assert_send_sync::<LruCache<u32, u32>>(unreachable!());
        _assert_send_sync::<LruCache<String, u32, String>>(unreachable!());
        _assert_send::<LruBuilder<u32, u32>>(unreachable!());
    }

    fn _assert_send<S: Send>(_: &S) {}

    fn _assert_send_sync<S: Send + Sync>(_: &S) {}
}
