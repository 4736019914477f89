//! Expiring key/value cache shared by providers.

pub mod clock;
pub mod expiring_cache;

pub use clock::{Clock, ManualClock, SystemClock};
pub use expiring_cache::{CacheConfig, CacheError, ExpiringCache};
