// Lifecycle constants (no magic values)
use std::time::Duration;

/// Default delay between two status fetches of one job (2s)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Lower bound for a caller-supplied poll interval (100ms)
/// Anything shorter turns the subscription into a hot loop
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Consecutive Transient/ServerError ticks tolerated before giving up
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 5;

/// Terminal cache entries older than this are pruned when a listing refreshes
/// the cache (10 minutes)
pub const SETTLED_ENTRY_TTL_MS: i64 = 10 * 60 * 1000;
