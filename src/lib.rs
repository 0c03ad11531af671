//! In-memory admission control and throttling for realtime gateways.
//!
//! DESIGN
//! ======
//! Two limiter types cover the two kinds of quota a chat gateway enforces:
//! - [`ConnectionLimiter`]: live concurrent-connection counts per identity,
//!   incremented on admit and decremented explicitly on disconnect. No time
//!   dimension.
//! - [`SlidingWindowLimiter`]: exact sliding-window event counting backed by
//!   `HashMap<String, VecDeque<Instant>>`. One generic implementation; every
//!   call site (message routing, alert dispatch) constructs its own instance
//!   with its own window and limit.
//!
//! Both are `Clone` handles over shared state, so the owning service hands
//! the same instance to its handlers the way `AppState` fields are shared.
//! Admission checks are synchronous and never block on I/O; a `false` from
//! `allow` is an expected outcome the caller branches on, not an error.
//!
//! TRADE-OFFS
//! ==========
//! Each limiter guards its whole key map with a single `RwLock`. Contention
//! per operation is one map lookup plus a scan of one key's capped timestamp
//! deque, so coarse locking holds up at the supported capacities (100k keys,
//! 1k events/key). Past that scale the upgrade path is key-hashed lock
//! stripes, not lock-free structures.

mod config;
mod connection;
mod maintenance;
mod sliding_window;

pub use config::RateLimitConfig;
pub use connection::ConnectionLimiter;
pub use maintenance::MaintenanceError;
pub use sliding_window::SlidingWindowLimiter;
