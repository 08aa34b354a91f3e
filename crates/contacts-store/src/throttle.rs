use std::net::IpAddr;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;
use tracing::debug;

use crate::error::RetryAfter;

/// Per-origin request throttle.
///
/// The origin is the caller's network address. It is not authenticated and
/// a client behind a shared NAT or a spoofing client can defeat or collide
/// with it; it is only a coarse stand-in for "the same user".
pub trait RequestThrottle: Send + Sync + 'static {
    /// On success records now as the origin's last request. A passed check
    /// stays recorded even if the caller's operation later fails.
    fn try_acquire(&self, origin: IpAddr, period: Duration) -> Result<(), RetryAfter>;
}

/// Last admitted request per origin.
#[derive(Default)]
pub struct MemoryRequestThrottle {
    last_request: DashMap<IpAddr, Instant>,
}

impl MemoryRequestThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire_at(
        &self,
        origin: IpAddr,
        period: Duration,
        now: Instant,
    ) -> Result<(), RetryAfter> {
        match self.last_request.entry(origin) {
            Entry::Occupied(mut entry) => {
                let elapsed = now.saturating_duration_since(*entry.get());
                if elapsed < period {
                    let wait = period - elapsed;
                    debug!(origin = %origin, wait_secs = wait.as_secs_f64(), "Throttled");
                    return Err(RetryAfter(wait));
                }
                entry.insert(now);
                Ok(())
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                Ok(())
            }
        }
    }

    pub fn last_request(&self, origin: IpAddr) -> Option<Instant> {
        self.last_request.get(&origin).map(|at| *at)
    }

    /// Number of tracked origins.
    pub fn origin_count(&self) -> usize {
        self.last_request.len()
    }
}

impl RequestThrottle for MemoryRequestThrottle {
    fn try_acquire(&self, origin: IpAddr, period: Duration) -> Result<(), RetryAfter> {
        self.try_acquire_at(origin, period, Instant::now())
    }
}
