use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;

/// Limits how often one identity may perform a stateful action.
pub trait CooldownGate: Send + Sync + 'static {
    /// Returns true and records now as the last action iff no action is on
    /// record for `identity` or at least `period` has elapsed since it.
    /// Refusals leave the entry untouched.
    fn try_acquire(&self, identity: &str, period: Duration) -> bool;
}

/// Last successful action per identity.
#[derive(Default)]
pub struct MemoryCooldownGate {
    last_action: DashMap<String, Instant>,
}

impl MemoryCooldownGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check-then-set against an explicit instant. The entry lock is held for
    /// the whole decision, so concurrent callers for one identity serialize.
    pub fn try_acquire_at(&self, identity: &str, period: Duration, now: Instant) -> bool {
        match self.last_action.entry(identity.to_owned()) {
            Entry::Occupied(mut entry) => {
                if now.saturating_duration_since(*entry.get()) < period {
                    return false;
                }
                entry.insert(now);
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }

    pub fn last_action(&self, identity: &str) -> Option<Instant> {
        self.last_action.get(identity).map(|at| *at)
    }
}

impl CooldownGate for MemoryCooldownGate {
    fn try_acquire(&self, identity: &str, period: Duration) -> bool {
        self.try_acquire_at(identity, period, Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn test_first_action_always_allowed() {
        let gate = MemoryCooldownGate::new();
        let now = Instant::now();
        assert!(gate.try_acquire_at("a@example.com", MINUTE, now));
        assert_eq!(gate.last_action("a@example.com"), Some(now));
    }

    #[test]
    fn test_refused_inside_period_without_mutation() {
        let gate = MemoryCooldownGate::new();
        let start = Instant::now();
        assert!(gate.try_acquire_at("a@example.com", MINUTE, start));

        let later = start + Duration::from_secs(59);
        assert!(!gate.try_acquire_at("a@example.com", MINUTE, later));
        assert_eq!(gate.last_action("a@example.com"), Some(start));
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let gate = MemoryCooldownGate::new();
        let start = Instant::now();
        assert!(gate.try_acquire_at("a@example.com", MINUTE, start));
        assert!(gate.try_acquire_at("a@example.com", MINUTE, start + MINUTE));
        assert_eq!(gate.last_action("a@example.com"), Some(start + MINUTE));
    }

    #[test]
    fn test_identities_are_independent() {
        let gate = MemoryCooldownGate::new();
        let now = Instant::now();
        assert!(gate.try_acquire_at("a@example.com", MINUTE, now));
        assert!(gate.try_acquire_at("b@example.com", MINUTE, now));
        assert!(!gate.try_acquire_at("a@example.com", MINUTE, now));
    }

    #[test]
    fn test_concurrent_acquire_single_winner() {
        const THREADS: usize = 16;

        let gate = MemoryCooldownGate::new();
        let barrier = Barrier::new(THREADS);
        let wins = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    barrier.wait();
                    if gate.try_acquire("a@example.com", MINUTE) {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert_eq!(wins.load(Ordering::SeqCst), 1);
    }
}
