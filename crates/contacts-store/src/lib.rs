//! Process-local state behind the registration and contact workflows.
//!
//! Each store is a trait with one in-memory implementation. The in-memory
//! types keep their entries in a `DashMap`, so every check-then-set runs under
//! the shard lock for its key and unrelated keys never contend on one lock.
//! Nothing here is persisted; all state lives for the lifetime of the process.

pub mod cooldown;
pub mod error;
pub mod registry;
pub mod throttle;

pub use cooldown::{CooldownGate, MemoryCooldownGate};
pub use error::{InvalidCredential, RetryAfter};
pub use registry::{IdentityRegistry, MemoryIdentityRegistry, VerificationToken};
pub use throttle::{MemoryRequestThrottle, RequestThrottle};
