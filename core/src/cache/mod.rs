//! Expiring caches behind token verification
//!
//! [`ExpiringStore`] is the seam between the token managers and whatever
//! holds their metadata: [`MemoryStore`] for a single instance, or the Redis
//! store in `tg_infra` when several instances must agree.

mod key_set;
mod memory;
mod revocation;
mod store;
mod sweeper;

pub use key_set::{KeySetCache, KeySetEntry};
pub use memory::MemoryStore;
pub use revocation::{RevocationSet, DEFAULT_BLACKLIST_TTL_SECS};
pub use store::{expiry_instant, get_typed, set_typed, ExpiringStore};
pub use sweeper::{StoreSweeper, Sweep, SweepResult, SweeperConfig};
