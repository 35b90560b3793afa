//! orderflow storage
//!
//! The bounded in-memory cache, the durable store contract with an
//! in-memory implementation, cache warm start and the read path.

mod fifo;
mod memory;
mod read_path;
mod traits;
mod warmup;

pub use fifo::FifoCache;
pub use memory::InMemoryOrderStore;
pub use read_path::{Lookup, LookupSource, OrderReader};
pub use traits::{CacheStats, OrderCache, OrderStore};
pub use warmup::{WarmStart, WarmupReport};
