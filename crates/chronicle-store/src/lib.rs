// Chronicle event store
//
// Append-only, per-stream ordered persistence over Message DB (a PostgreSQL
// extension). The `EventStore` trait is the seam: the production adapter
// speaks to Message DB's stored functions through a sqlx pool, and the
// in-memory implementation backs tests and demos with the same semantics,
// including the optimistic-concurrency check.

pub mod config;
pub mod memory;
pub mod postgres;
pub mod store;

pub use config::StoreConfig;
pub use memory::InMemoryEventStore;
pub use postgres::MessageDbStore;
pub use store::{EventStore, ExpectedVersion, StoreError};
