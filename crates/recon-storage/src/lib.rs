//! In-process reference implementations of every `recon-ports` trait.
//! Suitable for the default binary and for integration tests; a durable
//! deployment swaps these for implementations backed by a real database,
//! broker and FX service behind the same trait boundaries.

mod archive;
mod bus;
mod canonical_store;
mod fx;
mod idempotency;

pub use archive::InMemoryRawEventArchive;
pub use bus::InMemoryEventBus;
pub use canonical_store::InMemoryCanonicalStore;
pub use fx::StaticFxProvider;
pub use idempotency::InMemoryIdempotencyStore;
