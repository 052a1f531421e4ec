//! Trait contracts between the pipeline stages (`recon-intake`,
//! `recon-normalizer`, `recon-matching`, `recon-ledger`) and whatever
//! storage/transport backs them. `recon-storage` provides the in-process
//! reference implementations used by tests and the default binary.

mod archive;
mod bus;
mod canonical_store;
mod fx;
mod idempotency;
mod parser;
mod rules;

pub use archive::RawEventArchive;
pub use bus::{BusMessage, EventBus, MatchedBusRecord, NormalizedBusRecord, RawBusRecord, Topic};
pub use canonical_store::CanonicalStore;
pub use fx::{FxProvider, FxRate};
pub use idempotency::{IdempotencyStore, ReserveOutcome};
pub use parser::{EventFormat, ParsedEvent, Parser};
pub use rules::{CmpOp, Condition};
