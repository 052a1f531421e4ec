//! Turns archived raw payloads into canonical, currency-normalized
//! `Transaction` rows: resolves each connection's parser and settlement
//! currency, runs the parser, enriches cross-currency amounts through the
//! FX port, and persists the result idempotently.

mod normalizer;
mod parsers;
mod registry;

pub use normalizer::Normalizer;
pub use parsers::{AdyenParser, StripeParser};
pub use registry::{ConnectionConfig, ParserRegistry};
