//! Library half of the `reconciler` binary: the in-memory pipeline wiring
//! lives here so integration tests can drive it directly without going
//! through the CLI.

pub mod pipeline;
