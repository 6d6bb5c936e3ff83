//! Shared test utilities used across ttm crates.
//!
//! Nothing here depends on `ttm-core`, so every crate in the workspace can
//! pull it in as a dev-dependency without creating a cycle.

pub mod fixtures;
pub mod profile;
pub mod tracing;
