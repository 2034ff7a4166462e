//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! subscription ledger test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built test data (amounts, rates, times, identities)
//! - `doubles`: In-memory implementations of the clock, price feed and custody ports
//! - `builders`: Builder for a ready-to-use engine and store
//! - `assertions`: Custom assertion helpers for ledger state
//! - `generators`: Property-based test data generators
//! - `logging`: Test log initialisation

pub mod fixtures;
pub mod doubles;
pub mod builders;
pub mod assertions;
pub mod generators;
pub mod logging;

pub use fixtures::*;
pub use doubles::*;
pub use builders::*;
pub use assertions::*;
pub use generators::*;
pub use logging::init_test_tracing;
