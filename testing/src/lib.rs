//! Shared test fixtures for the settings workspace.
//!
//! Provides a single, shared Redis testcontainer across all test files. The
//! fixture is lazily initialized once per test process and yields `None` when
//! Docker is unavailable, so callers can skip instead of failing.

mod fixtures;

pub use fixtures::*;
