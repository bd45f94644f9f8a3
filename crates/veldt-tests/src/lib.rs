//! Shared helpers for the Veldt integration test suite.

pub mod helpers;
