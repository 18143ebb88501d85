//! Assertion helpers.

pub mod progress;
