//! Shared test utilities for lore.

pub mod fixtures;
