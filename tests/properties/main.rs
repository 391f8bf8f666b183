//! Property test suite entry point.

mod resolution_props;
mod scoring_props;
