//! Integration test suite entry point.

mod fixture;
mod layer_resolution;
mod relevance_search;
mod specialist_routing;
