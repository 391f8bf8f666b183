//! Relevance search over resolved topics
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                 Code snippet or free-text query                │
//! └────────────────────────────────────────────────────────────────┘
//!                                │
//!                                ▼
//!                ┌───────────────────────────────┐
//!                │  CodeAnalyzer (analyzer.rs)   │
//!                │  constructs, object type      │
//!                └───────────────────────────────┘
//!                                │ query terms
//!                                ▼
//!                ┌───────────────────────────────┐
//!                │  RelevanceIndex (index.rs)    │
//!                │  weighted BM25 + filtering    │
//!                └───────────────────────────────┘
//!                                │
//!                                ▼
//!                  Normalized, thresholded hits
//! ```
//!
//! [`RelevanceService`] owns the current index and swaps in rebuilt ones.

pub mod analyzer;
pub mod index;
pub mod service;

pub use analyzer::{CodeAnalyzer, CodeCharacteristics, Matcher, tokenize};
pub use index::{FindOptions, IndexStatistics, RelevanceIndex, RelevantTopic};
pub use service::RelevanceService;
