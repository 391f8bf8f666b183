//! Core knowledge types: topics, specialists and their markdown source format

pub mod frontmatter;
pub mod specialist;
pub mod topic;

pub use specialist::{Collaboration, Expertise, Persona, Specialist};
pub use topic::{Difficulty, OneOrMany, PatternType, RelevanceSignals, Topic};
