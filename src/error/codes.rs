//! Standardized error codes for machine-parseable output.
//!
//! Error codes follow a numeric taxonomy:
//! - 1xx: Topic errors
//! - 2xx: Index errors
//! - 3xx: Config errors
//! - 4xx: Search errors
//! - 5xx: Layer and network errors
//! - 7xx: Git errors
//! - 9xx: Internal errors

use serde::{Deserialize, Serialize};

/// Standardized error codes for JSON output.
///
/// Each variant maps to a numeric code (e.g., `TopicNotFound` -> E101).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================
    // Topic errors (1xx)
    // ========================================
    /// E101: Requested topic is not present in any enabled layer
    TopicNotFound,
    /// E102: Topic file exists but could not be parsed
    TopicInvalid,
    /// E103: Requested specialist is not loaded
    SpecialistNotFound,

    // ========================================
    // Index errors (2xx)
    // ========================================
    /// E201: Index could not be built
    IndexBuildFailed,

    // ========================================
    // Config errors (3xx)
    // ========================================
    /// E302: Config file has invalid syntax or values
    ConfigInvalid,
    /// E304: Required config value is missing
    ConfigMissingRequired,

    // ========================================
    // Search errors (4xx)
    // ========================================
    /// E401: Search query could not be parsed
    SearchQueryInvalid,
    /// E402: A detection pattern failed to compile
    PatternInvalid,

    // ========================================
    // Layer / network errors (5xx)
    // ========================================
    /// E501: A knowledge layer failed to load
    LayerLoadFailed,
    /// E502: A layer load exceeded its timeout
    LayerTimeout,

    // ========================================
    // Git errors (7xx)
    // ========================================
    /// E704: General git error
    GitError,

    // ========================================
    // Internal errors (9xx)
    // ========================================
    /// E902: Feature not yet implemented
    NotImplemented,
    /// E905: Serialization/deserialization failed
    SerializationError,
    /// E906: IO operation failed
    IoError,
}

impl ErrorCode {
    /// Get the numeric error code (e.g., `TopicNotFound` -> 101).
    #[must_use]
    pub const fn numeric(&self) -> u16 {
        match self {
            Self::TopicNotFound => 101,
            Self::TopicInvalid => 102,
            Self::SpecialistNotFound => 103,

            Self::IndexBuildFailed => 201,

            Self::ConfigInvalid => 302,
            Self::ConfigMissingRequired => 304,

            Self::SearchQueryInvalid => 401,
            Self::PatternInvalid => 402,

            Self::LayerLoadFailed => 501,
            Self::LayerTimeout => 502,

            Self::GitError => 704,

            Self::NotImplemented => 902,
            Self::SerializationError => 905,
            Self::IoError => 906,
        }
    }

    /// Get the error code as a formatted string (e.g., "E101").
    #[must_use]
    pub fn code_string(&self) -> String {
        format!("E{}", self.numeric())
    }

    /// Get the default suggestion for this error code.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::TopicNotFound => "Run `lore list` to see resolvable topics, or `lore search <query>` to find related ones",
            Self::TopicInvalid => "Check the topic's YAML frontmatter. It must be delimited by `---` lines",
            Self::SpecialistNotFound => "Run `lore specialists` to see loaded specialists",
            Self::IndexBuildFailed => "Run `lore rebuild -v` to see which topic breaks indexing",
            Self::ConfigInvalid => "Fix the listed fields in the config file. Check TOML syntax",
            Self::ConfigMissingRequired => "Set the required value in config.toml or via the matching LORE_* variable",
            Self::SearchQueryInvalid => "Simplify the query. Punctuation is stripped before parsing",
            Self::PatternInvalid => "Fix the regular expression in search.extra_patterns",
            Self::LayerLoadFailed => "Run `lore layers` to see per-layer errors. Other layers remain available",
            Self::LayerTimeout => "Raise loading.load_timeout or check network access to the layer source",
            Self::GitError => "Check the layer url, branch and credentials. Cached checkouts are reused when fetches fail",
            Self::NotImplemented => "This layer type is not implemented yet. Use embedded, local or git",
            Self::SerializationError => "The data format may be corrupted. Check input data for validity",
            Self::IoError => "File operation failed. Check path exists and permissions are correct",
        }
    }

    /// Check if this error is potentially recoverable by the user.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::IndexBuildFailed | Self::NotImplemented | Self::SerializationError
        )
    }

    /// Get the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self.numeric() / 100 {
            1 => "topic",
            2 => "index",
            3 => "config",
            4 => "search",
            5 => "layer",
            7 => "git",
            9 => "internal",
            _ => "unknown",
        }
    }

    /// Iterate over all error codes.
    pub fn all() -> impl Iterator<Item = Self> {
        [
            Self::TopicNotFound,
            Self::TopicInvalid,
            Self::SpecialistNotFound,
            Self::IndexBuildFailed,
            Self::ConfigInvalid,
            Self::ConfigMissingRequired,
            Self::SearchQueryInvalid,
            Self::PatternInvalid,
            Self::LayerLoadFailed,
            Self::LayerTimeout,
            Self::GitError,
            Self::NotImplemented,
            Self::SerializationError,
            Self::IoError,
        ]
        .into_iter()
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn numeric_codes_are_unique() {
        let mut seen = HashSet::new();
        for code in ErrorCode::all() {
            assert!(seen.insert(code.numeric()), "duplicate code {code:?}");
        }
    }

    #[test]
    fn categories_follow_numeric_ranges() {
        assert_eq!(ErrorCode::TopicNotFound.category(), "topic");
        assert_eq!(ErrorCode::ConfigInvalid.category(), "config");
        assert_eq!(ErrorCode::LayerTimeout.category(), "layer");
        assert_eq!(ErrorCode::GitError.category(), "git");
        assert_eq!(ErrorCode::NotImplemented.category(), "internal");
    }

    #[test]
    fn every_code_has_a_suggestion() {
        for code in ErrorCode::all() {
            assert!(!code.suggestion().is_empty());
        }
    }

    #[test]
    fn display_uses_code_string() {
        assert_eq!(ErrorCode::TopicNotFound.to_string(), "E101");
    }
}
