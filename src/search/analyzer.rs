//! Code characteristic extraction
//!
//! Scans a source snippet against an ordered library of construct patterns,
//! detects the declared object type, and derives boolean flags. Every pattern
//! is compiled fallibly: one that fails to compile becomes a matcher that
//! never matches, and a warning is logged.

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use tracing::warn;

use crate::config::PatternSpec;
use crate::error::{LoreError, Result};

/// Number of snippet tokens used as a query when no construct is detected.
pub const FALLBACK_QUERY_TOKENS: usize = 50;

/// Built-in construct library, in detection order.
const CONSTRUCTS: &[(&str, &str)] = &[
    ("FindSet", r"\.FindSet\s*\("),
    ("FindFirst", r"\.FindFirst\s*\("),
    ("FindLast", r"\.FindLast\s*\("),
    ("Next", r"\.Next\s*\("),
    ("Get", r"\.Get\s*\("),
    ("CalcFields", r"\.CalcFields\s*\("),
    ("CalcSums", r"\.CalcSums\s*\("),
    ("SetLoadFields", r"\.SetLoadFields\s*\("),
    ("SetRange", r"\.SetRange\s*\("),
    ("SetFilter", r"\.SetFilter\s*\("),
    ("Validate", r"\.Validate\s*\("),
    ("TestField", r"\.TestField\s*\("),
    ("FieldError", r"\.FieldError\s*\("),
    ("Modify", r"\.Modify\s*\("),
    ("ModifyAll", r"\.ModifyAll\s*\("),
    ("Insert", r"\.Insert\s*\("),
    ("Delete", r"\.Delete\s*\("),
    ("DeleteAll", r"\.DeleteAll\s*\("),
    ("LockTable", r"\.LockTable\s*\("),
    ("Commit", r"\bCommit\s*\("),
    ("EventSubscriber", r"\[\s*EventSubscriber\s*\("),
    ("IntegrationEvent", r"\[\s*IntegrationEvent\s*\("),
    ("BusinessEvent", r"\[\s*BusinessEvent\s*\("),
    ("TryFunction", r"\[\s*TryFunction\s*\]"),
    ("Error", r"\bError\s*\("),
    ("Confirm", r"\bConfirm\s*\("),
    ("HttpClient", r"\bHttpClient\b"),
    ("JsonObject", r"\bJsonObject\b"),
    ("IsolatedStorage", r"\bIsolatedStorage\s*\."),
];

const OBJECT_TYPE: &str = r"^\s*(tableextension|table|pageextension|page|codeunit|reportextension|report|query|xmlport|enumextension|enum|interface|permissionset|controladdin)\s+\d+";
const LOOP_KEYWORDS: &str = r"\b(repeat|for|foreach|while)\b";
const QUOTED_FIELD: &str = r#"\w+\s*\.\s*"[^"]+""#;
const ERROR_INSPECTION: &str = r"\bGetLastError(Text|Code)\b|\bif\s+not\s+Codeunit\.Run\b";
const SECURITY_CALLS: &str = r"\b(SetEncrypted|UserPermissions|SecretText)\b|\bPermissions\s*=";

const LOOP_CONSTRUCTS: &[&str] = &["FindSet", "Next"];
const FIELD_CONSTRUCTS: &[&str] = &[
    "SetLoadFields",
    "CalcFields",
    "CalcSums",
    "SetRange",
    "SetFilter",
    "Validate",
    "TestField",
];
const MUTATION_CONSTRUCTS: &[&str] = &[
    "Modify",
    "ModifyAll",
    "Insert",
    "Delete",
    "DeleteAll",
    "LockTable",
];
const VALIDATION_CONSTRUCTS: &[&str] = &["Validate", "TestField", "FieldError"];
const ERROR_CONSTRUCTS: &[&str] = &["Error", "TryFunction"];
const SECURITY_CONSTRUCTS: &[&str] = &["IsolatedStorage"];

/// A compiled pattern, or one that failed to compile and never matches.
#[derive(Debug, Clone)]
pub enum Matcher {
    Regex(Regex),
    Never,
}

impl Matcher {
    /// Compile `pattern` case-insensitively, degrading to [`Matcher::Never`].
    pub fn compile(name: &str, pattern: &str) -> Self {
        match compile_pattern(name, pattern, false) {
            Ok(regex) => Self::Regex(regex),
            Err(err) => {
                warn!(error = %err, "detection pattern disabled");
                Self::Never
            }
        }
    }

    fn compile_multiline(name: &str, pattern: &str) -> Self {
        match compile_pattern(name, pattern, true) {
            Ok(regex) => Self::Regex(regex),
            Err(err) => {
                warn!(error = %err, "detection pattern disabled");
                Self::Never
            }
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Regex(regex) => regex.is_match(text),
            Self::Never => false,
        }
    }

    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Regex(_))
    }
}

/// Compile a detection pattern case-insensitively.
pub fn compile_pattern(name: &str, pattern: &str, multi_line: bool) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .multi_line(multi_line)
        .build()
        .map_err(|err| LoreError::InvalidPattern {
            name: name.to_string(),
            reason: err.to_string(),
        })
}

#[derive(Debug, Clone)]
struct ConstructPattern {
    name: String,
    matcher: Matcher,
}

/// What the analyzer found in a snippet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CodeCharacteristics {
    /// Distinct construct names in library order of first detection
    pub constructs: Vec<String>,
    pub object_type: Option<String>,
    pub has_loop: bool,
    pub has_field_access: bool,
    pub has_record_mutation: bool,
    pub has_validation: bool,
    pub has_error_handling: bool,
    pub has_security_call: bool,
    /// Lowercase word tokens of the raw snippet
    pub tokens: Vec<String>,
}

impl CodeCharacteristics {
    pub fn has_construct(&self, name: &str) -> bool {
        self.constructs.iter().any(|c| c.eq_ignore_ascii_case(name))
    }

    fn has_any(&self, names: &[&str]) -> bool {
        names.iter().any(|name| self.has_construct(name))
    }

    /// Terms for the lexical query: constructs plus object type, or the
    /// leading snippet tokens when neither was detected.
    ///
    /// Every term is reduced to alphanumeric tokens, so names carrying
    /// query syntax (`Page:Run`, `"Quoted`) stay plain words.
    pub fn query_terms(&self) -> Vec<String> {
        let mut terms: Vec<String> = Vec::new();
        for name in self.constructs.iter().chain(self.object_type.as_ref()) {
            for token in tokenize(name) {
                if !terms.contains(&token) {
                    terms.push(token);
                }
            }
        }
        if terms.is_empty() {
            terms = self
                .tokens
                .iter()
                .take(FALLBACK_QUERY_TOKENS)
                .cloned()
                .collect();
        }
        terms
    }
}

#[derive(Debug, Clone)]
pub struct CodeAnalyzer {
    patterns: Vec<ConstructPattern>,
    object_type: Matcher,
    loop_keywords: Matcher,
    quoted_field: Matcher,
    error_inspection: Matcher,
    security_calls: Matcher,
}

impl Default for CodeAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeAnalyzer {
    pub fn new() -> Self {
        Self {
            patterns: CONSTRUCTS
                .iter()
                .map(|(name, pattern)| ConstructPattern {
                    name: (*name).to_string(),
                    matcher: Matcher::compile(name, pattern),
                })
                .collect(),
            object_type: Matcher::compile_multiline("object_type", OBJECT_TYPE),
            loop_keywords: Matcher::compile("loop_keywords", LOOP_KEYWORDS),
            quoted_field: Matcher::compile("quoted_field", QUOTED_FIELD),
            error_inspection: Matcher::compile("error_inspection", ERROR_INSPECTION),
            security_calls: Matcher::compile("security_calls", SECURITY_CALLS),
        }
    }

    /// Append configured patterns after the built-in library.
    #[must_use]
    pub fn with_extra_patterns(mut self, extra: &[PatternSpec]) -> Self {
        self.patterns.extend(extra.iter().map(|spec| ConstructPattern {
            name: spec.name.clone(),
            matcher: Matcher::compile(&spec.name, &spec.pattern),
        }));
        self
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Names of patterns that compiled successfully.
    pub fn active_patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns
            .iter()
            .filter(|p| p.matcher.is_active())
            .map(|p| p.name.as_str())
    }

    pub fn analyze(&self, code: &str) -> CodeCharacteristics {
        let mut chars = CodeCharacteristics {
            constructs: self
                .patterns
                .iter()
                .filter(|p| p.matcher.is_match(code))
                .map(|p| p.name.clone())
                .fold(Vec::new(), |mut acc, name| {
                    if !acc.contains(&name) {
                        acc.push(name);
                    }
                    acc
                }),
            object_type: self.detect_object_type(code),
            tokens: tokenize(code),
            ..CodeCharacteristics::default()
        };

        chars.has_loop = chars.has_any(LOOP_CONSTRUCTS) || self.loop_keywords.is_match(code);
        chars.has_field_access =
            chars.has_any(FIELD_CONSTRUCTS) || self.quoted_field.is_match(code);
        chars.has_record_mutation = chars.has_any(MUTATION_CONSTRUCTS);
        chars.has_validation = chars.has_any(VALIDATION_CONSTRUCTS);
        chars.has_error_handling =
            chars.has_any(ERROR_CONSTRUCTS) || self.error_inspection.is_match(code);
        chars.has_security_call =
            chars.has_any(SECURITY_CONSTRUCTS) || self.security_calls.is_match(code);
        chars
    }

    fn detect_object_type(&self, code: &str) -> Option<String> {
        let Matcher::Regex(regex) = &self.object_type else {
            return None;
        };
        regex
            .captures(code)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_lowercase())
    }
}

/// Split text into lowercase alphanumeric tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}
