//! Specialist profiles
//!
//! A specialist is a named expertise profile that free-text requests are
//! routed to. Specialists load through the same layers as topics but are not
//! overridden: they are flattened and deduplicated by ID.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{LoreError, Result};

use super::frontmatter;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expertise {
    #[serde(default)]
    pub primary: Vec<String>,
    #[serde(default)]
    pub secondary: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    #[serde(default)]
    pub personality: Vec<String>,
    #[serde(default)]
    pub communication_style: String,
    #[serde(default)]
    pub greeting: String,
}

/// Hints about which other specialists this one hands work to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaboration {
    #[serde(default)]
    pub natural_handoffs: Vec<String>,
    #[serde(default)]
    pub team_consultations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specialist {
    pub specialist_id: String,
    pub title: String,
    pub role: String,
    #[serde(default)]
    pub expertise: Expertise,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub when_to_use: Vec<String>,
    #[serde(default)]
    pub persona: Persona,
    #[serde(default)]
    pub collaboration: Option<Collaboration>,
    /// Markdown body describing the specialist
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SpecialistFrontmatter {
    specialist_id: Option<String>,
    title: Option<String>,
    #[serde(default)]
    role: String,
    #[serde(default)]
    expertise: Expertise,
    #[serde(default)]
    domains: Vec<String>,
    #[serde(default)]
    when_to_use: Vec<String>,
    #[serde(default)]
    persona: Persona,
    collaboration: Option<Collaboration>,
    #[serde(flatten)]
    extra: BTreeMap<String, serde_yaml::Value>,
}

impl Specialist {
    pub fn new(
        specialist_id: impl Into<String>,
        title: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            specialist_id: specialist_id.into(),
            title: title.into(),
            role: role.into(),
            expertise: Expertise::default(),
            domains: Vec::new(),
            when_to_use: Vec::new(),
            persona: Persona::default(),
            collaboration: None,
            content: String::new(),
            extra: BTreeMap::new(),
        }
    }

    /// Parse a specialist from markdown with YAML frontmatter.
    pub fn from_markdown(fallback_id: &str, raw: &str) -> Result<Self> {
        let doc = frontmatter::split(raw)?;
        let meta: SpecialistFrontmatter = frontmatter::parse(doc.yaml)
            .map_err(|err| LoreError::InvalidTopic(format!("specialist {fallback_id}: {err}")))?;

        let specialist_id = meta
            .specialist_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| fallback_id.to_string());
        if specialist_id.trim().is_empty() {
            return Err(LoreError::InvalidTopic(
                "specialist has an empty specialist_id".to_string(),
            ));
        }

        Ok(Self {
            title: meta.title.unwrap_or_else(|| specialist_id.clone()),
            role: meta.role,
            expertise: meta.expertise,
            domains: meta.domains,
            when_to_use: meta.when_to_use,
            persona: meta.persona,
            collaboration: meta.collaboration,
            content: doc.body.to_string(),
            extra: meta.extra,
            specialist_id,
        })
    }

    /// The ID segment before the first separator, e.g. `sam` for `sam-coder`.
    pub fn first_name(&self) -> &str {
        self.specialist_id
            .split(['-', '_'])
            .next()
            .unwrap_or(&self.specialist_id)
    }

    pub fn has_domain(&self, domain: &str) -> bool {
        self.domains.iter().any(|d| d.eq_ignore_ascii_case(domain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAM: &str = r#"---
specialist_id: sam-coder
title: Sam Coder
role: Implementation Specialist
expertise:
  primary: [code generation, refactoring]
  secondary: [testing]
domains: [development, performance]
when_to_use:
  - Writing new codeunits
persona:
  personality: [pragmatic, fast]
  communication_style: direct and code-first
collaboration:
  natural_handoffs: [quinn-tester]
emoji: "⚡"
---

Sam writes code.
"#;

    #[test]
    fn parses_specialist_frontmatter() {
        let sam = Specialist::from_markdown("ignored", SAM).unwrap();
        assert_eq!(sam.specialist_id, "sam-coder");
        assert_eq!(sam.title, "Sam Coder");
        assert_eq!(sam.expertise.primary.len(), 2);
        assert_eq!(sam.persona.personality, vec!["pragmatic", "fast"]);
        assert_eq!(
            sam.collaboration.unwrap().natural_handoffs,
            vec!["quinn-tester"]
        );
        assert!(sam.extra.contains_key("emoji"));
        assert_eq!(sam.content.trim(), "Sam writes code.");
    }

    #[test]
    fn first_name_is_id_prefix() {
        let sam = Specialist::new("sam-coder", "Sam", "Coder");
        assert_eq!(sam.first_name(), "sam");
        let solo = Specialist::new("solo", "Solo", "Role");
        assert_eq!(solo.first_name(), "solo");
    }

    #[test]
    fn falls_back_to_file_id() {
        let raw = "---\ntitle: Dean\nrole: Debugger\n---\n";
        let dean = Specialist::from_markdown("dean-debug", raw).unwrap();
        assert_eq!(dean.specialist_id, "dean-debug");
    }

    #[test]
    fn has_domain_ignores_case() {
        let mut s = Specialist::new("a-b", "A", "R");
        s.domains = vec!["Performance".into()];
        assert!(s.has_domain("performance"));
        assert!(!s.has_domain("security"));
    }
}
