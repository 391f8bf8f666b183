//! YAML frontmatter splitting for markdown knowledge documents.

use serde::de::DeserializeOwned;

use crate::error::{LoreError, Result};

/// A markdown document split into its frontmatter block and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontmatterDocument<'a> {
    /// Raw YAML between the `---` delimiters (empty when absent)
    pub yaml: &'a str,
    /// Markdown body following the closing delimiter
    pub body: &'a str,
}

/// Split a markdown document into frontmatter and body.
///
/// A document without a leading `---` line has no frontmatter and the whole
/// input is the body. An opening delimiter without a closing one is an error.
pub fn split(input: &str) -> Result<FrontmatterDocument<'_>> {
    let trimmed = input.strip_prefix('\u{feff}').unwrap_or(input);

    let Some(rest) = strip_delimiter_line(trimmed) else {
        return Ok(FrontmatterDocument {
            yaml: "",
            body: trimmed,
        });
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Ok(FrontmatterDocument {
                yaml,
                body: body.trim_start_matches(['\r', '\n']),
            });
        }
        offset += line.len();
    }

    Err(LoreError::InvalidTopic(
        "frontmatter opened with `---` but never closed".to_string(),
    ))
}

/// Parse the frontmatter block into `T`. An empty block yields `T::default()`.
pub fn parse<T>(yaml: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if yaml.trim().is_empty() {
        return Ok(T::default());
    }
    Ok(serde_yaml::from_str(yaml)?)
}

fn strip_delimiter_line(input: &str) -> Option<&str> {
    let rest = input.strip_prefix("---")?;
    let rest = rest.trim_start_matches([' ', '\t']);
    rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))
}
