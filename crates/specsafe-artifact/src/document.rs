//! Spec document model
//!
//! A spec document is Markdown with three structural conventions:
//!
//! ```text
//! ---                      <- optional metadata block (key: value lines)
//! tier: standard
//! progress: 0.4
//! ---
//! # Login Flow             <- title (level 1)
//!
//! ## Executive Summary     <- section (level 2, the section marker)
//! ...
//! ### Storage              <- subsection (level 3), counted inside a section
//! ```
//!
//! Headings inside fenced code blocks are ordinary text.

use indexmap::IndexMap;
use serde_yaml::Value;

/// Heading depth that delimits sections
pub const SECTION_LEVEL: u8 = 2;

/// Heading depth counted as a subsection
pub const SUBSECTION_LEVEL: u8 = 3;

/// Line that opens and closes the metadata block
pub const METADATA_FENCE: &str = "---";

/// Tier reported when the metadata block has none
pub const UNKNOWN_TIER: &str = "unknown";

/// One physical line of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocLine<'a> {
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset one past the line terminator
    pub end: usize,
    /// Line text without terminator
    pub text: &'a str,
    /// `(level, title)` when the line is a heading outside a code fence
    pub heading: Option<(u8, &'a str)>,
}

/// Split content into lines, classifying headings
///
/// Lines inside a leading metadata block are reported without heading
/// classification.
#[must_use]
pub fn scan_lines(content: &str) -> Vec<DocLine<'_>> {
    let metadata_end = metadata_span(content).map_or(0, |(_, end)| end);
    let mut lines = Vec::new();
    let mut offset = 0;
    let mut in_fence = false;

    for raw in content.split_inclusive('\n') {
        let start = offset;
        offset += raw.len();
        let text = raw.trim_end_matches(['\n', '\r']);

        let mut heading = None;
        if start >= metadata_end {
            let trimmed = text.trim_start();
            if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
                in_fence = !in_fence;
            } else if !in_fence {
                heading = parse_heading(text);
            }
        }

        lines.push(DocLine {
            start,
            end: offset,
            text,
            heading,
        });
    }

    lines
}

/// Parse an ATX heading line, returns `(level, title)`
///
/// Up to three spaces of indentation are allowed and the hashes must be
/// followed by whitespace or end of line.
#[must_use]
pub fn parse_heading(line: &str) -> Option<(u8, &str)> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    let level = rest.bytes().take_while(|&b| b == b'#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let after = &rest[level..];
    if !after.is_empty() && !after.starts_with([' ', '\t']) {
        return None;
    }
    let title = after.trim().trim_end_matches('#').trim_end();
    Some((u8::try_from(level).ok()?, title))
}

/// Canonical comparison key for a section heading
///
/// Case-insensitive, ignores leading numbering (`3.`, `3)`), and treats `&`
/// and `and` as the same word.
#[must_use]
pub fn normalize_section_name(name: &str) -> String {
    let trimmed = name.trim();
    let without_number = trimmed
        .trim_start_matches(|c: char| c.is_ascii_digit())
        .trim_start_matches(['.', ')']);
    let base = if without_number.len() < trimmed.len() && without_number.starts_with(' ') {
        without_number
    } else {
        trimmed
    };

    base.split_whitespace()
        .map(|word| {
            if word == "&" {
                "and".to_string()
            } else {
                word.to_lowercase()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Byte span of the metadata block: `(inner, end)`
///
/// `inner` is the text between the fences; `end` is the offset just past the
/// closing fence line. `None` when the document does not open with a fence or
/// the fence is never closed.
#[must_use]
pub fn metadata_span(content: &str) -> Option<(&str, usize)> {
    let mut lines = content.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != METADATA_FENCE {
        return None;
    }
    let inner_start = first.len();
    let mut offset = inner_start;
    for line in lines {
        let line_start = offset;
        offset += line.len();
        if line.trim_end() == METADATA_FENCE {
            return Some((&content[inner_start..line_start], offset));
        }
    }
    None
}

/// Descriptive fields read from the metadata block
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentMetadata {
    /// Tier label (e.g. `lite`, `standard`, `enterprise`)
    pub tier: Option<String>,
    /// Progress fraction in `0.0..=1.0`
    pub progress: Option<f64>,
}

impl DocumentMetadata {
    /// Extract metadata leniently
    ///
    /// Never fails: a missing block, unparseable YAML, or a key with no value
    /// all degrade to absent fields.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let Some((inner, _)) = metadata_span(content) else {
            return Self::default();
        };

        match serde_yaml::from_str::<Value>(inner) {
            Ok(Value::Mapping(map)) => Self {
                tier: map.get("tier").and_then(yaml_string),
                progress: map.get("progress").and_then(yaml_number).and_then(normalize_progress),
            },
            Ok(_) => Self::default(),
            Err(e) => {
                tracing::debug!(error = %e, "metadata block is not valid YAML, using line parser");
                Self::parse_lines(inner)
            }
        }
    }

    fn parse_lines(inner: &str) -> Self {
        let mut meta = Self::default();
        for line in inner.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim().trim_matches(['"', '\'']);
            if value.is_empty() {
                continue;
            }
            match key.trim() {
                "tier" => meta.tier = Some(value.to_string()),
                "progress" => {
                    meta.progress = value
                        .trim_end_matches('%')
                        .parse::<f64>()
                        .ok()
                        .and_then(normalize_progress);
                }
                _ => {}
            }
        }
        meta
    }

    /// Tier, or `"unknown"`
    #[inline]
    #[must_use]
    pub fn tier_or_default(&self) -> &str {
        self.tier.as_deref().unwrap_or(UNKNOWN_TIER)
    }

    /// Completion percentage (progress × 100), or `0.0`
    #[inline]
    #[must_use]
    pub fn completion_percent(&self) -> f64 {
        self.progress.map_or(0.0, |p| p * 100.0)
    }
}

fn yaml_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn yaml_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
        _ => None,
    }
}

/// Accept fractions and percentages; reject negatives and non-finite values
fn normalize_progress(raw: f64) -> Option<f64> {
    if !raw.is_finite() || raw < 0.0 {
        return None;
    }
    if raw <= 1.0 {
        Some(raw)
    } else if raw <= 100.0 {
        Some(raw / 100.0)
    } else {
        None
    }
}

/// A parsed level-2 section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Heading text as written
    pub heading: String,
    /// Body text between this heading and the next section heading
    pub body: String,
}

/// Ordered mapping of section name → body
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SectionMap {
    title: Option<String>,
    sections: IndexMap<String, Section>,
}

impl SectionMap {
    /// Parse a document into sections
    ///
    /// Repeated headings are merged into the first occurrence.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut map = Self::default();
        let mut current: Option<String> = None;

        for line in scan_lines(content) {
            match line.heading {
                Some((1, title)) if map.title.is_none() && current.is_none() => {
                    map.title = Some(title.to_string());
                }
                Some((SECTION_LEVEL, title)) => {
                    let key = normalize_section_name(title);
                    map.sections.entry(key.clone()).or_insert_with(|| Section {
                        heading: title.to_string(),
                        body: String::new(),
                    });
                    current = Some(key);
                }
                _ => {
                    if let Some(section) = current.as_ref().and_then(|k| map.sections.get_mut(k)) {
                        section.body.push_str(line.text);
                        section.body.push('\n');
                    }
                }
            }
        }

        map
    }

    /// Document title (first level-1 heading before any section)
    #[inline]
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Body of the named section, matched by normalized name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.sections
            .get(&normalize_section_name(name))
            .map(|s| s.body.as_str())
    }

    /// True when a section with that name exists (even if blank)
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.sections.contains_key(&normalize_section_name(name))
    }

    /// Number of distinct sections
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// True when the document has no sections
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Sections in document order
    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.sections.values()
    }
}
