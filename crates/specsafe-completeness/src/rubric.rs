//! Weighted section rubric
//!
//! A rubric is an ordered list of [`SectionRule`]s. Order is significant: it
//! is the canonical section order used both for suggestions and for deciding
//! where auto-fix inserts a missing section.

use serde::{Deserialize, Serialize};
use specsafe_artifact::document::normalize_section_name;
use specsafe_artifact::{Error, Result};
use std::collections::HashSet;

/// Sum every valid rubric's weights must reach
pub const TOTAL_WEIGHT: u32 = 100;

/// Thresholds a section body must meet to count as complete
///
/// Unset thresholds are not checked. A rule with no thresholds is complete
/// as soon as its body is non-blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum trimmed character count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_chars: Option<usize>,
    /// Minimum non-blank line count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_lines: Option<usize>,
    /// Minimum list items (`-`, `*`, `+`, `1.`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_list_items: Option<usize>,
    /// Minimum "As a ..." story lines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_stories: Option<usize>,
    /// Minimum "Risk ..." lines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_risks: Option<usize>,
    /// Minimum `###` subsections
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_subsections: Option<usize>,
}

/// One scored section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRule {
    /// Section heading as it should be written
    pub name: String,
    /// Share of the total score
    pub weight: u32,
    /// Completion thresholds
    #[serde(flatten)]
    pub thresholds: Thresholds,
}

impl SectionRule {
    /// Rule with the given thresholds
    #[must_use]
    pub fn new(name: &str, weight: u32, thresholds: Thresholds) -> Self {
        Self {
            name: name.to_string(),
            weight,
            thresholds,
        }
    }
}

/// Validated, ordered rubric
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rubric {
    rules: Vec<SectionRule>,
}

impl Rubric {
    /// Validate and build a rubric from rules in canonical order
    ///
    /// # Errors
    /// `Error::Validation` for an empty list, a blank or duplicate name, a
    /// zero weight, or weights not summing to [`TOTAL_WEIGHT`].
    pub fn new(rules: Vec<SectionRule>) -> Result<Self> {
        if rules.is_empty() {
            return Err(Error::invalid("rubric", "[]", "must contain at least one section"));
        }

        let mut seen = HashSet::new();
        let mut total: u32 = 0;
        for rule in &rules {
            let key = normalize_section_name(&rule.name);
            if key.is_empty() {
                return Err(Error::invalid("rubric section", &rule.name, "name must not be blank"));
            }
            if !seen.insert(key) {
                return Err(Error::invalid("rubric section", &rule.name, "duplicate section name"));
            }
            if rule.weight == 0 {
                return Err(Error::invalid("rubric weight", &rule.name, "weight must be positive"));
            }
            total = total.saturating_add(rule.weight);
        }

        if total != TOTAL_WEIGHT {
            return Err(Error::invalid(
                "rubric",
                total.to_string(),
                format!("weights must sum to {TOTAL_WEIGHT}"),
            ));
        }
        Ok(Self { rules })
    }

    /// Rules in canonical order
    #[inline]
    #[must_use]
    pub fn rules(&self) -> &[SectionRule] {
        &self.rules
    }

    /// Sum of all weights
    #[must_use]
    pub fn total_weight(&self) -> u32 {
        self.rules.iter().map(|r| r.weight).sum()
    }

    /// Canonical position of a section, matched by normalized name
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        let key = normalize_section_name(name);
        self.rules
            .iter()
            .position(|r| normalize_section_name(&r.name) == key)
    }
}

impl Default for Rubric {
    fn default() -> Self {
        let chars = |n| Thresholds {
            min_chars: Some(n),
            ..Thresholds::default()
        };
        let items = |n| Thresholds {
            min_list_items: Some(n),
            ..Thresholds::default()
        };

        Self {
            rules: vec![
                SectionRule::new("Executive Summary", 5, chars(100)),
                SectionRule::new("Problem Statement", 10, chars(150)),
                SectionRule::new(
                    "User Stories",
                    15,
                    Thresholds {
                        min_stories: Some(3),
                        ..Thresholds::default()
                    },
                ),
                SectionRule::new("Functional Requirements", 15, items(5)),
                SectionRule::new("Non-Functional Requirements", 10, items(3)),
                SectionRule::new(
                    "Technical Design",
                    15,
                    Thresholds {
                        min_chars: Some(300),
                        min_subsections: Some(2),
                        ..Thresholds::default()
                    },
                ),
                SectionRule::new("Data Model", 5, chars(100)),
                SectionRule::new("API Design", 5, chars(100)),
                SectionRule::new(
                    "Risks & Mitigations",
                    10,
                    Thresholds {
                        min_risks: Some(2),
                        ..Thresholds::default()
                    },
                ),
                SectionRule::new(
                    "Testing Strategy",
                    5,
                    Thresholds {
                        min_lines: Some(5),
                        ..Thresholds::default()
                    },
                ),
                SectionRule::new("Success Metrics", 5, items(3)),
            ],
        }
    }
}
