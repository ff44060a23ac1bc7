//! Rubric scoring

use crate::rubric::{Rubric, SectionRule, Thresholds};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use specsafe_artifact::document::{parse_heading, SUBSECTION_LEVEL};
use specsafe_artifact::SectionMap;

static LIST_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[-*+]|\d+[.)])\s+\S").expect("static regex"));

static STORY_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:(?:[-*+]|\d+[.)])\s+)?(?:[*_]{1,2}\s*)?as\s+an?\b")
        .expect("static regex")
});

static RISK_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:(?:[-*+]|\d+[.)])\s+)?(?:[*_]{1,2}\s*)?risk").expect("static regex")
});

/// Section state against its thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionStatus {
    /// Every threshold met
    Complete,
    /// Present but short of at least one threshold
    Partial,
    /// Absent or blank
    Missing,
}

/// Measured counts of one section body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SectionMetrics {
    /// Trimmed character count
    pub chars: usize,
    /// Non-blank lines
    pub lines: usize,
    /// List items
    pub list_items: usize,
    /// "As a ..." lines
    pub stories: usize,
    /// "Risk ..." lines
    pub risks: usize,
    /// `###` headings outside code fences
    pub subsections: usize,
}

impl SectionMetrics {
    /// Measure a section body
    #[must_use]
    pub fn measure(body: &str) -> Self {
        let mut metrics = Self {
            chars: body.trim().chars().count(),
            ..Self::default()
        };

        let mut in_fence = false;
        for line in body.lines() {
            if line.trim().is_empty() {
                continue;
            }
            metrics.lines += 1;

            let trimmed = line.trim_start();
            if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
                in_fence = !in_fence;
                continue;
            }
            if in_fence {
                continue;
            }

            if matches!(parse_heading(line), Some((SUBSECTION_LEVEL, _))) {
                metrics.subsections += 1;
            }
            if LIST_ITEM.is_match(line) {
                metrics.list_items += 1;
            }
            if STORY_MARKER.is_match(line) {
                metrics.stories += 1;
            }
            if RISK_MARKER.is_match(line) {
                metrics.risks += 1;
            }
        }
        metrics
    }

    /// True when every set threshold is met
    #[must_use]
    pub fn meets(&self, thresholds: &Thresholds) -> bool {
        let at_least = |actual: usize, min: Option<usize>| min.map_or(true, |m| actual >= m);
        at_least(self.chars, thresholds.min_chars)
            && at_least(self.lines, thresholds.min_lines)
            && at_least(self.list_items, thresholds.min_list_items)
            && at_least(self.stories, thresholds.min_stories)
            && at_least(self.risks, thresholds.min_risks)
            && at_least(self.subsections, thresholds.min_subsections)
    }
}

/// Score of one rubric section
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionScore {
    /// Section name from the rubric
    pub name: String,
    /// Rubric weight
    pub weight: u32,
    /// Status
    pub status: SectionStatus,
    /// Measured counts (all zero when missing)
    pub metrics: SectionMetrics,
}

/// Completeness of one document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletenessResult {
    /// Overall percentage, 0-100
    pub overall: u8,
    /// Per-section scores in canonical order
    pub sections: Vec<SectionScore>,
    /// Sum of all rubric weights
    pub total_weight: u32,
    /// Complete weights plus half of partial weights
    pub earned_weight: f64,
    /// First section that is not complete
    pub next_section: Option<String>,
}

impl CompletenessResult {
    /// Score of a section, matched by rubric name
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&SectionScore> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Names of sections with the given status
    pub fn with_status(&self, status: SectionStatus) -> impl Iterator<Item = &str> {
        self.sections
            .iter()
            .filter(move |s| s.status == status)
            .map(|s| s.name.as_str())
    }
}

/// Scores documents against a rubric
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    rubric: Rubric,
}

impl Scorer {
    /// Scorer over a validated rubric
    #[must_use]
    pub fn new(rubric: Rubric) -> Self {
        Self { rubric }
    }

    /// The rubric in use
    #[inline]
    #[must_use]
    pub fn rubric(&self) -> &Rubric {
        &self.rubric
    }

    /// Score a document
    ///
    /// Sections not named by the rubric are ignored.
    #[must_use]
    pub fn score(&self, content: &str) -> CompletenessResult {
        let map = SectionMap::parse(content);
        let sections: Vec<SectionScore> = self
            .rubric
            .rules()
            .iter()
            .map(|rule| score_section(rule, map.get(&rule.name)))
            .collect();

        // Weights are tracked in halves so partial credit stays integral.
        let total = self.rubric.total_weight();
        let halves: u32 = sections
            .iter()
            .map(|s| match s.status {
                SectionStatus::Complete => s.weight * 2,
                SectionStatus::Partial => s.weight,
                SectionStatus::Missing => 0,
            })
            .sum();
        let overall = round_percent(halves, total * 2);

        let next_section = suggest_next(&sections).map(str::to_string);
        tracing::debug!(overall, next = ?next_section, "document scored");

        CompletenessResult {
            overall,
            sections,
            total_weight: total,
            earned_weight: f64::from(halves) / 2.0,
            next_section,
        }
    }
}

/// Score with the default rubric
#[must_use]
pub fn score(content: &str) -> CompletenessResult {
    Scorer::default().score(content)
}

/// First section in canonical order that is not complete
#[must_use]
pub fn suggest_next(sections: &[SectionScore]) -> Option<&str> {
    sections
        .iter()
        .find(|s| s.status != SectionStatus::Complete)
        .map(|s| s.name.as_str())
}

fn score_section(rule: &SectionRule, body: Option<&str>) -> SectionScore {
    let (status, metrics) = match body {
        Some(body) if !body.trim().is_empty() => {
            let metrics = SectionMetrics::measure(body);
            let status = if metrics.meets(&rule.thresholds) {
                SectionStatus::Complete
            } else {
                SectionStatus::Partial
            };
            (status, metrics)
        }
        _ => (SectionStatus::Missing, SectionMetrics::default()),
    };
    SectionScore {
        name: rule.name.clone(),
        weight: rule.weight,
        status,
        metrics,
    }
}

/// `round(100 * part / whole)`, half away from zero
fn round_percent(part: u32, whole: u32) -> u8 {
    if whole == 0 {
        return 0;
    }
    let part = u64::from(part);
    let whole = u64::from(whole);
    let rounded = (200 * part + whole) / (2 * whole);
    u8::try_from(rounded.min(100)).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use specsafe_test_utils::{document_with, long_text, COMPLETE_DOCUMENT, SPARSE_DOCUMENT};

    #[test]
    fn metrics_count_markers() {
        let body = "\n- As a user, I log in\n* **As an** admin, I audit\n1. as a guest\n\n- Risk: outage\n**Risk** two\n### Sub\n```\n### not counted\n- not an item\n```\n";
        let m = SectionMetrics::measure(body);
        assert_eq!(m.stories, 3);
        assert_eq!(m.risks, 2);
        assert_eq!(m.list_items, 4);
        assert_eq!(m.subsections, 1);
        assert_eq!(m.lines, 10);
    }

    #[test]
    fn story_marker_needs_word_boundary() {
        let m = SectionMetrics::measure("Asana integration\nAs announced\nAs a user\n");
        assert_eq!(m.stories, 1);
    }

    #[test]
    fn complete_document_scores_full() {
        let result = score(COMPLETE_DOCUMENT);
        assert_eq!(result.overall, 100);
        assert_eq!(result.next_section, None);
        assert!(result
            .sections
            .iter()
            .all(|s| s.status == SectionStatus::Complete));
    }

    #[test]
    fn lone_executive_summary_scores_five() {
        let doc = document_with("Feature", &[("Executive Summary", &long_text(150))]);
        let result = score(&doc);
        assert_eq!(result.overall, 5);
        assert_eq!(result.section("Executive Summary").unwrap().status, SectionStatus::Complete);
        assert_eq!(result.next_section.as_deref(), Some("Problem Statement"));
    }

    #[test]
    fn partial_sections_earn_half() {
        let result = score(SPARSE_DOCUMENT);
        // Executive Summary (5) and Technical Design (15) are both partial.
        assert!((result.earned_weight - 10.0).abs() < f64::EPSILON);
        assert_eq!(result.overall, 10);
        assert_eq!(result.next_section.as_deref(), Some("Executive Summary"));
        assert_eq!(
            result.with_status(SectionStatus::Partial).collect::<Vec<_>>(),
            ["Executive Summary", "Technical Design"]
        );
    }

    #[test]
    fn blank_and_unknown_sections() {
        let doc = document_with(
            "Feature",
            &[("Executive Summary", "   "), ("Appendix", &long_text(500))],
        );
        let result = score(&doc);
        assert_eq!(result.overall, 0);
        assert_eq!(result.section("Executive Summary").unwrap().status, SectionStatus::Missing);
        assert_eq!(result.sections.len(), 11);
    }

    #[test]
    fn headings_match_loosely() {
        let doc = document_with(
            "Feature",
            &[("9. risks and mitigations", "- Risk: a\n- Risk: b")],
        );
        let result = score(&doc);
        assert_eq!(
            result.section("Risks & Mitigations").unwrap().status,
            SectionStatus::Complete
        );
        assert_eq!(result.overall, 10);
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round_percent(5, 200), 3); // 2.5
        assert_eq!(round_percent(3, 200), 2); // 1.5
        assert_eq!(round_percent(2, 200), 1);
        assert_eq!(round_percent(200, 200), 100);
        assert_eq!(round_percent(0, 0), 0);
    }
}
