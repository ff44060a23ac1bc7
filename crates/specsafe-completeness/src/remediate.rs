//! Order-aware insertion of missing sections
//!
//! Insert positions are computed up front from the document's section spans,
//! then applied in a single pass:
//!
//! ```text
//! canonical order:  Exec  Problem  Stories  FR   NFR  ...
//! present:           ✓      ✗        ✗      ✓    ✗
//!                           └────────┴──▶ after Exec's span
//!                                                └──▶ after FR's span
//! ```
//!
//! A missing section goes after the nearest present section that precedes it
//! canonically, or right after the title/metadata preamble when none does. A
//! heading that exists with a blank body gets the boilerplate in place.

use crate::rubric::Rubric;
use crate::scorer::{CompletenessResult, Scorer, SectionStatus};
use crate::templates::{BuiltinTemplates, TemplateSource};
use serde::Serialize;
use specsafe_artifact::document::{normalize_section_name, scan_lines, SECTION_LEVEL};
use specsafe_artifact::{
    atomic_write, AtomicFileIo, ContentHash, DocumentIo, Error, Namespace, Result,
};
use specsafe_snapshot::{sibling_path, Clock, SafetyBackup, SnapshotEngine, SystemClock};
use std::path::{Path, PathBuf};

/// Change entry of a fix with no gaps
pub const NOTHING_TO_FIX: &str = "nothing to fix";

/// Description of the snapshot taken before an auto-fix write
pub const AUTO_FIX_SNAPSHOT_DESCRIPTION: &str = "auto-fix safety snapshot";

/// Suffix of the on-disk backup (`<file>.bak-<timestamp>`)
pub const BACKUP_SUFFIX: &str = "bak";

/// Outcome of [`AutoFixer::auto_fix`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutoFixReport {
    /// False when the write failed and was rolled back
    pub success: bool,
    /// Human-readable change list
    pub changes: Vec<String>,
    /// Backup file written before the change, if any
    pub backup_path: Option<PathBuf>,
}

/// Normalized name and end offset of one level-2 section
#[derive(Debug, Clone, PartialEq, Eq)]
struct SectionSpan {
    key: String,
    end: usize,
}

/// One planned insertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    /// Rubric section name
    pub section: String,
    /// Byte offset in the original content
    pub offset: usize,
    /// True when a new heading is written, false when filling a blank section
    pub new_heading: bool,
    /// Boilerplate body
    pub body: String,
}

/// Insertions for one document, sorted by offset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixPlan {
    /// Planned insertions
    pub insertions: Vec<Insertion>,
    /// Missing sections with no template
    pub skipped: Vec<String>,
}

impl FixPlan {
    /// True when nothing would be inserted
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.insertions.is_empty()
    }

    /// Content with every insertion applied
    #[must_use]
    pub fn apply(&self, content: &str) -> String {
        let extra: usize = self.insertions.iter().map(|i| i.body.len() + i.section.len() + 8).sum();
        let mut out = String::with_capacity(content.len() + extra);
        let mut cursor = 0;

        for insertion in &self.insertions {
            out.push_str(&content[cursor..insertion.offset]);
            cursor = insertion.offset;

            if !out.is_empty() {
                if !out.ends_with('\n') {
                    out.push('\n');
                }
                if !out.ends_with("\n\n") {
                    out.push('\n');
                }
            }
            if insertion.new_heading {
                out.push_str("## ");
                out.push_str(&insertion.section);
                out.push_str("\n\n");
            }
            out.push_str(insertion.body.trim_end());
            out.push('\n');
            if cursor < content.len() {
                out.push('\n');
            }
        }

        out.push_str(&content[cursor..]);
        out
    }

    fn describe(&self, dry_run: bool) -> Vec<String> {
        let verb = if dry_run { "Would add" } else { "Added" };
        let mut changes: Vec<String> = self
            .insertions
            .iter()
            .map(|i| {
                if i.new_heading {
                    format!("{verb} section: {}", i.section)
                } else {
                    format!("{verb} boilerplate to empty section: {}", i.section)
                }
            })
            .collect();
        changes.extend(
            self.skipped
                .iter()
                .map(|s| format!("No template for missing section: {s}")),
        );
        changes
    }
}

/// Fills missing rubric sections with boilerplate
#[derive(Debug)]
pub struct AutoFixer {
    scorer: Scorer,
    templates: Box<dyn TemplateSource>,
    io: Box<dyn DocumentIo>,
    clock: Box<dyn Clock>,
    snapshots: Option<(SnapshotEngine, Namespace)>,
}

impl Default for AutoFixer {
    fn default() -> Self {
        Self::new()
    }
}

impl AutoFixer {
    /// Fixer with the default rubric and built-in templates
    #[must_use]
    pub fn new() -> Self {
        Self {
            scorer: Scorer::default(),
            templates: Box::new(BuiltinTemplates),
            io: Box::new(AtomicFileIo),
            clock: Box::new(SystemClock),
            snapshots: None,
        }
    }

    /// Use a different rubric (also fixes the canonical order)
    #[must_use]
    pub fn with_rubric(mut self, rubric: Rubric) -> Self {
        self.scorer = Scorer::new(rubric);
        self
    }

    /// Use a different template source
    #[must_use]
    pub fn with_templates(mut self, templates: impl TemplateSource + 'static) -> Self {
        self.templates = Box::new(templates);
        self
    }

    /// Use a different document writer
    #[must_use]
    pub fn with_io(mut self, io: impl DocumentIo + 'static) -> Self {
        self.io = Box::new(io);
        self
    }

    /// Use a different clock for backup names
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Take a snapshot in `namespace` before every write
    #[must_use]
    pub fn with_safety_snapshots(mut self, engine: SnapshotEngine, namespace: Namespace) -> Self {
        self.snapshots = Some((engine, namespace));
        self
    }

    /// Scorer in use
    #[must_use]
    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    /// Compute insertions for `content`
    #[must_use]
    pub fn plan(&self, content: &str) -> FixPlan {
        let result = self.scorer.score(content);
        plan_insertions(content, &result, self.templates.as_ref())
    }

    /// Insert boilerplate for every missing section of the document at `path`
    ///
    /// Partial sections are left alone. A dry run reports the changes it
    /// would make and touches nothing. A failed write or verification is
    /// rolled back and reported with `success: false`.
    ///
    /// # Errors
    /// - `Error::NotFound` if `path` is not a file
    /// - `Error::Io` if reading, the safety snapshot or the backup fails
    /// - `Error::RollbackFailed` if a failed write could not be undone
    pub fn auto_fix(
        &self,
        path: &Path,
        create_backup: bool,
        dry_run: bool,
    ) -> Result<AutoFixReport> {
        if !path.is_file() {
            let owner = path
                .parent()
                .and_then(Path::file_name)
                .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
            return Err(Error::not_found("document", owner, path.display().to_string()));
        }

        let original = self.io.read(path)?;
        let plan = self.plan(&original);
        if plan.is_empty() {
            if !plan.skipped.is_empty() {
                tracing::debug!(document = %path.display(), skipped = ?plan.skipped, "missing sections have no template");
            }
            return Ok(AutoFixReport {
                success: true,
                changes: vec![NOTHING_TO_FIX.to_string()],
                backup_path: None,
            });
        }

        let mut changes = plan.describe(dry_run);
        if dry_run {
            tracing::debug!(document = %path.display(), planned = plan.insertions.len(), "auto-fix dry run");
            return Ok(AutoFixReport {
                success: true,
                changes,
                backup_path: None,
            });
        }

        if let Some((engine, namespace)) = &self.snapshots {
            let name = engine.create(namespace, AUTO_FIX_SNAPSHOT_DESCRIPTION, Some(path))?;
            changes.push(format!("Created safety snapshot: {name}"));
        }

        let backup_path = if create_backup {
            let backup = sibling_path(path, BACKUP_SUFFIX, self.clock.now());
            atomic_write(&backup, original.as_bytes())?;
            changes.push(format!("Backup written to {}", backup.display()));
            Some(backup)
        } else {
            None
        };

        let fixed = plan.apply(&original);
        let safety = SafetyBackup::from_content(path, Some(original));
        if let Err(e) = self.write_verified(path, &fixed) {
            let err = safety.rollback(e, self.clock.now());
            if matches!(err, Error::RollbackFailed { .. }) {
                return Err(err);
            }
            changes.push(format!("Rolled back to original content: {err}"));
            return Ok(AutoFixReport {
                success: false,
                changes,
                backup_path,
            });
        }

        tracing::info!(
            document = %path.display(),
            inserted = plan.insertions.len(),
            "auto-fix applied"
        );
        Ok(AutoFixReport {
            success: true,
            changes,
            backup_path,
        })
    }

    fn write_verified(&self, path: &Path, fixed: &str) -> Result<()> {
        self.io.write(path, fixed)?;
        let written = self.io.read(path)?;
        if written != fixed {
            return Err(Error::Integrity {
                namespace: String::new(),
                name: path.display().to_string(),
                check: "post-write content",
                expected: ContentHash::compute(fixed.as_bytes()).to_string(),
                actual: ContentHash::compute(written.as_bytes()).to_string(),
            });
        }
        Ok(())
    }
}

/// Insertions for every missing section of `result` that has a template
#[must_use]
pub fn plan_insertions(
    content: &str,
    result: &CompletenessResult,
    templates: &dyn TemplateSource,
) -> FixPlan {
    let spans = section_spans(content);
    let preamble_end = preamble_end(content);

    // (name, span of the section if its heading is present), canonical order
    let order: Vec<(&str, Option<&SectionSpan>)> = result
        .sections
        .iter()
        .map(|s| {
            let key = normalize_section_name(&s.name);
            (s.name.as_str(), spans.iter().find(|span| span.key == key))
        })
        .collect();

    let mut plan = FixPlan::default();
    for (index, score) in result.sections.iter().enumerate() {
        if score.status != SectionStatus::Missing {
            continue;
        }
        let Some(body) = templates.template(&score.name) else {
            plan.skipped.push(score.name.clone());
            continue;
        };

        let (offset, new_heading) = match order[index].1 {
            Some(span) => (span.end, false),
            None => {
                let anchor = order[..index]
                    .iter()
                    .rev()
                    .find_map(|(_, span)| span.map(|s| s.end));
                (anchor.unwrap_or(preamble_end), true)
            }
        };

        plan.insertions.push(Insertion {
            section: score.name.clone(),
            offset,
            new_heading,
            body,
        });
    }

    // Stable: equal offsets keep canonical order.
    plan.insertions.sort_by_key(|i| i.offset);
    plan
}

fn section_spans(content: &str) -> Vec<SectionSpan> {
    let headings: Vec<(usize, &str)> = scan_lines(content)
        .into_iter()
        .filter_map(|line| match line.heading {
            Some((SECTION_LEVEL, title)) => Some((line.start, title)),
            _ => None,
        })
        .collect();

    headings
        .iter()
        .enumerate()
        .map(|(i, (_, title))| SectionSpan {
            key: normalize_section_name(title),
            end: headings.get(i + 1).map_or(content.len(), |(start, _)| *start),
        })
        .collect()
}

/// Offset of the first section heading (end of title, metadata and intro)
fn preamble_end(content: &str) -> usize {
    scan_lines(content)
        .into_iter()
        .find(|line| matches!(line.heading, Some((SECTION_LEVEL, _))))
        .map_or(content.len(), |line| line.start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rubric::{SectionRule, Thresholds};
    use pretty_assertions::assert_eq;

    fn three_section_fixer() -> AutoFixer {
        let rule = |name: &str, weight| SectionRule::new(name, weight, Thresholds::default());
        let rubric = Rubric::new(vec![rule("Alpha", 30), rule("Beta", 30), rule("Gamma", 40)]).unwrap();
        AutoFixer::new().with_rubric(rubric).with_templates(Fixed)
    }

    #[derive(Debug)]
    struct Fixed;

    impl TemplateSource for Fixed {
        fn template(&self, section: &str) -> Option<String> {
            (section != "Gamma").then(|| format!("{section} body"))
        }
    }

    #[test]
    fn inserts_after_nearest_present_predecessor() {
        let fixer = three_section_fixer();
        let doc = "# T\n\n## Alpha\n\na\n\n## Extra\n\nx\n";
        let fixed = fixer.plan(doc).apply(doc);
        assert_eq!(fixed, "# T\n\n## Alpha\n\na\n\n## Beta\n\nBeta body\n\n## Extra\n\nx\n");
    }

    #[test]
    fn inserts_after_preamble_without_predecessor() {
        let fixer = three_section_fixer();
        let doc = "---\ntier: lite\n---\n# T\n\nIntro.\n\n## Gamma\n\ng\n";
        let fixed = fixer.plan(doc).apply(doc);
        assert_eq!(
            fixed,
            "---\ntier: lite\n---\n# T\n\nIntro.\n\n## Alpha\n\nAlpha body\n\n## Beta\n\nBeta body\n\n## Gamma\n\ng\n"
        );
    }

    #[test]
    fn fills_blank_section_in_place() {
        let fixer = three_section_fixer();
        let doc = "# T\n\n## Alpha\n\n## Beta\n\nb\n";
        let fixed = fixer.plan(doc).apply(doc);
        assert_eq!(fixed, "# T\n\n## Alpha\n\nAlpha body\n\n## Beta\n\nb\n");
    }

    #[test]
    fn appends_to_unterminated_document() {
        let fixer = three_section_fixer();
        let doc = "# T\n\n## Alpha\n\na";
        let fixed = fixer.plan(doc).apply(doc);
        assert_eq!(fixed, "# T\n\n## Alpha\n\na\n\n## Beta\n\nBeta body\n");
    }

    #[test]
    fn sections_without_template_are_reported() {
        let fixer = three_section_fixer();
        let plan = fixer.plan("# T\n\n## Alpha\n\na\n\n## Beta\n\nb\n");
        assert!(plan.is_empty());
        assert_eq!(plan.skipped, ["Gamma"]);
    }

    #[test]
    fn untemplated_gap_reports_only_nothing_to_fix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spec-1.md");
        let doc = "# T\n\n## Alpha\n\na\n\n## Beta\n\nb\n";
        std::fs::write(&path, doc).unwrap();

        let report = three_section_fixer().auto_fix(&path, true, false).unwrap();
        assert!(report.success);
        assert_eq!(report.changes, [NOTHING_TO_FIX]);
        assert_eq!(report.backup_path, None);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), doc);
    }
}
