//! Specsafe Completeness Scorer & Remediator
//!
//! Scores a spec document against a weighted rubric of level-2 sections and
//! inserts boilerplate for the sections that are missing.
//!
//! # Scoring
//!
//! Each rubric section is **Complete** (all thresholds met), **Partial**
//! (present, short of a threshold) or **Missing** (absent or blank).
//!
//! ```text
//! overall = round(100 × (Σ complete + ½ Σ partial) / Σ all)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use specsafe_completeness::{score, AutoFixer};
//!
//! let result = score(&std::fs::read_to_string("specs/auth/spec-1.md")?);
//! println!("{}% next: {:?}", result.overall, result.next_section);
//!
//! let report = AutoFixer::new().auto_fix("specs/auth/spec-1.md".as_ref(), true, false)?;
//! ```

#![warn(unreachable_pub)]

mod remediate;
mod rubric;
mod scorer;
mod templates;

pub use remediate::{
    plan_insertions, AutoFixReport, AutoFixer, FixPlan, Insertion, AUTO_FIX_SNAPSHOT_DESCRIPTION,
    BACKUP_SUFFIX, NOTHING_TO_FIX,
};
pub use rubric::{Rubric, SectionRule, Thresholds, TOTAL_WEIGHT};
pub use scorer::{
    score, suggest_next, CompletenessResult, Scorer, SectionMetrics, SectionScore, SectionStatus,
};
pub use templates::{BuiltinTemplates, TemplateSource};
