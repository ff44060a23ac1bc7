//! Boilerplate bodies for inserted sections

use specsafe_artifact::document::normalize_section_name;
use std::fmt::Debug;

/// Source of boilerplate for a missing section
pub trait TemplateSource: Send + Sync + Debug {
    /// Body to insert under `section`, or `None` if there is no template
    fn template(&self, section: &str) -> Option<String>;
}

/// Short built-in boilerplate for the default rubric's sections
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTemplates;

impl TemplateSource for BuiltinTemplates {
    fn template(&self, section: &str) -> Option<String> {
        let body = match normalize_section_name(section).as_str() {
            "executive summary" => "_Summarize what this feature does and who it is for._",
            "problem statement" => "_Describe the problem, who has it, and what it costs today._",
            "user stories" => {
                "- As a [role], I want [capability] so that [benefit].\n\
                 - As a [role], I want [capability] so that [benefit].\n\
                 - As a [role], I want [capability] so that [benefit]."
            }
            "functional requirements" => {
                "1. [Requirement]\n2. [Requirement]\n3. [Requirement]\n4. [Requirement]\n5. [Requirement]"
            }
            "non-functional requirements" => {
                "- Performance: [target]\n- Security: [target]\n- Availability: [target]"
            }
            "technical design" => {
                "_Describe the overall approach._\n\n### Components\n\n_Main parts and their responsibilities._\n\n### Data Flow\n\n_How a request moves through the system._"
            }
            "data model" => "_Entities, fields and relationships._",
            "api design" => "_Endpoints or interfaces, with inputs and outputs._",
            "risks and mitigations" => {
                "- Risk: [what could go wrong]. Mitigation: [response].\n\
                 - Risk: [what could go wrong]. Mitigation: [response]."
            }
            "testing strategy" => {
                "- Unit tests: [scope]\n- Integration tests: [scope]\n- Manual checks: [scope]"
            }
            "success metrics" => "- [Metric]: [target]\n- [Metric]: [target]\n- [Metric]: [target]",
            _ => return None,
        };
        Some(body.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rubric::Rubric;

    #[test]
    fn every_default_section_has_a_template() {
        for rule in Rubric::default().rules() {
            assert!(BuiltinTemplates.template(&rule.name).is_some(), "{}", rule.name);
        }
        assert!(BuiltinTemplates.template("Appendix").is_none());
    }
}
