//! Result aggregation and classification

use warden_types::{
    AdmissionResponse, EnforcementAction, GroupVersionKind, ViolationResult,
};

/// Results of reviewing one derived object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedResults {
    /// Expansion template that produced the object
    pub template: String,
    /// Identity of the derived object
    pub gvk: GroupVersionKind,
    pub results: Vec<ViolationResult>,
}

/// Merge the original object's results with those of its derived objects.
///
/// Original results come first. Derived results keep their expansion order
/// and are tagged with the template that produced their object.
pub fn merge(original: Vec<ViolationResult>, derived: Vec<DerivedResults>) -> Vec<ViolationResult> {
    let mut merged = original;
    for DerivedResults {
        template,
        gvk,
        results,
    } in derived
    {
        merged.extend(
            results
                .into_iter()
                .map(|r| r.implied_by(template.clone(), gvk.clone())),
        );
    }
    merged
}

/// Results whose enforcement action is recognized, paired with it.
pub fn counted(
    results: &[ViolationResult],
) -> impl Iterator<Item = (&ViolationResult, EnforcementAction)> {
    results.iter().filter_map(|r| {
        EnforcementAction::validate(&r.enforcement_action)
            .ok()
            .map(|action| (r, action))
    })
}

/// Messages split by whether they block the request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classified {
    pub deny: Vec<String>,
    pub warn: Vec<String>,
}

impl Classified {
    /// Bucket counted results. Dry-run results land in neither bucket.
    pub fn classify(results: &[ViolationResult]) -> Self {
        let mut classified = Self::default();
        for (result, action) in counted(results) {
            match action {
                EnforcementAction::Deny => classified.deny.push(result.display_message()),
                EnforcementAction::Warn => classified.warn.push(result.display_message()),
                EnforcementAction::Dryrun => {}
            }
        }
        classified
    }

    pub fn is_denied(&self) -> bool {
        !self.deny.is_empty()
    }

    pub fn into_response(self) -> AdmissionResponse {
        if self.is_denied() {
            AdmissionResponse::denied(self.deny.join("\n"), self.warn)
        } else {
            AdmissionResponse::allowed_with_warnings(self.warn)
        }
    }
}
