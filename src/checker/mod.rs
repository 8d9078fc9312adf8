//! Schema-consistency checking between a candidate dataset and a trusted template.
//!
//! [`diff`] is a pure comparison. It reports, in this order:
//!
//! 1. every template block the candidate lacks ([`InconsistencyKind::MissingBlock`]),
//! 2. for each block both share, candidate variables the template block does not define
//!    ([`InconsistencyKind::UnmatchedVariable`]),
//! 3. and template variables the candidate block lacks ([`InconsistencyKind::MissingVariable`]).
//!
//! Block names match ignoring ASCII case; variables match by identity. What to do about each
//! finding is the store's business.

mod inconsistency;

pub use inconsistency::{Inconsistency, InconsistencyKind};

use crate::model::{Block, Dataset};
use std::collections::HashSet;

/// Compares `candidate` against `template` and lists every structural difference.
#[must_use]
pub fn diff(candidate: &Dataset, template: &Dataset) -> Vec<Inconsistency> {
    let mut findings = Vec::new();
    let mut seen = HashSet::new();
    let mut shared: Vec<(&Block, &Block)> = Vec::new();

    for template_block in &template.blocks {
        let name = template_block.name();
        if !seen.insert(name.to_ascii_lowercase()) {
            continue;
        }

        match candidate.block(&name) {
            Some(candidate_block) => shared.push((template_block, candidate_block)),
            None => findings.push(Inconsistency {
                kind: InconsistencyKind::MissingBlock,
                block: name,
                variable: None,
                file_name: candidate.file_name.clone(),
            }),
        }
    }

    for (template_block, candidate_block) in shared {
        let name = template_block.name();

        for variable in candidate_block.variables() {
            if !template_block.contains(variable) {
                findings.push(Inconsistency {
                    kind: InconsistencyKind::UnmatchedVariable,
                    block: name.clone(),
                    variable: Some(variable.clone()),
                    file_name: candidate.file_name.clone(),
                });
            }
        }

        for variable in template_block.variables() {
            if !candidate_block.contains(variable) {
                findings.push(Inconsistency {
                    kind: InconsistencyKind::MissingVariable,
                    block: name.clone(),
                    variable: Some(variable.clone()),
                    file_name: candidate.file_name.clone(),
                });
            }
        }
    }

    findings
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::model::Variable;
    use chrono::Utc;

    fn dataset(name: &str, text: &str) -> Dataset {
        Dataset::parse(name, Utc::now(), text).unwrap()
    }

    const TEMPLATE: &str = "\
BLOCK MASS
  25        1.25e2  # h0
  1000022   1.5e2   # neutralino
BLOCK NMIX
  1  1  0.98
  1  2  -0.05
DECAY 1000021 5.5
  0.5  2  1000001  -1
";

    #[test]
    fn test_identical_datasets_have_no_findings() {
        let a = dataset("a.slha", TEMPLATE);
        assert!(diff(&a, &a).is_empty());
    }

    #[test]
    fn test_missing_block() {
        let template = dataset("a.slha", "BLOCK MASS\n 1000022 1.5e2 # neutralino\n");
        let candidate = dataset("b.slha", "BLOCK NMIX\n 1 1 0.98\n");

        let findings = diff(&candidate, &template);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, InconsistencyKind::MissingBlock);
        assert_eq!(findings[0].block, "MASS");
        assert_eq!(findings[0].variable, None);
        assert_eq!(findings[0].file_name, "b.slha");
    }

    #[test]
    fn test_unmatched_and_missing_variables() {
        let template = dataset("a.slha", TEMPLATE);
        let candidate = dataset(
            "b.slha",
            "\
block mass
  25        1.26e2
  35        5.0e2
BLOCK NMIX
  1  1  0.97
  1  2  -0.04
DECAY 1000021 5.4
  0.5  2  1000001  -1
",
        );

        let findings = diff(&candidate, &template);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].kind, InconsistencyKind::UnmatchedVariable);
        assert_eq!(findings[0].variable, Some(Variable::key([35, 0, 0], "MASS")));
        assert_eq!(findings[1].kind, InconsistencyKind::MissingVariable);
        assert_eq!(findings[1].variable, Some(Variable::key([1_000_022, 0, 0], "MASS")));
        assert_eq!(findings[1].block, "MASS");
    }

    #[test]
    fn test_missing_blocks_reported_before_variable_findings() {
        let template = dataset("a.slha", TEMPLATE);
        let candidate = dataset("b.slha", "BLOCK NMIX\n 1 1 0.98\n");

        let kinds: Vec<_> = diff(&candidate, &template).into_iter().map(|f| f.kind).collect();
        assert_eq!(
            kinds,
            vec![
                InconsistencyKind::MissingBlock,
                InconsistencyKind::MissingBlock,
                InconsistencyKind::MissingVariable,
            ]
        );
    }

    #[test]
    fn test_findings_independent_of_block_order() {
        let template = dataset("a.slha", TEMPLATE);
        let reordered = dataset(
            "a.slha",
            "\
DECAY 1000021 5.5
  0.5  2  1000001  -1
BLOCK NMIX
  1  2  -0.05
  1  1  0.98
BLOCK MASS
  1000022   1.5e2
  25        1.25e2
",
        );
        let candidate = dataset("b.slha", "BLOCK MASS\n 25 125\n 36 700\n");

        let forward: HashSet<_> = diff(&candidate, &template).into_iter().collect();
        let backward: HashSet<_> = diff(&candidate, &reordered).into_iter().collect();
        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 4);
        assert!(diff(&template, &reordered).is_empty());
    }

    #[test]
    fn test_duplicate_template_block_reported_once() {
        let template = dataset("a.slha", "BLOCK MASS\n 25 125\nBLOCK MASS\n 35 500\n");
        let candidate = dataset("b.slha", "BLOCK NMIX\n 1 1 0.9\n");
        assert_eq!(diff(&candidate, &template).len(), 1);
    }
}
