use crate::model::Variable;
use core::fmt::{Display, Formatter};
use strum::Display as StrumDisplay;

/// The kind of structural drift found between a candidate and its template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, StrumDisplay)]
pub enum InconsistencyKind {
    /// A block of the template is absent from the candidate.
    #[strum(to_string = "Missing Block")]
    MissingBlock,

    /// A variable of the candidate is absent from the matching template block.
    #[strum(to_string = "Unmatched Variable")]
    UnmatchedVariable,

    /// A variable of the template is absent from the matching candidate block.
    #[strum(to_string = "Missing Variable")]
    MissingVariable,
}

/// One finding of [`diff`](super::diff), reported against the candidate file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Inconsistency {
    pub kind: InconsistencyKind,
    pub block: String,
    pub variable: Option<Variable>,
    pub file_name: String,
}

impl Display for Inconsistency {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match &self.variable {
            None => write!(f, "{}: {} in file: {}", self.kind, self.block, self.file_name),
            Some(variable) => {
                let [p1, p2, p3] = variable.pdg();
                write!(f, "{}: PDG Code {p1}, {p2}, {p3}", self.kind)?;
                if !variable.description().is_empty() {
                    write!(f, " Description: {}", variable.description())?;
                }
                write!(f, " in block: {} in file: {}", self.block, self.file_name)
            }
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_missing_block_message() {
        let finding = Inconsistency {
            kind: InconsistencyKind::MissingBlock,
            block: "MASS".to_string(),
            variable: None,
            file_name: "2.slha".to_string(),
        };
        assert_eq!(finding.to_string(), "Missing Block: MASS in file: 2.slha");
    }

    #[test]
    fn test_variable_message() {
        let finding = Inconsistency {
            kind: InconsistencyKind::MissingVariable,
            block: "MASS".to_string(),
            variable: Some(Variable::new([1_000_022, 0, 0], "MASS", "150", "neutralino")),
            file_name: "2.slha".to_string(),
        };
        assert_eq!(
            finding.to_string(),
            "Missing Variable: PDG Code 1000022, 0, 0 Description: neutralino in block: MASS in file: 2.slha"
        );
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(InconsistencyKind::MissingBlock.to_string(), "Missing Block");
        assert_eq!(InconsistencyKind::UnmatchedVariable.to_string(), "Unmatched Variable");
    }
}
