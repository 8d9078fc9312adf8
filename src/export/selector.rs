use crate::model::Variable;
use core::fmt::{Display, Formatter};
use core::str::FromStr;
use ohno::{AppError, app_err, bail};

/// A variable named on the command line as `BLOCK:PDG1[,PDG2[,PDG3]]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSelector {
    pub block: String,
    pub pdg: [i32; 3],
}

impl VariableSelector {
    #[must_use]
    pub fn to_variable(&self) -> Variable {
        Variable::key(self.pdg, &self.block)
    }
}

impl From<&Variable> for VariableSelector {
    fn from(variable: &Variable) -> Self {
        Self {
            block: variable.block().to_string(),
            pdg: variable.pdg(),
        }
    }
}

impl FromStr for VariableSelector {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((block, codes)) = s.rsplit_once(':') else {
            bail!("'{s}' should look like BLOCK:PDG1[,PDG2[,PDG3]]");
        };

        let block = block.trim();
        if block.is_empty() {
            bail!("'{s}' does not name a block");
        }

        let mut pdg = [0i32; 3];
        let mut count = 0;
        for code in codes.split(',') {
            if count == pdg.len() {
                bail!("'{s}' has more than three PDG codes");
            }
            pdg[count] = code
                .trim()
                .parse()
                .map_err(|e| app_err!("'{code}' in '{s}' is not a PDG code: {e}"))?;
            count += 1;
        }

        Ok(Self {
            block: block.to_string(),
            pdg,
        })
    }
}

impl Display for VariableSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let [p1, p2, p3] = self.pdg;
        match (p2, p3) {
            (0, 0) => write!(f, "{}:{p1}", self.block),
            (_, 0) => write!(f, "{}:{p1},{p2}", self.block),
            _ => write!(f, "{}:{p1},{p2},{p3}", self.block),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        let one: VariableSelector = "MASS:1000022".parse().unwrap();
        assert_eq!(one.pdg, [1_000_022, 0, 0]);
        assert_eq!(one.block, "MASS");

        let two: VariableSelector = "NMIX:1,2".parse().unwrap();
        assert_eq!(two.pdg, [1, 2, 0]);

        let decay: VariableSelector = "DECAY 1000021:2, 1000001, -1".parse().unwrap();
        assert_eq!(decay.block, "DECAY 1000021");
        assert_eq!(decay.pdg, [2, 1_000_001, -1]);
    }

    #[test]
    fn test_rejects_malformed() {
        let _ = "MASS".parse::<VariableSelector>().unwrap_err();
        let _ = ":25".parse::<VariableSelector>().unwrap_err();
        let _ = "MASS:h0".parse::<VariableSelector>().unwrap_err();
        let _ = "MASS:1,2,3,4".parse::<VariableSelector>().unwrap_err();
    }

    #[test]
    fn test_display_parses_back() {
        for text in ["MASS:25", "NMIX:1,2", "RVLAMLLE:1,2,3"] {
            let selector: VariableSelector = text.parse().unwrap();
            assert_eq!(selector.to_string(), text);
        }
    }

    #[test]
    fn test_matches_stored_variable_case_insensitively() {
        let selector: VariableSelector = "mass:25".parse().unwrap();
        assert_eq!(selector.to_variable(), Variable::key([25, 0, 0], "MASS"));
    }
}
