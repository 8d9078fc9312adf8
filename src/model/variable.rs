use core::fmt::{Display, Formatter};
use core::hash::{Hash, Hasher};

/// Value reserved in the data matrix to mean "no data" or "structurally missing".
pub const SENTINEL: f64 = f64::MAX;

/// A single identified value inside a block of an SLHA file.
///
/// Identity is the PDG triple plus the block name, with the block name compared
/// ASCII case-insensitively. The value and description never participate in
/// equality or hashing, so two lines with the same codes in the same block are the
/// same variable even if their values differ.
#[derive(Debug, Clone)]
pub struct Variable {
    pdg: [i32; 3],
    block: String,
    value: String,
    description: String,
}

impl Variable {
    #[must_use]
    pub fn new(pdg: [i32; 3], block: &str, value: &str, description: &str) -> Self {
        Self {
            pdg,
            block: block.trim().to_string(),
            value: value.trim().to_string(),
            description: description.trim().to_string(),
        }
    }

    /// Identity-only variable, used for lookups.
    #[must_use]
    pub fn key(pdg: [i32; 3], block: &str) -> Self {
        Self::new(pdg, block, "", "")
    }

    #[must_use]
    pub const fn pdg(&self) -> [i32; 3] {
        self.pdg
    }

    #[must_use]
    pub fn block(&self) -> &str {
        &self.block
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The value as a storable double.
    ///
    /// Non-numeric text, non-finite numbers and the sentinel itself yield `None`, since none of
    /// them can be stored without being confused with "no data".
    #[must_use]
    pub fn numeric_value(&self) -> Option<f64> {
        let parsed = self.value.parse::<f64>().ok()?;
        (parsed.is_finite() && parsed != SENTINEL).then_some(parsed)
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.pdg == other.pdg && self.block.eq_ignore_ascii_case(&other.block)
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pdg.hash(state);
        for byte in self.block.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
        state.write_usize(self.block.len());
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let [p1, p2, p3] = self.pdg;
        write!(f, "{} ({p1}, {p2}, {p3})", self.block)?;
        if !self.description.is_empty() {
            write!(f, " {}", self.description)?;
        }
        Ok(())
    }
}
