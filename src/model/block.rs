use super::Variable;

/// A named group of variables declared in an SLHA file.
#[derive(Debug, Clone)]
pub enum Block {
    /// A `BLOCK <name>` declaration.
    Plain { name: String, variables: Vec<Variable> },

    /// A `DECAY <code> <width>` declaration.
    ///
    /// The header metadata is kept in memory only; it is never written to the store.
    Decay {
        code: i32,
        width: String,
        description: String,
        variables: Vec<Variable>,
    },
}

impl Block {
    #[must_use]
    pub fn plain(name: &str) -> Self {
        Self::Plain {
            name: name.trim().to_string(),
            variables: Vec::new(),
        }
    }

    #[must_use]
    pub fn decay(code: i32, width: &str, description: &str) -> Self {
        Self::Decay {
            code,
            width: width.trim().to_string(),
            description: description.trim().to_string(),
            variables: Vec::new(),
        }
    }

    /// The name used to match this block across files and to tag its variables.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Plain { name, .. } => name.clone(),
            Self::Decay { code, .. } => decay_block_name(*code),
        }
    }

    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        match self {
            Self::Plain { name: own, .. } => own.eq_ignore_ascii_case(name.trim()),
            Self::Decay { code, .. } => decay_block_name(*code).eq_ignore_ascii_case(name.trim()),
        }
    }

    #[must_use]
    pub fn variables(&self) -> &[Variable] {
        match self {
            Self::Plain { variables, .. } | Self::Decay { variables, .. } => variables,
        }
    }

    pub fn push(&mut self, variable: Variable) {
        match self {
            Self::Plain { variables, .. } | Self::Decay { variables, .. } => variables.push(variable),
        }
    }

    /// Membership by variable identity.
    #[must_use]
    pub fn contains(&self, variable: &Variable) -> bool {
        self.variables().contains(variable)
    }

    /// Finds the first variable whose description matches, ignoring ASCII case.
    #[must_use]
    pub fn variable_by_description(&self, description: &str) -> Option<&Variable> {
        let description = description.trim();
        self.variables()
            .iter()
            .find(|v| v.description().eq_ignore_ascii_case(description))
    }
}

#[must_use]
pub fn decay_block_name(code: i32) -> String {
    format!("DECAY {code}")
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_plain_block_operations() {
        let mut block = Block::plain("MASS");
        block.push(Variable::new([25, 0, 0], "MASS", "125.0", "h0"));
        block.push(Variable::new([1_000_022, 0, 0], "MASS", "150.0", "neutralino"));

        assert_eq!(block.name(), "MASS");
        assert!(block.is_named("mass"));
        assert_eq!(block.variables().len(), 2);
        assert!(block.contains(&Variable::key([25, 0, 0], "mass")));
        assert!(!block.contains(&Variable::key([35, 0, 0], "MASS")));

        let found = block.variable_by_description("NEUTRALINO").unwrap();
        assert_eq!(found.pdg(), [1_000_022, 0, 0]);
        assert!(block.variable_by_description("gluino").is_none());
    }

    #[test]
    fn test_decay_block_keeps_header_metadata() {
        let mut block = Block::decay(1_000_021, "5.5e0", "gluino decays");
        block.push(Variable::new([2, 1_000_001, -1], &decay_block_name(1_000_021), "0.25", ""));

        assert_eq!(block.name(), "DECAY 1000021");
        assert!(block.is_named("decay 1000021"));
        assert!(block.contains(&Variable::key([2, 1_000_001, -1], "DECAY 1000021")));

        let Block::Decay { code, width, description, .. } = &block else {
            panic!("expected a decay block");
        };
        assert_eq!(*code, 1_000_021);
        assert_eq!(width, "5.5e0");
        assert_eq!(description, "gluino decays");
    }
}
