//! SLHA text-format parser.
//!
//! Recognizes `BLOCK <name>` and `DECAY <code> <width>` declarations followed by data lines.
//! Everything after a `#` is a comment; on a data line that comment becomes the variable's
//! description, on a `DECAY` line it becomes the block's description.

use super::{Block, Dataset, Variable};
use crate::Result;
use chrono::{DateTime, Utc};
use ohno::{app_err, bail};

/// Log target for the parser
const LOG_TARGET: &str = "    parser";

pub(super) fn parse(file_name: &str, last_modified: DateTime<Utc>, text: &str) -> Result<Dataset> {
    let mut blocks: Vec<Block> = Vec::new();
    let mut variable_count = 0;

    for (index, raw) in text.lines().enumerate() {
        let at = format!("{file_name}:{}", index + 1);
        let (content, comment) = split_comment(raw);
        let tokens: Vec<&str> = content.split_whitespace().collect();

        let Some(first) = tokens.first() else {
            continue;
        };

        if first.eq_ignore_ascii_case("BLOCK") {
            let name = tokens.get(1).ok_or_else(|| app_err!("{at}: BLOCK declaration without a name"))?;
            blocks.push(Block::plain(name));
        } else if first.eq_ignore_ascii_case("DECAY") {
            let (Some(code), Some(width)) = (tokens.get(1), tokens.get(2)) else {
                bail!("{at}: DECAY declaration needs a PDG code and a width");
            };
            blocks.push(Block::decay(pdg_code(code, &at)?, width, comment));
        } else {
            let block = blocks
                .last_mut()
                .ok_or_else(|| app_err!("{at}: data found before any BLOCK or DECAY declaration"))?;
            let variable = parse_data_line(block, &tokens, comment, &at)?;
            block.push(variable);
            variable_count += 1;
        }
    }

    if blocks.is_empty() {
        bail!("{file_name}: no BLOCK or DECAY declarations found");
    }

    log::trace!(target: LOG_TARGET, "Parsed {} blocks and {variable_count} variables from '{file_name}'", blocks.len());

    Ok(Dataset {
        blocks,
        variable_count,
        file_name: file_name.to_string(),
        last_modified,
    })
}

fn split_comment(line: &str) -> (&str, &str) {
    line.split_once('#').map_or((line, ""), |(content, comment)| (content, comment.trim()))
}

fn parse_data_line(block: &Block, tokens: &[&str], comment: &str, at: &str) -> Result<Variable> {
    let name = block.name();

    if matches!(block, Block::Decay { .. }) {
        let [value, count, first, second, ..] = tokens else {
            bail!("{at}: decay channel needs a branching ratio, a particle count and two PDG codes");
        };
        let pdg = [pdg_code(count, at)?, pdg_code(first, at)?, pdg_code(second, at)?];
        return Ok(Variable::new(pdg, &name, value, comment));
    }

    let Some((last, indices)) = tokens.split_last() else {
        bail!("{at}: empty data line");
    };

    if indices.is_empty() {
        return Ok(Variable::new([0, 0, 0], &name, last, comment));
    }

    // Up to three leading integers are indices when exactly one value token follows them.
    let leading: Vec<i32> = indices.iter().take(3).map_while(|token| token.parse().ok()).collect();
    if leading.is_empty() {
        bail!("{at}: index '{}' is not an integer", indices[0]);
    }

    if leading.len() == indices.len() {
        let mut pdg = [0i32; 3];
        pdg[..leading.len()].copy_from_slice(&leading);
        return Ok(Variable::new(pdg, &name, last, comment));
    }

    let value = tokens[1..].join(" ");
    Ok(Variable::new([leading[0], 0, 0], &name, &value, comment))
}

fn pdg_code(token: &str, at: &str) -> Result<i32> {
    token
        .parse()
        .map_err(|e| app_err!("{at}: PDG code '{token}' is not a 32-bit integer: {e}"))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn parse_text(text: &str) -> Result<Dataset> {
        parse("test.slha", Utc::now(), text)
    }

    #[test]
    fn test_single_value_line() {
        let dataset = parse_text("BLOCK ALPHA\n  -1.1e-1  # alpha\n").unwrap();
        let v = &dataset.block("ALPHA").unwrap().variables()[0];
        assert_eq!(v.pdg(), [0, 0, 0]);
        assert_eq!(v.value(), "-1.1e-1");
        assert_eq!(v.description(), "alpha");
        assert_eq!(v.block(), "ALPHA");
    }

    #[test]
    fn test_one_two_and_three_index_lines() {
        let text = "\
Block MASS Q= 1000.0  # mass spectrum
   1000022   1.5e2   # neutralino
BLOCK NMIX
  1  2  -0.05   # N_12
BLOCK RVLAMLLE
  1  2  3  0.01   # lambda_123
";
        let dataset = parse_text(text).unwrap();
        assert_eq!(dataset.blocks.len(), 3);
        assert_eq!(dataset.variable_count, 3);

        let mass = &dataset.block("MASS").unwrap().variables()[0];
        assert_eq!(mass.pdg(), [1_000_022, 0, 0]);
        assert_eq!(mass.numeric_value(), Some(150.0));
        assert_eq!(mass.description(), "neutralino");

        let nmix = &dataset.block("NMIX").unwrap().variables()[0];
        assert_eq!(nmix.pdg(), [1, 2, 0]);
        assert_eq!(nmix.value(), "-0.05");

        let lambda = &dataset.block("RVLAMLLE").unwrap().variables()[0];
        assert_eq!(lambda.pdg(), [1, 2, 3]);
        assert_eq!(lambda.value(), "0.01");
    }

    #[test]
    fn test_text_value_is_kept_but_not_numeric() {
        let dataset = parse_text("BLOCK SPINFO\n 1 SOFTSUSY\n 4 some warning text\n").unwrap();
        let vars = dataset.block("SPINFO").unwrap().variables();
        assert_eq!(vars[0].value(), "SOFTSUSY");
        assert_eq!(vars[0].numeric_value(), None);
        assert_eq!(vars[1].pdg(), [4, 0, 0]);
        assert_eq!(vars[1].value(), "some warning text");
    }

    #[test]
    fn test_decay_block() {
        let text = "\
DECAY 1000021 5.50675438E+00 # gluino decays
#  BR  NDA  ID1  ID2
  2.08e-02  2  1000001  -1   # BR(~g -> ~d_L  db)
  2.08e-02  2 -1000001   1   # BR(~g -> ~d_L* d )
";
        let dataset = parse_text(text).unwrap();
        let block = dataset.block("DECAY 1000021").unwrap();
        let Block::Decay { code, width, description, variables } = block else {
            panic!("expected a decay block");
        };
        assert_eq!(*code, 1_000_021);
        assert_eq!(width, "5.50675438E+00");
        assert_eq!(description, "gluino decays");
        assert_eq!(variables.len(), 2);
        assert_eq!(variables[0].pdg(), [2, 1_000_001, -1]);
        assert_eq!(variables[0].block(), "DECAY 1000021");
        assert_eq!(variables[1].pdg(), [2, -1_000_001, 1]);
    }

    #[test]
    fn test_comments_and_blank_lines_skipped() {
        let dataset = parse_text("# header comment\n\nBLOCK MASS\n\n  # inner comment\n 25 125\n").unwrap();
        assert_eq!(dataset.variable_count, 1);
    }

    #[test]
    fn test_data_before_declaration_fails() {
        let err = parse_text(" 25 125\nBLOCK MASS\n").unwrap_err();
        assert!(err.to_string().contains("test.slha:1"), "{err}");
    }

    #[test]
    fn test_block_without_name_fails() {
        let _ = parse_text("BLOCK\n 25 125\n").unwrap_err();
    }

    #[test]
    fn test_decay_without_width_fails() {
        let _ = parse_text("DECAY 1000021\n").unwrap_err();
    }

    #[test]
    fn test_short_decay_channel_fails() {
        let _ = parse_text("DECAY 6 1.4\n 1.0 2 5\n").unwrap_err();
    }

    #[test]
    fn test_non_integer_index_fails() {
        let _ = parse_text("BLOCK MASS\n h0 125\n").unwrap_err();
    }

    #[test]
    fn test_empty_input_fails() {
        let _ = parse_text("# nothing here\n").unwrap_err();
    }
}
