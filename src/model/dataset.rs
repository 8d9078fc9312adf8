use super::{Block, Variable};
use crate::Result;
use chrono::{DateTime, Utc};
use ohno::IntoAppError;
use std::fs;
use std::path::Path;

/// A parsed SLHA file: its blocks plus the name and modification time of its source.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub blocks: Vec<Block>,
    pub variable_count: usize,
    pub file_name: String,
    pub last_modified: DateTime<Utc>,
}

impl Dataset {
    /// Reads and parses an SLHA file from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid SLHA.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .into_app_err_with(|| format!("'{}' does not name a file", path.display()))?;

        let text = fs::read_to_string(path).into_app_err_with(|| format!("reading SLHA file '{}'", path.display()))?;
        let modified = fs::metadata(path)
            .and_then(|metadata| metadata.modified())
            .into_app_err_with(|| format!("reading modification time of '{}'", path.display()))?;

        Self::parse(&file_name, DateTime::<Utc>::from(modified), &text)
    }

    /// Parses SLHA text that came from a file with the given name and modification time.
    ///
    /// # Errors
    ///
    /// Returns an error on any malformed declaration or data line, or if no block is declared.
    pub fn parse(file_name: &str, last_modified: DateTime<Utc>, text: &str) -> Result<Self> {
        super::parser::parse(file_name, last_modified, text)
    }

    /// The file name with its last extension removed.
    #[must_use]
    pub fn stem(&self) -> &str {
        file_stem(&self.file_name)
    }

    /// Finds a block by name, ignoring ASCII case.
    #[must_use]
    pub fn block(&self, name: &str) -> Option<&Block> {
        self.blocks.iter().find(|block| block.is_named(name))
    }

    #[must_use]
    pub fn contains_block(&self, name: &str) -> bool {
        self.block(name).is_some()
    }

    /// Every variable of every block, in declaration order.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.blocks.iter().flat_map(Block::variables)
    }
}

/// Strips the last extension from a file name, leaving dot-files untouched.
#[must_use]
pub fn file_stem(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
BLOCK MASS
   25     1.25e2   # h0
   1000022 1.5e2   # neutralino
BLOCK NMIX
  1  1   0.98  # N_11
";

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("point_1.slha"), "point_1");
        assert_eq!(file_stem("archive.tar.gz"), "archive.tar");
        assert_eq!(file_stem("README"), "README");
        assert_eq!(file_stem(".hidden"), ".hidden");
    }

    #[test]
    fn test_block_lookup_case_insensitive() {
        let dataset = Dataset::parse("a.slha", Utc::now(), SAMPLE).unwrap();
        assert!(dataset.contains_block("mass"));
        assert!(dataset.contains_block("NMix"));
        assert!(!dataset.contains_block("UMIX"));
        assert_eq!(dataset.block("MASS").unwrap().variables().len(), 2);
    }

    #[test]
    fn test_variables_iterates_all_blocks() {
        let dataset = Dataset::parse("a.slha", Utc::now(), SAMPLE).unwrap();
        assert_eq!(dataset.variables().count(), 3);
        assert_eq!(dataset.variable_count, 3);
        assert_eq!(dataset.stem(), "a");
    }

    #[test]
    fn test_from_path_reads_name_and_mtime() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("7.slha");
        fs::write(&path, SAMPLE).unwrap();

        let dataset = Dataset::from_path(&path).unwrap();
        assert_eq!(dataset.file_name, "7.slha");
        assert_eq!(dataset.stem(), "7");

        let expected = DateTime::<Utc>::from(fs::metadata(&path).unwrap().modified().unwrap());
        assert_eq!(dataset.last_modified, expected);
    }

    #[test]
    fn test_from_path_missing_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let _ = Dataset::from_path(dir.path().join("absent.slha")).unwrap_err();
    }
}
