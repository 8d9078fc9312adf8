use crate::Result;
use crate::checker::Inconsistency;
use ohno::IntoAppError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Human-readable side channel for schema findings, one line per inconsistency.
///
/// The file is created, replacing any previous session's log, when the first finding of a
/// session is recorded.
#[derive(Debug)]
pub struct InconsistencyLog {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl InconsistencyLog {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path, writer: None }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// # Errors
    ///
    /// Fails if the log cannot be created or written.
    pub fn record(&mut self, finding: &Inconsistency) -> Result<()> {
        if self.writer.is_none() {
            let file =
                File::create(&self.path).into_app_err_with(|| format!("creating inconsistency log '{}'", self.path.display()))?;
            self.writer = Some(BufWriter::new(file));
        }

        if let Some(writer) = &mut self.writer {
            writeln!(writer, "{finding}").into_app_err_with(|| format!("writing to inconsistency log '{}'", self.path.display()))?;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Fails if buffered lines cannot be written out.
    pub fn flush(&mut self) -> Result<()> {
        if let Some(writer) = &mut self.writer {
            writer
                .flush()
                .into_app_err_with(|| format!("flushing inconsistency log '{}'", self.path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::checker::InconsistencyKind;
    use std::fs;

    fn finding(block: &str) -> Inconsistency {
        Inconsistency {
            kind: InconsistencyKind::MissingBlock,
            block: block.to_string(),
            variable: None,
            file_name: "2.slha".to_string(),
        }
    }

    #[test]
    fn test_not_created_until_first_finding() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("inconsistencies.log");
        let mut log = InconsistencyLog::new(path.clone());

        log.flush().unwrap();
        assert!(!path.exists());

        log.record(&finding("MASS")).unwrap();
        log.record(&finding("NMIX")).unwrap();
        log.flush().unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Missing Block: MASS in file: 2.slha\nMissing Block: NMIX in file: 2.slha\n"
        );
    }

    #[test]
    fn test_new_session_replaces_old_log() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("inconsistencies.log");
        fs::write(&path, "stale line\n").unwrap();

        let mut log = InconsistencyLog::new(path.clone());
        log.record(&finding("MASS")).unwrap();
        log.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "Missing Block: MASS in file: 2.slha\n");
    }
}
