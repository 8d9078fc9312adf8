use super::{NameClaims, discover};
use crate::Result;
use crate::model::Dataset;
use crate::store::Store;
use std::path::Path;

/// Log target for batch ingestion
const LOG_TARGET: &str = "   catalog";

/// Outcome of a pass over a directory of source files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Files added to the store as new rows
    pub ingested: usize,

    /// Stored files whose rows were rewritten because their source changed
    pub updated: usize,

    /// Files that could not be parsed or stored, by name
    pub skipped: Vec<String>,

    /// Schema findings across every file of the pass
    pub inconsistencies: u64,
}

impl BatchSummary {
    /// Folds the outcome of a later pass into this one.
    ///
    /// A file skipped by both passes is listed once.
    pub fn absorb(&mut self, other: Self) {
        self.ingested += other.ingested;
        self.updated += other.updated;
        self.inconsistencies += other.inconsistencies;
        for name in other.skipped {
            if !self.skipped.contains(&name) {
                self.skipped.push(name);
            }
        }
    }
}

/// Ingests every SLHA file in `dir` that the store does not hold yet.
///
/// Each new file is checked against the file discovered before it, whether that one was stored
/// in this pass or an earlier one; the first file is its own template. Files that fail to parse
/// or store, and files whose stored name an earlier file already owns, are logged and skipped
/// without stopping the pass.
///
/// # Errors
///
/// Fails if the directory cannot be scanned or the final sync reports failed writes.
pub fn ingest_directory(store: &mut Store, dir: &Path) -> Result<BatchSummary> {
    let sources = discover(dir)?;
    let total = sources.len() as u64;
    let mut summary = BatchSummary::default();
    let mut claims = NameClaims::new();
    let mut template: Option<Dataset> = None;

    // Already stored file seen since the template was last set, parsed only if a new file needs it
    let mut stored_predecessor: Option<&Path> = None;

    for (done, source) in (1..).zip(&sources) {
        let name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        if let Some(owner) = claims.claim(source) {
            log::warn!(
                target: LOG_TARGET,
                "Skipping '{name}': '{}' is already stored under the same name",
                owner.display()
            );
            summary.skipped.push(name);
        } else if store.contains_file(&name) {
            log::debug!(target: LOG_TARGET, "'{name}' is already stored");
            stored_predecessor = Some(source);
        } else {
            if let Some(predecessor) = stored_predecessor.take() {
                match Dataset::from_path(predecessor) {
                    Ok(dataset) => template = Some(dataset),
                    Err(e) => log::debug!(
                        target: LOG_TARGET,
                        "Cannot use '{}' as the template for '{name}': {e:#}",
                        predecessor.display()
                    ),
                }
            }

            match Dataset::from_path(source) {
                Ok(dataset) => {
                    match store.ingest(&dataset, template.as_ref().unwrap_or(&dataset)) {
                        Ok(report) => {
                            summary.ingested += 1;
                            summary.inconsistencies += report.inconsistencies;
                        }
                        Err(e) => {
                            log::error!(target: LOG_TARGET, "Could not store '{name}': {e:#}");
                            summary.skipped.push(name);
                        }
                    }
                    template = Some(dataset);
                }
                Err(e) => {
                    log::warn!(target: LOG_TARGET, "Skipping '{name}': {e:#}");
                    summary.skipped.push(name);
                }
            }
        }

        store.notify_files_processed(done, total);
    }

    store.sync()?;

    log::info!(
        target: LOG_TARGET,
        "Ingested {} of {} files from '{}' ({} skipped, {} inconsistencies)",
        summary.ingested,
        total,
        dir.display(),
        summary.skipped.len(),
        summary.inconsistencies
    );

    Ok(summary)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_absorb_adds_counts_and_merges_skipped() {
        let mut first = BatchSummary {
            ingested: 2,
            updated: 1,
            skipped: vec!["3.slha".to_string()],
            inconsistencies: 4,
        };
        first.absorb(BatchSummary {
            ingested: 5,
            updated: 0,
            skipped: vec!["3.slha".to_string(), "9.slha".to_string()],
            inconsistencies: 1,
        });

        assert_eq!(first.ingested, 7);
        assert_eq!(first.updated, 1);
        assert_eq!(first.skipped, ["3.slha", "9.slha"]);
        assert_eq!(first.inconsistencies, 5);
    }
}
