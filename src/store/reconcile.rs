//! Bringing a freshly opened store up to date with the SLHA files stored beside it.

use super::engine::{LOG_TARGET, Store, file_key, millisecond_precision};
use crate::Result;
use crate::catalog::{BatchSummary, NameClaims, discover};
use crate::model::Dataset;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

impl Store {
    /// Ingests unknown siblings and re-ingests stored ones whose modification time changed.
    ///
    /// Each file is checked against the sibling listed just before it; the first sibling is its
    /// own template. Unreadable or malformed siblings are logged and skipped, as are siblings
    /// whose stored name is already taken by an earlier sibling.
    ///
    /// # Errors
    ///
    /// Fails if the store's directory cannot be scanned or the final sync reports failed writes.
    pub fn reconcile(&mut self) -> Result<BatchSummary> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let sources = discover(&dir)?;
        let total = sources.len() as u64;
        let mut summary = BatchSummary::default();
        let mut claims = NameClaims::new();
        let mut previous: Option<&Path> = None;

        for (done, source) in (1..).zip(&sources) {
            if let Some(owner) = claims.claim(source) {
                let name = source.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();
                log::warn!(
                    target: LOG_TARGET,
                    "Skipping '{name}': '{}' is already stored under the same name",
                    owner.display()
                );
                summary.skipped.push(name);
            } else {
                self.reconcile_file(source, previous, &mut summary);
                previous = Some(source);
            }
            self.notify_files_processed(done, total);
        }

        self.sync()?;
        Ok(summary)
    }

    fn reconcile_file(&mut self, source: &Path, previous: Option<&Path>, summary: &mut BatchSummary) {
        let name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let known = self.files.get(&file_key(&name)).copied();
        if let Some(info) = known {
            match modification_time(source) {
                Ok(modified) if modified == info.last_modified => return,
                Ok(_) => log::debug!(target: LOG_TARGET, "'{name}' changed since it was stored"),
                Err(e) => {
                    log::warn!(target: LOG_TARGET, "Could not check '{name}' for changes: {e:#}");
                    return;
                }
            }
        }

        let dataset = match Dataset::from_path(source) {
            Ok(dataset) => dataset,
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Skipping '{name}': {e:#}");
                summary.skipped.push(name);
                return;
            }
        };

        let template = previous.and_then(|path| match Dataset::from_path(path) {
            Ok(template) => Some(template),
            Err(e) => {
                log::debug!(target: LOG_TARGET, "Checking '{name}' against itself, its predecessor is unusable: {e:#}");
                None
            }
        });
        let template = template.as_ref().unwrap_or(&dataset);

        let outcome = if known.is_some() {
            self.update(&dataset, template)
        } else {
            self.ingest(&dataset, template)
        };

        match outcome {
            Ok(report) => {
                if known.is_some() {
                    summary.updated += 1;
                } else {
                    summary.ingested += 1;
                }
                summary.inconsistencies += report.inconsistencies;
            }
            Err(e) => {
                log::error!(target: LOG_TARGET, "Could not store '{name}': {e:#}");
                summary.skipped.push(name);
            }
        }
    }
}

fn modification_time(path: &Path) -> std::io::Result<DateTime<Utc>> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(millisecond_precision(DateTime::<Utc>::from(modified)))
}
