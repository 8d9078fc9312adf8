use super::bootstrap;
use super::inconsistency_log::InconsistencyLog;
use super::layout::{
    BLOCK_NAME_UNITS, CELL_LEN, Capacities, DESCRIPTION_UNITS, FILE_NAME_UNITS, FileEntry, Header, Layout, VariableEntry,
    decode_cell, encode_cells, fits_units, truncate_units,
};
use super::lock::StoreLock;
use super::observer::StoreObserver;
use super::worker::WriteWorker;
use crate::Result;
use crate::catalog::BatchSummary;
use crate::checker::{self, Inconsistency, InconsistencyKind};
use crate::config::StoreConfig;
use crate::model::{Dataset, SENTINEL, Variable, file_stem};
use chrono::{DateTime, Utc};
use core::fmt::{Debug, Formatter};
use ohno::{IntoAppError, bail};
use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Log target for the store
pub(super) const LOG_TARGET: &str = "     store";

/// Where a stored file's row lives and when its source last changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    /// Source modification time, at millisecond precision
    pub last_modified: DateTime<Utc>,
    pub slot: u32,
}

/// What one ingestion or update did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub slot: u32,

    /// Variables this file introduced to the store
    pub new_variables: usize,

    /// Schema findings against the template, each repaired or logged
    pub inconsistencies: u64,
}

/// A single-writer binary table store of SLHA values.
///
/// Index mutation happens on the calling thread; the physical writes are queued on a
/// [`WriteWorker`]. Reads go straight to disk, so call [`sync`](Self::sync) before reading
/// anything written in the same session. Dropping a store without [`close`](Self::close)
/// abandons writes that are still queued.
pub struct Store {
    pub(super) path: PathBuf,
    pub(super) config: StoreConfig,
    pub(super) layout: Layout,
    pub(super) variables_used: u32,
    pub(super) files_used: u32,

    /// Stored starting offset of every known variable
    pub(super) offsets: HashMap<Variable, u64>,

    /// Known variables in column order
    pub(super) columns: Vec<Variable>,

    pub(super) files: HashMap<String, FileInfo>,

    /// File names in slot order
    pub(super) slots: Vec<String>,

    pub(super) reader: File,
    pub(super) worker: WriteWorker,
    pub(super) observers: Vec<Arc<dyn StoreObserver>>,
    pub(super) inconsistency_count: u64,
    pub(super) failed_writes_seen: u64,
    reconciled: BatchSummary,
    log: InconsistencyLog,
    _lock: StoreLock,
}

impl Debug for Store {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path)
            .field("layout", &self.layout)
            .field("variables_used", &self.variables_used)
            .field("files_used", &self.files_used)
            .field("observers", &self.observers.len())
            .field("inconsistency_count", &self.inconsistency_count)
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Opens or creates the store at `path`, then reconciles it with its sibling files.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid, the store cannot be locked, created or read,
    /// or its directory cannot be scanned.
    pub fn open(path: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        Self::open_with(path, config, Vec::new())
    }

    /// Like [`open`](Self::open), with observers that also see the reconciliation pass.
    ///
    /// # Errors
    ///
    /// See [`open`](Self::open).
    pub fn open_with(path: impl AsRef<Path>, config: StoreConfig, observers: Vec<Arc<dyn StoreObserver>>) -> Result<Self> {
        config.validate()?;

        let path = path.as_ref().to_path_buf();
        let lock = StoreLock::acquire(&path)?;

        let contents = if path.exists() {
            bootstrap::load(&path)?
        } else {
            bootstrap::create(&path, &config)?
        };

        let reader = open_reader(&path)?;
        let worker = WriteWorker::spawn(open_writer(&path)?, &display_name(&path))?;
        let log = InconsistencyLog::new(sibling(&path, &config.inconsistency_log));

        let mut offsets = HashMap::with_capacity(contents.variables.len());
        let mut columns = Vec::with_capacity(contents.variables.len());
        for (variable, offset) in contents.variables {
            let _ = offsets.insert(variable.clone(), offset);
            columns.push(variable);
        }

        let mut files = HashMap::with_capacity(contents.files.len());
        let mut slots = Vec::with_capacity(contents.files.len());
        for (name, info) in contents.files {
            let _ = files.insert(name.clone(), info);
            slots.push(name);
        }

        let mut store = Self {
            path,
            config,
            layout: Layout::new(contents.header.capacities),
            variables_used: contents.header.variables_used,
            files_used: contents.header.files_used,
            offsets,
            columns,
            files,
            slots,
            reader,
            worker,
            observers,
            inconsistency_count: 0,
            failed_writes_seen: 0,
            reconciled: BatchSummary::default(),
            log,
            _lock: lock,
        };

        let summary = store.reconcile()?;
        if summary.ingested + summary.updated > 0 || !summary.skipped.is_empty() {
            log::info!(
                target: LOG_TARGET,
                "Reconciled '{}': {} new, {} updated, {} skipped",
                store.path.display(),
                summary.ingested,
                summary.updated,
                summary.skipped.len()
            );
        }
        store.reconciled = summary;

        Ok(store)
    }

    /// What reconciliation did when the store was opened.
    #[must_use]
    pub const fn reconciled(&self) -> &BatchSummary {
        &self.reconciled
    }

    pub fn add_observer(&mut self, observer: Arc<dyn StoreObserver>) {
        self.observers.push(observer);
    }

    /// Appends `dataset` as a new file row, checking it against `template`.
    ///
    /// Cells this file has no numeric value for, including non-numeric values, read back as
    /// [`SENTINEL`], never as zero.
    ///
    /// # Errors
    ///
    /// Fails if a file with the same stored name is already present, or if growing the store
    /// fails. A failed growth leaves the store file untouched.
    pub fn ingest(&mut self, dataset: &Dataset, template: &Dataset) -> Result<IngestReport> {
        let name = file_key(&dataset.file_name);
        if let Some(info) = self.files.get(&name) {
            bail!("'{}' is already stored in slot {} as '{name}'", dataset.file_name, info.slot);
        }

        let fresh = self.unseen_variables(dataset);
        self.ensure_capacity(fresh.len(), 1)?;
        for variable in &fresh {
            self.register_variable(variable);
        }

        let slot = self.files_used;
        let info = FileInfo {
            last_modified: millisecond_precision(dataset.last_modified),
            slot,
        };
        self.write_file_entry(&name, info);
        let _ = self.files.insert(name.clone(), info);
        self.slots.push(name);
        self.files_used += 1;

        let inconsistencies = self.write_row(dataset, template, slot);
        self.write_header();

        log::debug!(
            target: LOG_TARGET,
            "Ingested '{}' into slot {slot}: {} new variables, {inconsistencies} inconsistencies",
            dataset.file_name,
            fresh.len()
        );
        self.dispatch_progress();

        Ok(IngestReport {
            slot,
            new_variables: fresh.len(),
            inconsistencies,
        })
    }

    /// Rewrites the row of an already stored file whose source changed.
    ///
    /// # Errors
    ///
    /// Fails if the file is not stored, or if growing the store fails.
    pub fn update(&mut self, dataset: &Dataset, template: &Dataset) -> Result<IngestReport> {
        let name = file_key(&dataset.file_name);
        let Some(mut info) = self.files.get(&name).copied() else {
            bail!("'{}' is not stored, so it cannot be updated", dataset.file_name);
        };

        let fresh = self.unseen_variables(dataset);
        self.ensure_capacity(fresh.len(), 0)?;
        for variable in &fresh {
            self.register_variable(variable);
        }

        info.last_modified = millisecond_precision(dataset.last_modified);
        self.write_file_entry(&name, info);
        let _ = self.files.insert(name, info);

        let inconsistencies = self.write_row(dataset, template, info.slot);
        self.write_header();

        log::debug!(
            target: LOG_TARGET,
            "Updated '{}' in slot {}: {} new variables, {inconsistencies} inconsistencies",
            dataset.file_name,
            info.slot,
            fresh.len()
        );
        self.dispatch_progress();

        Ok(IngestReport {
            slot: info.slot,
            new_variables: fresh.len(),
            inconsistencies,
        })
    }

    /// Reads the value of `variable` for the file in `slot`.
    ///
    /// # Errors
    ///
    /// Fails if the variable is unknown, the slot is not in use, or the read fails.
    pub fn try_value(&self, variable: &Variable, slot: u32) -> Result<f64> {
        let offset = self
            .offsets
            .get(variable)
            .copied()
            .into_app_err_with(|| format!("variable {variable} not found in store '{}'", self.path.display()))?;

        if slot >= self.files_used {
            bail!("file slot {slot} is out of range, the store holds {} files", self.files_used);
        }

        self.read_cell(self.layout.cell_offset(offset, slot))
    }

    /// Like [`try_value`](Self::try_value), but logs failures and yields the sentinel instead.
    #[must_use]
    pub fn value(&self, variable: &Variable, slot: u32) -> f64 {
        self.try_value(variable, slot).unwrap_or_else(|e| {
            log::error!(target: LOG_TARGET, "Could not read {variable} for slot {slot}: {e:#}");
            SENTINEL
        })
    }

    /// Waits for every queued write, then notifies observers of the progress made.
    ///
    /// # Errors
    ///
    /// Fails if any write queued since the last sync failed, or the inconsistency log cannot be flushed.
    pub fn sync(&mut self) -> Result<()> {
        self.worker.drain();
        self.dispatch_progress();
        self.log.flush()?;

        let failed = self.worker.failed_writes();
        if failed > self.failed_writes_seen {
            let new_failures = failed - self.failed_writes_seen;
            self.failed_writes_seen = failed;
            bail!("{new_failures} writes to store '{}' failed", self.path.display());
        }

        Ok(())
    }

    /// Flushes everything and stops the write worker.
    ///
    /// # Errors
    ///
    /// See [`sync`](Self::sync).
    pub fn close(mut self) -> Result<()> {
        let result = self.sync();
        self.worker.shutdown();
        log::debug!(target: LOG_TARGET, "Closed store '{}'", self.path.display());
        result
    }

    #[must_use]
    pub const fn capacities(&self) -> Capacities {
        self.layout.capacities()
    }

    #[must_use]
    pub const fn layout(&self) -> Layout {
        self.layout
    }

    #[must_use]
    pub const fn variables_used(&self) -> u32 {
        self.variables_used
    }

    #[must_use]
    pub const fn files_used(&self) -> u32 {
        self.files_used
    }

    /// Known variables in column order.
    #[must_use]
    pub fn variables(&self) -> &[Variable] {
        &self.columns
    }

    #[must_use]
    pub fn variable_offset(&self, variable: &Variable) -> Option<u64> {
        self.offsets.get(variable).copied()
    }

    /// Stored files in slot order.
    pub fn files(&self) -> impl Iterator<Item = (&str, FileInfo)> {
        self.slots
            .iter()
            .filter_map(|name| self.files.get(name).map(|info| (name.as_str(), *info)))
    }

    /// Looks a file up by name; the extension is ignored.
    #[must_use]
    pub fn file_info(&self, file_name: &str) -> Option<FileInfo> {
        self.files.get(&file_key(file_name)).copied()
    }

    #[must_use]
    pub fn contains_file(&self, file_name: &str) -> bool {
        self.files.contains_key(&file_key(file_name))
    }

    /// Inconsistencies found during this session.
    #[must_use]
    pub const fn inconsistency_count(&self) -> u64 {
        self.inconsistency_count
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn inconsistency_log_path(&self) -> &Path {
        self.log.path()
    }

    pub(crate) fn notify_files_processed(&self, completed: u64, total: u64) {
        for observer in &self.observers {
            observer.files_processed(completed, total);
        }
    }

    pub(super) fn dispatch_progress(&self) {
        for progress in self.worker.progress() {
            for observer in &self.observers {
                observer.writes_completed(progress.completed, progress.total);
            }
        }
    }

    pub(super) fn read_cell(&self, at: u64) -> Result<f64> {
        let mut cell = [0u8; CELL_LEN as usize];
        self.read_at(at, &mut cell)?;
        Ok(decode_cell(&cell))
    }

    /// The used part of a file's row, one value per column.
    pub(super) fn read_row(&self, slot: u32) -> Result<Vec<f64>> {
        let mut row = vec![0u8; self.variables_used as usize * CELL_LEN as usize];
        self.read_at(self.layout.row_offset(slot), &mut row)?;
        Ok(row.chunks_exact(CELL_LEN as usize).map(decode_cell).collect())
    }

    fn read_at(&self, at: u64, buf: &mut [u8]) -> Result<()> {
        let mut file = &self.reader;
        let _ = file
            .seek(SeekFrom::Start(at))
            .into_app_err_with(|| format!("seeking to {at} in store '{}'", self.path.display()))?;
        file.read_exact(buf)
            .into_app_err_with(|| format!("reading {} bytes at {at} from store '{}'", buf.len(), self.path.display()))
    }

    /// Variables of `dataset` the store has never seen, once each, in first-appearance order.
    fn unseen_variables(&self, dataset: &Dataset) -> Vec<Variable> {
        let mut seen = HashSet::new();
        dataset
            .variables()
            .filter(|variable| !self.offsets.contains_key(*variable))
            .filter(|variable| {
                if fits_units(variable.block(), BLOCK_NAME_UNITS) {
                    true
                } else {
                    log::warn!(
                        target: LOG_TARGET,
                        "Skipping {variable} from '{}': block names are limited to {BLOCK_NAME_UNITS} characters",
                        dataset.file_name
                    );
                    false
                }
            })
            .filter(|variable| seen.insert((*variable).clone()))
            .cloned()
            .collect()
    }

    /// Grows the store first if adding the given number of variables and files would reach the load factor.
    fn ensure_capacity(&mut self, new_variables: usize, new_files: u32) -> Result<()> {
        let current = self.layout.capacities();
        let target = Capacities {
            variables: grow_to_fit(
                current.variables,
                u64::from(self.variables_used) + new_variables as u64,
                self.config.load_factor,
                self.config.variable_growth,
            )?,
            files: grow_to_fit(
                current.files,
                u64::from(self.files_used) + u64::from(new_files),
                self.config.load_factor,
                self.config.file_growth,
            )?,
        };

        if target != current {
            self.grow(target)?;
        }

        Ok(())
    }

    /// Appends a variable entry and marks its cells in every existing row as missing.
    fn register_variable(&mut self, variable: &Variable) {
        let column = self.variables_used;
        let offset = self.layout.variable_offset(column);

        let stored = Variable::new(
            variable.pdg(),
            variable.block(),
            "",
            &truncate_units(variable.description(), DESCRIPTION_UNITS),
        );
        let entry = variable_entry(&stored, offset);
        self.worker.submit(Layout::variable_entry_offset(column), entry.encode());

        let missing = encode_cells(&[SENTINEL]);
        for slot in 0..self.files_used {
            self.worker.submit(self.layout.cell_offset(offset, slot), missing.clone());
        }

        let _ = self.offsets.insert(stored.clone(), offset);
        self.columns.push(stored);
        self.variables_used += 1;
    }

    /// Builds and queues one file's row, applying the repair for every schema finding.
    fn write_row(&mut self, dataset: &Dataset, template: &Dataset, slot: u32) -> u64 {
        let mut row = vec![SENTINEL; self.variables_used as usize];

        for variable in dataset.variables() {
            let Some(value) = variable.numeric_value() else {
                continue;
            };
            if let Some(column) = self.column(variable) {
                row[column] = value;
            }
        }

        let findings = checker::diff(dataset, template);
        for finding in &findings {
            self.repair(finding, template, &mut row);
        }

        self.worker.submit(self.layout.row_offset(slot), encode_cells(&row));
        findings.len() as u64
    }

    fn repair(&mut self, finding: &Inconsistency, template: &Dataset, row: &mut [f64]) {
        match finding.kind {
            InconsistencyKind::MissingBlock => {
                if let Some(block) = template.block(&finding.block) {
                    for variable in block.variables() {
                        self.mark_missing(variable, row);
                    }
                }
            }
            InconsistencyKind::MissingVariable => {
                if let Some(variable) = &finding.variable {
                    self.mark_missing(variable, row);
                }
            }
            InconsistencyKind::UnmatchedVariable => {}
        }

        self.inconsistency_count += 1;
        log::debug!(target: LOG_TARGET, "{finding}");
        if let Err(e) = self.log.record(finding) {
            log::warn!(target: LOG_TARGET, "Could not log inconsistency: {e:#}");
        }
    }

    fn mark_missing(&self, variable: &Variable, row: &mut [f64]) {
        match self.column(variable) {
            Some(column) => row[column] = SENTINEL,
            None => log::warn!(target: LOG_TARGET, "Cannot repair {variable}: not found in store"),
        }
    }

    fn column(&self, variable: &Variable) -> Option<usize> {
        let offset = self.offsets.get(variable)?;
        self.layout.column_of(*offset).map(|column| column as usize)
    }

    fn write_file_entry(&self, name: &str, info: FileInfo) {
        let entry = FileEntry {
            last_modified: info.last_modified.timestamp_millis(),
            name: name.to_string(),
            slot: info.slot,
        };
        self.worker.submit(self.layout.file_entry_offset(info.slot), entry.encode());
    }

    fn write_header(&self) {
        let header = Header {
            capacities: self.layout.capacities(),
            variables_used: self.variables_used,
            files_used: self.files_used,
        };
        self.worker.submit(0, header.encode());
    }
}

/// The name a file is stored under: its stem, cut to the width of the file name field.
#[must_use]
pub fn file_key(file_name: &str) -> String {
    truncate_units(file_stem(file_name), FILE_NAME_UNITS)
}

pub(super) fn variable_entry(variable: &Variable, offset: u64) -> VariableEntry {
    VariableEntry {
        pdg: variable.pdg(),
        block: variable.block().to_string(),
        description: variable.description().to_string(),
        offset,
    }
}

/// Smallest capacity reachable by repeated growth that keeps `needed` under the load factor.
#[expect(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "table sizes stay far below 2^52 and are checked against i32::MAX"
)]
pub(super) fn grow_to_fit(capacity: u32, needed: u64, load_factor: f64, growth: f64) -> Result<u32> {
    let mut capacity = capacity;

    while needed as f64 / f64::from(capacity) >= load_factor {
        let grown = (f64::from(capacity) * growth).floor() as u64;
        let grown = grown.max(u64::from(capacity) + 1);

        if grown > i32::MAX as u64 {
            bail!("cannot grow a table beyond {} rows", i32::MAX);
        }
        capacity = grown as u32;
    }

    Ok(capacity)
}

pub(super) fn millisecond_precision(time: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(time.timestamp_millis()).unwrap_or(time)
}

pub(super) fn open_reader(path: &Path) -> Result<File> {
    File::open(path).into_app_err_with(|| format!("opening store '{}' for reading", path.display()))
}

pub(super) fn open_writer(path: &Path) -> Result<File> {
    OpenOptions::new()
        .write(true)
        .open(path)
        .into_app_err_with(|| format!("opening store '{}' for writing", path.display()))
}

pub(super) fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}

/// A path in the same directory as the store.
pub(super) fn sibling(store_path: &Path, file_name: &str) -> PathBuf {
    store_path.with_file_name(file_name)
}
