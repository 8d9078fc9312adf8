//! Growing a store: every stored offset depends on both capacities, so growth rebuilds the whole
//! file under the new capacities and relocates every value before swapping it in.

use super::engine::{LOG_TARGET, Store, display_name, open_reader, open_writer, variable_entry};
use super::layout::{CELL_LEN, Capacities, FileEntry, Header, Layout, encode_cells};
use super::worker::WriteWorker;
use crate::Result;
use crate::model::{SENTINEL, Variable};
use ohno::{IntoAppError, bail};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

impl Store {
    /// Rebuilds the store with the given capacities.
    ///
    /// The replacement is written beside the store and only renamed over it once every value has
    /// been relocated, so a failure at any earlier point leaves the original file as it was.
    pub(super) fn grow(&mut self, target: Capacities) -> Result<()> {
        let current = self.layout.capacities();
        log::info!(
            target: LOG_TARGET,
            "Growing '{}' from {} variables x {} files to {} variables x {} files",
            self.path.display(),
            current.variables,
            current.files,
            target.variables,
            target.files
        );

        // Nothing may still be in flight against the old layout
        self.sync()?;

        let temp = grow_path(&self.path);
        let layout = Layout::new(target);
        let offsets = match self.relocate(&temp, layout) {
            Ok(offsets) => offsets,
            Err(e) => {
                remove_replacement(&temp);
                return Err(e);
            }
        };

        self.swap_in(&temp, layout, offsets)
    }

    /// Writes a complete copy of the store under `layout` to `temp`, returning the new offset map.
    fn relocate(&self, temp: &Path, layout: Layout) -> Result<HashMap<Variable, u64>> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(temp)
            .into_app_err_with(|| format!("creating replacement store '{}'", temp.display()))?;
        file.set_len(layout.total_len())
            .into_app_err_with(|| format!("sizing replacement store '{}' to {} bytes", temp.display(), layout.total_len()))?;

        let mut worker = WriteWorker::spawn(file, &display_name(temp))?;

        let header = Header {
            capacities: layout.capacities(),
            variables_used: self.variables_used,
            files_used: self.files_used,
        };
        worker.submit(0, header.encode());

        let mut offsets = HashMap::with_capacity(self.columns.len());
        for (column, variable) in (0..self.variables_used).zip(&self.columns) {
            let offset = layout.variable_offset(column);
            worker.submit(Layout::variable_entry_offset(column), variable_entry(variable, offset).encode());
            let _ = offsets.insert(variable.clone(), offset);
        }

        for (slot, name) in (0..self.files_used).zip(&self.slots) {
            let Some(info) = self.files.get(name) else {
                bail!("file '{name}' in slot {slot} has no file table entry");
            };
            let entry = FileEntry {
                last_modified: info.last_modified.timestamp_millis(),
                name: name.clone(),
                slot,
            };
            worker.submit(layout.file_entry_offset(slot), entry.encode());
        }

        // Pairs of (old, new) cell positions within a row
        let mut moves = Vec::with_capacity(self.offsets.len());
        for (variable, old_offset) in &self.offsets {
            let Some(new_offset) = offsets.get(variable) else {
                bail!("variable {variable} was lost while rebuilding the variable table");
            };
            moves.push((
                self.layout.row_position(*old_offset) / CELL_LEN as usize,
                layout.row_position(*new_offset) / CELL_LEN as usize,
            ));
        }

        for slot in 0..self.files_used {
            let old_row = self.read_row(slot)?;
            let mut row = vec![SENTINEL; self.variables_used as usize];
            for &(from, to) in &moves {
                row[to] = old_row[from];
            }
            worker.submit(layout.row_offset(slot), encode_cells(&row));
        }

        worker.drain();
        let failed = worker.failed_writes();
        worker.shutdown();

        if failed > 0 {
            bail!("{failed} writes to replacement store '{}' failed", temp.display());
        }

        Ok(offsets)
    }

    /// Replaces the store file with the relocated copy and points every handle at it.
    fn swap_in(&mut self, temp: &Path, layout: Layout, offsets: HashMap<Variable, u64>) -> Result<()> {
        self.worker.shutdown();

        if let Err(e) = fs::rename(temp, &self.path) {
            remove_replacement(temp);
            self.worker = WriteWorker::spawn(open_writer(&self.path)?, &display_name(&self.path))?;
            return Err(e).into_app_err_with(|| format!("replacing '{}' with its grown copy", self.path.display()));
        }

        self.reader = open_reader(&self.path)?;
        self.worker = WriteWorker::spawn(open_writer(&self.path)?, &display_name(&self.path))?;
        self.failed_writes_seen = 0;
        self.layout = layout;
        self.offsets = offsets;

        log::debug!(
            target: LOG_TARGET,
            "Grew '{}' to {} bytes",
            self.path.display(),
            layout.total_len()
        );

        Ok(())
    }
}

/// `<store>.grow`
fn grow_path(store_path: &Path) -> PathBuf {
    let mut name = store_path.as_os_str().to_owned();
    name.push(".grow");
    PathBuf::from(name)
}

fn remove_replacement(temp: &Path) {
    if let Err(e) = fs::remove_file(temp) {
        log::warn!(target: LOG_TARGET, "Could not remove replacement store '{}': {e:#}", temp.display());
    }
}
