//! Creating a fresh store file or reading back the indices of an existing one.

use super::layout::{
    Capacities, FILE_ENTRY_LEN, FileEntry, HEADER_LEN, Header, Layout, VARIABLE_ENTRY_LEN, VariableEntry,
};
use super::FileInfo;
use crate::Result;
use crate::config::StoreConfig;
use crate::model::Variable;
use chrono::{DateTime, Utc};
use ohno::{EnrichableExt, IntoAppError, bail};
use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Log target for store bootstrap
const LOG_TARGET: &str = "     store";

/// Everything the store keeps in memory, as recovered from disk.
#[derive(Debug)]
pub(super) struct Contents {
    pub header: Header,

    /// Variables in column order, each with its stored starting offset
    pub variables: Vec<(Variable, u64)>,

    /// File names in slot order
    pub files: Vec<(String, FileInfo)>,
}

/// Creates a zero-filled store file sized for the configured initial capacities.
pub(super) fn create(path: &Path, config: &StoreConfig) -> Result<Contents> {
    let header = Header {
        capacities: Capacities {
            variables: config.initial_variable_capacity,
            files: config.initial_file_capacity,
        },
        variables_used: 0,
        files_used: 0,
    };
    let layout = Layout::new(header.capacities);

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .into_app_err_with(|| format!("creating store file '{}'", path.display()))?;

    file.set_len(layout.total_len())
        .into_app_err_with(|| format!("sizing store file '{}' to {} bytes", path.display(), layout.total_len()))?;
    file.write_all(&header.encode())
        .into_app_err_with(|| format!("writing header of store file '{}'", path.display()))?;
    file.sync_all()
        .into_app_err_with(|| format!("syncing store file '{}'", path.display()))?;

    log::info!(
        target: LOG_TARGET,
        "Created store '{}' with room for {} variables and {} files",
        path.display(),
        header.capacities.variables,
        header.capacities.files
    );

    Ok(Contents {
        header,
        variables: Vec::new(),
        files: Vec::new(),
    })
}

/// Reads the header and both tables of an existing store, validating them against each other.
pub(super) fn load(path: &Path) -> Result<Contents> {
    let mut file = File::open(path).into_app_err_with(|| format!("opening store file '{}'", path.display()))?;
    let len = file
        .metadata()
        .into_app_err_with(|| format!("reading metadata of store file '{}'", path.display()))?
        .len();

    let mut header_bytes = [0u8; HEADER_LEN as usize];
    file.read_exact(&mut header_bytes)
        .into_app_err_with(|| format!("reading header of store file '{}'", path.display()))?;
    let header = Header::decode(&header_bytes).map_err(|e| e.enrich_with(|| format!("invalid store file '{}'", path.display())))?;

    let layout = Layout::new(header.capacities);
    if len < layout.total_len() {
        bail!(
            "store file '{}' is {len} bytes but its header describes {} bytes",
            path.display(),
            layout.total_len()
        );
    }

    let variables = load_variables(&mut file, &header, &layout)
        .map_err(|e| e.enrich_with(|| format!("invalid variable table in store file '{}'", path.display())))?;
    let files = load_files(&mut file, &header, &layout)
        .map_err(|e| e.enrich_with(|| format!("invalid file table in store file '{}'", path.display())))?;

    log::info!(
        target: LOG_TARGET,
        "Opened store '{}': {}/{} variables, {}/{} files",
        path.display(),
        header.variables_used,
        header.capacities.variables,
        header.files_used,
        header.capacities.files
    );

    Ok(Contents { header, variables, files })
}

fn load_variables(file: &mut File, header: &Header, layout: &Layout) -> Result<Vec<(Variable, u64)>> {
    // The variable table starts right after the header, where the read cursor already is
    let mut table = vec![0u8; header.variables_used as usize * VARIABLE_ENTRY_LEN as usize];
    file.read_exact(&mut table).into_app_err("reading the variable table")?;

    let mut seen = HashSet::with_capacity(table.len());
    let mut variables = Vec::with_capacity(header.variables_used as usize);

    for (index, chunk) in table.chunks_exact(VARIABLE_ENTRY_LEN as usize).enumerate() {
        let entry = VariableEntry::decode(chunk)?;
        let column = u32::try_from(index).into_app_err("variable table index overflow")?;

        if entry.offset != layout.variable_offset(column) {
            bail!(
                "variable entry {index} ({} {:?}) has offset {} but column {column} lives at {}",
                entry.block,
                entry.pdg,
                entry.offset,
                layout.variable_offset(column)
            );
        }

        let variable = Variable::new(entry.pdg, &entry.block, "", &entry.description);
        if !seen.insert(variable.clone()) {
            bail!("variable {variable} is stored twice");
        }

        variables.push((variable, entry.offset));
    }

    Ok(variables)
}

fn load_files(file: &mut File, header: &Header, layout: &Layout) -> Result<Vec<(String, FileInfo)>> {
    let _ = file
        .seek(SeekFrom::Start(layout.file_table_start()))
        .into_app_err("seeking to the file table")?;

    let mut table = vec![0u8; header.files_used as usize * FILE_ENTRY_LEN as usize];
    file.read_exact(&mut table).into_app_err("reading the file table")?;

    let mut names = HashMap::with_capacity(header.files_used as usize);
    let mut files = Vec::with_capacity(header.files_used as usize);

    for (index, chunk) in table.chunks_exact(FILE_ENTRY_LEN as usize).enumerate() {
        let entry = FileEntry::decode(chunk)?;

        if entry.slot as usize != index {
            bail!("file entry {index} ('{}') claims slot {}", entry.name, entry.slot);
        }

        if let Some(previous) = names.insert(entry.name.clone(), entry.slot) {
            bail!("file '{}' is stored in both slot {previous} and slot {}", entry.name, entry.slot);
        }

        let Some(last_modified) = DateTime::<Utc>::from_timestamp_millis(entry.last_modified) else {
            bail!("file '{}' has an out-of-range modification time {}", entry.name, entry.last_modified);
        };

        files.push((
            entry.name,
            FileInfo {
                last_modified,
                slot: entry.slot,
            },
        ));
    }

    Ok(files)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::fs;

    fn small_config() -> StoreConfig {
        StoreConfig {
            initial_variable_capacity: 4,
            initial_file_capacity: 3,
            ..StoreConfig::default()
        }
    }

    #[test]
    fn test_create_sizes_file_and_writes_header() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("binary.bin");

        let contents = create(&path, &small_config()).unwrap();
        assert!(contents.variables.is_empty());
        assert!(contents.files.is_empty());

        let bytes = fs::read(&path).unwrap();
        let layout = Layout::new(Capacities { variables: 4, files: 3 });
        assert_eq!(bytes.len() as u64, layout.total_len());
        assert_eq!(&bytes[..16], &[0, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0, 3, 0, 0, 0, 0]);
        assert!(bytes[16..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_create_refuses_to_overwrite() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("binary.bin");
        fs::write(&path, b"existing").unwrap();
        let _ = create(&path, &small_config()).unwrap_err();
    }

    #[test]
    fn test_load_round_trips_created_store() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("binary.bin");
        let created = create(&path, &small_config()).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.header, created.header);
    }

    #[test]
    fn test_load_rejects_truncated_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("binary.bin");
        let _ = create(&path, &small_config()).unwrap();

        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..100]).unwrap();
        let _ = load(&path).unwrap_err();
    }

    #[test]
    fn test_load_rejects_misplaced_offset() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("binary.bin");
        let contents = create(&path, &small_config()).unwrap();
        let layout = Layout::new(contents.header.capacities);

        let mut bytes = fs::read(&path).unwrap();
        let header = Header {
            variables_used: 1,
            ..contents.header
        };
        bytes[..16].copy_from_slice(&header.encode());

        let entry = VariableEntry {
            pdg: [25, 0, 0],
            block: "MASS".to_string(),
            description: String::new(),
            offset: layout.variable_offset(2),
        };
        bytes[16..126].copy_from_slice(&entry.encode());
        fs::write(&path, &bytes).unwrap();

        let _ = load(&path).unwrap_err();
    }
}
