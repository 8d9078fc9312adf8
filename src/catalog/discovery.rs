use crate::Result;
use crate::model::file_stem;
use crate::store::file_key;
use ohno::bail;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Log target for discovery
const LOG_TARGET: &str = "   catalog";

/// Extensions of files the store and its tooling write next to their sources
const ARTEFACT_EXTENSIONS: &[&str] = &["bin", "log", "lock", "grow", "dat", "csv", "toml"];

/// Lists the candidate SLHA files directly inside `dir`, in ingestion order.
///
/// Files whose stems are integers come first, in numeric order; the rest follow sorted by name.
/// Hidden files and store artefacts are left out.
///
/// # Errors
///
/// Fails if `dir` itself cannot be read.
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("cannot scan '{}' for SLHA files: not a directory", dir.display());
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .follow_links(true)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                log::debug!(target: LOG_TARGET, "Could not read directory entry: {err:#}");
                None
            }
        })
        .filter(|e| !e.file_type().is_dir())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| is_candidate(path))
        .collect();

    files.sort_by_cached_key(|path| order_key(path));
    log::debug!(target: LOG_TARGET, "Found {} candidate files in '{}'", files.len(), dir.display());
    Ok(files)
}

/// Which source file owns each stored file name during one pass over a directory.
///
/// Files that differ only in extension, or in characters beyond the stored name width, map to
/// the same stored name. The first one discovered owns it; the others must be left alone.
#[derive(Debug, Default)]
pub struct NameClaims {
    owners: HashMap<String, PathBuf>,
}

impl NameClaims {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the stored name of `path`, returning the file that already owns it, if any.
    pub fn claim(&mut self, path: &Path) -> Option<&Path> {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let owner = self.owners.entry(file_key(&name)).or_insert_with(|| path.to_path_buf());
        (owner.as_path() != path).then_some(owner.as_path())
    }
}

fn is_candidate(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };

    if name.starts_with('.') {
        return false;
    }

    !path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ARTEFACT_EXTENSIONS.iter().any(|artefact| ext.eq_ignore_ascii_case(artefact)))
}

fn order_key(path: &Path) -> (bool, u64, String) {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    match file_stem(&name).parse::<u64>() {
        Ok(number) => (false, number, name),
        Err(_) => (true, 0, name),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::fs;

    fn names(files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_numeric_stems_sort_numerically() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        for name in ["10.slha", "2.slha", "1.slha", "beta.slha", "alpha.slha"] {
            fs::write(dir.path().join(name), "").unwrap();
        }

        let files = discover(dir.path()).unwrap();
        assert_eq!(names(&files), ["1.slha", "2.slha", "10.slha", "alpha.slha", "beta.slha"]);
    }

    #[test]
    fn test_artefacts_and_subdirectories_skipped() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        for name in [
            "1.slha",
            "binary.bin",
            "binary.bin.lock",
            "binary.bin.grow",
            "inconsistencies.log",
            "export.dat",
            "export.csv",
            ".hidden",
            "2",
        ] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        fs::create_dir(dir.path().join("3.slha")).unwrap();

        let files = discover(dir.path()).unwrap();
        assert_eq!(names(&files), ["1.slha", "2"]);
    }

    #[test]
    fn test_first_file_owns_a_shared_stored_name() {
        let mut claims = NameClaims::new();
        let out = Path::new("/data/1.out");
        let slha = Path::new("/data/1.slha");

        assert_eq!(claims.claim(out), None);
        assert_eq!(claims.claim(slha), Some(out));
        assert_eq!(claims.claim(out), None);
        assert_eq!(claims.claim(Path::new("/data/2.slha")), None);
    }

    #[test]
    fn test_names_equal_in_stored_width_collide() {
        let mut claims = NameClaims::new();
        let first = Path::new("a_file_name_that_is_much_too_long_1.slha");
        let second = Path::new("a_file_name_that_is_much_too_long_2.slha");

        assert_eq!(claims.claim(first), None);
        assert_eq!(claims.claim(second), Some(first));
    }

    #[test]
    fn test_missing_directory_fails() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let _ = discover(&dir.path().join("absent")).unwrap_err();
    }
}
