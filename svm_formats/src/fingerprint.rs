use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use memmap2::MmapOptions;
use serde::Serialize;
use walkdir::WalkDir;

/// Number of leading bytes hashed when identifying a game file.
pub const FINGERPRINT_PREFIX_LEN: usize = 5000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFingerprint {
    pub name: String,
    pub size: u64,
    pub hash: String,
}

#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub size: u64,
}

/// Files found under a game directory, keyed by lower-cased file name.
#[derive(Debug)]
pub struct DirectoryScan {
    root: PathBuf,
    files: BTreeMap<String, ScannedFile>,
    hashes: RefCell<HashMap<String, String>>,
}

impl DirectoryScan {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn file(&self, name: &str) -> Option<&ScannedFile> {
        self.files.get(&name.to_ascii_lowercase())
    }

    /// Size and prefix hash of `name`; hashes are computed once per scan.
    pub fn fingerprint(&self, name: &str) -> Result<Option<FileFingerprint>> {
        let key = name.to_ascii_lowercase();
        let Some(file) = self.files.get(&key) else {
            return Ok(None);
        };

        if let Some(hash) = self.hashes.borrow().get(&key) {
            return Ok(Some(FileFingerprint {
                name: key.clone(),
                size: file.size,
                hash: hash.clone(),
            }));
        }

        let hash = hash_prefix(&file.path)?;
        self.hashes.borrow_mut().insert(key.clone(), hash.clone());
        Ok(Some(FileFingerprint {
            name: key,
            size: file.size,
            hash,
        }))
    }
}

/// Lists regular files under `root`, descending at most `depth` levels.
/// When two files share a name, the shallower one wins.
pub fn scan_directory<P: AsRef<Path>>(root: P, depth: usize) -> Result<DirectoryScan> {
    let root = root.as_ref().to_path_buf();
    let mut files = BTreeMap::new();
    for entry in WalkDir::new(&root)
        .min_depth(1)
        .max_depth(depth.max(1))
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("scanning {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let metadata = entry
            .metadata()
            .with_context(|| format!("reading metadata of {}", entry.path().display()))?;
        let name = entry.file_name().to_string_lossy().to_ascii_lowercase();
        let candidate = ScannedFile {
            path: entry.path().to_path_buf(),
            size: metadata.len(),
        };
        files
            .entry(name)
            .and_modify(|existing: &mut ScannedFile| {
                if candidate.path.components().count() < existing.path.components().count() {
                    *existing = candidate.clone();
                }
            })
            .or_insert_with(|| candidate.clone());
    }
    Ok(DirectoryScan {
        root,
        files,
        hashes: RefCell::new(HashMap::new()),
    })
}

fn hash_prefix(path: &Path) -> Result<String> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let len = file
        .metadata()
        .with_context(|| format!("reading metadata of {}", path.display()))?
        .len() as usize;
    if len == 0 {
        return Ok(blake3::hash(&[]).to_hex().to_string());
    }
    let mmap = unsafe { MmapOptions::new().len(len.min(FINGERPRINT_PREFIX_LEN)).map(&file) }
        .with_context(|| format!("memory-mapping {}", path.display()))?;
    Ok(blake3::hash(&mmap).to_hex().to_string())
}

/// Hash of an in-memory buffer, as [`DirectoryScan::fingerprint`] would compute it.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let end = bytes.len().min(FINGERPRINT_PREFIX_LEN);
    blake3::hash(&bytes[..end]).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn scans_case_insensitively_and_hashes_prefix() {
        let dir = tempdir().unwrap();
        let big = vec![7u8; FINGERPRINT_PREFIX_LEN + 100];
        fs::write(dir.path().join("CASTLE.FSC"), &big).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("extra.dat"), b"abc").unwrap();

        let shallow = scan_directory(dir.path(), 1).unwrap();
        assert_eq!(shallow.len(), 1);
        let fp = shallow.fingerprint("castle.fsc").unwrap().unwrap();
        assert_eq!(fp.size, big.len() as u64);
        assert_eq!(fp.hash, hash_bytes(&big));

        let deep = scan_directory(dir.path(), 2).unwrap();
        assert!(deep.file("EXTRA.DAT").is_some());
        assert!(deep.fingerprint("missing").unwrap().is_none());
    }

    #[test]
    fn empty_files_hash_to_empty_digest() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("empty"), b"").unwrap();
        let scan = scan_directory(dir.path(), 1).unwrap();
        let fp = scan.fingerprint("empty").unwrap().unwrap();
        assert_eq!(fp.hash, hash_bytes(&[]));
    }
}
