use fs_err as fs;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::errors::{Result, WebgenError};
use crate::safety::{is_safe_relative, normalize_relative};
use crate::wire::GeneratedFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind { Created, Updated }

#[derive(Debug, Clone)]
pub struct FileResult {
    pub kind: WriteKind,
    pub path: PathBuf,
    pub bytes_before: Option<u64>,
    pub bytes_after: u64,
}

#[derive(Debug, Clone, Default)]
pub struct WriteSummary {
    pub created: usize,
    pub updated: usize,
    pub bytes_written: u64,
    pub details: Vec<FileResult>,
}

/// Drops files whose paths would escape the output directory and collapses
/// duplicate paths (the last occurrence wins, at the first one's position).
/// Returns the surviving files plus one warning per dropped entry.
pub fn sanitize(files: Vec<GeneratedFile>) -> (Vec<GeneratedFile>, Vec<String>) {
    let mut warnings = Vec::new();
    let mut out: Vec<GeneratedFile> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for f in files {
        let path = normalize_relative(&f.path);
        if !is_safe_relative(&path) {
            warnings.push(format!("dropped unsafe path: {}", f.path));
            continue;
        }
        match index.get(&path) {
            Some(&i) => {
                warnings.push(format!("duplicate path {path}: keeping the later version"));
                out[i].content = f.content;
            }
            None => {
                index.insert(path.clone(), out.len());
                out.push(GeneratedFile::new(path, f.content));
            }
        }
    }

    (out, warnings)
}

/// Writes every file under `out_dir` in input order, creating parent
/// directories and overwriting existing files. Paths are all checked before
/// the first write; an I/O error stops the run with earlier files in place.
pub fn write_files(files: &[GeneratedFile], out_dir: &Path) -> Result<WriteSummary> {
    if let Some(bad) = files.iter().find(|f| !is_safe_relative(&f.path)) {
        return Err(WebgenError::UnsafePath(bad.path.clone()));
    }

    fs::create_dir_all(out_dir)?;
    let mut sum = WriteSummary::default();

    for f in files {
        let abs = out_dir.join(normalize_relative(&f.path));
        let before = if abs.exists() { Some(abs.metadata()?.len()) } else { None };
        let after = f.content.len() as u64;

        let parent = abs.parent().unwrap_or(out_dir);
        fs::create_dir_all(parent)?;
        let tmp = NamedTempFile::new_in(parent)?;
        fs::write(tmp.path(), &f.content)?;
        tmp.persist(&abs).map_err(|e| e.error)?;
        tracing::debug!(path = %abs.display(), bytes = after, "wrote file");

        match before {
            Some(_) => sum.updated += 1,
            None => sum.created += 1,
        }
        sum.bytes_written += after;
        sum.details.push(FileResult {
            kind: if before.is_none() { WriteKind::Created } else { WriteKind::Updated },
            path: abs,
            bytes_before: before,
            bytes_after: after,
        });
    }

    Ok(sum)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// Every regular file under `dir` as `/`-separated relative paths, sorted.
/// Dot-files and dot-directories are skipped.
pub fn read_tree(dir: &Path) -> Result<Vec<GeneratedFile>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));

    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        let path = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let bytes = fs::read(entry.path())?;
        files.push(GeneratedFile::new(path, String::from_utf8_lossy(&bytes)));
    }

    Ok(files)
}
