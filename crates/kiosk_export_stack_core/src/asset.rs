//! Packaging of the local function source directory into a deployable zip.
//!
//! Entries are written in sorted order with a fixed timestamp, so packaging
//! the same tree twice yields the same archive and the same hash.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

const EXCLUDED_NAMES: [&str; 3] = ["__pycache__", ".git", ".DS_Store"];
const EXCLUDED_EXTENSIONS: [&str; 1] = ["pyc"];

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset source '{0}' is not a directory")]
    NotADirectory(String),
    #[error("asset source '{0}' contains no files")]
    Empty(String),
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write asset archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> AssetError + '_ {
    move |source| AssetError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFile {
    /// Archive path, always `/`-separated.
    pub relative_path: String,
    pub source_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedAsset {
    pub archive_path: PathBuf,
    pub hash: String,
    pub file_count: usize,
}

pub fn collect_files(source: &Path) -> Result<Vec<AssetFile>, AssetError> {
    if !source.is_dir() {
        return Err(AssetError::NotADirectory(source.display().to_string()));
    }
    let mut files = Vec::new();
    walk(source, "", &mut files)?;
    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(files)
}

fn walk(dir: &Path, prefix: &str, files: &mut Vec<AssetFile>) -> Result<(), AssetError> {
    let entries = fs::read_dir(dir).map_err(io_error(dir))?;
    for entry in entries {
        let entry = entry.map_err(io_error(dir))?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_excluded(&path, &name) {
            debug!(path = %path.display(), "skipping excluded asset entry");
            continue;
        }

        let relative_path = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };
        let file_type = entry.file_type().map_err(io_error(&path))?;
        if file_type.is_dir() {
            walk(&path, &relative_path, files)?;
        } else if file_type.is_symlink() && path.is_dir() {
            debug!(path = %path.display(), "skipping symlinked directory");
        } else {
            files.push(AssetFile {
                relative_path,
                source_path: path,
            });
        }
    }
    Ok(())
}

fn is_excluded(path: &Path, name: &str) -> bool {
    EXCLUDED_NAMES.contains(&name)
        || path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(|extension| EXCLUDED_EXTENSIONS.contains(&extension))
            .unwrap_or(false)
}

/// Hex SHA-256 over every file's relative path and contents.
pub fn asset_hash(files: &[AssetFile]) -> Result<String, AssetError> {
    let mut hasher = Sha256::new();
    for file in files {
        let contents = fs::read(&file.source_path).map_err(io_error(&file.source_path))?;
        hasher.update(file.relative_path.as_bytes());
        hasher.update([0u8]);
        hasher.update(&contents);
        hasher.update([0u8]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

pub fn package_asset(source: &Path, archive_path: &Path) -> Result<PackagedAsset, AssetError> {
    let files = collect_files(source)?;
    if files.is_empty() {
        return Err(AssetError::Empty(source.display().to_string()));
    }

    if let Some(parent) = archive_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
        }
    }

    let archive = fs::File::create(archive_path).map_err(io_error(archive_path))?;
    let mut zip = ZipWriter::new(archive);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);

    for file in &files {
        let contents = fs::read(&file.source_path).map_err(io_error(&file.source_path))?;
        zip.start_file(file.relative_path.as_str(), options)?;
        zip.write_all(&contents).map_err(io_error(archive_path))?;
    }
    zip.finish()?;

    let hash = asset_hash(&files)?;
    info!(
        archive = %archive_path.display(),
        files = files.len(),
        hash = %hash,
        "packaged function asset"
    );
    Ok(PackagedAsset {
        archive_path: archive_path.to_path_buf(),
        hash,
        file_count: files.len(),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
        fs::write(path, contents).expect("write file");
    }

    fn source_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "handler.py", "def run(event, context):\n    return event\n");
        write(dir.path(), "get_config.py", "CONFIG = {}\n");
        write(dir.path(), "lib/xml_manipulation.py", "pass\n");
        write(dir.path(), "__pycache__/handler.cpython-37.pyc", "bytecode");
        write(dir.path(), "lib/stale.pyc", "bytecode");
        dir
    }

    #[test]
    fn collects_sorted_files_and_skips_build_artifacts() {
        let dir = source_tree();
        let files = collect_files(dir.path()).expect("collect should pass");
        let paths: Vec<_> = files.iter().map(|file| file.relative_path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["get_config.py", "handler.py", "lib/xml_manipulation.py"]
        );
    }

    #[test]
    fn packages_archive_with_stable_hash() {
        let dir = source_tree();
        let out = tempfile::tempdir().expect("tempdir");

        let first = package_asset(dir.path(), &out.path().join("a/asset.zip"))
            .expect("package should pass");
        let second =
            package_asset(dir.path(), &out.path().join("asset.zip")).expect("package should pass");

        assert_eq!(first.file_count, 3);
        assert_eq!(first.hash, second.hash);
        assert_eq!(
            fs::read(&first.archive_path).expect("read archive"),
            fs::read(&second.archive_path).expect("read archive")
        );

        let mut archive = zip::ZipArchive::new(
            fs::File::open(&first.archive_path).expect("open archive"),
        )
        .expect("archive should parse");
        let mut handler = String::new();
        archive
            .by_name("handler.py")
            .expect("handler entry")
            .read_to_string(&mut handler)
            .expect("read entry");
        assert!(handler.starts_with("def run"));
    }

    #[test]
    fn hash_changes_with_content() {
        let dir = source_tree();
        let before = asset_hash(&collect_files(dir.path()).expect("collect")).expect("hash");
        write(dir.path(), "handler.py", "changed\n");
        let after = asset_hash(&collect_files(dir.path()).expect("collect")).expect("hash");
        assert_ne!(before, after);
    }

    #[test]
    fn rejects_missing_and_empty_sources() {
        let out = tempfile::tempdir().expect("tempdir");
        let error = package_asset(&out.path().join("missing"), &out.path().join("a.zip"))
            .expect_err("missing source should fail");
        assert!(matches!(error, AssetError::NotADirectory(_)));

        let empty = tempfile::tempdir().expect("tempdir");
        let error = package_asset(empty.path(), &out.path().join("a.zip"))
            .expect_err("empty source should fail");
        assert!(matches!(error, AssetError::Empty(_)));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_not_followed() {
        let dir = source_tree();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("lib/loop"))
            .expect("create symlink");
        std::os::unix::fs::symlink(
            dir.path().join("handler.py"),
            dir.path().join("lib/handler_link.py"),
        )
        .expect("create symlink");

        let files = collect_files(dir.path()).expect("collect should pass");
        let paths: Vec<_> = files.iter().map(|file| file.relative_path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "get_config.py",
                "handler.py",
                "lib/handler_link.py",
                "lib/xml_manipulation.py"
            ]
        );
    }
}
