use crate::{
    errors::{walk_error, FileOperation, IoError},
    layout::{Layout, Platform},
};
use colored::Colorize;
use miette::Diagnostic;
use std::{
    fs, io,
    path::{Path, PathBuf},
    process::{Command, ExitStatus},
};
use thiserror::Error;
use walkdir::WalkDir;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Error, Diagnostic)]
pub enum StageError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Io(#[from] IoError),

    #[error("Pre-built onedir executable not found at: {}", path.display())]
    #[diagnostic(
        code(hakobu::stage::source_missing),
        help("Please build the backend first by running `./build.sh` in the project root directory")
    )]
    SourceMissing { path: PathBuf },

    #[error("Backend executable missing after copy: {}", path.display())]
    #[diagnostic(
        code(hakobu::stage::copy_incomplete),
        help("The copy was interrupted or incomplete, run it again")
    )]
    CopyIncomplete { path: PathBuf },

    #[error("unable to run `chmod +x` on '{}'", path.display())]
    #[diagnostic(
        code(hakobu::stage::chmod),
        help("Make sure `chmod` is available on PATH")
    )]
    Chmod {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("`chmod +x` on '{}' failed with {status}", path.display())]
    #[diagnostic(code(hakobu::stage::chmod_status))]
    ChmodStatus { path: PathBuf, status: ExitStatus },

    #[error("unable to strip prefix from directory")]
    #[diagnostic(code(hakobu::stage::strip_prefix))]
    StripPrefix {
        path: PathBuf,
        dir: PathBuf,
        source: std::path::StripPrefixError,
    },
}

/// Reported instead of failing when the build ships no config directory.
#[derive(Debug, Error, Diagnostic)]
#[error("No config files found at: {}", path.display())]
#[diagnostic(
    code(hakobu::stage::config_missing),
    severity(Warning),
    help("Not every backend build ships config files")
)]
pub struct ConfigMissing {
    pub path: PathBuf,
}

/// What a successful staging run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct StageReport {
    pub entries_copied: usize,
    pub executable_size: u64,
    /// `None` when the build had no config directory.
    pub config_files_copied: Option<usize>,
}

/// Runs every staging step against `layout`, in order.
///
/// The destination is reset before the source executable is checked, so a
/// missing build leaves behind an empty destination directory.
///
/// # Errors
///
/// Returns a [`StageError`] if:
///
/// - The source executable does not exist.
/// - The executable is still missing from the destination after copying.
/// - `chmod` cannot be run or fails.
/// - Any directory or file cannot be removed, created, read or copied.
pub fn run(layout: &Layout) -> Result<StageReport, StageError> {
    reset_destination(&layout.backend_dir)?;

    ensure_source_executable(layout)?;

    println!(
        "📁 Detected onedir backend build at: {}",
        layout.onedir_dir.display()
    );
    let entries_copied = copy_onedir(&layout.onedir_dir, &layout.backend_dir)?;

    verify_copied(layout)?;

    mark_executable(&layout.dest_executable, layout.platform)?;

    let executable_size = file_size(&layout.dest_executable)?;
    println!(
        "✅ {} ({} MB)",
        "Copied executable".green(),
        format_mebibytes(executable_size)
    );

    let config_files_copied = copy_config_files(&layout.source_config_dir, &layout.dest_config_dir)?;

    Ok(StageReport {
        entries_copied,
        executable_size,
        config_files_copied,
    })
}

/// Removes `dir` with everything in it, then creates it again empty.
pub fn reset_destination(dir: &Path) -> Result<(), StageError> {
    if let Ok(metadata) = fs::symlink_metadata(dir) {
        println!("🧹 Cleaning up existing backend directory...");

        let removed = if metadata.is_dir() {
            fs::remove_dir_all(dir)
        } else {
            fs::remove_file(dir)
        };
        removed.map_err(|error| IoError::new(FileOperation::Remove, dir.into(), error))?;
    }

    fs::create_dir_all(dir)
        .map_err(|error| IoError::new(FileOperation::Mkdir, dir.into(), error))?;

    Ok(())
}

pub fn ensure_source_executable(layout: &Layout) -> Result<(), StageError> {
    if layout.source_executable.exists() {
        Ok(())
    } else {
        Err(StageError::SourceMissing {
            path: layout.source_executable.clone(),
        })
    }
}

pub fn verify_copied(layout: &Layout) -> Result<(), StageError> {
    if layout.dest_executable.exists() {
        Ok(())
    } else {
        Err(StageError::CopyIncomplete {
            path: layout.dest_executable.clone(),
        })
    }
}

/// Copies every immediate entry of `source` into `destination`, recursing
/// into directories and overwriting files. Returns the number of immediate
/// entries copied.
pub fn copy_onedir(source: &Path, destination: &Path) -> Result<usize, StageError> {
    let entries = sorted_entries(source)?;

    for entry in &entries {
        let target = destination.join(entry.file_name().unwrap_or_default());

        copy_recursive(entry, &target)?;
    }

    Ok(entries.len())
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, StageError> {
    let read_dir =
        fs::read_dir(dir).map_err(|error| IoError::new(FileOperation::Read, dir.into(), error))?;

    let mut entries = read_dir
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| IoError::new(FileOperation::Read, dir.into(), error))?;
    entries.sort();

    Ok(entries)
}

fn copy_recursive(source: &Path, target: &Path) -> Result<(), StageError> {
    // links are recreated as links, never followed
    for entry in WalkDir::new(source).follow_root_links(false) {
        let entry = entry.map_err(|error| walk_error(error, source))?;

        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|error| StageError::StripPrefix {
                path: entry.path().to_path_buf(),
                dir: source.to_path_buf(),
                source: error,
            })?;
        let destination = if relative.as_os_str().is_empty() {
            target.to_path_buf()
        } else {
            target.join(relative)
        };

        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination)
                .map_err(|error| IoError::new(FileOperation::Mkdir, destination.clone(), error))?;
            continue;
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .map_err(|error| IoError::new(FileOperation::Mkdir, parent.into(), error))?;
        }

        if entry.path_is_symlink() {
            copy_symlink(entry.path(), &destination)?;
        } else {
            copy_file(entry.path(), &destination)?;
        }
    }

    Ok(())
}

/// Copies contents and permission bits. Failures on the source side are
/// reported as reads, failures on the destination side as writes.
fn copy_file(source: &Path, destination: &Path) -> Result<(), StageError> {
    let mut reader = fs::File::open(source)
        .map_err(|error| IoError::new(FileOperation::Read, source.into(), error))?;
    let permissions = reader
        .metadata()
        .map_err(|error| IoError::new(FileOperation::Metadata, source.into(), error))?
        .permissions();

    let mut writer = fs::File::create(destination)
        .map_err(|error| IoError::new(FileOperation::Write, destination.into(), error))?;
    io::copy(&mut reader, &mut writer)
        .map_err(|error| IoError::new(FileOperation::Copy, destination.into(), error))?;
    fs::set_permissions(destination, permissions)
        .map_err(|error| IoError::new(FileOperation::Write, destination.into(), error))?;

    log::debug!("copied {} -> {}", source.display(), destination.display());

    Ok(())
}

/// Recreates the link at `source` as a link at `destination`, pointing at the
/// same (possibly dangling) target.
fn copy_symlink(source: &Path, destination: &Path) -> Result<(), StageError> {
    let target = fs::read_link(source)
        .map_err(|error| IoError::new(FileOperation::Read, source.into(), error))?;

    if fs::symlink_metadata(destination).is_ok() {
        fs::remove_file(destination)
            .map_err(|error| IoError::new(FileOperation::Remove, destination.into(), error))?;
    }

    create_symlink(source, &target, destination)
        .map_err(|error| IoError::new(FileOperation::Write, destination.into(), error))?;

    log::debug!("linked {} -> {}", destination.display(), target.display());

    Ok(())
}

#[cfg(unix)]
fn create_symlink(_source: &Path, target: &Path, destination: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, destination)
}

#[cfg(windows)]
fn create_symlink(source: &Path, target: &Path, destination: &Path) -> io::Result<()> {
    // windows needs to know the kind up front; dangling links become file links
    if source.is_dir() {
        std::os::windows::fs::symlink_dir(target, destination)
    } else {
        std::os::windows::fs::symlink_file(target, destination)
    }
}

/// Marks `path` as executable through `chmod +x`. A no-op on Windows.
pub fn mark_executable(path: &Path, platform: Platform) -> Result<(), StageError> {
    if !platform.needs_exec_bit() {
        return Ok(());
    }

    let status = Command::new("chmod")
        .arg("+x")
        .arg(path)
        .status()
        .map_err(|source| StageError::Chmod {
            path: path.to_path_buf(),
            source,
        })?;

    if !status.success() {
        return Err(StageError::ChmodStatus {
            path: path.to_path_buf(),
            status,
        });
    }

    log::debug!("marked {} as executable", path.display());

    Ok(())
}

pub fn file_size(path: &Path) -> Result<u64, StageError> {
    let metadata = fs::metadata(path)
        .map_err(|error| IoError::new(FileOperation::Metadata, path.into(), error))?;

    Ok(metadata.len())
}

/// Formats a byte count as mebibytes with two decimals.
pub fn format_mebibytes(bytes: u64) -> String {
    format!("{:.2}", bytes as f64 / BYTES_PER_MIB)
}

/// Flat copy of the regular files in `source` into `destination`.
///
/// Returns `Ok(None)` after logging a [`ConfigMissing`] warning when `source`
/// does not exist. Subdirectories are skipped.
pub fn copy_config_files(source: &Path, destination: &Path) -> Result<Option<usize>, StageError> {
    if !source.exists() {
        let warning = ConfigMissing {
            path: source.to_path_buf(),
        };
        log::warn!("⚠️  {}", warning);

        return Ok(None);
    }

    fs::create_dir_all(destination)
        .map_err(|error| IoError::new(FileOperation::Mkdir, destination.into(), error))?;

    let mut copied = 0;
    for entry in sorted_entries(source)? {
        if !entry.is_file() {
            log::warn!("skipping non-file config entry: {}", entry.display());
            continue;
        }

        let target = destination.join(entry.file_name().unwrap_or_default());
        copy_file(&entry, &target)?;
        copied += 1;
    }

    println!("✅ {}", format!("Copied {} config files", copied).green());

    Ok(Some(copied))
}
