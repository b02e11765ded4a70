use crate::{
    errors::{walk_error, FileOperation, IoError},
    layout::Layout,
};
use std::{collections::BTreeSet, fs, path::PathBuf};
use walkdir::WalkDir;

/// One file or directory a staging run will create, relative to the destination.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedEntry {
    pub destination: PathBuf,
    pub is_file: bool,
}

/// Everything a staging run would write, in walk order (parents before children).
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub entries: Vec<PlannedEntry>,
    seen: BTreeSet<PathBuf>,
}
impl Plan {
    /// Appends `destination` unless it is already planned.
    pub fn push(&mut self, destination: PathBuf, is_file: bool) {
        if !self.seen.insert(destination.clone()) {
            return;
        }

        self.entries.push(PlannedEntry {
            destination,
            is_file,
        });
    }

    pub fn files(&self) -> usize {
        self.entries.iter().filter(|e| e.is_file).count()
    }

    pub fn directories(&self) -> usize {
        self.entries.len() - self.files()
    }
}

/// Walks the onedir build and the config directory without touching the destination.
pub fn build_plan(layout: &Layout) -> Result<Plan, IoError> {
    let mut plan = Plan::default();

    let walker = WalkDir::new(&layout.onedir_dir)
        .min_depth(1)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(|error| walk_error(error, &layout.onedir_dir))?;

        // min_depth(1) guarantees every entry sits under the onedir root
        let Ok(relative) = entry.path().strip_prefix(&layout.onedir_dir) else {
            continue;
        };

        // links are planned as leaves since they are copied as links
        plan.push(relative.to_path_buf(), !entry.file_type().is_dir());
    }

    if !layout.source_config_dir.exists() {
        return Ok(plan);
    }

    let config_root = PathBuf::from(&layout.config_name);
    plan.push(config_root.clone(), false);

    let read_dir = fs::read_dir(&layout.source_config_dir).map_err(|error| {
        IoError::new(FileOperation::Read, layout.source_config_dir.clone(), error)
    })?;

    let mut names = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|error| {
            IoError::new(FileOperation::Read, layout.source_config_dir.clone(), error)
        })?;

        if entry.path().is_file() {
            names.push(entry.file_name());
        }
    }
    names.sort();

    for name in names {
        plan.push(config_root.join(name), true);
    }

    Ok(plan)
}
