use crate::errors::{FileOperation, IoError};
use miette::Diagnostic;
use serde::Deserialize;
use std::{
    fs,
    path::{Component, Path, PathBuf},
};
use thiserror::Error;

/// Optional settings file looked up in the project root.
pub const SETTINGS_FILE: &str = "hakobu.toml";

#[derive(Error, Debug, Diagnostic)]
pub enum LayoutError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Io(#[from] IoError),

    #[error("Unable to parse toml file at '{}': {source}", path.display())]
    #[diagnostic(
        code(hakobu::layout::parse_toml),
        help("Valid keys are: ['dist', 'onedir', 'executable', 'backend', 'config']")
    )]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(
        "Destination '{}' overlaps the build output at '{}'",
        destination.display(),
        build_dir.display()
    )]
    #[diagnostic(
        code(hakobu::layout::destination_overlaps_source),
        help("Point --dest (or `backend` in hakobu.toml) outside the build output directory")
    )]
    DestinationOverlapsSource {
        destination: PathBuf,
        build_dir: PathBuf,
    },
}

/// Host platform family. Decides the executable file name and whether the
/// executable bit has to be fixed up after copying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Unix,
}
impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Unix
        }
    }

    pub fn executable_name(&self, stem: &str) -> String {
        match self {
            Self::Windows => format!("{}.exe", stem),
            Self::Unix => stem.to_string(),
        }
    }

    pub fn needs_exec_bit(&self) -> bool {
        matches!(self, Self::Unix)
    }
}

/// Relative locations read from `hakobu.toml`. Every key is optional.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub dist: PathBuf,
    pub onedir: String,
    pub executable: String,
    pub backend: PathBuf,
    pub config: String,
}
impl Default for Settings {
    fn default() -> Self {
        Self {
            dist: PathBuf::from("dist"),
            onedir: "main".to_string(),
            executable: "main".to_string(),
            backend: PathBuf::from("frontend").join("backend"),
            config: "config".to_string(),
        }
    }
}
impl Settings {
    /// Reads `hakobu.toml` from `root`, falling back to defaults when the file is absent.
    pub fn load(root: &Path) -> Result<Self, LayoutError> {
        let path = root.join(SETTINGS_FILE);

        if !path.exists() {
            log::debug!("no {} found in {}, using defaults", SETTINGS_FILE, root.display());

            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .map_err(|error| IoError::new(FileOperation::Read, path.clone(), error))?;

        toml::from_str(&content).map_err(|source| LayoutError::ParseToml { path, source })
    }
}

/// Command line overrides, applied on top of [`Settings`].
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub dist: Option<PathBuf>,
    pub dest: Option<PathBuf>,
}

/// Every path a staging run touches, resolved against the project root.
#[derive(Debug, Clone)]
pub struct Layout {
    pub platform: Platform,
    pub executable_name: String,
    pub config_name: String,
    pub dist_dir: PathBuf,
    pub onedir_dir: PathBuf,
    pub source_executable: PathBuf,
    pub source_config_dir: PathBuf,
    pub backend_dir: PathBuf,
    pub dest_executable: PathBuf,
    pub dest_config_dir: PathBuf,
}
impl Layout {
    pub fn resolve(
        root: &Path,
        settings: &Settings,
        overrides: &Overrides,
        platform: Platform,
    ) -> Self {
        // absolute overrides win over the root because `join` replaces the base
        let dist_dir = root.join(overrides.dist.as_ref().unwrap_or(&settings.dist));
        let backend_dir = root.join(overrides.dest.as_ref().unwrap_or(&settings.backend));

        let executable_name = platform.executable_name(&settings.executable);
        let onedir_dir = dist_dir.join(&settings.onedir);

        Self {
            platform,
            source_executable: onedir_dir.join(&executable_name),
            source_config_dir: dist_dir.join(&settings.config),
            dest_executable: backend_dir.join(&executable_name),
            dest_config_dir: backend_dir.join(&settings.config),
            config_name: settings.config.clone(),
            executable_name,
            dist_dir,
            onedir_dir,
            backend_dir,
        }
    }

    /// Rejects a destination that equals, contains or sits inside the build
    /// output, since resetting it would delete the build.
    pub fn ensure_disjoint(&self) -> Result<(), LayoutError> {
        let destination = lexical(&self.backend_dir);

        for build_dir in [&self.dist_dir, &self.onedir_dir, &self.source_config_dir] {
            let normalized = lexical(build_dir);

            if destination.starts_with(&normalized) || normalized.starts_with(&destination) {
                return Err(LayoutError::DestinationOverlapsSource {
                    destination: self.backend_dir.clone(),
                    build_dir: build_dir.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Absolute form of `path` with `.` and `..` folded away, without touching the disk.
fn lexical(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    normalized
}
