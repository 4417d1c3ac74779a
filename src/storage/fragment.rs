//! Persistence of requirement records as fragments.
//!
//! A fragment is either a single `<id>.<ext>` file holding the body, or a
//! `<id>/` directory holding one `<field>.<ext>` file per field. When both
//! exist the directory wins.

use std::{
    collections::BTreeSet,
    ffi::OsStr,
    fs, io,
    path::{Path, PathBuf},
};

use walkdir::WalkDir;

use crate::domain::{
    requirement::to_text,
    Config, Identifier, Requirement, StorageMode,
};

/// Outcome of saving a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Saved {
    /// At least one file was created or rewritten.
    Written,
    /// Stored content was already identical; nothing was touched.
    Unchanged,
}

/// Errors raised while reading or writing fragments.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Neither a fragment file nor a fragment directory exists.
    #[error("no fragment found for requirement '{0}'")]
    NotFound(String),

    /// A fragment could not be read.
    #[error("failed to read {}", path.display())]
    Read {
        /// The path being read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// A fragment could not be written.
    #[error("failed to write {}", path.display())]
    Write {
        /// The path being written.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
}

/// A directory of requirement fragments.
#[derive(Debug, Clone)]
pub struct FragmentStore {
    root: PathBuf,
    extension: String,
    mode: StorageMode,
}

impl FragmentStore {
    /// Opens the fragment directory at `root` with the given layout.
    #[must_use]
    pub fn new(root: PathBuf, extension: &str, mode: StorageMode) -> Self {
        Self {
            root,
            extension: extension.to_string(),
            mode,
        }
    }

    /// Opens the fragment directory at `root` with the layout from `config`.
    #[must_use]
    pub fn from_config(root: PathBuf, config: &Config) -> Self {
        Self::new(root, &config.extension, config.storage)
    }

    /// The root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the single-file fragment for `id`.
    #[must_use]
    pub fn file_path(&self, id: &Identifier) -> PathBuf {
        self.root.join(format!("{id}.{}", self.extension))
    }

    /// Path of the directory fragment for `id`.
    #[must_use]
    pub fn dir_path(&self, id: &Identifier) -> PathBuf {
        self.root.join(id.as_str())
    }

    fn field_path(&self, dir: &Path, field: &str) -> PathBuf {
        dir.join(format!("{field}.{}", self.extension))
    }

    /// Whether a fragment of either layout exists for `id`.
    #[must_use]
    pub fn exists(&self, id: &Identifier) -> bool {
        self.dir_path(id).is_dir() || self.file_path(id).is_file()
    }

    /// Reads the requirement stored for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] when no fragment exists and
    /// [`StorageError::Read`] when one exists but cannot be read.
    pub fn load(&self, id: &Identifier) -> Result<Requirement, StorageError> {
        let dir = self.dir_path(id);
        if dir.is_dir() {
            return self.load_dir(&dir);
        }

        let path = self.file_path(id);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Requirement::with_body(split_lines(&text))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(id.to_string()))
            }
            Err(source) => Err(StorageError::Read { path, source }),
        }
    }

    fn load_dir(&self, dir: &Path) -> Result<Requirement, StorageError> {
        let mut requirement = Requirement::new();

        for path in self.field_files(dir)? {
            let Some(field) = path.file_stem().and_then(OsStr::to_str) else {
                tracing::warn!("skipping fragment file with a non UTF-8 name: {}", path.display());
                continue;
            };
            let text = fs::read_to_string(&path).map_err(|source| StorageError::Read {
                path: path.clone(),
                source,
            })?;
            requirement.set_field(field, split_lines(&text));
        }

        Ok(requirement)
    }

    /// Field files of a directory fragment, in name order.
    fn field_files(&self, dir: &Path) -> Result<Vec<PathBuf>, StorageError> {
        let mut paths = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| StorageError::Read {
                path: dir.to_path_buf(),
                source: e.into(),
            })?;
            let path = entry.path();
            if entry.file_type().is_file()
                && path.extension().and_then(OsStr::to_str) == Some(self.extension.as_str())
            {
                paths.push(path.to_path_buf());
            }
        }
        Ok(paths)
    }

    /// Persists `requirement` under `id`.
    ///
    /// The requirement is stored as a directory when the store is in
    /// directory mode, when it has fields besides its body, or when a
    /// directory fragment already exists for `id`; otherwise as a single
    /// file. Files whose content is already identical are left untouched, and
    /// a single file left over from an earlier layout is removed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Write`] when a file or directory cannot be
    /// created, written or removed.
    pub fn save(&self, id: &Identifier, requirement: &Requirement) -> Result<Saved, StorageError> {
        let dir = self.dir_path(id);
        let as_dir = self.mode == StorageMode::Directory || requirement.has_fields() || dir.is_dir();

        if as_dir {
            if self.mode == StorageMode::File && !dir.is_dir() {
                tracing::info!("storing '{id}' as a directory to keep its fields");
            }
            let saved = self.save_dir(&dir, requirement)?;
            let file = self.file_path(id);
            if file.is_file() {
                tracing::debug!("removing superseded fragment {}", file.display());
                fs::remove_file(&file).map_err(|source| StorageError::Write {
                    path: file.clone(),
                    source,
                })?;
                return Ok(Saved::Written);
            }
            Ok(saved)
        } else {
            create_dir(&self.root)?;
            write_if_changed(&self.file_path(id), &requirement.body_text())
        }
    }

    fn save_dir(&self, dir: &Path, requirement: &Requirement) -> Result<Saved, StorageError> {
        create_dir(dir)?;
        let mut saved = Saved::Unchanged;

        let mut kept = BTreeSet::new();
        for (field, lines) in requirement.all_fields() {
            let path = self.field_path(dir, field);
            if write_if_changed(&path, &to_text(lines))? == Saved::Written {
                saved = Saved::Written;
            }
            kept.insert(path);
        }

        for path in self.field_files(dir)? {
            if !kept.contains(&path) {
                tracing::debug!("removing stale field file {}", path.display());
                fs::remove_file(&path).map_err(|source| StorageError::Write {
                    path: path.clone(),
                    source,
                })?;
                saved = Saved::Written;
            }
        }

        Ok(saved)
    }
}

fn create_dir(dir: &Path) -> Result<(), StorageError> {
    fs::create_dir_all(dir).map_err(|source| StorageError::Write {
        path: dir.to_path_buf(),
        source,
    })
}

fn write_if_changed(path: &Path, content: &str) -> Result<Saved, StorageError> {
    if fs::read_to_string(path).is_ok_and(|existing| existing == content) {
        return Ok(Saved::Unchanged);
    }
    tracing::debug!("writing {}", path.display());
    fs::write(path, content).map_err(|source| StorageError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Saved::Written)
}

fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}
