// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Task-scoped workspaces.
//!
//! Layout: `<workspace_root>/<task_id>/v<N>/<files>`. A version directory is
//! assembled in a hidden staging directory and renamed into place, so a
//! version is either fully visible or absent.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use kiln_core::KilnError;
use tracing::debug;

/// A file extracted from generator output, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub name: String,
    pub language: String,
    pub code: String,
}

/// Directory owned by exactly one task.
#[derive(Debug, Clone)]
pub struct TaskWorkspace {
    task_id: String,
    dir: PathBuf,
}

impl TaskWorkspace {
    /// Creates (or reopens) the workspace of `task_id` under `root`.
    pub fn create(root: &Path, task_id: &str) -> Result<Self, KilnError> {
        if !is_safe_component(task_id) {
            return Err(KilnError::Workspace {
                message: format!("invalid task id {task_id:?}"),
                source: None,
            });
        }
        let dir = root.join(task_id);
        std::fs::create_dir_all(&dir)
            .map_err(|e| KilnError::workspace(format!("cannot create {}", dir.display()), e))?;
        Ok(Self {
            task_id: task_id.to_string(),
            dir,
        })
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn version_dir(&self, version: u32) -> PathBuf {
        self.dir.join(format!("v{version}"))
    }

    /// Writes every file of one version and returns their final paths.
    ///
    /// Fails if the version already exists; versions are never overwritten.
    pub fn write_version(
        &self,
        version: u32,
        files: &[GeneratedFile],
    ) -> Result<Vec<PathBuf>, KilnError> {
        let target = self.version_dir(version);
        if target.exists() {
            return Err(KilnError::Workspace {
                message: format!("{} already exists", target.display()),
                source: None,
            });
        }

        let staging = tempfile::Builder::new()
            .prefix(&format!(".v{version}-"))
            .tempdir_in(&self.dir)
            .map_err(|e| KilnError::workspace("cannot create staging directory", e))?;

        for file in files {
            write_atomic(staging.path(), &file.name, &file.code)?;
        }

        std::fs::rename(staging.path(), &target).map_err(|e| {
            KilnError::workspace(format!("cannot publish {}", target.display()), e)
        })?;
        // The staging path no longer exists; dropping the guard is a no-op.
        drop(staging);

        debug!(
            task_id = %self.task_id,
            version,
            files = files.len(),
            dir = %target.display(),
            "artifact version written"
        );
        Ok(files.iter().map(|f| target.join(&f.name)).collect())
    }
}

/// Writes `contents` to `dir/name` through a temp file renamed into place.
pub fn write_atomic(dir: &Path, name: &str, contents: &str) -> Result<PathBuf, KilnError> {
    if !is_safe_component(name) {
        return Err(KilnError::Workspace {
            message: format!("refusing to write {name:?} outside the workspace"),
            source: None,
        });
    }
    let path = dir.join(name);
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| KilnError::workspace("cannot create temp file", e))?;
    tmp.write_all(contents.as_bytes())
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| KilnError::workspace(format!("cannot write {name}"), e))?;
    tmp.persist(&path)
        .map_err(|e| KilnError::workspace(format!("cannot persist {name}"), e.error))?;
    Ok(path)
}

/// Reduces a generated filename to its final path component.
///
/// Returns `None` when nothing usable remains (`..`, `/`, empty).
pub fn sanitize_filename(name: &str) -> Option<String> {
    let last = name
        .trim()
        .rsplit(['/', '\\'])
        .find(|part| !part.is_empty())?;
    is_safe_component(last).then(|| last.to_string())
}

/// Resolves `candidate` against `root` and checks it stays inside.
///
/// Both paths must exist; symlinks are resolved before the check.
pub fn resolve_within(root: &Path, candidate: &Path) -> Result<PathBuf, String> {
    let root = root
        .canonicalize()
        .map_err(|e| format!("workspace root {} is unavailable: {e}", root.display()))?;
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    };
    let resolved = joined
        .canonicalize()
        .map_err(|e| format!("cannot open {}: {e}", candidate.display()))?;
    if resolved.starts_with(&root) {
        Ok(resolved)
    } else {
        Err(format!(
            "security violation: {} is outside the workspace",
            candidate.display()
        ))
    }
}

fn is_safe_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}
