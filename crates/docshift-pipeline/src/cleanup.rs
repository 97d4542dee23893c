// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Request-scoped artifact cleanup on top of `tempfile::TempPath`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tracing::{debug, warn};

/// Deletes every tracked path when dropped.
///
/// Paths are tracked before the file they name is created, so a step that
/// fails halfway still has its partial output removed. Runs on every exit
/// path, including early returns, cancellation and unwinding.
#[derive(Debug)]
pub struct ArtifactGuard {
    scope: &'static str,
    paths: Vec<TempPath>,
}

impl ArtifactGuard {
    pub fn new(scope: &'static str) -> Self {
        Self {
            scope,
            paths: Vec::new(),
        }
    }

    /// Track `path` for removal and hand it back.
    pub fn track(&mut self, path: impl Into<PathBuf>) -> PathBuf {
        self.adopt(TempPath::from_path(path.into()))
    }

    /// Take ownership of a temp file created elsewhere, e.g. by
    /// `tempfile::Builder`.
    pub fn adopt(&mut self, temp: TempPath) -> PathBuf {
        let path = temp.to_path_buf();
        debug!(scope = self.scope, path = %path.display(), "tracking artifact");
        self.paths.push(temp);
        path
    }

    /// Stop tracking `path` so it survives the guard. Returns whether it was
    /// tracked.
    pub fn keep(&mut self, path: &Path) -> bool {
        let Some(index) = self.paths.iter().position(|p| **p == *path) else {
            return false;
        };
        if let Err(err) = self.paths.swap_remove(index).keep() {
            warn!(scope = self.scope, path = %path.display(), error = %err, "failed to release artifact");
        }
        true
    }

    pub fn tracked(&self) -> Vec<&Path> {
        self.paths.iter().map(|p| &**p).collect()
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        for temp in self.paths.drain(..) {
            let path = temp.to_path_buf();
            match temp.close() {
                Ok(()) => debug!(scope = self.scope, path = %path.display(), "artifact removed"),
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => warn!(
                    scope = self.scope,
                    path = %path.display(),
                    error = %err,
                    "failed to remove artifact"
                ),
            }
        }
    }
}
