// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Lookup of produced outputs by file name.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use docshift_core::{DocshiftError, content_type_for_extension, extension_of};
use tracing::{debug, instrument};

/// A produced output ready to hand to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    /// `attachment; filename="<name>"`
    pub content_disposition: String,
}

/// Read-only view over the storage root.
#[derive(Debug, Clone)]
pub struct OutputStore {
    root: PathBuf,
}

impl OutputStore {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fetch an output by its bare file name. Anything that could address a
    /// file outside the storage root, or that is not a regular file, is
    /// reported as not found.
    #[instrument(skip(self))]
    pub async fn fetch(&self, filename: &str) -> Result<Download, DocshiftError> {
        if !is_plain_name(filename) {
            debug!("rejected download name");
            return Err(DocshiftError::NotFound(filename.to_string()));
        }

        let path = self.root.join(filename);
        let not_found = || DocshiftError::NotFound(filename.to_string());
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                debug!("not a regular file");
                return Err(not_found());
            }
            Err(err) if err.kind() == ErrorKind::NotFound => return Err(not_found()),
            Err(err) => return Err(err.into()),
        }

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Err(not_found()),
            Err(err) => return Err(err.into()),
        };

        debug!(bytes = bytes.len(), "output read");
        Ok(Download {
            content_type: content_type_for_extension(&extension_of(filename)),
            content_disposition: format!("attachment; filename=\"{filename}\""),
            filename: filename.to_string(),
            bytes,
        })
    }
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
        && !name.contains("..")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetch_sets_headers_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("report.pdf"), b"%PDF-1.4").unwrap();
        std::fs::write(dir.path().join("notes.docx"), b"PK").unwrap();
        let store = OutputStore::open(dir.path());

        let pdf = store.fetch("report.pdf").await.unwrap();
        assert_eq!(pdf.bytes, b"%PDF-1.4");
        assert_eq!(pdf.content_type, "application/pdf");
        assert_eq!(pdf.content_disposition, "attachment; filename=\"report.pdf\"");

        let docx = store.fetch("notes.docx").await.unwrap();
        assert_eq!(
            docx.content_type,
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
    }

    #[tokio::test]
    async fn unknown_extension_is_octet_stream() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("blob.bin"), b"x").unwrap();
        let download = OutputStore::open(dir.path()).fetch("blob.bin").await.unwrap();
        assert_eq!(download.content_type, "application/octet-stream");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = OutputStore::open(dir.path()).fetch("nope.pdf").await.unwrap_err();
        assert!(matches!(err, DocshiftError::NotFound(_)));
    }

    #[tokio::test]
    async fn traversal_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let inner = dir.path().join("out");
        std::fs::create_dir(&inner).unwrap();
        std::fs::write(dir.path().join("secret.pdf"), b"x").unwrap();
        let store = OutputStore::open(&inner);
        for name in ["../secret.pdf", "..", "", ".hidden", "a/b.pdf", "a\\b.pdf"] {
            let err = store.fetch(name).await.unwrap_err();
            assert!(matches!(err, DocshiftError::NotFound(_)), "{name}");
        }
    }

    #[tokio::test]
    async fn directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("archive.pdf")).unwrap();
        std::fs::create_dir(dir.path().join("outputs")).unwrap();
        let store = OutputStore::open(dir.path());
        for name in ["archive.pdf", "outputs"] {
            let err = store.fetch(name).await.unwrap_err();
            assert!(matches!(err, DocshiftError::NotFound(_)), "{name}");
        }
    }
}
