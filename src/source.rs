/*
 * Copyright (c) 2026 Jonathan Perkin <jonathan@perkin.org.uk>
 *
 * Permission to use, copy, modify, and distribute this software for any
 * purpose with or without fee is hereby granted, provided that the above
 * copyright notice and this permission notice appear in all copies.
 *
 * THE SOFTWARE IS PROVIDED "AS IS" AND THE AUTHOR DISCLAIMS ALL WARRANTIES
 * WITH REGARD TO THIS SOFTWARE INCLUDING ALL IMPLIED WARRANTIES OF
 * MERCHANTABILITY AND FITNESS. IN NO EVENT SHALL THE AUTHOR BE LIABLE FOR
 * ANY SPECIAL, DIRECT, INDIRECT, OR CONSEQUENTIAL DAMAGES OR ANY DAMAGES
 * WHATSOEVER RESULTING FROM LOSS OF USE, DATA OR PROFITS, WHETHER IN AN
 * ACTION OF CONTRACT, NEGLIGENCE OR OTHER TORTIOUS ACTION, ARISING OUT OF
 * OR IN CONNECTION WITH THE USE OR PERFORMANCE OF THIS SOFTWARE.
 */

/*!
 * Payload enumeration for the package assembler.
 *
 * A [`FileSource`] yields the files a package installs.  [`MemorySource`]
 * holds entries built in memory, which is what tests and callers with
 * generated content use; [`DirSource`] walks an already-published directory
 * on disk.  The assembler sorts entries by path, so source order does not
 * affect the output.
 */

use crate::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// What kind of file-system object a payload entry is.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FileKind {
    /// A regular file and its contents.
    Regular {
        /// File contents.
        content: Vec<u8>,
    },
    /// A directory.
    Directory,
    /// A symbolic link and its target path.
    Symlink {
        /// Link target.
        target: String,
    },
}

/// One file-system object to be packaged.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PayloadFile {
    /// Install path, absolute or already rooted at `./`.
    pub path: String,
    /// Permission bits.
    pub mode: u32,
    /// Modification time, seconds since the epoch.
    pub mtime: u32,
    /// Object kind and contents.
    pub kind: FileKind,
}

impl PayloadFile {
    /// A regular file entry.
    #[must_use]
    pub fn regular(
        path: impl Into<String>,
        mode: u32,
        mtime: u32,
        content: Vec<u8>,
    ) -> Self {
        PayloadFile {
            path: path.into(),
            mode,
            mtime,
            kind: FileKind::Regular { content },
        }
    }

    /// A directory entry.
    #[must_use]
    pub fn directory(path: impl Into<String>, mode: u32, mtime: u32) -> Self {
        PayloadFile {
            path: path.into(),
            mode,
            mtime,
            kind: FileKind::Directory,
        }
    }

    /// A symbolic link entry.
    #[must_use]
    pub fn symlink(
        path: impl Into<String>,
        mtime: u32,
        target: impl Into<String>,
    ) -> Self {
        PayloadFile {
            path: path.into(),
            mode: 0o777,
            mtime,
            kind: FileKind::Symlink {
                target: target.into(),
            },
        }
    }

    /// Recorded file size: content length for regular files, target length
    /// for symlinks, zero for directories.
    #[must_use]
    pub fn size(&self) -> u64 {
        match &self.kind {
            FileKind::Regular { content } => content.len() as u64,
            FileKind::Directory => 0,
            FileKind::Symlink { target } => target.len() as u64,
        }
    }

    /// Full mode word: file-type bits from the kind, permission bits from
    /// `mode`.
    #[must_use]
    pub fn full_mode(&self) -> u32 {
        let type_bits = match self.kind {
            FileKind::Regular { .. } => 0o100000,
            FileKind::Directory => 0o040000,
            FileKind::Symlink { .. } => 0o120000,
        };
        type_bits | (self.mode & 0o7777)
    }
}

/// Source of the files a package installs.
pub trait FileSource {
    /// Produce the payload entries.  Order is not significant; the
    /// assembler sorts by path.
    fn files(&mut self) -> Result<Vec<PayloadFile>>;
}

/// A [`FileSource`] over entries built in memory.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    files: Vec<PayloadFile>,
}

impl MemorySource {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry.
    pub fn push(&mut self, file: PayloadFile) {
        self.files.push(file);
    }
}

impl FileSource for MemorySource {
    fn files(&mut self) -> Result<Vec<PayloadFile>> {
        Ok(self.files.clone())
    }
}

/// A [`FileSource`] that walks a published directory on disk.
///
/// Paths are recorded relative to the directory root, prefixed with the
/// install prefix.  Regular files and symbolic links are packaged;
/// directories are implied by the packaged paths.
#[derive(Clone, Debug)]
pub struct DirSource {
    root: PathBuf,
    prefix: String,
}

impl DirSource {
    /// Walk `root`, installing entries under `prefix`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        DirSource {
            root: root.into(),
            prefix: prefix.into(),
        }
    }

    fn visit(&self, dir: &Path, out: &mut Vec<PayloadFile>) -> Result<()> {
        let mut names: Vec<PathBuf> =
            fs::read_dir(dir)?.map(|e| Ok(e?.path())).collect::<Result<_>>()?;
        names.sort();

        for path in names {
            let meta = fs::symlink_metadata(&path)?;
            if meta.is_dir() {
                self.visit(&path, out)?;
                continue;
            }

            let rel = path.strip_prefix(&self.root).unwrap_or(&path);
            let install = format!(
                "{}/{}",
                self.prefix.trim_end_matches('/'),
                rel.to_string_lossy().replace('\\', "/")
            );
            let mtime = mtime_of(&meta);
            if meta.file_type().is_symlink() {
                let target = fs::read_link(&path)?.to_string_lossy().into_owned();
                out.push(PayloadFile::symlink(install, mtime, target));
            } else {
                let content = fs::read(&path)?;
                out.push(PayloadFile {
                    path: install,
                    mode: mode_of(&meta),
                    mtime,
                    kind: FileKind::Regular { content },
                });
            }
        }
        Ok(())
    }
}

#[cfg(unix)]
fn mode_of(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::MetadataExt;
    meta.mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_of(_meta: &fs::Metadata) -> u32 {
    0o644
}

fn mtime_of(meta: &fs::Metadata) -> u32 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

impl FileSource for DirSource {
    fn files(&mut self) -> Result<Vec<PayloadFile>> {
        let mut out = Vec::new();
        let root = self.root.clone();
        self.visit(&root, &mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_mode_sets_type_bits() {
        let f = PayloadFile::regular("/usr/bin/x", 0o755, 0, vec![]);
        assert_eq!(f.full_mode(), 0o100755);

        let d = PayloadFile::directory("/usr/share/x", 0o755, 0);
        assert_eq!(d.full_mode(), 0o040755);

        let l = PayloadFile::symlink("/usr/bin/y", 0, "../real");
        assert_eq!(l.full_mode(), 0o120777);
    }

    #[test]
    fn sizes_by_kind() {
        assert_eq!(PayloadFile::regular("/a", 0o644, 0, b"hello\n".to_vec()).size(), 6);
        assert_eq!(PayloadFile::directory("/d", 0o755, 0).size(), 0);
        assert_eq!(PayloadFile::symlink("/l", 0, "../real").size(), 7);
    }

    #[test]
    fn memory_source_returns_entries() -> Result<()> {
        let mut source = MemorySource::new();
        source.push(PayloadFile::regular("/b", 0o644, 0, vec![1]));
        source.push(PayloadFile::regular("/a", 0o644, 0, vec![2]));
        let files = source.files()?;
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "/b");
        Ok(())
    }
}
