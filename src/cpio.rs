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
 * Read and write CPIO archives in the "new ASCII" (newc) format.
 *
 * Each entry is a 110-byte header of ASCII hex fields, the NUL-terminated
 * entry name, and the payload, with the header+name and the payload each
 * padded to a 4-byte boundary.  An archive ends with an entry named
 * `TRAILER!!!` and an empty payload.
 *
 * The RPM payload is exactly this format with entry names rooted at `./`.
 */

use crate::binio::{pad4, ReadBinary, WriteBinary};
use crate::{Error, Result};
use std::io::{self, Read, Write};

/// Magic string opening every newc entry header.
const MAGIC: &[u8; 6] = b"070701";

/// Size of the fixed entry header.
const HEADER_LEN: usize = 110;

/// Name of the terminating entry.
pub const TRAILER_NAME: &str = "TRAILER!!!";

/// Longest entry name accepted from untrusted input.
const MAX_NAME_LEN: usize = 4096;

/// Metadata for one archive entry.
///
/// `file_size` is authoritative only on the read side; the writer derives
/// it from the payload it is given, just as it forces the magic and the
/// name size.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CpioEntry {
    /// Entry path relative to the archive root.
    pub name: String,
    /// Inode number; conventionally a running index.
    pub ino: u32,
    /// File type and permission bits.
    pub mode: u32,
    /// Owner user id.
    pub uid: u32,
    /// Owner group id.
    pub gid: u32,
    /// Number of links.
    pub nlink: u32,
    /// Modification time, seconds since the epoch.
    pub mtime: u32,
    /// Payload length in bytes.
    pub file_size: u32,
    /// Device major number.
    pub dev_major: u32,
    /// Device minor number.
    pub dev_minor: u32,
    /// Represented-device major number.
    pub rdev_major: u32,
    /// Represented-device minor number.
    pub rdev_minor: u32,
}

impl CpioEntry {
    /// Create an entry with the given name and zeroed attributes.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        CpioEntry {
            name: name.into(),
            ino: 0,
            mode: 0,
            uid: 0,
            gid: 0,
            nlink: 1,
            mtime: 0,
            file_size: 0,
            dev_major: 0,
            dev_minor: 0,
            rdev_major: 0,
            rdev_minor: 0,
        }
    }

    /// Whether this is the terminating entry.
    #[must_use]
    pub fn is_trailer(&self) -> bool {
        self.name == TRAILER_NAME
    }
}

fn hex_field(buf: &[u8], pos: usize) -> Result<u32> {
    let field = &buf[pos..pos + 8];
    let s = std::str::from_utf8(field)
        .map_err(|_| Error::InvalidFormat("non-ASCII CPIO header field".into()))?;
    u32::from_str_radix(s, 16)
        .map_err(|_| Error::InvalidFormat(format!("bad hex CPIO header field: {:?}", s)))
}

// ============================================================================
// Writer
// ============================================================================

/// Write newc entries to an underlying stream.
pub struct CpioWriter<W: Write> {
    inner: W,
    written: u64,
    finished: bool,
}

impl<W: Write> CpioWriter<W> {
    /// Create a writer over `inner`.
    #[must_use]
    pub fn new(inner: W) -> Self {
        CpioWriter {
            inner,
            written: 0,
            finished: false,
        }
    }

    /// Write one entry and its payload.
    ///
    /// The magic, name size and file size fields are derived here; the
    /// corresponding `entry` fields are ignored.
    pub fn write(&mut self, entry: &CpioEntry, payload: &[u8]) -> Result<()> {
        if self.finished {
            return Err(Error::InvalidFormat(
                "entry written after the archive trailer".into(),
            ));
        }
        let file_size = u32::try_from(payload.len()).map_err(|_| {
            Error::InvalidField(format!(
                "payload for {} exceeds the 4 GiB newc limit",
                entry.name
            ))
        })?;
        let name_size = entry.name.len() + 1;

        let mut header = Vec::with_capacity(HEADER_LEN + name_size);
        header.extend_from_slice(MAGIC);
        for field in [
            entry.ino,
            entry.mode,
            entry.uid,
            entry.gid,
            entry.nlink,
            entry.mtime,
            file_size,
            entry.dev_major,
            entry.dev_minor,
            entry.rdev_major,
            entry.rdev_minor,
            name_size as u32,
            0, // checksum, unused by newc
        ] {
            header.extend_from_slice(format!("{:08X}", field).as_bytes());
        }
        header.extend_from_slice(entry.name.as_bytes());
        header.push(0);

        self.inner.write_all(&header)?;
        self.inner.write_zeros(pad4(HEADER_LEN + name_size))?;
        self.inner.write_all(payload)?;
        self.inner.write_zeros(pad4(payload.len()))?;

        self.written += (header.len()
            + pad4(HEADER_LEN + name_size)
            + payload.len()
            + pad4(payload.len())) as u64;
        Ok(())
    }

    /// Write the terminating entry.  No further entries may follow.
    pub fn write_trailer(&mut self) -> Result<()> {
        let trailer = CpioEntry::new(TRAILER_NAME);
        self.write(&trailer, &[])?;
        self.finished = true;
        Ok(())
    }

    /// Total archive bytes written so far, padding included.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Return the underlying writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.inner
    }
}

// ============================================================================
// Reader
// ============================================================================

/// Read newc entries off an underlying stream.
///
/// Any unread payload from the previous entry is discarded on the next
/// [`CpioReader::next_entry`] call, so callers may skip payloads they do
/// not care about.
pub struct CpioReader<R: Read> {
    inner: R,
    remaining: u64,
    trailing_pad: u64,
}

impl<R: Read> CpioReader<R> {
    /// Create a reader over `inner`.
    #[must_use]
    pub fn new(inner: R) -> Self {
        CpioReader {
            inner,
            remaining: 0,
            trailing_pad: 0,
        }
    }

    /// Advance to the next entry.
    ///
    /// Returns `None` at the trailer, or at a clean end of stream.
    pub fn next_entry(&mut self) -> Result<Option<CpioEntry>> {
        self.inner.skip_bytes(self.remaining + self.trailing_pad)?;
        self.remaining = 0;
        self.trailing_pad = 0;

        let mut header = [0u8; HEADER_LEN];
        match self.inner.read_exact(&mut header) {
            Ok(()) => (),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        if &header[..6] != MAGIC {
            return Err(Error::InvalidFormat(format!(
                "bad CPIO magic: {:?}",
                String::from_utf8_lossy(&header[..6])
            )));
        }

        let ino = hex_field(&header, 6)?;
        let mode = hex_field(&header, 14)?;
        let uid = hex_field(&header, 22)?;
        let gid = hex_field(&header, 30)?;
        let nlink = hex_field(&header, 38)?;
        let mtime = hex_field(&header, 46)?;
        let file_size = hex_field(&header, 54)?;
        let dev_major = hex_field(&header, 62)?;
        let dev_minor = hex_field(&header, 70)?;
        let rdev_major = hex_field(&header, 78)?;
        let rdev_minor = hex_field(&header, 86)?;
        let name_size = hex_field(&header, 94)? as usize;

        if name_size == 0 || name_size > MAX_NAME_LEN {
            return Err(Error::InvalidFormat(format!(
                "unreasonable CPIO name size: {}",
                name_size
            )));
        }
        let mut name_bytes = self.inner.read_bytes(name_size)?;
        if name_bytes.pop() != Some(0) {
            return Err(Error::InvalidFormat(
                "CPIO entry name is not NUL-terminated".into(),
            ));
        }
        let name = String::from_utf8(name_bytes)
            .map_err(|_| Error::InvalidFormat("CPIO entry name is not UTF-8".into()))?;

        self.inner
            .skip_bytes(pad4(HEADER_LEN + name_size) as u64)?;

        let entry = CpioEntry {
            name,
            ino,
            mode,
            uid,
            gid,
            nlink,
            mtime,
            file_size,
            dev_major,
            dev_minor,
            rdev_major,
            rdev_minor,
        };
        if entry.is_trailer() {
            return Ok(None);
        }

        self.remaining = u64::from(file_size);
        self.trailing_pad = pad4(file_size as usize) as u64;
        Ok(Some(entry))
    }

    /// A bounded view over the current entry's unread payload.
    ///
    /// The view borrows the reader and is invalidated by the next
    /// [`CpioReader::next_entry`] call.
    pub fn open(&mut self) -> EntryData<'_, R> {
        EntryData { reader: self }
    }

    /// Read the current entry's remaining payload into a buffer.
    pub fn read_data(&mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.remaining as usize);
        self.open().read_to_end(&mut buf)?;
        Ok(buf)
    }
}

/// Bounded [`Read`] view over one entry's payload.
pub struct EntryData<'a, R: Read> {
    reader: &'a mut CpioReader<R>,
}

impl<R: Read> Read for EntryData<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let limit = buf.len().min(self.reader.remaining as usize);
        if limit == 0 {
            return Ok(0);
        }
        let n = self.reader.inner.read(&mut buf[..limit])?;
        self.reader.remaining -= n as u64;
        Ok(n)
    }
}
