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
 * Read packages back for verification.
 *
 * [`Package::parse`] is the inverse of the assembler: it walks the lead,
 * signature section (dropping its trailing pad), header section and payload,
 * and keeps the raw header bytes so the recorded digests can be checked
 * against what is actually in the file.
 */

use crate::binio::ReadBinary;
use crate::compress::{decompress, Compression};
use crate::cpio::{CpioEntry, CpioReader};
use crate::digest::Digest;
use crate::lead::Lead;
use crate::section;
use crate::store::TagStore;
use crate::tags::{SigTag, Tag};
use crate::{Error, Result};
use std::io::Read;
use std::path::Path;

/// A parsed package.
#[derive(Clone, Debug)]
pub struct Package {
    lead: Lead,
    signature: TagStore,
    header: TagStore,
    header_blob: Vec<u8>,
    payload: Vec<u8>,
}

/// One file recovered from the payload.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PackageFile {
    /// CPIO entry metadata.
    pub entry: CpioEntry,
    /// File contents; the link target for symbolic links.
    pub content: Vec<u8>,
}

impl Package {
    /// Parse a package from a reader.
    pub fn parse<R: Read>(reader: &mut R) -> Result<Self> {
        let lead = Lead::parse(reader)?;

        let signature_blob = section::read_raw(reader)?;
        let signature = section::decode(&signature_blob)?;
        reader.skip_bytes(section::signature_padding(signature_blob.len()) as u64)?;

        let header_blob = section::read_raw(reader)?;
        let header = section::decode(&header_blob)?;

        let mut payload = Vec::new();
        reader.read_to_end(&mut payload)?;

        Ok(Package {
            lead,
            signature,
            header,
            header_blob,
            payload,
        })
    }

    /// Open and parse a package file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let mut reader = std::io::BufReader::new(file);
        Self::parse(&mut reader)
    }

    /// The package lead.
    #[must_use]
    pub fn lead(&self) -> &Lead {
        &self.lead
    }

    /// The signature section store.
    #[must_use]
    pub fn signature(&self) -> &TagStore {
        &self.signature
    }

    /// The header section store.
    #[must_use]
    pub fn header(&self) -> &TagStore {
        &self.header
    }

    /// The compressed payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// The payload compression format recorded in the header.
    pub fn payload_compression(&self) -> Result<Compression> {
        let name = self
            .header
            .get(Tag::PayloadCompressor)
            .and_then(|v| v.as_str())
            .unwrap_or("xz");
        Compression::from_name(name).ok_or_else(|| {
            Error::InvalidFormat(format!("unsupported payload compressor: {}", name))
        })
    }

    /// Recompute the recorded digests and sizes and compare them against
    /// the package contents.
    pub fn verify_digests(&self) -> Result<()> {
        if let Some(expected) = self.signature.get(SigTag::Md5).and_then(|v| v.as_binary()) {
            let found = Digest::Md5.digest_parts(&[&self.header_blob, &self.payload]);
            if found != expected {
                return Err(Error::DigestMismatch {
                    kind: String::from("MD5"),
                    expected: hex(expected),
                    found: hex(&found),
                });
            }
        }

        for (tag, digest, kind) in [
            (SigTag::Sha1, Digest::Sha1, "SHA1"),
            (SigTag::Sha256, Digest::Sha256, "SHA256"),
        ] {
            if let Some(expected) = self.signature.get(tag).and_then(|v| v.as_str()) {
                let found = digest.hash_bytes(&self.header_blob);
                if found != expected {
                    return Err(Error::DigestMismatch {
                        kind: String::from(kind),
                        expected: expected.to_string(),
                        found,
                    });
                }
            }
        }

        if let Some(&[expected]) = self
            .signature
            .get(SigTag::Size)
            .and_then(|v| v.as_int32())
        {
            let found = (self.header_blob.len() + self.payload.len()) as u32;
            if found != expected {
                return Err(Error::DigestMismatch {
                    kind: String::from("size"),
                    expected: expected.to_string(),
                    found: found.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Decompress the payload and collect its file entries.
    ///
    /// Also checks the recorded uncompressed payload size when present.
    pub fn files(&self) -> Result<Vec<PackageFile>> {
        let archive = decompress(&self.payload, self.payload_compression()?)?;

        if let Some(&[expected]) = self
            .signature
            .get(SigTag::PayloadSize)
            .and_then(|v| v.as_int32())
        {
            if archive.len() as u32 != expected {
                return Err(Error::DigestMismatch {
                    kind: String::from("payload size"),
                    expected: expected.to_string(),
                    found: archive.len().to_string(),
                });
            }
        }

        let mut reader = CpioReader::new(archive.as_slice());
        let mut files = Vec::new();
        while let Some(entry) = reader.next_entry()? {
            let content = reader.read_data()?;
            files.push(PackageFile { entry, content });
        }
        Ok(files)
    }
}

fn hex(raw: &[u8]) -> String {
    raw.iter().fold(String::new(), |mut out, b| {
        out.push_str(&format!("{b:02x}"));
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_rpm_input() {
        let junk = b"definitely not an rpm".to_vec();
        assert!(matches!(
            Package::parse(&mut junk.as_slice()),
            Err(Error::InvalidFormat(_))
        ));
    }
}
