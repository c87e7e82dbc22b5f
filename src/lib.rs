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
 * # rpmpack
 *
 * Build and read binary RPM packages.
 *
 * An RPM file is four concatenated regions: a fixed 96-byte lead, a
 * "signature" header structure, the main header structure, and a compressed
 * CPIO archive of the package files.  This crate implements each layer and
 * an [`assemble`] pipeline that produces a complete package from an abstract
 * [`FileSource`], plus a [`Package`] reader used for verification.
 *
 * ## Example
 *
 * ```
 * use rpmpack::{assemble, MemorySource, PackageIdentity, PackageOptions, PayloadFile};
 *
 * fn main() -> rpmpack::Result<()> {
 *     let mut source = MemorySource::new();
 *     source.push(PayloadFile::regular(
 *         "/usr/share/hello/readme.txt",
 *         0o644,
 *         1700000000,
 *         b"hello\n".to_vec(),
 *     ));
 *
 *     let identity = PackageIdentity::new("hello", "1.0", "1", "noarch");
 *     let mut options = PackageOptions::default();
 *     options.summary = String::from("An example package");
 *     options.build_time = Some(1700000000);
 *
 *     let mut out = Vec::new();
 *     assemble(&mut source, &identity, &options, &mut out)?;
 *     Ok(())
 * }
 * ```
 */

#![deny(missing_docs)]

pub use crate::compress::Compression;
pub use crate::cpio::{CpioEntry, CpioReader, CpioWriter};
pub use crate::digest::{Digest, SignatureAlgorithm, Signer};
pub use crate::lead::Lead;
pub use crate::package::{
    assemble, assemble_signed, ChangelogEntry, PackageIdentity, PackageOptions,
};
pub use crate::reader::Package;
pub use crate::source::{DirSource, FileKind, FileSource, MemorySource, PayloadFile};
pub use crate::store::{Region, TagStore, Value};
pub use crate::tags::{SigTag, Tag, TagType};

pub mod binio;
pub mod compress;
pub mod cpio;
pub mod digest;
pub mod lead;
pub mod package;
pub mod reader;
pub mod section;
pub mod source;
pub mod store;
pub mod tags;

/// Result type for package operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for package operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Structural violation in an input CPIO or RPM stream.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// A value was stored under a tag that declares a different type.
    #[error("type mismatch for tag {tag}: expected {expected}, got {found}")]
    TypeMismatch {
        /// Numeric tag code.
        tag: u32,
        /// Type the tag declares.
        expected: TagType,
        /// Type of the rejected value.
        found: TagType,
    },

    /// The compression codec reported an error.
    #[error("compression failed: {0}")]
    Compression(String),

    /// A stored digest does not match the recomputed value.
    #[error("{kind} digest mismatch: expected {expected}, got {found}")]
    DigestMismatch {
        /// Which digest failed.
        kind: String,
        /// Value recorded in the package.
        expected: String,
        /// Value recomputed from the package contents.
        found: String,
    },

    /// A value exceeds the encodable range of its field.
    #[error("invalid field: {0}")]
    InvalidField(String),
}
