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
 * End-to-end package assembly.
 *
 * [`assemble`] runs the whole pipeline: enumerate the payload, write it as
 * a CPIO archive through the XZ encoder, populate the header store in
 * canonical tag order, digest the result into the signature store, and emit
 * lead, signature section, header section and payload in order.
 *
 * The signature covers the serialised header, so the header must be
 * complete before the signature store is built, and the compressed payload
 * must be buffered because its digests land in sections that precede it on
 * disk.
 *
 * Build time and file mtimes are plain inputs.  Supplying fixed values
 * makes assembly fully deterministic, which the round-trip tests rely on.
 */

use std::collections::BTreeSet;
use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::compress::{Compression, Encoder};
use crate::cpio::{CpioEntry, CpioWriter};
use crate::digest::{Digest, SignatureAlgorithm, Signer};
use crate::lead::{arch_number, os_number, Lead};
use crate::section;
use crate::source::{FileKind, FileSource, PayloadFile};
use crate::store::{Region, TagStore, Value};
use crate::tags::{self, SigTag, Tag, DEP_EQUAL, DEP_LESS, DEP_RPMLIB};
use crate::{Error, Result};

/// rpmlib capabilities a package produced here depends on, with the rpm
/// version that introduced each.
const RPMLIB_REQUIRES: &[(&str, &str)] = &[
    ("rpmlib(CompressedFileNames)", "3.0.4-1"),
    ("rpmlib(FileDigests)", "4.6.0-1"),
    ("rpmlib(PayloadFilesHavePrefix)", "4.0-1"),
    ("rpmlib(PayloadIsXz)", "5.2-1"),
];

/// Interpreter recorded for scriptlets.
const SCRIPT_PROG: &str = "/bin/sh";

/// The name-version-release identity of a package build.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PackageIdentity {
    /// Package name.
    pub name: String,
    /// Upstream version.
    pub version: String,
    /// Package release.
    pub release: String,
    /// Target architecture, e.g. `x86_64` or `noarch`.
    pub arch: String,
    /// Target operating system.
    pub os: String,
}

impl PackageIdentity {
    /// Create an identity targeting Linux.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        release: impl Into<String>,
        arch: impl Into<String>,
    ) -> Self {
        PackageIdentity {
            name: name.into(),
            version: version.into(),
            release: release.into(),
            arch: arch.into(),
            os: String::from("linux"),
        }
    }

    /// The `NAME-VERSION-RELEASE` string.
    #[must_use]
    pub fn nvr(&self) -> String {
        format!("{}-{}-{}", self.name, self.version, self.release)
    }

    /// The `VERSION-RELEASE` string used by the self-provide.
    #[must_use]
    pub fn evr(&self) -> String {
        format!("{}-{}", self.version, self.release)
    }
}

/// One changelog entry.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChangelogEntry {
    /// Entry time, seconds since the epoch.
    pub time: u32,
    /// Author, conventionally `name <email> - version-release`.
    pub author: String,
    /// Entry text.
    pub text: String,
}

/// Optional metadata and knobs for package assembly.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PackageOptions {
    /// One-line summary.
    pub summary: String,
    /// Long description.  Falls back to the summary when empty.
    pub description: String,
    /// License string.
    pub license: Option<String>,
    /// Vendor string.
    pub vendor: Option<String>,
    /// Upstream URL.
    pub url: Option<String>,
    /// Package group.
    pub group: Option<String>,
    /// Distribution name.
    pub distribution: Option<String>,
    /// Distribution URL.
    pub disturl: Option<String>,
    /// Build cookie.
    pub cookie: Option<String>,
    /// Changelog, newest first.
    pub changelog: Vec<ChangelogEntry>,
    /// Post-install scriptlet body.
    pub post_install: Option<String>,
    /// Post-uninstall scriptlet body.
    pub post_uninstall: Option<String>,
    /// Build time, seconds since the epoch.  Falls back to the system
    /// clock; fix it for reproducible output.
    pub build_time: Option<u32>,
    /// Build host name.
    pub build_host: String,
    /// Owner name recorded for every file.
    pub file_owner: String,
    /// Group name recorded for every file.
    pub file_group: String,
    /// Per-file digest algorithm.
    pub file_digest: Digest,
    /// XZ compression level, recorded as the payload flags.
    pub compression_level: u32,
}

impl Default for PackageOptions {
    fn default() -> Self {
        PackageOptions {
            summary: String::new(),
            description: String::new(),
            license: None,
            vendor: None,
            url: None,
            group: None,
            distribution: None,
            disturl: None,
            cookie: None,
            changelog: Vec::new(),
            post_install: None,
            post_uninstall: None,
            build_time: None,
            build_host: String::from("localhost"),
            file_owner: String::from("root"),
            file_group: String::from("root"),
            file_digest: Digest::Md5,
            compression_level: 2,
        }
    }
}

/// Per-file statistics gathered while the archive is written.
#[derive(Debug, Default)]
struct FileStats {
    sizes: Vec<u32>,
    modes: Vec<u16>,
    rdevs: Vec<u16>,
    mtimes: Vec<u32>,
    digests: Vec<String>,
    linktos: Vec<String>,
    flags: Vec<u32>,
    devices: Vec<u32>,
    inodes: Vec<u32>,
    langs: Vec<String>,
    colors: Vec<u32>,
    verify_flags: Vec<u32>,
    dir_indexes: Vec<u32>,
    base_names: Vec<String>,
    dir_names: Vec<String>,
    total_size: u64,
}

impl FileStats {
    fn len(&self) -> usize {
        self.sizes.len()
    }
}

/// Normalise an install path to a CPIO entry name rooted at `./`.
fn archive_name(path: &str) -> String {
    let trimmed = path.trim_start_matches('/');
    match trimmed.strip_prefix("./") {
        Some(rest) => format!("./{}", rest),
        None => format!("./{}", trimmed),
    }
}

/// Split an archive name into its directory (with trailing slash) and base
/// name.
fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('/') {
        Some(pos) => (&name[..pos + 1], &name[pos + 1..]),
        None => ("", name),
    }
}

/// Write the payload files as an XZ-compressed CPIO archive, gathering the
/// per-file statistics the header records.
///
/// Returns the compressed payload, the uncompressed archive size, and the
/// statistics.
fn write_archive(
    files: &[PayloadFile],
    options: &PackageOptions,
) -> Result<(Vec<u8>, u64, FileStats)> {
    let mut stats = FileStats::default();

    let unique_dirs: BTreeSet<String> = files
        .iter()
        .map(|f| split_name(&archive_name(&f.path)).0.to_string())
        .collect();
    stats.dir_names = unique_dirs.into_iter().collect();

    let encoder = Encoder::new(Vec::new(), Compression::Xz, options.compression_level);
    let mut writer = CpioWriter::new(encoder);

    for (i, file) in files.iter().enumerate() {
        let name = archive_name(&file.path);
        let (dir, base) = split_name(&name);

        let size = u32::try_from(file.size()).map_err(|_| {
            Error::InvalidField(format!("{} exceeds the 4 GiB file size limit", file.path))
        })?;
        let payload: &[u8] = match &file.kind {
            FileKind::Regular { content } => content,
            FileKind::Directory => &[],
            FileKind::Symlink { target } => target.as_bytes(),
        };
        let digest = match &file.kind {
            FileKind::Regular { content } => options.file_digest.hash_bytes(content),
            _ => String::new(),
        };
        let linkto = match &file.kind {
            FileKind::Symlink { target } => target.clone(),
            _ => String::new(),
        };
        let dir_index = stats
            .dir_names
            .iter()
            .position(|d| d == dir)
            .unwrap_or(0) as u32;

        stats.total_size += u64::from(size);
        stats.sizes.push(size);
        stats.modes.push((file.full_mode() & 0xffff) as u16);
        stats.rdevs.push(0);
        stats.mtimes.push(file.mtime);
        stats.digests.push(digest);
        stats.linktos.push(linkto);
        stats.flags.push(0);
        stats.devices.push(1);
        stats.inodes.push(i as u32 + 1);
        stats.langs.push(String::new());
        stats.colors.push(0);
        stats.verify_flags.push(u32::MAX);
        stats.dir_indexes.push(dir_index);
        stats.base_names.push(base.to_string());

        let mut entry = CpioEntry::new(name);
        entry.ino = i as u32 + 1;
        entry.mode = file.full_mode();
        entry.mtime = file.mtime;
        writer.write(&entry, payload)?;
    }

    writer.write_trailer()?;
    let uncompressed = writer.bytes_written();
    let compressed = writer.into_inner().finish()?;
    Ok((compressed, uncompressed, stats))
}

struct HeaderContext<'a> {
    identity: &'a PackageIdentity,
    options: &'a PackageOptions,
    stats: &'a FileStats,
    payload_digest: String,
    build_time: u32,
    size: u32,
}

/// The value a header tag takes, or `None` when the tag is not emitted for
/// this package.  Called once per canonical-order entry so emission order
/// stays data-driven.
fn header_value(tag: Tag, ctx: &HeaderContext) -> Option<Value> {
    let identity = ctx.identity;
    let options = ctx.options;
    let stats = ctx.stats;
    let has_files = stats.len() > 0;

    match tag {
        Tag::HeaderI18nTable => Some(Value::StringArray(vec![String::from("C")])),
        Tag::Name => Some(Value::String(identity.name.clone())),
        Tag::Version => Some(Value::String(identity.version.clone())),
        Tag::Release => Some(Value::String(identity.release.clone())),
        Tag::Summary => Some(Value::I18nString(vec![options.summary.clone()])),
        Tag::Description => {
            let text = if options.description.is_empty() {
                options.summary.clone()
            } else {
                options.description.clone()
            };
            Some(Value::I18nString(vec![text]))
        }
        Tag::BuildTime => Some(Value::Int32(vec![ctx.build_time])),
        Tag::BuildHost => Some(Value::String(options.build_host.clone())),
        Tag::Size => Some(Value::Int32(vec![ctx.size])),
        Tag::Distribution => options.distribution.clone().map(Value::String),
        Tag::Vendor => options.vendor.clone().map(Value::String),
        Tag::License => options.license.clone().map(Value::String),
        Tag::Group => options
            .group
            .clone()
            .map(|g| Value::I18nString(vec![g])),
        Tag::Url => options.url.clone().map(Value::String),
        Tag::Os => Some(Value::String(identity.os.clone())),
        Tag::Arch => Some(Value::String(identity.arch.clone())),
        Tag::FileSizes => has_files.then(|| Value::Int32(stats.sizes.clone())),
        Tag::FileModes => has_files.then(|| Value::Int16(stats.modes.clone())),
        Tag::FileRdevs => has_files.then(|| Value::Int16(stats.rdevs.clone())),
        Tag::FileMtimes => has_files.then(|| Value::Int32(stats.mtimes.clone())),
        Tag::FileDigests => has_files.then(|| Value::StringArray(stats.digests.clone())),
        Tag::FileLinkTos => has_files.then(|| Value::StringArray(stats.linktos.clone())),
        Tag::FileFlags => has_files.then(|| Value::Int32(stats.flags.clone())),
        Tag::FileUserName => {
            has_files.then(|| Value::StringArray(vec![options.file_owner.clone(); stats.len()]))
        }
        Tag::FileGroupName => {
            has_files.then(|| Value::StringArray(vec![options.file_group.clone(); stats.len()]))
        }
        Tag::SourceRpm => Some(Value::String(String::from("(none)"))),
        Tag::FileVerifyFlags => has_files.then(|| Value::Int32(stats.verify_flags.clone())),
        Tag::ProvideName => Some(Value::StringArray(vec![identity.name.clone()])),
        Tag::RequireFlags => Some(Value::Int32(vec![
            DEP_RPMLIB | DEP_LESS | DEP_EQUAL;
            RPMLIB_REQUIRES.len()
        ])),
        Tag::RequireName => Some(Value::StringArray(
            RPMLIB_REQUIRES.iter().map(|(n, _)| n.to_string()).collect(),
        )),
        Tag::RequireVersion => Some(Value::StringArray(
            RPMLIB_REQUIRES.iter().map(|(_, v)| v.to_string()).collect(),
        )),
        Tag::RpmVersion => Some(Value::String(format!(
            "rpmpack {}",
            env!("CARGO_PKG_VERSION")
        ))),
        Tag::ChangelogTime => (!options.changelog.is_empty())
            .then(|| Value::Int32(options.changelog.iter().map(|c| c.time).collect())),
        Tag::ChangelogName => (!options.changelog.is_empty()).then(|| {
            Value::StringArray(options.changelog.iter().map(|c| c.author.clone()).collect())
        }),
        Tag::ChangelogText => (!options.changelog.is_empty()).then(|| {
            Value::StringArray(options.changelog.iter().map(|c| c.text.clone()).collect())
        }),
        Tag::PostInstallProg => options
            .post_install
            .as_ref()
            .map(|_| Value::String(String::from(SCRIPT_PROG))),
        Tag::PostUninstallProg => options
            .post_uninstall
            .as_ref()
            .map(|_| Value::String(String::from(SCRIPT_PROG))),
        Tag::Cookie => options.cookie.clone().map(Value::String),
        Tag::FileDevices => has_files.then(|| Value::Int32(stats.devices.clone())),
        Tag::FileInodes => has_files.then(|| Value::Int32(stats.inodes.clone())),
        Tag::FileLangs => has_files.then(|| Value::StringArray(stats.langs.clone())),
        Tag::ProvideFlags => Some(Value::Int32(vec![DEP_EQUAL])),
        Tag::ProvideVersion => Some(Value::StringArray(vec![identity.evr()])),
        Tag::DirIndexes => has_files.then(|| Value::Int32(stats.dir_indexes.clone())),
        Tag::BaseNames => has_files.then(|| Value::StringArray(stats.base_names.clone())),
        Tag::DirNames => has_files.then(|| Value::StringArray(stats.dir_names.clone())),
        Tag::OptFlags => None,
        Tag::DistUrl => options.disturl.clone().map(Value::String),
        Tag::PayloadFormat => Some(Value::String(String::from("cpio"))),
        Tag::PayloadCompressor => Some(Value::String(String::from(Compression::Xz.as_str()))),
        Tag::PayloadFlags => Some(Value::String(options.compression_level.to_string())),
        Tag::Platform => Some(Value::String(format!(
            "{}-{}",
            identity.arch, identity.os
        ))),
        Tag::FileColors => has_files.then(|| Value::Int32(stats.colors.clone())),
        Tag::FileClass
        | Tag::ClassDict
        | Tag::FileDependsX
        | Tag::FileDependsN
        | Tag::DependsDict
        | Tag::SourcePkgId => None,
        Tag::FileDigestAlgo => {
            has_files.then(|| Value::Int32(vec![options.file_digest.algorithm_id()]))
        }
        Tag::PostInstall => options.post_install.clone().map(Value::String),
        Tag::PostUninstall => options.post_uninstall.clone().map(Value::String),
        Tag::PayloadDigest => Some(Value::StringArray(vec![ctx.payload_digest.clone()])),
        Tag::PayloadDigestAlgo => Some(Value::Int32(vec![Digest::Sha256.algorithm_id()])),
    }
}

/// Build the signature section over the header blob and compressed payload,
/// returning its bytes already padded to the 8-byte boundary.
///
/// Tags are emitted in ascending numeric order; the format leaves the order
/// unconstrained, and ascending order keeps output reproducible.
fn build_signature(
    header_blob: &[u8],
    payload: &[u8],
    uncompressed_size: u64,
    signer: Option<&dyn Signer>,
) -> Result<Vec<u8>> {
    let combined = u32::try_from(header_blob.len() + payload.len())
        .map_err(|_| Error::InvalidField("header and payload exceed 4 GiB".into()))?;
    let payload_size = u32::try_from(uncompressed_size)
        .map_err(|_| Error::InvalidField("uncompressed payload exceeds 4 GiB".into()))?;

    let signatures = match signer {
        Some(signer) => {
            let header_sig = signer.sign(header_blob)?;
            let mut whole = Vec::with_capacity(header_blob.len() + payload.len());
            whole.extend_from_slice(header_blob);
            whole.extend_from_slice(payload);
            let whole_sig = signer.sign(&whole)?;
            Some((signer.algorithm(), header_sig, whole_sig))
        }
        None => None,
    };

    let mut store = TagStore::new();
    store.set_region(Region::Signatures);
    if let Some((SignatureAlgorithm::Dsa, header_sig, _)) = &signatures {
        store.set(SigTag::Dsa, Value::Binary(header_sig.clone()))?;
    }
    if let Some((SignatureAlgorithm::Rsa, header_sig, _)) = &signatures {
        store.set(SigTag::Rsa, Value::Binary(header_sig.clone()))?;
    }
    store.set(
        SigTag::Sha1,
        Value::String(Digest::Sha1.hash_bytes(header_blob)),
    )?;
    store.set(
        SigTag::Sha256,
        Value::String(Digest::Sha256.hash_bytes(header_blob)),
    )?;
    store.set(SigTag::Size, Value::Int32(vec![combined]))?;
    if let Some((SignatureAlgorithm::Rsa, _, whole_sig)) = &signatures {
        store.set(SigTag::Pgp, Value::Binary(whole_sig.clone()))?;
    }
    store.set(
        SigTag::Md5,
        Value::Binary(Digest::Md5.digest_parts(&[header_blob, payload])),
    )?;
    if let Some((SignatureAlgorithm::Dsa, _, whole_sig)) = &signatures {
        store.set(SigTag::Gpg, Value::Binary(whole_sig.clone()))?;
    }
    store.set(SigTag::PayloadSize, Value::Int32(vec![payload_size]))?;

    let mut bytes = section::encode(&store)?;
    bytes.resize(bytes.len() + section::signature_padding(bytes.len()), 0);
    Ok(bytes)
}

fn now_epoch() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

/// Assemble an unsigned package from `source` and write it to `out`.
///
/// The destination receives the complete file in one pass; callers wanting
/// atomic output should write to a temporary path and rename on success.
pub fn assemble<S, W>(
    source: &mut S,
    identity: &PackageIdentity,
    options: &PackageOptions,
    out: &mut W,
) -> Result<()>
where
    S: FileSource + ?Sized,
    W: Write,
{
    assemble_signed(source, identity, options, None, out)
}

/// Assemble a package, optionally signing it, and write it to `out`.
pub fn assemble_signed<S, W>(
    source: &mut S,
    identity: &PackageIdentity,
    options: &PackageOptions,
    signer: Option<&dyn Signer>,
    out: &mut W,
) -> Result<()>
where
    S: FileSource + ?Sized,
    W: Write,
{
    let mut files = source.files()?;
    files.sort_by_cached_key(|f| archive_name(&f.path));

    let (payload, uncompressed_size, stats) = write_archive(&files, options)?;

    let size = u32::try_from(stats.total_size)
        .map_err(|_| Error::InvalidField("total file size exceeds 4 GiB".into()))?;
    let ctx = HeaderContext {
        identity,
        options,
        stats: &stats,
        payload_digest: Digest::Sha256.hash_bytes(&payload),
        build_time: options.build_time.unwrap_or_else(now_epoch),
        size,
    };

    let mut header = TagStore::new();
    header.set_region(Region::HeaderImmutable);
    for &tag in tags::CANONICAL_HEADER_ORDER {
        if let Some(value) = header_value(tag, &ctx) {
            header.set(tag, value)?;
        }
    }
    let header_blob = section::encode(&header)?;

    let signature = build_signature(&header_blob, &payload, uncompressed_size, signer)?;

    let lead = Lead::new(
        &identity.nvr(),
        arch_number(&identity.arch),
        os_number(&identity.os),
    );
    lead.write(out)?;
    out.write_all(&signature)?;
    out.write_all(&header_blob)?;
    out.write_all(&payload)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_names_are_rooted() {
        assert_eq!(archive_name("/usr/share/x"), "./usr/share/x");
        assert_eq!(archive_name("./a/x"), "./a/x");
        assert_eq!(archive_name("a/x"), "./a/x");
    }

    #[test]
    fn split_name_keeps_trailing_slash() {
        assert_eq!(split_name("./usr/share/empty/readme.txt").0, "./usr/share/empty/");
        assert_eq!(split_name("./usr/share/empty/readme.txt").1, "readme.txt");
        assert_eq!(split_name("./x"), ("./", "x"));
    }

    #[test]
    fn identity_strings() {
        let identity = PackageIdentity::new("empty", "1.0", "1", "noarch");
        assert_eq!(identity.nvr(), "empty-1.0-1");
        assert_eq!(identity.evr(), "1.0-1");
        assert_eq!(identity.os, "linux");
    }

    #[test]
    fn default_options() {
        let options = PackageOptions::default();
        assert_eq!(options.build_host, "localhost");
        assert_eq!(options.file_owner, "root");
        assert_eq!(options.file_digest, Digest::Md5);
        assert_eq!(options.compression_level, 2);
    }
}
