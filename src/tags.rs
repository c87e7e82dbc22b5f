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
 * RPM tag vocabulary.
 *
 * Tag numbers were extracted from the rpm upstream project C headers.  Each
 * tag declares the value type it stores; [`TagStore`](crate::TagStore)
 * rejects values of any other type.  [`CANONICAL_HEADER_ORDER`] records the
 * emission order required for byte-exact output and is kept as data so it
 * can be diffed against reference producers.
 */

use std::fmt;

/// Region pseudo-tag marking the signature section extent.
pub const HEADER_SIGNATURES: u32 = 62;
/// Region pseudo-tag marking the immutable header extent.
pub const HEADER_IMMUTABLE: u32 = 63;

/// Value type of a header structure entry, by on-disk type code.
#[repr(u32)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TagType {
    /// No data.
    Null = 0,
    /// Raw characters.
    Char = 1,
    /// Unsigned 8-bit integers.
    Int8 = 2,
    /// Big-endian unsigned 16-bit integers.
    Int16 = 3,
    /// Big-endian unsigned 32-bit integers.
    Int32 = 4,
    /// Big-endian unsigned 64-bit integers.
    Int64 = 5,
    /// A single NUL-terminated string.
    String = 6,
    /// An opaque byte blob.
    Binary = 7,
    /// A run of NUL-terminated strings.
    StringArray = 8,
    /// Localised strings, one per locale in the i18n table.
    I18nString = 9,
}

impl TagType {
    /// Map an on-disk type code back to a `TagType`.
    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(TagType::Null),
            1 => Some(TagType::Char),
            2 => Some(TagType::Int8),
            3 => Some(TagType::Int16),
            4 => Some(TagType::Int32),
            5 => Some(TagType::Int64),
            6 => Some(TagType::String),
            7 => Some(TagType::Binary),
            8 => Some(TagType::StringArray),
            9 => Some(TagType::I18nString),
            _ => None,
        }
    }

    /// The on-disk type code.
    #[must_use]
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Alignment of this type's values within the section data store.
    #[must_use]
    pub fn alignment(self) -> usize {
        match self {
            TagType::Int16 => 2,
            TagType::Int32 => 4,
            TagType::Int64 => 8,
            _ => 1,
        }
    }
}

impl fmt::Display for TagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TagType::Null => "null",
            TagType::Char => "char",
            TagType::Int8 => "int8",
            TagType::Int16 => "int16",
            TagType::Int32 => "int32",
            TagType::Int64 => "int64",
            TagType::String => "string",
            TagType::Binary => "binary",
            TagType::StringArray => "string array",
            TagType::I18nString => "i18n string",
        };
        write!(f, "{}", name)
    }
}

/// A tag identifier paired with the value type it declares.
///
/// Implemented by [`Tag`] for the main header and [`SigTag`] for the
/// signature section, so that one store type serves both.
pub trait TagId: Copy + fmt::Debug {
    /// Numeric tag code.
    fn code(self) -> u32;
    /// Value type this tag stores.
    fn value_type(self) -> TagType;
}

/// Main header tags.
#[repr(u32)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[allow(missing_docs)]
pub enum Tag {
    HeaderI18nTable = 100,
    Name = 1000,
    Version = 1001,
    Release = 1002,
    Summary = 1004,
    Description = 1005,
    BuildTime = 1006,
    BuildHost = 1007,
    Size = 1009,
    Distribution = 1010,
    Vendor = 1011,
    License = 1014,
    Group = 1016,
    Url = 1020,
    Os = 1021,
    Arch = 1022,
    PostInstall = 1024,
    PostUninstall = 1026,
    FileSizes = 1028,
    FileModes = 1030,
    FileRdevs = 1033,
    FileMtimes = 1034,
    FileDigests = 1035,
    FileLinkTos = 1036,
    FileFlags = 1037,
    FileUserName = 1039,
    FileGroupName = 1040,
    SourceRpm = 1044,
    FileVerifyFlags = 1045,
    ProvideName = 1047,
    RequireFlags = 1048,
    RequireName = 1049,
    RequireVersion = 1050,
    RpmVersion = 1064,
    ChangelogTime = 1080,
    ChangelogName = 1081,
    ChangelogText = 1082,
    PostInstallProg = 1086,
    PostUninstallProg = 1088,
    Cookie = 1094,
    FileDevices = 1095,
    FileInodes = 1096,
    FileLangs = 1097,
    ProvideFlags = 1112,
    ProvideVersion = 1113,
    DirIndexes = 1116,
    BaseNames = 1117,
    DirNames = 1118,
    OptFlags = 1122,
    DistUrl = 1123,
    PayloadFormat = 1124,
    PayloadCompressor = 1125,
    PayloadFlags = 1126,
    Platform = 1132,
    FileColors = 1140,
    FileClass = 1141,
    ClassDict = 1142,
    FileDependsX = 1143,
    FileDependsN = 1144,
    DependsDict = 1145,
    SourcePkgId = 1146,
    FileDigestAlgo = 5011,
    PayloadDigest = 5092,
    PayloadDigestAlgo = 5093,
}

impl TagId for Tag {
    fn code(self) -> u32 {
        self as u32
    }

    fn value_type(self) -> TagType {
        match self {
            Tag::HeaderI18nTable => TagType::StringArray,
            Tag::Name => TagType::String,
            Tag::Version => TagType::String,
            Tag::Release => TagType::String,
            Tag::Summary => TagType::I18nString,
            Tag::Description => TagType::I18nString,
            Tag::BuildTime => TagType::Int32,
            Tag::BuildHost => TagType::String,
            Tag::Size => TagType::Int32,
            Tag::Distribution => TagType::String,
            Tag::Vendor => TagType::String,
            Tag::License => TagType::String,
            Tag::Group => TagType::I18nString,
            Tag::Url => TagType::String,
            Tag::Os => TagType::String,
            Tag::Arch => TagType::String,
            Tag::PostInstall => TagType::String,
            Tag::PostUninstall => TagType::String,
            Tag::FileSizes => TagType::Int32,
            Tag::FileModes => TagType::Int16,
            Tag::FileRdevs => TagType::Int16,
            Tag::FileMtimes => TagType::Int32,
            Tag::FileDigests => TagType::StringArray,
            Tag::FileLinkTos => TagType::StringArray,
            Tag::FileFlags => TagType::Int32,
            Tag::FileUserName => TagType::StringArray,
            Tag::FileGroupName => TagType::StringArray,
            Tag::SourceRpm => TagType::String,
            Tag::FileVerifyFlags => TagType::Int32,
            Tag::ProvideName => TagType::StringArray,
            Tag::RequireFlags => TagType::Int32,
            Tag::RequireName => TagType::StringArray,
            Tag::RequireVersion => TagType::StringArray,
            Tag::RpmVersion => TagType::String,
            Tag::ChangelogTime => TagType::Int32,
            Tag::ChangelogName => TagType::StringArray,
            Tag::ChangelogText => TagType::StringArray,
            Tag::PostInstallProg => TagType::String,
            Tag::PostUninstallProg => TagType::String,
            Tag::Cookie => TagType::String,
            Tag::FileDevices => TagType::Int32,
            Tag::FileInodes => TagType::Int32,
            Tag::FileLangs => TagType::StringArray,
            Tag::ProvideFlags => TagType::Int32,
            Tag::ProvideVersion => TagType::StringArray,
            Tag::DirIndexes => TagType::Int32,
            Tag::BaseNames => TagType::StringArray,
            Tag::DirNames => TagType::StringArray,
            Tag::OptFlags => TagType::String,
            Tag::DistUrl => TagType::String,
            Tag::PayloadFormat => TagType::String,
            Tag::PayloadCompressor => TagType::String,
            Tag::PayloadFlags => TagType::String,
            Tag::Platform => TagType::String,
            Tag::FileColors => TagType::Int32,
            Tag::FileClass => TagType::Int32,
            Tag::ClassDict => TagType::StringArray,
            Tag::FileDependsX => TagType::Int32,
            Tag::FileDependsN => TagType::Int32,
            Tag::DependsDict => TagType::Int32,
            Tag::SourcePkgId => TagType::Binary,
            Tag::FileDigestAlgo => TagType::Int32,
            Tag::PayloadDigest => TagType::StringArray,
            Tag::PayloadDigestAlgo => TagType::Int32,
        }
    }
}

/// Signature section tags.
#[repr(u32)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[allow(missing_docs)]
pub enum SigTag {
    /// DSA signature of the header section.
    Dsa = 267,
    /// RSA signature of the header section.
    Rsa = 268,
    /// SHA1 of the header section, hex encoded.
    Sha1 = 269,
    /// SHA256 of the header section, hex encoded.
    Sha256 = 273,
    /// Combined size of the header section and compressed payload.
    Size = 1000,
    /// RSA signature of the header section and compressed payload.
    Pgp = 1002,
    /// MD5 of the header section and compressed payload, binary.
    Md5 = 1004,
    /// DSA signature of the header section and compressed payload.
    Gpg = 1005,
    /// Uncompressed payload size, including CPIO headers and padding.
    PayloadSize = 1007,
}

impl TagId for SigTag {
    fn code(self) -> u32 {
        self as u32
    }

    fn value_type(self) -> TagType {
        match self {
            SigTag::Dsa => TagType::Binary,
            SigTag::Rsa => TagType::Binary,
            SigTag::Sha1 => TagType::String,
            SigTag::Sha256 => TagType::String,
            SigTag::Size => TagType::Int32,
            SigTag::Pgp => TagType::Binary,
            SigTag::Md5 => TagType::Binary,
            SigTag::Gpg => TagType::Binary,
            SigTag::PayloadSize => TagType::Int32,
        }
    }
}

/// Emission order for main header tags.
///
/// Reference producers write tags in this exact sequence; emitting in any
/// other order changes the section bytes and breaks parity.  Extend only by
/// appending.
pub const CANONICAL_HEADER_ORDER: &[Tag] = &[
    Tag::HeaderI18nTable,
    Tag::Name,
    Tag::Version,
    Tag::Release,
    Tag::Summary,
    Tag::Description,
    Tag::BuildTime,
    Tag::BuildHost,
    Tag::Size,
    Tag::Distribution,
    Tag::Vendor,
    Tag::License,
    Tag::Group,
    Tag::Url,
    Tag::Os,
    Tag::Arch,
    Tag::FileSizes,
    Tag::FileModes,
    Tag::FileRdevs,
    Tag::FileMtimes,
    Tag::FileDigests,
    Tag::FileLinkTos,
    Tag::FileFlags,
    Tag::FileUserName,
    Tag::FileGroupName,
    Tag::SourceRpm,
    Tag::FileVerifyFlags,
    Tag::ProvideName,
    Tag::RequireFlags,
    Tag::RequireName,
    Tag::RequireVersion,
    Tag::RpmVersion,
    Tag::ChangelogTime,
    Tag::ChangelogName,
    Tag::ChangelogText,
    Tag::PostInstallProg,
    Tag::PostUninstallProg,
    Tag::Cookie,
    Tag::FileDevices,
    Tag::FileInodes,
    Tag::FileLangs,
    Tag::ProvideFlags,
    Tag::ProvideVersion,
    Tag::DirIndexes,
    Tag::BaseNames,
    Tag::DirNames,
    Tag::OptFlags,
    Tag::DistUrl,
    Tag::PayloadFormat,
    Tag::PayloadCompressor,
    Tag::PayloadFlags,
    Tag::Platform,
    Tag::FileColors,
    Tag::FileClass,
    Tag::ClassDict,
    Tag::FileDependsX,
    Tag::FileDependsN,
    Tag::DependsDict,
    Tag::SourcePkgId,
    Tag::FileDigestAlgo,
    // Appended extensions.
    Tag::PostInstall,
    Tag::PostUninstall,
    Tag::PayloadDigest,
    Tag::PayloadDigestAlgo,
];

/// Dependency flag for an exact version match.
pub const DEP_EQUAL: u32 = 1 << 3;
/// Dependency flag for a less-than comparison.
pub const DEP_LESS: u32 = 1 << 1;
/// Dependency flag marking an rpmlib(feature) capability.
pub const DEP_RPMLIB: u32 = 1 << 24;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn canonical_order_is_unique() {
        let mut seen = HashSet::new();
        for tag in CANONICAL_HEADER_ORDER {
            assert!(seen.insert(tag.code()), "duplicate tag {:?}", tag);
        }
    }

    #[test]
    fn type_codes_roundtrip() {
        for code in 0..10 {
            let ty = TagType::from_code(code).unwrap();
            assert_eq!(ty.code(), code);
        }
        assert!(TagType::from_code(10).is_none());
    }

    #[test]
    fn alignment_by_type() {
        assert_eq!(TagType::Int16.alignment(), 2);
        assert_eq!(TagType::Int32.alignment(), 4);
        assert_eq!(TagType::Int64.alignment(), 8);
        assert_eq!(TagType::String.alignment(), 1);
        assert_eq!(TagType::Binary.alignment(), 1);
    }
}
