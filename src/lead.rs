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
 * The 96-byte lead that starts every RPM file.
 *
 * Most of the lead's information was long ago superseded by the header
 * section; modern tools read only the magic and signature type, but every
 * field is still written for compatibility.
 */

use crate::binio::{ReadBinary, WriteBinary};
use crate::{Error, Result};
use std::io::{Read, Write};

/// Lead size on disk.
pub const LEAD_SIZE: usize = 96;

/// Magic bytes opening every RPM file.
pub const RPM_MAGIC: [u8; 4] = [0xed, 0xab, 0xee, 0xdb];

/// Length of the NUL-padded name field.
const NAME_LEN: usize = 66;

/// Header-style signature section indicator.
const SIGNATURE_TYPE_HEADER: u16 = 5;

/// The fixed structure at the start of an RPM file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Lead {
    /// Format major version, 3.
    pub major: u8,
    /// Format minor version, 0.
    pub minor: u8,
    /// Package type: 0 binary, 1 source.
    pub package_type: u16,
    /// Architecture number, see [`arch_number`].
    pub archnum: u16,
    /// Package name, conventionally `NAME-VERSION-RELEASE`.
    pub name: String,
    /// Operating system number, see [`os_number`].
    pub osnum: u16,
    /// Signature section style; 5 means header-style.
    pub signature_type: u16,
}

impl Lead {
    /// Build a binary-package lead for the given NVR string.
    ///
    /// A name longer than 65 bytes is silently truncated to fit the fixed
    /// field, matching reference producers.
    #[must_use]
    pub fn new(name: &str, archnum: u16, osnum: u16) -> Self {
        Lead {
            major: 3,
            minor: 0,
            package_type: 0,
            archnum,
            name: name.to_string(),
            osnum,
            signature_type: SIGNATURE_TYPE_HEADER,
        }
    }

    /// Serialise the lead.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&RPM_MAGIC)?;
        writer.write_all(&[self.major, self.minor])?;
        writer.write_be_u16(self.package_type)?;
        writer.write_be_u16(self.archnum)?;

        let mut name = [0u8; NAME_LEN];
        let bytes = self.name.as_bytes();
        let len = bytes.len().min(NAME_LEN - 1);
        name[..len].copy_from_slice(&bytes[..len]);
        writer.write_all(&name)?;

        writer.write_be_u16(self.osnum)?;
        writer.write_be_u16(self.signature_type)?;
        writer.write_zeros(16)?;
        Ok(())
    }

    /// Parse and validate a lead.
    pub fn parse<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != RPM_MAGIC {
            return Err(Error::InvalidFormat(format!(
                "not an RPM file, bad magic: {:02x?}",
                magic
            )));
        }

        let mut version = [0u8; 2];
        reader.read_exact(&mut version)?;
        let [major, minor] = version;
        if major != 3 {
            return Err(Error::InvalidFormat(format!(
                "unsupported RPM lead version {}.{}",
                major, minor
            )));
        }

        let package_type = reader.read_be_u16()?;
        let archnum = reader.read_be_u16()?;

        let name_bytes = reader.read_bytes(NAME_LEN)?;
        let nul = name_bytes.iter().position(|&b| b == 0).ok_or_else(|| {
            Error::InvalidFormat("lead name is not NUL-terminated".into())
        })?;
        let name = std::str::from_utf8(&name_bytes[..nul])
            .map_err(|_| Error::InvalidFormat("lead name is not UTF-8".into()))?
            .to_string();

        let osnum = reader.read_be_u16()?;
        let signature_type = reader.read_be_u16()?;
        if signature_type != SIGNATURE_TYPE_HEADER {
            return Err(Error::InvalidFormat(format!(
                "unsupported signature type {}",
                signature_type
            )));
        }
        reader.skip_bytes(16)?;

        Ok(Lead {
            major,
            minor,
            package_type,
            archnum,
            name,
            osnum,
            signature_type,
        })
    }
}

/// Architecture number for the lead, from the rpmrc canonical arch table.
/// Unknown architectures (including `noarch`) take the default of 1.
#[must_use]
pub fn arch_number(arch: &str) -> u16 {
    match arch {
        "i386" | "i486" | "i586" | "i686" | "athlon" | "x86_64" | "amd64" => 1,
        "alpha" => 2,
        "sparc" | "sparc64" => 3,
        "mips" => 4,
        "ppc" => 5,
        "m68k" => 6,
        "ia64" => 9,
        "mipsel" => 11,
        "arm" | "armv6hl" | "armv7hl" => 12,
        "s390" => 14,
        "s390x" => 15,
        "ppc64" | "ppc64le" => 16,
        "sh" => 17,
        "xtensa" => 18,
        "aarch64" => 19,
        "riscv64" => 22,
        _ => 1,
    }
}

/// Operating system number for the lead.  Linux is 1, and unknown systems
/// share the default.
#[must_use]
pub fn os_number(os: &str) -> u16 {
    let _ = os;
    1
}
