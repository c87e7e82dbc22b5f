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
 * Digest hashing over package byte ranges.  The [`Digest`] module is a thin
 * wrapper around the [`digest`] crate and the [`hashes`] provided by the
 * [`RustCrypto`] project, restricted to the three algorithms the RPM format
 * records: MD5 for per-file and whole-package checksums, and SHA1/SHA256
 * over the header section.
 *
 * Digests are produced either as lowercase hex strings (the form stored in
 * string tags) or as raw bytes (the form stored in binary tags).
 *
 * [`RustCrypto`]: https://github.com/RustCrypto
 * [`digest`]: https://docs.rs/digest/latest/digest/
 * [`hashes`]: https://github.com/RustCrypto/hashes
 */

use crate::Result;
use std::fmt;
use std::io::Read;
use std::str::FromStr;

/**
 * The [`Digest`] enum contains an entry for every digest algorithm the RPM
 * format uses.  All of the algorithms are from the RustCrypto [`hashes`]
 * collection.
 *
 * [`hashes`]: https://github.com/RustCrypto/hashes
 */
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Digest {
    /**
     * `MD5` hash support using `Md5` from the [`md-5`] crate.
     *
     * [`md-5`]: https://docs.rs/md-5/
     */
    #[default]
    Md5,
    /**
     * `SHA1` hash support using `Sha1` from the [`sha1`] crate.
     *
     * [`sha1`]: https://docs.rs/sha1/
     */
    Sha1,
    /**
     * `SHA256` hash support using `Sha256` from the [`sha2`] crate.
     *
     * [`sha2`]: https://docs.rs/sha2/
     */
    Sha256,
}

fn to_hex(raw: &[u8]) -> String {
    raw.iter().fold(String::new(), |mut output, b| {
        output.push_str(&format!("{b:02x}"));
        output
    })
}

fn digest_parts_internal<D: digest::Digest>(parts: &[&[u8]]) -> Vec<u8> {
    let mut hasher = D::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().to_vec()
}

fn digest_reader_internal<R: Read, D: digest::Digest + std::io::Write>(
    reader: &mut R,
) -> Result<Vec<u8>> {
    let mut hasher = D::new();
    std::io::copy(reader, &mut hasher)?;
    Ok(hasher.finalize().to_vec())
}

impl Digest {
    /**
     * Hash one or more byte ranges as a single message, returning the raw
     * digest.  This is the form binary tags store; the whole-package MD5
     * covers the header section followed by the compressed payload.
     */
    #[must_use]
    pub fn digest_parts(&self, parts: &[&[u8]]) -> Vec<u8> {
        match self {
            Digest::Md5 => digest_parts_internal::<md5::Md5>(parts),
            Digest::Sha1 => digest_parts_internal::<sha1::Sha1>(parts),
            Digest::Sha256 => digest_parts_internal::<sha2::Sha256>(parts),
        }
    }

    /**
     * Hash a byte slice, returning the raw digest.
     */
    #[must_use]
    pub fn digest_bytes(&self, data: &[u8]) -> Vec<u8> {
        self.digest_parts(&[data])
    }

    /**
     * Hash a byte slice, returning a lowercase hex string.  This is the
     * form string tags such as the per-file digests store.
     */
    #[must_use]
    pub fn hash_bytes(&self, data: &[u8]) -> String {
        to_hex(&self.digest_bytes(data))
    }

    /**
     * Hash one or more byte ranges as a single message, returning a
     * lowercase hex string.
     */
    #[must_use]
    pub fn hash_parts(&self, parts: &[&[u8]]) -> String {
        to_hex(&self.digest_parts(parts))
    }

    /**
     * Hash the full contents of a reader, returning a lowercase hex string.
     */
    pub fn hash_reader<R: Read>(&self, reader: &mut R) -> Result<String> {
        let raw = match self {
            Digest::Md5 => digest_reader_internal::<_, md5::Md5>(reader),
            Digest::Sha1 => digest_reader_internal::<_, sha1::Sha1>(reader),
            Digest::Sha256 => digest_reader_internal::<_, sha2::Sha256>(reader),
        }?;
        Ok(to_hex(&raw))
    }

    /**
     * The algorithm identifier recorded by the file digest tag.  The values
     * follow the OpenPGP hash registry: MD5 is 1, SHA1 is 2, SHA256 is 8.
     */
    #[must_use]
    pub fn algorithm_id(&self) -> u32 {
        match self {
            Digest::Md5 => 1,
            Digest::Sha1 => 2,
            Digest::Sha256 => 8,
        }
    }
}

impl FromStr for Digest {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "md5" => Ok(Digest::Md5),
            "sha1" => Ok(Digest::Sha1),
            "sha256" => Ok(Digest::Sha256),
            _ => Err(crate::Error::InvalidField(format!(
                "unsupported digest: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Digest::Md5 => write!(f, "MD5"),
            Digest::Sha1 => write!(f, "SHA1"),
            Digest::Sha256 => write!(f, "SHA256"),
        }
    }
}

/**
 * Signature algorithm of a [`Signer`], selecting which signature tags the
 * assembler records.
 */
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SignatureAlgorithm {
    /// RSA; stored under the RSA (header) and PGP (header plus payload) tags.
    Rsa,
    /// DSA; stored under the DSA (header) and GPG (header plus payload) tags.
    Dsa,
}

/**
 * Produces detached OpenPGP signatures over package byte ranges.
 *
 * Key handling stays outside this crate: implementations wrap whatever
 * signing backend the caller uses and return the raw signature packet
 * bytes, which the assembler stores verbatim in the signature section.
 */
pub trait Signer {
    /// Which signature algorithm this signer produces.
    fn algorithm(&self) -> SignatureAlgorithm;

    /// Sign `data`, returning the detached signature bytes.
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_str_known_values() {
        assert_eq!(
            Digest::Md5.hash_bytes(b"hello\n"),
            "b1946ac92492d2347c6235b4d2611184"
        );
        assert_eq!(
            Digest::Sha1.hash_bytes(b"hello there"),
            "6e71b3cac15d32fe2d36c270887df9479c25c640"
        );
        assert_eq!(
            Digest::Sha256.hash_bytes(b"hello\n"),
            "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
        );
    }

    #[test]
    fn digest_parts_concatenate() {
        let joined = Digest::Md5.hash_bytes(b"headerpayload");
        let parts = Digest::Md5.hash_parts(&[b"header", b"payload"]);
        assert_eq!(joined, parts);
    }

    #[test]
    fn digest_reader_matches_bytes() -> crate::Result<()> {
        let data = b"some longer buffer of bytes".to_vec();
        let mut reader = data.as_slice();
        assert_eq!(
            Digest::Sha256.hash_reader(&mut reader)?,
            Digest::Sha256.hash_bytes(&data)
        );
        Ok(())
    }

    #[test]
    fn digest_invalid_name() {
        assert!(Digest::from_str("moo").is_err());
    }

    #[test]
    fn digest_algorithm_ids() {
        assert_eq!(Digest::Md5.algorithm_id(), 1);
        assert_eq!(Digest::Sha1.algorithm_id(), 2);
        assert_eq!(Digest::Sha256.algorithm_id(), 8);
    }
}
