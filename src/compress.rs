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
 * Streaming payload compression.
 *
 * The RPM payload is an XZ stream; [`Encoder`] and [`Decoder`] wrap the
 * [`xz2`] codec behind plain [`Write`]/[`Read`] implementations so bytes
 * flow through without buffering the whole archive.  Finalisation is
 * explicit: [`Encoder::finish`] flushes the final block and hands back the
 * underlying writer without closing it.  A passthrough variant exists so
 * tests can inspect uncompressed payloads.
 */

use crate::{Error, Result};
use std::fmt;
use std::io::{self, Read, Write};
use xz2::read::XzDecoder;
use xz2::write::XzEncoder;

/// Magic bytes opening an XZ stream.
const XZ_MAGIC: [u8; 6] = [0xfd, b'7', b'z', b'X', b'Z', 0x00];

/// Payload compression format.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Compression {
    /// No compression; bytes pass through unchanged.
    None,
    /// XZ/LZMA2 compression.
    #[default]
    Xz,
}

impl Compression {
    /// Detect compression format from magic bytes.
    #[must_use]
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&XZ_MAGIC) {
            Some(Self::Xz)
        } else {
            None
        }
    }

    /// The name recorded in the payload compressor tag.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Xz => "xz",
        }
    }

    /// Map a payload compressor tag value back to a format.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "none" => Some(Self::None),
            "xz" => Some(Self::Xz),
            _ => None,
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Streaming compression encoder over an underlying writer.
pub enum Encoder<W: Write> {
    /// Passthrough.
    None(W),
    /// XZ stream.
    Xz(XzEncoder<W>),
}

impl<W: Write> Encoder<W> {
    /// Create an encoder for the given format and compression level.
    #[must_use]
    pub fn new(writer: W, compression: Compression, level: u32) -> Self {
        match compression {
            Compression::None => Encoder::None(writer),
            Compression::Xz => Encoder::Xz(XzEncoder::new(writer, level)),
        }
    }

    /// Flush the final block and return the underlying writer.
    ///
    /// The writer itself is not closed.
    pub fn finish(self) -> Result<W> {
        match self {
            Encoder::None(w) => Ok(w),
            Encoder::Xz(e) => e
                .finish()
                .map_err(|e| Error::Compression(e.to_string())),
        }
    }
}

impl<W: Write> Write for Encoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Encoder::None(w) => w.write(buf),
            Encoder::Xz(e) => e.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Encoder::None(w) => w.flush(),
            Encoder::Xz(e) => e.flush(),
        }
    }
}

/// Streaming decompression decoder over an underlying reader.
pub enum Decoder<R: Read> {
    /// Passthrough.
    None(R),
    /// XZ stream.
    Xz(XzDecoder<R>),
}

impl<R: Read> Decoder<R> {
    /// Create a decoder for the given format.
    #[must_use]
    pub fn new(reader: R, compression: Compression) -> Self {
        match compression {
            Compression::None => Decoder::None(reader),
            Compression::Xz => Decoder::Xz(XzDecoder::new(reader)),
        }
    }
}

impl<R: Read> Read for Decoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Decoder::None(r) => r.read(buf),
            Decoder::Xz(d) => d.read(buf),
        }
    }
}

/// Decompress a complete byte buffer.
pub fn decompress(data: &[u8], compression: Compression) -> Result<Vec<u8>> {
    let mut decoder = Decoder::new(data, compression);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::Compression(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xz_roundtrip() -> Result<()> {
        let input = b"the quick brown fox jumps over the lazy dog".repeat(64);

        let mut encoder = Encoder::new(Vec::new(), Compression::Xz, 2);
        encoder.write_all(&input)?;
        let compressed = encoder.finish()?;

        assert_eq!(Compression::from_magic(&compressed), Some(Compression::Xz));
        assert!(compressed.len() < input.len());

        let output = decompress(&compressed, Compression::Xz)?;
        assert_eq!(output, input);
        Ok(())
    }

    #[test]
    fn passthrough_roundtrip() -> Result<()> {
        let input = b"no compression".to_vec();
        let mut encoder = Encoder::new(Vec::new(), Compression::None, 0);
        encoder.write_all(&input)?;
        let out = encoder.finish()?;
        assert_eq!(out, input);
        assert_eq!(decompress(&out, Compression::None)?, input);
        Ok(())
    }

    #[test]
    fn corrupt_stream_fails() {
        let garbage = vec![0xfd, b'7', b'z', b'X', b'Z', 0x00, 1, 2, 3, 4];
        assert!(matches!(
            decompress(&garbage, Compression::Xz),
            Err(Error::Compression(_))
        ));
    }

    #[test]
    fn name_mapping() {
        assert_eq!(Compression::Xz.as_str(), "xz");
        assert_eq!(Compression::from_name("xz"), Some(Compression::Xz));
        assert_eq!(Compression::from_name("gzip"), None);
    }
}
