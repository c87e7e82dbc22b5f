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
 * Fixed-width binary primitives.
 *
 * RPM on-disk integers are big-endian throughout.  These extension traits
 * provide the field-level accessors used by the lead, section, and CPIO
 * codecs, along with the padding arithmetic both archive layers share.
 */

use std::io::{self, Read, Write};

/// Number of zero bytes required to pad `n` to a 4-byte boundary.
pub fn pad4(n: usize) -> usize {
    (4 - n % 4) % 4
}

/// Number of zero bytes required to pad `n` to an 8-byte boundary.
pub fn pad8(n: usize) -> usize {
    (8 - n % 8) % 8
}

/// Number of zero bytes required to pad `n` to an arbitrary boundary.
pub fn pad_to(n: usize, align: usize) -> usize {
    (align - n % align) % align
}

/// Big-endian read accessors for sequential byte streams.
pub trait ReadBinary: Read {
    /// Read a big-endian `u16`.
    fn read_be_u16(&mut self) -> io::Result<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    /// Read a big-endian `u32`.
    fn read_be_u32(&mut self) -> io::Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    /// Read a big-endian `i32`.
    fn read_be_i32(&mut self) -> io::Result<i32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(i32::from_be_bytes(buf))
    }

    /// Read a big-endian `u64`.
    fn read_be_u64(&mut self) -> io::Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_be_bytes(buf))
    }

    /// Read exactly `len` bytes into a new buffer.
    fn read_bytes(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read and discard exactly `n` bytes.
    fn skip_bytes(&mut self, n: u64) -> io::Result<()> {
        let mut buf = [0u8; 512];
        let mut left = n;
        while left > 0 {
            let chunk = buf.len().min(left as usize);
            self.read_exact(&mut buf[..chunk])?;
            left -= chunk as u64;
        }
        Ok(())
    }
}

impl<R: Read + ?Sized> ReadBinary for R {}

/// Big-endian write accessors for sequential byte streams.
pub trait WriteBinary: Write {
    /// Write a big-endian `u16`.
    fn write_be_u16(&mut self, value: u16) -> io::Result<()> {
        self.write_all(&value.to_be_bytes())
    }

    /// Write a big-endian `u32`.
    fn write_be_u32(&mut self, value: u32) -> io::Result<()> {
        self.write_all(&value.to_be_bytes())
    }

    /// Write a big-endian `i32`.
    fn write_be_i32(&mut self, value: i32) -> io::Result<()> {
        self.write_all(&value.to_be_bytes())
    }

    /// Write a big-endian `u64`.
    fn write_be_u64(&mut self, value: u64) -> io::Result<()> {
        self.write_all(&value.to_be_bytes())
    }

    /// Write `n` zero bytes.
    fn write_zeros(&mut self, n: usize) -> io::Result<()> {
        const ZEROS: [u8; 8] = [0u8; 8];
        let mut left = n;
        while left > 0 {
            let chunk = left.min(ZEROS.len());
            self.write_all(&ZEROS[..chunk])?;
            left -= chunk;
        }
        Ok(())
    }
}

impl<W: Write + ?Sized> WriteBinary for W {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad4_range() {
        for n in 0..64 {
            let p = pad4(n);
            assert!(p < 4);
            assert_eq!((n + p) % 4, 0);
        }
    }

    #[test]
    fn pad8_range() {
        for n in 0..64 {
            let p = pad8(n);
            assert!(p < 8);
            assert_eq!((n + p) % 8, 0);
        }
    }

    #[test]
    fn be_roundtrip() -> io::Result<()> {
        let mut buf = Vec::new();
        buf.write_be_u16(0x0102)?;
        buf.write_be_u32(0x03040506)?;
        buf.write_be_i32(-16)?;
        buf.write_be_u64(0x0708090a0b0c0d0e)?;
        buf.write_zeros(3)?;

        let mut r = buf.as_slice();
        assert_eq!(r.read_be_u16()?, 0x0102);
        assert_eq!(r.read_be_u32()?, 0x03040506);
        assert_eq!(r.read_be_i32()?, -16);
        assert_eq!(r.read_be_u64()?, 0x0708090a0b0c0d0e);
        assert_eq!(r.read_bytes(3)?, vec![0, 0, 0]);
        Ok(())
    }

    #[test]
    fn skip_past_eof() {
        let mut r: &[u8] = &[1, 2, 3];
        assert!(r.skip_bytes(4).is_err());
    }
}
