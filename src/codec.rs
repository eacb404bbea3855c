//! Minimal DER-subset reader/writer backing the canonical encodings.
//!
//! Only the two forms the crate's structured values need are supported:
//! SEQUENCE and OCTET STRING, always with definite, minimal-length headers.
//! This keeps the encoding canonical: a given value has exactly one valid
//! byte representation.

use alloc::vec::Vec;

use crate::Error;

pub(crate) const TAG_SEQUENCE: u8 = 0x30;
pub(crate) const TAG_OCTET_STRING: u8 = 0x04;

/// Number of bytes a TLV with `content` content bytes occupies.
pub(crate) fn tlv_len(content: usize) -> usize {
    1 + len_len(content) + content
}

fn len_len(content: usize) -> usize {
    if content < 0x80 {
        1
    } else {
        1 + (usize::BITS as usize / 8 - (content.leading_zeros() as usize / 8))
    }
}

pub(crate) fn write_header(out: &mut Vec<u8>, tag: u8, content: usize) {
    out.push(tag);
    if content < 0x80 {
        out.push(content as u8);
    } else {
        let bytes = content.to_be_bytes();
        let skip = content.leading_zeros() as usize / 8;
        out.push(0x80 | (bytes.len() - skip) as u8);
        out.extend_from_slice(&bytes[skip..]);
    }
}

pub(crate) fn write_octet_string(out: &mut Vec<u8>, content: &[u8]) {
    write_header(out, TAG_OCTET_STRING, content.len());
    out.extend_from_slice(content);
}

/// Strict TLV reader over a byte slice.
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Reader { buf }
    }

    fn read_header(&mut self, tag: u8) -> Result<usize, Error> {
        if self.buf.len() < 2 || self.buf[0] != tag {
            return Err(Error::InvalidInput);
        }
        let first = self.buf[1];
        let (len, consumed) = if first < 0x80 {
            (first as usize, 2)
        } else {
            let n = (first & 0x7f) as usize;
            if n == 0 || n > usize::BITS as usize / 8 || self.buf.len() < 2 + n {
                return Err(Error::InvalidInput);
            }
            let mut len = 0usize;
            for &b in &self.buf[2..2 + n] {
                len = (len << 8) | b as usize;
            }
            // Reject non-minimal encodings.
            if len < 0x80 || self.buf[2] == 0 {
                return Err(Error::InvalidInput);
            }
            (len, 2 + n)
        };
        if self.buf.len() < consumed + len {
            return Err(Error::InvalidInput);
        }
        self.buf = &self.buf[consumed..];
        Ok(len)
    }

    /// Reads a SEQUENCE header and returns a reader over its content.
    pub(crate) fn read_sequence(&mut self) -> Result<Reader<'a>, Error> {
        let len = self.read_header(TAG_SEQUENCE)?;
        let (content, rest) = self.buf.split_at(len);
        self.buf = rest;
        Ok(Reader::new(content))
    }

    pub(crate) fn read_octet_string(&mut self) -> Result<&'a [u8], Error> {
        let len = self.read_header(TAG_OCTET_STRING)?;
        let (content, rest) = self.buf.split_at(len);
        self.buf = rest;
        Ok(content)
    }

    pub(crate) fn read_octet_array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let content = self.read_octet_string()?;
        if content.len() != N {
            return Err(Error::InvalidInput);
        }
        let mut out = [0u8; N];
        out.copy_from_slice(content);
        Ok(out)
    }

    /// Fails unless every byte of the input has been consumed.
    pub(crate) fn finish(&self) -> Result<(), Error> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidInput)
        }
    }
}

/// Encodes a SEQUENCE whose content is already assembled.
pub(crate) fn wrap_sequence(content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(tlv_len(content.len()));
    write_header(&mut out, TAG_SEQUENCE, content.len());
    out.extend_from_slice(content);
    out
}
