//! Little-endian encoding helpers shared by the persisted indices.
//!
//! Every read is bounds-checked; running off the end of the buffer is an
//! `IndexCorrupt` error, never a panic.

use std::io::{self, Write};
use std::path::Path;

use crate::error::{EngramError, EngramResult};

/// Cursor over a fully read index file.
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn bytes(&mut self, len: usize, what: &str) -> EngramResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(EngramError::corrupt(format!(
                "truncated {} at offset {}: need {} bytes, {} left",
                what,
                self.pos,
                len,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub(crate) fn u8(&mut self, what: &str) -> EngramResult<u8> {
        Ok(self.bytes(1, what)?[0])
    }

    pub(crate) fn u16(&mut self, what: &str) -> EngramResult<u16> {
        let b = self.bytes(2, what)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub(crate) fn u32(&mut self, what: &str) -> EngramResult<u32> {
        let b = self.bytes(4, what)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn f32(&mut self, what: &str) -> EngramResult<f32> {
        let b = self.bytes(4, what)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn string(&mut self, len: usize, what: &str) -> EngramResult<String> {
        let offset = self.pos;
        let raw = self.bytes(len, what)?;
        String::from_utf8(raw.to_vec()).map_err(|_| {
            EngramError::corrupt(format!("invalid UTF-8 in {} at offset {}", what, offset))
        })
    }

    /// Fail unless the whole buffer has been consumed.
    pub(crate) fn finish(&self, what: &str) -> EngramResult<()> {
        if self.remaining() != 0 {
            return Err(EngramError::corrupt(format!(
                "{} trailing bytes after {}",
                self.remaining(),
                what
            )));
        }
        Ok(())
    }
}

/// Capacity hint that cannot be inflated by a corrupt count field.
pub(crate) fn bounded_capacity(count: usize, remaining: usize, min_record: usize) -> usize {
    count.min(remaining / min_record.max(1))
}

pub(crate) fn write_u16<W: Write>(w: &mut W, value: u16) -> io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

pub(crate) fn write_u32<W: Write>(w: &mut W, value: u32) -> io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

pub(crate) fn write_f32s<W: Write>(w: &mut W, values: &[f32]) -> io::Result<()> {
    for v in values {
        w.write_all(&v.to_le_bytes())?;
    }
    Ok(())
}

/// Convert a length to `u32`, rejecting values that do not fit the format.
pub(crate) fn len_u32(len: usize, what: &str) -> EngramResult<u32> {
    u32::try_from(len)
        .map_err(|_| EngramError::corrupt(format!("{} too large for index format: {}", what, len)))
}

/// Read an index file, mapping "not found" to `MissingIndex`.
pub(crate) fn read_index_file(path: &Path, hint: &str) -> EngramResult<Vec<u8>> {
    match std::fs::read(path) {
        Ok(data) => Ok(data),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(EngramError::MissingIndex {
            path: path.to_path_buf(),
            hint: hint.to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}

/// Write `data` next to `path` and rename it into place, so a crash leaves
/// the previous file intact.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> EngramResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let temp_path = path.with_extension("tmp");
    std::fs::write(&temp_path, data)?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}
