//! Binary persistence for the vector index.
//!
//! File format (all integers little-endian, floats IEEE-754 LE):
//!
//! ```text
//! magic "ENGRAM_VEC" (10) | version u8
//! word section: count u32 | dimension u32 | count × { key_len u32 | key | dimension × f32 }
//! doc section:  count u32 | dimension u32 | count × { key_len u32 | key | dimension × f32 | hash_len u8 | hash }
//! ```
//!
//! The document section is last, so a document upsert rewrites only the
//! tail of the file. The tail is truncated before it is rewritten: a crash
//! mid-write leaves a short file that the loader rejects.

use std::fs::OpenOptions;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::binary::{
    bounded_capacity, len_u32, read_index_file, write_atomic, write_f32s, write_u32, ByteReader,
};
use crate::error::{EngramError, EngramResult};

use super::index::{DocVector, VectorIndex};

pub const VECTOR_MAGIC: &[u8; 10] = b"ENGRAM_VEC";
pub const VECTOR_VERSION: u8 = 1;

const REBUILD_HINT: &str = "re-import embeddings and rebuild document vectors";

impl VectorIndex {
    fn write_words<W: Write>(&self, w: &mut W) -> EngramResult<()> {
        let mut words: Vec<(&String, &Vec<f32>)> = self.word_vectors.iter().collect();
        words.sort_by(|a, b| a.0.cmp(b.0));

        write_u32(w, len_u32(words.len(), "word count")?)?;
        write_u32(w, len_u32(self.dimension, "dimension")?)?;
        for (key, vector) in words {
            write_u32(w, len_u32(key.len(), "word key")?)?;
            w.write_all(key.as_bytes())?;
            write_f32s(w, vector)?;
        }
        Ok(())
    }

    fn write_documents<W: Write>(&self, w: &mut W) -> EngramResult<()> {
        write_u32(w, len_u32(self.doc_vectors.len(), "document count")?)?;
        write_u32(w, len_u32(self.dimension, "dimension")?)?;
        for (id, doc) in &self.doc_vectors {
            write_u32(w, len_u32(id.len(), "document id")?)?;
            w.write_all(id.as_bytes())?;
            write_f32s(w, &doc.vector)?;
            let hash = doc.content_hash.as_deref().unwrap_or("");
            let hash_len = u8::try_from(hash.len()).map_err(|_| {
                EngramError::corrupt(format!("content hash of '{}' exceeds 255 bytes", id))
            })?;
            w.write_all(&[hash_len])?;
            w.write_all(hash.as_bytes())?;
        }
        Ok(())
    }

    /// Serialize the whole index. Returns the bytes and the document-section offset.
    pub fn to_bytes(&self) -> EngramResult<(Vec<u8>, u64)> {
        let mut out = Vec::new();
        out.extend_from_slice(VECTOR_MAGIC);
        out.push(VECTOR_VERSION);
        self.write_words(&mut out)?;
        let offset = out.len() as u64;
        self.write_documents(&mut out)?;
        Ok((out, offset))
    }

    /// Decode and validate a full index file.
    pub fn from_bytes(data: &[u8], path: &Path) -> EngramResult<Self> {
        if data.len() < VECTOR_MAGIC.len() || &data[..VECTOR_MAGIC.len()] != VECTOR_MAGIC {
            return Err(EngramError::Format {
                path: path.to_path_buf(),
                reason: "bad magic (expected ENGRAM_VEC)".to_string(),
            });
        }
        let mut r = ByteReader::new(data);
        r.bytes(VECTOR_MAGIC.len(), "magic")?;
        let version = r.u8("version")?;
        if version != VECTOR_VERSION {
            return Err(EngramError::Format {
                path: path.to_path_buf(),
                reason: format!(
                    "unsupported version {} (expected {})",
                    version, VECTOR_VERSION
                ),
            });
        }

        let mut index = VectorIndex::new();

        let (word_count, word_dim) = section_header(&mut r, "word")?;
        index.dimension = word_dim;
        let word_record = 4 + word_dim * 4;
        index.word_vectors.reserve(bounded_capacity(
            word_count,
            r.remaining(),
            word_record + 1,
        ));
        for _ in 0..word_count {
            let key_len = r.u32("word key length")? as usize;
            let key = r.string(key_len, "word key")?;
            let vector = read_vector(&mut r, word_dim, "word vector")?;
            index.word_vectors.insert(key, vector);
        }

        let offset = r.position() as u64;
        let (doc_count, doc_dim) = section_header(&mut r, "document")?;
        if doc_count > 0 {
            if word_count > 0 && doc_dim != word_dim {
                return Err(EngramError::DimensionMismatch {
                    expected: word_dim,
                    found: doc_dim,
                });
            }
            index.dimension = doc_dim;
        }
        for _ in 0..doc_count {
            let key_len = r.u32("document id length")? as usize;
            let id = r.string(key_len, "document id")?;
            let vector = read_vector(&mut r, doc_dim, "document vector")?;
            let hash_len = r.u8("content hash length")? as usize;
            let hash = r.string(hash_len, "content hash")?;
            index.doc_vectors.insert(
                id,
                DocVector {
                    vector,
                    content_hash: (!hash.is_empty()).then_some(hash),
                },
            );
        }
        r.finish("document section")?;

        if index.word_vectors.len() != word_count || index.doc_vectors.len() != doc_count {
            return Err(EngramError::corrupt("duplicate keys in vector index"));
        }

        index.doc_section_offset = Some(offset);
        Ok(index)
    }

    /// Persist the full index via temp file + rename.
    pub fn save(&mut self, path: &Path) -> EngramResult<()> {
        let (bytes, offset) = self.to_bytes()?;
        write_atomic(path, &bytes)?;
        self.doc_section_offset = Some(offset);
        info!(
            path = %path.display(),
            words = self.word_count(),
            documents = self.document_count(),
            dimension = self.dimension,
            "Saved vector index"
        );
        Ok(())
    }

    pub fn load(path: &Path) -> EngramResult<Self> {
        let data = read_index_file(path, REBUILD_HINT)?;
        let index = Self::from_bytes(&data, path)?;
        debug!(
            path = %path.display(),
            words = index.word_count(),
            documents = index.document_count(),
            "Loaded vector index"
        );
        Ok(index)
    }

    /// Rewrite only the document section of `path`.
    ///
    /// Falls back to a full save when the file does not exist yet or this
    /// index was never saved to / loaded from disk.
    pub fn save_documents(&mut self, path: &Path) -> EngramResult<()> {
        let offset = match self.doc_section_offset {
            Some(offset) if path.exists() => offset,
            _ => return self.save(path),
        };

        let file = OpenOptions::new().write(true).open(path)?;
        if file.metadata()?.len() < offset {
            return Err(EngramError::corrupt(format!(
                "{} is shorter than its word section",
                path.display()
            )));
        }
        file.set_len(offset)?;
        let mut writer = BufWriter::new(file);
        writer.seek(SeekFrom::Start(offset))?;
        self.write_documents(&mut writer)?;
        writer.flush()?;

        debug!(
            path = %path.display(),
            documents = self.document_count(),
            offset,
            "Rewrote document section"
        );
        Ok(())
    }
}

fn section_header(r: &mut ByteReader<'_>, what: &str) -> EngramResult<(usize, usize)> {
    let count = r.u32(&format!("{} count", what))? as usize;
    let dimension = r.u32(&format!("{} dimension", what))? as usize;
    if count > 0 && dimension == 0 {
        return Err(EngramError::corrupt(format!(
            "{} section has {} entries but dimension 0",
            what, count
        )));
    }
    let min_record = 4usize.saturating_add(dimension.saturating_mul(4));
    if count.saturating_mul(min_record) > r.remaining() {
        return Err(EngramError::corrupt(format!(
            "{} count {} exceeds remaining {} bytes",
            what,
            count,
            r.remaining()
        )));
    }
    Ok((count, dimension))
}

fn read_vector(r: &mut ByteReader<'_>, dimension: usize, what: &str) -> EngramResult<Vec<f32>> {
    let mut v = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        v.push(r.f32(what)?);
    }
    Ok(v)
}
