//! Atomic save/load of the vector file and metadata file pair
//!
//! Vector file layout (little-endian):
//!
//! ```text
//! magic "DQRV" | u32 format version | u32 dimension | u64 count
//! count x ( u64 id | dimension x f32 )
//! ```
//!
//! Vector files are named after their content (`vectors-<sha256 prefix>.bin`)
//! and never overwritten in place. `metadata.json` holds the chunk records in
//! the same order, the source registry, and the name and SHA-256 of the
//! vector file it belongs to. Renaming `metadata.json` into place is the only
//! commit point: a crash before it leaves the previous pair untouched, and
//! vector files no metadata refers to are removed after the next commit.

use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::types::{Chunk, DocumentRecord};

use super::index::{IndexRecord, VectorIndex};
use super::metadata::MetadataStore;
use super::KnowledgeBase;

const MAGIC: &[u8; 4] = b"DQRV";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

const VECTORS_PREFIX: &str = "vectors-";
const VECTORS_SUFFIX: &str = ".bin";
const METADATA_FILE: &str = "metadata.json";

/// Serialized chunk metadata, positionally aligned with the vector file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct MetadataEntry {
    id: u64,
    source_path: String,
    chunk_ordinal: u32,
    raw_text: String,
    original_doc_length: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct MetadataFile {
    version: u32,
    dimension: usize,
    vector_count: usize,
    vectors_file: String,
    vectors_sha256: String,
    next_id: u64,
    records: Vec<MetadataEntry>,
    documents: BTreeMap<String, DocumentRecord>,
}

/// Both files fully encoded in memory, ready to be written
#[derive(Debug, Clone)]
pub struct EncodedState {
    /// File name of the vector file, derived from its digest
    pub vectors_file: String,
    pub vectors: Vec<u8>,
    pub metadata: Vec<u8>,
}

/// Reads and writes the knowledge base files in one directory
#[derive(Debug, Clone)]
pub struct PersistenceManager {
    data_dir: PathBuf,
}

impl PersistenceManager {
    /// Create from storage config
    pub fn new(config: &StorageConfig) -> Self {
        Self::in_dir(config.data_dir.clone())
    }

    /// Create over an explicit directory
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Path of the metadata file
    pub fn metadata_path(&self) -> PathBuf {
        self.data_dir.join(METADATA_FILE)
    }

    /// Path of the vector file the committed metadata refers to, if any
    pub fn committed_vectors_path(&self) -> Result<Option<PathBuf>> {
        let metadata_path = self.metadata_path();
        if !metadata_path.exists() {
            return Ok(None);
        }
        let metadata = read_metadata(&std::fs::read(&metadata_path)?)?;
        Ok(Some(self.data_dir.join(metadata.vectors_file)))
    }

    /// Encode a knowledge base into file contents
    pub fn encode(kb: &KnowledgeBase) -> Result<EncodedState> {
        let index = kb.index();
        let dimension = index.dimension();
        let records = index.records();

        let mut buf = BytesMut::with_capacity(HEADER_LEN + records.len() * (8 + 4 * dimension));
        buf.put_slice(MAGIC);
        buf.put_u32_le(FORMAT_VERSION);
        buf.put_u32_le(dimension as u32);
        buf.put_u64_le(records.len() as u64);
        for record in records {
            buf.put_u64_le(record.id);
            for value in &record.vector {
                buf.put_f32_le(*value);
            }
        }
        let vectors = buf.to_vec();
        let digest = hex::encode(Sha256::digest(&vectors));
        let vectors_file = format!("{}{}{}", VECTORS_PREFIX, &digest[..16], VECTORS_SUFFIX);

        let metadata = MetadataFile {
            version: FORMAT_VERSION,
            dimension,
            vector_count: records.len(),
            vectors_file: vectors_file.clone(),
            vectors_sha256: digest,
            next_id: index.next_id(),
            records: records
                .iter()
                .map(|r| MetadataEntry {
                    id: r.id,
                    source_path: r.chunk.source_path.clone(),
                    chunk_ordinal: r.chunk.ordinal,
                    raw_text: r.chunk.text.clone(),
                    original_doc_length: r.chunk.original_doc_length,
                })
                .collect(),
            documents: kb.metadata().documents().clone(),
        };
        let metadata = serde_json::to_vec_pretty(&metadata)?;

        Ok(EncodedState {
            vectors_file,
            vectors,
            metadata,
        })
    }

    /// Write already-encoded contents and commit them
    ///
    /// The vector file lands first under its own name; the metadata rename
    /// then switches readers over. Superseded vector files are removed last.
    pub fn write(&self, state: &EncodedState) -> Result<()> {
        self.stage_vectors(state)?;
        self.commit_metadata(state)?;
        tracing::debug!(
            "Committed {} vector bytes as {}",
            state.vectors.len(),
            state.vectors_file
        );
        self.remove_stale_vectors(&state.vectors_file);
        Ok(())
    }

    fn stage_vectors(&self, state: &EncodedState) -> Result<()> {
        write_atomic(&self.data_dir.join(&state.vectors_file), &state.vectors)
    }

    fn commit_metadata(&self, state: &EncodedState) -> Result<()> {
        write_atomic(&self.metadata_path(), &state.metadata)
    }

    /// Delete vector files other than `keep`; failures only cost disk space
    fn remove_stale_vectors(&self, keep: &str) {
        let entries = match std::fs::read_dir(&self.data_dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Cannot list {}: {}", self.data_dir.display(), e);
                return;
            }
        };

        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name == keep || !is_vectors_file(name) {
                continue;
            }
            match std::fs::remove_file(entry.path()) {
                Ok(()) => tracing::debug!("Removed superseded vector file {}", name),
                Err(e) => tracing::warn!("Cannot remove superseded vector file {}: {}", name, e),
            }
        }
    }

    /// Encode and write in one step
    pub fn save(&self, kb: &KnowledgeBase) -> Result<()> {
        let state = Self::encode(kb)?;
        self.write(&state)
    }

    /// Load the committed pair
    ///
    /// Returns `Ok(None)` when no metadata has been committed (fresh start,
    /// possibly with an orphaned vector file from an interrupted first save)
    /// and `Error::CorruptState` when the committed pair is unreadable or
    /// inconsistent.
    pub fn load(&self) -> Result<Option<KnowledgeBase>> {
        let metadata_path = self.metadata_path();
        if !metadata_path.exists() {
            return Ok(None);
        }

        let metadata = std::fs::read(&metadata_path).map_err(|e| {
            Error::corrupt_state(format!("cannot read {}: {}", metadata_path.display(), e))
        })?;
        let vectors_file = read_metadata(&metadata)?.vectors_file;
        if !is_vectors_file(&vectors_file) {
            return Err(Error::corrupt_state(format!(
                "metadata names an invalid vector file '{}'",
                vectors_file
            )));
        }

        let vectors_path = self.data_dir.join(&vectors_file);
        let vectors = std::fs::read(&vectors_path).map_err(|e| {
            Error::corrupt_state(format!("cannot read {}: {}", vectors_path.display(), e))
        })?;

        Self::decode(&vectors, &metadata).map(Some)
    }

    /// Decode file contents into a knowledge base
    pub fn decode(vectors: &[u8], metadata: &[u8]) -> Result<KnowledgeBase> {
        let metadata = read_metadata(metadata)?;

        let digest = hex::encode(Sha256::digest(vectors));
        if digest != metadata.vectors_sha256 {
            return Err(Error::corrupt_state(
                "vector file does not match the digest recorded in metadata",
            ));
        }

        let (dimension, raw) = decode_vectors(vectors)?;

        if raw.len() != metadata.records.len() || raw.len() != metadata.vector_count {
            return Err(Error::corrupt_state(format!(
                "{} vectors but {} metadata records",
                raw.len(),
                metadata.records.len()
            )));
        }
        if dimension != metadata.dimension {
            return Err(Error::corrupt_state(format!(
                "vector file dimension {} differs from metadata dimension {}",
                dimension, metadata.dimension
            )));
        }

        let mut records = Vec::with_capacity(raw.len());
        for ((id, vector), entry) in raw.into_iter().zip(metadata.records) {
            if id != entry.id {
                return Err(Error::corrupt_state(format!(
                    "vector id {} aligned with metadata id {}",
                    id, entry.id
                )));
            }
            records.push(IndexRecord {
                id,
                vector,
                chunk: Chunk::new(
                    entry.raw_text,
                    entry.source_path,
                    entry.chunk_ordinal,
                    entry.original_doc_length,
                ),
            });
        }

        let index = VectorIndex::from_records(dimension, records, metadata.next_id)
            .map_err(|e| Error::corrupt_state(e.to_string()))?;

        Ok(KnowledgeBase::from_parts(
            index,
            MetadataStore::from_documents(metadata.documents),
        ))
    }
}

fn read_metadata(data: &[u8]) -> Result<MetadataFile> {
    serde_json::from_slice(data)
        .map_err(|e| Error::corrupt_state(format!("unparseable metadata: {}", e)))
}

fn is_vectors_file(name: &str) -> bool {
    name.strip_prefix(VECTORS_PREFIX)
        .and_then(|rest| rest.strip_suffix(VECTORS_SUFFIX))
        .is_some_and(|digest| !digest.is_empty() && digest.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Parse the vector file into `(dimension, [(id, vector)])`
fn decode_vectors(data: &[u8]) -> Result<(usize, Vec<(u64, Vec<f32>)>)> {
    if data.len() < HEADER_LEN {
        return Err(Error::corrupt_state("vector file shorter than its header"));
    }

    let mut buf = data;
    let mut magic = [0u8; 4];
    buf.copy_to_slice(&mut magic);
    if &magic != MAGIC {
        return Err(Error::corrupt_state("vector file has a bad magic number"));
    }

    let version = buf.get_u32_le();
    if version != FORMAT_VERSION {
        return Err(Error::corrupt_state(format!(
            "unsupported vector file version {}",
            version
        )));
    }

    let dimension = buf.get_u32_le() as usize;
    let count = buf.get_u64_le() as usize;
    if dimension == 0 {
        return Err(Error::corrupt_state("vector file declares dimension 0"));
    }

    let record_len = 8 + 4 * dimension;
    let expected = count
        .checked_mul(record_len)
        .ok_or_else(|| Error::corrupt_state("vector count overflows"))?;
    if buf.remaining() != expected {
        return Err(Error::corrupt_state(format!(
            "vector payload is {} bytes, expected {} for {} records",
            buf.remaining(),
            expected,
            count
        )));
    }

    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        let id = buf.get_u64_le();
        let vector: Vec<f32> = (0..dimension).map(|_| buf.get_f32_le()).collect();
        records.push((id, vector));
    }

    Ok((dimension, records))
}

/// Write to a sibling temp file, fsync, then rename over `path`
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
