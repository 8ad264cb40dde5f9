//! Append-only exact vector index
//!
//! Every record carries its id, unit vector, and chunk together, so the
//! vector at position `i` can never drift away from the chunk at position `i`.

use crate::error::{Error, Result};
use crate::types::Chunk;

/// Tolerance used when checking that a vector is already unit length
const NORM_TOLERANCE: f32 = 1e-6;

/// One stored vector and the chunk that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRecord {
    /// Stable id, monotonically increasing, never reused
    pub id: u64,
    /// L2-normalized embedding
    pub vector: Vec<f32>,
    /// Source chunk
    pub chunk: Chunk,
}

/// Brute-force cosine index over unit vectors
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dimension: usize,
    records: Vec<IndexRecord>,
    next_id: u64,
}

impl VectorIndex {
    /// Create an empty index; the dimension is fixed from here on
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::Config("index dimension must be > 0".to_string()));
        }
        Ok(Self {
            dimension,
            records: Vec::new(),
            next_id: 0,
        })
    }

    /// Rebuild an index from persisted records
    pub fn from_records(dimension: usize, records: Vec<IndexRecord>, next_id: u64) -> Result<Self> {
        let mut index = Self::new(dimension)?;

        let mut last_id: Option<u64> = None;
        for record in &records {
            if record.vector.len() != dimension {
                return Err(Error::dimension_mismatch(dimension, record.vector.len()));
            }
            if last_id.is_some_and(|last| record.id <= last) {
                return Err(Error::corrupt_state(format!(
                    "record ids not strictly increasing at id {}",
                    record.id
                )));
            }
            last_id = Some(record.id);
        }

        if let Some(last) = last_id {
            if next_id <= last {
                return Err(Error::corrupt_state(format!(
                    "next_id {} does not exceed last record id {}",
                    next_id, last
                )));
            }
        }

        index.records = records;
        index.next_id = next_id;
        Ok(index)
    }

    /// Vector dimension
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Id the next appended record will receive
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// All records in insertion order
    pub fn records(&self) -> &[IndexRecord] {
        &self.records
    }

    /// Record at a position
    pub fn get(&self, position: usize) -> Option<&IndexRecord> {
        self.records.get(position)
    }

    /// Append a vector and its chunk, returning the new record id
    ///
    /// The vector is normalized before storage; vectors of the wrong
    /// dimension or with zero norm are rejected and nothing is appended.
    pub fn add(&mut self, mut vector: Vec<f32>, chunk: Chunk) -> Result<u64> {
        if vector.len() != self.dimension {
            return Err(Error::dimension_mismatch(self.dimension, vector.len()));
        }
        normalize(&mut vector)?;

        let id = self.next_id;
        self.records.push(IndexRecord { id, vector, chunk });
        self.next_id += 1;
        Ok(id)
    }

    /// Top-`k` positions by inner product, descending; ties by insertion order
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimension {
            return Err(Error::dimension_mismatch(self.dimension, query.len()));
        }

        let k = k.min(self.records.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .records
            .iter()
            .enumerate()
            .map(|(position, record)| (position, dot(query, &record.vector)))
            .collect();

        // Stable ordering: score descending, then position ascending
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        Ok(scored)
    }
}

/// Inner product of two equal-length slices
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// L2 norm
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scale a vector to unit length in place
pub fn normalize(v: &mut [f32]) -> Result<()> {
    let norm = l2_norm(v);
    if !norm.is_finite() || norm == 0.0 {
        return Err(Error::embedding("cannot normalize a zero or non-finite vector"));
    }
    if (norm - 1.0).abs() > NORM_TOLERANCE {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
    Ok(())
}
