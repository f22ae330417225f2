use rayon::prelude::*;

use crate::{
    embedding::Embedder,
    embedding_text::build_text,
    error::{Error, Result},
    record::Record,
};

/// File signature of a serialized index.
const MAGIC: &[u8; 4] = b"SMVI";

/// Header size: 4 bytes magic + 4 bytes vector count + 4 bytes dimension.
const HEADER_SIZE: usize = 12;

/// Exact nearest-neighbour index over one collection's embeddings.
///
/// Vector `i` belongs to the record at position `i` of the collection it
/// was built from. The index is never edited in place: any change to the
/// records means building a new one.
///
/// Binary format:
/// - 4 bytes: magic `SMVI`
/// - 4 bytes: vector count N (u32 LE)
/// - 4 bytes: dimension D (u32 LE)
/// - N * D * 4 bytes: f32 LE values in row-major order
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    dimension: usize,
    data: Vec<f32>,
}

/// One search result: a position in the collection and its cosine
/// similarity to the query (higher is more similar).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub similarity: f32,
}

impl VectorIndex {
    /// Embed every record and index the resulting vectors.
    ///
    /// Costs one embedding call per record; there is no incremental path.
    pub fn build(
        records: &[Record],
        embedder: &mut dyn Embedder,
    ) -> Result<Self> {
        let texts: Vec<String> = records.iter().map(build_text).collect();
        let vectors = embedder.embed_batch(&texts)?;
        if vectors.len() != records.len() {
            return Err(Error::Collaborator(format!(
                "embedder returned {} vectors for {} texts",
                vectors.len(),
                records.len()
            )));
        }
        Self::from_vectors(vectors)
    }

    /// Index pre-computed vectors. All vectors must share one dimension.
    pub fn from_vectors(vectors: Vec<Vec<f32>>) -> Result<Self> {
        let count = vectors.len();
        let dimension = vectors.first().map_or(0, Vec::len);
        if count > 0 && dimension == 0 {
            return Err(Error::Collaborator(
                "embedder returned empty vectors".to_string(),
            ));
        }
        let mut data = Vec::with_capacity(vectors.len() * dimension);
        for vector in vectors {
            if vector.len() != dimension {
                return Err(Error::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            data.extend_from_slice(&vector);
        }
        Ok(Self { dimension, data })
    }

    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// The stored vector at `position`.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        if position >= self.len() {
            return None;
        }
        let start = position * self.dimension;
        Some(&self.data[start..start + self.dimension])
    }

    /// The `k` most similar vectors to `query`, most similar first.
    ///
    /// Ties keep index order. An empty index yields no neighbours for any
    /// query.
    pub fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<Neighbor> = (0..self.len())
            .into_par_iter()
            .filter_map(|position| {
                self.vector(position).map(|vector| Neighbor {
                    position,
                    similarity: cosine(query, vector),
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.position.cmp(&b.position))
        });
        scored.truncate(k);
        Ok(scored)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes =
            Vec::with_capacity(HEADER_SIZE + std::mem::size_of_val(&*self.data));
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&(self.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        bytes.extend_from_slice(bytemuck::cast_slice(&self.data));
        bytes
    }

    /// Decode an index written by [`VectorIndex::to_bytes`].
    ///
    /// Returns a description of the problem when the bytes are not a valid
    /// index.
    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, String> {
        if bytes.len() < HEADER_SIZE || &bytes[0..4] != MAGIC {
            return Err("not a vector index file".to_string());
        }
        let count = read_u32(&bytes[4..8]) as usize;
        let dimension = read_u32(&bytes[8..12]) as usize;

        let floats = count
            .checked_mul(dimension)
            .ok_or_else(|| "header size overflows".to_string())?;
        let expected_len = floats
            .checked_mul(4)
            .and_then(|body| body.checked_add(HEADER_SIZE))
            .ok_or_else(|| "header size overflows".to_string())?;
        if bytes.len() != expected_len {
            return Err(format!(
                "expected {expected_len} bytes for {count} vectors of \
                 dimension {dimension}, found {}",
                bytes.len()
            ));
        }
        if count > 0 && dimension == 0 {
            return Err("zero dimension with non-zero count".to_string());
        }

        // Copy into an f32 buffer: the byte slice carries no alignment
        // guarantee.
        let mut data = vec![0f32; floats];
        bytemuck::cast_slice_mut::<f32, u8>(&mut data)
            .copy_from_slice(&bytes[HEADER_SIZE..]);

        Ok(Self { dimension, data })
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}

/// Cosine similarity in [-1, 1]. Zero vectors are similar to nothing.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
