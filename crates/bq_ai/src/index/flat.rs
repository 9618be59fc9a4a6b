use bq_core::error::AppError;

use super::{IndexHit, VectorIndex, NO_MATCH};
use crate::retrieve::similarity;

const MAGIC: &[u8; 4] = b"BQFI";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

/// Exact inner-product index. Rows are stored contiguously in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIpIndex {
    dims: usize,
    data: Vec<f32>,
}

impl FlatIpIndex {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            data: Vec::new(),
        }
    }

    fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dims..(i + 1) * self.dims]
    }

    /// Binary layout: magic, format version (u32), dims (u32), row count (u64), then rows
    /// of little-endian f32.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.data.len() * 4);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&(self.dims as u32).to_le_bytes());
        out.extend_from_slice(&(self.len() as u64).to_le_bytes());
        for v in &self.data {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AppError> {
        let corrupt = |msg: &str| AppError::new("INDEX_CORRUPT", "Index artifact is corrupt").with_details(msg.to_string());

        if bytes.len() < HEADER_LEN || &bytes[0..4] != MAGIC {
            return Err(corrupt("missing BQFI header"));
        }
        let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if version != FORMAT_VERSION {
            return Err(corrupt(&format!("unsupported format version {version}")));
        }
        let dims = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
        let mut count_bytes = [0u8; 8];
        count_bytes.copy_from_slice(&bytes[12..20]);
        let count = u64::from_le_bytes(count_bytes) as usize;

        let body = &bytes[HEADER_LEN..];
        let expected = count
            .checked_mul(dims)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| corrupt("row count overflow"))?;
        if body.len() != expected {
            return Err(corrupt(&format!(
                "dims={dims}; rows={count}; expected_bytes={expected}; got_bytes={}",
                body.len()
            )));
        }
        if dims == 0 && count > 0 {
            return Err(corrupt("zero-dimensional rows"));
        }

        let data = body
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(Self { dims, data })
    }
}

impl VectorIndex for FlatIpIndex {
    fn dims(&self) -> usize {
        self.dims
    }

    fn len(&self) -> usize {
        if self.dims == 0 {
            0
        } else {
            self.data.len() / self.dims
        }
    }

    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<(), AppError> {
        for (i, v) in vectors.iter().enumerate() {
            if v.len() != self.dims {
                return Err(AppError::new(
                    "INDEX_DIMS_MISMATCH",
                    "Vector dimension does not match index",
                )
                .with_details(format!("position={i}; expected={}; got={}", self.dims, v.len())));
            }
        }
        for v in vectors {
            self.data.extend_from_slice(v);
        }
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<IndexHit>, AppError> {
        if query.len() != self.dims {
            return Err(AppError::new(
                "INDEX_DIMS_MISMATCH",
                "Query dimension does not match index",
            )
            .with_details(format!("expected={}; got={}", self.dims, query.len())));
        }

        let mut scored: Vec<IndexHit> = (0..self.len())
            .map(|i| IndexHit {
                score: similarity::dot(query, self.row(i)),
                row: i as i64,
            })
            .collect();
        // Stable: equal scores keep insertion order.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        while scored.len() < k {
            scored.push(IndexHit {
                score: f32::NEG_INFINITY,
                row: NO_MATCH,
            });
        }
        Ok(scored)
    }
}
