// crates/ragpoint-core/src/runtime/similarity.rs
// ============================================================================
// Module: Ragpoint Similarity
// Description: Vector normalisation, relevance scoring, and top-k ranking.
// Purpose: Shared retrieval math for every vector store backend.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Embeddings are L2-normalised before storage and search. For unit vectors
//! the euclidean distance lies in `[0, 2]`; relevance maps it onto `[0, 1]`
//! as `1 - distance / sqrt(2)`, clamped. Ranking keeps candidates whose
//! relevance meets the threshold, most relevant first, truncated to `k`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::document::ScoredChunk;
use crate::interfaces::VectorStoreError;

// ============================================================================
// SECTION: Vector Math
// ============================================================================

/// Scales `vector` to unit length in place; zero vectors are left untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

/// Euclidean distance between two vectors of equal length.
#[must_use]
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt()
}

/// Relevance of a stored vector to a query, in `[0, 1]`.
#[must_use]
pub fn relevance(query: &[f32], stored: &[f32]) -> f32 {
    (1.0 - l2_distance(query, stored) / std::f32::consts::SQRT_2).clamp(0.0, 1.0)
}

/// Checks that a vector is non-empty, finite, and of the expected dimension.
///
/// # Errors
///
/// Returns [`VectorStoreError::Invalid`] when the vector is unusable.
pub fn check_vector(vector: &[f32], expected: Option<usize>) -> Result<(), VectorStoreError> {
    if vector.is_empty() {
        return Err(VectorStoreError::Invalid("embedding must be non-empty".to_string()));
    }
    if let Some(expected) = expected
        && vector.len() != expected
    {
        return Err(VectorStoreError::Invalid(format!(
            "embedding dimension mismatch: expected {expected}, got {}",
            vector.len()
        )));
    }
    if vector.iter().any(|value| !value.is_finite()) {
        return Err(VectorStoreError::Invalid("embedding contains non-finite values".to_string()));
    }
    Ok(())
}

// ============================================================================
// SECTION: Ranking
// ============================================================================

/// Keeps the `k` most relevant chunks at or above `threshold`.
#[must_use]
pub fn rank(mut scored: Vec<ScoredChunk>, k: usize, threshold: f32) -> Vec<ScoredChunk> {
    scored.retain(|chunk| chunk.score >= threshold);
    scored.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
    scored.truncate(k);
    scored
}

// ============================================================================
// SECTION: Tests
// ============================================================================
