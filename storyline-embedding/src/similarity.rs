//! Vector similarity calculations

use ndarray::ArrayView1;
use tracing::warn;

/// Calculate cosine similarity between two embeddings
///
/// Formula: cos(θ) = (A · B) / (||A|| ||B||)
///
/// Vectors of different lengths are compared over their common prefix.
/// Returns 0.0 when either norm is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let len = a.len().min(b.len());

    let a_view = ArrayView1::from(&a[..len]);
    let b_view = ArrayView1::from(&b[..len]);

    let dot_product = a_view.dot(&b_view) as f64;
    let norm_a = (a_view.dot(&a_view) as f64).sqrt();
    let norm_b = (b_view.dot(&b_view) as f64).sqrt();

    // Avoid division by zero
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Online mean update of a cluster centroid
///
/// `prior_count` is the number of members already averaged into `prev`.
/// Without a previous centroid the result is a copy of `next`. When the
/// dimensions differ the centroid is truncated to the shorter length.
pub fn running_average_embedding(prev: Option<&[f32]>, next: &[f32], prior_count: usize) -> Vec<f32> {
    let Some(prev) = prev else {
        return next.to_vec();
    };

    if prev.len() != next.len() {
        warn!(
            "Embedding dimension mismatch in centroid update ({} vs {}), truncating",
            prev.len(),
            next.len()
        );
    }

    let n = prior_count as f64;
    prev.iter()
        .zip(next)
        .map(|(p, x)| ((*p as f64 * n + *x as f64) / (n + 1.0)) as f32)
        .collect()
}
