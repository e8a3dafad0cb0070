//! Cosine similarity over raw embedding slices.

use tracing::warn;

/// Calculate cosine similarity between two vectors.
///
/// Zero-norm input yields 0.0 rather than an error: a concept with no
/// usable embedding is simply dissimilar to everything. A dimension
/// mismatch (rows written under different models) also yields 0.0 so a
/// stale row can never poison a query.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        warn!(
            left_dim = a.len(),
            right_dim = b.len(),
            "Dimension mismatch in cosine similarity"
        );
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}
