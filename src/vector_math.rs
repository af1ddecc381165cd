use crate::core::errors::RagError;

pub fn cosine_similarity(query: &[f32], candidate: &[f32]) -> Result<f32, RagError> {
    if query.is_empty() || candidate.is_empty() {
        return Err(RagError::IndexUnavailable(
            "embedding vectors must not be empty".to_string(),
        ));
    }
    if query.len() != candidate.len() {
        return Err(RagError::IndexUnavailable(format!(
            "embedding dimension mismatch: {} != {}",
            query.len(),
            candidate.len()
        )));
    }

    if !query.iter().chain(candidate).all(|v| v.is_finite()) {
        return Err(RagError::IndexUnavailable(
            "embedding vectors contain NaN or infinite values".to_string(),
        ));
    }

    let dot: f32 = query.iter().zip(candidate).map(|(x, y)| x * y).sum();
    let denom = l2_norm(query) * l2_norm(candidate);
    if denom <= f32::EPSILON {
        return Ok(0.0);
    }

    let score = dot / denom;
    if !score.is_finite() {
        return Err(RagError::IndexUnavailable(
            "cosine similarity overflowed".to_string(),
        ));
    }
    Ok(score.clamp(-1.0, 1.0))
}

/// Scores every candidate against `query`, highest first. Equal scores keep
/// their original order.
pub fn rank_descending_by_cosine(
    query: &[f32],
    candidates: &[Vec<f32>],
) -> Result<Vec<(usize, f32)>, RagError> {
    let mut scores = Vec::with_capacity(candidates.len());
    for (idx, candidate) in candidates.iter().enumerate() {
        let score = cosine_similarity(query, candidate)?;
        scores.push((idx, score));
    }

    scores.sort_by(|left, right| right.1.total_cmp(&left.1));
    Ok(scores)
}

pub fn l2_normalize(vector: &mut [f32]) {
    let norm = l2_norm(vector);
    if norm > f32::EPSILON {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}
