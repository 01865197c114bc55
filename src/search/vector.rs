use crate::storage::{EmbeddingRecord, FileRecord};

/// Cosine similarity of two vectors; 0.0 for mismatched widths or zero
/// vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut na, mut nb) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

/// Best vector match of a file against a query vector.
#[derive(Debug, Clone, Copy, Default)]
pub struct VectorMatch<'a> {
    /// Clamped to [0, 1]
    pub score: f32,
    /// Best-matching code unit, if it beat the summary vector
    pub unit: Option<&'a EmbeddingRecord>,
}

/// Maximum similarity over the file's code units and its summary vector.
pub fn file_vector_score<'a>(query: &[f32], file: &'a FileRecord) -> VectorMatch<'a> {
    let mut best = VectorMatch::default();

    for record in &file.embeddings {
        let score = cosine_similarity(query, &record.vector);
        if score > best.score {
            best = VectorMatch {
                score,
                unit: Some(record),
            };
        }
    }
    if let Some(summary) = &file.summary_vector {
        let score = cosine_similarity(query, summary);
        if score > best.score {
            best = VectorMatch { score, unit: None };
        }
    }

    best.score = best.score.clamp(0.0, 1.0);
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::EmbeddingKind;

    fn unit(name: &str, vector: Vec<f32>) -> EmbeddingRecord {
        EmbeddingRecord {
            kind: EmbeddingKind::Function,
            name: name.into(),
            source_text: String::new(),
            vector,
            line_start: 1,
            line_end: 2,
            chunk_index: None,
            total_chunks: None,
        }
    }

    #[test]
    fn test_cosine() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_file_score_takes_max_and_clamps() {
        let mut file = FileRecord::new("r", "a.py", None, String::new(), String::new());
        file.embeddings = vec![unit("far", vec![0.0, 1.0]), unit("near", vec![1.0, 0.1])];
        let m = file_vector_score(&[1.0, 0.0], &file);
        assert_eq!(m.unit.map(|u| u.name.as_str()), Some("near"));
        assert!(m.score > 0.9 && m.score <= 1.0);

        file.summary_vector = Some(vec![1.0, 0.0]);
        let m = file_vector_score(&[1.0, 0.0], &file);
        assert!(m.unit.is_none());

        let flipped = FileRecord {
            embeddings: vec![unit("x", vec![1.0, 0.0])],
            ..file
        };
        let opposite = file_vector_score(&[-1.0, 0.0], &flipped);
        assert_eq!(opposite.score, 0.0);
    }
}
