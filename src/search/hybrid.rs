//! Hybrid relevance: a weighted mix of vector similarity and lexical score,
//! with a filename boost on top.

use serde::Serialize;

use super::keyword::{filename_boost, query_terms, Bm25Params, KeywordBreakdown};
use crate::config::SearchConfig;

const DEFAULT_VECTOR_WEIGHT: f32 = 0.7;
const DEFAULT_KEYWORD_WEIGHT: f32 = 0.3;
const DEFAULT_FILENAME_BOOST: f32 = 1.3;

/// A document to rank, with its precomputed vector similarity.
#[derive(Debug, Clone, Default)]
pub struct Candidate {
    pub path: String,
    pub summary: String,
    pub entity_names: Vec<String>,
    pub vector_score: f32,
}

/// A candidate's scores after ranking.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCandidate {
    /// Position in the input list
    pub index: usize,
    pub path: String,
    pub vector_score: f32,
    pub keyword_score: f32,
    pub score: f32,
}

/// Weights normalised to sum to 1. Negative or non-finite inputs count as
/// zero; if nothing is left the defaults apply.
pub fn normalize_weights(vector: f32, keyword: f32) -> (f32, f32) {
    let clean = |w: f32| if w.is_finite() && w > 0.0 { w } else { 0.0 };
    let (v, k) = (clean(vector), clean(keyword));
    let total = v + k;
    if total <= 0.0 || !total.is_finite() {
        return (DEFAULT_VECTOR_WEIGHT, DEFAULT_KEYWORD_WEIGHT);
    }
    (v / total, k / total)
}

#[derive(Debug, Clone)]
pub struct HybridScorer {
    vector_weight: f32,
    keyword_weight: f32,
    params: Bm25Params,
    boost_factor: f32,
}

impl Default for HybridScorer {
    fn default() -> Self {
        Self::new(DEFAULT_VECTOR_WEIGHT, DEFAULT_KEYWORD_WEIGHT)
    }
}

impl HybridScorer {
    pub fn new(vector_weight: f32, keyword_weight: f32) -> Self {
        let (vector_weight, keyword_weight) = normalize_weights(vector_weight, keyword_weight);
        Self {
            vector_weight,
            keyword_weight,
            params: Bm25Params::default(),
            boost_factor: DEFAULT_FILENAME_BOOST,
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(config.vector_weight, config.keyword_weight)
            .with_bm25(Bm25Params {
                k1: config.k1,
                b: config.b,
            })
            .with_filename_boost(config.filename_boost)
    }

    pub fn with_bm25(mut self, params: Bm25Params) -> Self {
        self.params = params;
        self
    }

    pub fn with_filename_boost(mut self, factor: f32) -> Self {
        self.boost_factor = factor;
        self
    }

    pub fn weights(&self) -> (f32, f32) {
        (self.vector_weight, self.keyword_weight)
    }

    /// Lexical score of `doc` for pre-extracted query terms.
    pub fn keyword_score(&self, terms: &[String], doc: &Candidate) -> f32 {
        KeywordBreakdown::compute(terms, &doc.path, &doc.summary, &doc.entity_names, self.params)
            .combined()
    }

    fn score_terms(&self, terms: &[String], doc: &Candidate) -> (f32, f32) {
        let keyword = self.keyword_score(terms, doc);
        let vector = if doc.vector_score.is_finite() {
            doc.vector_score.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let base = self.vector_weight * vector + self.keyword_weight * keyword;
        let score = filename_boost(terms, &doc.path, base, self.boost_factor);
        (keyword, score.clamp(0.0, 1.0))
    }

    /// Combined score in [0, 1].
    pub fn score(&self, query: &str, doc: &Candidate) -> f32 {
        self.score_terms(&query_terms(query), doc).1
    }

    /// Rank by combined score, highest first; ties keep input order.
    pub fn rank(&self, query: &str, candidates: &[Candidate]) -> Vec<ScoredCandidate> {
        let terms = query_terms(query);
        let mut scored: Vec<ScoredCandidate> = candidates
            .iter()
            .enumerate()
            .map(|(index, doc)| {
                let (keyword_score, score) = self.score_terms(&terms, doc);
                ScoredCandidate {
                    index,
                    path: doc.path.clone(),
                    vector_score: doc.vector_score,
                    keyword_score,
                    score,
                }
            })
            .collect();
        // sort_by is stable
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(path: &str, summary: &str, names: &[&str], vector_score: f32) -> Candidate {
        Candidate {
            path: path.into(),
            summary: summary.into(),
            entity_names: names.iter().map(|s| s.to_string()).collect(),
            vector_score,
        }
    }

    #[test]
    fn test_normalize_weights() {
        assert_eq!(normalize_weights(7.0, 3.0), (0.7, 0.3));
        let (v, k) = normalize_weights(1.0, 1.0);
        assert!((v - 0.5).abs() < 1e-6 && (k - 0.5).abs() < 1e-6);
        assert_eq!(normalize_weights(0.0, 0.0), (0.7, 0.3));
        assert_eq!(normalize_weights(-1.0, 2.0), (0.0, 1.0));
        assert_eq!(normalize_weights(f32::NAN, f32::INFINITY), (0.7, 0.3));
    }

    #[test]
    fn test_empty_query_uses_vector_only() {
        let scorer = HybridScorer::default();
        let d = doc("src/parser.rs", "parses things", &["Parser"], 0.8);
        assert_eq!(scorer.keyword_score(&[], &d), 0.0);
        assert!((scorer.score("", &d) - 0.7 * 0.8).abs() < 1e-6);
        assert!((scorer.score("the of and", &d) - 0.7 * 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_score_bounds() {
        let scorer = HybridScorer::new(5.0, 5.0).with_filename_boost(3.0);
        let docs = [
            doc("parser/parser.rs", "parser parser parser", &["parser"], 1.0),
            doc("x.rs", "", &[], -0.4),
            doc("y.rs", "", &[], 7.0),
            doc("z.rs", "", &[], f32::NAN),
        ];
        for query in ["parser", "", "parser unrelated words here", "!!!"] {
            for d in &docs {
                let s = scorer.score(query, d);
                assert!((0.0..=1.0).contains(&s), "{} for {:?}", s, d.path);
            }
        }
    }

    #[test]
    fn test_filename_match_ranks_higher() {
        let scorer = HybridScorer::default();
        let ranked = scorer.rank(
            "rdb parser",
            &[
                doc("src/util.ts", "helpers", &[], 0.6),
                doc("src/rdb-parser.ts", "reads rdb dumps", &["RdbParser"], 0.6),
            ],
        );
        assert_eq!(ranked[0].path, "src/rdb-parser.ts");
        assert_eq!(ranked[0].index, 1);
        assert!(ranked[0].keyword_score > 0.0);
    }

    #[test]
    fn test_rank_is_stable_on_ties() {
        let scorer = HybridScorer::default();
        let docs: Vec<_> = ["a.rs", "b.rs", "c.rs"]
            .iter()
            .map(|p| doc(p, "", &[], 0.5))
            .collect();
        let ranked = scorer.rank("zzz", &docs);
        let order: Vec<_> = ranked.iter().map(|r| r.index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_from_config() {
        let config = SearchConfig {
            vector_weight: 2.0,
            keyword_weight: 2.0,
            ..Default::default()
        };
        let scorer = HybridScorer::from_config(&config);
        assert_eq!(scorer.weights(), (0.5, 0.5));
    }
}
