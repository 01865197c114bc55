//! Lexical scoring: simplified BM25 over a document's path, summary and
//! entity names.
//!
//! There are no corpus statistics; every term has an IDF of 1.0 and each
//! facet carries its own fixed average length.

use std::collections::{HashMap, HashSet};

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "as", "is", "was", "are", "been", "be", "have", "has", "had", "do", "does", "did",
    "will", "would", "could", "should", "may", "might", "can", "this", "that", "these", "those",
    "how", "what", "where", "when", "why", "who", "which",
];

const MIN_TERM_LEN: usize = 2;

pub const PATH_AVGDL: f32 = 10.0;
pub const SUMMARY_AVGDL: f32 = 100.0;
pub const NAMES_AVGDL: f32 = 20.0;

const PATH_WEIGHT: f32 = 0.5;
const SUMMARY_WEIGHT: f32 = 0.3;
const NAMES_WEIGHT: f32 = 0.2;

/// Lowercase, split on anything that is not alphanumeric, drop stop words
/// and one-character tokens. Duplicates are kept.
pub fn extract_terms(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= MIN_TERM_LEN && !STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// Distinct query terms in first-seen order.
pub fn query_terms(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    extract_terms(query)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

/// Score `doc` against distinct `query` terms, averaged over the query and
/// capped at 1.0.
pub fn bm25(query: &[String], doc: &[String], avgdl: f32, params: Bm25Params) -> f32 {
    if query.is_empty() || doc.is_empty() || avgdl <= 0.0 {
        return 0.0;
    }

    let mut tf: HashMap<&str, usize> = HashMap::new();
    for term in doc {
        *tf.entry(term.as_str()).or_default() += 1;
    }
    let length_norm = 1.0 - params.b + params.b * (doc.len() as f32 / avgdl);

    let total: f32 = query
        .iter()
        .filter_map(|term| tf.get(term.as_str()))
        .map(|&count| {
            let tf = count as f32;
            (tf * (params.k1 + 1.0)) / (tf + params.k1 * length_norm)
        })
        .sum();

    (total / query.len() as f32).min(1.0)
}

/// Per-facet lexical scores for one document.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KeywordBreakdown {
    pub path: f32,
    pub summary: f32,
    pub names: f32,
}

impl KeywordBreakdown {
    pub fn compute(
        query: &[String],
        path: &str,
        summary: &str,
        names: &[String],
        params: Bm25Params,
    ) -> Self {
        if query.is_empty() {
            return Self::default();
        }
        let names_text = names.join(" ");
        Self {
            path: bm25(query, &extract_terms(path), PATH_AVGDL, params),
            summary: bm25(query, &extract_terms(summary), SUMMARY_AVGDL, params),
            names: bm25(query, &extract_terms(&names_text), NAMES_AVGDL, params),
        }
    }

    pub fn combined(&self) -> f32 {
        PATH_WEIGHT * self.path + SUMMARY_WEIGHT * self.summary + NAMES_WEIGHT * self.names
    }
}

/// Raise `base` when query terms appear in the bare file name of `path`.
/// The multiplier grows with the fraction of query terms matched; the
/// result is capped at 1.0.
pub fn filename_boost(query: &[String], path: &str, base: f32, factor: f32) -> f32 {
    if query.is_empty() {
        return base;
    }
    let filename = path.rsplit('/').next().unwrap_or(path);
    let filename_terms: HashSet<String> = extract_terms(filename).into_iter().collect();
    let matched = query.iter().filter(|t| filename_terms.contains(*t)).count();
    if matched == 0 {
        return base;
    }

    let fraction = matched as f32 / query.len() as f32;
    let boosted = base * (1.0 + fraction * (factor - 1.0));
    boosted.min(1.0).max(base.min(1.0))
}
