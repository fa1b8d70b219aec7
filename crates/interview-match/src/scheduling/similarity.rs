//! Lexical similarity between a candidate's declared field and interviewer expertise.
//!
//! The vector space (vocabulary and smoothed inverse document frequencies) is fitted
//! once from the interviewer corpus. Candidate text is only ever projected into the
//! existing space, so interviewer-side weights stay stable across incremental updates.

use std::collections::{BTreeMap, BTreeSet};

use super::domain::{Interviewer, InterviewerId};

type SparseVector = BTreeMap<usize, f64>;

/// Fitted TF-IDF space over interviewer expertise texts.
#[derive(Debug, Clone, Default)]
pub struct FieldSimilarity {
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
    interviewers: Vec<(InterviewerId, SparseVector)>,
}

impl FieldSimilarity {
    pub fn fit(interviewers: &[Interviewer]) -> Self {
        let documents: Vec<Vec<String>> = interviewers
            .iter()
            .map(|interviewer| tokenize(&interviewer.field))
            .collect();

        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();
        for tokens in &documents {
            let unique: BTreeSet<&String> = tokens.iter().collect();
            for token in unique {
                *document_frequency.entry(token.clone()).or_default() += 1;
            }
        }

        if document_frequency.is_empty() {
            return Self::default();
        }

        let total = documents.len() as f64;
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(document_frequency.len());
        for (column, (term, df)) in document_frequency.into_iter().enumerate() {
            idf.push(((1.0 + total) / (1.0 + df as f64)).ln() + 1.0);
            vocabulary.insert(term, column);
        }

        let mut space = Self {
            vocabulary,
            idf,
            interviewers: Vec::with_capacity(interviewers.len()),
        };
        space.interviewers = interviewers
            .iter()
            .zip(documents.iter())
            .map(|(interviewer, tokens)| (interviewer.id.clone(), space.weigh(tokens)))
            .collect();
        space
    }

    /// True when the interviewer corpus produced no usable vocabulary.
    pub fn is_empty(&self) -> bool {
        self.vocabulary.is_empty()
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// Cosine similarity of `field` against every interviewer in the fitted corpus.
    ///
    /// Returns an empty map when the corpus is empty. Otherwise every interviewer has
    /// an entry, zero when the field is blank or entirely out of vocabulary.
    pub fn cosine_scores(&self, field: &str) -> BTreeMap<InterviewerId, f64> {
        if self.is_empty() {
            return BTreeMap::new();
        }

        let projected = self.project(field);
        self.interviewers
            .iter()
            .map(|(id, vector)| (id.clone(), cosine(&projected, vector)))
            .collect()
    }

    fn project(&self, text: &str) -> SparseVector {
        self.weigh(&tokenize(text))
    }

    fn weigh(&self, tokens: &[String]) -> SparseVector {
        let mut vector = SparseVector::new();
        for token in tokens {
            if let Some(&column) = self.vocabulary.get(token) {
                *vector.entry(column).or_default() += 1.0;
            }
        }
        for (column, weight) in vector.iter_mut() {
            *weight *= self.idf[*column];
        }

        let norm = vector.values().map(|w| w * w).sum::<f64>().sqrt();
        if norm == 0.0 {
            return SparseVector::new();
        }
        for weight in vector.values_mut() {
            *weight /= norm;
        }
        vector
    }
}

fn cosine(a: &SparseVector, b: &SparseVector) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f64 = small
        .iter()
        .filter_map(|(column, weight)| large.get(column).map(|other| weight * other))
        .sum();
    dot.clamp(0.0, 1.0)
}

/// Lower-cased word tokens of at least two alphanumeric characters.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() >= 2)
        .map(str::to_string)
        .collect()
}

/// Token-set Jaccard index over lower-cased whitespace tokens. An empty union scores 0.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let left: BTreeSet<String> = a.split_whitespace().map(str::to_lowercase).collect();
    let right: BTreeSet<String> = b.split_whitespace().map(str::to_lowercase).collect();

    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    left.intersection(&right).count() as f64 / union as f64
}
