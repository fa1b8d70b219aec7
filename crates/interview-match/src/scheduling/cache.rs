use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::debug;

use super::domain::{Candidate, CandidateId, Interviewer, InterviewerId, PairKey, ScorePair};
use super::overlap::SkillOverlapScorer;
use super::similarity::{jaccard, FieldSimilarity};

/// Per-pair affinity scores, computed lazily per candidate and updated incrementally.
///
/// The TF-IDF space is fitted once from the interviewer roster at construction and is
/// never refitted; new candidates are projected into it.
#[derive(Debug, Clone)]
pub struct ScoreCache {
    similarity: FieldSimilarity,
    overlap: SkillOverlapScorer,
    interviewers: Vec<Interviewer>,
    scores: BTreeMap<PairKey, ScorePair>,
    computed: HashSet<CandidateId>,
}

impl ScoreCache {
    pub fn new(interviewers: Vec<Interviewer>) -> Self {
        Self::with_scorer(interviewers, SkillOverlapScorer::default())
    }

    pub fn with_scorer(interviewers: Vec<Interviewer>, overlap: SkillOverlapScorer) -> Self {
        let similarity = FieldSimilarity::fit(&interviewers);
        debug!(
            interviewers = interviewers.len(),
            vocabulary = similarity.vocabulary_len(),
            "fitted expertise vector space"
        );
        Self {
            similarity,
            overlap,
            interviewers,
            scores: BTreeMap::new(),
            computed: HashSet::new(),
        }
    }

    pub fn interviewers(&self) -> &[Interviewer] {
        &self.interviewers
    }

    /// Recomputes this candidate's rows against every interviewer, replacing only its keys.
    ///
    /// Returns the number of pairs stored. A blank field is a no-op.
    pub fn update_scores_for_candidate(
        &mut self,
        candidate_id: &CandidateId,
        field: &str,
        skills: &BTreeSet<String>,
    ) -> usize {
        let field = field.trim();
        if field.is_empty() {
            return 0;
        }

        let cosine = self.similarity.cosine_scores(field);
        self.scores.retain(|(candidate, _), _| candidate != candidate_id);

        let mut stored = 0;
        for interviewer in &self.interviewers {
            let pair = ScorePair {
                cosine: cosine.get(&interviewer.id).copied().unwrap_or(0.0),
                jaccard: jaccard(field, &interviewer.field),
                matching: self
                    .overlap
                    .score(field, skills, &interviewer.field, &interviewer.skills)
                    .combined,
            };
            if pair.is_zero() {
                continue;
            }
            self.scores
                .insert((candidate_id.clone(), interviewer.id.clone()), pair);
            stored += 1;
        }
        self.computed.insert(candidate_id.clone());

        debug!(candidate_id = %candidate_id, pairs = stored, "updated candidate scores");
        stored
    }

    /// Computes a candidate's rows on first access; later calls are free.
    pub fn ensure(&mut self, candidate: &Candidate) {
        if self.computed.contains(&candidate.id) {
            return;
        }
        self.update_scores_for_candidate(&candidate.id, &candidate.field, &candidate.skills);
        self.computed.insert(candidate.id.clone());
    }

    pub fn warm<'a, I>(&mut self, candidates: I) -> usize
    where
        I: IntoIterator<Item = &'a Candidate>,
    {
        let before = self.scores.len();
        for candidate in candidates {
            self.ensure(candidate);
        }
        self.scores.len().saturating_sub(before)
    }

    /// Scores for a pair; absent pairs read as all-zero.
    pub fn get(&self, candidate_id: &CandidateId, interviewer_id: &InterviewerId) -> ScorePair {
        self.scores
            .get(&(candidate_id.clone(), interviewer_id.clone()))
            .copied()
            .unwrap_or_default()
    }

    pub fn is_computed(&self, candidate_id: &CandidateId) -> bool {
        self.computed.contains(candidate_id)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn cosine_map(&self) -> BTreeMap<PairKey, f64> {
        self.signal_map(|pair| pair.cosine, true)
    }

    pub fn jaccard_map(&self) -> BTreeMap<PairKey, f64> {
        self.signal_map(|pair| pair.jaccard, false)
    }

    pub fn matching_map(&self) -> BTreeMap<PairKey, f64> {
        self.signal_map(|pair| pair.matching, true)
    }

    fn signal_map<F>(&self, signal: F, nonzero_only: bool) -> BTreeMap<PairKey, f64>
    where
        F: Fn(&ScorePair) -> f64,
    {
        self.scores
            .iter()
            .map(|(key, pair)| (key, signal(pair)))
            .filter(|(_, value)| !nonzero_only || *value > 0.0)
            .map(|(key, value)| (key.clone(), value))
            .collect()
    }
}
