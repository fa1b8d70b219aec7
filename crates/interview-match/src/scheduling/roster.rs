use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use serde::Deserialize;
use tracing::info;

use super::domain::{normalize_skills, Candidate, CandidateId, Interviewer, InterviewerId};
use super::repository::{DataSource, DataSourceError};

/// In-process candidate and interviewer tables.
///
/// The interviewer roster is fixed at construction. Candidates may be added with
/// [`Roster::register`] and keep their registration order.
#[derive(Debug, Default)]
pub struct Roster {
    candidates: RwLock<Vec<Candidate>>,
    interviewers: Vec<Interviewer>,
}

#[derive(Debug)]
pub enum RosterImportError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl std::fmt::Display for RosterImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RosterImportError::Io(err) => write!(f, "failed to read roster export: {}", err),
            RosterImportError::Csv(err) => write!(f, "invalid roster CSV data: {}", err),
        }
    }
}

impl std::error::Error for RosterImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RosterImportError::Io(err) => Some(err),
            RosterImportError::Csv(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for RosterImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for RosterImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// `id,field,email,skills` with skills separated by `;`.
#[derive(Debug, Deserialize)]
struct RosterRow {
    id: String,
    #[serde(default)]
    field: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    skills: String,
}

impl RosterRow {
    fn skills(&self) -> BTreeSet<String> {
        normalize_skills(self.skills.split(';'))
    }
}

fn parse_rows<R: Read>(reader: R) -> Result<Vec<RosterRow>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    csv_reader.deserialize::<RosterRow>().collect()
}

impl Roster {
    pub fn new(candidates: Vec<Candidate>, interviewers: Vec<Interviewer>) -> Self {
        Self {
            candidates: RwLock::new(candidates),
            interviewers,
        }
    }

    pub fn from_csv_readers<C: Read, I: Read>(
        candidates: C,
        interviewers: I,
    ) -> Result<Self, RosterImportError> {
        let candidates: Vec<Candidate> = parse_rows(candidates)?
            .into_iter()
            .map(|row| Candidate {
                skills: row.skills(),
                id: CandidateId(row.id),
                field: row.field,
                email: row.email,
            })
            .collect();
        let interviewers: Vec<Interviewer> = parse_rows(interviewers)?
            .into_iter()
            .map(|row| Interviewer {
                skills: row.skills(),
                id: InterviewerId(row.id),
                field: row.field,
                email: row.email,
            })
            .collect();

        info!(
            candidates = candidates.len(),
            interviewers = interviewers.len(),
            "loaded roster"
        );
        Ok(Self::new(candidates, interviewers))
    }

    pub fn from_paths<P: AsRef<Path>, Q: AsRef<Path>>(
        candidates: P,
        interviewers: Q,
    ) -> Result<Self, RosterImportError> {
        let candidates = File::open(candidates)?;
        let interviewers = File::open(interviewers)?;
        Self::from_csv_readers(candidates, interviewers)
    }

    /// Appends a candidate. Ids are unique.
    pub fn register(&self, candidate: Candidate) -> Result<Candidate, DataSourceError> {
        let mut guard = self
            .candidates
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if guard.iter().any(|existing| existing.id == candidate.id) {
            return Err(DataSourceError::Conflict(candidate.id.0));
        }
        guard.push(candidate.clone());
        Ok(candidate)
    }

    pub fn interviewers(&self) -> &[Interviewer] {
        &self.interviewers
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl DataSource for Roster {
    fn list_candidates(&self) -> Result<Vec<Candidate>, DataSourceError> {
        Ok(self
            .candidates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn list_interviewers(&self) -> Result<Vec<Interviewer>, DataSourceError> {
        Ok(self.interviewers.clone())
    }

    fn candidate(&self, id: &CandidateId) -> Result<Option<Candidate>, DataSourceError> {
        Ok(self
            .candidates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|candidate| &candidate.id == id)
            .cloned())
    }

    fn skills_for(&self, id: &str) -> Result<BTreeSet<String>, DataSourceError> {
        let candidate_skills = self
            .candidates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|candidate| candidate.id.0 == id)
            .map(|candidate| candidate.skills.clone());
        if let Some(skills) = candidate_skills {
            return Ok(skills);
        }

        Ok(self
            .interviewers
            .iter()
            .find(|interviewer| interviewer.id.0 == id)
            .map(|interviewer| interviewer.skills.clone())
            .unwrap_or_default())
    }
}
