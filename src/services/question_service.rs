use rand::seq::SliceRandom;
use std::sync::Arc;

use crate::dto::question_dto::{DifficultyCounts, SectionStats};
use crate::error::{Error, Result};
use crate::models::question::{Difficulty, Question, Section};

const BUILTIN_CATALOG: &str = include_str!("../data/questions.json");

/// Read-only catalog of practice items.
#[derive(Clone)]
pub struct QuestionService {
    questions: Arc<Vec<Question>>,
}

#[derive(Debug, Clone)]
pub struct QuestionPage {
    pub questions: Vec<Question>,
    pub total: usize,
}

impl QuestionService {
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            questions: Arc::new(questions),
        }
    }

    pub fn builtin() -> Result<Self> {
        let questions: Vec<Question> = serde_json::from_str(BUILTIN_CATALOG)
            .map_err(|e| Error::Config(format!("Invalid question catalog: {}", e)))?;
        tracing::info!(count = questions.len(), "Loaded question catalog");
        Ok(Self::new(questions))
    }

    pub fn get(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    fn in_section(&self, section: Section) -> impl Iterator<Item = &Question> {
        self.questions.iter().filter(move |q| q.section == section)
    }

    /// Section items, optionally narrowed to one difficulty, then paged. `total` counts the
    /// filtered set before paging.
    pub fn list(
        &self,
        section: Section,
        difficulty: Option<Difficulty>,
        limit: usize,
        offset: usize,
    ) -> QuestionPage {
        let filtered: Vec<&Question> = self
            .in_section(section)
            .filter(|q| difficulty.map_or(true, |d| q.difficulty == d))
            .collect();
        let total = filtered.len();
        let questions = filtered
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        QuestionPage { questions, total }
    }

    pub fn random(&self, section: Section, count: usize) -> Vec<Question> {
        let mut pool: Vec<Question> = self.in_section(section).cloned().collect();
        pool.shuffle(&mut rand::thread_rng());
        pool.truncate(count);
        pool
    }

    pub fn stats(&self) -> Vec<SectionStats> {
        Section::ALL
            .iter()
            .map(|section| {
                let count = |d: Difficulty| {
                    self.in_section(*section)
                        .filter(|q| q.difficulty == d)
                        .count()
                };
                SectionStats {
                    section: *section,
                    total: self.in_section(*section).count(),
                    by_difficulty: DifficultyCounts {
                        easy: count(Difficulty::Easy),
                        medium: count(Difficulty::Medium),
                        hard: count(Difficulty::Hard),
                    },
                }
            })
            .collect()
    }
}
