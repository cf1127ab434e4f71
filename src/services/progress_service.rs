use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::database::store::KeyValueStore;
use crate::error::Result;
use crate::models::progress::{ProgressKey, UserProgress};
use crate::models::question::Section;
use crate::models::session::{SessionSection, TestSession};
use crate::utils::time::{days_between, Clock};

const MAX_RECOMMENDATIONS: usize = 5;
const SLOW_SECONDS_PER_QUESTION: f64 = 120.0;

/// Per-user, per-section running statistics fed by completed sessions.
#[derive(Clone)]
pub struct ProgressService {
    store: Arc<dyn KeyValueStore<ProgressKey, UserProgress>>,
    clock: Arc<dyn Clock>,
}

impl ProgressService {
    pub fn new(
        store: Arc<dyn KeyValueStore<ProgressKey, UserProgress>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { store, clock }
    }

    /// Stored record, or an empty one when the user never completed a session here.
    pub fn get(&self, user_id: &str, section: SessionSection) -> Result<UserProgress> {
        let key = ProgressKey::new(user_id, section);
        Ok(self
            .store
            .get(&key)?
            .unwrap_or_else(|| UserProgress::empty(user_id, section)))
    }

    pub fn all_sections(&self, user_id: &str) -> Result<Vec<UserProgress>> {
        Section::ALL
            .iter()
            .map(|s| self.get(user_id, SessionSection::from(*s)))
            .collect()
    }

    /// Folds one completed session into the running statistics.
    pub fn record_completion(
        &self,
        session: &TestSession,
        average_score: f64,
    ) -> Result<UserProgress> {
        let now = self.clock.now();
        let key = ProgressKey::new(session.user_id.clone(), session.section);
        let user_id = session.user_id.clone();
        let section = session.section;

        let updated = self.store.upsert(
            key,
            &|| UserProgress::empty(user_id.clone(), section),
            &mut |progress| fold_session(progress, session, average_score, now),
        )?;

        tracing::info!(
            user_id = %updated.user_id,
            section = section.as_str(),
            sessions = updated.sessions_completed,
            average = updated.average_score,
            "Progress updated"
        );
        Ok(updated)
    }
}

fn fold_session(
    progress: &mut UserProgress,
    session: &TestSession,
    average_score: f64,
    now: DateTime<Utc>,
) {
    let previous_practice = progress.last_practiced;

    progress.total_questions += session.questions.len() as u32;
    progress.sessions_completed += 1;
    progress.total_time_spent += session.time_used() as u64;
    progress.last_practiced = Some(now);

    progress.correct_answers += session.scores.values().filter(|s| **s > 0.0).count() as u32;

    let n = progress.sessions_completed as f64;
    progress.average_score = (progress.average_score * (n - 1.0) + average_score) / n;

    progress.weak_areas = analyze_weak_areas(session, average_score);
    let idle_days = previous_practice.map(|at| days_between(at, now));
    progress.recommendations =
        generate_recommendations(progress.average_score, session.section, idle_days);
}

pub fn analyze_weak_areas(session: &TestSession, average_score: f64) -> Vec<String> {
    let mut weak = Vec::new();

    if average_score < 70.0 {
        weak.push("Overall comprehension");
    }

    if !session.questions.is_empty() {
        let per_question = session.time_used() as f64 / session.questions.len() as f64;
        if per_question > SLOW_SECONDS_PER_QUESTION {
            weak.push("Time management");
        }
    }

    if average_score < 75.0 {
        match session.section {
            SessionSection::Reading => weak.extend(["Reading comprehension", "Vocabulary"]),
            SessionSection::Listening => weak.extend(["Listening comprehension", "Note-taking"]),
            SessionSection::Speaking => {
                weak.extend(["Pronunciation", "Fluency", "Organization"])
            }
            SessionSection::Writing => weak.extend(["Grammar", "Vocabulary", "Essay structure"]),
            SessionSection::Full => {}
        }
    }

    weak.into_iter().map(String::from).collect()
}

/// Tiered by the running average, then section tips, then a nudge after more than three
/// idle days. Never more than five entries.
pub fn generate_recommendations(
    average_score: f64,
    section: SessionSection,
    idle_days: Option<i64>,
) -> Vec<String> {
    let mut recs: Vec<&str> = Vec::new();

    if average_score < 60.0 {
        recs.push("Focus on fundamental skills before attempting practice tests");
        recs.push("Review basic grammar and vocabulary");
    } else if average_score < 80.0 {
        recs.push("Practice regularly with timed exercises");
        recs.push("Focus on weak areas identified in your sessions");
    } else {
        recs.push("Take full-length practice tests to maintain your level");
        recs.push("Focus on advanced strategies and time optimization");
    }

    match section {
        SessionSection::Reading => {
            recs.push("Practice skimming and scanning techniques");
            recs.push("Build academic vocabulary through reading");
        }
        SessionSection::Listening => {
            recs.push("Practice with various accents and speaking speeds");
            recs.push("Improve note-taking strategies");
        }
        SessionSection::Speaking => {
            recs.push("Record yourself speaking and analyze pronunciation");
            recs.push("Practice organizing responses with clear structure");
        }
        SessionSection::Writing => {
            recs.push("Study essay templates and practice timed writing");
            recs.push("Focus on grammar accuracy and sentence variety");
        }
        SessionSection::Full => {}
    }

    if idle_days.is_some_and(|d| d > 3) {
        recs.push("Practice more frequently - aim for daily sessions");
    }

    recs.truncate(MAX_RECOMMENDATIONS);
    recs.into_iter().map(String::from).collect()
}
