use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::store::KeyValueStore;
use crate::dto::session_dto::{CreateSessionRequest, SubmitAnswerRequest};
use crate::error::{Error, Result};
use crate::models::analytics::{
    EventPayload, QuestionAnsweredData, SessionCompletedData, SessionStartedData,
};
use crate::models::grading::GradingResult;
use crate::models::session::{AnswerRecord, SessionStatus, TestSession};
use crate::services::analytics_service::AnalyticsService;
use crate::services::grading_service::GradingService;
use crate::services::progress_service::ProgressService;
use crate::services::question_service::QuestionService;
use crate::utils::time::Clock;

/// Outcome of a completion request.
#[derive(Debug, Clone)]
pub struct CompletedSession {
    pub session: TestSession,
    pub total_score: f64,
    pub average_score: f64,
    /// Only the call that moved the session out of `in_progress` sees `true`.
    pub first_completion: bool,
}

#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn KeyValueStore<Uuid, TestSession>>,
    questions: QuestionService,
    grading: GradingService,
    progress: ProgressService,
    analytics: AnalyticsService,
    clock: Arc<dyn Clock>,
    strict: bool,
}

impl SessionService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn KeyValueStore<Uuid, TestSession>>,
        questions: QuestionService,
        grading: GradingService,
        progress: ProgressService,
        analytics: AnalyticsService,
        clock: Arc<dyn Clock>,
        strict: bool,
    ) -> Self {
        Self {
            store,
            questions,
            grading,
            progress,
            analytics,
            clock,
            strict,
        }
    }

    pub fn create_session(&self, req: CreateSessionRequest) -> Result<TestSession> {
        let session = TestSession {
            id: Uuid::new_v4(),
            user_id: req.user_id,
            kind: req.kind,
            section: req.section,
            questions: req.question_ids,
            answers: BTreeMap::new(),
            scores: BTreeMap::new(),
            feedback: BTreeMap::new(),
            started_at: self.clock.now(),
            completed_at: None,
            time_remaining: req.time_limit,
            total_time: req.time_limit,
            status: SessionStatus::InProgress,
        };
        self.store.put(session.id, session.clone())?;

        tracing::info!(
            session_id = %session.id,
            user_id = %session.user_id,
            section = session.section.as_str(),
            questions = session.questions.len(),
            "Session started"
        );
        self.emit(
            &session,
            EventPayload::SessionStarted(SessionStartedData {
                section: Some(session.section),
                kind: Some(session.kind),
            }),
        );
        Ok(session)
    }

    pub fn get_session(&self, id: Uuid) -> Result<TestSession> {
        self.store
            .get(&id)?
            .ok_or_else(|| Error::NotFound("Session not found".to_string()))
    }

    /// Grades the answer when the question is in the bank, then records it, its time (never
    /// below zero) and its score in one store update.
    pub fn submit_answer(
        &self,
        id: Uuid,
        req: SubmitAnswerRequest,
    ) -> Result<(TestSession, Option<GradingResult>)> {
        let question = self.questions.get(&req.question_id);
        let grading = question.and_then(|q| {
            match self.grading.grade_question(q, &answer_text(&req.answer)) {
                Ok(result) => Some(result),
                Err(e) => {
                    tracing::warn!(question_id = %req.question_id, error = ?e, "Grading skipped");
                    None
                }
            }
        });

        let now = self.clock.now();
        let mut rejected = false;
        let updated = self.store.modify(&id, &mut |session| {
            if self.strict && session.status != SessionStatus::InProgress {
                rejected = true;
                return;
            }
            session.answers.insert(
                req.question_id.clone(),
                AnswerRecord {
                    answer: req.answer.clone(),
                    time_spent: req.time_spent,
                    submitted_at: now,
                },
            );
            session.time_remaining = session.time_remaining.saturating_sub(req.time_spent);
            if let Some(result) = &grading {
                session
                    .scores
                    .insert(req.question_id.clone(), result.percentage as f64);
                session
                    .feedback
                    .insert(req.question_id.clone(), result.feedback.clone());
            }
        })?;
        let session = updated.ok_or_else(|| Error::NotFound("Session not found".to_string()))?;
        if rejected {
            return Err(Error::BadRequest("Session is not in progress".to_string()));
        }

        self.emit(
            &session,
            EventPayload::QuestionAnswered(QuestionAnsweredData {
                section: question.map(|q| q.section).or_else(|| session.section.skill()),
                question_id: Some(req.question_id.clone()),
                score: grading.as_ref().map(|g| g.percentage as f64),
                time_spent: Some(req.time_spent as f64),
                difficulty: question.map(|q| q.difficulty),
            }),
        );

        Ok((session, grading))
    }

    /// Marks the session completed. Repeat calls return the stored result without touching
    /// progress again.
    pub fn complete_session(&self, id: Uuid) -> Result<CompletedSession> {
        let now = self.clock.now();
        let mut flipped = false;
        let session = self
            .store
            .modify(&id, &mut |session| {
                if session.status == SessionStatus::InProgress {
                    session.status = SessionStatus::Completed;
                    session.completed_at = Some(now);
                    flipped = true;
                }
            })?
            .ok_or_else(|| Error::NotFound("Session not found".to_string()))?;

        let total_score = session.total_score();
        let average_score = session.average_score();

        if flipped {
            // Status is already flipped; later calls will not aggregate this session.
            if let Err(e) = self.progress.record_completion(&session, average_score) {
                tracing::error!(session_id = %session.id, error = ?e, "Failed to update progress");
            }
            tracing::info!(
                session_id = %session.id,
                user_id = %session.user_id,
                total_score,
                average_score,
                "Session completed"
            );
            self.emit(
                &session,
                EventPayload::SessionCompleted(SessionCompletedData {
                    section: Some(session.section),
                    score: Some(average_score),
                    questions_answered: Some(session.answers.len() as u32),
                    time_spent: Some(session.time_used() as f64),
                }),
            );
        } else {
            tracing::debug!(session_id = %session.id, "Session already completed");
        }

        Ok(CompletedSession {
            session,
            total_score,
            average_score,
            first_completion: flipped,
        })
    }

    /// Newest first. `total` counts the user's sessions before paging.
    pub fn list_user_sessions(
        &self,
        user_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<TestSession>, usize)> {
        let mut sessions: Vec<TestSession> = self
            .store
            .values()?
            .into_iter()
            .filter(|s| s.user_id == user_id)
            .collect();
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        let total = sessions.len();
        let page = sessions.into_iter().skip(offset).take(limit).collect();
        Ok((page, total))
    }

    fn emit(&self, session: &TestSession, payload: EventPayload) {
        if let Err(e) =
            self.analytics
                .record_event(&session.user_id, payload, Some(session.id.to_string()))
        {
            tracing::warn!(session_id = %session.id, error = ?e, "Failed to record analytics event");
        }
    }
}

fn answer_text(answer: &JsonValue) -> String {
    match answer {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::store::MemoryStore;
    use crate::dto::analytics_dto::Timeframe;
    use crate::models::session::{SessionKind, SessionSection};
    use crate::utils::random::FixedOffset;
    use crate::utils::time::FixedClock;
    use crate::models::progress::{ProgressKey, UserProgress};
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::thread;

    /// Completes the session once, just before or just after the first `modify`, the way a
    /// concurrent completion request would.
    struct CompletingStore {
        inner: MemoryStore<Uuid, TestSession>,
        before: bool,
        armed: AtomicBool,
        reported_total: Mutex<Option<f64>>,
    }

    impl CompletingStore {
        fn new(before: bool) -> Self {
            Self {
                inner: MemoryStore::new(),
                before,
                armed: AtomicBool::new(true),
                reported_total: Mutex::new(None),
            }
        }

        fn complete(&self, key: &Uuid) -> Result<()> {
            let done = self.inner.modify(key, &mut |s| {
                s.status = SessionStatus::Completed;
            })?;
            if let Some(done) = done {
                *self.reported_total.lock().unwrap() = Some(done.total_score());
            }
            Ok(())
        }
    }

    impl KeyValueStore<Uuid, TestSession> for CompletingStore {
        fn get(&self, key: &Uuid) -> Result<Option<TestSession>> {
            self.inner.get(key)
        }

        fn put(&self, key: Uuid, value: TestSession) -> Result<()> {
            self.inner.put(key, value)
        }

        fn delete(&self, key: &Uuid) -> Result<Option<TestSession>> {
            self.inner.delete(key)
        }

        fn values(&self) -> Result<Vec<TestSession>> {
            self.inner.values()
        }

        fn modify(
            &self,
            key: &Uuid,
            f: &mut dyn FnMut(&mut TestSession),
        ) -> Result<Option<TestSession>> {
            let fire = self.armed.swap(false, Ordering::SeqCst);
            if fire && self.before {
                self.complete(key)?;
            }
            let out = self.inner.modify(key, f)?;
            if fire && !self.before {
                self.complete(key)?;
            }
            Ok(out)
        }

        fn upsert(
            &self,
            key: Uuid,
            init: &dyn Fn() -> TestSession,
            f: &mut dyn FnMut(&mut TestSession),
        ) -> Result<TestSession> {
            self.inner.upsert(key, init, f)
        }
    }

    /// Progress store whose writes always fail.
    struct BrokenProgressStore;

    impl KeyValueStore<ProgressKey, UserProgress> for BrokenProgressStore {
        fn get(&self, _: &ProgressKey) -> Result<Option<UserProgress>> {
            Ok(None)
        }

        fn put(&self, _: ProgressKey, _: UserProgress) -> Result<()> {
            Err(Error::Internal("progress store offline".into()))
        }

        fn delete(&self, _: &ProgressKey) -> Result<Option<UserProgress>> {
            Ok(None)
        }

        fn values(&self) -> Result<Vec<UserProgress>> {
            Ok(Vec::new())
        }

        fn modify(
            &self,
            _: &ProgressKey,
            _: &mut dyn FnMut(&mut UserProgress),
        ) -> Result<Option<UserProgress>> {
            Err(Error::Internal("progress store offline".into()))
        }

        fn upsert(
            &self,
            _: ProgressKey,
            _: &dyn Fn() -> UserProgress,
            _: &mut dyn FnMut(&mut UserProgress),
        ) -> Result<UserProgress> {
            Err(Error::Internal("progress store offline".into()))
        }
    }

    struct Harness {
        sessions: SessionService,
        progress: ProgressService,
        analytics: AnalyticsService,
        clock: Arc<FixedClock>,
    }

    fn harness(strict: bool) -> Harness {
        harness_with(
            strict,
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
        )
    }

    fn harness_with(
        strict: bool,
        store: Arc<dyn KeyValueStore<Uuid, TestSession>>,
        progress_store: Arc<dyn KeyValueStore<ProgressKey, UserProgress>>,
    ) -> Harness {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap()));
        let progress = ProgressService::new(progress_store, clock.clone());
        let analytics = AnalyticsService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
            clock.clone(),
        );
        let sessions = SessionService::new(
            store,
            QuestionService::builtin().unwrap(),
            GradingService::new(Arc::new(FixedOffset(0))),
            progress.clone(),
            analytics.clone(),
            clock.clone(),
            strict,
        );
        Harness {
            sessions,
            progress,
            analytics,
            clock,
        }
    }

    fn create(h: &Harness, user: &str, ids: &[&str], limit: u32) -> TestSession {
        h.sessions
            .create_session(CreateSessionRequest {
                user_id: user.into(),
                kind: SessionKind::Practice,
                section: SessionSection::Reading,
                question_ids: ids.iter().map(|s| s.to_string()).collect(),
                time_limit: limit,
            })
            .unwrap()
    }

    fn answer(qid: &str, value: JsonValue, spent: u32) -> SubmitAnswerRequest {
        SubmitAnswerRequest {
            question_id: qid.into(),
            answer: value,
            time_spent: spent,
        }
    }

    #[test]
    fn time_remaining_decrements_and_floors_at_zero() {
        let h = harness(false);
        let s = create(&h, "u1", &["q1", "q2"], 240);
        let (after, grading) = h.sessions.submit_answer(s.id, answer("q1", json!("A"), 30)).unwrap();
        assert_eq!(after.time_remaining, 210);
        assert!(grading.is_none());

        let (after, _) = h.sessions.submit_answer(s.id, answer("q2", json!("B"), 500)).unwrap();
        assert_eq!(after.time_remaining, 0);

        let done = h.sessions.complete_session(s.id).unwrap();
        assert_eq!(done.total_score, 0.0);
        assert_eq!(done.average_score, 0.0);
        assert_eq!(done.session.status, SessionStatus::Completed);
    }

    #[test]
    fn bank_questions_are_graded_on_submit() {
        let h = harness(false);
        let s = create(&h, "u1", &["r3", "r1"], 600);
        let (after, grading) = h
            .sessions
            .submit_answer(s.id, answer("r3", json!("Before puberty"), 20))
            .unwrap();
        assert_eq!(grading.unwrap().percentage, 100);
        assert_eq!(after.scores["r3"], 100.0);
        assert!(after.feedback["r3"].starts_with("Excellent"));

        let (after, _) = h
            .sessions
            .submit_answer(s.id, answer("r1", json!("wrong"), 20))
            .unwrap();
        assert_eq!(after.scores["r1"], 0.0);

        let done = h.sessions.complete_session(s.id).unwrap();
        assert_eq!(done.total_score, 100.0);
        assert_eq!(done.average_score, 50.0);

        let analytics = h.analytics.user_analytics("u1", Timeframe::All).unwrap().unwrap();
        assert_eq!(analytics.total_questions, 2);
        assert_eq!(analytics.total_sessions, 1);
    }

    #[test]
    fn repeated_completion_aggregates_once() {
        let h = harness(false);
        let s = create(&h, "u1", &["q1"], 100);
        let first = h.sessions.complete_session(s.id).unwrap();
        h.clock.advance(Duration::minutes(5));
        let second = h.sessions.complete_session(s.id).unwrap();

        assert!(first.first_completion);
        assert!(!second.first_completion);
        assert_eq!(first.session.completed_at, second.session.completed_at);

        let progress = h.progress.get("u1", SessionSection::Reading).unwrap();
        assert_eq!(progress.sessions_completed, 1);
        assert_eq!(progress.total_questions, 1);
    }

    #[test]
    fn lenient_mode_accepts_late_answers() {
        let h = harness(false);
        let s = create(&h, "u1", &["q1"], 100);
        h.sessions.complete_session(s.id).unwrap();
        let (after, _) = h.sessions.submit_answer(s.id, answer("q1", json!(1), 10)).unwrap();
        assert_eq!(after.answers.len(), 1);
        assert_eq!(after.status, SessionStatus::Completed);
    }

    #[test]
    fn strict_mode_rejects_late_answers() {
        let h = harness(true);
        let s = create(&h, "u1", &["q1"], 100);
        h.sessions.complete_session(s.id).unwrap();
        let err = h
            .sessions
            .submit_answer(s.id, answer("q1", json!("A"), 10))
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
        assert!(h.sessions.get_session(s.id).unwrap().answers.is_empty());
    }

    #[test]
    fn completion_right_after_submit_reports_the_stored_score() {
        let store = Arc::new(CompletingStore::new(false));
        let h = harness_with(false, store.clone(), Arc::new(MemoryStore::new()));
        let s = create(&h, "u1", &["r3"], 600);

        let (after, grading) = h
            .sessions
            .submit_answer(s.id, answer("r3", json!("Before puberty"), 20))
            .unwrap();
        assert_eq!(grading.unwrap().percentage, 100);
        assert_eq!(after.scores["r3"], 100.0);

        let stored = h.sessions.get_session(s.id).unwrap();
        assert_eq!(stored.status, SessionStatus::Completed);
        assert_eq!(*store.reported_total.lock().unwrap(), Some(stored.total_score()));
        assert_eq!(h.sessions.complete_session(s.id).unwrap().total_score, 100.0);
    }

    #[test]
    fn strict_mode_leaves_scores_alone_once_completed() {
        let store = Arc::new(CompletingStore::new(true));
        let h = harness_with(true, store.clone(), Arc::new(MemoryStore::new()));
        let s = create(&h, "u1", &["r3"], 600);

        let err = h
            .sessions
            .submit_answer(s.id, answer("r3", json!("Before puberty"), 20))
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));

        let stored = h.sessions.get_session(s.id).unwrap();
        assert!(stored.scores.is_empty());
        assert!(stored.answers.is_empty());
        assert_eq!(stored.time_remaining, 600);
        assert_eq!(*store.reported_total.lock().unwrap(), Some(0.0));
    }

    #[test]
    fn racing_submit_and_complete_agree_in_strict_mode() {
        let h = harness(true);
        for _ in 0..200 {
            let s = create(&h, "u1", &["r3"], 600);
            let (done, submitted) = thread::scope(|scope| {
                let submit = scope.spawn(|| {
                    h.sessions
                        .submit_answer(s.id, answer("r3", json!("Before puberty"), 5))
                });
                let complete = scope.spawn(|| h.sessions.complete_session(s.id).unwrap());
                (complete.join().unwrap(), submit.join().unwrap())
            });

            let stored = h.sessions.get_session(s.id).unwrap();
            assert_eq!(stored.total_score(), done.total_score);
            match submitted {
                Ok((session, _)) => assert_eq!(session.scores["r3"], 100.0),
                Err(e) => {
                    assert!(matches!(e, Error::BadRequest(_)));
                    assert!(stored.scores.is_empty());
                }
            }
        }
    }

    #[test]
    fn progress_failure_does_not_fail_completion() {
        let h = harness_with(false, Arc::new(MemoryStore::new()), Arc::new(BrokenProgressStore));
        let s = create(&h, "u1", &["r3"], 600);
        h.sessions
            .submit_answer(s.id, answer("r3", json!("Before puberty"), 20))
            .unwrap();

        let done = h.sessions.complete_session(s.id).unwrap();
        assert!(done.first_completion);
        assert_eq!(done.average_score, 100.0);
        assert_eq!(
            h.sessions.get_session(s.id).unwrap().status,
            SessionStatus::Completed
        );

        let analytics = h.analytics.user_analytics("u1", Timeframe::All).unwrap().unwrap();
        assert_eq!(analytics.total_sessions, 1);
    }

    #[test]
    fn unknown_session_is_not_found() {
        let h = harness(false);
        let id = Uuid::new_v4();
        assert!(matches!(h.sessions.get_session(id), Err(Error::NotFound(_))));
        assert!(matches!(
            h.sessions.submit_answer(id, answer("q1", json!("A"), 1)),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(h.sessions.complete_session(id), Err(Error::NotFound(_))));
    }

    #[test]
    fn user_sessions_are_newest_first_and_paged() {
        let h = harness(false);
        let oldest = create(&h, "u1", &[], 60);
        h.clock.advance(Duration::minutes(1));
        create(&h, "u2", &[], 60);
        h.clock.advance(Duration::minutes(1));
        let newest = create(&h, "u1", &[], 60);

        let (page, total) = h.sessions.list_user_sessions("u1", 1, 0).unwrap();
        assert_eq!(total, 2);
        assert_eq!(page[0].id, newest.id);

        let (page, _) = h.sessions.list_user_sessions("u1", 10, 1).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, oldest.id);
    }
}
