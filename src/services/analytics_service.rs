use chrono::{DateTime, Datelike, Duration, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::store::KeyValueStore;
use crate::dto::analytics_dto::{
    DailyProgress, DashboardSummary, DifficultyBreakdown, DifficultyStats, ProgressPoint,
    RecentActivity, SectionAnalytics, Timeframe,
};
use crate::dto::subscription_dto::UsageStats;
use crate::error::Result;
use crate::models::analytics::{
    AnalyticsEvent, EventPayload, UserAnalytics, QUESTION_ANSWERED, SESSION_COMPLETED,
};
use crate::models::question::{Difficulty, Section};
use crate::utils::time::{day_key, days_between, week_start, Clock};

const MAX_RECOMMENDATIONS: usize = 5;
const TREND_WEEKS: i64 = 4;
const RECENT_ACTIVITY_LIMIT: usize = 10;
const MONTHLY_QUESTION_LIMIT: u32 = 1000;

const COMMON_MISTAKES: [&str; 5] = [
    "Misunderstanding main ideas",
    "Vocabulary gaps",
    "Time management issues",
    "Grammar errors",
    "Pronunciation difficulties",
];

/// Append-only event log per user plus the incrementally maintained [`UserAnalytics`].
/// Every other view is derived from the log on demand.
#[derive(Clone)]
pub struct AnalyticsService {
    events: Arc<dyn KeyValueStore<String, Vec<AnalyticsEvent>>>,
    summaries: Arc<dyn KeyValueStore<String, UserAnalytics>>,
    clock: Arc<dyn Clock>,
}

impl AnalyticsService {
    pub fn new(
        events: Arc<dyn KeyValueStore<String, Vec<AnalyticsEvent>>>,
        summaries: Arc<dyn KeyValueStore<String, UserAnalytics>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            events,
            summaries,
            clock,
        }
    }

    pub fn record_event(
        &self,
        user_id: &str,
        payload: EventPayload,
        session_id: Option<String>,
    ) -> Result<AnalyticsEvent> {
        let now = self.clock.now();
        let event = AnalyticsEvent {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            payload,
            timestamp: now,
            session_id,
        };

        self.events.upsert(
            user_id.to_string(),
            &Vec::new,
            &mut |log| log.push(event.clone()),
        )?;
        self.summaries.upsert(
            user_id.to_string(),
            &|| UserAnalytics::new(user_id, now),
            &mut |summary| summary.apply(&event),
        )?;

        tracing::debug!(
            user_id,
            event_type = event.payload.event_type(),
            event_id = %event.id,
            "Analytics event recorded"
        );
        Ok(event)
    }

    /// The stored running record, unfiltered.
    pub fn snapshot(&self, user_id: &str) -> Result<Option<UserAnalytics>> {
        self.summaries.get(&user_id.to_string())
    }

    fn log(&self, user_id: &str) -> Result<Vec<AnalyticsEvent>> {
        Ok(self.events.get(&user_id.to_string())?.unwrap_or_default())
    }

    fn window(&self, user_id: &str, timeframe: Timeframe) -> Result<Vec<AnalyticsEvent>> {
        let events = self.log(user_id)?;
        Ok(match timeframe.days() {
            Some(days) => {
                let cutoff = self.clock.now() - Duration::days(days);
                events.into_iter().filter(|e| e.timestamp >= cutoff).collect()
            }
            None => events,
        })
    }

    /// Stored record with totals recomputed over `timeframe`; `None` for unknown users.
    pub fn user_analytics(
        &self,
        user_id: &str,
        timeframe: Timeframe,
    ) -> Result<Option<UserAnalytics>> {
        let Some(mut analytics) = self.snapshot(user_id)? else {
            return Ok(None);
        };
        let events = self.window(user_id, timeframe)?;
        let answered: Vec<&AnalyticsEvent> =
            events.iter().filter(|e| e.is(QUESTION_ANSWERED)).collect();

        analytics.total_sessions = events.iter().filter(|e| e.is(SESSION_COMPLETED)).count() as u32;
        analytics.total_questions = answered.len() as u32;
        analytics.average_score = average_score(answered.iter().copied());
        analytics.time_spent = events
            .iter()
            .map(|e| match &e.payload {
                EventPayload::TimeSpent(data) => data.minutes.max(0.0),
                _ => 0.0,
            })
            .sum();

        let trend = weekly_means(answered.iter().copied(), self.clock.now());
        let filled: Vec<f64> = trend.into_iter().flatten().collect();
        analytics.improvement_rate = match (filled.first(), filled.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        };

        Ok(Some(analytics))
    }

    pub fn section_analytics(
        &self,
        user_id: &str,
        section: Option<Section>,
        timeframe: Timeframe,
    ) -> Result<Vec<SectionAnalytics>> {
        let events = self.window(user_id, timeframe)?;
        let now = self.clock.now();
        let sections: Vec<Section> = match section {
            Some(s) => vec![s],
            None => Section::ALL.to_vec(),
        };

        Ok(sections
            .into_iter()
            .map(|section| {
                let scoped: Vec<&AnalyticsEvent> =
                    events.iter().filter(|e| e.concerns(section)).collect();
                SectionAnalytics {
                    section,
                    total_attempts: scoped.iter().filter(|e| e.is(QUESTION_ANSWERED)).count(),
                    average_score: average_score(scoped.iter().copied()),
                    average_time_per_question: average_time(scoped.iter().copied()),
                    difficulty_breakdown: difficulty_breakdown(&scoped),
                    common_mistakes: COMMON_MISTAKES[..3].iter().map(|m| m.to_string()).collect(),
                    improvement_trend: weekly_means(scoped.iter().copied(), now)
                        .into_iter()
                        .map(|bucket| bucket.unwrap_or(0.0))
                        .collect(),
                }
            })
            .collect())
    }

    /// Buckets by UTC day for the 7-day window, by Sunday-started week otherwise.
    pub fn progress_over_time(
        &self,
        user_id: &str,
        section: Option<Section>,
        timeframe: Timeframe,
    ) -> Result<Vec<ProgressPoint>> {
        let events = self.window(user_id, timeframe)?;
        let label = section.map_or("all", |s| s.as_str());

        let mut buckets: BTreeMap<String, Vec<&AnalyticsEvent>> = BTreeMap::new();
        for event in events
            .iter()
            .filter(|e| section.map_or(true, |s| e.concerns(s)))
        {
            let day = event.timestamp.date_naive();
            let key = if timeframe == Timeframe::Week {
                day_key(day)
            } else {
                day_key(week_start(day))
            };
            buckets.entry(key).or_default().push(event);
        }

        Ok(buckets
            .into_iter()
            .map(|(date, group)| ProgressPoint {
                date,
                average_score: average_score(group.iter().copied()),
                questions_answered: group.iter().filter(|e| e.is(QUESTION_ANSWERED)).count(),
                time_spent: total_time(group.iter().copied()),
                section: label.to_string(),
            })
            .collect())
    }

    pub fn recommendations(&self, user_id: &str) -> Result<Vec<String>> {
        let Some(analytics) = self.snapshot(user_id)? else {
            return Ok(vec![
                "Start with a practice session to get personalized recommendations".to_string(),
            ]);
        };

        let mut recs = Vec::new();
        if analytics.average_score < 60.0 {
            recs.push("Focus on fundamental concepts before attempting practice tests".to_string());
            recs.push("Review basic grammar and vocabulary".to_string());
        } else if analytics.average_score < 80.0 {
            recs.push("Practice with timed exercises to improve speed and accuracy".to_string());
            if let Some(weakest) = analytics.weakest_section {
                recs.push(format!("Focus on your weakest section: {}", weakest));
            }
        } else {
            recs.push("Take full-length practice tests to maintain your high performance".to_string());
            recs.push("Focus on advanced strategies and time optimization".to_string());
        }

        if days_between(analytics.last_active, self.clock.now()) > 3 {
            recs.push("Practice more regularly - aim for daily sessions".to_string());
        }
        if analytics.streak_days < 7 {
            recs.push("Build a consistent study habit - try to practice every day".to_string());
        }
        if analytics.time_spent < 300.0 {
            recs.push("Increase your study time for better results".to_string());
        }

        recs.truncate(MAX_RECOMMENDATIONS);
        Ok(recs)
    }

    pub fn dashboard(&self, user_id: &str) -> Result<DashboardSummary> {
        let Some(analytics) = self.snapshot(user_id)? else {
            return Ok(DashboardSummary {
                total_sessions: 0,
                total_questions: 0,
                average_score: 0.0,
                time_spent: 0.0,
                streak_days: 0,
                recent_activity: Vec::new(),
                section_scores: BTreeMap::new(),
                weekly_progress: Vec::new(),
            });
        };
        let events = self.log(user_id)?;

        let completed: Vec<&AnalyticsEvent> =
            events.iter().filter(|e| e.is(SESSION_COMPLETED)).collect();
        let recent_activity = completed[completed.len().saturating_sub(RECENT_ACTIVITY_LIMIT)..]
            .iter()
            .map(|e| {
                let (score, questions_answered) = match &e.payload {
                    EventPayload::SessionCompleted(d) => (d.score, d.questions_answered),
                    _ => (None, None),
                };
                RecentActivity {
                    date: e.timestamp,
                    section: e.payload.section().map(str::to_string),
                    score,
                    questions_answered,
                }
            })
            .collect();

        let section_scores = Section::ALL
            .iter()
            .map(|section| {
                let scoped = events
                    .iter()
                    .filter(|e| e.payload.section() == Some(section.as_str()));
                (*section, average_score(scoped))
            })
            .collect();

        let today = self.clock.now().date_naive();
        let weekly_progress = (0..7)
            .rev()
            .map(|back| {
                let day = today - Duration::days(back);
                let on_day: Vec<&AnalyticsEvent> = events
                    .iter()
                    .filter(|e| e.timestamp.date_naive() == day)
                    .collect();
                DailyProgress {
                    date: day_key(day),
                    questions_answered: on_day.iter().filter(|e| e.is(QUESTION_ANSWERED)).count(),
                    average_score: average_score(on_day.iter().copied()),
                    time_spent: total_time(on_day.iter().copied()),
                }
            })
            .collect();

        Ok(DashboardSummary {
            total_sessions: analytics.total_sessions,
            total_questions: analytics.total_questions,
            average_score: analytics.average_score.round(),
            time_spent: analytics.time_spent,
            streak_days: analytics.streak_days,
            recent_activity,
            section_scores,
            weekly_progress,
        })
    }

    /// Plan usage for the current calendar month, read from the event log.
    pub fn usage(&self, user_id: &str) -> Result<UsageStats> {
        let snapshot = self.snapshot(user_id)?;
        let events = self.log(user_id)?;
        let now = self.clock.now();

        let this_month = events
            .iter()
            .filter(|e| e.is(QUESTION_ANSWERED))
            .filter(|e| e.timestamp.year() == now.year() && e.timestamp.month() == now.month())
            .count() as u32;

        Ok(UsageStats {
            questions_attempted: snapshot.as_ref().map_or(0, |a| a.total_questions),
            practice_tests_taken: events.iter().filter(|e| e.is(SESSION_COMPLETED)).count() as u32,
            study_time_minutes: snapshot.as_ref().map_or(0.0, |a| a.time_spent),
            current_streak: snapshot.as_ref().map_or(0, |a| a.streak_days),
            monthly_limit: MONTHLY_QUESTION_LIMIT,
            remaining_questions: MONTHLY_QUESTION_LIMIT.saturating_sub(this_month),
        })
    }
}

/// Rounded mean over events that carry a score; 0 when none do.
fn average_score<'a>(events: impl Iterator<Item = &'a AnalyticsEvent>) -> f64 {
    rounded_mean(events.filter_map(|e| e.payload.score()))
}

fn average_time<'a>(events: impl Iterator<Item = &'a AnalyticsEvent>) -> f64 {
    rounded_mean(events.filter_map(|e| e.payload.time_spent()))
}

fn total_time<'a>(events: impl Iterator<Item = &'a AnalyticsEvent>) -> f64 {
    events.filter_map(|e| e.payload.time_spent()).sum()
}

fn rounded_mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0u32), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        0.0
    } else {
        (sum / n as f64).round()
    }
}

fn difficulty_breakdown(events: &[&AnalyticsEvent]) -> DifficultyBreakdown {
    let stats = |difficulty: Difficulty| {
        let matching: Vec<&AnalyticsEvent> = events
            .iter()
            .copied()
            .filter(|e| e.payload.difficulty() == Some(difficulty))
            .collect();
        DifficultyStats {
            attempts: matching.len(),
            average_score: average_score(matching.into_iter()),
        }
    };
    DifficultyBreakdown {
        easy: stats(Difficulty::Easy),
        medium: stats(Difficulty::Medium),
        hard: stats(Difficulty::Hard),
    }
}

/// Mean score for each of the last four week-long windows ending at `now`, oldest first.
/// The newest window includes `now` itself. A window without scored events is `None`.
fn weekly_means<'a>(
    events: impl Iterator<Item = &'a AnalyticsEvent> + Clone,
    now: DateTime<Utc>,
) -> Vec<Option<f64>> {
    (0..TREND_WEEKS)
        .rev()
        .map(|weeks_back| {
            let end = now - Duration::days(weeks_back * 7);
            let start = end - Duration::days(7);
            let newest = weeks_back == 0;
            let scores: Vec<f64> = events
                .clone()
                .filter(|e| {
                    e.timestamp >= start && (e.timestamp < end || (newest && e.timestamp == end))
                })
                .filter_map(|e| e.payload.score())
                .collect();
            (!scores.is_empty()).then(|| rounded_mean(scores.into_iter()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::store::MemoryStore;
    use crate::models::analytics::{QuestionAnsweredData, SessionCompletedData, TimeSpentData};
    use crate::models::session::SessionSection;
    use crate::utils::time::FixedClock;
    use chrono::TimeZone;
    use serde_json::json;

    fn service() -> (AnalyticsService, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 5, 15, 10, 0, 0).unwrap()));
        let svc = AnalyticsService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
            clock.clone(),
        );
        (svc, clock)
    }

    fn answered(section: Section, score: f64, difficulty: Difficulty) -> EventPayload {
        EventPayload::QuestionAnswered(QuestionAnsweredData {
            section: Some(section),
            question_id: None,
            score: Some(score),
            time_spent: Some(40.0),
            difficulty: Some(difficulty),
        })
    }

    #[test]
    fn dashboard_section_mean_over_answered_scores() {
        let (svc, _) = service();
        for score in [60.0, 80.0, 100.0] {
            svc.record_event("u1", answered(Section::Reading, score, Difficulty::Medium), None)
                .unwrap();
        }
        let dash = svc.dashboard("u1").unwrap();
        assert_eq!(dash.section_scores[&Section::Reading], 80.0);
        assert_eq!(dash.section_scores[&Section::Writing], 0.0);
        assert_eq!(dash.total_questions, 3);
        assert_eq!(dash.average_score, 80.0);
        assert_eq!(dash.weekly_progress.len(), 7);
        assert_eq!(dash.weekly_progress[6].date, "2024-05-15");
        assert_eq!(dash.weekly_progress[6].questions_answered, 3);
    }

    #[test]
    fn unknown_user_gets_empty_views() {
        let (svc, _) = service();
        assert!(svc.user_analytics("ghost", Timeframe::All).unwrap().is_none());
        let dash = svc.dashboard("ghost").unwrap();
        assert_eq!(dash.total_sessions, 0);
        assert!(dash.weekly_progress.is_empty());
        assert_eq!(
            svc.recommendations("ghost").unwrap(),
            vec!["Start with a practice session to get personalized recommendations"]
        );
    }

    #[test]
    fn zero_score_counts_toward_running_mean() {
        let (svc, _) = service();
        svc.record_event("u1", answered(Section::Listening, 0.0, Difficulty::Easy), None)
            .unwrap();
        svc.record_event("u1", answered(Section::Listening, 100.0, Difficulty::Easy), None)
            .unwrap();
        let snap = svc.snapshot("u1").unwrap().unwrap();
        assert_eq!(snap.average_score, 50.0);
        assert_eq!(snap.strongest_section, Some(Section::Listening));
    }

    #[test]
    fn timeframe_window_recomputes_totals() {
        let (svc, clock) = service();
        clock.set(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap());
        svc.record_event("u1", answered(Section::Reading, 40.0, Difficulty::Hard), None)
            .unwrap();
        clock.set(Utc.with_ymd_and_hms(2024, 5, 14, 10, 0, 0).unwrap());
        svc.record_event("u1", answered(Section::Reading, 90.0, Difficulty::Hard), None)
            .unwrap();
        svc.record_event(
            "u1",
            EventPayload::TimeSpent(TimeSpentData {
                minutes: 25.0,
                section: None,
            }),
            None,
        )
        .unwrap();
        clock.set(Utc.with_ymd_and_hms(2024, 5, 15, 10, 0, 0).unwrap());

        let month = svc.user_analytics("u1", Timeframe::Month).unwrap().unwrap();
        assert_eq!(month.total_questions, 1);
        assert_eq!(month.average_score, 90.0);
        assert_eq!(month.time_spent, 25.0);

        let all = svc.user_analytics("u1", Timeframe::All).unwrap().unwrap();
        assert_eq!(all.total_questions, 2);
        assert_eq!(all.average_score, 65.0);
    }

    #[test]
    fn improvement_rate_spans_non_empty_weeks() {
        let (svc, clock) = service();
        clock.set(Utc.with_ymd_and_hms(2024, 4, 25, 10, 0, 0).unwrap());
        svc.record_event("u1", answered(Section::Writing, 60.0, Difficulty::Easy), None)
            .unwrap();
        clock.set(Utc.with_ymd_and_hms(2024, 5, 14, 10, 0, 0).unwrap());
        svc.record_event("u1", answered(Section::Writing, 85.0, Difficulty::Easy), None)
            .unwrap();
        clock.set(Utc.with_ymd_and_hms(2024, 5, 15, 10, 0, 0).unwrap());

        let view = svc.user_analytics("u1", Timeframe::Month).unwrap().unwrap();
        assert_eq!(view.improvement_rate, 25.0);

        let sections = svc
            .section_analytics("u1", Some(Section::Writing), Timeframe::Month)
            .unwrap();
        assert_eq!(sections[0].improvement_trend, vec![0.0, 60.0, 0.0, 85.0]);
        assert_eq!(sections[0].difficulty_breakdown.easy.attempts, 2);
        assert_eq!(sections[0].common_mistakes.len(), 3);
        assert_eq!(sections[0].average_time_per_question, 40.0);
    }

    #[test]
    fn events_stamped_now_land_in_the_newest_week() {
        let (svc, _) = service();
        svc.record_event("u1", answered(Section::Reading, 70.0, Difficulty::Medium), None)
            .unwrap();
        svc.record_event("u1", answered(Section::Reading, 90.0, Difficulty::Medium), None)
            .unwrap();

        let sections = svc
            .section_analytics("u1", Some(Section::Reading), Timeframe::Week)
            .unwrap();
        assert_eq!(sections[0].total_attempts, 2);
        assert_eq!(sections[0].improvement_trend, vec![0.0, 0.0, 0.0, 80.0]);
    }

    #[test]
    fn progress_over_time_groups_and_filters() {
        let (svc, clock) = service();
        // 2024-05-13 is a Monday; its week opens on Sunday 2024-05-12
        clock.set(Utc.with_ymd_and_hms(2024, 5, 13, 8, 0, 0).unwrap());
        svc.record_event("u1", answered(Section::Reading, 70.0, Difficulty::Easy), None)
            .unwrap();
        svc.record_event("u1", answered(Section::Speaking, 50.0, Difficulty::Easy), None)
            .unwrap();
        clock.set(Utc.with_ymd_and_hms(2024, 5, 15, 8, 0, 0).unwrap());
        svc.record_event("u1", answered(Section::Reading, 90.0, Difficulty::Easy), None)
            .unwrap();

        let weekly = svc
            .progress_over_time("u1", Some(Section::Reading), Timeframe::Month)
            .unwrap();
        assert_eq!(weekly.len(), 1);
        assert_eq!(weekly[0].date, "2024-05-12");
        assert_eq!(weekly[0].average_score, 80.0);
        assert_eq!(weekly[0].questions_answered, 2);
        assert_eq!(weekly[0].section, "reading");

        let daily = svc.progress_over_time("u1", None, Timeframe::Week).unwrap();
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].date, "2024-05-13");
        assert_eq!(daily[0].questions_answered, 2);
        assert_eq!(daily[1].section, "all");
    }

    #[test]
    fn recommendations_name_weakest_section_and_cap_at_five() {
        let (svc, _) = service();
        svc.record_event("u1", answered(Section::Reading, 90.0, Difficulty::Easy), None)
            .unwrap();
        svc.record_event("u1", answered(Section::Speaking, 55.0, Difficulty::Easy), None)
            .unwrap();
        let recs = svc.recommendations("u1").unwrap();
        assert!(recs.len() <= 5);
        assert_eq!(recs[1], "Focus on your weakest section: speaking");
        assert!(recs.iter().any(|r| r.contains("consistent study habit")));
    }

    #[test]
    fn usage_is_read_from_the_log() {
        let (svc, _) = service();
        svc.record_event("u1", answered(Section::Reading, 90.0, Difficulty::Easy), None)
            .unwrap();
        svc.record_event(
            "u1",
            EventPayload::SessionCompleted(SessionCompletedData {
                section: Some(SessionSection::Reading),
                score: Some(90.0),
                questions_answered: Some(1),
                time_spent: Some(60.0),
            }),
            Some("s1".into()),
        )
        .unwrap();
        svc.record_event(
            "u1",
            EventPayload::from_parts("custom_ping", json!({"note": "hi"})).unwrap(),
            None,
        )
        .unwrap();

        let usage = svc.usage("u1").unwrap();
        assert_eq!(usage.questions_attempted, 1);
        assert_eq!(usage.practice_tests_taken, 1);
        assert_eq!(usage.monthly_limit, 1000);
        assert_eq!(usage.remaining_questions, 999);

        let dash = svc.dashboard("u1").unwrap();
        assert_eq!(dash.recent_activity.len(), 1);
        assert_eq!(dash.recent_activity[0].section.as_deref(), Some("reading"));
    }
}
