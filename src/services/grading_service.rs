use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::grading::{DetailedAnalysis, GradingResult};
use crate::models::question::{Question, Section};
use crate::utils::random::RandomSource;

const MULTIPLE_CHOICE_POINTS: u32 = 10;
const SCALED_MAX: u32 = 30;

/// Converts a submitted answer into a score breakdown and feedback.
///
/// Reading and listening are exact-match. Speaking and writing are heuristics; their random
/// terms come from the injected [`RandomSource`].
#[derive(Clone)]
pub struct GradingService {
    random: Arc<dyn RandomSource>,
}

impl GradingService {
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self { random }
    }

    pub fn grade(
        &self,
        question_type: Section,
        submitted: &str,
        correct: Option<&str>,
        audio_ref: Option<&str>,
    ) -> Result<GradingResult> {
        match question_type {
            Section::Reading | Section::Listening => {
                let correct = correct.ok_or_else(|| {
                    Error::BadRequest(format!(
                        "correctAnswer is required for {} questions",
                        question_type
                    ))
                })?;
                Ok(grade_multiple_choice(submitted, correct))
            }
            Section::Speaking => {
                tracing::debug!(audio = ?audio_ref, "grading speaking response");
                Ok(self.grade_speaking())
            }
            Section::Writing => Ok(self.grade_writing(submitted)),
        }
    }

    /// Grades against a catalog item, using its stored answer and audio.
    pub fn grade_question(&self, question: &Question, submitted: &str) -> Result<GradingResult> {
        self.grade(
            question.section,
            submitted,
            question.correct_answer.as_deref(),
            question.audio_url.as_deref(),
        )
    }

    fn grade_speaking(&self) -> GradingResult {
        let pronunciation = self.random.draw(70, 30);
        let fluency = self.random.draw(65, 30);
        let vocabulary = self.random.draw(70, 25);
        let grammar = self.random.draw(70, 25);
        let coherence = self.random.draw(75, 20);

        let percentage = rounded_mean(&[pronunciation, fluency, vocabulary, grammar, coherence]);

        let mut strengths = Vec::new();
        let mut improvements = Vec::new();
        let mut gate = |passed: bool, strength: &str, improvement: &str| {
            if passed {
                strengths.push(strength.to_string());
            } else {
                improvements.push(improvement.to_string());
            }
        };
        gate(pronunciation >= 85, "Clear pronunciation", "Work on pronunciation clarity");
        gate(fluency >= 80, "Good speaking fluency", "Practice speaking more smoothly");
        gate(vocabulary >= 85, "Rich vocabulary usage", "Expand vocabulary range");
        gate(grammar >= 85, "Accurate grammar", "Review grammar structures");
        gate(coherence >= 85, "Well-organized response", "Improve response organization");

        GradingResult {
            score: scale_to_thirty(percentage),
            max_score: SCALED_MAX,
            percentage,
            feedback: speaking_feedback(percentage).to_string(),
            strengths,
            improvements,
            detailed_analysis: DetailedAnalysis {
                pronunciation: Some(pronunciation),
                fluency: Some(fluency),
                vocabulary: Some(vocabulary),
                grammar: Some(grammar),
                coherence: Some(coherence),
                task_response: None,
            },
        }
    }

    fn grade_writing(&self, text: &str) -> GradingResult {
        let words = word_count(text);
        let sentences = sentence_count(text);

        let task_response = (70 + if words > 150 { 20 } else { 0 }).clamp(60, 100);
        let coherence = (75 + if sentences > 3 { 15 } else { 0 }).clamp(65, 100);
        let vocabulary = (80 + if words > 200 { 10 } else { 0 }).clamp(70, 100);
        let grammar = self.random.draw(75, 20).clamp(65, 100);

        let percentage = rounded_mean(&[task_response, coherence, vocabulary, grammar]);

        let mut strengths = Vec::new();
        let mut improvements = Vec::new();
        let mut gate = |passed: bool, strength: &str, improvement: &str| {
            if passed {
                strengths.push(strength.to_string());
            } else {
                improvements.push(improvement.to_string());
            }
        };
        gate(
            words >= 250,
            "Adequate length and development",
            "Develop ideas more fully with more details",
        );
        gate(
            coherence >= 80,
            "Good organization and flow",
            "Improve paragraph structure and transitions",
        );
        gate(vocabulary >= 85, "Varied vocabulary usage", "Use more sophisticated vocabulary");
        gate(
            grammar >= 80,
            "Generally accurate grammar",
            "Review grammar and sentence structures",
        );

        GradingResult {
            score: scale_to_thirty(percentage),
            max_score: SCALED_MAX,
            percentage,
            feedback: writing_feedback(percentage, words),
            strengths,
            improvements,
            detailed_analysis: DetailedAnalysis {
                task_response: Some(task_response),
                coherence: Some(coherence),
                vocabulary: Some(vocabulary),
                grammar: Some(grammar),
                pronunciation: None,
                fluency: None,
            },
        }
    }
}

fn grade_multiple_choice(submitted: &str, correct: &str) -> GradingResult {
    let is_correct = submitted == correct;
    if is_correct {
        GradingResult {
            score: MULTIPLE_CHOICE_POINTS,
            max_score: MULTIPLE_CHOICE_POINTS,
            percentage: 100,
            feedback: "Excellent! You selected the correct answer.".to_string(),
            strengths: vec![
                "Accurate comprehension".to_string(),
                "Good analytical skills".to_string(),
            ],
            improvements: Vec::new(),
            detailed_analysis: DetailedAnalysis {
                task_response: Some(100),
                ..Default::default()
            },
        }
    } else {
        GradingResult {
            score: 0,
            max_score: MULTIPLE_CHOICE_POINTS,
            percentage: 0,
            feedback: format!(
                "Incorrect. The correct answer is: \"{}\". Review the passage carefully to understand why this is the best choice.",
                correct
            ),
            strengths: Vec::new(),
            improvements: vec![
                "Reading comprehension".to_string(),
                "Critical analysis".to_string(),
                "Attention to detail".to_string(),
            ],
            detailed_analysis: DetailedAnalysis {
                task_response: Some(0),
                ..Default::default()
            },
        }
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Non-blank fragments between runs of `.`, `!` or `?`.
pub fn sentence_count(text: &str) -> usize {
    text.split(|c| matches!(c, '.' | '!' | '?'))
        .filter(|s| !s.trim().is_empty())
        .count()
}

fn rounded_mean(values: &[u32]) -> u32 {
    let sum: u32 = values.iter().sum();
    (sum as f64 / values.len() as f64).round() as u32
}

fn scale_to_thirty(percentage: u32) -> u32 {
    (percentage as f64 * 0.3).round() as u32
}

fn speaking_feedback(percentage: u32) -> &'static str {
    match percentage {
        90.. => "Excellent speaking performance! Your response demonstrates strong fluency, clear pronunciation, and effective communication. Continue practicing to maintain this high level.",
        80..=89 => "Good speaking performance with clear communication. Focus on the areas marked for improvement to reach the next level.",
        70..=79 => "Satisfactory speaking performance. Your main ideas come through, but there's room for improvement in fluency and clarity.",
        _ => "Your speaking needs significant improvement. Focus on pronunciation, fluency, and organizing your thoughts more clearly.",
    }
}

fn writing_feedback(percentage: u32, words: usize) -> String {
    let mut feedback = match percentage {
        90.. => "Excellent writing! Your essay demonstrates strong task response, clear organization, and sophisticated language use.",
        80..=89 => "Good writing with clear ideas and generally effective communication.",
        70..=79 => "Satisfactory writing that addresses the task with some effectiveness.",
        _ => "Your writing needs improvement in several areas.",
    }
    .to_string();

    if words < 150 {
        feedback.push_str(
            " Your response is too short - aim for at least 250 words to fully develop your ideas.",
        );
    } else if words > 400 {
        feedback.push_str(
            " Your response is quite long - focus on being more concise while maintaining depth.",
        );
    }
    feedback
}
