// src/models/exam_result.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    exam_session::QuestionStatus,
    question::{Answer, Question},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectScore {
    pub correct: usize,
    pub attempted: usize,
    pub total: usize,
}

/// Score sheet of a submitted session. Created exactly once per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamResult {
    pub id: String,
    pub user_id: String,
    pub exam_session_id: String,
    /// Length of the session's question list.
    pub total_questions: usize,
    pub attempted: usize,
    pub correct: usize,
    pub incorrect: usize,
    /// Never negative.
    pub score: f64,
    pub percentage: f64,
    pub subject_wise_score: BTreeMap<String, SubjectScore>,
    pub time_taken_minutes: i64,
    pub submitted_at: DateTime<Utc>,
}

/// One row of the caller's exam history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub session_id: String,
    pub result_id: String,
    pub exam_config_id: Option<String>,
    /// `None` when the session or its configuration is gone.
    pub exam_name: Option<String>,
    pub score: f64,
    pub percentage: f64,
    pub correct: usize,
    pub total_questions: usize,
    pub time_taken_minutes: i64,
    pub submitted_at: DateTime<Utc>,
}

/// Per-question review line, available after submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionReview {
    pub question_number: usize,
    /// Full record, answer key included.
    pub question: Question,
    pub user_answer: Option<Answer>,
    pub status: QuestionStatus,
    /// `None` when unanswered.
    pub is_correct: Option<bool>,
    pub marks_awarded: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedResult {
    pub result: ExamResult,
    pub questions: Vec<QuestionReview>,
}
