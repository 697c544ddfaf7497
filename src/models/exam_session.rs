// src/models/exam_session.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::question::{Answer, PublicQuestion};

/// Per-question navigation state shown by the exam UI palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStatus {
    NotVisited,
    NotAnswered,
    Answered,
    Marked,
    MarkedAnswered,
}

impl QuestionStatus {
    /// Statuses a client may set when saving an answer.
    pub fn is_submittable(&self) -> bool {
        matches!(
            self,
            QuestionStatus::Answered | QuestionStatus::Marked | QuestionStatus::MarkedAnswered
        )
    }
}

/// One user's attempt at an exam configuration.
///
/// `questions` is fixed at creation. `submitted` only ever goes from false to true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamSession {
    pub id: String,
    pub user_id: String,
    pub exam_config_id: String,
    pub questions: Vec<String>,
    /// Sparse: only questions the user has answered.
    pub answers: BTreeMap<String, Answer>,
    pub question_status: BTreeMap<String, QuestionStatus>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub submitted: bool,
    pub current_question: usize,
}

impl ExamSession {
    /// Builds a fresh session. The first question counts as opened.
    pub fn new(
        id: String,
        user_id: String,
        exam_config_id: String,
        questions: Vec<String>,
        start_time: DateTime<Utc>,
    ) -> Self {
        let mut question_status: BTreeMap<String, QuestionStatus> = questions
            .iter()
            .map(|qid| (qid.clone(), QuestionStatus::NotVisited))
            .collect();
        if let Some(first) = questions.first() {
            question_status.insert(first.clone(), QuestionStatus::NotAnswered);
        }

        Self {
            id,
            user_id,
            exam_config_id,
            questions,
            answers: BTreeMap::new(),
            question_status,
            start_time,
            end_time: None,
            submitted: false,
            current_question: 0,
        }
    }

    pub fn status_of(&self, question_id: &str) -> QuestionStatus {
        self.question_status
            .get(question_id)
            .copied()
            .unwrap_or(QuestionStatus::NotVisited)
    }

    /// Moves the cursor to `index` and marks the question as seen.
    ///
    /// Only `NotVisited` is promoted to `NotAnswered`; answered or marked
    /// questions keep their status. Returns the question id, or `None` if
    /// the index is out of range.
    pub fn visit(&mut self, index: usize) -> Option<String> {
        let question_id = self.questions.get(index)?.clone();
        self.current_question = index;
        if self.status_of(&question_id) == QuestionStatus::NotVisited {
            self.question_status
                .insert(question_id.clone(), QuestionStatus::NotAnswered);
        }
        Some(question_id)
    }

    /// Upserts an answer and overwrites the status with the caller's choice.
    pub fn record_answer(&mut self, question_id: &str, answer: Answer, status: QuestionStatus) {
        self.answers.insert(question_id.to_string(), answer);
        self.question_status.insert(question_id.to_string(), status);
    }
}

/// DTO for saving an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAnswerRequest {
    pub question_id: String,
    pub answer: Answer,
    #[serde(default = "default_status")]
    pub status: QuestionStatus,
}

fn default_status() -> QuestionStatus {
    QuestionStatus::Answered
}

/// Response of the fetch-question-at-index operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionQuestion {
    pub question: PublicQuestion,
    /// 1-based.
    pub question_number: usize,
    pub total_questions: usize,
    pub current_answer: Option<Answer>,
    pub status: QuestionStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> ExamSession {
        ExamSession::new(
            "s1".into(),
            "u1".into(),
            "e1".into(),
            vec!["q1".into(), "q2".into(), "q3".into()],
            Utc::now(),
        )
    }

    #[test]
    fn first_question_opened_on_creation() {
        let s = session();
        assert_eq!(s.status_of("q1"), QuestionStatus::NotAnswered);
        assert_eq!(s.status_of("q2"), QuestionStatus::NotVisited);
        assert_eq!(s.status_of("q3"), QuestionStatus::NotVisited);
        assert_eq!(s.current_question, 0);
        assert!(!s.submitted);
        assert!(s.answers.is_empty());
    }

    #[test]
    fn visit_promotes_not_visited() {
        let mut s = session();
        assert_eq!(s.visit(2).as_deref(), Some("q3"));
        assert_eq!(s.current_question, 2);
        assert_eq!(s.status_of("q3"), QuestionStatus::NotAnswered);
    }

    #[test]
    fn visit_keeps_richer_statuses() {
        let mut s = session();
        s.record_answer("q2", Answer::Single("a".into()), QuestionStatus::Answered);
        s.record_answer("q3", Answer::Single("b".into()), QuestionStatus::MarkedAnswered);
        s.question_status.insert("q1".into(), QuestionStatus::Marked);

        s.visit(0);
        s.visit(1);
        s.visit(2);

        assert_eq!(s.status_of("q1"), QuestionStatus::Marked);
        assert_eq!(s.status_of("q2"), QuestionStatus::Answered);
        assert_eq!(s.status_of("q3"), QuestionStatus::MarkedAnswered);
    }

    #[test]
    fn visit_out_of_range_changes_nothing() {
        let mut s = session();
        let before = s.clone();
        assert_eq!(s.visit(3), None);
        assert_eq!(s, before);
    }

    #[test]
    fn record_answer_overwrites() {
        let mut s = session();
        s.record_answer("q1", Answer::Single("a".into()), QuestionStatus::Marked);
        s.record_answer("q1", Answer::Single("b".into()), QuestionStatus::Answered);
        assert_eq!(s.answers.get("q1"), Some(&Answer::Single("b".into())));
        assert_eq!(s.status_of("q1"), QuestionStatus::Answered);
        assert_eq!(s.questions.len(), 3);
    }

    #[test]
    fn status_wire_names() {
        let v = serde_json::to_value(QuestionStatus::MarkedAnswered).unwrap();
        assert_eq!(v, "marked_answered");
        assert!(serde_json::from_value::<QuestionStatus>("bogus".into()).is_err());
        assert!(!QuestionStatus::NotVisited.is_submittable());
        assert!(QuestionStatus::Marked.is_submittable());
    }
}
