// src/services/scoring.rs

//! Scoring engine: a pure function of a session and a question snapshot.
//!
//! Questions referenced by the session but missing from the snapshot (deleted
//! after the session started) are skipped entirely: they add nothing to any
//! subject bucket or counter. `total_questions` and the percentage
//! denominator stay at the session's original length.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use crate::models::{
    exam_result::{ExamResult, QuestionReview, SubjectScore},
    exam_session::ExamSession,
    question::{Answer, Question, QuestionType},
};

/// Whether `answer` is correct for `question`.
///
/// * MCQ: the answer is the id of the correct option.
/// * MSQ: the answer, read as a set, equals the set of correct option ids.
/// * NAT: both sides parse as numbers and are exactly equal. A parse
///   failure on either side is simply wrong.
pub fn is_correct(question: &Question, answer: &Answer) -> bool {
    match question.question_type {
        QuestionType::MCQ => match answer {
            Answer::Single(id) => question.options.iter().any(|o| o.is_correct && &o.id == id),
            _ => false,
        },
        QuestionType::MSQ => answer.as_option_set() == question.correct_option_ids(),
        QuestionType::NAT => {
            let expected = question.correct_answer.as_ref().and_then(Answer::as_number);
            match (answer.as_number(), expected) {
                (Some(given), Some(expected)) => given == expected,
                _ => false,
            }
        }
    }
}

/// Marks contributed by one question: `(correctness, marks)`.
/// Unanswered questions are `(None, 0.0)` and never incur negative marking.
pub fn evaluate(question: &Question, answer: Option<&Answer>) -> (Option<bool>, f64) {
    match answer {
        None => (None, 0.0),
        Some(answer) if is_correct(question, answer) => (Some(true), question.marks),
        Some(_) => (Some(false), -question.negative_marks),
    }
}

/// Computes the result of `session` as submitted at `submitted_at`.
pub fn score_session(
    session: &ExamSession,
    questions: &HashMap<String, Question>,
    result_id: String,
    submitted_at: DateTime<Utc>,
) -> ExamResult {
    let mut subject_wise_score: BTreeMap<String, SubjectScore> = BTreeMap::new();
    let mut correct = 0;
    let mut incorrect = 0;
    let mut running = 0.0;

    for question_id in &session.questions {
        let Some(question) = questions.get(question_id) else {
            continue;
        };

        let bucket = subject_wise_score
            .entry(question.subject.clone())
            .or_default();
        bucket.total += 1;

        let answer = session.answers.get(question_id);
        if answer.is_some() {
            bucket.attempted += 1;
        }

        match evaluate(question, answer) {
            (Some(true), marks) => {
                correct += 1;
                bucket.correct += 1;
                running += marks;
            }
            (Some(false), penalty) => {
                incorrect += 1;
                running += penalty;
            }
            (None, _) => {}
        }
    }

    let total_questions = session.questions.len();
    let percentage = if total_questions == 0 {
        0.0
    } else {
        correct as f64 / total_questions as f64 * 100.0
    };

    let time_taken_minutes = ((submitted_at - session.start_time).num_seconds() / 60).max(0);

    ExamResult {
        id: result_id,
        user_id: session.user_id.clone(),
        exam_session_id: session.id.clone(),
        total_questions,
        attempted: correct + incorrect,
        correct,
        incorrect,
        score: if running > 0.0 { running } else { 0.0 },
        percentage,
        subject_wise_score,
        time_taken_minutes,
        submitted_at,
    }
}

/// Per-question breakdown in session order, skipping questions no longer stored.
pub fn review(session: &ExamSession, questions: &HashMap<String, Question>) -> Vec<QuestionReview> {
    session
        .questions
        .iter()
        .enumerate()
        .filter_map(|(index, question_id)| {
            let question = questions.get(question_id)?;
            let user_answer = session.answers.get(question_id).cloned();
            let (is_correct, marks_awarded) = evaluate(question, user_answer.as_ref());
            Some(QuestionReview {
                question_number: index + 1,
                question: question.clone(),
                user_answer,
                status: session.status_of(question_id),
                is_correct,
                marks_awarded,
            })
        })
        .collect()
}
