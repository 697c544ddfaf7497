// src/models/question.rs

use std::{collections::BTreeSet, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::{DEFAULT_MARKS, DEFAULT_NEGATIVE_MARKS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionType {
    /// Single correct option.
    MCQ,
    /// One or more correct options; scored by exact set match.
    MSQ,
    /// Numeric free response.
    NAT,
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "MCQ" => Ok(QuestionType::MCQ),
            "MSQ" => Ok(QuestionType::MSQ),
            "NAT" => Ok(QuestionType::NAT),
            other => Err(format!("'{}' is not a valid question type", other)),
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Where a question came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionSource {
    Admin,
    Student,
    Shared,
}

/// A stored answer, or a NAT answer key.
///
/// Deserialized by shape: a JSON number, a string, or an array of strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Numeric(f64),
    Single(String),
    Multiple(BTreeSet<String>),
}

impl Answer {
    /// Numeric reading used for NAT comparison. Unparseable or non-finite values yield `None`.
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            Answer::Numeric(n) => Some(*n),
            Answer::Single(s) => s.trim().parse().ok(),
            Answer::Multiple(_) => None,
        };
        n.filter(|n: &f64| n.is_finite())
    }

    /// Option-id set used for MSQ comparison; a single value becomes a one-element set.
    pub fn as_option_set(&self) -> BTreeSet<String> {
        match self {
            Answer::Multiple(ids) => ids.clone(),
            Answer::Single(id) => BTreeSet::from([id.clone()]),
            Answer::Numeric(n) => BTreeSet::from([n.to_string()]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: String,
    pub text: String,
    pub is_correct: bool,
}

/// A question-bank record. Only `shared_with` changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub question_text: String,
    pub question_type: QuestionType,
    pub subject: String,
    pub topic: String,
    pub difficulty: String,
    pub marks: f64,
    pub negative_marks: f64,
    /// Empty for NAT.
    pub options: Vec<QuestionOption>,
    /// Set for NAT only; MCQ/MSQ correctness lives on the options.
    pub correct_answer: Option<Answer>,
    pub explanation: Option<String>,
    pub created_by: String,
    pub is_public: bool,
    /// User ids this question was explicitly shared with.
    pub shared_with: Vec<String>,
    pub source: QuestionSource,
    pub created_at: DateTime<Utc>,
}

impl Question {
    pub fn correct_option_ids(&self) -> BTreeSet<String> {
        self.options
            .iter()
            .filter(|o| o.is_correct)
            .map(|o| o.id.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicOption {
    pub id: String,
    pub text: String,
}

/// DTO for sending a question to a test taker (no answer key, no explanation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: String,
    pub question_text: String,
    pub question_type: QuestionType,
    pub subject: String,
    pub topic: String,
    pub difficulty: String,
    pub marks: f64,
    pub negative_marks: f64,
    pub options: Vec<PublicOption>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        PublicQuestion {
            id: q.id.clone(),
            question_text: q.question_text.clone(),
            question_type: q.question_type,
            subject: q.subject.clone(),
            topic: q.topic.clone(),
            difficulty: q.difficulty.clone(),
            marks: q.marks,
            negative_marks: q.negative_marks,
            options: q
                .options
                .iter()
                .map(|o| PublicOption {
                    id: o.id.clone(),
                    text: o.text.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptionInput {
    /// Generated when absent.
    pub id: Option<String>,
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

fn default_topic() -> String {
    "General".to_string()
}

fn default_difficulty() -> String {
    "medium".to_string()
}

fn default_marks() -> f64 {
    DEFAULT_MARKS
}

fn default_negative_marks() -> f64 {
    DEFAULT_NEGATIVE_MARKS
}

/// DTO for creating a new question.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 5000))]
    pub question_text: String,
    pub question_type: QuestionType,
    #[validate(length(min = 1, max = 100))]
    pub subject: String,
    #[serde(default = "default_topic")]
    #[validate(length(min = 1, max = 100))]
    pub topic: String,
    #[serde(default = "default_difficulty")]
    #[validate(length(min = 1, max = 20))]
    pub difficulty: String,
    #[serde(default = "default_marks")]
    pub marks: f64,
    #[serde(default = "default_negative_marks")]
    #[validate(range(min = 0.0))]
    pub negative_marks: f64,
    #[serde(default)]
    #[validate(custom(function = validate_options))]
    pub options: Vec<OptionInput>,
    #[serde(default)]
    pub correct_answer: Option<Answer>,
    #[validate(length(max = 5000))]
    pub explanation: Option<String>,
    /// Defaults to public for admin authors and private for students.
    pub is_public: Option<bool>,
}

fn validate_options(options: &[OptionInput]) -> Result<(), validator::ValidationError> {
    for opt in options {
        if opt.text.trim().is_empty() {
            return Err(validator::ValidationError::new("option_text_cannot_be_empty"));
        }
        if opt.text.len() > 1000 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

impl CreateQuestionRequest {
    /// Checks the per-type answer-key invariant:
    /// MCQ exactly one correct option, MSQ at least one, NAT a numeric key and no options.
    pub fn check_shape(&self) -> Result<(), String> {
        if !self.marks.is_finite() || self.marks <= 0.0 {
            return Err("marks must be positive".to_string());
        }
        if !self.negative_marks.is_finite() || self.negative_marks < 0.0 {
            return Err("negative_marks must be zero or more".to_string());
        }
        let correct = self.options.iter().filter(|o| o.is_correct).count();
        match self.question_type {
            QuestionType::MCQ => {
                if self.options.len() < 2 {
                    return Err("MCQ questions need at least two options".to_string());
                }
                if correct != 1 {
                    return Err(format!(
                        "MCQ questions need exactly one correct option, found {}",
                        correct
                    ));
                }
            }
            QuestionType::MSQ => {
                if self.options.len() < 2 {
                    return Err("MSQ questions need at least two options".to_string());
                }
                if correct == 0 {
                    return Err("MSQ questions need at least one correct option".to_string());
                }
            }
            QuestionType::NAT => {
                if !self.options.is_empty() {
                    return Err("NAT questions cannot have options".to_string());
                }
                match &self.correct_answer {
                    Some(answer) if answer.as_number().is_some() => {}
                    Some(_) => return Err("NAT correct_answer must be numeric".to_string()),
                    None => return Err("NAT questions need a correct_answer".to_string()),
                }
            }
        }
        let mut ids = BTreeSet::new();
        for id in self.options.iter().filter_map(|o| o.id.as_deref()) {
            if !ids.insert(id) {
                return Err(format!("duplicate option id '{}'", id));
            }
        }
        Ok(())
    }
}

/// Query parameters for the admin question listing.
#[derive(Debug, Deserialize)]
pub struct QuestionListParams {
    pub subject: Option<String>,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

/// Caller's relation to a visible question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    Own,
    Shared,
    Public,
    Admin,
}

/// Item of the visibility-filtered question listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisibleQuestion {
    #[serde(flatten)]
    pub question: PublicQuestion,
    pub created_by: String,
    pub source: QuestionSource,
    pub is_public: bool,
    pub relation: Relation,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ShareQuestionRequest {
    #[validate(length(min = 1, max = 100))]
    pub emails: Vec<String>,
    #[validate(length(max = 1000))]
    pub message: Option<String>,
}

/// Audit record of one share action (`question_shares` collection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareRecord {
    pub id: String,
    pub question_id: String,
    pub shared_by: String,
    pub recipient_ids: Vec<String>,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShareResponse {
    pub question_id: String,
    pub shared_with: Vec<String>,
    pub unknown_emails: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: serde_json::Value) -> CreateQuestionRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn answer_deserializes_by_shape() {
        let n: Answer = serde_json::from_value(json!(4.5)).unwrap();
        let s: Answer = serde_json::from_value(json!("opt-a")).unwrap();
        let m: Answer = serde_json::from_value(json!(["b", "a", "a"])).unwrap();
        assert_eq!(n, Answer::Numeric(4.5));
        assert_eq!(s, Answer::Single("opt-a".into()));
        assert_eq!(m, Answer::Multiple(BTreeSet::from(["a".into(), "b".into()])));
    }

    #[test]
    fn numeric_reading() {
        assert_eq!(Answer::Single(" 4 ".into()).as_number(), Some(4.0));
        assert_eq!(Answer::Single("four".into()).as_number(), None);
        assert_eq!(Answer::Numeric(2.5).as_number(), Some(2.5));
        assert_eq!(Answer::Multiple(BTreeSet::new()).as_number(), None);
        assert_eq!(Answer::Single("inf".into()).as_number(), None);
        assert_eq!(Answer::Single("NaN".into()).as_number(), None);
        assert_eq!(Answer::Single("1e999".into()).as_number(), None);
        assert_eq!(Answer::Numeric(f64::INFINITY).as_number(), None);
    }

    #[test]
    fn non_finite_marks_and_keys_are_rejected() {
        let base = || {
            request(json!({
                "question_text": "n?",
                "question_type": "NAT",
                "subject": "Math",
                "correct_answer": 4
            }))
        };

        let mut infinite = base();
        infinite.marks = f64::INFINITY;
        assert!(infinite.check_shape().is_err());

        let mut nan_penalty = base();
        nan_penalty.negative_marks = f64::NAN;
        assert!(nan_penalty.check_shape().is_err());

        let mut nan_key = base();
        nan_key.correct_answer = Some(Answer::Single("NaN".into()));
        assert!(nan_key.check_shape().is_err());

        assert!(base().check_shape().is_ok());
    }

    #[test]
    fn single_answer_wraps_into_set() {
        assert_eq!(
            Answer::Single("a".into()).as_option_set(),
            BTreeSet::from(["a".to_string()])
        );
    }

    #[test]
    fn defaults_applied() {
        let req = request(json!({
            "question_text": "2+2?",
            "question_type": "NAT",
            "subject": "Math",
            "correct_answer": 4
        }));
        assert_eq!(req.topic, "General");
        assert_eq!(req.difficulty, "medium");
        assert_eq!(req.marks, DEFAULT_MARKS);
        assert_eq!(req.negative_marks, DEFAULT_NEGATIVE_MARKS);
        assert!(req.check_shape().is_ok());
    }

    #[test]
    fn mcq_needs_exactly_one_correct_option() {
        let two_correct = request(json!({
            "question_text": "Pick",
            "question_type": "MCQ",
            "subject": "Math",
            "options": [
                {"text": "a", "is_correct": true},
                {"text": "b", "is_correct": true}
            ]
        }));
        assert!(two_correct.check_shape().is_err());

        let one_correct = request(json!({
            "question_text": "Pick",
            "question_type": "MCQ",
            "subject": "Math",
            "options": [
                {"text": "a", "is_correct": true},
                {"text": "b"}
            ]
        }));
        assert!(one_correct.check_shape().is_ok());
    }

    #[test]
    fn msq_needs_a_correct_option() {
        let none_correct = request(json!({
            "question_text": "Pick",
            "question_type": "MSQ",
            "subject": "Math",
            "options": [{"text": "a"}, {"text": "b"}]
        }));
        assert!(none_correct.check_shape().is_err());
    }

    #[test]
    fn nat_rejects_options_and_text_keys() {
        let with_options = request(json!({
            "question_text": "n?",
            "question_type": "NAT",
            "subject": "Math",
            "options": [{"text": "a", "is_correct": true}],
            "correct_answer": 1
        }));
        assert!(with_options.check_shape().is_err());

        let text_key = request(json!({
            "question_text": "n?",
            "question_type": "NAT",
            "subject": "Math",
            "correct_answer": "four"
        }));
        assert!(text_key.check_shape().is_err());
    }

    #[test]
    fn public_question_has_no_key_fields() {
        let q = Question {
            id: "q1".into(),
            question_text: "Pick".into(),
            question_type: QuestionType::MCQ,
            subject: "Math".into(),
            topic: "Algebra".into(),
            difficulty: "easy".into(),
            marks: 1.0,
            negative_marks: 0.33,
            options: vec![QuestionOption {
                id: "a".into(),
                text: "A".into(),
                is_correct: true,
            }],
            correct_answer: None,
            explanation: Some("because".into()),
            created_by: "u1".into(),
            is_public: true,
            shared_with: vec![],
            source: QuestionSource::Admin,
            created_at: Utc::now(),
        };
        let payload = serde_json::to_value(PublicQuestion::from(&q)).unwrap();
        assert!(payload.get("correct_answer").is_none());
        assert!(payload.get("explanation").is_none());
        assert!(payload["options"][0].get("is_correct").is_none());
    }
}
