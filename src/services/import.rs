// src/services/import.rs

//! Bulk question import from CSV uploads.
//!
//! Each data row becomes one question. Rows that fail to parse or validate
//! are reported by row number (the header is row 1) and never abort the
//! batch; only an unreadable file or a missing `question_text` column
//! rejects the whole upload.

use std::collections::HashMap;

use serde::Serialize;

use crate::{
    config::{DEFAULT_MARKS, DEFAULT_NEGATIVE_MARKS, IMPORT_PREVIEW_ROWS, MAX_CSV_OPTIONS},
    error::AppError,
    models::question::{Answer, CreateQuestionRequest, OptionInput, Question, QuestionSource, QuestionType},
    services::{access, questions::QuestionBank},
    utils::jwt::Claims,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ImportReport {
    pub message: String,
    pub added: usize,
    pub errors: Vec<RowError>,
}

#[derive(Debug, Serialize)]
pub struct ImportPreview {
    /// Number of data rows in the whole file.
    pub total_rows: usize,
    pub questions: Vec<Question>,
    pub errors: Vec<RowError>,
}

/// One parsed data row: its 1-based line number and the request it produced.
type ParsedRow = (usize, Result<CreateQuestionRequest, String>);

#[derive(Clone)]
pub struct QuestionImporter {
    questions: QuestionBank,
}

impl QuestionImporter {
    pub fn new(questions: QuestionBank) -> Self {
        Self { questions }
    }

    /// Stores every valid row as an admin question.
    pub async fn import(&self, author: &Claims, bytes: &[u8]) -> Result<ImportReport, AppError> {
        access::require_admin(author)?;
        let rows = parse_rows(bytes)?;
        let mut added = 0;
        let mut errors = Vec::new();

        for (row, parsed) in rows {
            let payload = match parsed {
                Ok(payload) => payload,
                Err(message) => {
                    errors.push(RowError { row, message });
                    continue;
                }
            };
            match self.questions.create(author, payload, QuestionSource::Admin).await {
                Ok(_) => added += 1,
                Err(AppError::BadRequest(message)) => errors.push(RowError { row, message }),
                Err(e) => return Err(e),
            }
        }

        tracing::info!(added, failed = errors.len(), "imported questions from csv");
        Ok(ImportReport {
            message: format!("Successfully added {} questions", added),
            added,
            errors,
        })
    }

    /// Parses the first rows without storing anything.
    pub fn preview(&self, author: &Claims, bytes: &[u8]) -> Result<ImportPreview, AppError> {
        access::require_admin(author)?;
        let rows = parse_rows(bytes)?;
        let total_rows = rows.len();
        let mut questions = Vec::new();
        let mut errors = Vec::new();

        for (row, parsed) in rows.into_iter().take(IMPORT_PREVIEW_ROWS) {
            let built = parsed.and_then(|payload| {
                self.questions
                    .build(author, payload, QuestionSource::Admin)
                    .map_err(|e| match e {
                        AppError::BadRequest(message) => message,
                        other => other.to_string(),
                    })
            });
            match built {
                Ok(question) => questions.push(question),
                Err(message) => errors.push(RowError { row, message }),
            }
        }

        Ok(ImportPreview {
            total_rows,
            questions,
            errors,
        })
    }
}

/// Reads the upload into per-row question requests.
fn parse_rows(bytes: &[u8]) -> Result<Vec<ParsedRow>, AppError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| AppError::BadRequest("CSV file must be UTF-8 encoded".to_string()))?;
    let text = text.trim_start_matches('\u{feff}');

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| AppError::BadRequest(format!("Could not read CSV header: {}", e)))?
        .clone();
    if !headers.iter().any(|h| h == "question_text") {
        return Err(AppError::BadRequest(
            "CSV header must include a question_text column".to_string(),
        ));
    }

    Ok(reader
        .records()
        .enumerate()
        .map(|(i, record)| {
            let parsed = record
                .map_err(|e| e.to_string())
                .and_then(|r| {
                    r.deserialize::<HashMap<String, String>>(Some(&headers))
                        .map_err(|e| e.to_string())
                })
                .and_then(|fields| row_to_request(&fields));
            (i + 2, parsed)
        })
        .collect())
}

fn field<'a>(fields: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    fields.get(name).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn number(fields: &HashMap<String, String>, name: &str, default: f64) -> Result<f64, String> {
    match field(fields, name) {
        Some(raw) => raw
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| format!("{} must be a number, got '{}'", name, raw)),
        None => Ok(default),
    }
}

fn truthy(value: Option<&str>) -> bool {
    matches!(
        value.map(str::to_lowercase).as_deref(),
        Some("true" | "1" | "yes")
    )
}

fn row_to_request(fields: &HashMap<String, String>) -> Result<CreateQuestionRequest, String> {
    let question_type: QuestionType = field(fields, "type").unwrap_or("MCQ").parse()?;

    let options = match question_type {
        QuestionType::MCQ | QuestionType::MSQ => (1..=MAX_CSV_OPTIONS)
            .filter_map(|i| {
                field(fields, &format!("option_{}", i)).map(|text| OptionInput {
                    id: None,
                    text: text.to_string(),
                    is_correct: truthy(field(fields, &format!("option_{}_correct", i))),
                })
            })
            .collect(),
        QuestionType::NAT => Vec::new(),
    };

    let correct_answer = match question_type {
        QuestionType::NAT => field(fields, "correct_answer").map(|raw| match raw.parse::<f64>() {
            Ok(n) => Answer::Numeric(n),
            Err(_) => Answer::Single(raw.to_string()),
        }),
        QuestionType::MCQ | QuestionType::MSQ => None,
    };

    Ok(CreateQuestionRequest {
        question_text: field(fields, "question_text").unwrap_or_default().to_string(),
        question_type,
        subject: field(fields, "subject").unwrap_or("General").to_string(),
        topic: field(fields, "topic").unwrap_or("General").to_string(),
        difficulty: field(fields, "difficulty").unwrap_or("medium").to_string(),
        marks: number(fields, "marks", DEFAULT_MARKS)?,
        negative_marks: number(fields, "negative_marks", DEFAULT_NEGATIVE_MARKS)?,
        options,
        correct_answer,
        explanation: field(fields, "explanation").map(str::to_string),
        is_public: None,
    })
}
