// src/models/exam_config.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::DEFAULT_DURATION_MINUTES;

/// Represents an exam configuration. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamConfig {
    pub id: String,
    pub name: String,
    pub description: String,
    pub duration_minutes: i64,
    /// Length of every session started from this configuration.
    pub total_questions: usize,
    /// Questions are drawn from these subjects.
    pub subjects: Vec<String>,
    /// Uniform random sample when set; otherwise the first matching questions.
    pub randomize_questions: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

fn default_duration() -> i64 {
    DEFAULT_DURATION_MINUTES
}

fn default_true() -> bool {
    true
}

/// DTO for creating an exam configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateExamConfigRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,
    #[serde(default = "default_duration")]
    #[validate(range(min = 1, max = 1440))]
    pub duration_minutes: i64,
    #[validate(range(min = 1, max = 1000))]
    pub total_questions: usize,
    #[validate(length(min = 1, max = 50))]
    pub subjects: Vec<String>,
    #[serde(default = "default_true")]
    pub randomize_questions: bool,
}
