// src/services/catalog.rs

use std::sync::Arc;

use validator::Validate;

use crate::{
    error::AppError,
    models::exam_config::{CreateExamConfigRequest, ExamConfig},
    services::{access, questions::QuestionBank},
    store::{Collection, DocumentStore, Documents, Filter},
    utils::{clock::Clock, html::clean_html, jwt::Claims},
};

/// Exam configurations. Records are immutable once created.
#[derive(Clone)]
pub struct ExamCatalog {
    configs: Documents<ExamConfig>,
    questions: QuestionBank,
    clock: Arc<dyn Clock>,
}

impl ExamCatalog {
    pub fn new(store: Arc<dyn DocumentStore>, questions: QuestionBank, clock: Arc<dyn Clock>) -> Self {
        Self {
            configs: Documents::new(store, Collection::ExamConfigs),
            questions,
            clock,
        }
    }

    /// Creates a configuration after checking the pool can fill it.
    pub async fn create(&self, author: &Claims, payload: CreateExamConfigRequest) -> Result<ExamConfig, AppError> {
        access::require_admin(author)?;
        payload.validate()?;

        let mut subjects: Vec<String> = Vec::new();
        for subject in payload.subjects.iter().map(|s| s.trim()) {
            if subject.is_empty() {
                return Err(AppError::BadRequest("Subject names cannot be empty".to_string()));
            }
            if !subjects.iter().any(|s| s == subject) {
                subjects.push(subject.to_string());
            }
        }

        let available = self.questions.by_subjects(&subjects).await?.len();
        if available < payload.total_questions {
            return Err(AppError::BadRequest(format!(
                "Not enough questions available for this exam: {} requested, {} available",
                payload.total_questions, available
            )));
        }

        let config = ExamConfig {
            id: uuid::Uuid::new_v4().to_string(),
            name: clean_html(payload.name.trim()),
            description: clean_html(payload.description.trim()),
            duration_minutes: payload.duration_minutes,
            total_questions: payload.total_questions,
            subjects,
            randomize_questions: payload.randomize_questions,
            created_by: author.user_id().to_string(),
            created_at: self.clock.now(),
        };

        self.configs.insert(&config.id, &config).await.map_err(|e| {
            tracing::error!("Failed to create exam config: {}", e);
            AppError::from(e)
        })?;

        tracing::info!(exam_config_id = %config.id, total_questions = config.total_questions, "created exam config");
        Ok(config)
    }

    pub async fn list(&self) -> Result<Vec<ExamConfig>, AppError> {
        Ok(self.configs.find(&Filter::new()).await?)
    }

    pub async fn get(&self, id: &str) -> Result<Option<ExamConfig>, AppError> {
        Ok(self.configs.get(id).await?)
    }
}
