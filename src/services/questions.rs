// src/services/questions.rs

use std::{collections::HashMap, sync::Arc};

use validator::Validate;

use crate::{
    config::MAX_PAGE_SIZE,
    error::AppError,
    models::question::{
        CreateQuestionRequest, Question, QuestionListParams, QuestionOption, QuestionSource,
        QuestionType, ShareQuestionRequest, ShareRecord, ShareResponse, VisibleQuestion,
    },
    services::{access, users::UserDirectory},
    store::{Collection, DocumentStore, Documents, Filter},
    utils::{
        clock::Clock,
        html::{clean_html, clean_opt},
        jwt::Claims,
    },
};

/// The question store: authoring, lookup, deletion, sharing and visibility.
#[derive(Clone)]
pub struct QuestionBank {
    questions: Documents<Question>,
    shares: Documents<ShareRecord>,
    users: UserDirectory,
    clock: Arc<dyn Clock>,
}

impl QuestionBank {
    pub fn new(store: Arc<dyn DocumentStore>, users: UserDirectory, clock: Arc<dyn Clock>) -> Self {
        Self {
            questions: Documents::new(store.clone(), Collection::Questions),
            shares: Documents::new(store, Collection::QuestionShares),
            users,
            clock,
        }
    }

    /// Validates and stores a new question authored by `author`.
    pub async fn create(
        &self,
        author: &Claims,
        payload: CreateQuestionRequest,
        source: QuestionSource,
    ) -> Result<Question, AppError> {
        let question = self.build(author, payload, source)?;

        self.questions
            .insert(&question.id, &question)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create question: {}", e);
                AppError::from(e)
            })?;

        Ok(question)
    }

    /// Turns a request into a record without storing it.
    pub fn build(
        &self,
        author: &Claims,
        payload: CreateQuestionRequest,
        source: QuestionSource,
    ) -> Result<Question, AppError> {
        payload.validate()?;
        payload.check_shape().map_err(AppError::BadRequest)?;

        let options = payload
            .options
            .iter()
            .map(|o| QuestionOption {
                id: o
                    .id
                    .clone()
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                text: clean_html(o.text.trim()),
                is_correct: o.is_correct,
            })
            .collect();

        let correct_answer = match payload.question_type {
            QuestionType::NAT => payload.correct_answer,
            QuestionType::MCQ | QuestionType::MSQ => None,
        };

        Ok(Question {
            id: uuid::Uuid::new_v4().to_string(),
            question_text: clean_html(payload.question_text.trim()),
            question_type: payload.question_type,
            subject: payload.subject.trim().to_string(),
            topic: payload.topic.trim().to_string(),
            difficulty: payload.difficulty.trim().to_lowercase(),
            marks: payload.marks,
            negative_marks: payload.negative_marks,
            options,
            correct_answer,
            explanation: clean_opt(payload.explanation.as_deref()),
            created_by: author.user_id().to_string(),
            is_public: payload
                .is_public
                .unwrap_or(source == QuestionSource::Admin),
            shared_with: Vec::new(),
            source,
            created_at: self.clock.now(),
        })
    }

    /// Admin listing with optional subject filter and skip/limit paging.
    pub async fn list(&self, params: &QuestionListParams) -> Result<Vec<Question>, AppError> {
        let filter = match &params.subject {
            Some(subject) => Filter::new().eq("subject", subject.as_str()),
            None => Filter::new(),
        };
        let limit = params.limit.unwrap_or(MAX_PAGE_SIZE).min(MAX_PAGE_SIZE);

        Ok(self
            .questions
            .find(&filter)
            .await?
            .into_iter()
            .skip(params.skip.unwrap_or(0))
            .take(limit)
            .collect())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Question>, AppError> {
        Ok(self.questions.get(id).await?)
    }

    /// Unconditional delete (admin route).
    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        if !self.questions.delete(id).await? {
            return Err(AppError::NotFound("Question not found".to_string()));
        }
        Ok(())
    }

    /// Delete on behalf of `caller`: owners and admins only.
    pub async fn delete_as(&self, caller: &Claims, id: &str) -> Result<(), AppError> {
        let question = self.visible_question(caller, id).await?;
        if !access::can_manage(caller, &question) {
            return Err(AppError::Forbidden(
                "Only the owner or an admin can delete this question".to_string(),
            ));
        }
        self.delete(id).await
    }

    /// All questions whose subject is one of `subjects`, in store order.
    pub async fn by_subjects(&self, subjects: &[String]) -> Result<Vec<Question>, AppError> {
        Ok(self
            .questions
            .find(&Filter::new().is_in("subject", subjects.iter().map(String::as_str)))
            .await?)
    }

    /// Current records for `ids`, keyed by id. Ids that no longer exist are absent.
    pub async fn snapshot(&self, ids: &[String]) -> Result<HashMap<String, Question>, AppError> {
        Ok(self
            .questions
            .find(&Filter::new().is_in("id", ids.iter().map(String::as_str)))
            .await?
            .into_iter()
            .map(|q| (q.id.clone(), q))
            .collect())
    }

    /// Grants read access to the accounts behind `payload.emails`.
    ///
    /// Unknown emails are dropped and reported back; if none resolve the
    /// request is rejected.
    pub async fn share(
        &self,
        caller: &Claims,
        id: &str,
        payload: ShareQuestionRequest,
    ) -> Result<ShareResponse, AppError> {
        payload.validate()?;

        let mut question = self.visible_question(caller, id).await?;
        if !access::can_manage(caller, &question) {
            return Err(AppError::Forbidden(
                "Only the owner or an admin can share this question".to_string(),
            ));
        }

        let (recipients, unknown_emails) = self.users.resolve_emails(&payload.emails).await?;
        if !unknown_emails.is_empty() {
            tracing::warn!(
                question_id = %id,
                "dropping {} unknown share recipient(s)",
                unknown_emails.len()
            );
        }
        if recipients.is_empty() {
            return Err(AppError::BadRequest("No valid recipients found".to_string()));
        }

        for user in &recipients {
            if !question.shared_with.contains(&user.id) {
                question.shared_with.push(user.id.clone());
            }
        }

        if !self.questions.replace(&question.id, &question).await? {
            return Err(AppError::NotFound("Question not found".to_string()));
        }

        let record = ShareRecord {
            id: uuid::Uuid::new_v4().to_string(),
            question_id: question.id.clone(),
            shared_by: caller.user_id().to_string(),
            recipient_ids: recipients.iter().map(|u| u.id.clone()).collect(),
            message: clean_opt(payload.message.as_deref()),
            created_at: self.clock.now(),
        };
        self.shares.insert(&record.id, &record).await?;

        Ok(ShareResponse {
            question_id: question.id,
            shared_with: recipients.into_iter().map(|u| u.email).collect(),
            unknown_emails,
        })
    }

    /// Questions the caller may see, each tagged with how they see it.
    pub async fn visible_to(&self, caller: &Claims) -> Result<Vec<VisibleQuestion>, AppError> {
        Ok(self
            .questions
            .find(&Filter::new())
            .await?
            .iter()
            .filter_map(|q| {
                access::relation_to(caller, q).map(|relation| VisibleQuestion {
                    question: q.into(),
                    created_by: q.created_by.clone(),
                    source: q.source,
                    is_public: q.is_public,
                    relation,
                })
            })
            .collect())
    }

    /// Fetches a question, reporting hidden ones as absent.
    async fn visible_question(&self, caller: &Claims, id: &str) -> Result<Question, AppError> {
        self.questions
            .get(id)
            .await?
            .filter(|q| access::relation_to(caller, q).is_some())
            .ok_or_else(|| AppError::NotFound("Question not found".to_string()))
    }
}
