// src/handlers/questions.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    config::Config,
    error::AppError,
    models::question::{CreateQuestionRequest, QuestionSource, ShareQuestionRequest},
    services::questions::QuestionBank,
    utils::jwt::Claims,
};

/// Lists the questions the caller may see, tagged with how they see each one.
/// Answer keys are never included.
pub async fn list_visible(
    State(questions): State<QuestionBank>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(questions.visible_to(&claims).await?))
}

/// Lets any logged-in user author a question, when enabled.
///
/// Admins go through the same path but keep the admin source and default
/// visibility.
pub async fn create(
    State(questions): State<QuestionBank>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let source = if claims.is_admin() {
        QuestionSource::Admin
    } else if config.allow_student_questions {
        QuestionSource::Student
    } else {
        return Err(AppError::Forbidden(
            "Question authoring is disabled for students".to_string(),
        ));
    };

    let question = questions.create(&claims, payload, source).await?;
    tracing::info!(question_id = %question.id, "user created question");
    Ok((StatusCode::CREATED, Json(question)))
}

/// Deletes a question the caller owns (admins may delete any).
pub async fn delete(
    State(questions): State<QuestionBank>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    questions.delete_as(&claims, &id).await?;
    Ok(Json(json!({ "message": "Question deleted successfully" })))
}

/// Shares a question with other accounts by email.
pub async fn share(
    State(questions): State<QuestionBank>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(payload): Json<ShareQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(questions.share(&claims, &id, payload).await?))
}
