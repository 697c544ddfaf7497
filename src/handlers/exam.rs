// src/handlers/exam.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    error::AppError,
    models::exam_session::SubmitAnswerRequest,
    services::{catalog::ExamCatalog, sessions::SessionManager},
    utils::jwt::Claims,
};

/// Lists exams a logged-in user can start.
pub async fn list_available(State(catalog): State<ExamCatalog>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(catalog.list().await?))
}

/// Starts an exam, or returns the caller's unfinished session for it.
pub async fn start(
    State(sessions): State<SessionManager>,
    Extension(claims): Extension<Claims>,
    Path(exam_config_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(sessions.start(&claims, &exam_config_id).await?))
}

pub async fn get_session(
    State(sessions): State<SessionManager>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(sessions.get(&claims, &session_id).await?))
}

/// Serves one question of an open session, without its answer key.
pub async fn get_question(
    State(sessions): State<SessionManager>,
    Extension(claims): Extension<Claims>,
    Path((session_id, index)): Path<(String, usize)>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(sessions.question_at(&claims, &session_id, index).await?))
}

/// Saves or overwrites the answer to one question.
pub async fn submit_answer(
    State(sessions): State<SessionManager>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<String>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    sessions.submit_answer(&claims, &session_id, payload).await?;
    Ok(Json(json!({ "message": "Answer saved successfully" })))
}

/// Scores the session. Submitting again returns the same result.
pub async fn submit(
    State(sessions): State<SessionManager>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(sessions.submit(&claims, &session_id).await?))
}

pub async fn get_result(
    State(sessions): State<SessionManager>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(sessions.result(&claims, &session_id).await?))
}

/// Result with every question, its key, explanation and the marks it earned.
pub async fn get_detailed_result(
    State(sessions): State<SessionManager>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(sessions.detailed_result(&claims, &session_id).await?))
}

/// The caller's submitted exams, newest first.
pub async fn history(
    State(sessions): State<SessionManager>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(sessions.history(&claims).await?))
}
