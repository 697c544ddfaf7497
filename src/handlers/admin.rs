// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    config::PDF_TEXT_BUDGET,
    error::AppError,
    models::{
        exam_config::CreateExamConfigRequest,
        question::{CreateQuestionRequest, QuestionListParams, QuestionSource},
    },
    services::{catalog::ExamCatalog, import::QuestionImporter, questions::QuestionBank},
    utils::{jwt::Claims, pdf},
};

/// Creates a new question.
/// Admin only. Admin questions are public unless `is_public` says otherwise.
pub async fn create_question(
    State(questions): State<QuestionBank>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let question = questions.create(&claims, payload, QuestionSource::Admin).await?;
    tracing::info!(question_id = %question.id, "admin created question");
    Ok((StatusCode::CREATED, Json(question)))
}

/// Lists questions, answer keys included.
/// Admin only. Supports `subject`, `skip` and `limit`.
pub async fn list_questions(
    State(questions): State<QuestionBank>,
    Query(params): Query<QuestionListParams>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(questions.list(&params).await?))
}

/// Deletes a question.
/// Admin only. Sessions that already drew it skip it at scoring.
pub async fn delete_question(
    State(questions): State<QuestionBank>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    questions.delete(&id).await?;
    tracing::info!(question_id = %id, "admin deleted question");
    Ok(Json(json!({ "message": "Question deleted successfully" })))
}

/// Reads the `file` part of a multipart upload, checking its extension.
async fn read_upload(mut multipart: Multipart, extension: &str) -> Result<Vec<u8>, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_lowercase();
        if !file_name.ends_with(extension) {
            return Err(AppError::BadRequest(format!(
                "File must be a {}",
                extension.trim_start_matches('.').to_uppercase()
            )));
        }

        return Ok(field.bytes().await?.to_vec());
    }

    Err(AppError::BadRequest("No file uploaded".to_string()))
}

/// Imports questions from a CSV upload.
/// Admin only. Bad rows are reported and skipped.
pub async fn upload_csv(
    State(importer): State<QuestionImporter>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let bytes = read_upload(multipart, ".csv").await?;
    Ok(Json(importer.import(&claims, &bytes).await?))
}

/// Dry-run of the CSV import over the first rows. Stores nothing.
pub async fn preview_csv(
    State(importer): State<QuestionImporter>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let bytes = read_upload(multipart, ".csv").await?;
    Ok(Json(importer.preview(&claims, &bytes)?))
}

/// Returns the text layer of a PDF for manual review. Nothing is imported.
pub async fn upload_pdf(multipart: Multipart) -> Result<impl IntoResponse, AppError> {
    let bytes = read_upload(multipart, ".pdf").await?;
    let extracted = pdf::extract_text(bytes, PDF_TEXT_BUDGET).await?;

    Ok(Json(json!({
        "message": "PDF text extracted successfully",
        "extracted_text": extracted.text,
        "truncated": extracted.truncated,
        "total_chars": extracted.total_chars,
        "note": "PDF parsing requires manual review. Please format as CSV for automatic import."
    })))
}

/// Creates an exam configuration.
/// Admin only. Fails if the selected subjects cannot fill it.
pub async fn create_exam(
    State(catalog): State<ExamCatalog>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateExamConfigRequest>,
) -> Result<impl IntoResponse, AppError> {
    let config = catalog.create(&claims, payload).await?;
    Ok((StatusCode::CREATED, Json(config)))
}

/// Lists exam configurations.
/// Admin only.
pub async fn list_exams(State(catalog): State<ExamCatalog>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(catalog.list().await?))
}
