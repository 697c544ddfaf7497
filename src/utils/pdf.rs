// src/utils/pdf.rs

use crate::error::AppError;

/// Text pulled out of an uploaded PDF, cut to a character budget.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedText {
    pub text: String,
    pub truncated: bool,
    pub total_chars: usize,
}

/// Extracts the text layer of a PDF.
///
/// Parsing runs on the blocking pool; a parser failure or panic on a
/// malformed document becomes a `BadRequest`.
pub async fn extract_text(bytes: Vec<u8>, budget: usize) -> Result<ExtractedText, AppError> {
    let full = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| AppError::BadRequest(format!("Error processing PDF: {}", e)))?
        .map_err(|e| AppError::BadRequest(format!("Error processing PDF: {}", e)))?;

    Ok(truncate_chars(&full, budget))
}

/// Cuts `text` to at most `budget` characters (not bytes), appending "..." when cut.
pub fn truncate_chars(text: &str, budget: usize) -> ExtractedText {
    let total_chars = text.chars().count();
    if total_chars <= budget {
        return ExtractedText {
            text: text.to_string(),
            truncated: false,
            total_chars,
        };
    }

    let mut cut: String = text.chars().take(budget).collect();
    cut.push_str("...");
    ExtractedText {
        text: cut,
        truncated: true,
        total_chars,
    }
}
