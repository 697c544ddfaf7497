// src/config.rs

use std::env;
use dotenvy::dotenv;

/// Marks awarded for a correct answer when the author gives none.
pub const DEFAULT_MARKS: f64 = 1.0;

/// Marks deducted for a wrong answer when the author gives none.
pub const DEFAULT_NEGATIVE_MARKS: f64 = 0.33;

/// Exam length used when a configuration omits it (3 hours).
pub const DEFAULT_DURATION_MINUTES: i64 = 180;

/// Character budget for text extracted from uploaded PDFs.
pub const PDF_TEXT_BUDGET: usize = 1000;

/// Rows parsed by the CSV import dry-run.
pub const IMPORT_PREVIEW_ROWS: usize = 10;

/// Option columns recognised per CSV row (`option_1` .. `option_4`).
pub const MAX_CSV_OPTIONS: usize = 4;

/// Upper bound on page size for question listings.
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string. `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    /// Credential lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    /// Whether students may author their own questions.
    pub allow_student_questions: bool,
    pub cors_origins: Vec<String>,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1800);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let allow_student_questions = env::var("ALLOW_STUDENT_QUESTIONS")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8001".to_string());

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            admin_email: env::var("ADMIN_EMAIL").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            allow_student_questions,
            cors_origins,
            bind_addr,
        }
    }

    /// Configuration suitable for tests: in-memory store, short-lived tokens.
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            database_url: None,
            jwt_secret: jwt_secret.to_string(),
            jwt_expiration: 600,
            rust_log: "error".to_string(),
            admin_email: None,
            admin_password: None,
            allow_student_questions: false,
            cors_origins: vec!["http://localhost:3000".to_string()],
            bind_addr: "127.0.0.1:0".to_string(),
        }
    }
}
