// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use utoipa::ToSchema;

/// Represents the 'quizzes' table in the database.
/// Catalog rows are read-only at runtime; they are seeded out-of-band.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub topic: String,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'questions' table in the database.
/// `question_order` defines display and review ordering, unique within a quiz.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,
    pub question_text: String,
    pub question_order: i64,
}

/// Represents the 'question_options' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: i64,
    pub question_id: i64,
    pub option_text: String,
    pub option_letter: String,
    pub is_correct: bool,
}

/// Quiz list row with its question count.
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct QuizSummary {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub topic: String,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub questions_count: i64,
}

/// DTO for sending an option to a quiz taker (excludes is_correct).
#[derive(Debug, Serialize, ToSchema)]
pub struct PublicOption {
    pub id: i64,
    pub option_letter: String,
    pub option_text: String,
}

impl From<QuestionOption> for PublicOption {
    fn from(option: QuestionOption) -> Self {
        PublicOption {
            id: option.id,
            option_letter: option.option_letter,
            option_text: option.option_text,
        }
    }
}

/// DTO for a question as shown while taking a quiz.
#[derive(Debug, Serialize, ToSchema)]
pub struct PublicQuestion {
    pub id: i64,
    pub question_text: String,
    pub question_order: i64,
    pub options: Vec<PublicOption>,
}

/// Full quiz tree for rendering: questions in order, options by letter.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuizDetail {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub topic: String,
    pub image_url: Option<String>,
    pub questions: Vec<PublicQuestion>,
}
