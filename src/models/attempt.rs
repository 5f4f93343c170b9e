// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::models::quiz::QuizDetail;

/// Lifecycle state of a quiz attempt, stored as TEXT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Completed,
}

/// Represents the 'quiz_attempts' table in the database.
/// One row per (user, quiz) pass; created on start, mutated once on
/// completion, never deleted by the API.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,
    pub status: AttemptStatus,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub score: Option<i64>,
    /// Question count snapshotted at start time, so later catalog edits
    /// don't corrupt historical scoring.
    pub total_questions: i64,
}

impl QuizAttempt {
    pub fn is_completed(&self) -> bool {
        self.status == AttemptStatus::Completed
    }
}

/// Represents the 'user_answers' table in the database.
/// One row per (attempt, question), upserted until the attempt completes.
/// `is_correct` is a snapshot of the option's correctness at answer time.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserAnswer {
    pub id: i64,
    pub quiz_attempt_id: i64,
    pub question_id: i64,
    pub selected_option_id: i64,
    pub is_correct: bool,
}

/// DTO for submitting an answer to one question of an attempt.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitAnswerRequest {
    pub question_id: i64,
    pub selected_option_id: i64,
}

/// Response for a successful quiz start, including the full quiz tree so
/// the client can render without a second round trip.
#[derive(Debug, Serialize, ToSchema)]
pub struct StartQuizResponse {
    pub message: String,
    pub attempt_id: i64,
    pub quiz: QuizDetail,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AnswerResponse {
    pub message: String,
    pub is_correct: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CompleteQuizResponse {
    pub message: String,
    pub attempt_id: i64,
    pub score: i64,
    pub total_questions: i64,
}

/// Quiz identity echoed in the results view.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResultQuizInfo {
    pub id: i64,
    pub title: String,
    pub topic: String,
}

/// An option as shown in the review screen (correctness revealed).
#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewOption {
    pub id: i64,
    pub option_letter: String,
    pub option_text: String,
    pub is_correct: bool,
}

/// The caller's recorded selection for one question.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserAnswerReview {
    pub selected_option_id: i64,
    pub selected_option_letter: String,
    pub selected_option_text: String,
    pub is_correct: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CorrectAnswerReview {
    pub option_id: i64,
    pub option_letter: String,
    pub option_text: String,
}

/// One question of the review display, assembled from the catalog and the
/// answer ledger.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionResult {
    pub question_id: i64,
    pub question_text: String,
    pub question_order: i64,
    pub options: Vec<ReviewOption>,
    pub user_answer: UserAnswerReview,
    pub correct_answer: CorrectAnswerReview,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuizResultsResponse {
    pub attempt_id: i64,
    pub quiz: ResultQuizInfo,
    pub score: Option<i64>,
    pub total_questions: i64,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub questions: Vec<QuestionResult>,
}

/// Progress snapshot used by the client to resume an in-progress attempt
/// after reload without replaying answers.
#[derive(Debug, Serialize, ToSchema)]
pub struct AttemptStatusResponse {
    pub attempt_id: i64,
    pub quiz_id: i64,
    pub is_completed: bool,
    pub answered_questions: Vec<i64>,
    pub total_questions: i64,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}
