// src/handlers/catalog.rs

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::quiz::{PublicQuestion, Question, QuestionOption, Quiz, QuizDetail, QuizSummary},
};

/// Lists all active quizzes with their question counts.
#[utoipa::path(
    get,
    path = "/api/quizzes",
    responses(
        (status = 200, description = "Active quizzes", body = [QuizSummary]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_quizzes(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let quizzes = sqlx::query_as::<_, QuizSummary>(
        r#"
        SELECT
            q.id, q.title, q.description, q.topic, q.image_url, q.is_active,
            (SELECT COUNT(*) FROM questions WHERE quiz_id = q.id) AS questions_count
        FROM quizzes q
        WHERE q.is_active = TRUE
        ORDER BY q.id
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list quizzes: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(quizzes))
}

/// Retrieves an active quiz with questions and options for rendering.
#[utoipa::path(
    get,
    path = "/api/quiz/{id}",
    params(("id" = i64, Path, description = "Quiz id")),
    responses(
        (status = 200, description = "Quiz with questions and options", body = QuizDetail),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Quiz missing or inactive")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_quiz(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = load_quiz_detail(&pool, id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    Ok(Json(quiz))
}

/// Loads the full tree of an active quiz: questions by `question_order`,
/// options by `option_letter`. Returns `None` if the quiz is missing or
/// inactive. Correct answers are not exposed here.
pub async fn load_quiz_detail(
    pool: &SqlitePool,
    quiz_id: i64,
) -> Result<Option<QuizDetail>, AppError> {
    let quiz = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, title, description, topic, image_url, is_active, created_at
        FROM quizzes
        WHERE id = ? AND is_active = TRUE
        "#,
    )
    .bind(quiz_id)
    .fetch_optional(pool)
    .await?;

    let Some(quiz) = quiz else {
        return Ok(None);
    };

    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, quiz_id, question_text, question_order
        FROM questions
        WHERE quiz_id = ?
        ORDER BY question_order
        "#,
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    let options = sqlx::query_as::<_, QuestionOption>(
        r#"
        SELECT o.id, o.question_id, o.option_text, o.option_letter, o.is_correct
        FROM question_options o
        JOIN questions q ON o.question_id = q.id
        WHERE q.quiz_id = ?
        ORDER BY o.option_letter
        "#,
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    let mut options_by_question: HashMap<i64, Vec<QuestionOption>> = HashMap::new();
    for option in options {
        options_by_question
            .entry(option.question_id)
            .or_default()
            .push(option);
    }

    let questions = questions
        .into_iter()
        .map(|q| PublicQuestion {
            id: q.id,
            question_text: q.question_text,
            question_order: q.question_order,
            options: options_by_question
                .remove(&q.id)
                .unwrap_or_default()
                .into_iter()
                .map(Into::into)
                .collect(),
        })
        .collect();

    Ok(Some(QuizDetail {
        id: quiz.id,
        title: quiz.title,
        description: quiz.description,
        topic: quiz.topic,
        image_url: quiz.image_url,
        questions,
    }))
}
