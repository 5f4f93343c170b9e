// src/handlers/attempt.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    handlers::catalog::load_quiz_detail,
    models::{
        attempt::{
            AnswerResponse, AttemptStatus, AttemptStatusResponse, CompleteQuizResponse,
            CorrectAnswerReview, QuestionResult, QuizAttempt, QuizResultsResponse, ResultQuizInfo,
            ReviewOption, StartQuizResponse, SubmitAnswerRequest, UserAnswerReview,
        },
        quiz::QuestionOption,
    },
    utils::jwt::Claims,
};

/// Starts a new attempt for a quiz.
///
/// * 404 if the quiz is missing or inactive.
/// * 409 with the existing attempt id if an in-progress attempt already
///   exists for this (user, quiz), so the client resumes instead of duplicating.
/// * Snapshots `total_questions` at start time and returns the full quiz
///   tree so the client can render without a second round trip.
#[utoipa::path(
    post,
    path = "/api/quiz/{id}/start",
    params(("id" = i64, Path, description = "Quiz id")),
    responses(
        (status = 200, description = "Attempt started", body = StartQuizResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Quiz missing or inactive"),
        (status = 409, description = "In-progress attempt already exists")
    ),
    security(("bearer_auth" = []))
)]
pub async fn start_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let quiz_exists = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM quizzes WHERE id = ? AND is_active = TRUE",
    )
    .bind(quiz_id)
    .fetch_optional(&pool)
    .await?;

    if quiz_exists.is_none() {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    if let Some(attempt_id) = find_open_attempt_id(&pool, user_id, quiz_id).await? {
        return Err(AppError::DuplicateAttempt { attempt_id });
    }

    let total_questions =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM questions WHERE quiz_id = ?")
            .bind(quiz_id)
            .fetch_one(&pool)
            .await?;

    let inserted = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO quiz_attempts (user_id, quiz_id, status, started_at, total_questions)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(quiz_id)
    .bind(AttemptStatus::InProgress)
    .bind(Utc::now())
    .bind(total_questions)
    .fetch_one(&pool)
    .await;

    let attempt_id = match inserted {
        Ok(id) => id,
        // Lost a race with a concurrent start: the partial unique index on
        // (user_id, quiz_id) rejected the second insert. Surface the same
        // conflict the pre-check would have.
        Err(e) if e.to_string().contains("UNIQUE constraint failed") => {
            let existing = find_open_attempt_id(&pool, user_id, quiz_id).await?;
            return match existing {
                Some(attempt_id) => Err(AppError::DuplicateAttempt { attempt_id }),
                None => Err(AppError::InternalServerError(
                    "Attempt state changed concurrently".to_string(),
                )),
            };
        }
        Err(e) => return Err(e.into()),
    };

    let quiz = load_quiz_detail(&pool, quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    tracing::info!("User {} started attempt {} on quiz {}", user_id, attempt_id, quiz_id);

    Ok(Json(StartQuizResponse {
        message: "Quiz started successfully".to_string(),
        attempt_id,
        quiz,
    }))
}

/// Records the caller's answer to one question of an in-progress attempt.
///
/// * 404 unless an in-progress attempt with this id belongs to the caller
///   (completed attempts are immutable to this operation).
/// * 400 if the question is not in the attempt's quiz, or the option is not
///   in the question.
/// * Upserts on (attempt, question): re-answering overwrites the selection
///   and re-snapshots `is_correct`.
#[utoipa::path(
    post,
    path = "/api/quiz-attempt/{id}/answer",
    params(("id" = i64, Path, description = "Attempt id")),
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Answer recorded", body = AnswerResponse),
        (status = 400, description = "Question or option does not belong to the attempt"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Attempt missing, foreign, or already completed")
    ),
    security(("bearer_auth" = []))
)]
pub async fn submit_answer(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let attempt = find_in_progress_attempt(&pool, attempt_id, user_id)
        .await?
        .ok_or(AppError::NotFound(
            "Quiz attempt not found or already completed".to_string(),
        ))?;

    // Guard against cross-quiz id injection: the question must belong to the
    // attempt's quiz and the option to the question.
    let question_id = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM questions WHERE id = ? AND quiz_id = ?",
    )
    .bind(payload.question_id)
    .bind(attempt.quiz_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::BadRequest(
        "Question does not belong to this quiz".to_string(),
    ))?;

    let is_correct = sqlx::query_scalar::<_, bool>(
        "SELECT is_correct FROM question_options WHERE id = ? AND question_id = ?",
    )
    .bind(payload.selected_option_id)
    .bind(question_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::BadRequest(
        "Option does not belong to this question".to_string(),
    ))?;

    sqlx::query(
        r#"
        INSERT INTO user_answers (quiz_attempt_id, question_id, selected_option_id, is_correct)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (quiz_attempt_id, question_id) DO UPDATE SET
            selected_option_id = excluded.selected_option_id,
            is_correct = excluded.is_correct
        "#,
    )
    .bind(attempt_id)
    .bind(question_id)
    .bind(payload.selected_option_id)
    .bind(is_correct)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to upsert answer: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(AnswerResponse {
        message: "Answer submitted successfully".to_string(),
        is_correct,
    }))
}

/// Finalizes an in-progress attempt and persists the score.
///
/// * 404 unless an in-progress attempt with this id belongs to the caller.
/// * 400 with answered/total counts while any question lacks an answer.
/// * Score is the count of correct answers; the transition is one-way, so a
///   repeated complete yields 404.
#[utoipa::path(
    post,
    path = "/api/quiz-attempt/{id}/complete",
    params(("id" = i64, Path, description = "Attempt id")),
    responses(
        (status = 200, description = "Attempt completed", body = CompleteQuizResponse),
        (status = 400, description = "Not all questions answered"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Attempt missing, foreign, or already completed")
    ),
    security(("bearer_auth" = []))
)]
pub async fn complete_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let attempt = find_in_progress_attempt(&pool, attempt_id, user_id)
        .await?
        .ok_or(AppError::NotFound(
            "Quiz attempt not found or already completed".to_string(),
        ))?;

    let answered = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM user_answers WHERE quiz_attempt_id = ?",
    )
    .bind(attempt_id)
    .fetch_one(&pool)
    .await?;

    if answered < attempt.total_questions {
        return Err(AppError::IncompleteAttempt {
            answered,
            total: attempt.total_questions,
        });
    }

    let score = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM user_answers WHERE quiz_attempt_id = ? AND is_correct = TRUE",
    )
    .bind(attempt_id)
    .fetch_one(&pool)
    .await?;

    // The status filter makes the transition one-way even under a racing
    // duplicate complete: only one UPDATE can observe 'in_progress'.
    let updated = sqlx::query(
        r#"
        UPDATE quiz_attempts
        SET status = ?, completed_at = ?, score = ?
        WHERE id = ? AND status = ?
        "#,
    )
    .bind(AttemptStatus::Completed)
    .bind(Utc::now())
    .bind(score)
    .bind(attempt_id)
    .bind(AttemptStatus::InProgress)
    .execute(&pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound(
            "Quiz attempt not found or already completed".to_string(),
        ));
    }

    tracing::info!(
        "User {} completed attempt {} with score {}/{}",
        user_id,
        attempt_id,
        score,
        attempt.total_questions
    );

    Ok(Json(CompleteQuizResponse {
        message: "Quiz completed successfully".to_string(),
        attempt_id,
        score,
        total_questions: attempt.total_questions,
    }))
}

/// Row of the review join: one answered question with the caller's selection.
#[derive(Debug, sqlx::FromRow)]
struct AnswerRow {
    question_id: i64,
    question_text: String,
    question_order: i64,
    selected_option_id: i64,
    is_correct: bool,
}

/// Returns the review breakdown for a completed attempt.
///
/// 404 unless a *completed* attempt with this id belongs to the caller.
/// Questions come back in `question_order` regardless of the order answers
/// were submitted.
#[utoipa::path(
    get,
    path = "/api/quiz-attempt/{id}/results",
    params(("id" = i64, Path, description = "Attempt id")),
    responses(
        (status = 200, description = "Results breakdown", body = QuizResultsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Attempt missing, foreign, or not completed")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_results(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    #[derive(sqlx::FromRow)]
    struct CompletedAttemptRow {
        id: i64,
        quiz_id: i64,
        score: Option<i64>,
        total_questions: i64,
        completed_at: Option<chrono::DateTime<Utc>>,
        title: String,
        topic: String,
    }

    let attempt = sqlx::query_as::<_, CompletedAttemptRow>(
        r#"
        SELECT a.id, a.quiz_id, a.score, a.total_questions, a.completed_at, q.title, q.topic
        FROM quiz_attempts a
        JOIN quizzes q ON a.quiz_id = q.id
        WHERE a.id = ? AND a.user_id = ? AND a.status = ?
        "#,
    )
    .bind(attempt_id)
    .bind(user_id)
    .bind(AttemptStatus::Completed)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound(
        "Quiz results not found or quiz not completed".to_string(),
    ))?;

    let answers = sqlx::query_as::<_, AnswerRow>(
        r#"
        SELECT q.id AS question_id, q.question_text, q.question_order,
               ua.selected_option_id, ua.is_correct
        FROM user_answers ua
        JOIN questions q ON ua.question_id = q.id
        WHERE ua.quiz_attempt_id = ?
        "#,
    )
    .bind(attempt_id)
    .fetch_all(&pool)
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
    .bind(attempt.quiz_id)
    .fetch_all(&pool)
    .await?;

    let questions = build_question_results(answers, options)?;

    Ok(Json(QuizResultsResponse {
        attempt_id: attempt.id,
        quiz: ResultQuizInfo {
            id: attempt.quiz_id,
            title: attempt.title,
            topic: attempt.topic,
        },
        score: attempt.score,
        total_questions: attempt.total_questions,
        completed_at: attempt.completed_at,
        questions,
    }))
}

/// Assembles review rows from answers and the quiz's options, sorted by
/// `question_order`. A question without a correct option is a catalog
/// integrity violation and surfaces as a 500, not a panic.
fn build_question_results(
    answers: Vec<AnswerRow>,
    options: Vec<QuestionOption>,
) -> Result<Vec<QuestionResult>, AppError> {
    let mut options_by_question: HashMap<i64, Vec<QuestionOption>> = HashMap::new();
    for option in options {
        options_by_question
            .entry(option.question_id)
            .or_default()
            .push(option);
    }

    let mut results = Vec::with_capacity(answers.len());

    for answer in answers {
        let question_options = options_by_question
            .remove(&answer.question_id)
            .unwrap_or_default();

        let selected = question_options
            .iter()
            .find(|o| o.id == answer.selected_option_id)
            .ok_or_else(|| {
                AppError::InternalServerError(format!(
                    "Selected option {} missing for question {}",
                    answer.selected_option_id, answer.question_id
                ))
            })?;

        let correct = question_options
            .iter()
            .find(|o| o.is_correct)
            .ok_or_else(|| {
                AppError::InternalServerError(format!(
                    "Question {} has no correct option",
                    answer.question_id
                ))
            })?;

        let user_answer = UserAnswerReview {
            selected_option_id: selected.id,
            selected_option_letter: selected.option_letter.clone(),
            selected_option_text: selected.option_text.clone(),
            is_correct: answer.is_correct,
        };

        let correct_answer = CorrectAnswerReview {
            option_id: correct.id,
            option_letter: correct.option_letter.clone(),
            option_text: correct.option_text.clone(),
        };

        results.push(QuestionResult {
            question_id: answer.question_id,
            question_text: answer.question_text,
            question_order: answer.question_order,
            options: question_options
                .into_iter()
                .map(|o| ReviewOption {
                    id: o.id,
                    option_letter: o.option_letter,
                    option_text: o.option_text,
                    is_correct: o.is_correct,
                })
                .collect(),
            user_answer,
            correct_answer,
        });
    }

    results.sort_by_key(|q| q.question_order);

    Ok(results)
}

/// Returns the progress snapshot of an attempt, complete or not.
///
/// Used by the client to resume an in-progress attempt after reload without
/// replaying answers. 404 unless the attempt belongs to the caller.
#[utoipa::path(
    get,
    path = "/api/quiz-attempt/{id}/status",
    params(("id" = i64, Path, description = "Attempt id")),
    responses(
        (status = 200, description = "Attempt status", body = AttemptStatusResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Attempt missing or foreign")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_attempt_status(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let attempt = sqlx::query_as::<_, QuizAttempt>(
        r#"
        SELECT id, user_id, quiz_id, status, started_at, completed_at, score, total_questions
        FROM quiz_attempts
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(attempt_id)
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Quiz attempt not found".to_string()))?;

    let answered_questions = sqlx::query_scalar::<_, i64>(
        "SELECT question_id FROM user_answers WHERE quiz_attempt_id = ?",
    )
    .bind(attempt_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(AttemptStatusResponse {
        attempt_id: attempt.id,
        quiz_id: attempt.quiz_id,
        is_completed: attempt.is_completed(),
        answered_questions,
        total_questions: attempt.total_questions,
        started_at: attempt.started_at,
        completed_at: attempt.completed_at,
    }))
}

/// The open attempt id for (user, quiz), if any.
async fn find_open_attempt_id(
    pool: &SqlitePool,
    user_id: i64,
    quiz_id: i64,
) -> Result<Option<i64>, AppError> {
    let id = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM quiz_attempts WHERE user_id = ? AND quiz_id = ? AND status = ?",
    )
    .bind(user_id)
    .bind(quiz_id)
    .bind(AttemptStatus::InProgress)
    .fetch_optional(pool)
    .await?;

    Ok(id)
}

/// The in-progress attempt with this id owned by this user, if any.
/// Absent, foreign and completed attempts are indistinguishable to callers.
async fn find_in_progress_attempt(
    pool: &SqlitePool,
    attempt_id: i64,
    user_id: i64,
) -> Result<Option<QuizAttempt>, AppError> {
    let attempt = sqlx::query_as::<_, QuizAttempt>(
        r#"
        SELECT id, user_id, quiz_id, status, started_at, completed_at, score, total_questions
        FROM quiz_attempts
        WHERE id = ? AND user_id = ? AND status = ?
        "#,
    )
    .bind(attempt_id)
    .bind(user_id)
    .bind(AttemptStatus::InProgress)
    .fetch_optional(pool)
    .await?;

    Ok(attempt)
}
