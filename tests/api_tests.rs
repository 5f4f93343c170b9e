// tests/api_tests.rs

use quiz_server::{config::Config, routes, state::AppState, utils::hash::hash_password};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

struct TestApp {
    address: String,
    pool: SqlitePool,
    client: reqwest::Client,
}

/// Spawns the app on a random port against a fresh in-memory database.
/// The single-connection pool keeps the in-memory database alive for the
/// lifetime of the test.
async fn spawn_app() -> TestApp {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        seed_user_name: None,
        seed_user_email: None,
        seed_user_password: None,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        pool,
        client: reqwest::Client::new(),
    }
}

/// Inserts a user directly and returns its id.
async fn create_user(app: &TestApp, name: &str, email: &str, password: &str) -> i64 {
    let hashed = hash_password(password).unwrap();
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO users (name, email, password) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(name)
    .bind(email)
    .bind(&hashed)
    .fetch_one(&app.pool)
    .await
    .unwrap()
}

fn unique_email() -> String {
    format!("u_{}@test.local", &uuid::Uuid::new_v4().to_string()[..8])
}

/// Creates a user and logs in, returning a bearer token.
async fn create_user_and_login(app: &TestApp) -> String {
    let email = unique_email();
    create_user(app, "Test User", &email, "password123").await;
    login(app, &email, "password123").await
}

async fn login(app: &TestApp, email: &str, password: &str) -> String {
    let response = app
        .client
        .post(format!("{}/api/login", app.address))
        .json(&serde_json::json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Login request failed");

    assert_eq!(response.status().as_u16(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    body["access_token"].as_str().expect("Token not found").to_string()
}

/// Seeds an active quiz with `question_count` questions, options A-D each.
/// Option B is always the correct one.
async fn seed_quiz(app: &TestApp, title: &str, question_count: i64) -> i64 {
    let quiz_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO quizzes (title, description, topic, is_active)
        VALUES (?, 'A seeded quiz', 'Testing', TRUE)
        RETURNING id
        "#,
    )
    .bind(title)
    .fetch_one(&app.pool)
    .await
    .unwrap();

    for order in 1..=question_count {
        let question_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO questions (quiz_id, question_text, question_order)
            VALUES (?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(quiz_id)
        .bind(format!("Question {}", order))
        .bind(order)
        .fetch_one(&app.pool)
        .await
        .unwrap();

        for letter in ["A", "B", "C", "D"] {
            sqlx::query(
                r#"
                INSERT INTO question_options (question_id, option_text, option_letter, is_correct)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(question_id)
            .bind(format!("Option {}", letter))
            .bind(letter)
            .bind(letter == "B")
            .execute(&app.pool)
            .await
            .unwrap();
        }
    }

    quiz_id
}

/// Question ids of a quiz, in question_order.
async fn question_ids(app: &TestApp, quiz_id: i64) -> Vec<i64> {
    sqlx::query_scalar::<_, i64>(
        "SELECT id FROM questions WHERE quiz_id = ? ORDER BY question_order",
    )
    .bind(quiz_id)
    .fetch_all(&app.pool)
    .await
    .unwrap()
}

async fn option_id(app: &TestApp, question_id: i64, correct: bool) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "SELECT id FROM question_options WHERE question_id = ? AND is_correct = ? LIMIT 1",
    )
    .bind(question_id)
    .bind(correct)
    .fetch_one(&app.pool)
    .await
    .unwrap()
}

async fn start_quiz(app: &TestApp, token: &str, quiz_id: i64) -> reqwest::Response {
    app.client
        .post(format!("{}/api/quiz/{}/start", app.address, quiz_id))
        .bearer_auth(token)
        .send()
        .await
        .expect("Start request failed")
}

async fn submit_answer(
    app: &TestApp,
    token: &str,
    attempt_id: i64,
    question_id: i64,
    selected_option_id: i64,
) -> reqwest::Response {
    app.client
        .post(format!("{}/api/quiz-attempt/{}/answer", app.address, attempt_id))
        .bearer_auth(token)
        .json(&serde_json::json!({
            "question_id": question_id,
            "selected_option_id": selected_option_id,
        }))
        .send()
        .await
        .expect("Answer request failed")
}

async fn complete_quiz(app: &TestApp, token: &str, attempt_id: i64) -> reqwest::Response {
    app.client
        .post(format!("{}/api/quiz-attempt/{}/complete", app.address, attempt_id))
        .bearer_auth(token)
        .send()
        .await
        .expect("Complete request failed")
}

#[tokio::test]
async fn protected_routes_require_token() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(format!("{}/api/quizzes", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let response = app
        .client
        .get(format!("{}/api/quizzes", app.address))
        .bearer_auth("not-a-real-token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let app = spawn_app().await;
    let email = unique_email();
    create_user(&app, "Test User", &email, "password123").await;

    let response = app
        .client
        .post(format!("{}/api/login", app.address))
        .json(&serde_json::json!({ "email": email, "password": "wrong" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn login_returns_usable_token() {
    let app = spawn_app().await;
    seed_quiz(&app, "Physics", 3).await;
    let token = create_user_and_login(&app).await;

    let response = app
        .client
        .get(format!("{}/api/quizzes", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn list_quizzes_shows_only_active_with_counts() {
    let app = spawn_app().await;
    seed_quiz(&app, "Visible", 3).await;
    let hidden_id = seed_quiz(&app, "Hidden", 2).await;
    sqlx::query("UPDATE quizzes SET is_active = FALSE WHERE id = ?")
        .bind(hidden_id)
        .execute(&app.pool)
        .await
        .unwrap();

    let token = create_user_and_login(&app).await;
    let quizzes: serde_json::Value = app
        .client
        .get(format!("{}/api/quizzes", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let quizzes = quizzes.as_array().unwrap();
    assert_eq!(quizzes.len(), 1);
    assert_eq!(quizzes[0]["title"], "Visible");
    assert_eq!(quizzes[0]["questions_count"], 3);
}

#[tokio::test]
async fn get_quiz_returns_questions_in_order_without_answers() {
    let app = spawn_app().await;
    let quiz_id = seed_quiz(&app, "Ordered", 4).await;
    let token = create_user_and_login(&app).await;

    let quiz: serde_json::Value = app
        .client
        .get(format!("{}/api/quiz/{}", app.address, quiz_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let questions = quiz["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 4);
    for (index, question) in questions.iter().enumerate() {
        assert_eq!(question["question_order"], index as i64 + 1);
        let options = question["options"].as_array().unwrap();
        assert_eq!(options.len(), 4);
        // Correctness must not leak to the quiz taker.
        assert!(options[0].get("is_correct").is_none());
    }
}

#[tokio::test]
async fn get_missing_or_inactive_quiz_is_404() {
    let app = spawn_app().await;
    let hidden_id = seed_quiz(&app, "Hidden", 2).await;
    sqlx::query("UPDATE quizzes SET is_active = FALSE WHERE id = ?")
        .bind(hidden_id)
        .execute(&app.pool)
        .await
        .unwrap();
    let token = create_user_and_login(&app).await;

    for quiz_id in [hidden_id, 9999] {
        let response = app
            .client
            .get(format!("{}/api/quiz/{}", app.address, quiz_id))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 404);
    }
}

#[tokio::test]
async fn start_quiz_twice_conflicts_with_same_attempt_id() {
    let app = spawn_app().await;
    let quiz_id = seed_quiz(&app, "Physics", 3).await;
    let token = create_user_and_login(&app).await;

    let first = start_quiz(&app, &token, quiz_id).await;
    assert_eq!(first.status().as_u16(), 200);
    let first_body: serde_json::Value = first.json().await.unwrap();
    let attempt_id = first_body["attempt_id"].as_i64().unwrap();
    assert_eq!(first_body["quiz"]["questions"].as_array().unwrap().len(), 3);

    let second = start_quiz(&app, &token, quiz_id).await;
    assert_eq!(second.status().as_u16(), 409);
    let second_body: serde_json::Value = second.json().await.unwrap();
    assert_eq!(second_body["attempt_id"].as_i64().unwrap(), attempt_id);
}

#[tokio::test]
async fn start_missing_quiz_is_404() {
    let app = spawn_app().await;
    let token = create_user_and_login(&app).await;

    let response = start_quiz(&app, &token, 9999).await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn submit_answer_upserts_single_row() {
    let app = spawn_app().await;
    let quiz_id = seed_quiz(&app, "Physics", 3).await;
    let token = create_user_and_login(&app).await;

    let start: serde_json::Value = start_quiz(&app, &token, quiz_id).await.json().await.unwrap();
    let attempt_id = start["attempt_id"].as_i64().unwrap();
    let question = question_ids(&app, quiz_id).await[0];
    let wrong = option_id(&app, question, false).await;
    let right = option_id(&app, question, true).await;

    let first: serde_json::Value = submit_answer(&app, &token, attempt_id, question, wrong)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(first["is_correct"], false);

    let second: serde_json::Value = submit_answer(&app, &token, attempt_id, question, right)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(second["is_correct"], true);

    // Exactly one row, reflecting the latest selection.
    let (count, selected): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), MAX(selected_option_id) FROM user_answers WHERE quiz_attempt_id = ?",
    )
    .bind(attempt_id)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(count, 1);
    assert_eq!(selected, right);
}

#[tokio::test]
async fn submit_answer_rejects_foreign_question_and_option() {
    let app = spawn_app().await;
    let quiz_id = seed_quiz(&app, "Physics", 2).await;
    let other_quiz_id = seed_quiz(&app, "Chemistry", 2).await;
    let token = create_user_and_login(&app).await;

    let start: serde_json::Value = start_quiz(&app, &token, quiz_id).await.json().await.unwrap();
    let attempt_id = start["attempt_id"].as_i64().unwrap();

    // Question from another quiz
    let foreign_question = question_ids(&app, other_quiz_id).await[0];
    let foreign_option = option_id(&app, foreign_question, true).await;
    let response = submit_answer(&app, &token, attempt_id, foreign_question, foreign_option).await;
    assert_eq!(response.status().as_u16(), 400);

    // Option from another question of the same quiz
    let questions = question_ids(&app, quiz_id).await;
    let other_option = option_id(&app, questions[1], true).await;
    let response = submit_answer(&app, &token, attempt_id, questions[0], other_option).await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn complete_requires_all_answers() {
    let app = spawn_app().await;
    let quiz_id = seed_quiz(&app, "Physics", 3).await;
    let token = create_user_and_login(&app).await;

    let start: serde_json::Value = start_quiz(&app, &token, quiz_id).await.json().await.unwrap();
    let attempt_id = start["attempt_id"].as_i64().unwrap();
    let questions = question_ids(&app, quiz_id).await;

    for question in &questions[..2] {
        let right = option_id(&app, *question, true).await;
        submit_answer(&app, &token, attempt_id, *question, right).await;
    }

    let response = complete_quiz(&app, &token, attempt_id).await;
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["answered"], 2);
    assert_eq!(body["total"], 3);

    let right = option_id(&app, questions[2], true).await;
    submit_answer(&app, &token, attempt_id, questions[2], right).await;

    let response = complete_quiz(&app, &token, attempt_id).await;
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["score"], 3);
    assert_eq!(body["total_questions"], 3);

    // The transition is one-way: a completed attempt is gone from the
    // mutating operations.
    let response = complete_quiz(&app, &token, attempt_id).await;
    assert_eq!(response.status().as_u16(), 404);
    let right = option_id(&app, questions[0], true).await;
    let response = submit_answer(&app, &token, attempt_id, questions[0], right).await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn five_question_quiz_scores_three_of_five() {
    let app = spawn_app().await;
    let quiz_id = seed_quiz(&app, "Physics", 5).await;
    let token = create_user_and_login(&app).await;

    let start: serde_json::Value = start_quiz(&app, &token, quiz_id).await.json().await.unwrap();
    let attempt_id = start["attempt_id"].as_i64().unwrap();
    let questions = question_ids(&app, quiz_id).await;

    // Questions 1-3 answered correctly, 4-5 incorrectly.
    for (index, question) in questions.iter().enumerate() {
        let selected = option_id(&app, *question, index < 3).await;
        let response = submit_answer(&app, &token, attempt_id, *question, selected).await;
        assert_eq!(response.status().as_u16(), 200);
    }

    let body: serde_json::Value = complete_quiz(&app, &token, attempt_id)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["score"], 3);
    assert_eq!(body["total_questions"], 5);
}

#[tokio::test]
async fn results_not_available_until_completed() {
    let app = spawn_app().await;
    let quiz_id = seed_quiz(&app, "Physics", 2).await;
    let token = create_user_and_login(&app).await;

    let start: serde_json::Value = start_quiz(&app, &token, quiz_id).await.json().await.unwrap();
    let attempt_id = start["attempt_id"].as_i64().unwrap();

    let response = app
        .client
        .get(format!("{}/api/quiz-attempt/{}/results", app.address, attempt_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn results_ordered_by_question_order_regardless_of_submission() {
    let app = spawn_app().await;
    let quiz_id = seed_quiz(&app, "Physics", 4).await;
    let token = create_user_and_login(&app).await;

    let start: serde_json::Value = start_quiz(&app, &token, quiz_id).await.json().await.unwrap();
    let attempt_id = start["attempt_id"].as_i64().unwrap();
    let questions = question_ids(&app, quiz_id).await;

    // Submit answers in reverse order.
    for question in questions.iter().rev() {
        let right = option_id(&app, *question, true).await;
        submit_answer(&app, &token, attempt_id, *question, right).await;
    }
    complete_quiz(&app, &token, attempt_id).await;

    let results: serde_json::Value = app
        .client
        .get(format!("{}/api/quiz-attempt/{}/results", app.address, attempt_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(results["score"], 4);
    let review = results["questions"].as_array().unwrap();
    assert_eq!(review.len(), 4);
    for (index, question) in review.iter().enumerate() {
        assert_eq!(question["question_order"], index as i64 + 1);
        assert_eq!(question["user_answer"]["is_correct"], true);
        assert_eq!(question["correct_answer"]["option_letter"], "B");
        assert_eq!(question["options"].as_array().unwrap().len(), 4);
    }
}

#[tokio::test]
async fn cross_user_attempt_access_is_not_found() {
    let app = spawn_app().await;
    let quiz_id = seed_quiz(&app, "Physics", 2).await;
    let owner_token = create_user_and_login(&app).await;
    let other_token = create_user_and_login(&app).await;

    let start: serde_json::Value = start_quiz(&app, &owner_token, quiz_id)
        .await
        .json()
        .await
        .unwrap();
    let attempt_id = start["attempt_id"].as_i64().unwrap();
    let question = question_ids(&app, quiz_id).await[0];
    let right = option_id(&app, question, true).await;

    // Never 403: a foreign attempt id must be indistinguishable from an
    // absent one.
    for path in ["status", "results"] {
        let response = app
            .client
            .get(format!(
                "{}/api/quiz-attempt/{}/{}",
                app.address, attempt_id, path
            ))
            .bearer_auth(&other_token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 404);
    }

    let response = submit_answer(&app, &other_token, attempt_id, question, right).await;
    assert_eq!(response.status().as_u16(), 404);

    let response = complete_quiz(&app, &other_token, attempt_id).await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn attempt_status_reports_progress() {
    let app = spawn_app().await;
    let quiz_id = seed_quiz(&app, "Physics", 3).await;
    let token = create_user_and_login(&app).await;

    let start: serde_json::Value = start_quiz(&app, &token, quiz_id).await.json().await.unwrap();
    let attempt_id = start["attempt_id"].as_i64().unwrap();
    let questions = question_ids(&app, quiz_id).await;

    for question in &questions[..2] {
        let right = option_id(&app, *question, true).await;
        submit_answer(&app, &token, attempt_id, *question, right).await;
    }

    let status: serde_json::Value = app
        .client
        .get(format!("{}/api/quiz-attempt/{}/status", app.address, attempt_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(status["is_completed"], false);
    assert_eq!(status["quiz_id"], quiz_id);
    assert_eq!(status["total_questions"], 3);
    assert_eq!(status["answered_questions"].as_array().unwrap().len(), 2);
    assert!(status["completed_at"].is_null());

    let right = option_id(&app, questions[2], true).await;
    submit_answer(&app, &token, attempt_id, questions[2], right).await;
    complete_quiz(&app, &token, attempt_id).await;

    let status: serde_json::Value = app
        .client
        .get(format!("{}/api/quiz-attempt/{}/status", app.address, attempt_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(status["is_completed"], true);
    assert!(!status["completed_at"].is_null());
}
