// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{Modify, OpenApi};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    handlers::{attempt, auth, catalog},
    models,
    state::AppState,
    utils::jwt::auth_middleware,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login,
        catalog::list_quizzes,
        catalog::get_quiz,
        attempt::start_quiz,
        attempt::submit_answer,
        attempt::complete_quiz,
        attempt::get_results,
        attempt::get_attempt_status,
    ),
    components(schemas(
        models::user::LoginRequest,
        models::user::LoginResponse,
        models::user::PublicUser,
        models::quiz::QuizSummary,
        models::quiz::QuizDetail,
        models::quiz::PublicQuestion,
        models::quiz::PublicOption,
        models::attempt::SubmitAnswerRequest,
        models::attempt::StartQuizResponse,
        models::attempt::AnswerResponse,
        models::attempt::CompleteQuizResponse,
        models::attempt::ResultQuizInfo,
        models::attempt::ReviewOption,
        models::attempt::UserAnswerReview,
        models::attempt::CorrectAnswerReview,
        models::attempt::QuestionResult,
        models::attempt::QuizResultsResponse,
        models::attempt::AttemptStatusResponse,
    )),
    modifiers(&SecurityAddon),
    tags((name = "quiz-server", description = "Quiz attempt API"))
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Assembles the main application router.
///
/// * Login is open; every quiz route sits behind the auth middleware.
/// * Applies global middleware (Trace, CORS) and mounts the Swagger UI.
/// * Injects global state (Database Pool, Config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:5173".parse().unwrap(),
        "http://127.0.0.1:5173".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let quiz_routes = Router::new()
        .route("/quizzes", get(catalog::list_quizzes))
        .route("/quiz/{id}", get(catalog::get_quiz))
        .route("/quiz/{id}/start", post(attempt::start_quiz))
        .route("/quiz-attempt/{id}/answer", post(attempt::submit_answer))
        .route("/quiz-attempt/{id}/complete", post(attempt::complete_quiz))
        .route("/quiz-attempt/{id}/results", get(attempt::get_results))
        .route("/quiz-attempt/{id}/status", get(attempt::get_attempt_status))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = Router::new()
        .route("/login", post(auth::login))
        .merge(quiz_routes);

    Router::new()
        .nest("/api", api_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
