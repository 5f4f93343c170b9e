// src/seed.rs

use sqlx::SqlitePool;

use crate::{config::Config, error::AppError, utils::hash::hash_password};

/// A question to seed, with (letter, text, is_correct) option tuples.
struct SeedQuestion {
    text: &'static str,
    options: [(&'static str, &'static str, bool); 4],
}

struct SeedQuiz {
    title: &'static str,
    description: &'static str,
    topic: &'static str,
    questions: &'static [SeedQuestion],
}

/// Seeds the initial user (from env) and the demo quiz catalog.
/// Idempotent: existing users are left alone and the catalog is only
/// written when empty.
pub async fn run(pool: &SqlitePool, config: &Config) -> Result<(), AppError> {
    seed_initial_user(pool, config).await?;
    seed_demo_quizzes(pool).await?;
    Ok(())
}

async fn seed_initial_user(pool: &SqlitePool, config: &Config) -> Result<(), AppError> {
    if let (Some(email), Some(password)) = (&config.seed_user_email, &config.seed_user_password) {
        let user_exists = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(pool)
            .await?;

        if user_exists.is_none() {
            tracing::info!("Seeding initial user: {}", email);
            let hashed_password = hash_password(password)?;
            let name = config.seed_user_name.as_deref().unwrap_or("Admin User");

            sqlx::query("INSERT INTO users (name, email, password) VALUES (?, ?, ?)")
                .bind(name)
                .bind(email)
                .bind(hashed_password)
                .execute(pool)
                .await?;
        }
    }
    Ok(())
}

async fn seed_demo_quizzes(pool: &SqlitePool) -> Result<(), AppError> {
    let quiz_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM quizzes")
        .fetch_one(pool)
        .await?;

    if quiz_count > 0 {
        return Ok(());
    }

    tracing::info!("Seeding demo quiz catalog");

    for quiz in DEMO_QUIZZES {
        let quiz_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO quizzes (title, description, topic, is_active)
            VALUES (?, ?, ?, TRUE)
            RETURNING id
            "#,
        )
        .bind(quiz.title)
        .bind(quiz.description)
        .bind(quiz.topic)
        .fetch_one(pool)
        .await?;

        for (index, question) in quiz.questions.iter().enumerate() {
            let question_id = sqlx::query_scalar::<_, i64>(
                r#"
                INSERT INTO questions (quiz_id, question_text, question_order)
                VALUES (?, ?, ?)
                RETURNING id
                "#,
            )
            .bind(quiz_id)
            .bind(question.text)
            .bind(index as i64 + 1)
            .fetch_one(pool)
            .await?;

            for (letter, text, correct) in &question.options {
                sqlx::query(
                    r#"
                    INSERT INTO question_options (question_id, option_text, option_letter, is_correct)
                    VALUES (?, ?, ?, ?)
                    "#,
                )
                .bind(question_id)
                .bind(text)
                .bind(letter)
                .bind(correct)
                .execute(pool)
                .await?;
            }
        }
    }

    Ok(())
}

const DEMO_QUIZZES: &[SeedQuiz] = &[
    SeedQuiz {
        title: "Test Quiz",
        description: "Test your knowledge of acceleration and physics concepts",
        topic: "Acceleration",
        questions: &[
            SeedQuestion {
                text: "What does speed measure?",
                options: [
                    ("A", "How fast an object is going", true),
                    ("B", "How far an object has traveled", false),
                    ("C", "The rate at which an object slows down", false),
                    ("D", "The rate at which an object speeds up", false),
                ],
            },
            SeedQuestion {
                text: "Which of the following can be used to measure an object's speed?",
                options: [
                    ("A", "Joules", false),
                    ("B", "Newtons", false),
                    ("C", "Miles per hour", true),
                    ("D", "Kilometers per second per second", false),
                ],
            },
            SeedQuestion {
                text: "What is acceleration?",
                options: [
                    ("A", "The distance an object travels", false),
                    ("B", "The speed of an object", false),
                    ("C", "The change in velocity over time", true),
                    ("D", "The force applied to an object", false),
                ],
            },
            SeedQuestion {
                text: "Which unit is used to measure acceleration?",
                options: [
                    ("A", "meters per second", false),
                    ("B", "meters per second squared", true),
                    ("C", "kilometers per hour", false),
                    ("D", "newtons", false),
                ],
            },
            SeedQuestion {
                text: "Which of these is an example of acceleration?",
                options: [
                    ("A", "A car coasts along at 40 km/hr", false),
                    ("B", "A car is parked on the side of the road", false),
                    ("C", "A speeding car brakes to a stop", true),
                    ("D", "A car speeds along at 100 km/hr", false),
                ],
            },
            SeedQuestion {
                text: "What happens when an object accelerates?",
                options: [
                    ("A", "Its velocity changes", true),
                    ("B", "Its mass increases", false),
                    ("C", "Its weight decreases", false),
                    ("D", "Its temperature rises", false),
                ],
            },
            SeedQuestion {
                text: "Which statement about acceleration is true?",
                options: [
                    ("A", "Acceleration only occurs when speeding up", false),
                    ("B", "Acceleration can be positive or negative", true),
                    ("C", "Acceleration is the same as velocity", false),
                    ("D", "Acceleration cannot occur without friction", false),
                ],
            },
            SeedQuestion {
                text: "What is deceleration?",
                options: [
                    ("A", "Speeding up", false),
                    ("B", "Negative acceleration", true),
                    ("C", "Constant velocity", false),
                    ("D", "Zero acceleration", false),
                ],
            },
            SeedQuestion {
                text: "If a car goes from 0 to 60 mph in 10 seconds, what is happening?",
                options: [
                    ("A", "The car is decelerating", false),
                    ("B", "The car is accelerating", true),
                    ("C", "The car has constant velocity", false),
                    ("D", "The car is not moving", false),
                ],
            },
            SeedQuestion {
                text: "What force causes acceleration according to Newton's second law?",
                options: [
                    ("A", "Gravitational force only", false),
                    ("B", "Friction force only", false),
                    ("C", "Net force", true),
                    ("D", "Magnetic force only", false),
                ],
            },
        ],
    },
    SeedQuiz {
        title: "Basic Physics Quiz",
        description: "A shorter quiz on basic physics concepts",
        topic: "Basic Physics",
        questions: &[
            SeedQuestion {
                text: "What is the unit of force?",
                options: [
                    ("A", "Joule", false),
                    ("B", "Newton", true),
                    ("C", "Watt", false),
                    ("D", "Pascal", false),
                ],
            },
            SeedQuestion {
                text: "What is the speed of light in vacuum?",
                options: [
                    ("A", "300,000 km/s", true),
                    ("B", "150,000 km/s", false),
                    ("C", "600,000 km/s", false),
                    ("D", "200,000 km/s", false),
                ],
            },
            SeedQuestion {
                text: "What is gravity on Earth approximately?",
                options: [
                    ("A", "8.8 m/s²", false),
                    ("B", "9.8 m/s²", true),
                    ("C", "10.8 m/s²", false),
                    ("D", "11.8 m/s²", false),
                ],
            },
            SeedQuestion {
                text: "What is energy?",
                options: [
                    ("A", "The ability to do work", true),
                    ("B", "The amount of matter", false),
                    ("C", "The resistance to motion", false),
                    ("D", "The speed of an object", false),
                ],
            },
            SeedQuestion {
                text: "What law states that energy cannot be created or destroyed?",
                options: [
                    ("A", "Newton's First Law", false),
                    ("B", "Law of Universal Gravitation", false),
                    ("C", "Conservation of Energy", true),
                    ("D", "Law of Thermodynamics", false),
                ],
            },
        ],
    },
];
