// tests/flow_tests.rs
//
// End-to-end flows against a real Postgres. Skipped when DATABASE_URL is unset.

use std::{collections::HashMap, sync::Arc};

use quizup_backend::{config::Config, routes, services::Services, state::AppState};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

async fn spawn_app() -> Option<String> {
    let database_url = std::env::var("DATABASE_URL").ok()?;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url,
        jwt_secret: "test_secret_for_flow_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        server_port: 0,
        cors_origins: Vec::new(),
        admin_username: None,
        admin_email: None,
        admin_password: None,
    };
    let services = Arc::new(Services::new(pool, &config));
    let app = routes::create_router(AppState { config, services });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Some(format!("http://127.0.0.1:{}", port))
}

fn unique(prefix: &str) -> String {
    format!("{}_{}", prefix, &Uuid::new_v4().simple().to_string()[..10])
}

/// Registers a fresh account and returns its bearer token.
async fn register_and_login(client: &Client, address: &str) -> String {
    let username = unique("u");
    let password = "password123";

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": password
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = client
        .post(format!("{}/api/auth/login", address))
        .json(&json!({ "email_or_username": username, "password": password }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let Some(address) = spawn_app().await else {
        return;
    };
    let client = Client::new();
    let token = register_and_login(&client, &address).await;

    let me: Value = client
        .get(format!("{}/api/auth/me", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let username = me["username"].as_str().unwrap().to_string();

    let response = client
        .post(format!("{}/api/auth/login", address))
        .json(&json!({ "email_or_username": username, "password": "wrong-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn practice_attempt_flow() {
    let Some(address) = spawn_app().await else {
        return;
    };
    let client = Client::new();
    let token = register_and_login(&client, &address).await;

    // 1. Author a quiz set with two questions
    let response = client
        .post(format!("{}/api/quiz-sets", address))
        .bearer_auth(&token)
        .json(&json!({ "title": unique("Ownership"), "quiz_type": "practice" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let quiz_set: Value = response.json().await.unwrap();
    let set_id = quiz_set["id"].as_str().unwrap().to_string();

    // Empty sets cannot be published.
    let response = client
        .post(format!("{}/api/quiz-sets/{}/publish", address, set_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let mut correct = HashMap::new();
    for (question, answer) in [("Who owns a moved value?", "The receiver"), ("Can two &mut coexist?", "No")] {
        let response = client
            .post(format!("{}/api/quiz-sets/{}/quizzes", address, set_id))
            .bearer_auth(&token)
            .json(&json!({
                "question_text": question,
                "options": ["The receiver", "The sender", "No", "Yes"],
                "correct_answer": answer,
                "topic": "Ownership"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let quiz: Value = response.json().await.unwrap();
        correct.insert(quiz["id"].as_str().unwrap().to_string(), answer.to_string());
    }

    let response = client
        .post(format!("{}/api/quiz-sets/{}/publish", address, set_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // 2. Start an attempt; answers are hidden
    let response = client
        .post(format!("{}/api/attempts", address))
        .bearer_auth(&token)
        .json(&json!({ "quiz_set_id": set_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let started: Value = response.json().await.unwrap();
    let attempt_id = started["attempt"]["id"].as_str().unwrap().to_string();
    let questions = started["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 2);
    assert!(questions.iter().all(|q| q.get("correct_answer").is_none()));

    // 3. Submit one right and one wrong answer
    let mut answers = serde_json::Map::new();
    let mut ids = correct.keys().cloned().collect::<Vec<_>>();
    ids.sort();
    answers.insert(ids[0].clone(), Value::String(correct[&ids[0]].clone()));
    answers.insert(ids[1].clone(), Value::String("Yes".to_string()));

    let response = client
        .post(format!("{}/api/attempts/{}/submit", address, attempt_id))
        .bearer_auth(&token)
        .json(&json!({ "answers": answers }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let result: Value = response.json().await.unwrap();
    assert_eq!(result["attempt"]["status"], "completed");
    assert_eq!(result["attempt"]["correct_answers"], 1);
    assert_eq!(result["attempt"]["wrong_answers"], 1);
    assert_eq!(result["attempt"]["score"], 10);
    assert_eq!(result["attempt"]["accuracy"], 50.0);

    // A completed attempt cannot be submitted again.
    let response = client
        .post(format!("{}/api/attempts/{}/submit", address, attempt_id))
        .bearer_auth(&token)
        .json(&json!({ "answers": {} }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // 4. Stats, mistakes and leaderboard reflect the submission
    let stats: Value = client
        .get(format!("{}/api/attempts/me/stats", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["total_attempts"], 1);
    assert_eq!(stats["best_score"], 10);

    let mistakes: Value = client
        .get(format!("{}/api/me/mistakes", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(mistakes["total_count"], 1);

    let leaderboard: Value = client
        .get(format!("{}/api/quiz-sets/{}/leaderboard", address, set_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let entries = leaderboard.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["rank"], 1);
    assert_eq!(entries[0]["score"], 10);
}

#[tokio::test]
async fn like_toggle_flips_state() {
    let Some(address) = spawn_app().await else {
        return;
    };
    let client = Client::new();
    let token = register_and_login(&client, &address).await;

    let quiz_set: Value = client
        .post(format!("{}/api/quiz-sets", address))
        .bearer_auth(&token)
        .json(&json!({ "title": unique("Traits"), "quiz_type": "practice" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let set_id = quiz_set["id"].as_str().unwrap();

    let url = format!("{}/api/quiz-sets/{}/like", address, set_id);
    let first: Value = client.post(&url).bearer_auth(&token).send().await.unwrap().json().await.unwrap();
    assert_eq!(first["liked"], true);
    assert_eq!(first["like_count"], 1);

    let second: Value = client.post(&url).bearer_auth(&token).send().await.unwrap().json().await.unwrap();
    assert_eq!(second["liked"], false);
    assert_eq!(second["like_count"], 0);
}

async fn create_set(client: &Client, address: &str, token: &str) -> String {
    let response = client
        .post(format!("{}/api/quiz-sets", address))
        .bearer_auth(token)
        .json(&json!({ "title": unique("Lifetimes"), "quiz_type": "practice" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let quiz_set: Value = response.json().await.unwrap();
    quiz_set["id"].as_str().unwrap().to_string()
}

/// Adds a quiz whose correct answer is "Yes" and returns its id.
async fn add_quiz(client: &Client, address: &str, token: &str, set_id: &str) -> String {
    let response = client
        .post(format!("{}/api/quiz-sets/{}/quizzes", address, set_id))
        .bearer_auth(token)
        .json(&json!({
            "question_text": unique("Does 'static outlive every lifetime?"),
            "options": ["Yes", "No"],
            "correct_answer": "Yes",
            "topic": "Lifetimes"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let quiz: Value = response.json().await.unwrap();
    quiz["id"].as_str().unwrap().to_string()
}

async fn publish(client: &Client, address: &str, token: &str, set_id: &str) {
    let response = client
        .post(format!("{}/api/quiz-sets/{}/publish", address, set_id))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

async fn start_attempt(client: &Client, address: &str, token: &str, set_id: &str) -> String {
    let response = client
        .post(format!("{}/api/attempts", address))
        .bearer_auth(token)
        .json(&json!({ "quiz_set_id": set_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let started: Value = response.json().await.unwrap();
    started["attempt"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn quiz_added_mid_attempt_is_not_graded() {
    let Some(address) = spawn_app().await else {
        return;
    };
    let client = Client::new();
    let token = register_and_login(&client, &address).await;

    let set_id = create_set(&client, &address, &token).await;
    let first = add_quiz(&client, &address, &token, &set_id).await;
    let second = add_quiz(&client, &address, &token, &set_id).await;
    publish(&client, &address, &token, &set_id).await;

    let attempt_id = start_attempt(&client, &address, &token, &set_id).await;
    add_quiz(&client, &address, &token, &set_id).await;

    let response = client
        .post(format!("{}/api/attempts/{}/submit", address, attempt_id))
        .bearer_auth(&token)
        .json(&json!({ "answers": { first: "Yes", second: "Yes" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let result: Value = response.json().await.unwrap();
    assert_eq!(result["attempt"]["total_questions"], 2);
    assert_eq!(result["attempt"]["correct_answers"], 2);
    assert_eq!(result["attempt"]["wrong_answers"], 0);
    assert_eq!(result["attempt"]["accuracy"], 100.0);

    let stats: Value = client
        .get(format!("{}/api/attempts/me/stats", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["overall_accuracy"], 100.0);
}

#[tokio::test]
async fn concurrent_submits_complete_once() {
    let Some(address) = spawn_app().await else {
        return;
    };
    let client = Client::new();
    let token = register_and_login(&client, &address).await;

    let set_id = create_set(&client, &address, &token).await;
    let quiz_id = add_quiz(&client, &address, &token, &set_id).await;
    publish(&client, &address, &token, &set_id).await;
    let attempt_id = start_attempt(&client, &address, &token, &set_id).await;

    let submit = || {
        client
            .post(format!("{}/api/attempts/{}/submit", address, attempt_id))
            .bearer_auth(&token)
            .json(&json!({ "answers": { quiz_id.clone(): "No" } }))
            .send()
    };
    let (a, b) = tokio::join!(submit(), submit());
    let mut statuses = vec![a.unwrap().status(), b.unwrap().status()];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::UNPROCESSABLE_ENTITY]);

    let mistakes: Value = client
        .get(format!("{}/api/me/mistakes", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(mistakes["total_count"], 1);
    assert_eq!(mistakes["items"][0]["times_wrong"], 1);

    let stats: Value = client
        .get(format!("{}/api/attempts/me/stats", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["total_attempts"], 1);
}

#[tokio::test]
async fn unpublished_set_is_hidden_from_anonymous_readers() {
    let Some(address) = spawn_app().await else {
        return;
    };
    let client = Client::new();
    let token = register_and_login(&client, &address).await;

    let set_id = create_set(&client, &address, &token).await;
    add_quiz(&client, &address, &token, &set_id).await;

    for path in ["", "/quizzes"] {
        let url = format!("{}/api/quiz-sets/{}{}", address, set_id, path);
        let anonymous = client.get(&url).send().await.unwrap();
        assert_eq!(anonymous.status(), StatusCode::NOT_FOUND, "{path}");

        let author = client.get(&url).bearer_auth(&token).send().await.unwrap();
        assert_eq!(author.status(), StatusCode::OK, "{path}");
    }
}
