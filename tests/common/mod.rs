// tests/common/mod.rs

#![allow(dead_code)]

use chrono::Utc;
use millionaire::{
    config::Config,
    db,
    models::{
        game::{GameRules, TIME_LIMIT_SECS},
        prize::{FIREPROOF_LEVELS, PRIZES},
    },
    routes,
    state::AppState,
};
use sqlx::SqlitePool;

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}

/// Spawns the app on a random port with a fresh in-memory database.
pub async fn spawn_app() -> TestApp {
    let database_url = "sqlite::memory:".to_string();

    // 1. Create a pool
    let pool = db::connect(&database_url)
        .await
        .expect("Failed to open in-memory database");

    // 2. Run migrations
    db::MIGRATOR
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    // 3. Create test configuration and state
    let config = Config {
        database_url,
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
        game_time_limit_secs: TIME_LIMIT_SECS,
        prizes: PRIZES.to_vec(),
        fireproof_levels: FIREPROOF_LEVELS.to_vec(),
    };

    let state = AppState {
        pool: pool.clone(),
        config,
        rules: GameRules::default(),
    };

    // 4. Create the router with the app state
    let app = routes::create_router(state);

    // 5. Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // 6. Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        pool,
        client: reqwest::Client::new(),
    }
}

/// Inserts `per_level` questions for every level. Answer 1 is correct.
pub async fn seed_questions(pool: &SqlitePool, per_level: usize) {
    for level in 0..15i64 {
        for i in 0..per_level {
            sqlx::query(
                r#"
                INSERT INTO questions (level, text, answer1, answer2, answer3, answer4, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(level)
            .bind(format!("Question {} of level {}", i, level))
            .bind("Right")
            .bind("Wrong 1")
            .bind("Wrong 2")
            .bind("Wrong 3")
            .bind(Utc::now())
            .execute(pool)
            .await
            .unwrap();
        }
    }
}

/// Inserts a user row directly, returning its id.
pub async fn insert_user(pool: &SqlitePool, username: &str) -> i64 {
    sqlx::query("INSERT INTO users (username, password, created_at) VALUES (?, 'x', ?)")
        .bind(username)
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
}

pub fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

/// Registers and logs in a fresh player. Returns (user id, bearer token).
pub async fn sign_up(app: &TestApp, prefix: &str) -> (i64, String) {
    let username = unique_name(prefix);
    let password = "password123";

    let registered = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&serde_json::json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(registered.status().as_u16(), 201);

    let login = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&serde_json::json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Login failed")
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse login json");

    (
        login["user_id"].as_i64().expect("user_id not found"),
        login["token"].as_str().expect("Token not found").to_string(),
    )
}
