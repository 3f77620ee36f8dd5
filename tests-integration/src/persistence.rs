//! SQLite-backed app: data survives reopening the database file

use promptshare_core::{
    commands,
    config::{Config, StoreBackend},
    App, PromptShareError, Session,
};
use serde_json::{json, Value};

fn sqlite_config(dir: &tempfile::TempDir) -> Config {
    Config {
        store: StoreBackend::Sqlite,
        database_path: dir.path().join("nested").join("promptshare.db"),
        password_iterations: 1_000,
        ..Config::default()
    }
}

#[tokio::test]
async fn test_prompts_and_handles_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();

    {
        let app = App::open(sqlite_config(&dir)).await.unwrap();
        let session = Session::new();
        commands::dispatch(
            &app,
            &session,
            "auth.sign_up",
            json!({
                "name": "Ada",
                "username": "ada",
                "email": "ada@example.com",
                "password": "Secret123",
            }),
        )
        .await
        .unwrap();
        commands::dispatch(
            &app,
            &session,
            "prompts.create",
            json!({"title": "Persisted", "content": "x", "isPublic": true}),
        )
        .await
        .unwrap();
    }

    let app = App::open(sqlite_config(&dir)).await.unwrap();
    let session = Session::new();
    let feed = commands::dispatch(&app, &session, "prompts.list", Value::Null)
        .await
        .unwrap();
    assert_eq!(feed["data"]["total"], json!(1));
    assert_eq!(feed["data"]["items"][0]["title"], json!("Persisted"));
    assert_eq!(feed["data"]["items"][0]["author"]["username"], json!("ada"));

    let available = commands::dispatch(
        &app,
        &session,
        "auth.username_available",
        json!({"username": "ada"}),
    )
    .await
    .unwrap();
    assert_eq!(available["available"], json!(false));
}

#[tokio::test]
async fn test_accounts_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let uid = {
        let app = App::open(sqlite_config(&dir)).await.unwrap();
        let session = Session::new();
        let signed_up = commands::dispatch(
            &app,
            &session,
            "auth.sign_up",
            json!({
                "name": "Ada",
                "username": "ada",
                "email": "ada@example.com",
                "password": "Secret123",
            }),
        )
        .await
        .unwrap();
        commands::dispatch(
            &app,
            &session,
            "prompts.create",
            json!({"title": "Mine", "content": "x"}),
        )
        .await
        .unwrap();
        signed_up["account"]["uid"].as_str().unwrap().to_string()
    };

    let app = App::open(sqlite_config(&dir)).await.unwrap();
    let session = Session::new();

    let signed_in = commands::dispatch(
        &app,
        &session,
        "auth.sign_in",
        json!({"email": "ada@example.com", "password": "Secret123"}),
    )
    .await
    .unwrap();
    assert_eq!(signed_in["account"]["uid"], json!(uid));
    assert_eq!(signed_in["account"]["displayName"], json!("ada"));

    let mine = commands::dispatch(&app, &session, "prompts.mine", Value::Null)
        .await
        .unwrap();
    assert_eq!(mine["data"]["total"], json!(1));
    assert_eq!(mine["data"]["items"][0]["title"], json!("Mine"));

    // Registering the same email again is refused
    let err = commands::dispatch(
        &app,
        &Session::new(),
        "auth.sign_up",
        json!({
            "name": "Ada",
            "username": "ada2",
            "email": "ada@example.com",
            "password": "Secret123",
        }),
    )
    .await
    .unwrap_err();
    match err {
        PromptShareError::Validation(errors) => {
            assert_eq!(errors.get("email"), Some("This email is already registered."));
        }
        other => panic!("Expected validation error, got {other:?}"),
    }
}
