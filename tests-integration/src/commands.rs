//! Integration tests for command dispatch and handlers

use promptshare_core::{commands, App, PromptShareError, Session};
use serde_json::{json, Value};

async fn sign_up(app: &App, session: &Session, username: &str, email: &str) -> Value {
    commands::dispatch(
        app,
        session,
        "auth.sign_up",
        json!({
            "name": "Test User",
            "username": username,
            "email": email,
            "password": "Secret123",
        }),
    )
    .await
    .unwrap()
}

async fn create(app: &App, session: &Session, title: &str, public: bool) -> String {
    let created = commands::dispatch(
        app,
        session,
        "prompts.create",
        json!({"title": title, "content": "Prompt body", "isPublic": public}),
    )
    .await
    .unwrap();
    assert_eq!(created["success"], json!(true), "create failed: {created}");
    created["data"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_ping_command() {
    let app = App::in_memory();
    let result = commands::dispatch(&app, &Session::new(), "ping", json!({"message": "hello"}))
        .await
        .unwrap();

    assert_eq!(result["pong"], json!(true));
    assert_eq!(result["message"], json!("hello"));
}

#[tokio::test]
async fn test_command_not_found() {
    let app = App::in_memory();
    let result = commands::dispatch(&app, &Session::new(), "nonexistent_command", json!({})).await;
    assert!(matches!(result, Err(PromptShareError::CommandNotFound(_))));
}

#[tokio::test]
async fn test_two_users_share_a_feed() {
    let app = App::in_memory();
    let (ada, grace) = (Session::new(), Session::new());

    let signed_up = sign_up(&app, &ada, "ada", "ada@example.com").await;
    let ada_uid = signed_up["account"]["uid"].as_str().unwrap().to_string();
    create(&app, &ada, "Ada public", true).await;
    create(&app, &ada, "Ada private", false).await;

    sign_up(&app, &grace, "grace", "grace@example.com").await;
    create(&app, &grace, "Grace public", true).await;

    let feed = commands::dispatch(&app, &Session::new(), "prompts.list", Value::Null)
        .await
        .unwrap();
    let items = feed["data"]["items"].as_array().unwrap();
    let titles: Vec<&str> = items.iter().map(|p| p["title"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["Grace public", "Ada public"]);
    assert_eq!(items[1]["author"]["username"], json!("ada"));
    assert_eq!(items[1]["userId"], json!(ada_uid));

    let mine = commands::dispatch(&app, &grace, "prompts.mine", Value::Null)
        .await
        .unwrap();
    assert_eq!(mine["data"]["total"], json!(1));

    let mine = commands::dispatch(&app, &ada, "prompts.mine", Value::Null)
        .await
        .unwrap();
    assert_eq!(mine["data"]["total"], json!(2));
}

#[tokio::test]
async fn test_username_availability_and_duplicate_sign_up() {
    let app = App::in_memory();
    let session = Session::new();

    let available = commands::dispatch(
        &app,
        &session,
        "auth.username_available",
        json!({"username": " Ada "}),
    )
    .await
    .unwrap();
    assert_eq!(available, json!({"username": "ada", "available": true}));

    sign_up(&app, &session, "ada", "ada@example.com").await;

    let taken = commands::dispatch(
        &app,
        &session,
        "auth.username_available",
        json!({"username": "ADA"}),
    )
    .await
    .unwrap();
    assert_eq!(taken["available"], json!(false));

    let err = commands::dispatch(
        &app,
        &Session::new(),
        "auth.sign_up",
        json!({
            "name": "Impostor",
            "username": "Ada",
            "email": "other@example.com",
            "password": "Secret123",
        }),
    )
    .await
    .unwrap_err();
    match err {
        PromptShareError::Validation(errors) => {
            assert_eq!(errors.get("username"), Some("This username is already taken."));
        }
        other => panic!("Expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_session_lifecycle() {
    let app = App::in_memory();
    let session = Session::new();

    let state = commands::dispatch(&app, &session, "auth.session", Value::Null)
        .await
        .unwrap();
    assert_eq!(state["signedIn"], json!(false));

    sign_up(&app, &session, "ada", "ada@example.com").await;
    commands::dispatch(&app, &session, "auth.sign_out", Value::Null)
        .await
        .unwrap();

    let signed_in = commands::dispatch(
        &app,
        &session,
        "auth.sign_in",
        json!({"email": "ada@example.com", "password": "Secret123"}),
    )
    .await
    .unwrap();
    assert_eq!(signed_in["account"]["email"], json!("ada@example.com"));

    let state = commands::dispatch(&app, &session, "auth.session", Value::Null)
        .await
        .unwrap();
    assert_eq!(state["signedIn"], json!(true));

    let reset = commands::dispatch(
        &app,
        &session,
        "auth.forgot_password",
        json!({"email": "ada@example.com"}),
    )
    .await
    .unwrap();
    assert_eq!(reset, json!({"sent": true}));
}

#[tokio::test]
async fn test_sessions_do_not_share_identity() {
    let app = App::in_memory();
    let (ada, stranger) = (Session::new(), Session::new());
    sign_up(&app, &ada, "ada", "ada@example.com").await;

    let err = commands::dispatch(
        &app,
        &stranger,
        "prompts.create",
        json!({"title": "Hijack", "content": "x"}),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, PromptShareError::Unauthenticated));

    commands::dispatch(&app, &stranger, "auth.sign_out", Value::Null)
        .await
        .unwrap();
    create(&app, &ada, "Still signed in", false).await;
}
