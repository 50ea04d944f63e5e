use std::collections::HashMap;
use std::time::Duration;

use axum::{
    extract::Query,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use codelearner_core::{
    ApiClient, ApiError, Cell, ChatRole, ChatSession, CodeExerciseSession, GenerateRequest,
    Language, SelectOutcome, WordSearchBoard, CHAT_ERROR_MESSAGE,
};
use serde_json::json;
use tokio::net::TcpListener;

async fn ask(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    let question = params.get("question").cloned().unwrap_or_default();
    format!("eco: {question}")
}

async fn generate_code(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    let language = params.get("language").cloned().unwrap_or_default();
    let explanation = params.get("explanation").map(String::as_str) == Some("true");

    let mut body = json!({
        "code": "def factorial(n):\n    # caso base\n    return 1 if n == 0 else n * factorial(n - 1)",
        "language": language,
    });
    if explanation {
        body["explanation"] = json!("Calcula el factorial de forma recursiva.");
    }
    Json(body)
}

async fn word_search(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    let topic = params.get("topic").cloned().unwrap_or_default();
    let size = params.get("size").cloned().unwrap_or_default();
    Json(json!({
        "word_search": {
            "word_search": "C A T X X\nX X X X X\nX X X X X\nX X X X X\nX X X X X",
            "answers": [
                { "word": "CAT", "start": [1, 1], "end": [1, 3], "direction": "horizontal" },
                { "word": topic, "start": [2, 1], "end": [2, size.len()], "direction": "horizontal" }
            ]
        }
    }))
}

async fn broken() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

async fn malformed() -> impl IntoResponse {
    "{\"word_search\": "
}

async fn spawn_backend(router: Router) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{addr}")
}

async fn healthy_backend() -> String {
    spawn_backend(
        Router::new()
            .route("/api/ask", get(ask))
            .route("/api/generate-code", get(generate_code))
            .route("/api/word-search", get(word_search)),
    )
    .await
}

async fn stalled() -> impl IntoResponse {
    tokio::time::sleep(Duration::from_secs(5)).await;
    "tarde"
}

async fn failing_backend() -> String {
    spawn_backend(
        Router::new()
            .route("/api/ask", get(broken))
            .route("/api/generate-code", get(broken))
            .route("/api/word-search", get(malformed)),
    )
    .await
}

#[tokio::test]
async fn ask_encodes_question() {
    let client = ApiClient::new(&healthy_backend().await);
    let reply = client.ask("¿qué es 1 + 1 & 2?").await.expect("ask");
    assert_eq!(reply, "eco: ¿qué es 1 + 1 & 2?");
}

#[tokio::test]
async fn chat_session_round_trip() {
    let client = ApiClient::new(&healthy_backend().await);
    let mut chat = ChatSession::new();

    chat.submit(&client, "hola").await;
    chat.submit(&client, "   ").await;

    let messages = chat.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, ChatRole::User);
    assert_eq!(messages[1].content, "eco: hola");
    assert!(!chat.is_loading());
}

#[tokio::test]
async fn chat_session_falls_back_on_server_error() {
    let client = ApiClient::new(&failing_backend().await);
    let mut chat = ChatSession::new();

    chat.submit(&client, "hola").await;

    assert_eq!(chat.messages()[1].content, CHAT_ERROR_MESSAGE);
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let client = ApiClient::new(&failing_backend().await);
    let err = client
        .generate_code("factorial", Language::Python, true)
        .await
        .unwrap_err();

    match err {
        ApiError::Status { status, body, .. } => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(body, "boom");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn malformed_json_is_a_decode_error() {
    let client = ApiClient::new(&failing_backend().await);
    let err = client.word_search("Rust", 10).await.unwrap_err();
    assert!(err.is_decode());
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let client = ApiClient::new(&format!("http://{addr}"));
    let err = client.ask("hola").await.unwrap_err();
    assert!(matches!(err, ApiError::Transport { .. }));
}

#[tokio::test]
async fn word_search_board_plays_fetched_puzzle() {
    let client = ApiClient::new(&healthy_backend().await);
    let mut board = WordSearchBoard::new();

    board.generate(&client, "Rust", 10).await;

    let puzzle = board.puzzle().expect("puzzle loaded");
    assert_eq!(puzzle.grid().len(), 5);
    assert_eq!(puzzle.grid()[0], vec!["C", "A", "T", "X", "X"]);
    // The second answer echoes topic and size back: "Rust" ending at column len("10").
    assert_eq!(puzzle.answers()[1].word, "Rust");
    assert_eq!(puzzle.answers()[1].end, [2, 2]);
    assert!(puzzle.answers_in_bounds());

    board.select_cell(Cell::new(0, 2));
    let outcome = board.select_cell(Cell::new(0, 0));
    assert!(matches!(outcome, SelectOutcome::Evaluated { matched: Some(ref w), .. } if w == "CAT"));
    assert_eq!(board.progress(), (1, 2));
}

#[tokio::test]
async fn code_exercise_uses_requested_language() {
    let client = ApiClient::new(&healthy_backend().await);
    let mut session = CodeExerciseSession::new();

    session
        .generate(
            &client,
            GenerateRequest {
                prompt: "Función para calcular el factorial".to_string(),
                language: Language::Cpp,
                explanation: true,
            },
        )
        .await;

    let artifact = session.artifact().expect("artifact");
    assert_eq!(artifact.language, "C++");
    assert!(artifact.explanation.is_some());

    // C++ has no stripper, so the Python-style comment must be typed too.
    session.start_exercise();
    session
        .user_input_mut()
        .push_str("def factorial(n):\n  return 1 if n == 0 else n * factorial(n - 1)");
    assert_eq!(session.check(), Some(false));
}

#[tokio::test]
async fn code_exercise_strips_python_comments() {
    let client = ApiClient::new(&healthy_backend().await);
    let mut session = CodeExerciseSession::new();

    session
        .generate(
            &client,
            GenerateRequest {
                prompt: "factorial".to_string(),
                language: Language::Python,
                explanation: true,
            },
        )
        .await;

    session.start_exercise();
    session
        .user_input_mut()
        .push_str("def factorial(n):\n    return 1 if n == 0 else n * factorial(n - 1)\n");
    assert_eq!(session.check(), Some(true));
}

#[tokio::test]
async fn stalled_request_times_out_and_clears_loading() {
    let base = spawn_backend(Router::new().route("/api/ask", get(stalled))).await;
    let client = ApiClient::with_timeout(&base, Duration::from_millis(200));

    let err = client.ask("hola").await.unwrap_err();
    assert!(matches!(err, ApiError::Transport { .. }), "unexpected error {err:?}");

    let mut chat = ChatSession::new();
    chat.submit(&client, "hola").await;
    assert!(!chat.is_loading());
    assert_eq!(chat.messages()[1].content, CHAT_ERROR_MESSAGE);
}
