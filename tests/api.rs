use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use http::{Request, StatusCode};
use serde_json::{Value, json};
use taleseed::{AppState, GenerationError, GenerationSettings, StoryService, TextGenerator, router};
use tower::ServiceExt;

struct ScriptedGenerator {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.reply.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(self.reply.clone())
    }
}

fn app(reply: &str) -> (axum::Router, Arc<ScriptedGenerator>) {
    let generator = Arc::new(ScriptedGenerator {
        reply: reply.to_string(),
        prompts: Mutex::new(Vec::new()),
    });
    let settings = Arc::new(GenerationSettings {
        api_key: "test-key".to_string(),
        api_url: "http://localhost".to_string(),
        model: "gemini-1.5-flash".to_string(),
        temperature: 0.7,
        top_p: 0.95,
        top_k: 40,
        max_output_tokens: 8192,
        request_timeout_secs: 5,
    });
    let state = AppState {
        story: StoryService::new(generator.clone(), settings),
    };
    (router(state), generator)
}

async fn send(app: axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(value) => Body::from(value.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn chapter_body() -> Value {
    json!({
        "projectId": "proj-1",
        "chapterId": "ch-2",
        "projectTitle": "O Farol",
        "chapterTitle": "A Tempestade",
        "chapterSummary": "Uma tempestade isola a ilha.",
        "keyPoints": ["O rádio quebra"],
        "tone": "sombrio",
        "writingStyle": "literário",
        "setting": "ilha remota",
        "lengthInPages": 3,
        "previousChapters": [
            { "title": "A Chegada", "summary": "Marina chega.", "generatedText": "Marina desembarcou no cais." }
        ],
        "mode": "full",
        "language": "pt-BR"
    })
}

#[tokio::test]
async fn root_and_health_report_status() {
    let (app, _) = app("unused");
    let (status, body) = send(app.clone(), "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "TaleSeed API");
    assert_eq!(body["status"], "online");

    let (status, body) = send(app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn generate_chapter_returns_text_and_metadata() {
    let (app, generator) = app("As ondas quebravam contra as pedras.");
    let (status, body) = send(app, "POST", "/generate-chapter", Some(chapter_body())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "As ondas quebravam contra as pedras.");
    assert_eq!(body["tokensUsed"], 6);
    assert_eq!(body["metadata"]["model"], "gemini-1.5-flash");
    assert_eq!(body["metadata"]["maxTokens"], 8192);
    assert!(body["metadata"]["createdAt"].is_string());

    let prompt = generator.prompts.lock().unwrap().last().cloned().unwrap();
    assert!(prompt.contains("### Capítulo 1: A Chegada"));
    assert!(prompt.contains("Marina desembarcou no cais."));
}

#[tokio::test]
async fn empty_generation_is_a_server_error_without_detail() {
    let (app, _) = app("");
    let (status, body) = send(app, "POST", "/generate-chapter", Some(chapter_body())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], "Failed to generate chapter. Please try again.");
    assert!(body.get("text").is_none());
}

#[tokio::test]
async fn out_of_range_length_is_a_bad_request() {
    let (app, generator) = app("unused");
    let mut body = chapter_body();
    body["lengthInPages"] = json!(60);

    let (status, body) = send(app, "POST", "/generate-chapter", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("lengthInPages"));
    assert!(generator.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
    let (app, _) = app("unused");
    let (status, body) = send(
        app,
        "POST",
        "/creative-suggestions",
        Some(json!({ "type": "weapon", "context": "x", "genre": "y", "tone": "z" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn creative_suggestions_are_parsed() {
    let reply = "[SUGESTÃO 1]\nTexto: The Last Ember\nDescrição: evokes decay\n[SUGESTÃO 2]\nTexto: Hollow Crown\nDescrição: power theme";
    let (app, _) = app(reply);
    let (status, body) = send(
        app,
        "POST",
        "/creative-suggestions",
        Some(json!({
            "type": "title",
            "context": "A fallen kingdom",
            "genre": "fantasy",
            "tone": "grim",
            "count": 2
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["suggestions"],
        json!([
            { "text": "The Last Ember", "description": "evokes decay" },
            { "text": "Hollow Crown", "description": "power theme" }
        ])
    );
}

#[tokio::test]
async fn summarize_chapter_collapses_sections() {
    let reply = "[RESUMO]\nMarina chega ao farol.\n[PERSONAGENS]\n- Marina: faroleira\n[AMBIENTAÇÕES]\n- Farol\n[EVENTOS-CHAVE]\n1. Chegada\n2. Tempestade\n[ESTADO FINAL]\nMarina sozinha na torre.";
    let (app, _) = app(reply);
    let (status, body) = send(
        app,
        "POST",
        "/summarize-chapter",
        Some(json!({
            "chapterText": "Marina chegou ao farol quando o sol nascia. ".repeat(5),
            "chapterTitle": "A Chegada"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let summary = body["summary"].as_str().unwrap();
    assert!(summary.starts_with("Marina chega ao farol."));
    assert!(summary.contains("EVENTOS-CHAVE:\n1. Chegada\n2. Tempestade"));
    assert!(summary.ends_with("Marina sozinha na torre."));
    assert!(body["tokensUsed"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn summarize_rejects_short_text() {
    let (app, _) = app("unused");
    let (status, _) = send(
        app,
        "POST",
        "/summarize-chapter",
        Some(json!({ "chapterText": "curto demais" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
