//! Client tests against throwaway local axum servers.

use std::time::Duration;

use axum::{
  Json, Router,
  http::{HeaderMap, StatusCode},
  routing::post,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use wortschatz_core::{
  annotate::{AnnotateError, Annotator},
  generate::{ContentGenerator, GenerationError, Prompt},
  vocabulary::{Gender, PartOfSpeech},
};

use crate::{AnnotatorConfig, GeneratorConfig, HttpAnnotator, HttpGenerator};

async fn serve(router: Router) -> String {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
  format!("http://{addr}")
}

async fn annotate_with<A: Annotator>(
  annotator: &A,
  text: &str,
) -> wortschatz_core::annotate::Annotation {
  annotator.annotate(text).await.unwrap()
}

fn prompt() -> Prompt {
  Prompt { system: "Du bist Chefarzt.".into(), user: "{\"task\":\"x\"}".into() }
}

fn generator(base_url: String) -> HttpGenerator {
  HttpGenerator::new(GeneratorConfig {
    base_url,
    api_key: Some("sk-test".into()),
    timeout_secs: 1,
    ..GeneratorConfig::default()
  })
  .unwrap()
}

fn completion(content: &str) -> Json<Value> {
  Json(json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] }))
}

// ─── Annotator ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn annotator_posts_text_and_maps_tags() {
  let router = Router::new().route(
    "/annotate",
    post(|Json(body): Json<Value>| async move {
      assert_eq!(body["text"], "Der Arzt kommt.");
      Json(json!({
        "sentences": [{
          "text": "Der Arzt kommt.",
          "tokens": [
            { "text": "Der", "lemma": "der", "pos": "DET", "gender": "Masc",
              "case": "Nom", "dep": "nk", "is_alpha": true },
            { "text": "Arzt", "lemma": "Arzt", "pos": "NOUN", "gender": "Masc",
              "case": "Nom", "dep": "sb", "is_alpha": true },
            { "text": "kommt", "lemma": "kommen", "pos": "VERB", "dep": "ROOT",
              "is_alpha": true },
            { "text": ".", "lemma": "--", "pos": "PUNCT", "dep": "punct",
              "is_alpha": false, "is_punct": true }
          ]
        }]
      }))
    }),
  );
  let base = serve(router).await;
  let annotator = HttpAnnotator::new(&AnnotatorConfig {
    url:          format!("{base}/annotate"),
    timeout_secs: 5,
  })
  .unwrap();

  let ann = annotator.annotate("Der Arzt kommt.").await.unwrap();
  assert_eq!(ann.tokens.len(), 4);

  let handle: &'static HttpAnnotator = Box::leak(Box::new(annotator.clone()));
  let via_handle = annotate_with(&handle, "Der Arzt kommt.").await;
  assert_eq!(via_handle.tokens, ann.tokens);
  assert_eq!(ann.word_tokens().count(), 3);
  assert_eq!(ann.tokens[1].lemma, "arzt");
  assert_eq!(ann.tokens[1].pos, PartOfSpeech::Noun);
  assert_eq!(ann.tokens[1].gender, Gender::Masculine);
  assert_eq!(ann.tokens[2].gender, Gender::None);
}

#[tokio::test]
async fn annotator_status_and_body_errors() {
  let router = Router::new()
    .route("/down", post(|| async { StatusCode::SERVICE_UNAVAILABLE }))
    .route("/garbage", post(|| async { "not json" }));
  let base = serve(router).await;

  let down = HttpAnnotator::new(&AnnotatorConfig {
    url:          format!("{base}/down"),
    timeout_secs: 5,
  })
  .unwrap();
  assert!(matches!(
    down.annotate("x").await.unwrap_err(),
    AnnotateError::Status(503)
  ));

  let garbage = HttpAnnotator::new(&AnnotatorConfig {
    url:          format!("{base}/garbage"),
    timeout_secs: 5,
  })
  .unwrap();
  assert!(matches!(
    garbage.annotate("x").await.unwrap_err(),
    AnnotateError::InvalidResponse(_)
  ));
}

#[tokio::test]
async fn shared_annotator_is_initialised_once() {
  let first = HttpAnnotator::shared(&AnnotatorConfig::default()).unwrap();
  let second = HttpAnnotator::shared(&AnnotatorConfig {
    url:          "http://elsewhere.invalid/annotate".into(),
    timeout_secs: 1,
  })
  .unwrap();
  assert!(std::ptr::eq(first, second));
}

// ─── Generator ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn generator_sends_json_mode_chat_request() {
  let router = Router::new().route(
    "/v1/chat/completions",
    post(|headers: HeaderMap, Json(body): Json<Value>| async move {
      let echo = json!({
        "auth": headers["authorization"].to_str().unwrap(),
        "model": body["model"],
        "format": body["response_format"]["type"],
        "system": body["messages"][0]["content"],
        "user_role": body["messages"][1]["role"],
        "max_tokens": body["max_tokens"],
      });
      completion(&echo.to_string())
    }),
  );
  let base = serve(router).await;

  let content = generator(format!("{base}/v1/")).complete(&prompt()).await.unwrap();
  let echo: Value = serde_json::from_str(&content).unwrap();
  assert_eq!(echo["auth"], "Bearer sk-test");
  assert_eq!(echo["model"], "gpt-4.1-mini");
  assert_eq!(echo["format"], "json_object");
  assert_eq!(echo["system"], "Du bist Chefarzt.");
  assert_eq!(echo["user_role"], "user");
  assert_eq!(echo["max_tokens"], 400);
}

#[tokio::test]
async fn missing_key_never_touches_the_network() {
  let generator = HttpGenerator::new(GeneratorConfig {
    base_url: "http://127.0.0.1:9".into(),
    ..GeneratorConfig::default()
  })
  .unwrap();
  assert_eq!(
    generator.complete(&prompt()).await.unwrap_err(),
    GenerationError::NotConfigured
  );
}

#[tokio::test]
async fn generator_status_mapping() {
  let router = Router::new()
    .route(
      "/limited/chat/completions",
      post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
    )
    .route(
      "/broken/chat/completions",
      post(|| async { StatusCode::BAD_GATEWAY }),
    )
    .route(
      "/empty/chat/completions",
      post(|| async { Json(json!({ "choices": [] })) }),
    );
  let base = serve(router).await;

  let err = generator(format!("{base}/limited")).complete(&prompt()).await;
  assert_eq!(err.unwrap_err(), GenerationError::RateLimited);

  let err = generator(format!("{base}/broken")).complete(&prompt()).await;
  assert_eq!(err.unwrap_err(), GenerationError::Status(502));

  let err = generator(format!("{base}/empty")).complete(&prompt()).await;
  assert!(matches!(err.unwrap_err(), GenerationError::Malformed(_)));
}

#[tokio::test]
async fn slow_generator_times_out() {
  let router = Router::new().route(
    "/chat/completions",
    post(|| async {
      tokio::time::sleep(Duration::from_secs(3)).await;
      completion("{}")
    }),
  );
  let base = serve(router).await;

  let err = generator(base).complete(&prompt()).await.unwrap_err();
  assert_eq!(err, GenerationError::Timeout);
}

#[tokio::test]
async fn unreachable_generator_is_a_connection_error() {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  drop(listener);

  let err = generator(format!("http://{addr}")).complete(&prompt()).await;
  assert!(matches!(err.unwrap_err(), GenerationError::Connection(_)));
}
