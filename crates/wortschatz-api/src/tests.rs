//! Router tests against an in-memory SQLite store and scripted collaborators.

use std::sync::Arc;

use axum::{
  body::Body,
  http::{Request, StatusCode},
  response::IntoResponse,
};
use serde_json::{Value, json};
use tower::ServiceExt as _;
use wortschatz_core::{
  activity::NewScenario,
  cache::MemoryCache,
  generate::GenerationError,
  knowledge::ProficiencyLevel,
  planner::{StudyConfig, StudyPlanner},
  store::LearningStore,
  testing::{CLINICAL_SENTENCE, ScriptedGenerator, StaticAnnotator, study_json},
};
use wortschatz_store_sqlite::SqliteStore;

use crate::{ApiError, AppState, api_router, identity::USER_ID_HEADER};

type TestState =
  AppState<SqliteStore, StaticAnnotator, ScriptedGenerator, MemoryCache>;

const USER: i64 = 11;
const OTHER_USER: i64 = 12;

async fn make_state(
  script: Vec<Result<String, GenerationError>>,
) -> TestState {
  let store = SqliteStore::open_in_memory().await.unwrap();
  AppState::new(StudyPlanner::new(
    Arc::new(store),
    Arc::new(StaticAnnotator::clinical()),
    Arc::new(ScriptedGenerator::new(script)),
    Arc::new(MemoryCache::new()),
    StudyConfig::default(),
  ))
}

async fn send(
  state: &TestState,
  method: &str,
  uri: &str,
  user: Option<i64>,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(user) = user {
    builder = builder.header(USER_ID_HEADER, user.to_string());
  }
  let req = match body {
    Some(body) => builder
      .header("content-type", "application/json")
      .body(Body::from(body.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };
  let resp = api_router(state.clone()).oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
  (status, value)
}

async fn create_document(state: &TestState) -> i64 {
  let (status, body) = send(
    state,
    "POST",
    "/documents",
    Some(USER),
    Some(json!({ "text": CLINICAL_SENTENCE, "title": "Notaufnahme" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  body["document_id"].as_i64().unwrap()
}

async fn word_id(state: &TestState, document_id: i64, lemma: &str) -> i64 {
  let (_, body) =
    send(state, "GET", &format!("/documents/{document_id}"), Some(USER), None)
      .await;
  body["tokens"]
    .as_array()
    .unwrap()
    .iter()
    .find(|t| t["word"]["lemma"] == lemma)
    .and_then(|t| t["word"]["id"].as_i64())
    .unwrap()
}

// ─── Identity ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn requests_without_identity_return_401() {
  let state = make_state(vec![]).await;
  let (status, _) = send(&state, "GET", "/profile", None, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let req = Request::builder()
    .uri("/profile")
    .header(USER_ID_HEADER, "not-a-number")
    .body(Body::empty())
    .unwrap();
  let resp = api_router(state).oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// ─── Documents ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_then_fetch_document() {
  let state = make_state(vec![]).await;
  let id = create_document(&state).await;

  let (status, body) =
    send(&state, "GET", &format!("/documents/{id}"), Some(USER), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["document"]["title"], "Notaufnahme");
  assert_eq!(body["document"]["owner"], USER);
  assert_eq!(body["tokens"].as_array().unwrap().len(), 9);
  assert_eq!(body["tokens"][1]["case"], "nominative");

  let (status, _) = send(&state, "GET", "/documents/999", Some(USER), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, body) =
    send(&state, "GET", "/documents/abc", Some(USER), None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().starts_with("invalid input"));
}

#[tokio::test]
async fn blank_document_is_a_bad_request() {
  let state = make_state(vec![]).await;
  let (status, body) = send(
    &state,
    "POST",
    "/documents",
    Some(USER),
    Some(json!({ "text": "  \n " })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("blank"));
}

#[tokio::test]
async fn annotator_failure_is_a_bad_gateway() {
  let state = make_state(vec![]).await;
  let (status, _) = send(
    &state,
    "POST",
    "/documents",
    Some(USER),
    Some(json!({ "text": "Ein Text, den niemand kennt." })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_GATEWAY);
}

// ─── Study ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn generate_plan_for_document() {
  let state = make_state(vec![Ok(study_json("Notarzt"))]).await;
  let id = create_document(&state).await;

  let (status, body) = send(
    &state,
    "POST",
    "/study/generate",
    Some(USER),
    Some(json!({ "document_id": id })),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["items"].as_array().unwrap().len(), 8);
  assert_eq!(body["proficiency_level"], "B1");
  assert_eq!(body["cached"], false);
  assert_eq!(body["content"]["desafio"], "O enfermeiro preparou o medicamento.");
}

#[tokio::test]
async fn focus_word_is_served_from_cache_the_second_time() {
  let state = make_state(vec![Ok(study_json("Patient"))]).await;
  let id = create_document(&state).await;
  let patient = word_id(&state, id, "patient").await;
  let body = json!({ "document_id": id, "word_id": patient });

  let (_, first) =
    send(&state, "POST", "/study/generate", Some(USER), Some(body.clone())).await;
  let (status, second) =
    send(&state, "POST", "/study/generate", Some(USER), Some(body)).await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(first["cached"], false);
  assert_eq!(second["cached"], true);
  assert_eq!(second["items"][0]["article"], "der");
  assert_eq!(state.planner.generator().calls(), 1);
}

#[tokio::test]
async fn generation_failure_is_a_bad_gateway() {
  let state = make_state(vec![
    Err(GenerationError::Timeout),
    Err(GenerationError::Timeout),
  ])
  .await;
  let id = create_document(&state).await;

  let (status, body) = send(
    &state,
    "POST",
    "/study/generate",
    Some(USER),
    Some(json!({ "document_id": id })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_GATEWAY);
  assert!(body["error"].as_str().unwrap().contains("timed out"));
}

#[tokio::test]
async fn unknown_document_plan_is_not_found() {
  let state = make_state(vec![]).await;
  let (status, _) = send(
    &state,
    "POST",
    "/study/generate",
    Some(USER),
    Some(json!({ "document_id": 42 })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(state.planner.generator().calls(), 0);
}

#[tokio::test]
async fn evaluate_translation_attempt() {
  let state = make_state(vec![Ok(
    json!({
      "correct": true,
      "feedback": "Perfekt.",
      "ideal_version": "Der Notarzt gibt dem Patienten das Mittel."
    })
    .to_string(),
  )])
  .await;

  let (status, body) = send(
    &state,
    "POST",
    "/study/evaluate",
    Some(USER),
    Some(json!({
      "challenge_pt": "O médico de emergência dá o remédio ao paciente.",
      "attempt_de": "Der Notarzt gibt dem Patienten das Mittel."
    })),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["correct"], true);
  assert!(body["attempt_id"].as_i64().unwrap() > 0);

  let (status, _) = send(
    &state,
    "POST",
    "/study/evaluate",
    Some(USER),
    Some(json!({ "challenge_pt": "x", "attempt_de": " " })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ─── Review ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn review_flow() {
  let state = make_state(vec![
    Ok(study_json("Schmerzmittel")),
    Ok(study_json("Schmerzmittel")),
  ])
  .await;
  let id = create_document(&state).await;
  let mittel = word_id(&state, id, "schmerzmittel").await;
  send(
    &state,
    "POST",
    "/study/generate",
    Some(USER),
    Some(json!({ "document_id": id, "word_id": mittel })),
  )
  .await;

  let (status, cards) = send(&state, "GET", "/study/review", Some(USER), None).await;
  assert_eq!(status, StatusCode::OK);
  let cards = cards.as_array().unwrap();
  assert_eq!(cards.len(), 1);
  assert_eq!(cards[0]["word"], "schmerzmittel");
  assert_eq!(cards[0]["fallback"], false);
  let card_id = cards[0]["knowledge_id"].as_i64().unwrap();

  let (status, _) = send(
    &state,
    "POST",
    &format!("/study/review/{card_id}"),
    Some(USER),
    Some(json!({ "score": 7 })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = send(
    &state,
    "POST",
    &format!("/study/review/{card_id}"),
    Some(OTHER_USER),
    Some(json!({ "score": 3 })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, reviewed) = send(
    &state,
    "POST",
    &format!("/study/review/{card_id}"),
    Some(USER),
    Some(json!({ "score": 4 })),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{reviewed}");
  assert_eq!(reviewed["knowledge"]["retention_level"], 4);
  assert_eq!(reviewed["event"]["previous_retention_level"], 0);

  let (_, cards) = send(&state, "GET", "/study/review", Some(USER), None).await;
  assert!(cards.as_array().unwrap().is_empty());

  let uri = format!("/study/review/{card_id}/events");
  let (status, events) = send(&state, "GET", &uri, Some(USER), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(events.as_array().unwrap().len(), 1);
  assert_eq!(events[0]["score"], 4);

  let (status, _) = send(&state, "GET", &uri, Some(OTHER_USER), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_bodies_are_json_bad_requests() {
  let state = make_state(vec![]).await;

  let (status, body) = send(
    &state,
    "POST",
    "/study/review/1",
    Some(USER),
    Some(json!({ "score": "abc" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("score"), "{body}");

  let (status, body) = send(
    &state,
    "POST",
    "/study/generate",
    Some(USER),
    Some(json!({ "document_id": "first" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].is_string());

  let (status, body) =
    send(&state, "POST", "/documents", Some(USER), Some(json!({ "title": "x" })))
      .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].is_string());

  let req = Request::builder()
    .method("POST")
    .uri("/study/review/1")
    .header(USER_ID_HEADER, USER.to_string())
    .header("content-type", "application/json")
    .body(Body::from("{\"score\": "))
    .unwrap();
  let resp = api_router(state).oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ─── Profile & scenarios ─────────────────────────────────────────────────────

#[tokio::test]
async fn profile_get_and_update() {
  let state = make_state(vec![]).await;

  let (status, body) = send(&state, "GET", "/profile", Some(USER), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["proficiency_level"], "B1");

  let (status, body) = send(
    &state,
    "PUT",
    "/profile",
    Some(USER),
    Some(json!({ "proficiency_level": "c1" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["proficiency_level"], "C1");

  let (status, _) = send(
    &state,
    "PUT",
    "/profile",
    Some(USER),
    Some(json!({ "proficiency_level": "Z9" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn scenarios_by_level() {
  let state = make_state(vec![]).await;
  state
    .planner
    .store()
    .add_scenarios(vec![
      NewScenario {
        text:              "Die Patientin hat Fieber.".into(),
        proficiency_level: ProficiencyLevel::A1,
      },
      NewScenario {
        text:              "Der Patient wird nach der Reanimation intubiert.".into(),
        proficiency_level: ProficiencyLevel::B1,
      },
    ])
    .await
    .unwrap();

  let (status, body) =
    send(&state, "GET", "/scenarios?level=A1", Some(USER), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body.as_array().unwrap().len(), 1);
  assert_eq!(body[0]["text"], "Die Patientin hat Fieber.");

  // Falls back to the caller's profile level.
  let (_, body) = send(&state, "GET", "/scenarios", Some(USER), None).await;
  assert_eq!(body[0]["proficiency_level"], "B1");

  let (status, _) =
    send(&state, "GET", "/scenarios?level=X2", Some(USER), None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ─── Error mapping ───────────────────────────────────────────────────────────

#[tokio::test]
async fn persistence_errors_are_opaque() {
  let err = ApiError::from(wortschatz_core::Error::persistence(
    std::io::Error::other("database is locked at /var/lib/wortschatz.db"),
  ));
  let resp = err.into_response();
  assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let body: Value = serde_json::from_slice(&bytes).unwrap();
  assert_eq!(body["error"], "internal error");
}
