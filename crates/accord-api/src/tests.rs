//! Router tests against an in-memory SQLite store.

use std::sync::Arc;

use accord_core::{
  store::AccordStore,
  terms::{AcceptOutcome, NewTerms},
  user::UserProfile,
};
use accord_store_sqlite::SqliteStore;
use axum::{
  body::Body,
  http::{Request, StatusCode, header},
  response::Response,
};
use chrono::{Duration, TimeZone, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use crate::{
  ApiState, SessionKeys, api_router, credentials::hash_password, error::ApiError,
  service,
};

struct Harness {
  store: Arc<SqliteStore>,
  state: ApiState<SqliteStore>,
}

impl Harness {
  async fn new() -> Self {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let sessions = Arc::new(SessionKeys::new(b"router-test", Duration::hours(1)));
    let state = ApiState::new(store.clone(), sessions);
    Self { store, state }
  }

  async fn publish(&self, version: &str, day: u32) -> Uuid {
    let input = NewTerms::new(
      version,
      format!("# Terms of Service {version}"),
      Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap(),
    )
    .unwrap();
    self.store.publish_terms(input).await.unwrap().id
  }

  fn token(&self, id: &str) -> String {
    self
      .state
      .sessions
      .issue(&UserProfile {
        id:    id.into(),
        email: Some(format!("{id}@example.com")),
        name:  Some("Test User".into()),
        image: None,
      })
      .unwrap()
  }

  async fn send(
    &self,
    method: &str,
    uri: &str,
    token: Option<&str>,
    headers: Vec<(&str, &str)>,
    body: &str,
  ) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
      builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    if !body.is_empty() {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    for (k, v) in headers {
      builder = builder.header(k, v);
    }
    let req = builder.body(Body::from(body.to_string())).unwrap();
    api_router(self.state.clone()).oneshot(req).await.unwrap()
  }

  async fn get(&self, uri: &str, token: Option<&str>) -> Response {
    self.send("GET", uri, token, vec![], "").await
  }

  async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Response {
    self.send("POST", uri, token, vec![], &body.to_string()).await
  }
}

async fn json_body(resp: Response) -> Value {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

// ── Status ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn status_without_session_is_401_and_leaks_nothing() {
  let h = Harness::new().await;
  h.publish("1.0.0", 1).await;

  let resp = h.get("/terms/status", None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  let body = json_body(resp).await;
  assert_eq!(body, json!({ "error": "Unauthorized" }));
}

#[tokio::test]
async fn status_without_current_terms_is_404() {
  let h = Harness::new().await;
  let token = h.token("alice");

  let resp = h.get("/terms/status", Some(&token)).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  assert_eq!(json_body(resp).await["error"], "No current terms found");
}

#[tokio::test]
async fn status_flips_after_accepting() {
  let h = Harness::new().await;
  let terms_id = h.publish("1.0.0", 1).await;
  let token = h.token("alice");

  let before = json_body(h.get("/terms/status", Some(&token)).await).await;
  assert_eq!(before["needsAcceptance"], true);
  assert_eq!(before["currentTerms"]["version"], "1.0.0");
  assert_eq!(before["currentTerms"]["id"], terms_id.to_string());

  let accepted = h
    .post("/terms/accept", Some(&token), json!({ "termsId": terms_id }))
    .await;
  assert_eq!(accepted.status(), StatusCode::OK);
  assert_eq!(
    json_body(accepted).await,
    json!({ "success": true, "alreadyAccepted": false })
  );

  let after = json_body(h.get("/terms/status", Some(&token)).await).await;
  assert_eq!(after["needsAcceptance"], false);
}

// ── Accept ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn accepting_twice_is_idempotent() {
  let h = Harness::new().await;
  let terms_id = h.publish("1.0.0", 1).await;
  let token = h.token("alice");
  let body = json!({ "termsId": terms_id });

  let first = json_body(h.post("/terms/accept", Some(&token), body.clone()).await).await;
  let second = json_body(h.post("/terms/accept", Some(&token), body).await).await;
  assert_eq!(first["alreadyAccepted"], false);
  assert_eq!(second, json!({ "success": true, "alreadyAccepted": true }));

  let history = h.store.list_acceptances("alice".into()).await.unwrap();
  assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn accept_records_forwarded_ip() {
  let h = Harness::new().await;
  let terms_id = h.publish("1.0.0", 1).await;
  let token = h.token("alice");

  let resp = h
    .send(
      "POST",
      "/terms/accept",
      Some(&token),
      vec![("x-forwarded-for", "198.51.100.4, 10.0.0.1"), ("x-real-ip", "10.0.0.2")],
      &json!({ "termsId": terms_id }).to_string(),
    )
    .await;
  assert_eq!(resp.status(), StatusCode::OK);

  let row = h
    .store
    .find_acceptance("alice".into(), terms_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(row.ip_address, "198.51.100.4");
}

#[tokio::test]
async fn accepting_superseded_version_is_404() {
  let h = Harness::new().await;
  let old = h.publish("1.0.0", 1).await;
  h.publish("1.1.0", 2).await;
  let token = h.token("alice");

  let resp = h.post("/terms/accept", Some(&token), json!({ "termsId": old })).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  assert_eq!(json_body(resp).await["error"], "Terms not found or not current");
  assert!(h.store.list_acceptances("alice".into()).await.unwrap().is_empty());
}

#[tokio::test]
async fn accepting_unknown_or_malformed_id_is_404() {
  let h = Harness::new().await;
  h.publish("1.0.0", 1).await;
  let token = h.token("alice");

  let unknown = h
    .post("/terms/accept", Some(&token), json!({ "termsId": Uuid::new_v4() }))
    .await;
  assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

  let garbage = h
    .post("/terms/accept", Some(&token), json!({ "termsId": "not-a-uuid" }))
    .await;
  assert_eq!(garbage.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn racing_first_accepts_record_one_row() {
  let h = Harness::new().await;
  let terms_id = h.publish("1.0.0", 1).await;
  let alice = UserProfile {
    id:    "alice".into(),
    email: Some("alice@example.com".into()),
    name:  Some("Alice".into()),
    image: None,
  };
  let id = terms_id.to_string();

  let (a, b) = tokio::join!(
    service::accept_terms(h.store.as_ref(), &alice, &id, "198.51.100.1".into()),
    service::accept_terms(h.store.as_ref(), &alice, &id, "198.51.100.2".into()),
  );

  let mut recorded = 0;
  for result in [a, b] {
    match result {
      Ok(outcome) if outcome == AcceptOutcome::recorded() => recorded += 1,
      Ok(outcome) => assert_eq!(outcome, AcceptOutcome::already_accepted()),
      Err(err) => {
        assert!(matches!(err, ApiError::Conflict(_)), "unexpected error: {err:?}");
        assert_eq!(err.status(), StatusCode::CONFLICT);
      }
    }
  }
  assert_eq!(recorded, 1);

  // The retry a losing client makes.
  let token = h.token("alice");
  let retry = h
    .post("/terms/accept", Some(&token), json!({ "termsId": terms_id }))
    .await;
  assert_eq!(retry.status(), StatusCode::OK);
  assert_eq!(
    json_body(retry).await,
    json!({ "success": true, "alreadyAccepted": true })
  );

  let history = h.store.list_acceptances("alice".into()).await.unwrap();
  assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn accept_rejects_bad_bodies_with_400() {
  let h = Harness::new().await;
  h.publish("1.0.0", 1).await;
  let token = h.token("alice");

  for body in [r#"{}"#, r#"{"termsId":42}"#, r#"{"termsId":""}"#, "{not json"] {
    let resp = h.send("POST", "/terms/accept", Some(&token), vec![], body).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body: {body}");
    assert_eq!(json_body(resp).await["error"], "termsId is required");
  }
}

#[tokio::test]
async fn accept_checks_session_before_body() {
  let h = Harness::new().await;
  let resp = h.send("POST", "/terms/accept", None, vec![], "{not json").await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// ── Reads ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn current_terms_are_public() {
  let h = Harness::new().await;
  h.publish("1.0.0", 1).await;
  h.publish("2.0.0", 5).await;

  let resp = h.get("/terms/current", None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json_body(resp).await;
  assert_eq!(body["version"], "2.0.0");
  assert_eq!(body["isCurrent"], true);
}

#[tokio::test]
async fn acceptance_history_is_newest_first() {
  let h = Harness::new().await;
  let token = h.token("alice");

  let v1 = h.publish("1.0.0", 1).await;
  h.post("/terms/accept", Some(&token), json!({ "termsId": v1 })).await;
  let v2 = h.publish("2.0.0", 2).await;
  h.post("/terms/accept", Some(&token), json!({ "termsId": v2 })).await;

  let body = json_body(h.get("/terms/acceptances", Some(&token)).await).await;
  let versions: Vec<_> = body
    .as_array()
    .unwrap()
    .iter()
    .map(|r| r["terms"]["version"].as_str().unwrap().to_string())
    .collect();
  assert_eq!(versions, ["2.0.0", "1.0.0"]);
  assert_eq!(body[0]["termsId"], v2.to_string());
}

// ── Users ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn me_falls_back_to_session_identity() {
  let h = Harness::new().await;
  let token = h.token("bob");

  let body = json_body(h.get("/me", Some(&token)).await).await;
  assert_eq!(body["id"], "bob");
  assert_eq!(body["email"], "bob@example.com");
  assert_eq!(body["hasPassword"], false);
  assert!(body["createdAt"].is_null());
}

#[tokio::test]
async fn update_name_trims_and_validates() {
  let h = Harness::new().await;
  let token = h.token("bob");

  let ok = h
    .post("/user/update-name", Some(&token), json!({ "name": "  Robert  " }))
    .await;
  assert_eq!(ok.status(), StatusCode::OK);
  assert_eq!(json_body(ok).await["name"], "Robert");

  let blank = h
    .post("/user/update-name", Some(&token), json!({ "name": "   " }))
    .await;
  assert_eq!(blank.status(), StatusCode::BAD_REQUEST);

  let long = h
    .post("/user/update-name", Some(&token), json!({ "name": "x".repeat(101) }))
    .await;
  assert_eq!(long.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_password_enforces_policy_and_current_password() {
  let h = Harness::new().await;
  let token = h.token("carol");

  let weak = h
    .post("/user/update-password", Some(&token), json!({ "newPassword": "password" }))
    .await;
  assert_eq!(weak.status(), StatusCode::BAD_REQUEST);

  // First password: nothing to verify against.
  let first = h
    .post("/user/update-password", Some(&token), json!({ "newPassword": "Str0ng!pass" }))
    .await;
  assert_eq!(first.status(), StatusCode::OK);

  let wrong = h
    .post(
      "/user/update-password",
      Some(&token),
      json!({ "currentPassword": "nope", "newPassword": "An0ther!pass" }),
    )
    .await;
  assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

  let right = h
    .post(
      "/user/update-password",
      Some(&token),
      json!({ "currentPassword": "Str0ng!pass", "newPassword": "An0ther!pass" }),
    )
    .await;
  assert_eq!(right.status(), StatusCode::OK);

  let me = json_body(h.get("/me", Some(&token)).await).await;
  assert_eq!(me["hasPassword"], true);
}

#[tokio::test]
async fn stored_hash_is_never_serialised() {
  let h = Harness::new().await;
  let token = h.token("dave");
  let profile = h.state.sessions.verify(&token).unwrap().profile();
  h.store.ensure_user(profile).await.unwrap();
  h.store
    .set_password_hash("dave".into(), hash_password("Str0ng!pass").unwrap())
    .await
    .unwrap();

  let body = h
    .post("/user/update-name", Some(&token), json!({ "name": "Dave" }))
    .await;
  let body = json_body(body).await;
  assert!(body.get("passwordHash").is_none());
}

// ── RPC ──────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn rpc_status_and_accept_use_envelopes() {
  let h = Harness::new().await;
  let terms_id = h.publish("1.0.0", 1).await;
  let token = h.token("alice");

  let status = h.get("/rpc/terms.getCurrentTermsStatus", Some(&token)).await;
  assert_eq!(status.status(), StatusCode::OK);
  let status = json_body(status).await;
  assert_eq!(status["result"]["data"]["needsAcceptance"], true);

  let accept = h
    .post("/rpc/terms.acceptTerms", Some(&token), json!({ "termsId": terms_id }))
    .await;
  assert_eq!(
    json_body(accept).await,
    json!({ "result": { "data": { "success": true, "alreadyAccepted": false } } })
  );

  let again = h
    .post("/rpc/terms.acceptTerms", Some(&token), json!({ "termsId": terms_id }))
    .await;
  assert_eq!(json_body(again).await["result"]["data"]["alreadyAccepted"], true);

  let history = json_body(h.get("/rpc/terms.getUserAcceptances", Some(&token)).await).await;
  assert_eq!(history["result"]["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn rpc_errors_carry_codes() {
  let h = Harness::new().await;
  h.publish("1.0.0", 1).await;
  let token = h.token("alice");

  let anon = h.get("/rpc/terms.getCurrentTermsStatus", None).await;
  assert_eq!(anon.status(), StatusCode::UNAUTHORIZED);
  assert_eq!(json_body(anon).await["error"]["code"], "UNAUTHORIZED");

  let unknown = h.get("/rpc/terms.dropTable", Some(&token)).await;
  assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
  assert_eq!(json_body(unknown).await["error"]["code"], "NOT_FOUND");

  let wrong_method = h.get("/rpc/terms.acceptTerms", Some(&token)).await;
  assert_eq!(wrong_method.status(), StatusCode::METHOD_NOT_ALLOWED);
  assert_eq!(json_body(wrong_method).await["error"]["code"], "METHOD_NOT_SUPPORTED");

  let bad = h
    .post("/rpc/terms.acceptTerms", Some(&token), json!({ "termsId": null }))
    .await;
  assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
  let bad = json_body(bad).await;
  assert_eq!(bad["error"]["code"], "BAD_REQUEST");
  assert_eq!(bad["error"]["message"], "termsId is required");
}

#[tokio::test]
async fn rpc_current_terms_is_public() {
  let h = Harness::new().await;

  let missing = h.get("/rpc/terms.getCurrentTerms", None).await;
  assert_eq!(missing.status(), StatusCode::NOT_FOUND);
  assert_eq!(
    json_body(missing).await["error"]["message"],
    "No current terms found"
  );

  h.publish("1.0.0", 1).await;
  let found = json_body(h.get("/rpc/terms.getCurrentTerms", None).await).await;
  assert_eq!(found["result"]["data"]["version"], "1.0.0");
}
