//! Typed RPC procedures, one per path segment under `/rpc`.
//!
//! Queries are `GET`, mutations are `POST` with a JSON input body. Every
//! response is wrapped in an envelope:
//!
//! ```text
//! 200  {"result": {"data": …}}
//! 4xx  {"error": {"code": "NOT_FOUND", "message": "…"}}
//! ```

use std::str::FromStr;

use accord_core::{store::AccordStore, user::UserProfile};
use axum::{
  Json,
  body::Bytes,
  extract::{Path, State},
  http::{HeaderMap, Method, StatusCode},
  response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use strum::{AsRefStr, EnumIter, EnumString};

use crate::{
  ApiState, client_ip::ClientIp, error::ApiError, service, terms::terms_id_from,
};

// ─── Procedures ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, EnumString, EnumIter)]
pub enum Procedure {
  #[strum(serialize = "terms.getCurrentTermsStatus")]
  GetCurrentTermsStatus,
  #[strum(serialize = "terms.acceptTerms")]
  AcceptTerms,
  #[strum(serialize = "terms.getCurrentTerms")]
  GetCurrentTerms,
  #[strum(serialize = "terms.getUserAcceptances")]
  GetUserAcceptances,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
  Query,
  Mutation,
}

impl Procedure {
  pub fn kind(self) -> Kind {
    match self {
      Procedure::AcceptTerms => Kind::Mutation,
      _ => Kind::Query,
    }
  }

  /// Public procedures run without a session.
  pub fn is_public(self) -> bool { matches!(self, Procedure::GetCurrentTerms) }

  fn method(self) -> Method {
    match self.kind() {
      Kind::Query => Method::GET,
      Kind::Mutation => Method::POST,
    }
  }
}

// ─── Envelope ────────────────────────────────────────────────────────────────

enum RpcError {
  Api(ApiError),
  MethodNotSupported(String),
}

impl From<ApiError> for RpcError {
  fn from(e: ApiError) -> Self { RpcError::Api(e) }
}

impl IntoResponse for RpcError {
  fn into_response(self) -> Response {
    let (status, code, message) = match self {
      RpcError::Api(e) => (e.status(), e.code(), e.public_message()),
      RpcError::MethodNotSupported(m) => {
        (StatusCode::METHOD_NOT_ALLOWED, "METHOD_NOT_SUPPORTED", m)
      }
    };
    let body = json!({ "error": { "code": code, "message": message } });
    (status, Json(body)).into_response()
  }
}

fn ok<T: Serialize>(data: T) -> Result<Response, RpcError> {
  let data = serde_json::to_value(data)
    .map_err(|e| ApiError::Internal(format!("serialising rpc result: {e}")))?;
  Ok(Json(json!({ "result": { "data": data } })).into_response())
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

/// `GET|POST /rpc/{procedure}`
pub async fn dispatch<S>(
  State(state): State<ApiState<S>>,
  Path(name): Path<String>,
  method: Method,
  headers: HeaderMap,
  body: Bytes,
) -> Response
where
  S: AccordStore,
{
  match call(&state, &name, &method, &headers, &body).await {
    Ok(response) => response,
    Err(e) => e.into_response(),
  }
}

async fn call<S>(
  state: &ApiState<S>,
  name: &str,
  method: &Method,
  headers: &HeaderMap,
  body: &[u8],
) -> Result<Response, RpcError>
where
  S: AccordStore,
{
  let procedure = Procedure::from_str(name).map_err(|_| {
    ApiError::NotFound(format!("No procedure found on path \"{name}\""))
  })?;

  if *method != procedure.method() {
    return Err(RpcError::MethodNotSupported(format!(
      "Unsupported {method} request to {} procedure at path \"{name}\"",
      match procedure.kind() {
        Kind::Query => "query",
        Kind::Mutation => "mutation",
      }
    )));
  }

  let user = if procedure.is_public() {
    None
  } else {
    Some(state.sessions.authenticate(headers)?)
  };

  tracing::debug!(procedure = procedure.as_ref(), "rpc call");

  let store = state.store.as_ref();
  match (procedure, user) {
    (Procedure::GetCurrentTerms, _) => ok(service::current_terms(store).await?),
    (Procedure::GetCurrentTermsStatus, Some(user)) => {
      ok(service::terms_status(store, &user).await?)
    }
    (Procedure::GetUserAcceptances, Some(user)) => {
      ok(service::acceptance_history(store, &user).await?)
    }
    (Procedure::AcceptTerms, Some(user)) => accept(state, &user, headers, body).await,
    (_, None) => Err(ApiError::Unauthorized.into()),
  }
}

async fn accept<S>(
  state: &ApiState<S>,
  user: &UserProfile,
  headers: &HeaderMap,
  body: &[u8],
) -> Result<Response, RpcError>
where
  S: AccordStore,
{
  let input: Value = serde_json::from_slice(body)
    .map_err(|_| ApiError::BadRequest("termsId is required".into()))?;
  let terms_id = terms_id_from(&input)?;
  let ClientIp(ip) = ClientIp::from_headers(headers);

  ok(service::accept_terms(state.store.as_ref(), user, terms_id, ip).await?)
}
