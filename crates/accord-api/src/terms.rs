//! Handlers for `/terms` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/terms/status` | Session required; 404 if nothing is current |
//! | `POST` | `/terms/accept` | Body: `{"termsId":"<uuid>"}` |
//! | `GET`  | `/terms/current` | Public |
//! | `GET`  | `/terms/acceptances` | The caller's history, newest first |

use accord_core::{
  store::AccordStore,
  terms::{AcceptOutcome, AcceptanceRecord, Terms, TermsStatus},
};
use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
};
use serde_json::Value;

use crate::{ApiState, client_ip::ClientIp, error::ApiError, service, session::Session};

// ─── Status ───────────────────────────────────────────────────────────────────

/// `GET /terms/status`
pub async fn status<S>(
  State(state): State<ApiState<S>>,
  Session(user): Session,
) -> Result<Json<TermsStatus>, ApiError>
where
  S: AccordStore,
{
  Ok(Json(service::terms_status(state.store.as_ref(), &user).await?))
}

// ─── Accept ───────────────────────────────────────────────────────────────────

/// Pull `termsId` out of an accept body. Anything but a non-empty string is a
/// bad request.
pub(crate) fn terms_id_from(body: &Value) -> Result<&str, ApiError> {
  body
    .get("termsId")
    .and_then(Value::as_str)
    .filter(|id| !id.is_empty())
    .ok_or_else(|| ApiError::BadRequest("termsId is required".into()))
}

/// `POST /terms/accept` with body `{"termsId":"…"}`
///
/// The session is checked before the body, so an anonymous caller always sees
/// 401 regardless of what it sent.
pub async fn accept<S>(
  State(state): State<ApiState<S>>,
  Session(user): Session,
  ClientIp(ip): ClientIp,
  body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<AcceptOutcome>, ApiError>
where
  S: AccordStore,
{
  let Json(body) =
    body.map_err(|_| ApiError::BadRequest("termsId is required".into()))?;
  let terms_id = terms_id_from(&body)?;

  let outcome =
    service::accept_terms(state.store.as_ref(), &user, terms_id, ip).await?;
  Ok(Json(outcome))
}

// ─── Reads ────────────────────────────────────────────────────────────────────

/// `GET /terms/current`. No session needed.
pub async fn current<S>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Terms>, ApiError>
where
  S: AccordStore,
{
  Ok(Json(service::current_terms(state.store.as_ref()).await?))
}

/// `GET /terms/acceptances`
pub async fn acceptances<S>(
  State(state): State<ApiState<S>>,
  Session(user): Session,
) -> Result<Json<Vec<AcceptanceRecord>>, ApiError>
where
  S: AccordStore,
{
  Ok(Json(service::acceptance_history(state.store.as_ref(), &user).await?))
}
