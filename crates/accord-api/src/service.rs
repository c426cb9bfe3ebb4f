//! Terms operations shared by the REST handlers and the RPC procedures.

use accord_core::{
  store::AccordStore,
  terms::{AcceptOutcome, AcceptanceRecord, NewAcceptance, Terms, TermsStatus},
  user::UserProfile,
};
use uuid::Uuid;

use crate::error::ApiError;

const NO_CURRENT_TERMS: &str = "No current terms found";
const NOT_CURRENT: &str = "Terms not found or not current";

/// The current version, or 404.
pub async fn current_terms<S>(store: &S) -> Result<Terms, ApiError>
where
  S: AccordStore,
{
  store
    .current_terms()
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(NO_CURRENT_TERMS.into()))
}

/// Whether `user` still has to accept the current version.
pub async fn terms_status<S>(store: &S, user: &UserProfile) -> Result<TermsStatus, ApiError>
where
  S: AccordStore,
{
  let current = current_terms(store).await?;
  let acceptance = store
    .find_acceptance(user.id.clone(), current.id)
    .await
    .map_err(ApiError::store)?;

  Ok(TermsStatus {
    needs_acceptance: acceptance.is_none(),
    current_terms:    current.into(),
  })
}

/// Record that `user` accepts `terms_id`.
///
/// Idempotent: a repeat call returns `already_accepted = true` without
/// writing. Two racing first calls are settled by the store's uniqueness
/// constraint; the loser gets [`ApiError::Conflict`] and may retry.
pub async fn accept_terms<S>(
  store: &S,
  user: &UserProfile,
  terms_id: &str,
  ip_address: String,
) -> Result<AcceptOutcome, ApiError>
where
  S: AccordStore,
{
  // An id that is not even a UUID cannot name a current version.
  let terms_id = Uuid::parse_str(terms_id.trim())
    .map_err(|_| ApiError::NotFound(NOT_CURRENT.into()))?;

  store
    .get_terms(terms_id)
    .await
    .map_err(ApiError::store)?
    .filter(|t| t.is_current)
    .ok_or_else(|| ApiError::NotFound(NOT_CURRENT.into()))?;

  if already_accepted(store, user, terms_id).await? {
    return Ok(AcceptOutcome::already_accepted());
  }

  // Sessions can outlive or predate the user row; the acceptance needs one.
  store
    .ensure_user(user.clone())
    .await
    .map_err(ApiError::store)?;

  let input = NewAcceptance {
    user_id: user.id.clone(),
    terms_id,
    ip_address,
  };

  let err = match store.record_acceptance(input).await {
    Ok(acceptance) => {
      tracing::info!(
        user_id = %acceptance.user_id,
        terms_id = %acceptance.terms_id,
        ip = %acceptance.ip_address,
        "terms accepted"
      );
      return Ok(AcceptOutcome::recorded());
    }
    Err(e) => e,
  };

  // The row appearing between our check and the insert means a concurrent
  // request won the race.
  if already_accepted(store, user, terms_id).await? {
    tracing::warn!(user_id = %user.id, %terms_id, error = %err, "concurrent terms acceptance");
    return Err(ApiError::Conflict(
      "Terms acceptance is already being recorded".into(),
    ));
  }
  Err(ApiError::store(err))
}

/// A user's acceptances, newest first.
pub async fn acceptance_history<S>(
  store: &S,
  user: &UserProfile,
) -> Result<Vec<AcceptanceRecord>, ApiError>
where
  S: AccordStore,
{
  store
    .list_acceptances(user.id.clone())
    .await
    .map_err(ApiError::store)
}

async fn already_accepted<S>(
  store: &S,
  user: &UserProfile,
  terms_id: Uuid,
) -> Result<bool, ApiError>
where
  S: AccordStore,
{
  Ok(
    store
      .find_acceptance(user.id.clone(), terms_id)
      .await
      .map_err(ApiError::store)?
      .is_some(),
  )
}
