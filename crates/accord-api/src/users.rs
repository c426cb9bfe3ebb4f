//! Handlers for the signed-in user's own record (dashboard and settings).
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/me` | Stored record, or the session identity if no row exists yet |
//! | `POST` | `/user/update-name` | Body: `{"name":"…"}` |
//! | `POST` | `/user/update-password` | Body: `{"currentPassword":"…","newPassword":"…"}` |

use accord_core::{password, store::AccordStore, user};
use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  ApiState,
  credentials::{hash_password, verify_password},
  error::ApiError,
  session::Session,
};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Me {
  pub id:           String,
  pub email:        Option<String>,
  pub name:         Option<String>,
  pub image:        Option<String>,
  pub has_password: bool,
  /// `None` until the user row has been created.
  pub created_at:   Option<DateTime<Utc>>,
}

/// `GET /me`
pub async fn me<S>(
  State(state): State<ApiState<S>>,
  Session(profile): Session,
) -> Result<Json<Me>, ApiError>
where
  S: AccordStore,
{
  let stored = state
    .store
    .get_user(profile.id.clone())
    .await
    .map_err(ApiError::store)?;

  let me = match stored {
    Some(u) => Me {
      has_password: u.has_password(),
      created_at:   Some(u.created_at),
      id:           u.id,
      email:        u.email,
      name:         u.name,
      image:        u.image,
    },
    None => Me {
      id:           profile.id,
      email:        profile.email,
      name:         profile.name,
      image:        profile.image,
      has_password: false,
      created_at:   None,
    },
  };
  Ok(Json(me))
}

#[derive(Debug, Deserialize)]
pub struct UpdateNameBody {
  pub name: String,
}

/// `POST /user/update-name`
pub async fn update_name<S>(
  State(state): State<ApiState<S>>,
  Session(profile): Session,
  Json(body): Json<UpdateNameBody>,
) -> Result<Json<user::User>, ApiError>
where
  S: AccordStore,
{
  let name = user::normalize_name(&body.name)?;
  let id = profile.id.clone();

  state.store.ensure_user(profile).await.map_err(ApiError::store)?;
  let updated = state
    .store
    .update_user_name(id.clone(), name)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))?;

  tracing::info!(user_id = %id, "display name updated");
  Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordBody {
  pub current_password: Option<String>,
  pub new_password:     String,
}

#[derive(Debug, Serialize)]
pub struct Updated {
  pub success: bool,
}

/// `POST /user/update-password`
///
/// Setting a first password needs no current password; changing an existing
/// one does.
pub async fn update_password<S>(
  State(state): State<ApiState<S>>,
  Session(profile): Session,
  Json(body): Json<UpdatePasswordBody>,
) -> Result<Json<Updated>, ApiError>
where
  S: AccordStore,
{
  password::check_strength(&body.new_password)?;
  let id = profile.id.clone();

  let stored = state.store.ensure_user(profile).await.map_err(ApiError::store)?;
  if let Some(existing) = stored.password_hash.as_deref() {
    let current = body.current_password.as_deref().unwrap_or_default();
    if !verify_password(current, existing) {
      return Err(ApiError::Unauthorized);
    }
  }

  let hash = hash_password(&body.new_password)?;
  state
    .store
    .set_password_hash(id.clone(), hash)
    .await
    .map_err(ApiError::store)?;

  tracing::info!(user_id = %id, "password updated");
  Ok(Json(Updated { success: true }))
}
