//! Extractor for the caller's address as reported by the reverse proxy.

use std::convert::Infallible;

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, request::Parts},
};

/// The resolved client address; see [`accord_core::client_ip::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl ClientIp {
  pub fn from_headers(headers: &HeaderMap) -> Self {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    ClientIp(accord_core::client_ip::resolve(
      header("x-forwarded-for"),
      header("x-real-ip"),
    ))
  }
}

impl<St: Send + Sync> FromRequestParts<St> for ClientIp {
  type Rejection = Infallible;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &St,
  ) -> Result<Self, Self::Rejection> {
    Ok(Self::from_headers(&parts.headers))
  }
}
