//! Caller identification.
//!
//! Authentication happens upstream (identity provider + gateway); by the time a
//! request reaches us the opaque user id is in `X-User-Id`. No header means an
//! anonymous caller.

use std::convert::Infallible;

use axum::{
  async_trait,
  extract::FromRequestParts,
  http::{request::Parts, HeaderMap},
};

pub const USER_ID_HEADER: &str = "x-user-id";

/// The opaque user id of the caller, or `None` when anonymous.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller(pub Option<String>);

impl Caller {
  pub fn from_headers(headers: &HeaderMap) -> Self {
    let id = headers
      .get(USER_ID_HEADER)
      .and_then(|v| v.to_str().ok())
      .map(str::trim)
      .filter(|v| !v.is_empty())
      .map(String::from);
    Caller(id)
  }

  pub fn user_id(&self) -> Option<&str> {
    self.0.as_deref()
  }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
  type Rejection = Infallible;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    Ok(Caller::from_headers(&parts.headers))
  }
}
