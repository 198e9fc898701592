//! Request extractors whose failures render as crate errors

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
};
use uuid::Uuid;

use crate::error::{Error, Result};

/// `axum::Json` with rejections reported as `Error::BadRequest`
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| Error::bad_request(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Parse an identifier taken from a path or body.
///
/// Anything that is not a UUID cannot name a stored entity, so it is reported
/// through `not_found` like any other unknown ID.
pub fn parse_id(raw: &str, not_found: impl FnOnce(String) -> Error) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| not_found(raw.to_string()))
}
