//! Path extractors whose rejections match the page they belong to.
//!
//! A malformed `{id}` (e.g. `/contacts/abc`) is rejected by axum's `Path`
//! with a plain-text body. These wrappers turn that into the HTML error page
//! or the JSON `{success, errors}` body instead.

use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
    response::Response,
};
use serde::de::DeserializeOwned;

use super::addresses::AddressResponse;
use crate::error::AppError;

/// Path parameter for HTML pages; a bad value renders the 400 error page.
pub struct PagePath<T>(pub T);

impl<S, T> FromRequestParts<S> for PagePath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Path parameter for JSON endpoints; a bad value gets a `400` JSON body.
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => Err(AddressResponse::rejected("id", &rejection.body_text())),
        }
    }
}
