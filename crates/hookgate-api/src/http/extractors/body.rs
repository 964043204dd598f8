//! Raw request body, rejected with an [`AppError`] (for example 413 when the
//! body exceeds the configured limit).

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};

use crate::http::error::AppError;

/// Body bytes exactly as received.
#[derive(Debug, Clone)]
pub struct RawBody(pub Bytes);

impl<S> FromRequest<S> for RawBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Ok(RawBody(Bytes::from_request(req, state).await?))
    }
}
