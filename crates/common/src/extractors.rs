//! Request extractors shared by Parley route handlers

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize};
use validator::Validate;

use crate::Error;

/// Page size used when the caller gives none
pub const DEFAULT_LIMIT: i64 = 10;

/// Largest page a caller may request
pub const MAX_LIMIT: i64 = 100;

/// `?limit=&offset=` window for list endpoints
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

impl Pagination {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
        }
    }

    /// Limit in `1..=MAX_LIMIT`, defaulting to [`DEFAULT_LIMIT`]
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    /// Non-negative offset, defaulting to 0
    pub fn offset(&self) -> i64 {
        self.offset.map_or(0, |o| o.max(0))
    }
}

/// JSON body that has passed `validator` checks.
///
/// Malformed bodies and failed validation both reject with 400.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

#[derive(Debug)]
pub enum ValidatedJsonRejection {
    Json(JsonRejection),
    Validation(Error),
}

impl IntoResponse for ValidatedJsonRejection {
    fn into_response(self) -> Response {
        let err = match self {
            ValidatedJsonRejection::Json(rejection) => Error::Validation(rejection.body_text()),
            ValidatedJsonRejection::Validation(err) => err,
        };
        err.into_response()
    }
}

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ValidatedJsonRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(ValidatedJsonRejection::Json)?;

        if let Err(errors) = value.validate() {
            return Err(ValidatedJsonRejection::Validation(Error::Validation(
                format!("Validation failed: {}", errors),
            )));
        }

        Ok(ValidatedJson(value))
    }
}
