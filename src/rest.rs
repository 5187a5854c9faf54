// Alumnos
// Copyright 2024 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Entry point to the REST server.
//!
//! Every API is put in its own `.rs` file, using a name like `<entity>_<method>.rs`.  This may
//! seem overkill, but putting every API in its own file makes it easy to ensure all the
//! integration tests for the given API truly belong to that API.
//!
//! More specifically, the `tests` module within an API defines a `route` method that returns the
//! HTTP method and the API path under test.  All integration tests within the module then rely
//! on `route` to obtain this information, ensuring that they all test the desired API.

use crate::driver::{Driver, DriverError};
use async_trait::async_trait;
use axum::body::HttpBody;
use axum::extract::{FromRequest, Request};
use axum::response::IntoResponse;
use axum::{middleware, Json, Router};
use tower_http::cors::CorsLayer;

mod accept;
mod alumno_delete;
mod alumno_get;
mod alumno_patch;
mod alumno_put;
mod alumnos_get;
mod alumnos_post;
mod jsonapi;
#[cfg(test)]
mod testutils;

use jsonapi::ErrorBody;

/// Media type that every request must declare in its `Accept` header.
pub(crate) const JSON_API_MEDIA_TYPE: &str = "application/vnd.api+json";

/// Frontend errors.  These are the errors that are visible to the user on failed requests, and
/// all of them render as the error shape the service guarantees to its callers.
#[derive(Debug, PartialEq, thiserror::Error)]
pub(crate) enum RestError {
    /// Catch-all error type for all unexpected errors.
    #[error("{0}")]
    InternalError(String),

    /// Indicates an error in the contents of the request.
    #[error("{0}")]
    InvalidRequest(String),

    /// Indicates that the request does not accept the JSON:API media type.
    #[error("Content File not specified")]
    NotAcceptable,

    /// Indicates that a requested entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Indicates that a request that should have empty content did not.
    #[error("Content should be empty")]
    PayloadNotEmpty,

    /// Indicates that the payload of a mutating request failed validation.
    #[error("{0}")]
    UnprocessableEntity(String),
}

impl From<DriverError> for RestError {
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::AlreadyExists(_) => RestError::InvalidRequest(e.to_string()),
            DriverError::BackendError(_) => RestError::InternalError(e.to_string()),
            DriverError::NotFound(_) => RestError::NotFound(e.to_string()),
            DriverError::ValidationFailed(_) => RestError::UnprocessableEntity(e.to_string()),
        }
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> axum::response::Response {
        let (status, title) = match &self {
            RestError::InternalError(_) => {
                (http::StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
            RestError::InvalidRequest(_) => (http::StatusCode::BAD_REQUEST, "Bad Request"),
            RestError::NotAcceptable => (http::StatusCode::NOT_ACCEPTABLE, "Not Acceptable"),
            RestError::NotFound(_) => (http::StatusCode::NOT_FOUND, "Resource not found"),
            RestError::PayloadNotEmpty => {
                (http::StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large")
            }
            RestError::UnprocessableEntity(_) => {
                (http::StatusCode::UNPROCESSABLE_ENTITY, "Unprocessable Entity")
            }
        };

        let body = ErrorBody::new(status, title, self.to_string());
        (status, Json(body)).into_response()
    }
}

/// A request body extractor that forbids any content.
///
/// Any API that doesn't expect a body should use this to ensure we don't get garbage data that
/// we don't care about.  This future-proofs the service.
pub(crate) struct EmptyBody {}

#[async_trait]
impl<S> FromRequest<S> for EmptyBody
where
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        if req.into_body().is_end_stream() {
            Ok(EmptyBody {})
        } else {
            Err(RestError::PayloadNotEmpty)
        }
    }
}

/// Creates the router for the application.
pub(crate) fn app(driver: Driver) -> Router {
    use axum::routing::get;
    Router::new()
        .route("/alumnos", get(alumnos_get::handler).post(alumnos_post::handler))
        .route(
            "/alumnos/:id",
            get(alumno_get::handler)
                .put(alumno_put::handler)
                .patch(alumno_patch::handler)
                .delete(alumno_delete::handler),
        )
        .layer(middleware::from_fn(accept::require_json_api))
        .layer(CorsLayer::permissive())
        .with_state(driver)
}
