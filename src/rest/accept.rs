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

//! Middleware to enforce the content-negotiation contract.

use crate::rest::{RestError, JSON_API_MEDIA_TYPE};
use axum::extract::Request;
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Rejects any request that does not declare `Accept: application/vnd.api+json`, exactly.
///
/// The check runs before handler dispatch, so rejected requests never reach the business logic.
pub(crate) async fn require_json_api(request: Request, next: Next) -> Response {
    let accept = request.headers().get(header::ACCEPT).and_then(|value| value.to_str().ok());
    match accept {
        Some(value) if value == JSON_API_MEDIA_TYPE => next.run(request).await,
        _ => RestError::NotAcceptable.into_response(),
    }
}
