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

//! API to create a new student.

use crate::driver::Driver;
use crate::rest::jsonapi::{Document, RequestDocument, ResourceObject};
use crate::rest::RestError;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::{http, Json};

/// API handler.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    Json(request): Json<RequestDocument>,
) -> Result<(http::StatusCode, impl IntoResponse), RestError> {
    let alumno = driver.create_alumno(request.data.attributes).await?;
    Ok((http::StatusCode::CREATED, Json(Document { data: ResourceObject::from(&alumno) })))
}
