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

//! Test utilities for the REST API.

use crate::db::{Db, DbError};
use crate::driver::Driver;
use crate::model::{Address, Alumno, AlumnoAttributes, AlumnoId, EmailAddress, StudentName};
use crate::rest::app;
use crate::rest::jsonapi::{ErrorBody, ErrorObject};
use crate::rest::JSON_API_MEDIA_TYPE;
use axum::extract::Request;
use axum::http::{self, HeaderValue};
use axum::Router;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tower::util::ServiceExt;

/// Maximum body size for testing purposes.
const MAX_BODY_SIZE: usize = 1024;

/// State for a test that exercises the REST interface end to end against an in-memory database.
pub(crate) struct TestContext {
    /// Direct access to the database backing the app, for test preparation and verification.
    db: Arc<dyn Db + Send + Sync>,

    /// The application under test.
    app: Router,
}

impl TestContext {
    /// Initializes the test context with an empty database.
    pub(crate) async fn setup() -> Self {
        let db: Arc<dyn Db + Send + Sync> =
            Arc::from(crate::db::sqlite::testutils::setup().await);
        let driver = Driver::new(db.clone());
        let app = app(driver);
        Self { db, app }
    }

    /// Returns the app under test for a one-shot request.
    pub(crate) fn app(&self) -> Router {
        self.app.clone()
    }

    /// Consumes the context and returns the app under test for a final one-shot request.
    pub(crate) fn into_app(self) -> Router {
        self.app
    }

    /// Inserts a student directly into the database, bypassing the REST layer.
    pub(crate) async fn create_alumno(
        &mut self,
        nombre: &str,
        email: &str,
        direccion: &str,
    ) -> Alumno {
        self.db
            .insert_alumno(&AlumnoAttributes::new(
                StudentName::new(nombre).unwrap(),
                EmailAddress::new(email).unwrap(),
                Address::new(direccion).unwrap(),
            ))
            .await
            .unwrap()
    }

    /// Reads a student directly from the database, which must exist.
    pub(crate) async fn get_alumno(&self, id: i64) -> Alumno {
        self.db.find_alumno_by_id(AlumnoId::new(id)).await.unwrap()
    }

    /// Checks whether the student `id` exists in the database.
    pub(crate) async fn has_alumno(&self, id: i64) -> bool {
        match self.db.find_alumno_by_id(AlumnoId::new(id)).await {
            Ok(_) => true,
            Err(DbError::NotFound) => false,
            Err(e) => panic!("Unexpected database error: {:?}", e),
        }
    }

    /// Counts the students currently in the database.
    pub(crate) async fn count_alumnos(&self) -> usize {
        self.db.list_alumnos().await.unwrap().len()
    }
}

/// Builder for a single request to the API server.
///
/// Requests carry the JSON:API `Accept` header by default, given that almost every test needs to
/// get past the content-negotiation gate; the gate's own tests opt out explicitly.
#[must_use]
pub(crate) struct OneShotBuilder {
    /// The router for the app being tested.
    app: Router,

    /// Builder for the request that will be sent to the app.
    builder: http::request::Builder,

    /// Value for the `Accept` header, if one is to be sent at all.
    accept: Option<HeaderValue>,
}

impl OneShotBuilder {
    /// Creates a new request against a given `method`/`uri` pair served by an `app` router.
    pub(crate) fn new<U: AsRef<str>>(app: Router, (method, uri): (http::Method, U)) -> Self {
        let builder = Request::builder().method(method).uri(uri.as_ref());
        Self { app, builder, accept: Some(HeaderValue::from_static(JSON_API_MEDIA_TYPE)) }
    }

    /// Replaces the default `Accept` header with `value`.
    pub(crate) fn with_accept(mut self, value: &'static str) -> Self {
        self.accept = Some(HeaderValue::from_static(value));
        self
    }

    /// Drops the `Accept` header from the outgoing request altogether.
    pub(crate) fn without_accept(mut self) -> Self {
        self.accept = None;
        self
    }

    /// Applies the pending `Accept` header, if any, to the request builder.
    fn apply_accept(mut self) -> Self {
        if let Some(accept) = self.accept.take() {
            self.builder = self.builder.header(http::header::ACCEPT, accept);
        }
        self
    }

    /// Finishes building the request and sends it with an empty payload.
    pub(crate) async fn send_empty(self) -> ResponseChecker {
        let builder = self.apply_accept();
        let request = builder.builder.body(axum::body::Body::empty()).unwrap();
        ResponseChecker::from(builder.app.oneshot(request).await.unwrap())
    }

    /// Finishes building the request and sends it with a JSON payload.
    pub(crate) async fn send_json<T: Serialize>(self, request: T) -> ResponseChecker {
        let builder = self.apply_accept();
        let request = builder
            .builder
            .header(http::header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
            .body(axum::body::Body::from(serde_json::to_vec(&request).unwrap()))
            .unwrap();
        ResponseChecker::from(builder.app.oneshot(request).await.unwrap())
    }

    /// Finishes building the request and sends it with a text payload.
    pub(crate) async fn send_text<T: Into<String>>(self, text: T) -> ResponseChecker {
        let builder = self.apply_accept();
        let request = builder
            .builder
            .header(http::header::CONTENT_TYPE, mime::TEXT_PLAIN.as_ref())
            .body(axum::body::Body::from(text.into()))
            .unwrap();
        ResponseChecker::from(builder.app.oneshot(request).await.unwrap())
    }
}

/// Type alias for the response type returned by the `oneshot` call.
type HttpResponse = http::Response<axum::body::Body>;

/// Validator for the outcome of a request sent by a `OneShotBuilder`.
#[must_use]
pub(crate) struct ResponseChecker {
    /// Actual response that we received from the app.
    response: HttpResponse,

    /// Expected HTTP status code in the response above.
    exp_status: http::StatusCode,
}

impl From<HttpResponse> for ResponseChecker {
    fn from(response: HttpResponse) -> Self {
        Self { response, exp_status: http::StatusCode::OK }
    }
}

impl ResponseChecker {
    /// Sets the expected exit HTTP status to `status`.
    pub(crate) fn expect_status(mut self, status: http::StatusCode) -> Self {
        self.exp_status = status;
        self
    }

    /// Performs common validation operations on the response.
    fn verify(&self) {
        assert_eq!(self.exp_status, self.response.status());
    }

    /// Finishes checking the response and expects it to contain an empty body.
    pub(crate) async fn expect_empty(self) {
        self.verify();

        let body = axum::body::to_bytes(self.response.into_body(), MAX_BODY_SIZE).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.is_empty(), "Body not empty; got {}", body);
    }

    /// Finishes checking the response and expects its body to be the error envelope built from
    /// the given `status`, `title` and `detail` values, all matched exactly.
    pub(crate) async fn expect_error(self, status: &str, title: &str, detail: &str) {
        self.verify();

        let body = axum::body::to_bytes(self.response.into_body(), MAX_BODY_SIZE).await.unwrap();
        let response: ErrorBody = match serde_json::from_slice(&body) {
            Ok(response) => response,
            Err(e) => {
                let body = String::from_utf8(body.to_vec()).unwrap();
                panic!("Invalid error response due to {}; content was {}", e, body);
            }
        };
        let exp_response = ErrorBody {
            errors: ErrorObject {
                status: status.to_owned(),
                title: title.to_owned(),
                detail: detail.to_owned(),
            },
        };
        assert_eq!(exp_response, response);
    }

    /// Finishes checking the response and expects it to contain a valid JSON object of type `T`.
    pub(crate) async fn expect_json<T: DeserializeOwned>(self) -> T {
        self.verify();

        let body = axum::body::to_bytes(self.response.into_body(), MAX_BODY_SIZE).await.unwrap();
        serde_json::from_slice::<T>(&body).unwrap()
    }

    /// Finishes checking the response and expects its body to be valid UTF-8 and to contain the
    /// `exp_fragment` text.
    pub(crate) async fn expect_text(self, exp_fragment: &str) {
        assert!(!exp_fragment.is_empty(), "Use expect_empty to validate empty responses");

        self.verify();

        let body = axum::body::to_bytes(self.response.into_body(), MAX_BODY_SIZE).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(
            body.contains(exp_fragment),
            "Body content '{}' does not contain '{}'",
            body,
            exp_fragment
        );
    }

    /// Finishes checking the response and returns the response itself for out of band validation
    /// of properties not supported by the `ResponseChecker`.
    pub(crate) async fn take_response(self) -> HttpResponse {
        self.verify();

        self.response
    }
}
