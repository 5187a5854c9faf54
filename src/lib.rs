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

//! REST service that manages a roster of students ("alumnos") following the
//! JSON:API convention.
//!
//! The code adheres to a layered architecture and there is one module per
//! layer:
//!
//! 1.  `model`: High-level data types that represent concepts in the domain
//!     of the application.  There is no logic in here other than validation
//!     at construction time, via extensive use of the newtype pattern.
//!
//! 1.  `db`: The persistence layer.  Exposes one repository operation per
//!     storage access, backed by PostgreSQL in production and by SQLite for
//!     unit testing purposes.
//!
//! 1.  `validation`: The declarative validation policy for mutating
//!     operations.  Rule sets are built by pure functions, decoupled from
//!     the HTTP layer, and evaluated against incoming payloads.
//!
//! 1.  `driver`: The business logic layer.  The `Driver` type coordinates
//!     the validation policy and the database on behalf of every operation.
//!
//! 1.  `rest`: The HTTP layer, offering the REST APIs through an
//!     `axum::Router` where every API is backed by the `Driver`.
//!
//! 1.  `main`: The app launcher, which gathers configuration data from
//!     environment variables and calls `serve` to start the application.
//!
//! There are result and error types in every layer, such as `DbResult` and
//! `DbError`.  Errors float to the top of the app using the `?` operator and
//! are translated to HTTP status codes once returned from the REST layer.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

pub mod db;
use db::Db;
mod driver;
use driver::Driver;
pub mod env;
pub mod model;
mod rest;
use rest::app;
mod validation;

/// Instantiates all resources to serve the application on `bind_addr`.
///
/// While it'd be nice to push this responsibility to `main`, doing so would force us to expose
/// many crate-internal types to the public, which in turn would make dead code detection harder.
pub async fn serve(
    bind_addr: impl Into<SocketAddr>,
    db: Box<dyn Db + Send + Sync>,
) -> Result<(), Box<dyn Error>> {
    let driver = Driver::new(Arc::from(db));
    let app = app(driver);

    let listener = tokio::net::TcpListener::bind(bind_addr.into()).await?;
    log::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
