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

//! Test utilities for the business logic.

use crate::db::Db;
use crate::driver::Driver;
use crate::model::{Address, Alumno, AlumnoAttributes, EmailAddress, StudentName};
use std::sync::Arc;

/// State for a test that exercises the driver against an in-memory database.
pub(crate) struct TestContext {
    /// The database the driver is backed by.
    db: Arc<dyn Db + Send + Sync>,
}

impl TestContext {
    /// Initializes the test context with an empty database.
    pub(crate) async fn setup() -> Self {
        let db = Arc::from(crate::db::sqlite::testutils::setup().await);
        Self { db }
    }

    /// Returns a driver instance for a one-shot operation.
    pub(crate) fn driver(&self) -> Driver {
        Driver::new(self.db.clone())
    }

    /// Returns direct access to the database behind the driver.
    pub(crate) fn db(&self) -> &(dyn Db + Send + Sync) {
        self.db.as_ref()
    }

    /// Inserts a student directly into the database, bypassing the driver.
    pub(crate) async fn insert_alumno(
        &self,
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
}
