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

//! Database abstraction in terms of the operations needed by the server.
//!
//! The facilities in this module provide an abstraction over different database systems.  The
//! PostgreSQL backend is for production use and the SQLite backend is primarily intended to
//! support unit tests.

use crate::model::{Address, Alumno, AlumnoAttributes, AlumnoId, EmailAddress, ModelError, StudentName};
use async_trait::async_trait;

pub mod postgres;
#[cfg(test)]
pub(crate) mod sqlite;

/// Database errors.  Any unexpected errors that come from the database are classified as
/// `BackendError`, but errors we know about have more specific types.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum DbError {
    /// Indicates that a request to create an entry failed because it already exists.
    #[error("Already exists")]
    AlreadyExists,

    /// Catch-all error type for unexpected database errors.
    #[error("Database error: {0}")]
    BackendError(String),

    /// Indicates a failure processing the data that already exists in the database.
    #[error("Data integrity error: {0}")]
    DataIntegrityError(String),

    /// Indicates that a requested entry does not exist.
    #[error("Entity not found")]
    NotFound,

    /// Indicates that the database is not available (maybe because of too many active concurrent
    /// connections).
    #[error("Unavailable")]
    Unavailable,
}

impl From<ModelError> for DbError {
    fn from(e: ModelError) -> Self {
        DbError::DataIntegrityError(e.to_string())
    }
}

/// Result type for this module.
pub type DbResult<T> = Result<T, DbError>;

/// Abstraction over the persistence operations needed by the service.
///
/// There is one method per storage operation, and every method returns an explicit `DbResult`
/// instead of relying on any implicit connection state.
#[async_trait]
pub trait Db {
    /// Returns every student in the roster, ordered by identifier, as read in a single snapshot.
    async fn list_alumnos(&self) -> DbResult<Vec<Alumno>>;

    /// Looks up a single student by `id`.
    ///
    /// Fails with `DbError::NotFound` when no record carries the identifier.
    async fn find_alumno_by_id(&self, id: AlumnoId) -> DbResult<Alumno>;

    /// Persists a new student built from `attrs` and returns the record with the identifier that
    /// the database assigned to it.
    async fn insert_alumno(&self, attrs: &AlumnoAttributes) -> DbResult<Alumno>;

    /// Overwrites the supplied fields of the student `id`, leaving any other field untouched, and
    /// returns the record as it exists after the write.
    ///
    /// All supplied fields are written in one go: either the whole set is applied or, on error,
    /// none is.  An empty set of fields re-reads and returns the record without modifying it.
    async fn update_alumno_fields(
        &self,
        id: AlumnoId,
        nombre: Option<&StudentName>,
        email: Option<&EmailAddress>,
        direccion: Option<&Address>,
    ) -> DbResult<Alumno>;

    /// Permanently removes the student `id` from the roster.
    async fn delete_alumno_by_id(&self, id: AlumnoId) -> DbResult<()>;

    /// Checks whether any student other than `exclude` is already named `nombre`.
    ///
    /// This check is not atomic with respect to a subsequent write: a concurrent writer can
    /// insert a conflicting name between the check and the write.
    async fn alumno_nombre_exists(
        &self,
        nombre: &StudentName,
        exclude: Option<AlumnoId>,
    ) -> DbResult<bool>;
}
