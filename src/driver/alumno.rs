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

//! Operations on one student.

use crate::db::DbError;
use crate::driver::{Driver, DriverError, DriverResult, UpdateMode};
use crate::model::{Alumno, AlumnoId};
use crate::validation::{evaluate, full_rule_set, partial_rule_set, RawAttributes};

/// Formats the not-found error for `id` with the exact message the API exposes.
fn not_found(id: AlumnoId) -> DriverError {
    DriverError::NotFound(format!("Alumno {} does not exist/was not found", id))
}

impl Driver {
    /// Creates a new student from `attrs`, which must carry every attribute and pass the full
    /// rule set.
    pub(crate) async fn create_alumno(self, attrs: RawAttributes) -> DriverResult<Alumno> {
        let valid = evaluate(self.db.as_ref(), &attrs, &full_rule_set(None)).await?;
        let attrs = valid.into_complete().ok_or_else(|| {
            DriverError::BackendError("Full rule set yielded an incomplete payload".to_owned())
        })?;
        let alumno = self.db.insert_alumno(&attrs).await?;
        Ok(alumno)
    }

    /// Gets the student identified by `id`.
    pub(crate) async fn get_alumno(self, id: AlumnoId) -> DriverResult<Alumno> {
        match self.db.find_alumno_by_id(id).await {
            Ok(alumno) => Ok(alumno),
            Err(DbError::NotFound) => Err(not_found(id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Updates the student identified by `id` with the attributes in `attrs`, where `mode`
    /// selects between full-replace and partial-patch validation semantics.
    ///
    /// Only the attributes that passed validation are applied.  A patch whose validated payload
    /// is empty leaves the record untouched but still re-reads and returns it.
    pub(crate) async fn update_alumno(
        self,
        id: AlumnoId,
        attrs: RawAttributes,
        mode: UpdateMode,
    ) -> DriverResult<Alumno> {
        // Existence is checked before validation so that an unknown id yields the not-found
        // error even when the payload is invalid.
        if let Err(e) = self.db.find_alumno_by_id(id).await {
            return match e {
                DbError::NotFound => Err(not_found(id)),
                e => Err(e.into()),
            };
        }

        let rules = match mode {
            UpdateMode::Replace => full_rule_set(Some(id)),
            UpdateMode::Patch => partial_rule_set(Some(id), &attrs),
        };
        let valid = evaluate(self.db.as_ref(), &attrs, &rules).await?;

        match self
            .db
            .update_alumno_fields(
                id,
                valid.nombre.as_ref(),
                valid.email.as_ref(),
                valid.direccion.as_ref(),
            )
            .await
        {
            Ok(alumno) => Ok(alumno),
            Err(DbError::NotFound) => Err(not_found(id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes the student identified by `id`.
    pub(crate) async fn delete_alumno(self, id: AlumnoId) -> DriverResult<()> {
        match self.db.delete_alumno_by_id(id).await {
            Ok(()) => Ok(()),
            Err(DbError::NotFound) => Err(not_found(id)),
            Err(e) => Err(e.into()),
        }
    }
}
