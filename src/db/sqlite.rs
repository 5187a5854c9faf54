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

//! Implementation of the database abstraction using SQLite.

use crate::db::{Db, DbError, DbResult};
use crate::model::{Address, Alumno, AlumnoAttributes, AlumnoId, EmailAddress, StudentName};
use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

/// Schema to use to initialize the test database.
const SCHEMA: &str = include_str!("sqlite.sql");

/// Takes a raw SQLx error `e` and converts it to our generic error type.
pub(crate) fn map_sqlx_error(e: sqlx::Error) -> DbError {
    match e {
        sqlx::Error::ColumnDecode { source, .. } => DbError::DataIntegrityError(source.to_string()),
        sqlx::Error::RowNotFound => DbError::NotFound,
        e if e.to_string().contains("UNIQUE constraint failed") => DbError::AlreadyExists,
        e => DbError::BackendError(e.to_string()),
    }
}

impl TryFrom<SqliteRow> for Alumno {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(map_sqlx_error)?;
        let nombre: String = row.try_get("nombre").map_err(map_sqlx_error)?;
        let email: String = row.try_get("email").map_err(map_sqlx_error)?;
        let direccion: String = row.try_get("direccion").map_err(map_sqlx_error)?;

        Ok(Alumno::new(
            AlumnoId::new(id),
            StudentName::new(nombre)?,
            EmailAddress::new(email)?,
            Address::new(direccion)?,
        ))
    }
}

/// A database instance backed by a SQLite database.
pub(crate) struct SqliteDb {
    /// Shared connection pool.  Kept to a single connection so that in-memory databases retain
    /// their contents across acquisitions.
    pool: SqlitePool,
}

impl SqliteDb {
    /// Creates a new connection to the database at `conn_str`.
    pub(crate) async fn connect(conn_str: &str) -> DbResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(conn_str)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self { pool })
    }

    /// Initializes the database schema.
    pub(crate) async fn init_schema(&self) -> DbResult<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await.map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[async_trait]
impl Db for SqliteDb {
    async fn list_alumnos(&self) -> DbResult<Vec<Alumno>> {
        let query_str = "SELECT id, nombre, email, direccion FROM alumnos ORDER BY id";
        let mut rows = sqlx::query(query_str).fetch(&self.pool);

        let mut alumnos = Vec::default();
        while let Some(row) = rows.try_next().await.map_err(map_sqlx_error)? {
            alumnos.push(Alumno::try_from(row)?);
        }
        Ok(alumnos)
    }

    async fn find_alumno_by_id(&self, id: AlumnoId) -> DbResult<Alumno> {
        let query_str = "SELECT id, nombre, email, direccion FROM alumnos WHERE id = ?";
        let row = sqlx::query(query_str)
            .bind(id.as_i64())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Alumno::try_from(row)
    }

    async fn insert_alumno(&self, attrs: &AlumnoAttributes) -> DbResult<Alumno> {
        let query_str = "INSERT INTO alumnos (nombre, email, direccion) VALUES (?, ?, ?)";
        let done = sqlx::query(query_str)
            .bind(attrs.nombre().as_str())
            .bind(attrs.email().as_str())
            .bind(attrs.direccion().as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        if done.rows_affected() != 1 {
            return Err(DbError::BackendError("Insertion affected more than one row".to_owned()));
        }

        let id = AlumnoId::new(done.last_insert_rowid());
        Ok(Alumno::new(
            id,
            attrs.nombre().clone(),
            attrs.email().clone(),
            attrs.direccion().clone(),
        ))
    }

    async fn update_alumno_fields(
        &self,
        id: AlumnoId,
        nombre: Option<&StudentName>,
        email: Option<&EmailAddress>,
        direccion: Option<&Address>,
    ) -> DbResult<Alumno> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let mut clauses = Vec::default();
        if nombre.is_some() {
            clauses.push("nombre = ?");
        }
        if email.is_some() {
            clauses.push("email = ?");
        }
        if direccion.is_some() {
            clauses.push("direccion = ?");
        }

        if !clauses.is_empty() {
            let query_str = format!("UPDATE alumnos SET {} WHERE id = ?", clauses.join(", "));
            let mut query = sqlx::query(&query_str);
            if let Some(nombre) = nombre {
                query = query.bind(nombre.as_str());
            }
            if let Some(email) = email {
                query = query.bind(email.as_str());
            }
            if let Some(direccion) = direccion {
                query = query.bind(direccion.as_str());
            }
            let done =
                query.bind(id.as_i64()).execute(&mut *tx).await.map_err(map_sqlx_error)?;
            if done.rows_affected() == 0 {
                return Err(DbError::NotFound);
            } else if done.rows_affected() != 1 {
                return Err(DbError::BackendError("Update affected more than one row".to_owned()));
            }
        }

        let query_str = "SELECT id, nombre, email, direccion FROM alumnos WHERE id = ?";
        let row = sqlx::query(query_str)
            .bind(id.as_i64())
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        let alumno = Alumno::try_from(row)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(alumno)
    }

    async fn delete_alumno_by_id(&self, id: AlumnoId) -> DbResult<()> {
        let query_str = "DELETE FROM alumnos WHERE id = ?";
        let done = sqlx::query(query_str)
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        if done.rows_affected() == 0 {
            return Err(DbError::NotFound);
        } else if done.rows_affected() != 1 {
            return Err(DbError::BackendError("Deletion affected more than one row".to_owned()));
        }
        Ok(())
    }

    async fn alumno_nombre_exists(
        &self,
        nombre: &StudentName,
        exclude: Option<AlumnoId>,
    ) -> DbResult<bool> {
        let row = match exclude {
            Some(exclude) => {
                let query_str =
                    "SELECT COUNT(*) AS count FROM alumnos WHERE nombre = ? AND id != ?";
                sqlx::query(query_str)
                    .bind(nombre.as_str())
                    .bind(exclude.as_i64())
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?
            }
            None => {
                let query_str = "SELECT COUNT(*) AS count FROM alumnos WHERE nombre = ?";
                sqlx::query(query_str)
                    .bind(nombre.as_str())
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?
            }
        };
        let count: i64 = row.try_get("count").map_err(map_sqlx_error)?;
        Ok(count > 0)
    }
}

/// Utilities for tests that need a database instance.
pub(crate) mod testutils {
    use super::*;

    /// Initializes an in-memory SQLite database with the service schema.
    pub(crate) async fn setup() -> Box<dyn Db + Send + Sync> {
        let db = SqliteDb::connect(":memory:").await.unwrap();
        db.init_schema().await.unwrap();
        Box::from(db)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::tests::generate_db_tests;

    generate_db_tests!(crate::db::sqlite::testutils::setup().await);
}
