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

//! Implementation of the database abstraction using PostgreSQL.

use crate::db::{Db, DbError, DbResult};
use crate::env::{get_optional_var, get_required_var};
use crate::model::{Address, Alumno, AlumnoAttributes, AlumnoId, EmailAddress, StudentName};
use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::postgres::{PgConnectOptions, PgDatabaseError, PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

/// Schema to use to initialize the production database.
const SCHEMA: &str = include_str!("postgres.sql");

/// Takes a raw SQLx error `e` and converts it to our generic error type.
pub(crate) fn map_sqlx_error(e: sqlx::Error) -> DbError {
    match e {
        sqlx::Error::ColumnDecode { source, .. } => DbError::DataIntegrityError(source.to_string()),
        sqlx::Error::Database(e) => match e.downcast_ref::<PgDatabaseError>().code() {
            "23505" /* unique_violation */ => DbError::AlreadyExists,
            "53300" /* too_many_connections */ => DbError::Unavailable,
            number => DbError::BackendError(format!("pgsql error {}: {}", number, e)),
        },
        sqlx::Error::PoolTimedOut => DbError::Unavailable,
        sqlx::Error::RowNotFound => DbError::NotFound,
        e => DbError::BackendError(e.to_string()),
    }
}

impl TryFrom<PgRow> for Alumno {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
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

/// Options to establish a connection to a PostgreSQL database.
#[derive(Default)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub struct PostgresOptions {
    /// Host to connect to.
    pub host: String,

    /// Port to connect to (typically 5432).
    pub port: u16,

    /// Database name to connect to.
    pub database: String,

    /// Username to establish the connection with.
    pub username: String,

    /// Password to establish the connection with.
    pub password: String,

    /// Minimum number of connections to keep open against the database.
    pub min_connections: Option<u32>,

    /// Maximum number of connections to allow against the database.
    pub max_connections: Option<u32>,
}

impl PostgresOptions {
    /// Initializes a set of options from environment variables whose name is prefixed with the
    /// given `prefix`.
    ///
    /// This will use variables such as `<prefix>_HOST`, `<prefix>_PORT`, `<prefix>_DATABASE`,
    /// `<prefix>_USERNAME`, `<prefix>_PASSWORD`, `<prefix>_MIN_CONNECTIONS` and
    /// `<prefix>_MAX_CONNECTIONS`.
    pub fn from_env(prefix: &str) -> Result<PostgresOptions, String> {
        Ok(PostgresOptions {
            host: get_required_var::<String>(prefix, "HOST")?,
            port: get_required_var::<u16>(prefix, "PORT")?,
            database: get_required_var::<String>(prefix, "DATABASE")?,
            username: get_required_var::<String>(prefix, "USERNAME")?,
            password: get_required_var::<String>(prefix, "PASSWORD")?,
            min_connections: get_optional_var::<u32>(prefix, "MIN_CONNECTIONS")?,
            max_connections: get_optional_var::<u32>(prefix, "MAX_CONNECTIONS")?,
        })
    }
}

/// A database instance backed by a PostgreSQL database.
pub struct PostgresDb {
    /// Shared connection pool.
    pool: PgPool,
}

impl PostgresDb {
    /// Creates a new connection with the given options.
    ///
    /// Connections are established lazily, so failures only surface once the pool is first used.
    pub fn connect(opts: PostgresOptions) -> PostgresDb {
        let mut pool_opts = PgPoolOptions::new();
        if let Some(min_connections) = opts.min_connections {
            pool_opts = pool_opts.min_connections(min_connections);
        }
        if let Some(max_connections) = opts.max_connections {
            pool_opts = pool_opts.max_connections(max_connections);
        }

        let conn_opts = PgConnectOptions::new()
            .host(&opts.host)
            .port(opts.port)
            .database(&opts.database)
            .username(&opts.username)
            .password(&opts.password);

        Self { pool: pool_opts.connect_lazy_with(conn_opts) }
    }

    /// Initializes the database schema.
    pub async fn init_schema(&self) -> DbResult<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await.map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[async_trait]
impl Db for PostgresDb {
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
        let query_str = "SELECT id, nombre, email, direccion FROM alumnos WHERE id = $1";
        let row = sqlx::query(query_str)
            .bind(id.as_i64())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Alumno::try_from(row)
    }

    async fn insert_alumno(&self, attrs: &AlumnoAttributes) -> DbResult<Alumno> {
        let query_str =
            "INSERT INTO alumnos (nombre, email, direccion) VALUES ($1, $2, $3) RETURNING id";
        let row = sqlx::query(query_str)
            .bind(attrs.nombre().as_str())
            .bind(attrs.email().as_str())
            .bind(attrs.direccion().as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        let id: i64 = row.try_get("id").map_err(map_sqlx_error)?;

        Ok(Alumno::new(
            AlumnoId::new(id),
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
        let mut next_param = 1;
        if nombre.is_some() {
            clauses.push(format!("nombre = ${}", next_param));
            next_param += 1;
        }
        if email.is_some() {
            clauses.push(format!("email = ${}", next_param));
            next_param += 1;
        }
        if direccion.is_some() {
            clauses.push(format!("direccion = ${}", next_param));
            next_param += 1;
        }

        if !clauses.is_empty() {
            let query_str =
                format!("UPDATE alumnos SET {} WHERE id = ${}", clauses.join(", "), next_param);
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

        let query_str = "SELECT id, nombre, email, direccion FROM alumnos WHERE id = $1";
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
        let query_str = "DELETE FROM alumnos WHERE id = $1";
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
                    "SELECT COUNT(*) AS count FROM alumnos WHERE nombre = $1 AND id != $2";
                sqlx::query(query_str)
                    .bind(nombre.as_str())
                    .bind(exclude.as_i64())
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?
            }
            None => {
                let query_str = "SELECT COUNT(*) AS count FROM alumnos WHERE nombre = $1";
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
