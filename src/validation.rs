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

//! Declarative validation policy for mutating operations.
//!
//! A rule set maps each targeted attribute to the list of constraints it must satisfy.  Rule-set
//! construction is pure and decoupled from the HTTP layer: creation and full-replace updates use
//! the complete rule set, and partial-patch updates target only the attributes present in the
//! payload.  Evaluation checks every targeted attribute and, only when all of them pass, yields
//! the validated subset of the payload for the caller to apply.

use crate::db::{Db, DbError};
use crate::model::{
    Address, AlumnoAttributes, AlumnoId, EmailAddress, StudentName, MAX_EMAIL_LENGTH,
    MAX_NOMBRE_LENGTH, MIN_DIRECCION_LENGTH,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

/// Attribute of the student payload targeted by the validation rules.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub(crate) enum Field {
    /// The `nombre` attribute.
    Nombre,

    /// The `email` attribute.
    Email,

    /// The `direccion` attribute.
    Direccion,
}

impl Field {
    /// Returns the attribute name as it appears on the wire.
    fn as_str(&self) -> &'static str {
        match self {
            Field::Nombre => "nombre",
            Field::Email => "email",
            Field::Direccion => "direccion",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single declarative constraint over one attribute.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Constraint {
    /// The attribute must be present and carry a non-empty string value.
    Required,

    /// The value must not be longer than this many characters.
    MaxLength(usize),

    /// The value must be at least this many characters long.
    MinLength(usize),

    /// The value must look like an email address.
    Email,

    /// The value must not match the name of any student other than `exclude`.
    Unique {
        /// Record whose own name does not count as a conflict.
        exclude: Option<AlumnoId>,
    },
}

/// The rules to apply to one request: a mapping from each targeted attribute to the constraints
/// it must satisfy.
pub(crate) type RuleSet = BTreeMap<Field, Vec<Constraint>>;

/// Returns the constraints for one `field`, discounting `exclude` from uniqueness checks.
fn field_rules(field: Field, exclude: Option<AlumnoId>) -> Vec<Constraint> {
    match field {
        Field::Nombre => vec![
            Constraint::Required,
            Constraint::MaxLength(MAX_NOMBRE_LENGTH),
            Constraint::Unique { exclude },
        ],
        Field::Email => vec![
            Constraint::Required,
            Constraint::Email,
            Constraint::MaxLength(MAX_EMAIL_LENGTH),
        ],
        Field::Direccion => {
            vec![Constraint::Required, Constraint::MinLength(MIN_DIRECCION_LENGTH)]
        }
    }
}

/// Builds the rule set for operations that must supply the full attributes payload, which are
/// creation and full-replace updates.
///
/// All attributes are targeted.  For updates, `exclude` names the record being updated so that
/// its own name does not trip the uniqueness check.
pub(crate) fn full_rule_set(exclude: Option<AlumnoId>) -> RuleSet {
    [Field::Nombre, Field::Email, Field::Direccion]
        .into_iter()
        .map(|field| (field, field_rules(field, exclude)))
        .collect()
}

/// Builds the rule set for partial-patch updates: only the attributes present in `supplied` are
/// targeted, each with the same constraints it would have under a full replace.
///
/// An attribute that is present but null is still targeted, so it fails the presence requirement
/// instead of being silently skipped.
pub(crate) fn partial_rule_set(exclude: Option<AlumnoId>, supplied: &RawAttributes) -> RuleSet {
    [Field::Nombre, Field::Email, Field::Direccion]
        .into_iter()
        .filter(|field| !matches!(supplied.get(*field), FieldValue::Absent))
        .map(|field| (field, field_rules(field, exclude)))
        .collect()
}

/// Deserializes a member into `Some(value)` so that, combined with `serde(default)`, a missing
/// member (`None`) can be told apart from an explicit null (`Some(None)`).
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Attributes payload as received on the wire, before any validation.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawAttributes {
    /// Raw value of the `nombre` attribute.
    #[serde(default, deserialize_with = "deserialize_present")]
    nombre: Option<Option<String>>,

    /// Raw value of the `email` attribute.
    #[serde(default, deserialize_with = "deserialize_present")]
    email: Option<Option<String>>,

    /// Raw value of the `direccion` attribute.
    #[serde(default, deserialize_with = "deserialize_present")]
    direccion: Option<Option<String>>,
}

impl RawAttributes {
    /// Returns how `field` appeared in the payload.
    fn get(&self, field: Field) -> FieldValue<'_> {
        let raw = match field {
            Field::Nombre => &self.nombre,
            Field::Email => &self.email,
            Field::Direccion => &self.direccion,
        };
        match raw {
            None => FieldValue::Absent,
            Some(None) => FieldValue::Null,
            Some(Some(value)) => FieldValue::Value(value),
        }
    }
}

#[cfg(test)]
impl RawAttributes {
    /// Creates a payload that carries all three attributes.
    pub(crate) fn full(nombre: &str, email: &str, direccion: &str) -> Self {
        RawAttributes::default()
            .with_nombre(Some(nombre))
            .with_email(Some(email))
            .with_direccion(Some(direccion))
    }

    /// Adds a `nombre` member to the payload, where `None` stands for an explicit null.
    pub(crate) fn with_nombre(mut self, value: Option<&str>) -> Self {
        self.nombre = Some(value.map(str::to_owned));
        self
    }

    /// Adds an `email` member to the payload, where `None` stands for an explicit null.
    pub(crate) fn with_email(mut self, value: Option<&str>) -> Self {
        self.email = Some(value.map(str::to_owned));
        self
    }

    /// Adds a `direccion` member to the payload, where `None` stands for an explicit null.
    pub(crate) fn with_direccion(mut self, value: Option<&str>) -> Self {
        self.direccion = Some(value.map(str::to_owned));
        self
    }
}

/// Presence of one attribute in a request payload.
#[derive(Debug, PartialEq)]
enum FieldValue<'a> {
    /// The member was not present at all.
    Absent,

    /// The member was present but explicitly null.
    Null,

    /// The member was present with a string value.
    Value(&'a str),
}

/// Accumulated per-attribute validation failures for one request.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct ValidationErrors(Vec<(Field, String)>);

impl ValidationErrors {
    /// Records that `field` failed a constraint with the given `message`.
    fn push<M: Into<String>>(&mut self, field: Field, message: M) {
        self.0.push((field, message.into()));
    }

    /// Checks whether any failure has been recorded so far.
    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{} {}", field, message)?;
            first = false;
        }
        Ok(())
    }
}

/// Errors that may arise while evaluating a rule set.
#[derive(Debug, PartialEq, thiserror::Error)]
pub(crate) enum EvaluationError {
    /// The uniqueness checks could not be completed.
    #[error(transparent)]
    Db(#[from] DbError),

    /// One or more attributes failed their constraints.
    #[error("{0}")]
    Invalid(ValidationErrors),
}

/// The subset of the payload that passed validation, with every value already typed.
#[derive(Debug, Default)]
#[cfg_attr(test, derive(PartialEq))]
pub(crate) struct ValidatedAttributes {
    /// Validated value of the `nombre` attribute, when targeted.
    pub(crate) nombre: Option<StudentName>,

    /// Validated value of the `email` attribute, when targeted.
    pub(crate) email: Option<EmailAddress>,

    /// Validated value of the `direccion` attribute, when targeted.
    pub(crate) direccion: Option<Address>,
}

impl ValidatedAttributes {
    /// Returns the complete attributes payload when all three attributes were validated, as is
    /// the case after evaluating the full rule set.
    pub(crate) fn into_complete(self) -> Option<AlumnoAttributes> {
        match (self.nombre, self.email, self.direccion) {
            (Some(nombre), Some(email), Some(direccion)) => {
                Some(AlumnoAttributes::new(nombre, email, direccion))
            }
            _ => None,
        }
    }
}

/// Evaluates `rules` against the `attrs` payload, yielding the validated subset of the payload
/// only when every targeted attribute satisfies all of its constraints.
///
/// Uniqueness constraints are checked against `db`.  The check is not atomic with respect to any
/// subsequent write, so two concurrent writers can still end up persisting the same name.
pub(crate) async fn evaluate(
    db: &(dyn Db + Send + Sync),
    attrs: &RawAttributes,
    rules: &RuleSet,
) -> Result<ValidatedAttributes, EvaluationError> {
    let mut errors = ValidationErrors::default();
    let mut valid = ValidatedAttributes::default();

    for (field, constraints) in rules {
        let value = match attrs.get(*field) {
            FieldValue::Value(value) if !value.is_empty() => value,
            _ => {
                // Missing, null and empty values all behave the same way: only the presence
                // requirement applies and every other constraint is skipped.
                if constraints.contains(&Constraint::Required) {
                    errors.push(*field, "is required");
                }
                continue;
            }
        };

        let mut field_ok = true;
        for constraint in constraints {
            let failure = match constraint {
                Constraint::Required => None,
                Constraint::MaxLength(max) => (value.chars().count() > *max)
                    .then(|| format!("must not be longer than {} characters", max)),
                Constraint::MinLength(min) => (value.chars().count() < *min)
                    .then(|| format!("must be at least {} characters long", min)),
                Constraint::Email => (!value.contains('@') || value.contains(' '))
                    .then(|| "does not look like a valid email address".to_owned()),
                // Uniqueness is deferred until the value is known to be well-formed.
                Constraint::Unique { .. } => None,
            };
            if let Some(message) = failure {
                errors.push(*field, message);
                field_ok = false;
            }
        }
        if !field_ok {
            continue;
        }

        match field {
            Field::Nombre => match StudentName::new(value) {
                Ok(nombre) => {
                    for constraint in constraints {
                        if let Constraint::Unique { exclude } = constraint {
                            if db.alumno_nombre_exists(&nombre, *exclude).await? {
                                errors.push(*field, "is already taken");
                                field_ok = false;
                            }
                        }
                    }
                    if field_ok {
                        valid.nombre = Some(nombre);
                    }
                }
                Err(e) => errors.push(*field, e.to_string()),
            },
            Field::Email => match EmailAddress::new(value) {
                Ok(email) => valid.email = Some(email),
                Err(e) => errors.push(*field, e.to_string()),
            },
            Field::Direccion => match Address::new(value) {
                Ok(direccion) => valid.direccion = Some(direccion),
                Err(e) => errors.push(*field, e.to_string()),
            },
        }
    }

    if errors.is_empty() {
        Ok(valid)
    } else {
        Err(EvaluationError::Invalid(errors))
    }
}
