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

//! High-level data types for the service.

use derive_getters::Getters;
use derive_more::Constructor;
use serde::de::Visitor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a student name as specified in the schema.
pub(crate) const MAX_NOMBRE_LENGTH: usize = 255;

/// Maximum length of an email address as specified in the schema.
pub(crate) const MAX_EMAIL_LENGTH: usize = 255;

/// Minimum length of a postal address.
pub(crate) const MIN_DIRECCION_LENGTH: usize = 3;

/// Errors raised when validating untrusted model data.
#[derive(Debug, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct ModelError(pub(crate) String);

/// Result type for this module.
pub type ModelResult<T> = Result<T, ModelError>;

/// Identifier of a student as assigned by the database.
///
/// Identifiers come from a database sequence and are never reused, even after
/// the record they belonged to is deleted.
#[derive(Clone, Constructor, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct AlumnoId(i64);

impl AlumnoId {
    /// Returns the identifier as the `i64` the database stores.
    pub(crate) fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for AlumnoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Represents a valid student name.
///
/// Names are free-form text bounded by the schema.  Names must also be unique
/// across all students, but uniqueness is a write-time concern of the
/// validation policy and is not enforced here.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct StudentName(String);

impl StudentName {
    /// Creates a new name from an untrusted string `s`, making sure it is valid.
    pub fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        let s = s.into();

        if s.is_empty() {
            return Err(ModelError("Name cannot be empty".to_owned()));
        }
        if s.chars().count() > MAX_NOMBRE_LENGTH {
            return Err(ModelError("Name is too long".to_owned()));
        }

        Ok(Self(s))
    }

    /// Creates a new name from an untrusted string `s`, without validation.  Useful for testing
    /// purposes only.
    #[cfg(test)]
    pub(crate) fn new_invalid<S: Into<String>>(s: S) -> Self {
        Self(s.into())
    }

    /// Returns a string view of the name.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

#[cfg(test)]
impl From<&'static str> for StudentName {
    /// Creates a new name from a hardcoded string, which must be valid.
    fn from(name: &'static str) -> Self {
        StudentName::new(name).expect("Hardcoded names must be valid")
    }
}

/// A deserialization visitor for a `StudentName`.
struct StudentNameVisitor;

impl Visitor<'_> for StudentNameVisitor {
    type Value = StudentName;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a string")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        StudentName::new(v).map_err(|e| E::custom(format!("{}", e)))
    }

    fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        StudentName::new(v).map_err(|e| E::custom(format!("{}", e)))
    }
}

impl<'de> Deserialize<'de> for StudentName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_string(StudentNameVisitor)
    }
}

/// Represents a correctly-formatted email address.
///
/// According to the standard, the local part of an email address may be case
/// sensitive but the domain part is case insensitive.  Given that we only
/// persist email addresses for contact purposes, this treats them as case
/// sensitive overall.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a new email address from an untrusted string `s`, making sure it is valid.
    pub fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        let s = s.into();

        if s.trim().is_empty() {
            return Err(ModelError("Email address cannot be empty".to_owned()));
        }
        if s.chars().count() > MAX_EMAIL_LENGTH {
            return Err(ModelError("Email address is too long".to_owned()));
        }

        // Email addresses can have many formats, and attempting to validate them in full is
        // futile.  We do some tiny validation anyway to make sure we at least pass data around
        // correctly.
        if !s.contains('@') || s.contains(' ') {
            return Err(ModelError(format!("Email does not look like a valid address '{}'", s)));
        }

        Ok(Self(s))
    }

    /// Creates a new email address from an untrusted string `s`, without validation.  Useful for
    /// testing purposes only.
    #[cfg(test)]
    pub(crate) fn new_invalid<S: Into<String>>(s: S) -> Self {
        Self(s.into())
    }

    /// Returns a string view of the email address.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

#[cfg(test)]
impl From<&'static str> for EmailAddress {
    /// Creates a new email address from a hardcoded string, which must be valid.
    fn from(raw_email: &'static str) -> Self {
        EmailAddress::new(raw_email).expect("Hardcoded email addresses must be valid")
    }
}

/// A deserialization visitor for an `EmailAddress`.
struct EmailAddressVisitor;

impl Visitor<'_> for EmailAddressVisitor {
    type Value = EmailAddress;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a string")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        EmailAddress::new(v).map_err(|e| E::custom(format!("{}", e)))
    }

    fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        EmailAddress::new(v).map_err(|e| E::custom(format!("{}", e)))
    }
}

impl<'de> Deserialize<'de> for EmailAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_string(EmailAddressVisitor)
    }
}

/// Represents a valid postal address.
///
/// Addresses are free-form text and the only constraint is a minimum length,
/// which weeds out obviously bogus values.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Creates a new address from an untrusted string `s`, making sure it is valid.
    pub fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        let s = s.into();

        if s.chars().count() < MIN_DIRECCION_LENGTH {
            return Err(ModelError("Address is too short".to_owned()));
        }

        Ok(Self(s))
    }

    /// Returns a string view of the address.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

#[cfg(test)]
impl From<&'static str> for Address {
    /// Creates a new address from a hardcoded string, which must be valid.
    fn from(raw_address: &'static str) -> Self {
        Address::new(raw_address).expect("Hardcoded addresses must be valid")
    }
}

/// A deserialization visitor for an `Address`.
struct AddressVisitor;

impl Visitor<'_> for AddressVisitor {
    type Value = Address;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a string")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Address::new(v).map_err(|e| E::custom(format!("{}", e)))
    }

    fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Address::new(v).map_err(|e| E::custom(format!("{}", e)))
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_string(AddressVisitor)
    }
}

/// The writable attributes of a student, as they travel in the resource envelopes.
#[derive(Clone, Constructor, Getters, Serialize)]
#[cfg_attr(test, derive(Debug, Deserialize, PartialEq))]
pub struct AlumnoAttributes {
    /// The student's display name.
    nombre: StudentName,

    /// Contact email address for the student.
    email: EmailAddress,

    /// Postal address of the student.
    direccion: Address,
}

/// A student record as persisted in the database.
#[derive(Constructor, Getters)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub struct Alumno {
    /// Identifier assigned to the record at insertion time.
    id: AlumnoId,

    /// The student's display name, unique across the roster.
    nombre: StudentName,

    /// Contact email address for the student.
    email: EmailAddress,

    /// Postal address of the student.
    direccion: Address,
}

impl Alumno {
    /// Returns a copy of the record's attributes as an envelope payload.
    pub(crate) fn attributes(&self) -> AlumnoAttributes {
        AlumnoAttributes::new(self.nombre.clone(), self.email.clone(), self.direccion.clone())
    }
}
