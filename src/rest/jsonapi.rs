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

//! Envelope types mandated by the JSON:API convention.
//!
//! The shapes in this file are part of the service's external contract and tests assert their
//! exact serialized form.

use crate::model::{Alumno, AlumnoAttributes};
use crate::validation::RawAttributes;
use http::StatusCode;
use serde::{Deserialize, Serialize};

/// Resource type tag carried by every student resource object.
const RESOURCE_TYPE: &str = "alumnos";

/// A single student resource, as it appears under the `data` member of an envelope.
#[derive(Serialize)]
#[cfg_attr(test, derive(Debug, Deserialize, PartialEq))]
pub(crate) struct ResourceObject {
    /// Fixed resource type tag.
    #[serde(rename = "type")]
    kind: String,

    /// Resource identifier, rendered as a string as the convention mandates.
    id: String,

    /// The student's attributes.
    attributes: AlumnoAttributes,
}

impl From<&Alumno> for ResourceObject {
    fn from(alumno: &Alumno) -> Self {
        Self {
            kind: RESOURCE_TYPE.to_owned(),
            id: alumno.id().to_string(),
            attributes: alumno.attributes(),
        }
    }
}

#[cfg(test)]
impl ResourceObject {
    /// Returns the resource type tag.
    pub(crate) fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the resource identifier as it came on the wire.
    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    /// Returns the resource attributes.
    pub(crate) fn attributes(&self) -> &AlumnoAttributes {
        &self.attributes
    }
}

/// Envelope for responses: a single resource object or a collection under `data`.
#[derive(Serialize)]
#[cfg_attr(test, derive(Debug, Deserialize, PartialEq))]
pub(crate) struct Document<D> {
    /// The enveloped resource or resources.
    pub(crate) data: D,
}

/// Incoming envelope for create and update operations.
///
/// Only the `attributes` member of `data` is honored: resource-level `type` and `id` members are
/// ignored, as are unknown attributes.  Missing members deserialize to an empty payload so that
/// the validation policy, not the deserializer, reports the missing fields.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RequestDocument {
    /// The resource payload of the request.
    #[serde(default)]
    pub(crate) data: RequestResource,
}

/// The resource payload of an incoming envelope.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RequestResource {
    /// The attributes supplied by the client.
    #[serde(default)]
    pub(crate) attributes: RawAttributes,
}

/// Details of an error response; this exact shape is part of the service's contract.
#[derive(Serialize)]
#[cfg_attr(test, derive(Debug, Deserialize, PartialEq))]
pub(crate) struct ErrorObject {
    /// HTTP status code of the error, as a string.
    pub(crate) status: String,

    /// Short human-readable summary of the error class.
    pub(crate) title: String,

    /// Human-readable description of this particular occurrence of the error.
    pub(crate) detail: String,
}

/// Top-level error envelope, wrapping a single error object under `errors`.
#[derive(Serialize)]
#[cfg_attr(test, derive(Debug, Deserialize, PartialEq))]
pub(crate) struct ErrorBody {
    /// The error being reported.
    pub(crate) errors: ErrorObject,
}

impl ErrorBody {
    /// Creates the error envelope for `status` with the given `title` and `detail` texts.
    pub(crate) fn new(status: StatusCode, title: &str, detail: String) -> Self {
        Self {
            errors: ErrorObject {
                status: status.as_str().to_owned(),
                title: title.to_owned(),
                detail,
            },
        }
    }
}
