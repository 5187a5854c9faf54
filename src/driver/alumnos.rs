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

//! Operations on the collection of students.

use crate::driver::{Driver, DriverResult};
use crate::model::Alumno;

impl Driver {
    /// Returns every student currently in the roster.
    pub(crate) async fn list_alumnos(self) -> DriverResult<Vec<Alumno>> {
        let alumnos = self.db.list_alumnos().await?;
        Ok(alumnos)
    }
}
