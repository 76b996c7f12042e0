// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    /// The metadata does not describe the shape a query needs (unknown entity, a property that
    /// doesn't map to a column, mismatched column counts, ...)
    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("No value bound for query parameter '{0}'")]
    MissingParameter(String),

    #[error("Failed to decode result row: {0}")]
    Decode(String),

    #[error("{0}")]
    Delegate(#[from] tokio_postgres::Error),

    #[error("{0}: {1}")]
    WithContext(String, #[source] Box<DatabaseError>),
}

impl DatabaseError {
    pub fn with_context(self, context: String) -> DatabaseError {
        DatabaseError::WithContext(context, Box::new(self))
    }
}
