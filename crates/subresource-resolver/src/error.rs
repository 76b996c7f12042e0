// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use subpath_sql::database_error::DatabaseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubresourceError {
    /// The calling context carries no subresource path. Callers should try another resolution
    /// strategy.
    #[error("Not a subresource request")]
    NotASubresource,

    /// No storage manager serves the requested resource type
    #[error("Resource '{0}' is not supported")]
    UnsupportedResource(String),

    /// An ancestor in the path is served by a manager that cannot take part in a nested query
    #[error("Resource '{0}' is not managed by a relational storage manager")]
    UnsupportedManager(String),

    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("Cannot resolve relation '{entity}.{property}'")]
    UnresolvableRelation { entity: String, property: String },

    #[error("Identifiers of '{0}' cannot be determined")]
    UnsupportedIdentifier(String),

    #[error("Invalid identifier for '{entity}': {message}")]
    InvalidIdentifier { entity: String, message: String },

    #[error("No identifier value supplied for '{key}' ({entity})")]
    MissingIdentifierValue { key: String, entity: String },

    #[error("Invalid value for filter '{0}': {1}")]
    InvalidFilter(String, String),

    #[error("Invalid subresource route '{0}': {1}")]
    InvalidRoute(String, String),

    #[error("Expected at most one result, got {0}")]
    NonUniqueResult(usize),

    #[error("{0}")]
    Database(#[source] DatabaseError),
}

impl From<DatabaseError> for SubresourceError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::InvalidMetadata(message) => SubresourceError::InvalidMetadata(message),
            error => SubresourceError::Database(error),
        }
    }
}
