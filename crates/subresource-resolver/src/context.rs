// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use indexmap::IndexMap;

use crate::{error::SubresourceError, identifier::IdentifierValue};

/// Raw identifier values, keyed by [`PathSegment::key`]
pub type RawIdentifiers = IndexMap<String, IdentifierValue>;

/// One ancestor in a subresource path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    /// Key of the raw identifier value for this ancestor. Except for the first segment, this is
    /// also the relation on the previous segment's type that leads to this one.
    pub key: String,
    pub resource_type: String,
}

impl PathSegment {
    pub fn new(key: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            resource_type: resource_type.into(),
        }
    }
}

/// What the caller knows about the request being resolved
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubresourceContext {
    /// Ancestors, root first (`/authors/1/books/2/chapters` -> `[("id", Author), ("books", Book)]`)
    pub identifiers: Option<Vec<PathSegment>>,
    /// Relation on the last ancestor leading to the requested resource
    pub property: Option<String>,
    pub collection: bool,
    pub operation_name: Option<String>,
    /// Query filters (`page`, `itemsPerPage`, ...)
    pub filters: IndexMap<String, String>,
}

impl SubresourceContext {
    pub fn new(identifiers: Vec<PathSegment>, property: impl Into<String>, collection: bool) -> Self {
        Self {
            identifiers: Some(identifiers),
            property: Some(property.into()),
            collection,
            ..Default::default()
        }
    }

    pub fn with_operation_name(self, operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: Some(operation_name.into()),
            ..self
        }
    }

    pub fn with_filter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(name.into(), value.into());
        self
    }
}

/// A validated subresource path: a non-empty ancestor chain plus the terminal relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubresourcePath {
    segments: Vec<PathSegment>,
    property: String,
    collection: bool,
}

impl SubresourcePath {
    pub fn from_context(context: &SubresourceContext) -> Result<Self, SubresourceError> {
        match (&context.identifiers, &context.property) {
            (Some(segments), Some(property)) if !segments.is_empty() => Ok(Self {
                segments: segments.clone(),
                property: property.clone(),
                collection: context.collection,
            }),
            _ => Err(SubresourceError::NotASubresource),
        }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn is_collection(&self) -> bool {
        self.collection
    }

    /// The relation crossed when going from `segments[index]` one step toward the target
    pub fn previous_association_property(&self, index: usize) -> &str {
        self.segments
            .get(index + 1)
            .map(|segment| segment.key.as_str())
            .unwrap_or(&self.property)
    }
}
