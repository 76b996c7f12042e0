// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::{EntityMetadata, RelationKind, database_error::DatabaseError};

use super::{BuildContext, ExpressionBuilder, SQLBuilder};

/// A reference to an aliased entity or one of its properties
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityExpr {
    /// The entity itself, compared through its identifier columns
    Identity { alias: String, entity: String },
    /// A scalar field, or the foreign key of an owning to-one relation
    Property {
        alias: String,
        entity: String,
        property: String,
    },
}

impl EntityExpr {
    pub fn identity(alias: impl Into<String>, entity: impl Into<String>) -> Self {
        EntityExpr::Identity {
            alias: alias.into(),
            entity: entity.into(),
        }
    }

    pub fn property(
        alias: impl Into<String>,
        entity: impl Into<String>,
        property: impl Into<String>,
    ) -> Self {
        EntityExpr::Property {
            alias: alias.into(),
            entity: entity.into(),
            property: property.into(),
        }
    }

    pub fn alias(&self) -> &str {
        match self {
            EntityExpr::Identity { alias, .. } | EntityExpr::Property { alias, .. } => alias,
        }
    }

    pub fn entity(&self) -> &str {
        match self {
            EntityExpr::Identity { entity, .. } | EntityExpr::Property { entity, .. } => entity,
        }
    }

    /// Columns this expression stands for, in identifier order
    pub(crate) fn columns<'a>(
        &self,
        context: &BuildContext<'a>,
    ) -> Result<Vec<&'a str>, DatabaseError> {
        let entity = entity_metadata(context, self.entity())?;

        let columns = match self {
            EntityExpr::Identity { .. } => entity
                .identifier_fields()
                .map(|(_, field)| field.column.as_str())
                .collect::<Vec<_>>(),
            EntityExpr::Property { property, .. } => property_columns(entity, property)?,
        };

        if columns.is_empty() {
            return Err(DatabaseError::InvalidMetadata(format!(
                "'{}' declares no identifiers",
                entity.name
            )));
        }

        Ok(columns)
    }
}

fn property_columns<'a>(
    entity: &'a EntityMetadata,
    property: &str,
) -> Result<Vec<&'a str>, DatabaseError> {
    if let Some(field) = entity.field(property) {
        return Ok(vec![field.column.as_str()]);
    }

    match entity.relation(property) {
        Some(relation)
            if relation.is_owning_side()
                && matches!(relation.kind, RelationKind::ManyToOne | RelationKind::OneToOne) =>
        {
            Ok(relation.join_columns.iter().map(String::as_str).collect())
        }
        Some(_) => Err(DatabaseError::InvalidMetadata(format!(
            "Relation '{}.{property}' does not own a foreign key",
            entity.name
        ))),
        None => Err(DatabaseError::InvalidMetadata(format!(
            "'{}' has no property '{property}'",
            entity.name
        ))),
    }
}

pub(crate) fn entity_metadata<'a>(
    context: &BuildContext<'a>,
    name: &str,
) -> Result<&'a EntityMetadata, DatabaseError> {
    context
        .schema
        .entity(name)
        .ok_or_else(|| DatabaseError::InvalidMetadata(format!("Unknown entity '{name}'")))
}

/// A named placeholder whose value is bound on the root query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamRef(pub String);

impl ParamRef {
    pub fn new(name: impl Into<String>) -> Self {
        ParamRef(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl ExpressionBuilder for ParamRef {
    fn build(
        &self,
        context: &BuildContext<'_>,
        builder: &mut SQLBuilder,
    ) -> Result<(), DatabaseError> {
        let value = context
            .params
            .get(&self.0)
            .ok_or_else(|| DatabaseError::MissingParameter(self.0.clone()))?;
        builder.push_param(value.clone());
        Ok(())
    }
}
