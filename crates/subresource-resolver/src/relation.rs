// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use subpath_sql::{EntityMetadata, RelationKind};

use crate::error::SubresourceError;

/// How a relation shapes the hop that crosses it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationCardinality {
    /// Association columns live in a join table
    ManyToMany,
    /// The foreign key lives on the target, in the `inverse` property
    OneToMany { inverse: String },
    /// The foreign key lives on this entity
    ToOne,
}

pub fn classify_relation(
    entity: &EntityMetadata,
    property: &str,
) -> Result<RelationCardinality, SubresourceError> {
    let unresolvable = || SubresourceError::UnresolvableRelation {
        entity: entity.name.clone(),
        property: property.to_string(),
    };

    let relation = entity.relation(property).ok_or_else(unresolvable)?;

    match (relation.kind, &relation.mapped_by) {
        (RelationKind::ManyToMany, _) => Ok(RelationCardinality::ManyToMany),
        // An inverse one-to-one is shaped like a one-to-many: the target holds the key
        (RelationKind::OneToMany | RelationKind::OneToOne, Some(inverse)) => {
            Ok(RelationCardinality::OneToMany {
                inverse: inverse.clone(),
            })
        }
        (RelationKind::OneToMany, None) => Err(unresolvable()),
        (RelationKind::ManyToOne | RelationKind::OneToOne, _) if relation.join_columns.is_empty() => {
            Err(unresolvable())
        }
        (RelationKind::ManyToOne | RelationKind::OneToOne, _) => Ok(RelationCardinality::ToOne),
    }
}
