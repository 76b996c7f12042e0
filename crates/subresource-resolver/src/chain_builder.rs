// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Turns a subresource path into a root query constrained by a chain of nested fragments.
//!
//! For `/authors/1/books/2/chapters` the result is, schematically:
//!
//! ```text
//! SELECT o FROM Chapter o
//! WHERE o.book IN (
//!     SELECT book_a1 FROM Book book_a1
//!     WHERE book_a1.id = :id_p1 AND book_a1.author IN (
//!         SELECT author_a2 FROM Author author_a2 WHERE author_a2.id = :id_p2))
//! ```
//!
//! Hops are built from the ancestor closest to the target outward, so the fragment of the last
//! path segment correlates with the root alias and the one of the first segment is innermost.

use subpath_sql::{
    AliasGenerator, EntityExpr, EntityMetadata, Fragment, Join, ManagerKind, ParamRef, Predicate,
    ROOT_ALIAS, RootQuery,
};
use tracing::debug;

use crate::{
    context::{RawIdentifiers, SubresourcePath},
    error::SubresourceError,
    identifier::normalize_identifiers,
    manager::ManagerRegistry,
    relation::{RelationCardinality, classify_relation},
};

pub struct ChainQueryBuilder<'a> {
    registry: &'a dyn ManagerRegistry,
}

/// The entity one step closer to the target than the hop being built
struct Closer<'s> {
    alias: &'s str,
    entity: &'s str,
}

impl<'a> ChainQueryBuilder<'a> {
    pub fn new(registry: &'a dyn ManagerRegistry) -> Self {
        Self { registry }
    }

    /// Build the root query for `resource_type`, binding every identifier of the path
    pub fn build(
        &self,
        path: &SubresourcePath,
        identifiers: &RawIdentifiers,
        resource_type: &str,
        aliases: &mut AliasGenerator,
    ) -> Result<RootQuery, SubresourceError> {
        let mut query = RootQuery::new(resource_type);

        let root = Closer {
            alias: ROOT_ALIAS,
            entity: resource_type,
        };
        let last = path.segments().len() - 1;

        let membership = self.build_hop(path, identifiers, last, root, &mut query, aliases)?;
        query.and_where(membership);

        Ok(query)
    }

    /// Build the fragment for `segments[index]` (with everything further from the target nested
    /// inside it) and return the membership predicate correlating it with `closer`.
    fn build_hop(
        &self,
        path: &SubresourcePath,
        identifiers: &RawIdentifiers,
        index: usize,
        closer: Closer<'_>,
        query: &mut RootQuery,
        aliases: &mut AliasGenerator,
    ) -> Result<Predicate, SubresourceError> {
        let segment = &path.segments()[index];
        let entity = self.relational_metadata(&segment.resource_type)?;
        let property = path.previous_association_property(index);

        let alias = aliases.generate_join_alias(&entity.name);
        let cardinality = classify_relation(entity, property)?;

        debug!(
            hop = index,
            entity = %entity.name,
            %alias,
            property,
            ?cardinality,
            "Building subresource fragment"
        );

        let (mut fragment, subject) = match cardinality {
            RelationCardinality::ManyToMany => {
                let target = relation_target(entity, property, closer.entity)?;
                let join_alias = aliases.generate_join_alias(property);

                (
                    Fragment::new(
                        &entity.name,
                        &alias,
                        EntityExpr::identity(&join_alias, target),
                    )
                    .with_join(Join::new(&alias, &entity.name, property, &join_alias)),
                    EntityExpr::identity(closer.alias, closer.entity),
                )
            }
            RelationCardinality::OneToMany { inverse } => {
                relation_target(entity, property, closer.entity)?;

                (
                    Fragment::new(&entity.name, &alias, EntityExpr::identity(&alias, &entity.name)),
                    EntityExpr::property(closer.alias, closer.entity, inverse),
                )
            }
            RelationCardinality::ToOne => {
                relation_target(entity, property, closer.entity)?;

                (
                    Fragment::new(
                        &entity.name,
                        &alias,
                        EntityExpr::property(&alias, &entity.name, property),
                    ),
                    EntityExpr::identity(closer.alias, closer.entity),
                )
            }
        };

        let raw = identifiers.get(&segment.key).ok_or_else(|| {
            SubresourceError::MissingIdentifierValue {
                key: segment.key.clone(),
                entity: entity.name.clone(),
            }
        })?;

        for (name, value) in normalize_identifiers(raw, entity)? {
            let param = aliases.generate_parameter_name(&name);

            fragment = fragment.and_where(Predicate::eq(
                EntityExpr::property(&alias, &entity.name, &name),
                ParamRef::new(&param),
            ));
            query.set_parameter(param, value);
        }

        if index > 0 {
            let closer = Closer {
                alias: &alias,
                entity: &entity.name,
            };
            let nested = self.build_hop(path, identifiers, index - 1, closer, query, aliases)?;
            fragment = fragment.and_where(nested);
        }

        Ok(Predicate::membership(subject, fragment))
    }

    fn relational_metadata(&self, resource_type: &str) -> Result<&'a EntityMetadata, SubresourceError> {
        let manager = self
            .registry
            .manager_for(resource_type)
            .filter(|manager| manager.kind() == ManagerKind::Relational)
            .ok_or_else(|| SubresourceError::UnsupportedManager(resource_type.to_string()))?;

        manager.class_metadata(resource_type).ok_or_else(|| {
            SubresourceError::InvalidMetadata(format!(
                "No metadata for '{resource_type}' in its storage manager"
            ))
        })
    }
}

/// The target of `entity.property`, which must be the entity one step closer to the target
fn relation_target<'e>(
    entity: &'e EntityMetadata,
    property: &str,
    expected: &str,
) -> Result<&'e str, SubresourceError> {
    let target = entity
        .relation(property)
        .map(|relation| relation.target.as_str())
        .ok_or_else(|| SubresourceError::UnresolvableRelation {
            entity: entity.name.clone(),
            property: property.to_string(),
        })?;

    if target == expected {
        Ok(target)
    } else {
        Err(SubresourceError::InvalidMetadata(format!(
            "'{}.{property}' leads to '{target}', not '{expected}'",
            entity.name
        )))
    }
}
