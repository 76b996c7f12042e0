// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use indexmap::IndexMap;
use subpath_sql::Schema;

use crate::{
    context::{PathSegment, RawIdentifiers, SubresourceContext},
    error::SubresourceError,
    identifier::IdentifierValue,
};

/// A subresource URL resolved against a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubresourceRoute {
    pub resource_type: String,
    pub context: SubresourceContext,
    pub identifiers: RawIdentifiers,
}

impl SubresourceRoute {
    /// Parse `/<collection>/<id>/<relation>[/<id>/<relation>...][?filters]`.
    ///
    /// The first identifier is keyed by the entity's identifier name (`id` for composite
    /// identifiers), the following ones by the relation leading to them. Filters are taken
    /// verbatim; no percent-decoding is done.
    pub fn parse(schema: &Schema, route: &str) -> Result<Self, SubresourceError> {
        let invalid = |reason: String| SubresourceError::InvalidRoute(route.to_string(), reason);

        let (path, query) = route.split_once('?').unwrap_or((route, ""));
        let parts = path
            .split('/')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>();

        let (first, rest) = parts
            .split_first()
            .ok_or_else(|| invalid("empty path".into()))?;

        let mut entity = schema
            .entity_by_route(first)
            .ok_or_else(|| invalid(format!("no resource is exposed as '{first}'")))?;
        let mut key = match entity.identifiers.as_slice() {
            [single] => single.clone(),
            _ => "id".to_string(),
        };

        let mut segments = vec![];
        let mut identifiers = RawIdentifiers::new();
        let mut rest = rest.iter();

        loop {
            let value = rest
                .next()
                .ok_or_else(|| invalid(format!("missing identifier for '{}'", entity.name)))?;
            let property = rest
                .next()
                .ok_or_else(|| invalid("addresses an item, not a subresource".into()))?;

            if identifiers.contains_key(&key) {
                return Err(invalid(format!("identifier key '{key}' appears twice")));
            }
            identifiers.insert(key.clone(), IdentifierValue::from(*value));
            segments.push(PathSegment::new(key, &entity.name));

            let relation = entity
                .relation(property)
                .ok_or_else(|| invalid(format!("'{}' has no relation '{property}'", entity.name)))?;
            let target = schema.entity(&relation.target).ok_or_else(|| {
                SubresourceError::InvalidMetadata(format!(
                    "Unknown entity '{}'",
                    relation.target
                ))
            })?;

            if rest.len() == 0 {
                let context = SubresourceContext {
                    filters: parse_filters(query),
                    ..SubresourceContext::new(segments, *property, relation.kind.is_to_many())
                };

                return Ok(Self {
                    resource_type: target.name.clone(),
                    context,
                    identifiers,
                });
            }

            key = property.to_string();
            entity = target;
        }
    }
}

fn parse_filters(query: &str) -> IndexMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            (name.to_string(), value.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::library_schema;

    #[test]
    fn parses_nested_collection() {
        let route = SubresourceRoute::parse(&library_schema(), "/authors/1/books/2/chapters").unwrap();

        assert_eq!(route.resource_type, "Chapter");
        assert_eq!(
            route.context,
            SubresourceContext::new(
                vec![PathSegment::new("id", "Author"), PathSegment::new("books", "Book")],
                "chapters",
                true,
            )
        );
        assert_eq!(
            route.identifiers,
            IndexMap::from([
                ("id".to_string(), IdentifierValue::from("1")),
                ("books".to_string(), IdentifierValue::from("2")),
            ])
        );
    }

    #[test]
    fn to_one_relation_addresses_an_item() {
        let route = SubresourceRoute::parse(&library_schema(), "/books/2/author").unwrap();

        assert_eq!(route.resource_type, "Author");
        assert!(!route.context.collection);

        let route = SubresourceRoute::parse(&library_schema(), "/books/2/cover").unwrap();
        assert_eq!(route.resource_type, "Cover");
        assert!(!route.context.collection);
    }

    #[test]
    fn keeps_filters_and_composite_identifiers() {
        let route = SubresourceRoute::parse(
            &library_schema(),
            "/shelves/library_code=A;number=3/books?page=2&itemsPerPage=5&flag",
        )
        .unwrap();

        assert_eq!(route.resource_type, "Book");
        assert_eq!(
            route.identifiers["id"],
            IdentifierValue::from("library_code=A;number=3")
        );
        assert_eq!(
            route.context.filters,
            IndexMap::from([
                ("page".to_string(), "2".to_string()),
                ("itemsPerPage".to_string(), "5".to_string()),
                ("flag".to_string(), String::new()),
            ])
        );
    }

    #[test]
    fn rejects_malformed_routes() {
        let schema = library_schema();

        for route in [
            "/",
            "/magazines/1/issues",
            "/books",
            "/books/2",
            "/books/2/pages",
            "/people/1/reports/2/reports/3/reports",
        ] {
            assert!(
                matches!(
                    SubresourceRoute::parse(&schema, route),
                    Err(SubresourceError::InvalidRoute(r, _)) if r == route
                ),
                "{route}"
            );
        }
    }
}
