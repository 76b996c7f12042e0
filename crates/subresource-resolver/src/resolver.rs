// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use subpath_sql::{AliasGenerator, ManagerKind, QueryExecutor, RootQuery, Schema};
use tracing::{debug, instrument};

use crate::{
    chain_builder::ChainQueryBuilder,
    context::{RawIdentifiers, SubresourceContext, SubresourcePath},
    error::SubresourceError,
    execution::{ResolvedResult, execute_collection, execute_item},
    extension::{CollectionExtension, ExtensionContext, ExtensionPipeline, ItemExtension},
    manager::{ManagerRegistry, StorageManager},
};

/// Resolves subresource requests served by relational storage managers
pub struct SubresourceResolver {
    registry: Arc<dyn ManagerRegistry>,
    extensions: ExtensionPipeline,
}

/// A root query with extensions applied, and the extension (if any) that will produce its result
struct PreparedQuery<'r> {
    query: RootQuery,
    schema: &'r Schema,
    collection: bool,
    claimer: Claimer<'r>,
}

enum Claimer<'r> {
    Executor,
    Collection(&'r dyn CollectionExtension),
    Item(&'r dyn ItemExtension),
}

impl SubresourceResolver {
    pub fn new(registry: Arc<dyn ManagerRegistry>, extensions: ExtensionPipeline) -> Self {
        Self {
            registry,
            extensions,
        }
    }

    /// Whether a request for `resource_type` in `context` can be resolved here
    pub fn supports(&self, resource_type: &str, context: &SubresourceContext) -> bool {
        SubresourcePath::from_context(context).is_ok() && self.target_manager(resource_type).is_ok()
    }

    /// The query `resolve` would run, with extensions applied
    #[instrument(name = "SubresourceResolver::build_query", skip_all, fields(resource_type = %resource_type))]
    pub fn build_query(
        &self,
        resource_type: &str,
        context: &SubresourceContext,
        identifiers: &RawIdentifiers,
    ) -> Result<RootQuery, SubresourceError> {
        self.prepare(resource_type, context, identifiers)
            .map(|prepared| prepared.query)
    }

    #[instrument(name = "SubresourceResolver::resolve", skip_all, fields(resource_type = %resource_type))]
    pub async fn resolve(
        &self,
        executor: &dyn QueryExecutor,
        resource_type: &str,
        context: &SubresourceContext,
        identifiers: &RawIdentifiers,
    ) -> Result<ResolvedResult, SubresourceError> {
        let prepared = self.prepare(resource_type, context, identifiers)?;
        let extension_context = ExtensionContext {
            schema: prepared.schema,
            resource_type,
            operation_name: context.operation_name.as_deref(),
            filters: &context.filters,
            identifiers,
        };

        match prepared.claimer {
            Claimer::Collection(extension) => {
                extension
                    .get_result(&prepared.query, &extension_context, executor)
                    .await
            }
            Claimer::Item(extension) => {
                extension
                    .get_result(&prepared.query, &extension_context, executor)
                    .await
            }
            Claimer::Executor if prepared.collection => {
                execute_collection(&prepared.query, prepared.schema, executor).await
            }
            Claimer::Executor => execute_item(&prepared.query, prepared.schema, executor).await,
        }
    }

    fn prepare<'r>(
        &'r self,
        resource_type: &str,
        context: &SubresourceContext,
        identifiers: &RawIdentifiers,
    ) -> Result<PreparedQuery<'r>, SubresourceError> {
        let path = SubresourcePath::from_context(context)?;
        let schema = self.target_manager(resource_type)?.schema();

        let mut aliases = AliasGenerator::new();
        let mut query = ChainQueryBuilder::new(self.registry.as_ref()).build(
            &path,
            identifiers,
            resource_type,
            &mut aliases,
        )?;

        let extension_context = ExtensionContext {
            schema,
            resource_type,
            operation_name: context.operation_name.as_deref(),
            filters: &context.filters,
            identifiers,
        };

        let claimer = if path.is_collection() {
            self.extensions
                .apply_to_collection(&mut query, &mut aliases, &extension_context)?
                .map_or(Claimer::Executor, Claimer::Collection)
        } else {
            self.extensions
                .apply_to_item(&mut query, &mut aliases, &extension_context)?
                .map_or(Claimer::Executor, Claimer::Item)
        };

        if !matches!(claimer, Claimer::Executor) {
            debug!("Result production claimed by an extension");
        }

        Ok(PreparedQuery {
            query,
            schema,
            collection: path.is_collection(),
            claimer,
        })
    }

    fn target_manager(&self, resource_type: &str) -> Result<&dyn StorageManager, SubresourceError> {
        self.registry
            .manager_for(resource_type)
            .filter(|manager| {
                manager.kind() == ManagerKind::Relational
                    && manager.class_metadata(resource_type).is_some()
            })
            .ok_or_else(|| SubresourceError::UnsupportedResource(resource_type.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use subpath_sql::testing::RecordingExecutor;

    use super::*;
    use crate::{
        config::ResolverConfig,
        context::PathSegment,
        route::SubresourceRoute,
        test_utils::{library_registry, library_schema},
    };

    fn resolver() -> SubresourceResolver {
        SubresourceResolver::new(
            Arc::new(library_registry()),
            ExtensionPipeline::with_defaults(&ResolverConfig::default()),
        )
    }

    #[test]
    fn build_query_applies_default_extensions() {
        let resolver = resolver();
        let route =
            SubresourceRoute::parse(&library_schema(), "/books/2/chapters")
                .unwrap();

        let query = resolver
            .build_query(&route.resource_type, &route.context, &route.identifiers)
            .unwrap();

        insta::assert_snapshot!(
            query.to_sql(&library_schema()).unwrap().sql,
            @r#"SELECT row_to_json("o")::text FROM "chapters" AS "o" WHERE "o"."book_id" IN (SELECT "book_a1"."id" FROM "books" AS "book_a1" WHERE "book_a1"."id" = $1) ORDER BY "o"."position" ASC LIMIT $2 OFFSET $3"#
        );
    }

    #[tokio::test]
    async fn item_goes_through_the_executor() {
        let executor = RecordingExecutor::new().with_rows(vec![json!({"id": 1})]);
        let resolver = resolver();
        let route =
            SubresourceRoute::parse(&library_schema(), "/books/2/author")
                .unwrap();

        let result = resolver
            .resolve(&executor, &route.resource_type, &route.context, &route.identifiers)
            .await
            .unwrap();

        assert_eq!(result, ResolvedResult::Item(Some(json!({"id": 1}))));
        assert_eq!(executor.queries().len(), 1);
    }

    #[test]
    fn supports_only_relational_subresources() {
        let resolver = resolver();
        let context = SubresourceContext::new(
            vec![PathSegment::new("id", "Book")],
            "reviews",
            true,
        );

        assert!(resolver.supports("Chapter", &context));
        assert!(!resolver.supports("Review", &context));
        assert!(!resolver.supports("Chapter", &SubresourceContext::default()));
    }
}
