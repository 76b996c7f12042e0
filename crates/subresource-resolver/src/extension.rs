// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use async_trait::async_trait;
use indexmap::IndexMap;
use subpath_sql::{AliasGenerator, QueryExecutor, RootQuery, Schema};

use crate::{
    config::ResolverConfig,
    context::RawIdentifiers,
    error::SubresourceError,
    execution::{ResolvedResult, execute_collection, execute_item},
    extensions::{OrderExtension, PaginationExtension},
};

/// What an extension may look at while refining a query
#[derive(Debug, Clone, Copy)]
pub struct ExtensionContext<'a> {
    pub schema: &'a Schema,
    pub resource_type: &'a str,
    pub operation_name: Option<&'a str>,
    pub filters: &'a IndexMap<String, String>,
    pub identifiers: &'a RawIdentifiers,
}

/// A stage refining collection queries. An extension that reports `supports_result` takes over
/// producing the result, and no later extension is applied.
#[async_trait]
pub trait CollectionExtension: Send + Sync {
    fn apply_to_collection(
        &self,
        query: &mut RootQuery,
        aliases: &mut AliasGenerator,
        context: &ExtensionContext<'_>,
    ) -> Result<(), SubresourceError>;

    fn supports_result(&self, _context: &ExtensionContext<'_>) -> bool {
        false
    }

    async fn get_result(
        &self,
        query: &RootQuery,
        context: &ExtensionContext<'_>,
        executor: &dyn QueryExecutor,
    ) -> Result<ResolvedResult, SubresourceError> {
        execute_collection(query, context.schema, executor).await
    }
}

/// A stage refining item queries. See [`CollectionExtension`].
#[async_trait]
pub trait ItemExtension: Send + Sync {
    fn apply_to_item(
        &self,
        query: &mut RootQuery,
        aliases: &mut AliasGenerator,
        context: &ExtensionContext<'_>,
    ) -> Result<(), SubresourceError>;

    fn supports_result(&self, _context: &ExtensionContext<'_>) -> bool {
        false
    }

    async fn get_result(
        &self,
        query: &RootQuery,
        context: &ExtensionContext<'_>,
        executor: &dyn QueryExecutor,
    ) -> Result<ResolvedResult, SubresourceError> {
        execute_item(query, context.schema, executor).await
    }
}

#[derive(Default)]
pub struct ExtensionPipeline {
    collection: Vec<Box<dyn CollectionExtension>>,
    item: Vec<Box<dyn ItemExtension>>,
}

impl ExtensionPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ordering followed by pagination for collections, nothing for items
    pub fn with_defaults(config: &ResolverConfig) -> Self {
        Self::new()
            .with_collection_extension(OrderExtension::new(config.order_direction))
            .with_collection_extension(PaginationExtension::new(config.pagination.clone()))
    }

    pub fn with_collection_extension(
        mut self,
        extension: impl CollectionExtension + 'static,
    ) -> Self {
        self.collection.push(Box::new(extension));
        self
    }

    pub fn with_item_extension(mut self, extension: impl ItemExtension + 'static) -> Self {
        self.item.push(Box::new(extension));
        self
    }

    /// Apply collection extensions in order, returning the first one that claims the result
    pub fn apply_to_collection(
        &self,
        query: &mut RootQuery,
        aliases: &mut AliasGenerator,
        context: &ExtensionContext<'_>,
    ) -> Result<Option<&dyn CollectionExtension>, SubresourceError> {
        for extension in &self.collection {
            extension.apply_to_collection(query, aliases, context)?;

            if extension.supports_result(context) {
                return Ok(Some(extension.as_ref()));
            }
        }

        Ok(None)
    }

    /// Apply item extensions in order, returning the first one that claims the result
    pub fn apply_to_item(
        &self,
        query: &mut RootQuery,
        aliases: &mut AliasGenerator,
        context: &ExtensionContext<'_>,
    ) -> Result<Option<&dyn ItemExtension>, SubresourceError> {
        for extension in &self.item {
            extension.apply_to_item(query, aliases, context)?;

            if extension.supports_result(context) {
                return Ok(Some(extension.as_ref()));
            }
        }

        Ok(None)
    }
}
