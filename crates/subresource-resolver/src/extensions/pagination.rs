// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use async_trait::async_trait;
use subpath_sql::{AliasGenerator, Limit, Offset, QueryExecutor, RootQuery};
use tracing::{debug, instrument};

use crate::{
    config::PaginationConfig,
    error::SubresourceError,
    execution::{Page, ResolvedResult},
    extension::{CollectionExtension, ExtensionContext},
};

pub const PAGE_FILTER: &str = "page";
pub const ITEMS_PER_PAGE_FILTER: &str = "itemsPerPage";

/// Limits collections to one page and, when enabled, produces a [`Page`] with the total count
pub struct PaginationExtension {
    config: PaginationConfig,
}

impl PaginationExtension {
    pub fn new(config: PaginationConfig) -> Self {
        Self { config }
    }

    /// The requested page (1-based) and its size
    fn requested_page(&self, context: &ExtensionContext<'_>) -> Result<(i64, i64), SubresourceError> {
        let page = match context.filters.get(PAGE_FILTER) {
            Some(value) => parse_positive(PAGE_FILTER, value)?,
            None => 1,
        };

        let items_per_page = match context.filters.get(ITEMS_PER_PAGE_FILTER) {
            Some(value) if self.config.client_items_per_page => {
                parse_positive(ITEMS_PER_PAGE_FILTER, value)?
            }
            _ => self.config.items_per_page,
        }
        .min(self.config.maximum_items_per_page);

        Ok((page, items_per_page))
    }
}

fn parse_positive(filter: &str, value: &str) -> Result<i64, SubresourceError> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|value| *value >= 1)
        .ok_or_else(|| {
            SubresourceError::InvalidFilter(
                filter.to_string(),
                format!("'{value}' is not a positive integer"),
            )
        })
}

#[async_trait]
impl CollectionExtension for PaginationExtension {
    fn apply_to_collection(
        &self,
        query: &mut RootQuery,
        _aliases: &mut AliasGenerator,
        context: &ExtensionContext<'_>,
    ) -> Result<(), SubresourceError> {
        if !self.config.enabled {
            return Ok(());
        }

        let (page, items_per_page) = self.requested_page(context)?;
        let offset = (page - 1).checked_mul(items_per_page).ok_or_else(|| {
            SubresourceError::InvalidFilter(PAGE_FILTER.to_string(), format!("page {page} is out of range"))
        })?;

        debug!(page, items_per_page, "Applied pagination");

        query.set_limit(Limit(items_per_page));
        query.set_offset(Offset(offset));

        Ok(())
    }

    fn supports_result(&self, _context: &ExtensionContext<'_>) -> bool {
        self.config.enabled
    }

    #[instrument(name = "PaginationExtension::get_result", skip_all, fields(entity = %query.entity))]
    async fn get_result(
        &self,
        query: &RootQuery,
        context: &ExtensionContext<'_>,
        executor: &dyn QueryExecutor,
    ) -> Result<ResolvedResult, SubresourceError> {
        let items = executor.fetch_all(&query.to_sql(context.schema)?).await?;
        let total_items = executor
            .fetch_count(&query.to_count_sql(context.schema)?)
            .await?;

        let items_per_page = query
            .limit
            .map(|Limit(limit)| limit)
            .unwrap_or(self.config.items_per_page);
        let current_page = match query.offset {
            Some(Offset(offset)) if items_per_page > 0 => offset / items_per_page + 1,
            _ => 1,
        };

        Ok(ResolvedResult::Page(Page {
            items,
            total_items,
            current_page,
            items_per_page,
        }))
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use serde_json::json;
    use subpath_sql::{SQLParam, testing::RecordingExecutor};

    use super::*;
    use crate::{context::RawIdentifiers, test_utils::library_schema};

    fn paginate(
        config: PaginationConfig,
        filters: &[(&str, &str)],
    ) -> Result<RootQuery, SubresourceError> {
        let schema = library_schema();
        let filters = filters
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect::<IndexMap<_, _>>();
        let identifiers = RawIdentifiers::new();
        let context = ExtensionContext {
            schema: &schema,
            resource_type: "Book",
            operation_name: None,
            filters: &filters,
            identifiers: &identifiers,
        };

        let mut query = RootQuery::new("Book");
        PaginationExtension::new(config).apply_to_collection(
            &mut query,
            &mut AliasGenerator::new(),
            &context,
        )?;
        Ok(query)
    }

    #[test]
    fn first_page_by_default() {
        let query = paginate(PaginationConfig::default(), &[]).unwrap();

        assert_eq!(query.limit, Some(Limit(30)));
        assert_eq!(query.offset, Some(Offset(0)));
    }

    #[test]
    fn client_page_size_is_opt_in_and_clamped() {
        let filters = [(PAGE_FILTER, "3"), (ITEMS_PER_PAGE_FILTER, "500")];

        let query = paginate(PaginationConfig::default(), &filters).unwrap();
        assert_eq!(query.limit, Some(Limit(30)));
        assert_eq!(query.offset, Some(Offset(60)));

        let config = PaginationConfig {
            client_items_per_page: true,
            ..Default::default()
        };
        let query = paginate(config, &filters).unwrap();
        assert_eq!(query.limit, Some(Limit(100)));
        assert_eq!(query.offset, Some(Offset(200)));
    }

    #[test]
    fn rejects_invalid_pages() {
        for page in ["0", "-1", "two"] {
            assert!(matches!(
                paginate(PaginationConfig::default(), &[(PAGE_FILTER, page)]),
                Err(SubresourceError::InvalidFilter(filter, _)) if filter == PAGE_FILTER
            ));
        }

        let huge = i64::MAX.to_string();
        assert!(matches!(
            paginate(PaginationConfig::default(), &[(PAGE_FILTER, huge.as_str())]),
            Err(SubresourceError::InvalidFilter(..))
        ));
    }

    #[test]
    fn disabled_pagination_leaves_the_query_alone() {
        let config = PaginationConfig {
            enabled: false,
            ..Default::default()
        };

        assert_eq!(
            paginate(config, &[(PAGE_FILTER, "0")]).unwrap(),
            RootQuery::new("Book")
        );
    }

    #[tokio::test]
    async fn page_result_carries_the_total() {
        let schema = library_schema();
        let filters = IndexMap::from([(PAGE_FILTER.to_string(), "2".to_string())]);
        let identifiers = RawIdentifiers::new();
        let context = ExtensionContext {
            schema: &schema,
            resource_type: "Book",
            operation_name: None,
            filters: &filters,
            identifiers: &identifiers,
        };

        let extension = PaginationExtension::new(PaginationConfig::default());
        let mut query = RootQuery::new("Book");
        extension
            .apply_to_collection(&mut query, &mut AliasGenerator::new(), &context)
            .unwrap();

        let executor = RecordingExecutor::new()
            .with_rows(vec![json!({"id": 31})])
            .with_count(31);
        let result = extension
            .get_result(&query, &context, &executor)
            .await
            .unwrap();

        assert_eq!(
            result,
            ResolvedResult::Page(Page {
                items: vec![json!({"id": 31})],
                total_items: 31,
                current_page: 2,
                items_per_page: 30,
            })
        );

        let queries = executor.queries();
        assert_eq!(
            queries[0].sql,
            r#"SELECT row_to_json("o")::text FROM "books" AS "o" LIMIT $1 OFFSET $2"#
        );
        assert_eq!(queries[0].params, vec![SQLParam::Int(30), SQLParam::Int(30)]);
        assert_eq!(queries[1].sql, r#"SELECT COUNT(*) FROM "books" AS "o""#);
    }
}
