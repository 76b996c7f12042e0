// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde::Serialize;
use subpath_sql::{QueryExecutor, RootQuery, Schema};
use tracing::instrument;

use crate::error::SubresourceError;

/// The outcome of resolving a subresource
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResolvedResult {
    /// `None` when nothing matched
    Item(Option<serde_json::Value>),
    Collection(Vec<serde_json::Value>),
    Page(Page),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub items: Vec<serde_json::Value>,
    pub total_items: u64,
    pub current_page: i64,
    pub items_per_page: i64,
}

impl Page {
    pub fn last_page(&self) -> i64 {
        if self.items_per_page <= 0 {
            return 1;
        }

        let total = i64::try_from(self.total_items).unwrap_or(i64::MAX);
        ((total + self.items_per_page - 1) / self.items_per_page).max(1)
    }
}

#[instrument(name = "execute_collection", skip_all, fields(entity = %query.entity))]
pub async fn execute_collection(
    query: &RootQuery,
    schema: &Schema,
    executor: &dyn QueryExecutor,
) -> Result<ResolvedResult, SubresourceError> {
    let compiled = query.to_sql(schema)?;
    let rows = executor.fetch_all(&compiled).await?;

    Ok(ResolvedResult::Collection(rows))
}

#[instrument(name = "execute_item", skip_all, fields(entity = %query.entity))]
pub async fn execute_item(
    query: &RootQuery,
    schema: &Schema,
    executor: &dyn QueryExecutor,
) -> Result<ResolvedResult, SubresourceError> {
    let compiled = query.to_sql(schema)?;
    let mut rows = executor.fetch_all(&compiled).await?;

    match rows.len() {
        0 => Ok(ResolvedResult::Item(None)),
        1 => Ok(ResolvedResult::Item(Some(rows.swap_remove(0)))),
        n => Err(SubresourceError::NonUniqueResult(n)),
    }
}
