// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use async_trait::async_trait;

use crate::database_error::DatabaseError;

use super::CompiledQuery;

/// Runs compiled queries against a store.
///
/// Entity queries (see [`crate::RootQuery::to_sql`]) yield one JSON object per row; count queries
/// (see [`crate::RootQuery::to_count_sql`]) yield a single number.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn fetch_all(
        &self,
        query: &CompiledQuery,
    ) -> Result<Vec<serde_json::Value>, DatabaseError>;

    async fn fetch_count(&self, query: &CompiledQuery) -> Result<u64, DatabaseError>;
}
