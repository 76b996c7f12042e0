// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Test doubles for code that executes compiled queries.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::{CompiledQuery, QueryExecutor, database_error::DatabaseError};

/// An executor that returns canned results and remembers every query it was given
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    rows: Vec<serde_json::Value>,
    count: u64,
    queries: Mutex<Vec<CompiledQuery>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(self, rows: Vec<serde_json::Value>) -> Self {
        Self { rows, ..self }
    }

    pub fn with_count(self, count: u64) -> Self {
        Self { count, ..self }
    }

    /// Queries executed so far, in order
    pub fn queries(&self) -> Vec<CompiledQuery> {
        self.queries
            .lock()
            .map(|queries| queries.clone())
            .unwrap_or_default()
    }

    fn record(&self, query: &CompiledQuery) {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.clone());
        }
    }
}

#[async_trait]
impl QueryExecutor for RecordingExecutor {
    async fn fetch_all(
        &self,
        query: &CompiledQuery,
    ) -> Result<Vec<serde_json::Value>, DatabaseError> {
        self.record(query);
        Ok(self.rows.clone())
    }

    async fn fetch_count(&self, query: &CompiledQuery) -> Result<u64, DatabaseError> {
        self.record(query);
        Ok(self.count)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::SQLParam;

    #[tokio::test]
    async fn records_queries_in_order() {
        let executor = RecordingExecutor::new()
            .with_rows(vec![json!({"id": 1})])
            .with_count(7);

        let query = CompiledQuery {
            sql: "SELECT 1".into(),
            params: vec![SQLParam::Int(1)],
        };

        assert_eq!(executor.fetch_all(&query).await.unwrap(), vec![json!({"id": 1})]);
        assert_eq!(executor.fetch_count(&query).await.unwrap(), 7);
        assert_eq!(executor.queries(), vec![query.clone(), query]);
    }
}
