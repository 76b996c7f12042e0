// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use async_trait::async_trait;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    database_error::DatabaseError,
    sql::{CompiledQuery, executor::QueryExecutor},
};

/// Executes compiled queries on a single Postgres connection
pub struct PostgresExecutor {
    client: Client,
}

impl PostgresExecutor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect without TLS. The connection is driven by a task spawned on the current runtime.
    pub async fn connect(url: &str) -> Result<Self, DatabaseError> {
        let (client, connection) = tokio_postgres::connect(url, NoTls)
            .await
            .map_err(|e| DatabaseError::Delegate(e).with_context("Failed to connect".into()))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "Postgres connection error");
            }
        });

        Ok(Self::new(client))
    }

    async fn run_query(&self, query: &CompiledQuery) -> Result<Vec<Row>, DatabaseError> {
        let params: Vec<_> = query
            .params
            .iter()
            .map(|param| (param.as_pg(), param.pg_type()))
            .collect();

        info!("Executing SQL query: {}", query.sql);
        debug!(params = ?query.params, "Query parameters");

        self.client
            .query_typed(&query.sql, &params[..])
            .await
            .map_err(|err| {
                log_query_error(query, &err, self.client.is_closed());
                DatabaseError::Delegate(err).with_context("Database operation failed".into())
            })
    }
}

#[async_trait]
impl QueryExecutor for PostgresExecutor {
    #[instrument(name = "PostgresExecutor::fetch_all", skip_all)]
    async fn fetch_all(
        &self,
        query: &CompiledQuery,
    ) -> Result<Vec<serde_json::Value>, DatabaseError> {
        let rows = self.run_query(query).await?;

        rows.iter()
            .map(|row| {
                let text: String = row.try_get(0)?;
                serde_json::from_str(&text).map_err(|e| DatabaseError::Decode(e.to_string()))
            })
            .collect()
    }

    #[instrument(name = "PostgresExecutor::fetch_count", skip_all)]
    async fn fetch_count(&self, query: &CompiledQuery) -> Result<u64, DatabaseError> {
        let rows = self.run_query(query).await?;

        let row = rows
            .first()
            .ok_or_else(|| DatabaseError::Decode("Count query returned no rows".into()))?;
        let count: i64 = row.try_get(0)?;

        u64::try_from(count).map_err(|_| DatabaseError::Decode(format!("Negative count {count}")))
    }
}

/// How a query failed, from the point of view of this executor's single connection
#[derive(Debug, PartialEq, Eq)]
enum QueryFailure {
    /// The connection is gone; every later query on this executor fails too
    ConnectionClosed,
    /// Postgres answered with an error for this statement
    Rejected { sqlstate: String },
    /// The client failed before Postgres answered (encoding, protocol, ...)
    Client,
}

impl QueryFailure {
    fn classify(err: &tokio_postgres::Error, connection_closed: bool) -> Self {
        if connection_closed || err.is_closed() {
            QueryFailure::ConnectionClosed
        } else if let Some(db_error) = err.as_db_error() {
            QueryFailure::Rejected {
                sqlstate: db_error.code().code().to_string(),
            }
        } else {
            QueryFailure::Client
        }
    }
}

fn log_query_error(query: &CompiledQuery, err: &tokio_postgres::Error, connection_closed: bool) {
    match QueryFailure::classify(err, connection_closed) {
        QueryFailure::ConnectionClosed => warn!(
            error = %err,
            "Postgres connection is closed; this executor must be reconnected"
        ),
        QueryFailure::Rejected { sqlstate } => error!(
            %sqlstate,
            message = err.as_db_error().map(|db_error| db_error.message()),
            detail = err.as_db_error().and_then(|db_error| db_error.detail()),
            params = query.params.len(),
            sql = %query.sql,
            "Subresource query rejected by Postgres"
        ),
        QueryFailure::Client => error!(
            error = %err,
            params = query.params.len(),
            sql = %query.sql,
            "Subresource query failed before reaching Postgres"
        ),
    }
}
