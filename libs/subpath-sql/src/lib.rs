// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Query fragments, entity metadata and SQL compilation for nested subresource queries.
//!
//! Queries are assembled as a tree of [`Fragment`]s hanging off a [`RootQuery`]
//! through membership ([`Predicate::In`]) predicates. Nothing here talks to the
//! database until a compiled query is handed to a [`QueryExecutor`].

pub mod database_error;
pub mod schema;
mod sql;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use schema::{
    EntityMetadata, FieldMetadata, FieldType, ManagerKind, Ordering, RelationKind,
    RelationMetadata, Schema, SchemaError,
};
pub use sql::{
    BuildContext, CompiledQuery, ExpressionBuilder, SQLBuilder,
    alias::AliasGenerator,
    connect::postgres_executor::PostgresExecutor,
    executor::QueryExecutor,
    expr::{EntityExpr, ParamRef},
    fragment::{Fragment, Join},
    predicate::Predicate,
    root_query::{Limit, Offset, OrderByElement, ROOT_ALIAS, RootQuery},
    sql_param::SQLParam,
};
