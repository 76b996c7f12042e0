// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Resolution of nested subresource paths (`/authors/1/books/2/chapters`) into a single query.
//!
//! Each ancestor of the path becomes a fragment nested in the next one through an `IN`
//! predicate, the closest ancestor being correlated with the requested entity. The resulting
//! [`RootQuery`](subpath_sql::RootQuery) goes through an [`ExtensionPipeline`] before it is
//! executed.

pub mod chain_builder;
pub mod config;
pub mod context;
pub mod error;
pub mod execution;
pub mod extension;
pub mod extensions;
pub mod identifier;
pub mod manager;
pub mod relation;
pub mod resolver;
pub mod route;

#[cfg(test)]
mod test_utils;

pub use chain_builder::ChainQueryBuilder;
pub use config::{PaginationConfig, ResolverConfig};
pub use context::{PathSegment, RawIdentifiers, SubresourceContext, SubresourcePath};
pub use error::SubresourceError;
pub use execution::{Page, ResolvedResult};
pub use extension::{CollectionExtension, ExtensionContext, ExtensionPipeline, ItemExtension};
pub use identifier::{IdentifierValue, normalize_identifiers};
pub use manager::{ManagerRegistry, SchemaManager, SchemaRegistry, StorageManager};
pub use relation::{RelationCardinality, classify_relation};
pub use resolver::SubresourceResolver;
pub use route::SubresourceRoute;
