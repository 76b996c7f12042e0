// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use subpath_sql::{EntityMetadata, ManagerKind, Schema};

/// A storage manager serving a set of resource types
pub trait StorageManager: Send + Sync {
    fn kind(&self) -> ManagerKind;

    /// Metadata for a type this manager serves
    fn class_metadata(&self, resource_type: &str) -> Option<&EntityMetadata>;

    /// Metadata used to compile queries issued through this manager
    fn schema(&self) -> &Schema;
}

/// Looks up the storage manager responsible for a resource type
pub trait ManagerRegistry: Send + Sync {
    fn manager_for(&self, resource_type: &str) -> Option<&dyn StorageManager>;
}

/// Serves the entities of a schema whose `manager` is `kind`
pub struct SchemaManager {
    schema: Arc<Schema>,
    kind: ManagerKind,
}

impl SchemaManager {
    pub fn new(schema: Arc<Schema>, kind: ManagerKind) -> Self {
        Self { schema, kind }
    }
}

impl StorageManager for SchemaManager {
    fn kind(&self) -> ManagerKind {
        self.kind
    }

    fn class_metadata(&self, resource_type: &str) -> Option<&EntityMetadata> {
        self.schema
            .entity(resource_type)
            .filter(|entity| entity.manager == self.kind)
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }
}

/// Routes each entity of a schema to a manager of its declared kind
pub struct SchemaRegistry {
    relational: SchemaManager,
    document: SchemaManager,
}

impl SchemaRegistry {
    pub fn new(schema: Schema) -> Self {
        let schema = Arc::new(schema);

        Self {
            relational: SchemaManager::new(schema.clone(), ManagerKind::Relational),
            document: SchemaManager::new(schema, ManagerKind::Document),
        }
    }
}

impl ManagerRegistry for SchemaRegistry {
    fn manager_for(&self, resource_type: &str) -> Option<&dyn StorageManager> {
        let entity = self.relational.schema.entity(resource_type)?;

        Some(match entity.manager {
            ManagerKind::Relational => &self.relational,
            ManagerKind::Document => &self.document,
        })
    }
}
