// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use subpath_sql::{AliasGenerator, Ordering, RootQuery};
use tracing::debug;

use crate::{
    error::SubresourceError,
    extension::{CollectionExtension, ExtensionContext},
};

/// Applies the entity's declared order, or else orders by its identifiers
pub struct OrderExtension {
    direction: Option<Ordering>,
}

impl OrderExtension {
    pub fn new(direction: Option<Ordering>) -> Self {
        Self { direction }
    }
}

impl CollectionExtension for OrderExtension {
    fn apply_to_collection(
        &self,
        query: &mut RootQuery,
        _aliases: &mut AliasGenerator,
        context: &ExtensionContext<'_>,
    ) -> Result<(), SubresourceError> {
        if !query.order_by.is_empty() {
            return Ok(());
        }

        let entity = context.schema.entity(context.resource_type).ok_or_else(|| {
            SubresourceError::InvalidMetadata(format!(
                "Unknown entity '{}'",
                context.resource_type
            ))
        })?;

        if !entity.order.is_empty() {
            for (property, ordering) in &entity.order {
                query.add_order_by(property, *ordering);
            }
        } else if let Some(direction) = self.direction {
            for identifier in &entity.identifiers {
                query.add_order_by(identifier, direction);
            }
        }

        debug!(entity = %entity.name, order = query.order_by.len(), "Applied ordering");
        Ok(())
    }
}
