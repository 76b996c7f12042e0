// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use subpath_sql::Schema;

use crate::manager::SchemaRegistry;

pub(crate) fn library_schema() -> Schema {
    Schema::from_toml_str(include_str!("../tests/fixtures/library.toml")).unwrap()
}

pub(crate) fn library_registry() -> SchemaRegistry {
    SchemaRegistry::new(library_schema())
}
