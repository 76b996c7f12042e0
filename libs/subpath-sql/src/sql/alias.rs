// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use heck::ToSnakeCase;

/// Generates table aliases and parameter names for one query.
///
/// Each generated name ends in `_a<n>` (aliases) or `_p<n>` (parameters) where `n` comes from a
/// counter that only ever increases, so names never repeat, even for the same input.
#[derive(Debug)]
pub struct AliasGenerator {
    next_alias: usize,
    next_parameter: usize,
}

impl Default for AliasGenerator {
    fn default() -> Self {
        Self {
            next_alias: 1,
            next_parameter: 1,
        }
    }
}

impl AliasGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Alias for a table reached through an entity type or an association (`Book` -> `book_a1`)
    pub fn generate_join_alias(&mut self, name: &str) -> String {
        let alias = format!("{}_a{}", sanitize(name), self.next_alias);
        self.next_alias += 1;
        alias
    }

    /// Placeholder name for a bound value (`id` -> `id_p1`)
    pub fn generate_parameter_name(&mut self, name: &str) -> String {
        let name = format!("{}_p{}", sanitize(name), self.next_parameter);
        self.next_parameter += 1;
        name
    }
}

fn sanitize(name: &str) -> String {
    let sanitized = name.to_snake_case();

    if sanitized.is_empty() {
        "t".to_string()
    } else {
        sanitized
    }
}
