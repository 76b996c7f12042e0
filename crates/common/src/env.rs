// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{collections::HashMap, str::FromStr};

/// Source of configuration values
pub trait Environment: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// The value for `key` with surrounding whitespace removed; blank values count as unset
    fn get_trimmed(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }
}

/// Parse the value for `key`, falling back to `default` if unset or unparsable
pub fn parse_or<T: FromStr>(env: &dyn Environment, key: &str, default: T) -> T {
    env.get_trimmed(key)
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

/// The process environment
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// An in-memory environment, mostly for tests
#[derive(Debug, Default, Clone)]
pub struct MapEnvironment {
    values: HashMap<String, String>,
}

impl MapEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for MapEnvironment {
    fn from(values: [(K, V); N]) -> Self {
        Self {
            values: values
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl Environment for MapEnvironment {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}
