// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use tracing_subscriber::EnvFilter;

use crate::env::Environment;

pub const LOG_ENV: &str = "SUBPATH_LOG";

const DEFAULT_DIRECTIVES: &str = "info";

/// Install a global `fmt` subscriber filtered by `SUBPATH_LOG` (or `RUST_LOG`).
///
/// Does nothing if a global subscriber is already set.
pub fn init(env: &dyn Environment) {
    let filter = EnvFilter::try_new(directives(env))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn directives(env: &dyn Environment) -> String {
    env.get_trimmed(LOG_ENV)
        .or_else(|| env.get_trimmed("RUST_LOG"))
        .unwrap_or_else(|| DEFAULT_DIRECTIVES.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MapEnvironment;

    #[test]
    fn prefers_own_variable() {
        let env = MapEnvironment::from([(LOG_ENV, "subresource_resolver=debug"), ("RUST_LOG", "warn")]);
        assert_eq!(directives(&env), "subresource_resolver=debug");

        let env = MapEnvironment::from([("RUST_LOG", "warn")]);
        assert_eq!(directives(&env), "warn");

        assert_eq!(directives(&MapEnvironment::new()), "info");
    }
}
