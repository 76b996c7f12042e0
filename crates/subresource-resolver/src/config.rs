// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use common::env::{Environment, parse_or};
use subpath_sql::Ordering;
use tracing::warn;

pub const PAGINATION_ENABLED_ENV: &str = "SUBPATH_PAGINATION_ENABLED";
pub const ITEMS_PER_PAGE_ENV: &str = "SUBPATH_ITEMS_PER_PAGE";
pub const MAXIMUM_ITEMS_PER_PAGE_ENV: &str = "SUBPATH_MAXIMUM_ITEMS_PER_PAGE";
pub const CLIENT_ITEMS_PER_PAGE_ENV: &str = "SUBPATH_CLIENT_ITEMS_PER_PAGE";
pub const ORDER_DIRECTION_ENV: &str = "SUBPATH_ORDER_DIRECTION";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    pub pagination: PaginationConfig,
    /// Direction used to order collections by identifier when the entity declares no order.
    /// `None` leaves such collections unordered.
    pub order_direction: Option<Ordering>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationConfig {
    pub enabled: bool,
    pub items_per_page: i64,
    pub maximum_items_per_page: i64,
    /// Whether clients may choose the page size through the `itemsPerPage` filter
    pub client_items_per_page: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            pagination: PaginationConfig::default(),
            order_direction: Some(Ordering::Asc),
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            items_per_page: 30,
            maximum_items_per_page: 100,
            client_items_per_page: false,
        }
    }
}

impl ResolverConfig {
    pub fn from_env(env: &dyn Environment) -> Self {
        let defaults = Self::default();

        let order_direction = match env.get_trimmed(ORDER_DIRECTION_ENV) {
            None => defaults.order_direction,
            Some(value) if value.eq_ignore_ascii_case("none") => None,
            Some(value) => match value.parse::<Ordering>() {
                Ok(ordering) => Some(ordering),
                Err(e) => {
                    warn!("Ignoring {ORDER_DIRECTION_ENV}: {e}");
                    defaults.order_direction
                }
            },
        };

        Self {
            pagination: PaginationConfig::from_env(env),
            order_direction,
        }
    }
}

impl PaginationConfig {
    pub fn from_env(env: &dyn Environment) -> Self {
        let defaults = Self::default();

        let items_per_page = parse_or(env, ITEMS_PER_PAGE_ENV, defaults.items_per_page).max(1);
        let maximum_items_per_page = parse_or(
            env,
            MAXIMUM_ITEMS_PER_PAGE_ENV,
            defaults.maximum_items_per_page,
        )
        .max(items_per_page);

        Self {
            enabled: parse_or(env, PAGINATION_ENABLED_ENV, defaults.enabled),
            items_per_page,
            maximum_items_per_page,
            client_items_per_page: parse_or(
                env,
                CLIENT_ITEMS_PER_PAGE_ENV,
                defaults.client_items_per_page,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use common::env::MapEnvironment;

    use super::*;

    #[test]
    fn defaults_without_environment() {
        assert_eq!(
            ResolverConfig::from_env(&MapEnvironment::new()),
            ResolverConfig::default()
        );
    }

    #[test]
    fn reads_overrides() {
        let env = MapEnvironment::from([
            (PAGINATION_ENABLED_ENV, "false"),
            (ITEMS_PER_PAGE_ENV, "10"),
            (MAXIMUM_ITEMS_PER_PAGE_ENV, "50"),
            (CLIENT_ITEMS_PER_PAGE_ENV, "true"),
            (ORDER_DIRECTION_ENV, "desc"),
        ]);

        assert_eq!(
            ResolverConfig::from_env(&env),
            ResolverConfig {
                pagination: PaginationConfig {
                    enabled: false,
                    items_per_page: 10,
                    maximum_items_per_page: 50,
                    client_items_per_page: true,
                },
                order_direction: Some(Ordering::Desc),
            }
        );
    }

    #[test]
    fn tolerates_bad_values() {
        let env = MapEnvironment::from([
            (ITEMS_PER_PAGE_ENV, "lots"),
            (MAXIMUM_ITEMS_PER_PAGE_ENV, "5"),
            (ORDER_DIRECTION_ENV, "sideways"),
        ]);

        let config = ResolverConfig::from_env(&env);
        assert_eq!(config.pagination.items_per_page, 30);
        // The maximum never drops below the default page size
        assert_eq!(config.pagination.maximum_items_per_page, 30);
        assert_eq!(config.order_direction, Some(Ordering::Asc));

        let env = MapEnvironment::from([(ORDER_DIRECTION_ENV, "none")]);
        assert_eq!(ResolverConfig::from_env(&env).order_direction, None);
    }
}
