// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use common::{
    env::{Environment, SystemEnvironment},
    logging,
};
use subpath_sql::{PostgresExecutor, Schema};
use subresource_resolver::{
    ExtensionPipeline, ResolverConfig, SchemaRegistry, SubresourceResolver, SubresourceRoute,
};
use tracing::info;

const DATABASE_URL_ENV: &str = "SUBPATH_DATABASE_URL";

fn command() -> Command {
    Command::new("subpath")
        .about("Resolve a nested subresource path into SQL, and optionally run it")
        .arg(
            Arg::new("schema")
                .help("TOML file describing entities and their relations")
                .long("schema")
                .short('s')
                .required(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("path")
                .help("Subresource path, e.g. /authors/1/books?page=2")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("execute")
                .help("Run the query and print the result instead of the SQL")
                .long("execute")
                .short('e')
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("database-url")
                .help(format!(
                    "Postgres connection URL (defaults to the {DATABASE_URL_ENV} environment variable)"
                ))
                .long("database-url")
                .requires("execute"),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = SystemEnvironment;
    logging::init(&env);

    run(command().get_matches(), &env).await
}

async fn run(matches: ArgMatches, env: &dyn Environment) -> Result<()> {
    let schema_path = matches
        .get_one::<PathBuf>("schema")
        .context("--schema is required")?;
    let route = matches
        .get_one::<String>("path")
        .context("A subresource path is required")?;

    let source = std::fs::read_to_string(schema_path)
        .with_context(|| format!("Failed to read schema file {}", schema_path.display()))?;
    let schema = Schema::from_toml_str(&source)
        .with_context(|| format!("Invalid schema in {}", schema_path.display()))?;

    let route = SubresourceRoute::parse(&schema, route)?;
    info!(resource_type = %route.resource_type, "Resolved route");

    let config = ResolverConfig::from_env(env);
    let resolver = SubresourceResolver::new(
        Arc::new(SchemaRegistry::new(schema.clone())),
        ExtensionPipeline::with_defaults(&config),
    );

    if matches.get_flag("execute") {
        let url = matches
            .get_one::<String>("database-url")
            .cloned()
            .or_else(|| env.get_trimmed(DATABASE_URL_ENV))
            .with_context(|| format!("--database-url or {DATABASE_URL_ENV} must be set"))?;

        let executor = PostgresExecutor::connect(&url).await?;
        let result = resolver
            .resolve(
                &executor,
                &route.resource_type,
                &route.context,
                &route.identifiers,
            )
            .await?;

        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        let query =
            resolver.build_query(&route.resource_type, &route.context, &route.identifiers)?;
        let compiled = query.to_sql(&schema)?;

        println!("{}", compiled.sql);
        for (index, param) in compiled.params.iter().enumerate() {
            println!("${} = {param}", index + 1);
        }
    }

    Ok(())
}
