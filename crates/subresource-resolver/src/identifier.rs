// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use indexmap::IndexMap;
use subpath_sql::{EntityMetadata, FieldMetadata, SQLParam};

use crate::error::SubresourceError;

/// An identifier as supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierValue {
    /// A single value, or for composite identifiers the `k1=v1;k2=v2` form
    Scalar(String),
    /// Raw values keyed by identifying property
    Composite(IndexMap<String, String>),
    /// Already typed values keyed by identifying property
    Normalized(IndexMap<String, SQLParam>),
}

impl From<&str> for IdentifierValue {
    fn from(value: &str) -> Self {
        IdentifierValue::Scalar(value.to_string())
    }
}

impl From<String> for IdentifierValue {
    fn from(value: String) -> Self {
        IdentifierValue::Scalar(value)
    }
}

impl From<i64> for IdentifierValue {
    fn from(value: i64) -> Self {
        IdentifierValue::Scalar(value.to_string())
    }
}

/// Map an identifier onto the entity's identifying properties, in declaration order, with each
/// value typed after its field.
pub fn normalize_identifiers(
    value: &IdentifierValue,
    entity: &EntityMetadata,
) -> Result<IndexMap<String, SQLParam>, SubresourceError> {
    let identifiers = entity.identifier_fields().collect::<Vec<_>>();

    if identifiers.is_empty() || identifiers.len() != entity.identifiers.len() {
        return Err(SubresourceError::UnsupportedIdentifier(entity.name.clone()));
    }

    let invalid = |message: String| SubresourceError::InvalidIdentifier {
        entity: entity.name.clone(),
        message,
    };

    match value {
        IdentifierValue::Scalar(raw) => match identifiers.as_slice() {
            [(name, field)] => Ok(IndexMap::from([(
                name.to_string(),
                parse_value(raw, field).map_err(invalid)?,
            )])),
            _ => {
                let parts = parse_composite(raw).map_err(invalid)?;
                normalize_parts(&parts, &identifiers).map_err(invalid)
            }
        },
        IdentifierValue::Composite(parts) => {
            normalize_parts(parts, &identifiers).map_err(invalid)
        }
        IdentifierValue::Normalized(values) => {
            check_keys(values.keys(), &identifiers).map_err(invalid)?;

            identifiers
                .iter()
                .map(|(name, field)| match values.get(*name) {
                    Some(param) if param.matches(field.typ) => {
                        Ok((name.to_string(), param.clone()))
                    }
                    Some(param) => Err(invalid(format!(
                        "{param} does not match the type of '{name}'"
                    ))),
                    None => Err(invalid(format!("missing value for '{name}'"))),
                })
                .collect()
        }
    }
}

fn parse_value(raw: &str, field: &FieldMetadata) -> Result<SQLParam, String> {
    SQLParam::parse(raw.trim(), field.typ)
}

/// Parse `k1=v1;k2=v2`
fn parse_composite(raw: &str) -> Result<IndexMap<String, String>, String> {
    raw.split(';')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            part.split_once('=')
                .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
                .ok_or_else(|| format!("'{part}' is not of the form key=value"))
        })
        .collect()
}

fn normalize_parts(
    parts: &IndexMap<String, String>,
    identifiers: &[(&str, &FieldMetadata)],
) -> Result<IndexMap<String, SQLParam>, String> {
    check_keys(parts.keys(), identifiers)?;

    identifiers
        .iter()
        .map(|(name, field)| {
            let raw = parts
                .get(*name)
                .ok_or_else(|| format!("missing value for '{name}'"))?;
            Ok::<_, String>((name.to_string(), parse_value(raw, field)?))
        })
        .collect()
}

fn check_keys<'a>(
    mut keys: impl Iterator<Item = &'a String>,
    identifiers: &[(&str, &FieldMetadata)],
) -> Result<(), String> {
    match keys.find(|key| !identifiers.iter().any(|(name, _)| name == key)) {
        Some(key) => Err(format!("'{key}' is not an identifier")),
        None => Ok(()),
    }
}
