// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt::Display;

use tokio_postgres::types::{ToSql, Type};
use uuid::Uuid;

use crate::FieldType;

/// A value bound to a query placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SQLParam {
    Int(i64),
    Text(String),
    Uuid(Uuid),
    Bool(bool),
}

impl SQLParam {
    /// Convert a raw (textual) value into a parameter of the given field type
    pub fn parse(raw: &str, typ: FieldType) -> Result<SQLParam, String> {
        match typ {
            FieldType::Integer => raw
                .parse::<i64>()
                .map(SQLParam::Int)
                .map_err(|_| format!("'{raw}' is not a valid integer")),
            FieldType::Text => Ok(SQLParam::Text(raw.to_string())),
            FieldType::Uuid => Uuid::parse_str(raw)
                .map(SQLParam::Uuid)
                .map_err(|_| format!("'{raw}' is not a valid UUID")),
            FieldType::Boolean => match raw {
                "true" | "1" => Ok(SQLParam::Bool(true)),
                "false" | "0" => Ok(SQLParam::Bool(false)),
                _ => Err(format!("'{raw}' is not a valid boolean")),
            },
        }
    }

    /// Whether this value can be compared against a column of the given type
    pub fn matches(&self, typ: FieldType) -> bool {
        matches!(
            (self, typ),
            (SQLParam::Int(_), FieldType::Integer)
                | (SQLParam::Text(_), FieldType::Text)
                | (SQLParam::Uuid(_), FieldType::Uuid)
                | (SQLParam::Bool(_), FieldType::Boolean)
        )
    }

    pub fn as_pg(&self) -> &(dyn ToSql + Sync) {
        match self {
            SQLParam::Int(value) => value,
            SQLParam::Text(value) => value,
            SQLParam::Uuid(value) => value,
            SQLParam::Bool(value) => value,
        }
    }

    pub fn pg_type(&self) -> Type {
        match self {
            SQLParam::Int(_) => Type::INT8,
            SQLParam::Text(_) => Type::TEXT,
            SQLParam::Uuid(_) => Type::UUID,
            SQLParam::Bool(_) => Type::BOOL,
        }
    }
}

impl Display for SQLParam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SQLParam::Int(value) => write!(f, "{value}"),
            SQLParam::Text(value) => write!(f, "'{value}'"),
            SQLParam::Uuid(value) => write!(f, "'{value}'"),
            SQLParam::Bool(value) => write!(f, "{value}"),
        }
    }
}

impl From<i64> for SQLParam {
    fn from(value: i64) -> Self {
        SQLParam::Int(value)
    }
}

impl From<&str> for SQLParam {
    fn from(value: &str) -> Self {
        SQLParam::Text(value.to_string())
    }
}

impl From<String> for SQLParam {
    fn from(value: String) -> Self {
        SQLParam::Text(value)
    }
}

impl From<Uuid> for SQLParam {
    fn from(value: Uuid) -> Self {
        SQLParam::Uuid(value)
    }
}

impl From<bool> for SQLParam {
    fn from(value: bool) -> Self {
        SQLParam::Bool(value)
    }
}
