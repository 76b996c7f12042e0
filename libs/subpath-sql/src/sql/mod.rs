// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use indexmap::IndexMap;

use crate::{Schema, database_error::DatabaseError};

use self::sql_param::SQLParam;

pub(crate) mod alias;
pub(crate) mod connect;
pub(crate) mod executor;
pub(crate) mod expr;
pub(crate) mod fragment;
pub(crate) mod predicate;
pub(crate) mod root_query;
pub(crate) mod sql_param;

/// Everything needed to turn a query tree into SQL: the metadata that maps properties to columns
/// and the parameter values bound on the root query.
pub struct BuildContext<'a> {
    pub schema: &'a Schema,
    pub params: &'a IndexMap<String, SQLParam>,
}

/// A node of the query tree that can render itself as SQL
pub trait ExpressionBuilder {
    fn build(&self, context: &BuildContext<'_>, builder: &mut SQLBuilder)
    -> Result<(), DatabaseError>;

    /// Render just this node. Parameters are numbered from `$1`.
    fn to_sql(&self, context: &BuildContext<'_>) -> Result<CompiledQuery, DatabaseError> {
        let mut builder = SQLBuilder::new();
        self.build(context, &mut builder)?;
        Ok(builder.into_sql())
    }
}

/// SQL text along with the positional parameters it refers to
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<SQLParam>,
}

/// Accumulates SQL text and positional parameters
#[derive(Debug, Default)]
pub struct SQLBuilder {
    sql: String,
    params: Vec<SQLParam>,
}

impl SQLBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_str(&mut self, s: impl AsRef<str>) {
        self.sql.push_str(s.as_ref());
    }

    /// Push a double-quoted identifier (quotes inside the name are doubled)
    pub fn push_identifier(&mut self, name: &str) {
        self.sql.push('"');
        self.sql.push_str(&name.replace('"', "\"\""));
        self.sql.push('"');
    }

    /// Push `"<alias>"."<column>"`
    pub fn push_column(&mut self, alias: &str, column: &str) {
        self.push_identifier(alias);
        self.sql.push('.');
        self.push_identifier(column);
    }

    /// Push a single column, or a row tuple if there are several
    pub fn push_columns(&mut self, alias: &str, columns: &[&str]) {
        if let [column] = columns {
            self.push_column(alias, column);
        } else {
            self.sql.push('(');
            self.push_column_list(alias, columns);
            self.sql.push(')');
        }
    }

    /// Push columns separated by commas, as a select list expects them
    pub fn push_column_list(&mut self, alias: &str, columns: &[&str]) {
        for (index, column) in columns.iter().enumerate() {
            if index > 0 {
                self.sql.push_str(", ");
            }
            self.push_column(alias, column);
        }
    }

    /// Push a `$n` placeholder for the given value
    pub fn push_param(&mut self, param: SQLParam) {
        self.params.push(param);
        self.sql.push('$');
        self.sql.push_str(&self.params.len().to_string());
    }

    /// Push `<table> AS <alias>`
    pub fn push_table(&mut self, table: &str, alias: &str) {
        self.push_identifier(table);
        self.sql.push_str(" AS ");
        self.push_identifier(alias);
    }

    pub fn into_sql(self) -> CompiledQuery {
        CompiledQuery {
            sql: self.sql,
            params: self.params,
        }
    }
}
