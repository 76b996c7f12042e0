// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::{RelationKind, database_error::DatabaseError};

use super::{
    BuildContext, ExpressionBuilder, SQLBuilder,
    expr::{EntityExpr, entity_metadata},
    predicate::Predicate,
};

/// One hop of a nested query: a select over a single entity, usable inside a membership predicate.
///
/// A fragment that is nested inside another one lives by value in the outer fragment's predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub entity: String,
    pub alias: String,
    pub selection: EntityExpr,
    pub join: Option<Join>,
    pub predicate: Predicate,
}

impl Fragment {
    pub fn new(entity: impl Into<String>, alias: impl Into<String>, selection: EntityExpr) -> Self {
        Self {
            entity: entity.into(),
            alias: alias.into(),
            selection,
            join: None,
            predicate: Predicate::True,
        }
    }

    pub fn with_join(self, join: Join) -> Self {
        Self {
            join: Some(join),
            ..self
        }
    }

    pub fn and_where(self, predicate: Predicate) -> Self {
        Self {
            predicate: Predicate::and(self.predicate, predicate),
            ..self
        }
    }

    /// The fragment nested inside this one, if any
    pub fn nested(&self) -> Option<&Fragment> {
        self.predicate
            .membership_predicate()
            .map(|(_, fragment)| fragment)
    }

    /// Aliases this fragment introduces (its own and, for a join, the joined one)
    pub fn aliases(&self) -> Vec<&str> {
        let mut aliases = vec![self.alias.as_str()];
        if let Some(join) = &self.join {
            aliases.push(join.alias.as_str());
        }
        aliases
    }
}

impl ExpressionBuilder for Fragment {
    fn build(
        &self,
        context: &BuildContext<'_>,
        builder: &mut SQLBuilder,
    ) -> Result<(), DatabaseError> {
        let entity = entity_metadata(context, &self.entity)?;

        // A row tuple here would select one record-typed column, so the list stays bare
        builder.push_str("SELECT ");
        let columns = self.selection.columns(context)?;
        builder.push_column_list(self.selection.alias(), &columns);
        builder.push_str(" FROM ");
        builder.push_table(&entity.table, &self.alias);

        if let Some(join) = &self.join {
            join.build(context, builder)?;
        }

        if self.predicate != Predicate::True {
            builder.push_str(" WHERE ");
            self.predicate.build(context, builder)?;
        }

        Ok(())
    }
}

/// Inner join from an aliased entity through one of its many-to-many associations.
///
/// The join table gets the alias `<alias>_link`; `alias` names the associated entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub from_alias: String,
    pub from_entity: String,
    pub relation: String,
    pub alias: String,
}

impl Join {
    pub fn new(
        from_alias: impl Into<String>,
        from_entity: impl Into<String>,
        relation: impl Into<String>,
        alias: impl Into<String>,
    ) -> Self {
        Self {
            from_alias: from_alias.into(),
            from_entity: from_entity.into(),
            relation: relation.into(),
            alias: alias.into(),
        }
    }

    pub fn link_alias(&self) -> String {
        format!("{}_link", self.alias)
    }
}

impl ExpressionBuilder for Join {
    fn build(
        &self,
        context: &BuildContext<'_>,
        builder: &mut SQLBuilder,
    ) -> Result<(), DatabaseError> {
        let from_entity = entity_metadata(context, &self.from_entity)?;

        let relation = from_entity
            .relation(&self.relation)
            .filter(|relation| relation.kind == RelationKind::ManyToMany)
            .ok_or_else(|| {
                DatabaseError::InvalidMetadata(format!(
                    "'{}.{}' is not a many-to-many relation",
                    from_entity.name, self.relation
                ))
            })?;
        let target = entity_metadata(context, &relation.target)?;

        // Columns of the join table referencing the source and the target respectively
        let (join_table, source_columns, target_columns) = match &relation.mapped_by {
            None => (
                relation.join_table.as_deref(),
                &relation.join_columns,
                &relation.inverse_join_columns,
            ),
            Some(mapped_by) => {
                let owning = target.relation(mapped_by).ok_or_else(|| {
                    DatabaseError::InvalidMetadata(format!(
                        "'{}.{}' is mapped by unknown relation '{}.{mapped_by}'",
                        from_entity.name, self.relation, target.name
                    ))
                })?;
                (
                    owning.join_table.as_deref(),
                    &owning.inverse_join_columns,
                    &owning.join_columns,
                )
            }
        };

        let join_table = join_table.ok_or_else(|| {
            DatabaseError::InvalidMetadata(format!(
                "'{}.{}' has no join table",
                from_entity.name, self.relation
            ))
        })?;

        let link_alias = self.link_alias();

        builder.push_str(" INNER JOIN ");
        builder.push_table(join_table, &link_alias);
        builder.push_str(" ON ");
        push_column_equalities(
            builder,
            &link_alias,
            source_columns.iter().map(String::as_str),
            &self.from_alias,
            from_entity
                .identifier_fields()
                .map(|(_, field)| field.column.as_str()),
        )?;

        builder.push_str(" INNER JOIN ");
        builder.push_table(&target.table, &self.alias);
        builder.push_str(" ON ");
        push_column_equalities(
            builder,
            &self.alias,
            target
                .identifier_fields()
                .map(|(_, field)| field.column.as_str()),
            &link_alias,
            target_columns.iter().map(String::as_str),
        )
    }
}

fn push_column_equalities<'a, 'b>(
    builder: &mut SQLBuilder,
    left_alias: &str,
    left_columns: impl Iterator<Item = &'a str>,
    right_alias: &str,
    right_columns: impl Iterator<Item = &'b str>,
) -> Result<(), DatabaseError> {
    let left_columns = left_columns.collect::<Vec<_>>();
    let right_columns = right_columns.collect::<Vec<_>>();

    if left_columns.len() != right_columns.len() || left_columns.is_empty() {
        return Err(DatabaseError::InvalidMetadata(format!(
            "Join columns of '{left_alias}' do not line up with '{right_alias}'"
        )));
    }

    for (index, (left, right)) in left_columns.iter().zip(right_columns).enumerate() {
        if index > 0 {
            builder.push_str(" AND ");
        }
        builder.push_column(left_alias, left);
        builder.push_str(" = ");
        builder.push_column(right_alias, right);
    }

    Ok(())
}
