// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Entity metadata: identifying properties, column mapping and relations.
//!
//! A [`Schema`] is usually loaded from a TOML mapping:
//!
//! ```toml
//! [entity.Book]
//! table = "books"
//! identifiers = ["id"]
//!
//! [entity.Book.fields]
//! id = { column = "id", type = "integer" }
//!
//! [entity.Book.relations]
//! author = { kind = "many_to_one", target = "Author", join_columns = ["author_id"] }
//! chapters = { kind = "one_to_many", target = "Chapter", mapped_by = "book" }
//! ```

use heck::ToSnakeCase;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to parse schema mapping: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid schema: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default, rename = "entity")]
    entities: IndexMap<String, EntityMetadata>,
}

impl Schema {
    /// Parse and validate a TOML mapping. Entity names are taken from the `[entity.<Name>]` keys.
    pub fn from_toml_str(source: &str) -> Result<Self, SchemaError> {
        let mut schema: Schema = toml::from_str(source)?;

        for (name, entity) in schema.entities.iter_mut() {
            entity.name = name.clone();
        }

        schema.validate()?;
        Ok(schema)
    }

    pub fn from_entities(
        entities: impl IntoIterator<Item = EntityMetadata>,
    ) -> Result<Self, SchemaError> {
        let schema = Schema {
            entities: entities
                .into_iter()
                .map(|entity| (entity.name.clone(), entity))
                .collect(),
        };

        schema.validate()?;
        Ok(schema)
    }

    pub fn entity(&self, name: &str) -> Option<&EntityMetadata> {
        self.entities.get(name)
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityMetadata> {
        self.entities.values()
    }

    pub fn entity_by_route(&self, route: &str) -> Option<&EntityMetadata> {
        self.entities
            .values()
            .find(|entity| entity.route_name() == route)
    }

    /// Check the structural assumptions the query compiler relies on.
    ///
    /// Relations are only checked for the columns they declare. A one-to-many without a
    /// `mapped_by` is accepted here and rejected when a query tries to cross it.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for entity in self.entities.values() {
            for identifier in &entity.identifiers {
                if !entity.fields.contains_key(identifier) {
                    return Err(SchemaError::Invalid(format!(
                        "Identifier '{identifier}' of '{}' is not a declared field",
                        entity.name
                    )));
                }
            }

            for (property, relation) in &entity.relations {
                let target = self.entity(&relation.target).ok_or_else(|| {
                    SchemaError::Invalid(format!(
                        "Relation '{}.{property}' targets unknown entity '{}'",
                        entity.name, relation.target
                    ))
                })?;

                if let Some(mapped_by) = &relation.mapped_by
                    && target.relation(mapped_by).is_none()
                {
                    return Err(SchemaError::Invalid(format!(
                        "Relation '{}.{property}' is mapped by '{}.{mapped_by}', which is not a relation",
                        entity.name, target.name
                    )));
                }

                if !relation.is_owning_side() {
                    continue;
                }

                match relation.kind {
                    RelationKind::ManyToOne | RelationKind::OneToOne => {
                        expect_column_count(
                            &relation.join_columns,
                            target,
                            &entity.name,
                            property,
                        )?;
                    }
                    RelationKind::ManyToMany => {
                        if relation.join_table.is_none() {
                            return Err(SchemaError::Invalid(format!(
                                "Many-to-many relation '{}.{property}' declares no join table",
                                entity.name
                            )));
                        }
                        expect_column_count(&relation.join_columns, entity, &entity.name, property)?;
                        expect_column_count(
                            &relation.inverse_join_columns,
                            target,
                            &entity.name,
                            property,
                        )?;
                    }
                    RelationKind::OneToMany => {}
                }
            }
        }

        Ok(())
    }
}

fn expect_column_count(
    columns: &[String],
    referenced: &EntityMetadata,
    owner: &str,
    property: &str,
) -> Result<(), SchemaError> {
    if columns.len() == referenced.identifiers.len() {
        Ok(())
    } else {
        Err(SchemaError::Invalid(format!(
            "Relation '{owner}.{property}' declares {} column(s) referencing '{}', which has {} identifier(s)",
            columns.len(),
            referenced.name,
            referenced.identifiers.len()
        )))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMetadata {
    #[serde(skip)]
    pub name: String,
    pub table: String,
    #[serde(default)]
    pub identifiers: Vec<String>,
    #[serde(default)]
    pub fields: IndexMap<String, FieldMetadata>,
    #[serde(default)]
    pub relations: IndexMap<String, RelationMetadata>,
    /// Path segment under which the collection is exposed (defaults to the pluralized snake-case name)
    #[serde(default)]
    pub route: Option<String>,
    /// Default ordering of collections of this entity
    #[serde(default)]
    pub order: IndexMap<String, Ordering>,
    #[serde(default)]
    pub manager: ManagerKind,
}

impl EntityMetadata {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            identifiers: vec![],
            fields: IndexMap::new(),
            relations: IndexMap::new(),
            route: None,
            order: IndexMap::new(),
            manager: ManagerKind::default(),
        }
    }

    pub fn with_identifier(
        mut self,
        name: impl Into<String>,
        column: impl Into<String>,
        typ: FieldType,
    ) -> Self {
        let name = name.into();
        self.identifiers.push(name.clone());
        self.with_field(name, column, typ)
    }

    pub fn with_field(
        mut self,
        name: impl Into<String>,
        column: impl Into<String>,
        typ: FieldType,
    ) -> Self {
        self.fields.insert(
            name.into(),
            FieldMetadata {
                column: column.into(),
                typ,
            },
        );
        self
    }

    pub fn with_relation(mut self, name: impl Into<String>, relation: RelationMetadata) -> Self {
        self.relations.insert(name.into(), relation);
        self
    }

    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn with_order(mut self, field: impl Into<String>, ordering: Ordering) -> Self {
        self.order.insert(field.into(), ordering);
        self
    }

    pub fn with_manager(mut self, manager: ManagerKind) -> Self {
        self.manager = manager;
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldMetadata> {
        self.fields.get(name)
    }

    pub fn relation(&self, name: &str) -> Option<&RelationMetadata> {
        self.relations.get(name)
    }

    pub fn is_identifier(&self, name: &str) -> bool {
        self.identifiers.iter().any(|identifier| identifier == name)
    }

    /// Identifier fields in declaration order
    pub fn identifier_fields(&self) -> impl Iterator<Item = (&str, &FieldMetadata)> {
        self.identifiers
            .iter()
            .filter_map(|name| self.fields.get(name).map(|field| (name.as_str(), field)))
    }

    pub fn route_name(&self) -> String {
        match &self.route {
            Some(route) => route.clone(),
            None => pluralizer::pluralize(&self.name.to_snake_case(), 2, false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMetadata {
    pub column: String,
    #[serde(rename = "type")]
    pub typ: FieldType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Integer,
    Text,
    Uuid,
    Boolean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    ManyToOne,
    OneToOne,
    OneToMany,
    ManyToMany,
}

impl RelationKind {
    pub fn is_to_many(self) -> bool {
        matches!(self, RelationKind::OneToMany | RelationKind::ManyToMany)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationMetadata {
    pub kind: RelationKind,
    pub target: String,
    /// Property on the target that owns this association
    #[serde(default)]
    pub mapped_by: Option<String>,
    /// Owning to-one: columns on this table referencing the target identifiers.
    /// Owning many-to-many: join table columns referencing this entity's identifiers.
    #[serde(default)]
    pub join_columns: Vec<String>,
    #[serde(default)]
    pub join_table: Option<String>,
    /// Owning many-to-many: join table columns referencing the target identifiers
    #[serde(default)]
    pub inverse_join_columns: Vec<String>,
}

impl RelationMetadata {
    fn new(kind: RelationKind, target: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
            mapped_by: None,
            join_columns: vec![],
            join_table: None,
            inverse_join_columns: vec![],
        }
    }

    pub fn many_to_one(target: impl Into<String>, join_columns: &[&str]) -> Self {
        Self {
            join_columns: to_strings(join_columns),
            ..Self::new(RelationKind::ManyToOne, target)
        }
    }

    pub fn one_to_one(target: impl Into<String>, join_columns: &[&str]) -> Self {
        Self {
            join_columns: to_strings(join_columns),
            ..Self::new(RelationKind::OneToOne, target)
        }
    }

    pub fn one_to_one_inverse(target: impl Into<String>, mapped_by: impl Into<String>) -> Self {
        Self {
            mapped_by: Some(mapped_by.into()),
            ..Self::new(RelationKind::OneToOne, target)
        }
    }

    pub fn one_to_many(target: impl Into<String>, mapped_by: impl Into<String>) -> Self {
        Self {
            mapped_by: Some(mapped_by.into()),
            ..Self::new(RelationKind::OneToMany, target)
        }
    }

    pub fn many_to_many(
        target: impl Into<String>,
        join_table: impl Into<String>,
        join_columns: &[&str],
        inverse_join_columns: &[&str],
    ) -> Self {
        Self {
            join_table: Some(join_table.into()),
            join_columns: to_strings(join_columns),
            inverse_join_columns: to_strings(inverse_join_columns),
            ..Self::new(RelationKind::ManyToMany, target)
        }
    }

    pub fn many_to_many_inverse(target: impl Into<String>, mapped_by: impl Into<String>) -> Self {
        Self {
            mapped_by: Some(mapped_by.into()),
            ..Self::new(RelationKind::ManyToMany, target)
        }
    }

    pub fn is_owning_side(&self) -> bool {
        self.mapped_by.is_none()
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Ordering {
    Asc,
    Desc,
}

impl Ordering {
    pub fn as_sql(self) -> &'static str {
        match self {
            Ordering::Asc => "ASC",
            Ordering::Desc => "DESC",
        }
    }
}

impl std::str::FromStr for Ordering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ASC" => Ok(Ordering::Asc),
            "DESC" => Ok(Ordering::Desc),
            _ => Err(format!("Invalid ordering '{s}' (expected ASC or DESC)")),
        }
    }
}

/// The kind of storage manager serving an entity. Only relational managers support the nested
/// subquery strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagerKind {
    #[default]
    Relational,
    Document,
}
