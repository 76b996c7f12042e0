// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use indexmap::IndexMap;

use crate::{Ordering, Schema, database_error::DatabaseError};

use super::{
    BuildContext, CompiledQuery, ExpressionBuilder, SQLBuilder,
    expr::{EntityExpr, entity_metadata},
    fragment::Fragment,
    predicate::Predicate,
    sql_param::SQLParam,
};

/// Alias of the entity a root query returns
pub const ROOT_ALIAS: &str = "o";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offset(pub i64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderByElement {
    pub expr: EntityExpr,
    pub ordering: Ordering,
}

/// The query that is finally executed. Unlike fragments, it stays mutable until execution so that
/// extensions can refine it.
#[derive(Debug, Clone, PartialEq)]
pub struct RootQuery {
    pub entity: String,
    pub alias: String,
    pub predicate: Predicate,
    /// Values for every named parameter used anywhere in the tree
    pub params: IndexMap<String, SQLParam>,
    pub order_by: Vec<OrderByElement>,
    pub limit: Option<Limit>,
    pub offset: Option<Offset>,
}

impl RootQuery {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            alias: ROOT_ALIAS.to_string(),
            predicate: Predicate::True,
            params: IndexMap::new(),
            order_by: vec![],
            limit: None,
            offset: None,
        }
    }

    pub fn and_where(&mut self, predicate: Predicate) {
        let current = std::mem::replace(&mut self.predicate, Predicate::True);
        self.predicate = Predicate::and(current, predicate);
    }

    pub fn set_parameter(&mut self, name: impl Into<String>, value: SQLParam) {
        self.params.insert(name.into(), value);
    }

    pub fn add_order_by(&mut self, property: impl Into<String>, ordering: Ordering) {
        self.order_by.push(OrderByElement {
            expr: EntityExpr::property(&self.alias, &self.entity, property),
            ordering,
        });
    }

    pub fn set_limit(&mut self, limit: Limit) {
        self.limit = Some(limit);
    }

    pub fn set_offset(&mut self, offset: Offset) {
        self.offset = Some(offset);
    }

    /// The chain of nested fragments, outermost first
    pub fn fragments(&self) -> Vec<&Fragment> {
        let mut fragments = vec![];
        let mut current = self
            .predicate
            .membership_predicate()
            .map(|(_, fragment)| fragment);

        while let Some(fragment) = current {
            fragments.push(fragment);
            current = fragment.nested();
        }

        fragments
    }

    /// Compile to a query returning one JSON-encoded row per entity
    pub fn to_sql(&self, schema: &Schema) -> Result<CompiledQuery, DatabaseError> {
        self.compile(schema, RootSelection::Entity)
    }

    /// Compile to a query counting the matching entities (ignores ordering and paging)
    pub fn to_count_sql(&self, schema: &Schema) -> Result<CompiledQuery, DatabaseError> {
        self.compile(schema, RootSelection::Count)
    }

    fn compile(
        &self,
        schema: &Schema,
        selection: RootSelection,
    ) -> Result<CompiledQuery, DatabaseError> {
        let context = BuildContext {
            schema,
            params: &self.params,
        };
        let mut builder = SQLBuilder::new();
        let entity = entity_metadata(&context, &self.entity)?;

        builder.push_str("SELECT ");
        match selection {
            RootSelection::Entity => {
                builder.push_str("row_to_json(");
                builder.push_identifier(&self.alias);
                builder.push_str(")::text");
            }
            RootSelection::Count => builder.push_str("COUNT(*)"),
        }
        builder.push_str(" FROM ");
        builder.push_table(&entity.table, &self.alias);

        if self.predicate != Predicate::True {
            builder.push_str(" WHERE ");
            self.predicate.build(&context, &mut builder)?;
        }

        if selection == RootSelection::Count {
            return Ok(builder.into_sql());
        }

        let mut first = true;
        for element in &self.order_by {
            for column in element.expr.columns(&context)? {
                builder.push_str(if first { " ORDER BY " } else { ", " });
                first = false;
                builder.push_column(element.expr.alias(), column);
                builder.push_str(" ");
                builder.push_str(element.ordering.as_sql());
            }
        }

        if let Some(Limit(limit)) = self.limit {
            builder.push_str(" LIMIT ");
            builder.push_param(SQLParam::Int(limit));
        }

        if let Some(Offset(offset)) = self.offset {
            builder.push_str(" OFFSET ");
            builder.push_param(SQLParam::Int(offset));
        }

        Ok(builder.into_sql())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RootSelection {
    Entity,
    Count,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        EntityMetadata, FieldType, Join, ParamRef, RelationMetadata,
        sql::expr::EntityExpr,
    };

    fn schema() -> Schema {
        Schema::from_entities([
            EntityMetadata::new("Author", "authors")
                .with_identifier("id", "id", FieldType::Integer)
                .with_relation("books", RelationMetadata::one_to_many("Book", "author")),
            EntityMetadata::new("Book", "books")
                .with_identifier("id", "id", FieldType::Integer)
                .with_field("title", "title", FieldType::Text)
                .with_relation("author", RelationMetadata::many_to_one("Author", &["author_id"]))
                .with_relation("chapters", RelationMetadata::one_to_many("Chapter", "book"))
                .with_relation("tags", RelationMetadata::many_to_many_inverse("Tag", "books")),
            EntityMetadata::new("Chapter", "chapters")
                .with_identifier("id", "id", FieldType::Integer)
                .with_field("position", "position", FieldType::Integer)
                .with_relation("book", RelationMetadata::many_to_one("Book", &["book_id"])),
            EntityMetadata::new("Tag", "tags")
                .with_identifier("id", "id", FieldType::Integer)
                .with_relation(
                    "books",
                    RelationMetadata::many_to_many("Book", "book_tags", &["tag_id"], &["book_id"]),
                ),
            EntityMetadata::new("Shelf", "shelves")
                .with_identifier("code", "code", FieldType::Text)
                .with_identifier("number", "number", FieldType::Integer),
            EntityMetadata::new("Box", "boxes")
                .with_identifier("id", "id", FieldType::Integer)
                .with_relation(
                    "shelf",
                    RelationMetadata::many_to_one("Shelf", &["shelf_code", "shelf_number"]),
                ),
        ])
        .unwrap()
    }

    fn book_fragment(alias: &str, param: &str) -> Fragment {
        Fragment::new("Book", alias, EntityExpr::identity(alias, "Book")).and_where(
            Predicate::eq(EntityExpr::property(alias, "Book", "id"), ParamRef::new(param)),
        )
    }

    #[test]
    fn one_to_many_hop_correlates_through_the_inverse_property() {
        let mut query = RootQuery::new("Chapter");
        query.set_parameter("id_p1", SQLParam::Int(2));
        query.and_where(Predicate::membership(
            EntityExpr::property("o", "Chapter", "book"),
            book_fragment("book_a1", "id_p1"),
        ));

        let compiled = query.to_sql(&schema()).unwrap();
        insta::assert_snapshot!(
            compiled.sql,
            @r#"SELECT row_to_json("o")::text FROM "chapters" AS "o" WHERE "o"."book_id" IN (SELECT "book_a1"."id" FROM "books" AS "book_a1" WHERE "book_a1"."id" = $1)"#
        );
        assert_eq!(compiled.params, vec![SQLParam::Int(2)]);
    }

    #[test]
    fn nested_fragments_number_parameters_outside_in() {
        let author = Fragment::new("Author", "author_a2", EntityExpr::identity("author_a2", "Author"))
            .and_where(Predicate::eq(
                EntityExpr::property("author_a2", "Author", "id"),
                ParamRef::new("id_p2"),
            ));
        let book = book_fragment("book_a1", "id_p1").and_where(Predicate::membership(
            EntityExpr::property("book_a1", "Book", "author"),
            author,
        ));

        let mut query = RootQuery::new("Chapter");
        query.set_parameter("id_p1", SQLParam::Int(2));
        query.set_parameter("id_p2", SQLParam::Int(1));
        query.and_where(Predicate::membership(
            EntityExpr::property("o", "Chapter", "book"),
            book,
        ));

        assert_eq!(query.fragments().len(), 2);
        assert_eq!(query.fragments()[1].alias, "author_a2");

        let compiled = query.to_sql(&schema()).unwrap();
        assert_eq!(
            compiled.sql,
            concat!(
                r#"SELECT row_to_json("o")::text FROM "chapters" AS "o" WHERE "o"."book_id" IN ("#,
                r#"SELECT "book_a1"."id" FROM "books" AS "book_a1" WHERE "book_a1"."id" = $1 AND "book_a1"."author_id" IN ("#,
                r#"SELECT "author_a2"."id" FROM "authors" AS "author_a2" WHERE "author_a2"."id" = $2))"#
            )
        );
        assert_eq!(compiled.params, vec![SQLParam::Int(2), SQLParam::Int(1)]);
    }

    #[test]
    fn to_one_hop_selects_the_foreign_key() {
        let fragment = Fragment::new(
            "Book",
            "book_a1",
            EntityExpr::property("book_a1", "Book", "author"),
        )
        .and_where(Predicate::eq(
            EntityExpr::property("book_a1", "Book", "id"),
            ParamRef::new("id_p1"),
        ));

        let mut query = RootQuery::new("Author");
        query.set_parameter("id_p1", SQLParam::Int(2));
        query.and_where(Predicate::membership(
            EntityExpr::identity("o", "Author"),
            fragment,
        ));

        assert_eq!(
            query.to_sql(&schema()).unwrap().sql,
            r#"SELECT row_to_json("o")::text FROM "authors" AS "o" WHERE "o"."id" IN (SELECT "book_a1"."author_id" FROM "books" AS "book_a1" WHERE "book_a1"."id" = $1)"#
        );
    }

    #[test]
    fn inverse_many_to_many_joins_through_the_owning_join_table() {
        let fragment = Fragment::new("Book", "book_a1", EntityExpr::identity("tags_a2", "Tag"))
            .with_join(Join::new("book_a1", "Book", "tags", "tags_a2"))
            .and_where(Predicate::eq(
                EntityExpr::property("book_a1", "Book", "id"),
                ParamRef::new("id_p1"),
            ));

        let mut query = RootQuery::new("Tag");
        query.set_parameter("id_p1", SQLParam::Int(9));
        query.and_where(Predicate::membership(EntityExpr::identity("o", "Tag"), fragment));

        assert_eq!(
            query.to_sql(&schema()).unwrap().sql,
            concat!(
                r#"SELECT row_to_json("o")::text FROM "tags" AS "o" WHERE "o"."id" IN ("#,
                r#"SELECT "tags_a2"."id" FROM "books" AS "book_a1" "#,
                r#"INNER JOIN "book_tags" AS "tags_a2_link" ON "tags_a2_link"."book_id" = "book_a1"."id" "#,
                r#"INNER JOIN "tags" AS "tags_a2" ON "tags_a2"."id" = "tags_a2_link"."tag_id" "#,
                r#"WHERE "book_a1"."id" = $1)"#
            )
        );
    }

    #[test]
    fn composite_foreign_keys_select_a_bare_column_list() {
        let fragment = Fragment::new(
            "Box",
            "box_a1",
            EntityExpr::property("box_a1", "Box", "shelf"),
        );

        let mut query = RootQuery::new("Shelf");
        query.and_where(Predicate::membership(
            EntityExpr::identity("o", "Shelf"),
            fragment,
        ));

        assert_eq!(
            query.to_sql(&schema()).unwrap().sql,
            r#"SELECT row_to_json("o")::text FROM "shelves" AS "o" WHERE ("o"."code", "o"."number") IN (SELECT "box_a1"."shelf_code", "box_a1"."shelf_number" FROM "boxes" AS "box_a1")"#
        );
    }

    #[test]
    fn order_limit_and_offset_follow_the_predicate() {
        let mut query = RootQuery::new("Chapter");
        query.set_parameter("id_p1", SQLParam::Int(2));
        query.and_where(Predicate::membership(
            EntityExpr::property("o", "Chapter", "book"),
            book_fragment("book_a1", "id_p1"),
        ));
        query.add_order_by("position", Ordering::Asc);
        query.add_order_by("id", Ordering::Desc);
        query.set_limit(Limit(10));
        query.set_offset(Offset(20));

        let compiled = query.to_sql(&schema()).unwrap();
        assert!(
            compiled.sql.ends_with(
                r#"WHERE "book_a1"."id" = $1) ORDER BY "o"."position" ASC, "o"."id" DESC LIMIT $2 OFFSET $3"#
            ),
            "{}",
            compiled.sql
        );
        assert_eq!(
            compiled.params,
            vec![SQLParam::Int(2), SQLParam::Int(10), SQLParam::Int(20)]
        );

        let count = query.to_count_sql(&schema()).unwrap();
        assert_eq!(
            count.sql,
            r#"SELECT COUNT(*) FROM "chapters" AS "o" WHERE "o"."book_id" IN (SELECT "book_a1"."id" FROM "books" AS "book_a1" WHERE "book_a1"."id" = $1)"#
        );
        assert_eq!(count.params, vec![SQLParam::Int(2)]);
    }

    #[test]
    fn unbound_parameter_is_an_error() {
        let mut query = RootQuery::new("Chapter");
        query.and_where(Predicate::membership(
            EntityExpr::property("o", "Chapter", "book"),
            book_fragment("book_a1", "id_p1"),
        ));

        assert!(matches!(
            query.to_sql(&schema()),
            Err(DatabaseError::MissingParameter(name)) if name == "id_p1"
        ));
    }

    #[test]
    fn mismatched_membership_arity_is_invalid_metadata() {
        let fragment = Fragment::new("Book", "book_a1", EntityExpr::identity("book_a1", "Book"));

        let mut query = RootQuery::new("Shelf");
        query.and_where(Predicate::membership(
            EntityExpr::identity("o", "Shelf"),
            fragment,
        ));

        assert!(matches!(
            query.to_sql(&schema()),
            Err(DatabaseError::InvalidMetadata(_))
        ));
    }

    #[test]
    fn one_to_many_property_has_no_column() {
        let mut query = RootQuery::new("Author");
        query.add_order_by("books", Ordering::Asc);

        let message = query.to_sql(&schema()).unwrap_err().to_string();
        assert!(message.contains("does not own a foreign key"), "{message}");
    }
}
