// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::database_error::DatabaseError;

use super::{
    BuildContext, ExpressionBuilder, SQLBuilder,
    expr::{EntityExpr, ParamRef},
    fragment::Fragment,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    True,
    Eq(EntityExpr, ParamRef),
    /// `subject IN (<fragment>)`
    In(EntityExpr, Box<Fragment>),
    And(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    pub fn and(lhs: Predicate, rhs: Predicate) -> Predicate {
        match (lhs, rhs) {
            (Predicate::True, rhs) => rhs,
            (lhs, Predicate::True) => lhs,
            (lhs, rhs) => Predicate::And(Box::new(lhs), Box::new(rhs)),
        }
    }

    pub fn eq(subject: EntityExpr, param: ParamRef) -> Predicate {
        Predicate::Eq(subject, param)
    }

    pub fn membership(subject: EntityExpr, fragment: Fragment) -> Predicate {
        Predicate::In(subject, Box::new(fragment))
    }

    /// Flatten nested conjunctions, left to right
    pub fn conjuncts(&self) -> Vec<&Predicate> {
        match self {
            Predicate::True => vec![],
            Predicate::And(lhs, rhs) => {
                let mut conjuncts = lhs.conjuncts();
                conjuncts.extend(rhs.conjuncts());
                conjuncts
            }
            other => vec![other],
        }
    }

    /// The first membership predicate among the conjuncts
    pub fn membership_predicate(&self) -> Option<(&EntityExpr, &Fragment)> {
        self.conjuncts()
            .into_iter()
            .find_map(|conjunct| match conjunct {
                Predicate::In(subject, fragment) => Some((subject, fragment.as_ref())),
                _ => None,
            })
    }
}

impl ExpressionBuilder for Predicate {
    fn build(
        &self,
        context: &BuildContext<'_>,
        builder: &mut SQLBuilder,
    ) -> Result<(), DatabaseError> {
        match self {
            Predicate::True => builder.push_str("TRUE"),
            Predicate::Eq(subject, param) => {
                let columns = subject.columns(context)?;
                if columns.len() != 1 {
                    return Err(DatabaseError::InvalidMetadata(format!(
                        "Cannot compare {} columns of '{}' with a single value",
                        columns.len(),
                        subject.entity()
                    )));
                }
                builder.push_columns(subject.alias(), &columns);
                builder.push_str(" = ");
                param.build(context, builder)?;
            }
            Predicate::In(subject, fragment) => {
                let subject_columns = subject.columns(context)?;
                let selected_columns = fragment.selection.columns(context)?;
                if subject_columns.len() != selected_columns.len() {
                    return Err(DatabaseError::InvalidMetadata(format!(
                        "'{}' ({} columns) cannot be matched against '{}' ({} columns)",
                        subject.entity(),
                        subject_columns.len(),
                        fragment.selection.entity(),
                        selected_columns.len()
                    )));
                }
                builder.push_columns(subject.alias(), &subject_columns);
                builder.push_str(" IN (");
                fragment.build(context, builder)?;
                builder.push_str(")");
            }
            Predicate::And(lhs, rhs) => {
                lhs.build(context, builder)?;
                builder.push_str(" AND ");
                rhs.build(context, builder)?;
            }
        }

        Ok(())
    }
}
