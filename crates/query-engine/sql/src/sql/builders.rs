//! Fluent builders for statements. Every method takes the statement by value and returns it,
//! so a base query can be cloned and refined independently.

use super::ast::{
    Alwaysness, Assignment, Delete, Expression, Join, Lock, OrderByElement, Select, SelectList,
    Update, Where,
};
use super::helpers;

/// WHERE clause combinators shared by SELECT, UPDATE and DELETE.
pub trait WhereHelpers: Sized {
    fn where_clause(&mut self) -> &mut Option<Where>;

    fn where_ref(&self) -> Option<&Where>;

    /// Add a condition, conjoined with any existing one.
    #[must_use]
    fn where_(self, predicate: Where) -> Self {
        self.and_where(predicate)
    }

    #[must_use]
    fn and_where(mut self, predicate: Where) -> Self {
        let slot = self.where_clause();
        *slot = Some(match slot.take() {
            None => predicate,
            Some(existing) => existing.and(predicate),
        });
        self
    }

    /// Disjoin with the existing condition. Without one, this is the only condition.
    #[must_use]
    fn or_where(mut self, predicate: Where) -> Self {
        let slot = self.where_clause();
        *slot = Some(match slot.take() {
            None => predicate,
            Some(existing) => existing.or(predicate),
        });
        self
    }

    #[must_use]
    fn where_not(self, predicate: Where) -> Self {
        self.and_where(Where::not(predicate))
    }

    #[must_use]
    fn and_where_not(self, predicate: Where) -> Self {
        self.and_where(Where::not(predicate))
    }

    #[must_use]
    fn or_where_not(self, predicate: Where) -> Self {
        self.or_where(Where::not(predicate))
    }

    /// The truth value of the WHERE clause. A missing clause always holds.
    fn where_alwaysness(&self) -> Alwaysness {
        self.where_ref().map_or(Alwaysness::Always, Where::alwaysness)
    }
}

impl WhereHelpers for Select {
    fn where_clause(&mut self) -> &mut Option<Where> {
        &mut self.where_
    }

    fn where_ref(&self) -> Option<&Where> {
        self.where_.as_ref()
    }
}

impl WhereHelpers for Update {
    fn where_clause(&mut self) -> &mut Option<Where> {
        &mut self.where_
    }

    fn where_ref(&self) -> Option<&Where> {
        self.where_.as_ref()
    }
}

impl WhereHelpers for Delete {
    fn where_clause(&mut self) -> &mut Option<Where> {
        &mut self.where_
    }

    fn where_ref(&self) -> Option<&Where> {
        self.where_.as_ref()
    }
}

fn push_join(joins: &mut Vec<Join>, join: Join) {
    if !joins.contains(&join) {
        joins.push(join);
    }
}

impl Select {
    /// Add an expression to the select list, replacing the default `*`.
    #[must_use]
    pub fn column(mut self, expression: impl Into<Expression>) -> Select {
        let expression = expression.into();
        if let SelectList::SelectList(list) = &mut self.select_list {
            list.push(expression);
        } else {
            self.select_list = SelectList::SelectList(vec![expression]);
        }
        self
    }

    /// Replace the select list.
    #[must_use]
    pub fn columns(mut self, expressions: Vec<Expression>) -> Select {
        self.select_list = SelectList::SelectList(expressions);
        self
    }

    /// Add a join. An equal join already present is not added twice.
    #[must_use]
    pub fn join(mut self, join: Join) -> Select {
        push_join(&mut self.joins, join);
        self
    }

    #[must_use]
    pub fn group_by(mut self, expression: impl Into<Expression>) -> Select {
        self.group_by.elements.push(expression.into());
        self
    }

    #[must_use]
    pub fn having(mut self, predicate: Where) -> Select {
        self.having = Some(match self.having.take() {
            None => predicate,
            Some(existing) => existing.and(predicate),
        });
        self
    }

    #[must_use]
    pub fn order_by(mut self, element: OrderByElement) -> Select {
        self.order_by.elements.push(element);
        self
    }

    #[must_use]
    pub fn clear_order_by(mut self) -> Select {
        self.order_by = helpers::empty_order_by();
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Select {
        self.limit.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u64) -> Select {
        self.limit.offset = Some(offset);
        self
    }

    #[must_use]
    pub fn clear_limit(mut self) -> Select {
        self.limit = helpers::empty_limit();
        self
    }

    #[must_use]
    pub fn lock(mut self, lock: Lock) -> Select {
        self.lock = Some(lock);
        self
    }

    /// Abort the statement server-side after this many milliseconds.
    #[must_use]
    pub fn max_execution_time(mut self, milliseconds: u64) -> Select {
        self.max_execution_time = Some(milliseconds);
        self
    }

    /// The explicit joins followed by the joins required by WHERE and HAVING.
    pub fn all_joins(&self) -> Vec<Join> {
        let mut joins = self.joins.clone();
        for predicate in self.where_.iter().chain(self.having.iter()) {
            for join in predicate.joins() {
                push_join(&mut joins, join);
            }
        }
        joins
    }
}

impl Update {
    #[must_use]
    pub fn set(mut self, column: &str, value: impl Into<Expression>) -> Update {
        self.set.push(helpers::assignment(column, value));
        self
    }

    #[must_use]
    pub fn assignment(mut self, assignment: Assignment) -> Update {
        self.set.push(assignment);
        self
    }

    /// Allow the update to change every row when its WHERE is missing or always holds.
    #[must_use]
    pub fn all_rows(mut self) -> Update {
        self.all_rows = true;
        self
    }

    #[must_use]
    pub fn join(mut self, join: Join) -> Update {
        push_join(&mut self.joins, join);
        self
    }

    pub fn all_joins(&self) -> Vec<Join> {
        let mut joins = self.joins.clone();
        if let Some(predicate) = &self.where_ {
            for join in predicate.joins() {
                push_join(&mut joins, join);
            }
        }
        joins
    }
}

impl Delete {
    /// Allow the delete to remove every row when its WHERE is missing or always holds.
    #[must_use]
    pub fn all_rows(mut self) -> Delete {
        self.all_rows = true;
        self
    }

    #[must_use]
    pub fn join(mut self, join: Join) -> Delete {
        push_join(&mut self.joins, join);
        self
    }

    pub fn all_joins(&self) -> Vec<Join> {
        let mut joins = self.joins.clone();
        if let Some(predicate) = &self.where_ {
            for join in predicate.joins() {
                push_join(&mut joins, join);
            }
        }
        joins
    }
}
