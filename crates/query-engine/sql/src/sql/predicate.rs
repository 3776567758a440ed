//! The WHERE algebra: combinators, constant folding of truth values, and negation.

use super::ast::{
    Alwaysness, ComparisonOperator, Expression, Join, Select, Value, Where,
};

impl Alwaysness {
    /// Conjunction of two truth values.
    pub fn and(self, other: Alwaysness) -> Alwaysness {
        match (self, other) {
            (Alwaysness::Never, _) | (_, Alwaysness::Never) => Alwaysness::Never,
            (Alwaysness::Always, Alwaysness::Always) => Alwaysness::Always,
            _ => Alwaysness::Unknown,
        }
    }

    /// Disjunction of two truth values.
    pub fn or(self, other: Alwaysness) -> Alwaysness {
        match (self, other) {
            (Alwaysness::Always, _) | (_, Alwaysness::Always) => Alwaysness::Always,
            (Alwaysness::Never, Alwaysness::Never) => Alwaysness::Never,
            _ => Alwaysness::Unknown,
        }
    }
}

impl std::ops::Not for Alwaysness {
    type Output = Alwaysness;

    fn not(self) -> Alwaysness {
        match self {
            Alwaysness::Always => Alwaysness::Never,
            Alwaysness::Never => Alwaysness::Always,
            Alwaysness::Unknown => Alwaysness::Unknown,
        }
    }
}

impl ComparisonOperator {
    /// The operator that holds exactly when this one does not, if MySQL has one.
    ///
    /// `<=>` has no negated form.
    pub fn inverse(self) -> Option<ComparisonOperator> {
        match self {
            ComparisonOperator::Equal => Some(ComparisonOperator::NotEqual),
            ComparisonOperator::NotEqual => Some(ComparisonOperator::Equal),
            ComparisonOperator::Greater => Some(ComparisonOperator::LessOrEqual),
            ComparisonOperator::LessOrEqual => Some(ComparisonOperator::Greater),
            ComparisonOperator::Less => Some(ComparisonOperator::GreaterOrEqual),
            ComparisonOperator::GreaterOrEqual => Some(ComparisonOperator::Less),
            ComparisonOperator::NullSafeEqual => None,
        }
    }
}

impl Where {
    /// The empty conjunction, which always holds.
    pub fn always() -> Where {
        Where::And(vec![])
    }

    /// The empty disjunction, which never holds.
    pub fn never() -> Where {
        Where::Or(vec![])
    }

    pub fn compare(
        left: impl Into<Expression>,
        operator: ComparisonOperator,
        right: impl Into<Expression>,
    ) -> Where {
        Where::Comparison {
            left: left.into(),
            operator,
            right: right.into(),
        }
    }

    pub fn eq(left: impl Into<Expression>, right: impl Into<Expression>) -> Where {
        Where::compare(left, ComparisonOperator::Equal, right)
    }

    pub fn neq(left: impl Into<Expression>, right: impl Into<Expression>) -> Where {
        Where::compare(left, ComparisonOperator::NotEqual, right)
    }

    pub fn gt(left: impl Into<Expression>, right: impl Into<Expression>) -> Where {
        Where::compare(left, ComparisonOperator::Greater, right)
    }

    pub fn lt(left: impl Into<Expression>, right: impl Into<Expression>) -> Where {
        Where::compare(left, ComparisonOperator::Less, right)
    }

    pub fn gte(left: impl Into<Expression>, right: impl Into<Expression>) -> Where {
        Where::compare(left, ComparisonOperator::GreaterOrEqual, right)
    }

    pub fn lte(left: impl Into<Expression>, right: impl Into<Expression>) -> Where {
        Where::compare(left, ComparisonOperator::LessOrEqual, right)
    }

    pub fn null_safe_eq(left: impl Into<Expression>, right: impl Into<Expression>) -> Where {
        Where::compare(left, ComparisonOperator::NullSafeEqual, right)
    }

    pub fn is_null(expression: impl Into<Expression>) -> Where {
        Where::eq(expression, Value::Null)
    }

    pub fn is_not_null(expression: impl Into<Expression>) -> Where {
        Where::neq(expression, Value::Null)
    }

    /// `expression IN (values)`. An empty list never matches.
    pub fn is_in(expression: impl Into<Expression>, values: Vec<Value>) -> Where {
        Where::eq(expression, Expression::ValueList(values))
    }

    pub fn like(expression: impl Into<Expression>, pattern: impl Into<Expression>) -> Where {
        Where::Like {
            expression: expression.into(),
            pattern: pattern.into(),
            negated: false,
        }
    }

    pub fn exists(select: Select) -> Where {
        Where::Exists {
            select: Box::new(select),
            negated: false,
        }
    }

    pub fn json_contains(target: impl Into<Expression>, candidate: impl Into<Expression>) -> Where {
        Where::JsonContains {
            target: target.into(),
            candidate: candidate.into(),
        }
    }

    pub fn json_overlaps(left: impl Into<Expression>, right: impl Into<Expression>) -> Where {
        Where::JsonOverlaps {
            left: left.into(),
            right: right.into(),
        }
    }

    /// A predicate that needs `join` in the statement it ends up in.
    pub fn join(join: Join, predicate: Where, relation_always_exists: bool) -> Where {
        Where::Join {
            join: Box::new(join),
            predicate: Box::new(predicate),
            relation_always_exists,
        }
    }

    pub fn not(predicate: Where) -> Where {
        Where::Not(Box::new(predicate))
    }

    /// Conjoin, flattening into an existing conjunction on the left.
    #[must_use]
    pub fn and(self, other: Where) -> Where {
        match self {
            Where::And(mut children) => {
                children.push(other);
                Where::And(children)
            }
            this => Where::And(vec![this, other]),
        }
    }

    /// Disjoin, flattening into an existing disjunction on the left.
    #[must_use]
    pub fn or(self, other: Where) -> Where {
        match self {
            Where::Or(mut children) => {
                children.push(other);
                Where::Or(children)
            }
            this => Where::Or(vec![this, other]),
        }
    }

    /// Whether this predicate is constant, without looking at any rows.
    pub fn alwaysness(&self) -> Alwaysness {
        match self {
            Where::And(children) => children
                .iter()
                .fold(Alwaysness::Always, |acc, child| acc.and(child.alwaysness())),
            Where::Or(children) => children
                .iter()
                .fold(Alwaysness::Never, |acc, child| acc.or(child.alwaysness())),
            Where::Not(inner) => !inner.alwaysness(),
            Where::Comparison {
                operator, right, ..
            } => match (operator, right) {
                (ComparisonOperator::Equal, Expression::ValueList(values)) if values.is_empty() => {
                    Alwaysness::Never
                }
                (ComparisonOperator::NotEqual, Expression::ValueList(values))
                    if values.is_empty() =>
                {
                    Alwaysness::Always
                }
                _ => Alwaysness::Unknown,
            },
            Where::Exists { select, negated } => {
                let exists = match &select.where_ {
                    Some(predicate) if predicate.alwaysness() == Alwaysness::Never => {
                        Alwaysness::Never
                    }
                    _ => Alwaysness::Unknown,
                };
                if *negated {
                    !exists
                } else {
                    exists
                }
            }
            Where::Like { .. } | Where::JsonContains { .. } | Where::JsonOverlaps { .. } => {
                Alwaysness::Unknown
            }
            Where::Join { predicate, .. } => predicate.alwaysness(),
        }
    }

    /// Children of a combinator that still matter once constants are folded away.
    pub(crate) fn effective_children(&self) -> Option<Vec<&Where>> {
        match self {
            Where::And(children) => Some(
                children
                    .iter()
                    .filter(|child| child.alwaysness() != Alwaysness::Always)
                    .collect(),
            ),
            Where::Or(children) => Some(
                children
                    .iter()
                    .filter(|child| child.alwaysness() != Alwaysness::Never)
                    .collect(),
            ),
            Where::Join { predicate, .. } => Some(vec![predicate]),
            _ => None,
        }
    }

    /// Whether the rendered predicate can be embedded next to AND or OR without parentheses.
    pub fn is_single(&self) -> bool {
        if self.alwaysness() != Alwaysness::Unknown {
            return true;
        }
        match self.effective_children() {
            Some(children) => match children.as_slice() {
                [child] => child.is_single(),
                _ => false,
            },
            None => true,
        }
    }

    /// Joins this predicate needs, in the order they appear, without duplicates.
    pub fn joins(&self) -> Vec<Join> {
        let mut joins = vec![];
        self.collect_joins(&mut joins);
        joins
    }

    pub(crate) fn collect_joins(&self, joins: &mut Vec<Join>) {
        match self {
            Where::And(children) | Where::Or(children) => {
                for child in children {
                    child.collect_joins(joins);
                }
            }
            Where::Not(inner) => inner.collect_joins(joins),
            Where::Join {
                join,
                predicate,
                relation_always_exists,
            } => {
                let droppable =
                    *relation_always_exists && predicate.alwaysness() == Alwaysness::Always;
                if !droppable && !joins.contains(join) {
                    joins.push((**join).clone());
                }
                predicate.collect_joins(joins);
            }
            Where::Comparison { .. }
            | Where::Like { .. }
            | Where::Exists { .. }
            | Where::JsonContains { .. }
            | Where::JsonOverlaps { .. } => {}
        }
    }
}
