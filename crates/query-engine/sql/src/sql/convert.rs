/// Convert a SQL AST to a low-level SQL string.
use super::ast::*;
use super::error::Error;
use super::string::{Param, SQL};

/// The tables `Namespace::Default` and `Namespace::Parent` resolve to while rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespaces {
    pub default: Option<String>,
    pub parent: Option<String>,
}

impl Namespaces {
    /// The namespaces inside a statement whose FROM is `name`, rendered within `self`.
    fn enter(&self, name: &str) -> Namespaces {
        Namespaces {
            default: Some(name.to_string()),
            parent: self.default.clone(),
        }
    }
}

/// Render a top-level SELECT.
pub fn select_to_sql(select: &Select) -> Result<SQL, Error> {
    let mut sql = SQL::new();
    select.to_sql(&mut sql, &Namespaces::default())?;
    Ok(sql)
}

/// Render a top-level UPDATE.
pub fn update_to_sql(update: &Update) -> Result<SQL, Error> {
    let mut sql = SQL::new();
    update.to_sql(&mut sql, &Namespaces::default())?;
    Ok(sql)
}

/// Render a top-level DELETE.
pub fn delete_to_sql(delete: &Delete) -> Result<SQL, Error> {
    let mut sql = SQL::new();
    delete.to_sql(&mut sql, &Namespaces::default())?;
    Ok(sql)
}

/// Render a predicate on its own, resolving the default namespace to `table`.
pub fn where_to_sql(predicate: &Where, table: &str) -> Result<SQL, Error> {
    let mut sql = SQL::new();
    predicate.to_sql(&mut sql, &Namespaces::default().enter(table))?;
    Ok(sql)
}

// Convert to SQL strings

/// Append `keyword` and the predicate, unless the predicate always holds.
fn condition_to_sql(
    keyword: &str,
    predicate: Option<&Where>,
    sql: &mut SQL,
    namespaces: &Namespaces,
) -> Result<(), Error> {
    match predicate {
        None => Ok(()),
        Some(predicate) if predicate.alwaysness() == Alwaysness::Always => Ok(()),
        Some(predicate) => {
            sql.append_syntax(keyword);
            predicate.to_sql(sql, namespaces)
        }
    }
}

fn joins_to_sql(joins: &[Join], sql: &mut SQL, namespaces: &Namespaces) -> Result<(), Error> {
    for join in joins {
        sql.append_syntax(" ");
        join.to_sql(sql, namespaces)?;
    }
    Ok(())
}

fn expressions_to_sql(
    expressions: &[Expression],
    sql: &mut SQL,
    namespaces: &Namespaces,
) -> Result<(), Error> {
    for (index, expression) in expressions.iter().enumerate() {
        expression.to_sql(sql, namespaces)?;
        if index < (expressions.len() - 1) {
            sql.append_syntax(", ");
        }
    }
    Ok(())
}

impl SelectList {
    pub fn to_sql(&self, sql: &mut SQL, namespaces: &Namespaces) -> Result<(), Error> {
        match self {
            SelectList::SelectList(select_list) => {
                expressions_to_sql(select_list, sql, namespaces)
            }
            SelectList::SelectStar => Expression::Wildcard(Namespace::Default).to_sql(sql, namespaces),
        }
    }
}

impl Select {
    pub fn to_sql(&self, sql: &mut SQL, namespaces: &Namespaces) -> Result<(), Error> {
        let from = self.from.as_ref().ok_or(Error::MissingFrom)?;
        let inner = namespaces.enter(from.namespace());

        sql.append_syntax("SELECT ");

        if let Some(milliseconds) = self.max_execution_time {
            sql.append_syntax(&format!("/*+ MAX_EXECUTION_TIME({milliseconds}) */ "));
        }

        self.select_list.to_sql(sql, &inner)?;

        sql.append_syntax(" FROM ");
        from.to_sql(sql, namespaces)?;

        joins_to_sql(&self.all_joins(), sql, &inner)?;

        condition_to_sql(" WHERE ", self.where_.as_ref(), sql, &inner)?;

        self.group_by.to_sql(sql, &inner)?;

        condition_to_sql(" HAVING ", self.having.as_ref(), sql, &inner)?;

        self.order_by.to_sql(sql, &inner)?;

        self.limit.to_sql(sql);

        if let Some(lock) = &self.lock {
            lock.to_sql(sql);
        }
        Ok(())
    }
}

impl Update {
    pub fn to_sql(&self, sql: &mut SQL, namespaces: &Namespaces) -> Result<(), Error> {
        if self.set.is_empty() {
            return Err(Error::UpdateWithoutAssignments);
        }
        let inner = namespaces.enter(self.table.namespace());

        sql.append_syntax("UPDATE ");
        self.table.to_sql(sql);

        joins_to_sql(&self.all_joins(), sql, &inner)?;

        sql.append_syntax(" SET ");
        for (index, assignment) in self.set.iter().enumerate() {
            assignment.to_sql(sql, &inner)?;
            if index < (self.set.len() - 1) {
                sql.append_syntax(", ");
            }
        }

        condition_to_sql(" WHERE ", self.where_.as_ref(), sql, &inner)
    }
}

impl Assignment {
    pub fn to_sql(&self, sql: &mut SQL, namespaces: &Namespaces) -> Result<(), Error> {
        self.column.to_sql(sql, namespaces)?;
        sql.append_syntax(" = ");
        self.value.to_sql(sql, namespaces)
    }
}

impl Delete {
    pub fn to_sql(&self, sql: &mut SQL, namespaces: &Namespaces) -> Result<(), Error> {
        let inner = namespaces.enter(self.from.namespace());
        let joins = self.all_joins();

        sql.append_syntax("DELETE ");
        // MySQL needs the target named explicitly once there is more than one table.
        if !joins.is_empty() || self.from.alias.is_some() {
            sql.append_identifier(self.from.namespace());
            sql.append_syntax(" ");
        }
        sql.append_syntax("FROM ");
        self.from.to_sql(sql);

        joins_to_sql(&joins, sql, &inner)?;

        condition_to_sql(" WHERE ", self.where_.as_ref(), sql, &inner)
    }
}

impl From {
    pub fn to_sql(&self, sql: &mut SQL, namespaces: &Namespaces) -> Result<(), Error> {
        match &self {
            From::Table(table) => {
                table.to_sql(sql);
                Ok(())
            }
            From::Select { select, alias } => {
                sql.append_syntax("(");
                select.to_sql(sql, namespaces)?;
                sql.append_syntax(") AS ");
                sql.append_identifier(&alias.0);
                Ok(())
            }
        }
    }
}

impl TableReference {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_identifier(&self.name.0);
        if let Some(alias) = &self.alias {
            sql.append_syntax(" ");
            sql.append_identifier(&alias.0);
        }
    }
}

impl Join {
    pub fn to_sql(&self, sql: &mut SQL, namespaces: &Namespaces) -> Result<(), Error> {
        match self.kind {
            JoinKind::Inner => sql.append_syntax("JOIN "),
            JoinKind::Left => sql.append_syntax("LEFT JOIN "),
            JoinKind::Right => sql.append_syntax("RIGHT JOIN "),
        }
        self.table.to_sql(sql);
        sql.append_syntax(" ON ");
        self.on.to_sql(sql, namespaces)
    }
}

impl GroupBy {
    pub fn to_sql(&self, sql: &mut SQL, namespaces: &Namespaces) -> Result<(), Error> {
        if self.elements.is_empty() {
            return Ok(());
        }
        sql.append_syntax(" GROUP BY ");
        expressions_to_sql(&self.elements, sql, namespaces)
    }
}

impl OrderBy {
    pub fn to_sql(&self, sql: &mut SQL, namespaces: &Namespaces) -> Result<(), Error> {
        if self.elements.is_empty() {
            return Ok(());
        }
        sql.append_syntax(" ORDER BY ");
        for (index, element) in self.elements.iter().enumerate() {
            element.target.to_sql(sql, namespaces)?;
            match element.direction {
                OrderByDirection::Asc => sql.append_syntax(" ASC"),
                OrderByDirection::Desc => sql.append_syntax(" DESC"),
            }
            if index < (self.elements.len() - 1) {
                sql.append_syntax(", ");
            }
        }
        Ok(())
    }
}

impl Limit {
    pub fn to_sql(&self, sql: &mut SQL) {
        if let Some(limit) = self.limit {
            sql.append_syntax(&format!(" LIMIT {limit}"));
            match self.offset {
                None | Some(0) => {}
                Some(offset) => sql.append_syntax(&format!(" OFFSET {offset}")),
            }
        }
    }
}

impl Lock {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            Lock::ForUpdate => sql.append_syntax(" FOR UPDATE"),
            Lock::ForShare => sql.append_syntax(" FOR SHARE"),
        }
    }
}

// predicates

impl Where {
    /// Render the predicate. Constant predicates render as `TRUE` or `FALSE`.
    pub fn to_sql(&self, sql: &mut SQL, namespaces: &Namespaces) -> Result<(), Error> {
        match self.alwaysness() {
            Alwaysness::Always => {
                sql.append_syntax("TRUE");
                Ok(())
            }
            Alwaysness::Never => {
                sql.append_syntax("FALSE");
                Ok(())
            }
            Alwaysness::Unknown => self.unknown_to_sql(sql, namespaces),
        }
    }

    fn unknown_to_sql(&self, sql: &mut SQL, namespaces: &Namespaces) -> Result<(), Error> {
        match self {
            Where::And(_) => self.children_to_sql(" AND ", sql, namespaces),
            Where::Or(_) => self.children_to_sql(" OR ", sql, namespaces),
            Where::Not(inner) => inner.negated_to_sql(sql, namespaces),
            Where::Comparison {
                left,
                operator,
                right,
            } => comparison_to_sql(left, *operator, right, sql, namespaces),
            Where::Like {
                expression,
                pattern,
                negated,
            } => {
                expression.to_sql(sql, namespaces)?;
                sql.append_syntax(if *negated { " NOT LIKE " } else { " LIKE " });
                pattern.to_sql(sql, namespaces)
            }
            Where::Exists { select, negated } => {
                sql.append_syntax(if *negated { "NOT EXISTS (" } else { "EXISTS (" });
                select.to_sql(sql, namespaces)?;
                sql.append_syntax(")");
                Ok(())
            }
            Where::JsonContains { target, candidate } => {
                sql.append_syntax("JSON_CONTAINS(");
                target.to_sql(sql, namespaces)?;
                sql.append_syntax(", ");
                candidate.to_sql(sql, namespaces)?;
                sql.append_syntax(")");
                Ok(())
            }
            Where::JsonOverlaps { left, right } => {
                sql.append_syntax("JSON_OVERLAPS(");
                left.to_sql(sql, namespaces)?;
                sql.append_syntax(", ");
                right.to_sql(sql, namespaces)?;
                sql.append_syntax(")");
                Ok(())
            }
            Where::Join { predicate, .. } => predicate.to_sql(sql, namespaces),
        }
    }

    fn children_to_sql(
        &self,
        separator: &str,
        sql: &mut SQL,
        namespaces: &Namespaces,
    ) -> Result<(), Error> {
        let children = self.effective_children().unwrap_or_default();
        for (index, child) in children.iter().enumerate() {
            if child.is_single() {
                child.to_sql(sql, namespaces)?;
            } else {
                sql.append_syntax("(");
                child.to_sql(sql, namespaces)?;
                sql.append_syntax(")");
            }
            if index < (children.len() - 1) {
                sql.append_syntax(separator);
            }
        }
        Ok(())
    }

    /// Render the negation of this predicate, pushing NOT into leaves MySQL can invert.
    fn negated_to_sql(&self, sql: &mut SQL, namespaces: &Namespaces) -> Result<(), Error> {
        match self.alwaysness() {
            Alwaysness::Always => {
                sql.append_syntax("FALSE");
                return Ok(());
            }
            Alwaysness::Never => {
                sql.append_syntax("TRUE");
                return Ok(());
            }
            Alwaysness::Unknown => {}
        }
        match self {
            Where::Not(inner) => inner.to_sql(sql, namespaces),
            Where::Comparison {
                left,
                operator,
                right,
            } => match operator.inverse() {
                Some(inverse) => comparison_to_sql(left, inverse, right, sql, namespaces),
                None => self.wrapped_negation_to_sql(sql, namespaces),
            },
            Where::Like {
                expression,
                pattern,
                negated,
            } => Where::Like {
                expression: expression.clone(),
                pattern: pattern.clone(),
                negated: !negated,
            }
            .to_sql(sql, namespaces),
            Where::Exists { select, negated } => {
                sql.append_syntax(if *negated { "EXISTS (" } else { "NOT EXISTS (" });
                select.to_sql(sql, namespaces)?;
                sql.append_syntax(")");
                Ok(())
            }
            Where::Join { predicate, .. } => predicate.negated_to_sql(sql, namespaces),
            Where::And(_) | Where::Or(_) => {
                let children = self.effective_children().unwrap_or_default();
                match children.as_slice() {
                    [child] => child.negated_to_sql(sql, namespaces),
                    _ => self.wrapped_negation_to_sql(sql, namespaces),
                }
            }
            Where::JsonContains { .. } | Where::JsonOverlaps { .. } => {
                self.wrapped_negation_to_sql(sql, namespaces)
            }
        }
    }

    fn wrapped_negation_to_sql(&self, sql: &mut SQL, namespaces: &Namespaces) -> Result<(), Error> {
        sql.append_syntax("NOT (");
        self.to_sql(sql, namespaces)?;
        sql.append_syntax(")");
        Ok(())
    }
}

fn comparison_to_sql(
    left: &Expression,
    operator: ComparisonOperator,
    right: &Expression,
    sql: &mut SQL,
    namespaces: &Namespaces,
) -> Result<(), Error> {
    left.to_sql(sql, namespaces)?;
    match right {
        Expression::Value(Value::Null) => match operator {
            ComparisonOperator::Equal => sql.append_syntax(" IS NULL"),
            ComparisonOperator::NotEqual => sql.append_syntax(" IS NOT NULL"),
            ComparisonOperator::NullSafeEqual => sql.append_syntax(" <=> NULL"),
            _ => return Err(Error::UnsupportedNullComparison(operator)),
        },
        Expression::ValueList(_) => {
            match operator {
                ComparisonOperator::Equal => sql.append_syntax(" IN "),
                ComparisonOperator::NotEqual => sql.append_syntax(" NOT IN "),
                _ => return Err(Error::UnsupportedListComparison(operator)),
            }
            right.to_sql(sql, namespaces)?;
        }
        _ => {
            operator.to_sql(sql);
            right.to_sql(sql, namespaces)?;
        }
    }
    Ok(())
}

impl ComparisonOperator {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            ComparisonOperator::Equal => sql.append_syntax(" = "),
            ComparisonOperator::NotEqual => sql.append_syntax(" != "),
            ComparisonOperator::Greater => sql.append_syntax(" > "),
            ComparisonOperator::Less => sql.append_syntax(" < "),
            ComparisonOperator::GreaterOrEqual => sql.append_syntax(" >= "),
            ComparisonOperator::LessOrEqual => sql.append_syntax(" <= "),
            ComparisonOperator::NullSafeEqual => sql.append_syntax(" <=> "),
        }
    }
}

// scalars
impl Expression {
    pub fn to_sql(&self, sql: &mut SQL, namespaces: &Namespaces) -> Result<(), Error> {
        match &self {
            Expression::ColumnReference(column_reference) => {
                column_reference.to_sql(sql, namespaces)?;
            }
            Expression::Wildcard(namespace) => {
                sql.append_identifier(&namespace.resolve(namespaces, "*")?);
                sql.append_syntax(".*");
            }
            Expression::Value(value) => value.to_sql(sql),
            Expression::ValueList(values) => {
                sql.append_syntax("(");
                for (index, value) in values.iter().enumerate() {
                    value.to_sql(sql);
                    if index < (values.len() - 1) {
                        sql.append_syntax(", ");
                    }
                }
                sql.append_syntax(")");
            }
            Expression::Now => sql.append_syntax("NOW()"),
            Expression::Raw(raw) => sql.append_syntax(raw),
            Expression::JsonLiteral(literal) => literal.to_sql(sql),
            Expression::FunctionCall { function, args } => {
                function.to_sql(sql);
                sql.append_syntax("(");
                expressions_to_sql(args, sql, namespaces)?;
                sql.append_syntax(")");
            }
            Expression::Count(count_type) => {
                sql.append_syntax("COUNT(");
                match count_type {
                    CountType::Star => sql.append_syntax("*"),
                    CountType::Expression(expression) => expression.to_sql(sql, namespaces)?,
                }
                sql.append_syntax(")");
            }
            Expression::Distinct(expression) => {
                sql.append_syntax("DISTINCT ");
                expression.to_sql(sql, namespaces)?;
            }
            Expression::Cast { expression, r#type } => {
                sql.append_syntax("CAST(");
                expression.to_sql(sql, namespaces)?;
                sql.append_syntax(" AS ");
                r#type.to_sql(sql);
                sql.append_syntax(")");
            }
            Expression::Calculation {
                left,
                operator,
                right,
            } => {
                sql.append_syntax("(");
                left.to_sql(sql, namespaces)?;
                operator.to_sql(sql);
                right.to_sql(sql, namespaces)?;
                sql.append_syntax(")");
            }
            Expression::Age(expression) => {
                sql.append_syntax("TIMESTAMPDIFF(YEAR, ");
                expression.to_sql(sql, namespaces)?;
                sql.append_syntax(", CURDATE())");
            }
            Expression::If {
                condition,
                then,
                r#else,
            } => {
                sql.append_syntax("IF(");
                condition.to_sql(sql, namespaces)?;
                sql.append_syntax(", ");
                then.to_sql(sql, namespaces)?;
                sql.append_syntax(", ");
                r#else.to_sql(sql, namespaces)?;
                sql.append_syntax(")");
            }
            Expression::Aliased { expression, alias } => {
                expression.to_sql(sql, namespaces)?;
                sql.append_syntax(" AS ");
                sql.append_identifier(&alias.0);
            }
            Expression::JsonExtract { expression, path } => {
                sql.append_syntax("JSON_EXTRACT(");
                expression.to_sql(sql, namespaces)?;
                sql.append_syntax(", ");
                sql.append_param(Param::String(path.to_path_string()));
                sql.append_syntax(")");
            }
            Expression::JsonValue {
                expression,
                path,
                returning,
            } => {
                // The path must be a literal. One that needs backslashes is bound through
                // JSON_EXTRACT instead, and JSON_VALUE reads the extracted document.
                let path = path.to_path_string();
                sql.append_syntax("JSON_VALUE(");
                if path.contains('\\') {
                    sql.append_syntax("JSON_EXTRACT(");
                    expression.to_sql(sql, namespaces)?;
                    sql.append_syntax(", ");
                    sql.append_param(Param::String(path));
                    sql.append_syntax("),");
                    sql.append_string_literal("$")?;
                } else {
                    expression.to_sql(sql, namespaces)?;
                    sql.append_syntax(",");
                    sql.append_string_literal(&path)?;
                }
                if let Some(returning) = returning {
                    sql.append_syntax(" RETURNING ");
                    returning.to_sql(sql);
                    sql.append_syntax(" ERROR ON ERROR");
                }
                sql.append_syntax(")");
            }
            Expression::JsonSearch { expression, needle } => {
                sql.append_syntax("JSON_SEARCH(");
                expression.to_sql(sql, namespaces)?;
                sql.append_syntax(", 'one', ");
                needle.to_sql(sql, namespaces)?;
                sql.append_syntax(")");
            }
            Expression::CorrelatedSubSelect(select) => {
                sql.append_syntax("(");
                select.to_sql(sql, namespaces)?;
                sql.append_syntax(")");
            }
        }
        Ok(())
    }
}

impl Namespace {
    fn resolve(&self, namespaces: &Namespaces, column: &str) -> Result<String, Error> {
        match self {
            Namespace::Default => namespaces
                .default
                .clone()
                .ok_or_else(|| Error::MissingDefaultNamespace(column.to_string())),
            Namespace::Parent => namespaces
                .parent
                .clone()
                .ok_or_else(|| Error::MissingParentNamespace(column.to_string())),
            Namespace::Named(alias) => Ok(alias.0.clone()),
        }
    }
}

impl ColumnReference {
    pub fn to_sql(&self, sql: &mut SQL, namespaces: &Namespaces) -> Result<(), Error> {
        sql.append_identifier(&self.namespace.resolve(namespaces, &self.name.0)?);
        sql.append_syntax(".");
        sql.append_identifier(&self.name.0);
        Ok(())
    }
}

impl Value {
    pub fn to_sql(&self, sql: &mut SQL) {
        match &self {
            Value::Null => sql.append_syntax("NULL"),
            Value::Integer(i) => sql.append_param(Param::Integer(*i)),
            Value::Float(f) => sql.append_param(Param::Float(*f)),
            Value::Boolean(b) => sql.append_param(Param::Boolean(*b)),
            Value::String(s) => sql.append_param(Param::String(s.clone())),
            Value::DateTime(d) => sql.append_param(Param::DateTime(*d)),
            Value::Json(j) => sql.append_param(Param::Json(j.clone())),
        }
    }
}

impl JsonLiteral {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            JsonLiteral::Null => sql.append_syntax("CAST('null' AS JSON)"),
            JsonLiteral::True => sql.append_syntax("CAST('true' AS JSON)"),
            JsonLiteral::False => sql.append_syntax("CAST('false' AS JSON)"),
        }
    }
}

impl Function {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            Function::Concat => sql.append_syntax("CONCAT"),
            Function::Coalesce => sql.append_syntax("COALESCE"),
            Function::Greatest => sql.append_syntax("GREATEST"),
            Function::IfNull => sql.append_syntax("IFNULL"),
            Function::Lower => sql.append_syntax("LOWER"),
            Function::CharLength => sql.append_syntax("CHAR_LENGTH"),
            Function::Sum => sql.append_syntax("SUM"),
            Function::Min => sql.append_syntax("MIN"),
            Function::Max => sql.append_syntax("MAX"),
            Function::JsonUnquote => sql.append_syntax("JSON_UNQUOTE"),
            Function::JsonLength => sql.append_syntax("JSON_LENGTH"),
            Function::Unknown(name) => sql.append_syntax(name),
        }
    }
}

impl ArithmeticOperator {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            ArithmeticOperator::Plus => sql.append_syntax(" + "),
            ArithmeticOperator::Minus => sql.append_syntax(" - "),
            ArithmeticOperator::Multiply => sql.append_syntax(" * "),
        }
    }
}

impl CastType {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            CastType::Char => sql.append_syntax("CHAR"),
            CastType::Signed => sql.append_syntax("SIGNED"),
            CastType::Unsigned => sql.append_syntax("UNSIGNED"),
            CastType::Json => sql.append_syntax("JSON"),
            CastType::Date => sql.append_syntax("DATE"),
            CastType::DateTime => sql.append_syntax("DATETIME"),
        }
    }
}

impl JsonReturning {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            JsonReturning::Char => sql.append_syntax("CHAR CHARACTER SET utf8mb4"),
            JsonReturning::Signed => sql.append_syntax("SIGNED"),
            JsonReturning::Unsigned => sql.append_syntax("UNSIGNED"),
            JsonReturning::Double => sql.append_syntax("DOUBLE"),
            JsonReturning::DateTime => sql.append_syntax("DATETIME"),
        }
    }
}
