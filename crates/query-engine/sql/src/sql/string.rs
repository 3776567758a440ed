//! Type definitions of a low-level SQL string representation.

use chrono::{DateTime, Utc};

use super::error::Error;

/// A low-level SQL string with positional `?` placeholders and their parameters,
/// in placeholder order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SQL {
    pub sql: String,
    pub params: Vec<Param>,
}

/// A parameter bound to a `?` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    DateTime(DateTime<Utc>),
    Json(serde_json::Value),
}

impl SQL {
    /// Create an empty SQL string.
    pub fn new() -> SQL {
        SQL::default()
    }

    /// Append a SQL syntax fragment. Never pass user input here.
    pub fn append_syntax(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    /// Append an identifier, quoted with backticks.
    pub fn append_identifier(&mut self, identifier: &str) {
        self.sql.push('`');
        self.sql.push_str(&identifier.replace('`', "``"));
        self.sql.push('`');
    }

    /// Append a placeholder and record its parameter.
    pub fn append_param(&mut self, param: Param) {
        self.sql.push('?');
        self.params.push(param);
    }

    /// Append a single quoted string literal. Only `'` is escaped, by doubling it, which reads
    /// the same under every `sql_mode`. A backslash is an escape character under some modes and
    /// not others, so literals containing one are refused; bind those as parameters instead.
    pub fn append_string_literal(&mut self, literal: &str) -> Result<(), Error> {
        if literal.contains('\\') {
            return Err(Error::BackslashInLiteral(literal.to_string()));
        }
        self.sql.push('\'');
        self.sql.push_str(&literal.replace('\'', "''"));
        self.sql.push('\'');
        Ok(())
    }

    /// Append another rendered fragment, keeping its parameters aligned.
    pub fn append(&mut self, other: SQL) {
        self.sql.push_str(&other.sql);
        self.params.extend(other.params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_escape_backticks() {
        let mut sql = SQL::new();
        sql.append_identifier("we`ird");
        assert_eq!(sql.sql, "`we``ird`");
    }

    #[test]
    fn string_literals_cannot_be_closed_early() {
        let mut sql = SQL::new();
        sql.append_string_literal(r#"$."x') OR 1=1 -- ""#).unwrap();
        assert_eq!(sql.sql, r#"'$."x'') OR 1=1 -- "'"#);
    }

    #[test]
    fn string_literals_refuse_backslashes() {
        let mut sql = SQL::new();
        assert_eq!(
            sql.append_string_literal(r"a\"),
            Err(Error::BackslashInLiteral(r"a\".to_string()))
        );
        assert_eq!(sql.sql, "");
    }

    #[test]
    fn appending_keeps_params_in_order() {
        let mut a = SQL::new();
        a.append_param(Param::Integer(1));
        let mut b = SQL::new();
        b.append_syntax(" AND ");
        b.append_param(Param::String("two".to_string()));
        a.append(b);
        assert_eq!(a.sql, "? AND ?");
        assert_eq!(
            a.params,
            vec![Param::Integer(1), Param::String("two".to_string())]
        );
    }
}
