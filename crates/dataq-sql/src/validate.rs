//! Validation gate in front of the query engine
//!
//! Checks, in order: exactly one statement (no `;` outside string literals),
//! a read-only leading verb (`SELECT`/`WITH`), and — when sqlparser can parse
//! the text — that every table reference is the allowed table or a CTE
//! defined in the query. Column existence and types are left to the engine,
//! whose diagnostics drive the retry prompt. The input is returned unmodified
//! on success; there is no rewriting.

use sqlparser::ast::{
    Cte, Join, Query, SetExpr, Statement, TableFactor, TableWithJoins,
};
use sqlparser::dialect::DuckDbDialect;
use sqlparser::parser::Parser;
use thiserror::Error;

use crate::CandidateSql;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("empty query")]
    Empty,

    #[error("multiple statements are not allowed")]
    MultipleStatements,

    #[error("non-read-only verb: {verb}")]
    NonReadOnlyVerb { verb: String },

    #[error("query references table '{table}'; only the active dataset table is allowed")]
    ForeignTable { table: String },
}

/// SQL that passed the gate. Only [`validate`] can construct this, so the
/// executor's signature guarantees nothing unvalidated reaches the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSql(String);

impl ValidatedSql {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for ValidatedSql {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn validate(
    candidate: &CandidateSql,
    allowed_table: &str,
) -> Result<ValidatedSql, ValidationError> {
    let sql = candidate.as_str().trim();
    if sql.is_empty() {
        return Err(ValidationError::Empty);
    }
    if contains_separator(sql) {
        return Err(ValidationError::MultipleStatements);
    }

    let verb = leading_verb(sql);
    if !verb.eq_ignore_ascii_case("SELECT") && !verb.eq_ignore_ascii_case("WITH") {
        return Err(ValidationError::NonReadOnlyVerb {
            verb: verb.to_ascii_uppercase(),
        });
    }

    check_table_references(sql, allowed_table)?;
    Ok(ValidatedSql(sql.to_string()))
}

/// Statement separator outside single/double-quoted literals.
fn contains_separator(sql: &str) -> bool {
    let mut in_single = false;
    let mut in_double = false;
    for ch in sql.chars() {
        match ch {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            ';' if !in_single && !in_double => return true,
            _ => {}
        }
    }
    false
}

/// First keyword of the statement. Leading parentheses are skipped so
/// `(SELECT ...)` is classified by its verb, not as punctuation.
fn leading_verb(sql: &str) -> String {
    let rest = sql.trim_start_matches(|c: char| c.is_whitespace() || c == '(');
    let verb: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphabetic() || *c == '_')
        .collect();
    if verb.is_empty() {
        rest.chars().take(1).collect()
    } else {
        verb
    }
}

/// Best-effort static walk of table references. When sqlparser cannot parse
/// the candidate the walk is skipped: the per-request catalog exposes only
/// the dataset view, so a foreign reference fails in the engine instead and
/// drives the retry.
fn check_table_references(sql: &str, allowed_table: &str) -> Result<(), ValidationError> {
    let statements = match Parser::parse_sql(&DuckDbDialect {}, sql) {
        Ok(statements) => statements,
        Err(_) => return Ok(()),
    };
    if statements.len() > 1 {
        return Err(ValidationError::MultipleStatements);
    }
    let Some(statement) = statements.first() else {
        return Ok(());
    };
    match statement {
        Statement::Query(query) => {
            check_query(query, allowed_table, &[])
        }
        other => Err(ValidationError::NonReadOnlyVerb {
            verb: statement_verb(other).to_string(),
        }),
    }
}

/// A statement that got past the lexical verb check but is not a query,
/// e.g. `WITH t AS (...) INSERT INTO ...`.
fn statement_verb(statement: &Statement) -> &'static str {
    match statement {
        Statement::Insert(_) => "INSERT",
        Statement::Update { .. } => "UPDATE",
        Statement::Delete(_) => "DELETE",
        Statement::Drop { .. } => "DROP",
        Statement::AlterTable { .. } => "ALTER",
        _ => "NON-SELECT",
    }
}

fn check_query(
    query: &Query,
    allowed_table: &str,
    outer_ctes: &[String],
) -> Result<(), ValidationError> {
    let mut ctes: Vec<String> = outer_ctes.to_vec();
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            check_cte(cte, allowed_table, &ctes)?;
            ctes.push(cte.alias.name.value.to_ascii_lowercase());
        }
    }
    check_set_expr(&query.body, allowed_table, &ctes)
}

fn check_cte(cte: &Cte, allowed_table: &str, ctes: &[String]) -> Result<(), ValidationError> {
    check_query(&cte.query, allowed_table, ctes)
}

fn check_set_expr(
    body: &SetExpr,
    allowed_table: &str,
    ctes: &[String],
) -> Result<(), ValidationError> {
    match body {
        SetExpr::Select(select) => {
            for table in &select.from {
                check_table_with_joins(table, allowed_table, ctes)?;
            }
            Ok(())
        }
        SetExpr::Query(query) => check_query(query, allowed_table, ctes),
        SetExpr::SetOperation { left, right, .. } => {
            check_set_expr(left, allowed_table, ctes)?;
            check_set_expr(right, allowed_table, ctes)
        }
        SetExpr::Values(_) => Ok(()),
        // A write wrapped in a CTE prologue parses as a query body.
        SetExpr::Insert(_) => Err(ValidationError::NonReadOnlyVerb {
            verb: "INSERT".to_string(),
        }),
        SetExpr::Update(_) => Err(ValidationError::NonReadOnlyVerb {
            verb: "UPDATE".to_string(),
        }),
        // `TABLE name` shorthand for `SELECT * FROM name`.
        SetExpr::Table(table) => {
            let name = table.table_name.clone().unwrap_or_default();
            if table.schema_name.is_none() && name.eq_ignore_ascii_case(allowed_table) {
                Ok(())
            } else {
                Err(ValidationError::ForeignTable { table: name })
            }
        }
    }
}

fn check_table_with_joins(
    table: &TableWithJoins,
    allowed_table: &str,
    ctes: &[String],
) -> Result<(), ValidationError> {
    check_table_factor(&table.relation, allowed_table, ctes)?;
    for Join { relation, .. } in &table.joins {
        check_table_factor(relation, allowed_table, ctes)?;
    }
    Ok(())
}

fn check_table_factor(
    factor: &TableFactor,
    allowed_table: &str,
    ctes: &[String],
) -> Result<(), ValidationError> {
    match factor {
        TableFactor::Table { name, args, .. } => {
            let rendered = name.to_string();
            // Table functions (read_parquet, read_csv_auto, ...) reach
            // outside the dataset and are foreign by definition.
            if args.is_some() {
                return Err(ValidationError::ForeignTable { table: rendered });
            }
            let parts: Vec<String> = name
                .0
                .iter()
                .map(|ident| ident.value.to_ascii_lowercase())
                .collect();
            let allowed = parts.len() == 1
                && (parts[0] == allowed_table.to_ascii_lowercase()
                    || ctes.contains(&parts[0]));
            if allowed {
                Ok(())
            } else {
                Err(ValidationError::ForeignTable { table: rendered })
            }
        }
        TableFactor::Derived { subquery, .. } => check_query(subquery, allowed_table, ctes),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => check_table_with_joins(table_with_joins, allowed_table, ctes),
        other => Err(ValidationError::ForeignTable {
            table: other.to_string(),
        }),
    }
}
