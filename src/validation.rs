//! Validation for names that end up interpolated into DDL.
//!
//! Relation names and index column lists come from view declarations, not
//! from users at runtime, but they are still checked against PostgreSQL
//! identifier rules before any statement is built from them.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ViewError, ViewResult};

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex"));

/// Validate a single unqualified PostgreSQL identifier.
pub fn validate_identifier(identifier: &str, name: &str) -> ViewResult<()> {
    if IDENTIFIER_RE.is_match(identifier) {
        Ok(())
    } else {
        Err(ViewError::InvalidRelationName {
            name: name.to_string(),
            reason: format!("'{identifier}' is not a valid identifier"),
        })
    }
}

/// Validate a relation name, optionally qualified as `schema.name`.
pub fn validate_relation_name(relation: &str) -> ViewResult<()> {
    let mut parts = relation.split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(name), None, None) => validate_identifier(name, relation),
        (Some(schema), Some(name), None) => {
            validate_identifier(schema, relation)?;
            validate_identifier(name, relation)
        }
        _ => Err(ViewError::InvalidRelationName {
            name: relation.to_string(),
            reason: "expected 'name' or 'schema.name'".to_string(),
        }),
    }
}

/// Validate a comma-separated list of column identifiers, as declared for a
/// concurrent-refresh index.
pub fn validate_column_list(columns: &str) -> ViewResult<()> {
    if columns.trim().is_empty() {
        return Err(ViewError::InvalidColumnList {
            columns: columns.to_string(),
            reason: "column list is empty".to_string(),
        });
    }
    for column in columns.split(',') {
        if !IDENTIFIER_RE.is_match(column.trim()) {
            return Err(ViewError::InvalidColumnList {
                columns: columns.to_string(),
                reason: format!("'{}' is not a valid column name", column.trim()),
            });
        }
    }
    Ok(())
}
