use postgres_protocol::escape::escape_identifier;

/// Split a relation name into schema and bare name.
///
/// An explicit `schema.name` qualification wins; otherwise the connection's
/// pinned schema applies, falling back to `public`.
pub fn schema_and_name(pinned_schema: Option<&str>, relation: &str) -> (String, String) {
    match relation.split_once('.') {
        Some((schema, name)) => (schema.to_string(), name.to_string()),
        None => (
            pinned_schema.unwrap_or("public").to_string(),
            relation.to_string(),
        ),
    }
}

/// Quote a possibly schema-qualified relation name for interpolation into DDL.
pub fn quote_relation(relation: &str) -> String {
    match relation.split_once('.') {
        Some((schema, name)) => {
            format!("{}.{}", escape_identifier(schema), escape_identifier(name))
        }
        None => escape_identifier(relation),
    }
}

/// Trim a declared view query: surrounding whitespace and at most one
/// trailing semicolon, so the body can be embedded in a larger statement.
pub fn normalize_query(sql: &str) -> &str {
    let trimmed = sql.trim();
    match trimmed.strip_suffix(';') {
        Some(stripped) => stripped.trim_end(),
        None => trimmed,
    }
}
