//! Column identifiers.

use crate::{PgError, PgResult};

/// Validates a column reference for interpolation into SQL.
///
/// Paginated queries select from the base query as a derived table, so only
/// plain output column names (`[a-z_][a-z0-9_]*`) can be referenced.
/// Qualified names are rejected; alias the column in the base query instead.
/// Uppercase names are rejected because unquoted aliases fold to lowercase.
pub fn validate_column_name(name: &str) -> PgResult<()> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(PgError::invalid_sql("column name cannot be empty"));
    };

    if name.bytes().any(|b| b.is_ascii_uppercase()) {
        return Err(PgError::invalid_sql(format!(
            "column name '{name}' must match the lowercase output column name"
        )));
    }

    if !first.is_ascii_alphabetic() && first != '_' {
        return Err(PgError::invalid_sql(format!("invalid column name '{name}'")));
    }

    for ch in chars {
        if ch == '.' {
            return Err(PgError::invalid_sql(format!(
                "qualified column name '{name}' cannot be referenced, alias it in the base query"
            )));
        }
        if !ch.is_ascii_alphanumeric() && ch != '_' {
            return Err(PgError::invalid_sql(format!("invalid column name '{name}'")));
        }
    }

    Ok(())
}

/// Quotes a validated column name as a PostgreSQL identifier.
///
/// Embedded double quotes are doubled.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Validates and quotes a column name.
pub(crate) fn column_reference(name: &str) -> PgResult<String> {
    validate_column_name(name)?;
    Ok(quote_identifier(name))
}
