//! Warehouse identifiers and SQL literal escaping.
//!
//! Every name that ends up in DDL text passes through [`Identifier`], and every
//! string value passes through [`quote_literal`]. Nothing else is allowed to
//! build SQL fragments from user-declared input.
//!
//! # Resolution Rules
//!
//! Snowflake folds unquoted identifiers to upper case and keeps quoted ones
//! verbatim. An identifier made only of letters, digits, `_` and `$` (not
//! starting with a digit or `$`) is emitted unquoted and resolves to its upper
//! case form; anything else is double-quoted with embedded quotes doubled and
//! resolves to itself.
//!
//! | declared              | SQL                      | stored as              |
//! |-----------------------|--------------------------|------------------------|
//! | `customer_profile$1_0`| `customer_profile$1_0`   | `CUSTOMER_PROFILE$1_0` |
//! | `my view`             | `"my view"`              | `my view`              |
//! | `a"b`                 | `"a""b"`                 | `a"b`                  |

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{Error, Result};

/// Maximum identifier length accepted by the warehouse.
pub const MAX_IDENTIFIER_LEN: usize = 255;

/// A single warehouse identifier (database, schema, object, tag or warehouse name).
///
/// Equality and hashing follow the warehouse's resolution rules, so
/// `customer` and `CUSTOMER` are the same identifier while names that must be
/// quoted (`my customer`) are compared verbatim.
#[derive(Debug, Clone)]
pub struct Identifier {
    raw: String,
    quoted: bool,
}

impl Identifier {
    /// Creates a new identifier from its declared spelling.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty, too long, or contains control
    /// characters.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();

        if raw.trim().is_empty() {
            return Err(Error::invalid_identifier("identifier cannot be empty"));
        }
        if raw.len() > MAX_IDENTIFIER_LEN {
            return Err(Error::invalid_identifier(format!(
                "identifier is too long ({} > {MAX_IDENTIFIER_LEN} bytes)",
                raw.len()
            )));
        }
        if raw.chars().any(char::is_control) {
            return Err(Error::invalid_identifier(format!(
                "identifier contains control characters: {raw:?}"
            )));
        }

        Ok(Self { raw, quoted: false })
    }

    /// Creates an identifier from a name as the warehouse reports it.
    ///
    /// `SHOW` output is already resolved: an upper-case simple name stays
    /// unquoted, anything else is kept verbatim and always quoted.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as [`Self::new`].
    pub fn from_stored(stored: impl Into<String>) -> Result<Self> {
        let mut ident = Self::new(stored)?;
        ident.quoted = ident.raw.to_ascii_uppercase() != ident.raw;
        Ok(ident)
    }

    /// Returns the identifier as declared.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns true if the identifier can be emitted without quotes.
    #[must_use]
    pub fn is_simple(&self) -> bool {
        !self.quoted && is_simple_identifier(&self.raw)
    }

    /// Renders the identifier for inclusion in SQL text.
    #[must_use]
    pub fn to_sql(&self) -> String {
        if self.is_simple() {
            self.raw.clone()
        } else {
            format!("\"{}\"", self.raw.replace('"', "\"\""))
        }
    }

    /// Returns the name the warehouse stores for this identifier.
    #[must_use]
    pub fn resolved(&self) -> String {
        if self.is_simple() {
            self.raw.to_ascii_uppercase()
        } else {
            self.raw.clone()
        }
    }

    /// Returns true if `stored` (a name as reported by `SHOW`) refers to this identifier.
    #[must_use]
    pub fn matches_stored(&self, stored: &str) -> bool {
        self.resolved() == stored
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.resolved() == other.resolved()
    }
}

impl Eq for Identifier {}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.resolved().hash(state);
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

/// A fully qualified `database.schema.name` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    database: Identifier,
    schema: Identifier,
    name: Identifier,
}

impl QualifiedName {
    /// Creates a new qualified name.
    #[must_use]
    pub fn new(database: Identifier, schema: Identifier, name: Identifier) -> Self {
        Self {
            database,
            schema,
            name,
        }
    }

    /// Returns the database part.
    #[must_use]
    pub fn database(&self) -> &Identifier {
        &self.database
    }

    /// Returns the schema part.
    #[must_use]
    pub fn schema(&self) -> &Identifier {
        &self.schema
    }

    /// Returns the object name part.
    #[must_use]
    pub fn name(&self) -> &Identifier {
        &self.name
    }

    /// Renders `database.schema` for `IN SCHEMA` clauses.
    #[must_use]
    pub fn schema_sql(&self) -> String {
        format!("{}.{}", self.database.to_sql(), self.schema.to_sql())
    }

    /// Renders the full three-part name.
    #[must_use]
    pub fn to_sql(&self) -> String {
        format!("{}.{}", self.schema_sql(), self.name.to_sql())
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

/// Renders `value` as a single-quoted SQL string literal.
///
/// Backslashes and single quotes are escaped, so JSON tag values and free-form
/// comments survive the round trip unchanged.
#[must_use]
pub fn quote_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn is_simple_identifier(raw: &str) -> bool {
    let mut chars = raw.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(raw: &str) -> Identifier {
        Identifier::new(raw).expect("valid identifier")
    }

    #[test]
    fn simple_identifiers_are_unquoted_and_fold_to_upper() {
        let id = ident("customer_profile$1_0");
        assert!(id.is_simple());
        assert_eq!(id.to_sql(), "customer_profile$1_0");
        assert_eq!(id.resolved(), "CUSTOMER_PROFILE$1_0");
        assert!(id.matches_stored("CUSTOMER_PROFILE$1_0"));
    }

    #[test]
    fn unusual_identifiers_are_quoted() {
        assert_eq!(ident("my view").to_sql(), "\"my view\"");
        assert_eq!(ident("a\"b").to_sql(), "\"a\"\"b\"");
        assert_eq!(ident("1abc").to_sql(), "\"1abc\"");
        assert_eq!(ident("$abc").to_sql(), "\"$abc\"");
        assert_eq!(ident("my view").resolved(), "my view");
    }

    #[test]
    fn stored_names_resolve_to_themselves() {
        let upper = Identifier::from_stored("CUSTOMER_PROFILE$1_0").expect("valid");
        assert_eq!(upper.to_sql(), "CUSTOMER_PROFILE$1_0");

        let lower = Identifier::from_stored("legacy_view").expect("valid");
        assert_eq!(lower.to_sql(), "\"legacy_view\"");
        assert_eq!(lower.resolved(), "legacy_view");
        assert_ne!(lower, ident("legacy_view"));
    }

    #[test]
    fn injection_attempts_stay_inside_quotes() {
        let id = ident("x\"; DROP TABLE t; --");
        assert_eq!(id.to_sql(), "\"x\"\"; DROP TABLE t; --\"");
    }

    #[test]
    fn rejects_empty_and_control_characters() {
        assert!(Identifier::new("").is_err());
        assert!(Identifier::new("   ").is_err());
        assert!(Identifier::new("a\nb").is_err());
        assert!(Identifier::new("x".repeat(MAX_IDENTIFIER_LEN + 1)).is_err());
    }

    #[test]
    fn equality_follows_resolution() {
        assert_eq!(ident("customer"), ident("CUSTOMER"));
        assert_ne!(ident("customer"), ident("my customer"));
    }

    #[test]
    fn qualified_name_renders_three_parts() {
        let name = QualifiedName::new(ident("ML"), ident("FEATURE_STORE"), ident("fv$1_0"));
        assert_eq!(name.to_sql(), "ML.FEATURE_STORE.fv$1_0");
        assert_eq!(name.schema_sql(), "ML.FEATURE_STORE");
    }

    #[test]
    fn literals_escape_quotes_and_backslashes() {
        assert_eq!(quote_literal("plain"), "'plain'");
        assert_eq!(quote_literal("it's"), "'it''s'");
        assert_eq!(quote_literal(r"a\b"), r"'a\\b'");
        assert_eq!(
            quote_literal(r#"{"timestamp_col":"NULL"}"#),
            r#"'{"timestamp_col":"NULL"}'"#
        );
    }
}
