//! Typed DDL statements.
//!
//! Statements are data until they reach a warehouse. The SQL API client
//! renders them with [`Statement::to_sql`]; the in-memory warehouse applies
//! them structurally. Identifiers go through [`Identifier::to_sql`] and every
//! string value through [`quote_literal`], so declared names and tag payloads
//! are never spliced into SQL text raw.

use std::fmt;
use std::fmt::Write as _;

use fview_core::{Identifier, QualifiedName, quote_literal};

use crate::definition::{InitializeMode, RefreshMode};
use crate::target_lag::TargetLag;

/// Warehouse object domain as far as feature views are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectDomain {
    /// Plain view.
    View,
    /// Dynamic table.
    DynamicTable,
}

impl ObjectDomain {
    /// Returns the SQL keyword(s).
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::View => "VIEW",
            Self::DynamicTable => "DYNAMIC TABLE",
        }
    }
}

impl fmt::Display for ObjectDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// `tag = 'value'` inside a `WITH TAG (...)` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagAssignment {
    /// Fully qualified tag.
    pub tag: QualifiedName,
    /// Tag value.
    pub value: String,
}

/// `CREATE OR REPLACE VIEW`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateView {
    /// Object name.
    pub name: QualifiedName,
    /// SELECT text.
    pub query: String,
    /// Tags embedded in the statement.
    pub tags: Vec<TagAssignment>,
    /// Object comment.
    pub comment: Option<String>,
}

/// `CREATE OR REPLACE DYNAMIC TABLE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDynamicTable {
    /// Object name.
    pub name: QualifiedName,
    /// SELECT text.
    pub query: String,
    /// Target lag.
    pub target_lag: TargetLag,
    /// Refresh warehouse.
    pub warehouse: Identifier,
    /// Refresh mode.
    pub refresh_mode: RefreshMode,
    /// Initialization behaviour.
    pub initialize: InitializeMode,
    /// Tags embedded in the statement.
    pub tags: Vec<TagAssignment>,
    /// Object comment.
    pub comment: Option<String>,
}

/// A single attribute change on an existing dynamic table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterChange {
    /// `SET TARGET_LAG = ...`
    TargetLag(TargetLag),
    /// `SET WAREHOUSE = ...`
    Warehouse(Identifier),
}

/// A DDL statement issued by fview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `CREATE SCHEMA IF NOT EXISTS`.
    CreateSchema {
        /// Database.
        database: Identifier,
        /// Schema.
        schema: Identifier,
    },
    /// `CREATE TAG IF NOT EXISTS`.
    CreateTag {
        /// Fully qualified tag name.
        name: QualifiedName,
        /// Single allowed value, if restricted.
        allowed_value: Option<String>,
        /// Tag comment.
        comment: Option<String>,
    },
    /// `CREATE OR REPLACE VIEW ... WITH TAG (...)`.
    CreateView(CreateView),
    /// `CREATE OR REPLACE DYNAMIC TABLE ... WITH TAG (...)`.
    CreateDynamicTable(CreateDynamicTable),
    /// `ALTER DYNAMIC TABLE ... SET ...`.
    AlterDynamicTable {
        /// Object name.
        name: QualifiedName,
        /// The one attribute changed.
        change: AlterChange,
    },
    /// `DROP <domain> IF EXISTS`.
    Drop {
        /// Object domain.
        domain: ObjectDomain,
        /// Object name.
        name: QualifiedName,
    },
}

impl Statement {
    /// Returns a short verb for logs and reports.
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::CreateSchema { .. } => "create_schema",
            Self::CreateTag { .. } => "create_tag",
            Self::CreateView(_) => "create_view",
            Self::CreateDynamicTable(_) => "create_dynamic_table",
            Self::AlterDynamicTable { .. } => "alter_dynamic_table",
            Self::Drop { .. } => "drop",
        }
    }

    /// Returns true for statements that create or replace a feature view object.
    #[must_use]
    pub const fn is_create_object(&self) -> bool {
        matches!(self, Self::CreateView(_) | Self::CreateDynamicTable(_))
    }

    /// Renders the statement as SQL text.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::CreateSchema { database, schema } => {
                format!(
                    "CREATE SCHEMA IF NOT EXISTS {}.{}",
                    database.to_sql(),
                    schema.to_sql()
                )
            }
            Self::CreateTag {
                name,
                allowed_value,
                comment,
            } => {
                let mut sql = format!("CREATE TAG IF NOT EXISTS {}", name.to_sql());
                if let Some(value) = allowed_value {
                    let _ = write!(sql, " ALLOWED_VALUES {}", quote_literal(value));
                }
                if let Some(comment) = comment {
                    let _ = write!(sql, " COMMENT = {}", quote_literal(comment));
                }
                sql
            }
            Self::CreateView(view) => {
                let mut sql = format!("CREATE OR REPLACE VIEW {}", view.name.to_sql());
                push_tags(&mut sql, &view.tags);
                push_comment(&mut sql, view.comment.as_deref());
                push_query(&mut sql, &view.query);
                sql
            }
            Self::CreateDynamicTable(table) => {
                let mut sql = format!("CREATE OR REPLACE DYNAMIC TABLE {}", table.name.to_sql());
                let _ = write!(sql, "\n  TARGET_LAG = {}", lag_sql(&table.target_lag));
                let _ = write!(sql, "\n  WAREHOUSE = {}", table.warehouse.to_sql());
                let _ = write!(sql, "\n  REFRESH_MODE = {}", table.refresh_mode.as_sql());
                let _ = write!(sql, "\n  INITIALIZE = {}", table.initialize.as_sql());
                push_comment(&mut sql, table.comment.as_deref());
                push_tags(&mut sql, &table.tags);
                push_query(&mut sql, &table.query);
                sql
            }
            Self::AlterDynamicTable { name, change } => {
                let set = match change {
                    AlterChange::TargetLag(lag) => format!("TARGET_LAG = {}", lag_sql(lag)),
                    AlterChange::Warehouse(warehouse) => {
                        format!("WAREHOUSE = {}", warehouse.to_sql())
                    }
                };
                format!("ALTER DYNAMIC TABLE {} SET {set}", name.to_sql())
            }
            Self::Drop { domain, name } => {
                format!("DROP {} IF EXISTS {}", domain.as_sql(), name.to_sql())
            }
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

fn lag_sql(lag: &TargetLag) -> String {
    if lag.is_downstream() {
        "DOWNSTREAM".to_string()
    } else {
        quote_literal(lag.as_str())
    }
}

fn push_tags(sql: &mut String, tags: &[TagAssignment]) {
    if tags.is_empty() {
        return;
    }
    sql.push_str("\n  WITH TAG (");
    for (i, tag) in tags.iter().enumerate() {
        if i > 0 {
            sql.push(',');
        }
        let _ = write!(sql, "\n    {} = {}", tag.tag.to_sql(), quote_literal(&tag.value));
    }
    sql.push_str("\n  )");
}

fn push_comment(sql: &mut String, comment: Option<&str>) {
    if let Some(comment) = comment {
        let _ = write!(sql, "\n  COMMENT = {}", quote_literal(comment));
    }
}

fn push_query(sql: &mut String, query: &str) {
    sql.push_str("\nAS\n");
    sql.push_str(query.trim().trim_end_matches(';').trim_end());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(s: &str) -> Identifier {
        Identifier::new(s).unwrap()
    }

    fn qualified(name: &str) -> QualifiedName {
        QualifiedName::new(ident("ML"), ident("FEATURE_STORE"), ident(name))
    }

    fn tag(name: &str, value: &str) -> TagAssignment {
        TagAssignment {
            tag: qualified(name),
            value: value.to_string(),
        }
    }

    #[test]
    fn create_view_embeds_tags_and_comment() {
        let stmt = Statement::CreateView(CreateView {
            name: qualified("customer_profile$1_0"),
            query: "SELECT * FROM customers;".into(),
            tags: vec![
                tag("SNOWML_FEATURE_STORE_OBJECT", r#"{"type":"EXTERNAL_FEATURE_VIEW"}"#),
                tag("SNOWML_FEATURE_STORE_ENTITY_CUSTOMER", "CUSTOMER_ID"),
            ],
            comment: Some("customer's profile".into()),
        });

        assert_eq!(
            stmt.to_sql(),
            "CREATE OR REPLACE VIEW ML.FEATURE_STORE.customer_profile$1_0\n  \
             WITH TAG (\n    \
             ML.FEATURE_STORE.SNOWML_FEATURE_STORE_OBJECT = '{\"type\":\"EXTERNAL_FEATURE_VIEW\"}',\n    \
             ML.FEATURE_STORE.SNOWML_FEATURE_STORE_ENTITY_CUSTOMER = 'CUSTOMER_ID'\n  )\n  \
             COMMENT = 'customer''s profile'\nAS\nSELECT * FROM customers"
        );
        assert!(stmt.is_create_object());
    }

    #[test]
    fn create_dynamic_table_lists_refresh_settings() {
        let stmt = Statement::CreateDynamicTable(CreateDynamicTable {
            name: qualified("activity$2_0"),
            query: "SELECT 1".into(),
            target_lag: TargetLag::parse("5 minutes").unwrap(),
            warehouse: ident("ADMIN_WH"),
            refresh_mode: RefreshMode::Incremental,
            initialize: InitializeMode::OnSchedule,
            tags: vec![tag("SNOWML_FEATURE_VIEW_METADATA", "{}")],
            comment: None,
        });

        let sql = stmt.to_sql();
        assert!(sql.starts_with("CREATE OR REPLACE DYNAMIC TABLE ML.FEATURE_STORE.activity$2_0"));
        assert!(sql.contains("TARGET_LAG = '5 minutes'"));
        assert!(sql.contains("WAREHOUSE = ADMIN_WH"));
        assert!(sql.contains("REFRESH_MODE = INCREMENTAL"));
        assert!(sql.contains("INITIALIZE = ON_SCHEDULE"));
        assert!(sql.contains("SNOWML_FEATURE_VIEW_METADATA = '{}'"));
        assert!(sql.ends_with("AS\nSELECT 1"));
    }

    #[test]
    fn alter_sets_exactly_one_attribute() {
        let lag = Statement::AlterDynamicTable {
            name: qualified("fv$1_0"),
            change: AlterChange::TargetLag(TargetLag::parse("10 minutes").unwrap()),
        };
        assert_eq!(
            lag.to_sql(),
            "ALTER DYNAMIC TABLE ML.FEATURE_STORE.fv$1_0 SET TARGET_LAG = '10 minutes'"
        );

        let wh = Statement::AlterDynamicTable {
            name: qualified("fv$1_0"),
            change: AlterChange::Warehouse(ident("my wh")),
        };
        assert_eq!(
            wh.to_sql(),
            "ALTER DYNAMIC TABLE ML.FEATURE_STORE.fv$1_0 SET WAREHOUSE = \"my wh\""
        );

        let downstream = Statement::AlterDynamicTable {
            name: qualified("fv$1_0"),
            change: AlterChange::TargetLag(TargetLag::parse("downstream").unwrap()),
        };
        assert!(downstream.to_sql().ends_with("SET TARGET_LAG = DOWNSTREAM"));
    }

    #[test]
    fn bootstrap_and_drop_statements() {
        let schema = Statement::CreateSchema {
            database: ident("ML"),
            schema: ident("FEATURE_STORE"),
        };
        assert_eq!(schema.to_sql(), "CREATE SCHEMA IF NOT EXISTS ML.FEATURE_STORE");

        let tag = Statement::CreateTag {
            name: qualified("SNOWML_FEATURE_STORE_ENTITY_CUSTOMER"),
            allowed_value: Some("CUSTOMER_ID,REGION".into()),
            comment: Some("customers".into()),
        };
        assert_eq!(
            tag.to_sql(),
            "CREATE TAG IF NOT EXISTS ML.FEATURE_STORE.SNOWML_FEATURE_STORE_ENTITY_CUSTOMER \
             ALLOWED_VALUES 'CUSTOMER_ID,REGION' COMMENT = 'customers'"
        );

        let drop = Statement::Drop {
            domain: ObjectDomain::DynamicTable,
            name: qualified("old$1_0"),
        };
        assert_eq!(drop.to_sql(), "DROP DYNAMIC TABLE IF EXISTS ML.FEATURE_STORE.old$1_0");
    }
}
