//! Test warehouse with operation recording.
//!
//! Wraps [`MemoryWarehouse`] and records every call for test assertions.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fview_catalog::ddl::Statement;
use fview_catalog::memory::{MemoryWarehouse, ObjectSnapshot};
use fview_catalog::warehouse::{
    EntityTagStore, ObservedState, TagDefinition, TagReference, TagReferenceStore, Warehouse,
};
use fview_core::error::{Error, Result};
use fview_core::{Identifier, QualifiedName};

/// Record of a warehouse call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarehouseOp {
    /// Object describe.
    Describe {
        /// Qualified object name.
        object: String,
    },
    /// DDL execution.
    Execute {
        /// Statement verb, e.g. `alter_dynamic_table`.
        verb: &'static str,
        /// Rendered SQL.
        sql: String,
    },
    /// Single tag lookup.
    GetTag {
        /// Qualified tag name.
        tag: String,
    },
    /// Tag listing.
    ListTags {
        /// Name prefix.
        prefix: String,
    },
    /// Tag reference listing.
    TagReferences {
        /// Qualified tag name.
        tag: String,
    },
}

impl WarehouseOp {
    /// Returns the SQL of an execute operation.
    pub fn sql(&self) -> Option<&str> {
        match self {
            Self::Execute { sql, .. } => Some(sql),
            _ => None,
        }
    }
}

/// In-memory warehouse with operation tracing and failure injection.
///
/// Clones share state, so a test can keep a handle while a feature store owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct RecordingWarehouse {
    inner: MemoryWarehouse,
    operations: Arc<Mutex<Vec<WarehouseOp>>>,
    fail_statements: Arc<Mutex<Vec<String>>>,
    fail_describes: Arc<Mutex<Vec<String>>>,
}

impl RecordingWarehouse {
    /// Creates an empty recording warehouse.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the wrapped in-memory warehouse.
    pub fn inner(&self) -> &MemoryWarehouse {
        &self.inner
    }

    /// Returns all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<WarehouseOp> {
        self.operations.lock().expect("lock").clone()
    }

    /// Returns the SQL of every successfully executed statement.
    #[must_use]
    pub fn executed_sql(&self) -> Vec<String> {
        self.operations()
            .iter()
            .filter_map(|op| op.sql().map(str::to_string))
            .collect()
    }

    /// Returns the verbs of every successfully executed statement.
    #[must_use]
    pub fn executed_verbs(&self) -> Vec<&'static str> {
        self.operations()
            .iter()
            .filter_map(|op| match op {
                WarehouseOp::Execute { verb, .. } => Some(*verb),
                _ => None,
            })
            .collect()
    }

    /// Clears recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().expect("lock").clear();
    }

    /// Makes any statement whose SQL contains `fragment` fail without effect.
    pub fn inject_failure(&self, fragment: impl Into<String>) {
        self.fail_statements.lock().expect("lock").push(fragment.into());
    }

    /// Makes describes of objects whose qualified name contains `fragment` fail.
    pub fn fail_describe(&self, fragment: impl Into<String>) {
        self.fail_describes.lock().expect("lock").push(fragment.into());
    }

    /// Clears all injected failures.
    pub fn clear_failures(&self) {
        self.fail_statements.lock().expect("lock").clear();
        self.fail_describes.lock().expect("lock").clear();
    }

    /// Returns a copy of a stored object.
    #[must_use]
    pub fn object(&self, name: &QualifiedName) -> Option<ObjectSnapshot> {
        self.inner.object(name).expect("lock")
    }

    fn record(&self, op: WarehouseOp) {
        self.operations.lock().expect("lock").push(op);
    }

    fn check_failure(list: &Mutex<Vec<String>>, text: &str) -> Result<()> {
        let fragments = list.lock().expect("lock");
        if let Some(fragment) = fragments.iter().find(|f| text.contains(f.as_str())) {
            return Err(Error::warehouse(format!(
                "injected failure ({fragment}): {text}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Warehouse for RecordingWarehouse {
    async fn describe(&self, name: &QualifiedName) -> Result<ObservedState> {
        Self::check_failure(&self.fail_describes, &name.to_string())?;
        self.record(WarehouseOp::Describe {
            object: name.to_string(),
        });
        self.inner.describe(name).await
    }

    async fn execute(&self, statement: &Statement) -> Result<()> {
        let sql = statement.to_sql();
        Self::check_failure(&self.fail_statements, &sql)?;
        self.inner.execute(statement).await?;
        self.record(WarehouseOp::Execute {
            verb: statement.verb(),
            sql,
        });
        Ok(())
    }
}

#[async_trait]
impl EntityTagStore for RecordingWarehouse {
    async fn get_tag(&self, name: &QualifiedName) -> Result<Option<TagDefinition>> {
        self.record(WarehouseOp::GetTag {
            tag: name.to_string(),
        });
        self.inner.get_tag(name).await
    }

    async fn list_tags(
        &self,
        database: &Identifier,
        schema: &Identifier,
        prefix: &str,
    ) -> Result<Vec<TagDefinition>> {
        self.record(WarehouseOp::ListTags {
            prefix: prefix.to_string(),
        });
        self.inner.list_tags(database, schema, prefix).await
    }
}

#[async_trait]
impl TagReferenceStore for RecordingWarehouse {
    async fn tag_references(&self, tag: &QualifiedName) -> Result<Vec<TagReference>> {
        self.record(WarehouseOp::TagReferences {
            tag: tag.to_string(),
        });
        self.inner.tag_references(tag).await
    }
}
