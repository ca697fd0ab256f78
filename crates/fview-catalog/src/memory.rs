//! In-memory warehouse for tests and local previews.
//!
//! Applies [`Statement`]s structurally instead of parsing SQL. It enforces the
//! rules the reconciler relies on: the schema must exist, tags must exist
//! before they are assigned, restricted tags only accept their allowed value,
//! and `CREATE OR REPLACE` cannot silently change an object's kind.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use fview_core::{Error, Identifier, QualifiedName, Result};

use crate::ddl::{AlterChange, ObjectDomain, Statement, TagAssignment};
use crate::definition::RefreshMode;
use crate::warehouse::{
    EntityTagStore, ObservedState, TagDefinition, TagReference, TagReferenceStore, Warehouse,
};

/// In-memory warehouse.
///
/// Thread-safe via `RwLock`. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryWarehouse {
    state: Arc<RwLock<State>>,
}

#[derive(Debug, Default)]
struct State {
    schemas: HashSet<(Identifier, Identifier)>,
    tags: HashMap<QualifiedName, TagDefinition>,
    objects: HashMap<QualifiedName, StoredObject>,
    generation: u64,
}

#[derive(Debug, Clone)]
struct StoredObject {
    domain: ObjectDomain,
    query: String,
    target_lag: Option<String>,
    warehouse: Option<String>,
    refresh_mode: Option<RefreshMode>,
    tags: Vec<TagAssignment>,
    comment: Option<String>,
    generation: u64,
}

/// Point-in-time copy of one stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSnapshot {
    /// Object domain.
    pub domain: ObjectDomain,
    /// SELECT text.
    pub query: String,
    /// Target lag (dynamic tables).
    pub target_lag: Option<String>,
    /// Refresh warehouse, resolved (dynamic tables).
    pub warehouse: Option<String>,
    /// Refresh mode (dynamic tables).
    pub refresh_mode: Option<RefreshMode>,
    /// Tag values keyed by resolved tag name.
    pub tags: BTreeMap<String, String>,
    /// Object comment.
    pub comment: Option<String>,
    /// Increases every time the object is (re)created.
    pub generation: u64,
}

impl MemoryWarehouse {
    /// Creates an empty warehouse.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state.write().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })
    }

    /// Returns a copy of the object named `name`, if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    pub fn object(&self, name: &QualifiedName) -> Result<Option<ObjectSnapshot>> {
        Ok(self.read()?.objects.get(name).map(|o| ObjectSnapshot {
            domain: o.domain,
            query: o.query.clone(),
            target_lag: o.target_lag.clone(),
            warehouse: o.warehouse.clone(),
            refresh_mode: o.refresh_mode,
            tags: o
                .tags
                .iter()
                .map(|t| (t.tag.name().resolved(), t.value.clone()))
                .collect(),
            comment: o.comment.clone(),
            generation: o.generation,
        }))
    }

    /// Returns the number of stored objects.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    pub fn object_count(&self) -> Result<usize> {
        Ok(self.read()?.objects.len())
    }

    /// Returns true if the schema exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    pub fn has_schema(&self, database: &Identifier, schema: &Identifier) -> Result<bool> {
        Ok(self
            .read()?
            .schemas
            .contains(&(database.clone(), schema.clone())))
    }
}

impl State {
    fn require_schema(&self, name: &QualifiedName) -> Result<()> {
        if self
            .schemas
            .contains(&(name.database().clone(), name.schema().clone()))
        {
            Ok(())
        } else {
            Err(Error::warehouse(format!(
                "schema '{}' does not exist or not authorized",
                name.schema_sql()
            )))
        }
    }

    fn check_tags(&self, tags: &[TagAssignment]) -> Result<()> {
        for assignment in tags {
            let definition = self.tags.get(&assignment.tag).ok_or_else(|| {
                Error::warehouse(format!(
                    "tag '{}' does not exist or not authorized",
                    assignment.tag
                ))
            })?;
            if let Some(allowed) = &definition.allowed_value {
                if *allowed != assignment.value {
                    return Err(Error::warehouse(format!(
                        "tag '{}' does not allow value '{}'",
                        assignment.tag, assignment.value
                    )));
                }
            }
        }
        Ok(())
    }

    fn replace(&mut self, name: &QualifiedName, mut object: StoredObject) -> Result<()> {
        self.require_schema(name)?;
        self.check_tags(&object.tags)?;
        if let Some(existing) = self.objects.get(name) {
            if existing.domain != object.domain {
                return Err(Error::warehouse(format!(
                    "object '{name}' already exists as {}",
                    existing.domain
                )));
            }
        }
        self.generation += 1;
        object.generation = self.generation;
        self.objects.insert(name.clone(), object);
        Ok(())
    }

    fn apply(&mut self, statement: &Statement) -> Result<()> {
        match statement {
            Statement::CreateSchema { database, schema } => {
                self.schemas.insert((database.clone(), schema.clone()));
                Ok(())
            }
            Statement::CreateTag {
                name,
                allowed_value,
                comment,
            } => {
                self.require_schema(name)?;
                self.tags.entry(name.clone()).or_insert_with(|| TagDefinition {
                    name: name.name().resolved(),
                    allowed_value: allowed_value.clone(),
                    comment: comment.clone(),
                });
                Ok(())
            }
            Statement::CreateView(view) => self.replace(
                &view.name,
                StoredObject {
                    domain: ObjectDomain::View,
                    query: view.query.clone(),
                    target_lag: None,
                    warehouse: None,
                    refresh_mode: None,
                    tags: view.tags.clone(),
                    comment: view.comment.clone(),
                    generation: 0,
                },
            ),
            Statement::CreateDynamicTable(table) => self.replace(
                &table.name,
                StoredObject {
                    domain: ObjectDomain::DynamicTable,
                    query: table.query.clone(),
                    target_lag: Some(table.target_lag.as_str().to_string()),
                    warehouse: Some(table.warehouse.resolved()),
                    refresh_mode: Some(table.refresh_mode),
                    tags: table.tags.clone(),
                    comment: table.comment.clone(),
                    generation: 0,
                },
            ),
            Statement::AlterDynamicTable { name, change } => {
                let object = self
                    .objects
                    .get_mut(name)
                    .filter(|o| o.domain == ObjectDomain::DynamicTable)
                    .ok_or_else(|| {
                        Error::warehouse(format!(
                            "dynamic table '{name}' does not exist or not authorized"
                        ))
                    })?;
                match change {
                    AlterChange::TargetLag(lag) => object.target_lag = Some(lag.as_str().to_string()),
                    AlterChange::Warehouse(wh) => object.warehouse = Some(wh.resolved()),
                }
                Ok(())
            }
            Statement::Drop { domain, name } => match self.objects.get(name) {
                Some(existing) if existing.domain != *domain => Err(Error::warehouse(format!(
                    "object '{name}' is a {}, not a {domain}",
                    existing.domain
                ))),
                Some(_) => {
                    self.objects.remove(name);
                    Ok(())
                }
                None => Ok(()),
            },
        }
    }
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    async fn describe(&self, name: &QualifiedName) -> Result<ObservedState> {
        let state = self.read()?;
        Ok(match state.objects.get(name) {
            None => ObservedState::Absent,
            Some(o) if o.domain == ObjectDomain::View => ObservedState::StaticView,
            Some(o) => ObservedState::ManagedTable {
                target_lag: o.target_lag.clone(),
                warehouse: o.warehouse.clone(),
            },
        })
    }

    async fn execute(&self, statement: &Statement) -> Result<()> {
        self.write()?.apply(statement)
    }
}

#[async_trait]
impl EntityTagStore for MemoryWarehouse {
    async fn get_tag(&self, name: &QualifiedName) -> Result<Option<TagDefinition>> {
        Ok(self.read()?.tags.get(name).cloned())
    }

    async fn list_tags(
        &self,
        database: &Identifier,
        schema: &Identifier,
        prefix: &str,
    ) -> Result<Vec<TagDefinition>> {
        let state = self.read()?;
        let mut tags: Vec<TagDefinition> = state
            .tags
            .iter()
            .filter(|(name, def)| {
                name.database() == database && name.schema() == schema && def.name.starts_with(prefix)
            })
            .map(|(_, def)| def.clone())
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }
}

#[async_trait]
impl TagReferenceStore for MemoryWarehouse {
    async fn tag_references(&self, tag: &QualifiedName) -> Result<Vec<TagReference>> {
        let state = self.read()?;
        let mut references: Vec<TagReference> = state
            .objects
            .iter()
            .filter(|(name, _)| name.database() == tag.database() && name.schema() == tag.schema())
            .filter_map(|(name, object)| {
                object
                    .tags
                    .iter()
                    .find(|t| t.tag == *tag)
                    .map(|t| TagReference {
                        object: name.name().resolved(),
                        domain: object.domain,
                        value: t.value.clone(),
                    })
            })
            .collect();
        references.sort_by(|a, b| a.object.cmp(&b.object));
        Ok(references)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddl::{CreateDynamicTable, CreateView};
    use crate::definition::InitializeMode;
    use crate::target_lag::TargetLag;

    fn ident(s: &str) -> Identifier {
        Identifier::new(s).unwrap()
    }

    fn qualified(name: &str) -> QualifiedName {
        QualifiedName::new(ident("ML"), ident("FS"), ident(name))
    }

    fn view(name: &str, tags: Vec<TagAssignment>) -> Statement {
        Statement::CreateView(CreateView {
            name: qualified(name),
            query: "SELECT 1".into(),
            tags,
            comment: None,
        })
    }

    async fn with_schema() -> MemoryWarehouse {
        let wh = MemoryWarehouse::new();
        wh.execute(&Statement::CreateSchema {
            database: ident("ML"),
            schema: ident("FS"),
        })
        .await
        .unwrap();
        wh
    }

    #[tokio::test]
    async fn objects_require_schema_and_tags() {
        let wh = MemoryWarehouse::new();
        assert!(wh.execute(&view("v", vec![])).await.is_err());

        let wh = with_schema().await;
        let tagged = view(
            "v",
            vec![TagAssignment {
                tag: qualified("T"),
                value: "x".into(),
            }],
        );
        assert!(wh.execute(&tagged).await.is_err());

        wh.execute(&Statement::CreateTag {
            name: qualified("T"),
            allowed_value: Some("y".into()),
            comment: None,
        })
        .await
        .unwrap();
        let err = wh.execute(&tagged).await.unwrap_err();
        assert!(err.to_string().contains("does not allow value 'x'"));
    }

    #[tokio::test]
    async fn names_resolve_case_insensitively() {
        let wh = with_schema().await;
        wh.execute(&view("profile$1_0", vec![])).await.unwrap();

        let state = wh.describe(&qualified("PROFILE$1_0")).await.unwrap();
        assert_eq!(state, ObservedState::StaticView);
        let snapshot = wh.object(&qualified("Profile$1_0")).unwrap().unwrap();
        assert_eq!(snapshot.generation, 1);
    }

    #[tokio::test]
    async fn replace_cannot_change_kind() {
        let wh = with_schema().await;
        wh.execute(&view("fv", vec![])).await.unwrap();

        let table = Statement::CreateDynamicTable(CreateDynamicTable {
            name: qualified("fv"),
            query: "SELECT 1".into(),
            target_lag: TargetLag::parse("1 hour").unwrap(),
            warehouse: ident("wh"),
            refresh_mode: RefreshMode::Auto,
            initialize: InitializeMode::OnCreate,
            tags: vec![],
            comment: None,
        });
        let err = wh.execute(&table).await.unwrap_err();
        assert!(err.to_string().contains("already exists as VIEW"));

        wh.execute(&Statement::Drop {
            domain: ObjectDomain::View,
            name: qualified("fv"),
        })
        .await
        .unwrap();
        wh.execute(&table).await.unwrap();
        assert_eq!(
            wh.describe(&qualified("fv")).await.unwrap(),
            ObservedState::ManagedTable {
                target_lag: Some("1 hour".into()),
                warehouse: Some("WH".into()),
            }
        );
    }

    #[tokio::test]
    async fn tag_lookups_are_scoped_to_schema() {
        let wh = with_schema().await;
        for name in ["SNOWML_FEATURE_STORE_ENTITY_B", "SNOWML_FEATURE_STORE_ENTITY_A", "OTHER"] {
            wh.execute(&Statement::CreateTag {
                name: qualified(name),
                allowed_value: Some("ID".into()),
                comment: None,
            })
            .await
            .unwrap();
        }

        let tags = wh
            .list_tags(&ident("ML"), &ident("FS"), "SNOWML_FEATURE_STORE_ENTITY_")
            .await
            .unwrap();
        let names: Vec<_> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["SNOWML_FEATURE_STORE_ENTITY_A", "SNOWML_FEATURE_STORE_ENTITY_B"]);

        let other = wh
            .list_tags(&ident("ML"), &ident("OTHER"), "")
            .await
            .unwrap();
        assert!(other.is_empty());
    }
}
