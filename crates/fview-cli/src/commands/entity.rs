//! Entity command - register, list and inspect entities.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use owo_colors::OwoColorize;

use fview_catalog::{
    DryRunWarehouse, EntityDefinition, EntityRegistration, EntityTagStore, FeatureStore,
    RegisteredEntity, RegistrationOutcome, Warehouse,
};

use crate::client::SqlApiClient;
use crate::{Config, OutputFormat};

/// Entity subcommands.
#[derive(Debug, Subcommand)]
pub enum EntityCommand {
    /// Register an entity and its join keys.
    Register(RegisterArgs),
    /// List registered entities.
    List,
    /// Show one registered entity.
    Get(GetArgs),
}

/// Arguments for `entity register`.
#[derive(Debug, Args)]
pub struct RegisterArgs {
    /// Entity name.
    #[arg()]
    pub name: String,

    /// Join keys (comma-separated or multiple --join-key flags).
    #[arg(long = "join-key", short = 'k', value_delimiter = ',', required = true)]
    pub join_keys: Vec<String>,

    /// Description, stored as the tag comment.
    #[arg(long)]
    pub description: Option<String>,

    /// Print the statement instead of executing it.
    #[arg(long)]
    pub dry_run: bool,
}

impl RegisterArgs {
    /// Builds the entity definition.
    #[must_use]
    pub fn definition(&self) -> EntityDefinition {
        let keys: Vec<&str> = self.join_keys.iter().map(String::as_str).collect();
        let def = EntityDefinition::new(self.name.as_str(), &keys);
        match &self.description {
            Some(description) => def.with_description(description.as_str()),
            None => def,
        }
    }
}

/// Arguments for `entity get`.
#[derive(Debug, Args)]
pub struct GetArgs {
    /// Entity name.
    #[arg()]
    pub name: String,
}

/// Registers the entity described by `args`.
///
/// # Errors
///
/// Returns an error if the definition is invalid, conflicts with an existing
/// registration, or the warehouse call fails.
pub async fn register<W>(
    store: &FeatureStore<W>,
    args: &RegisterArgs,
) -> Result<EntityRegistration>
where
    W: Warehouse + EntityTagStore,
{
    Ok(store.register_entity(&args.definition()).await?)
}

/// Looks up one entity, failing if it is not registered.
///
/// # Errors
///
/// Returns an error if the entity is not registered or the lookup fails.
pub async fn get<W>(store: &FeatureStore<W>, name: &str) -> Result<RegisteredEntity>
where
    W: Warehouse + EntityTagStore,
{
    store
        .get_entity(name)
        .await?
        .with_context(|| format!("Entity '{name}' is not registered"))
}

/// Execute an entity subcommand.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the operation fails.
pub async fn execute(command: EntityCommand, config: &Config) -> Result<()> {
    let client = SqlApiClient::new(config)?;

    match command {
        EntityCommand::Register(args) => {
            let registration = if args.dry_run {
                let warehouse = DryRunWarehouse::new(client);
                let store = FeatureStore::new(warehouse, config.store.clone())?;
                let registration = register(&store, &args).await?;
                for statement in store.warehouse().planned()? {
                    println!("{statement};");
                }
                registration
            } else {
                let store = FeatureStore::new(client, config.store.clone())?;
                register(&store, &args).await?
            };
            print_registration(&registration, &config.format)
        }
        EntityCommand::List => {
            let store = FeatureStore::new(client, config.store.clone())?;
            let entities = store.list_entities().await?;
            print_entities(&entities, &config.format)
        }
        EntityCommand::Get(args) => {
            let store = FeatureStore::new(client, config.store.clone())?;
            let entity = get(&store, &args.name).await?;
            print_entities(std::slice::from_ref(&entity), &config.format)
        }
    }
}

fn print_registration(registration: &EntityRegistration, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(registration).context("Failed to serialize entity")?
            );
        }
        OutputFormat::Text | OutputFormat::Table => {
            let entity = &registration.entity;
            match registration.outcome {
                RegistrationOutcome::Registered => println!(
                    "{} entity {} ({})",
                    "Registered".green(),
                    entity.name,
                    entity.join_keys.join(", ")
                ),
                RegistrationOutcome::AlreadyRegistered => println!(
                    "Entity {} already registered ({})",
                    entity.name,
                    entity.join_keys.join(", ")
                ),
            }
        }
    }
    Ok(())
}

fn print_entities(entities: &[RegisteredEntity], format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(entities).context("Failed to serialize entities")?
            );
        }
        OutputFormat::Text => {
            if entities.is_empty() {
                println!("No entities registered");
                return Ok(());
            }
            for entity in entities {
                let description = entity
                    .description
                    .as_ref()
                    .map_or(String::new(), |d| format!(" - {}", d.dimmed()));
                println!(
                    "  {} [{}]{description}",
                    entity.name,
                    entity.join_keys.join(", ")
                );
            }
        }
        OutputFormat::Table => {
            use tabled::{Table, Tabled};

            #[derive(Tabled)]
            struct EntityRow {
                #[tabled(rename = "Entity")]
                name: String,
                #[tabled(rename = "Join Keys")]
                join_keys: String,
                #[tabled(rename = "Description")]
                description: String,
            }

            let rows: Vec<_> = entities
                .iter()
                .map(|e| EntityRow {
                    name: e.name.clone(),
                    join_keys: e.join_keys.join(","),
                    description: e.description.clone().unwrap_or_default(),
                })
                .collect();

            if rows.is_empty() {
                println!("No entities registered");
            } else {
                println!("{}", Table::new(rows));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use fview_test_utils::{TestContext, assert_no_ddl};

    #[derive(Parser)]
    struct TestCli {
        #[command(subcommand)]
        command: EntityCommand,
    }

    #[test]
    fn test_register_args_parsing() {
        let cli = TestCli::parse_from([
            "test",
            "register",
            "store",
            "--join-key",
            "store_id,region",
            "--description",
            "physical stores",
        ]);
        let EntityCommand::Register(args) = cli.command else {
            panic!("expected register");
        };

        let def = args.definition();
        assert_eq!(def.name, "store");
        assert_eq!(def.join_keys, vec!["store_id", "region"]);
        assert_eq!(def.description.as_deref(), Some("physical stores"));
        assert!(!args.dry_run);
    }

    #[test]
    fn test_register_requires_join_keys() {
        assert!(TestCli::try_parse_from(["test", "register", "store"]).is_err());
    }

    #[tokio::test]
    async fn test_register_then_get() {
        let ctx = TestContext::bootstrapped().await;
        let cli = TestCli::parse_from(["test", "register", "customer", "-k", "customer_id"]);
        let EntityCommand::Register(args) = cli.command else {
            panic!("expected register");
        };

        let registration = register(&ctx.store, &args).await.unwrap();
        assert_eq!(registration.outcome, RegistrationOutcome::Registered);

        let entity = get(&ctx.store, "Customer").await.unwrap();
        assert_eq!(entity.join_keys, vec!["CUSTOMER_ID"]);
    }

    #[tokio::test]
    async fn test_get_unknown_entity_fails() {
        let ctx = TestContext::bootstrapped().await;

        let err = get(&ctx.store, "missing").await.unwrap_err();

        assert!(err.to_string().contains("'missing' is not registered"));
        assert_no_ddl(&ctx.warehouse);
    }
}
