//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands};
use crate::client::Client;
use crate::config::ClientConfig;
use crate::encode::decode_container;
use crate::error::{Error, Result, ResultExt};
use chrono::{NaiveDate, Utc};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Schema { entity } => self.schema(entity).await,
            Commands::Export {
                entity,
                input,
                date,
                shards,
            } => self.export(entity, input, *date, *shards).await,
            Commands::Inspect { file, limit } => self.inspect(file, *limit),
        }
    }

    /// Build the client configuration from the config file and flags
    fn load_config(&self) -> Result<ClientConfig> {
        let mut config = match (&self.cli.config, &self.cli.bucket) {
            (Some(path), _) => ClientConfig::from_file(path)?,
            (None, Some(bucket)) => ClientConfig::new(bucket.clone()),
            (None, None) => {
                return Err(Error::config(
                    "No bucket configured (use --bucket or --config)",
                ))
            }
        };

        if let Some(bucket) = &self.cli.bucket {
            config.bucket.clone_from(bucket);
        }
        if let Some(namespace) = &self.cli.namespace {
            config.namespace.clone_from(namespace);
        }
        config.validate()?;
        Ok(config)
    }

    /// Resolve and print an entity schema
    async fn schema(&self, entity: &str) -> Result<()> {
        let client = Client::new(self.load_config()?)?;
        let path = client.schema_path(entity);
        let schema = client.get_schema(&path).await?;

        let output = json!({
            "type": "SCHEMA",
            "key": path,
            "name": schema.full_name(),
            "schema": schema.to_json(),
        });
        println!("{}", serde_json::to_string(&output)?);
        Ok(())
    }

    /// Export JSON lines for an entity
    async fn export(
        &self,
        entity: &str,
        input: &Path,
        date: Option<NaiveDate>,
        shards: usize,
    ) -> Result<()> {
        let start = Instant::now();
        let client = Client::new(self.load_config()?)?;
        let schema = client.get_schema(&client.schema_path(entity)).await?;
        let mapper = client.json_mapper(schema.clone())?;

        let date = date.unwrap_or_else(|| Utc::now().date_naive());
        let mut writer = client.writer_for_entity(schema, entity, date, shards)?;

        let content = fs::read_to_string(input)
            .with_context(|| format!("Failed to read input file '{}'", input.display()))?;

        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let row: Value = serde_json::from_str(line)
                .with_context(|| format!("{}:{}", input.display(), idx + 1))?;
            mapper
                .map_and_append(&row, &mut writer)
                .with_context(|| format!("{}:{}", input.display(), idx + 1))?;
        }
        debug!("Buffered {} record(s) from {}", writer.buffered_records(), input.display());

        let report = writer.close().await?;
        info!(
            "Exported {} record(s) of {} in {:?}",
            report.total_records(),
            entity,
            start.elapsed()
        );

        let output = json!({
            "type": "EXPORT",
            "entity": entity,
            "date": date.format("%Y-%m-%d").to_string(),
            "records": report.total_records(),
            "bytes": report.total_bytes(),
            "objects": report.objects,
        });
        println!("{}", serde_json::to_string(&output)?);
        Ok(())
    }

    /// Print the records of a local container file
    fn inspect(&self, file: &Path, limit: Option<usize>) -> Result<()> {
        let bytes = fs::read(file)
            .with_context(|| format!("Failed to read container file '{}'", file.display()))?;
        let container = decode_container(&bytes)?;
        debug!(
            "Decoded {} record(s) in {} block(s) from {}",
            container.records.len(),
            container.blocks,
            file.display()
        );

        let limit = limit.unwrap_or(usize::MAX);
        for record in container.records.iter().take(limit) {
            let mut obj = Map::new();
            for (field, (name, value)) in container.schema.fields().iter().zip(record.fields()) {
                obj.insert(name.clone(), value.to_json(&field.field_type));
            }
            println!("{}", serde_json::to_string(&Value::Object(obj))?);
        }
        Ok(())
    }
}
