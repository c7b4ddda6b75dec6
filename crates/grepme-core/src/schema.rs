//! Config schema and default config generation.
//!
//! The JSON schema is derived from the config structs with schemars and is
//! printed by `grepme --schema`. The example TOML doubles as the config file
//! written on first run and points editors at the published schema.

use anyhow::{Context, Result};
use schemars::generate::SchemaSettings;
use serde_json::{Value, json};

use crate::config::AppConfig;
use crate::{HOMEPAGE, env_prefix};

/// Generated schema filename.
pub const SCHEMA_FILENAME: &str = "config.schema.json";

fn schema_url(repo_url: &str) -> String {
    format!("{repo_url}/raw/main/schemas/{SCHEMA_FILENAME}")
}

/// Generate the JSON schema (draft 07) for [`AppConfig`].
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn generate_schema(project_name: &str, repo_url: &str) -> Result<String> {
    let mut schema = SchemaSettings::draft07()
        .into_generator()
        .into_root_schema_for::<AppConfig>();

    let metadata = [
        ("$id", schema_url(repo_url)),
        ("title", format!("{project_name} configuration")),
        (
            "description",
            format!("Settings for {project_name}, grep for GroupMe"),
        ),
    ];
    for (key, value) in metadata {
        schema.insert(key.to_string(), Value::String(value));
    }

    // the config file carries its own "$schema" key
    if let Some(properties) = schema.get_mut("properties").and_then(Value::as_object_mut) {
        properties.insert(
            "$schema".to_string(),
            json!({
                "type": "string",
                "description": "Location of this schema, for editor completion"
            }),
        );
    }

    serde_json::to_string_pretty(&schema).context("serializing config schema")
}

/// Render the default config as commented TOML.
///
/// # Errors
///
/// Returns an error if TOML serialization fails.
pub fn generate_example_config(project_name: &str) -> Result<String> {
    let body = toml::to_string_pretty(&AppConfig::default())
        .context("serializing default config to TOML")?;
    let prefix = env_prefix();

    let header = [
        format!("\"$schema\" = \"{}\"", schema_url(HOMEPAGE)),
        String::new(),
        format!("# {project_name} configuration. Every key is optional."),
        format!("# Environment variables take precedence, e.g. {prefix}__API__PAGE_SIZE=50."),
        "# The access token is kept separately in the data directory (see --show-paths)."
            .to_string(),
        String::new(),
    ];

    Ok(header.join("\n") + "\n" + &body)
}
