//! Serialization of the generated OpenAPI document to YAML or JSON.

use crate::openapi::OpenApi;
use anyhow::{Context, Result};
use clap::ValueEnum;
use log::debug;
use std::fs;
use std::path::Path;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

/// Serializes the document in the requested format.
pub fn serialize(doc: &OpenApi, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => serialize_yaml(doc),
        OutputFormat::Json => serialize_json(doc),
    }
}

/// Serializes an OpenAPI document to YAML format.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_yaml(doc: &OpenApi) -> Result<String> {
    debug!("Serializing OpenAPI document to YAML");
    serde_yaml::to_string(doc).context("Failed to serialize OpenAPI document to YAML")
}

/// Serializes an OpenAPI document to JSON format with pretty printing.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_json(doc: &OpenApi) -> Result<String> {
    debug!("Serializing OpenAPI document to JSON");
    serde_json::to_string_pretty(doc).context("Failed to serialize OpenAPI document to JSON")
}

/// Writes string content to a file, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written to.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openapi::{Info, Schema, Tag};
    use tempfile::TempDir;

    fn create_test_document() -> OpenApi {
        let mut doc = OpenApi::new(Info {
            title: "Test API".to_string(),
            version: "2.1.0".to_string(),
            description: None,
        });
        doc.tags.push(Tag::new("users"));
        doc.components
            .schemas
            .insert("crate::model::User".to_string(), Schema::object());
        doc
    }

    #[test]
    fn test_serialize_yaml() {
        let yaml = serialize(&create_test_document(), OutputFormat::Yaml).unwrap();

        assert!(yaml.contains("openapi:"));
        assert!(yaml.contains("3.0.1"));
        assert!(yaml.contains("title: Test API"));
        assert!(yaml.contains("name: users"));
        assert!(yaml.contains("crate::model::User"));
    }

    #[test]
    fn test_serialize_json() {
        let json = serialize(&create_test_document(), OutputFormat::Json).unwrap();
        assert!(json.contains('\n'));

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["openapi"], "3.0.1");
        assert_eq!(parsed["info"]["version"], "2.1.0");
        assert_eq!(parsed["components"]["schemas"]["crate::model::User"]["type"], "object");
    }

    #[test]
    fn test_write_to_file_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("subdir").join("nested").join("openapi.yaml");

        write_to_file("first", &file_path).unwrap();
        write_to_file("second", &file_path).unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "second");
    }
}
