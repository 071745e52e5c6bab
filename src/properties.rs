use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

use crate::error::{ReportError, ReportResult};

// Include default property directory at compile time
const DEFAULT_PROPERTIES: &str = include_str!("../default_properties.txt");
const LOCAL_PROPERTIES_FILE: &str = "properties.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub id: String,
    pub display_name: String,
}

/// Immutable id -> display name table. Entries keep file order.
#[derive(Debug, Clone, Default)]
pub struct PropertyDirectory {
    entries: Vec<Property>,
}

impl PropertyDirectory {
    /// Parses `<id> = <name>` lines. Blank lines and `#` comments are skipped.
    pub fn parse(content: &str) -> Result<Self> {
        let mut entries: Vec<Property> = Vec::new();
        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((id, name)) = line.split_once('=') else {
                anyhow::bail!(
                    "Invalid property entry at line {}: expected '<id> = <name>'",
                    line_num + 1
                );
            };
            let (id, name) = (id.trim(), name.trim());
            if id.is_empty() || name.is_empty() {
                anyhow::bail!("Empty property id or name at line {}", line_num + 1);
            }

            if entries.iter().any(|p| p.id == id) {
                warn!(action = "parse", component = "property_directory", line_number = line_num + 1, property_id = id, "Duplicate property id ignored");
                continue;
            }

            entries.push(Property {
                id: id.to_string(),
                display_name: name.to_string(),
            });
        }
        Ok(Self { entries })
    }

    pub fn embedded() -> Result<Self> {
        Self::parse(DEFAULT_PROPERTIES).context("Failed to parse embedded property directory")
    }

    pub fn lookup(&self, id: &str) -> ReportResult<&Property> {
        self.entries
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| ReportError::UnknownProperty(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn load_property_directory(file_path: Option<&Path>) -> Result<PropertyDirectory> {
    let start_time = Instant::now();
    info!(
        action = "start",
        component = "property_loading",
        "Starting property directory loading"
    );

    let directory = if let Some(path) = file_path {
        info!(action = "load", component = "property_file", file_path = ?path, "Loading properties from specified file");
        if !path.exists() {
            anyhow::bail!("Property file not found: {:?}", path);
        }
        let content = fs::read_to_string(path)?;
        PropertyDirectory::parse(&content)
            .with_context(|| format!("Failed to parse property file {:?}", path))?
    } else {
        let local_file = Path::new(LOCAL_PROPERTIES_FILE);
        if local_file.exists() {
            info!(action = "load", component = "local_property_file", file_path = ?local_file, "Loading properties from local file");
            let content = fs::read_to_string(local_file)?;
            PropertyDirectory::parse(&content)
                .with_context(|| format!("Failed to parse property file {:?}", local_file))?
        } else {
            info!(
                action = "load",
                component = "embedded_properties",
                "Using embedded property directory"
            );
            PropertyDirectory::embedded()?
        }
    };

    if directory.is_empty() {
        warn!(
            action = "loaded",
            component = "property_loading",
            "Property directory is empty"
        );
    }

    info!(
        action = "complete",
        component = "property_loading",
        property_count = directory.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Property directory loaded"
    );
    Ok(directory)
}

pub fn init_default_properties() -> Result<()> {
    let local_file = Path::new(LOCAL_PROPERTIES_FILE);

    if local_file.exists() {
        anyhow::bail!(
            "{} already exists. Remove it first if you want to reinitialize.",
            LOCAL_PROPERTIES_FILE
        );
    }

    fs::write(local_file, DEFAULT_PROPERTIES)?;
    println!("Created {} with the default property directory", LOCAL_PROPERTIES_FILE);

    Ok(())
}
