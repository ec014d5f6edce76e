//! Tool box configuration loaded from JSON.

use crate::connector::ConnectorSettings;
use crate::grid::{Grid, GridSettings};
use crate::tool::ToolId;
use crate::toolbox::ToolBox;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Duplicate tool: {0}")]
    DuplicateTool(String),
    #[error("Tool cannot suppress itself: {0}")]
    SelfSuppression(String),
    #[error("Exclusive group {0} is empty")]
    EmptyGroup(usize),
    #[error("Invalid grid settings: {0}")]
    InvalidGrid(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Suppression declaration: while `primary` is active, `suppressed` tools are
/// forced off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressionConfig {
    pub primary: String,
    pub suppressed: Vec<String>,
}

/// Static tool box setup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DraglineConfig {
    /// Tool names in registration order.
    pub tools: Vec<String>,
    /// Groups of tool names of which at most one may be active.
    pub exclusive_groups: Vec<Vec<String>>,
    pub suppressions: Vec<SuppressionConfig>,
    pub grid: GridSettings,
    pub connector: ConnectorSettings,
}

impl DraglineConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ConfigError::Serialization(format!("Failed to parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let json = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        log::debug!("Loaded configuration from {}", path.display());
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialization(format!("Failed to serialize configuration: {}", e)))
    }

    /// Check names, groups and grid values without building anything.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut seen = Vec::with_capacity(self.tools.len());
        for name in &self.tools {
            if seen.contains(&name) {
                return Err(ConfigError::DuplicateTool(name.clone()));
            }
            seen.push(name);
        }

        let known = |name: &String| -> ConfigResult<()> {
            if self.tools.contains(name) {
                Ok(())
            } else {
                Err(ConfigError::UnknownTool(name.clone()))
            }
        };

        for (index, group) in self.exclusive_groups.iter().enumerate() {
            if group.is_empty() {
                return Err(ConfigError::EmptyGroup(index));
            }
            group.iter().try_for_each(known)?;
        }

        for suppression in &self.suppressions {
            known(&suppression.primary)?;
            for name in &suppression.suppressed {
                known(name)?;
                if *name == suppression.primary {
                    return Err(ConfigError::SelfSuppression(name.clone()));
                }
            }
        }

        if !(self.grid.size > 0.0) {
            return Err(ConfigError::InvalidGrid(format!("size must be positive, got {}", self.grid.size)));
        }
        if !(self.grid.snap_angle_degrees > 0.0) {
            return Err(ConfigError::InvalidGrid(format!(
                "snap angle must be positive, got {}",
                self.grid.snap_angle_degrees
            )));
        }
        Ok(())
    }

    pub fn grid(&self) -> Grid {
        Grid::from_settings(&self.grid)
    }
}

impl ToolBox {
    /// Build a tool box from a configuration. Returns the tool box and the
    /// id assigned to each tool name.
    pub fn from_config(config: &DraglineConfig) -> ConfigResult<(ToolBox, HashMap<String, ToolId>)> {
        config.validate()?;

        let mut tool_box = ToolBox::new();
        let ids: HashMap<String, ToolId> = config
            .tools
            .iter()
            .map(|name| (name.clone(), tool_box.add_tool(name.as_str())))
            .collect();

        for group in &config.exclusive_groups {
            tool_box.add_exclusive_group(group.iter().map(|name| ids[name]));
        }
        for suppression in &config.suppressions {
            tool_box.suppress_while_active(
                ids[&suppression.primary],
                suppression.suppressed.iter().map(|name| ids[name]),
            );
        }

        log::info!(
            "Configured {} tools, {} exclusive groups, {} suppressions",
            config.tools.len(),
            config.exclusive_groups.len(),
            config.suppressions.len()
        );
        Ok((tool_box, ids))
    }
}
