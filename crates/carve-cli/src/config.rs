//! Compiler configuration for the command line
//!
//! A JSON file supplies the base values, individual flags override them.
//! Missing keys fall back to the compiler defaults.

use anyhow::{Context, Result};
use carve_core::compiler::CompilerConfig;
use clap::Args;
use std::fs;
use std::path::{Path, PathBuf};

/// Capacity options shared by commands that compile
#[derive(Args, Debug, Default)]
pub struct CapacityArgs {
    /// JSON file with compiler capacities
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the primitive table capacity
    #[arg(long)]
    pub max_primitives: Option<usize>,

    /// Override the transform table capacity
    #[arg(long)]
    pub max_transforms: Option<usize>,

    /// Override the operation list capacity
    #[arg(long)]
    pub max_operations: Option<usize>,
}

impl CapacityArgs {
    pub fn resolve(&self) -> Result<CompilerConfig> {
        let mut config = match &self.config {
            Some(path) => load(path)?,
            None => CompilerConfig::default(),
        };
        if let Some(n) = self.max_primitives {
            config.max_primitives = n;
        }
        if let Some(n) = self.max_transforms {
            config.max_transforms = n;
        }
        if let Some(n) = self.max_operations {
            config.max_operations = n;
        }
        Ok(config)
    }
}

fn load(path: &Path) -> Result<CompilerConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    tracing::debug!("Loaded compiler config from {}", path.display());
    Ok(config)
}
