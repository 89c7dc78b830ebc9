//! CLI command implementations for arbz

use std::path::Path;

use clap::{Parser, Subcommand};

use arborize_model::{
    define_constraints, define_model, ConstraintsDefinition, ConstraintsDefinitionDict,
    ModelDefinition, ModelDefinitionDict,
};

use crate::error::{CliError, CliResult};

pub mod build;
pub mod catalog;
pub mod check;
pub mod inspect;

/// arbz - declarative neuron model builder
#[derive(Parser, Debug)]
#[command(
    name = "arbz",
    version,
    about = "Declarative multicompartmental neuron model builder",
    long_about = "arbz turns declarative model definitions (cable types, ions, mechanisms, \
                  synapses) plus cell reconstructions into fully resolved NEURON- or \
                  Arbor-style model templates."
)]
pub struct ArborizeCli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect a morphology file
    Inspect(inspect::InspectCommand),

    /// Check a definition, optionally against a morphology
    Check(check::CheckCommand),

    /// Build a backend model template
    Build(build::BuildCommand),

    /// List the mechanism catalog
    Catalog(catalog::CatalogCommand),
}

impl ArborizeCli {
    /// Execute the CLI command
    pub async fn execute(self) -> CliResult<()> {
        match self.command {
            Commands::Inspect(cmd) => cmd.execute().await,
            Commands::Check(cmd) => cmd.execute().await,
            Commands::Build(cmd) => cmd.execute().await,
            Commands::Catalog(cmd) => cmd.execute().await,
        }
    }
}

/// Read a definition file (TOML or JSON, by extension) into a model definition
pub fn load_model(path: &Path, use_defaults: bool) -> CliResult<ModelDefinition> {
    let dict: ModelDefinitionDict = load_dict(path)?;
    Ok(define_model(dict)?.with_use_defaults(use_defaults))
}

/// Read a constraints file (TOML or JSON, by extension)
pub fn load_constraints(
    path: &Path,
    tolerance: Option<f64>,
    use_defaults: bool,
) -> CliResult<ConstraintsDefinition> {
    let dict: ConstraintsDefinitionDict = load_dict(path)?;
    Ok(define_constraints(dict, tolerance)?.with_use_defaults(use_defaults))
}

fn load_dict<D: serde::de::DeserializeOwned>(path: &Path) -> CliResult<D> {
    if !path.is_file() {
        return Err(CliError::missing_resource(path.display().to_string()));
    }
    let text = std::fs::read_to_string(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(serde_json::from_str(&text)?),
        Some("toml") => Ok(toml::from_str(&text)?),
        other => Err(CliError::invalid_args(format!(
            "unsupported definition format '{}', expected .toml or .json",
            other.unwrap_or("")
        ))),
    }
}
