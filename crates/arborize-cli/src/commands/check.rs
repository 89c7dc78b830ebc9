//! Definition checking command

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use arborize_schematic::file_schematic;

use crate::commands::{load_constraints, load_model};
use crate::error::CliResult;

/// Check a definition, optionally resolving it against a morphology
#[derive(Args, Debug)]
pub struct CheckCommand {
    /// Definition file (.toml or .json)
    pub definition: PathBuf,

    /// Morphology to resolve the definition against (.swc)
    #[arg(short, long)]
    pub morphology: Option<PathBuf>,

    /// Back-fill unset properties from the built-in defaults
    #[arg(long)]
    pub use_defaults: bool,

    /// Treat the definition as optimization constraints
    #[arg(long)]
    pub constraints: bool,
}

impl CheckCommand {
    pub async fn execute(self) -> CliResult<()> {
        if self.constraints {
            let definition =
                load_constraints(&self.definition, None, self.use_defaults)?;
            info!(
                "Parsed {} cable type(s), {} synapse type(s)",
                definition.len(),
                definition.synapse_types().len()
            );
            if let Some(morphology) = &self.morphology {
                let mut schematic = file_schematic(morphology, Some(definition), None)?;
                schematic.freeze()?;
                info!("Resolved {} section(s)", schematic.section_count());
            }
        } else {
            let definition = load_model(&self.definition, self.use_defaults)?;
            info!(
                "Parsed {} cable type(s), {} synapse type(s)",
                definition.len(),
                definition.synapse_types().len()
            );
            if let Some(morphology) = &self.morphology {
                let mut schematic = file_schematic(morphology, Some(definition), None)?;
                schematic.freeze()?;
                info!("Resolved {} section(s)", schematic.section_count());
            }
        }
        println!("Check OK: {}", self.definition.display());
        Ok(())
    }
}
