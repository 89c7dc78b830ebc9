//! Mechanism catalog listing command

use clap::Args;

use arborize_catalog::{Catalog, MechanismKind};

use crate::error::CliResult;

/// List the mechanism catalog
#[derive(Args, Debug)]
pub struct CatalogCommand {
    /// Show parameter defaults
    #[arg(long)]
    pub detailed: bool,
}

impl CatalogCommand {
    pub async fn execute(self) -> CliResult<()> {
        let catalog = Catalog::builtin();

        for kind in [MechanismKind::Density, MechanismKind::PointProcess] {
            let heading = match kind {
                MechanismKind::Density => "Density mechanisms:",
                MechanismKind::PointProcess => "Point processes:",
            };
            println!("{heading}");
            for entry in catalog.entries().filter(|e| e.kind == kind) {
                if self.detailed {
                    println!("  - {} ({})", entry.qualified_id(), entry.mod_name());
                    for parameter in &entry.parameters {
                        println!("      {} = {}", parameter.name, parameter.default);
                    }
                } else {
                    let names: Vec<&str> = entry
                        .parameters
                        .iter()
                        .map(|p| p.name.as_str())
                        .collect();
                    println!("  - {} {{ {} }}", entry.qualified_id(), names.join(", "));
                }
            }
        }
        Ok(())
    }
}
