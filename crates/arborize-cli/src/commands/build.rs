//! Backend build command

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use tracing::info;

use arborize_build::{arbor_build, neuron_build, optimizer_build, Paint};
use arborize_catalog::Catalog;
use arborize_schematic::file_schematic;

use crate::commands::{load_constraints, load_model};
use crate::error::CliResult;

/// Backend to lower the model to
#[derive(ValueEnum, Clone, Debug)]
pub enum Backend {
    /// NEURON-style sectioned model
    Neuron,
    /// Arbor-style cable cell template
    Arbor,
    /// Optimizer cell (requires a constraints definition)
    Optimizer,
}

/// Build a backend model template from a definition and a morphology
#[derive(Args, Debug)]
pub struct BuildCommand {
    /// Target backend
    pub backend: Backend,

    /// Definition file (.toml or .json)
    #[arg(short, long)]
    pub definition: PathBuf,

    /// Morphology file (.swc)
    #[arg(short, long)]
    pub morphology: PathBuf,

    /// Output JSON artifact (printed to stdout if omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Back-fill unset properties from the built-in defaults
    #[arg(long)]
    pub use_defaults: bool,
}

impl BuildCommand {
    pub async fn execute(self) -> CliResult<()> {
        let catalog = Catalog::builtin();
        let summary = match self.backend {
            Backend::Neuron => {
                let definition = load_model(&self.definition, self.use_defaults)?;
                let mut schematic = file_schematic(&self.morphology, Some(definition), None)?;
                let cell = neuron_build(&mut schematic, &catalog)?;
                info!("Built NEURON model '{}'", cell.name());
                neuron_summary(&cell)
            }
            Backend::Arbor => {
                let definition = load_model(&self.definition, self.use_defaults)?;
                let mut schematic = file_schematic(&self.morphology, Some(definition), None)?;
                let template = arbor_build(&mut schematic)?;
                info!(
                    "Built cable cell template with {} segments",
                    template.tree.segments().len()
                );
                arbor_summary(&template)
            }
            Backend::Optimizer => {
                let definition = load_constraints(&self.definition, None, self.use_defaults)?;
                let mut schematic = file_schematic(&self.morphology, Some(definition), None)?;
                let cell = optimizer_build(&mut schematic, &catalog)?;
                info!("Built optimizer cell '{}'", cell.name);
                optimizer_summary(&cell)
            }
        };

        let json = serde_json::to_string_pretty(&summary)?;
        match &self.output {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, json)?;
                info!("Wrote artifact to {}", path.display());
            }
            None => println!("{json}"),
        }
        Ok(())
    }
}

fn neuron_summary(cell: &arborize_build::NeuronModel) -> serde_json::Value {
    let sections: Vec<_> = cell
        .sections()
        .iter()
        .map(|section| {
            serde_json::json!({
                "name": section.name,
                "labels": section.labels,
                "points": section.coords.len(),
                "length_um": section.length,
                "nseg": section.nseg,
                "Ra": section.ra,
                "cm": section.cm,
                "ions": section.ions,
                "mechanisms": section
                    .mechanisms
                    .iter()
                    .map(|mech| {
                        serde_json::json!({
                            "mod": mech.mod_name,
                            "attributes": mech.attributes,
                        })
                    })
                    .collect::<Vec<_>>(),
                "synapse_types": section.synapse_types.keys().collect::<Vec<_>>(),
            })
        })
        .collect();
    serde_json::json!({
        "backend": "neuron",
        "name": cell.name(),
        "sections": sections,
    })
}

fn arbor_summary(template: &arborize_build::CableCellTemplate) -> serde_json::Value {
    let labels: serde_json::Map<String, serde_json::Value> = template
        .labels
        .iter()
        .map(|(label, region)| (label.to_string(), region.into()))
        .collect();
    let paints: Vec<_> = template
        .decor
        .paints()
        .iter()
        .map(|paint| match paint {
            Paint::Membrane { region, rl, cm } => serde_json::json!({
                "paint": "membrane", "region": region, "rL": rl, "cm": cm,
            }),
            Paint::Ion {
                region,
                ion,
                rev_pot,
                int_con,
                ext_con,
            } => serde_json::json!({
                "paint": "ion", "region": region, "ion": ion,
                "rev_pot": rev_pot, "int_con": int_con, "ext_con": ext_con,
            }),
            Paint::Density {
                region,
                mechanism,
                parameters,
            } => serde_json::json!({
                "paint": "density", "region": region,
                "mechanism": mechanism, "parameters": parameters,
            }),
        })
        .collect();
    serde_json::json!({
        "backend": "arbor",
        "segments": template.tree.segments().len(),
        "labels": labels,
        "paints": paints,
    })
}

fn optimizer_summary(cell: &arborize_build::OptimizerCell) -> serde_json::Value {
    serde_json::json!({
        "backend": "optimizer",
        "name": cell.name,
        "seclists": cell.seclist_names,
        "mechanisms": cell
            .mechanisms
            .iter()
            .map(|mech| serde_json::json!({
                "name": mech.name,
                "locations": mech.locations,
            }))
            .collect::<Vec<_>>(),
        "parameters": cell
            .params
            .iter()
            .map(|param| serde_json::json!({
                "name": param.name,
                "param_name": param.param_name,
                "location": param.location,
                "frozen": param.frozen,
                "bounds": param.bounds.map(|(lo, hi)| vec![lo, hi]),
                "value": param.value,
            }))
            .collect::<Vec<_>>(),
    })
}
