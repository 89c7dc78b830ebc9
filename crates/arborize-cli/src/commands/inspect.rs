//! Morphology inspection command

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Args;

use arborize_schematic::{file_schematic, Schematic};

use crate::error::CliResult;

/// Inspect a morphology file
#[derive(Args, Debug)]
pub struct InspectCommand {
    /// Morphology file (.swc)
    pub morphology: PathBuf,
}

impl InspectCommand {
    pub async fn execute(self) -> CliResult<()> {
        let schematic: Schematic = file_schematic(&self.morphology, None, None)?;

        let mut label_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut total_length = 0.0;
        for section in schematic.sections() {
            for label in &section.labels {
                *label_counts.entry(label.clone()).or_default() += 1;
            }
            total_length += section_length(&schematic, section);
        }

        println!("Morphology: {}", self.morphology.display());
        if let Some(name) = schematic.name() {
            println!("Name:       {}", name);
        }
        println!("Branches:   {}", schematic.cables().len());
        println!("Sections:   {}", schematic.section_count());
        println!("Points:     {}", schematic.point_count());
        println!("Length:     {:.1} um", total_length);
        println!("Labels:");
        for (label, count) in label_counts {
            println!("  - {} ({} sections)", label, count);
        }
        Ok(())
    }
}

fn section_length(schematic: &Schematic, section: &arborize_schematic::Section) -> f64 {
    let coords: Vec<[f64; 3]> = section
        .points
        .iter()
        .filter_map(|&loc| schematic.point(loc))
        .map(|p| p.coords)
        .collect();
    coords
        .windows(2)
        .map(|pair| {
            ((pair[0][0] - pair[1][0]).powi(2)
                + (pair[0][1] - pair[1][1]).powi(2)
                + (pair[0][2] - pair[1][2]).powi(2))
            .sqrt()
        })
        .sum()
}
