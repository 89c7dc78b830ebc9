//! Optimizer builder
//!
//! Lowers a constraint-carrying schematic into an [`OptimizerCell`]: the
//! section lists, mechanism placements, and frozen/free parameter ranges a
//! parameter-fitting framework needs to set up an optimization. Frozen
//! constraints become fixed-value parameters; free constraints carry their
//! bounds.

use std::collections::BTreeMap;

use arborize_catalog::Catalog;
use arborize_model::Constraint;
use arborize_schematic::Schematic;

use crate::error::Result;

/// Temperature every optimization runs at, in °C
const CELSIUS: f64 = 32.0;

/// A mechanism placed on one or more section lists
#[derive(Debug, Clone)]
pub struct OptMechanism {
    /// Resolved mod name
    pub name: String,
    /// Attribute prefix, identical to the mod name
    pub prefix: String,
    /// Section lists the mechanism is present on
    pub locations: Vec<String>,
}

/// One optimization parameter
#[derive(Debug, Clone)]
pub struct OptParameter {
    /// Unique parameter name
    pub name: String,
    /// Attribute the parameter sets on its sections
    pub param_name: String,
    /// Section list the parameter applies to; `None` for globals
    pub location: Option<String>,
    /// Whether the parameter is pinned to a single value
    pub frozen: bool,
    /// `[lower, upper]` bounds of a free parameter
    pub bounds: Option<(f64, f64)>,
    /// Pinned value of a frozen parameter
    pub value: Option<f64>,
}

impl OptParameter {
    fn from_constraint(
        name: String,
        param_name: String,
        location: Option<String>,
        constraint: &Constraint,
    ) -> Self {
        let frozen = constraint.is_frozen();
        Self {
            name,
            param_name,
            location,
            frozen,
            bounds: (!frozen).then(|| (constraint.lower(), constraint.upper())),
            value: frozen.then(|| constraint.upper()),
        }
    }
}

/// A cell model set up for parameter optimization
#[derive(Debug, Clone)]
pub struct OptimizerCell {
    /// Instance name of the model
    pub name: String,
    /// Section list names, one per compound cable type
    pub seclist_names: Vec<String>,
    /// Mechanism placements
    pub mechanisms: Vec<OptMechanism>,
    /// Frozen and free parameters
    pub params: Vec<OptParameter>,
}

/// Build an optimizer cell from a constraint-carrying schematic.
///
/// Freezes the schematic, so constraint resolution errors surface here.
pub fn optimizer_build(
    schematic: &mut Schematic<Constraint>,
    catalog: &Catalog,
) -> Result<OptimizerCell> {
    schematic.freeze()?;
    let name = schematic.create_name()?;
    log::debug!("building optimizer cell '{name}'");
    let compound = schematic.compound_cable_types()?;

    let seclist_names: Vec<String> = compound.iter().map(|(label, _)| label.clone()).collect();

    // Mechanisms keep the order in which their first placement appears.
    let mut mech_locations: Vec<(String, Vec<String>)> = Vec::new();
    for (label, cable_type) in &compound {
        for mech_id in cable_type.mechs.keys() {
            let mod_name = catalog.resolve_density(mech_id)?.mod_name();
            match mech_locations.iter_mut().find(|(name, _)| *name == mod_name) {
                Some((_, locations)) => locations.push(label.clone()),
                None => mech_locations.push((mod_name, vec![label.clone()])),
            }
        }
    }
    let mechanisms = mech_locations
        .into_iter()
        .map(|(name, locations)| OptMechanism {
            prefix: name.clone(),
            name,
            locations,
        })
        .collect();

    let mut params = vec![OptParameter {
        name: "temperature".to_string(),
        param_name: "celsius".to_string(),
        location: None,
        frozen: true,
        bounds: None,
        value: Some(CELSIUS),
    }];

    for (label, cable_type) in &compound {
        for (mech_id, mech) in &cable_type.mechs {
            let mod_name = catalog.resolve_density(mech_id)?.mod_name();
            catalog.validate_parameters(mech_id, mech.parameters.keys().map(String::as_str))?;
            for (param, constraint) in &mech.parameters {
                params.push(OptParameter::from_constraint(
                    format!("{param}_{mod_name}_{label}"),
                    format!("{param}_{mod_name}"),
                    Some(label.clone()),
                    constraint,
                ));
            }
        }
    }

    for (label, cable_type) in &compound {
        for (property, constraint) in cable_type.cable.iter() {
            if let Some(constraint) = constraint {
                params.push(OptParameter::from_constraint(
                    format!("{label}_{property}"),
                    property.to_string(),
                    Some(label.clone()),
                    constraint,
                ));
            }
        }
    }

    for (label, cable_type) in &compound {
        for (ion, settings) in &cable_type.ions {
            for (property, constraint) in settings.iter() {
                if let Some(constraint) = constraint {
                    params.push(OptParameter::from_constraint(
                        format!("{label}_{ion}_{property}"),
                        ion_param_name(ion, property),
                        Some(label.clone()),
                        constraint,
                    ));
                }
            }
        }
    }

    Ok(OptimizerCell {
        name,
        seclist_names,
        mechanisms,
        params,
    })
}

fn ion_param_name(ion: &str, property: &str) -> String {
    match property {
        "rev_pot" => format!("e{ion}"),
        "int_con" => format!("{ion}i"),
        "ext_con" => format!("{ion}o"),
        other => format!("{other}_{ion}"),
    }
}

/// Parameter map of an optimizer cell, keyed by parameter name
pub fn parameter_index(cell: &OptimizerCell) -> BTreeMap<&str, &OptParameter> {
    cell.params.iter().map(|p| (p.name.as_str(), p)).collect()
}
