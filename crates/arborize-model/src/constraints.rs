//! Constraint definitions for parameter optimization
//!
//! A constraint definition has the same shape as a model definition, but every
//! property value is a [`Constraint`]: either frozen (both bounds equal) or a
//! free `[lower, upper]` range for an optimizer to explore. A constraint
//! definition lowers to a plain model definition by taking midpoints, so the
//! standard builders can consume it as well.

use crate::definition::{Definition, ModelDefinition, Synapse};
use crate::dict::{build_definition, DefinitionDict};
use crate::error::{ModelError, Result};

use serde::{Deserialize, Serialize};

/// A bounded parameter value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constraint {
    lower: f64,
    upper: f64,
    tolerance: Option<f64>,
}

impl Constraint {
    /// Create a frozen constraint from a single value
    pub fn from_value(value: f64) -> Self {
        Self {
            lower: value,
            upper: value,
            tolerance: None,
        }
    }

    /// Create a free constraint from a `[lower, upper]` range
    pub fn from_range(lower: f64, upper: f64) -> Self {
        Self {
            lower,
            upper,
            tolerance: None,
        }
    }

    /// Effective lower bound, scaled by the tolerance if one is set
    pub fn lower(&self) -> f64 {
        match self.tolerance {
            Some(tolerance) => self.lower * (1.0 - tolerance),
            None => self.lower,
        }
    }

    /// Effective upper bound, scaled by the tolerance if one is set
    pub fn upper(&self) -> f64 {
        match self.tolerance {
            Some(tolerance) => self.upper * (1.0 - tolerance),
            None => self.upper,
        }
    }

    /// Tolerance applied to the bounds, if any
    pub fn tolerance(&self) -> Option<f64> {
        self.tolerance
    }

    /// Set or clear the tolerance
    pub fn set_tolerance(&mut self, tolerance: Option<f64>) {
        self.tolerance = tolerance;
    }

    /// Whether the constraint pins a single value
    pub fn is_frozen(&self) -> bool {
        self.lower == self.upper
    }

    /// Midpoint of the raw bounds
    pub fn midpoint(&self) -> f64 {
        (self.lower + self.upper) / 2.0
    }

    fn validate(&self) -> Result<()> {
        if self.lower > self.upper {
            return Err(ModelError::InvertedConstraint {
                lower: self.lower,
                upper: self.upper,
            });
        }
        Ok(())
    }
}

impl From<f64> for Constraint {
    fn from(value: f64) -> Self {
        Self::from_value(value)
    }
}

/// Dict form of a constraint value: a scalar freezes, a pair bounds
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ConstraintValueDict {
    /// Frozen value
    Scalar(f64),
    /// `[lower, upper]` range
    Range([f64; 2]),
}

impl From<ConstraintValueDict> for Constraint {
    fn from(dict: ConstraintValueDict) -> Self {
        match dict {
            ConstraintValueDict::Scalar(value) => Constraint::from_value(value),
            ConstraintValueDict::Range([lower, upper]) => Constraint::from_range(lower, upper),
        }
    }
}

/// Definition whose property values are constraints
pub type ConstraintsDefinition = Definition<Constraint>;

/// Dict form of a constraints definition
pub type ConstraintsDefinitionDict = DefinitionDict<ConstraintValueDict>;

impl ConstraintsDefinition {
    /// Apply one tolerance to every constraint in the definition
    pub fn apply_tolerance(&mut self, tolerance: Option<f64>) {
        self.for_each_constraint_mut(|constraint| constraint.set_tolerance(tolerance));
    }

    /// Check that no constraint has inverted bounds
    pub fn validate(&self) -> Result<()> {
        let mut first_error = None;
        self.for_each_constraint(|constraint| {
            if first_error.is_none() {
                if let Err(err) = constraint.validate() {
                    first_error = Some(err);
                }
            }
        });
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Lower to a plain model definition by taking constraint midpoints
    pub fn to_model(&self) -> ModelDefinition {
        let mut model = ModelDefinition::new().with_use_defaults(self.use_defaults);
        for (label, cable_type) in self.cable_types() {
            let mut lowered = crate::definition::CableType::default();
            lowered.cable.ra = cable_type.cable.ra.map(|c| c.midpoint());
            lowered.cable.cm = cable_type.cable.cm.map(|c| c.midpoint());
            for (name, ion) in &cable_type.ions {
                lowered.ions.insert(
                    name.clone(),
                    crate::definition::Ion {
                        rev_pot: ion.rev_pot.map(|c| c.midpoint()),
                        int_con: ion.int_con.map(|c| c.midpoint()),
                        ext_con: ion.ext_con.map(|c| c.midpoint()),
                    },
                );
            }
            for (id, mech) in &cable_type.mechs {
                lowered.mechs.insert(
                    id.clone(),
                    crate::definition::Mechanism::new(
                        mech.parameters
                            .iter()
                            .map(|(k, c)| (k.clone(), c.midpoint()))
                            .collect(),
                    ),
                );
            }
            for (syn_label, synapse) in &cable_type.synapses {
                lowered.synapses.insert(
                    syn_label.clone(),
                    lower_synapse(synapse),
                );
            }
            model
                .add_cable_type(label, lowered)
                .expect("labels are unique in the source definition");
        }
        for (label, synapse) in self.synapse_types() {
            model
                .add_synapse_type(label.clone(), lower_synapse(synapse))
                .expect("labels are unique in the source definition");
        }
        model
    }

    fn for_each_constraint(&self, mut f: impl FnMut(&Constraint)) {
        for (_, cable_type) in self.cable_types() {
            for (_, value) in cable_type.cable.iter() {
                if let Some(constraint) = value {
                    f(constraint);
                }
            }
            for ion in cable_type.ions.values() {
                for (_, value) in ion.iter() {
                    if let Some(constraint) = value {
                        f(constraint);
                    }
                }
            }
            for mech in cable_type.mechs.values() {
                for constraint in mech.parameters.values() {
                    f(constraint);
                }
            }
            for synapse in cable_type.synapses.values() {
                for constraint in synapse.parameters.values() {
                    f(constraint);
                }
            }
        }
        for synapse in self.synapse_types().values() {
            for constraint in synapse.parameters.values() {
                f(constraint);
            }
        }
    }

    fn for_each_constraint_mut(&mut self, mut f: impl FnMut(&mut Constraint)) {
        let labels: Vec<String> = self.cable_types().map(|(l, _)| l.to_string()).collect();
        for label in labels {
            let cable_type = self
                .get_cable_type_mut(&label)
                .expect("label taken from the same definition");
            if let Some(constraint) = cable_type.cable.ra.as_mut() {
                f(constraint);
            }
            if let Some(constraint) = cable_type.cable.cm.as_mut() {
                f(constraint);
            }
            for ion in cable_type.ions.values_mut() {
                if let Some(constraint) = ion.rev_pot.as_mut() {
                    f(constraint);
                }
                if let Some(constraint) = ion.int_con.as_mut() {
                    f(constraint);
                }
                if let Some(constraint) = ion.ext_con.as_mut() {
                    f(constraint);
                }
            }
            for mech in cable_type.mechs.values_mut() {
                for constraint in mech.parameters.values_mut() {
                    f(constraint);
                }
            }
            for synapse in cable_type.synapses.values_mut() {
                for constraint in synapse.parameters.values_mut() {
                    f(constraint);
                }
            }
        }
        for synapse in self.synapse_types_mut().values_mut() {
            for constraint in synapse.parameters.values_mut() {
                f(constraint);
            }
        }
    }
}

fn lower_synapse(synapse: &Synapse<Constraint>) -> Synapse<f64> {
    Synapse::new(
        synapse.mech_id.clone(),
        synapse
            .parameters
            .iter()
            .map(|(k, c)| (k.clone(), c.midpoint()))
            .collect(),
    )
}

/// Parse a constraints dict, applying `tolerance` to every constraint
pub fn define_constraints(
    dict: ConstraintsDefinitionDict,
    tolerance: Option<f64>,
) -> Result<ConstraintsDefinition> {
    let mut constraints: ConstraintsDefinition = build_definition(dict)?;
    constraints.validate()?;
    constraints.apply_tolerance(tolerance);
    Ok(constraints)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_freezes_range_frees() {
        let frozen = Constraint::from(ConstraintValueDict::Scalar(1.5));
        assert!(frozen.is_frozen());
        assert_eq!(frozen.upper(), 1.5);

        let free = Constraint::from(ConstraintValueDict::Range([0.05, 0.125]));
        assert!(!free.is_frozen());
        assert_eq!(free.lower(), 0.05);
        assert_eq!(free.upper(), 0.125);
    }

    #[test]
    fn tolerance_scales_both_bounds() {
        let mut constraint = Constraint::from_range(10.0, 20.0);
        constraint.set_tolerance(Some(0.1));
        assert!((constraint.lower() - 9.0).abs() < 1e-12);
        assert!((constraint.upper() - 18.0).abs() < 1e-12);
    }

    #[test]
    fn define_constraints_rejects_inverted_ranges() {
        let dict: ConstraintsDefinitionDict = serde_json::from_str(
            r#"{
                "cable_types": {
                    "soma": {
                        "cable": {"Ra": 100.0, "cm": 1.0},
                        "mechanisms": {"hh": {"gnabar": [0.2, 0.1]}}
                    }
                }
            }"#,
        )
        .unwrap();
        let err = define_constraints(dict, None).unwrap_err();
        assert!(matches!(err, ModelError::InvertedConstraint { .. }));
    }

    #[test]
    fn lowers_to_midpoint_model() {
        let dict: ConstraintsDefinitionDict = serde_json::from_str(
            r#"{
                "cable_types": {
                    "soma": {
                        "cable": {"Ra": 100.0, "cm": 1.0},
                        "mechanisms": {"hh": {"gnabar": [0.05, 0.125]}}
                    }
                }
            }"#,
        )
        .unwrap();
        let constraints = define_constraints(dict, None).unwrap();
        let model = constraints.to_model();
        let soma = model.get_cable_type("soma").unwrap();
        assert_eq!(soma.cable.ra, Some(100.0));
        let hh = &soma.mechs[&crate::MechId::new("hh")];
        assert!((hh.parameters["gnabar"] - 0.0875).abs() < 1e-12);
    }
}
