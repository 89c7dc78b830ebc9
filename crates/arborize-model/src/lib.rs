//! Declarative definitions for multicompartmental neuron models
//!
//! A model definition bundles labelled cable types — passive cable properties,
//! ion settings, density mechanisms, and synapses — plus globally available
//! synapse types. Definitions are written as plain dictionaries (JSON/TOML or
//! in-code structs), merge over each other with last-wins semantics, and stay
//! partial until a morphological schematic folds them into concrete per-branch
//! property sets.
//!
//! Constraint definitions reuse the same shape with `[lower, upper]` bounds
//! instead of scalars, for handing models to parameter-fitting workflows.

#![warn(missing_docs)]

pub mod constraints;
pub mod definition;
pub mod dict;
pub mod error;
pub mod mech_id;

pub use constraints::{
    define_constraints, Constraint, ConstraintValueDict, ConstraintsDefinition,
    ConstraintsDefinitionDict,
};
pub use definition::{
    default_ion, CableProperties, CableType, Definition, Ion, Mechanism, ModelDefinition, Synapse,
    Value, DEFAULT_CM, DEFAULT_RA,
};
pub use dict::{
    define_model, define_model_with, CablePropertiesDict, CableTypeDict, DefinitionDict, IonDict,
    ModelDefinitionDict, SynapseDict,
};
pub use error::{ModelError, Result};
pub use mech_id::MechId;
