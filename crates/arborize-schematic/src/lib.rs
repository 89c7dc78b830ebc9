//! Morphological schematics for declarative neuron models
//!
//! This crate holds the intermediate layer between a cell reconstruction and a
//! built model: the [`Schematic`] — a labelled branch/point graph carrying a
//! model definition — plus SWC morphology I/O and rotation helpers. Backend
//! builders consume finished (frozen) schematics, in which every section's
//! cable type has been folded and completeness-checked.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod rotate;
pub mod schematic;
pub mod swc;

pub use error::{Result, SchematicError};
pub use schematic::{
    location_name, quote_join, split_compound, CableBranch, IonProp, LabelSet, Location, Param,
    Schematic, SchematicPoint, Section,
};
pub use swc::{file_schematic, tag_label};
