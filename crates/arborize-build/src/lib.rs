//! Backend builders for declarative neuron models
//!
//! Lowering happens in two steps: freezing the schematic resolves every
//! section's cable type and checks completeness, then a builder walks the
//! frozen structure and emits a backend template — a NEURON-style sectioned
//! model, an Arbor-style cable cell template, or an optimizer cell for
//! parameter fitting. Mechanism ids are resolved and parameter names validated
//! against a catalog while lowering, so an invalid definition can never reach
//! a backend.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod arbor;
pub mod error;
pub mod neuron;
pub mod optimize;

pub use arbor::{arbor_build, CableCell, CableCellTemplate, Decor, LabelDict, Paint, SegmentTree};
pub use error::{BuildError, Result};
pub use neuron::{neuron_build, LocationAccessor, NeuronModel, NrnSection, PointProcess};
pub use optimize::{optimizer_build, OptMechanism, OptParameter, OptimizerCell};
