//! Error types for schematics and morphology I/O

use thiserror::Error;

use arborize_model::ModelError;

/// Result type for schematic operations
pub type Result<T> = std::result::Result<T, SchematicError>;

/// Errors that can occur while constructing, loading, or freezing schematics
#[derive(Error, Debug)]
pub enum SchematicError {
    /// A mutating operation reached a finished schematic
    #[error("Can't {operation} of a finished schematic")]
    Frozen {
        /// Operation that was attempted
        operation: &'static str,
    },

    /// An operation requires the schematic to be finished first
    #[error("Schematic must be finished before {operation}")]
    NotFrozen {
        /// Operation that was attempted
        operation: &'static str,
    },

    /// Locations were not appended in ascending branch/point order
    #[error("Locations need to be constructed in order. Can't construct {got}, should construct {expected}")]
    OutOfOrder {
        /// Location that was attempted
        got: String,
        /// Location(s) that would have been valid
        expected: String,
    },

    /// An endpoint referenced a location that does not exist
    #[error("Endpoint ({0}.{1}) does not exist", .endpoint.0, .endpoint.1)]
    UnknownEndpoint {
        /// The missing endpoint location
        endpoint: (usize, usize),
    },

    /// A branch definition was incomplete after folding its labels
    #[error("{location} labelled {labels} is missing a value: {source}")]
    IncompleteSection {
        /// Location or interval string of the branch
        location: String,
        /// Quote-joined labels of the branch
        labels: String,
        /// The underlying missing-property error
        source: ModelError,
    },

    /// A branch without labels was left without a complete definition
    #[error("Unlabeled {location} is missing a value: {source}")]
    UnlabeledSection {
        /// Location or interval string of the branch
        location: String,
        /// The underlying missing-property error
        source: ModelError,
    },

    /// Definition-layer error
    #[error("Definition error: {0}")]
    Model(#[from] ModelError),

    /// I/O error while reading or writing a morphology file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Morphology file extension is not supported
    #[error("Can't load '{path}': only SWC morphologies are supported")]
    UnsupportedFormat {
        /// Offending path
        path: String,
    },

    /// A morphology file contained no samples
    #[error("Morphology contains no samples")]
    EmptyMorphology,

    /// A sample line could not be parsed
    #[error("Malformed sample on line {line}: {reason}")]
    MalformedSample {
        /// 1-based line number
        line: usize,
        /// Reason the line was rejected
        reason: String,
    },

    /// A sample id appeared twice
    #[error("Duplicate sample id {id} on line {line}")]
    DuplicateSample {
        /// 1-based line number
        line: usize,
        /// Offending sample id
        id: u64,
    },

    /// A sample referenced a parent that was not defined before it
    #[error("Sample on line {line} references unknown parent {parent}")]
    UnknownParent {
        /// 1-based line number
        line: usize,
        /// Offending parent id
        parent: i64,
    },

    /// A rotation was requested between degenerate vectors
    #[error("Can't rotate along a zero-length orientation vector")]
    ZeroVector,
}

impl SchematicError {
    /// Create an out-of-order construction error
    pub fn out_of_order(got: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::OutOfOrder {
            got: got.into(),
            expected: expected.into(),
        }
    }

    /// Create a malformed-sample error
    pub fn malformed_sample(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedSample {
            line,
            reason: reason.into(),
        }
    }
}
