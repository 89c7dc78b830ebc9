//! Error types for backend builders

use thiserror::Error;

use arborize_catalog::CatalogError;
use arborize_schematic::SchematicError;

/// Result type for builder operations
pub type Result<T> = std::result::Result<T, BuildError>;

/// Errors that can occur while lowering a schematic to a backend template
#[derive(Error, Debug)]
pub enum BuildError {
    /// Schematic layer error
    #[error("Schematic error: {0}")]
    Schematic(#[from] SchematicError),

    /// Mechanism catalog error
    #[error("Mechanism error: {0}")]
    Catalog(#[from] CatalogError),

    /// A cable had fewer than the two points a segment needs
    #[error("Branch {branch} needs at least 2 points")]
    BranchTooShort {
        /// Offending cable id
        branch: usize,
    },

    /// A location was requested that the model does not contain
    #[error("No such location '{location}'")]
    UnknownLocation {
        /// The missing location
        location: String,
    },

    /// A synapse was requested on a branch that defines no synapse types
    #[error("Can't insert synapses. No synapse types present on branch with labels {labels}")]
    NoSynapses {
        /// Quote-joined labels of the branch
        labels: String,
    },

    /// A synapse label is not available on the targeted branch
    #[error("Synapse type '{synapse}' not present on branch with labels {labels}. Choose from: {choices}")]
    UnknownSynapse {
        /// Requested synapse label
        synapse: String,
        /// Quote-joined labels of the branch
        labels: String,
        /// Quote-joined available synapse labels
        choices: String,
    },

    /// A second spike transmitter was registered on a section
    #[error("A transmitter already exists with gid {gid}")]
    TransmitterExists {
        /// Gid of the existing transmitter
        gid: u64,
    },
}

impl BuildError {
    /// Create an unknown-location error
    pub fn unknown_location(location: impl Into<String>) -> Self {
        Self::UnknownLocation {
            location: location.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BuildError::BranchTooShort { branch: 3 };
        assert_eq!(format!("{}", err), "Branch 3 needs at least 2 points");

        let err = BuildError::unknown_location("(1.0)");
        assert!(format!("{}", err).contains("(1.0)"));
    }
}
