//! Error types for model definitions

use thiserror::Error;

/// Result type for definition operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors that can occur while building or merging model definitions
#[derive(Error, Debug)]
pub enum ModelError {
    /// A cable type label was defined twice
    #[error("Cable type '{label}' already exists")]
    DuplicateCableType {
        /// Offending label
        label: String,
    },

    /// An ion was defined twice within one cable type
    #[error("An ion named '{name}' already exists")]
    DuplicateIon {
        /// Offending ion name
        name: String,
    },

    /// A mechanism was defined twice within one cable type
    #[error("A mechanism with id '{id}' already exists")]
    DuplicateMechanism {
        /// Offending mechanism id
        id: String,
    },

    /// A synapse label was defined twice
    #[error("A synapse with label '{label}' already exists")]
    DuplicateSynapse {
        /// Offending synapse label
        label: String,
    },

    /// A mechanism id string could not be parsed
    #[error("'{raw}' is not a valid mechanism id: {reason}")]
    InvalidMechId {
        /// Raw id string
        raw: String,
        /// Reason the id was rejected
        reason: String,
    },

    /// A required cable property was left unset on a folded cable type
    #[error("Missing value for cable property '{property}'")]
    MissingCableProperty {
        /// Name of the unset property
        property: &'static str,
    },

    /// A required ion property was left unset on a folded cable type
    #[error("Missing value for property '{property}' of ion '{ion}'")]
    MissingIonProperty {
        /// Ion the property belongs to
        ion: String,
        /// Name of the unset property
        property: &'static str,
    },

    /// A constraint range was inverted
    #[error("Constraint lower bound {lower} exceeds upper bound {upper}")]
    InvertedConstraint {
        /// Lower bound
        lower: f64,
        /// Upper bound
        upper: f64,
    },

    /// A definition dictionary entry could not be interpreted
    #[error("Invalid definition for '{context}': {reason}")]
    InvalidDefinition {
        /// Which entry was invalid
        context: String,
        /// Reason the entry was rejected
        reason: String,
    },
}

impl ModelError {
    /// Create an invalid mechanism id error
    pub fn invalid_mech_id(raw: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidMechId {
            raw: raw.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid-definition error
    pub fn invalid_definition(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Name of the property a missing-property error refers to, if any
    pub fn missing_property(&self) -> Option<&'static str> {
        match self {
            Self::MissingCableProperty { property } => Some(property),
            Self::MissingIonProperty { property, .. } => Some(property),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ModelError::MissingCableProperty { property: "ra" };
        assert_eq!(format!("{}", err), "Missing value for cable property 'ra'");

        let err = ModelError::MissingIonProperty {
            ion: "ca".into(),
            property: "rev_pot",
        };
        let msg = format!("{}", err);
        assert!(msg.contains("ion 'ca'"));
        assert!(msg.contains("'rev_pot'"));
    }

    #[test]
    fn test_missing_property_accessor() {
        let err = ModelError::MissingCableProperty { property: "cm" };
        assert_eq!(err.missing_property(), Some("cm"));
        let err = ModelError::DuplicateIon { name: "k".into() };
        assert_eq!(err.missing_property(), None);
    }
}
