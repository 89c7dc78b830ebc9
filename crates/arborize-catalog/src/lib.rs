//! Mechanism catalog — resolution and parameter validation
//!
//! Builders never insert a mechanism by raw name: every mechanism id from a
//! definition is resolved through a catalog, which pins the id to a concrete
//! entry (asset, variant, package), yields the mod name a simulator would
//! load, and validates parameter assignments against the entry's parameter
//! list.
//!
//! The built-in entries cover the mechanisms every NEURON distribution ships;
//! packaged channel libraries register their own entries on top.

#![deny(missing_docs)]

use std::fmt::{Display, Formatter};

use thiserror::Error;

use arborize_model::MechId;

/// Result type for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors that can occur while resolving mechanisms
#[derive(Error, Debug)]
pub enum CatalogError {
    /// No entry matches the mechanism id
    #[error("Could not find '{name}.{variant}' in the mechanism catalog")]
    NotFound {
        /// Asset name that was looked up
        name: String,
        /// Variant that was looked up
        variant: String,
    },

    /// Several entries match an underspecified mechanism id
    #[error("Mechanism id '{id}' is ambiguous, candidates: {candidates}")]
    Ambiguous {
        /// The underspecified id
        id: String,
        /// Comma-joined candidate entries
        candidates: String,
    },

    /// A parameter name is not part of the resolved mechanism
    #[error("The attribute '{parameter}' is not found on mechanism '{mechanism}'")]
    UnknownParameter {
        /// Resolved mod name of the mechanism
        mechanism: String,
        /// Offending parameter name
        parameter: String,
    },

    /// A density mechanism was used as a point process or vice versa
    #[error("Mechanism '{id}' is a {found} but was used as a {expected}")]
    KindMismatch {
        /// Mechanism id as written
        id: String,
        /// Kind required by the call site
        expected: MechanismKind,
        /// Kind of the catalog entry
        found: MechanismKind,
    },

    /// An entry with the same name, variant, and package already exists
    #[error("Catalog entry '{id}' is already registered")]
    DuplicateEntry {
        /// Fully qualified id of the entry
        id: String,
    },
}

/// Whether a mechanism paints a density over a region or sits at a point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MechanismKind {
    /// Distributed membrane mechanism
    Density,
    /// Point process (synapse)
    PointProcess,
}

impl Display for MechanismKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MechanismKind::Density => write!(f, "density mechanism"),
            MechanismKind::PointProcess => write!(f, "point process"),
        }
    }
}

/// Parameter accepted by a mechanism
#[derive(Debug, Clone)]
pub struct ParameterSpec {
    /// Parameter name as it appears in the mod file
    pub name: String,
    /// Default value the simulator would assign
    pub default: f64,
}

/// A resolvable catalog entry
#[derive(Debug, Clone)]
pub struct MechanismEntry {
    /// Asset name
    pub name: String,
    /// Variant of the asset
    pub variant: String,
    /// Package the asset comes from; `None` for simulator built-ins
    pub package: Option<String>,
    /// Density or point process
    pub kind: MechanismKind,
    /// Accepted parameters
    pub parameters: Vec<ParameterSpec>,
}

impl MechanismEntry {
    /// Create an entry for a packaged mechanism with the default variant
    pub fn new(
        package: impl Into<String>,
        name: impl Into<String>,
        kind: MechanismKind,
    ) -> Self {
        Self {
            name: name.into(),
            variant: DEFAULT_VARIANT.to_string(),
            package: Some(package.into()),
            kind,
            parameters: Vec::new(),
        }
    }

    /// Pin the entry to a variant
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = variant.into();
        self
    }

    /// Declare an accepted parameter
    pub fn with_parameter(mut self, name: impl Into<String>, default: f64) -> Self {
        self.parameters.push(ParameterSpec {
            name: name.into(),
            default,
        });
        self
    }

    /// Fully qualified id of the entry
    pub fn qualified_id(&self) -> String {
        match &self.package {
            Some(package) => format!("{}/{}/{}", self.name, self.variant, package),
            None => self.name.clone(),
        }
    }

    /// Mod name a simulator would load for this entry
    pub fn mod_name(&self) -> String {
        match &self.package {
            Some(package) => format!("glia__{}__{}__{}", package, self.name, self.variant),
            None => self.name.clone(),
        }
    }

    fn matches(&self, id: &MechId) -> bool {
        if self.name != id.name {
            return false;
        }
        let variant = id.variant.as_deref().unwrap_or(DEFAULT_VARIANT);
        if self.variant != variant {
            return false;
        }
        match &id.package {
            Some(package) => self.package.as_deref() == Some(package.as_str()),
            None => true,
        }
    }
}

/// Variant assumed when a mechanism id does not pin one
pub const DEFAULT_VARIANT: &str = "0";

struct BuiltinSpec {
    name: &'static str,
    kind: MechanismKind,
    parameters: &'static [(&'static str, f64)],
}

/// Mechanisms every NEURON distribution ships
static BUILTINS: &[BuiltinSpec] = &[
    BuiltinSpec {
        name: "pas",
        kind: MechanismKind::Density,
        parameters: &[("g", 0.001), ("e", -70.0)],
    },
    BuiltinSpec {
        name: "hh",
        kind: MechanismKind::Density,
        parameters: &[
            ("gnabar", 0.12),
            ("gkbar", 0.036),
            ("gl", 0.0003),
            ("el", -54.3),
        ],
    },
    BuiltinSpec {
        name: "extracellular",
        kind: MechanismKind::Density,
        parameters: &[("xraxial", 1e9), ("xg", 1e9), ("xc", 0.0)],
    },
    BuiltinSpec {
        name: "ExpSyn",
        kind: MechanismKind::PointProcess,
        parameters: &[("tau", 0.1), ("e", 0.0)],
    },
    BuiltinSpec {
        name: "Exp2Syn",
        kind: MechanismKind::PointProcess,
        parameters: &[("tau1", 0.1), ("tau2", 10.0), ("e", 0.0)],
    },
    BuiltinSpec {
        name: "AlphaSynapse",
        kind: MechanismKind::PointProcess,
        parameters: &[("onset", 0.0), ("tau", 0.1), ("gmax", 0.0), ("e", 0.0)],
    },
];

/// Catalog of resolvable mechanisms
pub struct Catalog {
    entries: Vec<MechanismEntry>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Catalog {
    /// Create an empty catalog
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Create a catalog holding the simulator built-ins
    pub fn builtin() -> Self {
        let entries = BUILTINS
            .iter()
            .map(|spec| MechanismEntry {
                name: spec.name.to_string(),
                variant: DEFAULT_VARIANT.to_string(),
                package: None,
                kind: spec.kind,
                parameters: spec
                    .parameters
                    .iter()
                    .map(|(name, default)| ParameterSpec {
                        name: name.to_string(),
                        default: *default,
                    })
                    .collect(),
            })
            .collect();
        Self { entries }
    }

    /// Register an entry, rejecting exact duplicates
    pub fn register(&mut self, entry: MechanismEntry) -> Result<()> {
        let duplicate = self.entries.iter().any(|existing| {
            existing.name == entry.name
                && existing.variant == entry.variant
                && existing.package == entry.package
        });
        if duplicate {
            return Err(CatalogError::DuplicateEntry {
                id: entry.qualified_id(),
            });
        }
        log::debug!("registering mechanism {}", entry.qualified_id());
        self.entries.push(entry);
        Ok(())
    }

    /// Iterate all entries
    pub fn entries(&self) -> impl Iterator<Item = &MechanismEntry> {
        self.entries.iter()
    }

    /// Resolve a mechanism id to its catalog entry.
    ///
    /// An id without a variant resolves against variant `"0"`; an id without a
    /// package matches any package, but only if exactly one entry remains.
    pub fn resolve(&self, id: &MechId) -> Result<&MechanismEntry> {
        let matches: Vec<&MechanismEntry> =
            self.entries.iter().filter(|e| e.matches(id)).collect();
        match matches.len() {
            0 => Err(CatalogError::NotFound {
                name: id.name.clone(),
                variant: id.variant.clone().unwrap_or_else(|| DEFAULT_VARIANT.into()),
            }),
            1 => Ok(matches[0]),
            _ => Err(CatalogError::Ambiguous {
                id: id.to_string(),
                candidates: matches
                    .iter()
                    .map(|e| e.qualified_id())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    /// Resolve an id that must be a density mechanism
    pub fn resolve_density(&self, id: &MechId) -> Result<&MechanismEntry> {
        self.resolve_kind(id, MechanismKind::Density)
    }

    /// Resolve an id that must be a point process
    pub fn resolve_point_process(&self, id: &MechId) -> Result<&MechanismEntry> {
        self.resolve_kind(id, MechanismKind::PointProcess)
    }

    fn resolve_kind(&self, id: &MechId, expected: MechanismKind) -> Result<&MechanismEntry> {
        let entry = self.resolve(id)?;
        if entry.kind != expected {
            return Err(CatalogError::KindMismatch {
                id: id.to_string(),
                expected,
                found: entry.kind,
            });
        }
        Ok(entry)
    }

    /// Validate parameter names against the resolved entry
    pub fn validate_parameters<'a>(
        &self,
        id: &MechId,
        parameters: impl IntoIterator<Item = &'a str>,
    ) -> Result<()> {
        let entry = self.resolve(id)?;
        for parameter in parameters {
            if !entry.parameters.iter().any(|spec| spec.name == parameter) {
                return Err(CatalogError::UnknownParameter {
                    mechanism: entry.mod_name(),
                    parameter: parameter.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_resolve_to_plain_mod_names() {
        let catalog = Catalog::builtin();
        let entry = catalog.resolve(&MechId::new("pas")).unwrap();
        assert_eq!(entry.mod_name(), "pas");
        assert_eq!(entry.kind, MechanismKind::Density);
    }

    #[test]
    fn packaged_entries_resolve_to_qualified_mod_names() {
        let mut catalog = Catalog::builtin();
        catalog
            .register(
                MechanismEntry::new("dbbs", "cdp5", MechanismKind::Density)
                    .with_variant("CR")
                    .with_parameter("TotalPump", 1e-9),
            )
            .unwrap();

        let entry = catalog
            .resolve(&MechId::new("cdp5").with_variant("CR"))
            .unwrap();
        assert_eq!(entry.mod_name(), "glia__dbbs__cdp5__CR");
    }

    #[test]
    fn missing_mechanism_reports_name_and_variant() {
        let catalog = Catalog::builtin();
        let err = catalog.resolve(&MechId::new("Kir2_3")).unwrap_err();
        let msg = format!("{}", err);
        assert!(msg.contains("Kir2_3.0"));
    }

    #[test]
    fn ambiguous_ids_list_candidates() {
        let mut catalog = Catalog::empty();
        catalog
            .register(MechanismEntry::new("pkg_a", "Kv1_1", MechanismKind::Density))
            .unwrap();
        catalog
            .register(MechanismEntry::new("pkg_b", "Kv1_1", MechanismKind::Density))
            .unwrap();

        let err = catalog.resolve(&MechId::new("Kv1_1")).unwrap_err();
        match err {
            CatalogError::Ambiguous { candidates, .. } => {
                assert!(candidates.contains("pkg_a"));
                assert!(candidates.contains("pkg_b"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Pinning the package disambiguates.
        let entry = catalog
            .resolve(&MechId::new("Kv1_1").with_variant("0").with_package("pkg_b"))
            .unwrap();
        assert_eq!(entry.package.as_deref(), Some("pkg_b"));
    }

    #[test]
    fn parameter_validation_names_the_culprit() {
        let catalog = Catalog::builtin();
        let err = catalog
            .validate_parameters(&MechId::new("pas"), ["e", "gmax"])
            .unwrap_err();
        match err {
            CatalogError::UnknownParameter {
                mechanism,
                parameter,
            } => {
                assert_eq!(mechanism, "pas");
                assert_eq!(parameter, "gmax");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn kind_is_enforced() {
        let catalog = Catalog::builtin();
        let err = catalog
            .resolve_density(&MechId::new("ExpSyn"))
            .unwrap_err();
        assert!(matches!(err, CatalogError::KindMismatch { .. }));
        assert!(catalog.resolve_point_process(&MechId::new("ExpSyn")).is_ok());
    }
}
