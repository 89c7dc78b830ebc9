//! Mechanism identifiers
//!
//! A mechanism is addressed by one to three parts: an asset name, an optional
//! variant, and an optional package. The textual form joins the parts with
//! `/`, e.g. `"hh"`, `"Kir2_3/0"`, or `"cdp5/CR/dbbs_mod_collection"`.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ModelError, Result};

/// One- to three-part mechanism identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MechId {
    /// Asset name of the mechanism
    pub name: String,
    /// Variant of the asset, if pinned
    pub variant: Option<String>,
    /// Package the asset comes from, if pinned
    pub package: Option<String>,
}

impl MechId {
    /// Create a bare mechanism id from an asset name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variant: None,
            package: None,
        }
    }

    /// Pin the id to a variant
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    /// Pin the id to a package
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    /// Parse an id, reporting empty or surplus parts
    pub fn parse(raw: &str) -> Result<Self> {
        let parts: Vec<&str> = raw.split('/').collect();
        if parts.len() > 3 {
            return Err(ModelError::invalid_mech_id(
                raw,
                "expected at most name/variant/package",
            ));
        }
        if parts.iter().any(|p| p.is_empty()) {
            return Err(ModelError::invalid_mech_id(raw, "id parts may not be empty"));
        }
        let mut iter = parts.into_iter();
        let name = iter.next().expect("split yields at least one part");
        Ok(Self {
            name: name.to_string(),
            variant: iter.next().map(str::to_string),
            package: iter.next().map(str::to_string),
        })
    }
}

impl Display for MechId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(variant) = &self.variant {
            write!(f, "/{}", variant)?;
        }
        if let Some(package) = &self.package {
            write!(f, "/{}", package)?;
        }
        Ok(())
    }
}

impl FromStr for MechId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<&str> for MechId {
    fn from(raw: &str) -> Self {
        // Infallible convenience for literals; parse() is the checked path.
        let mut iter = raw.split('/').filter(|p| !p.is_empty());
        let name = iter.next().unwrap_or(raw).to_string();
        Self {
            name,
            variant: iter.next().map(str::to_string),
            package: iter.next().map(str::to_string),
        }
    }
}

impl Serialize for MechId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MechId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        MechId::parse(&raw).map_err(serde::de::Error::custom)
    }
}
