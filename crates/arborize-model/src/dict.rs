//! Dictionary form of model definitions
//!
//! The dict types mirror the user-facing configuration format and are plain
//! serde targets, so definitions can be written in JSON or TOML:
//!
//! ```toml
//! [cable_types.soma.cable]
//! Ra = 10.0
//! cm = 1.0
//!
//! [cable_types.soma.mechanisms.pas]
//! e = -70.0
//! g = 0.01
//!
//! [synapse_types.expsyn2]
//! mechanism = "ExpSyn"
//! parameters = { tau = 3.0 }
//! ```
//!
//! `cable_types` keeps the declaration order of the file, because that order
//! determines label priority when a schematic folds overlapping labels.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::definition::{
    CableProperties, CableType, Definition, Ion, Mechanism, ModelDefinition, Synapse, Value,
};
use crate::error::{ModelError, Result};
use crate::mech_id::MechId;

/// Dict form of [`CableProperties`]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CablePropertiesDict<D = f64> {
    /// Axial resistivity in Ω·cm
    #[serde(rename = "Ra")]
    pub ra: Option<D>,
    /// Specific membrane capacitance in µF/cm²
    pub cm: Option<D>,
}

impl<D> Default for CablePropertiesDict<D> {
    fn default() -> Self {
        Self { ra: None, cm: None }
    }
}

/// Dict form of [`Ion`]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IonDict<D = f64> {
    /// Reversal potential in mV
    pub rev_pot: Option<D>,
    /// Internal concentration in mM
    pub int_con: Option<D>,
    /// External concentration in mM
    pub ext_con: Option<D>,
}

impl<D> Default for IonDict<D> {
    fn default() -> Self {
        Self {
            rev_pot: None,
            int_con: None,
            ext_con: None,
        }
    }
}

/// Dict form of a synapse definition.
///
/// The short form treats every entry as a parameter and takes the mechanism
/// from the synapse key; the expanded form names the mechanism explicitly.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SynapseDict<D = f64> {
    /// Expanded form: `{ mechanism = "ExpSyn", parameters = { tau = 2.0 } }`
    Expanded {
        /// Mechanism that implements the point process
        mechanism: MechId,
        /// Parameter assignments
        #[serde(default = "BTreeMap::new")]
        parameters: BTreeMap<String, D>,
    },
    /// Wrapped form: `{ parameters = { tau = 2.0 } }`
    Wrapped {
        /// Parameter assignments
        parameters: BTreeMap<String, D>,
    },
    /// Short form: the entries are the parameters
    Short(BTreeMap<String, D>),
}

/// Dict form of [`CableType`]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(bound(deserialize = "D: Deserialize<'de>"))]
pub struct CableTypeDict<D = f64> {
    /// Passive cable properties
    #[serde(default)]
    pub cable: CablePropertiesDict<D>,
    /// Ion settings keyed by ion name
    #[serde(default = "BTreeMap::new")]
    pub ions: BTreeMap<String, IonDict<D>>,
    /// Mechanism parameter sets keyed by mechanism id
    #[serde(default = "BTreeMap::new")]
    pub mechanisms: BTreeMap<String, BTreeMap<String, D>>,
    /// Synapses keyed by label
    #[serde(default = "BTreeMap::new")]
    pub synapses: BTreeMap<String, SynapseDict<D>>,
}

impl<D> Default for CableTypeDict<D> {
    fn default() -> Self {
        Self {
            cable: CablePropertiesDict::default(),
            ions: BTreeMap::new(),
            mechanisms: BTreeMap::new(),
            synapses: BTreeMap::new(),
        }
    }
}

/// Dict form of a full definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DefinitionDict<D = f64> {
    /// Labelled cable types, in declaration order
    #[serde(
        default = "Vec::new",
        deserialize_with = "ordered_pairs",
        serialize_with = "ordered_pairs_ser"
    )]
    pub cable_types: Vec<(String, CableTypeDict<D>)>,
    /// Global synapse types keyed by label
    #[serde(default = "BTreeMap::new")]
    pub synapse_types: BTreeMap<String, SynapseDict<D>>,
}

/// Dict form of a plain model definition
pub type ModelDefinitionDict = DefinitionDict<f64>;

impl<D> Default for DefinitionDict<D> {
    fn default() -> Self {
        Self {
            cable_types: Vec::new(),
            synapse_types: BTreeMap::new(),
        }
    }
}

/// Deserialize a map while keeping its entry order
fn ordered_pairs<'de, De, V>(deserializer: De) -> std::result::Result<Vec<(String, V)>, De::Error>
where
    De: serde::Deserializer<'de>,
    V: Deserialize<'de>,
{
    struct PairsVisitor<V>(std::marker::PhantomData<V>);

    impl<'de, V: Deserialize<'de>> serde::de::Visitor<'de> for PairsVisitor<V> {
        type Value = Vec<(String, V)>;

        fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("a map of labelled entries")
        }

        fn visit_map<A: serde::de::MapAccess<'de>>(
            self,
            mut access: A,
        ) -> std::result::Result<Self::Value, A::Error> {
            let mut pairs = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((key, value)) = access.next_entry::<String, V>()? {
                pairs.push((key, value));
            }
            Ok(pairs)
        }
    }

    deserializer.deserialize_map(PairsVisitor(std::marker::PhantomData))
}

/// Serialize ordered entries back out as a map
fn ordered_pairs_ser<S, V>(
    pairs: &[(String, V)],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
    V: Serialize,
{
    serializer.collect_map(pairs.iter().map(|(key, value)| (key, value)))
}

/// Parse a definition dict into a [`ModelDefinition`]
pub fn define_model(dict: ModelDefinitionDict) -> Result<ModelDefinition> {
    let model = build_definition(dict)?;
    log::debug!(
        "defined model with {} cable type(s), {} synapse type(s)",
        model.len(),
        model.synapse_types().len()
    );
    Ok(model)
}

/// Copy `template` and merge a parsed definition dict over it
pub fn define_model_with(
    template: &ModelDefinition,
    dict: ModelDefinitionDict,
) -> Result<ModelDefinition> {
    let mut model = template.clone();
    let parsed: ModelDefinition = build_definition(dict)?;
    model.merge(&parsed);
    Ok(model)
}

/// Build a typed definition from its dict form
pub fn build_definition<D, V>(dict: DefinitionDict<D>) -> Result<Definition<V>>
where
    D: Into<V>,
    V: Value,
{
    let mut definition = Definition::new();
    for (label, cable_dict) in dict.cable_types {
        let cable_type = build_cable_type(&label, cable_dict)?;
        definition.add_cable_type(label, cable_type)?;
    }
    for (label, synapse_dict) in dict.synapse_types {
        let synapse = build_synapse(&label, synapse_dict)?;
        definition.add_synapse_type(label, synapse)?;
    }
    Ok(definition)
}

fn build_cable_type<D, V>(label: &str, dict: CableTypeDict<D>) -> Result<CableType<V>>
where
    D: Into<V>,
    V: Value,
{
    let mut cable_type = CableType {
        cable: CableProperties {
            ra: dict.cable.ra.map(Into::into),
            cm: dict.cable.cm.map(Into::into),
        },
        ..CableType::default()
    };
    for (name, ion) in dict.ions {
        cable_type.add_ion(
            name,
            Ion {
                rev_pot: ion.rev_pot.map(Into::into),
                int_con: ion.int_con.map(Into::into),
                ext_con: ion.ext_con.map(Into::into),
            },
        )?;
    }
    for (raw_id, parameters) in dict.mechanisms {
        let id = MechId::parse(&raw_id).map_err(|e| {
            ModelError::invalid_definition(format!("{label}.mechanisms.{raw_id}"), e.to_string())
        })?;
        cable_type.add_mech(id, Mechanism::new(convert_params(parameters)))?;
    }
    for (synapse_label, synapse_dict) in dict.synapses {
        let synapse = build_synapse(&synapse_label, synapse_dict)?;
        cable_type.add_synapse(synapse_label, synapse)?;
    }
    Ok(cable_type)
}

fn build_synapse<D, V>(label: &str, dict: SynapseDict<D>) -> Result<Synapse<V>>
where
    D: Into<V>,
    V: Value,
{
    match dict {
        SynapseDict::Expanded {
            mechanism,
            parameters,
        } => Ok(Synapse::new(mechanism, convert_params(parameters))),
        SynapseDict::Wrapped { parameters } | SynapseDict::Short(parameters) => {
            let mech_id = MechId::parse(label).map_err(|e| {
                ModelError::invalid_definition(format!("synapse '{label}'"), e.to_string())
            })?;
            Ok(Synapse::new(mech_id, convert_params(parameters)))
        }
    }
}

fn convert_params<D: Into<V>, V>(parameters: BTreeMap<String, D>) -> BTreeMap<String, V> {
    parameters
        .into_iter()
        .map(|(key, value)| (key, value.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_synapse_takes_mechanism_from_key() {
        let dict: SynapseDict = serde_json::from_str(r#"{"tau": 2.0}"#).unwrap();
        let synapse: Synapse = build_synapse("ExpSyn", dict).unwrap();
        assert_eq!(synapse.mech_id, MechId::new("ExpSyn"));
        assert_eq!(synapse.parameters["tau"], 2.0);
    }

    #[test]
    fn expanded_synapse_names_its_mechanism() {
        let dict: SynapseDict =
            serde_json::from_str(r#"{"mechanism": "ExpSyn", "parameters": {"tau": 3.0}}"#).unwrap();
        let synapse: Synapse = build_synapse("expsyn2", dict).unwrap();
        assert_eq!(synapse.mech_id, MechId::new("ExpSyn"));
        assert_eq!(synapse.parameters["tau"], 3.0);
    }

    #[test]
    fn cable_types_keep_file_order() {
        let dict: ModelDefinitionDict = serde_json::from_str(
            r#"{
                "cable_types": {
                    "soma": {"cable": {"Ra": 10.0, "cm": 1.0}},
                    "basal_dendrite": {"cable": {"Ra": 10.0, "cm": 1.0}},
                    "apical_dendrite": {"cable": {"Ra": 10.0, "cm": 1.0}}
                }
            }"#,
        )
        .unwrap();
        let labels: Vec<&str> = dict.cable_types.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, ["soma", "basal_dendrite", "apical_dendrite"]);
    }

    #[test]
    fn empty_definition_is_valid() {
        let dict: ModelDefinitionDict = serde_json::from_str("{}").unwrap();
        let model = define_model(dict).unwrap();
        assert!(model.is_empty());
    }
}
