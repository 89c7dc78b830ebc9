//! Cable-type definitions and merge semantics
//!
//! A model definition is an ordered collection of labelled cable types plus a
//! set of globally available synapse types. Cable types hold passive cable
//! properties, ion settings, density mechanisms, and synapses; all values stay
//! optional until a schematic folds a concrete stack of cable types together
//! and asserts completeness.
//!
//! The declaration order of cable types is semantic: when a section carries
//! several labels, its properties are folded in declaration order, so types
//! declared later override types declared earlier.

use std::collections::BTreeMap;
use std::fmt::Debug;

use crate::error::{ModelError, Result};
use crate::mech_id::MechId;

/// Property value stored in a definition.
///
/// Plain models use `f64`; constraint definitions use
/// [`Constraint`](crate::constraints::Constraint). The `From<f64>` bound lets
/// the built-in defaults be expressed once as plain numbers.
pub trait Value: Clone + PartialEq + Debug + From<f64> {}

impl<T: Clone + PartialEq + Debug + From<f64>> Value for T {}

/// Passive cable properties of a compartment category
#[derive(Debug, Clone, PartialEq)]
pub struct CableProperties<V = f64> {
    /// Axial resistivity in Ω·cm
    pub ra: Option<V>,
    /// Specific membrane capacitance in µF/cm²
    pub cm: Option<V>,
}

impl<V> Default for CableProperties<V> {
    fn default() -> Self {
        Self { ra: None, cm: None }
    }
}

impl<V: Value> CableProperties<V> {
    /// Overwrite each property that is set on `other`
    pub fn merge(&mut self, other: &Self) {
        if let Some(ra) = &other.ra {
            self.ra = Some(ra.clone());
        }
        if let Some(cm) = &other.cm {
            self.cm = Some(cm.clone());
        }
    }

    /// Check that every property has a value
    pub fn assert_complete(&self) -> Result<()> {
        if self.ra.is_none() {
            return Err(ModelError::MissingCableProperty { property: "Ra" });
        }
        if self.cm.is_none() {
            return Err(ModelError::MissingCableProperty { property: "cm" });
        }
        Ok(())
    }

    /// Iterate properties as `(backend name, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Option<&V>)> {
        [("Ra", self.ra.as_ref()), ("cm", self.cm.as_ref())].into_iter()
    }
}

/// Ion settings of a compartment category
#[derive(Debug, Clone, PartialEq)]
pub struct Ion<V = f64> {
    /// Reversal potential in mV
    pub rev_pot: Option<V>,
    /// Internal concentration in mM
    pub int_con: Option<V>,
    /// External concentration in mM
    pub ext_con: Option<V>,
}

impl<V> Default for Ion<V> {
    fn default() -> Self {
        Self {
            rev_pot: None,
            int_con: None,
            ext_con: None,
        }
    }
}

impl<V: Value> Ion<V> {
    /// Overwrite each property that is set on `other`
    pub fn merge(&mut self, other: &Self) {
        if let Some(rev_pot) = &other.rev_pot {
            self.rev_pot = Some(rev_pot.clone());
        }
        if let Some(int_con) = &other.int_con {
            self.int_con = Some(int_con.clone());
        }
        if let Some(ext_con) = &other.ext_con {
            self.ext_con = Some(ext_con.clone());
        }
    }

    /// Fill properties that are still unset from `defaults`
    pub fn fill_from(&mut self, defaults: &Self) {
        if self.rev_pot.is_none() {
            self.rev_pot = defaults.rev_pot.clone();
        }
        if self.int_con.is_none() {
            self.int_con = defaults.int_con.clone();
        }
        if self.ext_con.is_none() {
            self.ext_con = defaults.ext_con.clone();
        }
    }

    /// Check that every property has a value, naming the ion on failure
    pub fn assert_complete(&self, ion: &str) -> Result<()> {
        let missing = if self.rev_pot.is_none() {
            Some("rev_pot")
        } else if self.int_con.is_none() {
            Some("int_con")
        } else if self.ext_con.is_none() {
            Some("ext_con")
        } else {
            None
        };
        match missing {
            Some(property) => Err(ModelError::MissingIonProperty {
                ion: ion.to_string(),
                property,
            }),
            None => Ok(()),
        }
    }

    /// Iterate properties as `(name, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Option<&V>)> {
        [
            ("rev_pot", self.rev_pot.as_ref()),
            ("int_con", self.int_con.as_ref()),
            ("ext_con", self.ext_con.as_ref()),
        ]
        .into_iter()
    }
}

/// Built-in ion settings used when a definition opts into defaults
pub fn default_ion(name: &str) -> Option<Ion> {
    let (rev_pot, int_con, ext_con) = match name {
        "na" => (50.0, 10.0, 140.0),
        "k" => (-77.0, 54.4, 2.5),
        "ca" => (132.4579341637009, 5e-5, 2.0),
        "h" => (0.0, 1.0, 1.0),
        _ => return None,
    };
    Some(Ion {
        rev_pot: Some(rev_pot),
        int_con: Some(int_con),
        ext_con: Some(ext_con),
    })
}

/// Default axial resistivity in Ω·cm
pub const DEFAULT_RA: f64 = 35.4;
/// Default specific membrane capacitance in µF/cm²
pub const DEFAULT_CM: f64 = 1.0;

/// Parameter set of a density mechanism
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mechanism<V = f64> {
    /// Parameter assignments, keyed by parameter name
    pub parameters: BTreeMap<String, V>,
}

impl<V: Value> Mechanism<V> {
    /// Create a mechanism from a parameter map
    pub fn new(parameters: BTreeMap<String, V>) -> Self {
        Self { parameters }
    }

    /// Overwrite parameters with those of `other`
    pub fn merge(&mut self, other: &Self) {
        for (key, value) in &other.parameters {
            self.parameters.insert(key.clone(), value.clone());
        }
    }
}

/// A synapse: a point-process mechanism with a parameter set
#[derive(Debug, Clone, PartialEq)]
pub struct Synapse<V = f64> {
    /// Mechanism that implements the point process
    pub mech_id: MechId,
    /// Parameter assignments, keyed by parameter name
    pub parameters: BTreeMap<String, V>,
}

impl<V: Value> Synapse<V> {
    /// Create a synapse bound to a mechanism
    pub fn new(mech_id: MechId, parameters: BTreeMap<String, V>) -> Self {
        Self {
            mech_id,
            parameters,
        }
    }

    /// Overwrite parameters with those of `other`.
    ///
    /// The mechanism binding of the receiving synapse is kept.
    pub fn merge(&mut self, other: &Self) {
        for (key, value) in &other.parameters {
            self.parameters.insert(key.clone(), value.clone());
        }
    }
}

/// A named bundle of cable properties, ions, mechanisms, and synapses
#[derive(Debug, Clone, PartialEq)]
pub struct CableType<V = f64> {
    /// Passive cable properties
    pub cable: CableProperties<V>,
    /// Ion settings keyed by ion name
    pub ions: BTreeMap<String, Ion<V>>,
    /// Density mechanisms keyed by mechanism id
    pub mechs: BTreeMap<MechId, Mechanism<V>>,
    /// Synapses keyed by label
    pub synapses: BTreeMap<String, Synapse<V>>,
}

impl<V> Default for CableType<V> {
    fn default() -> Self {
        Self {
            cable: CableProperties::default(),
            ions: BTreeMap::new(),
            mechs: BTreeMap::new(),
            synapses: BTreeMap::new(),
        }
    }
}

impl<V: Value> CableType<V> {
    /// Add an ion, rejecting duplicates
    pub fn add_ion(&mut self, name: impl Into<String>, ion: Ion<V>) -> Result<()> {
        let name = name.into();
        if self.ions.contains_key(&name) {
            return Err(ModelError::DuplicateIon { name });
        }
        self.ions.insert(name, ion);
        Ok(())
    }

    /// Add a density mechanism, rejecting duplicates
    pub fn add_mech(&mut self, id: MechId, mech: Mechanism<V>) -> Result<()> {
        if self.mechs.contains_key(&id) {
            return Err(ModelError::DuplicateMechanism { id: id.to_string() });
        }
        self.mechs.insert(id, mech);
        Ok(())
    }

    /// Add a synapse under a label, rejecting duplicates
    pub fn add_synapse(&mut self, label: impl Into<String>, synapse: Synapse<V>) -> Result<()> {
        let label = label.into();
        if self.synapses.contains_key(&label) {
            return Err(ModelError::DuplicateSynapse { label });
        }
        self.synapses.insert(label, synapse);
        Ok(())
    }

    /// Merge `other` over this cable type
    pub fn merge(&mut self, other: &Self) {
        self.cable.merge(&other.cable);
        for (name, ion) in &other.ions {
            match self.ions.get_mut(name) {
                Some(existing) => existing.merge(ion),
                None => {
                    self.ions.insert(name.clone(), ion.clone());
                }
            }
        }
        for (id, mech) in &other.mechs {
            match self.mechs.get_mut(id) {
                Some(existing) => existing.merge(mech),
                None => {
                    self.mechs.insert(id.clone(), mech.clone());
                }
            }
        }
        for (label, synapse) in &other.synapses {
            match self.synapses.get_mut(label) {
                Some(existing) => existing.merge(synapse),
                None => {
                    self.synapses.insert(label.clone(), synapse.clone());
                }
            }
        }
    }

    /// Fold an ordered stack of cable types into one concrete type.
    ///
    /// Global synapse types seed the synapse map so that local synapses merge
    /// over them. Later entries in `defs` override earlier ones. With
    /// `use_defaults`, unset cable properties fall back to [`DEFAULT_RA`] and
    /// [`DEFAULT_CM`], and ions with a built-in default table entry are
    /// back-filled; ions outside the table pass through unchanged.
    pub fn anchor<'a, I>(
        defs: I,
        synapses: &BTreeMap<String, Synapse<V>>,
        use_defaults: bool,
    ) -> Self
    where
        I: IntoIterator<Item = Option<&'a CableType<V>>>,
        V: 'a,
    {
        let mut folded = CableType::default();
        for (label, synapse) in synapses {
            folded.synapses.insert(label.clone(), synapse.clone());
        }
        for def in defs.into_iter().flatten() {
            folded.merge(def);
        }
        if use_defaults {
            folded.apply_defaults();
        }
        folded
    }

    fn apply_defaults(&mut self) {
        if self.cable.ra.is_none() {
            self.cable.ra = Some(DEFAULT_RA.into());
        }
        if self.cable.cm.is_none() {
            self.cable.cm = Some(DEFAULT_CM.into());
        }
        for (name, ion) in self.ions.iter_mut() {
            if let Some(defaults) = default_ion(name) {
                ion.fill_from(&Ion {
                    rev_pot: defaults.rev_pot.map(V::from),
                    int_con: defaults.int_con.map(V::from),
                    ext_con: defaults.ext_con.map(V::from),
                });
            }
        }
    }

    /// Check that every cable and ion property has a value
    pub fn assert_complete(&self) -> Result<()> {
        self.cable.assert_complete()?;
        for (name, ion) in &self.ions {
            ion.assert_complete(name)?;
        }
        Ok(())
    }
}

/// An ordered collection of labelled cable types plus global synapse types.
///
/// `Definition<f64>` is the plain [`ModelDefinition`]; constraint definitions
/// reuse the same shape with constraint values.
#[derive(Debug, Clone, PartialEq)]
pub struct Definition<V = f64> {
    cable_types: Vec<(String, CableType<V>)>,
    synapse_types: BTreeMap<String, Synapse<V>>,
    /// Back-fill unset properties from the built-in defaults when folding
    pub use_defaults: bool,
}

/// Plain model definition with scalar property values
pub type ModelDefinition = Definition<f64>;

impl<V> Default for Definition<V> {
    fn default() -> Self {
        Self {
            cable_types: Vec::new(),
            synapse_types: BTreeMap::new(),
            use_defaults: false,
        }
    }
}

impl<V: Value> Definition<V> {
    /// Create an empty definition
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle default back-filling
    pub fn with_use_defaults(mut self, use_defaults: bool) -> Self {
        self.use_defaults = use_defaults;
        self
    }

    /// Add a labelled cable type, rejecting duplicates
    pub fn add_cable_type(&mut self, label: impl Into<String>, def: CableType<V>) -> Result<()> {
        let label = label.into();
        if self.position_of(&label).is_some() {
            return Err(ModelError::DuplicateCableType { label });
        }
        self.cable_types.push((label, def));
        Ok(())
    }

    /// Add a global synapse type, rejecting duplicates
    pub fn add_synapse_type(&mut self, label: impl Into<String>, synapse: Synapse<V>) -> Result<()> {
        let label = label.into();
        if self.synapse_types.contains_key(&label) {
            return Err(ModelError::DuplicateSynapse { label });
        }
        self.synapse_types.insert(label, synapse);
        Ok(())
    }

    /// Iterate cable types in declaration order
    pub fn cable_types(&self) -> impl Iterator<Item = (&str, &CableType<V>)> {
        self.cable_types.iter().map(|(l, ct)| (l.as_str(), ct))
    }

    /// Number of declared cable types
    pub fn len(&self) -> usize {
        self.cable_types.len()
    }

    /// Whether the definition declares no cable types
    pub fn is_empty(&self) -> bool {
        self.cable_types.is_empty()
    }

    /// Look up a cable type by label
    pub fn get_cable_type(&self, label: &str) -> Option<&CableType<V>> {
        self.cable_types
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, ct)| ct)
    }

    /// Mutable lookup of a cable type by label
    pub fn get_cable_type_mut(&mut self, label: &str) -> Option<&mut CableType<V>> {
        self.cable_types
            .iter_mut()
            .find(|(l, _)| l == label)
            .map(|(_, ct)| ct)
    }

    /// Declaration position of a label, if the label is declared
    pub fn position_of(&self, label: &str) -> Option<usize> {
        self.cable_types.iter().position(|(l, _)| l == label)
    }

    /// Global synapse types
    pub fn synapse_types(&self) -> &BTreeMap<String, Synapse<V>> {
        &self.synapse_types
    }

    /// Mutable access to the global synapse types
    pub fn synapse_types_mut(&mut self) -> &mut BTreeMap<String, Synapse<V>> {
        &mut self.synapse_types
    }

    /// Merge `other` over this definition.
    ///
    /// Matching cable types and synapse types merge per key; labels that only
    /// exist on `other` are appended in their declaration order.
    pub fn merge(&mut self, other: &Definition<V>) {
        for (label, def) in &other.cable_types {
            match self.get_cable_type_mut(label) {
                Some(existing) => existing.merge(def),
                None => self.cable_types.push((label.clone(), def.clone())),
            }
        }
        for (label, synapse) in &other.synapse_types {
            match self.synapse_types.get_mut(label) {
                Some(existing) => existing.merge(synapse),
                None => {
                    self.synapse_types.insert(label.clone(), synapse.clone());
                }
            }
        }
    }

    /// Fold the cable types selected by `labels` into one concrete type.
    ///
    /// Labels are folded in the order given; callers are expected to sort them
    /// with a label priority order first (see the schematic layer).
    pub fn fold_labels<'a>(&self, labels: impl IntoIterator<Item = &'a str>) -> CableType<V> {
        CableType::anchor(
            labels.into_iter().map(|label| self.get_cable_type(label)),
            &self.synapse_types,
            self.use_defaults,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ion(rev_pot: Option<f64>, int_con: Option<f64>, ext_con: Option<f64>) -> Ion {
        Ion {
            rev_pot,
            int_con,
            ext_con,
        }
    }

    #[test]
    fn merge_overwrites_set_fields_only() {
        let mut left = CableProperties {
            ra: Some(10.0),
            cm: Some(1.0),
        };
        let right = CableProperties {
            ra: Some(100.0),
            cm: None,
        };
        left.merge(&right);
        assert_eq!(left.ra, Some(100.0));
        assert_eq!(left.cm, Some(1.0));
    }

    #[test]
    fn anchor_last_definition_wins() {
        let mut low = CableType::<f64>::default();
        low.cable.ra = Some(10.0);
        low.cable.cm = Some(1.0);
        let mut high = CableType::<f64>::default();
        high.cable.ra = Some(200.0);

        let folded = CableType::anchor([Some(&low), None, Some(&high)], &BTreeMap::new(), false);
        assert_eq!(folded.cable.ra, Some(200.0));
        assert_eq!(folded.cable.cm, Some(1.0));
    }

    #[test]
    fn anchor_seeds_global_synapses() {
        let mut global = BTreeMap::new();
        global.insert(
            "expsyn2".to_string(),
            Synapse::new(
                MechId::new("ExpSyn"),
                BTreeMap::from([("tau".to_string(), 3.0)]),
            ),
        );
        let mut local = CableType::<f64>::default();
        local
            .add_synapse(
                "expsyn2",
                Synapse::new(
                    MechId::new("ExpSyn"),
                    BTreeMap::from([("tau".to_string(), 5.0), ("e".to_string(), 0.0)]),
                ),
            )
            .unwrap();

        let folded = CableType::anchor([Some(&local)], &global, false);
        let synapse = &folded.synapses["expsyn2"];
        assert_eq!(synapse.parameters["tau"], 5.0);
        assert_eq!(synapse.parameters["e"], 0.0);
    }

    #[test]
    fn defaults_backfill_known_ions_only() {
        let mut ct = CableType::<f64>::default();
        ct.add_ion("ca", ion(Some(10.0), None, None)).unwrap();
        ct.add_ion("cl", ion(Some(-65.0), None, None)).unwrap();

        let folded = CableType::anchor([Some(&ct)], &BTreeMap::new(), true);
        assert_eq!(folded.cable.ra, Some(DEFAULT_RA));
        assert_eq!(folded.cable.cm, Some(DEFAULT_CM));
        // User value wins, missing fields come from the table.
        assert_eq!(folded.ions["ca"].rev_pot, Some(10.0));
        assert_eq!(folded.ions["ca"].int_con, Some(5e-5));
        assert_eq!(folded.ions["ca"].ext_con, Some(2.0));
        // No table entry for chloride: untouched and incomplete.
        assert_eq!(folded.ions["cl"].int_con, None);
        assert!(folded.assert_complete().is_err());
    }

    #[test]
    fn assert_complete_names_the_ion() {
        let mut ct = CableType::<f64>::default();
        ct.cable.ra = Some(35.4);
        ct.cable.cm = Some(1.0);
        ct.add_ion("k", ion(Some(-77.0), None, Some(2.5))).unwrap();

        let err = ct.assert_complete().unwrap_err();
        match err {
            ModelError::MissingIonProperty { ion, property } => {
                assert_eq!(ion, "k");
                assert_eq!(property, "int_con");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn definition_preserves_declaration_order() {
        let mut def = ModelDefinition::new();
        def.add_cable_type("soma", CableType::default()).unwrap();
        def.add_cable_type("axon", CableType::default()).unwrap();
        def.add_cable_type("apical_dendrite", CableType::default())
            .unwrap();

        let labels: Vec<&str> = def.cable_types().map(|(l, _)| l).collect();
        assert_eq!(labels, ["soma", "axon", "apical_dendrite"]);
        assert_eq!(def.position_of("axon"), Some(1));
        assert_eq!(def.position_of("missing"), None);
    }

    #[test]
    fn duplicate_cable_type_is_rejected() {
        let mut def = ModelDefinition::new();
        def.add_cable_type("soma", CableType::default()).unwrap();
        let err = def.add_cable_type("soma", CableType::default()).unwrap_err();
        assert!(matches!(err, ModelError::DuplicateCableType { .. }));
    }
}
