//! NEURON-style builder
//!
//! Lowers a finished schematic into a [`NeuronModel`]: one section per
//! schematic section, with geometry, discretization, cable properties, ion
//! attributes, and catalog-resolved mechanism insertions fully spelled out the
//! way they would be applied to a NEURON cell. Synapses, transmitters, and
//! receivers are inserted on the built model afterwards.

use std::collections::BTreeMap;

use arborize_catalog::Catalog;
use arborize_model::MechId;
use arborize_schematic::{quote_join, Location, Schematic};

use crate::error::{BuildError, Result};

/// Attribute name NEURON uses for an ion property
fn ion_attribute(ion: &str, property: &str) -> String {
    match property {
        "rev_pot" => format!("e{ion}"),
        "int_con" => format!("{ion}i"),
        "ext_con" => format!("{ion}o"),
        other => format!("{other}_{ion}"),
    }
}

/// A density mechanism inserted on a section
#[derive(Debug, Clone)]
pub struct InsertedMechanism {
    /// Mechanism id as written in the definition
    pub mech_id: MechId,
    /// Resolved mod name
    pub mod_name: String,
    /// Parameter assignments applied after insertion
    pub attributes: BTreeMap<String, f64>,
}

impl InsertedMechanism {
    /// Full NEURON attribute name of a parameter: `{param}_{mod}`
    pub fn attribute_name(&self, parameter: &str) -> String {
        format!("{}_{}", parameter, self.mod_name)
    }
}

/// A synapse type resolved against the catalog at build time
#[derive(Debug, Clone)]
pub struct ResolvedSynapse {
    /// Mechanism id as written in the definition
    pub mech_id: MechId,
    /// Resolved mod name of the point process
    pub mod_name: String,
    /// Parameter assignments for inserted instances
    pub parameters: BTreeMap<String, f64>,
}

/// A point process inserted at an arc position on a section
#[derive(Debug, Clone)]
pub struct PointProcess {
    /// Synapse label the point process was created from
    pub label: String,
    /// Resolved mod name
    pub mod_name: String,
    /// Normalized arc position on the section
    pub arc: f64,
    /// Parameter assignments
    pub attributes: BTreeMap<String, f64>,
    /// Gid of the receiver wired to this synapse, if any
    pub gid: Option<u64>,
}

/// A spike transmitter registered on a section
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transmitter {
    /// Global identifier receivers subscribe to
    pub gid: u64,
    /// Normalized arc position of the source
    pub arc: f64,
}

/// One fully resolved NEURON-style section
#[derive(Debug, Clone)]
pub struct NrnSection {
    /// Unique section name
    pub name: String,
    /// Labels inherited from the schematic section
    pub labels: Vec<String>,
    /// Index of the parent section in the model
    pub parent: Option<usize>,
    /// 3-D sample points
    pub coords: Vec<[f64; 3]>,
    /// Sample diameters (2 × radius)
    pub diams: Vec<f64>,
    /// Section length in µm
    pub length: f64,
    /// Number of segments the section is discretized into
    pub nseg: usize,
    /// Axial resistivity in Ω·cm
    pub ra: f64,
    /// Specific membrane capacitance in µF/cm²
    pub cm: f64,
    /// Ion attribute assignments, e.g. `ek → -77.0`
    pub ions: BTreeMap<String, f64>,
    /// Inserted density mechanisms
    pub mechanisms: Vec<InsertedMechanism>,
    /// Synapse types available on this section
    pub synapse_types: BTreeMap<String, ResolvedSynapse>,
    /// Point processes inserted after building
    pub synapses: Vec<PointProcess>,
    /// Spike transmitter, if one was registered
    pub transmitter: Option<Transmitter>,
}

impl NrnSection {
    /// Whether the section carries a label
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Look up an inserted mechanism by its id
    pub fn mechanism(&self, mech_id: &MechId) -> Option<&InsertedMechanism> {
        self.mechanisms.iter().find(|m| &m.mech_id == mech_id)
    }
}

/// Maps a schematic location onto its section and arc interval
#[derive(Debug, Clone)]
pub struct LocationAccessor {
    /// The schematic location
    pub loc: Location,
    /// Index of the section holding the location
    pub section: usize,
    arcs: (f64, f64),
}

impl LocationAccessor {
    /// Interpolate a normalized section arc from a position within the
    /// location's interval
    pub fn arc(&self, x: f64) -> f64 {
        let (a0, a1) = self.arcs;
        (a1 - a0) * x + a0
    }
}

/// A built NEURON-style cell model
#[derive(Debug, Clone)]
pub struct NeuronModel {
    name: String,
    sections: Vec<NrnSection>,
    locations: BTreeMap<Location, LocationAccessor>,
    cable_type_labels: Vec<String>,
}

impl NeuronModel {
    /// Instance name of the model
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All sections, in build order
    pub fn sections(&self) -> &[NrnSection] {
        &self.sections
    }

    /// Labels of the declared cable types
    pub fn cable_type_labels(&self) -> &[String] {
        &self.cable_type_labels
    }

    /// Location accessors keyed by schematic location
    pub fn locations(&self) -> &BTreeMap<Location, LocationAccessor> {
        &self.locations
    }

    /// Look up a location, reporting misses
    pub fn get_location(&self, loc: Location) -> Result<&LocationAccessor> {
        self.locations
            .get(&loc)
            .ok_or_else(|| BuildError::unknown_location(format!("({}.{})", loc.0, loc.1)))
    }

    /// Sections carrying any of the given labels
    pub fn get_sections_with_any_label(&self, labels: &[&str]) -> Vec<&NrnSection> {
        self.sections
            .iter()
            .filter(|s| labels.iter().any(|l| s.has_label(l)))
            .collect()
    }

    /// Sections carrying all of the given labels
    pub fn get_sections_with_all_labels(&self, labels: &[&str]) -> Vec<&NrnSection> {
        self.sections
            .iter()
            .filter(|s| labels.iter().all(|l| s.has_label(l)))
            .collect()
    }

    /// Insert a synapse point process at a location.
    ///
    /// The synapse label must be one of the synapse types resolved onto the
    /// section; `sx` positions the process within the location's arc interval.
    pub fn insert_synapse(&mut self, label: &str, loc: Location, sx: f64) -> Result<&PointProcess> {
        let accessor = self.get_location(loc)?.clone();
        let section = &self.sections[accessor.section];
        if section.synapse_types.is_empty() {
            return Err(BuildError::NoSynapses {
                labels: quote_join(section.labels.iter()),
            });
        }
        let synapse = section.synapse_types.get(label).ok_or_else(|| {
            BuildError::UnknownSynapse {
                synapse: label.to_string(),
                labels: quote_join(section.labels.iter()),
                choices: quote_join(section.synapse_types.keys()),
            }
        })?;
        let process = PointProcess {
            label: label.to_string(),
            mod_name: synapse.mod_name.clone(),
            arc: accessor.arc(sx),
            attributes: synapse.parameters.clone(),
            gid: None,
        };
        let section = &mut self.sections[accessor.section];
        section.synapses.push(process);
        Ok(section.synapses.last().expect("synapse was just pushed"))
    }

    /// Insert a synapse and subscribe it to a spike source gid
    pub fn insert_receiver(
        &mut self,
        gid: u64,
        label: &str,
        loc: Location,
        sx: f64,
    ) -> Result<&PointProcess> {
        let section = self.get_location(loc)?.section;
        self.insert_synapse(label, loc, sx)?;
        let process = self.sections[section]
            .synapses
            .last_mut()
            .expect("synapse was just inserted");
        process.gid = Some(gid);
        Ok(process)
    }

    /// Register a spike transmitter on the section holding a location.
    ///
    /// Each section carries at most one transmitter; re-registering with the
    /// same gid returns the existing one.
    pub fn insert_transmitter(&mut self, gid: u64, loc: Location, sx: f64) -> Result<Transmitter> {
        let accessor = self.get_location(loc)?.clone();
        let section = &mut self.sections[accessor.section];
        if let Some(existing) = section.transmitter {
            if existing.gid != gid {
                return Err(BuildError::TransmitterExists { gid: existing.gid });
            }
            return Ok(existing);
        }
        let transmitter = Transmitter {
            gid,
            arc: accessor.arc(sx),
        };
        section.transmitter = Some(transmitter);
        Ok(transmitter)
    }
}

/// Build a NEURON-style model from a schematic.
///
/// Freezes the schematic, so definition resolution errors surface here.
pub fn neuron_build(schematic: &mut Schematic<f64>, catalog: &Catalog) -> Result<NeuronModel> {
    schematic.freeze()?;
    let name = schematic.create_name()?;
    log::debug!("building NEURON model '{name}'");

    let order = schematic.section_order();
    let mut model_index: BTreeMap<usize, usize> = BTreeMap::new();
    let mut sections = Vec::with_capacity(order.len());
    let mut locations = BTreeMap::new();

    for (index, &section_id) in order.iter().enumerate() {
        let section = &schematic.section_slice()[section_id];
        model_index.insert(section_id, index);
        let parent = section.parent.map(|pid| {
            *model_index
                .get(&pid)
                .expect("depth-first order visits parents before children")
        });

        let points: Vec<_> = section
            .points
            .iter()
            .map(|&loc| {
                schematic
                    .point(loc)
                    .expect("sections index valid points")
                    .clone()
            })
            .collect();
        let coords: Vec<[f64; 3]> = points.iter().map(|p| p.coords).collect();
        let diams: Vec<f64> = points.iter().map(|p| p.radius * 2.0).collect();
        let length = total_length(&coords);
        let arcs = arclengths(&coords);

        let definition = section.resolved();
        let ra = definition
            .cable
            .ra
            .expect("freezing asserts complete cable properties");
        let cm = definition
            .cable
            .cm
            .expect("freezing asserts complete cable properties");

        let mut ions = BTreeMap::new();
        for (ion_name, ion) in &definition.ions {
            for (property, value) in ion.iter() {
                if let Some(value) = value {
                    ions.insert(ion_attribute(ion_name, property), *value);
                }
            }
        }

        let mut mechanisms = Vec::new();
        for (mech_id, mech) in &definition.mechs {
            let entry = catalog.resolve_density(mech_id)?;
            catalog.validate_parameters(mech_id, mech.parameters.keys().map(String::as_str))?;
            mechanisms.push(InsertedMechanism {
                mech_id: mech_id.clone(),
                mod_name: entry.mod_name(),
                attributes: mech.parameters.clone(),
            });
        }

        let mut synapse_types = BTreeMap::new();
        for (label, synapse) in &definition.synapses {
            let entry = catalog.resolve_point_process(&synapse.mech_id)?;
            catalog.validate_parameters(
                &synapse.mech_id,
                synapse.parameters.keys().map(String::as_str),
            )?;
            synapse_types.insert(
                label.clone(),
                ResolvedSynapse {
                    mech_id: synapse.mech_id.clone(),
                    mod_name: entry.mod_name(),
                    parameters: synapse.parameters.clone(),
                },
            );
        }

        for (i, point) in points.iter().enumerate() {
            let arcpair = match (arcs.get(i), arcs.get(i + 1)) {
                (Some(&a0), Some(&a1)) => (a0, a1),
                _ => (1.0, 1.0),
            };
            locations.insert(
                point.loc,
                LocationAccessor {
                    loc: point.loc,
                    section: index,
                    arcs: arcpair,
                },
            );
        }

        sections.push(NrnSection {
            name: format!("{name}_{}", section_span(section.points.as_slice())),
            labels: section.labels.iter().cloned().collect(),
            parent,
            coords,
            diams,
            length,
            nseg: (length / 10.0) as usize + 1,
            ra,
            cm,
            ions,
            mechanisms,
            synapse_types,
            synapses: Vec::new(),
            transmitter: None,
        });
    }

    Ok(NeuronModel {
        name,
        sections,
        locations,
        cable_type_labels: schematic
            .definition()
            .cable_types()
            .map(|(label, _)| label.to_string())
            .collect(),
    })
}

/// Compact span string for section names: `0.0` or `0.0-3`
fn section_span(points: &[Location]) -> String {
    match points {
        [] => "empty".to_string(),
        [(b, p)] => format!("{b}.{p}"),
        [first, .., last] => format!("{}.{}-{}", first.0, first.1, last.1),
    }
}

/// Total Euclidean length of a point chain
fn total_length(coords: &[[f64; 3]]) -> f64 {
    coords
        .windows(2)
        .map(|pair| distance(pair[0], pair[1]))
        .sum()
}

/// Normalized cumulative arc lengths, one per point.
///
/// The first point maps to 0 and the last to 1; a degenerate chain with zero
/// total length maps every point to 0.
fn arclengths(coords: &[[f64; 3]]) -> Vec<f64> {
    let mut sums = Vec::with_capacity(coords.len());
    let mut total = 0.0;
    for (i, &coord) in coords.iter().enumerate() {
        if i > 0 {
            total += distance(coords[i - 1], coord);
        }
        sums.push(total);
    }
    if total > 0.0 {
        for sum in &mut sums {
            *sum /= total;
        }
    }
    sums
}

fn distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arclengths_normalize_to_unit_interval() {
        let arcs = arclengths(&[[0.0, 0.0, 0.0], [3.0, 0.0, 0.0], [9.0, 0.0, 0.0]]);
        assert_eq!(arcs, vec![0.0, 1.0 / 3.0, 1.0]);
    }

    #[test]
    fn degenerate_chains_map_to_zero() {
        let arcs = arclengths(&[[1.0, 1.0, 1.0]]);
        assert_eq!(arcs, vec![0.0]);
    }

    #[test]
    fn ion_attributes_follow_the_neuron_naming_scheme() {
        assert_eq!(ion_attribute("k", "rev_pot"), "ek");
        assert_eq!(ion_attribute("na", "int_con"), "nai");
        assert_eq!(ion_attribute("ca", "ext_con"), "cao");
    }
}
